// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Presentation data contract for the monitoring table.
//!
//! Pure functions from reconciled snapshots to renderable rows. Nothing
//! here mutates the store, and header/status localization is the embedding
//! application's concern: cells carry raw strings.

use serde::{Deserialize, Serialize};

use crate::event::ResourcePayload;
use crate::labels::filter_display_labels;
use crate::store::{is_system_resource, ResourceRecord, DEFAULT_SYSTEM_PREFIXES};

/// How many filtered labels a cell shows before eliding the rest.
pub const MAX_DISPLAY_LABELS: usize = 3;

/// The toggleable table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKey {
	Kind,
	Name,
	Details,
	Age,
	Status,
	Images,
	Restarts,
	Labels,
}

impl ColumnKey {
	/// All columns in canonical display order.
	pub const fn all() -> [ColumnKey; 8] {
		[
			ColumnKey::Kind,
			ColumnKey::Name,
			ColumnKey::Details,
			ColumnKey::Age,
			ColumnKey::Status,
			ColumnKey::Images,
			ColumnKey::Restarts,
			ColumnKey::Labels,
		]
	}

	/// Raw header token; the i18n collaborator maps it to a localized label.
	pub fn as_str(&self) -> &'static str {
		match self {
			ColumnKey::Kind => "kind",
			ColumnKey::Name => "name",
			ColumnKey::Details => "details",
			ColumnKey::Age => "age",
			ColumnKey::Status => "status",
			ColumnKey::Images => "images",
			ColumnKey::Restarts => "restarts",
			ColumnKey::Labels => "labels",
		}
	}
}

impl std::fmt::Display for ColumnKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Row-level filtering: system-prefix exclusion and free-text name search.
#[derive(Debug, Clone)]
pub struct RowFilter {
	/// Case-insensitive substring match on the resource name.
	pub search: Option<String>,
	/// Whether platform-internal resources are hidden.
	pub hide_system: bool,
	/// Name prefixes considered platform-internal.
	pub system_prefixes: Vec<String>,
}

impl Default for RowFilter {
	fn default() -> Self {
		Self {
			search: None,
			hide_system: true,
			system_prefixes: DEFAULT_SYSTEM_PREFIXES
				.iter()
				.map(|prefix| prefix.to_string())
				.collect(),
		}
	}
}

impl RowFilter {
	/// A filter that passes everything through.
	pub fn none() -> Self {
		Self {
			search: None,
			hide_system: false,
			system_prefixes: Vec::new(),
		}
	}

	pub fn accepts(&self, record: &ResourceRecord) -> bool {
		if self.hide_system {
			let prefixes: Vec<&str> =
				self.system_prefixes.iter().map(String::as_str).collect();
			if is_system_resource(&record.key.name, &prefixes) {
				return false;
			}
		}
		if let Some(search) = &self.search {
			let needle = search.to_lowercase();
			if !record.key.name.to_lowercase().contains(&needle) {
				return false;
			}
		}
		true
	}
}

/// One renderable table row. `cells` aligns 1:1 with the requested columns;
/// `terminating` rows are rendered distinctly (pulsing badge), never hidden.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRow {
	pub key: crate::event::ResourceKey,
	pub cells: Vec<String>,
	pub terminating: bool,
}

/// Builds rows for the currently visible columns, applying the filter.
pub fn build_rows(
	records: &[ResourceRecord],
	columns: &[ColumnKey],
	filter: &RowFilter,
) -> Vec<ResourceRow> {
	records
		.iter()
		.filter(|record| filter.accepts(record))
		.map(|record| ResourceRow {
			key: record.key.clone(),
			cells: columns.iter().map(|column| cell(record, *column)).collect(),
			terminating: record.is_terminating,
		})
		.collect()
}

fn cell(record: &ResourceRecord, column: ColumnKey) -> String {
	match column {
		ColumnKey::Kind => record.key.kind.clone(),
		ColumnKey::Name => record.key.name.clone(),
		ColumnKey::Details => details_cell(record),
		ColumnKey::Age => record.display_age.clone(),
		ColumnKey::Status => record.status.clone().unwrap_or_else(|| "-".to_string()),
		ColumnKey::Images => record
			.payload
			.as_workload()
			.filter(|workload| !workload.images.is_empty())
			.map(|workload| workload.images.join(", "))
			.unwrap_or_else(|| "-".to_string()),
		ColumnKey::Restarts => record
			.payload
			.as_workload()
			.and_then(|workload| workload.restart_count)
			.map(|count| count.to_string())
			.unwrap_or_else(|| "-".to_string()),
		ColumnKey::Labels => labels_cell(record),
	}
}

fn details_cell(record: &ResourceRecord) -> String {
	match &record.payload {
		ResourcePayload::Service(service) => endpoint_display(service),
		ResourcePayload::Workload(workload) if !workload.containers.is_empty() => {
			workload.containers.join(", ")
		}
		_ => "-".to_string(),
	}
}

/// Endpoint shown for a service, by preference: external IP, cluster IP,
/// node ports, `"N/A"`.
pub fn endpoint_display(service: &crate::event::ServiceData) -> String {
	if let Some(ip) = &service.external_ip {
		return ip.clone();
	}
	if let Some(ip) = service.external_ips.first() {
		return ip.clone();
	}
	if let Some(ip) = &service.cluster_ip {
		return ip.clone();
	}
	if !service.node_ports.is_empty() {
		let ports: Vec<String> = service
			.node_ports
			.iter()
			.map(|port| port.to_string())
			.collect();
		return format!("NodePort: {}", ports.join(", "));
	}
	"N/A".to_string()
}

fn labels_cell(record: &ResourceRecord) -> String {
	let shown = filter_display_labels(&record.metadata.labels);
	if shown.is_empty() {
		return "-".to_string();
	}
	let mut cell = shown
		.iter()
		.take(MAX_DISPLAY_LABELS)
		.map(|(key, value)| format!("{key}={value}"))
		.collect::<Vec<_>>()
		.join(", ");
	if shown.len() > MAX_DISPLAY_LABELS {
		cell.push_str(" …");
	}
	cell
}

/// One page of rows, for table pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
	pub rows: Vec<ResourceRow>,
	pub page: usize,
	pub total_pages: usize,
	pub total_rows: usize,
}

/// Slices rows into a 0-based page. A page past the end clamps to the last
/// non-empty page; `per_page == 0` is treated as 1.
pub fn paginate(rows: Vec<ResourceRow>, page: usize, per_page: usize) -> Page {
	let per_page = per_page.max(1);
	let total_rows = rows.len();
	let total_pages = total_rows.div_ceil(per_page);
	let page = page.min(total_pages.saturating_sub(1));

	let rows = rows
		.into_iter()
		.skip(page * per_page)
		.take(per_page)
		.collect();

	Page {
		rows,
		page,
		total_pages,
		total_rows,
	}
}
