// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Reconciliation of the event stream into the current-state view.
//!
//! The store owns the authoritative map of currently-known resources. Each
//! incoming event is applied as an upsert or delete against the key
//! `(kind, namespace, name)`; consumers only ever receive owned snapshots,
//! never references into the map.
//!
//! Events must be applied in socket-arrival order. `Deleted` arriving out
//! of order relative to a later upsert for the same key would corrupt the
//! view, so the transport layer never reorders or batches frames.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Map;

use crate::age::format_age;
use crate::event::{
	EventMetadata, EventVerb, ResourceEvent, ResourceKey, ResourcePayload,
};

/// Default name prefixes for platform-internal resources hidden from users.
pub const DEFAULT_SYSTEM_PREFIXES: &[&str] =
	&["kube-", "coredns", "etcd", "calico", "ingress-"];

/// Identifiers handed to the exec-terminal collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecTarget {
	pub namespace: String,
	pub pod: String,
	pub container: String,
}

/// A tracked resource: the latest event state for its key plus derived
/// display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
	pub key: ResourceKey,
	pub verb: EventVerb,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub age: Option<String>,
	pub display_age: String,
	pub is_terminating: bool,
	pub metadata: EventMetadata,
	pub payload: ResourcePayload,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub extra: Map<String, serde_json::Value>,
}

impl ResourceRecord {
	fn from_event(event: ResourceEvent, now: DateTime<Utc>) -> Self {
		let display_age = derive_display_age(&event.age, &event.metadata, now);
		let is_terminating = event.is_terminating();
		Self {
			key: event.key,
			verb: event.verb,
			status: event.status,
			age: event.age,
			display_age,
			is_terminating,
			metadata: event.metadata,
			payload: event.payload,
			extra: event.extra,
		}
	}

	/// Field-wise merge of a later event for the same key. A field present
	/// on the event overwrites; an absent optional field preserves the
	/// stored value. Derived fields are recomputed afterwards.
	fn merge_event(&mut self, event: ResourceEvent, now: DateTime<Utc>) {
		self.verb = event.verb;
		if event.status.is_some() {
			self.status = event.status;
		}
		if event.age.is_some() {
			self.age = event.age;
		}
		if event.metadata.creation_timestamp.is_some() {
			self.metadata.creation_timestamp = event.metadata.creation_timestamp;
		}
		if event.metadata.deletion_timestamp.is_some() {
			self.metadata.deletion_timestamp = event.metadata.deletion_timestamp;
		}
		if !event.metadata.labels.is_empty() {
			self.metadata.labels = event.metadata.labels;
		}
		if !event.metadata.owner_references.is_empty() {
			self.metadata.owner_references = event.metadata.owner_references;
		}
		let current = std::mem::replace(&mut self.payload, ResourcePayload::Generic);
		self.payload = merge_payload(current, event.payload);
		for (field, value) in event.extra {
			self.extra.insert(field, value);
		}

		self.display_age = derive_display_age(&self.age, &self.metadata, now);
		self.is_terminating = self.metadata.deletion_timestamp.is_some();
	}

	/// The `(namespace, pod, container)` triple for the exec-terminal
	/// collaborator. Only pods with at least one named container qualify.
	pub fn exec_target(&self) -> Option<ExecTarget> {
		if !self.key.kind.eq_ignore_ascii_case("pod") {
			return None;
		}
		let container = self.payload.as_workload()?.containers.first()?;
		Some(ExecTarget {
			namespace: self.key.namespace.clone(),
			pod: self.key.name.clone(),
			container: container.clone(),
		})
	}
}

/// Server-supplied age wins; otherwise derive from the creation timestamp.
fn derive_display_age(
	age: &Option<String>,
	metadata: &EventMetadata,
	now: DateTime<Utc>,
) -> String {
	match age {
		Some(age) => age.clone(),
		None => format_age(metadata.creation_timestamp.as_deref(), now),
	}
}

fn merge_payload(current: ResourcePayload, incoming: ResourcePayload) -> ResourcePayload {
	match (current, incoming) {
		// An event with no kind-specific fields says nothing new.
		(current, ResourcePayload::Generic) => current,
		(ResourcePayload::Service(mut current), ResourcePayload::Service(incoming)) => {
			if incoming.cluster_ip.is_some() {
				current.cluster_ip = incoming.cluster_ip;
			}
			if incoming.external_ip.is_some() {
				current.external_ip = incoming.external_ip;
			}
			if !incoming.external_ips.is_empty() {
				current.external_ips = incoming.external_ips;
			}
			if !incoming.node_ports.is_empty() {
				current.node_ports = incoming.node_ports;
			}
			if !incoming.ports.is_empty() {
				current.ports = incoming.ports;
			}
			if incoming.service_type.is_some() {
				current.service_type = incoming.service_type;
			}
			ResourcePayload::Service(current)
		}
		(ResourcePayload::Workload(mut current), ResourcePayload::Workload(incoming)) => {
			if !incoming.containers.is_empty() {
				current.containers = incoming.containers;
			}
			if !incoming.images.is_empty() {
				current.images = incoming.images;
			}
			if incoming.restart_count.is_some() {
				current.restart_count = incoming.restart_count;
			}
			ResourcePayload::Workload(current)
		}
		(_, incoming) => incoming,
	}
}

/// Change descriptor returned by [`ResourceStore::apply`], for consumers
/// that want minimal-diff rendering instead of full snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
	Inserted(ResourceKey),
	Updated(ResourceKey),
	Removed(ResourceKey),
	/// A delete for a key that was not present. Deletes are idempotent.
	Noop(ResourceKey),
}

impl StoreChange {
	pub fn key(&self) -> &ResourceKey {
		match self {
			StoreChange::Inserted(key)
			| StoreChange::Updated(key)
			| StoreChange::Removed(key)
			| StoreChange::Noop(key) => key,
		}
	}
}

/// The authoritative in-memory set of currently-known resources.
///
/// Single-writer: only the stream connection applies events. Everything
/// handed out is an owned copy.
#[derive(Debug, Default)]
pub struct ResourceStore {
	records: HashMap<String, ResourceRecord>,
	/// First-seen order of live keys, so snapshots render stably.
	order: Vec<String>,
}

impl ResourceStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Applies one event in arrival order.
	pub fn apply(&mut self, event: ResourceEvent) -> StoreChange {
		self.apply_at(event, Utc::now())
	}

	/// [`ResourceStore::apply`] with an explicit observation instant, so
	/// age derivation is deterministic in tests.
	pub fn apply_at(&mut self, event: ResourceEvent, now: DateTime<Utc>) -> StoreChange {
		let key = event.key.clone();
		let encoded = key.encoded();

		if event.verb == EventVerb::Deleted {
			if self.records.remove(&encoded).is_some() {
				self.order.retain(|live| live != &encoded);
				StoreChange::Removed(key)
			} else {
				StoreChange::Noop(key)
			}
		} else if let Some(existing) = self.records.get_mut(&encoded) {
			existing.merge_event(event, now);
			StoreChange::Updated(key)
		} else {
			self.order.push(encoded.clone());
			self.records
				.insert(encoded, ResourceRecord::from_event(event, now));
			StoreChange::Inserted(key)
		}
	}

	pub fn get(&self, key: &ResourceKey) -> Option<&ResourceRecord> {
		self.records.get(&key.encoded())
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Drops everything. Used by the connection layer when a fresh stream
	/// resyncs the full server state; presentation code never calls this.
	pub fn clear(&mut self) {
		self.records.clear();
		self.order.clear();
	}

	/// Owned copy of all current records, in first-seen order.
	pub fn snapshot(&self) -> Vec<ResourceRecord> {
		self.order
			.iter()
			.filter_map(|encoded| self.records.get(encoded))
			.cloned()
			.collect()
	}

	/// Snapshot minus resources whose name starts with any given prefix.
	pub fn filter_by_system_prefix(&self, prefixes: &[&str]) -> Vec<ResourceRecord> {
		self.snapshot()
			.into_iter()
			.filter(|record| !is_system_resource(&record.key.name, prefixes))
			.collect()
	}
}

/// True iff `name` starts with any of the given prefixes.
pub fn is_system_resource(name: &str, prefixes: &[&str]) -> bool {
	prefixes.iter().any(|prefix| name.starts_with(prefix))
}
