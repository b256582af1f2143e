// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wire-level event model for the cluster resource stream.
//!
//! The monitoring backend pushes one JSON object per websocket frame
//! describing a resource add, modification, or deletion. The raw shape is
//! loosely typed; everything entering the reconciliation store goes through
//! [`ResourceEvent::parse`], which validates the identity fields and sorts
//! kind-specific data into a tagged payload variant. A frame that fails
//! validation is rejected whole; a malformed event must never corrupt the
//! store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::EventError;

/// Kind recorded for events whose wire payload omits one.
pub const UNKNOWN_KIND: &str = "Unknown";

/// Event verb pushed by the server.
///
/// Parsing is case-insensitive. Verbs outside the standard set are
/// preserved verbatim in [`EventVerb::Other`] and treated as upserts: the
/// backend may introduce new verbs and the client must not assume a closed
/// set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventVerb {
	Added,
	Modified,
	Deleted,
	Other(String),
}

impl EventVerb {
	pub fn parse(raw: &str) -> Self {
		match raw.to_ascii_lowercase().as_str() {
			"added" => EventVerb::Added,
			"modified" => EventVerb::Modified,
			"deleted" => EventVerb::Deleted,
			_ => EventVerb::Other(raw.to_string()),
		}
	}

	/// Display text: canonical for the standard verbs, verbatim otherwise.
	pub fn as_str(&self) -> &str {
		match self {
			EventVerb::Added => "Added",
			EventVerb::Modified => "Modified",
			EventVerb::Deleted => "Deleted",
			EventVerb::Other(raw) => raw,
		}
	}

	/// True for every verb that upserts rather than removes.
	pub fn is_upsert(&self) -> bool {
		!matches!(self, EventVerb::Deleted)
	}
}

impl fmt::Display for EventVerb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for EventVerb {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for EventVerb {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Ok(EventVerb::parse(&raw))
	}
}

/// Identity of a tracked resource: `(kind, namespace, name)`.
///
/// The encoded form joins the parts with `/`, which cannot occur in a legal
/// Kubernetes object name, so encoded keys never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
	pub kind: String,
	pub namespace: String,
	pub name: String,
}

impl ResourceKey {
	pub fn new(
		kind: impl Into<String>,
		namespace: impl Into<String>,
		name: impl Into<String>,
	) -> Self {
		Self {
			kind: kind.into(),
			namespace: namespace.into(),
			name: name.into(),
		}
	}

	/// Encoded form used as the store's map key.
	pub fn encoded(&self) -> String {
		format!("{}/{}/{}", self.kind, self.namespace, self.name)
	}
}

impl fmt::Display for ResourceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
	}
}

/// Service-specific wire fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceData {
	#[serde(rename = "clusterIP", skip_serializing_if = "Option::is_none")]
	pub cluster_ip: Option<String>,
	#[serde(rename = "externalIP", skip_serializing_if = "Option::is_none")]
	pub external_ip: Option<String>,
	#[serde(rename = "externalIPs", default, skip_serializing_if = "Vec::is_empty")]
	pub external_ips: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub node_ports: Vec<u16>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub ports: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub service_type: Option<String>,
}

/// Workload-specific wire fields (pods, jobs, deployments, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadData {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub containers: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart_count: Option<u32>,
}

/// Kind-specific event data, tagged by family.
///
/// `Generic` is the open-world fallback: kinds the client has no special
/// handling for are still tracked and displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "camelCase")]
pub enum ResourcePayload {
	Service(ServiceData),
	Workload(WorkloadData),
	Generic,
}

impl ResourcePayload {
	pub fn as_service(&self) -> Option<&ServiceData> {
		match self {
			ResourcePayload::Service(data) => Some(data),
			_ => None,
		}
	}

	pub fn as_workload(&self) -> Option<&WorkloadData> {
		match self {
			ResourcePayload::Workload(data) => Some(data),
			_ => None,
		}
	}
}

/// Owner reference carried in event metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerReference {
	#[serde(default)]
	pub kind: String,
	#[serde(default)]
	pub name: String,
}

/// Subset of Kubernetes object metadata the monitor interprets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub creation_timestamp: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deletion_timestamp: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub labels: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub owner_references: Vec<OwnerReference>,
}

/// The wire shape exactly as the server sends it, before validation.
///
/// Every field except the identity pair is optional; unrecognized top-level
/// fields collect in `extra` so server additions survive the round trip.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
	#[serde(rename = "type")]
	pub verb: Option<String>,
	pub kind: Option<String>,
	pub name: Option<String>,
	pub ns: Option<String>,
	pub status: Option<String>,
	pub age: Option<String>,
	#[serde(rename = "clusterIP")]
	pub cluster_ip: Option<String>,
	#[serde(rename = "externalIP")]
	pub external_ip: Option<String>,
	#[serde(rename = "externalIPs", default)]
	pub external_ips: Vec<String>,
	#[serde(default)]
	pub node_ports: Vec<u16>,
	#[serde(default)]
	pub ports: Vec<String>,
	pub service_type: Option<String>,
	#[serde(default)]
	pub containers: Vec<String>,
	#[serde(default)]
	pub images: Vec<String>,
	pub restart_count: Option<u32>,
	#[serde(default)]
	pub metadata: EventMetadata,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// A validated stream event, ready for the reconciliation store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvent {
	pub verb: EventVerb,
	pub key: ResourceKey,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub age: Option<String>,
	pub metadata: EventMetadata,
	pub payload: ResourcePayload,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub extra: Map<String, Value>,
}

impl ResourceEvent {
	/// Parses and validates one stream frame.
	///
	/// ```
	/// use loom_monitor_core::{EventVerb, ResourceEvent};
	///
	/// let event = ResourceEvent::parse(
	/// 	r#"{"type":"Added","kind":"Pod","name":"api-1","ns":"default","status":"Running"}"#,
	/// )
	/// .unwrap();
	/// assert_eq!(event.verb, EventVerb::Added);
	/// assert_eq!(event.key.to_string(), "Pod/default/api-1");
	/// ```
	pub fn parse(frame: &str) -> Result<Self, EventError> {
		let raw: RawEvent = serde_json::from_str(frame)?;
		Self::from_wire(raw)
	}

	/// Validates a decoded wire event.
	///
	/// `name` and `ns` must be present and non-empty. A missing `kind`
	/// records as [`UNKNOWN_KIND`]; a missing verb is treated as an upsert.
	pub fn from_wire(raw: RawEvent) -> Result<Self, EventError> {
		let name = raw
			.name
			.filter(|name| !name.is_empty())
			.ok_or(EventError::MissingField("name"))?;
		let ns = raw
			.ns
			.filter(|ns| !ns.is_empty())
			.ok_or(EventError::MissingField("ns"))?;

		let kind = raw
			.kind
			.filter(|kind| !kind.is_empty())
			.unwrap_or_else(|| UNKNOWN_KIND.to_string());

		let payload = if kind.eq_ignore_ascii_case("service") {
			ResourcePayload::Service(ServiceData {
				cluster_ip: raw.cluster_ip,
				external_ip: raw.external_ip,
				external_ips: raw.external_ips,
				node_ports: raw.node_ports,
				ports: raw.ports,
				service_type: raw.service_type,
			})
		} else if !raw.containers.is_empty()
			|| !raw.images.is_empty()
			|| raw.restart_count.is_some()
		{
			ResourcePayload::Workload(WorkloadData {
				containers: raw.containers,
				images: raw.images,
				restart_count: raw.restart_count,
			})
		} else {
			ResourcePayload::Generic
		};

		Ok(Self {
			verb: EventVerb::parse(raw.verb.as_deref().unwrap_or("")),
			key: ResourceKey::new(kind, ns, name),
			status: raw.status,
			age: raw.age,
			metadata: raw.metadata,
			payload,
			extra: raw.extra,
		})
	}

	/// True iff the metadata carries a non-null deletion timestamp.
	pub fn is_terminating(&self) -> bool {
		self.metadata.deletion_timestamp.is_some()
	}
}
