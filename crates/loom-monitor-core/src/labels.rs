// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Display filtering for Kubernetes label maps.

use std::collections::BTreeMap;

/// Label keys injected by controllers. Noise in a user-facing listing.
pub const SYSTEM_LABEL_KEYS: &[&str] = &[
	"pod-template-hash",
	"controller-revision-hash",
	"job-name",
	"controller-uid",
	"batch.kubernetes.io/job-name",
	"batch.kubernetes.io/controller-uid",
	"statefulset.kubernetes.io/pod-name",
];

/// Returns the labels worth showing to a user, in the map's iteration order.
///
/// The full filtered set is returned; truncating to the first few entries
/// for display is the presentation layer's concern.
pub fn filter_display_labels(labels: &BTreeMap<String, String>) -> Vec<(&str, &str)> {
	labels
		.iter()
		.filter(|(key, _)| !SYSTEM_LABEL_KEYS.contains(&key.as_str()))
		.map(|(key, value)| (key.as_str(), value.as_str()))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn labels(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
		entries
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn test_system_labels_are_dropped() {
		let labels = labels(&[("app", "foo"), ("pod-template-hash", "abc123")]);
		let shown = filter_display_labels(&labels);
		assert_eq!(shown, vec![("app", "foo")]);
	}

	#[test]
	fn test_prefixed_system_labels_are_dropped() {
		let labels = labels(&[
			("app", "worker"),
			("batch.kubernetes.io/job-name", "backup-123"),
			("controller-uid", "deadbeef"),
			("job-name", "backup-123"),
		]);
		let shown = filter_display_labels(&labels);
		assert_eq!(shown, vec![("app", "worker")]);
	}

	#[test]
	fn test_user_labels_pass_through_in_order() {
		let labels = labels(&[("tier", "backend"), ("app", "api"), ("env", "prod")]);
		let shown = filter_display_labels(&labels);
		assert_eq!(
			shown,
			vec![("app", "api"), ("env", "prod"), ("tier", "backend")]
		);
	}

	#[test]
	fn test_empty_map_yields_empty_set() {
		assert!(filter_display_labels(&BTreeMap::new()).is_empty());
	}
}
