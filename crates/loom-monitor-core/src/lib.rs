// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom cluster monitoring view.
//!
//! This crate provides the data plane of the live resource monitor: the
//! wire-level event model, the validating normalizer, the reconciliation
//! store that folds the event stream into a current-state view, and the
//! presentation contract the console renders from. The transport that
//! feeds it lives in `loom-monitor`.
//!
//! # Overview
//!
//! The monitoring backend pushes one JSON event per websocket frame. Each
//! frame is validated into a [`ResourceEvent`], applied to the
//! [`ResourceStore`] keyed by `(kind, namespace, name)` (upsert for
//! `Added`/`Modified` and any unknown verb, removal for `Deleted`), and
//! the resulting snapshot is handed to presentation code as owned data.
//!
//! # Example
//!
//! ```
//! use loom_monitor_core::{
//! 	build_rows, ColumnKey, ResourceEvent, ResourceStore, RowFilter,
//! };
//!
//! let mut store = ResourceStore::new();
//! let event = ResourceEvent::parse(
//! 	r#"{"type":"Added","kind":"Pod","name":"api-1","ns":"default","status":"Running"}"#,
//! )
//! .unwrap();
//! store.apply(event);
//!
//! let rows = build_rows(
//! 	&store.snapshot(),
//! 	&[ColumnKey::Name, ColumnKey::Status],
//! 	&RowFilter::none(),
//! );
//! assert_eq!(rows[0].cells, vec!["api-1", "Running"]);
//! ```

pub mod age;
pub mod error;
pub mod event;
pub mod labels;
pub mod store;
pub mod table;

pub use age::format_age;
pub use error::{EventError, Result};
pub use event::{
	EventMetadata, EventVerb, OwnerReference, RawEvent, ResourceEvent, ResourceKey,
	ResourcePayload, ServiceData, WorkloadData, UNKNOWN_KIND,
};
pub use labels::{filter_display_labels, SYSTEM_LABEL_KEYS};
pub use store::{
	is_system_resource, ExecTarget, ResourceRecord, ResourceStore, StoreChange,
	DEFAULT_SYSTEM_PREFIXES,
};
pub use table::{
	build_rows, endpoint_display, paginate, ColumnKey, Page, ResourceRow, RowFilter,
	MAX_DISPLAY_LABELS,
};
