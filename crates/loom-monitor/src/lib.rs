// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster resource stream client for the Loom monitoring view.
//!
//! This crate provides the transport plane of the live resource monitor: a
//! websocket client that consumes the backend's resource event stream,
//! feeds it through the `loom-monitor-core` reconciliation store, and
//! publishes immutable snapshots plus a connection status to subscribers.
//!
//! # Features
//!
//! - **Reconciled snapshots**: every frame is validated and folded into a
//!   current-state view keyed by `(kind, namespace, name)`
//! - **Automatic reconnection**: capped exponential backoff with jitter
//! - **Explicit lifecycle**: owned, injectable connection with no ambient
//!   global socket; `stop()` suppresses all further reconnects
//! - **Contained failures**: malformed frames and transport errors never
//!   reach subscribers, who only ever observe a status enum and data
//!
//! # Example
//!
//! ```ignore
//! use loom_monitor::{ConnectionStatus, MonitorClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = MonitorClient::builder()
//!         .stream_url("wss://loom.example.com/api/monitor/stream")
//!         .bearer_token("loom_session_xxx")
//!         .build()?;
//!
//!     let mut snapshots = client.subscribe();
//!     client.start().await?;
//!
//!     while snapshots.changed().await.is_ok() {
//!         for record in snapshots.borrow().iter() {
//!             println!("{} {}", record.key, record.display_age);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod connection;
mod error;

pub use client::{MonitorClient, MonitorClientBuilder};
pub use config::StreamConfig;
pub use connection::{ConnectionStatus, SharedStore, StreamConnection};
pub use error::{Result, StreamError};

// Re-export core types for convenience
pub use loom_monitor_core::{
	build_rows, paginate, ColumnKey, EventVerb, Page, ResourceEvent, ResourceKey,
	ResourceRecord, ResourceRow, ResourceStore, RowFilter, StoreChange,
	DEFAULT_SYSTEM_PREFIXES,
};
