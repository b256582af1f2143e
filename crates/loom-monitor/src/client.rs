// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Monitoring client: owns the reconciliation store and its stream.

use std::sync::Arc;

use loom_monitor_core::{ResourceRecord, ResourceStore};
use tokio::sync::{watch, RwLock};
use url::Url;

use crate::config::StreamConfig;
use crate::connection::{ConnectionStatus, SharedStore, StreamConnection};
use crate::error::{Result, StreamError};

/// Client for the live resource monitoring stream.
///
/// Construct via [`MonitorClient::builder`], then [`start`] the stream.
/// Consumers read owned snapshots or subscribe to the `watch` channels;
/// nothing outside the stream task can mutate the store.
///
/// [`start`]: MonitorClient::start
#[derive(Debug)]
pub struct MonitorClient {
	stream_url: Url,
	token: Option<String>,
	config: StreamConfig,
	store: SharedStore,
	connection: StreamConnection,
}

impl MonitorClient {
	pub fn builder() -> MonitorClientBuilder {
		MonitorClientBuilder::new()
	}

	/// Connects and begins reconciling the event stream in the background.
	pub async fn start(&mut self) -> Result<()> {
		self.connection
			.start(
				self.stream_url.as_str().to_string(),
				self.token.clone(),
				Arc::clone(&self.store),
				self.config.clone(),
			)
			.await
	}

	/// Tears the stream down. No reconnects happen after this returns.
	pub async fn stop(&mut self) {
		self.connection.stop().await;
	}

	/// Owned copy of the current reconciled state, in first-seen order.
	pub async fn snapshot(&self) -> Vec<ResourceRecord> {
		self.store.read().await.snapshot()
	}

	/// Current state minus platform-internal resources.
	pub async fn filtered_snapshot(&self, prefixes: &[&str]) -> Vec<ResourceRecord> {
		self.store.read().await.filter_by_system_prefix(prefixes)
	}

	/// Watches reconciled snapshots; a new value arrives per applied event.
	pub fn subscribe(&self) -> watch::Receiver<Vec<ResourceRecord>> {
		self.connection.subscribe()
	}

	/// Watches the connection status.
	pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
		self.connection.status()
	}

	/// Returns true while the transport is established.
	pub fn is_connected(&self) -> bool {
		self.connection.is_connected()
	}

	/// Returns the number of frames received since `start`.
	pub fn events_received(&self) -> u64 {
		self.connection.events_received()
	}

	/// Returns the number of reconnection attempts since `start`.
	pub fn reconnect_attempts(&self) -> u64 {
		self.connection.reconnect_attempts()
	}
}

/// Builder for [`MonitorClient`].
#[derive(Debug, Default)]
pub struct MonitorClientBuilder {
	stream_url: Option<String>,
	token: Option<String>,
	config: StreamConfig,
}

impl MonitorClientBuilder {
	pub fn new() -> Self {
		Self {
			stream_url: None,
			token: None,
			config: StreamConfig::default(),
		}
	}

	/// The stream endpoint. `http`/`https` URLs are rewritten to
	/// `ws`/`wss`.
	pub fn stream_url(mut self, url: impl Into<String>) -> Self {
		self.stream_url = Some(url.into());
		self
	}

	/// Bearer token attached to the websocket handshake.
	pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Overrides the reconnect tuning.
	pub fn config(mut self, config: StreamConfig) -> Self {
		self.config = config;
		self
	}

	pub fn build(self) -> Result<MonitorClient> {
		let raw = self.stream_url.ok_or(StreamError::MissingUrl)?;
		let mut stream_url = Url::parse(&raw)?;
		match stream_url.scheme() {
			"http" => stream_url.set_scheme("ws").unwrap(),
			"https" => stream_url.set_scheme("wss").unwrap(),
			"ws" | "wss" => {}
			other => return Err(StreamError::UnsupportedScheme(other.to_string())),
		}

		Ok(MonitorClient {
			stream_url,
			token: self.token,
			config: self.config,
			store: Arc::new(RwLock::new(ResourceStore::new())),
			connection: StreamConnection::new(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_build_requires_url() {
		let err = MonitorClient::builder().build().unwrap_err();
		assert!(matches!(err, StreamError::MissingUrl));
	}

	#[test]
	fn test_http_scheme_rewrites_to_ws() {
		let client = MonitorClient::builder()
			.stream_url("https://loom.example.com/api/monitor/stream")
			.build()
			.unwrap();
		assert_eq!(client.stream_url.scheme(), "wss");
	}

	#[test]
	fn test_ws_scheme_passes_through() {
		let client = MonitorClient::builder()
			.stream_url("ws://127.0.0.1:9000/stream")
			.build()
			.unwrap();
		assert_eq!(client.stream_url.scheme(), "ws");
	}

	#[test]
	fn test_unsupported_scheme_is_rejected() {
		let err = MonitorClient::builder()
			.stream_url("ftp://example.com/stream")
			.build()
			.unwrap_err();
		assert!(matches!(err, StreamError::UnsupportedScheme(_)));
	}

	#[tokio::test]
	async fn test_fresh_client_has_empty_snapshot() {
		let client = MonitorClient::builder()
			.stream_url("ws://127.0.0.1:9000/stream")
			.build()
			.unwrap();
		assert!(client.snapshot().await.is_empty());
		assert!(!client.is_connected());
	}
}
