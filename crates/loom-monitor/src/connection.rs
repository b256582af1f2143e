// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Websocket connection management for the resource event stream.
//!
//! One [`StreamConnection`] owns one logical stream. A background task
//! holds the socket and is the sole writer to the shared store; consumers
//! observe `watch` channels carrying the connection status and the latest
//! reconciled snapshot. On unexpected closure the task reconnects with
//! capped exponential backoff, and a fresh connection resyncs the store
//! from the server's replayed state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use loom_monitor_core::{ResourceEvent, ResourceRecord, ResourceStore};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};

/// Reconciliation store shared between the stream task and consumers.
pub type SharedStore = Arc<RwLock<ResourceStore>>;

/// Connection lifecycle as observed by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
	/// No connection has been attempted yet.
	Idle,
	/// Socket created, handshake in flight.
	Connecting,
	/// Transport established, frames flowing.
	Open,
	/// A session ended; a reconnect is pending.
	Reconnecting,
	/// Stopped explicitly, or reconnect attempts are exhausted.
	Disconnected,
}

/// Manages the websocket connection feeding the reconciliation store.
#[derive(Debug)]
pub struct StreamConnection {
	status_tx: Arc<watch::Sender<ConnectionStatus>>,
	snapshot_tx: Arc<watch::Sender<Vec<ResourceRecord>>>,
	/// Number of reconnection attempts.
	reconnect_attempts: Arc<AtomicU64>,
	/// Number of frames received.
	events_received: Arc<AtomicU64>,
	/// Handle to the background task.
	task_handle: Option<JoinHandle<()>>,
	/// Channel to signal shutdown.
	shutdown_tx: Option<mpsc::Sender<()>>,
}

impl StreamConnection {
	/// Creates a new, idle connection manager.
	pub fn new() -> Self {
		let (status_tx, _) = watch::channel(ConnectionStatus::Idle);
		let (snapshot_tx, _) = watch::channel(Vec::new());
		Self {
			status_tx: Arc::new(status_tx),
			snapshot_tx: Arc::new(snapshot_tx),
			reconnect_attempts: Arc::new(AtomicU64::new(0)),
			events_received: Arc::new(AtomicU64::new(0)),
			task_handle: None,
			shutdown_tx: None,
		}
	}

	/// Starts the stream in a background task.
	///
	/// The task reconnects automatically on failure per `config`. Calling
	/// `start` on a running manager stops the previous task first, so two
	/// sockets can never race each other.
	pub async fn start(
		&mut self,
		stream_url: String,
		token: Option<String>,
		store: SharedStore,
		config: StreamConfig,
	) -> Result<()> {
		self.stop().await;

		let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
		self.shutdown_tx = Some(shutdown_tx);

		let status_tx = Arc::clone(&self.status_tx);
		let snapshot_tx = Arc::clone(&self.snapshot_tx);
		let reconnect_attempts = Arc::clone(&self.reconnect_attempts);
		let events_received = Arc::clone(&self.events_received);

		let handle = tokio::spawn(async move {
			run_stream_loop(
				stream_url,
				token,
				store,
				config,
				status_tx,
				snapshot_tx,
				reconnect_attempts,
				events_received,
				shutdown_rx,
			)
			.await;
		});

		self.task_handle = Some(handle);
		Ok(())
	}

	/// Stops the stream. No further reconnect attempts happen after this
	/// returns; a subsequent `start` opens a fresh stream.
	pub async fn stop(&mut self) {
		if let Some(tx) = self.shutdown_tx.take() {
			let _ = tx.send(()).await;
		}
		if let Some(handle) = self.task_handle.take() {
			handle.abort();
			let _ = handle.await;
			self.status_tx.send_replace(ConnectionStatus::Disconnected);
		}
	}

	/// Watches the connection status.
	pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
		self.status_tx.subscribe()
	}

	/// Watches reconciled snapshots. Each applied event publishes the full
	/// current state; receivers always observe a complete view.
	pub fn subscribe(&self) -> watch::Receiver<Vec<ResourceRecord>> {
		self.snapshot_tx.subscribe()
	}

	/// Returns true while the transport is established.
	pub fn is_connected(&self) -> bool {
		*self.status_tx.borrow() == ConnectionStatus::Open
	}

	/// Returns the number of reconnection attempts since `start`.
	pub fn reconnect_attempts(&self) -> u64 {
		self.reconnect_attempts.load(Ordering::SeqCst)
	}

	/// Returns the number of frames received since `start`.
	pub fn events_received(&self) -> u64 {
		self.events_received.load(Ordering::SeqCst)
	}
}

impl Default for StreamConnection {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for StreamConnection {
	fn drop(&mut self) {
		if let Some(handle) = self.task_handle.take() {
			handle.abort();
		}
	}
}

/// How one connected session ended.
enum SessionEnd {
	/// Server closed the stream or the transport dried up.
	Closed,
	/// Explicit teardown requested.
	Shutdown,
}

/// Runs the connect/process/reconnect loop until shutdown or exhaustion.
#[allow(clippy::too_many_arguments)]
async fn run_stream_loop(
	stream_url: String,
	token: Option<String>,
	store: SharedStore,
	config: StreamConfig,
	status_tx: Arc<watch::Sender<ConnectionStatus>>,
	snapshot_tx: Arc<watch::Sender<Vec<ResourceRecord>>>,
	reconnect_attempts: Arc<AtomicU64>,
	events_received: Arc<AtomicU64>,
	mut shutdown_rx: mpsc::Receiver<()>,
) {
	let mut consecutive_failures: u32 = 0;

	loop {
		if shutdown_rx.try_recv().is_ok() {
			info!("stream connection received shutdown signal");
			break;
		}

		status_tx.send_replace(ConnectionStatus::Connecting);
		info!(url = %stream_url, "connecting to resource event stream");

		match connect_and_process(
			&stream_url,
			token.as_deref(),
			&store,
			&status_tx,
			&snapshot_tx,
			&events_received,
			&mut shutdown_rx,
		)
		.await
		{
			Ok(SessionEnd::Shutdown) => {
				info!("stream connection received shutdown signal");
				break;
			}
			Ok(SessionEnd::Closed) => {
				// Normal disconnect (e.g., server closed the stream).
				debug!("resource event stream ended normally");
				consecutive_failures = 0;
			}
			Err(e) => {
				error!(error = %e, "resource event stream connection error");
				consecutive_failures += 1;
			}
		}

		status_tx.send_replace(ConnectionStatus::Reconnecting);

		if config.max_reconnect_attempts > 0
			&& consecutive_failures >= config.max_reconnect_attempts
		{
			error!(
				attempts = consecutive_failures,
				"max reconnection attempts reached, giving up on stream"
			);
			break;
		}

		let delay = config.backoff_delay(consecutive_failures);
		reconnect_attempts.fetch_add(1, Ordering::SeqCst);
		warn!(
			delay_ms = delay.as_millis() as u64,
			attempts = consecutive_failures,
			"reconnecting to resource event stream"
		);

		tokio::select! {
			_ = tokio::time::sleep(delay) => {}
			_ = shutdown_rx.recv() => {
				info!("stream connection received shutdown signal during reconnect wait");
				break;
			}
		}
	}

	status_tx.send_replace(ConnectionStatus::Disconnected);
}

/// Connects and processes frames until disconnection or shutdown.
async fn connect_and_process(
	stream_url: &str,
	token: Option<&str>,
	store: &SharedStore,
	status_tx: &watch::Sender<ConnectionStatus>,
	snapshot_tx: &watch::Sender<Vec<ResourceRecord>>,
	events_received: &AtomicU64,
	shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<SessionEnd> {
	let mut request = stream_url.into_client_request()?;
	if let Some(token) = token {
		let auth_value = format!("Bearer {token}")
			.parse()
			.map_err(|_| StreamError::InvalidToken)?;
		request.headers_mut().insert("Authorization", auth_value);
	}

	let (mut ws_stream, _) = connect_async(request).await?;

	status_tx.send_replace(ConnectionStatus::Open);
	info!("resource event stream established");

	// A fresh connection is a full resync: the server replays current
	// state, so anything remembered from a previous session is stale.
	{
		let mut store = store.write().await;
		store.clear();
		snapshot_tx.send_replace(store.snapshot());
	}

	loop {
		let message = tokio::select! {
			message = ws_stream.next() => message,
			_ = shutdown_rx.recv() => {
				let _ = ws_stream.close(None).await;
				return Ok(SessionEnd::Shutdown);
			}
		};

		let Some(message) = message else {
			break;
		};

		match message? {
			Message::Text(frame) => {
				events_received.fetch_add(1, Ordering::SeqCst);
				apply_frame(&frame, store, snapshot_tx).await;
			}
			Message::Ping(payload) => {
				ws_stream.send(Message::Pong(payload)).await?;
			}
			Message::Close(_) => break,
			_ => {
				debug!("ignoring non-text frame");
			}
		}
	}

	Ok(SessionEnd::Closed)
}

/// Parses and applies one frame, publishing the updated snapshot.
///
/// A frame carries either a single JSON event or several, newline
/// delimited; lines are applied in order. A line that fails to parse or
/// validate is logged and dropped; the connection and the store are
/// unaffected.
async fn apply_frame(
	frame: &str,
	store: &SharedStore,
	snapshot_tx: &watch::Sender<Vec<ResourceRecord>>,
) {
	for line in frame.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let event = match ResourceEvent::parse(line) {
			Ok(event) => event,
			Err(e) => {
				warn!(error = %e, "dropping malformed stream frame");
				continue;
			}
		};

		let mut store = store.write().await;
		let change = store.apply(event);
		debug!(change = ?change, total = store.len(), "applied stream event");
		snapshot_tx.send_replace(store.snapshot());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_initial_state() {
		let conn = StreamConnection::new();
		assert!(!conn.is_connected());
		assert_eq!(*conn.status().borrow(), ConnectionStatus::Idle);
		assert_eq!(conn.reconnect_attempts(), 0);
		assert_eq!(conn.events_received(), 0);
		assert!(conn.subscribe().borrow().is_empty());
	}

	#[tokio::test]
	async fn test_stop_before_start_is_a_noop() {
		let mut conn = StreamConnection::new();
		conn.stop().await;
		assert_eq!(*conn.status().borrow(), ConnectionStatus::Idle);
	}

	#[tokio::test]
	async fn test_malformed_frame_leaves_store_untouched() {
		let store: SharedStore = Arc::new(RwLock::new(ResourceStore::new()));
		let (snapshot_tx, _) = watch::channel(Vec::new());

		apply_frame("not json", &store, &snapshot_tx).await;
		apply_frame(r#"{"type":"Added","kind":"Pod","ns":"default"}"#, &store, &snapshot_tx)
			.await;

		assert!(store.read().await.is_empty());
	}

	#[tokio::test]
	async fn test_apply_frame_publishes_snapshot() {
		let store: SharedStore = Arc::new(RwLock::new(ResourceStore::new()));
		let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());

		apply_frame(
			r#"{"type":"Added","kind":"Pod","name":"api-1","ns":"default","status":"Running"}"#,
			&store,
			&snapshot_tx,
		)
		.await;

		let snapshot = snapshot_rx.borrow();
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].key.name, "api-1");
	}

	#[tokio::test]
	async fn test_newline_delimited_frame_applies_each_line() {
		let store: SharedStore = Arc::new(RwLock::new(ResourceStore::new()));
		let (snapshot_tx, _) = watch::channel(Vec::new());

		let frame = concat!(
			r#"{"type":"Added","kind":"Pod","name":"api-1","ns":"default","status":"Pending"}"#,
			"\n",
			"not json\n",
			r#"{"type":"Modified","kind":"Pod","name":"api-1","ns":"default","status":"Running"}"#,
		);
		apply_frame(frame, &store, &snapshot_tx).await;

		let store = store.read().await;
		assert_eq!(store.len(), 1);
		let snapshot = store.snapshot();
		assert_eq!(snapshot[0].status.as_deref(), Some("Running"));
	}
}
