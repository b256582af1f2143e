// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Integration tests driving the monitor client against an in-process
//! websocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use loom_monitor::{ConnectionStatus, MonitorClient, StreamConfig};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn bind() -> (TcpListener, String) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = format!("ws://{}", listener.local_addr().unwrap());
	(listener, url)
}

fn fast_config() -> StreamConfig {
	StreamConfig {
		reconnect_base_delay: Duration::from_millis(20),
		reconnect_max_delay: Duration::from_millis(100),
		max_reconnect_attempts: 0,
		jitter: false,
	}
}

fn client(url: &str) -> MonitorClient {
	MonitorClient::builder()
		.stream_url(url)
		.config(fast_config())
		.build()
		.unwrap()
}

fn added(kind: &str, name: &str, status: &str) -> Message {
	Message::Text(format!(
		r#"{{"type":"Added","kind":"{kind}","name":"{name}","ns":"default","status":"{status}"}}"#
	))
}

#[tokio::test]
async fn test_stream_reconciles_events_in_arrival_order() {
	let (listener, url) = bind().await;
	let mut client = client(&url);
	let mut snapshots = client.subscribe();
	client.start().await.unwrap();

	let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
	let mut ws = accept_async(stream).await.unwrap();

	ws.send(added("Pod", "api-1", "Pending")).await.unwrap();
	ws.send(Message::Text("not json".to_string())).await.unwrap();
	ws.send(Message::Text(
		r#"{"type":"Modified","kind":"Pod","name":"api-1","ns":"default","status":"Running"}"#
			.to_string(),
	))
	.await
	.unwrap();

	timeout(
		WAIT,
		snapshots.wait_for(|snapshot| {
			snapshot
				.iter()
				.any(|record| record.status.as_deref() == Some("Running"))
		}),
	)
	.await
	.unwrap()
	.unwrap();

	let snapshot = client.snapshot().await;
	assert_eq!(snapshot.len(), 1);
	assert_eq!(snapshot[0].key.to_string(), "Pod/default/api-1");
	assert_eq!(snapshot[0].status.as_deref(), Some("Running"));

	client.stop().await;
	let _ = ws.next().await;
}

#[tokio::test]
async fn test_deleted_event_removes_record() {
	let (listener, url) = bind().await;
	let mut client = client(&url);
	let mut snapshots = client.subscribe();
	client.start().await.unwrap();

	let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
	let mut ws = accept_async(stream).await.unwrap();

	ws.send(added("Pod", "api-1", "Running")).await.unwrap();
	ws.send(added("Pod", "api-2", "Running")).await.unwrap();
	ws.send(Message::Text(
		r#"{"type":"Deleted","kind":"Pod","name":"api-1","ns":"default"}"#.to_string(),
	))
	.await
	.unwrap();

	timeout(
		WAIT,
		snapshots.wait_for(|snapshot| {
			snapshot.len() == 1 && snapshot[0].key.name == "api-2"
		}),
	)
	.await
	.unwrap()
	.unwrap();

	client.stop().await;
	let _ = ws.next().await;
}

#[tokio::test]
async fn test_reconnect_resyncs_the_store() {
	let (listener, url) = bind().await;
	let mut client = client(&url);
	let mut snapshots = client.subscribe();
	client.start().await.unwrap();

	// First session: one pod, then a clean server-side close.
	let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
	let mut ws = accept_async(stream).await.unwrap();
	ws.send(added("Pod", "old-pod", "Running")).await.unwrap();
	timeout(
		WAIT,
		snapshots.wait_for(|snapshot| {
			snapshot.iter().any(|record| record.key.name == "old-pod")
		}),
	)
	.await
	.unwrap()
	.unwrap();
	ws.close(None).await.unwrap();

	// Second session: the server replays its (changed) state.
	let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
	let mut ws = accept_async(stream).await.unwrap();
	ws.send(added("Pod", "new-pod", "Running")).await.unwrap();

	timeout(
		WAIT,
		snapshots.wait_for(|snapshot| {
			snapshot.iter().any(|record| record.key.name == "new-pod")
				&& !snapshot.iter().any(|record| record.key.name == "old-pod")
		}),
	)
	.await
	.unwrap()
	.unwrap();

	assert!(client.reconnect_attempts() >= 1);

	client.stop().await;
	let _ = ws.next().await;
}

#[tokio::test]
async fn test_stop_suppresses_reconnect() {
	let (listener, url) = bind().await;
	let mut client = client(&url);
	let mut snapshots = client.subscribe();
	let mut status = client.status();
	client.start().await.unwrap();

	let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
	let mut ws = accept_async(stream).await.unwrap();
	timeout(WAIT, status.wait_for(|s| *s == ConnectionStatus::Open))
		.await
		.unwrap()
		.unwrap();

	ws.send(added("Pod", "api-1", "Running")).await.unwrap();
	timeout(WAIT, snapshots.wait_for(|snapshot| snapshot.len() == 1))
		.await
		.unwrap()
		.unwrap();

	client.stop().await;
	timeout(WAIT, status.wait_for(|s| *s == ConnectionStatus::Disconnected))
		.await
		.unwrap()
		.unwrap();

	// The reconnect loop is gone: nobody dials the listener again.
	let reconnect = timeout(Duration::from_millis(300), listener.accept()).await;
	assert!(reconnect.is_err());
	assert!(!client.is_connected());
}

#[tokio::test]
async fn test_retry_exhaustion_surfaces_permanent_failure() {
	// Grab a port with nothing listening on it.
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = format!("ws://{}", listener.local_addr().unwrap());
	drop(listener);

	let mut client = MonitorClient::builder()
		.stream_url(&url)
		.config(StreamConfig {
			reconnect_base_delay: Duration::from_millis(10),
			reconnect_max_delay: Duration::from_millis(50),
			max_reconnect_attempts: 2,
			jitter: false,
		})
		.build()
		.unwrap();
	let mut status = client.status();
	client.start().await.unwrap();

	timeout(WAIT, status.wait_for(|s| *s == ConnectionStatus::Disconnected))
		.await
		.unwrap()
		.unwrap();

	assert!(client.reconnect_attempts() >= 1);
	assert!(!client.is_connected());
	assert!(client.snapshot().await.is_empty());
}
