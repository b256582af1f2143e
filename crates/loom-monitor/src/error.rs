// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors raised by the stream client.
///
/// Transport errors are contained in the reconnect loop and surface to
/// consumers only as a [`crate::ConnectionStatus`]; these variants are what
/// the loop itself handles, plus construction-time failures from the
/// builder.
#[derive(Debug, Error)]
pub enum StreamError {
	#[error("no stream URL configured")]
	MissingUrl,

	#[error("invalid stream URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	#[error("unsupported stream URL scheme: {0}")]
	UnsupportedScheme(String),

	#[error("invalid authorization token")]
	InvalidToken,

	#[error("websocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
