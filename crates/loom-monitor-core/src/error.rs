// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for event normalization.
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors raised while turning a raw stream frame into a validated event.
///
/// A frame that fails here is dropped by the caller; it never reaches the
/// reconciliation store.
#[derive(Debug, Error)]
pub enum EventError {
	#[error("malformed frame: {0}")]
	MalformedFrame(#[from] serde_json::Error),

	#[error("missing required field: {0}")]
	MissingField(&'static str),
}
