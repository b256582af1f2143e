// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Relative age formatting for resource listings.

use chrono::{DateTime, Utc};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Formats the elapsed time since `creation_timestamp` as the largest whole
/// unit, truncating: `{n}d`, `{n}h`, `{n}m`, or `{n}s`.
///
/// Absent or unparseable timestamps format as `"-"`. A timestamp in the
/// future (clock skew between the cluster and the viewer) clamps to `"0s"`.
///
/// The observation instant is a parameter so callers stay deterministic in
/// tests; production callers pass `Utc::now()`.
pub fn format_age(creation_timestamp: Option<&str>, now: DateTime<Utc>) -> String {
	let Some(raw) = creation_timestamp else {
		return "-".to_string();
	};

	let Ok(created) = DateTime::parse_from_rfc3339(raw) else {
		return "-".to_string();
	};

	let secs = now
		.signed_duration_since(created.with_timezone(&Utc))
		.num_seconds()
		.max(0);

	if secs >= SECS_PER_DAY {
		format!("{}d", secs / SECS_PER_DAY)
	} else if secs >= SECS_PER_HOUR {
		format!("{}h", secs / SECS_PER_HOUR)
	} else if secs >= SECS_PER_MINUTE {
		format!("{}m", secs / SECS_PER_MINUTE)
	} else {
		format!("{}s", secs)
	}
}
