// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Stream connection tuning.

use std::time::Duration;

/// Configuration for websocket reconnection behavior.
#[derive(Debug, Clone)]
pub struct StreamConfig {
	/// Base delay for reconnection attempts.
	pub reconnect_base_delay: Duration,
	/// Maximum delay for reconnection attempts.
	pub reconnect_max_delay: Duration,
	/// Maximum number of consecutive failed attempts (0 = unlimited).
	pub max_reconnect_attempts: u32,
	/// Whether to randomize each delay, so a fleet of clients does not
	/// hammer a recovering backend in lockstep.
	pub jitter: bool,
}

impl Default for StreamConfig {
	fn default() -> Self {
		Self {
			reconnect_base_delay: Duration::from_secs(1),
			reconnect_max_delay: Duration::from_secs(30),
			max_reconnect_attempts: 0, // Unlimited
			jitter: true,
		}
	}
}

impl StreamConfig {
	/// Delay before the next attempt after `consecutive_failures` failures.
	///
	/// Exponential in the failure count, capped at `reconnect_max_delay`.
	/// With jitter enabled the capped delay is scaled by a random factor
	/// in `[0.5, 1.0]`.
	pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
		let factor = 2u64.saturating_pow(consecutive_failures.min(10));
		let base_ms = self.reconnect_base_delay.as_millis() as u64;
		let capped_ms = base_ms
			.saturating_mul(factor)
			.min(self.reconnect_max_delay.as_millis() as u64);

		let delay_ms = if self.jitter {
			capped_ms / 2 + fastrand::u64(0..=capped_ms / 2)
		} else {
			capped_ms
		};

		Duration::from_millis(delay_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn no_jitter() -> StreamConfig {
		StreamConfig {
			jitter: false,
			..StreamConfig::default()
		}
	}

	#[test]
	fn test_defaults() {
		let config = StreamConfig::default();
		assert_eq!(config.reconnect_base_delay, Duration::from_secs(1));
		assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
		assert_eq!(config.max_reconnect_attempts, 0);
		assert!(config.jitter);
	}

	#[test]
	fn test_backoff_doubles_per_failure() {
		let config = no_jitter();
		assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
		assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
		assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
		assert_eq!(config.backoff_delay(3), Duration::from_secs(8));
	}

	#[test]
	fn test_backoff_caps_at_max_delay() {
		let config = no_jitter();
		assert_eq!(config.backoff_delay(5), Duration::from_secs(30));
		assert_eq!(config.backoff_delay(40), Duration::from_secs(30));
	}

	#[test]
	fn test_jitter_stays_within_bounds() {
		let config = StreamConfig::default();
		for failures in 0..6 {
			let capped = no_jitter().backoff_delay(failures);
			for _ in 0..100 {
				let delay = config.backoff_delay(failures);
				assert!(delay >= capped / 2, "{delay:?} below {capped:?}/2");
				assert!(delay <= capped, "{delay:?} above {capped:?}");
			}
		}
	}
}
