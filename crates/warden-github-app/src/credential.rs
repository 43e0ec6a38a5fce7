// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Duration, Utc};
use warden_common_config::SecretString;

/// A time-boxed access token bound to one installation.
///
/// Lives only in the daemon's memory; it is never written to the
/// StatusChannel.
#[derive(Debug, Clone)]
pub struct Credential {
	pub token: SecretString,
	pub expires_at: DateTime<Utc>,
	pub scope_id: i64,
}

impl Credential {
	pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
		now < self.expires_at
	}

	/// True once `now` is inside the safety margin before expiry.
	pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
		now >= self.expires_at - margin
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use warden_common_config::Secret;

	fn credential(expires_at: DateTime<Utc>) -> Credential {
		Credential {
			token: Secret::new("ghs_x".to_string()),
			expires_at,
			scope_id: 42,
		}
	}

	#[test]
	fn usable_strictly_before_expiry() {
		let now = Utc::now();
		let cred = credential(now + Duration::minutes(1));
		assert!(cred.is_usable_at(now));
		assert!(!cred.is_usable_at(cred.expires_at));
	}

	#[test]
	fn refresh_window_opens_at_margin() {
		let now = Utc::now();
		let cred = credential(now + Duration::minutes(10));
		assert!(!cred.needs_refresh_at(now, Duration::minutes(5)));
		assert!(cred.needs_refresh_at(now + Duration::minutes(5), Duration::minutes(5)));
	}
}
