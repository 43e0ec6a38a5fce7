// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Self-reported daemon state.
///
/// `Error` means the last refresh attempt failed; the daemon is still
/// scheduling ticks. Only `Stopped` means the process has exited on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
	Running,
	Stopped,
	Error,
}

impl DaemonState {
	pub fn as_str(&self) -> &'static str {
		match self {
			DaemonState::Running => "running",
			DaemonState::Stopped => "stopped",
			DaemonState::Error => "error",
		}
	}
}

impl std::fmt::Display for DaemonState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The status record. Serialized with camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStatus {
	pub pid: u32,
	pub start_time: DateTime<Utc>,
	pub status: DaemonState,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_refresh: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_refresh: Option<DateTime<Utc>>,
	#[serde(default)]
	pub refresh_count: u64,
	/// Lets readers judge staleness without access to the daemon config.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_interval_minutes: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
}

impl DaemonStatus {
	/// The placeholder written before the first tick completes.
	pub fn starting(pid: u32, start_time: DateTime<Utc>, refresh_interval_minutes: u64) -> Self {
		Self {
			pid,
			start_time,
			status: DaemonState::Running,
			last_refresh: None,
			next_refresh: None,
			refresh_count: 0,
			refresh_interval_minutes: Some(refresh_interval_minutes),
			last_error: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_with_camel_case_keys() {
		let start = "2026-10-16T08:00:00Z".parse().unwrap();
		let mut status = DaemonStatus::starting(4242, start, 30);
		status.refresh_count = 3;

		let json = serde_json::to_value(&status).unwrap();
		assert_eq!(json["pid"], 4242);
		assert_eq!(json["status"], "running");
		assert_eq!(json["refreshCount"], 3);
		assert_eq!(json["startTime"], "2026-10-16T08:00:00Z");
		assert!(json.get("lastRefresh").is_none());
	}

	#[test]
	fn parses_minimal_record() {
		let raw = r#"{"pid":7,"startTime":"2026-10-16T08:00:00Z","status":"stopped"}"#;
		let status: DaemonStatus = serde_json::from_str(raw).unwrap();
		assert_eq!(status.status, DaemonState::Stopped);
		assert_eq!(status.refresh_count, 0);
		assert!(status.next_refresh.is_none());
	}

	#[test]
	fn rejects_unknown_state() {
		let raw = r#"{"pid":7,"startTime":"2026-10-16T08:00:00Z","status":"sleeping"}"#;
		assert!(serde_json::from_str::<DaemonStatus>(raw).is_err());
	}
}
