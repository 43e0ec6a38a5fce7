// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use warden_status::{DaemonState, DaemonStatus};

use crate::config::DEFAULT_REFRESH_INTERVAL_MINUTES;

/// `warning` fires once the last refresh is this many intervals old.
pub const STALENESS_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthState {
	Healthy,
	Warning,
	Error,
	Stopped,
	DeadProcess,
	Unknown,
}

impl HealthState {
	pub fn as_str(&self) -> &'static str {
		match self {
			HealthState::Healthy => "healthy",
			HealthState::Warning => "warning",
			HealthState::Error => "error",
			HealthState::Stopped => "stopped",
			HealthState::DeadProcess => "dead-process",
			HealthState::Unknown => "unknown",
		}
	}

	/// Whether the daemon is still doing its job. `warning` counts.
	pub fn is_ok(&self) -> bool {
		matches!(self, HealthState::Healthy | HealthState::Warning)
	}
}

impl std::fmt::Display for HealthState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
	pub health: HealthState,
	pub detail: String,
}

impl HealthReport {
	fn new(health: HealthState, detail: impl Into<String>) -> Self {
		Self {
			health,
			detail: detail.into(),
		}
	}
}

/// Classify daemon health from its status record and an OS liveness probe.
///
/// A stopped record wins over liveness; a dead pid wins over the recorded
/// state; staleness is measured from the last successful refresh, or from
/// start when there has been none.
pub fn classify_health(status: Option<&DaemonStatus>, alive: bool, now: DateTime<Utc>) -> HealthReport {
	let Some(status) = status else {
		return HealthReport::new(HealthState::Unknown, "No daemon status recorded");
	};

	if status.status == DaemonState::Stopped {
		return HealthReport::new(HealthState::Stopped, "Daemon has stopped");
	}
	if !alive {
		return HealthReport::new(
			HealthState::DeadProcess,
			format!("Process {} is not running but status is {}", status.pid, status.status),
		);
	}
	if status.status == DaemonState::Error {
		let reason = status.last_error.as_deref().unwrap_or("unknown error");
		return HealthReport::new(HealthState::Error, format!("Last refresh failed: {reason}"));
	}

	let interval_minutes = status
		.refresh_interval_minutes
		.unwrap_or(DEFAULT_REFRESH_INTERVAL_MINUTES);
	let threshold = Duration::seconds((interval_minutes as f64 * 60.0 * STALENESS_FACTOR) as i64);
	let reference = status.last_refresh.unwrap_or(status.start_time);
	let age = now - reference;

	if age > threshold {
		HealthReport::new(
			HealthState::Warning,
			format!(
				"No refresh for {} minutes (interval {} minutes)",
				age.num_minutes(),
				interval_minutes
			),
		)
	} else {
		HealthReport::new(
			HealthState::Healthy,
			format!("{} refreshes, last at {}", status.refresh_count, reference.to_rfc3339()),
		)
	}
}
