// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use warden_status::{process, DaemonStatus, StatusReader};

use super::health::classify_health;
use super::{Tool, ToolError};
use crate::controller::NO_LOGS;

pub const DEFAULT_TAIL_LINES: usize = 50;
pub const MAX_TAIL_LINES: usize = 200;

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
	at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
}

/// Human-readable summary of a status record.
pub fn render_status(status: Option<&DaemonStatus>, alive: bool) -> String {
	let Some(status) = status else {
		return "No daemon status found".to_string();
	};

	let mut out = format!(
		"Daemon status: {}\nPID: {} ({})\nStarted: {}\nLast refresh: {}\nNext refresh: {}\nRefresh count: {}",
		status.status,
		status.pid,
		if alive { "alive" } else { "not running" },
		status.start_time.to_rfc3339(),
		fmt_time(status.last_refresh),
		fmt_time(status.next_refresh),
		status.refresh_count,
	);
	if let Some(interval) = status.refresh_interval_minutes {
		out.push_str(&format!("\nRefresh interval: {interval} minutes"));
	}
	if let Some(error) = &status.last_error {
		out.push_str(&format!("\nLast error: {error}"));
	}
	out
}

fn probe(status: Option<&DaemonStatus>) -> bool {
	status.map(|s| process::is_alive(s.pid)).unwrap_or(false)
}

pub struct GetStatusTool {
	reader: StatusReader,
}

impl GetStatusTool {
	pub fn new(reader: StatusReader) -> Self {
		Self { reader }
	}
}

#[async_trait]
impl Tool for GetStatusTool {
	fn name(&self) -> &str {
		"get-status"
	}

	fn description(&self) -> &str {
		"Show the credential refresh daemon's current status"
	}

	fn input_schema(&self) -> serde_json::Value {
		serde_json::json!({"type": "object", "properties": {}})
	}

	async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
		let status = self.reader.read_status();
		let alive = probe(status.as_ref());
		let healthy = alive
			&& status
				.as_ref()
				.is_some_and(|s| s.status == warden_status::DaemonState::Running);

		Ok(serde_json::json!({
			"text": render_status(status.as_ref(), alive),
			"status": status,
			"alive": alive,
			"healthy": healthy,
		}))
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetLogsArgs {
	tail_lines: Option<i64>,
}

pub struct GetLogsTool {
	reader: StatusReader,
}

impl GetLogsTool {
	pub fn new(reader: StatusReader) -> Self {
		Self { reader }
	}
}

#[async_trait]
impl Tool for GetLogsTool {
	fn name(&self) -> &str {
		"get-logs"
	}

	fn description(&self) -> &str {
		"Show the most recent lines of the daemon log"
	}

	fn input_schema(&self) -> serde_json::Value {
		serde_json::json!({
			"type": "object",
			"properties": {
				"tailLines": {
					"type": "integer",
					"minimum": 1,
					"maximum": MAX_TAIL_LINES,
					"default": DEFAULT_TAIL_LINES,
					"description": "Number of lines to return"
				}
			}
		})
	}

	async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
		let args: GetLogsArgs = if args.is_null() {
			GetLogsArgs::default()
		} else {
			serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
		};
		let tail = args
			.tail_lines
			.map(|n| n.clamp(1, MAX_TAIL_LINES as i64) as usize)
			.unwrap_or(DEFAULT_TAIL_LINES);

		let lines = self.reader.tail_logs(tail).unwrap_or_default();
		let text = if lines.is_empty() {
			NO_LOGS.to_string()
		} else {
			lines.join("\n")
		};
		Ok(serde_json::json!({ "lines": lines, "text": text }))
	}
}

pub struct CheckHealthTool {
	reader: StatusReader,
}

impl CheckHealthTool {
	pub fn new(reader: StatusReader) -> Self {
		Self { reader }
	}
}

#[async_trait]
impl Tool for CheckHealthTool {
	fn name(&self) -> &str {
		"check-health"
	}

	fn description(&self) -> &str {
		"Classify daemon health: healthy, warning, error, stopped, dead-process or unknown"
	}

	fn input_schema(&self) -> serde_json::Value {
		serde_json::json!({"type": "object", "properties": {}})
	}

	async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
		let status = self.reader.read_status();
		let report = classify_health(status.as_ref(), probe(status.as_ref()), Utc::now());
		serde_json::to_value(report).map_err(|e| ToolError::Internal(e.to_string()))
	}
}
