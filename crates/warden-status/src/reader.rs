// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fs;

use tracing::debug;

use crate::log::last_non_blank_lines;
use crate::model::DaemonStatus;
use crate::paths::StatusPaths;

/// Read-only view of the StatusChannel.
///
/// Never fails: a file that is missing, half-written or unparsable reads as
/// absent.
#[derive(Debug, Clone)]
pub struct StatusReader {
	paths: StatusPaths,
}

impl StatusReader {
	pub fn new(paths: StatusPaths) -> Self {
		Self { paths }
	}

	pub fn paths(&self) -> &StatusPaths {
		&self.paths
	}

	pub fn read_status(&self) -> Option<DaemonStatus> {
		let raw = fs::read_to_string(&self.paths.status_file).ok()?;
		match serde_json::from_str(&raw) {
			Ok(status) => Some(status),
			Err(e) => {
				debug!(error = %e, path = %self.paths.status_file.display(), "Unreadable status record");
				None
			}
		}
	}

	pub fn read_pid(&self) -> Option<u32> {
		fs::read_to_string(&self.paths.pid_file)
			.ok()?
			.trim()
			.parse()
			.ok()
			.filter(|pid| *pid > 0)
	}

	/// Last `n` non-blank log lines, or `None` when there is no log file.
	pub fn tail_logs(&self, n: usize) -> Option<Vec<String>> {
		let contents = fs::read_to_string(&self.paths.log_file).ok()?;
		Some(last_non_blank_lines(&contents, n))
	}
}
