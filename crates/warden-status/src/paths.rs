// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

const STATUS_FILE: &str = "daemon-status.json";
const LOG_FILE: &str = "daemon.log";
const PID_FILE: &str = "daemon.pid";

/// Locations of the three StatusChannel files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPaths {
	pub status_file: PathBuf,
	pub log_file: PathBuf,
	pub pid_file: PathBuf,
}

impl StatusPaths {
	pub fn new(
		status_file: impl Into<PathBuf>,
		log_file: impl Into<PathBuf>,
		pid_file: impl Into<PathBuf>,
	) -> Self {
		Self {
			status_file: status_file.into(),
			log_file: log_file.into(),
			pid_file: pid_file.into(),
		}
	}

	/// Standard file names inside `dir`.
	pub fn in_dir(dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();
		Self::new(dir.join(STATUS_FILE), dir.join(LOG_FILE), dir.join(PID_FILE))
	}

	/// `$RUNNER_TEMP/warden` on GitHub Actions runners, the OS temp dir
	/// elsewhere. Job-scoped, so nothing survives a job restart.
	pub fn default_dir() -> PathBuf {
		std::env::var_os("RUNNER_TEMP")
			.filter(|v| !v.is_empty())
			.map(PathBuf::from)
			.unwrap_or_else(std::env::temp_dir)
			.join("warden")
	}

	pub(crate) fn ensure_parent_dirs(&self) -> std::io::Result<()> {
		for file in [&self.status_file, &self.log_file, &self.pid_file] {
			if let Some(parent) = file.parent() {
				if !parent.as_os_str().is_empty() {
					std::fs::create_dir_all(parent)?;
				}
			}
		}
		Ok(())
	}
}
