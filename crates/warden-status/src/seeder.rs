// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::StatusError;
use crate::log::{append_line, OutputStream};
use crate::model::DaemonStatus;
use crate::paths::StatusPaths;
use crate::reader::StatusReader;

/// The controller's side of the channel.
///
/// It owns the pid file and the channel's lifecycle (reset, cleanup), may
/// seed the status record before the daemon writes its own, and appends
/// captured daemon output to the log. It cannot overwrite a status record.
#[derive(Debug, Clone)]
pub struct StatusSeeder {
	paths: StatusPaths,
}

impl StatusSeeder {
	pub fn open(paths: StatusPaths) -> Result<Self, StatusError> {
		paths
			.ensure_parent_dirs()
			.map_err(|e| StatusError::io(&paths.status_file, e))?;
		Ok(Self { paths })
	}

	pub fn paths(&self) -> &StatusPaths {
		&self.paths
	}

	pub fn reader(&self) -> StatusReader {
		StatusReader::new(self.paths.clone())
	}

	/// Write the initial record unless one already exists. Returns `false`
	/// when the daemon got there first.
	pub fn seed_initial(&self, status: &DaemonStatus) -> Result<bool, StatusError> {
		let path = &self.paths.status_file;
		let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
			Ok(file) => file,
			Err(e) if e.kind() == ErrorKind::AlreadyExists => {
				debug!(path = %path.display(), "Status record already present, not seeding");
				return Ok(false);
			}
			Err(e) => return Err(StatusError::io(path, e)),
		};

		let body = serde_json::to_vec_pretty(status)?;
		file.write_all(&body).map_err(|e| StatusError::io(path, e))?;
		Ok(true)
	}

	pub fn write_pid(&self, pid: u32) -> Result<(), StatusError> {
		fs::write(&self.paths.pid_file, pid.to_string())
			.map_err(|e| StatusError::io(&self.paths.pid_file, e))
	}

	/// Append a captured daemon output line, tagged with its stream.
	pub fn append_output(&self, stream: OutputStream, line: &str) -> Result<(), StatusError> {
		append_line(&self.paths.log_file, &format!("{} {}", stream.tag(), line.trim_end()))
	}

	/// Remove the pid and status files. Missing files are fine.
	pub fn clear(&self) -> Result<(), StatusError> {
		remove_if_present(&self.paths.pid_file)?;
		remove_if_present(&self.paths.status_file)
	}

	/// Start a fresh log for a new daemon instance.
	pub fn reset_log(&self) -> Result<(), StatusError> {
		remove_if_present(&self.paths.log_file)
	}
}

fn remove_if_present(path: &Path) -> Result<(), StatusError> {
	match fs::remove_file(path) {
		Ok(()) => {
			trace!(path = %path.display(), "Removed channel file");
			Ok(())
		}
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
		Err(e) => Err(StatusError::io(path, e)),
	}
}
