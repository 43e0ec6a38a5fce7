// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fs;

use chrono::{DateTime, Utc};

use crate::error::StatusError;
use crate::log::{append_line, format_log_line};
use crate::model::DaemonStatus;
use crate::paths::StatusPaths;
use crate::reader::StatusReader;

/// Write capability for the status record and the log.
///
/// Only the daemon process holds one. Everything else gets a
/// [`StatusReader`] (or, for the controller, a [`crate::StatusSeeder`]).
#[derive(Debug, Clone)]
pub struct StatusWriter {
	paths: StatusPaths,
}

impl StatusWriter {
	pub fn open(paths: StatusPaths) -> Result<Self, StatusError> {
		paths
			.ensure_parent_dirs()
			.map_err(|e| StatusError::io(&paths.status_file, e))?;
		Ok(Self { paths })
	}

	pub fn paths(&self) -> &StatusPaths {
		&self.paths
	}

	/// Replace the status record. Written to a sibling temp file and renamed
	/// into place so readers see the old record or the new one.
	pub fn write(&self, status: &DaemonStatus) -> Result<(), StatusError> {
		let body = serde_json::to_vec_pretty(status)?;
		let target = &self.paths.status_file;
		let tmp = target.with_extension("json.tmp");

		fs::write(&tmp, body).map_err(|e| StatusError::io(&tmp, e))?;
		fs::rename(&tmp, target).map_err(|e| StatusError::io(target, e))
	}

	/// Read the current record, apply `f`, write it back.
	pub fn update(&self, f: impl FnOnce(&mut DaemonStatus)) -> Result<DaemonStatus, StatusError> {
		let mut status = StatusReader::new(self.paths.clone())
			.read_status()
			.ok_or_else(|| StatusError::Missing(self.paths.status_file.clone()))?;
		f(&mut status);
		self.write(&status)?;
		Ok(status)
	}

	pub fn log(&self, message: &str) -> Result<(), StatusError> {
		self.log_at(Utc::now(), message)
	}

	pub fn log_at(&self, at: DateTime<Utc>, message: &str) -> Result<(), StatusError> {
		append_line(&self.paths.log_file, &format_log_line(at, message))
	}
}
