// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! LogChannel line format and tailing.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StatusError;

/// Which stream of the daemon process a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
	Stdout,
	Stderr,
}

impl OutputStream {
	pub fn tag(&self) -> &'static str {
		match self {
			OutputStream::Stdout => "[STDOUT]",
			OutputStream::Stderr => "[STDERR]",
		}
	}
}

/// `[<RFC3339 millis, Z>] <message>`, with embedded newlines flattened so
/// one event stays one line.
pub fn format_log_line(at: DateTime<Utc>, message: &str) -> String {
	let flat = message.replace(['\r', '\n'], " ");
	format!("[{}] {}", at.to_rfc3339_opts(SecondsFormat::Millis, true), flat.trim_end())
}

/// The last `n` non-blank lines of `contents`, oldest first.
pub fn last_non_blank_lines(contents: &str, n: usize) -> Vec<String> {
	let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
	let skip = lines.len().saturating_sub(n);
	lines[skip..].iter().map(|l| l.to_string()).collect()
}

pub(crate) fn append_line(path: &Path, line: &str) -> Result<(), StatusError> {
	let mut file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.map_err(|e| StatusError::io(path, e))?;
	// One write call per line; appends from the daemon and the controller
	// do not interleave mid-line.
	file
		.write_all(format!("{line}\n").as_bytes())
		.map_err(|e| StatusError::io(path, e))
}
