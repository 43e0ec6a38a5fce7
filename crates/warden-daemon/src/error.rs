// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;
use warden_common_config::RequiredSecretError;
use warden_github_app::GithubAppError;
use warden_status::process::SignalError;
use warden_status::StatusError;

/// A credential store rejected the new credential.
#[derive(Debug, Error)]
pub enum PropagationError {
	#[error("{program} not found in PATH")]
	NotInstalled { program: String },

	#[error("failed to run {program}: {source}")]
	Io {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("{command} exited with {code}: {stderr}")]
	CommandFailed {
		command: String,
		code: String,
		stderr: String,
	},

	#[error("credential store {store} is misconfigured: {reason}")]
	Invalid { store: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{field} must be at least {min}, got {value}")]
	TooSmall {
		field: &'static str,
		min: u64,
		value: u64,
	},

	#[error(
		"refresh interval of {interval} minutes leaves no headroom: tokens live {lifetime} minutes and are refreshed {margin} minutes early"
	)]
	UnsafeSchedule {
		interval: u64,
		lifetime: u64,
		margin: u64,
	},

	#[error("{field} must not be empty")]
	Empty { field: &'static str },

	#[error("invalid daemon bootstrap: {0}")]
	Bootstrap(#[from] serde_json::Error),

	#[error(transparent)]
	Env(#[from] RequiredSecretError),

	#[error(transparent)]
	GithubApp(#[from] GithubAppError),
}

#[derive(Debug, Error)]
pub enum DaemonError {
	#[error("failed to mint credential: {0}")]
	Mint(#[from] GithubAppError),

	#[error("failed to propagate credential: {0}")]
	Propagation(#[from] PropagationError),

	#[error("failed to spawn daemon process `{program}`: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Signal(#[from] SignalError),

	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("status channel error: {0}")]
	Status(#[from] StatusError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl DaemonError {
	pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
		Self::Spawn {
			program: program.into(),
			source,
		}
	}
}

pub type Result<T> = std::result::Result<T, DaemonError>;
