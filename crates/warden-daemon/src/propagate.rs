// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Pushing a fresh credential into the local credential stores.
//!
//! Both stores shell out to their CLI and treat it as pass/fail. Neither
//! command is bounded by a timeout.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace, warn};
use warden_common_config::SecretString;
use warden_github_app::Credential;

use crate::error::PropagationError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
	fn name(&self) -> &'static str;

	async fn propagate(&self, credential: &Credential) -> Result<(), PropagationError>;
}

/// Run `program args..`, optionally feeding `stdin`, and return trimmed
/// stdout. Any occurrence of `secret` in the rendered command or in stderr
/// is redacted before it reaches logs or errors.
pub async fn run_command(
	program: &str,
	args: &[&str],
	stdin: Option<&SecretString>,
	secret: &SecretString,
) -> Result<String, PropagationError> {
	let rendered = secret.redact_in(&format!("{} {}", program, args.join(" ")));
	trace!(cmd = %rendered, "running credential store command");

	let mut cmd = Command::new(program);
	cmd
		.args(args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	let mut child = cmd.spawn().map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			warn!(program, "credential store CLI not found in PATH");
			PropagationError::NotInstalled {
				program: program.to_string(),
			}
		} else {
			PropagationError::Io {
				program: program.to_string(),
				source: e,
			}
		}
	})?;

	if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
		pipe
			.write_all(input.expose().as_bytes())
			.await
			.map_err(|e| PropagationError::Io {
				program: program.to_string(),
				source: e,
			})?;
		// Dropping the pipe closes stdin so the child sees EOF.
		drop(pipe);
	}

	let output = child
		.wait_with_output()
		.await
		.map_err(|e| PropagationError::Io {
			program: program.to_string(),
			source: e,
		})?;

	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	} else {
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		Err(PropagationError::CommandFailed {
			command: rendered,
			code: output
				.status
				.code()
				.map(|c| c.to_string())
				.unwrap_or_else(|| "signal".to_string()),
			stderr: secret.redact_in(&stderr),
		})
	}
}

/// Host that credentials are scoped to, derived from the API base URL:
/// `github.com` for the public API, the server host for GitHub Enterprise.
pub fn git_host_for(api_base_url: Option<&str>) -> String {
	api_base_url
		.and_then(|raw| {
			let rest = raw.split_once("://").map(|(_, rest)| rest).unwrap_or(raw);
			rest.split('/').next().map(str::to_string)
		})
		.filter(|host| !host.is_empty() && host != "api.github.com")
		.unwrap_or_else(|| "github.com".to_string())
}

const TOKEN_USER: &str = "x-access-token";

/// Rewrites `https://<host>/` to an authenticated URL in the global git
/// config, replacing any rewrite a previous tick installed.
pub struct GitCredentialStore {
	program: String,
	host: String,
}

impl GitCredentialStore {
	pub fn new(host: impl Into<String>) -> Self {
		Self {
			program: "git".to_string(),
			host: host.into(),
		}
	}

	pub fn with_program(mut self, program: impl Into<String>) -> Self {
		self.program = program.into();
		self
	}

	fn stale_key_prefix(&self) -> String {
		format!("url.https://{TOKEN_USER}:")
	}

	fn stale_key_suffix(&self) -> String {
		format!("@{}/.insteadof", self.host)
	}

	async fn existing_rewrites(&self, secret: &SecretString) -> Result<Vec<String>, PropagationError> {
		let listed = run_command(
			&self.program,
			&["config", "--global", "--name-only", "--get-regexp", r"^url\..*\.insteadof$"],
			None,
			secret,
		)
		.await;

		let output = match listed {
			Ok(output) => output,
			// git exits 1 when nothing matches.
			Err(PropagationError::CommandFailed { code, .. }) if code == "1" => String::new(),
			Err(e) => return Err(e),
		};

		let prefix = self.stale_key_prefix();
		let suffix = self.stale_key_suffix();
		Ok(output
			.lines()
			.map(str::trim)
			.filter(|key| key.to_ascii_lowercase().starts_with(&prefix) && key.ends_with(&suffix))
			.map(str::to_string)
			.collect())
	}
}

#[async_trait]
impl CredentialStore for GitCredentialStore {
	fn name(&self) -> &'static str {
		"git"
	}

	async fn propagate(&self, credential: &Credential) -> Result<(), PropagationError> {
		let token = &credential.token;
		if token.expose().contains(['@', '/', ':']) {
			return Err(PropagationError::Invalid {
				store: "git",
				reason: "token contains URL delimiters".to_string(),
			});
		}

		for key in self.existing_rewrites(token).await? {
			debug!(host = %self.host, "removing previous git url rewrite");
			run_command(&self.program, &["config", "--global", "--unset-all", &key], None, token).await?;
		}

		let key = format!(
			"url.https://{TOKEN_USER}:{}@{}/.insteadOf",
			token.expose(),
			self.host
		);
		let target = format!("https://{}/", self.host);
		run_command(&self.program, &["config", "--global", &key, &target], None, token).await?;
		debug!(host = %self.host, "installed git url rewrite");
		Ok(())
	}
}

/// Logs the GitHub CLI in with the new token, passed on stdin.
pub struct GhCliStore {
	program: String,
	host: String,
}

impl GhCliStore {
	pub fn new(host: impl Into<String>) -> Self {
		Self {
			program: "gh".to_string(),
			host: host.into(),
		}
	}

	pub fn with_program(mut self, program: impl Into<String>) -> Self {
		self.program = program.into();
		self
	}
}

#[async_trait]
impl CredentialStore for GhCliStore {
	fn name(&self) -> &'static str {
		"gh"
	}

	async fn propagate(&self, credential: &Credential) -> Result<(), PropagationError> {
		run_command(
			&self.program,
			&["auth", "login", "--hostname", &self.host, "--with-token"],
			Some(&credential.token),
			&credential.token,
		)
		.await?;
		debug!(host = %self.host, "gh re-authenticated");
		Ok(())
	}
}

/// The production stores, in propagation order.
pub fn default_stores(api_base_url: Option<&str>) -> Vec<Box<dyn CredentialStore>> {
	let host = git_host_for(api_base_url);
	vec![
		Box::new(GitCredentialStore::new(host.clone())),
		Box::new(GhCliStore::new(host)),
	]
}
