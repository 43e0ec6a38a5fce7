// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for credential minting.

use thiserror::Error;

/// Errors raised while minting a credential.
///
/// `InstallationNotFound` and `InstallationSuspended` are scope-resolution
/// failures: the owner/name pair has no usable installation. Everything else
/// is a mint failure (handshake, transport, or an unusable response).
#[derive(Debug, Error)]
pub enum GithubAppError {
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	#[error("Unauthorized or invalid app configuration")]
	Unauthorized,

	#[error("Forbidden or insufficient permissions")]
	Forbidden,

	#[error("Rate limit exceeded")]
	RateLimited,

	#[error("GitHub API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("JWT error: {0}")]
	Jwt(String),

	#[error("GitHub App not installed for {owner}/{repo}")]
	InstallationNotFound { owner: String, repo: String },

	#[error("GitHub App installation for {owner}/{repo} is suspended")]
	InstallationSuspended { owner: String, repo: String },
}

impl GithubAppError {
	pub fn api_error(status: u16, message: impl Into<String>) -> Self {
		Self::ApiError {
			status,
			message: message.into(),
		}
	}

	pub fn installation_not_found(owner: impl Into<String>, repo: impl Into<String>) -> Self {
		Self::InstallationNotFound {
			owner: owner.into(),
			repo: repo.into(),
		}
	}

	/// True when the owner/name pair could not be resolved to an installation.
	pub fn is_scope_resolution(&self) -> bool {
		matches!(
			self,
			Self::InstallationNotFound { .. } | Self::InstallationSuspended { .. }
		)
	}
}
