// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wire and domain types for the installation endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_common_config::SecretString;

/// A GitHub App installation (`GET /repos/{owner}/{repo}/installation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
	pub id: i64,
	pub account: InstallationAccount,
	/// ISO-8601 timestamp when the installation was suspended.
	#[serde(default)]
	pub suspended_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationAccount {
	pub id: i64,
	pub login: String,
	#[serde(rename = "type")]
	pub account_type: String,
}

/// Body of `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
	#[serde(default)]
	pub(crate) token: Option<SecretString>,
	#[serde(default)]
	pub(crate) expires_at: Option<String>,
}

/// A parsed installation access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
	pub token: SecretString,
	pub expires_at: DateTime<Utc>,
}
