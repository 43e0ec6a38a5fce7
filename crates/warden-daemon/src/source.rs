// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use warden_github_app::{Credential, CredentialMinter, GithubAppError};

/// Where the refresh loop gets credentials from.
#[async_trait]
pub trait CredentialSource: Send {
	/// Mint a fresh credential. Never served from cache.
	async fn mint(&mut self) -> Result<Credential, GithubAppError>;

	/// Human-readable scope, for logs.
	fn describe(&self) -> String;
}

#[async_trait]
impl CredentialSource for CredentialMinter {
	async fn mint(&mut self) -> Result<Credential, GithubAppError> {
		CredentialMinter::mint(self).await
	}

	fn describe(&self) -> String {
		self.scope().to_string()
	}
}
