// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Credential minting with scope and token caching.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, trace};

use crate::client::GithubAppClient;
use crate::credential::Credential;
use crate::error::GithubAppError;

/// The repository whose installation the credential is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRef {
	pub owner: String,
	pub name: String,
}

impl ScopeRef {
	pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			owner: owner.into(),
			name: name.into(),
		}
	}
}

impl std::fmt::Display for ScopeRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.owner, self.name)
	}
}

/// Mints installation credentials for one scope.
///
/// The installation id is resolved once and kept for the life of the
/// process. Methods take `&mut self`; the refresh loop is the only caller
/// and never runs two ticks at once.
pub struct CredentialMinter {
	client: GithubAppClient,
	scope: ScopeRef,
	margin: Duration,
	scope_id: Option<i64>,
	cached: Option<Credential>,
}

impl CredentialMinter {
	pub fn new(client: GithubAppClient, scope: ScopeRef, margin: Duration) -> Self {
		Self {
			client,
			scope,
			margin,
			scope_id: None,
			cached: None,
		}
	}

	pub fn scope(&self) -> &ScopeRef {
		&self.scope
	}

	pub fn scope_id(&self) -> Option<i64> {
		self.scope_id
	}

	/// Resolve `owner/name` to an installation id, once.
	#[instrument(skip(self), fields(scope = %self.scope))]
	pub async fn resolve_scope_id(&mut self) -> Result<i64, GithubAppError> {
		if let Some(id) = self.scope_id {
			trace!(scope_id = id, "Using cached scope id");
			return Ok(id);
		}

		let installation = self
			.client
			.get_repo_installation(&self.scope.owner, &self.scope.name)
			.await?;

		info!(scope_id = installation.id, account = %installation.account.login, "Resolved installation");
		self.scope_id = Some(installation.id);
		Ok(installation.id)
	}

	/// Always mint a fresh credential and replace the cache.
	#[instrument(skip(self), fields(scope = %self.scope))]
	pub async fn mint(&mut self) -> Result<Credential, GithubAppError> {
		let scope_id = self.resolve_scope_id().await?;
		let access = self.client.create_installation_token(scope_id).await?;

		let credential = Credential {
			token: access.token,
			expires_at: access.expires_at,
			scope_id,
		};
		debug!(scope_id, expires_at = %credential.expires_at, "Minted credential");

		self.cached = Some(credential.clone());
		Ok(credential)
	}

	/// The cached credential while it is outside the safety margin,
	/// otherwise a freshly minted one.
	pub async fn current_or_refreshed(&mut self) -> Result<Credential, GithubAppError> {
		if let Some(cached) = self.cached_valid_at(Utc::now()) {
			trace!("Using cached credential");
			return Ok(cached.clone());
		}
		self.mint().await
	}

	pub fn cached_valid_at(&self, now: DateTime<Utc>) -> Option<&Credential> {
		self
			.cached
			.as_ref()
			.filter(|c| !c.needs_refresh_at(now, self.margin))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::GithubAppConfig;
	use crate::test_support::{test_keypair, TEST_APP_ID};
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	async fn mount_installation(server: &MockServer, expected_calls: u64) {
		Mock::given(method("GET"))
			.and(path("/repos/acme/widgets/installation"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"id": 42,
				"account": {"id": 1, "login": "acme", "type": "Organization"}
			})))
			.expect(expected_calls)
			.mount(server)
			.await;
	}

	async fn mount_token(server: &MockServer, expires_at: DateTime<Utc>, expected_calls: u64) {
		Mock::given(method("POST"))
			.and(path("/app/installations/42/access_tokens"))
			.respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
				"token": "ghs_fresh",
				"expires_at": expires_at.to_rfc3339(),
			})))
			.expect(expected_calls)
			.mount(server)
			.await;
	}

	fn minter_for(server: &MockServer) -> CredentialMinter {
		let config = GithubAppConfig::new(TEST_APP_ID, test_keypair().private_pem.clone())
			.with_unchecked_base_url(&server.uri());
		CredentialMinter::new(
			GithubAppClient::new(config).unwrap(),
			ScopeRef::new("acme", "widgets"),
			Duration::minutes(5),
		)
	}

	#[tokio::test]
	async fn scope_is_resolved_once_across_mints() {
		let server = MockServer::start().await;
		mount_installation(&server, 1).await;
		mount_token(&server, Utc::now() + Duration::hours(1), 2).await;

		let mut minter = minter_for(&server);
		let first = minter.mint().await.unwrap();
		let second = minter.mint().await.unwrap();

		assert_eq!(first.scope_id, 42);
		assert_eq!(second.scope_id, 42);
		assert_eq!(minter.scope_id(), Some(42));
	}

	#[tokio::test]
	async fn current_or_refreshed_reuses_fresh_credential() {
		let server = MockServer::start().await;
		mount_installation(&server, 1).await;
		mount_token(&server, Utc::now() + Duration::hours(1), 1).await;

		let mut minter = minter_for(&server);
		let first = minter.current_or_refreshed().await.unwrap();
		let second = minter.current_or_refreshed().await.unwrap();
		assert_eq!(first.expires_at, second.expires_at);
	}

	#[tokio::test]
	async fn current_or_refreshed_remints_inside_margin() {
		let server = MockServer::start().await;
		mount_installation(&server, 1).await;
		// Expires inside the five-minute margin, so every call re-mints.
		mount_token(&server, Utc::now() + Duration::minutes(2), 2).await;

		let mut minter = minter_for(&server);
		minter.current_or_refreshed().await.unwrap();
		minter.current_or_refreshed().await.unwrap();
	}

	#[tokio::test]
	async fn missing_installation_fails_scope_resolution() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/repos/acme/widgets/installation"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let mut minter = minter_for(&server);
		let err = minter.mint().await.unwrap_err();
		assert!(err.is_scope_resolution());
		assert_eq!(minter.scope_id(), None);
	}

	#[test]
	fn scope_ref_displays_as_owner_slash_name() {
		assert_eq!(ScopeRef::new("acme", "widgets").to_string(), "acme/widgets");
	}
}
