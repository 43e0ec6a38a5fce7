// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client for the two installation endpoints warden needs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GithubAppConfig;
use crate::error::GithubAppError;
use crate::jwt::generate_app_jwt;
use crate::types::{AccessToken, AccessTokenResponse, Installation};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub App client. Every call signs a fresh app JWT; the JWT is cheap
/// and the daemon calls at most twice per refresh tick.
#[derive(Clone)]
pub struct GithubAppClient {
	http_client: Client,
	config: GithubAppConfig,
}

impl GithubAppClient {
	pub fn new(config: GithubAppConfig) -> Result<Self, GithubAppError> {
		let http_client = Client::builder()
			.user_agent(user_agent())
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| GithubAppError::Config(format!("Failed to create HTTP client: {e}")))?;

		info!(
			app_id = config.app_id(),
			base_url = %config.base_url(),
			"Created GitHub App client"
		);

		Ok(Self {
			http_client,
			config,
		})
	}

	pub fn config(&self) -> &GithubAppConfig {
		&self.config
	}

	pub fn generate_app_jwt(&self) -> Result<String, GithubAppError> {
		generate_app_jwt(self.config.app_id(), self.config.private_key_pem())
	}

	/// Look up the installation that covers `owner/repo`.
	#[instrument(skip(self))]
	pub async fn get_repo_installation(
		&self,
		owner: &str,
		repo: &str,
	) -> Result<Installation, GithubAppError> {
		let jwt = self.generate_app_jwt()?;
		let response = self
			.send(
				self.request(Method::GET, &format!("repos/{owner}/{repo}/installation"), &jwt)?,
			)
			.await?;

		if response.status() == StatusCode::NOT_FOUND {
			warn!(owner, repo, "No installation for repository");
			return Err(GithubAppError::installation_not_found(owner, repo));
		}

		let installation: Installation = parse_json(response).await?;
		if installation.suspended_at.is_some() {
			return Err(GithubAppError::InstallationSuspended {
				owner: owner.to_string(),
				repo: repo.to_string(),
			});
		}

		debug!(installation_id = installation.id, "Repository installation found");
		Ok(installation)
	}

	/// Exchange the app JWT for an installation access token.
	#[instrument(skip(self))]
	pub async fn create_installation_token(
		&self,
		installation_id: i64,
	) -> Result<AccessToken, GithubAppError> {
		let jwt = self.generate_app_jwt()?;
		let response = self
			.send(self.request(
				Method::POST,
				&format!("app/installations/{installation_id}/access_tokens"),
				&jwt,
			)?)
			.await?;

		let body: AccessTokenResponse = parse_json(response).await?;

		let token = body
			.token
			.filter(|t| !t.is_empty())
			.ok_or_else(|| GithubAppError::InvalidResponse("response has no token".to_string()))?;
		let expires_at = body
			.expires_at
			.ok_or_else(|| GithubAppError::InvalidResponse("response has no expires_at".to_string()))
			.and_then(|raw| parse_expires_at(&raw))?;

		debug!(installation_id, %expires_at, "Installation token issued");
		Ok(AccessToken { token, expires_at })
	}

	fn request(&self, method: Method, path: &str, jwt: &str) -> Result<RequestBuilder, GithubAppError> {
		let url = self.config.endpoint(path)?;
		debug!(%method, url = %url, "GitHub request");
		Ok(
			self
				.http_client
				.request(method, url)
				.header("Authorization", format!("Bearer {jwt}"))
				.header("Accept", "application/vnd.github+json")
				.header("X-GitHub-Api-Version", GITHUB_API_VERSION),
		)
	}

	/// Send and map transport failures and non-2xx statuses. A 404 is
	/// passed through so callers can give it a domain meaning.
	async fn send(&self, request: RequestBuilder) -> Result<Response, GithubAppError> {
		let response = request.send().await.map_err(|e| {
			if e.is_timeout() {
				error!("GitHub request timed out");
				return GithubAppError::Timeout;
			}
			error!(error = %e, "Network error talking to GitHub");
			GithubAppError::Network(e)
		})?;

		let status = response.status();
		if status.is_success() || status == StatusCode::NOT_FOUND {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		Err(map_github_error(status, &body))
	}
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, GithubAppError> {
	if response.status() == StatusCode::NOT_FOUND {
		let body = response.text().await.unwrap_or_default();
		return Err(GithubAppError::api_error(404, body));
	}
	response.json().await.map_err(|e| {
		error!(error = %e, "Failed to parse GitHub response");
		GithubAppError::InvalidResponse(format!("JSON parse error: {e}"))
	})
}

pub(crate) fn map_github_error(status: StatusCode, body: &str) -> GithubAppError {
	let status_code = status.as_u16();

	match status_code {
		401 => {
			warn!(status = status_code, "Unauthorized request to GitHub");
			GithubAppError::Unauthorized
		}
		403 => {
			let lower = body.to_lowercase();
			if lower.contains("rate limit") {
				warn!(status = status_code, "GitHub rate limit exceeded");
				GithubAppError::RateLimited
			} else {
				warn!(status = status_code, "Forbidden request to GitHub");
				GithubAppError::Forbidden
			}
		}
		429 => GithubAppError::RateLimited,
		_ => {
			error!(status = status_code, body = %body, "GitHub API error");
			GithubAppError::api_error(status_code, body)
		}
	}
}

pub(crate) fn parse_expires_at(raw: &str) -> Result<DateTime<Utc>, GithubAppError> {
	raw
		.parse::<DateTime<Utc>>()
		.map_err(|e| GithubAppError::InvalidResponse(format!("Invalid expires_at: {raw} - {e}")))
}

fn user_agent() -> String {
	format!("warden/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{test_keypair, TEST_APP_ID};
	use wiremock::matchers::{header_exists, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn client_for(server: &MockServer) -> GithubAppClient {
		let config = GithubAppConfig::new(TEST_APP_ID, test_keypair().private_pem.clone())
			.with_unchecked_base_url(&server.uri());
		GithubAppClient::new(config).unwrap()
	}

	#[test]
	fn maps_status_codes() {
		assert!(matches!(
			map_github_error(StatusCode::UNAUTHORIZED, "Bad credentials"),
			GithubAppError::Unauthorized
		));
		assert!(matches!(
			map_github_error(StatusCode::FORBIDDEN, "API rate limit exceeded"),
			GithubAppError::RateLimited
		));
		assert!(matches!(
			map_github_error(StatusCode::FORBIDDEN, "Resource not accessible"),
			GithubAppError::Forbidden
		));
		assert!(matches!(
			map_github_error(StatusCode::BAD_GATEWAY, "oops"),
			GithubAppError::ApiError { status: 502, .. }
		));
	}

	#[test]
	fn parses_github_expiry_format() {
		let parsed = parse_expires_at("2026-10-16T12:00:00Z").unwrap();
		assert_eq!(parsed.to_rfc3339(), "2026-10-16T12:00:00+00:00");
		assert!(parse_expires_at("tomorrow").is_err());
	}

	#[tokio::test]
	async fn installation_lookup_404_is_not_found() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/repos/acme/widgets/installation"))
			.respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.get_repo_installation("acme", "widgets")
			.await
			.unwrap_err();
		assert!(matches!(err, GithubAppError::InstallationNotFound { .. }));
	}

	#[tokio::test]
	async fn suspended_installation_is_rejected() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/repos/acme/widgets/installation"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"id": 42,
				"account": {"id": 1, "login": "acme", "type": "Organization"},
				"suspended_at": "2026-01-01T00:00:00Z"
			})))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.get_repo_installation("acme", "widgets")
			.await
			.unwrap_err();
		assert!(err.is_scope_resolution());
	}

	#[tokio::test]
	async fn token_exchange_sends_bearer_jwt() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/app/installations/42/access_tokens"))
			.and(header_exists("Authorization"))
			.respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
				"token": "ghs_minted",
				"expires_at": "2030-01-01T00:00:00Z"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let token = client_for(&server)
			.create_installation_token(42)
			.await
			.unwrap();
		assert_eq!(token.token.expose(), "ghs_minted");
		assert_eq!(token.expires_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
	}

	#[tokio::test]
	async fn token_response_without_token_is_invalid() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/app/installations/42/access_tokens"))
			.respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
				"token": "",
				"expires_at": "2030-01-01T00:00:00Z"
			})))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.create_installation_token(42)
			.await
			.unwrap_err();
		assert!(matches!(err, GithubAppError::InvalidResponse(_)));
	}

	#[tokio::test]
	async fn bad_credentials_map_to_unauthorized() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/app/installations/42/access_tokens"))
			.respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.create_installation_token(42)
			.await
			.unwrap_err();
		assert!(matches!(err, GithubAppError::Unauthorized));
	}
}
