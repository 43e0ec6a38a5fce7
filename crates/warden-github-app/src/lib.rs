// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App credential minting for warden.
//!
//! A GitHub App authenticates with a short-lived RS256 JWT signed by its
//! private key, looks up the installation covering one repository, and
//! exchanges the JWT for an installation access token that is valid for one
//! hour. [`CredentialMinter`] wraps that handshake and caches both the
//! resolved installation id and the most recent [`Credential`].
//!
//! Nothing in this crate retries; the refresh loop owns retry policy.

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod jwt;
pub mod minter;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::GithubAppClient;
pub use config::GithubAppConfig;
pub use credential::Credential;
pub use error::GithubAppError;
pub use minter::{CredentialMinter, ScopeRef};
pub use types::{AccessToken, Installation, InstallationAccount};

/// Lifetime GitHub grants an installation access token.
pub const TOKEN_LIFETIME_MINUTES: u64 = 60;
