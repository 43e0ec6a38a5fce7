// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration primitives shared by the warden crates.
//!
//! - [`Secret<T>`] re-exported from [`warden_common_secret`]
//! - [`load_secret_env`] / [`require_secret_env`] for the `VAR` / `VAR_FILE`
//!   convention used for the signing key and the daemon bootstrap blob
//! - [`require_env`] for plain variables such as StatusChannel paths

pub mod env;

pub use warden_common_secret::{Secret, SecretString, REDACTED};

pub use env::{load_secret_env, require_env, require_secret_env, RequiredSecretError, SecretEnvError};
