// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The warden credential-refresh daemon.
//!
//! - [`RefreshLoop`] runs inside the detached daemon process, minting a
//!   credential every interval and pushing it to git and gh.
//! - [`DaemonController`] runs in the caller and owns spawning, health
//!   checks and termination.
//! - [`reporter`] is the read-only tool surface over the status files.
//!
//! The two processes share nothing but the files in
//! [`warden_status::StatusPaths`].

pub mod child;
pub mod config;
pub mod controller;
pub mod error;
pub mod propagate;
pub mod refresh;
pub mod reporter;
pub mod source;

pub use config::{ChildBootstrap, DaemonConfig};
pub use controller::{ControllerOptions, DaemonController, DaemonHandle, OutputMode};
pub use error::{ConfigError, DaemonError, PropagationError};
pub use propagate::{CredentialStore, GhCliStore, GitCredentialStore};
pub use refresh::{LoopState, LoopSummary, RefreshLoop, ShutdownSignal, StopReason};
pub use reporter::{HealthState, ToolRegistry};
pub use source::CredentialSource;
