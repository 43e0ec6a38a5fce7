// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The StatusChannel: three files shared by the daemon process and
//! everything that observes it.
//!
//! | File | Format | Writer |
//! |---|---|---|
//! | status | one JSON [`DaemonStatus`], rewritten wholesale | daemon ([`StatusWriter`]); controller seeds it once ([`StatusSeeder`]) |
//! | log | `[<RFC3339>] <message>` lines, append-only | daemon; controller appends `[STDOUT]`/`[STDERR]` captures |
//! | pid | decimal pid | controller |
//!
//! There is no locking. The channel relies on a single writer per file and
//! on readers ([`StatusReader`]) treating a missing or unparsable file as
//! absent rather than as an error.

mod error;
mod log;
mod model;
mod paths;
pub mod process;
mod reader;
mod seeder;
mod writer;

pub use error::StatusError;
pub use log::{format_log_line, last_non_blank_lines, OutputStream};
pub use model::{DaemonState, DaemonStatus};
pub use paths::StatusPaths;
pub use reader::StatusReader;
pub use seeder::StatusSeeder;
pub use writer::StatusWriter;
