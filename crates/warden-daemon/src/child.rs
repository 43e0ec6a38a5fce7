// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Entry point of the daemon process itself.

use std::time::Duration;

use tracing::{error, info};
use warden_status::StatusWriter;

use crate::config::ChildBootstrap;
use crate::error::Result;
use crate::propagate::default_stores;
use crate::refresh::{install_panic_hook, record_fault, LoopSummary, RefreshLoop, ShutdownSignal};

/// Run the refresh loop described by `bootstrap` and return the process
/// exit code: 0 after a graceful stop, 1 after a fault.
pub async fn run(bootstrap: ChildBootstrap) -> i32 {
	let writer = match StatusWriter::open(bootstrap.paths.clone()) {
		Ok(writer) => writer,
		Err(e) => {
			error!(error = %e, "Cannot open status channel");
			return 1;
		}
	};
	install_panic_hook(writer.clone());

	match run_loop(bootstrap, writer.clone()).await {
		Ok(summary) => {
			info!(reason = %summary.reason, refresh_count = summary.refresh_count, "Daemon exiting");
			0
		}
		Err(e) => {
			error!(error = %e, "Daemon fault");
			record_fault(&writer, &e.to_string());
			1
		}
	}
}

async fn run_loop(bootstrap: ChildBootstrap, writer: StatusWriter) -> Result<LoopSummary> {
	let config = bootstrap.config;
	let minter = config.build_minter()?;
	let stores = default_stores(config.api_base_url.as_deref());
	let shutdown = ShutdownSignal::from_os()?;

	RefreshLoop::new(
		minter,
		stores,
		writer,
		Duration::from_secs(config.refresh_interval_minutes * 60),
		Duration::from_secs(config.max_runtime_hours * 3600),
		config.safety_margin(),
	)
	.run(shutdown)
	.await
}
