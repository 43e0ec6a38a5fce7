// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The scheduled refresh loop run by the daemon process.
//!
//! Each tick mints a credential and pushes it through every store in order.
//! A failed tick is recorded as `error` and the next tick is scheduled at the
//! normal interval; there is no backoff and no failure cap. The loop ends
//! only on a shutdown signal or when the max-runtime deadline passes.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, instrument, warn};
use warden_github_app::Credential;
use warden_status::{DaemonState, DaemonStatus, StatusWriter};

use crate::error::Result;
use crate::propagate::CredentialStore;
use crate::source::CredentialSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
	Starting,
	Running,
	Error,
	Stopping,
	Stopped,
}

impl LoopState {
	/// How the state is reported in the status record.
	pub fn reported(&self) -> DaemonState {
		match self {
			LoopState::Starting | LoopState::Running => DaemonState::Running,
			LoopState::Error => DaemonState::Error,
			LoopState::Stopping | LoopState::Stopped => DaemonState::Stopped,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
	Signal(&'static str),
	MaxRuntime,
}

impl std::fmt::Display for StopReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StopReason::Signal(name) => write!(f, "received {name}"),
			StopReason::MaxRuntime => f.write_str("max runtime reached"),
		}
	}
}

/// Resolves once when the daemon should shut down, yielding the signal name.
pub struct ShutdownSignal {
	inner: Pin<Box<dyn Future<Output = &'static str> + Send>>,
}

impl ShutdownSignal {
	/// SIGTERM or SIGINT.
	pub fn from_os() -> std::io::Result<Self> {
		use tokio::signal::unix::{signal, SignalKind};

		let mut term = signal(SignalKind::terminate())?;
		let mut int = signal(SignalKind::interrupt())?;
		Ok(Self {
			inner: Box::pin(async move {
				tokio::select! {
					_ = term.recv() => "SIGTERM",
					_ = int.recv() => "SIGINT",
				}
			}),
		})
	}

	/// Fires when the sender is used or dropped.
	pub fn from_receiver(rx: oneshot::Receiver<()>) -> Self {
		Self {
			inner: Box::pin(async move {
				let _ = rx.await;
				"shutdown request"
			}),
		}
	}

	pub fn never() -> Self {
		Self {
			inner: Box::pin(std::future::pending()),
		}
	}
}

impl Future for ShutdownSignal {
	type Output = &'static str;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.inner.as_mut().poll(cx)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
	pub reason: StopReason,
	pub ticks: u64,
	pub refresh_count: u64,
}

/// Whether a refresh scheduled at `next_refresh` lands before `credential`
/// enters its safety margin.
pub fn next_refresh_is_safe(
	next_refresh: DateTime<Utc>,
	credential: &Credential,
	margin: chrono::Duration,
) -> bool {
	next_refresh < credential.expires_at - margin
}

pub struct RefreshLoop<S> {
	source: S,
	stores: Vec<Box<dyn CredentialStore>>,
	writer: StatusWriter,
	interval: Duration,
	max_runtime: Duration,
	margin: chrono::Duration,
	state: LoopState,
	status: DaemonStatus,
	ticks: u64,
}

impl<S: CredentialSource> RefreshLoop<S> {
	pub fn new(
		source: S,
		stores: Vec<Box<dyn CredentialStore>>,
		writer: StatusWriter,
		interval: Duration,
		max_runtime: Duration,
		margin: chrono::Duration,
	) -> Self {
		let status = DaemonStatus::starting(std::process::id(), Utc::now(), interval.as_secs() / 60);
		Self {
			source,
			stores,
			writer,
			interval,
			max_runtime,
			margin,
			state: LoopState::Starting,
			status,
			ticks: 0,
		}
	}

	pub fn state(&self) -> LoopState {
		self.state
	}

	/// Run until shutdown. `Err` only when the initial status record cannot
	/// be written; the caller records it and exits nonzero.
	pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Result<LoopSummary> {
		let started = Instant::now();
		let deadline = started + self.max_runtime;
		self.status.start_time = Utc::now();

		self.writer.write(&self.status)?;
		self.log(&format!(
			"Daemon started for {} (pid {}, refresh every {} min, max runtime {} h)",
			self.source.describe(),
			self.status.pid,
			self.interval.as_secs() / 60,
			self.max_runtime.as_secs() / 3600,
		));
		info!(
			pid = self.status.pid,
			scope = %self.source.describe(),
			interval_secs = self.interval.as_secs(),
			max_runtime_secs = self.max_runtime.as_secs(),
			"Refresh loop started"
		);

		let expiry = sleep_until(deadline);
		tokio::pin!(expiry);

		let mut next_tick = started;
		let reason = loop {
			tokio::select! {
				biased;
				name = &mut shutdown => break StopReason::Signal(name),
				_ = &mut expiry => break StopReason::MaxRuntime,
				_ = sleep_until(next_tick) => {}
			}

			// A hung mint or store must not hold off shutdown or the deadline.
			tokio::select! {
				biased;
				name = &mut shutdown => {
					warn!(signal = name, "Abandoning refresh in progress");
					break StopReason::Signal(name);
				}
				_ = &mut expiry => {
					warn!("Abandoning refresh in progress at max runtime");
					break StopReason::MaxRuntime;
				}
				_ = self.tick() => {}
			}
			next_tick = Instant::now() + self.interval;
		};

		Ok(self.shutdown(reason))
	}

	#[instrument(skip_all)]
	async fn tick(&mut self) {
		self.ticks += 1;
		let attempt = self.refresh_once().await;
		let now = Utc::now();
		let next_refresh = now + chrono::Duration::seconds(self.interval.as_secs() as i64);

		match attempt {
			Ok(credential) => {
				self.status.refresh_count += 1;
				self.state = LoopState::Running;
				self.status.status = self.state.reported();
				self.status.last_refresh = Some(now);
				self.status.next_refresh = Some(next_refresh);
				self.status.last_error = None;
				self.persist();

				if !next_refresh_is_safe(next_refresh, &credential, self.margin) {
					warn!(
						expires_at = %credential.expires_at,
						next_refresh = %next_refresh,
						"Next refresh lands inside the credential's safety margin"
					);
					self.log("Warning: next refresh is scheduled after the credential's safety margin");
				}

				info!(
					refresh_count = self.status.refresh_count,
					expires_at = %credential.expires_at,
					"Credential refreshed"
				);
				self.log(&format!(
					"Token refreshed (#{}), expires at {}, next refresh at {}",
					self.status.refresh_count,
					credential.expires_at.to_rfc3339(),
					next_refresh.to_rfc3339(),
				));
			}
			Err(e) => {
				self.state = LoopState::Error;
				self.status.status = self.state.reported();
				self.status.next_refresh = Some(next_refresh);
				self.status.last_error = Some(e.to_string());
				self.persist();

				error!(error = %e, refresh_count = self.status.refresh_count, "Refresh failed");
				self.log(&format!(
					"Refresh failed: {e}; retrying at {}",
					next_refresh.to_rfc3339()
				));
			}
		}
	}

	async fn refresh_once(&mut self) -> Result<Credential> {
		let credential = self.source.mint().await?;
		for store in &self.stores {
			debug!(store = store.name(), "Propagating credential");
			store.propagate(&credential).await?;
		}
		Ok(credential)
	}

	fn shutdown(mut self, reason: StopReason) -> LoopSummary {
		self.state = LoopState::Stopping;
		info!(%reason, ticks = self.ticks, "Refresh loop stopping");

		self.status.status = DaemonState::Stopped;
		self.status.next_refresh = None;
		self.persist();
		self.log(&format!(
			"Daemon stopped: {reason} after {} refreshes",
			self.status.refresh_count
		));
		self.state = LoopState::Stopped;

		LoopSummary {
			reason,
			ticks: self.ticks,
			refresh_count: self.status.refresh_count,
		}
	}

	/// A failed status write is logged and the loop carries on; the next
	/// write replaces the whole record.
	fn persist(&self) {
		if let Err(e) = self.writer.write(&self.status) {
			warn!(error = %e, "Failed to write daemon status");
		}
	}

	fn log(&self, message: &str) {
		if let Err(e) = self.writer.log(message) {
			warn!(error = %e, "Failed to append to daemon log");
		}
	}
}

/// Record an out-of-band fault (a panic or an error escaping the loop) as
/// status `error`.
pub fn record_fault(writer: &StatusWriter, message: &str) {
	let result = writer.update(|s| {
		s.status = DaemonState::Error;
		s.next_refresh = None;
		s.last_error = Some(message.to_string());
	});
	if let Err(e) = result {
		// No record yet; write a minimal one so readers see the fault.
		let mut status = DaemonStatus::starting(std::process::id(), Utc::now(), 0);
		status.refresh_interval_minutes = None;
		status.status = DaemonState::Error;
		status.last_error = Some(message.to_string());
		if let Err(write_err) = writer.write(&status) {
			error!(error = %write_err, update_error = %e, fault = message, "Failed to record fault");
		}
	}
	if let Err(e) = writer.log(&format!("Daemon fault: {message}")) {
		warn!(error = %e, "Failed to append to daemon log");
	}
}

/// Chain a panic hook that records the panic as a fault before the default
/// hook runs.
pub fn install_panic_hook(writer: StatusWriter) {
	let previous = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		let payload = info
			.payload()
			.downcast_ref::<&str>()
			.map(|s| s.to_string())
			.or_else(|| info.payload().downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "unknown panic".to_string());
		let location = info
			.location()
			.map(|l| format!(" at {}:{}", l.file(), l.line()))
			.unwrap_or_default();
		record_fault(&writer, &format!("panic: {payload}{location}"));
		previous(info);
	}));
}
