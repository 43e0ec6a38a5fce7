// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Spawning, tracking and stopping the daemon process from the caller.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use warden_status::process::{self, Signal, SignalError};
use warden_status::{DaemonState, DaemonStatus, OutputStream, StatusPaths, StatusReader, StatusSeeder};

use crate::config::{ChildBootstrap, DaemonConfig};
use crate::error::{DaemonError, Result};

/// Subcommand the default program runs to become the daemon.
pub const DAEMON_RUN_ARG: &str = "daemon-run";
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);
pub const NO_LOGS: &str = "No logs available";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What happens to the daemon's stdout and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
	/// Tag each line and append it to the log. Requires the caller to stay
	/// alive to drain the pipes.
	Capture,
	/// Send to /dev/null. For callers that exit right after starting.
	Discard,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
	pub program: PathBuf,
	pub args: Vec<OsString>,
	pub grace_period: Duration,
	pub output: OutputMode,
}

impl ControllerOptions {
	/// Re-run the current executable with `daemon-run`.
	pub fn current_exe() -> std::io::Result<Self> {
		Ok(Self::new(std::env::current_exe()?, [DAEMON_RUN_ARG]))
	}

	pub fn new<I, A>(program: impl Into<PathBuf>, args: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<OsString>,
	{
		Self {
			program: program.into(),
			args: args.into_iter().map(Into::into).collect(),
			grace_period: DEFAULT_GRACE_PERIOD,
			output: OutputMode::Capture,
		}
	}

	pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
		self.grace_period = grace_period;
		self
	}

	pub fn with_output(mut self, output: OutputMode) -> Self {
		self.output = output;
		self
	}
}

/// The daemon this controller started.
#[derive(Debug)]
pub struct DaemonHandle {
	pid: u32,
	child: Child,
	capture: Vec<JoinHandle<()>>,
}

impl DaemonHandle {
	pub fn pid(&self) -> u32 {
		self.pid
	}
}

pub struct DaemonController {
	seeder: StatusSeeder,
	options: ControllerOptions,
	handle: Option<DaemonHandle>,
}

impl DaemonController {
	pub fn new(paths: StatusPaths, options: ControllerOptions) -> Result<Self> {
		Ok(Self {
			seeder: StatusSeeder::open(paths)?,
			options,
			handle: None,
		})
	}

	pub fn reader(&self) -> StatusReader {
		self.seeder.reader()
	}

	pub fn handle(&self) -> Option<&DaemonHandle> {
		self.handle.as_ref()
	}

	/// Stop any previous daemon, spawn a new one and seed its status record.
	/// Returns without waiting for the first refresh.
	#[instrument(skip_all, fields(scope = %config.scope()))]
	pub async fn start_daemon(&mut self, config: &DaemonConfig) -> Result<DaemonStatus> {
		config.validate()?;
		self.stop_daemon().await;
		self.seeder.reset_log()?;

		let env = ChildBootstrap::env_vars(config, self.seeder.paths())?;
		let mut cmd = Command::new(&self.options.program);
		cmd.args(&self.options.args)
			.envs(env)
			.stdin(Stdio::null())
			.kill_on_drop(false);

		match self.options.output {
			OutputMode::Capture => {
				cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
			}
			OutputMode::Discard => {
				cmd.stdout(Stdio::null()).stderr(Stdio::null());
			}
		}

		// SAFETY: setsid is async-signal-safe and touches no parent state.
		unsafe {
			cmd.pre_exec(|| {
				if libc::setsid() == -1 {
					return Err(std::io::Error::last_os_error());
				}
				Ok(())
			});
		}

		let program = self.options.program.display().to_string();
		let mut child = cmd
			.spawn()
			.map_err(|e| DaemonError::spawn(&program, e))?;
		let pid = child.id().ok_or_else(|| {
			DaemonError::spawn(
				&program,
				std::io::Error::new(std::io::ErrorKind::Other, "process exited during spawn"),
			)
		})?;

		let mut capture = Vec::new();
		if let Some(stdout) = child.stdout.take() {
			capture.push(self.spawn_capture(stdout, OutputStream::Stdout));
		}
		if let Some(stderr) = child.stderr.take() {
			capture.push(self.spawn_capture(stderr, OutputStream::Stderr));
		}
		self.handle = Some(DaemonHandle {
			pid,
			child,
			capture,
		});

		self.seeder.write_pid(pid)?;
		let initial = DaemonStatus::starting(pid, Utc::now(), config.refresh_interval_minutes);
		self.seeder.seed_initial(&initial)?;
		info!(pid, program = %program, "Daemon started");

		Ok(self.get_status().unwrap_or(initial))
	}

	fn spawn_capture<R>(&self, pipe: R, stream: OutputStream) -> JoinHandle<()>
	where
		R: AsyncRead + Unpin + Send + 'static,
	{
		let seeder = self.seeder.clone();
		tokio::spawn(async move {
			let mut lines = BufReader::new(pipe).lines();
			loop {
				match lines.next_line().await {
					Ok(Some(line)) => {
						if let Err(e) = seeder.append_output(stream, &line) {
							warn!(error = %e, "Failed to append captured daemon output");
						}
					}
					Ok(None) => break,
					Err(e) => {
						debug!(error = %e, "Daemon output pipe closed");
						break;
					}
				}
			}
		})
	}

	/// Terminate the daemon (if any) and remove its pid and status files.
	/// Never fails; problems are logged.
	#[instrument(skip_all)]
	pub async fn stop_daemon(&mut self) {
		let handle = self.handle.take();
		let pid = handle
			.as_ref()
			.map(|h| h.pid)
			.or_else(|| self.seeder.reader().read_pid());

		match (pid, handle) {
			(_, Some(handle)) => self.terminate_child(handle).await,
			(Some(pid), None) => self.terminate_pid(pid).await,
			(None, None) => debug!("No daemon to stop"),
		}

		if let Err(e) = self.seeder.clear() {
			warn!(error = %e, "Failed to remove daemon status files");
		}
	}

	async fn terminate_child(&self, mut handle: DaemonHandle) {
		let pid = handle.pid;
		if !matches!(handle.child.try_wait(), Ok(None)) {
			debug!(pid, "Daemon already exited");
		} else if signal_or_log(pid, Signal::Term) {
			let exited = tokio::time::timeout(self.options.grace_period, handle.child.wait()).await;
			if exited.is_err() {
				warn!(pid, "Daemon ignored SIGTERM, sending SIGKILL");
				if signal_or_log(pid, Signal::Kill) {
					match handle.child.wait().await {
						Ok(exit) => debug!(pid, %exit, "Daemon reaped after SIGKILL"),
						Err(e) => debug!(pid, error = %e, "Failed to reap daemon after SIGKILL"),
					}
				}
			}
			info!(pid, "Daemon stopped");
		}

		for task in handle.capture {
			match tokio::time::timeout(self.options.grace_period, task).await {
				Ok(Ok(())) => {}
				Ok(Err(e)) => debug!(pid, error = %e, "Output capture task failed"),
				Err(_) => debug!(pid, "Output capture still draining after grace period"),
			}
		}
	}

	/// Stop a daemon known only by its pid file, started by another
	/// controller instance.
	async fn terminate_pid(&self, pid: u32) {
		if !process::is_alive(pid) {
			debug!(pid, "Recorded daemon is not running");
			return;
		}
		if !signal_or_log(pid, Signal::Term) {
			return;
		}

		let deadline = tokio::time::Instant::now() + self.options.grace_period;
		while tokio::time::Instant::now() < deadline {
			if !process::is_alive(pid) {
				info!(pid, "Daemon stopped");
				return;
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}

		if process::is_alive(pid) {
			warn!(pid, "Daemon ignored SIGTERM, sending SIGKILL");
			signal_or_log(pid, Signal::Kill);
		}
	}

	/// The current status record, if readable.
	pub fn get_status(&self) -> Option<DaemonStatus> {
		self.seeder.reader().read_status()
	}

	/// Self-reported `running` and an OS-live pid.
	pub fn is_healthy(&mut self) -> bool {
		match self.get_status() {
			Some(status) if status.status == DaemonState::Running => self.pid_is_alive(status.pid),
			_ => false,
		}
	}

	/// Like [`process::is_alive`], but a child of ours that has exited and
	/// not been reaped counts as dead.
	pub fn pid_is_alive(&mut self, pid: u32) -> bool {
		match self.handle.as_mut() {
			Some(handle) if handle.pid == pid => matches!(handle.child.try_wait(), Ok(None)),
			_ => process::is_alive(pid),
		}
	}

	pub fn get_logs(&self, tail_lines: usize) -> String {
		match self.seeder.reader().tail_logs(tail_lines) {
			Some(lines) if !lines.is_empty() => lines.join("\n"),
			_ => NO_LOGS.to_string(),
		}
	}
}

/// Returns whether the signal was delivered. A vanished process is already
/// stopped.
fn signal_or_log(pid: u32, signal: Signal) -> bool {
	match process::send_signal(pid, signal) {
		Ok(()) => true,
		Err(SignalError::NoSuchProcess(_)) => {
			debug!(pid, ?signal, "Daemon already gone");
			false
		}
		Err(e) => {
			warn!(pid, ?signal, error = %DaemonError::from(e), "Failed to signal daemon");
			false
		}
	}
}
