// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Liveness probing and signalling by pid.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
	Term,
	Kill,
}

impl Signal {
	fn as_raw(self) -> libc::c_int {
		match self {
			Signal::Term => libc::SIGTERM,
			Signal::Kill => libc::SIGKILL,
		}
	}
}

#[derive(Debug, Error)]
pub enum SignalError {
	#[error("no process with pid {0}")]
	NoSuchProcess(u32),

	#[error("not permitted to signal pid {0}")]
	PermissionDenied(u32),

	#[error("failed to signal pid {pid}: {source}")]
	Os {
		pid: u32,
		#[source]
		source: std::io::Error,
	},
}

fn to_pid_t(pid: u32) -> Option<libc::pid_t> {
	// 0 and negative values address process groups, never a single process.
	libc::pid_t::try_from(pid).ok().filter(|p| *p > 0)
}

/// Whether a process with this pid exists. A process owned by another user
/// counts as alive.
pub fn is_alive(pid: u32) -> bool {
	let Some(raw) = to_pid_t(pid) else {
		return false;
	};
	// SAFETY: signal 0 performs the permission and existence checks only.
	let rc = unsafe { libc::kill(raw, 0) };
	if rc == 0 {
		return true;
	}
	std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

pub fn send_signal(pid: u32, signal: Signal) -> Result<(), SignalError> {
	let raw = to_pid_t(pid).ok_or(SignalError::NoSuchProcess(pid))?;
	// SAFETY: plain syscall on a positive pid.
	let rc = unsafe { libc::kill(raw, signal.as_raw()) };
	if rc == 0 {
		return Ok(());
	}

	let err = std::io::Error::last_os_error();
	match err.raw_os_error() {
		Some(libc::ESRCH) => Err(SignalError::NoSuchProcess(pid)),
		Some(libc::EPERM) => Err(SignalError::PermissionDenied(pid)),
		_ => Err(SignalError::Os { pid, source: err }),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn own_process_is_alive() {
		assert!(is_alive(std::process::id()));
	}

	#[test]
	fn reaped_child_is_not_alive() {
		let mut child = std::process::Command::new("true").spawn().unwrap();
		let pid = child.id();
		child.wait().unwrap();
		assert!(!is_alive(pid));
	}

	#[test]
	fn out_of_range_pids_are_never_alive() {
		assert!(!is_alive(0));
		assert!(!is_alive(u32::MAX));
	}

	#[test]
	fn signalling_reaped_child_is_no_such_process() {
		let mut child = std::process::Command::new("true").spawn().unwrap();
		let pid = child.id();
		child.wait().unwrap();
		assert!(matches!(
			send_signal(pid, Signal::Term),
			Err(SignalError::NoSuchProcess(p)) if p == pid
		));
	}

	#[test]
	fn terminates_sleeping_child() {
		let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
		send_signal(child.id(), Signal::Term).unwrap();
		let status = child.wait().unwrap();
		assert!(!status.success());
	}
}
