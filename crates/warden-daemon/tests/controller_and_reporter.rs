// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The controller and the reporter observe the same status files.

use std::time::Duration;

use tempfile::TempDir;
use warden_daemon::{ControllerOptions, DaemonConfig, DaemonController, ToolRegistry};
use warden_status::StatusPaths;

fn config() -> DaemonConfig {
	DaemonConfig::new(7, "test-key", "acme", "widgets")
}

#[tokio::test]
async fn reporter_follows_daemon_lifecycle() {
	let dir = TempDir::new().unwrap();
	let paths = StatusPaths::in_dir(dir.path());
	let options =
		ControllerOptions::new("sleep", ["30"]).with_grace_period(Duration::from_millis(500));
	let mut controller = DaemonController::new(paths.clone(), options).unwrap();
	let tools = ToolRegistry::status_tools(paths);

	let before = tools
		.invoke("check-health", serde_json::json!({}))
		.await
		.unwrap();
	assert_eq!(before["health"], "unknown");

	let started = controller.start_daemon(&config()).await.unwrap();

	let health = tools
		.invoke("check-health", serde_json::json!({}))
		.await
		.unwrap();
	assert_eq!(health["health"], "healthy");

	let status = tools
		.invoke("get-status", serde_json::json!({}))
		.await
		.unwrap();
	assert_eq!(status["status"]["pid"], started.pid);
	assert_eq!(status["alive"], true);

	controller.stop_daemon().await;

	let after = tools
		.invoke("check-health", serde_json::json!({}))
		.await
		.unwrap();
	assert_eq!(after["health"], "unknown");
	assert!(controller.get_status().is_none());
}

#[tokio::test]
async fn second_controller_stops_daemon_by_pid_file() {
	let dir = TempDir::new().unwrap();
	let paths = StatusPaths::in_dir(dir.path());
	let options =
		ControllerOptions::new("sleep", ["30"]).with_grace_period(Duration::from_millis(500));

	let mut first = DaemonController::new(paths.clone(), options.clone()).unwrap();
	let started = first.start_daemon(&config()).await.unwrap();

	let mut second = DaemonController::new(paths.clone(), options).unwrap();
	assert_eq!(second.reader().read_pid(), Some(started.pid));
	second.stop_daemon().await;

	assert!(!paths.pid_file.exists());
	assert!(!paths.status_file.exists());

	// The first controller still holds the child; reaping it shows it died.
	assert!(!first.pid_is_alive(started.pid));
}
