// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_common_config::require_secret_env;
use warden_daemon::config::{
	DEFAULT_MAX_RUNTIME_HOURS, DEFAULT_REFRESH_INTERVAL_MINUTES, DEFAULT_SAFETY_MARGIN_MINUTES,
};
use warden_daemon::reporter::{classify_health, render_status};
use warden_daemon::{
	child, ChildBootstrap, ControllerOptions, DaemonConfig, DaemonController, OutputMode,
	ToolRegistry,
};
use warden_status::StatusPaths;

const ENV_PRIVATE_KEY: &str = "WARDEN_PRIVATE_KEY";

/// warden - keeps a CI job authenticated as a GitHub App for its whole run
#[derive(Parser, Debug)]
#[command(name = "warden", version, about, long_about = None)]
struct Cli {
	/// Log filter used when RUST_LOG is unset
	#[arg(long, env = "WARDEN_LOG_LEVEL", default_value = "info", global = true)]
	log_level: String,

	#[arg(long, value_enum, env = "WARDEN_LOG_FORMAT", default_value_t = LogFormat::Compact, global = true)]
	log_format: LogFormat,

	/// Directory holding the status, log and pid files
	#[arg(long, env = "WARDEN_STATE_DIR", global = true)]
	state_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
	Pretty,
	Compact,
	Json,
}

/// GitHub App identity and refresh schedule. The private key is read from
/// WARDEN_PRIVATE_KEY or WARDEN_PRIVATE_KEY_FILE, never from argv.
#[derive(Args, Debug, Clone)]
struct AppArgs {
	#[arg(long, env = "WARDEN_APP_ID")]
	app_id: u64,

	/// Repository owner the App is installed on
	#[arg(long, env = "WARDEN_OWNER")]
	owner: String,

	#[arg(long, env = "WARDEN_REPO")]
	repo: String,

	#[arg(long, env = "WARDEN_REFRESH_INTERVAL_MINUTES", default_value_t = DEFAULT_REFRESH_INTERVAL_MINUTES)]
	refresh_interval_minutes: u64,

	#[arg(long, env = "WARDEN_MAX_RUNTIME_HOURS", default_value_t = DEFAULT_MAX_RUNTIME_HOURS)]
	max_runtime_hours: u64,

	#[arg(long, env = "WARDEN_SAFETY_MARGIN_MINUTES", default_value_t = DEFAULT_SAFETY_MARGIN_MINUTES)]
	safety_margin_minutes: u64,

	/// GitHub Enterprise API URL, e.g. https://ghe.example.com/api/v3
	#[arg(long, env = "WARDEN_GITHUB_API_URL")]
	github_api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Start the refresh daemon in the background, replacing any running one
	Start(AppArgs),

	/// Stop the daemon and remove its status files
	Stop,

	/// Show the daemon's status
	Status {
		/// Print the raw status record
		#[arg(long)]
		json: bool,
	},

	/// Show recent daemon log lines
	Logs {
		#[arg(short = 'n', long, default_value_t = 50)]
		tail: usize,
	},

	/// Classify daemon health; exits 0 for healthy or warning
	Health,

	/// Read-only monitoring tools
	Tools {
		#[command(subcommand)]
		command: ToolsCommand,
	},

	/// Mint one installation token and print it
	Token(AppArgs),

	/// Run the refresh loop in this process (used by `start`)
	#[command(name = "daemon-run", hide = true)]
	DaemonRun,
}

#[derive(Subcommand, Debug)]
enum ToolsCommand {
	/// List tool definitions
	List,

	/// Invoke a tool with optional JSON arguments
	Call {
		name: String,
		#[arg(default_value = "{}")]
		args: String,
	},
}

fn init_tracing(level: &str, format: LogFormat) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	match format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_writer(std::io::stderr))
				.init();
		}
	}
}

fn daemon_config(app: &AppArgs) -> Result<DaemonConfig> {
	let private_key = require_secret_env(ENV_PRIVATE_KEY).context("GitHub App private key")?;
	let config = DaemonConfig {
		app_id: app.app_id,
		private_key,
		owner: app.owner.clone(),
		repo: app.repo.clone(),
		refresh_interval_minutes: app.refresh_interval_minutes,
		max_runtime_hours: app.max_runtime_hours,
		safety_margin_minutes: app.safety_margin_minutes,
		api_base_url: app.github_api_url.clone(),
	};
	config.validate().context("invalid daemon configuration")?;
	Ok(config)
}

fn status_paths(state_dir: Option<PathBuf>) -> StatusPaths {
	StatusPaths::in_dir(state_dir.unwrap_or_else(StatusPaths::default_dir))
}

fn controller(paths: StatusPaths, output: OutputMode) -> Result<DaemonController> {
	let options = ControllerOptions::current_exe()
		.context("cannot locate the warden executable")?
		.with_output(output);
	Ok(DaemonController::new(paths, options)?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_tracing(&cli.log_level, cli.log_format);

	let paths = status_paths(cli.state_dir);
	debug!(status_file = %paths.status_file.display(), "Using status channel");

	match cli.command {
		Command::DaemonRun => {
			let bootstrap = ChildBootstrap::from_env().context("daemon bootstrap")?;
			let code = child::run(bootstrap).await;
			Ok(ExitCode::from(code as u8))
		}
		Command::Start(app) => {
			let config = daemon_config(&app)?;
			// Discard: this process exits right away and cannot drain pipes.
			let mut controller = controller(paths, OutputMode::Discard)?;
			let status = controller
				.start_daemon(&config)
				.await
				.context("daemon failed to start")?;
			info!(pid = status.pid, "Daemon started");
			println!("Daemon started (pid {})", status.pid);
			Ok(ExitCode::SUCCESS)
		}
		Command::Stop => {
			controller(paths, OutputMode::Discard)?.stop_daemon().await;
			println!("Daemon stopped");
			Ok(ExitCode::SUCCESS)
		}
		Command::Status { json } => {
			let mut controller = controller(paths, OutputMode::Discard)?;
			let status = controller.get_status();
			if json {
				println!("{}", serde_json::to_string_pretty(&status)?);
			} else {
				let alive = status
					.as_ref()
					.is_some_and(|s| controller.pid_is_alive(s.pid));
				println!("{}", render_status(status.as_ref(), alive));
				println!("Healthy: {}", controller.is_healthy());
			}
			Ok(ExitCode::SUCCESS)
		}
		Command::Logs { tail } => {
			println!("{}", controller(paths, OutputMode::Discard)?.get_logs(tail));
			Ok(ExitCode::SUCCESS)
		}
		Command::Health => {
			let mut controller = controller(paths, OutputMode::Discard)?;
			let status = controller.get_status();
			let alive = status
				.as_ref()
				.is_some_and(|s| controller.pid_is_alive(s.pid));
			let report = classify_health(status.as_ref(), alive, Utc::now());
			println!("{}: {}", report.health, report.detail);
			Ok(if report.health.is_ok() {
				ExitCode::SUCCESS
			} else {
				ExitCode::FAILURE
			})
		}
		Command::Tools { command } => {
			let registry = ToolRegistry::status_tools(paths);
			match command {
				ToolsCommand::List => {
					println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
				}
				ToolsCommand::Call { name, args } => {
					let args: serde_json::Value =
						serde_json::from_str(&args).context("tool arguments must be JSON")?;
					let result = registry.invoke(&name, args).await?;
					println!("{}", serde_json::to_string_pretty(&result)?);
				}
			}
			Ok(ExitCode::SUCCESS)
		}
		Command::Token(app) => {
			let config = daemon_config(&app)?;
			let mut minter = config.build_minter()?;
			let credential = minter
				.current_or_refreshed()
				.await
				.context("failed to mint installation token")?;
			info!(scope_id = credential.scope_id, expires_at = %credential.expires_at, "Minted token");
			println!("{}", credential.token.expose());
			Ok(ExitCode::SUCCESS)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		use clap::CommandFactory;
		Cli::command().debug_assert();
	}

	#[test]
	fn start_uses_schedule_defaults() {
		let cli = Cli::try_parse_from([
			"warden", "start", "--app-id", "12", "--owner", "acme", "--repo", "widgets",
		])
		.unwrap();
		let Command::Start(app) = cli.command else {
			panic!("expected start");
		};
		assert_eq!(app.refresh_interval_minutes, 30);
		assert_eq!(app.max_runtime_hours, 6);
		assert_eq!(app.safety_margin_minutes, 5);
	}

	#[test]
	fn logs_tail_defaults_to_fifty() {
		let cli = Cli::try_parse_from(["warden", "logs"]).unwrap();
		assert!(matches!(cli.command, Command::Logs { tail: 50 }));
	}

	#[test]
	fn daemon_run_is_accepted() {
		let cli = Cli::try_parse_from(["warden", "daemon-run"]).unwrap();
		assert!(matches!(cli.command, Command::DaemonRun));
	}

	#[test]
	fn tools_call_defaults_to_empty_args() {
		let cli = Cli::try_parse_from(["warden", "tools", "call", "get-logs"]).unwrap();
		match cli.command {
			Command::Tools {
				command: ToolsCommand::Call { name, args },
			} => {
				assert_eq!(name, "get-logs");
				assert_eq!(args, "{}");
			}
			other => panic!("unexpected command {other:?}"),
		}
	}
}
