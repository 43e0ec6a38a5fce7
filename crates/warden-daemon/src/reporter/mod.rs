// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The read-only monitoring surface over the StatusChannel.
//!
//! Every tool holds a [`StatusReader`] and nothing else, so no tool can
//! change daemon state or trigger a refresh.

mod health;
mod tools;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use warden_status::{StatusPaths, StatusReader};

pub use health::{classify_health, HealthReport, HealthState, STALENESS_FACTOR};
pub use tools::{
	render_status, CheckHealthTool, GetLogsTool, GetStatusTool, DEFAULT_TAIL_LINES, MAX_TAIL_LINES,
};

#[derive(Debug, Error)]
pub enum ToolError {
	#[error("Tool not found: {0}")]
	NotFound(String),

	#[error("Invalid arguments: {0}")]
	InvalidArguments(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
	pub name: String,
	pub description: String,
	pub input_schema: serde_json::Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
	fn name(&self) -> &str;

	fn description(&self) -> &str;

	fn input_schema(&self) -> serde_json::Value;

	fn to_definition(&self) -> ToolDefinition {
		ToolDefinition {
			name: self.name().to_string(),
			description: self.description().to_string(),
			input_schema: self.input_schema(),
		}
	}

	async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

pub struct ToolRegistry {
	tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
	pub fn new() -> Self {
		Self {
			tools: BTreeMap::new(),
		}
	}

	/// The three status tools over `paths`.
	pub fn status_tools(paths: StatusPaths) -> Self {
		let reader = StatusReader::new(paths);
		let mut registry = Self::new();
		registry.register(Box::new(GetStatusTool::new(reader.clone())));
		registry.register(Box::new(GetLogsTool::new(reader.clone())));
		registry.register(Box::new(CheckHealthTool::new(reader)));
		registry
	}

	pub fn register(&mut self, tool: Box<dyn Tool>) {
		let name = tool.name().to_string();
		tracing::debug!(tool_name = %name, "registering tool");
		self.tools.insert(name, tool);
	}

	pub fn get(&self, name: &str) -> Option<&dyn Tool> {
		self.tools.get(name).map(|t| t.as_ref())
	}

	/// Definitions ordered by name.
	pub fn definitions(&self) -> Vec<ToolDefinition> {
		self.tools.values().map(|t| t.to_definition()).collect()
	}

	pub async fn invoke(
		&self,
		name: &str,
		args: serde_json::Value,
	) -> Result<serde_json::Value, ToolError> {
		let tool = self
			.get(name)
			.ok_or_else(|| ToolError::NotFound(name.to_string()))?;
		tool.invoke(args).await
	}
}

impl Default for ToolRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use tempfile::TempDir;

	#[test]
	fn status_tools_are_the_three_read_operations() {
		let registry = ToolRegistry::status_tools(StatusPaths::in_dir("/nonexistent"));
		let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
		assert_eq!(names, vec!["check-health", "get-logs", "get-status"]);
	}

	#[tokio::test]
	async fn unknown_tool_is_not_found() {
		let dir = TempDir::new().unwrap();
		let registry = ToolRegistry::status_tools(StatusPaths::in_dir(dir.path()));
		assert!(matches!(
			registry.invoke("refresh-now", serde_json::json!({})).await,
			Err(ToolError::NotFound(name)) if name == "refresh-now"
		));
	}

	struct NamedTool(String);

	#[async_trait]
	impl Tool for NamedTool {
		fn name(&self) -> &str {
			&self.0
		}

		fn description(&self) -> &str {
			"test tool"
		}

		fn input_schema(&self) -> serde_json::Value {
			serde_json::json!({"type": "object", "properties": {}})
		}

		async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
			Ok(serde_json::json!({"result": "ok"}))
		}
	}

	proptest! {
		#[test]
		fn registry_returns_one_definition_per_name(
			names in prop::collection::hash_set("[a-z][a-z0-9-]{0,20}", 0..10)
		) {
			let mut registry = ToolRegistry::new();
			for name in &names {
				registry.register(Box::new(NamedTool(name.clone())));
			}
			prop_assert_eq!(registry.definitions().len(), names.len());
			for name in &names {
				prop_assert!(registry.get(name).is_some());
			}
		}
	}
}
