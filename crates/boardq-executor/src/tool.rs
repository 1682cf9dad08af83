// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board tool trait and registry.
//!
//! A [`BoardTool`] turns one named tool call into calls on the
//! [`BoardMutator`] boundary. The [`ToolRegistry`] resolves tool calls by
//! name for the sequential executor and can describe the catalogue as JSON
//! for the interpreter service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use boardq_core::{BoardMutator, BoardqError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a tool did to the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Short human-readable summary.
    pub message: String,
    /// Ids of objects created, changed, or removed.
    pub affected_objects: Vec<String>,
}

impl ToolOutput {
    pub fn new(message: impl Into<String>, affected_objects: Vec<String>) -> Self {
        Self {
            message: message.into(),
            affected_objects,
        }
    }
}

/// One board-editing capability the interpreter may ask for.
#[async_trait]
pub trait BoardTool: Send + Sync {
    /// Name the interpreter uses in `ToolCall::name`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments.
    fn parameters_schema(&self) -> Value;

    /// Validates `arguments` and applies the tool to `board`.
    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError>;
}

/// Tools indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn BoardTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// A registry holding every built-in board tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtins(&mut registry);
        registry
    }

    /// Registers a tool under its `name()`, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn BoardTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BoardTool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `{name, description, parameters}` for every tool, sorted by name.
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
