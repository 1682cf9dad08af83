// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only board tools.

use std::collections::BTreeMap;

use async_trait::async_trait;
use boardq_core::{BoardMutator, BoardqError};
use serde_json::{Map, Value, json};

use crate::tool::{BoardTool, ToolOutput};

/// `getBoardState {}`: summarizes the board without changing it.
pub struct GetBoardStateTool;

#[async_trait]
impl BoardTool for GetBoardStateTool {
    fn name(&self) -> &str {
        "getBoardState"
    }

    fn description(&self) -> &str {
        "Count the objects currently on the board by type"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        _arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let objects = board.get_objects().await?;
        if objects.is_empty() {
            return Ok(ToolOutput::new("Board is empty", Vec::new()));
        }

        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for object in &objects {
            *by_type.entry(object.object_type.as_str()).or_default() += 1;
        }
        let breakdown = by_type
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(ToolOutput::new(
            format!("Board has {} objects ({breakdown})", objects.len()),
            Vec::new(),
        ))
    }
}
