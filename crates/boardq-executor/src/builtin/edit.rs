// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools that change or remove existing board objects.

use async_trait::async_trait;
use boardq_core::{BoardMutator, BoardqError};
use serde_json::{Map, Value, json};

use super::{Args, kind, props};
use crate::tool::{BoardTool, ToolOutput};

fn object_id_schema(extra: Value, required: &[&str]) -> Value {
    let mut properties = json!({ "objectId": { "type": "string" } });
    if let (Some(map), Value::Object(extra)) = (properties.as_object_mut(), extra) {
        map.extend(extra);
    }
    let mut required_keys = vec!["objectId"];
    required_keys.extend_from_slice(required);
    json!({ "type": "object", "properties": properties, "required": required_keys })
}

/// `moveObject { objectId, x, y }`
pub struct MoveObjectTool;

#[async_trait]
impl BoardTool for MoveObjectTool {
    fn name(&self) -> &str {
        "moveObject"
    }

    fn description(&self) -> &str {
        "Move an object to a new position"
    }

    fn parameters_schema(&self) -> Value {
        object_id_schema(
            json!({ "x": { "type": "number" }, "y": { "type": "number" } }),
            &["x", "y"],
        )
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let x = args.number("x")?;
        let y = args.number("y")?;
        let object = args.object(board, "objectId").await?;
        if object.object_type == kind::CONNECTOR {
            return Err(args.error("connectors follow their endpoints and cannot be moved"));
        }
        board
            .update_object(&object.id, props([("x", json!(x)), ("y", json!(y))]))
            .await?;
        Ok(ToolOutput::new(
            format!("Moved {} to ({x}, {y})", object.id),
            vec![object.id],
        ))
    }
}

/// `resizeObject { objectId, width, height }`
pub struct ResizeObjectTool;

#[async_trait]
impl BoardTool for ResizeObjectTool {
    fn name(&self) -> &str {
        "resizeObject"
    }

    fn description(&self) -> &str {
        "Change the width and height of an object"
    }

    fn parameters_schema(&self) -> Value {
        object_id_schema(
            json!({ "width": { "type": "number" }, "height": { "type": "number" } }),
            &["width", "height"],
        )
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let width = args.positive("width")?;
        let height = args.positive("height")?;
        let object = args.object(board, "objectId").await?;
        if !object.properties.contains_key("width") {
            return Err(args.error(format!("{} objects cannot be resized", object.object_type)));
        }
        board
            .update_object(
                &object.id,
                props([("width", json!(width)), ("height", json!(height))]),
            )
            .await?;
        Ok(ToolOutput::new(
            format!("Resized {} to {width}x{height}", object.id),
            vec![object.id],
        ))
    }
}

/// `updateText { objectId, newText }`
///
/// Frames store their text as `title`; notes and labels as `text`.
pub struct UpdateTextTool;

#[async_trait]
impl BoardTool for UpdateTextTool {
    fn name(&self) -> &str {
        "updateText"
    }

    fn description(&self) -> &str {
        "Replace the text of a sticky note, text label, or frame title"
    }

    fn parameters_schema(&self) -> Value {
        object_id_schema(json!({ "newText": { "type": "string" } }), &["newText"])
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let text = args.str("newText")?;
        let object = args.object(board, "objectId").await?;
        let field = match object.object_type.as_str() {
            kind::STICKY_NOTE | kind::TEXT => "text",
            kind::FRAME => "title",
            other => return Err(args.error(format!("{other} objects have no text"))),
        };
        board
            .update_object(&object.id, props([(field, json!(text))]))
            .await?;
        Ok(ToolOutput::new(
            format!("Updated text of {}", object.id),
            vec![object.id],
        ))
    }
}

/// `changeColor { objectId, color }`
pub struct ChangeColorTool;

#[async_trait]
impl BoardTool for ChangeColorTool {
    fn name(&self) -> &str {
        "changeColor"
    }

    fn description(&self) -> &str {
        "Change the color of an object"
    }

    fn parameters_schema(&self) -> Value {
        object_id_schema(json!({ "color": { "type": "string" } }), &["color"])
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let color = args.color("color")?;
        let object = args.object(board, "objectId").await?;
        if !object.properties.contains_key("color") {
            return Err(args.error(format!("{} objects have no color", object.object_type)));
        }
        board
            .update_object(&object.id, props([("color", json!(color))]))
            .await?;
        Ok(ToolOutput::new(
            format!("Changed color of {} to {color}", object.id),
            vec![object.id],
        ))
    }
}

/// Deletes `ids` plus every connector attached to one of them.
async fn delete_with_connectors(
    board: &dyn BoardMutator,
    ids: Vec<String>,
) -> Result<Vec<String>, BoardqError> {
    let attached: Vec<String> = board
        .get_objects()
        .await?
        .into_iter()
        .filter(|o| o.object_type == kind::CONNECTOR && !ids.contains(&o.id))
        .filter(|o| {
            ["fromId", "toId"].iter().any(|end| {
                o.properties
                    .get(*end)
                    .and_then(Value::as_str)
                    .is_some_and(|id| ids.iter().any(|d| d == id))
            })
        })
        .map(|o| o.id)
        .collect();

    let mut removed = ids;
    removed.extend(attached);
    board.delete_objects(&removed).await?;
    Ok(removed)
}

/// `deleteObject { objectId }`
pub struct DeleteObjectTool;

#[async_trait]
impl BoardTool for DeleteObjectTool {
    fn name(&self) -> &str {
        "deleteObject"
    }

    fn description(&self) -> &str {
        "Delete one object and any connectors attached to it"
    }

    fn parameters_schema(&self) -> Value {
        object_id_schema(json!({}), &[])
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let object = args.object(board, "objectId").await?;
        let removed = delete_with_connectors(board, vec![object.id.clone()]).await?;
        Ok(ToolOutput::new(format!("Deleted {}", object.id), removed))
    }
}

/// `deleteObjects { objectIds }`
///
/// Every id must exist; nothing is removed otherwise.
pub struct DeleteObjectsTool;

#[async_trait]
impl BoardTool for DeleteObjectsTool {
    fn name(&self) -> &str {
        "deleteObjects"
    }

    fn description(&self) -> &str {
        "Delete several objects at once"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "objectIds": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["objectIds"]
        })
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let mut ids: Vec<String> = Vec::new();
        for id in args.string_list("objectIds")? {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        for id in &ids {
            if board.get_object(id).await?.is_none() {
                return Err(args.error(format!("object {id} not found")));
            }
        }
        let count = ids.len();
        let removed = delete_with_connectors(board, ids).await?;
        Ok(ToolOutput::new(format!("Deleted {count} objects"), removed))
    }
}
