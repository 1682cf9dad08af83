// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools that add objects to the board.

use async_trait::async_trait;
use boardq_core::{BoardMutator, BoardqError, NewBoardObject};
use serde_json::{Map, Value, json};

use super::{Args, kind, props};
use crate::tool::{BoardTool, ToolOutput};

const NOTE_SIZE: f64 = 200.0;
const NOTE_COLOR: &str = "#fff59d";
const SHAPE_SIZE: f64 = 100.0;
const SHAPE_COLOR: &str = "#90caf9";
const SHAPE_KINDS: &[&str] = &["rectangle", "circle", "triangle", "diamond"];
const TEXT_FONT_SIZE: f64 = 16.0;
const TEXT_COLOR: &str = "#000000";
const FRAME_WIDTH: f64 = 400.0;
const FRAME_HEIGHT: f64 = 300.0;
const CONNECTOR_STYLES: &[&str] = &["straight", "curved", "elbow"];

async fn create(
    board: &dyn BoardMutator,
    object_type: &str,
    properties: Map<String, Value>,
) -> Result<ToolOutput, BoardqError> {
    let id = board
        .create_object(NewBoardObject {
            object_type: object_type.to_string(),
            properties,
        })
        .await?;
    Ok(ToolOutput::new(format!("Created {object_type} {id}"), vec![id]))
}

fn position_schema() -> Value {
    json!({
        "x": { "type": "number", "description": "Left edge in board units" },
        "y": { "type": "number", "description": "Top edge in board units" }
    })
}

fn with_position(mut properties: Value, required: &[&str]) -> Value {
    if let Some(map) = properties.as_object_mut()
        && let Value::Object(position) = position_schema()
    {
        map.extend(position);
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

/// `createStickyNote { text, x?, y?, color? }`
pub struct CreateStickyNoteTool;

#[async_trait]
impl BoardTool for CreateStickyNoteTool {
    fn name(&self) -> &str {
        "createStickyNote"
    }

    fn description(&self) -> &str {
        "Create a sticky note with text"
    }

    fn parameters_schema(&self) -> Value {
        with_position(
            json!({
                "text": { "type": "string" },
                "color": { "type": "string", "description": "#rrggbb or a color name" }
            }),
            &["text"],
        )
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let properties = props([
            ("text", json!(args.str("text")?)),
            ("x", json!(args.number_or("x", 0.0)?)),
            ("y", json!(args.number_or("y", 0.0)?)),
            ("width", json!(NOTE_SIZE)),
            ("height", json!(NOTE_SIZE)),
            ("color", json!(args.color_or("color", NOTE_COLOR)?)),
        ]);
        create(board, kind::STICKY_NOTE, properties).await
    }
}

/// `createShape { type, x?, y?, width?, height?, color? }`
pub struct CreateShapeTool;

#[async_trait]
impl BoardTool for CreateShapeTool {
    fn name(&self) -> &str {
        "createShape"
    }

    fn description(&self) -> &str {
        "Create a rectangle, circle, triangle, or diamond"
    }

    fn parameters_schema(&self) -> Value {
        with_position(
            json!({
                "type": { "type": "string", "enum": SHAPE_KINDS },
                "width": { "type": "number" },
                "height": { "type": "number" },
                "color": { "type": "string" }
            }),
            &["type"],
        )
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let shape = args.str("type")?.to_ascii_lowercase();
        if !SHAPE_KINDS.contains(&shape.as_str()) {
            return Err(args.error(format!(
                "unsupported shape '{shape}', expected one of {}",
                SHAPE_KINDS.join(", ")
            )));
        }
        let properties = props([
            ("shape", json!(shape)),
            ("x", json!(args.number_or("x", 0.0)?)),
            ("y", json!(args.number_or("y", 0.0)?)),
            ("width", json!(args.positive_or("width", SHAPE_SIZE)?)),
            ("height", json!(args.positive_or("height", SHAPE_SIZE)?)),
            ("color", json!(args.color_or("color", SHAPE_COLOR)?)),
        ]);
        create(board, kind::SHAPE, properties).await
    }
}

/// `createText { text, x?, y?, fontSize?, color? }`
pub struct CreateTextTool;

#[async_trait]
impl BoardTool for CreateTextTool {
    fn name(&self) -> &str {
        "createText"
    }

    fn description(&self) -> &str {
        "Place a free-standing text label"
    }

    fn parameters_schema(&self) -> Value {
        with_position(
            json!({
                "text": { "type": "string" },
                "fontSize": { "type": "number" },
                "color": { "type": "string" }
            }),
            &["text"],
        )
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let properties = props([
            ("text", json!(args.str("text")?)),
            ("x", json!(args.number_or("x", 0.0)?)),
            ("y", json!(args.number_or("y", 0.0)?)),
            ("fontSize", json!(args.positive_or("fontSize", TEXT_FONT_SIZE)?)),
            ("color", json!(args.color_or("color", TEXT_COLOR)?)),
        ]);
        create(board, kind::TEXT, properties).await
    }
}

/// `createFrame { title?, x?, y?, width?, height? }`
pub struct CreateFrameTool;

#[async_trait]
impl BoardTool for CreateFrameTool {
    fn name(&self) -> &str {
        "createFrame"
    }

    fn description(&self) -> &str {
        "Create a titled frame that groups an area of the board"
    }

    fn parameters_schema(&self) -> Value {
        with_position(
            json!({
                "title": { "type": "string" },
                "width": { "type": "number" },
                "height": { "type": "number" }
            }),
            &[],
        )
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let properties = props([
            ("title", json!(args.opt_str("title")?.unwrap_or("Frame"))),
            ("x", json!(args.number_or("x", 0.0)?)),
            ("y", json!(args.number_or("y", 0.0)?)),
            ("width", json!(args.positive_or("width", FRAME_WIDTH)?)),
            ("height", json!(args.positive_or("height", FRAME_HEIGHT)?)),
        ]);
        create(board, kind::FRAME, properties).await
    }
}

/// `createConnector { fromId, toId, style? }`
///
/// Both endpoints must exist and differ.
pub struct CreateConnectorTool;

#[async_trait]
impl BoardTool for CreateConnectorTool {
    fn name(&self) -> &str {
        "createConnector"
    }

    fn description(&self) -> &str {
        "Connect two existing objects with a line"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "fromId": { "type": "string" },
                "toId": { "type": "string" },
                "style": { "type": "string", "enum": CONNECTOR_STYLES }
            },
            "required": ["fromId", "toId"]
        })
    }

    async fn invoke(
        &self,
        board: &dyn BoardMutator,
        arguments: &Map<String, Value>,
    ) -> Result<ToolOutput, BoardqError> {
        let args = Args::new(self.name(), arguments);
        let from = args.object(board, "fromId").await?;
        let to = args.object(board, "toId").await?;
        if from.id == to.id {
            return Err(args.error("a connector needs two different objects"));
        }
        let style = args.opt_str("style")?.unwrap_or("straight");
        if !CONNECTOR_STYLES.contains(&style) {
            return Err(args.error(format!("unsupported connector style '{style}'")));
        }
        let properties = props([
            ("fromId", json!(from.id)),
            ("toId", json!(to.id)),
            ("style", json!(style)),
        ]);
        create(board, kind::CONNECTOR, properties).await
    }
}
