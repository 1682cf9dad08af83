// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in board tools.
//!
//! - [`create`]: sticky notes, shapes, text, frames, connectors
//! - [`edit`]: move, resize, retext, recolor, delete
//! - [`query`]: board summary

pub mod create;
pub mod edit;
pub mod query;

use std::sync::Arc;

use boardq_core::{BoardMutator, BoardObject, BoardqError};
use serde_json::{Map, Value};

use crate::ToolRegistry;

pub use create::{
    CreateConnectorTool, CreateFrameTool, CreateShapeTool, CreateStickyNoteTool, CreateTextTool,
};
pub use edit::{
    ChangeColorTool, DeleteObjectTool, DeleteObjectsTool, MoveObjectTool, ResizeObjectTool,
    UpdateTextTool,
};
pub use query::GetBoardStateTool;

/// Board object type names written by the built-in tools.
pub mod kind {
    pub const STICKY_NOTE: &str = "sticky_note";
    pub const SHAPE: &str = "shape";
    pub const TEXT: &str = "text";
    pub const FRAME: &str = "frame";
    pub const CONNECTOR: &str = "connector";
}

/// Named colors accepted in place of a `#rrggbb` value.
const PALETTE: &[(&str, &str)] = &[
    ("yellow", "#fff59d"),
    ("red", "#ff0000"),
    ("green", "#a5d6a7"),
    ("blue", "#90caf9"),
    ("orange", "#ffcc80"),
    ("purple", "#ce93d8"),
    ("pink", "#f48fb1"),
    ("gray", "#e0e0e0"),
    ("grey", "#e0e0e0"),
    ("black", "#000000"),
    ("white", "#ffffff"),
];

/// Registers every built-in tool into `registry`.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(Arc::new(CreateStickyNoteTool));
    registry.register(Arc::new(CreateShapeTool));
    registry.register(Arc::new(CreateTextTool));
    registry.register(Arc::new(CreateFrameTool));
    registry.register(Arc::new(CreateConnectorTool));
    registry.register(Arc::new(MoveObjectTool));
    registry.register(Arc::new(ResizeObjectTool));
    registry.register(Arc::new(UpdateTextTool));
    registry.register(Arc::new(ChangeColorTool));
    registry.register(Arc::new(DeleteObjectTool));
    registry.register(Arc::new(DeleteObjectsTool));
    registry.register(Arc::new(GetBoardStateTool));
}

/// Typed access to a tool call's arguments.
///
/// Every accessor fails with a [`BoardqError::Tool`] naming the tool and the
/// offending argument.
pub(crate) struct Args<'a> {
    tool: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(tool: &'a str, map: &'a Map<String, Value>) -> Self {
        Self { tool, map }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> BoardqError {
        BoardqError::Tool {
            name: self.tool.to_string(),
            message: message.into(),
        }
    }

    /// A required non-blank string.
    pub(crate) fn str(&self, key: &str) -> Result<&'a str, BoardqError> {
        match self.map.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
            Some(Value::String(_)) => Err(self.error(format!("'{key}' must not be empty"))),
            Some(_) => Err(self.error(format!("'{key}' must be a string"))),
            None => Err(self.error(format!("missing required '{key}' argument"))),
        }
    }

    pub(crate) fn opt_str(&self, key: &str) -> Result<Option<&'a str>, BoardqError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.str(key).map(Some),
        }
    }

    /// A required finite number.
    pub(crate) fn number(&self, key: &str) -> Result<f64, BoardqError> {
        match self.map.get(key) {
            Some(Value::Number(n)) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| self.error(format!("'{key}' is out of range"))),
            Some(_) => Err(self.error(format!("'{key}' must be a number"))),
            None => Err(self.error(format!("missing required '{key}' argument"))),
        }
    }

    pub(crate) fn number_or(&self, key: &str, default: f64) -> Result<f64, BoardqError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.number(key),
        }
    }

    /// A required number strictly greater than zero.
    pub(crate) fn positive(&self, key: &str) -> Result<f64, BoardqError> {
        let value = self.number(key)?;
        if value <= 0.0 {
            return Err(self.error(format!("'{key}' must be positive")));
        }
        Ok(value)
    }

    pub(crate) fn positive_or(&self, key: &str, default: f64) -> Result<f64, BoardqError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.positive(key),
        }
    }

    /// A color as `#rgb`, `#rrggbb`, or a palette name, normalized to lowercase hex.
    pub(crate) fn color(&self, key: &str) -> Result<String, BoardqError> {
        let raw = self.str(key)?;
        normalize_color(raw).ok_or_else(|| self.error(format!("'{raw}' is not a valid color")))
    }

    pub(crate) fn color_or(&self, key: &str, default: &str) -> Result<String, BoardqError> {
        match self.opt_str(key)? {
            None => Ok(default.to_string()),
            Some(_) => self.color(key),
        }
    }

    /// A required non-empty list of non-blank strings.
    pub(crate) fn string_list(&self, key: &str) -> Result<Vec<String>, BoardqError> {
        let Some(value) = self.map.get(key) else {
            return Err(self.error(format!("missing required '{key}' argument")));
        };
        let Value::Array(items) = value else {
            return Err(self.error(format!("'{key}' must be an array of strings")));
        };
        if items.is_empty() {
            return Err(self.error(format!("'{key}' must not be empty")));
        }
        items
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
                _ => Err(self.error(format!("'{key}' must be an array of strings"))),
            })
            .collect()
    }

    /// Resolves `key` to an existing board object.
    pub(crate) async fn object(
        &self,
        board: &dyn BoardMutator,
        key: &str,
    ) -> Result<BoardObject, BoardqError> {
        let id = self.str(key)?;
        board
            .get_object(id)
            .await?
            .ok_or_else(|| self.error(format!("object {id} not found")))
    }
}

fn normalize_color(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix('#') {
        let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return valid.then(|| format!("#{}", hex.to_ascii_lowercase()));
    }
    PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, hex)| (*hex).to_string())
}

/// Builds a property map from `(key, value)` pairs.
pub(crate) fn props<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
