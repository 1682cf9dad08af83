// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board-mutation boundary invoked by the sequential executor.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BoardqError;
use crate::types::{BoardObject, NewBoardObject};

/// Capability surface over the shared board state of one board.
///
/// Every call may fail independently.
#[async_trait]
pub trait BoardMutator: Send + Sync {
    async fn get_objects(&self) -> Result<Vec<BoardObject>, BoardqError>;

    async fn get_object(&self, id: &str) -> Result<Option<BoardObject>, BoardqError>;

    /// Creates an object and returns the id the board assigned to it.
    async fn create_object(&self, object: NewBoardObject) -> Result<String, BoardqError>;

    /// Merges `fields` into the object's properties.
    async fn update_object(&self, id: &str, fields: Map<String, Value>)
    -> Result<(), BoardqError>;

    async fn delete_objects(&self, ids: &[String]) -> Result<(), BoardqError>;
}
