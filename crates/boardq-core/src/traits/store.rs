// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command store boundary: a keyed, board-partitioned record store with
//! change notifications.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::BoardqError;
use crate::types::{
    BoardId, Command, CommandId, CommandPatch, CommandStatus, NewCommand, RangeQuery,
    StoreChange,
};

/// Backend holding command records for every board.
///
/// Writes become visible to all readers, but there is no transaction across
/// records. [`update_if_status`](CommandStore::update_if_status) is the only
/// conditional primitive and is what makes claiming exclusive.
#[async_trait]
pub trait CommandStore: Send + Sync + 'static {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Allocates an id and writes the new record in one step.
    async fn create(&self, board_id: &BoardId, command: NewCommand)
    -> Result<CommandId, BoardqError>;

    /// Applies `patch` unconditionally. Fails with `CommandNotFound` for unknown ids.
    async fn update(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        patch: CommandPatch,
    ) -> Result<(), BoardqError>;

    /// Applies `patch` only if the record's current status equals `expected`.
    ///
    /// Returns `Ok(false)` when the record is missing or its status differs.
    async fn update_if_status(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        expected: CommandStatus,
        patch: CommandPatch,
    ) -> Result<bool, BoardqError>;

    /// Removes the record. Deleting an unknown id is not an error.
    async fn delete(&self, board_id: &BoardId, id: &CommandId) -> Result<(), BoardqError>;

    /// Point read.
    async fn get(&self, board_id: &BoardId, id: &CommandId)
    -> Result<Option<Command>, BoardqError>;

    /// Range read ordered ascending by `created_at`.
    async fn range(&self, board_id: &BoardId, query: RangeQuery)
    -> Result<Vec<Command>, BoardqError>;

    /// Subscribes to change notifications. Delivery is at-least-once and
    /// receivers may lag; consumers re-read on every notification.
    fn changes(&self) -> broadcast::Receiver<StoreChange>;
}
