// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local command store.
//!
//! Every processor and gateway that shares one `Arc<MemoryCommandStore>`
//! sees the same records and the same change notifications, which makes it
//! the backend of choice for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use boardq_core::{
    BoardId, BoardqError, Command, CommandId, CommandPatch, CommandStatus, CommandStore,
    NewCommand, RangeQuery, StoreChange,
};
use tokio::sync::{RwLock, broadcast};
use tracing::trace;

use crate::{CHANGE_CHANNEL_CAPACITY, new_command_id};

/// In-memory [`CommandStore`] partitioned by board.
pub struct MemoryCommandStore {
    boards: RwLock<HashMap<BoardId, HashMap<CommandId, Command>>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryCommandStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            boards: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn notify(&self, board_id: &BoardId) {
        // No receivers is fine: nobody is subscribed yet.
        let _ = self.changes.send(StoreChange::board(board_id.clone()));
    }
}

impl Default for MemoryCommandStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandStore for MemoryCommandStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(
        &self,
        board_id: &BoardId,
        command: NewCommand,
    ) -> Result<CommandId, BoardqError> {
        let id = new_command_id();
        let record = command.into_command(id.clone(), board_id.clone());
        self.boards
            .write()
            .await
            .entry(board_id.clone())
            .or_default()
            .insert(id.clone(), record);
        trace!(board_id = %board_id, command_id = %id, "memory store: created");
        self.notify(board_id);
        Ok(id)
    }

    async fn update(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        patch: CommandPatch,
    ) -> Result<(), BoardqError> {
        {
            let mut boards = self.boards.write().await;
            let record = boards
                .get_mut(board_id)
                .and_then(|commands| commands.get_mut(id))
                .ok_or_else(|| BoardqError::CommandNotFound {
                    board_id: board_id.to_string(),
                    id: id.to_string(),
                })?;
            record.apply_patch(&patch);
        }
        self.notify(board_id);
        Ok(())
    }

    async fn update_if_status(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        expected: CommandStatus,
        patch: CommandPatch,
    ) -> Result<bool, BoardqError> {
        let applied = {
            let mut boards = self.boards.write().await;
            match boards
                .get_mut(board_id)
                .and_then(|commands| commands.get_mut(id))
            {
                Some(record) if record.status == expected => {
                    record.apply_patch(&patch);
                    true
                }
                _ => false,
            }
        };
        if applied {
            self.notify(board_id);
        }
        Ok(applied)
    }

    async fn delete(&self, board_id: &BoardId, id: &CommandId) -> Result<(), BoardqError> {
        let removed = self
            .boards
            .write()
            .await
            .get_mut(board_id)
            .and_then(|commands| commands.remove(id))
            .is_some();
        if removed {
            self.notify(board_id);
        }
        Ok(())
    }

    async fn get(
        &self,
        board_id: &BoardId,
        id: &CommandId,
    ) -> Result<Option<Command>, BoardqError> {
        Ok(self
            .boards
            .read()
            .await
            .get(board_id)
            .and_then(|commands| commands.get(id))
            .cloned())
    }

    async fn range(
        &self,
        board_id: &BoardId,
        query: RangeQuery,
    ) -> Result<Vec<Command>, BoardqError> {
        let mut commands: Vec<Command> = self
            .boards
            .read()
            .await
            .get(board_id)
            .map(|commands| commands.values().cloned().collect())
            .unwrap_or_default();
        commands.sort_by(|a, b| a.queue_order(b));
        if let Some(limit) = query.limit_to_last {
            let skip = commands.len().saturating_sub(limit);
            commands.drain(..skip);
        }
        Ok(commands)
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn new_command(input: &str, offset_secs: i64) -> NewCommand {
        NewCommand {
            user_id: "u1".to_string(),
            input: input.to_string(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_and_notifies() {
        let store = MemoryCommandStore::new();
        let board = BoardId::from("b1");
        let mut changes = store.changes();

        let a = store.create(&board, new_command("a", 0)).await.unwrap();
        let b = store.create(&board, new_command("b", 1)).await.unwrap();
        assert_ne!(a, b);

        let change = changes.recv().await.unwrap();
        assert!(change.affects(&board));

        let stored = store.get(&board, &a).await.unwrap().unwrap();
        assert_eq!(stored.status, CommandStatus::Pending);
        assert_eq!(stored.input, "a");
    }

    #[tokio::test]
    async fn range_is_ascending_and_limits_to_last() {
        let store = MemoryCommandStore::new();
        let board = BoardId::from("b1");
        store.create(&board, new_command("third", 30)).await.unwrap();
        store.create(&board, new_command("first", 10)).await.unwrap();
        store.create(&board, new_command("second", 20)).await.unwrap();

        let all = store.range(&board, RangeQuery::default()).await.unwrap();
        let inputs: Vec<&str> = all.iter().map(|c| c.input.as_str()).collect();
        assert_eq!(inputs, ["first", "second", "third"]);

        let last_two = store
            .range(&board, RangeQuery { limit_to_last: Some(2) })
            .await
            .unwrap();
        let inputs: Vec<&str> = last_two.iter().map(|c| c.input.as_str()).collect();
        assert_eq!(inputs, ["second", "third"]);
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_expectation() {
        let store = MemoryCommandStore::new();
        let board = BoardId::from("b1");
        let id = store.create(&board, new_command("x", 0)).await.unwrap();
        let now = Utc::now();

        let first = store
            .update_if_status(
                &board,
                &id,
                CommandStatus::Pending,
                CommandPatch::status(CommandStatus::Processing, now),
            )
            .await
            .unwrap();
        let second = store
            .update_if_status(
                &board,
                &id,
                CommandStatus::Pending,
                CommandPatch::status(CommandStatus::Processing, now),
            )
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let missing = store
            .update_if_status(
                &board,
                &CommandId::from("nope"),
                CommandStatus::Pending,
                CommandPatch::default(),
            )
            .await
            .unwrap();
        assert!(!missing);
    }

    #[tokio::test]
    async fn update_unknown_command_is_not_found() {
        let store = MemoryCommandStore::new();
        let err = store
            .update(
                &BoardId::from("b1"),
                &CommandId::from("ghost"),
                CommandPatch::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BoardqError::CommandNotFound { .. }));
    }

    #[tokio::test]
    async fn boards_are_isolated() {
        let store = MemoryCommandStore::new();
        let b1 = BoardId::from("b1");
        let b2 = BoardId::from("b2");
        let id = store.create(&b1, new_command("x", 0)).await.unwrap();

        assert!(store.get(&b2, &id).await.unwrap().is_none());
        assert!(store.range(&b2, RangeQuery::default()).await.unwrap().is_empty());

        store.delete(&b2, &id).await.unwrap();
        assert!(store.get(&b1, &id).await.unwrap().is_some());
        store.delete(&b1, &id).await.unwrap();
        assert!(store.get(&b1, &id).await.unwrap().is_none());
    }
}
