// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-shaped operations over a raw [`CommandStore`].
//!
//! The gateway owns every status-transition write. Store failures are
//! wrapped into [`BoardqError::Queue`] with the code of the operation that
//! hit them and are always returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use boardq_core::{
    BoardId, BoardqError, Command, CommandId, CommandPatch, CommandQuery, CommandStatus,
    CommandStore, NewCommand, QueueErrorCode, RangeQuery, ToolCall,
};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use futures::FutureExt;
use tracing::{debug, info};

use crate::subscription::{self, Fetch, Subscription};

/// Gateway timestamps carry microsecond precision, the finest any store keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Typed wrapper turning a [`CommandStore`] into a command queue.
#[derive(Clone)]
pub struct QueueGateway {
    store: Arc<dyn CommandStore>,
}

impl QueueGateway {
    pub fn new(store: Arc<dyn CommandStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CommandStore> {
        &self.store
    }

    /// Creates a `pending` command stamped with the current time.
    ///
    /// Surrounding whitespace is trimmed; blank input is rejected.
    pub async fn enqueue(
        &self,
        board_id: &BoardId,
        user_id: &str,
        input: &str,
    ) -> Result<CommandId, BoardqError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(BoardqError::queue(
                QueueErrorCode::EnqueueFailed,
                "command input is empty",
            ));
        }

        let id = self
            .store
            .create(
                board_id,
                NewCommand {
                    user_id: user_id.to_string(),
                    input: input.to_string(),
                    created_at: now(),
                },
            )
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::EnqueueFailed, e))?;

        info!(board_id = %board_id, command_id = %id, user_id, "command enqueued");
        Ok(id)
    }

    /// Moves a command to `status`, stamping `started_at` when entering
    /// `processing`.
    ///
    /// Transitions outside `pending -> processing -> {completed, failed}` are
    /// rejected, as is a write that races with another status change.
    pub async fn update_status(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        status: CommandStatus,
    ) -> Result<(), BoardqError> {
        let code = QueueErrorCode::UpdateStatusFailed;
        let current = self
            .store
            .get(board_id, id)
            .await
            .map_err(|e| BoardqError::queue(code, e))?
            .ok_or_else(|| BoardqError::queue(code, not_found(board_id, id)))?;

        if !current.status.can_transition_to(status) {
            return Err(BoardqError::queue(
                code,
                BoardqError::InvalidTransition {
                    from: current.status,
                    to: status,
                },
            ));
        }

        let applied = self
            .store
            .update_if_status(board_id, id, current.status, CommandPatch::status(status, now()))
            .await
            .map_err(|e| BoardqError::queue(code, e))?;
        if !applied {
            return Err(self.rejected(code, board_id, id, status).await);
        }

        debug!(board_id = %board_id, command_id = %id, %status, "status updated");
        Ok(())
    }

    /// Conditionally moves a `pending` command to `processing`.
    ///
    /// Returns `false` when the command is gone or another writer claimed it
    /// first.
    pub async fn claim(&self, board_id: &BoardId, id: &CommandId) -> Result<bool, BoardqError> {
        let claimed = self
            .store
            .update_if_status(
                board_id,
                id,
                CommandStatus::Pending,
                CommandPatch::status(CommandStatus::Processing, now()),
            )
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::ClaimFailed, e))?;
        debug!(board_id = %board_id, command_id = %id, claimed, "claim attempted");
        Ok(claimed)
    }

    /// Marks a `processing` command completed with the tool calls that ran.
    pub async fn complete(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        result: Vec<ToolCall>,
    ) -> Result<(), BoardqError> {
        let code = QueueErrorCode::CompleteFailed;
        let applied = self
            .store
            .update_if_status(
                board_id,
                id,
                CommandStatus::Processing,
                CommandPatch::completed(result, now()),
            )
            .await
            .map_err(|e| BoardqError::queue(code, e))?;
        if !applied {
            return Err(self
                .rejected(code, board_id, id, CommandStatus::Completed)
                .await);
        }
        info!(board_id = %board_id, command_id = %id, "command completed");
        Ok(())
    }

    /// Marks a `processing` command failed with a human-readable message.
    pub async fn fail(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        error: &str,
    ) -> Result<(), BoardqError> {
        let code = QueueErrorCode::FailFailed;
        let applied = self
            .store
            .update_if_status(
                board_id,
                id,
                CommandStatus::Processing,
                CommandPatch::failed(error, now()),
            )
            .await
            .map_err(|e| BoardqError::queue(code, e))?;
        if !applied {
            return Err(self.rejected(code, board_id, id, CommandStatus::Failed).await);
        }
        info!(board_id = %board_id, command_id = %id, error, "command failed");
        Ok(())
    }

    pub async fn get_command(
        &self,
        board_id: &BoardId,
        id: &CommandId,
    ) -> Result<Option<Command>, BoardqError> {
        self.store
            .get(board_id, id)
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::GetFailed, e))
    }

    /// Reads the most recent commands, newest first.
    ///
    /// `query.limit` caps the store read before `query.status_filter` is
    /// applied, so a filtered result may hold fewer than `limit` records.
    pub async fn get_commands(
        &self,
        board_id: &BoardId,
        query: &CommandQuery,
    ) -> Result<Vec<Command>, BoardqError> {
        read_snapshot(&self.store, board_id, query)
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::GetFailed, e))
    }

    /// Pushes the full matching snapshot to `callback` now and after every
    /// change, in the order of [`get_commands`](Self::get_commands).
    pub async fn subscribe<F>(
        &self,
        board_id: &BoardId,
        query: CommandQuery,
        callback: F,
    ) -> Result<Subscription, BoardqError>
    where
        F: Fn(Vec<Command>) + Send + Sync + 'static,
    {
        let changes = self.store.changes();
        let initial = read_snapshot(&self.store, board_id, &query)
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::SubscribeFailed, e))?;

        let store = Arc::clone(&self.store);
        let board = board_id.clone();
        let fetch: Fetch<Vec<Command>> = Box::new(move || {
            let store = Arc::clone(&store);
            let board = board.clone();
            let query = query.clone();
            async move { read_snapshot(&store, &board, &query).await }.boxed()
        });

        debug!(board_id = %board_id, "snapshot subscription started");
        Ok(subscription::spawn(
            board_id.clone(),
            changes,
            initial,
            fetch,
            callback,
        ))
    }

    /// Pushes the current state of one command now and after every change.
    /// `None` means the command does not exist (or no longer exists).
    pub async fn subscribe_to_command<F>(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        callback: F,
    ) -> Result<Subscription, BoardqError>
    where
        F: Fn(Option<Command>) + Send + Sync + 'static,
    {
        let changes = self.store.changes();
        let initial = self
            .store
            .get(board_id, id)
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::SubscribeFailed, e))?;

        let store = Arc::clone(&self.store);
        let board = board_id.clone();
        let id = id.clone();
        let fetch: Fetch<Option<Command>> = Box::new(move || {
            let store = Arc::clone(&store);
            let board = board.clone();
            let id = id.clone();
            async move { store.get(&board, &id).await }.boxed()
        });

        Ok(subscription::spawn(
            board_id.clone(),
            changes,
            initial,
            fetch,
            callback,
        ))
    }

    /// Whether any command on the board is currently `processing`.
    pub async fn is_processing(&self, board_id: &BoardId) -> Result<bool, BoardqError> {
        let commands = self
            .store
            .range(board_id, RangeQuery::default())
            .await
            .map_err(|e| BoardqError::queue(QueueErrorCode::GetFailed, e))?;
        Ok(commands
            .iter()
            .any(|c| c.status == CommandStatus::Processing))
    }

    /// Deletes terminal commands that completed more than `older_than` ago.
    ///
    /// `pending` and `processing` commands are never touched. Returns the
    /// number of records removed.
    pub async fn cleanup(
        &self,
        board_id: &BoardId,
        older_than: Duration,
    ) -> Result<usize, BoardqError> {
        let code = QueueErrorCode::CleanupFailed;
        let Some(cutoff) = TimeDelta::from_std(older_than)
            .ok()
            .and_then(|age| now().checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let commands = self
            .store
            .range(board_id, RangeQuery::default())
            .await
            .map_err(|e| BoardqError::queue(code, e))?;

        let mut removed = 0;
        for command in commands {
            let expired = command.status.is_terminal()
                && command.completed_at.is_some_and(|at| at < cutoff);
            if !expired {
                continue;
            }
            self.store
                .delete(board_id, &command.id)
                .await
                .map_err(|e| BoardqError::queue(code, e))?;
            removed += 1;
        }

        if removed > 0 {
            info!(board_id = %board_id, removed, "expired commands cleaned up");
        }
        Ok(removed)
    }

    /// Explains why a conditional write to `target` did not apply.
    async fn rejected(
        &self,
        code: QueueErrorCode,
        board_id: &BoardId,
        id: &CommandId,
        target: CommandStatus,
    ) -> BoardqError {
        match self.store.get(board_id, id).await {
            Ok(Some(current)) => BoardqError::queue(
                code,
                BoardqError::InvalidTransition {
                    from: current.status,
                    to: target,
                },
            ),
            Ok(None) => BoardqError::queue(code, not_found(board_id, id)),
            Err(e) => BoardqError::queue(code, e),
        }
    }
}

fn not_found(board_id: &BoardId, id: &CommandId) -> BoardqError {
    BoardqError::CommandNotFound {
        board_id: board_id.to_string(),
        id: id.to_string(),
    }
}

/// Store read behind `get_commands` and snapshot subscriptions.
async fn read_snapshot(
    store: &Arc<dyn CommandStore>,
    board_id: &BoardId,
    query: &CommandQuery,
) -> Result<Vec<Command>, BoardqError> {
    let mut commands = store
        .range(
            board_id,
            RangeQuery {
                limit_to_last: query.limit,
            },
        )
        .await?;
    commands.retain(|c| query.matches(c));
    commands.sort_by(|a, b| b.queue_order(a));
    Ok(commands)
}
