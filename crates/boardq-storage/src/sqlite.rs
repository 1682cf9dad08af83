// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed command store.
//!
//! Writes made through this store are announced immediately. Commits made by
//! other processes on the same file are picked up by a watcher task that
//! compares `PRAGMA data_version` on an interval and announces a change for
//! every board when it moves.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use boardq_config::model::StorageConfig;
use boardq_core::{
    BoardId, BoardqError, Command, CommandId, CommandPatch, CommandStatus, CommandStore,
    NewCommand, RangeQuery, StoreChange, ToolCall,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace, warn};

use crate::database::{Database, map_tr_err};
use crate::{CHANGE_CHANNEL_CAPACITY, new_command_id};

const SELECT_COLUMNS: &str = "id, board_id, user_id, input, status, created_at, \
                              started_at, completed_at, result, error";

/// [`CommandStore`] persisted in a SQLite file shared across processes.
pub struct SqliteCommandStore {
    db: Database,
    changes: broadcast::Sender<StoreChange>,
    /// Cancels the foreign-commit watcher when the store goes away.
    watcher: DropGuard,
}

impl SqliteCommandStore {
    /// Open the store described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, BoardqError> {
        Self::open_path(
            &config.database_path,
            config.wal_mode,
            Duration::from_millis(config.change_poll_ms.max(1)),
        )
        .await
    }

    /// Open the store at `path`, watching for foreign commits every `poll`.
    pub async fn open_path(
        path: impl AsRef<Path>,
        wal_mode: bool,
        poll: Duration,
    ) -> Result<Self, BoardqError> {
        let db = Database::open(path, wal_mode).await?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let watcher = CancellationToken::new();

        tokio::spawn(watch_foreign_commits(
            db.connection().clone(),
            changes.clone(),
            poll,
            watcher.clone(),
        ));

        Ok(Self {
            db,
            changes,
            watcher: watcher.drop_guard(),
        })
    }

    /// Stop the watcher and close the connection.
    pub async fn close(self) -> Result<(), BoardqError> {
        let Self { db, watcher, .. } = self;
        drop(watcher);
        db.close().await
    }

    fn notify(&self, board_id: &BoardId) {
        let _ = self.changes.send(StoreChange::board(board_id.clone()));
    }

    async fn apply_patch(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        expected: Option<CommandStatus>,
        patch: CommandPatch,
    ) -> Result<bool, BoardqError> {
        let board = board_id.to_string();
        let id = id.to_string();
        let status = patch.status.map(|s| s.as_str());
        let started_at = patch.started_at.map(format_ts);
        let completed_at = patch.completed_at.map(format_ts);
        let result = patch
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(BoardqError::storage)?;
        let error = patch.error;
        let expected = expected.map(|s| s.as_str());

        let changed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE commands SET
                        status       = COALESCE(?3, status),
                        started_at   = COALESCE(started_at, ?4),
                        completed_at = COALESCE(completed_at, ?5),
                        result       = COALESCE(?6, result),
                        error        = COALESCE(?7, error)
                     WHERE board_id = ?1 AND id = ?2
                       AND (?8 IS NULL OR status = ?8)",
                    params![board, id, status, started_at, completed_at, result, error, expected],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }
}

#[async_trait]
impl CommandStore for SqliteCommandStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(
        &self,
        board_id: &BoardId,
        command: NewCommand,
    ) -> Result<CommandId, BoardqError> {
        let id = new_command_id();
        let params = (
            id.to_string(),
            board_id.to_string(),
            command.user_id,
            command.input,
            format_ts(command.created_at),
        );
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO commands (id, board_id, user_id, input, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                    params![params.0, params.1, params.2, params.3, params.4],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        trace!(board_id = %board_id, command_id = %id, "sqlite store: created");
        self.notify(board_id);
        Ok(id)
    }

    async fn update(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        patch: CommandPatch,
    ) -> Result<(), BoardqError> {
        if !self.apply_patch(board_id, id, None, patch).await? {
            return Err(BoardqError::CommandNotFound {
                board_id: board_id.to_string(),
                id: id.to_string(),
            });
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
        let applied = self.apply_patch(board_id, id, Some(expected), patch).await?;
        if applied {
            self.notify(board_id);
        }
        Ok(applied)
    }

    async fn delete(&self, board_id: &BoardId, id: &CommandId) -> Result<(), BoardqError> {
        let board = board_id.to_string();
        let key = id.to_string();
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM commands WHERE board_id = ?1 AND id = ?2",
                    params![board, key],
                )
            })
            .await
            .map_err(map_tr_err)?;
        if removed > 0 {
            self.notify(board_id);
        }
        Ok(())
    }

    async fn get(
        &self,
        board_id: &BoardId,
        id: &CommandId,
    ) -> Result<Option<Command>, BoardqError> {
        let board = board_id.to_string();
        let key = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<Command>, rusqlite::Error> {
                conn.query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM commands WHERE board_id = ?1 AND id = ?2"
                    ),
                    params![board, key],
                    row_to_command,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn range(
        &self,
        board_id: &BoardId,
        query: RangeQuery,
    ) -> Result<Vec<Command>, BoardqError> {
        let board = board_id.to_string();
        // SQLite treats a negative LIMIT as "no limit".
        let limit = query
            .limit_to_last
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<Command>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM (
                         SELECT * FROM commands WHERE board_id = ?1
                         ORDER BY created_at DESC, id DESC
                         LIMIT ?2
                     )
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map(params![board, limit], row_to_command)?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

/// Announce `StoreChange::any()` whenever another connection commits.
async fn watch_foreign_commits(
    conn: tokio_rusqlite::Connection,
    changes: broadcast::Sender<StoreChange>,
    poll: Duration,
    cancel: CancellationToken,
) {
    let mut last_version: Option<i64> = None;
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let version = conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("PRAGMA data_version", [], |row| row.get(0))
            })
            .await;

        match version {
            Ok(version) => {
                if last_version.is_some_and(|last| last != version) {
                    debug!(version, "foreign commit detected");
                    let _ = changes.send(StoreChange::any());
                }
                last_version = Some(version);
            }
            Err(e) => {
                warn!(error = %e, "data_version check failed, stopping watcher");
                break;
            }
        }
    }
}

/// Fixed-width UTC timestamps so that text order equals time order.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    raw.map(|raw| parse_ts(idx, raw)).transpose()
}

fn row_to_command(row: &rusqlite::Row<'_>) -> Result<Command, rusqlite::Error> {
    let status: String = row.get(4)?;
    let status = CommandStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let result: Option<String> = row.get(8)?;
    let result = result
        .map(|raw| serde_json::from_str::<Vec<ToolCall>>(&raw))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(Command {
        id: CommandId(row.get(0)?),
        board_id: BoardId(row.get(1)?),
        user_id: row.get(2)?,
        input: row.get(3)?,
        status,
        created_at: parse_ts(5, row.get(5)?)?,
        started_at: parse_opt_ts(6, row.get(6)?)?,
        completed_at: parse_opt_ts(7, row.get(7)?)?,
        result,
        error: row.get(9)?,
    })
}
