// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serializes writes from every task in the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use boardq_core::BoardqError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations::run_migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A migrated SQLite database behind one async connection.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `path`, apply migrations, and set PRAGMAs.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, BoardqError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BoardqError::storage)?;
        }

        // Migrations need a plain rusqlite connection, so run them on a
        // blocking thread before handing the file to tokio-rusqlite.
        let migrate_path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), BoardqError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(BoardqError::storage)?;
            conn.busy_timeout(BUSY_TIMEOUT)
                .map_err(BoardqError::storage)?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| BoardqError::Internal(format!("migration task panicked: {e}")))??;

        let conn = Connection::open(&path).await.map_err(BoardqError::storage)?;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            if wal_mode {
                let _mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            }
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path.display(), wal_mode, "database opened");
        Ok(Self { conn, path })
    }

    /// The async connection every query goes through.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection, flushing pending work.
    pub async fn close(self) -> Result<(), BoardqError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into [`BoardqError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> BoardqError {
    BoardqError::storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/boardq.db");
        let db = Database::open(&path, true).await.unwrap();
        assert!(path.exists());

        let tables: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'commands'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boardq.db");
        Database::open(&path, false).await.unwrap().close().await.unwrap();
        let db = Database::open(&path, false).await.unwrap();
        db.close().await.unwrap();
    }
}
