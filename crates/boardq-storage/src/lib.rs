// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command store backends for the boardq command queue.
//!
//! - [`MemoryCommandStore`]: process-local, used by tests and single-process setups.
//! - [`SqliteCommandStore`]: WAL-mode SQLite with embedded migrations, shared
//!   by every process on the host.
//!
//! Both implement the conditional `update_if_status` write that the queue
//! gateway uses to make claiming exclusive.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use boardq_config::model::{StorageBackend, StorageConfig};
use boardq_core::{BoardqError, CommandId, CommandStore};

pub use database::Database;
pub use memory::MemoryCommandStore;
pub use sqlite::SqliteCommandStore;

/// Buffered change notifications per store before slow receivers lag.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Time-ordered identifier for a new command.
pub(crate) fn new_command_id() -> CommandId {
    CommandId(uuid::Uuid::now_v7().to_string())
}

/// Open the store selected by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn CommandStore>, BoardqError> {
    let store: Arc<dyn CommandStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryCommandStore::new()),
        StorageBackend::Sqlite => Arc::new(SqliteCommandStore::open(config).await?),
    };
    tracing::info!(backend = store.name(), "command store opened");
    Ok(store)
}
