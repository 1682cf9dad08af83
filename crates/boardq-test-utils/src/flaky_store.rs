// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command store wrapper with switchable faults.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use boardq_core::{
    BoardId, BoardqError, Command, CommandId, CommandPatch, CommandStatus, CommandStore,
    NewCommand, RangeQuery, StoreChange,
};
use tokio::sync::broadcast;
use tracing::debug;

/// A class of store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreFault {
    Create,
    /// `get` and `range`.
    Read,
    Delete,
    /// Any `update`/`update_if_status` whose patch moves to this status.
    WriteStatus(CommandStatus),
}

/// Delegates to an inner store, failing the operations currently armed.
///
/// Change notifications always pass through.
pub struct FlakyStore {
    inner: Arc<dyn CommandStore>,
    faults: RwLock<HashSet<StoreFault>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn CommandStore>) -> Self {
        Self {
            inner,
            faults: RwLock::new(HashSet::new()),
        }
    }

    pub fn arm(&self, fault: StoreFault) {
        if let Ok(mut faults) = self.faults.write() {
            faults.insert(fault);
        }
    }

    pub fn disarm(&self, fault: StoreFault) {
        if let Ok(mut faults) = self.faults.write() {
            faults.remove(&fault);
        }
    }

    fn check(&self, fault: StoreFault) -> Result<(), BoardqError> {
        let armed = self.faults.read().is_ok_and(|faults| faults.contains(&fault));
        if armed {
            debug!(?fault, "flaky store: injected failure");
            return Err(BoardqError::storage(std::io::Error::other(format!(
                "injected {fault:?} failure"
            ))));
        }
        Ok(())
    }

    fn check_patch(&self, patch: &CommandPatch) -> Result<(), BoardqError> {
        match patch.status {
            Some(status) => self.check(StoreFault::WriteStatus(status)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommandStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn create(
        &self,
        board_id: &BoardId,
        command: NewCommand,
    ) -> Result<CommandId, BoardqError> {
        self.check(StoreFault::Create)?;
        self.inner.create(board_id, command).await
    }

    async fn update(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        patch: CommandPatch,
    ) -> Result<(), BoardqError> {
        self.check_patch(&patch)?;
        self.inner.update(board_id, id, patch).await
    }

    async fn update_if_status(
        &self,
        board_id: &BoardId,
        id: &CommandId,
        expected: CommandStatus,
        patch: CommandPatch,
    ) -> Result<bool, BoardqError> {
        self.check_patch(&patch)?;
        self.inner.update_if_status(board_id, id, expected, patch).await
    }

    async fn delete(&self, board_id: &BoardId, id: &CommandId) -> Result<(), BoardqError> {
        self.check(StoreFault::Delete)?;
        self.inner.delete(board_id, id).await
    }

    async fn get(
        &self,
        board_id: &BoardId,
        id: &CommandId,
    ) -> Result<Option<Command>, BoardqError> {
        self.check(StoreFault::Read)?;
        self.inner.get(board_id, id).await
    }

    async fn range(
        &self,
        board_id: &BoardId,
        query: RangeQuery,
    ) -> Result<Vec<Command>, BoardqError> {
        self.check(StoreFault::Read)?;
        self.inner.range(board_id, query).await
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes()
    }
}
