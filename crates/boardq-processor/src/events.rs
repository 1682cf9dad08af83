// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic events published by a running processor.

use boardq_core::{BoardId, CommandId};
use strum::IntoStaticStr;
use tokio::sync::broadcast;

/// Capacity of the diagnostics channel. Slow receivers observe `Lagged`.
pub(crate) const EVENT_CAPACITY: usize = 256;

/// One step of the processor lifecycle, for observers and tests.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProcessorEvent {
    Started {
        board_id: BoardId,
    },
    Stopped {
        board_id: BoardId,
    },
    /// This instance won the conditional `pending -> processing` write.
    Claimed {
        board_id: BoardId,
        command_id: CommandId,
    },
    /// Another writer claimed the command first.
    ClaimLost {
        board_id: BoardId,
        command_id: CommandId,
    },
    /// The claim write errored; the command is still `pending` and the
    /// reactor backs off before reading the queue again.
    ClaimFailed {
        board_id: BoardId,
        command_id: CommandId,
        error: String,
    },
    Completed {
        board_id: BoardId,
        command_id: CommandId,
    },
    Failed {
        board_id: BoardId,
        command_id: CommandId,
        error: String,
    },
    /// Writing `failed` itself failed; the command may stay `processing`.
    FailWriteDropped {
        board_id: BoardId,
        command_id: CommandId,
        error: String,
    },
}

impl ProcessorEvent {
    /// Short snake_case name, used as a log field.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn command_id(&self) -> Option<&CommandId> {
        match self {
            ProcessorEvent::Started { .. } | ProcessorEvent::Stopped { .. } => None,
            ProcessorEvent::Claimed { command_id, .. }
            | ProcessorEvent::ClaimLost { command_id, .. }
            | ProcessorEvent::ClaimFailed { command_id, .. }
            | ProcessorEvent::Completed { command_id, .. }
            | ProcessorEvent::Failed { command_id, .. }
            | ProcessorEvent::FailWriteDropped { command_id, .. } => Some(command_id),
        }
    }
}

/// Fan-out of [`ProcessorEvent`]s. Publishing never blocks and never fails.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<ProcessorEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ProcessorEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: ProcessorEvent) {
        tracing::trace!(event = event.kind(), "processor event");
        // No receivers is fine.
        let _ = self.sender.send(event);
    }
}
