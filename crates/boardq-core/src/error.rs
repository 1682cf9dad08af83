// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the boardq command queue.

use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::CommandStatus;

/// Stable code attached to every error surfaced by the queue gateway.
///
/// Codes render in kebab-case (`enqueue-failed`, `cleanup-failed`, ...) and are
/// safe to match on from UI code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum QueueErrorCode {
    EnqueueFailed,
    UpdateStatusFailed,
    ClaimFailed,
    CompleteFailed,
    FailFailed,
    GetFailed,
    SubscribeFailed,
    CleanupFailed,
}

/// The primary error type used across all boardq crates.
#[derive(Debug, Error)]
pub enum BoardqError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Raw command store failure (connection, query, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A queue gateway operation failed. The original cause is attached.
    #[error("{code}: {source}")]
    Queue {
        code: QueueErrorCode,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The addressed command does not exist on the board.
    #[error("command {id} not found on board {board_id}")]
    CommandNotFound { board_id: String, id: String },

    /// A status write would violate the command state machine.
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: CommandStatus,
        to: CommandStatus,
    },

    /// The external interpreter could not be reached or returned garbage.
    #[error("interpreter error: {message}")]
    Interpreter {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A board mutation failed.
    #[error("board error: {message}")]
    Board {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A tool rejected its arguments or is unknown.
    #[error("tool `{name}`: {message}")]
    Tool { name: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BoardqError {
    /// Wraps a cause into a gateway error carrying `code`.
    pub fn queue(
        code: QueueErrorCode,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BoardqError::Queue {
            code,
            source: source.into(),
        }
    }

    /// Wraps a backend error into [`BoardqError::Storage`].
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        BoardqError::Storage {
            source: source.into(),
        }
    }

    /// Shorthand for a board failure without an underlying cause.
    pub fn board(message: impl Into<String>) -> Self {
        BoardqError::Board {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an interpreter failure without an underlying cause.
    pub fn interpreter(message: impl Into<String>) -> Self {
        BoardqError::Interpreter {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the gateway code if this is a queue error.
    pub fn code(&self) -> Option<QueueErrorCode> {
        match self {
            BoardqError::Queue { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The message shown to users in a failed command's `error` field.
    ///
    /// Strips the category prefix for errors that already carry a
    /// human-readable message.
    pub fn user_message(&self) -> String {
        match self {
            BoardqError::Interpreter { message, .. }
            | BoardqError::Board { message, .. }
            | BoardqError::Tool { message, .. } => message.clone(),
            BoardqError::Internal(message) | BoardqError::Config(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
