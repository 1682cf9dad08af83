// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the boardq command queue.
//!
//! Defines the command data model and its state machine, the shared error
//! type, and the boundary traits for the command store, the external
//! interpreter, and the board-mutation surface.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoardqError, QueueErrorCode};
pub use traits::{BoardMutator, CommandInterpreter, CommandStore};
pub use types::{
    BoardId, BoardObject, Command, CommandId, CommandPatch, CommandQuery, CommandStatus,
    Interpretation, NewBoardObject, NewCommand, ProcessingResult, RangeQuery, StoreChange,
    ToolCall,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_boundary_traits_are_object_safe() {
        fn _assert_store(_: &dyn CommandStore) {}
        fn _assert_interpreter(_: &dyn CommandInterpreter) {}
        fn _assert_board(_: &dyn BoardMutator) {}
    }

    #[test]
    fn boardq_error_is_send_sync() {
        fn _assert<T: Send + Sync + 'static>() {}
        _assert::<BoardqError>();
    }
}
