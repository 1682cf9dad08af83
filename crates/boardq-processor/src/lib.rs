// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command processor for the boardq queue.
//!
//! The [`CommandProcessor`] watches one board's pending commands and runs them
//! one at a time:
//! - Claims the oldest pending command with a conditional write
//! - Sends its text to the [`CommandInterpreter`](boardq_core::CommandInterpreter)
//! - Applies the returned tool calls through the sequential executor
//! - Records `completed` or `failed` and reports the outcome

pub mod events;
pub mod processor;
pub mod shutdown;
pub mod state;

pub use events::ProcessorEvent;
pub use processor::{CommandProcessor, CompletionFn, ProcessorOptions};
pub use shutdown::{drain_processor, install_signal_handler};
pub use state::ProcessorState;
