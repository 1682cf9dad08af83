// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential executor for boardq tool calls.
//!
//! - [`SequentialExecutor`] applies one command's tool calls in order with
//!   per-step failure capture.
//! - [`ToolRegistry`] and [`BoardTool`] map tool-call names to board edits;
//!   [`builtin`] holds the standard board tool catalogue.
//! - [`MemoryBoard`] is an in-memory [`boardq_core::BoardMutator`].

pub mod board;
pub mod builtin;
pub mod executor;
pub mod tool;

pub use board::MemoryBoard;
pub use executor::{ExecuteOptions, ExecutionReport, ProgressFn, SequentialExecutor, StepResult};
pub use tool::{BoardTool, ToolOutput, ToolRegistry};
