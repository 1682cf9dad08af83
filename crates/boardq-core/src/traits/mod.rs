// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary traits for the external collaborators of the queue.
//!
//! All traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` by the gateway, processor, and executor.

pub mod board;
pub mod interpreter;
pub mod store;

pub use board::BoardMutator;
pub use interpreter::CommandInterpreter;
pub use store::CommandStore;
