// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for boardq integration tests.
//!
//! Provides mock boundaries and a harness for fast, deterministic,
//! CI-runnable tests without an interpreter service.
//!
//! # Components
//!
//! - [`MockInterpreter`] - scripted interpreter replies, inputs recorded
//! - [`RecordingBoard`] - in-memory board that logs mutations and can refuse them
//! - [`FlakyStore`] - command store wrapper with switchable faults
//! - [`TestHarness`] - store, gateway, and processors wired together

pub mod flaky_store;
pub mod harness;
pub mod mock_interpreter;
pub mod recording_board;

pub use flaky_store::{FlakyStore, StoreFault};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_interpreter::MockInterpreter;
pub use recording_board::{BoardCall, RecordingBoard};
