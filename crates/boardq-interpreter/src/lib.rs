// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the external interpreter that turns free text into tool calls.

pub mod client;

pub use client::HttpInterpreter;
