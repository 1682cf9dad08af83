// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External interpreter boundary: free text in, tool calls out.

use async_trait::async_trait;

use crate::error::BoardqError;
use crate::types::Interpretation;

/// Maps a natural-language request to an ordered list of tool calls.
///
/// `Err` means the service could not be reached or answered garbage;
/// `Ok` with `success == false` means it understood the request but refused it.
#[async_trait]
pub trait CommandInterpreter: Send + Sync + 'static {
    async fn process_command(&self, input: &str) -> Result<Interpretation, BoardqError>;
}
