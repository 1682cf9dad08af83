// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock interpreter for deterministic testing.
//!
//! `MockInterpreter` implements `CommandInterpreter` with pre-configured
//! replies, enabling fast, CI-runnable tests without the external service.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use boardq_core::{BoardqError, CommandInterpreter, Interpretation, ToolCall};
use tokio::sync::Mutex;

/// A mock interpreter that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty an
/// interpretation with no tool calls is returned.
pub struct MockInterpreter {
    replies: Arc<Mutex<VecDeque<Result<Interpretation, String>>>>,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl MockInterpreter {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A mock pre-loaded with successful interpretations, one per call.
    pub fn with_tool_calls(plans: Vec<Vec<ToolCall>>) -> Self {
        let replies = plans
            .into_iter()
            .map(|calls| Ok(Interpretation::succeeded(format!("{} actions", calls.len()), calls)))
            .collect();
        Self {
            replies: Arc::new(Mutex::new(replies)),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_reply(&self, interpretation: Interpretation) {
        self.replies.lock().await.push_back(Ok(interpretation));
    }

    /// The next call fails with an interpreter error carrying `message`.
    pub async fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Err(message.into()));
    }

    /// Every input received so far, in call order.
    pub async fn inputs(&self) -> Vec<String> {
        self.inputs.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.inputs.lock().await.len()
    }
}

impl Default for MockInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandInterpreter for MockInterpreter {
    async fn process_command(&self, input: &str) -> Result<Interpretation, BoardqError> {
        self.inputs.lock().await.push(input.to_string());
        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Interpretation::succeeded("nothing to do", Vec::new())));
        reply.map_err(BoardqError::interpreter)
    }
}
