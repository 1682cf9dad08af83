// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential executor: applies one command's tool calls in order.
//!
//! Steps run one at a time in the order supplied. Each step's failure is
//! captured in its [`StepResult`] and, unless `stop_on_error` is set, the
//! remaining steps still run. Nothing is rolled back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use boardq_config::model::ExecutorConfig;
use boardq_core::{BoardMutator, BoardqError, ToolCall};
use serde::Serialize;
use tracing::{debug, warn};

use crate::tool::{ToolOutput, ToolRegistry};

/// Progress callback: `(completed_steps, total_steps, last_step)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize, &StepResult) + Send + Sync>;

/// Knobs for one [`SequentialExecutor::execute`] run.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Skip the remaining steps after the first failure.
    pub stop_on_error: bool,
    /// Pause between consecutive steps. Never applied after the last one.
    pub delay_between_steps: Duration,
    /// Fail a step that takes longer than this.
    pub step_timeout: Option<Duration>,
    pub on_progress: Option<ProgressFn>,
}

impl ExecuteOptions {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            stop_on_error: config.stop_on_error,
            delay_between_steps: config.delay_between_steps(),
            step_timeout: config.step_timeout(),
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(usize, usize, &StepResult) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("stop_on_error", &self.stop_on_error)
            .field("delay_between_steps", &self.delay_between_steps)
            .field("step_timeout", &self.step_timeout)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Zero-based position in the supplied tool-call list.
    pub index: usize,
    pub tool_call: ToolCall,
    pub success: bool,
    pub message: String,
    pub affected_objects: Vec<String>,
    pub error: Option<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// True iff every supplied step ran and succeeded.
    pub success: bool,
    pub message: String,
    pub step_results: Vec<StepResult>,
    /// Union of every step's affected objects, in first-seen order.
    pub affected_objects: Vec<String>,
    /// `"Step <n>: <message>"` per failed step, `n` one-based.
    pub errors: Vec<String>,
}

impl ExecutionReport {
    /// The tool calls that were attempted, in order.
    pub fn executed_calls(&self) -> Vec<ToolCall> {
        self.step_results
            .iter()
            .map(|step| step.tool_call.clone())
            .collect()
    }

    /// The single message written to a failed command.
    pub fn failure_message(&self) -> String {
        if self.errors.is_empty() {
            self.message.clone()
        } else {
            self.errors.join("; ")
        }
    }
}

/// Applies tool calls through a [`ToolRegistry`] against a board.
#[derive(Clone)]
pub struct SequentialExecutor {
    registry: Arc<ToolRegistry>,
}

impl SequentialExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// An executor over the built-in board tools.
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(ToolRegistry::with_builtins()))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs `tool_calls` in order against `board`.
    ///
    /// Never fails as a whole: every problem is reported per step.
    pub async fn execute(
        &self,
        tool_calls: &[ToolCall],
        board: &dyn BoardMutator,
        options: &ExecuteOptions,
    ) -> ExecutionReport {
        let total = tool_calls.len();
        let mut step_results = Vec::with_capacity(total);
        let mut affected_objects: Vec<String> = Vec::new();
        let mut errors = Vec::new();

        for (index, tool_call) in tool_calls.iter().enumerate() {
            if index > 0 && !options.delay_between_steps.is_zero() {
                tokio::time::sleep(options.delay_between_steps).await;
            }

            let step = self
                .run_step(index, tool_call, board, options.step_timeout)
                .await;

            for id in &step.affected_objects {
                if !affected_objects.contains(id) {
                    affected_objects.push(id.clone());
                }
            }
            if let Some(error) = &step.error {
                errors.push(format!("Step {}: {error}", index + 1));
            }
            if let Some(on_progress) = &options.on_progress {
                on_progress(index + 1, total, &step);
            }

            let halt = !step.success && options.stop_on_error;
            step_results.push(step);
            if halt {
                debug!(step = index + 1, total, "stopping after failed step");
                break;
            }
        }

        let succeeded = step_results.iter().filter(|s| s.success).count();
        let success = succeeded == total;
        let message = if success {
            format!("Executed {total} steps successfully")
        } else {
            format!(
                "{succeeded}/{total} steps succeeded ({} errors)",
                errors.len()
            )
        };

        ExecutionReport {
            success,
            message,
            step_results,
            affected_objects,
            errors,
        }
    }

    async fn run_step(
        &self,
        index: usize,
        tool_call: &ToolCall,
        board: &dyn BoardMutator,
        timeout: Option<Duration>,
    ) -> StepResult {
        let outcome = match self.registry.get(&tool_call.name) {
            None => Err(format!("Unknown tool: {}", tool_call.name)),
            Some(tool) => {
                let invocation = tool.invoke(board, &tool_call.arguments);
                let result = match timeout {
                    Some(duration) => tokio::time::timeout(duration, invocation)
                        .await
                        .unwrap_or(Err(BoardqError::Timeout { duration })),
                    None => invocation.await,
                };
                result.map_err(|e| e.user_message())
            }
        };

        match outcome {
            Ok(ToolOutput {
                message,
                affected_objects,
            }) => {
                debug!(step = index + 1, tool = %tool_call.name, %message, "step succeeded");
                StepResult {
                    index,
                    tool_call: tool_call.clone(),
                    success: true,
                    message,
                    affected_objects,
                    error: None,
                }
            }
            Err(error) => {
                warn!(step = index + 1, tool = %tool_call.name, %error, "step failed");
                StepResult {
                    index,
                    tool_call: tool_call.clone(),
                    success: false,
                    message: error.clone(),
                    affected_objects: Vec::new(),
                    error: Some(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBoard;
    use crate::tool::BoardTool;
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use std::sync::Mutex;

    struct ExplodingTool;

    #[async_trait]
    impl BoardTool for ExplodingTool {
        fn name(&self) -> &str {
            "explode"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(
            &self,
            _board: &dyn BoardMutator,
            _arguments: &Map<String, Value>,
        ) -> Result<ToolOutput, BoardqError> {
            Err(BoardqError::board("kaboom"))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl BoardTool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Sleeps for a minute"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(
            &self,
            _board: &dyn BoardMutator,
            _arguments: &Map<String, Value>,
        ) -> Result<ToolOutput, BoardqError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolOutput::default())
        }
    }

    fn executor() -> SequentialExecutor {
        let mut registry = ToolRegistry::with_builtins();
        registry.register(Arc::new(ExplodingTool));
        registry.register(Arc::new(SlowTool));
        SequentialExecutor::new(Arc::new(registry))
    }

    fn note(text: &str) -> ToolCall {
        ToolCall::new("createStickyNote", json!({"text": text}))
    }

    #[tokio::test]
    async fn empty_plan_succeeds() {
        let report = executor()
            .execute(&[], &MemoryBoard::new(), &ExecuteOptions::default())
            .await;
        assert!(report.success);
        assert!(report.step_results.is_empty());
        assert_eq!(report.message, "Executed 0 steps successfully");
    }

    #[tokio::test]
    async fn failed_step_does_not_stop_the_run() {
        let board = MemoryBoard::new();
        let calls = [note("a"), ToolCall::new("explode", Value::Null), note("c")];
        let report = executor()
            .execute(&calls, &board, &ExecuteOptions::default())
            .await;

        assert!(!report.success);
        assert_eq!(report.step_results.len(), 3);
        assert_eq!(report.errors, ["Step 2: kaboom"]);
        assert_eq!(report.message, "2/3 steps succeeded (1 errors)");
        assert_eq!(report.affected_objects.len(), 2);
        assert_eq!(board.len().await, 2);
        assert_eq!(report.failure_message(), "Step 2: kaboom");
    }

    #[tokio::test]
    async fn stop_on_error_skips_later_steps() {
        let board = MemoryBoard::new();
        let calls = [ToolCall::new("explode", Value::Null), note("b")];
        let options = ExecuteOptions {
            stop_on_error: true,
            ..ExecuteOptions::default()
        };
        let report = executor().execute(&calls, &board, &options).await;

        assert_eq!(report.step_results.len(), 1);
        assert!(board.is_empty().await);
        assert_eq!(report.message, "0/2 steps succeeded (1 errors)");
    }

    #[tokio::test]
    async fn unknown_tool_fails_its_step() {
        let report = executor()
            .execute(
                &[ToolCall::new("paintRainbow", Value::Null)],
                &MemoryBoard::new(),
                &ExecuteOptions::default(),
            )
            .await;
        assert_eq!(report.errors, ["Step 1: Unknown tool: paintRainbow"]);
        assert_eq!(
            report.step_results[0].error.as_deref(),
            Some("Unknown tool: paintRainbow")
        );
    }

    #[tokio::test]
    async fn progress_fires_after_every_step() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = ExecuteOptions::default().with_progress(move |done, total, step| {
            sink.lock().unwrap().push((done, total, step.success));
        });
        executor()
            .execute(
                &[note("a"), ToolCall::new("explode", Value::Null)],
                &MemoryBoard::new(),
                &options,
            )
            .await;
        assert_eq!(*seen.lock().unwrap(), [(1, 2, true), (2, 2, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn step_timeout_fails_the_step() {
        let options = ExecuteOptions {
            step_timeout: Some(Duration::from_secs(2)),
            ..ExecuteOptions::default()
        };
        let report = executor()
            .execute(
                &[ToolCall::new("slow", Value::Null), note("after")],
                &MemoryBoard::new(),
                &options,
            )
            .await;
        assert_eq!(report.errors, ["Step 1: operation timed out after 2s"]);
        assert!(report.step_results[1].success);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_only_between_steps() {
        let options = ExecuteOptions {
            delay_between_steps: Duration::from_millis(500),
            ..ExecuteOptions::default()
        };
        let start = tokio::time::Instant::now();
        executor()
            .execute(&[note("a"), note("b"), note("c")], &MemoryBoard::new(), &options)
            .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "elapsed {elapsed:?}");
    }
}
