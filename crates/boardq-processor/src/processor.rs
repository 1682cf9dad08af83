// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The command processor: an event-driven reactor over one board's queue.
//!
//! A running processor holds a `pending`-filtered subscription whose
//! snapshots are forwarded to a single reactor task. For every snapshot the
//! reactor picks the oldest pending command, claims it with the store's
//! conditional write, interprets and executes it, and records the terminal
//! status. After each command it re-reads the pending set once, so work that
//! was announced while it was busy is not missed. A claim write that errors
//! is reported as a failure and followed by an exponential backoff before
//! that re-read.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use boardq_config::model::BoardqConfig;
use boardq_core::{
    BoardId, BoardMutator, BoardqError, Command, CommandInterpreter, CommandPatch, CommandQuery,
    CommandStatus, Interpretation, ProcessingResult, ToolCall,
};
use boardq_executor::{ExecuteOptions, SequentialExecutor};
use boardq_queue::{QueueGateway, Subscription};
use chrono::Utc;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::{EventBus, ProcessorEvent};
use crate::state::ProcessorState;

/// Receives the outcome of every command this processor finishes.
pub type CompletionFn = Arc<dyn Fn(ProcessingResult) + Send + Sync>;

/// Tunables for one processor.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Pause between the claim write and the interpreter call.
    pub claim_delay: Duration,
    /// Upper bound on one interpreter call. `None` waits indefinitely.
    pub interpreter_timeout: Option<Duration>,
    /// First wait after a claim write errors. Doubles per consecutive error.
    pub claim_retry: Duration,
    pub execute: ExecuteOptions,
}

/// Longest claim backoff, as a multiple of [`ProcessorOptions::claim_retry`].
const MAX_CLAIM_BACKOFF: u32 = 30;

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            claim_delay: Duration::from_millis(100),
            interpreter_timeout: None,
            claim_retry: Duration::from_secs(1),
            execute: ExecuteOptions::default(),
        }
    }
}

impl ProcessorOptions {
    pub fn from_config(config: &BoardqConfig) -> Self {
        Self {
            claim_delay: config.processor.claim_delay(),
            interpreter_timeout: config.processor.interpreter_timeout(),
            claim_retry: config.processor.claim_retry(),
            execute: ExecuteOptions::from_config(&config.executor),
        }
    }

    /// Wait after the `errors`-th consecutive claim error.
    fn claim_backoff(&self, errors: u32) -> Duration {
        let factor = 1u32 << errors.saturating_sub(1).min(5);
        self.claim_retry.saturating_mul(factor.min(MAX_CLAIM_BACKOFF))
    }
}

/// Claims and runs queued commands for one board at a time.
///
/// Cheap to clone; clones share the same run.
#[derive(Clone)]
pub struct CommandProcessor {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: QueueGateway,
    interpreter: Arc<dyn CommandInterpreter>,
    executor: SequentialExecutor,
    board: Arc<dyn BoardMutator>,
    options: ProcessorOptions,
    state: watch::Sender<ProcessorState>,
    events: EventBus,
    run: Mutex<Option<Run>>,
}

/// One `start()`..`stop()` span.
struct Run {
    board_id: BoardId,
    subscription: Subscription,
    cancel: CancellationToken,
    reactor: JoinHandle<()>,
}

/// How one pass of [`Inner::process`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// The processor was not idle; the store was not touched.
    Skipped,
    /// The command reached a terminal write, or was not ours to run.
    Done,
    /// The claim write errored and the command is still pending.
    ClaimFailed,
}

/// What [`Inner::run_claimed`] did with a pending command.
enum Attempt {
    /// Stopped before claiming, or another writer claimed first.
    NotClaimed,
    ClaimErrored(ProcessingResult),
    Finished(ProcessingResult),
}

/// What happened to a claimed command before its terminal write.
struct Outcome {
    tool_calls: Vec<ToolCall>,
    error: Option<String>,
}

impl Outcome {
    fn completed(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            error: None,
        }
    }

    fn failed(error: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            error: Some(error.into()),
        }
    }
}

fn pending_query() -> CommandQuery {
    CommandQuery::with_status([CommandStatus::Pending])
}

/// The pending command that should run next: smallest `created_at`, then id.
fn oldest_pending(commands: &[Command]) -> Option<Command> {
    commands
        .iter()
        .filter(|c| c.status == CommandStatus::Pending)
        .min_by(|a, b| a.queue_order(b))
        .cloned()
}

impl CommandProcessor {
    pub fn new(
        gateway: QueueGateway,
        interpreter: Arc<dyn CommandInterpreter>,
        executor: SequentialExecutor,
        board: Arc<dyn BoardMutator>,
        options: ProcessorOptions,
    ) -> Self {
        let (state, _) = watch::channel(ProcessorState::Stopped);
        Self {
            inner: Arc::new(Inner {
                gateway,
                interpreter,
                executor,
                board,
                options,
                state,
                events: EventBus::new(),
                run: Mutex::new(None),
            }),
        }
    }

    /// Starts processing `board_id`.
    ///
    /// A no-op when already running for the same board. Switching boards
    /// stops the previous run and waits for its in-flight command first, so
    /// one processor never runs two commands at once.
    pub async fn start(
        &self,
        board_id: BoardId,
        on_complete: Option<CompletionFn>,
    ) -> Result<(), BoardqError> {
        let mut run = self.inner.run.lock().await;
        if let Some(current) = run.as_ref()
            && current.board_id == board_id
            && !current.cancel.is_cancelled()
        {
            debug!(board_id = %board_id, "processor already running for board");
            return Ok(());
        }

        if let Some(previous) = run.take() {
            self.inner.halt(&previous).await;
            if let Err(e) = previous.reactor.await {
                warn!(board_id = %previous.board_id, error = %e, "previous processor run ended abnormally");
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self
            .inner
            .gateway
            .subscribe(&board_id, pending_query(), move |snapshot| {
                // The reactor is gone only after stop(), which unsubscribes first.
                let _ = tx.send(snapshot);
            })
            .await?;

        self.inner
            .state
            .send_replace(ProcessorState::started(board_id.clone()));
        let cancel = CancellationToken::new();
        let reactor = tokio::spawn(Arc::clone(&self.inner).react(
            board_id.clone(),
            rx,
            cancel.clone(),
            on_complete,
        ));

        info!(board_id = %board_id, "command processor started");
        self.inner.events.publish(ProcessorEvent::Started {
            board_id: board_id.clone(),
        });

        *run = Some(Run {
            board_id,
            subscription,
            cancel,
            reactor,
        });
        Ok(())
    }

    /// Stops claiming new commands.
    ///
    /// When this returns no snapshot callback is running and none will run
    /// again. A command already claimed still reaches a terminal status and
    /// is still reported to the completion callback.
    pub async fn stop(&self) {
        let run = self.inner.run.lock().await;
        if let Some(run) = run.as_ref() {
            self.inner.halt(run).await;
        }
    }

    /// Stops the processor and waits up to `grace` for an in-flight command.
    ///
    /// Returns `false` if the command was still running when `grace` ran out.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let mut run = self.inner.run.lock().await;
        let Some(previous) = run.take() else {
            return true;
        };
        self.inner.halt(&previous).await;
        match tokio::time::timeout(grace, previous.reactor).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(board_id = %previous.board_id, error = %e, "processor run ended abnormally");
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().is_active()
    }

    pub fn state(&self) -> ProcessorState {
        self.inner.state.borrow().clone()
    }

    /// Observes state transitions as they happen.
    pub fn watch_state(&self) -> watch::Receiver<ProcessorState> {
        self.inner.state.subscribe()
    }

    /// Diagnostic events from now on.
    pub fn events(&self) -> broadcast::Receiver<ProcessorEvent> {
        self.inner.events.subscribe()
    }
}

impl fmt::Debug for CommandProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("state", &*self.inner.state.borrow())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Ends `run`. Idempotent.
    async fn halt(&self, run: &Run) {
        if run.cancel.is_cancelled() {
            return;
        }
        // Stopped first: a reactor that has not begun a command can no longer begin one.
        self.state.send_modify(|state| *state = state.stopped());
        run.cancel.cancel();
        run.subscription.unsubscribe().await;

        info!(board_id = %run.board_id, "command processor stopped");
        self.events.publish(ProcessorEvent::Stopped {
            board_id: run.board_id.clone(),
        });
    }

    async fn react(
        self: Arc<Self>,
        board_id: BoardId,
        mut snapshots: mpsc::UnboundedReceiver<Vec<Command>>,
        cancel: CancellationToken,
        on_complete: Option<CompletionFn>,
    ) {
        let mut claim_errors: u32 = 0;
        loop {
            let snapshot = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                snapshot = snapshots.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };

            let mut next = oldest_pending(&snapshot);
            while let Some(command) = next.take() {
                if cancel.is_cancelled() {
                    break;
                }
                match self.process(&board_id, command, on_complete.as_ref()).await {
                    Pass::Skipped => break,
                    Pass::Done => claim_errors = 0,
                    Pass::ClaimFailed => {
                        claim_errors = claim_errors.saturating_add(1);
                        let wait = self.options.claim_backoff(claim_errors);
                        debug!(board_id = %board_id, attempts = claim_errors, wait = ?wait, "backing off after claim error");
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(wait) => {}
                        }
                    }
                }

                // Anything delivered while busy is older than the read below.
                while snapshots.try_recv().is_ok() {}
                if cancel.is_cancelled() {
                    break;
                }
                next = match self.gateway.get_commands(&board_id, &pending_query()).await {
                    Ok(pending) => oldest_pending(&pending),
                    Err(e) => {
                        warn!(board_id = %board_id, error = %e, "re-read of pending commands failed");
                        None
                    }
                };
            }
        }
        debug!(board_id = %board_id, "processor reactor exited");
    }

    /// Runs one command from claim to terminal write.
    ///
    /// Returns [`Pass::Skipped`] without touching the store when the
    /// processor is not idle (stopped, or already busy).
    async fn process(
        &self,
        board_id: &BoardId,
        command: Command,
        on_complete: Option<&CompletionFn>,
    ) -> Pass {
        let began = self.state.send_if_modified(|state| match state.begin(command.id.clone()) {
            Some(next) => {
                *state = next;
                true
            }
            None => false,
        });
        if !began {
            return Pass::Skipped;
        }

        let (pass, result) = match self.run_claimed(board_id, command).await {
            Attempt::NotClaimed => (Pass::Done, None),
            Attempt::ClaimErrored(result) => (Pass::ClaimFailed, Some(result)),
            Attempt::Finished(result) => (Pass::Done, Some(result)),
        };
        if let Some(result) = result
            && let Some(callback) = on_complete
        {
            callback(result);
        }

        self.state.send_modify(|state| *state = state.finish());
        pass
    }

    async fn run_claimed(&self, board_id: &BoardId, command: Command) -> Attempt {
        let command_id = command.id.clone();
        // stop() may have landed between begin() and here.
        let active = self.state.borrow().is_active();
        if !active {
            debug!(board_id = %board_id, command_id = %command_id, "processor stopped before claim");
            return Attempt::NotClaimed;
        }

        match self.gateway.claim(board_id, &command_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(board_id = %board_id, command_id = %command_id, "claim lost to another processor");
                self.events.publish(ProcessorEvent::ClaimLost {
                    board_id: board_id.clone(),
                    command_id,
                });
                return Attempt::NotClaimed;
            }
            Err(e) => {
                let message = e.user_message();
                warn!(board_id = %board_id, command_id = %command_id, error = %e, "claim write failed");
                self.events.publish(ProcessorEvent::ClaimFailed {
                    board_id: board_id.clone(),
                    command_id,
                    error: message.clone(),
                });
                return Attempt::ClaimErrored(ProcessingResult {
                    command,
                    success: false,
                    tool_calls: Vec::new(),
                    error: Some(message),
                });
            }
        }

        info!(board_id = %board_id, command_id = %command_id, "command claimed");
        self.events.publish(ProcessorEvent::Claimed {
            board_id: board_id.clone(),
            command_id: command_id.clone(),
        });

        let outcome = self.interpret_and_execute(board_id, &command).await;
        let result = match outcome.error {
            None => match self
                .gateway
                .complete(board_id, &command_id, outcome.tool_calls.clone())
                .await
            {
                Ok(()) => {
                    info!(
                        board_id = %board_id,
                        command_id = %command_id,
                        steps = outcome.tool_calls.len(),
                        "command completed"
                    );
                    self.events.publish(ProcessorEvent::Completed {
                        board_id: board_id.clone(),
                        command_id,
                    });
                    let patch = CommandPatch::completed(outcome.tool_calls.clone(), Utc::now());
                    ProcessingResult {
                        command: self.settled(board_id, command, Some(patch)).await,
                        success: true,
                        tool_calls: outcome.tool_calls,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(board_id = %board_id, command_id = %command_id, error = %e, "failed to record completion");
                    self.record_failure(board_id, command, e.user_message(), outcome.tool_calls)
                        .await
                }
            },
            Some(message) => {
                self.record_failure(board_id, command, message, outcome.tool_calls)
                    .await
            }
        };
        Attempt::Finished(result)
    }

    async fn interpret_and_execute(&self, board_id: &BoardId, command: &Command) -> Outcome {
        if !self.options.claim_delay.is_zero() {
            tokio::time::sleep(self.options.claim_delay).await;
        }

        let interpretation = match self.interpret(&command.input).await {
            Ok(interpretation) => interpretation,
            Err(e) => return Outcome::failed(e.user_message(), Vec::new()),
        };
        if !interpretation.success {
            return Outcome::failed(interpretation.failure_message(), Vec::new());
        }

        debug!(
            board_id = %board_id,
            command_id = %command.id,
            steps = interpretation.tool_calls.len(),
            "executing tool calls"
        );
        let report = self
            .executor
            .execute(
                &interpretation.tool_calls,
                self.board.as_ref(),
                &self.options.execute,
            )
            .await;
        if report.success {
            Outcome::completed(report.executed_calls())
        } else {
            Outcome::failed(report.failure_message(), report.executed_calls())
        }
    }

    async fn interpret(&self, input: &str) -> Result<Interpretation, BoardqError> {
        let call = self.interpreter.process_command(input);
        match self.options.interpreter_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                BoardqError::interpreter(format!("interpreter timed out after {limit:?}"))
            })?,
            None => call.await,
        }
    }

    /// Best-effort `failed` write. A rejected write is logged and published,
    /// never propagated; the caller still gets a failure result.
    async fn record_failure(
        &self,
        board_id: &BoardId,
        command: Command,
        message: String,
        tool_calls: Vec<ToolCall>,
    ) -> ProcessingResult {
        let command_id = command.id.clone();
        warn!(board_id = %board_id, command_id = %command_id, error = %message, "command failed");

        let written = match self.gateway.fail(board_id, &command_id, &message).await {
            Ok(()) => {
                self.events.publish(ProcessorEvent::Failed {
                    board_id: board_id.clone(),
                    command_id,
                    error: message.clone(),
                });
                Some(CommandPatch::failed(message.clone(), Utc::now()))
            }
            Err(e) => {
                error!(
                    board_id = %board_id,
                    command_id = %command_id,
                    error = %e,
                    "could not record command failure"
                );
                self.events.publish(ProcessorEvent::FailWriteDropped {
                    board_id: board_id.clone(),
                    command_id,
                    error: e.to_string(),
                });
                None
            }
        };

        ProcessingResult {
            command: self.settled(board_id, command, written).await,
            success: false,
            tool_calls,
            error: Some(message),
        }
    }

    /// The command as the store holds it after a terminal write attempt.
    ///
    /// `written` is the patch the store accepted, or `None` when the write
    /// was dropped. If the record cannot be read back, an accepted patch is
    /// applied to the local copy; a dropped one leaves the copy unchanged.
    async fn settled(
        &self,
        board_id: &BoardId,
        mut command: Command,
        written: Option<CommandPatch>,
    ) -> Command {
        match self.gateway.get_command(board_id, &command.id).await {
            Ok(Some(stored)) if stored.status.is_terminal() || written.is_none() => stored,
            Ok(_) | Err(_) => {
                if let Some(patch) = written {
                    command.apply_patch(&CommandPatch::status(CommandStatus::Processing, Utc::now()));
                    command.apply_patch(&patch);
                }
                command
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use boardq_core::NewCommand;
    use boardq_executor::MemoryBoard;
    use boardq_storage::MemoryCommandStore;
    use chrono::TimeZone;
    use tracing_test::traced_test;

    struct Unreachable;

    #[async_trait]
    impl CommandInterpreter for Unreachable {
        async fn process_command(&self, _input: &str) -> Result<Interpretation, BoardqError> {
            Err(BoardqError::interpreter("unreachable"))
        }
    }

    fn processor(gateway: &QueueGateway) -> CommandProcessor {
        CommandProcessor::new(
            gateway.clone(),
            Arc::new(Unreachable),
            SequentialExecutor::with_builtins(),
            Arc::new(MemoryBoard::new()),
            ProcessorOptions::default(),
        )
    }

    fn command(id: &str, secs: i64, status: CommandStatus) -> Command {
        let mut command = NewCommand {
            user_id: "u".into(),
            input: "x".into(),
            created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
        .into_command(id.into(), BoardId::new("b"));
        command.status = status;
        command
    }

    #[test]
    fn oldest_pending_ignores_snapshot_order() {
        let snapshot = vec![
            command("c", 30, CommandStatus::Pending),
            command("a", 10, CommandStatus::Processing),
            command("b", 20, CommandStatus::Pending),
            command("d", 20, CommandStatus::Pending),
        ];
        assert_eq!(oldest_pending(&snapshot).unwrap().id.as_str(), "b");
        assert!(oldest_pending(&[]).is_none());
    }

    #[test]
    fn options_follow_config() {
        let mut config = BoardqConfig::default();
        config.processor.claim_delay_ms = 0;
        config.processor.interpreter_timeout_secs = Some(3);
        config.executor.stop_on_error = true;

        let options = ProcessorOptions::from_config(&config);
        assert!(options.claim_delay.is_zero());
        assert_eq!(options.interpreter_timeout, Some(Duration::from_secs(3)));
        assert!(options.execute.stop_on_error);
        assert_eq!(options.claim_retry, Duration::from_secs(1));
        assert_eq!(ProcessorOptions::default().claim_delay, Duration::from_millis(100));
    }

    #[test]
    fn claim_backoff_doubles_up_to_its_cap() {
        let options = ProcessorOptions {
            claim_retry: Duration::from_millis(10),
            ..ProcessorOptions::default()
        };
        let waits: Vec<u64> = (1..=8)
            .map(|n| options.claim_backoff(n).as_millis() as u64)
            .collect();
        assert_eq!(waits, [10, 20, 40, 80, 160, 300, 300, 300]);
        assert_eq!(options.claim_backoff(u32::MAX), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn stopped_processor_does_not_claim() {
        let gateway = QueueGateway::new(Arc::new(MemoryCommandStore::new()));
        let board = BoardId::new("b");
        let id = gateway.enqueue(&board, "u", "x").await.unwrap();
        let pending = gateway.get_command(&board, &id).await.unwrap().unwrap();

        // Never started, so the state is already `Stopped`.
        let processor = processor(&gateway);
        let mut events = processor.events();
        let attempt = processor.inner.run_claimed(&board, pending).await;

        assert!(matches!(attempt, Attempt::NotClaimed));
        assert!(events.try_recv().is_err());
        assert_eq!(
            gateway.get_command(&board, &id).await.unwrap().unwrap().status,
            CommandStatus::Pending
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn recorded_failure_reads_back_the_stored_command() {
        let gateway = QueueGateway::new(Arc::new(MemoryCommandStore::new()));
        let board = BoardId::new("b");
        let id = gateway.enqueue(&board, "u", "x").await.unwrap();
        assert!(gateway.claim(&board, &id).await.unwrap());
        let claimed = gateway.get_command(&board, &id).await.unwrap().unwrap();

        let processor = processor(&gateway);
        let mut events = processor.events();
        let result = processor
            .inner
            .record_failure(&board, claimed, "boom".into(), Vec::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.command.status, CommandStatus::Failed);
        assert_eq!(result.command.error.as_deref(), Some("boom"));
        assert_eq!(result.command.lifecycle_violation(), None);
        assert!(matches!(
            events.recv().await.unwrap(),
            ProcessorEvent::Failed { error, .. } if error == "boom"
        ));
        assert!(logs_contain("command failed"));
    }

    #[tokio::test]
    #[traced_test]
    async fn rejected_failure_write_is_logged_and_published() {
        let gateway = QueueGateway::new(Arc::new(MemoryCommandStore::new()));
        let board = BoardId::new("b");
        let id = gateway.enqueue(&board, "u", "x").await.unwrap();
        // Still pending, so the conditional `failed` write is refused.
        let pending = gateway.get_command(&board, &id).await.unwrap().unwrap();

        let processor = processor(&gateway);
        let mut events = processor.events();
        let result = processor
            .inner
            .record_failure(&board, pending, "boom".into(), Vec::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(matches!(
            events.recv().await.unwrap(),
            ProcessorEvent::FailWriteDropped { command_id, .. } if command_id == id
        ));
        assert!(logs_contain("could not record command failure"));
        // The result reports what the store holds, not the write that was refused.
        let stored = gateway.get_command(&board, &id).await.unwrap().unwrap();
        assert_eq!(stored.status, CommandStatus::Pending);
        assert_eq!(result.command, stored);
        assert_eq!(result.command.error, None);
    }
}
