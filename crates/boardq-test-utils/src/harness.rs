// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a store (in-memory or temp SQLite), a gateway, a
//! mock interpreter, and a recording board. Processors built from one
//! harness share all of them, so several can race on the same queue.

use std::sync::Arc;
use std::time::Duration;

use boardq_config::model::{BoardqConfig, StorageBackend, StorageConfig};
use boardq_core::{
    BoardId, BoardqError, Command, CommandId, CommandStatus, CommandStore, ProcessingResult,
};
use boardq_executor::SequentialExecutor;
use boardq_processor::{CommandProcessor, CompletionFn, ProcessorOptions};
use boardq_queue::QueueGateway;
use boardq_storage::open_store;
use tokio::sync::{mpsc, watch};

use crate::flaky_store::FlakyStore;
use crate::mock_interpreter::MockInterpreter;
use crate::recording_board::RecordingBoard;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    interpreter: MockInterpreter,
    sqlite: bool,
    flaky: bool,
    config: BoardqConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = BoardqConfig::default();
        config.processor.claim_delay_ms = 0;
        config.storage.change_poll_ms = 20;
        config.processor.claim_retry_ms = 50;
        Self {
            interpreter: MockInterpreter::new(),
            sqlite: false,
            flaky: false,
            config,
        }
    }

    pub fn with_interpreter(mut self, interpreter: MockInterpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Back the queue with a SQLite file in a temp directory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Wrap the store in a [`FlakyStore`] reachable through `TestHarness::flaky`.
    pub fn with_flaky_store(mut self) -> Self {
        self.flaky = true;
        self
    }

    pub fn with_config(mut self, config: BoardqConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(mut self) -> Result<TestHarness, BoardqError> {
        let temp_dir = if self.sqlite {
            let temp_dir =
                tempfile::TempDir::new().map_err(|e| BoardqError::Storage { source: e.into() })?;
            self.config.storage = StorageConfig {
                backend: StorageBackend::Sqlite,
                database_path: temp_dir.path().join("boardq.db").to_string_lossy().to_string(),
                ..self.config.storage
            };
            Some(temp_dir)
        } else {
            self.config.storage.backend = StorageBackend::Memory;
            None
        };
        let store = open_store(&self.config.storage).await?;

        let (store, flaky) = if self.flaky {
            let flaky = Arc::new(FlakyStore::new(store));
            (Arc::clone(&flaky) as Arc<dyn CommandStore>, Some(flaky))
        } else {
            (store, None)
        };

        Ok(TestHarness {
            gateway: QueueGateway::new(Arc::clone(&store)),
            store,
            flaky,
            interpreter: Arc::new(self.interpreter),
            board: Arc::new(RecordingBoard::new()),
            board_id: BoardId::new("test-board"),
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock interpreter and temp storage.
pub struct TestHarness {
    pub store: Arc<dyn CommandStore>,
    pub gateway: QueueGateway,
    /// Present when built with [`TestHarnessBuilder::with_flaky_store`].
    pub flaky: Option<Arc<FlakyStore>>,
    pub interpreter: Arc<MockInterpreter>,
    pub board: Arc<RecordingBoard>,
    pub board_id: BoardId,
    pub config: BoardqConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A fresh processor sharing this harness's store, interpreter, and board.
    pub fn processor(&self) -> CommandProcessor {
        CommandProcessor::new(
            self.gateway.clone(),
            self.interpreter.clone(),
            SequentialExecutor::with_builtins(),
            self.board.clone(),
            ProcessorOptions::from_config(&self.config),
        )
    }

    /// Starts a new processor on the harness board. Every result it reports
    /// arrives on the returned channel.
    pub async fn start_processor(
        &self,
    ) -> Result<(CommandProcessor, mpsc::UnboundedReceiver<ProcessingResult>), BoardqError> {
        let processor = self.processor();
        let (tx, rx) = mpsc::unbounded_channel();
        let on_complete: CompletionFn = Arc::new(move |result: ProcessingResult| {
            let _ = tx.send(result);
        });
        processor
            .start(self.board_id.clone(), Some(on_complete))
            .await?;
        Ok((processor, rx))
    }

    pub async fn enqueue(&self, input: &str) -> Result<CommandId, BoardqError> {
        self.gateway.enqueue(&self.board_id, "test-user", input).await
    }

    /// Waits until the command reaches `status`, or `timeout` passes.
    pub async fn wait_for_status(
        &self,
        id: &CommandId,
        status: CommandStatus,
        timeout: Duration,
    ) -> Result<Command, BoardqError> {
        let (tx, mut rx) = watch::channel(None);
        let subscription = self
            .gateway
            .subscribe_to_command(&self.board_id, id, move |command| {
                let _ = tx.send(command);
            })
            .await?;

        let reached = tokio::time::timeout(timeout, async {
            rx.wait_for(|c: &Option<Command>| c.as_ref().is_some_and(|c| c.status == status))
                .await
                .map(|command| command.clone())
        })
        .await;
        subscription.unsubscribe().await;

        match reached {
            Ok(Ok(command)) => {
                command.ok_or_else(|| BoardqError::Internal("command vanished".into()))
            }
            Ok(Err(_)) => Err(BoardqError::Internal("subscription ended".into())),
            Err(_) => Err(BoardqError::Timeout { duration: timeout }),
        }
    }
}
