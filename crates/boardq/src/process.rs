// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `boardq process` command implementation.
//!
//! Wires the configured store, the HTTP interpreter, and an in-memory board
//! into a [`CommandProcessor`], then runs until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use boardq_config::BoardqConfig;
use boardq_core::{BoardId, BoardqError, ProcessingResult};
use boardq_executor::{MemoryBoard, SequentialExecutor};
use boardq_interpreter::HttpInterpreter;
use boardq_processor::{
    CommandProcessor, CompletionFn, ProcessorEvent, ProcessorOptions, drain_processor,
    install_signal_handler,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{output, queue};

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so that
/// `--json` output on stdout stays machine-readable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("boardq={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs the processor for `board_id` until a shutdown signal arrives.
pub async fn run_process(
    config: &BoardqConfig,
    board_id: BoardId,
    grace: Duration,
    use_color: bool,
) -> Result<(), BoardqError> {
    let gateway = queue::open_gateway(config).await?;
    let executor = SequentialExecutor::with_builtins();
    let interpreter = HttpInterpreter::from_config(&config.interpreter)?
        .with_tools(executor.registry().tool_definitions());
    info!(endpoint = interpreter.endpoint(), "interpreter configured");

    let board = Arc::new(MemoryBoard::new());
    let processor = CommandProcessor::new(
        gateway,
        Arc::new(interpreter),
        executor,
        board.clone(),
        ProcessorOptions::from_config(config),
    );

    let shutdown = install_signal_handler();
    let mut events = processor.events();
    let on_complete: CompletionFn = Arc::new(move |result: ProcessingResult| {
        println!("{}", output::result_line(&result, use_color));
    });
    processor.start(board_id.clone(), Some(on_complete)).await?;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "processor events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    drain_processor(&processor, grace).await;
    info!(board_id = %board_id, objects = board.len().await, "processor exited");
    Ok(())
}

fn log_event(event: &ProcessorEvent) {
    match event {
        ProcessorEvent::FailWriteDropped {
            command_id, error, ..
        } => {
            warn!(command_id = %command_id, error = %error, "command left in processing; failure not recorded");
        }
        other => debug!(kind = other.kind(), command_id = ?other.command_id(), "processor event"),
    }
}
