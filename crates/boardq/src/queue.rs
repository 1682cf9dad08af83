// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue inspection subcommands: `list`, `show`, `watch`.

use boardq_config::BoardqConfig;
use boardq_core::{BoardId, BoardqError, Command, CommandId, CommandQuery, CommandStatus};
use boardq_processor::install_signal_handler;
use boardq_queue::QueueGateway;
use boardq_storage::open_store;
use tracing::debug;

use crate::output;

/// Opens the configured store and wraps it in a gateway.
pub async fn open_gateway(config: &BoardqConfig) -> Result<QueueGateway, BoardqError> {
    let store = open_store(&config.storage).await?;
    debug!(store = store.name(), "command store opened");
    Ok(QueueGateway::new(store))
}

pub async fn list(
    gateway: &QueueGateway,
    board_id: &BoardId,
    statuses: Vec<CommandStatus>,
    limit: usize,
) -> Result<Vec<Command>, BoardqError> {
    let query = if statuses.is_empty() {
        CommandQuery::all()
    } else {
        CommandQuery::with_status(statuses)
    };
    gateway.get_commands(board_id, &query.limit(limit)).await
}

/// Looks up one command, turning absence into [`BoardqError::CommandNotFound`].
pub async fn show(
    gateway: &QueueGateway,
    board_id: &BoardId,
    id: &str,
) -> Result<Command, BoardqError> {
    gateway
        .get_command(board_id, &CommandId::from(id))
        .await?
        .ok_or_else(|| BoardqError::CommandNotFound {
            board_id: board_id.to_string(),
            id: id.to_string(),
        })
}

/// Streams snapshots to stdout until Ctrl+C or SIGTERM.
pub async fn watch(
    gateway: &QueueGateway,
    board_id: &BoardId,
    command: Option<String>,
    limit: usize,
    use_color: bool,
) -> Result<(), BoardqError> {
    let shutdown = install_signal_handler();

    let subscription = match command {
        Some(id) => {
            let id = CommandId(id);
            let label = id.clone();
            gateway
                .subscribe_to_command(board_id, &id, move |command| match command {
                    Some(command) => println!("{}", output::command_line(&command, use_color)),
                    None => println!("{label}: not found"),
                })
                .await?
        }
        None => {
            gateway
                .subscribe(board_id, CommandQuery::all().limit(limit), move |commands| {
                    println!("--- {} command(s)", commands.len());
                    for command in &commands {
                        println!("{}", output::command_line(command, use_color));
                    }
                })
                .await?
        }
    };

    shutdown.cancelled().await;
    subscription.unsubscribe().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use boardq_storage::MemoryCommandStore;

    use super::*;

    fn gateway() -> QueueGateway {
        QueueGateway::new(Arc::new(MemoryCommandStore::new()))
    }

    #[tokio::test]
    async fn list_filters_by_status_and_caps_reads() {
        let gateway = gateway();
        let board = BoardId::new("b1");
        let first = gateway.enqueue(&board, "u", "one").await.unwrap();
        gateway.enqueue(&board, "u", "two").await.unwrap();
        gateway.enqueue(&board, "u", "three").await.unwrap();
        assert!(gateway.claim(&board, &first).await.unwrap());

        let all = list(&gateway, &board, Vec::new(), 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].input, "three");

        let processing = list(&gateway, &board, vec![CommandStatus::Processing], 10)
            .await
            .unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, first);

        let capped = list(&gateway, &board, Vec::new(), 2).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn show_reports_missing_commands() {
        let gateway = gateway();
        let board = BoardId::new("b1");
        let id = gateway.enqueue(&board, "u", "add a note").await.unwrap();

        let found = show(&gateway, &board, id.as_str()).await.unwrap();
        assert_eq!(found.input, "add a note");

        let err = show(&gateway, &board, "nope").await.unwrap_err();
        assert!(matches!(err, BoardqError::CommandNotFound { .. }));
        assert_eq!(err.to_string(), "command nope not found on board b1");
    }

    #[tokio::test]
    async fn memory_backend_opens_from_config() {
        let mut config = BoardqConfig::default();
        config.storage.backend = boardq_config::model::StorageBackend::Memory;
        let gateway = open_gateway(&config).await.unwrap();
        assert_eq!(gateway.store().name(), "memory");
    }
}
