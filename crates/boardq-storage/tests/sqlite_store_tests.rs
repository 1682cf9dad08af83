// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite command store.

use std::time::Duration;

use boardq_core::{
    BoardId, CommandId, CommandPatch, CommandStatus, CommandStore, NewCommand, RangeQuery,
    ToolCall,
};
use boardq_storage::SqliteCommandStore;
use chrono::{SubsecRound, TimeDelta, Utc};
use tempfile::{TempDir, tempdir};

async fn open_store() -> (SqliteCommandStore, TempDir) {
    let dir = tempdir().unwrap();
    let store = SqliteCommandStore::open_path(
        dir.path().join("commands.db"),
        true,
        Duration::from_millis(20),
    )
    .await
    .unwrap();
    (store, dir)
}

fn new_command(input: &str, offset_ms: i64) -> NewCommand {
    NewCommand {
        user_id: "user-1".to_string(),
        input: input.to_string(),
        created_at: Utc::now().trunc_subsecs(6) + TimeDelta::milliseconds(offset_ms),
    }
}

#[tokio::test]
async fn create_then_get_round_trips_fields() {
    let (store, _dir) = open_store().await;
    let board = BoardId::from("board-1");
    let draft = new_command("Create a red note", 0);
    let created_at = draft.created_at;

    let id = store.create(&board, draft).await.unwrap();
    let command = store.get(&board, &id).await.unwrap().expect("command exists");

    assert_eq!(command.id, id);
    assert_eq!(command.board_id, board);
    assert_eq!(command.user_id, "user-1");
    assert_eq!(command.input, "Create a red note");
    assert_eq!(command.status, CommandStatus::Pending);
    assert_eq!(command.created_at, created_at);
    assert!(command.started_at.is_none());
    assert!(command.lifecycle_violation().is_none());

    store.close().await.unwrap();
}

#[tokio::test]
async fn terminal_patch_persists_result_json() {
    let (store, _dir) = open_store().await;
    let board = BoardId::from("board-1");
    let id = store.create(&board, new_command("x", 0)).await.unwrap();
    let now = Utc::now().trunc_subsecs(6);

    let claimed = store
        .update_if_status(
            &board,
            &id,
            CommandStatus::Pending,
            CommandPatch::status(CommandStatus::Processing, now),
        )
        .await
        .unwrap();
    assert!(claimed);

    let call = ToolCall::new(
        "createStickyNote",
        serde_json::json!({"text": "hello", "color": "#ff0000"}),
    )
    .with_id("call-1");
    store
        .update(&board, &id, CommandPatch::completed(vec![call.clone()], now))
        .await
        .unwrap();

    let command = store.get(&board, &id).await.unwrap().unwrap();
    assert_eq!(command.status, CommandStatus::Completed);
    assert_eq!(command.started_at, Some(now));
    assert_eq!(command.completed_at, Some(now));
    assert_eq!(command.result, Some(vec![call]));
    assert!(command.error.is_none());
    assert!(command.lifecycle_violation().is_none());

    store.close().await.unwrap();
}

#[tokio::test]
async fn conditional_update_has_one_winner() {
    let (store, _dir) = open_store().await;
    let board = BoardId::from("board-1");
    let id = store.create(&board, new_command("x", 0)).await.unwrap();

    let mut wins = 0;
    for _ in 0..3 {
        if store
            .update_if_status(
                &board,
                &id,
                CommandStatus::Pending,
                CommandPatch::status(CommandStatus::Processing, Utc::now()),
            )
            .await
            .unwrap()
        {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    let missing = store
        .update(&board, &CommandId::from("ghost"), CommandPatch::default())
        .await;
    assert!(missing.is_err());

    store.close().await.unwrap();
}

#[tokio::test]
async fn range_orders_ascending_and_caps_most_recent() {
    let (store, _dir) = open_store().await;
    let board = BoardId::from("board-1");
    let other = BoardId::from("board-2");
    store.create(&board, new_command("c", 30)).await.unwrap();
    store.create(&board, new_command("a", 10)).await.unwrap();
    store.create(&board, new_command("b", 20)).await.unwrap();
    store.create(&other, new_command("elsewhere", 0)).await.unwrap();

    let all = store.range(&board, RangeQuery::default()).await.unwrap();
    let inputs: Vec<&str> = all.iter().map(|c| c.input.as_str()).collect();
    assert_eq!(inputs, ["a", "b", "c"]);

    let last = store
        .range(&board, RangeQuery { limit_to_last: Some(2) })
        .await
        .unwrap();
    let inputs: Vec<&str> = last.iter().map(|c| c.input.as_str()).collect();
    assert_eq!(inputs, ["b", "c"]);

    store.delete(&board, &all[0].id).await.unwrap();
    assert_eq!(store.range(&board, RangeQuery::default()).await.unwrap().len(), 2);

    store.close().await.unwrap();
}

#[tokio::test]
async fn commits_from_another_connection_are_announced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let watcher = SqliteCommandStore::open_path(&path, true, Duration::from_millis(10))
        .await
        .unwrap();
    let writer = SqliteCommandStore::open_path(&path, true, Duration::from_millis(10))
        .await
        .unwrap();
    let mut changes = watcher.changes();

    // Let the watcher record its baseline data_version.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let board = BoardId::from("board-1");
    let id = writer.create(&board, new_command("x", 0)).await.unwrap();

    let change = tokio::time::timeout(Duration::from_secs(2), changes.recv())
        .await
        .expect("foreign commit should be announced")
        .unwrap();
    assert!(change.affects(&board));
    assert!(watcher.get(&board, &id).await.unwrap().is_some());

    writer.close().await.unwrap();
    watcher.close().await.unwrap();
}
