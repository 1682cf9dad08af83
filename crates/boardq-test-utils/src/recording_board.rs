// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board wrapper that records every mutation and can be told to fail.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use boardq_core::{BoardMutator, BoardObject, BoardqError, NewBoardObject};
use boardq_executor::MemoryBoard;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// One mutation observed by a [`RecordingBoard`].
#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    Create { object_type: String },
    Update { id: String, fields: Map<String, Value> },
    Delete { ids: Vec<String> },
}

/// A [`MemoryBoard`] that logs mutations in order.
///
/// Reads are not recorded. With [`fail_mutations`](Self::fail_mutations)
/// set, every mutation is refused with a board error and nothing changes.
#[derive(Default)]
pub struct RecordingBoard {
    board: MemoryBoard,
    calls: Mutex<Vec<BoardCall>>,
    failing: AtomicBool,
}

impl RecordingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_mutations(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<BoardCall> {
        self.calls.lock().await.clone()
    }

    pub async fn objects(&self) -> Vec<BoardObject> {
        self.board.get_objects().await.unwrap_or_default()
    }

    async fn record(&self, call: BoardCall) -> Result<(), BoardqError> {
        self.calls.lock().await.push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BoardqError::board("board is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl BoardMutator for RecordingBoard {
    async fn get_objects(&self) -> Result<Vec<BoardObject>, BoardqError> {
        self.board.get_objects().await
    }

    async fn get_object(&self, id: &str) -> Result<Option<BoardObject>, BoardqError> {
        self.board.get_object(id).await
    }

    async fn create_object(&self, object: NewBoardObject) -> Result<String, BoardqError> {
        self.record(BoardCall::Create {
            object_type: object.object_type.clone(),
        })
        .await?;
        self.board.create_object(object).await
    }

    async fn update_object(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BoardqError> {
        self.record(BoardCall::Update {
            id: id.to_string(),
            fields: fields.clone(),
        })
        .await?;
        self.board.update_object(id, fields).await
    }

    async fn delete_objects(&self, ids: &[String]) -> Result<(), BoardqError> {
        self.record(BoardCall::Delete { ids: ids.to_vec() }).await?;
        self.board.delete_objects(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> NewBoardObject {
        NewBoardObject {
            object_type: "text".into(),
            properties: Map::new(),
        }
    }

    #[tokio::test]
    async fn records_and_fails_on_demand() {
        let board = RecordingBoard::new();
        let id = board.create_object(label()).await.unwrap();

        board.fail_mutations(true);
        assert!(board.delete_objects(&[id.clone()]).await.is_err());
        assert_eq!(board.objects().await.len(), 1);

        assert_eq!(
            board.calls().await,
            vec![
                BoardCall::Create {
                    object_type: "text".into()
                },
                BoardCall::Delete { ids: vec![id] },
            ]
        );
    }
}
