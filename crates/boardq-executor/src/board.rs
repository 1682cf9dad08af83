// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory board used by the CLI processor and by tests.

use async_trait::async_trait;
use boardq_core::{BoardMutator, BoardObject, BoardqError, NewBoardObject};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::trace;

/// A [`BoardMutator`] keeping objects in creation order.
#[derive(Default)]
pub struct MemoryBoard {
    objects: RwLock<Vec<BoardObject>>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A board pre-populated with `objects`.
    pub fn with_objects(objects: Vec<BoardObject>) -> Self {
        Self {
            objects: RwLock::new(objects),
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

fn missing(id: &str) -> BoardqError {
    BoardqError::board(format!("object {id} not found"))
}

#[async_trait]
impl BoardMutator for MemoryBoard {
    async fn get_objects(&self) -> Result<Vec<BoardObject>, BoardqError> {
        Ok(self.objects.read().await.clone())
    }

    async fn get_object(&self, id: &str) -> Result<Option<BoardObject>, BoardqError> {
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn create_object(&self, object: NewBoardObject) -> Result<String, BoardqError> {
        let id = uuid::Uuid::new_v4().to_string();
        trace!(object_id = %id, object_type = %object.object_type, "board object created");
        self.objects.write().await.push(BoardObject {
            id: id.clone(),
            object_type: object.object_type,
            properties: object.properties,
        });
        Ok(id)
    }

    async fn update_object(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BoardqError> {
        let mut objects = self.objects.write().await;
        let object = objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| missing(id))?;
        object.properties.extend(fields);
        Ok(())
    }

    /// Removes every listed object, or none if any id is unknown.
    async fn delete_objects(&self, ids: &[String]) -> Result<(), BoardqError> {
        let mut objects = self.objects.write().await;
        if let Some(unknown) = ids.iter().find(|id| !objects.iter().any(|o| &o.id == *id)) {
            return Err(missing(unknown));
        }
        objects.retain(|o| !ids.contains(&o.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note() -> NewBoardObject {
        NewBoardObject {
            object_type: "sticky_note".to_string(),
            properties: json!({"text": "hi", "x": 0})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn create_update_delete_cycle() {
        let board = MemoryBoard::new();
        let a = board.create_object(note()).await.unwrap();
        let b = board.create_object(note()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(board.len().await, 2);

        let mut fields = Map::new();
        fields.insert("x".to_string(), json!(42));
        board.update_object(&a, fields).await.unwrap();
        let updated = board.get_object(&a).await.unwrap().unwrap();
        assert_eq!(updated.properties["x"], 42);
        assert_eq!(updated.properties["text"], "hi");

        board.delete_objects(&[a.clone()]).await.unwrap();
        assert!(board.get_object(&a).await.unwrap().is_none());
        assert_eq!(board.get_objects().await.unwrap()[0].id, b);
    }

    #[tokio::test]
    async fn unknown_ids_are_board_errors() {
        let board = MemoryBoard::new();
        let a = board.create_object(note()).await.unwrap();

        let err = board.update_object("ghost", Map::new()).await.unwrap_err();
        assert!(matches!(err, BoardqError::Board { .. }));

        let err = board
            .delete_objects(&[a.clone(), "ghost".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "object ghost not found");
        assert!(!board.is_empty().await);
    }

    #[test]
    fn objects_serialize_with_flattened_properties() {
        let object = BoardObject {
            id: "o1".into(),
            object_type: "shape".into(),
            properties: json!({"shape": "circle"}).as_object().cloned().unwrap(),
        };
        let value = serde_json::to_value(&object).unwrap();
        assert_eq!(value, json!({"id": "o1", "type": "shape", "shape": "circle"}));
    }
}
