//! InMemoryPositionStore - Redis list と同じ意味論を持つメモリ実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{StoreError, TaskId};
use crate::ports::PositionStore;

/// One `Vec<TaskId>` per key, each operation under a single lock acquisition.
#[derive(Default)]
pub struct InMemoryPositionStore {
    lists: Mutex<HashMap<String, Vec<TaskId>>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of `key` (for tests and debugging).
    pub async fn snapshot(&self, key: &str) -> Vec<TaskId> {
        let lists = self.lists.lock().await;
        lists.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn append(&self, key: &str, task_id: &TaskId) -> Result<usize, StoreError> {
        let mut lists = self.lists.lock().await;
        let list = lists.entry(key.to_string()).or_default();
        list.push(task_id.clone());
        Ok(list.len())
    }

    async fn remove_all(&self, key: &str, task_id: &TaskId) -> Result<usize, StoreError> {
        let mut lists = self.lists.lock().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|id| id != task_id);
        Ok(before - list.len())
    }

    async fn index_of(&self, key: &str, task_id: &TaskId) -> Result<Option<usize>, StoreError> {
        let lists = self.lists.lock().await;
        Ok(lists
            .get(key)
            .and_then(|list| list.iter().position(|id| id == task_id)))
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        let lists = self.lists.lock().await;
        Ok(lists.get(key).map_or(0, Vec::len))
    }
}
