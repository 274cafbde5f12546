//! PositionTracker - pending な task_id の advisory index
//!
//! PositionStore（Redis list など）の上に「失敗しても止めない」意味論を載せます。
//!
//! # 失敗時の振る舞い
//! - enqueue / dequeue_all: ログを出して続行（dequeue_all は 0 を返す）
//! - position_of: `None` を返す
//!
//! dispatch やシグナル処理を position store の障害で止めないためのレイヤーです。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::TaskId;
use crate::ports::PositionStore;

pub struct PositionTracker {
    store: Arc<dyn PositionStore>,
    key: String,
}

impl PositionTracker {
    pub fn new(store: Arc<dyn PositionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append `task_id` to the tail. Repeated enqueues produce duplicates.
    pub async fn enqueue(&self, task_id: &TaskId) {
        match self.store.append(&self.key, task_id).await {
            Ok(len) => info!(%task_id, queue = %self.key, queue_len = len, "added task to position queue"),
            Err(e) => warn!(%task_id, queue = %self.key, error = %e, "could not add task to position queue"),
        }
    }

    /// Remove every occurrence of `task_id`. Returns how many were removed;
    /// absent ids and store failures both count as 0.
    pub async fn dequeue_all(&self, task_id: &TaskId) -> usize {
        match self.store.remove_all(&self.key, task_id).await {
            Ok(0) => {
                debug!(%task_id, queue = %self.key, "task not in position queue, nothing to remove");
                0
            }
            Ok(removed) => {
                info!(%task_id, queue = %self.key, removed, "removed task from position queue");
                removed
            }
            Err(e) => {
                warn!(%task_id, queue = %self.key, error = %e, "could not remove task from position queue");
                0
            }
        }
    }

    /// 1-based position of the first occurrence.
    pub async fn position_of(&self, task_id: &TaskId) -> Option<usize> {
        match self.store.index_of(&self.key, task_id).await {
            Ok(Some(index)) => {
                let position = index + 1;
                debug!(%task_id, position, "task found in position queue");
                Some(position)
            }
            Ok(None) => {
                debug!(%task_id, "task not found in position queue");
                None
            }
            Err(e) => {
                warn!(%task_id, error = %e, "position lookup failed");
                None
            }
        }
    }

    /// Current queue length, `None` when the store is unreachable.
    pub async fn len(&self) -> Option<usize> {
        match self.store.len(&self.key).await {
            Ok(len) => Some(len),
            Err(e) => {
                warn!(queue = %self.key, error = %e, "queue length lookup failed");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::UnreachableStore;
    use super::*;
    use crate::impls::InMemoryPositionStore;

    fn tracker() -> PositionTracker {
        PositionTracker::new(Arc::new(InMemoryPositionStore::new()), "test_queue")
    }

    fn id(s: &str) -> TaskId {
        TaskId::new(s)
    }

    #[tokio::test]
    async fn positions_follow_insertion_order() {
        let tracker = tracker();
        tracker.enqueue(&id("t1")).await;
        tracker.enqueue(&id("t2")).await;

        assert_eq!(tracker.position_of(&id("t1")).await, Some(1));
        assert_eq!(tracker.position_of(&id("t2")).await, Some(2));

        assert_eq!(tracker.dequeue_all(&id("t1")).await, 1);
        assert_eq!(tracker.position_of(&id("t1")).await, None);
        assert_eq!(tracker.position_of(&id("t2")).await, Some(1));
    }

    #[tokio::test]
    async fn earlier_enqueue_has_smaller_position() {
        let tracker = tracker();
        for name in ["a", "b", "c", "d"] {
            tracker.enqueue(&id(name)).await;
        }
        tracker.dequeue_all(&id("b")).await;

        let a = tracker.position_of(&id("a")).await.unwrap();
        let c = tracker.position_of(&id("c")).await.unwrap();
        let d = tracker.position_of(&id("d")).await.unwrap();
        assert!(a < c && c < d);
    }

    #[tokio::test]
    async fn dequeue_twice_is_same_as_once() {
        let tracker = tracker();
        tracker.enqueue(&id("t1")).await;
        tracker.enqueue(&id("t2")).await;

        assert_eq!(tracker.dequeue_all(&id("t1")).await, 1);
        assert_eq!(tracker.dequeue_all(&id("t1")).await, 0);
        assert_eq!(tracker.len().await, Some(1));
    }

    #[tokio::test]
    async fn dequeue_removes_duplicates() {
        let tracker = tracker();
        tracker.enqueue(&id("t1")).await;
        tracker.enqueue(&id("t2")).await;
        tracker.enqueue(&id("t1")).await;

        assert_eq!(tracker.position_of(&id("t1")).await, Some(1));
        assert_eq!(tracker.dequeue_all(&id("t1")).await, 2);
        assert_eq!(tracker.position_of(&id("t2")).await, Some(1));
    }

    #[tokio::test]
    async fn never_enqueued_id_is_harmless() {
        let tracker = tracker();
        tracker.enqueue(&id("t1")).await;

        assert_eq!(tracker.position_of(&id("ghost")).await, None);
        assert_eq!(tracker.dequeue_all(&id("ghost")).await, 0);
        assert_eq!(tracker.len().await, Some(1));
        assert_eq!(tracker.position_of(&id("t1")).await, Some(1));
    }

    #[tokio::test]
    async fn unreachable_store_degrades_quietly() {
        let tracker = PositionTracker::new(Arc::new(UnreachableStore), "test_queue");

        tracker.enqueue(&id("t1")).await;
        assert_eq!(tracker.dequeue_all(&id("t1")).await, 0);
        assert_eq!(tracker.position_of(&id("t1")).await, None);
        assert_eq!(tracker.len().await, None);
    }
}
