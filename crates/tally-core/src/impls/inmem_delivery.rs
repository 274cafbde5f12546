//! InMemoryDeliveryQueue - 単一プロセス用の配送キュー
//!
//! # 学習ポイント
//! - Mutex + Condvar による blocking pop
//! - Async での blocking 処理の扱い（spawn_blocking）
//! - namespace による複数キューの管理

use crate::domain::{QueueError, TaskEnvelope};
use crate::ports::DeliveryQueue;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// InMemoryDeliveryQueue は単一プロセス用の配送キュー
///
/// # 実装詳細
/// - HashMap<String, VecDeque<TaskEnvelope>> で namespace ごとにキューを管理
/// - Mutex で排他制御
/// - Condvar で push 時の通知
pub struct InMemoryDeliveryQueue {
    queues: Arc<Mutex<HashMap<String, VecDeque<TaskEnvelope>>>>,
    condvar: Arc<Condvar>,
}

impl InMemoryDeliveryQueue {
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            condvar: Arc::new(Condvar::new()),
        }
    }
}

impl Default for InMemoryDeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> QueueError {
    QueueError::OperationFailed("delivery queue lock poisoned".to_string())
}

#[async_trait::async_trait]
impl DeliveryQueue for InMemoryDeliveryQueue {
    async fn push(&self, ns: &str, envelope: TaskEnvelope) -> Result<(), QueueError> {
        let queues = self.queues.clone();
        let condvar = self.condvar.clone();
        let ns = ns.to_string();

        tokio::task::spawn_blocking(move || {
            let mut queues = queues.lock().map_err(poisoned)?;
            queues.entry(ns).or_default().push_back(envelope);

            // waiters may be parked on other namespaces
            condvar.notify_all();
            Ok(())
        })
        .await
        .map_err(|e| QueueError::OperationFailed(format!("Push failed: {}", e)))?
    }

    async fn pop(&self, ns: &str, timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError> {
        let queues = self.queues.clone();
        let condvar = self.condvar.clone();
        let ns = ns.to_string();
        tokio::task::spawn_blocking(move || {
            let start = std::time::Instant::now();
            let mut guard = queues.lock().map_err(poisoned)?;
            loop {
                if let Some(queue) = guard.get_mut(&ns)
                    && let Some(envelope) = queue.pop_front()
                {
                    return Ok(Some(envelope));
                }
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return Ok(None);
                }
                let remaining = timeout.saturating_sub(elapsed);
                let (new_guard, _) = condvar.wait_timeout(guard, remaining).map_err(poisoned)?;
                guard = new_guard;
            }
        })
        .await
        .map_err(|e| QueueError::OperationFailed(format!("Pop failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskType};
    use std::time::Duration;
    use tokio::time::Instant;

    fn envelope(id: &str) -> TaskEnvelope {
        TaskEnvelope::new(TaskId::new(id), TaskType::new("echo"), serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_push_pop_fifo() {
        let queue = InMemoryDeliveryQueue::new();
        queue.push("default", envelope("a")).await.unwrap();
        queue.push("default", envelope("b")).await.unwrap();

        let first = queue.pop("default", Duration::from_secs(1)).await.unwrap();
        let second = queue.pop("default", Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.unwrap().task_id().as_str(), "a");
        assert_eq!(second.unwrap().task_id().as_str(), "b");
    }

    #[tokio::test]
    async fn test_pop_timeout() {
        let queue = InMemoryDeliveryQueue::new();
        let start = Instant::now();
        let popped = queue
            .pop("default", Duration::from_millis(200))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn test_multiple_namespaces() {
        let queue = InMemoryDeliveryQueue::new();
        queue.push("ns1", envelope("one")).await.unwrap();
        queue.push("ns2", envelope("two")).await.unwrap();

        let popped2 = queue.pop("ns2", Duration::from_secs(1)).await.unwrap();
        let popped1 = queue.pop("ns1", Duration::from_secs(1)).await.unwrap();

        assert_eq!(popped1.unwrap().task_id().as_str(), "one");
        assert_eq!(popped2.unwrap().task_id().as_str(), "two");
    }

    #[tokio::test]
    async fn test_push_wakes_pop() {
        let queue = Arc::new(InMemoryDeliveryQueue::new());

        let pop_future = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop("default", Duration::from_secs(5)).await.unwrap() }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        queue.push("default", envelope("late")).await.unwrap();

        let popped = pop_future.await.unwrap();
        assert_eq!(popped.unwrap().task_id().as_str(), "late");
    }
}
