//! DeliveryQueue port - 配送キュー（Redis または InMemory）
//!
//! broker にあたる部分です。envelope を worker まで運ぶだけで、
//! 状態は ResultBackend 側に置きます。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{QueueError, TaskEnvelope};

/// DeliveryQueue は envelope を配送するためのキュー
///
/// # 設計原則
/// - namespace（queue name）ごとに FIFO
/// - blocking pop（timeout 付き）。何もなければ `Ok(None)`
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    async fn push(&self, ns: &str, envelope: TaskEnvelope) -> Result<(), QueueError>;

    async fn pop(&self, ns: &str, timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError>;
}
