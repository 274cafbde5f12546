//! SignalBus - ライフサイクルイベントの購読
//!
//! # 設計
//! - 初期化時に `connect()` で handler を登録（mutable）
//! - 実行時は `emit()` のみ（immutable、ロック不要）
//! - handler は失敗を返さない。ログを出して続行するのは handler 側の責務

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{LifecycleEvent, SignalKind};

/// A subscriber to lifecycle events.
///
/// Events arrive at-least-once and in no guaranteed relative order, so every
/// implementation must be idempotent per event.
#[async_trait]
pub trait SignalHandler: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent);
}

#[derive(Default, Clone)]
pub struct SignalBus {
    handlers: HashMap<SignalKind, Vec<Arc<dyn SignalHandler>>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, kind: SignalKind, handler: Arc<dyn SignalHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Deliver `event` to every handler connected to its kind, in connection
    /// order.
    pub async fn emit(&self, event: &LifecycleEvent) {
        let Some(handlers) = self.handlers.get(&event.kind()) else {
            return;
        };
        for handler in handlers {
            handler.on_event(event).await;
        }
    }

    pub fn subscriber_count(&self, kind: SignalKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tokio::sync::Mutex;

    use super::*;

    /// Records every event it sees.
    #[derive(Default)]
    pub struct Recorder {
        pub events: Mutex<Vec<LifecycleEvent>>,
    }

    impl Recorder {
        pub async fn kinds(&self) -> Vec<SignalKind> {
            self.events.lock().await.iter().map(|e| e.kind()).collect()
        }
    }

    #[async_trait]
    impl SignalHandler for Recorder {
        async fn on_event(&self, event: &LifecycleEvent) {
            self.events.lock().await.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;
    use crate::domain::{TaskId, TaskStatus, TaskType};

    fn pre_run(id: &str) -> LifecycleEvent {
        LifecycleEvent::PreRun {
            task_id: TaskId::new(id),
            task_type: TaskType::new("echo"),
        }
    }

    #[tokio::test]
    async fn emit_reaches_only_matching_kind() {
        let pre = Arc::new(Recorder::default());
        let post = Arc::new(Recorder::default());

        let mut bus = SignalBus::new();
        bus.connect(SignalKind::PreRun, pre.clone());
        bus.connect(SignalKind::PostRun, post.clone());

        bus.emit(&pre_run("t1")).await;

        assert_eq!(pre.kinds().await, vec![SignalKind::PreRun]);
        assert!(post.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn every_subscriber_of_a_kind_is_called() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        let mut bus = SignalBus::new();
        bus.connect(SignalKind::PostRun, first.clone());
        bus.connect(SignalKind::PostRun, second.clone());
        assert_eq!(bus.subscriber_count(SignalKind::PostRun), 2);

        let event = LifecycleEvent::PostRun {
            task_id: TaskId::new("t1"),
            state: TaskStatus::Success,
        };
        bus.emit(&event).await;
        bus.emit(&event).await;

        assert_eq!(first.events.lock().await.len(), 2);
        assert_eq!(second.events.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_noop() {
        let bus = SignalBus::new();
        bus.emit(&pre_run("t1")).await;
        assert_eq!(bus.subscriber_count(SignalKind::PreRun), 0);
    }
}
