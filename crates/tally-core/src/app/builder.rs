//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! - handler の登録と起動時検証（expect_tasks）
//! - ports の差し替え（未指定ならインメモリ実装）
//! - LifecycleRouter を SignalBus に接続
//!
//! build() 後の App はロックを持たない不変な構成になります。

use std::sync::Arc;

use tracing::{info, warn};

use super::executor::TaskExecutor;
use super::position::PositionTracker;
use super::router::LifecycleRouter;
use super::signals::{SignalBus, SignalHandler};
use super::status::{StatusService, TaskStatusView};
use super::worker_loop::{WorkerContext, WorkerGroup, WorkerSettings};
use crate::config::TallyConfig;
use crate::domain::{SignalKind, TallyError, TaskId};
use crate::impls::{InMemoryDeliveryQueue, InMemoryPositionStore, InMemoryResultBackend};
use crate::ports::{Clock, DeliveryQueue, IdGenerator, PositionStore, ResultBackend, SystemClock, UlidGenerator};
use crate::typed::{Handler, RegistryError, Task, TypedRegistry};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .register::<EchoTask, _>(EchoHandler::new(delay))?
///     .expect_tasks(&["echo_with_delay"])
///     .with_position_store(Arc::new(RedisPositionStore::connect(url).await?))
///     .build()?;
/// ```
pub struct AppBuilder {
    registry: TypedRegistry,
    expected_tasks: Option<Vec<String>>,
    config: TallyConfig,
    delivery: Option<Arc<dyn DeliveryQueue>>,
    positions: Option<Arc<dyn PositionStore>>,
    backend: Option<Arc<dyn ResultBackend>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    extra_handlers: Vec<(SignalKind, Arc<dyn SignalHandler>)>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypedRegistry::new(),
            expected_tasks: None,
            config: TallyConfig::default(),
            delivery: None,
            positions: None,
            backend: None,
            clock: None,
            ids: None,
            extra_handlers: Vec::new(),
        }
    }

    /// Handler を登録
    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    /// 期待される task_type のリストを設定。build() 時に検証されます。
    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_config(mut self, config: TallyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_delivery_queue(mut self, delivery: Arc<dyn DeliveryQueue>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn with_position_store(mut self, positions: Arc<dyn PositionStore>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn with_result_backend(mut self, backend: Arc<dyn ResultBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Subscribe an extra handler next to the built-in position router.
    pub fn with_signal_handler(mut self, kind: SignalKind, handler: Arc<dyn SignalHandler>) -> Self {
        self.extra_handlers.push((kind, handler));
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// expect_tasks() で設定された task_type が全て登録されていなければ
    /// BuildError::MissingTaskTypes を返します。
    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let registered_types = self.registry.registered_types();
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|x| !registered_types.contains(x))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));
        let delivery = self
            .delivery
            .unwrap_or_else(|| Arc::new(InMemoryDeliveryQueue::new()));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(InMemoryResultBackend::new()));
        let positions = self
            .positions
            .unwrap_or_else(|| Arc::new(InMemoryPositionStore::new()));

        let tracker = Arc::new(PositionTracker::new(positions, config.position_key.clone()));
        let executor = Arc::new(TaskExecutor::new(
            delivery.clone(),
            backend.clone(),
            ids,
            clock.clone(),
            config.queue_name.clone(),
        ));

        let mut signals = SignalBus::new();
        Arc::new(LifecycleRouter::new(tracker.clone())).subscribe(&mut signals);
        for (kind, handler) in self.extra_handlers {
            signals.connect(kind, handler);
        }

        info!(
            queue = %config.queue_name,
            position_key = %config.position_key,
            task_types = ?self.registry.registered_types(),
            "app built"
        );

        let worker_ctx = Arc::new(WorkerContext {
            delivery,
            backend,
            clock,
            registry: Arc::new(self.registry),
            signals: Arc::new(signals),
            settings: WorkerSettings {
                queue_name: config.queue_name.clone(),
                poll_interval: config.poll_interval,
                max_attempts: config.max_attempts,
                retry: config.retry.clone(),
            },
        });

        Ok(App {
            status: StatusService::new(executor.clone(), tracker.clone()),
            executor,
            tracker,
            worker_ctx,
            config,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App はアプリケーションのランタイム
///
/// submit / status は HTTP 層から、spawn_workers はワーカープロセスから使われます。
pub struct App {
    executor: Arc<TaskExecutor>,
    tracker: Arc<PositionTracker>,
    status: StatusService,
    worker_ctx: Arc<WorkerContext>,
    config: TallyConfig,
}

impl App {
    /// Dispatch `task` and record it at the tail of the position queue.
    ///
    /// The id is reserved and enqueued before the task is published, so a
    /// worker can never dequeue it before it is tracked. If publishing fails
    /// the entry is removed again.
    pub async fn submit<T: Task>(&self, task: &T) -> Result<TaskId, TallyError> {
        let task_id = self.executor.next_task_id();
        let envelope = self.executor.envelope_for(task_id.clone(), task)?;

        self.tracker.enqueue(&task_id).await;
        if let Err(e) = self.executor.dispatch_as(envelope).await {
            warn!(%task_id, error = %e, "dispatch failed, removing from position queue");
            self.tracker.dequeue_all(&task_id).await;
            return Err(e);
        }
        Ok(task_id)
    }

    pub async fn status(&self, task_id: &TaskId) -> TaskStatusView {
        self.status.get_status(task_id).await
    }

    /// Start `n` workers consuming this app's queue.
    pub fn spawn_workers(&self, n: usize) -> WorkerGroup {
        WorkerGroup::spawn(n, Arc::clone(&self.worker_ctx))
    }

    pub fn executor(&self) -> &Arc<TaskExecutor> {
        &self.executor
    }

    pub fn tracker(&self) -> &Arc<PositionTracker> {
        &self.tracker
    }

    pub fn registry(&self) -> &TypedRegistry {
        &self.worker_ctx.registry
    }

    pub fn config(&self) -> &TallyConfig {
        &self.config
    }
}
