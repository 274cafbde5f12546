//! WorkerLoop - タスク実行ループ
//!
//! # フロー
//! 1. DeliveryQueue::pop() で envelope 取得
//! 2. pre-run を emit、STARTED を記録
//! 3. Handler 実行（panic は FAILURE として捕捉）
//! 4. SUCCESS / RETRY / FAILURE を記録、success / failure を emit
//! 5. post-run(state) を emit
//!
//! retry は eta 付きの envelope として即座に配送キューへ戻します。
//! eta 前に取り出した envelope は最大 poll_interval だけ保持し、
//! まだ早ければキューへ戻します。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::retry::RetryPolicy;
use super::signals::SignalBus;
use crate::domain::{LifecycleEvent, QueueError, TallyError, TaskEnvelope, TaskMeta, TaskStatus};
use crate::ports::{Clock, DeliveryQueue, ResultBackend};
use crate::typed::{TaskContext, TaskFailure, TypedRegistry};

/// Knobs a worker needs from the configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub queue_name: String,
    /// How long one pop waits before checking for shutdown again.
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub retry: RetryPolicy,
}

/// Everything shared by the workers of one group.
pub struct WorkerContext {
    pub delivery: Arc<dyn DeliveryQueue>,
    pub backend: Arc<dyn ResultBackend>,
    pub clock: Arc<dyn Clock>,
    pub registry: Arc<TypedRegistry>,
    pub signals: Arc<SignalBus>,
    pub settings: WorkerSettings,
}

impl WorkerContext {
    async fn record(&self, meta: TaskMeta) {
        if let Err(e) = self.backend.store(&meta).await {
            error!(task_id = %meta.task_id, status = %meta.status, error = %e, "could not record task state");
        }
    }
}

/// Worker group handle.
/// - `shutdown_tx` を drop するとワーカー全体が止まる
/// - `join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, ctx: Arc<WorkerContext>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let ctx = Arc::clone(&ctx);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, ctx, rx).await;
            }));
        }
        info!(workers = n, "worker group started");

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// In-flight handlers are not cancelled; workers stop taking new
    /// deliveries after the current one.
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
        info!("worker group stopped");
    }
}

fn should_stop(rx: &watch::Receiver<bool>) -> bool {
    // Err means the group handle is gone
    rx.has_changed().is_err() || *rx.borrow()
}

async fn worker_loop(worker_id: usize, ctx: Arc<WorkerContext>, shutdown_rx: watch::Receiver<bool>) {
    let settings = &ctx.settings;
    while !should_stop(&shutdown_rx) {
        // pop は select で中断しない（取り出した envelope を落とさないため）
        let popped = ctx
            .delivery
            .pop(&settings.queue_name, settings.poll_interval)
            .await;

        match popped {
            Ok(Some(envelope)) => {
                if let Some(envelope) = hold_until_due(worker_id, &ctx, envelope).await {
                    run_one(worker_id, &ctx, envelope).await;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(worker_id, error = %e, "pop failed, backing off");
                tokio::time::sleep(settings.poll_interval).await;
            }
        }
    }
    debug!(worker_id, "worker stopped");
}

/// Wait for a retry envelope's eta, at most one poll interval. An envelope
/// still not due after that goes back to the broker and `None` is returned.
async fn hold_until_due(
    worker_id: usize,
    ctx: &WorkerContext,
    envelope: TaskEnvelope,
) -> Option<TaskEnvelope> {
    let wait = envelope.wait_until_due(ctx.clock.now())?;
    tokio::time::sleep(wait.min(ctx.settings.poll_interval)).await;
    if envelope.wait_until_due(ctx.clock.now()).is_none() {
        return Some(envelope);
    }

    debug!(worker_id, task_id = %envelope.task_id(), eta = ?envelope.eta(), "retry not due yet, requeueing");
    if let Err(e) = republish(ctx, &envelope).await {
        error!(worker_id, task_id = %envelope.task_id(), error = %e, "could not requeue deferred retry");
        fail(ctx, &envelope, format!("retry could not be published: {e}")).await;
        ctx.signals
            .emit(&LifecycleEvent::PostRun {
                task_id: envelope.task_id().clone(),
                state: TaskStatus::Failure,
            })
            .await;
    }
    None
}

/// Execute one delivery and report it.
async fn run_one(worker_id: usize, ctx: &Arc<WorkerContext>, envelope: TaskEnvelope) {
    let task_id = envelope.task_id().clone();
    let task_type = envelope.task_type().clone();
    let attempt = envelope.attempt();
    info!(worker_id, %task_id, %task_type, attempt, "processing task");

    ctx.signals
        .emit(&LifecycleEvent::PreRun {
            task_id: task_id.clone(),
            task_type: task_type.clone(),
        })
        .await;
    ctx.record(TaskMeta::started(task_id.clone(), attempt, ctx.clock.now()))
        .await;

    let outcome = match ctx.registry.get(task_type.as_str()) {
        None => Err(TaskFailure::fatal(
            TallyError::HandlerNotFound(task_type.clone()).to_string(),
        )),
        Some(handler) => {
            let task_ctx = TaskContext {
                task_id: task_id.clone(),
                attempt,
            };
            let payload = envelope.payload().clone();
            // separate task so a panicking handler only fails this delivery
            match tokio::spawn(async move { handler.handle_dyn(task_ctx, payload).await }).await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(TaskFailure::fatal(format!("handler panicked: {join_err}"))),
            }
        }
    };

    let state = match outcome {
        Ok(result) => {
            info!(worker_id, %task_id, "task finished");
            ctx.record(TaskMeta::success(task_id.clone(), attempt, result.clone(), ctx.clock.now()))
                .await;
            ctx.signals
                .emit(&LifecycleEvent::Success {
                    task_id: task_id.clone(),
                    result,
                })
                .await;
            TaskStatus::Success
        }
        Err(TaskFailure::Retry(reason)) if attempt < ctx.settings.max_attempts => {
            let delay = ctx.settings.retry.next_delay(attempt);
            info!(worker_id, %task_id, attempt, ?delay, %reason, "scheduling retry");
            let now = ctx.clock.now();
            let eta = chrono::Duration::from_std(delay)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(now);
            // RETRY is recorded first so it can never land on top of the next attempt's state
            ctx.record(TaskMeta::retry(task_id.clone(), attempt, reason, now))
                .await;
            match republish(ctx, &envelope.next_attempt(eta)).await {
                Ok(()) => TaskStatus::Retry,
                Err(e) => {
                    error!(worker_id, %task_id, error = %e, "could not publish retry");
                    fail(ctx, &envelope, format!("retry could not be published: {e}")).await;
                    TaskStatus::Failure
                }
            }
        }
        Err(failure) => {
            fail(ctx, &envelope, failure.to_string()).await;
            TaskStatus::Failure
        }
    };

    ctx.signals
        .emit(&LifecycleEvent::PostRun { task_id, state })
        .await;
}

async fn fail(ctx: &WorkerContext, envelope: &TaskEnvelope, error: String) {
    let task_id = envelope.task_id().clone();
    ctx.record(TaskMeta::failure(
        task_id.clone(),
        envelope.attempt(),
        error.clone(),
        ctx.clock.now(),
    ))
    .await;
    ctx.signals
        .emit(&LifecycleEvent::Failure { task_id, error })
        .await;
}

async fn republish(ctx: &WorkerContext, envelope: &TaskEnvelope) -> Result<(), QueueError> {
    ctx.delivery
        .push(&ctx.settings.queue_name, envelope.clone())
        .await
}
