//! Handler trait - Task を実行する Handler の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<T>)
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T, H> → DynHandler)

use super::task::Task;
use crate::domain::TaskId;
use async_trait::async_trait;
use std::marker::PhantomData;

/// Worker-side identity of the running task.
///
/// Handler は自分自身の task_id をここから参照できます（bound task 相当）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub task_id: TaskId,
    /// 1-indexed.
    pub attempt: u32,
}

/// How a handler run went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    /// Worth another delivery (subject to the retry policy).
    #[error("{0}")]
    Retry(String),

    #[error("{0}")]
    Fatal(String),
}

impl TaskFailure {
    pub fn retry(message: impl Into<String>) -> Self {
        TaskFailure::Retry(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        TaskFailure::Fatal(message.into())
    }
}

/// Handler は Task を実行して結果テキストを返す
///
/// # 使用例
/// ```ignore
/// struct EchoHandler;
///
/// #[async_trait]
/// impl Handler<EchoTask> for EchoHandler {
///     async fn handle(&self, ctx: TaskContext, task: EchoTask) -> Result<String, TaskFailure> {
///         tracing::info!(task_id = %ctx.task_id, "echo");
///         Ok(task.text)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, ctx: TaskContext, task: T) -> Result<String, TaskFailure>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// TypedHandler<T> を DynHandler に変換することで、
/// HashMap<String, Arc<dyn DynHandler>> に格納可能にします。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        ctx: TaskContext,
        payload: serde_json::Value,
    ) -> Result<String, TaskFailure>;

    fn task_type(&self) -> &str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(
        &self,
        ctx: TaskContext,
        payload: serde_json::Value,
    ) -> Result<String, TaskFailure> {
        // a payload that does not decode will never decode, so no retry
        let task: T = serde_json::from_value(payload)
            .map_err(|e| TaskFailure::fatal(format!("json decode: {e}")))?;
        self.handler.handle(ctx, task).await
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}
