//! Errors - エラー型と分類
//!
//! - StoreError: position store（advisory なので呼び出し元には伝播させない）
//! - QueueError: 配送キュー
//! - BackendError: result backend
//! - TallyError: 上記をまとめた実行基盤のエラー

use thiserror::Error;

use super::TaskType;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position store unavailable: {0}")]
    Unavailable(String),

    #[error("position store operation failed: {0}")]
    OperationFailed(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::OperationFailed(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to connect to broker '{url}': {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("queue operation failed: {0}")]
    OperationFailed(String),

    #[error("envelope codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::OperationFailed(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("result backend unavailable: {0}")]
    Unavailable(String),

    #[error("result record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redis::RedisError> for BackendError {
    fn from(e: redis::RedisError) -> Self {
        BackendError::Unavailable(e.to_string())
    }
}

/// Errors surfaced by the execution substrate (dispatch, query, workers).
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("broker error: {0}")]
    Broker(#[from] QueueError),

    #[error("result backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("handler not found for task_type={0}")]
    HandlerNotFound(TaskType),

    #[error("payload codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_keep_their_message() {
        let err: TallyError = QueueError::OperationFailed("closed".to_string()).into();
        assert_eq!(err.to_string(), "broker error: queue operation failed: closed");

        let err = TallyError::HandlerNotFound(TaskType::new("missing"));
        assert!(err.to_string().contains("missing"));
    }
}
