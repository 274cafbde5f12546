//! Axum HTTP routes for submitting tasks and reading their status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tally_core::App;
use tally_core::app::TaskStatusView;
use tally_core::domain::{TallyError, TaskId};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::echo::EchoTask;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SubmitResponse {
    pub message: String,
    pub task_id: TaskId,
}

/// Dispatch failures are the only errors a client sees.
#[derive(Debug)]
pub struct ApiError(TallyError);

impl From<TallyError> for ApiError {
    fn from(e: TallyError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        let body = serde_json::json!({ "error": self.0.to_string() });
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

pub fn build_router(app: Arc<App>) -> Router {
    let tasks = Router::new()
        .route("/tasks", post(submit_task))
        .route("/tasks/{task_id}", get(task_status));

    Router::new()
        .route("/", get(describe))
        .route("/health", get(health))
        .nest("/api/v1", tasks.clone())
        .merge(tasks)
        .layer(CorsLayer::permissive())
        .with_state(app)
}

async fn describe() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "tally",
        "description": "Task front end that reports each pending task's place in line",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST": "/api/v1/tasks",
            "GET": "/api/v1/tasks/{task_id}",
        },
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn submit_task(
    State(app): State<Arc<App>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    info!(text_len = req.text.len(), "received task");
    let task_id = app.submit(&EchoTask { text: req.text }).await?;
    Ok(Json(SubmitResponse {
        message: "Task dispatched successfully".to_string(),
        task_id,
    }))
}

pub async fn task_status(
    State(app): State<Arc<App>>,
    Path(task_id): Path<String>,
) -> Json<TaskStatusView> {
    Json(app.status(&TaskId::new(task_id)).await)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tally_core::AppBuilder;
    use tally_core::domain::{QueueError, TaskEnvelope, TaskStatus};
    use tally_core::ports::DeliveryQueue;

    use super::*;
    use crate::echo::EchoHandler;

    struct DownBroker;

    #[async_trait]
    impl DeliveryQueue for DownBroker {
        async fn push(&self, _ns: &str, _envelope: TaskEnvelope) -> Result<(), QueueError> {
            Err(QueueError::OperationFailed("connection refused".to_string()))
        }

        async fn pop(&self, _ns: &str, _timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError> {
            Ok(None)
        }
    }

    fn builder() -> AppBuilder {
        AppBuilder::new()
            .register::<EchoTask, _>(EchoHandler::new(Duration::ZERO))
            .unwrap()
    }

    fn app() -> Arc<App> {
        Arc::new(builder().build().unwrap())
    }

    fn submit_body(text: &str) -> Json<SubmitRequest> {
        Json(SubmitRequest {
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn submit_then_status_reports_position() {
        let app = app();
        let Json(first) = submit_task(State(app.clone()), submit_body("a")).await.unwrap();
        let Json(second) = submit_task(State(app.clone()), submit_body("b")).await.unwrap();
        assert_eq!(first.message, "Task dispatched successfully");
        assert!(first.task_id.as_str().starts_with("task-"));

        let Json(view) = task_status(State(app.clone()), Path(second.task_id.to_string())).await;
        assert_eq!(view.status, TaskStatus::Pending);
        assert_eq!(view.queue_position, Some(2));
        assert_eq!(view.result, None);
    }

    #[tokio::test]
    async fn unknown_task_reports_unknown() {
        let Json(view) = task_status(State(app()), Path("nope".to_string())).await;
        assert_eq!(view.status, TaskStatus::Unknown);
        assert_eq!(view.queue_position, None);
    }

    #[tokio::test]
    async fn worker_result_is_visible() {
        let app = app();
        let Json(submitted) = submit_task(State(app.clone()), submit_body("hello")).await.unwrap();
        let workers = app.spawn_workers(1);

        let mut view = task_status(State(app.clone()), Path(submitted.task_id.to_string())).await.0;
        for _ in 0..300 {
            if view.status == TaskStatus::Success {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            view = task_status(State(app.clone()), Path(submitted.task_id.to_string())).await.0;
        }
        workers.shutdown_and_join().await;

        assert_eq!(view.status, TaskStatus::Success);
        assert_eq!(view.result.as_deref(), Some("hello"));
        assert_eq!(view.queue_position, None);
    }

    #[tokio::test]
    async fn dispatch_failure_is_service_unavailable() {
        let app = Arc::new(builder().with_delivery_queue(Arc::new(DownBroker)).build().unwrap());
        let err = submit_task(State(app.clone()), submit_body("hello")).await.unwrap_err();
        assert!(matches!(err.0, TallyError::Broker(_)));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(app.tracker().len().await, Some(0));
    }

    #[test]
    fn routes_build() {
        let _router = build_router(app());
    }
}
