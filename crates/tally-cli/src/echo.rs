//! The task this deployment serves: wait a while, then hand the text back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_core::typed::{Handler, Task, TaskContext, TaskFailure};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoTask {
    pub text: String,
}

impl Task for EchoTask {
    const TYPE: &'static str = "echo_with_delay";
}

pub struct EchoHandler {
    delay: Duration,
}

impl EchoHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Handler<EchoTask> for EchoHandler {
    async fn handle(&self, ctx: TaskContext, task: EchoTask) -> Result<String, TaskFailure> {
        info!(task_id = %ctx.task_id, attempt = ctx.attempt, delay = ?self.delay, "echo task started");
        tokio::time::sleep(self.delay).await;
        info!(task_id = %ctx.task_id, "echo task finished");
        Ok(task.text)
    }
}
