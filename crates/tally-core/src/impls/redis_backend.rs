//! RedisResultBackend - `tally-task-meta-<id>` キーに JSON で保存

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};

use crate::domain::{BackendError, TaskId, TaskMeta};
use crate::ports::ResultBackend;

pub const META_KEY_PREFIX: &str = "tally-task-meta-";

pub fn meta_key(task_id: &TaskId) -> String {
    format!("{META_KEY_PREFIX}{task_id}")
}

pub struct RedisResultBackend {
    connection: MultiplexedConnection,
    ttl: Duration,
}

impl RedisResultBackend {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, BackendError> {
        let client = Client::open(url).map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection, ttl })
    }
}

#[async_trait]
impl ResultBackend for RedisResultBackend {
    async fn store(&self, meta: &TaskMeta) -> Result<(), BackendError> {
        let data = serde_json::to_string(meta)?;
        let mut conn = self.connection.clone();
        // SET EX rejects 0
        let ttl_secs = self.ttl.as_secs().max(1);
        let _: () = conn.set_ex(meta_key(&meta.task_id), data, ttl_secs).await?;
        Ok(())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskMeta>, BackendError> {
        let mut conn = self.connection.clone();
        let data: Option<String> = conn.get(meta_key(task_id)).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
