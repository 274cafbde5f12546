//! RedisPositionStore - Redis list による position store
//!
//! - append: `RPUSH key id`
//! - remove_all: `LREM key 0 id`（count=0 で全件削除）
//! - index_of: `LPOS key id`（Redis 6.0.6 以降）
//! - len: `LLEN key`

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};

use crate::domain::{StoreError, TaskId};
use crate::ports::PositionStore;

pub struct RedisPositionStore {
    connection: MultiplexedConnection,
}

impl RedisPositionStore {
    /// Connect once; the connection is shared by every clone of the handle.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl PositionStore for RedisPositionStore {
    async fn append(&self, key: &str, task_id: &TaskId) -> Result<usize, StoreError> {
        let mut conn = self.connection.clone();
        let len: usize = conn.rpush(key, task_id.as_str()).await?;
        Ok(len)
    }

    async fn remove_all(&self, key: &str, task_id: &TaskId) -> Result<usize, StoreError> {
        let mut conn = self.connection.clone();
        let removed: usize = conn.lrem(key, 0, task_id.as_str()).await?;
        Ok(removed)
    }

    async fn index_of(&self, key: &str, task_id: &TaskId) -> Result<Option<usize>, StoreError> {
        let mut conn = self.connection.clone();
        let index: Option<usize> = redis::cmd("LPOS")
            .arg(key)
            .arg(task_id.as_str())
            .query_async(&mut conn)
            .await?;
        Ok(index)
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.connection.clone();
        let len: usize = conn.llen(key).await?;
        Ok(len)
    }
}
