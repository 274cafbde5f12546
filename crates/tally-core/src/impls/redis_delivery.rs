//! RedisDeliveryQueue - Redis list による配送キュー
//!
//! `RPUSH tally:queue:<ns>` / `BLPOP tally:queue:<ns> <timeout>`。
//! BLPOP は接続を塞ぐので、push 用とは別の接続を使います。

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tokio::sync::Mutex;

use crate::domain::{QueueError, TaskEnvelope};
use crate::ports::DeliveryQueue;

pub const QUEUE_KEY_PREFIX: &str = "tally:queue:";

pub fn queue_key(ns: &str) -> String {
    format!("{QUEUE_KEY_PREFIX}{ns}")
}

pub struct RedisDeliveryQueue {
    connection: MultiplexedConnection,
    /// Dedicated to BLPOP; pops from several workers take turns on it.
    pop_connection: Mutex<MultiplexedConnection>,
}

impl RedisDeliveryQueue {
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let connect_err = |e: redis::RedisError| QueueError::ConnectionFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let client = Client::open(url).map_err(connect_err)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect_err)?;
        let pop_connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect_err)?;
        Ok(Self {
            connection,
            pop_connection: Mutex::new(pop_connection),
        })
    }
}

#[async_trait]
impl DeliveryQueue for RedisDeliveryQueue {
    async fn push(&self, ns: &str, envelope: TaskEnvelope) -> Result<(), QueueError> {
        let data = serde_json::to_string(&envelope)?;
        let mut conn = self.connection.clone();
        let _: usize = conn.rpush(queue_key(ns), data).await?;
        Ok(())
    }

    async fn pop(&self, ns: &str, timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError> {
        let mut conn = self.pop_connection.lock().await;
        // BLPOP treats 0 as "block forever"
        let secs = timeout.as_secs_f64().max(0.01);
        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(queue_key(ns))
            .arg(secs)
            .query_async(&mut *conn)
            .await?;
        match reply {
            Some((_, data)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskType};

    #[test]
    fn queue_key_is_namespaced() {
        assert_eq!(queue_key("tally"), "tally:queue:tally");
    }

    #[tokio::test]
    async fn push_then_blocking_pop_is_fifo() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            eprintln!("REDIS_URL not set, skipping");
            return;
        };
        let queue = RedisDeliveryQueue::connect(&url).await.unwrap();
        let ns = format!("test-{}", ulid::Ulid::new());
        let envelope = |id: &str| {
            TaskEnvelope::new(TaskId::new(id), TaskType::new("echo"), serde_json::json!({ "text": id }))
        };

        queue.push(&ns, envelope("first")).await.unwrap();
        queue.push(&ns, envelope("second")).await.unwrap();

        let timeout = Duration::from_millis(200);
        assert_eq!(queue.pop(&ns, timeout).await.unwrap(), Some(envelope("first")));
        assert_eq!(queue.pop(&ns, timeout).await.unwrap(), Some(envelope("second")));
        // BLPOP gives up after the timeout on an empty list
        assert_eq!(queue.pop(&ns, timeout).await.unwrap(), None);
    }
}
