use super::{FieldMap, SessionStore};
use crate::error::StoreError;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Redis-backed session store — one hash per session id.
///
/// `put` maps onto `HSET key field value ...`, which merges with whatever the
/// hash already holds; `get_all` is a full `SCAN` plus `HGETALL` per key, so
/// its cost grows with the total key count.
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Open a connection-managed client against `url`
    /// (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.manager.clone();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    async fn put(&self, session_id: &str, fields: FieldMap) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let pairs: Vec<(String, String)> = fields.into_iter().collect();
        let _: () = conn
            .hset_multiple(session_id, &pairs)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<(String, FieldMap)>, StoreError> {
        let mut conn = self.manager.clone();

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .query_async(&mut conn)
                .await
                .map_err(classify)?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let fields: FieldMap = conn.hgetall(&key).await.map_err(classify)?;
            records.push((key, fields));
        }
        Ok(records)
    }
}

fn classify(err: redis::RedisError) -> StoreError {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}
