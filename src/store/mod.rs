mod memory;
mod redis;

pub use memory::InMemoryStore;
pub use redis::RedisStore;

use crate::config::StoreConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Flat string-to-string field map persisted under one session key.
pub type FieldMap = HashMap<String, String>;

/// One chat exchange as persisted in the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub session_id: String,
    pub system_message: String,
    pub prompt: String,
    pub response: String,
    pub temperature: f64,
    pub timestamp: String,
}

impl ChatRecord {
    pub const FIELD_SYSTEM_MESSAGE: &'static str = "system_message";
    pub const FIELD_PROMPT: &'static str = "prompt";
    pub const FIELD_RESPONSE: &'static str = "response";
    pub const FIELD_TEMPERATURE: &'static str = "temperature";
    pub const FIELD_TIMESTAMP: &'static str = "timestamp";

    /// Flatten into the field map the key-value backend stores.
    /// The session id is the key, not a field.
    pub fn to_fields(&self) -> FieldMap {
        FieldMap::from([
            (
                Self::FIELD_SYSTEM_MESSAGE.to_string(),
                self.system_message.clone(),
            ),
            (Self::FIELD_PROMPT.to_string(), self.prompt.clone()),
            (Self::FIELD_RESPONSE.to_string(), self.response.clone()),
            (
                Self::FIELD_TEMPERATURE.to_string(),
                self.temperature.to_string(),
            ),
            (Self::FIELD_TIMESTAMP.to_string(), self.timestamp.clone()),
        ])
    }

    /// Rebuild from a stored field map. `None` when a field is missing or
    /// the temperature does not parse.
    pub fn from_fields(session_id: &str, fields: &FieldMap) -> Option<Self> {
        Some(Self {
            session_id: session_id.to_string(),
            system_message: fields.get(Self::FIELD_SYSTEM_MESSAGE)?.clone(),
            prompt: fields.get(Self::FIELD_PROMPT)?.clone(),
            response: fields.get(Self::FIELD_RESPONSE)?.clone(),
            temperature: fields.get(Self::FIELD_TEMPERATURE)?.parse().ok()?,
            timestamp: fields.get(Self::FIELD_TIMESTAMP)?.clone(),
        })
    }
}

/// Key-value session storage seam.
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> bool;

    /// Write `fields` under `session_id`. Fields already stored under the
    /// key but absent from `fields` are left untouched: hash-merge, never
    /// wholesale replace. Callers relying on a clean slate must use a fresh
    /// session id.
    async fn put(&self, session_id: &str, fields: FieldMap) -> Result<(), StoreError>;

    /// Every stored record. Unpaginated, iteration order backend-dependent;
    /// cost is proportional to the total key count.
    async fn get_all(&self) -> Result<Vec<(String, FieldMap)>, StoreError>;
}

/// Create the session store selected by config.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>, StoreError> {
    match config.backend.as_str() {
        "redis" => Ok(Arc::new(RedisStore::connect(&config.url).await?)),
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        other => Err(StoreError::Backend(format!(
            "unknown store backend '{other}' (expected 'redis' or 'memory')"
        ))),
    }
}
