use super::{FieldMap, SessionStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Hash-map session store for tests and Redis-less dev runs.
///
/// Mirrors the Redis hash contract: `put` merges field-by-field instead of
/// replacing the record wholesale.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, FieldMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn put(&self, session_id: &str, fields: FieldMap) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .entry(session_id.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<(String, FieldMap)>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .map(|(key, fields)| (key.clone(), fields.clone()))
            .collect())
    }
}
