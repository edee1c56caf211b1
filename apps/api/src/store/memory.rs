use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::UserRecord;
use crate::store::{validate_key, KeyValueStore, StoreError};

/// In-memory backend for tests. Records are kept serialized so reads hand
/// back fresh copies, the same as the file backend.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plants raw content under a key, bypassing serialization.
    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), raw.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<UserRecord, StoreError> {
        validate_key(key)?;
        let raw = self
            .records
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn write(&self, key: &str, record: &UserRecord) -> Result<(), StoreError> {
        validate_key(key)?;
        let raw = serde_json::to_string(record).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.records.lock().unwrap().insert(key.to_string(), raw);
        Ok(())
    }
}
