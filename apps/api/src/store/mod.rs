//! Document Store: whole-record, per-user persistence.
//!
//! Callers talk to `KeyValueStore`; the flat-file backend can be replaced by
//! a transactional one without touching pipeline code.
//!
//! There is no writer arbitration. Two concurrent `update` calls on the same
//! key may lose one of the updates; callers serialise their own writes.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::models::{BaseResume, RoleEntry, TailoredResume, UserRecord};

pub mod file;
#[cfg(test)]
pub mod memory;

pub use file::FileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record stored for key '{key}'")]
    NotFound { key: String },

    #[error("record '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("invalid store key '{0}': only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidKey(String),

    #[error("I/O error on record '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single-field change applied by `KeyValueStore::update`.
#[derive(Debug, Clone)]
pub enum RecordUpdate {
    WorkHistory(Vec<RoleEntry>),
    /// Result of a normalization pass: history and base resume move together.
    Normalized {
        work_history: Vec<RoleEntry>,
        base_resume: Option<BaseResume>,
    },
    /// Inserts or overwrites the tailored resume under the given key.
    Resume(String, TailoredResume),
}

impl RecordUpdate {
    fn apply(self, record: &mut UserRecord) {
        match self {
            RecordUpdate::WorkHistory(history) => record.work_history = history,
            RecordUpdate::Normalized {
                work_history,
                base_resume,
            } => {
                record.work_history = work_history;
                record.base_resume = base_resume;
            }
            RecordUpdate::Resume(key, resume) => {
                record.resumes.insert(key, resume);
            }
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the whole record. Absent keys are `NotFound`, unparsable ones `Corrupt`.
    async fn read(&self, key: &str) -> Result<UserRecord, StoreError>;

    /// Replaces the whole record. Readers see either the old or the new record.
    async fn write(&self, key: &str, record: &UserRecord) -> Result<(), StoreError>;

    /// Read-modify-write of one field. Creates the record if the key is absent.
    async fn update(&self, key: &str, change: RecordUpdate) -> Result<UserRecord, StoreError> {
        let mut record = match self.read(key).await {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => UserRecord::new(key),
            Err(e) => return Err(e),
        };
        change.apply(&mut record);
        record.updated_at = Utc::now();
        self.write(key, &record).await?;
        Ok(record)
    }
}

/// Keys become file names, so they are restricted to a safe alphabet.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
