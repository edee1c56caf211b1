use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::models::UserRecord;
use crate::store::{validate_key, KeyValueStore, StoreError};

/// Flat-file backend: one pretty-printed JSON document per key.
///
/// Writes land in a temp file in the same directory and are renamed over
/// the target, so a crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) the store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                key: root.display().to_string(),
                source,
            })?;
        info!("Document store ready at {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn read(&self, key: &str) -> Result<UserRecord, StoreError> {
        validate_key(key)?;
        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn write(&self, key: &str, record: &UserRecord) -> Result<(), StoreError> {
        validate_key(key)?;
        let payload = serde_json::to_vec_pretty(record).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: format!("failed to serialize: {e}"),
        })?;

        let root = self.root.clone();
        let target = self.path_for(key);
        tokio::task::spawn_blocking(move || write_atomic(&root, &target, &payload))
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
            .and_then(|r| r)
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })?;

        debug!("Wrote record '{key}'");
        Ok(())
    }
}

fn write_atomic(dir: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(payload)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
