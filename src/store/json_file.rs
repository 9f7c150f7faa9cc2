use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{SessionStore, SessionStoreError};

const LOG_TARGET: &str = "store::json_file";

/// File-backed store for sessions that should outlive the process, e.g. the
/// demo binary picking up a table after a restart.
///
/// The whole map is rewritten on every change through a temp file + rename,
/// so a crash mid-write never leaves a torn file behind.
pub struct JsonFileSessionStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileSessionStore {
    /// Opens the store at `path`, creating it lazily on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(
            target: LOG_TARGET,
            path = %path.display(),
            entries = values.len(),
            "opened session file"
        );
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    async fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), SessionStoreError> {
        let mut values = self.values.lock().await;
        values.insert(key.to_owned(), value);
        self.flush(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut values = self.values.lock().await;
        if values.remove(key).is_some() {
            self.flush(&values).await?;
        }
        Ok(())
    }
}
