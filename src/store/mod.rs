//! Client-side persistence for resuming a table session.
//!
//! The service's browser UI parks its identity in per-tab session storage;
//! this module is that idea behind an injected trait object. Values are
//! JSON text under string keys, one value per key, so every implementation
//! stays trivially inspectable.

pub mod in_memory;
pub mod json_file;

pub use in_memory::InMemorySessionStore;
pub use json_file::JsonFileSessionStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::TableState;

/// Storage keys. One value per key, named exactly like the browser UI's
/// session-storage fields so the two vocabularies stay interchangeable.
pub mod keys {
    pub const TABLE_ID: &str = "tableId";
    pub const PLAYER_ID: &str = "playerId";
    pub const PLAYER_NAME: &str = "playerName";
    pub const STATE_SEQ: &str = "stateSeq";
    pub const TABLE_STATE: &str = "tableState";
}

/// Errors from the persistence adapter.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Backing storage failed to read or write.
    #[error("session storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value does not decode, or a fresh value failed to encode.
    #[error("session value encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Key/value persistence scoped to one user session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;
    async fn put(&self, key: &str, value: String) -> Result<(), SessionStoreError>;
    async fn remove(&self, key: &str) -> Result<(), SessionStoreError>;
}

/// Reads and decodes one stored value.
pub async fn read_value<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> Result<Option<T>, SessionStoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes and stores one value.
pub async fn write_value<T: Serialize + ?Sized>(
    store: &dyn SessionStore,
    key: &str,
    value: &T,
) -> Result<(), SessionStoreError> {
    store.put(key, serde_json::to_string(value)?).await
}

/// Everything needed to resume a session. Ids stay plain strings here; they
/// are validated when the session is actually rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub table_id: String,
    pub player_id: String,
    pub player_name: String,
    pub state_seq: u64,
    pub state: Option<TableState>,
}

impl SessionSnapshot {
    /// Loads a snapshot, or `None` unless all three identity fields are
    /// present. A missing seq or table state falls back to defaults: that is
    /// a session that died before its first refresh, still resumable.
    pub async fn load(store: &dyn SessionStore) -> Result<Option<Self>, SessionStoreError> {
        let table_id: Option<String> = read_value(store, keys::TABLE_ID).await?;
        let player_id: Option<String> = read_value(store, keys::PLAYER_ID).await?;
        let player_name: Option<String> = read_value(store, keys::PLAYER_NAME).await?;
        let (Some(table_id), Some(player_id), Some(player_name)) =
            (table_id, player_id, player_name)
        else {
            return Ok(None);
        };
        let state_seq = read_value(store, keys::STATE_SEQ).await?.unwrap_or(0);
        let state = read_value(store, keys::TABLE_STATE).await?;
        Ok(Some(Self {
            table_id,
            player_id,
            player_name,
            state_seq,
            state,
        }))
    }

    /// Writes the snapshot out. The synchronizer keeps the seq and table
    /// state keys current afterwards, one write per applied refresh.
    pub async fn save(&self, store: &dyn SessionStore) -> Result<(), SessionStoreError> {
        write_value(store, keys::TABLE_ID, &self.table_id).await?;
        write_value(store, keys::PLAYER_ID, &self.player_id).await?;
        write_value(store, keys::PLAYER_NAME, &self.player_name).await?;
        write_value(store, keys::STATE_SEQ, &self.state_seq).await?;
        if let Some(state) = &self.state {
            write_value(store, keys::TABLE_STATE, state).await?;
        }
        Ok(())
    }

    /// Removes every session key.
    pub async fn clear(store: &dyn SessionStore) -> Result<(), SessionStoreError> {
        store.remove(keys::TABLE_ID).await?;
        store.remove(keys::PLAYER_ID).await?;
        store.remove(keys::PLAYER_NAME).await?;
        store.remove(keys::STATE_SEQ).await?;
        store.remove(keys::TABLE_STATE).await?;
        Ok(())
    }
}
