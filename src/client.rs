use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, TablesApi};
use crate::config::ClientConfig;
use crate::domain::{EmptyIdError, PlayerId, TableId};
use crate::store::{SessionSnapshot, SessionStore, SessionStoreError};
use crate::sync::{SessionError, SessionParams, TableSession};

const LOG_TARGET: &str = "client";

/// Errors from the facade flows.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    /// A table or player id was empty: bad caller input or a corrupt
    /// persisted snapshot.
    #[error(transparent)]
    InvalidId(#[from] EmptyIdError),
}

/// Entry point covering the menu flows of the service's browser UI: host a
/// table, join one by id, or resume whatever the session store remembers.
pub struct BlackjackClient {
    config: ClientConfig,
    api: TablesApi,
    store: Arc<dyn SessionStore>,
}

impl BlackjackClient {
    pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let api = TablesApi::new(&config)?;
        Ok(Self { config, api, store })
    }

    /// Creates a table and takes the first seat at it.
    pub async fn host_table(&self, player_name: &str) -> Result<TableSession, ClientError> {
        let table_id = self.api.create_table(player_name).await?;
        self.seat(table_id, player_name).await
    }

    /// Takes a seat at an existing table.
    pub async fn join_table(
        &self,
        table_id: TableId,
        player_name: &str,
    ) -> Result<TableSession, ClientError> {
        self.seat(table_id, player_name).await
    }

    /// Rebuilds the last persisted session, or `Ok(None)` when the store
    /// holds nothing (or only a fragment). The rebuilt session gets an
    /// immediate invalidation so a pull reconciles whatever happened while
    /// this client was away.
    pub async fn resume(&self) -> Result<Option<TableSession>, ClientError> {
        let Some(snapshot) = SessionSnapshot::load(self.store.as_ref()).await? else {
            return Ok(None);
        };
        let table_id = TableId::new(snapshot.table_id)?;
        let player_id = PlayerId::new(snapshot.player_id)?;
        info!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %player_id,
            seq = snapshot.state_seq,
            "resuming table session"
        );
        let session = TableSession::spawn(SessionParams {
            config: self.config.clone(),
            table_id,
            player_id,
            player_name: snapshot.player_name,
            store: Arc::clone(&self.store),
            resume_seq: snapshot.state_seq,
            initial_state: snapshot.state,
        })?;
        session.invalidate();
        Ok(Some(session))
    }

    /// Drops whatever session the store remembers, without telling the
    /// service. The seat stays taken server-side.
    pub async fn forget(&self) -> Result<(), ClientError> {
        SessionSnapshot::clear(self.store.as_ref()).await?;
        Ok(())
    }

    async fn seat(
        &self,
        table_id: TableId,
        player_name: &str,
    ) -> Result<TableSession, ClientError> {
        let player_id = self.api.join_table(&table_id, player_name).await?;

        let snapshot = SessionSnapshot {
            table_id: table_id.as_str().to_owned(),
            player_id: player_id.as_str().to_owned(),
            player_name: player_name.to_owned(),
            state_seq: 0,
            state: None,
        };
        // Persistence only buys resumability; never let it block the seat.
        if let Err(err) = snapshot.save(self.store.as_ref()).await {
            warn!(target: LOG_TARGET, error = %err, "failed to persist new session");
        }

        info!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %player_id,
            player_name,
            "seated at table"
        );

        let session = TableSession::spawn(SessionParams {
            config: self.config.clone(),
            table_id,
            player_id,
            player_name: player_name.to_owned(),
            store: Arc::clone(&self.store),
            resume_seq: 0,
            initial_state: None,
        })?;
        Ok(session)
    }
}
