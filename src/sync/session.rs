use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::api::dto::TurnAction;
use crate::api::{ApiError, TablesApi};
use crate::config::ClientConfig;
use crate::domain::{PlayerId, TableId, TableState};
use crate::store::{SessionSnapshot, SessionStore};

use super::cursor::{CursorGate, SyncCursor};
use super::listener::StateUpdateListener;
use super::refresher::StateRefresher;

const LOG_TARGET: &str = "sync::session";

/// Errors from building a session or acting on the table through it.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A REST call failed; the service's own message is preserved.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The per-table push endpoint could not be built from the configured
    /// WebSocket base URL.
    #[error("invalid push endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Parameters for [`TableSession::spawn`].
pub struct SessionParams {
    pub config: ClientConfig,
    pub table_id: TableId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub store: Arc<dyn SessionStore>,
    /// Cursor value to start from: 0 for a fresh seat, the persisted seq
    /// when resuming.
    pub resume_seq: u64,
    /// Locally cached state to show until the first pull lands.
    pub initial_state: Option<TableState>,
}

/// A live mirror of one table.
///
/// Owns the push listener and the refresh worker for exactly one table id;
/// the subscription is acquired here and released at teardown, never
/// re-acquired in between. State flows out through a watch channel. Actions
/// (`toggle_ready`, `hit`, `stand`) never touch the local state; the result
/// comes back through the next push-and-pull cycle.
pub struct TableSession {
    table_id: TableId,
    player_id: PlayerId,
    player_name: String,
    api: TablesApi,
    store: Arc<dyn SessionStore>,
    cursor: SyncCursor,
    state_rx: watch::Receiver<TableState>,
    cancel: CancellationToken,
    listener_handle: Option<JoinHandle<()>>,
    refresher_handle: Option<JoinHandle<()>>,
}

impl TableSession {
    pub fn spawn(params: SessionParams) -> Result<Self, SessionError> {
        let SessionParams {
            config,
            table_id,
            player_id,
            player_name,
            store,
            resume_seq,
            initial_state,
        } = params;

        let api = TablesApi::new(&config)?;
        let endpoint = push_endpoint(&config, &table_id)?;

        let cursor = SyncCursor::new(resume_seq);
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(initial_state.unwrap_or_default());

        let listener = StateUpdateListener {
            endpoint,
            handshake_timeout: config.handshake_timeout,
            reconnect_delay: config.reconnect_delay,
            cursor: cursor.clone(),
            cancel: cancel.clone(),
        };
        let refresher = StateRefresher {
            api: api.clone(),
            table_id: table_id.clone(),
            cursor_rx: cursor.subscribe(),
            gate: CursorGate::new(resume_seq),
            state_tx,
            store: Arc::clone(&store),
            cancel: cancel.clone(),
        };

        let listener_handle = Some(tokio::spawn(listener.run()));
        let refresher_handle = Some(tokio::spawn(refresher.run()));

        info!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %player_id,
            resume_seq,
            "table session started"
        );

        Ok(Self {
            table_id,
            player_id,
            player_name,
            api,
            store,
            cursor,
            state_rx,
            cancel,
            listener_handle,
            refresher_handle,
        })
    }

    pub fn table_id(&self) -> &TableId {
        &self.table_id
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Channel of table snapshots: yields the current value immediately and
    /// every applied refresh afterwards.
    pub fn state(&self) -> watch::Receiver<TableState> {
        self.state_rx.clone()
    }

    /// The snapshot as of the last applied refresh.
    pub fn current_state(&self) -> TableState {
        self.state_rx.borrow().clone()
    }

    /// Current sync cursor value, an opaque ordering tag.
    pub fn cursor(&self) -> u64 {
        self.cursor.value()
    }

    /// Forces one refresh without waiting for a push, e.g. right after a
    /// resume to reconcile with whatever happened while detached.
    pub fn invalidate(&self) {
        self.cursor.bump();
    }

    pub async fn toggle_ready(&self) -> Result<(), SessionError> {
        self.api
            .toggle_ready(&self.table_id, &self.player_id)
            .await?;
        Ok(())
    }

    pub async fn hit(&self) -> Result<(), SessionError> {
        self.api
            .turn_action(&self.table_id, &self.player_id, TurnAction::Hit)
            .await?;
        Ok(())
    }

    pub async fn stand(&self) -> Result<(), SessionError> {
        self.api
            .turn_action(&self.table_id, &self.player_id, TurnAction::Stand)
            .await?;
        Ok(())
    }

    /// Gives up the seat and ends the session. Local teardown happens even
    /// when the service call fails; the call's result is still reported.
    pub async fn leave(mut self) -> Result<(), SessionError> {
        let result = self
            .api
            .remove_player(&self.table_id, &self.player_id)
            .await;
        if let Err(err) = SessionSnapshot::clear(self.store.as_ref()).await {
            warn!(target: LOG_TARGET, error = %err, "failed to clear persisted session");
        }
        self.teardown().await;
        result?;
        Ok(())
    }

    /// Ends the session but keeps the seat and the persisted snapshot, so it
    /// can be resumed later.
    pub async fn shutdown(mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.listener_handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(target: LOG_TARGET, error = %err, "update listener ended abnormally");
                }
            }
        }
        if let Some(handle) = self.refresher_handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(target: LOG_TARGET, error = %err, "refresh worker ended abnormally");
                }
            }
        }
        info!(target: LOG_TARGET, table_id = %self.table_id, "table session stopped");
    }
}

impl Drop for TableSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.listener_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.refresher_handle.take() {
            handle.abort();
        }
    }
}

fn push_endpoint(config: &ClientConfig, table_id: &TableId) -> Result<Url, SessionError> {
    let raw = format!(
        "{}/state-updates/{}",
        config.ws_url.as_str().trim_end_matches('/'),
        table_id
    );
    Ok(Url::parse(&raw)?)
}
