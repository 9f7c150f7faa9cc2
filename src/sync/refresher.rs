use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::TablesApi;
use crate::domain::{TableId, TableState};
use crate::store::{keys, write_value, SessionStore};

use super::cursor::CursorGate;

const LOG_TARGET: &str = "sync::refresher";

/// Pulls the table snapshot whenever the cursor moves and publishes it on
/// the state channel. The single worker serializes pulls; the gate drops any
/// that would apply out of order anyway.
pub(super) struct StateRefresher {
    pub(super) api: TablesApi,
    pub(super) table_id: TableId,
    pub(super) cursor_rx: watch::Receiver<u64>,
    pub(super) gate: CursorGate,
    pub(super) state_tx: watch::Sender<TableState>,
    pub(super) store: Arc<dyn SessionStore>,
    pub(super) cancel: CancellationToken,
}

impl StateRefresher {
    pub(super) async fn run(mut self) {
        // Align with the service before the first push arrives.
        self.refresh().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                changed = self.cursor_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.refresh().await;
                }
            }
        }

        debug!(target: LOG_TARGET, table_id = %self.table_id, "refresh worker stopped");
    }

    async fn refresh(&mut self) {
        let tag = *self.cursor_rx.borrow_and_update();

        // The seq is persisted as soon as it is observed, the state only
        // once the pull lands; a failure in between resumes one pull behind,
        // which the resume-time invalidation covers. Store failures cost
        // resumability, never the live session.
        if let Err(err) = write_value(self.store.as_ref(), keys::STATE_SEQ, &tag).await {
            warn!(target: LOG_TARGET, error = %err, "failed to persist state seq");
        }

        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return,
            fetched = self.api.table_state(&self.table_id) => fetched,
        };

        let state = match fetched {
            Ok(state) => state,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    table_id = %self.table_id,
                    error = %err,
                    "refresh failed, keeping previous state"
                );
                return;
            }
        };

        if !self.gate.admit(tag) {
            debug!(
                target: LOG_TARGET,
                tag,
                last_applied = self.gate.last_applied(),
                "dropping stale snapshot"
            );
            return;
        }

        if !state.hands_consistent() {
            warn!(
                target: LOG_TARGET,
                players = state.players.len(),
                hands = state.hands.len(),
                "hand count does not line up with seats"
            );
        }

        self.state_tx.send_replace(state.clone());
        if let Err(err) = write_value(self.store.as_ref(), keys::TABLE_STATE, &state).await {
            warn!(target: LOG_TARGET, error = %err, "failed to persist table state");
        }
        debug!(target: LOG_TARGET, table_id = %self.table_id, tag, "applied table snapshot");
    }
}
