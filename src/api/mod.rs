//! Typed client for the table service's REST endpoints.
//!
//! Every call maps one-to-one onto a service route. Responses are decoded
//! strictly: a payload carrying an enum value this crate does not know is a
//! decode error, never a silently wrong card or phase.

pub mod dto;
mod error;

pub use error::ApiError;

use reqwest::Client;
use tracing::debug;

use crate::config::ClientConfig;
use crate::domain::{Player, PlayerId, TableId, TableState};

use self::dto::{CreateTableResponse, JoinTableResponse, PlayerNameRequest, TurnAction};
use self::error::check_status;

const LOG_TARGET: &str = "api::tables";

#[derive(Debug, Clone)]
pub struct TablesApi {
    http: Client,
    base_url: String,
}

impl TablesApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
        })
    }

    /// `POST /tables`. Returns the id of the freshly created table; the
    /// caller still has to join it to get a seat.
    pub async fn create_table(&self, player_name: &str) -> Result<TableId, ApiError> {
        let response = self
            .http
            .post(format!("{}/tables", self.base_url))
            .json(&PlayerNameRequest { player_name })
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let decoded: CreateTableResponse = serde_json::from_str(&body)?;
        debug!(target: LOG_TARGET, table_id = %decoded.table_id, "created table");
        Ok(decoded.table_id)
    }

    /// `POST /tables/players/{tableId}`. Seats `player_name` at the table
    /// and returns the id the service assigned to them.
    pub async fn join_table(
        &self,
        table_id: &TableId,
        player_name: &str,
    ) -> Result<PlayerId, ApiError> {
        let response = self
            .http
            .post(format!("{}/tables/players/{table_id}", self.base_url))
            .json(&PlayerNameRequest { player_name })
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let decoded: JoinTableResponse = serde_json::from_str(&body)?;
        debug!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %decoded.player_id,
            "joined table"
        );
        Ok(decoded.player_id)
    }

    /// `GET /tables/{tableId}`. Fetches the authoritative table snapshot.
    pub async fn table_state(&self, table_id: &TableId) -> Result<TableState, ApiError> {
        let response = self
            .http
            .get(format!("{}/tables/{table_id}", self.base_url))
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /tables/ready/{tableId}/{playerId}`. Flips the player's ready
    /// flag and returns their row as the service now sees it.
    pub async fn toggle_ready(
        &self,
        table_id: &TableId,
        player_id: &PlayerId,
    ) -> Result<Player, ApiError> {
        let response = self
            .http
            .post(format!(
                "{}/tables/ready/{table_id}/{player_id}",
                self.base_url
            ))
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let player: Player = serde_json::from_str(&body)?;
        debug!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %player_id,
            is_ready = player.is_ready,
            "toggled ready"
        );
        Ok(player)
    }

    /// `POST /tables/{tableId}/{playerId}?action=...`. Plays a turn action.
    /// The service acknowledges with an empty body; the refreshed table
    /// arrives through the usual update push.
    pub async fn turn_action(
        &self,
        table_id: &TableId,
        player_id: &PlayerId,
        action: TurnAction,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/tables/{table_id}/{player_id}", self.base_url))
            .query(&[("action", action.as_str())])
            .send()
            .await?;
        check_status(response).await?;
        debug!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %player_id,
            action = %action,
            "played turn action"
        );
        Ok(())
    }

    /// `DELETE /tables/players/{tableId}/{playerId}`. Gives up the seat.
    pub async fn remove_player(
        &self,
        table_id: &TableId,
        player_id: &PlayerId,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!(
                "{}/tables/players/{table_id}/{player_id}",
                self.base_url
            ))
            .send()
            .await?;
        check_status(response).await?;
        debug!(
            target: LOG_TARGET,
            table_id = %table_id,
            player_id = %player_id,
            "left table"
        );
        Ok(())
    }
}
