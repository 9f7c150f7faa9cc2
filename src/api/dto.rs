use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{PlayerId, TableId};

/// Request body shared by table creation and seat requests; the service
/// validates the name in both cases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNameRequest<'a> {
    pub player_name: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableResponse {
    pub table_id: TableId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTableResponse {
    pub player_id: PlayerId,
}

/// The two moves the service accepts on the turn-action endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnAction {
    Hit,
    Stand,
}

impl TurnAction {
    /// Query-parameter spelling expected by the service.
    pub fn as_str(self) -> &'static str {
        match self {
            TurnAction::Hit => "hit",
            TurnAction::Stand => "stand",
        }
    }
}

impl fmt::Display for TurnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
