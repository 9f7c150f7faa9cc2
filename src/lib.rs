pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod store;
pub mod sync;

pub use client::{BlackjackClient, ClientError};
pub use config::ClientConfig;
pub use domain::{Card, Outcome, Phase, Player, PlayerId, Rank, Suit, TableId, TableState};
pub use sync::{TableSession, STATE_CHANGED_TOKEN};
