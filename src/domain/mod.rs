//! Wire model of the table service: identifiers, cards, and table state.
//!
//! Everything in this module (de)serializes to the exact JSON the service
//! emits. Enumerations carry their wire integers explicitly and fail
//! deserialization loudly on values outside the documented range instead of
//! smuggling an "unknown" placeholder into the state.

mod card;
mod table;

pub use card::{Card, Rank, Suit};
pub use table::{Outcome, Phase, Player, Seat, TableState};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A wire integer outside the range documented for its enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireValueError {
    #[error("unknown card rank {0}")]
    Rank(u8),
    #[error("unknown card suit {0}")]
    Suit(u8),
    #[error("unknown table phase {0}")]
    Phase(u8),
    #[error("unknown player outcome {0}")]
    Outcome(u8),
}

/// Raised when an identifier that must be non-empty is constructed from an
/// empty string (blank session snapshots, unset CLI flags, and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} must not be empty")]
pub struct EmptyIdError(&'static str);

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps the raw identifier, rejecting empty or all-whitespace
            /// input so downstream code never has to re-check.
            pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(EmptyIdError($label));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

id_type!(
    /// Server-issued table identifier (one blackjack session).
    TableId,
    "table id"
);

id_type!(
    /// Server-issued player identifier, scoped to one table.
    PlayerId,
    "player id"
);
