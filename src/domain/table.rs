use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::{Card, WireValueError};

/// Zero-based index of a player around the table. Seat `i` owns
/// `TableState::hands[i + 1]`; `hands[0]` always belongs to the dealer.
pub type Seat = usize;

/// Round lifecycle as the service encodes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    #[default]
    WaitingForPlayers = 0,
    CardsDealt = 1,
    Finished = 2,
}

impl TryFrom<u8> for Phase {
    type Error = WireValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Phase::WaitingForPlayers,
            1 => Phase::CardsDealt,
            2 => Phase::Finished,
            other => return Err(WireValueError::Phase(other)),
        })
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::WaitingForPlayers => "Waiting for players",
            Phase::CardsDealt => "Cards dealt",
            Phase::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// Per-player round result as the service encodes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Outcome {
    #[default]
    Undecided = 0,
    Win = 1,
    Lose = 2,
    Push = 3,
}

impl TryFrom<u8> for Outcome {
    type Error = WireValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Outcome::Undecided,
            1 => Outcome::Win,
            2 => Outcome::Lose,
            3 => Outcome::Push,
            other => return Err(WireValueError::Outcome(other)),
        })
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> u8 {
        outcome as u8
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Undecided => "Undecided",
            Outcome::Win => "Won",
            Outcome::Lose => "Lost",
            Outcome::Push => "Push",
        };
        f.write_str(name)
    }
}

/// A seated player as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub is_ready: bool,
    pub chips: i64,
    pub bet: i64,
    pub outcome: Outcome,
}

/// Full table snapshot as returned by the read endpoint. This is the unit of
/// replacement: every refresh swaps the whole value, never a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    #[serde(deserialize_with = "nullable_vec")]
    pub players: Vec<Player>,
    #[serde(deserialize_with = "nullable_vec")]
    pub hands: Vec<Vec<Card>>,
    #[serde(rename = "state")]
    pub phase: Phase,
    /// One-based position of the player whose turn it is. The service starts
    /// this at 1 and leaves it there outside of an active round.
    pub current_player: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            hands: Vec::new(),
            phase: Phase::default(),
            current_player: 1,
        }
    }
}

impl TableState {
    /// The dealer's hand, when one has been dealt.
    pub fn dealer_hand(&self) -> Option<&[Card]> {
        self.hands.first().map(Vec::as_slice)
    }

    /// The hand belonging to the player in `seat`. Seats index `players`;
    /// the matching hand sits one slot later because the dealer owns slot 0.
    pub fn player_hand(&self, seat: Seat) -> Option<&[Card]> {
        let slot = seat.checked_add(1)?;
        self.hands.get(slot).map(Vec::as_slice)
    }

    /// The player whose turn it currently is, only meaningful mid-round.
    pub fn turn_player(&self) -> Option<&Player> {
        if self.phase != Phase::CardsDealt {
            return None;
        }
        self.players.get(self.current_player.checked_sub(1)?)
    }

    /// The hand of the player whose turn it currently is.
    pub fn turn_hand(&self) -> Option<&[Card]> {
        if self.phase != Phase::CardsDealt || self.current_player == 0 {
            return None;
        }
        self.hands.get(self.current_player).map(Vec::as_slice)
    }

    /// Whether the hand list lines up with the seat list. A fresh table
    /// reports a lone dealer hand with no players, so an empty hand list or
    /// exactly one hand per player plus the dealer both count as consistent.
    pub fn hands_consistent(&self) -> bool {
        self.hands.is_empty() || self.hands.len() == self.players.len() + 1
    }
}

/// The service serializes empty slices as JSON `null`; treat those as empty.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
