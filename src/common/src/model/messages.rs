use std::{fmt, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::game::{GameMode, Move, Slot};
use crate::error::{Error, Result};

/// Result tag the peer sends when neither player wins.
pub const DRAW_TAG: &str = "DRAW";

/// Move sent in a slot the peer plays itself. The peer ignores it.
pub const AI_PLACEHOLDER_MOVE: Move = Move::Rock;

#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub struct SessionId(pub Uuid);
impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}
impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Client -> peer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRequest {
    pub mode: GameMode,
    pub move1: Move,
    pub move2: Move,
}
impl RoundRequest {
    pub fn new(mode: GameMode, move1: Move, move2: Move) -> Self {
        RoundRequest { mode, move1, move2 }
    }

    /// Builds a request from whatever moves the humans have made so far.
    /// Slots the peer plays get a placeholder, human slots must be filled.
    pub fn for_mode(mode: GameMode, move1: Option<Move>, move2: Option<Move>) -> Result<Self> {
        let fill = |slot: Slot, value: Option<Move>| {
            if !mode.is_human(slot) {
                return Ok(AI_PLACEHOLDER_MOVE);
            }
            value.ok_or_else(|| {
                Error::invalid_state(format!("player {} must make a move", slot.number()))
            })
        };
        Ok(RoundRequest {
            mode,
            move1: fill(Slot::One, move1)?,
            move2: fill(Slot::Two, move2)?,
        })
    }

    /// Frame payload, without the line terminator.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RoundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.mode, self.move1, self.move2)
    }
}

impl FromStr for RoundRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let line = s.strip_suffix('\n').unwrap_or(s);
        let malformed = || Error::protocol("malformed request", Some(s));
        let (mode, move1, move2) = line.split(',').collect_tuple().ok_or_else(malformed)?;
        Ok(RoundRequest {
            mode: mode.parse().map_err(|_| malformed())?,
            move1: move1.parse().map_err(|_| malformed())?,
            move2: move2.parse().map_err(|_| malformed())?,
        })
    }
}

/// Who won a round, as far as this client can tell from the result tag.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Draw,
    PlayerOne,
    PlayerTwo,
}

// Peer -> client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoundResponse {
    /// Opaque tag chosen by the peer. Only compared against [`DRAW_TAG`]
    /// and the configured player-one tag.
    pub result: String,
    pub move1: Move,
    pub move2: Move,
}
impl RoundResponse {
    /// Parses a frame payload with the delimiter already removed.
    pub fn decode(payload: &str) -> Result<Self> {
        let payload = payload.trim();
        let malformed = || Error::protocol("malformed response", Some(payload));
        let (result, move1, move2) = payload.split(',').collect_tuple().ok_or_else(malformed)?;
        if result.is_empty() {
            return Err(malformed());
        }
        Ok(RoundResponse {
            result: result.to_owned(),
            move1: move1.parse().map_err(|_| malformed())?,
            move2: move2.parse().map_err(|_| malformed())?,
        })
    }

    pub fn is_draw(&self) -> bool {
        self.result == DRAW_TAG
    }

    /// Anything that is neither a draw nor `player_one_tag` counts as a
    /// player two win; the peer never defined its own tag for that.
    pub fn outcome(&self, player_one_tag: &str) -> RoundOutcome {
        if self.is_draw() {
            RoundOutcome::Draw
        } else if self.result == player_one_tag {
            RoundOutcome::PlayerOne
        } else {
            RoundOutcome::PlayerTwo
        }
    }
}
