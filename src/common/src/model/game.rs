use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}
impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Move::Rock => "ROCK",
            Move::Paper => "PAPER",
            Move::Scissors => "SCISSORS",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = Error;

    // Exact match only, the peer always sends upper-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::protocol("invalid move name", Some(s)))
    }
}

/// Selects who fills the two move slots of a round. The peer uses it to
/// decide which slots it plays itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    #[default]
    ManVsMan,
    ManVsAi,
    AiVsAi,
}
impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::ManVsMan, GameMode::ManVsAi, GameMode::AiVsAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::ManVsMan => "MAN_VS_MAN",
            GameMode::ManVsAi => "MAN_VS_AI",
            GameMode::AiVsAi => "AI_VS_AI",
        }
    }

    /// Whether the given slot is played by a human in this mode.
    pub fn is_human(&self, slot: Slot) -> bool {
        match (self, slot) {
            (GameMode::ManVsMan, _) => true,
            (GameMode::ManVsAi, Slot::One) => true,
            (GameMode::ManVsAi, Slot::Two) => false,
            (GameMode::AiVsAi, _) => false,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::protocol("invalid game mode", Some(s)))
    }
}

/// Position of a player in a round: the first or second move slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    One,
    Two,
}
impl Slot {
    pub fn number(&self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub name: String,
    pub current_move: Option<Move>,
}
impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Player {
            name: name.into(),
            current_move: None,
        }
    }

    pub fn with_move(mut self, value: Move) -> Self {
        self.current_move = Some(value);
        self
    }

    pub fn has_moved(&self) -> bool {
        self.current_move.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_names_parse_back() {
        for value in Move::ALL {
            assert_eq!(value.as_str().parse::<Move>().unwrap(), value);
        }
        for mode in GameMode::ALL {
            assert_eq!(mode.to_string().parse::<GameMode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_move_is_rejected() {
        let error = "LIZARD".parse::<Move>().unwrap_err();
        assert!(
            matches!(error, Error::Protocol { ref message, .. } if message == "invalid move name")
        );
        // Lower case is not a canonical name
        assert!("rock".parse::<Move>().is_err());
    }

    #[test]
    fn human_slots_follow_mode() {
        assert!(GameMode::ManVsMan.is_human(Slot::Two));
        assert!(GameMode::ManVsAi.is_human(Slot::One));
        assert!(!GameMode::ManVsAi.is_human(Slot::Two));
        assert!(!GameMode::AiVsAi.is_human(Slot::One));
    }
}
