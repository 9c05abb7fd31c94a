//! Saving and resuming a session as a flat `Key = Value` file.
//!
//! ```text
//! [Game Status]
//! Player1 = Alice
//! Player2 = Bob
//! Player1Move = ROCK
//! Player2Move =
//! ```
//!
//! A `Winner` line marks the session as finished. Finished sessions can be
//! read back as a [`SessionRecord`] but cannot be resumed.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use common::{
    error::{Error, Result},
    model::game::{Move, Player},
};
use tracing::{debug, info, warn};

pub const SECTION: &str = "Game Status";
pub const PLAYER1_KEY: &str = "Player1";
pub const PLAYER2_KEY: &str = "Player2";
pub const PLAYER1_MOVE_KEY: &str = "Player1Move";
pub const PLAYER2_MOVE_KEY: &str = "Player2Move";
pub const WINNER_KEY: &str = "Winner";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionRecord {
    pub player1: String,
    pub player2: String,
    pub player1_move: Option<Move>,
    pub player2_move: Option<Move>,
    /// Present only once the round has been played.
    pub winner: Option<String>,
}

impl SessionRecord {
    /// The winner is kept only when both moves are made and `winner` is not blank.
    pub fn from_players(winner: &str, player1: &Player, player2: &Player) -> Self {
        let both_moved = player1.has_moved() && player2.has_moved();
        SessionRecord {
            player1: player1.name.clone(),
            player2: player2.name.clone(),
            player1_move: player1.current_move,
            player2_move: player2.current_move,
            winner: (both_moved && !winner.trim().is_empty()).then(|| winner.to_owned()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Fails without writing anything when a value would span lines.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.check_single_line()?;
        let move_name = |value: Option<Move>| value.map(|m| m.as_str()).unwrap_or_default();
        writeln!(writer, "[{SECTION}]")?;
        writeln!(writer, "{PLAYER1_KEY} = {}", self.player1)?;
        writeln!(writer, "{PLAYER2_KEY} = {}", self.player2)?;
        writeln!(writer, "{PLAYER1_MOVE_KEY} = {}", move_name(self.player1_move))?;
        writeln!(writer, "{PLAYER2_MOVE_KEY} = {}", move_name(self.player2_move))?;
        if let Some(winner) = &self.winner {
            writeln!(writer, "{WINNER_KEY} = {winner}")?;
        }
        Ok(())
    }

    fn check_single_line(&self) -> Result<()> {
        let values = [
            (PLAYER1_KEY, Some(&self.player1)),
            (PLAYER2_KEY, Some(&self.player2)),
            (WINNER_KEY, self.winner.as_ref()),
        ];
        for (key, value) in values {
            if value.is_some_and(|v| v.contains(['\r', '\n'])) {
                return Err(Error::invalid_state(format!("{key} must not contain a line break")));
            }
        }
        Ok(())
    }

    /// Reads a record, finished or not.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_entries(read_entries(reader)?)
    }

    /// The two players to resume play with. Fails for a finished record.
    pub fn into_players(self) -> Result<(Player, Player)> {
        if self.is_finished() {
            return Err(game_already_finished());
        }
        let player = |name, current_move| Player { name, current_move };
        Ok((
            player(self.player1, self.player1_move),
            player(self.player2, self.player2_move),
        ))
    }

    fn from_entries(mut entries: HashMap<String, String>) -> Result<Self> {
        let mut name = |key: &str| {
            entries
                .remove(key)
                .ok_or_else(|| Error::protocol(format!("missing key {key}"), None))
        };
        let player1 = name(PLAYER1_KEY)?;
        let player2 = name(PLAYER2_KEY)?;
        Ok(SessionRecord {
            player1,
            player2,
            player1_move: parse_move(entries.get(PLAYER1_MOVE_KEY))?,
            player2_move: parse_move(entries.get(PLAYER2_MOVE_KEY))?,
            winner: entries.remove(WINNER_KEY),
        })
    }
}

fn game_already_finished() -> Error {
    Error::invalid_state("game already finished")
}

fn parse_move(value: Option<&String>) -> Result<Option<Move>> {
    match value.map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(name) => name.parse::<Move>().map(Some),
    }
}

// Collects the keys of the status section. Keys before any section header
// belong to it too. Only the single space after `=` is dropped from a value,
// so names keep their own surrounding whitespace.
fn read_entries<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
    let mut entries = HashMap::new();
    let mut in_status_section = true;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        if let Some(section) = trimmed.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_status_section = section.trim() == SECTION;
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!("Skipping line {} without a key: {:?}", number + 1, trimmed);
            continue;
        };
        if in_status_section {
            let value = value.strip_prefix(' ').unwrap_or(value);
            entries.insert(key.trim().to_owned(), value.to_owned());
        }
    }
    Ok(entries)
}

pub fn save<W: Write>(
    mut writer: W,
    winner: &str,
    player1: &Player,
    player2: &Player,
) -> Result<()> {
    let record = SessionRecord::from_players(winner, player1, player2);
    record.write_to(&mut writer)?;
    writer.flush()?;
    debug!("Saved {:?}", record);
    Ok(())
}

/// Like [`save`], but the file is only created once the record is known to
/// be writable.
pub fn save_to_path(
    path: impl AsRef<Path>,
    winner: &str,
    player1: &Player,
    player2: &Player,
) -> Result<()> {
    let path = path.as_ref();
    let record = SessionRecord::from_players(winner, player1, player2);
    record.check_single_line()?;
    let mut writer = BufWriter::new(File::create(path)?);
    record.write_to(&mut writer)?;
    writer.flush()?;
    info!("Saved session to {}", path.display());
    Ok(())
}

/// Reads an unfinished session back. Any `Winner` key, whatever the other
/// fields contain, fails with [`Error::InvalidState`].
pub fn load<R: BufRead>(reader: R) -> Result<(Player, Player)> {
    let entries = read_entries(reader)?;
    if entries.contains_key(WINNER_KEY) {
        return Err(game_already_finished());
    }
    SessionRecord::from_entries(entries)?.into_players()
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<(Player, Player)> {
    let path = path.as_ref();
    let players = load(BufReader::new(File::open(path)?))?;
    info!("Loaded session from {}", path.display());
    Ok(players)
}
