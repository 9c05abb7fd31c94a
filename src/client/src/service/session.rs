use std::path::Path;

use common::{
    error::{Error, Result},
    model::{
        game::{GameMode, Move, Player, Slot},
        messages::{RoundOutcome, RoundRequest, RoundResponse, SessionId},
    },
};
use tracing::{info, info_span};

use super::{persistence, protocol::SessionProtocol};
use crate::channel::Channel;

pub const DEFAULT_PLAYER_ONE_TAG: &str = "Player 1";
/// Winner label recorded for a drawn round.
pub const DRAW_LABEL: &str = "Draw";

/// Everything the front-end knows about the game in progress.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    mode: GameMode,
    player1: Player,
    player2: Player,
    winner: Option<String>,
    player_one_tag: String,
}

impl GameSession {
    pub fn new(mode: GameMode, player1: Player, player2: Player) -> Self {
        GameSession {
            id: SessionId::new(),
            mode,
            player1,
            player2,
            winner: None,
            player_one_tag: DEFAULT_PLAYER_ONE_TAG.to_owned(),
        }
    }

    pub fn man_vs_man(name1: impl Into<String>, name2: impl Into<String>) -> Self {
        Self::new(GameMode::ManVsMan, Player::new(name1), Player::new(name2))
    }

    pub fn man_vs_ai(name: impl Into<String>) -> Self {
        Self::new(GameMode::ManVsAi, Player::new(name), Player::new("AI"))
    }

    pub fn ai_vs_ai() -> Self {
        Self::new(GameMode::AiVsAi, Player::new("AI 1"), Player::new("AI 2"))
    }

    /// Result tag the peer uses for a player one win.
    pub fn with_player_one_tag(mut self, tag: impl Into<String>) -> Self {
        self.player_one_tag = tag.into();
        self
    }

    /// Picks up an unfinished session saved with [`GameSession::save`].
    /// Resumed sessions are always played man vs man.
    pub fn resume(path: impl AsRef<Path>) -> Result<Self> {
        let (player1, player2) = persistence::load_from_path(path)?;
        Ok(Self::new(GameMode::ManVsMan, player1, player2))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn player1(&self) -> &Player {
        &self.player1
    }

    pub fn player2(&self) -> &Player {
        &self.player2
    }

    pub fn player(&self, slot: Slot) -> &Player {
        match slot {
            Slot::One => &self.player1,
            Slot::Two => &self.player2,
        }
    }

    /// Winning player's name or [`DRAW_LABEL`], once a round has been played.
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Records a human player's move. Moves are locked once made.
    pub fn make_move(&mut self, slot: Slot, value: Move) -> Result<()> {
        self.ensure_unfinished()?;
        if !self.mode.is_human(slot) {
            return Err(Error::invalid_state(format!(
                "player {} is played by the peer in {}",
                slot.number(),
                self.mode
            )));
        }
        let player = match slot {
            Slot::One => &mut self.player1,
            Slot::Two => &mut self.player2,
        };
        if player.has_moved() {
            return Err(Error::invalid_state(format!(
                "{} has already made a move",
                player.name
            )));
        }
        player.current_move = Some(value);
        info!(session = %self.id, "Player {} made a move", slot.number());
        Ok(())
    }

    /// Plays the round with the peer and records its verdict.
    pub fn play_round<C: Channel>(
        &mut self,
        protocol: &mut SessionProtocol<C>,
    ) -> Result<RoundResponse> {
        let _span = info_span!("session", id = %self.id).entered();
        self.ensure_unfinished()?;
        let request = RoundRequest::for_mode(
            self.mode,
            self.player1.current_move,
            self.player2.current_move,
        )?;
        let response = protocol.play(&request)?;

        // The peer reports the moves it actually played for AI slots
        self.player1.current_move = Some(response.move1);
        self.player2.current_move = Some(response.move2);
        let winner = match response.outcome(&self.player_one_tag) {
            RoundOutcome::Draw => DRAW_LABEL.to_owned(),
            RoundOutcome::PlayerOne => self.player1.name.clone(),
            RoundOutcome::PlayerTwo => self.player2.name.clone(),
        };
        info!("Round finished, winner: {}", winner);
        self.winner = Some(winner);
        Ok(response)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let _span = info_span!("session", id = %self.id).entered();
        persistence::save_to_path(
            path,
            self.winner().unwrap_or_default(),
            &self.player1,
            &self.player2,
        )
    }

    fn ensure_unfinished(&self) -> Result<()> {
        if self.is_finished() {
            return Err(Error::invalid_state("game already finished"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{temp_path, ScriptedChannel};

    fn protocol(incoming: &str) -> SessionProtocol<ScriptedChannel> {
        SessionProtocol::new(ScriptedChannel::opened().with_incoming(incoming.as_bytes()))
    }

    #[test]
    fn man_vs_man_round() {
        let mut session = GameSession::man_vs_man("Alice", "Bob");
        session.make_move(Slot::One, Move::Rock).unwrap();
        session.make_move(Slot::Two, Move::Scissors).unwrap();

        let mut protocol = protocol("Player 1,ROCK,SCISSORS|");
        let response = session.play_round(&mut protocol).unwrap();

        assert_eq!(response.result, "Player 1");
        assert_eq!(session.winner(), Some("Alice"));
        assert_eq!(
            protocol.transport().channel().written_str(),
            "MAN_VS_MAN,ROCK,SCISSORS\n"
        );
    }

    #[test]
    fn man_vs_ai_records_peer_move() {
        let mut session = GameSession::man_vs_ai("Alice");
        session.make_move(Slot::One, Move::Rock).unwrap();

        let mut protocol = protocol("Player 2,ROCK,PAPER|");
        session.play_round(&mut protocol).unwrap();

        assert_eq!(protocol.transport().channel().written_str(), "MAN_VS_AI,ROCK,ROCK\n");
        assert_eq!(session.player2().current_move, Some(Move::Paper));
        assert_eq!(session.winner(), Some("AI"));
    }

    #[test]
    fn ai_vs_ai_draw() {
        let mut session = GameSession::ai_vs_ai();
        let mut protocol = protocol("DRAW,PAPER,PAPER|");
        session.play_round(&mut protocol).unwrap();
        assert_eq!(session.winner(), Some(DRAW_LABEL));
    }

    #[test]
    fn custom_player_one_tag() {
        let mut session = GameSession::ai_vs_ai().with_player_one_tag("P1");
        let mut protocol = protocol("P1,SCISSORS,PAPER|");
        session.play_round(&mut protocol).unwrap();
        assert_eq!(session.winner(), Some("AI 1"));
    }

    #[test]
    fn moves_are_locked() {
        let mut session = GameSession::man_vs_ai("Alice");
        session.make_move(Slot::One, Move::Rock).unwrap();
        assert!(matches!(
            session.make_move(Slot::One, Move::Paper),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            session.make_move(Slot::Two, Move::Paper),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(session.player(Slot::One).current_move, Some(Move::Rock));
    }

    #[test]
    fn missing_move_sends_nothing() {
        let mut session = GameSession::man_vs_man("Alice", "Bob");
        session.make_move(Slot::One, Move::Rock).unwrap();
        let mut protocol = protocol("");
        assert!(matches!(
            session.play_round(&mut protocol),
            Err(Error::InvalidState(_))
        ));
        assert!(protocol.transport().channel().written().is_empty());
    }

    #[test]
    fn failed_round_can_be_retried() {
        let mut session = GameSession::ai_vs_ai();
        let mut protocol = protocol("DRAW,PAP");
        assert!(matches!(
            session.play_round(&mut protocol),
            Err(Error::Protocol { .. })
        ));
        assert!(!session.is_finished());

        protocol
            .transport_mut()
            .channel_mut()
            .push_incoming(b"Player 1,ROCK,SCISSORS|");
        session.play_round(&mut protocol).unwrap();
        assert_eq!(session.winner(), Some("AI 1"));
    }

    #[test]
    fn finished_session_cannot_play_again() {
        let mut session = GameSession::ai_vs_ai();
        let mut protocol = protocol("DRAW,ROCK,ROCK|DRAW,ROCK,ROCK|");
        session.play_round(&mut protocol).unwrap();
        assert!(matches!(
            session.play_round(&mut protocol),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            session.make_move(Slot::One, Move::Rock),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn save_then_resume_unfinished() {
        let path = temp_path("ini");
        let mut session = GameSession::man_vs_man("Alice", "Bob");
        session.make_move(Slot::Two, Move::Paper).unwrap();
        session.save(&path).unwrap();

        let mut resumed = GameSession::resume(&path).unwrap();
        assert_eq!(resumed.mode(), GameMode::ManVsMan);
        assert_eq!(resumed.player1(), &Player::new("Alice"));
        assert_eq!(resumed.player2(), &Player::new("Bob").with_move(Move::Paper));
        assert_ne!(resumed.id(), session.id());
        resumed.make_move(Slot::One, Move::Rock).unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn finished_session_is_not_resumable() {
        let path = temp_path("ini");
        let mut session = GameSession::ai_vs_ai();
        session.play_round(&mut protocol("DRAW,ROCK,ROCK|")).unwrap();
        session.save(&path).unwrap();

        let error = GameSession::resume(&path).unwrap_err();
        assert_eq!(error.to_string(), "invalid state: game already finished");
        std::fs::remove_file(&path).unwrap();
    }
}
