use common::{
    error::{Error, Result},
    model::{
        game::{GameMode, Move},
        messages::{RoundRequest, RoundResponse},
    },
};
use tracing::{debug, warn};

use crate::{channel::Channel, transport::FramedTransport};

pub const DEFAULT_RESPONSE_DELIMITER: &str = "|";

/// One request/response exchange per round with the peer.
///
/// Rounds are strictly sequential: a request is sent, then the caller blocks
/// until the peer's result frame arrives. Failures end the round; retrying
/// is up to the caller.
pub struct SessionProtocol<C: Channel> {
    transport: FramedTransport<C>,
    response_delimiter: String,
}

impl<C: Channel> SessionProtocol<C> {
    pub fn new(channel: C) -> Self {
        Self::with_delimiter(channel, DEFAULT_RESPONSE_DELIMITER)
    }

    pub fn with_delimiter(channel: C, response_delimiter: impl Into<String>) -> Self {
        SessionProtocol {
            transport: FramedTransport::new(channel),
            response_delimiter: response_delimiter.into(),
        }
    }

    pub fn transport(&self) -> &FramedTransport<C> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut FramedTransport<C> {
        &mut self.transport
    }

    pub fn send_round(&mut self, mode: GameMode, move1: Move, move2: Move) -> Result<()> {
        self.send_request(&RoundRequest::new(mode, move1, move2))
    }

    pub fn send_request(&mut self, request: &RoundRequest) -> Result<()> {
        debug!("Sending round {:?}", request);
        self.transport.send_line(&request.encode())
    }

    pub fn receive_round(&mut self) -> Result<RoundResponse> {
        let payload = self
            .transport
            .receive_until(&self.response_delimiter)
            .map_err(|e| {
                warn!("Failed to receive round result: {}", e);
                Error::protocol_caused_by("failed to receive result", e)
            })?;
        RoundResponse::decode(&payload).inspect_err(|e| warn!("{}", e))
    }

    /// Sends `request` and waits for its result.
    pub fn play(&mut self, request: &RoundRequest) -> Result<RoundResponse> {
        self.send_request(request)?;
        self.receive_round()
    }

    pub fn close(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::ScriptedChannel;

    fn protocol(incoming: &str) -> SessionProtocol<ScriptedChannel> {
        SessionProtocol::new(ScriptedChannel::opened().with_incoming(incoming.as_bytes()))
    }

    #[test]
    fn send_round_writes_request_line() {
        let mut protocol = protocol("");
        protocol
            .send_round(GameMode::ManVsMan, Move::Rock, Move::Scissors)
            .unwrap();
        assert_eq!(protocol.transport().channel().written_str(), "MAN_VS_MAN,ROCK,SCISSORS\n");
    }

    #[test]
    fn play_returns_parsed_result() {
        let mut protocol = protocol("Player 1,ROCK,SCISSORS|");
        let request = RoundRequest::new(GameMode::ManVsMan, Move::Rock, Move::Scissors);
        let response = protocol.play(&request).unwrap();
        assert_eq!(response.result, "Player 1");
        assert_eq!(response.move1, Move::Rock);
        assert_eq!(response.move2, Move::Scissors);
    }

    #[test]
    fn transport_failure_is_wrapped() {
        let mut protocol = protocol("DRAW,ROCK");
        let error = protocol.receive_round().unwrap_err();
        assert!(
            matches!(error, Error::Protocol { ref message, .. } if message == "failed to receive result")
        );
        assert!(matches!(error.cause(), Some(Error::PeerDisconnected)));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let mut protocol = protocol("DRAW,LIZARD,PAPER|");
        let error = protocol.receive_round().unwrap_err();
        assert!(
            matches!(error, Error::Protocol { ref message, .. } if message == "malformed response")
        );
        assert!(error.to_string().contains("DRAW,LIZARD,PAPER"));
    }

    #[test]
    fn custom_delimiter() {
        let channel = ScriptedChannel::opened().with_incoming(b"DRAW,PAPER,PAPER\r\n");
        let mut protocol = SessionProtocol::with_delimiter(channel, "\r\n");
        assert!(protocol.receive_round().unwrap().is_draw());
    }

    #[test]
    fn close_is_idempotent() {
        let mut protocol = protocol("");
        protocol.close();
        protocol.close();
        assert!(!protocol.transport().channel().is_open());
        assert_eq!(protocol.transport().channel().close_count(), 2);
    }
}
