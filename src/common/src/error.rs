use std::io;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a round, a channel or a saved session can fail.
///
/// Nothing below the caller retries or swallows these; the caller decides
/// whether to show a notice and let the user try again.
#[derive(Debug, Error)]
pub enum Error {
    /// The device could not be opened. Fatal for the session.
    #[error("failed to open channel {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: BoxError,
    },

    /// Write or read fault on an open channel, or a save/load file fault.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended (or was closed) before a complete frame arrived.
    #[error("peer disconnected before a complete frame was received")]
    PeerDisconnected,

    /// Bytes were received but do not have the expected shape.
    #[error("{message}{}", payload_suffix(.payload))]
    Protocol {
        message: String,
        payload: Option<String>,
        #[source]
        source: Option<Box<Error>>,
    },

    /// The operation is not allowed in the current session state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    pub fn connection(port: impl ToString, source: impl Into<BoxError>) -> Self {
        Error::Connection {
            port: port.to_string(),
            source: source.into(),
        }
    }

    pub fn protocol(message: impl ToString, payload: Option<&str>) -> Self {
        Error::Protocol {
            message: message.to_string(),
            payload: payload.map(str::to_owned),
            source: None,
        }
    }

    /// Wraps a lower-level failure, keeping it as the error source.
    pub fn protocol_caused_by(message: impl ToString, cause: Error) -> Self {
        Error::Protocol {
            message: message.to_string(),
            payload: None,
            source: Some(Box::new(cause)),
        }
    }

    pub fn invalid_state(message: impl ToString) -> Self {
        Error::InvalidState(message.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Io(_) => ErrorKind::Io,
            Error::PeerDisconnected => ErrorKind::PeerDisconnected,
            Error::Protocol { .. } => ErrorKind::Protocol,
            Error::InvalidState(_) => ErrorKind::InvalidState,
        }
    }

    /// The root transport failure behind a wrapped protocol error, if any.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Error::Protocol {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}

/// Payload-free discriminant of [`Error`], handy for matching and for test scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Connection,
    Io,
    PeerDisconnected,
    Protocol,
    InvalidState,
}

pub type Result<T> = std::result::Result<T, Error>;

fn payload_suffix(payload: &Option<String>) -> String {
    match payload {
        Some(payload) => format!(" (payload: {payload:?})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_shows_raw_payload() {
        let error = Error::protocol("malformed response", Some("DRAW,LIZARD,PAPER"));
        assert_eq!(
            error.to_string(),
            "malformed response (payload: \"DRAW,LIZARD,PAPER\")"
        );
        assert_eq!(error.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn wrapped_error_keeps_its_cause() {
        let error = Error::protocol_caused_by("failed to receive result", Error::PeerDisconnected);
        assert_eq!(error.to_string(), "failed to receive result");
        assert!(matches!(error.cause(), Some(Error::PeerDisconnected)));
        assert!(std::error::Error::source(&error).is_some());
    }
}
