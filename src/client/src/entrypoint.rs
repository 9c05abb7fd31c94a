use std::{fs, path::Path, str::FromStr, time::Duration};

use common::error::{Error, Result};
use serde::Deserialize;
use tracing::{info, Level};

use crate::{
    channel::{Channel, SerialChannel},
    service::{
        protocol::{SessionProtocol, DEFAULT_RESPONSE_DELIMITER},
        session::DEFAULT_PLAYER_ONE_TAG,
    },
};

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Longest wait for the next response byte. Absent means wait forever.
    pub read_timeout_ms: Option<u64>,
    pub player_one_tag: String,
    pub response_delimiter: String,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            port: String::new(),
            baud_rate: 9600,
            read_timeout_ms: None,
            player_one_tag: DEFAULT_PLAYER_ONE_TAG.to_owned(),
            response_delimiter: DEFAULT_RESPONSE_DELIMITER.to_owned(),
            log_level: "debug".to_owned(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("invalid config: {e}"), None))?;
        if config.port.is_empty() {
            return Err(Error::protocol("invalid config: port is required", None));
        }
        if Level::from_str(&config.log_level).is_err() {
            return Err(Error::protocol(
                "invalid config: unknown log_level",
                Some(&config.log_level),
            ));
        }
        Ok(config)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Opens the configured serial device and wraps it in a protocol session.
pub fn connect(config: &ClientConfig) -> Result<SessionProtocol<SerialChannel>> {
    let mut channel = SerialChannel::new(&config.port, config.baud_rate, config.read_timeout());
    channel.open()?;
    info!("Connected to peer on {}", config.port);
    Ok(SessionProtocol::with_delimiter(
        channel,
        config.response_delimiter.clone(),
    ))
}
