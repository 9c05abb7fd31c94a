use common::error::{Error, Result};
use tracing::{debug, warn};

use crate::channel::Channel;

pub const LINE_TERMINATOR: &str = "\n";

/// Message framing on top of a [`Channel`]: newline-terminated frames out,
/// delimiter-terminated frames in.
pub struct FramedTransport<C: Channel> {
    channel: C,
}

impl<C: Channel> FramedTransport<C> {
    pub fn new(channel: C) -> Self {
        FramedTransport { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn send_line(&mut self, payload: &str) -> Result<()> {
        let frame = format!("{payload}{LINE_TERMINATOR}");
        debug!("Sending frame {:?}", frame);
        self.channel.write(frame.as_bytes())
    }

    /// Reads one byte at a time until the accumulated bytes end with
    /// `delimiter`, then returns everything before it, trimmed.
    ///
    /// Bytes after the delimiter are left unread in the channel. If the
    /// stream ends first this fails with [`Error::PeerDisconnected`]; a
    /// partial frame is never returned.
    pub fn receive_until(&mut self, delimiter: &str) -> Result<String> {
        if delimiter.is_empty() {
            return Err(Error::invalid_state("frame delimiter must not be empty"));
        }
        let delimiter = delimiter.as_bytes();
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let byte = self.channel.read_byte().inspect_err(|e| {
                if !buffer.is_empty() {
                    warn!("Dropping {} bytes of incomplete frame: {}", buffer.len(), e);
                }
            })?;
            buffer.push(byte);
            if buffer.ends_with(delimiter) {
                break;
            }
        }
        buffer.truncate(buffer.len() - delimiter.len());

        let payload = String::from_utf8(buffer).map_err(|e| {
            Error::protocol(
                "frame is not valid text",
                Some(String::from_utf8_lossy(e.as_bytes()).as_ref()),
            )
        })?;
        let payload = payload.trim().to_owned();
        debug!("Received frame {:?}", payload);
        Ok(payload)
    }

    pub fn close(&mut self) {
        self.channel.close();
    }
}
