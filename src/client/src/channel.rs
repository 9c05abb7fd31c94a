use std::{
    io::{self, Read, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use common::error::{Error, Result};
use serialport::SerialPort;
use tracing::{debug, info, warn};

// How long a single device read may block before we re-check the abort flag
// and the read deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raw duplex byte connection to the device.
///
/// Implementations are used from one thread at a time; the only cross-thread
/// operation is aborting a blocked read through an [`AbortHandle`].
pub trait Channel {
    /// Establishes the connection. Calling it on an open channel does nothing.
    fn open(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Sends every byte or fails.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Blocks until at least one byte is available and returns how many were
    /// read into `buffer`. End of stream is [`Error::PeerDisconnected`].
    fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize>;

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_chunk(&mut byte)?;
        Ok(byte[0])
    }

    /// Releases the connection. Never fails and may be called repeatedly,
    /// including after a failed `open`.
    fn close(&mut self);
}

/// Cancels a read blocked on a [`SerialChannel`] from another thread.
///
/// An abort is consumed by the read it cancels; the channel stays open and
/// the next read waits for data again.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);
impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// [`Channel`] over a named serial device.
pub struct SerialChannel {
    port: String,
    baud_rate: u32,
    read_timeout: Option<Duration>,
    // Independent handles onto the same device, closed separately.
    reader: Option<Box<dyn SerialPort>>,
    writer: Option<Box<dyn SerialPort>>,
    abort: AbortHandle,
}

impl SerialChannel {
    /// `read_timeout` bounds how long a read waits for the next byte;
    /// `None` waits forever.
    pub fn new(port: impl Into<String>, baud_rate: u32, read_timeout: Option<Duration>) -> Self {
        SerialChannel {
            port: port.into(),
            baud_rate,
            read_timeout,
            reader: None,
            writer: None,
            abort: AbortHandle::default(),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn timed_out() -> Error {
        Error::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "no data received from peer within the read timeout",
        ))
    }
}

impl Channel for SerialChannel {
    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let reader = serialport::new(&self.port, self.baud_rate)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(|e| Error::connection(&self.port, e))?;
        // If cloning fails, `reader` is dropped here and the device released.
        let writer = reader
            .try_clone()
            .map_err(|e| Error::connection(&self.port, e))?;

        self.abort.reset();
        self.reader = Some(reader);
        self.writer = Some(writer);
        info!("Opened serial channel {} at {} baud", self.port, self.baud_rate);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.reader.is_some() && self.writer.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "channel is not open").into());
        };
        writer.write_all(bytes)?;
        writer.flush()?;
        debug!("Wrote {} bytes to {}", bytes.len(), self.port);
        Ok(())
    }

    fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let deadline = self.read_timeout.map(|timeout| Instant::now() + timeout);
        loop {
            if self.abort.take() {
                debug!("Read on {} aborted", self.port);
                return Err(Error::PeerDisconnected);
            }
            let Some(reader) = self.reader.as_mut() else {
                return Err(Error::PeerDisconnected);
            };
            match reader.read(buffer) {
                Ok(0) => return Err(Error::PeerDisconnected),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Err(Self::timed_out());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(&mut self) {
        self.abort.abort();
        let was_open = self.reader.is_some() || self.writer.is_some();
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush {} while closing: {}", self.port, e);
            }
        }
        // Dropping the handles closes them.
        self.reader.take();
        if was_open {
            info!("Closed serial channel {}", self.port);
        }
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}
