//! Line-oriented request/response transport over a serial port.
//!
//! Every request is a single line terminated by `\n`, and every request gets
//! exactly one reply line back.

use core::fmt;

use embedded_io::{Error as _, ErrorKind, Read, Write};
use fugit::MillisDurationU32;
use tracing::{debug, error, info, trace, warn};

use crate::{
    command::Command,
    error::{Error, Result},
    identity::BoardIdentity,
};

/// Default baud rate. USB virtual COM ports ignore it.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Settings used when opening a serial endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub baud_rate: u32,
    /// How long a single read may block waiting for reply bytes.
    ///
    /// Also bounds the reset sent when a board is dropped.
    pub timeout: MillisDurationU32,
    /// Delay after opening the port before the first command is sent.
    pub settle_time: MillisDurationU32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: MillisDurationU32::millis(500),
            settle_time: MillisDurationU32::millis(0),
        }
    }
}

impl TransportConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_settle_time(mut self, settle_time: MillisDurationU32) -> Self {
        self.settle_time = settle_time;
        self
    }
}

/// Opens serial endpoints by name.
///
/// Implemented for real OS serial ports behind the `serialport` feature, and
/// by whatever the simulator or tests provide.
pub trait Connector {
    type Port: Read + Write;

    /// Open `endpoint`, applying the baud rate and timeout from `config`.
    fn open(
        &mut self,
        endpoint: &str,
        config: &TransportConfig,
    ) -> core::result::Result<Self::Port, <Self::Port as embedded_io::ErrorType>::Error>;
}

/// A connected serial port plus the identity of the board behind it.
///
/// `L` is the largest reply line accepted, in bytes.
pub struct SerialWrapper<P: Read + Write, const L: usize = 128> {
    port: P,
    endpoint: String,
    identity: BoardIdentity,
    /// Set when a reply was not read to its terminator. Whatever is left of
    /// it must be discarded before the next request.
    out_of_sync: bool,
}

impl<P: Read + Write, const L: usize> SerialWrapper<P, L> {
    /// Wrap an already opened port.
    pub fn new(port: P, endpoint: impl Into<String>, identity: BoardIdentity) -> Self {
        Self {
            port,
            endpoint: endpoint.into(),
            identity,
            out_of_sync: false,
        }
    }

    /// Open `endpoint` through `connector`.
    pub fn open<C: Connector<Port = P>>(
        connector: &mut C,
        endpoint: &str,
        config: &TransportConfig,
        identity: BoardIdentity,
    ) -> Result<Self, P::Error> {
        match connector.open(endpoint, config) {
            Ok(port) => {
                info!(
                    "Connected to board {}:{}",
                    identity.board_type, identity.asset_tag
                );
                Ok(Self::new(port, endpoint, identity))
            }
            Err(err) => {
                error!(
                    "Failed to connect to board {}:{} at {:?}",
                    identity.board_type, identity.asset_tag, endpoint
                );
                Err(Error::ConnectionFailed(err))
            }
        }
    }

    /// Send `command` and return the reply line with surrounding whitespace removed.
    pub fn query(&mut self, command: Command) -> Result<String, P::Error> {
        if self.out_of_sync {
            self.discard_input()?;
        }

        let request = command.as_str();
        trace!("Serial write - {:?}", request);

        self.port
            .write_all(request.as_bytes())
            .map_err(Error::SerialError)?;
        self.port.write_all(b"\n").map_err(Error::SerialError)?;
        self.port.flush().map_err(Error::SerialError)?;

        let reply = self.read_line()?;
        trace!("Serial read  - {:?}", reply);
        Ok(reply)
    }

    /// Read up to the next `\n`, one byte at a time so nothing past the
    /// terminator is consumed.
    fn read_line(&mut self) -> Result<String, P::Error> {
        let mut line: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(self.timed_out()),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    if line.push(byte[0]).is_err() {
                        self.out_of_sync = true;
                        return Err(Error::BufferError);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut) => {
                    return Err(self.timed_out());
                }
                Err(e) => return Err(Error::SerialError(e)),
            }
        }

        match core::str::from_utf8(&line) {
            Ok(text) => Ok(text.trim().to_owned()),
            Err(_) => Err(Error::InvalidResponse(
                String::from_utf8_lossy(&line).into_owned(),
            )),
        }
    }

    /// Read and drop pending input until the port has nothing more to give.
    fn discard_input(&mut self) -> Result<(), P::Error> {
        let mut scratch = [0u8; 16];
        let mut discarded = 0usize;
        loop {
            match self.port.read(&mut scratch) {
                Ok(0) => break,
                Ok(read) => discarded += read,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut) => break,
                Err(e) => return Err(Error::SerialError(e)),
            }
        }
        if discarded > 0 {
            debug!("Discarded {} stale bytes from {:?}", discarded, self.endpoint);
        }
        self.out_of_sync = false;
        Ok(())
    }

    fn timed_out(&mut self) -> Error<P::Error> {
        self.out_of_sync = true;
        warn!(
            "Connection to board {}:{} timed out waiting for response",
            self.identity.board_type, self.identity.asset_tag
        );
        Error::Timeout
    }

    /// Replace the cached identity, e.g. once the board has identified itself.
    pub fn set_identity(&mut self, identity: BoardIdentity) {
        self.identity = identity;
    }

    pub fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<P: Read + Write, const L: usize> fmt::Display for SerialWrapper<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<SerialWrapper {:?} {:?}>",
            self.endpoint, self.identity.asset_tag
        )
    }
}
