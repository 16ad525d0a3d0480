//! Opens real OS serial ports with the `serialport` crate.

use std::{thread, time::Duration};

use serialport::SerialPort;
use tracing::debug;

use crate::transport::{Connector, TransportConfig};

/// An OS serial port, adapted to [`embedded_io`].
pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind as Kind;
        use std::io::ErrorKind as IoKind;

        match self.0.kind() {
            IoKind::NotFound => Kind::NotFound,
            IoKind::PermissionDenied => Kind::PermissionDenied,
            IoKind::ConnectionRefused => Kind::ConnectionRefused,
            IoKind::ConnectionReset => Kind::ConnectionReset,
            IoKind::ConnectionAborted => Kind::ConnectionAborted,
            IoKind::NotConnected => Kind::NotConnected,
            IoKind::AddrInUse => Kind::AddrInUse,
            IoKind::AddrNotAvailable => Kind::AddrNotAvailable,
            IoKind::BrokenPipe => Kind::BrokenPipe,
            IoKind::AlreadyExists => Kind::AlreadyExists,
            IoKind::InvalidInput => Kind::InvalidInput,
            IoKind::InvalidData => Kind::InvalidData,
            // Reads that hit the port timeout surface as either.
            IoKind::TimedOut | IoKind::WouldBlock => Kind::TimedOut,
            IoKind::Interrupted => Kind::Interrupted,
            IoKind::Unsupported => Kind::Unsupported,
            IoKind::OutOfMemory => Kind::OutOfMemory,
            IoKind::WriteZero => Kind::WriteZero,
            _ => Kind::Other,
        }
    }
}

impl From<serialport::Error> for IoError {
    fn from(err: serialport::Error) -> Self {
        IoError(err.into())
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

/// Opens endpoints as OS serial port paths, e.g. `/dev/ttyACM0` or `COM3`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortConnector;

impl Connector for SerialPortConnector {
    type Port = PortWrapper;

    fn open(&mut self, endpoint: &str, config: &TransportConfig) -> Result<PortWrapper, IoError> {
        let port = serialport::new(endpoint, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout.to_millis().into()))
            .open()?;

        let settle_ms = config.settle_time.to_millis();
        if settle_ms > 0 {
            debug!("Waiting {} ms for {:?} to settle", settle_ms, endpoint);
            thread::sleep(Duration::from_millis(settle_ms.into()));
        }
        Ok(PortWrapper(port))
    }
}
