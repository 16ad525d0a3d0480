//! Our error types for the accelerometer board.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Error type for accelerometer board communications.
///
/// Generic over the error type of the underlying port, so callers holding a
/// board keep access to the original I/O failure.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Failed to open serial port")]
    ConnectionFailed(I),
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Communication timeout")]
    Timeout,
    #[error("Reply exceeded the receive buffer")]
    BufferError,
    #[error("Invalid response received: {0:?}")]
    InvalidResponse(String),
    #[error("Board returned type {returned_type:?}, expected {expected_type:?}")]
    IncorrectBoard {
        returned_type: String,
        expected_type: &'static str,
    },
}

impl<I: embedded_io::Error> Error<I> {
    /// True for failures at the byte-stream level: open, write, read or timeout.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed(_) | Error::SerialError(_) | Error::Timeout | Error::BufferError
        )
    }

    /// True when a reply arrived but did not have the expected shape.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::InvalidResponse(_))
    }
}

/// Returned when exactly one board was expected.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SingularError {
    #[error("No boards of this type found")]
    NoBoards,
    #[error("Expected only one board to be connected, but found {0}")]
    MultipleBoards(usize),
}
