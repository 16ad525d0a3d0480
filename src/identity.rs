//! Board identity values and the `*IDN?` identification exchange.

use core::{fmt, str::FromStr};

use thiserror::Error;

use crate::{
    command::Command,
    error::{Error, Result},
    transport::SerialWrapper,
};

/// Who a board says it is.
///
/// Discovery builds a placeholder identity before contacting a port (from the
/// simulator or USB descriptor, or the literal `manual` board type). Once a
/// board has answered `*IDN?` the parsed reply replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BoardIdentity {
    pub manufacturer: String,
    pub board_type: String,
    /// Serial number of the board. Used as the key of discovered boards.
    pub asset_tag: String,
    pub software_version: String,
}

impl BoardIdentity {
    pub fn new(
        manufacturer: impl Into<String>,
        board_type: impl Into<String>,
        asset_tag: impl Into<String>,
        software_version: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            board_type: board_type.into(),
            asset_tag: asset_tag.into(),
            software_version: software_version.into(),
        }
    }
}

impl fmt::Display for BoardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.manufacturer, self.board_type, self.asset_tag, self.software_version
        )
    }
}

/// The reply did not contain exactly four `:` separated fields.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("expected 4 identity fields, found {0}")]
pub struct ParseIdentityError(pub usize);

impl FromStr for BoardIdentity {
    type Err = ParseIdentityError;

    fn from_str(reply: &str) -> core::result::Result<Self, Self::Err> {
        let fields: Vec<&str> = reply.split(':').collect();
        match fields.as_slice() {
            [manufacturer, board_type, asset_tag, software_version] => Ok(Self::new(
                *manufacturer,
                *board_type,
                *asset_tag,
                *software_version,
            )),
            _ => Err(ParseIdentityError(fields.len())),
        }
    }
}

/// Ask the board on the other end of `serial` who it is.
///
/// No retries. A transport failure or a malformed reply is returned to the
/// caller as is.
pub fn identify<P, const L: usize>(serial: &mut SerialWrapper<P, L>) -> Result<BoardIdentity, P::Error>
where
    P: embedded_io::Read + embedded_io::Write,
{
    let reply = serial.query(Command::Identify)?;
    reply
        .parse::<BoardIdentity>()
        .map_err(|_| Error::InvalidResponse(reply))
}
