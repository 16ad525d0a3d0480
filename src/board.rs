//! The accelerometer board handle.
//!
//! An [`AccelerometerBoard`] only exists once the board on the other end of its
//! serial port has identified itself as an accelerometer. Constructing one walks
//! through [`BoardState`]: `Connecting`, `Identifying`, then `Verified` or
//! `Rejected`. A rejected board is never returned.
//!
//! Dropping a board resets it. Owners that need the reset to happen at process
//! exit should keep the board alive until then.

use core::fmt;

use embedded_io::{Read, Write};
use strum_macros::Display;
use tracing::{debug, warn};

use crate::{
    command::Command,
    error::{Error, Result},
    identity::{self, BoardIdentity},
    transport::{Connector, SerialWrapper, TransportConfig},
};

/// The only `board_type` this crate accepts in an `*IDN?` reply.
pub const BOARD_TYPE: &str = "Accelerometer";
/// Manufacturer used for placeholder identities of simulated boards.
pub const SIMULATOR_MANUFACTURER: &str = "sbot_simulator";
/// Board type used for placeholder identities of user specified ports.
pub const MANUAL_BOARD_TYPE: &str = "manual";

/// Progress of connecting to a candidate board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BoardState {
    Connecting,
    Identifying,
    Verified,
    Rejected,
}

/// How a candidate port was found, judged from its placeholder identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    /// Given explicitly by the user.
    Manual,
    /// Announced by the simulator.
    Simulator,
    /// Found by enumerating ports, or no placeholder identity at all.
    Discovered,
}

impl CandidateOrigin {
    pub fn of(initial_identity: Option<&BoardIdentity>) -> Self {
        match initial_identity {
            Some(identity) if identity.board_type == MANUAL_BOARD_TYPE => Self::Manual,
            Some(identity) if identity.manufacturer == SIMULATOR_MANUFACTURER => Self::Simulator,
            _ => Self::Discovered,
        }
    }
}

/// A connected, verified accelerometer board.
pub struct AccelerometerBoard<P: Read + Write, const L: usize = 128> {
    serial: SerialWrapper<P, L>,
    identity: BoardIdentity,
}

impl<P: Read + Write, const L: usize> AccelerometerBoard<P, L> {
    /// The literal `Accelerometer`.
    pub fn board_type() -> &'static str {
        BOARD_TYPE
    }

    /// Open `endpoint` and verify an accelerometer board is on the other end.
    ///
    /// `initial_identity` is what discovery knew about the port before talking
    /// to it. It is only used for logging until the board identifies itself.
    pub fn connect<C: Connector<Port = P>>(
        connector: &mut C,
        endpoint: &str,
        initial_identity: Option<BoardIdentity>,
        config: &TransportConfig,
    ) -> Result<Self, P::Error> {
        log_state(endpoint, BoardState::Connecting);
        let serial = SerialWrapper::open(
            connector,
            endpoint,
            config,
            initial_identity.unwrap_or_default(),
        )
        .inspect_err(|_| log_state(endpoint, BoardState::Rejected))?;
        Self::new(serial)
    }

    /// Verify the board behind an already open transport.
    pub fn new(mut serial: SerialWrapper<P, L>) -> Result<Self, P::Error> {
        log_state(serial.endpoint(), BoardState::Identifying);
        let identity = match identity::identify(&mut serial) {
            Ok(identity) => identity,
            Err(err) => {
                log_state(serial.endpoint(), BoardState::Rejected);
                return Err(err);
            }
        };

        if identity.board_type != BOARD_TYPE {
            log_state(serial.endpoint(), BoardState::Rejected);
            return Err(Error::IncorrectBoard {
                returned_type: identity.board_type,
                expected_type: BOARD_TYPE,
            });
        }

        serial.set_identity(identity.clone());
        log_state(serial.endpoint(), BoardState::Verified);
        Ok(Self { serial, identity })
    }

    /// Try to connect to a board, returning `None` if it can't be identified.
    ///
    /// Never fails: every error is logged as a warning and the device ignored.
    pub fn get_valid_board<C: Connector<Port = P>>(
        connector: &mut C,
        endpoint: &str,
        initial_identity: Option<BoardIdentity>,
        config: &TransportConfig,
    ) -> Option<Self> {
        let origin = CandidateOrigin::of(initial_identity.as_ref());
        let err = match Self::connect(connector, endpoint, initial_identity, config) {
            Ok(board) => return Some(board),
            Err(err) => err,
        };

        match (&err, origin) {
            (
                Error::IncorrectBoard {
                    returned_type,
                    expected_type,
                },
                _,
            ) => warn!(
                "Board returned type {:?}, expected {:?}. Ignoring this device",
                returned_type, expected_type
            ),
            (_, CandidateOrigin::Manual) => warn!(
                error = %err,
                "Manually specified accelerometer board at port {:?} could not be identified. Ignoring this device",
                endpoint
            ),
            (_, CandidateOrigin::Simulator) => warn!(
                error = %err,
                "Simulator specified accelerometer board at port {:?} could not be identified. Ignoring this device",
                endpoint
            ),
            (_, CandidateOrigin::Discovered) => warn!(
                error = %err,
                "Found accelerometer board-like serial port at {:?}, but it could not be identified. Ignoring this device",
                endpoint
            ),
        }
        None
    }

    /// Ask the board to identify itself again.
    ///
    /// The cached identity returned by [`Self::identity`] is left untouched.
    pub fn identify(&mut self) -> Result<BoardIdentity, P::Error> {
        debug!("Calling identify on {}", self);
        let identity = identity::identify(&mut self.serial)?;
        debug!("identify returned {:?}", identity);
        Ok(identity)
    }

    /// The identity the board reported when it was connected.
    pub fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    pub fn endpoint(&self) -> &str {
        self.serial.endpoint()
    }

    /// Get the status of the board, as reported by its firmware.
    pub fn status(&mut self) -> Result<String, P::Error> {
        self.query(Command::Status)
    }

    /// Reset the board. Returns the board's acknowledgement.
    ///
    /// Safe to repeat.
    pub fn reset(&mut self) -> Result<String, P::Error> {
        self.query(Command::Reset)
    }

    /// Read the acceleration on the X, Y and Z axes in m/s².
    pub fn acceleration(&mut self) -> Result<(f64, f64, f64), P::Error> {
        let reply = self.query(Command::ReadAcceleration)?;
        parse_acceleration(&reply).ok_or(Error::InvalidResponse(reply))
    }

    fn query(&mut self, command: Command) -> Result<String, P::Error> {
        debug!("Calling {} on {}", command, self);
        let reply = self.serial.query(command)?;
        debug!("{} returned {:?}", command, reply);
        Ok(reply)
    }
}

impl<P: Read + Write, const L: usize> Drop for AccelerometerBoard<P, L> {
    fn drop(&mut self) {
        if let Err(err) = self.reset() {
            warn!(
                error = %err,
                "Failed to cleanup accelerometer board {}.",
                self.identity.asset_tag
            );
        }
    }
}

impl<P: Read + Write, const L: usize> fmt::Display for AccelerometerBoard<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<AccelerometerBoard: {}>", self.serial)
    }
}

fn log_state(endpoint: &str, state: BoardState) {
    debug!(endpoint, %state, "Board state changed");
}

/// Parse an `x:y:z` reply. Exactly three numeric fields are required.
fn parse_acceleration(reply: &str) -> Option<(f64, f64, f64)> {
    let fields: Vec<&str> = reply.split(':').collect();
    match fields.as_slice() {
        [x, y, z] => Some((
            x.trim().parse().ok()?,
            y.trim().parse().ok()?,
            z.trim().parse().ok()?,
        )),
        _ => None,
    }
}
