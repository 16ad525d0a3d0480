//! This crate finds and talks to accelerometer boards attached to a robot over
//! serial (USB virtual COM) ports, or emulated by the robot simulator.
//!
//! Boards speak a line-based text protocol:
//!
//! | Command     | Reply                                         |
//! |-------------|-----------------------------------------------|
//! | `*IDN?`     | `manufacturer:board_type:asset_tag:sw_version` |
//! | `*STATUS?`  | free-form status                              |
//! | `*RESET`    | free-form acknowledgement                     |
//! | `ACC:READ?` | `x:y:z` in m/s²                               |
//!
//! [`discovery::Discovery`] sweeps candidate ports, keeps those that identify
//! as `Accelerometer`, and returns them keyed by asset tag. Ports that can't be
//! identified are logged with `tracing` and skipped.
//!
//! Any port implementing [`embedded_io::Read`] & [`embedded_io::Write`] can be
//! used. With the `serialport` feature, [`serial::SerialPortConnector`] opens
//! OS serial ports and [`usb::usb_candidates`] enumerates USB boards.
//!
//! The serial port should be configured like so:
//! * Default baud rate: 115200 (ignored by USB devices)
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

pub mod board;
pub mod command;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod transport;

#[cfg(feature = "serialport")]
pub mod serial;
#[cfg(feature = "serialport")]
pub mod usb;

#[cfg(test)]
mod mock_serial;
