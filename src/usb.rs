//! Enumerating real boards attached over USB.
//!
//! Ports are matched on USB vendor and product id. The USB descriptor strings
//! become the placeholder identity used until the board answers `*IDN?`.

use serialport::{SerialPortType, UsbPortInfo};
use tracing::debug;

use crate::{discovery::Candidate, identity::BoardIdentity};

/// Every serial port whose USB descriptor matches `vid`/`pid`.
pub fn usb_candidates(vid: u16, pid: u16) -> Result<Vec<Candidate>, serialport::Error> {
    let ports = serialport::available_ports()?;
    let candidates: Vec<Candidate> = ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            SerialPortType::UsbPort(info) if info.vid == vid && info.pid == pid => {
                Some(Candidate::new(port.port_name, Some(usb_identity(&info))))
            }
            _ => None,
        })
        .collect();
    debug!(
        "Found {} USB serial ports matching {:04x}:{:04x}",
        candidates.len(),
        vid,
        pid
    );
    Ok(candidates)
}

/// Build an identity from the USB descriptor, using empty strings for
/// anything the device doesn't report.
pub fn usb_identity(info: &UsbPortInfo) -> BoardIdentity {
    BoardIdentity {
        manufacturer: info.manufacturer.clone().unwrap_or_default(),
        board_type: info.product.clone().unwrap_or_default(),
        asset_tag: info.serial_number.clone().unwrap_or_default(),
        software_version: String::new(),
    }
}
