//! The text commands understood by the accelerometer board firmware.

use strum_macros::IntoStaticStr;

/// Every request the board accepts. Each is sent as a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
pub enum Command {
    /// Reply: `manufacturer:board_type:asset_tag:software_version`.
    #[strum(serialize = "*IDN?")]
    Identify,
    /// Reply: free-form status string.
    #[strum(serialize = "*STATUS?")]
    Status,
    /// Resets the board. Reply: free-form acknowledgement.
    #[strum(serialize = "*RESET")]
    Reset,
    /// Reply: `x:y:z` in m/s².
    #[strum(serialize = "ACC:READ?")]
    ReadAcceleration,
}

impl Command {
    /// The literal sent on the wire, without the line terminator.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
