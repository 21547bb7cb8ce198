//! Command byte values

/// Action selected by a write to the command attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    SaveNetwork = 0x01,
    Connect = 0x02,
    ClearNetworks = 0x03,
    GetStatus = 0x04,
    Disconnect = 0x05,
    StartScan = 0x06,
    GetScanResults = 0x07,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Command::SaveNetwork),
            0x02 => Ok(Command::Connect),
            0x03 => Ok(Command::ClearNetworks),
            0x04 => Ok(Command::GetStatus),
            0x05 => Ok(Command::Disconnect),
            0x06 => Ok(Command::StartScan),
            0x07 => Ok(Command::GetScanResults),
            other => Err(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}
