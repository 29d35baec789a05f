//! DDS238 command and response definitions

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::constants::{command_code, frame_size, sub_command, MIN_FRAME_SIZE};
use crate::frame::Frame;

/// Message type code (byte 2)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Data sent by the meter
    Response = 0x01,

    /// Frame sent by the host, also used by the meter's echo
    Send = 0x02,
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> u8 {
        kind as u8
    }
}

/// Outbound command kinds
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommandKind {
    GetPowerCut,
    GetMeasurement,
    GetLimitPurchase,
    SetLimits,
    SetPurchase,
    SetPowerCut,
    SetDelay,
    SetReset,
}

impl CommandKind {
    pub const ALL: [CommandKind; 8] = [
        Self::GetPowerCut,
        Self::GetMeasurement,
        Self::GetLimitPurchase,
        Self::SetLimits,
        Self::SetPurchase,
        Self::SetPowerCut,
        Self::SetDelay,
        Self::SetReset,
    ];

    /// Command code (byte 1)
    pub fn code(self) -> u8 {
        match self {
            Self::GetPowerCut | Self::GetMeasurement | Self::GetLimitPurchase => {
                command_code::GET_DATA
            }
            Self::SetLimits => command_code::SET_LIMITS,
            Self::SetPurchase => command_code::SET_PURCHASE,
            Self::SetPowerCut => command_code::SET_POWER_CUT,
            Self::SetDelay => command_code::SET_DELAY,
            Self::SetReset => command_code::SET_RESET,
        }
    }

    /// Sub-command code (byte 4)
    pub fn sub_code(self) -> u8 {
        match self {
            Self::GetPowerCut => sub_command::GET_POWER_CUT,
            Self::GetMeasurement => sub_command::GET_MEASUREMENT,
            Self::GetLimitPurchase => sub_command::GET_LIMIT_PURCHASE,
            Self::SetLimits => sub_command::SET_LIMITS,
            Self::SetPurchase => sub_command::SET_PURCHASE,
            Self::SetPowerCut => sub_command::SET_POWER_CUT,
            Self::SetDelay => sub_command::SET_DELAY,
            Self::SetReset => sub_command::SET_RESET,
        }
    }

    /// Total frame length, checksum included
    pub fn frame_len(self) -> usize {
        match self {
            Self::GetPowerCut | Self::GetMeasurement | Self::GetLimitPurchase => {
                frame_size::GET_DATA
            }
            Self::SetLimits => frame_size::SET_LIMITS,
            Self::SetPurchase => frame_size::SET_PURCHASE,
            Self::SetPowerCut => frame_size::SET_POWER_CUT,
            Self::SetDelay => frame_size::SET_DELAY,
            Self::SetReset => frame_size::SET_RESET,
        }
    }

    /// Payload length
    pub fn payload_len(self) -> usize {
        self.frame_len() - MIN_FRAME_SIZE
    }

    /// Data response the meter sends after echoing this command
    pub fn reply(self) -> ResponseKind {
        match self {
            Self::GetPowerCut | Self::SetPowerCut | Self::SetDelay => ResponseKind::PowerCut,
            Self::GetMeasurement | Self::SetReset => ResponseKind::Measurement,
            Self::GetLimitPurchase | Self::SetLimits | Self::SetPurchase => {
                ResponseKind::LimitPurchase
            }
        }
    }

    pub fn is_query(self) -> bool {
        self.code() == command_code::GET_DATA
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GetPowerCut => "GET_POWER_CUT",
            Self::GetMeasurement => "GET_MEASUREMENT",
            Self::GetLimitPurchase => "GET_LIMIT_PURCHASE",
            Self::SetLimits => "SET_LIMITS",
            Self::SetPurchase => "SET_PURCHASE",
            Self::SetPowerCut => "SET_POWER_CUT",
            Self::SetDelay => "SET_DELAY",
            Self::SetReset => "SET_RESET",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X}/0x{:02X})", self.name(), self.code(), self.sub_code())
    }
}

/// Inbound data response kinds
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    PowerCut,
    Measurement,
    LimitPurchase,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 3] = [Self::PowerCut, Self::Measurement, Self::LimitPurchase];

    /// Command code (byte 1)
    pub fn code(self) -> u8 {
        match self {
            Self::PowerCut => command_code::RESP_POWER_CUT,
            Self::Measurement => command_code::RESP_MEASUREMENT,
            Self::LimitPurchase => command_code::RESP_LIMIT_PURCHASE,
        }
    }

    /// Sub-command code (byte 4)
    pub fn sub_code(self) -> u8 {
        match self {
            Self::PowerCut => sub_command::RESP_POWER_CUT,
            Self::Measurement => sub_command::RESP_MEASUREMENT,
            Self::LimitPurchase => sub_command::RESP_LIMIT_PURCHASE,
        }
    }

    /// Total frame length, checksum included
    pub fn frame_len(self) -> usize {
        match self {
            Self::PowerCut => frame_size::RESP_POWER_CUT,
            Self::Measurement => frame_size::RESP_MEASUREMENT,
            Self::LimitPurchase => frame_size::RESP_LIMIT_PURCHASE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PowerCut => "RESP_POWER_CUT",
            Self::Measurement => "RESP_MEASUREMENT",
            Self::LimitPurchase => "RESP_LIMIT_PURCHASE",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X}/0x{:02X})", self.name(), self.code(), self.sub_code())
    }
}

/// A command with its already scaled parameters
///
/// # Examples
///
/// ```
/// use dds238_core::{Command, CommandKind};
///
/// let command = Command::SetDelay { minutes: 90, enabled: true };
/// let frame = command.to_frame();
///
/// assert_eq!(frame.len(), CommandKind::SetDelay.frame_len());
/// assert_eq!(&frame.payload()[..], &[0x00, 0x5A, 0x01]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetPowerCut,
    GetMeasurement,
    GetLimitPurchase,
    SetLimits {
        /// Current limit in hundredths of an ampere
        max_current: u16,
        max_voltage: u16,
        min_voltage: u16,
    },
    SetPurchase {
        /// Purchased energy in hundredths of a kWh
        purchase: u32,
        /// Alarm threshold in hundredths of a kWh
        alarm: u32,
        enabled: bool,
    },
    SetPowerCut {
        cut: bool,
    },
    SetDelay {
        minutes: u16,
        enabled: bool,
    },
    Reset,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::GetPowerCut => CommandKind::GetPowerCut,
            Self::GetMeasurement => CommandKind::GetMeasurement,
            Self::GetLimitPurchase => CommandKind::GetLimitPurchase,
            Self::SetLimits { .. } => CommandKind::SetLimits,
            Self::SetPurchase { .. } => CommandKind::SetPurchase,
            Self::SetPowerCut { .. } => CommandKind::SetPowerCut,
            Self::SetDelay { .. } => CommandKind::SetDelay,
            Self::Reset => CommandKind::SetReset,
        }
    }

    /// Encode the payload, big-endian
    pub fn payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.kind().payload_len());

        match *self {
            Self::GetPowerCut | Self::GetMeasurement | Self::GetLimitPurchase => {}
            Self::SetLimits {
                max_current,
                max_voltage,
                min_voltage,
            } => {
                buf.put_u16(max_current);
                buf.put_u16(max_voltage);
                buf.put_u16(min_voltage);
            }
            Self::SetPurchase {
                purchase,
                alarm,
                enabled,
            } => {
                buf.put_u32(purchase);
                buf.put_u32(alarm);
                buf.put_u8(enabled as u8);
            }
            // The meter expects 0 to open the relay
            Self::SetPowerCut { cut } => buf.put_u8(!cut as u8),
            Self::SetDelay { minutes, enabled } => {
                buf.put_u16(minutes);
                buf.put_u8(enabled as u8);
            }
            Self::Reset => buf.put_bytes(0, CommandKind::SetReset.payload_len()),
        }

        buf
    }

    /// Build the complete frame for this command
    pub fn to_frame(&self) -> Frame {
        Frame::assemble(self.kind(), &self.payload())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}
