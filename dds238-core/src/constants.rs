//! Protocol constants

use std::time::Duration;

/// First byte of every frame
pub const START_MARKER: u8 = 0x48;

/// Byte 3 of every frame
pub const RESERVED_BYTE: u8 = 0x01;

/// Byte positions shared by all frames
pub mod offsets {
    pub const START: usize = 0;
    pub const COMMAND: usize = 1;
    pub const MESSAGE_TYPE: usize = 2;
    pub const RESERVED: usize = 3;
    pub const SUB_COMMAND: usize = 4;
    pub const PAYLOAD: usize = 5;
}

/// Header bytes plus the trailing checksum
pub const MIN_FRAME_SIZE: usize = offsets::PAYLOAD + 1;

/// Frame sizes (bytes, checksum included)
pub mod frame_size {
    pub const GET_DATA: usize = 0x06;
    pub const SET_LIMITS: usize = 0x0C;
    pub const SET_PURCHASE: usize = 0x0F;
    pub const SET_POWER_CUT: usize = 0x07;
    pub const SET_DELAY: usize = 0x09;
    pub const SET_RESET: usize = 0x12;

    pub const RESP_POWER_CUT: usize = 0x15;
    pub const RESP_MEASUREMENT: usize = 0x43;
    pub const RESP_LIMIT_PURCHASE: usize = 0x19;
}

/// Command codes (byte 1)
pub mod command_code {
    pub const GET_DATA: u8 = 0x06;
    pub const SET_LIMITS: u8 = 0x0C;
    pub const SET_PURCHASE: u8 = 0x0F;
    pub const SET_POWER_CUT: u8 = 0x07;
    pub const SET_DELAY: u8 = 0x09;
    pub const SET_RESET: u8 = 0x12;

    pub const RESP_POWER_CUT: u8 = 0x15;
    pub const RESP_MEASUREMENT: u8 = 0x43;
    pub const RESP_LIMIT_PURCHASE: u8 = 0x19;
}

/// Sub-command codes (byte 4)
pub mod sub_command {
    pub const GET_POWER_CUT: u8 = 0x00;
    pub const GET_MEASUREMENT: u8 = 0x0A;
    pub const GET_LIMIT_PURCHASE: u8 = 0x02;
    pub const SET_LIMITS: u8 = 0x03;
    pub const SET_PURCHASE: u8 = 0x0D;
    pub const SET_POWER_CUT: u8 = 0x09;
    pub const SET_DELAY: u8 = 0x0C;
    pub const SET_RESET: u8 = 0x05;

    pub const RESP_POWER_CUT: u8 = 0x01;
    pub const RESP_MEASUREMENT: u8 = 0x0B;
    pub const RESP_LIMIT_PURCHASE: u8 = 0x08;
}

/// Minimum time between two device reads of the same record
pub const MIN_QUERY_INTERVAL: Duration = Duration::from_millis(500);

/// Default time to wait for a data response
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default time to wait for the echo of a sent frame
pub const CONFIRM_TIMEOUT: Duration = Duration::from_millis(1000);

/// Pause around byte reads, the meter is slower than the host
pub const INTER_READ_DELAY: Duration = Duration::from_millis(2);

/// Sleep between polls of the pending byte count
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default serial speed (8N1)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Longest accepted raw hex message, separators included
pub const MAX_HEX_MESSAGE_LEN: usize = 256;

/// Bytes read at most by one pass over unsolicited input
pub const MAX_INCOMING_BYTES: usize = 96;

/// Accepted ranges for write operations
pub mod limits {
    use std::ops::RangeInclusive;

    /// Current limit (A)
    pub const CURRENT: RangeInclusive<f64> = 0.0..=60.0;

    /// Voltage limits (V)
    pub const VOLTAGE: RangeInclusive<u16> = 80..=300;

    /// Delayed cut (minutes)
    pub const DELAY: RangeInclusive<u16> = 0..=1440;

    /// Purchase and alarm energy (kWh)
    pub const ENERGY: RangeInclusive<f64> = 0.0..=100_000.0;

    /// Starting cumulative energy (kWh)
    pub const STARTING_ENERGY: RangeInclusive<f64> = 0.0..=100_000.0;

    /// Price per kWh
    pub const PRICE: RangeInclusive<f64> = 0.0..=1000.0;
}
