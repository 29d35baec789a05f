//! Error types for dds238-core

use std::fmt;

use crate::command::CommandKind;

/// Result type alias for dds238 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame header field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Start,
    Command,
    MessageType,
    SubCommand,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start marker",
            Self::Command => "command",
            Self::MessageType => "message type",
            Self::SubCommand => "sub-command",
        };
        f.write_str(name)
    }
}

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Frame is too short to hold a header and checksum
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort { expected: usize, actual: usize },

    /// Frame length does not match the declared length for its kind
    #[error("Frame length mismatch: expected {expected} bytes, got {actual} bytes")]
    LengthMismatch { expected: usize, actual: usize },

    /// A header byte does not match the expected value
    #[error("Unexpected {field}: expected 0x{expected:02X}, received 0x{actual:02X}")]
    WrongBytes {
        field: HeaderField,
        expected: u8,
        actual: u8,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// Caller supplied fewer payload bytes than the command needs
    #[error("Payload too short for {command}: expected {expected} bytes, got {actual} bytes")]
    PayloadTooShort {
        command: CommandKind,
        expected: usize,
        actual: usize,
    },

    /// Raw hex message is empty or too long
    #[error("Hex message length {len} outside 1..={max} characters")]
    HexLength { len: usize, max: usize },

    /// Raw hex message is malformed
    #[error("Malformed hex message: {0}")]
    InvalidHex(String),
}

impl Error {
    /// Classification code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ChecksumMismatch { .. } => ErrorCode::CrcError,
            Self::FrameTooShort { .. } | Self::LengthMismatch { .. } | Self::WrongBytes { .. } => {
                ErrorCode::WrongBytes
            }
            Self::HexLength { .. } => ErrorCode::FirstParameterOutOfRange,
            Self::PayloadTooShort { .. } | Self::InvalidHex(_) => ErrorCode::WrongMessage,
        }
    }

    /// Classification type for this error
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::PayloadTooShort { .. } | Self::HexLength { .. } | Self::InvalidHex(_) => {
                ErrorType::InputData
            }
            _ => ErrorType::Communication,
        }
    }
}

/// Broad category of the last failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorType {
    #[default]
    None = 0,
    Communication = 1,
    InputData = 2,
    /// Reserved, the meter never reports it
    LimitsExceeded = 3,
}

impl ErrorType {
    pub fn description(self) -> &'static str {
        match self {
            Self::None => "No error type",
            Self::Communication => "Communication",
            Self::InputData => "Input data",
            Self::LimitsExceeded => "Limits exceeded",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Precise cause of the last failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    #[default]
    NoError = 0,
    CrcError = 1,
    WrongBytes = 2,
    NotEnoughBytes = 3,
    ExceedsBytes = 4,
    Timeout = 5,
    WrongMessage = 6,
    FirstParameterOutOfRange = 7,
    SecondParameterOutOfRange = 8,
    ThirdParameterOutOfRange = 9,
}

impl ErrorCode {
    pub fn description(self) -> &'static str {
        match self {
            Self::NoError => "No errors",
            Self::CrcError => "Checksum check failed",
            Self::WrongBytes => "Bytes were received but are not correct",
            Self::NotEnoughBytes => "Not enough bytes were received",
            Self::ExceedsBytes => "Expected amount of bytes exceeded",
            Self::Timeout => "Timed out",
            Self::WrongMessage => "Message is not valid",
            Self::FirstParameterOutOfRange => "Data outside ranges, first parameter",
            Self::SecondParameterOutOfRange => "Data outside ranges, second parameter",
            Self::ThirdParameterOutOfRange => "Data outside ranges, third parameter",
        }
    }

    /// Out-of-range code for a 1-based parameter position
    pub fn out_of_range(position: u8) -> Self {
        match position {
            1 => Self::FirstParameterOutOfRange,
            2 => Self::SecondParameterOutOfRange,
            _ => Self::ThirdParameterOutOfRange,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Classified failure as kept by the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ErrorKind {
    pub error_type: ErrorType,
    pub code: ErrorCode,
}

impl ErrorKind {
    pub const NONE: Self = Self::new(ErrorType::None, ErrorCode::NoError);

    pub const fn new(error_type: ErrorType, code: ErrorCode) -> Self {
        Self { error_type, code }
    }

    pub const fn communication(code: ErrorCode) -> Self {
        Self::new(ErrorType::Communication, code)
    }

    pub const fn input_data(code: ErrorCode) -> Self {
        Self::new(ErrorType::InputData, code)
    }

    pub fn is_error(&self) -> bool {
        self.code != ErrorCode::NoError
    }
}

impl From<&Error> for ErrorKind {
    fn from(err: &Error) -> Self {
        Self::new(err.error_type(), err.code())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::ChecksumMismatch {
            expected: 0x10,
            received: 0x11,
        };
        assert_eq!(
            ErrorKind::from(&err),
            ErrorKind::communication(ErrorCode::CrcError)
        );

        let err = Error::WrongBytes {
            field: HeaderField::Command,
            expected: 0x43,
            actual: 0x15,
        };
        assert_eq!(err.code(), ErrorCode::WrongBytes);
        assert_eq!(err.error_type(), ErrorType::Communication);

        let err = Error::InvalidHex("odd digit".into());
        assert_eq!(
            ErrorKind::from(&err),
            ErrorKind::input_data(ErrorCode::WrongMessage)
        );
    }

    #[test]
    fn test_out_of_range_positions() {
        assert_eq!(ErrorCode::out_of_range(1), ErrorCode::FirstParameterOutOfRange);
        assert_eq!(ErrorCode::out_of_range(2), ErrorCode::SecondParameterOutOfRange);
        assert_eq!(ErrorCode::out_of_range(3), ErrorCode::ThirdParameterOutOfRange);
    }

    #[test]
    fn test_error_kind_display() {
        let kind = ErrorKind::communication(ErrorCode::Timeout);
        assert_eq!(kind.to_string(), "Communication: Timed out");
        assert!(kind.is_error());
        assert!(!ErrorKind::NONE.is_error());
    }
}
