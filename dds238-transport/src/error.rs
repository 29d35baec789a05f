//! Transport errors

use std::io;

use dds238_core::{ErrorCode, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel not open")]
    NotOpen,

    #[error("Channel already open")]
    AlreadyOpen,

    #[error("No response within {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("Not enough bytes: expected {expected}, received {received}")]
    NotEnoughBytes { expected: usize, received: usize },

    #[error("Too many bytes: expected {expected}, {available} pending")]
    ExceedsBytes { expected: usize, available: usize },

    #[error("Invalid frame: {0}")]
    Frame(#[from] dds238_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

impl Error {
    /// Classify this error for the session
    ///
    /// Failures of the channel itself are reported as timeouts, the device
    /// did not answer as far as the protocol is concerned.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Frame(e) => ErrorKind::from(e),
            Self::NotEnoughBytes { .. } => ErrorKind::communication(ErrorCode::NotEnoughBytes),
            Self::ExceedsBytes { .. } => ErrorKind::communication(ErrorCode::ExceedsBytes),
            Self::Timeout { .. }
            | Self::NotOpen
            | Self::AlreadyOpen
            | Self::Io(_)
            | Self::InvalidPort(_) => ErrorKind::communication(ErrorCode::Timeout),
        }
    }
}

impl From<tokio_serial::Error> for Error {
    fn from(e: tokio_serial::Error) -> Self {
        Self::Io(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dds238_core::ErrorType;

    #[test]
    fn test_error_kind() {
        let err = Error::NotEnoughBytes {
            expected: 21,
            received: 4,
        };
        assert_eq!(err.kind(), ErrorKind::communication(ErrorCode::NotEnoughBytes));

        let err = Error::Frame(dds238_core::Error::ChecksumMismatch {
            expected: 0x10,
            received: 0x11,
        });
        assert_eq!(err.kind(), ErrorKind::communication(ErrorCode::CrcError));

        let err = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(err.kind().error_type, ErrorType::Communication);
        assert_eq!(err.kind().code, ErrorCode::Timeout);
        assert_eq!(Error::NotOpen.kind().code, ErrorCode::Timeout);
    }
}
