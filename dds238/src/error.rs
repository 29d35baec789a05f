//! High-level error types

use dds238_core::{ErrorCode, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] dds238_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] dds238_transport::Error),

    /// A write parameter is outside the range the meter accepts
    #[error("Parameter {position} ({name}) out of range: {value} not in {range}")]
    OutOfRange {
        /// 1-based position in the operation's argument list
        position: u8,
        name: &'static str,
        value: String,
        range: String,
    },
}

impl Error {
    /// Session classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => ErrorKind::from(e),
            Self::Transport(e) => e.kind(),
            Self::OutOfRange { position, .. } => {
                ErrorKind::input_data(ErrorCode::out_of_range(*position))
            }
        }
    }
}
