//! Response validation
//!
//! Every byte sequence read from the meter goes through [`validate`] before
//! any field is looked at. A frame is either accepted whole or rejected.

use bytes::Bytes;
use tracing::trace;

use crate::{
    checksum,
    command::{MessageType, ResponseKind},
    constants::{offsets, MIN_FRAME_SIZE, START_MARKER},
    error::{Error, HeaderField, Result},
    frame::Frame,
};

/// Check header fields and checksum of a received frame
///
/// Header bytes are checked in frame order (start marker, command, type,
/// sub-command) and the first mismatch is reported as [`Error::WrongBytes`].
/// The checksum is only checked once the header matches.
pub fn validate(
    bytes: &[u8],
    command: u8,
    sub_command: u8,
    msg_type: MessageType,
) -> Result<()> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(Error::FrameTooShort {
            expected: MIN_FRAME_SIZE,
            actual: bytes.len(),
        });
    }

    let header = [
        (HeaderField::Start, offsets::START, START_MARKER),
        (HeaderField::Command, offsets::COMMAND, command),
        (HeaderField::MessageType, offsets::MESSAGE_TYPE, msg_type.into()),
        (HeaderField::SubCommand, offsets::SUB_COMMAND, sub_command),
    ];

    for (field, offset, expected) in header {
        let actual = bytes[offset];
        if actual != expected {
            return Err(Error::WrongBytes {
                field,
                expected,
                actual,
            });
        }
    }

    let expected = checksum::calculate(bytes);
    let received = bytes[bytes.len() - 1];
    if expected != received {
        return Err(Error::ChecksumMismatch { expected, received });
    }

    trace!(
        command = format!("0x{:02X}", command),
        sub_command = format!("0x{:02X}", sub_command),
        len = bytes.len(),
        "Frame validated"
    );

    Ok(())
}

/// What the next frame from the meter must look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub len: usize,
    pub command: u8,
    pub sub_command: u8,
    pub msg_type: MessageType,
}

impl Expectation {
    /// Data response of the given kind
    pub fn response(kind: ResponseKind) -> Self {
        Self {
            len: kind.frame_len(),
            command: kind.code(),
            sub_command: kind.sub_code(),
            msg_type: MessageType::Response,
        }
    }

    /// The meter's echo of a frame we sent
    pub fn echo(frame: &Frame) -> Self {
        Self {
            len: frame.len(),
            command: frame.command(),
            sub_command: frame.sub_command(),
            msg_type: MessageType::Send,
        }
    }

    /// Echo expectation for an arbitrary raw frame
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooShort`] when `bytes` has no room for a header.
    pub fn echo_of(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_SIZE {
            return Err(Error::FrameTooShort {
                expected: MIN_FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            len: bytes.len(),
            command: bytes[offsets::COMMAND],
            sub_command: bytes[offsets::SUB_COMMAND],
            msg_type: MessageType::Send,
        })
    }

    /// Validate `bytes` against this expectation, length included
    pub fn check(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.len {
            return Err(Error::LengthMismatch {
                expected: self.len,
                actual: bytes.len(),
            });
        }

        validate(bytes, self.command, self.sub_command, self.msg_type)
    }
}

/// A validated data response
///
/// Holding a `Response` guarantees the buffer has the declared length for
/// its kind, a matching header and a correct checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    kind: ResponseKind,
    bytes: Bytes,
}

impl Response {
    /// Validate `bytes` as a response of `kind`
    pub fn new(kind: ResponseKind, bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        Expectation::response(kind).check(&bytes)?;

        Ok(Self { kind, bytes })
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
