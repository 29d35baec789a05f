//! DDS238 frame structure and encoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::{CommandKind, MessageType},
    constants::{offsets, RESERVED_BYTE, START_MARKER},
    error::{Error, Result},
};

/// Outbound DDS238 frame
///
/// # Frame Structure
///
/// ```text
/// ┌────────┬─────────┬────────┬──────────┬─────────────┬───────────┬──────────┐
/// │ Start  │ Command │  Type  │ Reserved │ Sub-command │  Payload  │ Checksum │
/// │  0x48  │ 1 byte  │ 1 byte │   0x01   │   1 byte    │  N bytes  │  1 byte  │
/// └────────┴─────────┴────────┴──────────┴─────────────┴───────────┴──────────┘
/// ```
///
/// Multi-byte payload fields are big-endian. The length is fixed per
/// command kind, there is no length prefix.
///
/// # Examples
///
/// ```
/// use dds238_core::{CommandKind, Frame};
///
/// let frame = Frame::build(CommandKind::GetMeasurement, &[]).unwrap();
/// assert_eq!(frame.as_bytes(), &[0x48, 0x06, 0x02, 0x01, 0x0A, 0x5B]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    kind: CommandKind,
    bytes: Bytes,
}

impl Frame {
    /// Build a frame from a command kind and its raw payload
    ///
    /// Extra payload bytes beyond the command's fixed width are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooShort`] if `payload` is shorter than the
    /// command's payload width.
    pub fn build(kind: CommandKind, payload: &[u8]) -> Result<Self> {
        let expected = kind.payload_len();
        if payload.len() < expected {
            return Err(Error::PayloadTooShort {
                command: kind,
                expected,
                actual: payload.len(),
            });
        }

        Ok(Self::assemble(kind, &payload[..expected]))
    }

    /// Assemble a frame from a payload of exactly the right width
    pub(crate) fn assemble(kind: CommandKind, payload: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(kind.frame_len());

        buf.put_u8(START_MARKER);
        buf.put_u8(kind.code());
        buf.put_u8(MessageType::Send.into());
        buf.put_u8(RESERVED_BYTE);
        buf.put_u8(kind.sub_code());
        buf.put_slice(payload);
        buf.put_u8(0);

        checksum::seal(&mut buf);

        Self {
            kind,
            bytes: buf.freeze(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Command code (byte 1)
    pub fn command(&self) -> u8 {
        self.bytes[offsets::COMMAND]
    }

    /// Sub-command code (byte 4)
    pub fn sub_command(&self) -> u8 {
        self.bytes[offsets::SUB_COMMAND]
    }

    pub fn payload(&self) -> Bytes {
        self.bytes.slice(offsets::PAYLOAD..self.bytes.len() - 1)
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("kind", &self.kind)
            .field("bytes", &hex::encode_upper(&self.bytes))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[{}](len={})", self.kind, self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, Expectation};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_query() {
        let frame = Frame::build(CommandKind::GetPowerCut, &[]).unwrap();

        assert_eq!(frame.as_bytes(), &[0x48, 0x06, 0x02, 0x01, 0x00, 0x51]);
        assert_eq!(frame.payload().len(), 0);
        assert_eq!(frame.checksum(), 0x51);
    }

    #[test]
    fn test_build_set_power_cut() {
        let frame = Frame::build(CommandKind::SetPowerCut, &[0x00]).unwrap();

        assert_eq!(frame.as_bytes(), &[0x48, 0x07, 0x02, 0x01, 0x09, 0x00, 0x5B]);
        assert_eq!(frame.command(), 0x07);
        assert_eq!(frame.sub_command(), 0x09);
    }

    #[test]
    fn test_build_payload_too_short() {
        let result = Frame::build(CommandKind::SetLimits, &[0x01, 0x02]);

        assert_eq!(
            result,
            Err(Error::PayloadTooShort {
                command: CommandKind::SetLimits,
                expected: 6,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_build_ignores_extra_payload() {
        let frame = Frame::build(CommandKind::SetPowerCut, &[0x01, 0xFF, 0xFF]).unwrap();
        assert_eq!(frame.len(), 7);
        assert_eq!(&frame.payload()[..], &[0x01]);
    }

    #[test]
    fn test_every_kind_has_declared_length() {
        for kind in CommandKind::ALL {
            let payload = vec![0u8; kind.payload_len()];
            let frame = Frame::build(kind, &payload).unwrap();
            assert_eq!(frame.len(), kind.frame_len(), "{}", kind);
        }
    }

    #[test]
    fn test_built_frames_validate_against_themselves() {
        for kind in CommandKind::ALL {
            let payload = vec![0xA5u8; kind.payload_len()];
            let frame = Frame::build(kind, &payload).unwrap();

            validate(
                frame.as_bytes(),
                kind.code(),
                kind.sub_code(),
                MessageType::Send,
            )
            .unwrap();
            Expectation::echo(&frame).check(frame.as_bytes()).unwrap();
        }
    }
}
