//! Raw hex messages for the diagnostic passthrough
//!
//! Messages are written as colon separated pairs of hex digits, for example
//! `48:06:02:01:0A:00`. The last pair is a placeholder that gets replaced by
//! the checksum.

use bytes::{Bytes, BytesMut};

use crate::{
    checksum,
    constants::{MAX_HEX_MESSAGE_LEN, MIN_FRAME_SIZE},
    error::{Error, Result},
};

/// Parse a colon separated hex message and seal it with a checksum
///
/// # Errors
///
/// - [`Error::HexLength`] if the text is empty or longer than
///   [`MAX_HEX_MESSAGE_LEN`]
/// - [`Error::InvalidHex`] if a group is not exactly two hex digits or the
///   result is shorter than a frame header plus checksum
///
/// # Examples
///
/// ```
/// use dds238_core::raw;
///
/// let frame = raw::parse_message("48:06:02:01:0a:00").unwrap();
/// assert_eq!(&frame[..], &[0x48, 0x06, 0x02, 0x01, 0x0A, 0x5B]);
/// ```
pub fn parse_message(msg: &str) -> Result<Bytes> {
    if msg.is_empty() || msg.len() > MAX_HEX_MESSAGE_LEN {
        return Err(Error::HexLength {
            len: msg.len(),
            max: MAX_HEX_MESSAGE_LEN,
        });
    }

    let mut buf = BytesMut::with_capacity(msg.len() / 3 + 1);

    for (index, group) in msg.split(':').enumerate() {
        if group.len() != 2 {
            return Err(Error::InvalidHex(format!(
                "group {} has {} digits, expected 2",
                index,
                group.len()
            )));
        }

        let mut byte = [0u8; 1];
        hex::decode_to_slice(group, &mut byte)
            .map_err(|e| Error::InvalidHex(format!("group {}: {}", index, e)))?;
        buf.extend_from_slice(&byte);
    }

    if buf.len() < MIN_FRAME_SIZE {
        return Err(Error::InvalidHex(format!(
            "{} bytes is shorter than a frame ({} bytes)",
            buf.len(),
            MIN_FRAME_SIZE
        )));
    }

    checksum::seal(&mut buf);

    Ok(buf.freeze())
}

/// Format bytes as upper-case colon separated hex
pub fn format_message(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_replaces_checksum() {
        let frame = parse_message("48:07:02:01:09:01:FF").unwrap();
        assert_eq!(&frame[..], &[0x48, 0x07, 0x02, 0x01, 0x09, 0x01, 0x5C]);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(
            parse_message(""),
            Err(Error::HexLength {
                len: 0,
                max: MAX_HEX_MESSAGE_LEN
            })
        );
    }

    #[test]
    fn test_parse_too_long() {
        let msg = vec!["00"; 100].join(":");
        let err = parse_message(&msg).unwrap_err();
        assert!(matches!(err, Error::HexLength { len: 299, .. }));
        assert_eq!(err.code(), crate::ErrorCode::FirstParameterOutOfRange);
    }

    #[test]
    fn test_parse_bad_groups() {
        for msg in [
            "48:6:02:01:0A:00",
            "48:060:02:01:0A:00",
            "48::06:02:01:0A",
            "48:06:02:01:0A:",
        ] {
            let err = parse_message(msg).unwrap_err();
            assert!(matches!(err, Error::InvalidHex(_)), "{msg}");
        }
    }

    #[test]
    fn test_parse_bad_digit() {
        let err = parse_message("48:06:02:01:0G:00").unwrap_err();
        assert!(matches!(err, Error::InvalidHex(_)));
        assert_eq!(err.code(), crate::ErrorCode::WrongMessage);
    }

    #[test]
    fn test_parse_too_few_bytes() {
        let err = parse_message("48:06:02").unwrap_err();
        assert!(matches!(err, Error::InvalidHex(_)));
    }

    #[test]
    fn test_format_message() {
        assert_eq!(format_message(&[0x48, 0x0a, 0xff]), "48:0A:FF");
        assert_eq!(format_message(&[]), "");
    }
}
