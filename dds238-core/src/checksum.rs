//! DDS238 frame checksum
//!
//! The last byte of every frame is the low byte of the plain sum of all the
//! bytes before it. The meter documentation calls it a CRC, but no polynomial
//! is involved and none must be introduced.

use tracing::trace;

/// Calculate the checksum of a complete frame
///
/// The last byte is the checksum slot itself and is not summed.
///
/// # Examples
///
/// ```
/// use dds238_core::checksum;
///
/// let frame = [0x48, 0x06, 0x02, 0x01, 0x0A, 0x00];
/// assert_eq!(checksum::calculate(&frame), 0x5B);
/// ```
pub fn calculate(frame: &[u8]) -> u8 {
    let Some((_, body)) = frame.split_last() else {
        return 0;
    };

    let checksum = body.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte));

    trace!(
        frame_len = frame.len(),
        checksum = format!("0x{:02X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify the checksum stored in the last byte
pub fn verify(frame: &[u8]) -> bool {
    match frame.last() {
        Some(stored) => calculate(frame) == *stored,
        None => false,
    }
}

/// Write the checksum into the last byte
pub fn seal(frame: &mut [u8]) {
    let checksum = calculate(frame);
    if let Some(last) = frame.last_mut() {
        *last = checksum;
    }
}
