use crate::error::{BridgeError, Result};
use crate::types::ElementSize;

/// Checks caller-supplied upload parameters before anything is copied.
///
/// The byte-length comparison is the integrity gate of the whole upload
/// path: a mismatch between the buffer and the declared dimensions would
/// otherwise turn into an out-of-bounds read downstream.
pub fn validate_upload(
    channel: i64,
    byte_len: u64,
    width: i64,
    height: i64,
    depth: i64,
    element_size: ElementSize,
) -> Result<()> {
    if width <= 0 || height <= 0 || depth <= 0 {
        return Err(BridgeError::InvalidParameter(format!(
            "volume dimensions must be positive, got {width}x{height}x{depth}"
        )));
    }
    if channel < 0 {
        return Err(BridgeError::InvalidParameter(format!(
            "channel id must be non-negative, got {channel}"
        )));
    }

    let expected = (width as u64)
        .checked_mul(height as u64)
        .and_then(|v| v.checked_mul(depth as u64))
        .and_then(|v| v.checked_mul(element_size.bytes()))
        .ok_or_else(|| {
            BridgeError::InvalidParameter(format!(
                "volume dimensions {width}x{height}x{depth} overflow the byte count"
            ))
        })?;

    if byte_len != expected {
        return Err(BridgeError::BufferSizeMismatch {
            expected,
            actual: byte_len,
        });
    }
    Ok(())
}
