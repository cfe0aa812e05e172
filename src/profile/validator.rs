//! Wire-level validation of peer writes.
//!
//! Pure function of (parameter, payload, offset); it never touches the store.

use super::Parameter;
use crate::error::AttError;

/// Decode and check a peer write for `id`.
///
/// Checks run in order: offset, payload length, the Sensitivity width
/// restriction, then the semantic range. A payload shorter than the native
/// width decodes with the high byte zeroed, so the stored attribute never
/// keeps bytes from an earlier, wider write.
pub fn validate_write(id: Parameter, payload: &[u8], offset: u16) -> Result<u16, AttError> {
    if !id.spec().is_writable() {
        return Err(AttError::WriteNotPermitted);
    }

    if offset != 0 {
        return Err(AttError::AttrNotLong);
    }

    let value = match *payload {
        [b0] => u16::from(b0),
        [_, _] if id.width() == 1 => return Err(AttError::InvalidValueSize),
        [b0, b1] => u16::from_le_bytes([b0, b1]),
        _ => return Err(AttError::InvalidValueSize),
    };

    check_range(id, value)?;
    Ok(value)
}

/// Semantic range check, independent of the wire checks.
pub fn check_range(id: Parameter, value: u16) -> Result<(), AttError> {
    match id.spec().range {
        Some((min, max)) if value < min || value > max => Err(AttError::OutOfRange),
        _ => Ok(()),
    }
}
