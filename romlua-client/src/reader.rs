// Helper functions for reading protocol primitives from a payload
//
// Each reader advances the slice it is given. A short slice yields
// BufferUnderflow and leaves the cursor where it was.

use crate::protocol::{BridgeError, BridgeResult};
use bytes::Buf;

fn ensure(buf: &&[u8], needed: usize) -> BridgeResult<()> {
    if buf.remaining() < needed {
        return Err(BridgeError::BufferUnderflow {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// Read a u8
pub fn read_u8(buf: &mut &[u8]) -> BridgeResult<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

/// Read a big-endian u16 ("short")
pub fn read_u16(buf: &mut &[u8]) -> BridgeResult<u16> {
    ensure(buf, 2)?;
    Ok(buf.get_u16())
}

/// Read a big-endian i32 ("int")
pub fn read_i32(buf: &mut &[u8]) -> BridgeResult<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32())
}

/// Read a string (2-byte length prefix + UTF-8 bytes)
///
/// Malformed UTF-8 is replaced rather than rejected.
pub fn read_string(buf: &mut &[u8]) -> BridgeResult<String> {
    let mut cursor = *buf;
    let len = read_u16(&mut cursor)? as usize;
    ensure(&cursor, len)?;

    let value = String::from_utf8_lossy(&cursor[..len]).into_owned();
    cursor.advance(len);
    *buf = cursor;

    Ok(value)
}
