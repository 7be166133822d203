// Helper functions for writing protocol primitives into a payload

use crate::protocol::{BridgeError, BridgeResult, MAX_STRING_LEN};
use bytes::BufMut;

/// Write the low 8 bits of a value
pub fn write_u8(buf: &mut Vec<u8>, value: u8) {
    buf.put_u8(value);
}

/// Write a big-endian u16 ("short")
pub fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.put_u16(value);
}

/// Write a big-endian i32 ("int")
pub fn write_i32(buf: &mut Vec<u8>, value: i32) {
    buf.put_i32(value);
}

/// Write a string as a u16 byte length followed by its UTF-8 bytes
pub fn write_string(buf: &mut Vec<u8>, value: &str) -> BridgeResult<()> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(BridgeError::StringTooLong(bytes.len()));
    }

    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 0x1234);
        write_i32(&mut buf, 0x12345678);
        assert_eq!(buf, vec![0x12, 0x34, 0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_string_length_counts_bytes() {
        let mut buf = Vec::new();
        write_string(&mut buf, "é").unwrap();
        assert_eq!(buf, vec![0, 2, 0xc3, 0xa9]);
    }

    #[test]
    fn test_string_at_limit() {
        let mut buf = Vec::new();
        let s = "a".repeat(MAX_STRING_LEN);
        write_string(&mut buf, &s).unwrap();
        assert_eq!(&buf[0..2], &[0xff, 0xff]);
        assert_eq!(buf.len(), 2 + MAX_STRING_LEN);
    }

    #[test]
    fn test_string_too_long() {
        let mut buf = Vec::new();
        let s = "a".repeat(MAX_STRING_LEN + 1);
        assert!(matches!(
            write_string(&mut buf, &s),
            Err(BridgeError::StringTooLong(65536))
        ));
        assert!(buf.is_empty());
    }
}
