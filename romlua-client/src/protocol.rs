// Remote Lua debug protocol definitions and frame encoding
//
// Every message on the wire is a 4-byte big-endian payload length followed by
// the payload. Payload byte 0 is the command or response code.

use crate::commands::command_name;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

// All multi-byte values are big-endian (network byte order)

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer underflow: needed {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    #[error("Unknown response code {0}")]
    UnknownResponseCode(u8),

    #[error("Frame too large: {length} bytes (max: {max} bytes)")]
    FrameTooLarge { length: usize, max: usize },

    #[error("String too long for protocol: {0} bytes (max: 65535)")]
    StringTooLong(usize),

    #[error("Transport unavailable")]
    TransportUnavailable,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Size of the length prefix in front of every payload
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Strings carry a u16 byte length
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Default cap on a declared payload length (16MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Prepend the 4-byte length prefix to a payload
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Outbound command: code byte plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    pub code: u8,
    pub data: Vec<u8>,
}

impl CommandPacket {
    pub fn new(code: u8) -> Self {
        Self {
            code,
            data: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        command_name(self.code)
    }

    /// Payload bytes without the length prefix
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(1 + self.data.len());
        payload.put_u8(self.code);
        payload.put_slice(&self.data);
        payload
    }

    /// Fully framed bytes ready for the socket
    pub fn encode(&self) -> Bytes {
        encode_frame(&self.payload())
    }
}

/// Hex dump used when logging outbound frames
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::command_codes;

    #[test]
    fn test_command_packet_encode() {
        let packet = CommandPacket::new(command_codes::CONTINUE);
        let encoded = packet.encode();

        assert_eq!(encoded.len(), LENGTH_PREFIX_SIZE + 1);
        assert_eq!(&encoded[0..4], &[0, 0, 0, 1]); // length excludes the prefix
        assert_eq!(encoded[4], command_codes::CONTINUE);
    }

    #[test]
    fn test_big_endian_length() {
        let payload = vec![0u8; 0x0102];
        let encoded = encode_frame(&payload);

        assert_eq!(&encoded[0..4], &[0x00, 0x00, 0x01, 0x02]);
        assert_ne!(&encoded[0..4], &[0x02, 0x01, 0x00, 0x00]);
        assert_eq!(encoded.len(), 4 + 0x0102);
    }

    #[test]
    fn test_empty_payload_frame() {
        assert_eq!(&encode_frame(&[])[..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0x0a, 0xff]), "00 0a ff");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_command_packet_name() {
        assert_eq!(CommandPacket::new(command_codes::STEP_OUT).name(), "STEP_OUT");
        assert_eq!(CommandPacket::new(42).name(), "UNKNOWN");
    }
}
