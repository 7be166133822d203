// Stream reassembly
//
// Turns arbitrarily chunked socket reads into complete payloads. A payload is
// only released once all of its declared bytes have arrived.

use crate::protocol::{BridgeError, BridgeResult, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE};
use bytes::{Buf, Bytes, BytesMut};

#[derive(Debug)]
pub struct FrameReassembler {
    buffer: BytesMut,
    max_frame_size: usize,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_size,
        }
    }

    /// Append a chunk as received from the transport
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Direct access for `read_buf` style socket reads
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Pop the next complete payload, if one is buffered
    ///
    /// A declared length above the cap is a protocol violation; the caller
    /// should drop the connection.
    pub fn next_payload(&mut self) -> BridgeResult<Option<Bytes>> {
        if self.buffer.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let length = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]) as usize;

        if length > self.max_frame_size {
            return Err(BridgeError::FrameTooLarge {
                length,
                max: self.max_frame_size,
            });
        }

        if self.buffer.len() < LENGTH_PREFIX_SIZE + length {
            return Ok(None);
        }

        self.buffer.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(self.buffer.split_to(length).freeze()))
    }

    /// Append a chunk and collect every payload it completes
    pub fn push(&mut self, chunk: &[u8]) -> BridgeResult<Vec<Bytes>> {
        self.extend(chunk);

        let mut payloads = Vec::new();
        while let Some(payload) = self.next_payload()? {
            payloads.push(payload);
        }
        Ok(payloads)
    }

    /// Bytes held back waiting for the rest of a frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
