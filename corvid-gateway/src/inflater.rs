//! `zlib-stream` payload inflation (spec.md §6 "`&compress=zlib-stream`",
//! SPEC_FULL.md §4.5 additions).
//!
//! Grounded almost verbatim in the teacher's
//! `gateway/src/shard/processor/inflater.rs`: Discord's zlib-stream frames
//! a single shared `Decompress` context across the whole connection and
//! flushes per-message, with each message terminated by the four-byte
//! suffix `00 00 ff ff`.

#![cfg(feature = "compression")]

use flate2::{Decompress, DecompressError, FlushDecompress};

const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xff, 0xff];
const BUFFER_SIZE: usize = 32 * 1024;

#[derive(Debug)]
pub struct Inflater {
    decompress: Decompress,
    compressed: Vec<u8>,
    scratch: Vec<u8>,
    buffer: Vec<u8>,
}

impl Inflater {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            compressed: Vec::new(),
            scratch: Vec::with_capacity(BUFFER_SIZE),
            buffer: Vec::with_capacity(BUFFER_SIZE),
        }
    }

    /// Feed bytes from a WebSocket binary frame.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.compressed.extend_from_slice(bytes);
    }

    /// Attempt to complete a message. Returns `None` if the terminating
    /// suffix hasn't arrived yet (the message spans multiple frames).
    pub fn msg(&mut self) -> Result<Option<&[u8]>, DecompressError> {
        let len = self.compressed.len();

        if len < 4 || self.compressed[(len - 4)..] != ZLIB_SUFFIX {
            return Ok(None);
        }

        self.buffer.clear();
        let before = self.decompress.total_in();
        let mut offset = 0usize;

        loop {
            self.scratch.clear();
            self.decompress
                .decompress_vec(&self.compressed[offset..], &mut self.scratch, FlushDecompress::Sync)?;

            offset = usize::try_from(self.decompress.total_in() - before).unwrap_or(offset);
            self.buffer.extend_from_slice(&self.scratch);

            if offset >= self.compressed.len() || self.scratch.is_empty() {
                break;
            }
        }

        self.compressed.clear();
        Ok(Some(&self.buffer))
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Inflater;
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;

    #[test]
    fn round_trips_a_single_frame_message() {
        let payload = br#"{"op":10,"d":{"heartbeat_interval":41250}}"#;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut inflater = Inflater::new();
        inflater.extend(&compressed);

        let decompressed = inflater.msg().unwrap().expect("complete message");
        assert_eq!(decompressed, payload);
    }

    #[test]
    fn incomplete_frame_yields_none() {
        let mut inflater = Inflater::new();
        inflater.extend(&[0x78, 0x9c, 0x01]);
        assert!(inflater.msg().unwrap().is_none());
    }
}
