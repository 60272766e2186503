//! Line framer for the serial link.
//!
//! Inbound bytes arrive in arbitrary chunks from the UART. The codec
//! accumulates them and yields one record per newline-terminated line,
//! reassembling lines that were split across reads. A trailing fragment
//! stays buffered until its terminator arrives.

use bytes::BytesMut;
use log::warn;

use crate::constants::MAX_LINE_LENGTH;

/// A codec for reading and writing newline-delimited records.
#[derive(Debug)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Lines longer than this are discarded as garbage.
    max_line_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new line codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(max_line_len.min(MAX_LINE_LENGTH)),
            max_line_len,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete record from the buffer.
    ///
    /// Returns `Some(record)` without its newline terminator, or `None`
    /// if no complete line is buffered. Empty lines and lines exceeding
    /// the maximum length are skipped.
    pub fn next_record(&mut self) -> Option<Vec<u8>> {
        loop {
            let line_end = self.buffer.iter().position(|&b| b == b'\n');

            let end = match line_end {
                Some(end) => end,
                None => {
                    // Unterminated run past the limit cannot become a valid
                    // record; drop it so a chattering peer cannot grow the
                    // buffer without bound.
                    if self.buffer.len() > self.max_line_len {
                        warn!(
                            "discarding {} unterminated bytes (max line {})",
                            self.buffer.len(),
                            self.max_line_len
                        );
                        self.buffer.clear();
                    }
                    return None;
                }
            };

            let mut line = self.buffer.split_to(end);
            let _ = self.buffer.split_to(1); // the '\n' itself

            // Tolerate CRLF peers.
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_line_len {
                warn!("discarding {}-byte line (max {})", line.len(), self.max_line_len);
                continue;
            }

            return Some(line.to_vec());
        }
    }

    /// Extract every complete record currently buffered.
    pub fn drain_records(&mut self) -> Vec<Vec<u8>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record() {
            records.push(record);
        }
        records
    }

    /// Encode one record for transmission, appending the newline terminator.
    pub fn encode_line(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(payload.len() + 1);
        buf.extend_from_slice(payload);
        buf.push(b'\n');
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
