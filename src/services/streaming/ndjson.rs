//! Newline-delimited JSON (NDJSON) line splitter
//!
//! Ollama streams one JSON object per line. Network chunks can split a line
//! (or a multi-byte UTF-8 sequence) anywhere, so bytes are buffered until a
//! newline arrives.

use std::str::Utf8Error;

/// NDJSON parser for streaming responses
#[derive(Debug, Default)]
pub struct NdjsonParser {
    /// Bytes of the current, incomplete line
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
}

impl NdjsonParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes
    ///
    /// Returns completed, non-blank lines. Incomplete data is buffered until next call.
    ///
    /// # Errors
    ///
    /// Returns an error if a completed line is not valid UTF-8
    pub fn parse_chunk(&mut self, chunk: &[u8]) -> Result<Vec<String>, Utf8Error> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let line_end = search_from + offset;
            let decoded = Self::decode_line(&self.buffer[start..line_end]);
            start = line_end + 1;
            search_from = start;
            match decoded {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {}
                Err(e) => {
                    self.consume(start);
                    return Err(e);
                }
            }
        }

        self.consume(start);
        self.scanned = self.buffer.len();
        Ok(lines)
    }

    /// Flush a trailing line that was not newline-terminated
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining bytes are not valid UTF-8
    pub fn flush(&mut self) -> Result<Option<String>, Utf8Error> {
        let raw = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        Self::decode_line(&raw)
    }

    /// Drop the first `len` bytes, which belong to completed lines
    fn consume(&mut self, len: usize) {
        self.buffer.drain(..len);
        self.scanned = 0;
    }

    fn decode_line(raw: &[u8]) -> Result<Option<String>, Utf8Error> {
        let line = std::str::from_utf8(raw)?.trim();
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line.to_string()))
        }
    }
}
