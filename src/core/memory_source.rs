use super::byte_source::ByteSource;
use super::error::{PdfError, PdfResult};
use std::sync::Arc;

/// In-memory byte source.
///
/// Holds the whole document in a shared buffer. Sub-sources created with
/// `sub_source` share the same `Arc`-wrapped bytes without copying and keep
/// absolute offsets, so a lexer running over a sub-source reports file
/// positions.
pub struct MemorySource {
    /// The underlying byte buffer (shared via Arc)
    bytes: Arc<Vec<u8>>,
    /// Current read position (absolute)
    pos: usize,
    /// Starting offset of the accessible window
    start: usize,
    /// Length of accessible data from start
    length: usize,
    /// Lines seen so far during forward reads
    line: usize,
    /// Whether the previously read byte was a CR (collapses CR LF)
    prev_cr: bool,
}

impl MemorySource {
    /// Creates a source over a byte vector.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let length = bytes.len();
        MemorySource {
            bytes: Arc::new(bytes),
            pos: 0,
            start: 0,
            length,
            line: 1,
            prev_cr: false,
        }
    }

    fn from_arc(bytes: Arc<Vec<u8>>, start: usize, length: usize) -> Self {
        MemorySource {
            bytes,
            pos: start,
            start,
            length,
            line: 1,
            prev_cr: false,
        }
    }

    /// Returns a reference to the underlying byte buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn end(&self) -> usize {
        self.start + self.length
    }

    fn note_byte(&mut self, byte: u8) {
        // CR runs count one line each; a LF directly after CR does not.
        if byte == 0x0D {
            self.line += 1;
            self.prev_cr = true;
        } else {
            if byte == 0x0A && !self.prev_cr {
                self.line += 1;
            }
            self.prev_cr = false;
        }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> usize {
        self.length
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) -> PdfResult<()> {
        if pos < self.start || pos > self.end() {
            return Err(PdfError::io(format!(
                "seek to {} outside source range {}..{}",
                pos,
                self.start,
                self.end()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    fn get_byte(&mut self) -> PdfResult<u8> {
        if self.pos >= self.end() {
            return Err(PdfError::UnexpectedEof);
        }
        let byte = self.bytes[self.pos];
        self.pos += 1;
        self.note_byte(byte);
        Ok(byte)
    }

    fn get_bytes(&mut self, length: usize) -> PdfResult<Vec<u8>> {
        let end_pos = self.pos + length;
        if end_pos > self.end() {
            return Err(PdfError::UnexpectedEof);
        }
        let bytes = self.bytes[self.pos..end_pos].to_vec();
        for &byte in &bytes {
            self.note_byte(byte);
        }
        self.pos = end_pos;
        Ok(bytes)
    }

    fn get_byte_range(&self, begin: usize, end: usize) -> PdfResult<Vec<u8>> {
        if begin > end || end > self.end() {
            return Err(PdfError::io(format!(
                "invalid byte range {}..{}",
                begin, end
            )));
        }
        Ok(self.bytes[begin..end].to_vec())
    }

    fn line(&self) -> usize {
        self.line
    }

    fn sub_source(&self, start: usize, length: usize) -> PdfResult<Box<dyn ByteSource>> {
        if start + length > self.end() {
            return Err(PdfError::io(format!(
                "invalid sub-source range {}..{}",
                start,
                start + length
            )));
        }
        Ok(Box::new(MemorySource::from_arc(
            Arc::clone(&self.bytes),
            start,
            length,
        )))
    }
}
