use super::error::PdfResult;

/// Seekable byte feed over a PDF file held in memory or on disk.
///
/// This trait provides a common interface for forward iteration, absolute
/// seeks, and range reads over the document bytes. Positions are always
/// absolute file offsets, including in sub-sources, so token positions
/// reported by the lexer remain valid seek targets.
pub trait ByteSource {
    /// Returns the total number of accessible bytes.
    fn len(&self) -> usize;

    /// Returns true if the source contains no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the offset of the next byte `get_byte` will return.
    fn pos(&self) -> usize;

    /// Moves the cursor to an absolute offset.
    ///
    /// Seeking past the end of the source is an error.
    fn seek(&mut self, pos: usize) -> PdfResult<()>;

    /// Reads and returns a single byte, advancing the cursor.
    ///
    /// Returns `UnexpectedEof` past the end of the source.
    fn get_byte(&mut self) -> PdfResult<u8>;

    /// Reads `length` bytes, advancing the cursor.
    fn get_bytes(&mut self, length: usize) -> PdfResult<Vec<u8>>;

    /// Returns a range of bytes without moving the cursor.
    fn get_byte_range(&self, begin: usize, end: usize) -> PdfResult<Vec<u8>>;

    /// Line counter maintained across forward reads.
    ///
    /// Every CR counts as a line; an LF immediately following a CR does not
    /// add another. A lone LF counts as a line.
    fn line(&self) -> usize;

    /// Creates an independent cursor over a sub-range of this source.
    ///
    /// The sub-source shares the underlying buffer and keeps absolute
    /// positions: its initial `pos()` equals `start`.
    fn sub_source(&self, start: usize, length: usize) -> PdfResult<Box<dyn ByteSource>>;
}

/// Iterator over a source's bytes from the end toward the start.
///
/// Used once per document, to locate the startxref offset digits.
pub struct ReverseBytes<'a> {
    source: &'a dyn ByteSource,
    pos: usize,
}

impl Iterator for ReverseBytes<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pos == 0 {
            return None;
        }
        self.pos -= 1;
        self.source
            .get_byte_range(self.pos, self.pos + 1)
            .ok()
            .and_then(|bytes| bytes.first().copied())
    }
}

/// Yields the source's bytes in reverse, starting from the last byte.
pub fn reverse_bytes(source: &dyn ByteSource) -> ReverseBytes<'_> {
    ReverseBytes {
        source,
        pos: source.len(),
    }
}
