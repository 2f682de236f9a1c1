use super::byte_source::ByteSource;
use super::error::{PdfError, PdfResult};
use super::memory_source::MemorySource;
use smallvec::SmallVec;

/// Token kinds emitted by the lexer.
///
/// Whitespace is consumed, never emitted. String, hex-string, name, comment
/// and stream payloads are raw bytes: literal strings with escapes resolved,
/// names with the slash stripped but otherwise undecoded, hex strings as the
/// text between the angle brackets.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer number
    Int(i64),

    /// Real number: a decimal point followed by at least one digit
    Real(f64),

    /// Literal string `(...)`, escapes resolved
    LiteralString(Vec<u8>),

    /// Hex string `<...>`, raw undecoded bytes
    HexString(Vec<u8>),

    /// Name `/...`, slash stripped
    Name(Vec<u8>),

    /// `true` or `false`
    Bool(bool),

    /// `null`
    Null,

    /// `%` comment, body up to (not including) the end of line
    Comment(Vec<u8>),

    /// `<<`
    DictBegin,

    /// `>>`
    DictEnd,

    /// `[`
    ArrayBegin,

    /// `]`
    ArrayEnd,

    /// `{`
    FnBegin,

    /// `}`
    FnEnd,

    /// `obj`
    ObjBegin,

    /// `endobj`
    ObjEnd,

    /// `R`
    ObjRef,

    /// `stream ... endstream`, payload is the raw body
    Stream(Vec<u8>),

    /// `xref`
    XrefBegin,

    /// `f` in a classic xref entry
    XrefFree,

    /// `n` in a classic xref entry
    XrefInUse,

    /// `trailer`
    TrailerBegin,

    /// `startxref`
    StartXref,

    /// End of input
    Eof,
}

/// A token and the byte offset of its first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

#[inline]
fn is_whitespace(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

#[inline]
fn is_eol(byte: u8) -> bool {
    matches!(byte, 0x0A | 0x0D)
}

#[inline]
fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Regular bytes continue names and keywords; anything else ends them.
#[inline]
fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

#[inline]
fn is_number_body(byte: u8) -> bool {
    byte.is_ascii_digit() || matches!(byte, b'+' | b'-' | b'.')
}

const MAX_KEYWORD_LEN: usize = 32;

/// Tokenizer for the PDF value grammar.
///
/// Reads a `ByteSource` one byte at a time and emits tokens lazily. A small
/// pushback buffer above the source allows the one-or-more-byte peeks the
/// grammar needs (`<<`, `>>`, the decimal point rule, the `endstream`
/// terminator scan); nothing in the grammar requires lookahead beyond it.
///
/// Stream bodies are delimited by scanning for an end-of-line followed by
/// the standalone keyword `endstream`. `/Length` is never consulted, because
/// it is occasionally wrong in real files.
pub struct Lexer {
    source: Box<dyn ByteSource>,
    pushback: SmallVec<[u8; 16]>,
    /// File offset of the next byte `next_byte` will yield
    offset: usize,
}

impl Lexer {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        let offset = source.pos();
        Lexer {
            source,
            pushback: SmallVec::new(),
            offset,
        }
    }

    /// Convenience constructor over an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Lexer::new(Box::new(MemorySource::from_bytes(data)))
    }

    /// File offset of the next byte to be consumed.
    pub fn pos(&self) -> usize {
        self.offset
    }

    /// Lines seen so far by the underlying source.
    pub fn line(&self) -> usize {
        self.source.line()
    }

    fn next_byte(&mut self) -> PdfResult<Option<u8>> {
        if let Some(byte) = self.pushback.pop() {
            self.offset += 1;
            return Ok(Some(byte));
        }
        match self.source.get_byte() {
            Ok(byte) => {
                self.offset += 1;
                Ok(Some(byte))
            }
            Err(PdfError::UnexpectedEof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn push_back(&mut self, byte: u8) {
        self.pushback.push(byte);
        self.offset -= 1;
    }

    /// Gets the next token from the input.
    pub fn next_token(&mut self) -> PdfResult<Token> {
        let first = loop {
            match self.next_byte()? {
                None => {
                    return Ok(Token {
                        kind: TokenKind::Eof,
                        pos: self.offset,
                    });
                }
                Some(byte) if is_whitespace(byte) => continue,
                Some(byte) => break byte,
            }
        };
        let pos = self.offset - 1;

        let kind = match first {
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.read_number(first, pos)?,
            b'%' => self.read_comment()?,
            b'(' => self.read_literal_string(pos)?,
            b'/' => self.read_name()?,
            b'<' => match self.next_byte()? {
                Some(b'<') => TokenKind::DictBegin,
                Some(other) => {
                    self.push_back(other);
                    self.read_hex_string(pos)?
                }
                None => return Err(PdfError::lex(pos, "unterminated hex string")),
            },
            b'>' => match self.next_byte()? {
                Some(b'>') => TokenKind::DictEnd,
                _ => return Err(PdfError::lex(pos, "single '>' where '>>' expected")),
            },
            b'[' => TokenKind::ArrayBegin,
            b']' => TokenKind::ArrayEnd,
            b'{' => TokenKind::FnBegin,
            b'}' => TokenKind::FnEnd,
            b')' => return Err(PdfError::lex(pos, "unbalanced ')'")),
            _ => self.read_keyword(first, pos)?,
        };

        Ok(Token { kind, pos })
    }

    /// Reads an integer or real number.
    ///
    /// A number is REAL if and only if a decimal point is followed by another
    /// digit. A trailing point with no digit after it is dropped and the byte
    /// after it returns to the stream, leaving an integer.
    fn read_number(&mut self, first: u8, pos: usize) -> PdfResult<TokenKind> {
        let mut buf: Vec<u8> = Vec::new();
        let mut is_real = false;
        let mut current = Some(first);

        while let Some(byte) = current {
            if byte == b'.' {
                match self.next_byte()? {
                    Some(digit) if digit.is_ascii_digit() => {
                        is_real = true;
                        buf.push(b'.');
                        buf.push(digit);
                        current = self.next_byte()?;
                    }
                    other => {
                        if let Some(after) = other {
                            self.push_back(after);
                        }
                        current = None;
                    }
                }
            } else if is_number_body(byte) {
                buf.push(byte);
                current = self.next_byte()?;
            } else {
                self.push_back(byte);
                current = None;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        if is_real {
            text.parse::<f64>()
                .map(TokenKind::Real)
                .map_err(|_| PdfError::lex(pos, format!("malformed real number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| PdfError::lex(pos, format!("malformed integer '{}'", text)))
        }
    }

    /// Reads a comment body up to (not including) the end of line.
    fn read_comment(&mut self) -> PdfResult<TokenKind> {
        let mut buf = Vec::new();
        loop {
            match self.next_byte()? {
                None => break,
                Some(byte) if is_eol(byte) => {
                    self.push_back(byte);
                    break;
                }
                Some(byte) => buf.push(byte),
            }
        }
        Ok(TokenKind::Comment(buf))
    }

    /// Reads a literal string, tracking balanced parentheses.
    ///
    /// A backslash drops out of the payload and the byte after it is taken
    /// verbatim, so escaped parentheses do not affect the depth count.
    fn read_literal_string(&mut self, pos: usize) -> PdfResult<TokenKind> {
        let mut buf = Vec::new();
        let mut depth = 1usize;

        loop {
            let byte = self
                .next_byte()?
                .ok_or_else(|| PdfError::lex(pos, "unterminated literal string"))?;
            match byte {
                b'\\' => {
                    let escaped = self
                        .next_byte()?
                        .ok_or_else(|| PdfError::lex(pos, "unterminated literal string"))?;
                    buf.push(escaped);
                }
                b'(' => {
                    depth += 1;
                    buf.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    buf.push(byte);
                }
                _ => buf.push(byte),
            }
        }

        Ok(TokenKind::LiteralString(buf))
    }

    /// Reads a name; the terminating non-regular byte returns to the stream.
    fn read_name(&mut self) -> PdfResult<TokenKind> {
        let mut buf = Vec::new();
        loop {
            match self.next_byte()? {
                None => break,
                Some(byte) if is_regular(byte) => buf.push(byte),
                Some(byte) => {
                    self.push_back(byte);
                    break;
                }
            }
        }
        Ok(TokenKind::Name(buf))
    }

    /// Reads the raw bytes of a hex string up to the closing `>`.
    fn read_hex_string(&mut self, pos: usize) -> PdfResult<TokenKind> {
        let mut buf = Vec::new();
        loop {
            match self.next_byte()? {
                None => return Err(PdfError::lex(pos, "unterminated hex string")),
                Some(b'>') => break,
                Some(byte) => buf.push(byte),
            }
        }
        Ok(TokenKind::HexString(buf))
    }

    /// Reads a keyword and maps it onto the fixed keyword set.
    fn read_keyword(&mut self, first: u8, pos: usize) -> PdfResult<TokenKind> {
        let mut buf = vec![first];
        loop {
            match self.next_byte()? {
                None => break,
                Some(byte) if is_regular(byte) => {
                    if buf.len() >= MAX_KEYWORD_LEN {
                        return Err(PdfError::lex(pos, "keyword too long"));
                    }
                    buf.push(byte);
                }
                Some(byte) => {
                    self.push_back(byte);
                    break;
                }
            }
        }

        match buf.as_slice() {
            b"obj" => Ok(TokenKind::ObjBegin),
            b"endobj" => Ok(TokenKind::ObjEnd),
            b"R" => Ok(TokenKind::ObjRef),
            b"true" => Ok(TokenKind::Bool(true)),
            b"false" => Ok(TokenKind::Bool(false)),
            b"null" => Ok(TokenKind::Null),
            b"stream" => self.read_stream_body(pos),
            b"xref" => Ok(TokenKind::XrefBegin),
            b"f" => Ok(TokenKind::XrefFree),
            b"n" => Ok(TokenKind::XrefInUse),
            b"trailer" => Ok(TokenKind::TrailerBegin),
            b"startxref" => Ok(TokenKind::StartXref),
            other => Err(PdfError::lex(
                pos,
                format!("unrecognized keyword '{}'", String::from_utf8_lossy(other)),
            )),
        }
    }

    /// Reads a stream body after the `stream` keyword.
    ///
    /// The keyword is followed by LF or CR LF (a bare CR is invalid). The
    /// body then runs verbatim until an end-of-line followed by `endstream`
    /// as a standalone keyword; the terminating EOL and keyword are excluded
    /// from the payload.
    fn read_stream_body(&mut self, pos: usize) -> PdfResult<TokenKind> {
        match self.next_byte()? {
            Some(0x0A) => {}
            Some(0x0D) => match self.next_byte()? {
                Some(0x0A) => {}
                _ => {
                    return Err(PdfError::lex(
                        pos,
                        "'stream' keyword followed by a bare CR",
                    ));
                }
            },
            _ => return Err(PdfError::lex(pos, "missing EOL after 'stream' keyword")),
        }

        let mut body = Vec::new();
        loop {
            let byte = self
                .next_byte()?
                .ok_or_else(|| PdfError::lex(pos, "unterminated stream body"))?;
            if is_eol(byte) {
                let mut second = None;
                if byte == 0x0D {
                    match self.next_byte()? {
                        Some(0x0A) => second = Some(0x0A),
                        Some(other) => self.push_back(other),
                        None => {}
                    }
                }
                if self.match_keyword_ahead(b"endstream")? {
                    return Ok(TokenKind::Stream(body));
                }
                body.push(byte);
                if let Some(lf) = second {
                    body.push(lf);
                }
            } else {
                body.push(byte);
            }
        }
    }

    /// Attempts to consume `keyword` standing alone at the cursor.
    ///
    /// On mismatch every byte read returns to the stream and the cursor is
    /// unchanged.
    fn match_keyword_ahead(&mut self, keyword: &[u8]) -> PdfResult<bool> {
        let mut taken: SmallVec<[u8; 16]> = SmallVec::new();
        for &expected in keyword {
            match self.next_byte()? {
                Some(byte) if byte == expected => taken.push(byte),
                Some(byte) => {
                    taken.push(byte);
                    while let Some(b) = taken.pop() {
                        self.push_back(b);
                    }
                    return Ok(false);
                }
                None => {
                    while let Some(b) = taken.pop() {
                        self.push_back(b);
                    }
                    return Ok(false);
                }
            }
        }

        // the keyword must not continue with a regular byte
        match self.next_byte()? {
            Some(byte) if is_regular(byte) => {
                taken.push(byte);
                while let Some(b) = taken.pop() {
                    self.push_back(b);
                }
                Ok(false)
            }
            Some(byte) => {
                self.push_back(byte);
                Ok(true)
            }
            None => Ok(true),
        }
    }
}
