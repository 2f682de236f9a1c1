use super::object::ObjectId;
use std::fmt;

/// Universal error type for PDF parsing operations.
///
/// Every failure surfaced by the crate is one of these kinds. Errors that
/// originate at a known byte offset carry it, so embedders can report a
/// position alongside the message.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Underlying I/O failure (file read, seek past end of source)
    Io(String),

    /// End of input reached where more bytes were required
    UnexpectedEof,

    /// Tokenizer-level failure at a byte offset
    Lex { pos: usize, detail: String },

    /// Object-construction failure at a byte offset
    Parse { pos: usize, detail: String },

    /// Cross-reference table or xref stream failure
    XRef { detail: String },

    /// Stream declares a filter the core does not implement
    UnsupportedFilter { name: String },

    /// PNG predictor code (or row tag) outside the supported set
    UnsupportedPredictor { code: u8 },

    /// No cross-reference entry resolves the requested object id
    MissingObject { id: ObjectId },

    /// Stream body that cannot be decoded or is internally inconsistent
    CorruptStream { detail: String },
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::Io(message) => {
                write!(f, "I/O error: {}", message)
            }
            PdfError::UnexpectedEof => {
                write!(f, "Unexpected end of input")
            }
            PdfError::Lex { pos, detail } => {
                write!(f, "Lexical error at byte {}: {}", pos, detail)
            }
            PdfError::Parse { pos, detail } => {
                write!(f, "Parse error at byte {}: {}", pos, detail)
            }
            PdfError::XRef { detail } => {
                write!(f, "Cross-reference error: {}", detail)
            }
            PdfError::UnsupportedFilter { name } => {
                write!(f, "Unsupported stream filter: {}", name)
            }
            PdfError::UnsupportedPredictor { code } => {
                write!(f, "Unsupported predictor: {}", code)
            }
            PdfError::MissingObject { id } => {
                write!(f, "Missing object: {}", id)
            }
            PdfError::CorruptStream { detail } => {
                write!(f, "Corrupt stream: {}", detail)
            }
        }
    }
}

impl PdfError {
    /// Creates a lexical error at a byte offset.
    pub fn lex<S: Into<String>>(pos: usize, detail: S) -> Self {
        PdfError::Lex {
            pos,
            detail: detail.into(),
        }
    }

    /// Creates a parse error at a byte offset.
    pub fn parse<S: Into<String>>(pos: usize, detail: S) -> Self {
        PdfError::Parse {
            pos,
            detail: detail.into(),
        }
    }

    /// Creates a cross-reference error.
    pub fn xref<S: Into<String>>(detail: S) -> Self {
        PdfError::XRef {
            detail: detail.into(),
        }
    }

    /// Creates a corrupt-stream error.
    pub fn corrupt<S: Into<String>>(detail: S) -> Self {
        PdfError::CorruptStream {
            detail: detail.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io<S: Into<String>>(message: S) -> Self {
        PdfError::Io(message.into())
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::Io(err.to_string())
    }
}

/// Result type alias for PDF operations
pub type PdfResult<T> = Result<T, PdfError>;
