pub mod core;

// Re-export main types for convenience
pub use crate::core::{
    Dict, Document, Lexer, MemorySource, Name, ObjectBuilder, ObjectId, ObjectStream, PdfError,
    PdfResult, StreamObject, Token, TokenKind, Value, XRef, XrefEntry, XrefSection,
};
