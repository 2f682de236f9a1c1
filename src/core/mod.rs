pub mod builder;
pub mod byte_source;
pub mod decode;
pub mod document;
pub mod error;
pub mod lexer;
pub mod memory_source;
pub mod object;
pub mod objstm;
pub mod xref;

pub use builder::ObjectBuilder;
pub use byte_source::{ByteSource, ReverseBytes, reverse_bytes};
pub use document::Document;
pub use error::{PdfError, PdfResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use memory_source::MemorySource;
pub use object::{Dict, Name, ObjectId, StreamObject, Value};
pub use objstm::ObjectStream;
pub use xref::{SectionLocation, XRef, XrefEntry, XrefSection};
