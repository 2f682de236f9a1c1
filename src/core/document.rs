use super::byte_source::ByteSource;
use super::error::{PdfError, PdfResult};
use super::memory_source::MemorySource;
use super::object::{Dict, ObjectId, Value};
use super::xref::{XRef, XrefSection};
use std::path::Path;
use std::rc::Rc;

/// A PDF document loaded into an in-memory object graph.
///
/// This is the entry point for embedders: it opens a file (or takes the
/// bytes directly), resolves the cross-reference structure, and serves
/// indirect objects on demand. Objects stay materialized for the life of
/// the document, so repeated lookups are cheap.
pub struct Document {
    xref: XRef,
}

impl Document {
    /// Opens a PDF document from a file path.
    ///
    /// # Example
    /// ```no_run
    /// use pdf_graph::Document;
    ///
    /// let mut doc = Document::open("document.pdf").unwrap();
    /// let root = doc.root().unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> PdfResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Opens a PDF document already held in memory.
    pub fn from_bytes(data: Vec<u8>) -> PdfResult<Self> {
        let source = Box::new(MemorySource::from_bytes(data)) as Box<dyn ByteSource>;
        let mut xref = XRef::new(source);
        xref.load()?;
        Ok(Document { xref })
    }

    /// Fetches the indirect object (num, generation).
    ///
    /// Free entries resolve to Null per the PDF specification.
    pub fn get_object(&mut self, num: u32, generation: u32) -> PdfResult<Rc<Value>> {
        self.xref.fetch(ObjectId::new(num, generation))
    }

    /// Fetches a named parameter from an object's dictionary.
    ///
    /// Works for plain dictionaries and for stream parameter dictionaries;
    /// a reference value is resolved before being returned. Returns None
    /// when the object has no dictionary or the key is absent.
    pub fn get_object_param(&mut self, id: ObjectId, name: &[u8]) -> PdfResult<Option<Value>> {
        let object = self.xref.fetch(id)?;
        let value = match object.as_dict() {
            Some(dict) => dict.get(name).cloned(),
            None => return Ok(None),
        };
        match value {
            Some(value) => Ok(Some(self.xref.fetch_if_ref(&value)?)),
            None => Ok(None),
        }
    }

    /// The effective (merged) trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        self.xref.trailer()
    }

    /// The document catalog: the dictionary `/Root` points at.
    pub fn root(&mut self) -> PdfResult<Dict> {
        let root = self
            .xref
            .trailer_value(b"Root")?
            .ok_or_else(|| PdfError::xref("trailer has no /Root entry"))?;
        match self.xref.fetch_if_ref(&root)? {
            Value::Dict(dict) => Ok(dict),
            other => Err(PdfError::xref(format!(
                "/Root does not resolve to a dictionary: {:?}",
                other
            ))),
        }
    }

    /// The main (most recently written) cross-reference section.
    pub fn main_xref(&self) -> PdfResult<&XrefSection> {
        self.xref
            .main_section()
            .ok_or_else(|| PdfError::xref("document has no cross-reference sections"))
    }

    /// Byte offset of the main xref, as declared at the end of the file.
    pub fn start_offset(&self) -> u64 {
        self.xref.start_offset()
    }

    /// The resolver, for entry-level inspection.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    pub fn xref_mut(&mut self) -> &mut XRef {
        &mut self.xref
    }
}
