use super::builder::ObjectBuilder;
use super::byte_source::{ByteSource, reverse_bytes};
use super::error::{PdfError, PdfResult};
use super::lexer::{Lexer, Token, TokenKind};
use super::object::{Dict, ObjectId, Value};
use super::objstm::ObjectStream;
use indexmap::IndexMap;
use log::warn;
use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::collections::VecDeque;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Parsed object-stream containers kept decoded.
const CONTAINER_CACHE_CAP: usize = 32;

/// Cross-reference table entry.
///
/// Each entry describes where an indirect object lives: nowhere (free), at a
/// byte offset in the file, or packed inside an object stream.
#[derive(Debug, Clone, PartialEq)]
pub enum XrefEntry {
    /// Free entry - object number is available for reuse
    Free { next_free: u32, generation: u32 },

    /// Object stored uncompressed at a byte offset
    InUse { offset: u64, generation: u32 },

    /// Object stored inside an object stream
    Compressed { container: u32, index: u32 },
}

impl XrefEntry {
    /// Returns true if this entry is free.
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. })
    }

    /// Returns the generation number for this entry.
    ///
    /// Objects packed in object streams always have generation 0.
    pub fn generation(&self) -> u32 {
        match self {
            XrefEntry::Free { generation, .. } => *generation,
            XrefEntry::InUse { generation, .. } => *generation,
            XrefEntry::Compressed { .. } => 0,
        }
    }
}

/// Where a cross-reference section came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionLocation {
    /// Classic table at a byte offset
    Table(u64),

    /// XRef stream object
    Stream(ObjectId),
}

/// One cross-reference section: its entries, its trailer, and where it was
/// found. Sections are appended in discovery order and never mutated.
pub struct XrefSection {
    pub location: SectionLocation,

    /// Entries keyed by (object number, generation number), in file order
    pub entries: IndexMap<(u32, u32), XrefEntry>,

    /// The section's trailer dictionary (for stream sections, the stream's
    /// own dictionary)
    pub trailer: Dict,

    /// The integer after `startxref` in a classic section; redundant with
    /// the section's own location but retained
    pub declared_start: Option<u64>,
}

impl XrefSection {
    pub fn entry(&self, num: u32, generation: u32) -> Option<&XrefEntry> {
        self.entries.get(&(num, generation))
    }
}

/// Cross-reference resolver and object table.
///
/// Owns the document bytes, the discovered xref sections, and every
/// materialized indirect object. The update chain (`/XRefStm`, then `/Prev`)
/// is followed lazily, one hop at a time, when a lookup misses the sections
/// parsed so far; a location seen twice terminates the chain cleanly, which
/// also bounds traversal on malformed circular files.
pub struct XRef {
    /// Document bytes
    source: Box<dyn ByteSource>,

    /// Sections in discovery order
    sections: Vec<XrefSection>,

    /// Merged location index; the first discovered entry per object number
    /// wins, so later updates shadow the sections they amend
    index: FxHashMap<u32, XrefEntry>,

    /// Locations queued but not yet parsed
    pending: VecDeque<u64>,

    /// Byte offsets already parsed (or queued twice)
    visited_offsets: FxHashSet<u64>,

    /// XRef stream ids already parsed
    visited_streams: FxHashSet<ObjectId>,

    /// Merged trailer; first discovered section wins on identical keys
    trailer: Dict,

    /// Byte offset of the main xref
    start_offset: u64,

    /// Materialized indirect objects, kept for the life of the document
    table: FxHashMap<ObjectId, Rc<Value>>,

    /// Decoded object-stream containers
    containers: LruCache<u32, Rc<ObjectStream>, BuildHasherDefault<FxHasher>>,

    /// Containers currently being decoded; re-entry means the file declares
    /// a container packed inside itself
    loading_containers: FxHashSet<u32>,
}

impl XRef {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        let capacity =
            NonZeroUsize::new(CONTAINER_CACHE_CAP).unwrap_or(NonZeroUsize::MIN);
        XRef {
            source,
            sections: Vec::new(),
            index: FxHashMap::default(),
            pending: VecDeque::new(),
            visited_offsets: FxHashSet::default(),
            visited_streams: FxHashSet::default(),
            trailer: Dict::new(),
            start_offset: 0,
            table: FxHashMap::default(),
            containers: LruCache::with_hasher(capacity, BuildHasherDefault::default()),
            loading_containers: FxHashSet::default(),
        }
    }

    /// Locates the main xref and parses it.
    ///
    /// Older sections in the update chain are parsed later, on demand.
    pub fn load(&mut self) -> PdfResult<()> {
        let start = self.locate_start()?;
        self.start_offset = start;
        self.pending.push_back(start);
        if !self.extend_chain()? {
            return Err(PdfError::xref(
                "no cross-reference section at the declared offset",
            ));
        }
        Ok(())
    }

    /// Finds the main xref offset from the end of the file.
    ///
    /// The file ends with `startxref <offset> %%EOF`; scanning backwards,
    /// the first digit run encountered (read reversed) is the offset.
    fn locate_start(&self) -> PdfResult<u64> {
        let mut digits: Vec<u8> = Vec::new();
        let mut iter = reverse_bytes(self.source.as_ref());

        for byte in &mut iter {
            if byte.is_ascii_digit() {
                digits.push(byte);
                break;
            }
        }
        if digits.is_empty() {
            return Err(PdfError::xref(
                "startxref offset not found at end of file",
            ));
        }
        for byte in iter {
            if byte.is_ascii_digit() {
                digits.push(byte);
            } else {
                break;
            }
        }

        digits.reverse();
        let text = String::from_utf8_lossy(&digits).into_owned();
        text.parse::<u64>()
            .map_err(|_| PdfError::xref(format!("malformed startxref offset '{}'", text)))
    }

    /// Parses the next queued location, if any.
    ///
    /// Returns false once the update chain is exhausted. Locations seen
    /// before are skipped, which terminates loops.
    fn extend_chain(&mut self) -> PdfResult<bool> {
        while let Some(offset) = self.pending.pop_front() {
            if !self.visited_offsets.insert(offset) {
                continue;
            }
            self.parse_section_at(offset)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn parse_section_at(&mut self, offset: u64) -> PdfResult<()> {
        let start = usize::try_from(offset)
            .map_err(|_| PdfError::xref(format!("xref offset {} beyond addressable range", offset)))?;
        if start >= self.source.len() {
            return Err(PdfError::xref(format!(
                "xref offset {} beyond end of file",
                offset
            )));
        }

        let sub = self
            .source
            .sub_source(start, self.source.len() - start)?;
        let mut builder = ObjectBuilder::new(Lexer::new(sub));

        let first = builder.next_token()?;
        let section = match first.kind {
            TokenKind::XrefBegin => Some(self.parse_table_section(&mut builder, offset)?),
            TokenKind::Int(_) => {
                // an indirect object: restart the builder so it sees the
                // whole `N G obj` header
                let sub = self
                    .source
                    .sub_source(start, self.source.len() - start)?;
                let mut builder = ObjectBuilder::new(Lexer::new(sub));
                self.parse_stream_section(&mut builder, offset)?
            }
            other => {
                return Err(PdfError::xref(format!(
                    "expected 'xref' keyword or an indirect object at offset {}, found {:?}",
                    offset, other
                )));
            }
        };

        let section = match section {
            Some(section) => section,
            None => return Ok(()),
        };

        // queue the rest of the update chain: /XRefStm takes precedence
        // over /Prev
        if let Some(stm) = section.trailer.get_int(b"XRefStm")
            && stm >= 0
        {
            self.pending.push_back(stm as u64);
        }
        if let Some(prev) = section.trailer.get_int(b"Prev")
            && prev >= 0
        {
            self.pending.push_back(prev as u64);
        }

        // superpose trailers; the first discovered (newest) section wins
        for (key, value) in section.trailer.iter() {
            if !self.trailer.contains_key(key.as_bytes()) {
                self.trailer.insert(key.clone(), value.clone());
            }
        }

        // merge locations the same way
        for (&(num, _), entry) in section.entries.iter() {
            self.index.entry(num).or_insert_with(|| entry.clone());
        }

        self.sections.push(section);
        Ok(())
    }

    /// Parses a classic `xref` table (the keyword is already consumed).
    fn parse_table_section(
        &mut self,
        builder: &mut ObjectBuilder,
        offset: u64,
    ) -> PdfResult<XrefSection> {
        let mut entries = IndexMap::new();

        let trailer = loop {
            let token = builder.next_token()?;
            match token.kind {
                TokenKind::TrailerBegin => {
                    let value = builder.next_value()?;
                    match value {
                        Value::Dict(dict) => break dict,
                        other => {
                            return Err(PdfError::xref(format!(
                                "trailer is not a dictionary: {:?}",
                                other
                            )));
                        }
                    }
                }
                TokenKind::Comment(_) => continue,
                TokenKind::Int(first) => {
                    let first = to_u32(first, "subsection start")?;
                    let count = to_u32(expect_int(builder)?, "subsection count")?;
                    for i in 0..count {
                        let num = first.checked_add(i).ok_or_else(|| {
                            PdfError::xref("subsection object numbers overflow")
                        })?;
                        let field1 = expect_int(builder)?;
                        let generation = to_u32(expect_int(builder)?, "entry generation")?;
                        let kind = builder.next_token()?;
                        let entry = match kind.kind {
                            TokenKind::XrefInUse => XrefEntry::InUse {
                                offset: to_u64(field1, "entry offset")?,
                                generation,
                            },
                            TokenKind::XrefFree => XrefEntry::Free {
                                next_free: to_u32(field1, "next free object")?,
                                generation,
                            },
                            other => {
                                return Err(PdfError::xref(format!(
                                    "malformed xref entry at byte {}: {:?}",
                                    kind.pos, other
                                )));
                            }
                        };
                        entries.insert((num, generation), entry);
                    }
                }
                other => {
                    return Err(PdfError::xref(format!(
                        "unexpected token in xref table at byte {}: {:?}",
                        token.pos, other
                    )));
                }
            }
        };

        // the startxref line that closes the section restates this
        // section's own location
        let declared_start = match builder.next_token() {
            Ok(Token {
                kind: TokenKind::StartXref,
                ..
            }) => match builder.next_token() {
                Ok(Token {
                    kind: TokenKind::Int(n),
                    ..
                }) if n >= 0 => Some(n as u64),
                _ => None,
            },
            _ => None,
        };

        Ok(XrefSection {
            location: SectionLocation::Table(offset),
            entries,
            trailer,
            declared_start,
        })
    }

    /// Parses an xref stream section.
    ///
    /// Returns None when the stream object was already parsed through
    /// another offset, terminating the chain.
    fn parse_stream_section(
        &mut self,
        builder: &mut ObjectBuilder,
        offset: u64,
    ) -> PdfResult<Option<XrefSection>> {
        let (id, value) = builder.parse_indirect()?;
        if !self.visited_streams.insert(id) {
            return Ok(None);
        }

        let stream = match value {
            Value::Stream(stream) => stream,
            other => {
                return Err(PdfError::xref(format!(
                    "object at offset {} is not a stream: {:?}",
                    offset, other
                )));
            }
        };
        match stream.dict.get_name(b"Type") {
            Some(name) if name.as_bytes() == b"XRef" => {}
            _ => return Err(PdfError::xref("xref stream missing /Type /XRef")),
        }

        let widths = stream
            .dict
            .get_array(b"W")
            .ok_or_else(|| PdfError::xref("xref stream missing /W"))?;
        if widths.len() != 3 {
            return Err(PdfError::xref(format!(
                "/W must have 3 elements, got {}",
                widths.len()
            )));
        }
        let mut w = [0usize; 3];
        for (i, value) in widths.iter().enumerate() {
            let width = value
                .as_int()
                .ok_or_else(|| PdfError::xref("/W element is not an integer"))?;
            w[i] = usize::try_from(width)
                .map_err(|_| PdfError::xref(format!("invalid /W element {}", width)))?;
        }
        let [w1, w2, w3] = w;
        if w2 == 0 {
            return Err(PdfError::xref(
                "/W with zero-width location field cannot encode offsets",
            ));
        }

        let size = stream
            .dict
            .get_int(b"Size")
            .ok_or_else(|| PdfError::xref("xref stream missing /Size"))?;

        let ranges: Vec<(u32, u32)> = match stream.dict.get(b"Index") {
            None => vec![(0, to_u32(size, "/Size")?)],
            Some(Value::Array(pairs)) => {
                if pairs.len() % 2 != 0 {
                    return Err(PdfError::xref("/Index with odd element count"));
                }
                let mut ranges = Vec::with_capacity(pairs.len() / 2);
                for pair in pairs.chunks(2) {
                    let first = pair[0]
                        .as_int()
                        .ok_or_else(|| PdfError::xref("/Index element is not an integer"))?;
                    let count = pair[1]
                        .as_int()
                        .ok_or_else(|| PdfError::xref("/Index element is not an integer"))?;
                    ranges.push((to_u32(first, "/Index start")?, to_u32(count, "/Index count")?));
                }
                ranges
            }
            Some(other) => {
                return Err(PdfError::xref(format!(
                    "/Index is not an array: {:?}",
                    other
                )));
            }
        };

        let data = super::decode::decode_stream(&stream.dict, &stream.data)?;
        let record_len = w1 + w2 + w3;
        if record_len == 0 {
            return Err(PdfError::xref("/W describes zero-length records"));
        }

        let mut entries = IndexMap::new();
        let mut pos = 0usize;
        for (first, count) in ranges {
            for i in 0..count {
                if pos + record_len > data.len() {
                    return Err(PdfError::xref("xref stream data truncated"));
                }
                let num = first.checked_add(i).ok_or_else(|| {
                    PdfError::xref("/Index object numbers overflow")
                })?;

                // w1 == 0 defaults the record type to 1 (in use)
                let entry_type = if w1 == 0 {
                    1
                } else {
                    read_big_endian(&data[pos..pos + w1])
                };
                let field2 = read_big_endian(&data[pos + w1..pos + w1 + w2]);
                let field3 = read_big_endian(&data[pos + w1 + w2..pos + record_len]);
                pos += record_len;

                let entry = match entry_type {
                    0 => XrefEntry::Free {
                        next_free: field2 as u32,
                        generation: field3 as u32,
                    },
                    1 => XrefEntry::InUse {
                        offset: field2,
                        generation: field3 as u32,
                    },
                    2 => XrefEntry::Compressed {
                        container: field2 as u32,
                        index: field3 as u32,
                    },
                    other => {
                        return Err(PdfError::xref(format!(
                            "unknown xref entry type {} for object {}",
                            other, num
                        )));
                    }
                };
                entries.insert((num, entry.generation()), entry);
            }
        }

        Ok(Some(XrefSection {
            location: SectionLocation::Stream(id),
            entries,
            trailer: stream.dict,
            declared_start: None,
        }))
    }

    /// Fetches an indirect object by id, materializing it on demand.
    ///
    /// Free entries resolve to Null. Lookups extend the update chain one hop
    /// at a time until the id is found or the chain is exhausted.
    pub fn fetch(&mut self, id: ObjectId) -> PdfResult<Rc<Value>> {
        if let Some(cached) = self.table.get(&id) {
            return Ok(Rc::clone(cached));
        }

        let entry = loop {
            if let Some(entry) = self.index.get(&id.num) {
                break entry.clone();
            }
            if !self.extend_chain()? {
                return Err(PdfError::MissingObject { id });
            }
        };

        match entry {
            XrefEntry::Free { .. } => Ok(Rc::new(Value::Null)),

            XrefEntry::InUse { offset, generation } => {
                if generation != id.generation {
                    return Err(PdfError::MissingObject { id });
                }

                let start = usize::try_from(offset).map_err(|_| {
                    PdfError::xref(format!("object offset {} beyond addressable range", offset))
                })?;
                if start >= self.source.len() {
                    return Err(PdfError::xref(format!(
                        "object {} offset {} beyond end of file",
                        id, offset
                    )));
                }

                let sub = self
                    .source
                    .sub_source(start, self.source.len() - start)?;
                let mut builder = ObjectBuilder::new(Lexer::new(sub));
                let (parsed_id, value) = builder.parse_indirect()?;
                if parsed_id != id {
                    return Err(PdfError::parse(
                        start,
                        format!("expected object {} at this offset, found {}", id, parsed_id),
                    ));
                }

                let value = Rc::new(value);
                self.table.insert(id, Rc::clone(&value));
                Ok(value)
            }

            XrefEntry::Compressed { container, index } => {
                if id.generation != 0 {
                    return Err(PdfError::MissingObject { id });
                }
                self.fetch_compressed(id, container, index)
            }
        }
    }

    /// Fetches an object packed inside an object stream.
    ///
    /// The container is itself resolved through `fetch`, so a container
    /// listed in an older section still materializes; its decoded form is
    /// cached for the remaining children.
    fn fetch_compressed(
        &mut self,
        id: ObjectId,
        container: u32,
        index: u32,
    ) -> PdfResult<Rc<Value>> {
        let cached = self.containers.get(&container).map(Rc::clone);
        let objstm = match cached {
            Some(cached) => cached,
            None => {
                if !self.loading_containers.insert(container) {
                    return Err(PdfError::corrupt(format!(
                        "object stream {} is part of a circular container chain",
                        container
                    )));
                }
                let outcome = self.decode_container(container);
                self.loading_containers.remove(&container);
                let parsed = outcome?;
                self.containers.put(container, Rc::clone(&parsed));
                parsed
            }
        };

        let (num, value) = objstm.child(index as usize)?;
        if num != id.num {
            warn!(
                "object stream {} lists object {} at index {}, xref expected {}",
                container, num, index, id.num
            );
        }

        let value = Rc::new(value);
        self.table
            .insert(ObjectId::new(num, 0), Rc::clone(&value));
        if num != id.num {
            self.table.insert(id, Rc::clone(&value));
        }
        Ok(value)
    }

    fn decode_container(&mut self, container: u32) -> PdfResult<Rc<ObjectStream>> {
        let container_obj = self.fetch(ObjectId::new(container, 0))?;
        let stream = match &*container_obj {
            Value::Stream(stream) => stream,
            other => {
                return Err(PdfError::corrupt(format!(
                    "object {} referenced as a container is not a stream: {:?}",
                    container, other
                )));
            }
        };
        Ok(Rc::new(ObjectStream::parse(stream)?))
    }

    /// Resolves a reference, or returns any other value as-is.
    pub fn fetch_if_ref(&mut self, value: &Value) -> PdfResult<Value> {
        match value {
            Value::Ref(id) => Ok((*self.fetch(*id)?).clone()),
            other => Ok(other.clone()),
        }
    }

    /// The merged effective trailer over the sections parsed so far.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Looks a key up in the effective trailer, extending the update chain
    /// until the key appears or the chain runs out.
    pub fn trailer_value(&mut self, key: &[u8]) -> PdfResult<Option<Value>> {
        while !self.trailer.contains_key(key) {
            if !self.extend_chain()? {
                return Ok(None);
            }
        }
        Ok(self.trailer.get(key).cloned())
    }

    /// Sections in discovery order.
    pub fn sections(&self) -> &[XrefSection] {
        &self.sections
    }

    /// The main (most recent) section.
    pub fn main_section(&self) -> Option<&XrefSection> {
        self.sections.first()
    }

    /// Merged location entry for an object number.
    pub fn entry(&self, num: u32) -> Option<&XrefEntry> {
        self.index.get(&num)
    }

    /// Byte offset of the main xref.
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Number of object numbers with a known location.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn expect_int(builder: &mut ObjectBuilder) -> PdfResult<i64> {
    loop {
        let token = builder.next_token()?;
        match token.kind {
            TokenKind::Int(n) => return Ok(n),
            TokenKind::Comment(_) => continue,
            other => {
                return Err(PdfError::xref(format!(
                    "expected integer at byte {}, found {:?}",
                    token.pos, other
                )));
            }
        }
    }
}

fn to_u32(value: i64, what: &str) -> PdfResult<u32> {
    u32::try_from(value).map_err(|_| PdfError::xref(format!("invalid {} {}", what, value)))
}

fn to_u64(value: i64, what: &str) -> PdfResult<u64> {
    u64::try_from(value).map_err(|_| PdfError::xref(format!("invalid {} {}", what, value)))
}

/// Big-endian unsigned field of an xref stream record.
fn read_big_endian(bytes: &[u8]) -> u64 {
    let mut result = 0u64;
    for &byte in bytes {
        result = (result << 8) | (byte as u64);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory_source::MemorySource;

    fn xref_over(data: Vec<u8>) -> XRef {
        XRef::new(Box::new(MemorySource::from_bytes(data)))
    }

    #[test]
    fn test_read_big_endian() {
        assert_eq!(read_big_endian(&[0x01]), 1);
        assert_eq!(read_big_endian(&[0x01, 0x00]), 256);
        assert_eq!(read_big_endian(&[0x00, 0x2A]), 42);
        assert_eq!(read_big_endian(&[]), 0);
    }

    #[test]
    fn test_locate_start() {
        let xref = xref_over(b"junk\nstartxref\n1234\n%%EOF\n".to_vec());
        assert_eq!(xref.locate_start().unwrap(), 1234);
    }

    #[test]
    fn test_locate_start_missing() {
        let xref = xref_over(b"no digits here\n%%EOF-ish\n".to_vec());
        assert!(xref.locate_start().is_err());
    }

    #[test]
    fn test_classic_table_entries() {
        // one subsection `0 3` per the classic 20-byte entry format
        let mut data = b"%PDF-2.0\n".to_vec();
        let table_pos = data.len();
        data.extend_from_slice(
            b"xref\n\
              0 3\n\
              0000000000 65535 f \n\
              0000000017 00000 n \n\
              0000000044 00000 n \n\
              trailer\n<< /Size 3 >>\n",
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", table_pos).as_bytes());

        let mut xref = xref_over(data);
        xref.load().unwrap();

        assert_eq!(xref.start_offset(), table_pos as u64);
        let section = xref.main_section().unwrap();
        assert_eq!(section.location, SectionLocation::Table(table_pos as u64));
        assert_eq!(section.declared_start, Some(table_pos as u64));
        assert_eq!(
            section.entry(0, 65535),
            Some(&XrefEntry::Free {
                next_free: 0,
                generation: 65535
            })
        );
        assert_eq!(
            section.entry(1, 0),
            Some(&XrefEntry::InUse {
                offset: 17,
                generation: 0
            })
        );
        assert_eq!(
            section.entry(2, 0),
            Some(&XrefEntry::InUse {
                offset: 44,
                generation: 0
            })
        );
        assert_eq!(xref.trailer().get_int(b"Size"), Some(3));
    }

    #[test]
    fn test_classic_table_multiple_subsections() {
        let mut data = b"%PDF-2.0\n".to_vec();
        let table_pos = data.len();
        data.extend_from_slice(
            b"xref\n\
              0 1\n\
              0000000000 65535 f \n\
              5 2\n\
              0000000100 00000 n \n\
              0000000200 00001 n \n\
              trailer\n<< /Size 7 >>\n",
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", table_pos).as_bytes());

        let mut xref = xref_over(data);
        xref.load().unwrap();

        assert_eq!(
            xref.entry(5),
            Some(&XrefEntry::InUse {
                offset: 100,
                generation: 0
            })
        );
        assert_eq!(
            xref.entry(6),
            Some(&XrefEntry::InUse {
                offset: 200,
                generation: 1
            })
        );
        assert_eq!(xref.len(), 3);
    }

    #[test]
    fn test_fetch_uncompressed_object() {
        // the object sits at offset 0, so the entry is all zeros
        let mut data = b"1 0 obj\n42\nendobj\n".to_vec();
        let table_pos = data.len();
        data.extend_from_slice(
            b"xref\n\
              0 2\n\
              0000000000 65535 f \n\
              0000000000 00000 n \n\
              trailer\n<< /Size 2 >>\n",
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", table_pos).as_bytes());

        let mut xref = xref_over(data);
        xref.load().unwrap();

        let value = xref.fetch(ObjectId::new(1, 0)).unwrap();
        assert_eq!(*value, Value::Int(42));

        // second fetch comes from the object table
        let again = xref.fetch(ObjectId::new(1, 0)).unwrap();
        assert!(Rc::ptr_eq(&value, &again));
    }

    #[test]
    fn test_fetch_free_is_null() {
        let mut data = b"%PDF-2.0\n".to_vec();
        let table_pos = data.len();
        data.extend_from_slice(
            b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 >>\n",
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", table_pos).as_bytes());

        let mut xref = xref_over(data);
        xref.load().unwrap();
        assert_eq!(*xref.fetch(ObjectId::new(0, 65535)).unwrap(), Value::Null);
    }

    #[test]
    fn test_fetch_generation_mismatch() {
        let mut data = b"1 0 obj\n42\nendobj\n".to_vec();
        let table_pos = data.len();
        data.extend_from_slice(
            b"xref\n0 2\n0000000000 65535 f \n0000000000 00000 n \ntrailer\n<< /Size 2 >>\n",
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", table_pos).as_bytes());

        let mut xref = xref_over(data);
        xref.load().unwrap();
        assert!(matches!(
            xref.fetch(ObjectId::new(1, 3)),
            Err(PdfError::MissingObject { .. })
        ));
    }

    #[test]
    fn test_missing_object() {
        let mut data = b"%PDF-2.0\n".to_vec();
        let table_pos = data.len();
        data.extend_from_slice(
            b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 >>\n",
        );
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", table_pos).as_bytes());

        let mut xref = xref_over(data);
        xref.load().unwrap();
        assert_eq!(
            xref.fetch(ObjectId::new(9, 0)),
            Err(PdfError::MissingObject {
                id: ObjectId::new(9, 0)
            })
        );
    }

    #[test]
    fn test_prev_loop_terminates() {
        // /Prev points back at this same section; the chain must terminate
        // cleanly with a single parsed section
        let prefix = b"%PDF-2.0\n";
        let table_pos = prefix.len();
        let mut data = prefix.to_vec();
        data.extend_from_slice(
            format!(
                "xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 /Prev {} >>\nstartxref\n{}\n%%EOF\n",
                table_pos, table_pos
            )
            .as_bytes(),
        );

        let mut xref = xref_over(data);
        xref.load().unwrap();
        assert!(matches!(
            xref.fetch(ObjectId::new(3, 0)),
            Err(PdfError::MissingObject { .. })
        ));
        assert_eq!(xref.sections().len(), 1);
    }

    #[test]
    fn test_xref_stream_entries() {
        // /W [1 2 1], three records: two in use, one compressed
        let body: &[u8] = &[
            0x01, 0x00, 0x11, 0x00, // InUse offset 0x11 generation 0
            0x01, 0x00, 0x2A, 0x00, // InUse offset 0x2A generation 0
            0x02, 0x00, 0x03, 0x02, // Compressed container 3 index 2
        ];
        let mut data = Vec::new();
        data.extend_from_slice(
            b"5 0 obj\n<< /Type /XRef /Size 3 /W [1 2 1] /Length 12 >>\nstream\n",
        );
        data.extend_from_slice(body);
        data.extend_from_slice(b"\nendstream\nendobj\nstartxref\n0\n%%EOF\n");

        let mut xref = xref_over(data);
        xref.load().unwrap();

        let section = xref.main_section().unwrap();
        assert_eq!(
            section.location,
            SectionLocation::Stream(ObjectId::new(5, 0))
        );
        assert_eq!(
            xref.entry(0),
            Some(&XrefEntry::InUse {
                offset: 0x11,
                generation: 0
            })
        );
        assert_eq!(
            xref.entry(1),
            Some(&XrefEntry::InUse {
                offset: 0x2A,
                generation: 0
            })
        );
        assert_eq!(
            xref.entry(2),
            Some(&XrefEntry::Compressed {
                container: 3,
                index: 2
            })
        );
        // the stream dictionary doubles as the trailer
        assert_eq!(xref.trailer().get_int(b"Size"), Some(3));
    }

    #[test]
    fn test_xref_stream_w1_zero_defaults_to_in_use() {
        // records carry only (offset, generation); type defaults to 1
        let body: &[u8] = &[0x00, 0x10, 0x00, 0x00, 0x20, 0x05];
        let mut data = Vec::new();
        data.extend_from_slice(
            b"1 0 obj\n<< /Type /XRef /Size 2 /W [0 2 1] /Length 6 >>\nstream\n",
        );
        data.extend_from_slice(body);
        data.extend_from_slice(b"\nendstream\nendobj\nstartxref\n0\n%%EOF\n");

        let mut xref = xref_over(data);
        xref.load().unwrap();
        assert_eq!(
            xref.entry(0),
            Some(&XrefEntry::InUse {
                offset: 0x10,
                generation: 0
            })
        );
        assert_eq!(
            xref.entry(1),
            Some(&XrefEntry::InUse {
                offset: 0x20,
                generation: 5
            })
        );
    }

    #[test]
    fn test_xref_stream_w2_zero_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(
            b"1 0 obj\n<< /Type /XRef /Size 1 /W [1 0 1] /Length 2 >>\nstream\n",
        );
        data.extend_from_slice(&[0x01, 0x00]);
        data.extend_from_slice(b"\nendstream\nendobj\nstartxref\n0\n%%EOF\n");

        let mut xref = xref_over(data);
        assert!(matches!(xref.load(), Err(PdfError::XRef { .. })));
    }

    #[test]
    fn test_xref_stream_index_ranges() {
        // /Index [5 1 20 2]: records describe objects 5, 20 and 21
        let body: &[u8] = &[
            0x01, 0x00, 0x11, 0x00, //
            0x01, 0x00, 0x22, 0x00, //
            0x00, 0x00, 0x00, 0xFF, //
        ];
        let mut data = Vec::new();
        data.extend_from_slice(
            b"9 0 obj\n<< /Type /XRef /Size 22 /Index [5 1 20 2] /W [1 2 1] /Length 12 >>\nstream\n",
        );
        data.extend_from_slice(body);
        data.extend_from_slice(b"\nendstream\nendobj\nstartxref\n0\n%%EOF\n");

        let mut xref = xref_over(data);
        xref.load().unwrap();
        assert_eq!(
            xref.entry(5),
            Some(&XrefEntry::InUse {
                offset: 0x11,
                generation: 0
            })
        );
        assert_eq!(
            xref.entry(20),
            Some(&XrefEntry::InUse {
                offset: 0x22,
                generation: 0
            })
        );
        assert!(matches!(xref.entry(21), Some(XrefEntry::Free { .. })));
        assert!(xref.entry(6).is_none());
    }

    #[test]
    fn test_xref_stream_truncated_data() {
        let mut data = Vec::new();
        data.extend_from_slice(
            b"1 0 obj\n<< /Type /XRef /Size 3 /W [1 2 1] /Length 4 >>\nstream\n",
        );
        data.extend_from_slice(&[0x01, 0x00, 0x11, 0x00]);
        data.extend_from_slice(b"\nendstream\nendobj\nstartxref\n0\n%%EOF\n");

        let mut xref = xref_over(data);
        assert!(matches!(xref.load(), Err(PdfError::XRef { .. })));
    }

    #[test]
    fn test_xref_stream_wrong_type() {
        let mut data = Vec::new();
        data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Length 0 >>\nstream\n");
        data.extend_from_slice(b"\nendstream\nendobj\nstartxref\n0\n%%EOF\n");

        let mut xref = xref_over(data);
        assert!(matches!(xref.load(), Err(PdfError::XRef { .. })));
    }
}
