use super::builder::ObjectBuilder;
use super::decode;
use super::error::{PdfError, PdfResult};
use super::object::{StreamObject, Value};

/// A parsed `/Type /ObjStm` container.
///
/// The decoded body starts with `N` integer pairs `(object number, byte
/// offset after the header)`, followed at `/First` by the concatenated
/// object bodies. Contained objects are bare values with no `obj`/`endobj`
/// wrappers, and all have generation number 0.
///
/// The inflated body and the number/offset pairs are kept so that repeated
/// child access never re-inflates the stream.
pub struct ObjectStream {
    pairs: Vec<(u32, usize)>,
    first: usize,
    body: Vec<u8>,
}

impl ObjectStream {
    /// Decodes the container and reads its pair header.
    pub fn parse(stream: &StreamObject) -> PdfResult<Self> {
        match stream.dict.get_name(b"Type") {
            Some(name) if name.as_bytes() == b"ObjStm" => {}
            _ => {
                return Err(PdfError::corrupt(
                    "compressed-object container is not an object stream",
                ));
            }
        }

        let count = stream
            .dict
            .get_int(b"N")
            .ok_or_else(|| PdfError::corrupt("object stream missing /N"))?;
        let first = stream
            .dict
            .get_int(b"First")
            .ok_or_else(|| PdfError::corrupt("object stream missing /First"))?;

        let body = decode::decode_stream(&stream.dict, &stream.data)?;

        let count = usize::try_from(count)
            .map_err(|_| PdfError::corrupt(format!("invalid object stream /N {}", count)))?;
        let first = usize::try_from(first)
            .map_err(|_| PdfError::corrupt(format!("invalid object stream /First {}", first)))?;
        if first > body.len() {
            return Err(PdfError::corrupt(format!(
                "object stream /First {} beyond body of {} bytes",
                first,
                body.len()
            )));
        }

        let mut header = ObjectBuilder::from_bytes(body[..first].to_vec());
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let num = expect_int(&mut header)?;
            let offset = expect_int(&mut header)?;
            let num = u32::try_from(num)
                .map_err(|_| PdfError::corrupt(format!("invalid contained object number {}", num)))?;
            let offset = usize::try_from(offset)
                .map_err(|_| PdfError::corrupt(format!("invalid contained offset {}", offset)))?;
            pairs.push((num, offset));
        }

        Ok(ObjectStream { pairs, first, body })
    }

    /// Number of contained objects.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Object number of the contained object at `index`.
    pub fn object_number(&self, index: usize) -> Option<u32> {
        self.pairs.get(index).map(|&(num, _)| num)
    }

    /// Byte slice of the contained object at `index`.
    fn child_bytes(&self, index: usize) -> PdfResult<&[u8]> {
        let &(_, offset) = self.pairs.get(index).ok_or_else(|| {
            PdfError::corrupt(format!(
                "contained object index {} out of range ({} objects)",
                index,
                self.pairs.len()
            ))
        })?;

        let start = self.first.checked_add(offset).ok_or_else(|| {
            PdfError::corrupt(format!("contained offset {} overflows", offset))
        })?;
        let end = match self.pairs.get(index + 1) {
            Some(&(_, next_offset)) => self.first.checked_add(next_offset).ok_or_else(|| {
                PdfError::corrupt(format!("contained offset {} overflows", next_offset))
            })?,
            None => self.body.len(),
        };
        if start > end || end > self.body.len() {
            return Err(PdfError::corrupt(format!(
                "contained object {} spans {}..{} outside body of {} bytes",
                index,
                start,
                end,
                self.body.len()
            )));
        }
        Ok(&self.body[start..end])
    }

    /// Parses the contained object at `index`.
    ///
    /// Returns the object number listed in the header together with the
    /// value.
    pub fn child(&self, index: usize) -> PdfResult<(u32, Value)> {
        let bytes = self.child_bytes(index)?.to_vec();
        let mut builder = ObjectBuilder::from_bytes(bytes);
        let value = builder.parse_standalone()?;
        Ok((self.pairs[index].0, value))
    }
}

fn expect_int(builder: &mut ObjectBuilder) -> PdfResult<i64> {
    use super::lexer::TokenKind;
    loop {
        let token = builder.next_token()?;
        match token.kind {
            TokenKind::Int(n) => return Ok(n),
            TokenKind::Comment(_) => continue,
            other => {
                return Err(PdfError::corrupt(format!(
                    "object stream header: expected integer, found {:?}",
                    other
                )));
            }
        }
    }
}
