use super::error::{PdfError, PdfResult};
use super::lexer::{Lexer, Token, TokenKind};
use super::object::{Dict, Name, ObjectId, StreamObject, Value};
use log::warn;

/// Which closing token ends the value sequence being collected.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Terminator {
    ArrayEnd,
    DictEnd,
    ObjEnd,
    Eof,
}

/// Builds PDF values from the lexer's token stream.
///
/// Scalar tokens accumulate iteratively on a value stack; the triggering
/// keywords `R` and `obj` pop their two operand integers off the top when
/// they arrive, so the lexer never needs to look back. Only array,
/// dictionary and indirect-object nesting recurses.
pub struct ObjectBuilder {
    lexer: Lexer,
}

impl ObjectBuilder {
    pub fn new(lexer: Lexer) -> Self {
        ObjectBuilder { lexer }
    }

    /// Convenience constructor over an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        ObjectBuilder::new(Lexer::from_bytes(data))
    }

    /// Passes one raw token through; the xref resolver drives classic
    /// tables at token level.
    pub fn next_token(&mut self) -> PdfResult<Token> {
        self.lexer.next_token()
    }

    /// File offset of the next byte to be consumed.
    pub fn pos(&self) -> usize {
        self.lexer.pos()
    }

    /// Parses a single value (scalar, array or dictionary).
    ///
    /// Used for self-delimiting material such as the trailer dictionary; it
    /// does not compose `N G R` references at its own top level.
    pub fn next_value(&mut self) -> PdfResult<Value> {
        loop {
            let token = self.lexer.next_token()?;
            if let TokenKind::Comment(_) = token.kind {
                continue;
            }
            if let Some(value) = self.scalar_value(&token.kind) {
                return Ok(value);
            }
            return match token.kind {
                TokenKind::ArrayBegin => {
                    let items = self.collect_until(Terminator::ArrayEnd)?;
                    Ok(Value::Array(items))
                }
                TokenKind::DictBegin => Ok(Value::Dict(self.build_dict(token.pos)?)),
                other => Err(PdfError::parse(
                    token.pos,
                    format!("expected a value, found {:?}", other),
                )),
            };
        }
    }

    /// Parses an indirect object: `N G obj <body> endobj`.
    ///
    /// The first value of the body is the object's value; a dictionary
    /// immediately followed by a stream body becomes a Stream value.
    pub fn parse_indirect(&mut self) -> PdfResult<(ObjectId, Value)> {
        let mut operands: Vec<(i64, usize)> = Vec::new();
        let (id, obj_pos) = loop {
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Comment(_) => continue,
                TokenKind::Int(n) => operands.push((n, token.pos)),
                TokenKind::ObjBegin => {
                    let generation = operands.pop();
                    let num = operands.pop();
                    match (num, generation) {
                        (Some((num, num_pos)), Some((generation, _))) => {
                            let num = to_obj_number(num, num_pos)?;
                            let generation = to_obj_number(generation, num_pos)?;
                            break (ObjectId::new(num, generation), token.pos);
                        }
                        _ => {
                            return Err(PdfError::parse(
                                token.pos,
                                "'obj' needs two preceding integers",
                            ));
                        }
                    }
                }
                TokenKind::Eof => {
                    return Err(PdfError::parse(
                        token.pos,
                        "end of input before 'obj' keyword",
                    ));
                }
                other => {
                    return Err(PdfError::parse(
                        token.pos,
                        format!("expected indirect object header, found {:?}", other),
                    ));
                }
            }
        };

        let mut body = self.collect_until(Terminator::ObjEnd)?;
        if body.is_empty() {
            return Err(PdfError::parse(obj_pos, "indirect object with empty body"));
        }
        if body.len() > 1 {
            warn!(
                "object {}: {} extra values before endobj ignored",
                id,
                body.len() - 1
            );
        }
        let value = body.swap_remove(0);
        Ok((id, value))
    }

    /// Parses a bare value sequence running to end of input.
    ///
    /// Object-stream children carry no `obj`/`endobj` wrappers; each child is
    /// sub-parsed from its own byte slice.
    pub fn parse_standalone(&mut self) -> PdfResult<Value> {
        let mut values = self.collect_until(Terminator::Eof)?;
        if values.is_empty() {
            return Err(PdfError::parse(self.lexer.pos(), "no value found"));
        }
        if values.len() > 1 {
            warn!("{} extra values after the first ignored", values.len() - 1);
        }
        Ok(values.swap_remove(0))
    }

    fn scalar_value(&self, kind: &TokenKind) -> Option<Value> {
        match kind {
            TokenKind::Int(n) => Some(Value::Int(*n)),
            TokenKind::Real(r) => Some(Value::Real(*r)),
            TokenKind::LiteralString(s) => Some(Value::String(s.clone())),
            TokenKind::HexString(s) => Some(Value::HexString(s.clone())),
            TokenKind::Name(n) => Some(Value::Name(Name::new(n.clone()))),
            TokenKind::Bool(b) => Some(Value::Bool(*b)),
            TokenKind::Null => Some(Value::Null),
            _ => None,
        }
    }

    /// Runs the value stack until the given terminator arrives.
    fn collect_until(&mut self, end: Terminator) -> PdfResult<Vec<Value>> {
        let mut stack: Vec<Value> = Vec::new();

        loop {
            let token = self.lexer.next_token()?;
            if let Some(value) = self.scalar_value(&token.kind) {
                stack.push(value);
                continue;
            }
            match token.kind {
                TokenKind::Comment(_) => {}
                TokenKind::ArrayBegin => {
                    let items = self.collect_until(Terminator::ArrayEnd)?;
                    stack.push(Value::Array(items));
                }
                TokenKind::DictBegin => {
                    stack.push(Value::Dict(self.build_dict(token.pos)?));
                }
                TokenKind::ObjRef => {
                    let id = pop_reference_operands(&mut stack, token.pos)?;
                    stack.push(Value::Ref(id));
                }
                TokenKind::Stream(data) => {
                    match stack.pop() {
                        Some(Value::Dict(dict)) => {
                            check_declared_length(&dict, &data);
                            stack.push(Value::Stream(StreamObject { dict, data }));
                        }
                        _ => {
                            return Err(PdfError::parse(
                                token.pos,
                                "stream body without a preceding dictionary",
                            ));
                        }
                    }
                }
                TokenKind::ArrayEnd if end == Terminator::ArrayEnd => return Ok(stack),
                TokenKind::DictEnd if end == Terminator::DictEnd => return Ok(stack),
                TokenKind::ObjEnd if end == Terminator::ObjEnd => return Ok(stack),
                TokenKind::Eof if end == Terminator::Eof => return Ok(stack),
                TokenKind::Eof => {
                    return Err(PdfError::parse(token.pos, "unexpected end of input"));
                }
                other => {
                    return Err(PdfError::parse(
                        token.pos,
                        format!("unexpected {:?}", other),
                    ));
                }
            }
        }
    }

    /// Pairs the collected items of a `<< ... >>` region into a dictionary.
    fn build_dict(&mut self, pos: usize) -> PdfResult<Dict> {
        let items = self.collect_until(Terminator::DictEnd)?;
        if items.len() % 2 != 0 {
            return Err(PdfError::parse(pos, "dictionary with a dangling key"));
        }

        let mut dict = Dict::new();
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            let key = match key {
                Value::Name(name) => name,
                other => {
                    return Err(PdfError::parse(
                        pos,
                        format!("dictionary key is not a name: {:?}", other),
                    ));
                }
            };
            if dict.insert(key.clone(), value).is_some() {
                warn!("duplicate dictionary key {:?}, keeping the later value", key);
            }
        }
        Ok(dict)
    }
}

/// Pops `(num, generation)` for an `R` keyword off the value stack.
fn pop_reference_operands(stack: &mut Vec<Value>, pos: usize) -> PdfResult<ObjectId> {
    let generation = stack.pop();
    let num = stack.pop();
    match (num, generation) {
        (Some(Value::Int(num)), Some(Value::Int(generation))) => Ok(ObjectId::new(
            to_obj_number(num, pos)?,
            to_obj_number(generation, pos)?,
        )),
        (num, generation) => {
            // put anything we popped back; the caller reports the error
            if let Some(n) = num {
                stack.push(n);
            }
            if let Some(g) = generation {
                stack.push(g);
            }
            Err(PdfError::parse(pos, "'R' needs two preceding integers"))
        }
    }
}

fn to_obj_number(value: i64, pos: usize) -> PdfResult<u32> {
    u32::try_from(value)
        .map_err(|_| PdfError::parse(pos, format!("object number {} out of range", value)))
}

/// Warns when a declared integer `/Length` disagrees with the scanned body.
fn check_declared_length(dict: &Dict, data: &[u8]) {
    if let Some(declared) = dict.get_int(b"Length")
        && declared != data.len() as i64
    {
        warn!(
            "stream /Length {} disagrees with scanned body length {}",
            declared,
            data.len()
        );
    }
}
