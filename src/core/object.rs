use indexmap::IndexMap;
use std::borrow::Borrow;
use std::fmt;

/// A PDF name, held as raw bytes with the leading slash stripped.
///
/// Names are not decoded (no `#xx` expansion); they compare and hash as the
/// bytes that appeared in the file, so a re-emitter can write them back
/// unchanged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<u8>);

impl Name {
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Name(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Name {
    fn from(bytes: &[u8]) -> Self {
        Name(bytes.to_vec())
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Identifier of an indirect object: object number and generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub num: u32,
    pub generation: u32,
}

impl ObjectId {
    pub fn new(num: u32, generation: u32) -> Self {
        ObjectId { num, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.num, self.generation)
    }
}

/// A PDF dictionary.
///
/// Key uniqueness is required; insertion order is preserved so the original
/// key order (the trailer's in particular) can be recovered on re-emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(IndexMap<Name, Value>);

impl Dict {
    pub fn new() -> Self {
        Dict(IndexMap::new())
    }

    /// Inserts a key, returning the previous value if the key was present.
    pub fn insert(&mut self, key: Name, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.0.iter()
    }

    /// Integer-typed lookup.
    pub fn get_int(&self, key: &[u8]) -> Option<i64> {
        match self.get(key) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Name-typed lookup.
    pub fn get_name(&self, key: &[u8]) -> Option<&Name> {
        match self.get(key) {
            Some(Value::Name(n)) => Some(n),
            _ => None,
        }
    }

    /// Array-typed lookup.
    pub fn get_array(&self, key: &[u8]) -> Option<&[Value]> {
        match self.get(key) {
            Some(Value::Array(a)) => Some(a),
            _ => None,
        }
    }

    /// Dictionary-typed lookup.
    pub fn get_dict(&self, key: &[u8]) -> Option<&Dict> {
        match self.get(key) {
            Some(Value::Dict(d)) => Some(d),
            _ => None,
        }
    }
}

/// A stream object: parameter dictionary plus raw, undecoded body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamObject {
    pub dict: Dict,
    pub data: Vec<u8>,
}

/// PDF value types as defined in ISO 32000-2.
///
/// Strings are held as raw bytes: literal strings with escapes resolved,
/// hex strings as the undecoded hex text between the angle brackets.
/// References are opaque (num, generation) pairs resolved lazily through the
/// object table, so the value graph itself is acyclic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer value
    Int(i64),

    /// Real (floating point) value
    Real(f64),

    /// Literal string, raw bytes
    String(Vec<u8>),

    /// Hex string, raw undecoded bytes
    HexString(Vec<u8>),

    /// Name value
    Name(Name),

    /// Array of values
    Array(Vec<Value>),

    /// Dictionary (key-value pairs, insertion order preserved)
    Dict(Dict),

    /// Indirect object reference (like "5 0 R")
    Ref(ObjectId),

    /// Stream: parameter dictionary plus raw body bytes
    Stream(StreamObject),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value of either an integer or a real.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Value::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Dictionary of the value: a plain dictionary, or a stream's parameters.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            Value::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<ObjectId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamObject> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }
}
