//! Data model for the zine document.
//!
//! A document is an ordered list of `(key, value)` entries where each value is
//! either a terminal [`Datum`] or another [`Document`]. Insertion order is the
//! only ordering; keys are unique within one level.
//!
//! JSON shape: a document is an array of `[key, value]` pairs and a datum is
//! an adjacently tagged object (`{"type": "floats", "value": [...]}`).

use paste::paste;
use serde::{Deserialize, Serialize};

use crate::error::{ZineError, ZineResult};

// =============================================================================
// DATUM
// =============================================================================

/// Terminal value stored at a leaf of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Raw numeric field array (depth fields, floor net depths, ...).
    Floats(Vec<f32>),
    /// Compressed form of [`Datum::Floats`]: gzip of the little-endian f32 bytes.
    Packed(Vec<u8>),
    /// Structured record (camera parameters, transforms, ...).
    Json(serde_json::Value),
}

/// Generates `as_*` / `is_*` accessors for each payload-carrying variant.
macro_rules! datum_accessors {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        paste! {
            $(
                #[doc = concat!("Returns the payload of a `", stringify!($variant), "` datum.")]
                pub fn [<as_ $variant:snake>](&self) -> Option<&$ty> {
                    match self {
                        Datum::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[doc = concat!("Returns true for a `", stringify!($variant), "` datum.")]
                pub fn [<is_ $variant:snake>](&self) -> bool {
                    matches!(self, Datum::$variant(_))
                }
            )*
        }
    };
}

impl Datum {
    datum_accessors!(
        Bool => bool,
        Int => i64,
        Float => f64,
        Str => String,
        Bytes => Vec<u8>,
        Floats => Vec<f32>,
        Packed => Vec<u8>,
        Json => serde_json::Value,
    );

    /// Returns true for [`Datum::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Short name of the variant, as used in the serde tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Float(_) => "float",
            Datum::Str(_) => "str",
            Datum::Bytes(_) => "bytes",
            Datum::Floats(_) => "floats",
            Datum::Packed(_) => "packed",
            Datum::Json(_) => "json",
        }
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Bool(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(v as i64)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Float(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::Str(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::Str(v)
    }
}

impl From<Vec<u8>> for Datum {
    fn from(v: Vec<u8>) -> Self {
        Datum::Bytes(v)
    }
}

impl From<Vec<f32>> for Datum {
    fn from(v: Vec<f32>) -> Self {
        Datum::Floats(v)
    }
}

impl From<serde_json::Value> for Datum {
    fn from(v: serde_json::Value) -> Self {
        Datum::Json(v)
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A document value: a nested document or a terminal datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Document(Document),
    Datum(Datum),
}

impl Value {
    /// Creates an empty nested document value.
    pub fn empty_document() -> Self {
        Value::Document(Document::new())
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            Value::Datum(_) => None,
        }
    }

    pub fn as_datum(&self) -> Option<&Datum> {
        match self {
            Value::Datum(d) => Some(d),
            Value::Document(_) => None,
        }
    }

    pub fn into_datum(self) -> Option<Datum> {
        match self {
            Value::Datum(d) => Some(d),
            Value::Document(_) => None,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<Datum> for Value {
    fn from(d: Datum) -> Self {
        Value::Datum(d)
    }
}

macro_rules! value_from_datum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Datum(v.into())
                }
            }
        )*
    };
}

value_from_datum!(bool, i64, i32, f64, &str, String, Vec<u8>, Vec<f32>, serde_json::Value);

// =============================================================================
// DOCUMENT
// =============================================================================

/// Ordered, key-unique list of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, Value)>", into = "Vec<(String, Value)>")]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append an entry (overwrites in place if the key exists).
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Returns the number of entries at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries at this level.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys at this level, in entry order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Position of `key` in entry order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Inserts or overwrites an entry. Overwrites keep their position; new
    /// keys are appended. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes an entry, keeping the order of its siblings.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // =========================================================================
    // PATH OPERATIONS
    // =========================================================================

    /// Walks nested documents along `path`. The empty path is `self`.
    /// Returns `None` if any segment is missing or names a terminal.
    pub fn document_at<K: AsRef<str>>(&self, path: &[K]) -> Option<&Document> {
        let mut current = self;
        for key in path {
            current = match current.get(key.as_ref())? {
                Value::Document(d) => d,
                Value::Datum(_) => return None,
            };
        }
        Some(current)
    }

    fn document_at_mut<K: AsRef<str>>(&mut self, path: &[K]) -> Option<&mut Document> {
        let mut current = self;
        for key in path {
            current = match current.get_mut(key.as_ref()) {
                Some(Value::Document(d)) => d,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Value at a non-empty `path`.
    pub fn lookup<K: AsRef<str>>(&self, path: &[K]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        self.document_at(parents)?.get(last.as_ref())
    }

    /// Sets the value at `path`, materializing empty documents for missing
    /// intermediate segments. Returns the previous value, if any.
    pub fn set_path<K: AsRef<str>>(&mut self, path: &[K], value: Value) -> ZineResult<Option<Value>> {
        let (last, parents) = path.split_last().ok_or(ZineError::EmptyPath)?;
        let mut current = self;
        for (depth, key) in parents.iter().enumerate() {
            let key = key.as_ref();
            if !current.contains_key(key) {
                current.entries.push((key.to_string(), Value::empty_document()));
            }
            current = match current.get_mut(key) {
                Some(Value::Document(d)) => d,
                _ => {
                    return Err(ZineError::schema_violation(format!(
                        "cannot descend into terminal at {:?}",
                        path[..=depth].iter().map(|k| k.as_ref()).collect::<Vec<_>>()
                    )))
                }
            };
        }
        Ok(current.insert(last.as_ref(), value))
    }

    /// Removes the entry at `path`. Fails if the parent path or the terminal
    /// key does not exist.
    pub fn delete_path<K: AsRef<str>>(&mut self, path: &[K]) -> ZineResult<Value> {
        let (last, parents) = path.split_last().ok_or(ZineError::EmptyPath)?;
        let parent = self
            .document_at_mut(parents)
            .ok_or_else(|| ZineError::key_not_found(path))?;
        parent
            .remove(last.as_ref())
            .ok_or_else(|| ZineError::key_not_found(path))
    }
}

impl TryFrom<Vec<(String, Value)>> for Document {
    type Error = ZineError;

    /// Rejects duplicate keys at this level.
    fn try_from(entries: Vec<(String, Value)>) -> ZineResult<Self> {
        let mut doc = Document::new();
        for (key, value) in entries {
            if doc.contains_key(&key) {
                return Err(ZineError::schema_violation(format!("duplicate key '{}'", key)));
            }
            doc.entries.push((key, value));
        }
        Ok(doc)
    }
}

impl From<Document> for Vec<(String, Value)> {
    fn from(doc: Document) -> Self {
        doc.entries
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

// =============================================================================
// TESTS
// =============================================================================
