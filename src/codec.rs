//! Blob codec: `Document` <-> bytes.
//!
//! Layout: the 4-byte `ZINE` magic followed by an Automerge document whose
//! root map holds
//! - `header`: `{ format, version }`, reconciled with autosurgeon
//! - `entries`: a list of `[key, value]` pairs
//!
//! Automerge maps do not keep insertion order, so documents are written as
//! lists of two-element lists. A nested document is another such list;
//! scalar datums are Automerge scalars; `Floats`, `Packed` and `Json` are
//! maps tagged with `kind` and carrying `data`.

use automerge::{
    transaction::Transactable, AutoCommit, ObjId, ObjType, ReadDoc, ScalarValue,
    Value as AmValue, ROOT,
};
use autosurgeon::{hydrate, reconcile, Hydrate, Reconcile};

use crate::document::{Datum, Document, Value};
use crate::error::{ZineError, ZineResult};

/// Leading marker identifying a zine blob to external tooling.
pub const ZINE_MAGIC: &[u8; 4] = b"ZINE";

/// Format name written to the header.
pub const FORMAT_NAME: &str = "zine";

/// Current layout version.
pub const FORMAT_VERSION: i32 = 1;

const KIND_FLOATS: &str = "f32le";
const KIND_PACKED: &str = "f32le+gzip";
const KIND_JSON: &str = "json";

/// Root of the Automerge container (the `entries` list is written directly).
#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate)]
struct BlobRoot {
    header: BlobHeader,
}

#[derive(Debug, Clone, PartialEq, Reconcile, Hydrate)]
struct BlobHeader {
    format: String,
    version: i32,
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encodes a document as a zine blob.
pub fn encode(document: &Document) -> ZineResult<Vec<u8>> {
    let mut doc = AutoCommit::new();
    let root = BlobRoot {
        header: BlobHeader {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
        },
    };
    reconcile(&mut doc, &root)?;

    let entries = doc.put_object(ROOT, "entries", ObjType::List)?;
    write_entries(&mut doc, &entries, document)?;

    let body = doc.save();
    let mut bytes = Vec::with_capacity(ZINE_MAGIC.len() + body.len());
    bytes.extend_from_slice(ZINE_MAGIC);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn write_entries(doc: &mut AutoCommit, list: &ObjId, document: &Document) -> ZineResult<()> {
    for (index, (key, value)) in document.iter().enumerate() {
        let entry = doc.insert_object(list, index, ObjType::List)?;
        doc.insert(&entry, 0, key)?;
        match value {
            Value::Document(child) => {
                let child_list = doc.insert_object(&entry, 1, ObjType::List)?;
                write_entries(doc, &child_list, child)?;
            }
            Value::Datum(datum) => write_datum(doc, &entry, datum)?,
        }
    }
    Ok(())
}

fn write_datum(doc: &mut AutoCommit, entry: &ObjId, datum: &Datum) -> ZineResult<()> {
    let scalar = match datum {
        Datum::Null => ScalarValue::Null,
        Datum::Bool(b) => ScalarValue::Boolean(*b),
        Datum::Int(i) => ScalarValue::Int(*i),
        Datum::Float(f) => ScalarValue::F64(*f),
        Datum::Str(s) => ScalarValue::Str(s.as_str().into()),
        Datum::Bytes(b) => ScalarValue::Bytes(b.clone()),
        Datum::Floats(values) => {
            return write_tagged(doc, entry, KIND_FLOATS, ScalarValue::Bytes(floats_to_le_bytes(values)))
        }
        Datum::Packed(bytes) => {
            return write_tagged(doc, entry, KIND_PACKED, ScalarValue::Bytes(bytes.clone()))
        }
        Datum::Json(json) => {
            let text = serde_json::to_string(json)?;
            return write_tagged(doc, entry, KIND_JSON, ScalarValue::Str(text.into()));
        }
    };
    doc.insert(entry, 1, scalar)?;
    Ok(())
}

fn write_tagged(doc: &mut AutoCommit, entry: &ObjId, kind: &str, data: ScalarValue) -> ZineResult<()> {
    let obj = doc.insert_object(entry, 1, ObjType::Map)?;
    doc.put(&obj, "kind", kind)?;
    doc.put(&obj, "data", data)?;
    Ok(())
}

// =============================================================================
// DECODE
// =============================================================================

/// Decodes a zine blob.
pub fn decode(bytes: &[u8]) -> ZineResult<Document> {
    let body = bytes
        .strip_prefix(ZINE_MAGIC.as_slice())
        .ok_or(ZineError::InvalidMagic { expected: "ZINE" })?;
    let doc = AutoCommit::load(body)?;

    let root: BlobRoot = hydrate(&doc)?;
    if root.header.format != FORMAT_NAME {
        return Err(ZineError::schema_violation(format!(
            "unexpected format '{}'",
            root.header.format
        )));
    }
    if root.header.version > FORMAT_VERSION {
        return Err(ZineError::schema_violation(format!(
            "unsupported version {} (newest known is {})",
            root.header.version, FORMAT_VERSION
        )));
    }

    match doc.get(ROOT, "entries")? {
        Some((AmValue::Object(ObjType::List), entries)) => read_entries(&doc, &entries),
        Some(_) => Err(ZineError::schema_violation("'entries' is not a list")),
        None => Err(ZineError::schema_violation("missing 'entries'")),
    }
}

fn read_entries(doc: &AutoCommit, list: &ObjId) -> ZineResult<Document> {
    let mut document = Document::new();
    for index in 0..doc.length(list) {
        let entry = match doc.get(list, index)? {
            Some((AmValue::Object(ObjType::List), entry)) => entry,
            _ => {
                return Err(ZineError::schema_violation(format!(
                    "entry {} is not a [key, value] pair",
                    index
                )))
            }
        };
        if doc.length(&entry) != 2 {
            return Err(ZineError::schema_violation(format!(
                "entry {} has {} elements, expected 2",
                index,
                doc.length(&entry)
            )));
        }

        let key = match doc.get(&entry, 0)? {
            Some((AmValue::Scalar(s), _)) => match s.as_ref() {
                ScalarValue::Str(k) => k.to_string(),
                _ => return Err(ZineError::schema_violation(format!("entry {} key is not a string", index))),
            },
            _ => return Err(ZineError::schema_violation(format!("entry {} key is not a string", index))),
        };

        let value = match doc.get(&entry, 1)? {
            Some((AmValue::Object(ObjType::List), child)) => Value::Document(read_entries(doc, &child)?),
            Some((AmValue::Object(ObjType::Map), tagged)) => Value::Datum(read_tagged(doc, &tagged)?),
            Some((AmValue::Scalar(s), _)) => Value::Datum(scalar_to_datum(s.as_ref())?),
            _ => {
                return Err(ZineError::schema_violation(format!(
                    "entry '{}' has an unsupported value",
                    key
                )))
            }
        };

        if document.contains_key(&key) {
            return Err(ZineError::schema_violation(format!("duplicate key '{}'", key)));
        }
        document.insert(key, value);
    }
    Ok(document)
}

fn scalar_to_datum(scalar: &ScalarValue) -> ZineResult<Datum> {
    match scalar {
        ScalarValue::Null => Ok(Datum::Null),
        ScalarValue::Boolean(b) => Ok(Datum::Bool(*b)),
        ScalarValue::Int(i) => Ok(Datum::Int(*i)),
        ScalarValue::Uint(u) => i64::try_from(*u)
            .map(Datum::Int)
            .map_err(|_| ZineError::schema_violation(format!("integer {} out of range", u))),
        ScalarValue::F64(f) => Ok(Datum::Float(*f)),
        ScalarValue::Str(s) => Ok(Datum::Str(s.to_string())),
        ScalarValue::Bytes(b) => Ok(Datum::Bytes(b.clone())),
        other => Err(ZineError::schema_violation(format!(
            "unsupported scalar {:?}",
            other
        ))),
    }
}

fn read_tagged(doc: &AutoCommit, obj: &ObjId) -> ZineResult<Datum> {
    let kind = match doc.get(obj, "kind")? {
        Some((AmValue::Scalar(s), _)) => match s.as_ref() {
            ScalarValue::Str(k) => k.to_string(),
            _ => return Err(ZineError::schema_violation("tagged value 'kind' is not a string")),
        },
        _ => return Err(ZineError::schema_violation("tagged value without 'kind'")),
    };
    let data = match doc.get(obj, "data")? {
        Some((AmValue::Scalar(s), _)) => s.into_owned(),
        _ => return Err(ZineError::schema_violation(format!("'{}' value without 'data'", kind))),
    };

    match (kind.as_str(), data) {
        (KIND_FLOATS, ScalarValue::Bytes(bytes)) => Ok(Datum::Floats(le_bytes_to_floats(&bytes)?)),
        (KIND_PACKED, ScalarValue::Bytes(bytes)) => Ok(Datum::Packed(bytes)),
        (KIND_JSON, ScalarValue::Str(text)) => Ok(Datum::Json(serde_json::from_str(&text)?)),
        (kind, _) => Err(ZineError::schema_violation(format!(
            "unknown or malformed tagged value '{}'",
            kind
        ))),
    }
}

// =============================================================================
// FLOAT PACKING HELPERS
// =============================================================================

/// Little-endian bytes of an f32 array.
pub fn floats_to_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`floats_to_le_bytes`].
pub fn le_bytes_to_floats(bytes: &[u8]) -> ZineResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(ZineError::schema_violation(format!(
            "float buffer length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_document() -> Document {
        Document::new()
            .with_entry(
                "zeta-panel",
                Document::new()
                    .with_entry(
                        "m-layer",
                        Document::new()
                            .with_entry("name", "background")
                            .with_entry("visible", true)
                            .with_entry("index", 3i64)
                            .with_entry("fov", 0.75f64)
                            .with_entry("image", vec![0x89u8, 0x50, 0x4e, 0x47])
                            .with_entry("depthField", vec![0.5f32, -1.25, 1e6])
                            .with_entry("packed", Datum::Packed(vec![0x1f, 0x8b, 0x08]))
                            .with_entry(
                                "camera",
                                serde_json::json!({"position": [0, 1, 2], "quaternion": [0, 0, 0, 1]}),
                            )
                            .with_entry("empty", Datum::Null),
                    )
                    .with_entry("a-layer", Document::new()),
            )
            .with_entry("alpha-panel", Document::new())
    }

    #[test]
    fn test_roundtrip_preserves_order_and_nesting() {
        let doc = rich_document();
        let bytes = encode(&doc).unwrap();
        let back = decode(&bytes).unwrap();

        assert_eq!(back, doc);
        // insertion order, not sorted order
        assert_eq!(back.keys(), vec!["zeta-panel", "alpha-panel"]);
        assert_eq!(
            back.document_at(&["zeta-panel"]).unwrap().keys(),
            vec!["m-layer", "a-layer"]
        );
    }

    #[test]
    fn test_blob_starts_with_magic() {
        let bytes = encode(&Document::new()).unwrap();
        assert_eq!(&bytes[..4], b"ZINE");
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_missing_magic() {
        let err = decode(b"NOPE-not-a-zine").unwrap_err();
        assert!(matches!(err, ZineError::InvalidMagic { .. }));

        let err = decode(b"ZI").unwrap_err();
        assert!(matches!(err, ZineError::InvalidMagic { .. }));
    }

    #[test]
    fn test_decode_rejects_corrupt_body() {
        let mut bytes = encode(&rich_document()).unwrap();
        bytes.truncate(12);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_newer_version() {
        let mut doc = AutoCommit::new();
        let root = BlobRoot {
            header: BlobHeader {
                format: FORMAT_NAME.to_string(),
                version: FORMAT_VERSION + 1,
            },
        };
        reconcile(&mut doc, &root).unwrap();
        doc.put_object(ROOT, "entries", ObjType::List).unwrap();
        let mut bytes = ZINE_MAGIC.to_vec();
        bytes.extend_from_slice(&doc.save());

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ZineError::SchemaViolation(_)));
    }

    #[test]
    fn test_float_bytes_helpers() {
        let values = vec![1.0f32, -2.5, f32::MAX];
        let bytes = floats_to_le_bytes(&values);
        assert_eq!(bytes.len(), 12);
        assert_eq!(le_bytes_to_floats(&bytes).unwrap(), values);
        assert!(le_bytes_to_floats(&bytes[..5]).is_err());
    }
}
