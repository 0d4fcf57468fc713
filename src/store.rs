// src/store.rs

//! Backend seams.
//!
//! The mill data lives in two hosted stores: a realtime key-value tree
//! (operational data, addressed by slash-separated paths) and a document
//! store (catalog, dealers, orders). Both have a REST client in `remote`
//! and a local SQLite mirror in `db`.

use crate::errors::MillError;
use serde_json::{Map, Value};

/// Hierarchical JSON tree addressed by paths like `products/abc/current_stock`.
///
/// Semantics follow the hosted tree store: writing `null` removes a node,
/// objects left empty by a removal disappear, and reading a missing path
/// returns `None`.
pub trait TreeStore {
    fn get(&self, path: &str) -> Result<Option<Value>, MillError>;

    /// Replace the node at `path`.
    fn set(&self, path: &str, value: &Value) -> Result<(), MillError>;

    /// Merge `fields` into the node at `path`. Keys may themselves be
    /// relative paths (`"a/b": 1`).
    fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), MillError>;

    /// Append a child under a generated, time-ordered key and return the key.
    fn push(&self, path: &str, value: &Value) -> Result<String, MillError>;

    /// A fresh time-ordered child key, for records that store their own id.
    fn new_key(&self) -> String {
        crate::db::push_id::generate_push_id(chrono::Utc::now().timestamp_millis())
    }

    fn remove(&self, path: &str) -> Result<(), MillError> {
        self.set(path, &Value::Null)
    }
}

/// A single document in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    /// The document data with its id folded in, the shape callers decode.
    pub fn to_value(&self) -> Value {
        let mut data = self.data.clone();
        data.entry("id".to_string())
            .or_insert_with(|| Value::String(self.id.clone()));
        Value::Object(data)
    }
}

pub trait DocumentStore {
    fn list(&self, collection: &str) -> Result<Vec<Document>, MillError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, MillError>;

    /// Create or replace.
    fn set(&self, collection: &str, id: &str, data: &Map<String, Value>) -> Result<(), MillError>;

    /// Merge fields into an existing document. `NotFound` if it does not exist.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), MillError>;

    /// Documents whose top-level `field` equals `value`.
    fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, MillError>;
}

/// Split a tree path into its segments.
///
/// Leading, trailing and doubled slashes are ignored. The root path (`""` or
/// `"/"`) yields no segments. Keys may not contain `.`, `$`, `#`, `[` or `]`.
pub fn path_segments(path: &str) -> Result<Vec<&str>, MillError> {
    let mut out = Vec::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if seg.contains(&['.', '$', '#', '[', ']'][..]) {
            return Err(MillError::BadRequest(format!(
                "invalid key '{seg}' in path '{path}'"
            )));
        }
        out.push(seg);
    }
    Ok(out)
}

/// Join a base path and a child key.
pub fn child_path(base: &str, key: &str) -> String {
    let base = base.trim_end_matches('/');
    let key = key.trim_start_matches('/');
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_ignore_redundant_slashes() {
        assert_eq!(
            path_segments("/products//abc/").unwrap(),
            vec!["products", "abc"]
        );
        assert!(path_segments("/").unwrap().is_empty());
    }

    #[test]
    fn segments_reject_reserved_characters() {
        assert!(path_segments("products/a.b").is_err());
        assert!(path_segments("workers/$key").is_err());
    }

    #[test]
    fn document_value_keeps_existing_id_field() {
        let mut data = Map::new();
        data.insert("id".into(), Value::String("P-1".into()));
        let doc = Document {
            id: "auto123".into(),
            data,
        };
        assert_eq!(doc.to_value()["id"], "P-1");
    }
}
