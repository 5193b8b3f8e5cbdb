//! Document keys and documents
//!
//! A document is a key plus a map of fields. Field lookup walks nested maps.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::errors::{ModelError, ModelResult};
use super::path::{FieldPath, ResourcePath};
use super::value::FieldValue;
use crate::observability::invariant_violation;

/// Identity of a document: a resource path with an even number of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    /// Creates a key, rejecting collection paths
    pub fn new(path: ResourcePath) -> ModelResult<Self> {
        if !Self::is_document_key(&path) {
            return Err(ModelError::InvalidDocumentKey(path.canonical_string()));
        }
        Ok(Self { path })
    }

    /// Parses `cities/NYC` (a leading slash is accepted)
    pub fn from_path_string(path: &str) -> ModelResult<Self> {
        Self::new(ResourcePath::from_string(path))
    }

    /// True if `path` addresses a document rather than a collection
    pub fn is_document_key(path: &ResourcePath) -> bool {
        !path.is_empty() && path.len() % 2 == 0
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Id of the collection the document lives in
    pub fn collection_group(&self) -> &str {
        // even and non-empty, so there is always a second to last segment
        self.path.segment(self.path.len() - 2).unwrap_or_default()
    }

    pub fn has_collection_id(&self, collection_id: &str) -> bool {
        self.collection_group() == collection_id
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// A cached document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    key: DocumentKey,
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(key: DocumentKey, fields: BTreeMap<String, FieldValue>) -> Self {
        Self { key, fields }
    }

    /// Builds a document from a JSON object body
    pub fn from_json(key: DocumentKey, body: Value) -> ModelResult<Self> {
        match FieldValue::from(body) {
            FieldValue::Map(fields) => Ok(Self::new(key, fields)),
            other => Err(ModelError::InvalidDocument(format!(
                "expected an object, got {}",
                other.canonical_id()
            ))),
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Looks up a possibly nested field. Missing fields yield `None`.
    pub fn field(&self, path: &FieldPath) -> Option<&FieldValue> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            match current {
                FieldValue::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn compare_by_key(d1: &Document, d2: &Document) -> Ordering {
        d1.key.cmp(&d2.key)
    }

    /// Compares two documents on a field both of them must have
    pub fn compare_by_field(field: &FieldPath, d1: &Document, d2: &Document) -> Ordering {
        match (d1.field(field), d2.field(field)) {
            (Some(v1), Some(v2)) => v1.compare(v2),
            _ => invariant_violation(&format!(
                "comparing documents on field '{}' that does not exist",
                field
            )),
        }
    }
}
