//! Document and value model
//!
//! The query core consumes a small interface from this module:
//!
//! - Documents expose a key and field lookup by field path
//! - Values have a total order, strict equality and array containment
//! - Values can be tested for null, NaN, array and reference types
//! - Reference values yield the key of the document they point at
//!
//! Paths are immutable and share their segment storage on clone.

mod document;
mod errors;
mod path;
mod value;

pub use document::{Document, DocumentKey};
pub use errors::{ModelError, ModelResult};
pub use path::{FieldPath, ResourcePath, KEY_FIELD_NAME};
pub use value::{FieldValue, GeoPoint, Timestamp};
