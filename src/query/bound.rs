//! Cursors
//!
//! A `Bound` is a prefix of values along a query's ordering plus a
//! `before` flag. Cursor methods map onto bounds as:
//!
//! - start at:     before = true  (inclusive start)
//! - start after:  before = false (exclusive start)
//! - end before:   before = true  (exclusive end)
//! - end at:       before = false (inclusive end)

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::order_by::OrderBy;
use crate::model::{Document, FieldValue};
use crate::observability::invariant_violation;

/// Position along an ordering
#[derive(Debug, Clone)]
pub struct Bound {
    position: Arc<[FieldValue]>,
    before: bool,
}

impl Bound {
    pub fn new(position: Vec<FieldValue>, before: bool) -> Self {
        Self {
            position: position.into(),
            before,
        }
    }

    pub fn position(&self) -> &[FieldValue] {
        &self.position
    }

    pub fn before(&self) -> bool {
        self.before
    }

    /// Same position with the flag flipped; shares the position values
    pub fn inverted(&self) -> Self {
        Self {
            position: Arc::clone(&self.position),
            before: !self.before,
        }
    }

    /// True if this bound sits before `doc` under `order_by`.
    ///
    /// Components are compared lexicographically along the ordering, each
    /// one oriented by its clause's direction. A `before` bound also counts
    /// as sorting before a document sitting exactly on it.
    pub fn sorts_before_document(&self, order_by: &[OrderBy], doc: &Document) -> bool {
        if self.position.len() > order_by.len() {
            invariant_violation(&format!(
                "bound has {} values but the ordering only has {} clauses",
                self.position.len(),
                order_by.len()
            ));
        }

        let mut comparison = Ordering::Equal;
        for (component, clause) in self.position.iter().zip(order_by.iter()) {
            comparison = if clause.is_key_order_by() {
                match component.reference_key() {
                    Some(key) => key.cmp(doc.key()),
                    None => invariant_violation(&format!(
                        "bound value '{}' on the key ordering is not a reference",
                        component.canonical_id()
                    )),
                }
            } else {
                match doc.field(clause.field()) {
                    Some(doc_value) => component.compare(doc_value),
                    None => invariant_violation(&format!(
                        "document {} has no value for ordered field '{}'",
                        doc.key(),
                        clause.field()
                    )),
                }
            };
            comparison = clause.direction().apply(comparison);
            if comparison != Ordering::Equal {
                break;
            }
        }

        if self.before {
            comparison != Ordering::Greater
        } else {
            comparison == Ordering::Less
        }
    }

    /// `b:` or `a:` followed by the comma-joined value ids
    pub fn canonical_id(&self) -> String {
        let values: Vec<String> = self.position.iter().map(FieldValue::canonical_id).collect();
        format!("{}:{}", if self.before { "b" } else { "a" }, values.join(","))
    }
}

impl PartialEq for Bound {
    fn eq(&self, other: &Self) -> bool {
        self.before == other.before
            && self.position.len() == other.position.len()
            && self
                .position
                .iter()
                .zip(other.position.iter())
                .all(|(a, b)| a.equals(b))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_id())
    }
}
