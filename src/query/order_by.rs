//! Ordering clauses
//!
//! An `OrderBy` on the key field compares document keys; any other
//! `OrderBy` compares field values and requires both documents to have
//! the field.

use std::cmp::Ordering;
use std::fmt;

use crate::model::{Document, FieldPath};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }

    pub fn inverse(&self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    /// Orients an ascending comparison
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// One ordering clause: a field and a direction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    field: FieldPath,
    direction: Direction,
}

impl OrderBy {
    pub fn new(field: FieldPath, direction: Direction) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: FieldPath) -> Self {
        Self::new(field, Direction::Ascending)
    }

    pub fn desc(field: FieldPath) -> Self {
        Self::new(field, Direction::Descending)
    }

    /// Ordering by document key
    pub fn key(direction: Direction) -> Self {
        Self::new(FieldPath::key_field(), direction)
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_key_order_by(&self) -> bool {
        self.field.is_key_field()
    }

    /// Same field, opposite direction
    pub fn inverted(&self) -> Self {
        Self::new(self.field.clone(), self.direction.inverse())
    }

    pub fn compare(&self, d1: &Document, d2: &Document) -> Ordering {
        let comparison = if self.is_key_order_by() {
            Document::compare_by_key(d1, d2)
        } else {
            Document::compare_by_field(&self.field, d1, d2)
        };
        self.direction.apply(comparison)
    }

    pub fn canonical_id(&self) -> String {
        format!("{}{}", self.field.canonical_string(), self.direction.as_str())
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field.canonical_string(), self.direction.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentKey;
    use serde_json::json;

    fn doc(path: &str, body: serde_json::Value) -> Document {
        Document::from_json(DocumentKey::from_path_string(path).unwrap(), body).unwrap()
    }

    #[test]
    fn test_field_compare_respects_direction() {
        let small = doc("c/b", json!({"n": 1}));
        let large = doc("c/a", json!({"n": 2}));
        let n = FieldPath::from_dotted("n").unwrap();

        assert_eq!(OrderBy::asc(n.clone()).compare(&small, &large), Ordering::Less);
        assert_eq!(OrderBy::desc(n).compare(&small, &large), Ordering::Greater);
    }

    #[test]
    fn test_key_compare_ignores_fields() {
        let a = doc("c/a", json!({"__name__": "zzz"}));
        let b = doc("c/b", json!({}));

        assert_eq!(OrderBy::key(Direction::Ascending).compare(&a, &b), Ordering::Less);
        assert_eq!(OrderBy::key(Direction::Descending).compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_inverted() {
        let o = OrderBy::asc(FieldPath::from_dotted("n").unwrap());
        assert_eq!(o.inverted().direction(), Direction::Descending);
        assert_eq!(o.inverted().inverted(), o);
    }

    #[test]
    fn test_canonical_id() {
        assert_eq!(OrderBy::key(Direction::Ascending).canonical_id(), "__name__asc");
        assert_eq!(
            OrderBy::desc(FieldPath::from_dotted("a.b").unwrap()).canonical_id(),
            "a.bdesc"
        );
    }

    #[test]
    fn test_default_direction_is_ascending() {
        assert_eq!(Direction::default(), Direction::Ascending);
    }
}
