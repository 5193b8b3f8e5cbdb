//! Filters: per-document predicates
//!
//! A `Filter` is one of six variants, picked by `FilterFactory` from the
//! field kind and the operator. Callers never pick the variant themselves,
//! so a key-field filter can never end up comparing field values.
//!
//! The factory is the only place user input is rejected. Every variant
//! assumes its operand was validated.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::config::QueryConfig;
use super::errors::{QueryError, QueryResult};
use crate::model::{Document, DocumentKey, FieldPath, FieldValue};
use crate::observability::invariant_violation;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    LessThan,
    LessThanOrEqual,
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    In,
    ArrayContainsAny,
}

impl Operator {
    /// Returns the wire spelling of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Equal => "==",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::ArrayContains => "array-contains",
            Operator::In => "in",
            Operator::ArrayContainsAny => "array-contains-any",
        }
    }

    /// True for range operators; a query may only range over one field
    pub fn is_inequality(&self) -> bool {
        matches!(
            self,
            Operator::LessThan
                | Operator::LessThanOrEqual
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqual
        )
    }

    /// True for operators whose operand is an array of alternatives
    pub fn is_disjunctive(&self) -> bool {
        matches!(self, Operator::In | Operator::ArrayContainsAny)
    }

    /// Applies the operator to `document_value.compare(operand)`
    fn matches_comparison(&self, comparison: Ordering) -> bool {
        match self {
            Operator::LessThan => comparison == Ordering::Less,
            Operator::LessThanOrEqual => comparison != Ordering::Greater,
            Operator::Equal => comparison == Ordering::Equal,
            Operator::GreaterThan => comparison == Ordering::Greater,
            Operator::GreaterThanOrEqual => comparison != Ordering::Less,
            other => invariant_violation(&format!(
                "operator '{}' is not a comparison",
                other.as_str()
            )),
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> QueryResult<Self> {
        match s {
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessThanOrEqual),
            "==" => Ok(Operator::Equal),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "array-contains" => Ok(Operator::ArrayContains),
            "in" => Ok(Operator::In),
            "array-contains-any" => Ok(Operator::ArrayContainsAny),
            other => Err(QueryError::unknown_operator(other)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A predicate over one field of a document
#[derive(Debug, Clone)]
pub enum Filter {
    /// `<`, `<=`, `==`, `>`, `>=` on a regular field
    Comparison {
        field: FieldPath,
        op: Operator,
        value: FieldValue,
    },
    /// Comparison operators on the key field, against a referenced key
    KeyComparison {
        field: FieldPath,
        op: Operator,
        value: FieldValue,
        key: DocumentKey,
    },
    /// `in` on the key field
    KeyIn {
        field: FieldPath,
        value: FieldValue,
        keys: Vec<DocumentKey>,
    },
    /// Document array holds the operand
    ArrayContains { field: FieldPath, value: FieldValue },
    /// Document value is one of the operand array's elements
    In { field: FieldPath, value: FieldValue },
    /// Document array shares an element with the operand array
    ArrayContainsAny { field: FieldPath, value: FieldValue },
}

impl Filter {
    /// Builds a filter with the default configuration
    pub fn create(field: FieldPath, op: Operator, value: FieldValue) -> QueryResult<Self> {
        FilterFactory::default().create(field, op, value)
    }

    pub fn field(&self) -> &FieldPath {
        match self {
            Filter::Comparison { field, .. }
            | Filter::KeyComparison { field, .. }
            | Filter::KeyIn { field, .. }
            | Filter::ArrayContains { field, .. }
            | Filter::In { field, .. }
            | Filter::ArrayContainsAny { field, .. } => field,
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            Filter::Comparison { op, .. } | Filter::KeyComparison { op, .. } => *op,
            Filter::KeyIn { .. } | Filter::In { .. } => Operator::In,
            Filter::ArrayContains { .. } => Operator::ArrayContains,
            Filter::ArrayContainsAny { .. } => Operator::ArrayContainsAny,
        }
    }

    /// The operand as the caller supplied it
    pub fn value(&self) -> &FieldValue {
        match self {
            Filter::Comparison { value, .. }
            | Filter::KeyComparison { value, .. }
            | Filter::KeyIn { value, .. }
            | Filter::ArrayContains { value, .. }
            | Filter::In { value, .. }
            | Filter::ArrayContainsAny { value, .. } => value,
        }
    }

    pub fn is_inequality(&self) -> bool {
        self.operator().is_inequality()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Comparison { field, op, value } => match doc.field(field) {
                // Only values of the same type order are comparable
                Some(other) => {
                    other.type_order() == value.type_order()
                        && op.matches_comparison(other.compare(value))
                }
                None => false,
            },
            Filter::KeyComparison { op, key, .. } => op.matches_comparison(doc.key().cmp(key)),
            Filter::KeyIn { keys, .. } => keys.iter().any(|key| key == doc.key()),
            Filter::ArrayContains { field, value } => doc
                .field(field)
                .map_or(false, |other| other.array_contains(value)),
            Filter::In { field, value } => doc
                .field(field)
                .map_or(false, |other| value.array_contains(other)),
            Filter::ArrayContainsAny { field, value } => match doc.field(field) {
                Some(FieldValue::Array(elements)) => {
                    elements.iter().any(|element| value.array_contains(element))
                }
                _ => false,
            },
        }
    }

    /// Field, operator and operand concatenated without separators.
    /// Distinct filters can share an id.
    pub fn canonical_id(&self) -> String {
        format!(
            "{}{}{}",
            self.field().canonical_string(),
            self.operator().as_str(),
            self.value().canonical_id()
        )
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.operator() == other.operator()
            && self.field() == other.field()
            && self.value().equals(other.value())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.field().canonical_string(),
            self.operator(),
            self.value().canonical_id()
        )
    }
}

/// Selects and validates filter variants
#[derive(Debug, Clone, Default)]
pub struct FilterFactory {
    config: QueryConfig,
}

impl FilterFactory {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Builds the filter variant for `field op value`, rejecting operands the
    /// operator cannot take. Rejections are logged.
    pub fn create(&self, field: FieldPath, op: Operator, value: FieldValue) -> QueryResult<Filter> {
        self.build(field, op, value).map_err(QueryError::reported)
    }

    fn build(&self, field: FieldPath, op: Operator, value: FieldValue) -> QueryResult<Filter> {
        if field.is_key_field() {
            return self.create_key_filter(field, op, value);
        }

        if value.is_null() && op != Operator::Equal {
            return Err(QueryError::invalid_argument(
                field.canonical_string(),
                "Invalid query. Null supports only equality comparisons.",
            ));
        }
        if value.is_nan() && op != Operator::Equal {
            return Err(QueryError::invalid_argument(
                field.canonical_string(),
                "Invalid query. NaN supports only equality comparisons.",
            ));
        }

        match op {
            Operator::ArrayContains => Ok(Filter::ArrayContains { field, value }),
            Operator::In => {
                self.validate_disjunctive_operand(&field, op, &value)?;
                Ok(Filter::In { field, value })
            }
            Operator::ArrayContainsAny => {
                self.validate_disjunctive_operand(&field, op, &value)?;
                Ok(Filter::ArrayContainsAny { field, value })
            }
            _ => Ok(Filter::Comparison { field, op, value }),
        }
    }

    fn create_key_filter(
        &self,
        field: FieldPath,
        op: Operator,
        value: FieldValue,
    ) -> QueryResult<Filter> {
        match op {
            Operator::ArrayContains | Operator::ArrayContainsAny => {
                Err(QueryError::invalid_argument(
                    field.canonical_string(),
                    format!(
                        "Invalid query. You can't perform '{}' queries on the document key.",
                        op
                    ),
                ))
            }
            Operator::In => {
                self.validate_disjunctive_operand(&field, op, &value)?;
                let mut keys = Vec::new();
                for element in value.as_array().unwrap_or_default() {
                    match element.reference_key() {
                        Some(key) => keys.push(key.clone()),
                        None => {
                            return Err(QueryError::invalid_argument(
                                field.canonical_string(),
                                format!(
                                    "Invalid query. Every value of an 'in' filter on the document key must be a document reference, got '{}'.",
                                    element.canonical_id()
                                ),
                            ))
                        }
                    }
                }
                Ok(Filter::KeyIn { field, value, keys })
            }
            _ => match value.reference_key() {
                Some(key) => {
                    let key = key.clone();
                    Ok(Filter::KeyComparison {
                        field,
                        op,
                        value,
                        key,
                    })
                }
                None => Err(QueryError::invalid_argument(
                    field.canonical_string(),
                    format!(
                        "Invalid query. When querying by document key, the value must be a document reference, got '{}'.",
                        value.canonical_id()
                    ),
                )),
            },
        }
    }

    fn validate_disjunctive_operand(
        &self,
        field: &FieldPath,
        op: Operator,
        value: &FieldValue,
    ) -> QueryResult<()> {
        let elements = match value.as_array() {
            Some(elements) => elements,
            None => {
                return Err(QueryError::invalid_argument(
                    field.canonical_string(),
                    format!("Invalid query. A non-empty array is required for '{}' filters.", op),
                ))
            }
        };

        if elements.is_empty() {
            return Err(QueryError::invalid_argument(
                field.canonical_string(),
                format!("Invalid query. A non-empty array is required for '{}' filters.", op),
            ));
        }
        if elements.len() > self.config.max_disjunction_values {
            return Err(QueryError::invalid_argument(
                field.canonical_string(),
                format!(
                    "Invalid query. '{}' filters support a maximum of {} elements in the value array.",
                    op, self.config.max_disjunction_values
                ),
            ));
        }
        if elements.iter().any(FieldValue::is_null) {
            return Err(QueryError::invalid_argument(
                field.canonical_string(),
                format!("Invalid query. '{}' filters cannot contain 'null' in the value array.", op),
            ));
        }
        if elements.iter().any(FieldValue::is_nan) {
            return Err(QueryError::invalid_argument(
                field.canonical_string(),
                format!("Invalid query. '{}' filters cannot contain 'NaN' in the value array.", op),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::capture_lines;
    use crate::query::errors::QueryErrorCode;
    use serde_json::json;

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dotted(path).unwrap()
    }

    fn doc(path: &str, body: serde_json::Value) -> Document {
        Document::from_json(DocumentKey::from_path_string(path).unwrap(), body).unwrap()
    }

    fn filter(path: &str, op: &str, value: serde_json::Value) -> Filter {
        Filter::create(field(path), op.parse().unwrap(), FieldValue::from(value)).unwrap()
    }

    #[test]
    fn test_factory_selects_variant() {
        assert!(matches!(filter("a", "<", json!(1)), Filter::Comparison { .. }));
        assert!(matches!(
            filter("a", "array-contains", json!(1)),
            Filter::ArrayContains { .. }
        ));
        assert!(matches!(filter("a", "in", json!([1])), Filter::In { .. }));
        assert!(matches!(
            filter("a", "array-contains-any", json!([1])),
            Filter::ArrayContainsAny { .. }
        ));

        let key_eq = Filter::create(
            FieldPath::key_field(),
            Operator::Equal,
            FieldValue::reference("a/1").unwrap(),
        )
        .unwrap();
        assert!(matches!(key_eq, Filter::KeyComparison { .. }));
    }

    #[test]
    fn test_null_and_nan_only_with_equality() {
        for op in [Operator::LessThan, Operator::GreaterThanOrEqual, Operator::ArrayContains] {
            let err = Filter::create(field("a"), op, FieldValue::Null).unwrap_err();
            assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidArgument);

            let err = Filter::create(field("a"), op, FieldValue::Double(f64::NAN)).unwrap_err();
            assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidArgument);
        }

        assert!(Filter::create(field("a"), Operator::Equal, FieldValue::Null).is_ok());
        assert!(Filter::create(field("a"), Operator::Equal, FieldValue::Double(f64::NAN)).is_ok());
    }

    #[test]
    fn test_null_equality_matches_null_only() {
        let f = filter("a", "==", json!(null));
        assert!(f.matches(&doc("c/1", json!({"a": null}))));
        assert!(!f.matches(&doc("c/1", json!({"a": 0}))));
        assert!(!f.matches(&doc("c/1", json!({}))));
    }

    #[test]
    fn test_nan_equality() {
        let f = Filter::create(field("a"), Operator::Equal, FieldValue::Double(f64::NAN)).unwrap();
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("a".to_string(), FieldValue::Double(f64::NAN));
        let nan_doc = Document::new(DocumentKey::from_path_string("c/1").unwrap(), fields);

        assert!(f.matches(&nan_doc));
        assert!(!f.matches(&doc("c/2", json!({"a": 1.0}))));
    }

    #[test]
    fn test_disjunctive_operands_must_be_arrays() {
        for op in [Operator::In, Operator::ArrayContainsAny] {
            assert!(Filter::create(field("a"), op, FieldValue::Integer(1)).is_err());
            assert!(Filter::create(field("a"), op, FieldValue::from(json!([]))).is_err());
            assert!(Filter::create(field("a"), op, FieldValue::from(json!([1, null]))).is_err());
        }
    }

    #[test]
    fn test_rejections_logged_once_and_parse_failures_not_at_all() {
        let (result, lines) = capture_lines(|| {
            Filter::create(field("population"), Operator::LessThan, FieldValue::Null)
        });
        assert!(result.is_err());
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["event"], "FILTER_REJECTED");
        assert_eq!(parsed["field"], "population");

        let (result, lines) = capture_lines(|| "<>".parse::<Operator>());
        assert!(result.is_err());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_disjunctive_operands_reject_nan() {
        let operand = FieldValue::Array(vec![FieldValue::Integer(1), FieldValue::Double(f64::NAN)]);
        for op in [Operator::In, Operator::ArrayContainsAny] {
            let err = Filter::create(field("a"), op, operand.clone()).unwrap_err();
            assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidArgument);
            assert!(err.message().contains("'NaN'"));
        }
    }

    #[test]
    fn test_disjunction_limit_from_config() {
        let factory = FilterFactory::new(QueryConfig {
            max_disjunction_values: 2,
            ..QueryConfig::default()
        });

        assert!(factory
            .create(field("a"), Operator::In, FieldValue::from(json!([1, 2])))
            .is_ok());
        let err = factory
            .create(field("a"), Operator::In, FieldValue::from(json!([1, 2, 3])))
            .unwrap_err();
        assert!(err.message().contains("maximum of 2"));
    }

    #[test]
    fn test_key_filters_reject_array_operators() {
        let reference = FieldValue::reference("a/1").unwrap();
        for op in [Operator::ArrayContains, Operator::ArrayContainsAny] {
            let err = Filter::create(FieldPath::key_field(), op, reference.clone()).unwrap_err();
            assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidArgument);
        }
    }

    #[test]
    fn test_key_filters_require_references() {
        let err =
            Filter::create(FieldPath::key_field(), Operator::Equal, FieldValue::from("a/1"))
                .unwrap_err();
        assert_eq!(err.field(), Some("__name__"));

        let err = Filter::create(
            FieldPath::key_field(),
            Operator::In,
            FieldValue::Array(vec![FieldValue::from("a/1")]),
        )
        .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidArgument);
    }

    #[test]
    fn test_key_in_matches_listed_documents() {
        let f = Filter::create(
            FieldPath::key_field(),
            Operator::In,
            FieldValue::Array(vec![
                FieldValue::reference("/a/1").unwrap(),
                FieldValue::reference("/a/2").unwrap(),
            ]),
        )
        .unwrap();

        assert!(matches!(f, Filter::KeyIn { .. }));
        assert!(f.matches(&doc("a/1", json!({}))));
        assert!(f.matches(&doc("a/2", json!({}))));
        assert!(!f.matches(&doc("a/3", json!({}))));
        assert!(!f.matches(&doc("b/1", json!({}))));
    }

    #[test]
    fn test_key_comparison() {
        let f = Filter::create(
            FieldPath::key_field(),
            Operator::GreaterThan,
            FieldValue::reference("a/m").unwrap(),
        )
        .unwrap();

        assert!(f.matches(&doc("a/z", json!({}))));
        assert!(!f.matches(&doc("a/m", json!({}))));
        assert!(!f.matches(&doc("a/b", json!({}))));
    }

    #[test]
    fn test_comparison_requires_same_type_order() {
        let f = filter("a", ">", json!(1));
        assert!(f.matches(&doc("c/1", json!({"a": 2}))));
        assert!(f.matches(&doc("c/1", json!({"a": 1.5}))));
        assert!(!f.matches(&doc("c/1", json!({"a": "2"}))));
        assert!(!f.matches(&doc("c/1", json!({"a": 1}))));
        assert!(!f.matches(&doc("c/1", json!({}))));
    }

    #[test]
    fn test_comparison_operators() {
        let d = doc("c/1", json!({"a": 5}));
        assert!(filter("a", "<", json!(6)).matches(&d));
        assert!(filter("a", "<=", json!(5)).matches(&d));
        assert!(filter("a", "==", json!(5)).matches(&d));
        assert!(filter("a", ">=", json!(5)).matches(&d));
        assert!(!filter("a", ">", json!(5)).matches(&d));
        assert!(!filter("a", "<", json!(5)).matches(&d));
    }

    #[test]
    fn test_array_contains() {
        let f = filter("tags", "array-contains", json!("red"));
        assert!(f.matches(&doc("c/1", json!({"tags": ["blue", "red"]}))));
        assert!(!f.matches(&doc("c/1", json!({"tags": ["blue"]}))));
        assert!(!f.matches(&doc("c/1", json!({"tags": "red"}))));
    }

    #[test]
    fn test_in() {
        let f = filter("state", "in", json!(["CA", "NY"]));
        assert!(f.matches(&doc("c/1", json!({"state": "NY"}))));
        assert!(!f.matches(&doc("c/1", json!({"state": "TX"}))));
        assert!(!f.matches(&doc("c/1", json!({"state": ["NY"]}))));
        assert!(!f.matches(&doc("c/1", json!({}))));
    }

    #[test]
    fn test_array_contains_any() {
        let f = filter("tags", "array-contains-any", json!(["red", "green"]));
        assert!(f.matches(&doc("c/1", json!({"tags": ["green", "blue"]}))));
        assert!(!f.matches(&doc("c/1", json!({"tags": ["blue"]}))));
        assert!(!f.matches(&doc("c/1", json!({"tags": "red"}))));
    }

    #[test]
    fn test_canonical_id() {
        assert_eq!(filter("a.b", ">=", json!(3)).canonical_id(), "a.b>=3");
        assert_eq!(
            filter("tags", "array-contains-any", json!(["x", 1])).canonical_id(),
            "tagsarray-contains-any[x,1]"
        );
    }

    #[test]
    fn test_equality_uses_value_equality() {
        let a = Filter::create(field("a"), Operator::Equal, FieldValue::Double(f64::NAN)).unwrap();
        let b = Filter::create(field("a"), Operator::Equal, FieldValue::Double(f64::NAN)).unwrap();
        assert_eq!(a, b);
        assert_ne!(filter("a", "==", json!(1)), filter("a", "==", json!(1.0)));
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("array-contains".parse::<Operator>().unwrap(), Operator::ArrayContains);
        let err = "!=".parse::<Operator>().unwrap_err();
        assert_eq!(err.field(), None);
        assert!(Operator::LessThan.is_inequality());
        assert!(!Operator::Equal.is_inequality());
        assert!(Operator::In.is_disjunctive());
    }
}
