//! Query error types
//!
//! Error codes:
//! - AERO_QUERY_INVALID_ARGUMENT (REJECT)
//! - AERO_QUERY_CONFLICTING_FILTERS (REJECT)
//! - AERO_QUERY_INVALID_ORDER (REJECT)
//! - AERO_QUERY_INVALID_BOUND (REJECT)
//! - AERO_QUERY_DOCUMENT_QUERY (REJECT)
//! - AERO_QUERY_INVALID_CONFIG (REJECT)
//!
//! Errors are logged where user input is rejected (filter factory, query
//! builders, config loading), not when they are built.
//!
//! Broken internal invariants are not errors; they abort through
//! `observability::invariant_violation`.

use std::fmt;

use crate::observability::{log_event_with_fields, Event};

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Query-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Operand incompatible with the operator
    AeroQueryInvalidArgument,
    /// Filter conflicts with filters already on the query
    AeroQueryConflictingFilters,
    /// Ordering conflicts with filters, bounds or earlier orderings
    AeroQueryInvalidOrder,
    /// Cursor does not fit the query's ordering
    AeroQueryInvalidBound,
    /// Single-document queries take no filters or orderings
    AeroQueryDocumentQuery,
    /// Configuration could not be loaded
    AeroQueryInvalidConfig,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::AeroQueryInvalidArgument => "AERO_QUERY_INVALID_ARGUMENT",
            QueryErrorCode::AeroQueryConflictingFilters => "AERO_QUERY_CONFLICTING_FILTERS",
            QueryErrorCode::AeroQueryInvalidOrder => "AERO_QUERY_INVALID_ORDER",
            QueryErrorCode::AeroQueryInvalidBound => "AERO_QUERY_INVALID_BOUND",
            QueryErrorCode::AeroQueryDocumentQuery => "AERO_QUERY_DOCUMENT_QUERY",
            QueryErrorCode::AeroQueryInvalidConfig => "AERO_QUERY_INVALID_CONFIG",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    /// Error code
    code: QueryErrorCode,
    /// Human-readable message
    message: String,
    /// Field name if applicable
    field: Option<String>,
}

impl QueryError {
    fn new(code: QueryErrorCode, message: String, field: Option<String>) -> Self {
        Self {
            code,
            message,
            field,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            QueryErrorCode::AeroQueryInvalidArgument,
            reason.into(),
            Some(field.into()),
        )
    }

    /// Create an unknown operator error
    pub fn unknown_operator(op: impl Into<String>) -> Self {
        Self::new(
            QueryErrorCode::AeroQueryInvalidArgument,
            format!("Invalid query. Unknown operator '{}'.", op.into()),
            None,
        )
    }

    /// Create a conflicting filters error
    pub fn conflicting_filters(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            QueryErrorCode::AeroQueryConflictingFilters,
            reason.into(),
            Some(field.into()),
        )
    }

    /// Create an invalid order error
    pub fn invalid_order(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            QueryErrorCode::AeroQueryInvalidOrder,
            reason.into(),
            Some(field.into()),
        )
    }

    /// Create an invalid bound error
    pub fn invalid_bound(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::AeroQueryInvalidBound, reason.into(), None)
    }

    /// Create a document query error
    pub fn document_query(path: impl Into<String>) -> Self {
        let p = path.into();
        Self::new(
            QueryErrorCode::AeroQueryDocumentQuery,
            format!("'{}' is a document query and takes no filters or orderings", p),
            None,
        )
    }

    /// Create an invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::AeroQueryInvalidConfig, reason.into(), None)
    }

    /// Logs the rejection and hands the error back. Called where user
    /// input is rejected; building an error does not log.
    pub(crate) fn reported(self) -> Self {
        self.report();
        self
    }

    fn report(&self) {
        let event = match self.code {
            QueryErrorCode::AeroQueryInvalidArgument => Event::FilterRejected,
            _ => Event::QueryRejected,
        };
        log_event_with_fields(
            event,
            &[
                ("code", self.code.code()),
                ("field", self.field.as_deref().unwrap_or("")),
                ("message", &self.message),
            ],
        );
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for QueryError {}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::capture_lines;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            QueryErrorCode::AeroQueryInvalidArgument.code(),
            "AERO_QUERY_INVALID_ARGUMENT"
        );
        assert_eq!(
            QueryErrorCode::AeroQueryConflictingFilters.code(),
            "AERO_QUERY_CONFLICTING_FILTERS"
        );
        assert_eq!(
            QueryErrorCode::AeroQueryInvalidOrder.code(),
            "AERO_QUERY_INVALID_ORDER"
        );
        assert_eq!(
            QueryErrorCode::AeroQueryInvalidBound.code(),
            "AERO_QUERY_INVALID_BOUND"
        );
    }

    #[test]
    fn test_error_carries_field() {
        let err = QueryError::invalid_argument("population", "Null supports only equality");
        assert_eq!(err.field(), Some("population"));
        assert_eq!(err.severity(), Severity::Reject);
    }

    #[test]
    fn test_unknown_operator_has_no_field() {
        let err = QueryError::unknown_operator("!=");
        assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidArgument);
        assert_eq!(err.field(), None);
        assert!(err.message().contains("'!='"));
    }

    #[test]
    fn test_construction_does_not_log() {
        let (_, lines) = capture_lines(|| QueryError::invalid_argument("a", "dropped"));
        assert!(lines.is_empty());

        let (_, lines) = capture_lines(|| QueryError::invalid_bound("rejected").reported());
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["event"], "QUERY_REJECTED");
        assert_eq!(parsed["code"], "AERO_QUERY_INVALID_BOUND");
        assert_eq!(parsed["field"], "");
    }

    #[test]
    fn test_error_display() {
        let err = QueryError::invalid_bound("Too many cursor values");
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("AERO_QUERY_INVALID_BOUND"));
        assert!(display.contains("Too many cursor values"));
    }
}
