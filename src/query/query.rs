//! Queries
//!
//! A `Query` is the user-facing description of a result set. It is an
//! immutable value: every builder call returns a new `Query` that shares
//! the untouched filters and cursor values of its parent.
//!
//! # Resolved ordering
//!
//! The ordering a query actually sorts by is derived from its explicit
//! orderings and filters:
//!
//! 1. Inequality filter on F and no explicit ordering: `[F asc, key asc]`
//!    (just `[key asc]` if F is the key field)
//! 2. Otherwise: the explicit orderings, plus a trailing key ordering in the
//!    direction of the last explicit one (ascending if there is none),
//!    unless a key ordering is already present
//!
//! # Last-N queries
//!
//! The backend only pages forward. A limit-to-last query compiles to a
//! target with every direction flipped and the cursors swapped (each with
//! its `before` flag flipped). The first N of that target are the last N
//! of the query; callers reverse the page before presenting it.
//!
//! The resolved ordering and the target are computed once, when the query
//! is built.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::bound::Bound;
use super::errors::{QueryError, QueryResult};
use super::filter::{Filter, Operator};
use super::order_by::{Direction, OrderBy};
use super::target::{self, Target};
use super::validation;
use crate::model::{Document, DocumentKey, FieldPath, ResourcePath};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Which end of the ordered result set a limit keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LimitType {
    #[default]
    First,
    Last,
}

impl LimitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::First => "F",
            LimitType::Last => "L",
        }
    }
}

/// Immutable query value
#[derive(Debug, Clone)]
pub struct Query {
    path: ResourcePath,
    collection_group: Option<String>,
    explicit_order_by: Vec<OrderBy>,
    filters: Vec<Arc<Filter>>,
    limit: Option<u64>,
    limit_type: LimitType,
    start_at: Option<Bound>,
    end_at: Option<Bound>,
    order_by: Arc<[OrderBy]>,
    target: Arc<Target>,
}

/// Inputs of a query, before derived state is computed
struct QueryParts {
    path: ResourcePath,
    collection_group: Option<String>,
    explicit_order_by: Vec<OrderBy>,
    filters: Vec<Arc<Filter>>,
    limit: Option<u64>,
    limit_type: LimitType,
    start_at: Option<Bound>,
    end_at: Option<Bound>,
}

impl Query {
    /// All documents directly in the collection at `path`, or the single
    /// document at `path` if it names a document
    pub fn at_path(path: ResourcePath) -> Self {
        Self::from_parts(QueryParts {
            path,
            collection_group: None,
            explicit_order_by: Vec::new(),
            filters: Vec::new(),
            limit: None,
            limit_type: LimitType::First,
            start_at: None,
            end_at: None,
        })
    }

    /// All documents in every collection named `collection_id`
    pub fn collection_group(collection_id: impl Into<String>) -> Self {
        Self::from_parts(QueryParts {
            path: ResourcePath::root(),
            collection_group: Some(collection_id.into()),
            explicit_order_by: Vec::new(),
            filters: Vec::new(),
            limit: None,
            limit_type: LimitType::First,
            start_at: None,
            end_at: None,
        })
    }

    fn from_parts(parts: QueryParts) -> Self {
        let order_by: Arc<[OrderBy]> =
            resolve_order_by(&parts.explicit_order_by, &parts.filters).into();
        let target = Arc::new(compile_target(&parts, &order_by));

        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::TargetCompiled,
                &[
                    ("canonical_id", target.canonical_id()),
                    ("limit_type", parts.limit_type.as_str()),
                ],
            );
        }

        Self {
            path: parts.path,
            collection_group: parts.collection_group,
            explicit_order_by: parts.explicit_order_by,
            filters: parts.filters,
            limit: parts.limit,
            limit_type: parts.limit_type,
            start_at: parts.start_at,
            end_at: parts.end_at,
            order_by,
            target,
        }
    }

    fn to_parts(&self) -> QueryParts {
        QueryParts {
            path: self.path.clone(),
            collection_group: self.collection_group.clone(),
            explicit_order_by: self.explicit_order_by.clone(),
            filters: self.filters.clone(),
            limit: self.limit,
            limit_type: self.limit_type,
            start_at: self.start_at.clone(),
            end_at: self.end_at.clone(),
        }
    }

    // Builders

    /// Returns a new query with `filter` ANDed onto the existing filters
    pub fn add_filter(&self, filter: Filter) -> QueryResult<Self> {
        validation::validate_new_filter(self, &filter).map_err(QueryError::reported)?;

        let mut parts = self.to_parts();
        parts.filters.push(Arc::new(filter));
        Ok(Self::from_parts(parts))
    }

    /// Returns a new query with `order_by` appended to the explicit orderings
    pub fn add_order_by(&self, order_by: OrderBy) -> QueryResult<Self> {
        validation::validate_new_order_by(self, &order_by).map_err(QueryError::reported)?;

        let mut parts = self.to_parts();
        parts.explicit_order_by.push(order_by);
        Ok(Self::from_parts(parts))
    }

    /// Keeps the first `limit` results
    pub fn with_limit_to_first(&self, limit: u64) -> Self {
        let mut parts = self.to_parts();
        parts.limit = Some(limit);
        parts.limit_type = LimitType::First;
        Self::from_parts(parts)
    }

    /// Keeps the last `limit` results
    pub fn with_limit_to_last(&self, limit: u64) -> Self {
        let mut parts = self.to_parts();
        parts.limit = Some(limit);
        parts.limit_type = LimitType::Last;
        Self::from_parts(parts)
    }

    /// Sets the start cursor
    pub fn start_at(&self, bound: Bound) -> QueryResult<Self> {
        validation::validate_bound(&self.order_by, &bound).map_err(QueryError::reported)?;

        let mut parts = self.to_parts();
        parts.start_at = Some(bound);
        Ok(Self::from_parts(parts))
    }

    /// Sets the end cursor
    pub fn end_at(&self, bound: Bound) -> QueryResult<Self> {
        validation::validate_bound(&self.order_by, &bound).map_err(QueryError::reported)?;

        let mut parts = self.to_parts();
        parts.end_at = Some(bound);
        Ok(Self::from_parts(parts))
    }

    /// The same query scoped to the single collection at `path`.
    ///
    /// Used to run a collection-group query one matching collection at a time.
    pub fn as_collection_query_at_path(&self, path: ResourcePath) -> Self {
        let mut parts = self.to_parts();
        parts.path = path;
        parts.collection_group = None;
        Self::from_parts(parts)
    }

    // Accessors

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn collection_group_id(&self) -> Option<&str> {
        self.collection_group.as_deref()
    }

    pub fn explicit_order_by(&self) -> &[OrderBy] {
        &self.explicit_order_by
    }

    /// The resolved ordering; always ends with a key ordering
    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().map(|f| f.as_ref())
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn limit_type(&self) -> LimitType {
        self.limit_type
    }

    pub fn has_limit_to_first(&self) -> bool {
        self.limit.is_some() && self.limit_type == LimitType::First
    }

    pub fn has_limit_to_last(&self) -> bool {
        self.limit.is_some() && self.limit_type == LimitType::Last
    }

    pub fn start_at_bound(&self) -> Option<&Bound> {
        self.start_at.as_ref()
    }

    pub fn end_at_bound(&self) -> Option<&Bound> {
        self.end_at.as_ref()
    }

    /// Field of the first inequality filter, if any
    pub fn inequality_filter_field(&self) -> Option<&FieldPath> {
        inequality_field(&self.filters)
    }

    pub fn first_order_by_field(&self) -> Option<&FieldPath> {
        self.explicit_order_by.first().map(OrderBy::field)
    }

    /// First operator among the query's filters that appears in `operators`
    pub fn find_filter_operator(&self, operators: &[Operator]) -> Option<Operator> {
        self.filters
            .iter()
            .map(|filter| filter.operator())
            .find(|op| operators.contains(op))
    }

    /// True if the query names a single document
    pub fn is_document_query(&self) -> bool {
        DocumentKey::is_document_key(&self.path)
            && self.collection_group.is_none()
            && self.filters.is_empty()
    }

    pub fn is_collection_group_query(&self) -> bool {
        self.collection_group.is_some()
    }

    /// The target this query compiles to
    pub fn to_target(&self) -> &Target {
        &self.target
    }

    /// Target canonical id plus the limit type
    pub fn canonical_id(&self) -> String {
        format!("{}|lt:{}", self.target.canonical_id(), self.limit_type.as_str())
    }

    // Matching

    /// True iff `doc` belongs to this query's result set
    pub fn matches(&self, doc: &Document) -> bool {
        self.matches_scope(doc)
            && self.matches_order_by_fields(doc)
            && self.matches_filters(doc)
            && self.matches_bounds(doc)
    }

    /// Path and collection-group check
    pub fn matches_scope(&self, doc: &Document) -> bool {
        target::matches_scope(&self.path, self.collection_group.as_deref(), doc)
    }

    /// Every explicitly ordered field must be present on the document
    pub fn matches_order_by_fields(&self, doc: &Document) -> bool {
        target::matches_order_by_fields(&self.explicit_order_by, doc)
    }

    pub fn matches_filters(&self, doc: &Document) -> bool {
        target::matches_filters(&self.filters, doc)
    }

    /// Cursor check; false for documents missing a resolved ordering field
    pub fn matches_bounds(&self, doc: &Document) -> bool {
        target::matches_bounds(
            &self.order_by,
            self.start_at.as_ref(),
            self.end_at.as_ref(),
            doc,
        )
    }

    /// Total order over documents matching this query
    pub fn doc_comparator(&self, d1: &Document, d2: &Document) -> Ordering {
        target::compare_documents(&self.order_by, d1, d2)
    }

    /// Sorts matching documents into query order
    pub fn sort_documents(&self, documents: &mut [Document]) {
        documents.sort_by(|a, b| self.doc_comparator(a, b));
    }

    /// Runs the query over a set of candidate documents the way the local
    /// cache does: match and sort against the target, keep the target's
    /// limit, then reverse the page for limit-to-last queries.
    pub fn apply_to(&self, documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let target = self.to_target();
        let mut page: Vec<Document> = documents
            .into_iter()
            .filter(|doc| target.matches(doc))
            .collect();
        page.sort_by(|a, b| target.doc_comparator(a, b));

        if let Some(limit) = target.limit() {
            page.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        if self.limit_type == LimitType::Last {
            page.reverse();
        }
        page
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.limit_type == other.limit_type && self.target == other.target
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Query(target={}; limitType={})",
            self.target,
            self.limit_type.as_str()
        )
    }
}

fn inequality_field(filters: &[Arc<Filter>]) -> Option<&FieldPath> {
    filters
        .iter()
        .find(|filter| filter.is_inequality())
        .map(|filter| filter.field())
}

fn resolve_order_by(explicit: &[OrderBy], filters: &[Arc<Filter>]) -> Vec<OrderBy> {
    let inequality = inequality_field(filters);

    if let (Some(field), None) = (inequality, explicit.first()) {
        let mut resolved = Vec::with_capacity(2);
        if !field.is_key_field() {
            resolved.push(OrderBy::asc(field.clone()));
        }
        resolved.push(OrderBy::key(Direction::Ascending));
        return resolved;
    }

    let mut resolved = explicit.to_vec();
    if !explicit.iter().any(OrderBy::is_key_order_by) {
        let direction = explicit
            .last()
            .map(OrderBy::direction)
            .unwrap_or_default();
        resolved.push(OrderBy::key(direction));
    }
    resolved
}

fn compile_target(parts: &QueryParts, order_by: &[OrderBy]) -> Target {
    match parts.limit_type {
        LimitType::First => Target::new(
            parts.path.clone(),
            parts.collection_group.clone(),
            order_by.to_vec(),
            parts.filters.clone(),
            parts.limit,
            parts.start_at.clone(),
            parts.end_at.clone(),
        ),
        LimitType::Last => Target::new(
            parts.path.clone(),
            parts.collection_group.clone(),
            order_by.iter().map(OrderBy::inverted).collect(),
            parts.filters.clone(),
            parts.limit,
            parts.end_at.as_ref().map(Bound::inverted),
            parts.start_at.as_ref().map(Bound::inverted),
        ),
    }
}
