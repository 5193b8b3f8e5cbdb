//! Targets
//!
//! A `Target` is the canonical, order-normalized description of which
//! documents a listener wants. Its ordering always ends in a key clause
//! and it only ever pages forward (first N), which is what the backend
//! understands. The local cache matches documents against it; the watch
//! layer deduplicates subscriptions by its canonical id.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::bound::Bound;
use super::filter::Filter;
use super::order_by::OrderBy;
use crate::model::{Document, DocumentKey, ResourcePath};
use crate::observability::invariant_violation;

/// Immutable subscription descriptor
#[derive(Debug, Clone)]
pub struct Target {
    path: ResourcePath,
    collection_group: Option<String>,
    order_by: Vec<OrderBy>,
    filters: Vec<Arc<Filter>>,
    limit: Option<u64>,
    start_at: Option<Bound>,
    end_at: Option<Bound>,
    canonical_id: String,
}

impl Target {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        path: ResourcePath,
        collection_group: Option<String>,
        order_by: Vec<OrderBy>,
        filters: Vec<Arc<Filter>>,
        limit: Option<u64>,
        start_at: Option<Bound>,
        end_at: Option<Bound>,
    ) -> Self {
        let mut target = Self {
            path,
            collection_group,
            order_by,
            filters,
            limit,
            start_at,
            end_at,
            canonical_id: String::new(),
        };
        target.canonical_id = target.compute_canonical_id();
        target
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn collection_group(&self) -> Option<&str> {
        self.collection_group.as_deref()
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().map(|f| f.as_ref())
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn start_at(&self) -> Option<&Bound> {
        self.start_at.as_ref()
    }

    pub fn end_at(&self) -> Option<&Bound> {
        self.end_at.as_ref()
    }

    /// True if the target names exactly one document
    pub fn is_document_query(&self) -> bool {
        DocumentKey::is_document_key(&self.path)
            && self.collection_group.is_none()
            && self.filters.is_empty()
    }

    /// True iff `doc` belongs to the target's result set
    pub fn matches(&self, doc: &Document) -> bool {
        matches_scope(&self.path, self.collection_group.as_deref(), doc)
            // the key clause always matches; every other field must be present
            && matches_order_by_fields(self.order_by.iter(), doc)
            && matches_filters(&self.filters, doc)
            && matches_bounds(
                &self.order_by,
                self.start_at.as_ref(),
                self.end_at.as_ref(),
                doc,
            )
    }

    /// Total order over matching documents
    pub fn doc_comparator(&self, d1: &Document, d2: &Document) -> Ordering {
        compare_documents(&self.order_by, d1, d2)
    }

    /// Deduplication key for listeners. Not collision-free: value ids are
    /// concatenated without type tags.
    pub fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    fn compute_canonical_id(&self) -> String {
        let mut id = self.path.canonical_string();
        if let Some(group) = &self.collection_group {
            id.push_str("|cg:");
            id.push_str(group);
        }
        id.push_str("|f:");
        let filters: Vec<String> = self.filters.iter().map(|f| f.canonical_id()).collect();
        id.push_str(&filters.join(","));
        id.push_str("|ob:");
        let order: Vec<String> = self.order_by.iter().map(OrderBy::canonical_id).collect();
        id.push_str(&order.join(","));
        if let Some(limit) = self.limit {
            id.push_str("|l:");
            id.push_str(&limit.to_string());
        }
        if let Some(start) = &self.start_at {
            id.push_str("|lb:");
            id.push_str(&start.canonical_id());
        }
        if let Some(end) = &self.end_at {
            id.push_str("|ub:");
            id.push_str(&end.canonical_id());
        }
        id
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.limit == other.limit
            && self.collection_group == other.collection_group
            && self.path == other.path
            && self.order_by == other.order_by
            && self.filters.len() == other.filters.len()
            && self
                .filters
                .iter()
                .zip(other.filters.iter())
                .all(|(a, b)| a == b)
            && self.start_at == other.start_at
            && self.end_at == other.end_at
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({}", self.path)?;
        if let Some(group) = &self.collection_group {
            write!(f, " collectionGroup={}", group)?;
        }
        if !self.filters.is_empty() {
            let filters: Vec<String> = self.filters.iter().map(|x| x.to_string()).collect();
            write!(f, ", filters: [{}]", filters.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, ", limit: {}", limit)?;
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self.order_by.iter().map(|x| x.to_string()).collect();
            write!(f, ", orderBy: [{}]", order.join(", "))?;
        }
        if let Some(start) = &self.start_at {
            write!(f, ", startAt: {}", start)?;
        }
        if let Some(end) = &self.end_at {
            write!(f, ", endAt: {}", end)?;
        }
        write!(f, ")")
    }
}

/// Collection-group scope is rooted at `path`; otherwise `path` is either
/// the document itself or its immediate parent collection.
pub(crate) fn matches_scope(
    path: &ResourcePath,
    collection_group: Option<&str>,
    doc: &Document,
) -> bool {
    let doc_path = doc.key().path();
    match collection_group {
        Some(group) => doc.key().has_collection_id(group) && path.is_prefix_of(doc_path),
        None if DocumentKey::is_document_key(path) => path == doc_path,
        None => path.is_immediate_parent_of(doc_path),
    }
}

pub(crate) fn matches_order_by_fields<'a>(
    order_by: impl IntoIterator<Item = &'a OrderBy>,
    doc: &Document,
) -> bool {
    order_by
        .into_iter()
        .all(|clause| clause.is_key_order_by() || doc.field(clause.field()).is_some())
}

pub(crate) fn matches_filters(filters: &[Arc<Filter>], doc: &Document) -> bool {
    filters.iter().all(|filter| filter.matches(doc))
}

/// A document without a value for an ordered field has no position along
/// the ordering, so it lies outside any cursor window.
pub(crate) fn matches_bounds(
    order_by: &[OrderBy],
    start_at: Option<&Bound>,
    end_at: Option<&Bound>,
    doc: &Document,
) -> bool {
    if start_at.is_none() && end_at.is_none() {
        return true;
    }
    if !matches_order_by_fields(order_by, doc) {
        return false;
    }
    if let Some(start) = start_at {
        if !start.sorts_before_document(order_by, doc) {
            return false;
        }
    }
    if let Some(end) = end_at {
        if end.sorts_before_document(order_by, doc) {
            return false;
        }
    }
    true
}

/// First non-equal clause wins. The ordering must reach a key clause.
pub(crate) fn compare_documents(order_by: &[OrderBy], d1: &Document, d2: &Document) -> Ordering {
    let mut compared_on_key = false;
    for clause in order_by {
        let comparison = clause.compare(d1, d2);
        if comparison != Ordering::Equal {
            return comparison;
        }
        compared_on_key |= clause.is_key_order_by();
    }
    if !compared_on_key {
        invariant_violation("ordering does not compare on the key field");
    }
    Ordering::Equal
}
