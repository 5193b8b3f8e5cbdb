//! Query matching and ordering core
//!
//! Decides which cached documents belong to a query's result set and in
//! what order, and compiles queries into the targets the backend listens on.
//!
//! # Building blocks
//!
//! - `Filter`: one predicate over one field; built by `FilterFactory`
//! - `OrderBy`: one ordering clause
//! - `Bound`: a cursor position along the ordering
//! - `Query`: user-facing, immutable; may limit to the last N results
//! - `Target`: order-normalized, forward-only form of a query
//!
//! # Invariants
//!
//! - A query's resolved ordering always ends with a key ordering
//! - All inequality filters of a query share one field
//! - `matches` is the conjunction of scope, ordered fields, filters and bounds
//! - The comparator is a total order over matching documents
//!
//! Rejected user input surfaces as `QueryError`. Broken internal
//! invariants abort through `observability::invariant_violation`.

mod bound;
mod config;
mod errors;
mod filter;
mod order_by;
mod query;
mod target;
mod validation;

pub use bound::Bound;
pub use config::QueryConfig;
pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity};
pub use filter::{Filter, FilterFactory, Operator};
pub use order_by::{Direction, OrderBy};
pub use query::{LimitType, Query};
pub use target::Target;
