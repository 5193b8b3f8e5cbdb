//! aerodb-query - Query matching and ordering for the aerodb client cache
//!
//! - `model`: paths, keys, values and documents
//! - `query`: filters, orderings, cursors, queries and targets
//! - `observability`: structured logging

pub mod model;
pub mod observability;
pub mod query;
