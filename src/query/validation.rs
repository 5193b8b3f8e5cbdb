//! Query-level validation
//!
//! Rules that depend on what is already on a query, checked when a filter,
//! ordering or cursor is added:
//!
//! - Inequalities range over a single field
//! - The first explicit ordering matches the inequality field
//! - Array operators do not combine in ways the backend cannot serve
//! - Orderings are added before cursors and never after a key ordering
//! - Cursors fit the resolved ordering

use super::bound::Bound;
use super::errors::{QueryError, QueryResult};
use super::filter::{Filter, Operator};
use super::order_by::OrderBy;
use super::query::Query;

/// Operators that cannot appear on a query together with `op`
fn conflicting_operators(op: Operator) -> &'static [Operator] {
    match op {
        Operator::ArrayContains => &[Operator::ArrayContains, Operator::ArrayContainsAny],
        Operator::ArrayContainsAny => &[
            Operator::ArrayContains,
            Operator::ArrayContainsAny,
            Operator::In,
        ],
        Operator::In => &[Operator::ArrayContainsAny, Operator::In],
        _ => &[],
    }
}

fn has_cursor(query: &Query) -> bool {
    query.start_at_bound().is_some() || query.end_at_bound().is_some()
}

pub(crate) fn validate_new_filter(query: &Query, filter: &Filter) -> QueryResult<()> {
    if query.is_document_query() {
        return Err(QueryError::document_query(query.path().canonical_string()));
    }

    let field = filter.field();
    if filter.is_inequality() {
        if let Some(existing) = query.inequality_filter_field() {
            if existing != field {
                return Err(QueryError::conflicting_filters(
                    field.canonical_string(),
                    format!(
                        "Invalid query. All where filters with an inequality must be on the same field. \
                         But you have inequality filters on '{}' and '{}'",
                        existing, field
                    ),
                ));
            }
        }
        if let Some(first) = query.first_order_by_field() {
            if first != field {
                return Err(QueryError::invalid_order(
                    field.canonical_string(),
                    format!(
                        "Invalid query. You have a where filter with an inequality on '{}' \
                         and so you must also use '{}' as your first orderBy, but your first orderBy is on '{}' instead.",
                        field, field, first
                    ),
                ));
            }
        }
        // The first inequality on a non-key field adds an implicit ordering
        if query.inequality_filter_field().is_none()
            && query.first_order_by_field().is_none()
            && !field.is_key_field()
            && has_cursor(query)
        {
            return Err(QueryError::invalid_bound(format!(
                "Invalid query. An inequality on '{}' changes the ordering the existing \
                 startAt() or endAt() cursor was built for.",
                field
            )));
        }
    }

    let op = filter.operator();
    if let Some(conflict) = query.find_filter_operator(conflicting_operators(op)) {
        let message = if conflict == op {
            format!("Invalid query. You cannot use more than one '{}' filter.", op)
        } else {
            format!(
                "Invalid query. You cannot use '{}' filters with '{}' filters.",
                op, conflict
            )
        };
        return Err(QueryError::conflicting_filters(field.canonical_string(), message));
    }

    Ok(())
}

pub(crate) fn validate_new_order_by(query: &Query, order_by: &OrderBy) -> QueryResult<()> {
    let field = order_by.field();
    if query.is_document_query() {
        return Err(QueryError::document_query(query.path().canonical_string()));
    }
    if has_cursor(query) {
        return Err(QueryError::invalid_order(
            field.canonical_string(),
            "Invalid query. You must not call startAt() or endAt() before calling orderBy().",
        ));
    }
    if query.explicit_order_by().iter().any(OrderBy::is_key_order_by) {
        return Err(QueryError::invalid_order(
            field.canonical_string(),
            "Invalid query. The document key already orders the results; no orderBy can follow it.",
        ));
    }
    if query.first_order_by_field().is_none() {
        if let Some(inequality) = query.inequality_filter_field() {
            if inequality != field {
                return Err(QueryError::invalid_order(
                    field.canonical_string(),
                    format!(
                        "Invalid query. You have a where filter with an inequality on '{}' \
                         and so you must also use '{}' as your first orderBy, but your first orderBy is on '{}' instead.",
                        inequality, inequality, field
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Checks a cursor against the ordering it will be compared along
pub(crate) fn validate_bound(order_by: &[OrderBy], bound: &Bound) -> QueryResult<()> {
    if bound.position().len() > order_by.len() {
        return Err(QueryError::invalid_bound(format!(
            "Too many arguments provided to the cursor. The number of arguments must be less \
             than or equal to the number of orderBy() clauses ({}), got {}.",
            order_by.len(),
            bound.position().len()
        )));
    }
    for (value, clause) in bound.position().iter().zip(order_by.iter()) {
        if clause.is_key_order_by() && !value.is_reference() {
            return Err(QueryError::invalid_bound(format!(
                "Invalid query. The cursor value for the document key ordering must be a \
                 document reference, got '{}'.",
                value.canonical_id()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldPath, FieldValue, ResourcePath};
    use crate::query::errors::QueryErrorCode;
    use crate::query::order_by::Direction;

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dotted(path).unwrap()
    }

    fn f(path: &str, op: Operator, value: FieldValue) -> Filter {
        Filter::create(field(path), op, value).unwrap()
    }

    fn cities() -> Query {
        Query::at_path(ResourcePath::from_string("cities"))
    }

    #[test]
    fn test_inequalities_on_one_field() {
        let q = cities()
            .add_filter(f("pop", Operator::GreaterThan, FieldValue::Integer(1)))
            .unwrap();

        assert!(validate_new_filter(&q, &f("pop", Operator::LessThan, FieldValue::Integer(9))).is_ok());
        let err = validate_new_filter(&q, &f("area", Operator::LessThan, FieldValue::Integer(9)))
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryConflictingFilters);
    }

    #[test]
    fn test_inequality_must_match_first_order_by() {
        let q = cities().add_order_by(OrderBy::asc(field("name"))).unwrap();
        let err = validate_new_filter(&q, &f("pop", Operator::GreaterThan, FieldValue::Integer(1)))
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidOrder);
    }

    #[test]
    fn test_array_operator_conflicts() {
        let array = FieldValue::Array(vec![FieldValue::Integer(1)]);
        let contains = cities()
            .add_filter(f("tags", Operator::ArrayContains, FieldValue::Integer(1)))
            .unwrap();
        let err = validate_new_filter(&contains, &f("x", Operator::ArrayContains, FieldValue::Integer(2)))
            .unwrap_err();
        assert!(err.message().contains("more than one 'array-contains'"));
        assert!(validate_new_filter(&contains, &f("x", Operator::ArrayContainsAny, array.clone())).is_err());
        assert!(validate_new_filter(&contains, &f("x", Operator::In, array.clone())).is_ok());

        let in_query = cities().add_filter(f("a", Operator::In, array.clone())).unwrap();
        assert!(validate_new_filter(&in_query, &f("b", Operator::In, array.clone())).is_err());
        let err = validate_new_filter(&in_query, &f("b", Operator::ArrayContainsAny, array))
            .unwrap_err();
        assert!(err.message().contains("with 'in' filters"));
    }

    #[test]
    fn test_document_query_rejects_filters_and_orderings() {
        let q = Query::at_path(ResourcePath::from_string("cities/NYC"));
        let err = validate_new_filter(&q, &f("a", Operator::Equal, FieldValue::Integer(1))).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryDocumentQuery);
        assert!(validate_new_order_by(&q, &OrderBy::asc(field("a"))).is_err());
    }

    #[test]
    fn test_order_by_after_bounds_rejected() {
        let q = cities()
            .add_order_by(OrderBy::asc(field("name")))
            .unwrap()
            .start_at(Bound::new(vec![FieldValue::from("A")], true))
            .unwrap();
        let err = validate_new_order_by(&q, &OrderBy::asc(field("pop"))).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidOrder);
    }

    #[test]
    fn test_order_by_after_key_rejected() {
        let q = cities().add_order_by(OrderBy::key(Direction::Ascending)).unwrap();
        assert!(validate_new_order_by(&q, &OrderBy::asc(field("name"))).is_err());
    }

    #[test]
    fn test_first_order_by_must_match_inequality() {
        let q = cities()
            .add_filter(f("pop", Operator::GreaterThan, FieldValue::Integer(1)))
            .unwrap();
        assert!(validate_new_order_by(&q, &OrderBy::asc(field("name"))).is_err());
        assert!(validate_new_order_by(&q, &OrderBy::desc(field("pop"))).is_ok());
    }

    #[test]
    fn test_bound_length_and_key_component() {
        let order = vec![OrderBy::asc(field("name")), OrderBy::key(Direction::Ascending)];

        assert!(validate_bound(&order, &Bound::new(vec![FieldValue::from("A")], true)).is_ok());
        assert!(validate_bound(
            &order,
            &Bound::new(
                vec![FieldValue::from("A"), FieldValue::reference("cities/A").unwrap()],
                true
            )
        )
        .is_ok());

        let err = validate_bound(
            &order,
            &Bound::new(vec![FieldValue::from("A"), FieldValue::from("cities/A")], true),
        )
        .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryInvalidBound);

        let too_long = Bound::new(
            vec![
                FieldValue::from("A"),
                FieldValue::reference("cities/A").unwrap(),
                FieldValue::Integer(1),
            ],
            true,
        );
        assert!(validate_bound(&order, &too_long).is_err());
    }
}
