//! `FilterExpression` to LanceDB SQL predicate translation.
//!
//! Produces a predicate string for `only_if`. A condition the backend
//! cannot express is treated as no constraint and logged, never a hard
//! failure; inside an OR group one permissive child makes the whole group
//! permissive, since `anything OR true` is true.

use serde_json::Value;
use tracing::warn;

use mnemo_types::filter::{Combinator, FilterExpression, FilterOperator};

/// Columns of the memory units table that predicates may reference.
const KNOWN_COLUMNS: &[&str] = &[
    "id",
    "parent_id",
    "chunk_index",
    "is_chunk",
    "kind",
    "created_at",
];

/// Translate a filter tree into a SQL predicate.
///
/// `None` means "no constraint": either the whole tree is permissive or it
/// is empty.
pub fn to_sql(filter: &FilterExpression) -> Option<String> {
    match filter {
        FilterExpression::Condition {
            field,
            operator,
            value,
        } => condition_to_sql(field, *operator, value),
        FilterExpression::Group {
            combinator,
            children,
        } => {
            let translated: Vec<Option<String>> = children.iter().map(to_sql).collect();
            match combinator {
                Combinator::And => {
                    let parts: Vec<String> = translated.into_iter().flatten().collect();
                    if parts.is_empty() {
                        None
                    } else {
                        Some(format!("({})", parts.join(" AND ")))
                    }
                }
                Combinator::Or => {
                    if translated.iter().any(Option::is_none) {
                        warn!("OR group contains an untranslatable condition; dropping the group");
                        return None;
                    }
                    let parts: Vec<String> = translated.into_iter().flatten().collect();
                    if parts.is_empty() {
                        None
                    } else {
                        Some(format!("({})", parts.join(" OR ")))
                    }
                }
            }
        }
    }
}

fn condition_to_sql(field: &str, operator: FilterOperator, value: &Value) -> Option<String> {
    if !KNOWN_COLUMNS.contains(&field) {
        warn!(field, "unknown filter field; treating condition as no constraint");
        return None;
    }

    match operator {
        FilterOperator::Eq => literal(value).map(|v| format!("{field} = {v}")),
        FilterOperator::Neq => literal(value).map(|v| format!("{field} != {v}")),
        FilterOperator::Gt => literal(value).map(|v| format!("{field} > {v}")),
        FilterOperator::Gte => literal(value).map(|v| format!("{field} >= {v}")),
        FilterOperator::Lt => literal(value).map(|v| format!("{field} < {v}")),
        FilterOperator::Lte => literal(value).map(|v| format!("{field} <= {v}")),
        FilterOperator::Exists => Some(format!("{field} IS NOT NULL")),
        FilterOperator::NotExists => Some(format!("{field} IS NULL")),
        FilterOperator::Contains => match value {
            Value::String(s) => Some(format!("{field} LIKE '%{}%'", escape(s))),
            other => {
                warn!(field, value = %other, "contains requires a string value; ignoring");
                None
            }
        },
    }
}

/// Render a JSON value as a SQL literal. Non-scalar values are permissive.
fn literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(format!("'{}'", escape(s))),
        Value::Bool(b) => Some(if *b { "TRUE".to_string() } else { "FALSE".to_string() }),
        Value::Number(n) => Some(n.to_string()),
        other => {
            warn!(value = %other, "unsupported literal in filter; treating as no constraint");
            None
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eq_string_and_bool() {
        let f = FilterExpression::eq("kind", "memory");
        assert_eq!(to_sql(&f).unwrap(), "kind = 'memory'");

        let f = FilterExpression::eq("is_chunk", false);
        assert_eq!(to_sql(&f).unwrap(), "is_chunk = FALSE");
    }

    #[test]
    fn test_comparison_operators() {
        let f = FilterExpression::condition("chunk_index", FilterOperator::Gte, 2);
        assert_eq!(to_sql(&f).unwrap(), "chunk_index >= 2");

        let f = FilterExpression::condition("created_at", FilterOperator::Lt, "2026-01-01T00:00:00Z");
        assert_eq!(to_sql(&f).unwrap(), "created_at < '2026-01-01T00:00:00Z'");
    }

    #[test]
    fn test_exists_and_contains() {
        let f = FilterExpression::condition("parent_id", FilterOperator::NotExists, json!(null));
        assert_eq!(to_sql(&f).unwrap(), "parent_id IS NULL");

        let f = FilterExpression::condition("source_text", FilterOperator::Contains, "paris");
        // source_text is not filterable; permissive.
        assert!(to_sql(&f).is_none());

        let f = FilterExpression::condition("kind", FilterOperator::Contains, "mem");
        assert_eq!(to_sql(&f).unwrap(), "kind LIKE '%mem%'");
    }

    #[test]
    fn test_string_escaping() {
        let f = FilterExpression::eq("kind", "o'brien");
        assert_eq!(to_sql(&f).unwrap(), "kind = 'o''brien'");
    }

    #[test]
    fn test_and_group_drops_permissive_children() {
        let f = FilterExpression::and(vec![
            FilterExpression::eq("is_chunk", false),
            FilterExpression::eq("unknown_field", 1),
            FilterExpression::eq("kind", "memory"),
        ]);
        assert_eq!(to_sql(&f).unwrap(), "(is_chunk = FALSE AND kind = 'memory')");
    }

    #[test]
    fn test_or_group_with_permissive_child_is_permissive() {
        let f = FilterExpression::or(vec![
            FilterExpression::eq("kind", "memory"),
            FilterExpression::eq("unknown_field", 1),
        ]);
        assert!(to_sql(&f).is_none());
    }

    #[test]
    fn test_nested_groups() {
        let f = FilterExpression::and(vec![
            FilterExpression::eq("is_chunk", false),
            FilterExpression::or(vec![
                FilterExpression::eq("kind", "memory"),
                FilterExpression::eq("kind", "question"),
            ]),
        ]);
        assert_eq!(
            to_sql(&f).unwrap(),
            "(is_chunk = FALSE AND (kind = 'memory' OR kind = 'question'))"
        );
    }

    #[test]
    fn test_empty_group_is_no_constraint() {
        assert!(to_sql(&FilterExpression::and(vec![])).is_none());
        assert!(to_sql(&FilterExpression::or(vec![])).is_none());
    }
}
