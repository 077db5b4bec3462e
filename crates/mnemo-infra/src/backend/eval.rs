//! In-memory filter evaluation for the lexical backend.
//!
//! Mirrors the SQL translation's semantics: every operator is matched
//! exhaustively, and a condition that cannot be evaluated against a unit
//! (unknown field, type mismatch) is permissive and logged, never a
//! rejection.

use serde_json::Value;
use tracing::warn;

use mnemo_types::filter::{Combinator, FilterExpression, FilterOperator};
use mnemo_types::memory::IndexedUnit;

/// Evaluate a filter tree against one unit.
pub fn matches(unit: &IndexedUnit, filter: &FilterExpression) -> bool {
    match filter {
        FilterExpression::Group {
            combinator,
            children,
        } => match combinator {
            Combinator::And => children.iter().all(|c| matches(unit, c)),
            Combinator::Or => children.is_empty() || children.iter().any(|c| matches(unit, c)),
        },
        FilterExpression::Condition {
            field,
            operator,
            value,
        } => condition_matches(unit, field, *operator, value),
    }
}

fn field_value(unit: &IndexedUnit, field: &str) -> Option<Value> {
    match field {
        "id" => Some(Value::String(unit.id.to_string())),
        "parent_id" => unit.parent_id.map(|p| Value::String(p.to_string())),
        "chunk_index" => Some(Value::from(unit.chunk_index)),
        "is_chunk" => Some(Value::Bool(unit.is_chunk())),
        "kind" => Some(Value::String(unit.kind.to_string())),
        "created_at" => Some(Value::String(unit.created_at.to_rfc3339())),
        _ => None,
    }
}

/// Fields of a unit addressable by filters. Same set as the SQL columns
/// the translator recognizes.
const KNOWN_FIELDS: &[&str] = &["id", "parent_id", "chunk_index", "is_chunk", "kind", "created_at"];

fn condition_matches(unit: &IndexedUnit, field: &str, operator: FilterOperator, value: &Value) -> bool {
    if !KNOWN_FIELDS.contains(&field) {
        warn!(field, "unknown filter field; treating condition as no constraint");
        return true;
    }

    let actual = field_value(unit, field);

    match operator {
        FilterOperator::Exists => return actual.is_some(),
        FilterOperator::NotExists => return actual.is_none(),
        _ => {}
    }

    let Some(actual) = actual else {
        // Known field with no value (parent_id on a full unit). Only the
        // existence operators can address it; the rest are no constraint.
        return true;
    };

    match operator {
        FilterOperator::Eq => &actual == value,
        FilterOperator::Neq => &actual != value,
        FilterOperator::Gt => compare(&actual, value, field).map_or(true, |o| o.is_gt()),
        FilterOperator::Gte => compare(&actual, value, field).map_or(true, |o| o.is_ge()),
        FilterOperator::Lt => compare(&actual, value, field).map_or(true, |o| o.is_lt()),
        FilterOperator::Lte => compare(&actual, value, field).map_or(true, |o| o.is_le()),
        FilterOperator::Contains => match (&actual, value) {
            (Value::String(a), Value::String(v)) => a.contains(v.as_str()),
            _ => {
                warn!(field, "contains requires string operands; treating as no constraint");
                true
            }
        },
        // Handled above; unreachable by construction.
        FilterOperator::Exists | FilterOperator::NotExists => true,
    }
}

/// Ordered comparison; `None` on type mismatch (permissive).
fn compare(actual: &Value, expected: &Value, field: &str) -> Option<std::cmp::Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().and_then(|a| b.as_f64().and_then(|b| a.partial_cmp(&b)))
        }
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => {
            warn!(field, "incomparable filter operands; treating as no constraint");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_types::memory::{MemoryKind, MemoryRecord};
    use serde_json::json;

    fn full_unit() -> IndexedUnit {
        let record = MemoryRecord::new(MemoryKind::Memory, vec!["a memory".to_string()]);
        IndexedUnit::full(&record, vec![0.0; 4])
    }

    fn chunk_unit() -> IndexedUnit {
        let record = MemoryRecord::new(MemoryKind::Memory, vec!["a memory".to_string()]);
        IndexedUnit::chunk(&record, 2, "a mem".to_string(), vec![0.0; 4])
    }

    #[test]
    fn test_eq_on_kind_and_is_chunk() {
        let unit = full_unit();
        assert!(matches(&unit, &FilterExpression::eq("kind", "memory")));
        assert!(!matches(&unit, &FilterExpression::eq("kind", "question")));
        assert!(matches(&unit, &FilterExpression::eq("is_chunk", false)));
        assert!(!matches(&unit, &FilterExpression::eq("is_chunk", true)));
    }

    #[test]
    fn test_exists_on_parent_id() {
        let exists = FilterExpression::condition("parent_id", FilterOperator::Exists, json!(null));
        assert!(!matches(&full_unit(), &exists));
        assert!(matches(&chunk_unit(), &exists));

        let absent =
            FilterExpression::condition("parent_id", FilterOperator::NotExists, json!(null));
        assert!(matches(&full_unit(), &absent));
    }

    #[test]
    fn test_numeric_comparison_on_chunk_index() {
        let unit = chunk_unit();
        assert!(matches(
            &unit,
            &FilterExpression::condition("chunk_index", FilterOperator::Gte, 2)
        ));
        assert!(!matches(
            &unit,
            &FilterExpression::condition("chunk_index", FilterOperator::Lt, 2)
        ));
    }

    #[test]
    fn test_unknown_field_is_permissive() {
        assert!(matches(&full_unit(), &FilterExpression::eq("importance", 5)));
    }

    #[test]
    fn test_unknown_field_existence_is_permissive() {
        // The SQL translator skips unknown columns entirely, so existence
        // checks on them must not reject here either.
        let exists = FilterExpression::condition("importance", FilterOperator::Exists, json!(null));
        assert!(matches(&full_unit(), &exists));

        let absent =
            FilterExpression::condition("importance", FilterOperator::NotExists, json!(null));
        assert!(matches(&full_unit(), &absent));
    }

    #[test]
    fn test_type_mismatch_is_permissive() {
        let f = FilterExpression::condition("kind", FilterOperator::Gt, 10);
        assert!(matches(&full_unit(), &f));
    }

    #[test]
    fn test_groups_combine() {
        let unit = chunk_unit();
        let and = FilterExpression::and(vec![
            FilterExpression::eq("is_chunk", true),
            FilterExpression::eq("kind", "memory"),
        ]);
        assert!(matches(&unit, &and));

        let or = FilterExpression::or(vec![
            FilterExpression::eq("is_chunk", false),
            FilterExpression::eq("kind", "memory"),
        ]);
        assert!(matches(&unit, &or));

        let neither = FilterExpression::or(vec![
            FilterExpression::eq("is_chunk", false),
            FilterExpression::eq("kind", "question"),
        ]);
        assert!(!matches(&unit, &neither));
    }
}
