//! Filter expressions for backend queries.
//!
//! A `FilterExpression` is a small tagged tree: leaf conditions over unit
//! metadata fields, grouped by AND/OR. Each backend adapter translates the
//! tree into its native query language via an exhaustive match, so a new
//! backend surfaces every unhandled operator at compile time. An operator a
//! backend cannot express is treated as "no constraint" (permissive) and
//! logged -- never a hard failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt;
use std::str::FromStr;

/// Comparison operator for a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Exists,
    NotExists,
    Contains,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOperator::Eq => write!(f, "eq"),
            FilterOperator::Neq => write!(f, "neq"),
            FilterOperator::Gt => write!(f, "gt"),
            FilterOperator::Gte => write!(f, "gte"),
            FilterOperator::Lt => write!(f, "lt"),
            FilterOperator::Lte => write!(f, "lte"),
            FilterOperator::Exists => write!(f, "exists"),
            FilterOperator::NotExists => write!(f, "not_exists"),
            FilterOperator::Contains => write!(f, "contains"),
        }
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(FilterOperator::Eq),
            "neq" => Ok(FilterOperator::Neq),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "exists" => Ok(FilterOperator::Exists),
            "not_exists" => Ok(FilterOperator::NotExists),
            "contains" => Ok(FilterOperator::Contains),
            other => Err(format!("invalid filter operator: '{other}'")),
        }
    }
}

/// How the children of a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

/// A filter over indexed unit metadata.
///
/// Recognized fields: `id`, `parent_id`, `chunk_index`, `kind`,
/// `created_at`, `is_chunk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterExpression {
    Condition {
        field: String,
        operator: FilterOperator,
        value: Value,
    },
    Group {
        combinator: Combinator,
        children: Vec<FilterExpression>,
    },
}

impl FilterExpression {
    /// Leaf condition: `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(field, FilterOperator::Eq, value)
    }

    /// Leaf condition with an explicit operator.
    pub fn condition(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        FilterExpression::Condition {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// AND group of child expressions.
    pub fn and(children: Vec<FilterExpression>) -> Self {
        FilterExpression::Group {
            combinator: Combinator::And,
            children,
        }
    }

    /// OR group of child expressions.
    pub fn or(children: Vec<FilterExpression>) -> Self {
        FilterExpression::Group {
            combinator: Combinator::Or,
            children,
        }
    }
}
