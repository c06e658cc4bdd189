use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Declarative query model assembled by a host UI (drag-and-drop builder,
/// CLI model file, ...). Compiled by [`crate::query::build_query`] and
/// executed by [`crate::engine::execute`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub filters: BTreeMap<String, FilterValue>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryModel {
    /// Dimension and measure names must be unique within their lists.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for dim in &self.dimensions {
            if !seen.insert(dim.name.as_str()) {
                return Err(EngineError::InvalidModel(format!(
                    "duplicate dimension '{}'",
                    dim.name
                )));
            }
        }
        seen.clear();
        for measure in &self.measures {
            if !seen.insert(measure.name.as_str()) {
                return Err(EngineError::InvalidModel(format!(
                    "duplicate measure '{}'",
                    measure.name
                )));
            }
        }
        Ok(())
    }
}

/// A grouping field, optionally backed by an override expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// A numeric field with an associated aggregation function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub agg: AggregateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Display format hint carried through to consumers; not used by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
            AggregateKind::Count => "COUNT",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
        }
    }
}

/// Numeric bounds filter; either bound may be open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Filter value shapes, decided at model-construction time.
///
/// Serialized untagged so model JSON stays natural: a bare scalar is
/// `Equals`, an array is `OneOf`, a `{min, max}` object is `Range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    OneOf(Vec<Value>),
    Range(RangeFilter),
    Equals(Value),
}

/// Scalar equality; numbers compare by value so `10` and `10.0` are equal.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl FilterValue {
    /// Whether a row's field value satisfies this filter entry.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            // Empty list means "no restriction".
            FilterValue::OneOf(allowed) => {
                allowed.is_empty()
                    || value.map_or(false, |v| allowed.iter().any(|a| values_equal(a, v)))
            }
            FilterValue::Range(range) => {
                let n = match value.and_then(Value::as_f64) {
                    Some(n) => n,
                    None => return false,
                };
                if let Some(min) = range.min {
                    if n < min {
                        return false;
                    }
                }
                if let Some(max) = range.max {
                    if n > max {
                        return false;
                    }
                }
                true
            }
            // A null filter value places no restriction on the field.
            FilterValue::Equals(Value::Null) => true,
            FilterValue::Equals(expected) => value.map_or(false, |v| values_equal(v, expected)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

/// Opaque tag recorded in run metadata; never inspected by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Purpose(pub String);

impl From<&str> for Purpose {
    fn from(s: &str) -> Self {
        Purpose(s.to_string())
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to restore "what produced this view".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub purpose: Purpose,
    pub model: QueryModel,
}
