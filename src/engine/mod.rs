//! Single-pass streaming aggregation: filter rows, bucket them by a
//! composite group key, keep running statistics per group and measure,
//! then finalize per aggregation kind.

pub mod sort;

pub use sort::sort_and_limit;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::{Dataset, Row};
use crate::expr::eval::coerce_number;
use crate::expr::ExprCache;
use crate::model::{AggregateKind, FilterValue};
use crate::query::{ColumnSource, Projection};

/// Separator joining dimension values into one composite group key.
const GROUP_KEY_SEP: char = '\u{1f}';

/// Ordered columns plus ordered rows; immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone)]
struct RunningStat {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl RunningStat {
    fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn finalize(&self, agg: AggregateKind) -> f64 {
        let value = match agg {
            AggregateKind::Sum => self.sum,
            AggregateKind::Count => self.count as f64,
            AggregateKind::Avg => {
                if self.count == 0 {
                    0.0
                } else {
                    self.sum / self.count as f64
                }
            }
            AggregateKind::Min => {
                if self.count == 0 {
                    0.0
                } else {
                    self.min
                }
            }
            AggregateKind::Max => {
                if self.count == 0 {
                    0.0
                } else {
                    self.max
                }
            }
        };
        round4(value)
    }
}

/// Round to 4 decimal places; non-finite values become 0.
fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10_000.0).round() / 10_000.0
}

struct Group {
    dims: Vec<Value>,
    stats: Vec<RunningStat>,
}

/// Execute a projection over the dataset's rows and the active filter set.
/// Output rows appear in first-seen group order.
pub fn execute(
    projection: &Projection,
    filters: &BTreeMap<String, FilterValue>,
    dataset: &Dataset,
    exprs: &mut ExprCache,
) -> QueryResult {
    let dims: Vec<_> = projection
        .columns
        .iter()
        .filter(|c| !c.is_measure())
        .collect();
    let measures: Vec<_> = projection
        .columns
        .iter()
        .filter(|c| c.is_measure())
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();

    for row in &dataset.rows {
        if !row_passes(filters, row) {
            continue;
        }

        let dim_values: Vec<Value> = dims
            .iter()
            .map(|col| dimension_value(&col.source, &col.alias, row, exprs))
            .collect();
        let key = dim_values
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(&GROUP_KEY_SEP.to_string());

        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Group {
                dims: dim_values,
                stats: vec![RunningStat::new(); measures.len()],
            }
        });

        for (stat, col) in group.stats.iter_mut().zip(&measures) {
            stat.update(measure_value(&col.source, row, exprs));
        }
    }

    tracing::debug!(
        rows = dataset.rows.len(),
        groups = order.len(),
        "aggregation pass complete"
    );

    let columns: Vec<String> = projection
        .columns
        .iter()
        .map(|c| c.alias.clone())
        .collect();

    let rows = order
        .iter()
        .filter_map(|key| groups.remove(key))
        .map(|group| {
            let mut out = Row::new();
            let mut di = 0;
            let mut mi = 0;
            for col in &projection.columns {
                if col.is_measure() {
                    let agg = col.agg.unwrap_or(AggregateKind::Count);
                    out.insert(col.alias.clone(), number_value(group.stats[mi].finalize(agg)));
                    mi += 1;
                } else {
                    out.insert(col.alias.clone(), group.dims[di].clone());
                    di += 1;
                }
            }
            out
        })
        .collect();

    QueryResult { columns, rows }
}

/// Logical AND over all filter entries.
pub fn row_passes(filters: &BTreeMap<String, FilterValue>, row: &Row) -> bool {
    filters
        .iter()
        .all(|(field, filter)| filter.matches(row.get(field)))
}

fn dimension_value(
    source: &ColumnSource,
    alias: &str,
    row: &Row,
    exprs: &mut ExprCache,
) -> Value {
    match source {
        ColumnSource::Field(field) => row
            .get(field)
            .or_else(|| row.get(alias))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        ColumnSource::Expression(text) => number_value(exprs.eval(text, row)),
        // Dimensions are never row counters; key as empty.
        ColumnSource::CountAll => Value::String(String::new()),
    }
}

fn measure_value(source: &ColumnSource, row: &Row, exprs: &mut ExprCache) -> f64 {
    match source {
        ColumnSource::CountAll => 1.0,
        ColumnSource::Expression(text) => exprs.eval(text, row),
        ColumnSource::Field(field) => row.get(field).map_or(0.0, coerce_number),
    }
}

fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(0.into()))
}

/// String rendering used for group keys and non-numeric sort comparisons.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
