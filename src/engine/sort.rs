use std::cmp::Ordering;

use serde_json::Value;

use crate::dataset::Row;
use crate::model::{SortDir, SortKey};

use super::value_text;

/// Stable multi-key sort followed by limit truncation. With no sort keys
/// the original group order is preserved.
pub fn sort_and_limit(mut rows: Vec<Row>, keys: &[SortKey], limit: Option<usize>) -> Vec<Row> {
    if !keys.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, keys));
    }
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_values(a.get(&key.field), b.get(&key.field));
        if ord != Ordering::Equal {
            return match key.dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            };
        }
    }
    Ordering::Equal
}

/// Numeric pairs compare numerically; everything else compares as text.
/// Missing values sort before present ones.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => value_text(a).cmp(&value_text(b)),
        },
    }
}
