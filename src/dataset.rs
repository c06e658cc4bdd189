use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_DATASET_NAME: &str = "Imported dataset";

/// One result/dataset row: column name to string-or-number cell.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Dimension,
    Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// A typed in-memory table. Column kinds are inferred once at ingestion
/// and never revisited; the engine treats rows as immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Parse delimited text into a typed [`Dataset`].
///
/// Lines are trimmed; blank lines and `#` comments are dropped. The first
/// remaining line is the comma-separated header. Each cell is parsed as a
/// number, keeping the trimmed string when that fails.
pub fn parse_delimited(text: &str, name: Option<&str>) -> EngineResult<Dataset> {
    let mut lines = text
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines.next().ok_or(EngineError::MissingHeader)?;
    let columns: Vec<String> = header.split(',').map(|f| f.trim().to_string()).collect();

    let mut rows = Vec::new();
    for line in lines {
        let values: Vec<&str> = line.split(',').collect();
        let mut row = Row::new();
        for (i, column) in columns.iter().enumerate() {
            if let Some(raw) = values.get(i) {
                row.insert(column.clone(), parse_cell(raw.trim()));
            }
        }
        rows.push(row);
    }

    let columns = infer_column_kinds(&columns, &rows);

    Ok(Dataset {
        id: Uuid::new_v4().to_string(),
        name: name.unwrap_or(DEFAULT_DATASET_NAME).to_string(),
        columns,
        rows,
    })
}

fn parse_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// A column is a measure iff every row's value for it is numeric.
/// Isolated so explicit user-declared schemas can replace it later without
/// touching the aggregation engine.
pub fn infer_column_kinds(names: &[String], rows: &[Row]) -> Vec<Column> {
    names
        .iter()
        .map(|name| {
            let all_numeric = rows
                .iter()
                .all(|row| row.get(name).map_or(false, Value::is_number));
            // Vacuously numeric on an empty table.
            let kind = if all_numeric {
                ColumnKind::Measure
            } else {
                ColumnKind::Dimension
            };
            Column {
                name: name.clone(),
                kind,
            }
        })
        .collect()
}
