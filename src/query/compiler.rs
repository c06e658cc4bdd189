use serde_json::Value;

use crate::dataset::ColumnKind;
use crate::model::{AggregateKind, FilterValue, QueryModel};

use super::projection::{ColumnSource, CompiledQuery, ProjectedColumn, Projection};

/// Compile a model into a projection and the SQL text it represents.
/// The SQL is for display/export only; it is never executed.
pub fn build_query(model: &QueryModel, table: &str) -> CompiledQuery {
    let mut columns = Vec::new();
    let mut group_by = Vec::new();

    for dim in &model.dimensions {
        let (source, sql) = match &dim.expression {
            Some(expr) => (ColumnSource::Expression(expr.clone()), expr.clone()),
            None => (ColumnSource::Field(dim.name.clone()), quote_ident(&dim.name)),
        };
        group_by.push(sql.clone());
        columns.push(ProjectedColumn {
            alias: dim.name.clone(),
            kind: ColumnKind::Dimension,
            source,
            sql,
            agg: None,
            format: None,
        });
    }

    for measure in &model.measures {
        let inner = match (&measure.agg, &measure.expression) {
            (AggregateKind::Count, None) => "*".to_string(),
            (_, Some(expr)) => expr.clone(),
            (_, None) => quote_ident(&measure.name),
        };
        let source = match (&measure.agg, &measure.expression) {
            (AggregateKind::Count, _) => ColumnSource::CountAll,
            (_, Some(expr)) => ColumnSource::Expression(expr.clone()),
            (_, None) => ColumnSource::Field(measure.name.clone()),
        };
        columns.push(ProjectedColumn {
            alias: measure.name.clone(),
            kind: ColumnKind::Measure,
            source,
            sql: format!("{}({})", measure.agg.as_sql(), inner),
            agg: Some(measure.agg),
            format: measure.format.clone(),
        });
    }

    // An empty model still projects something meaningful.
    if columns.is_empty() {
        columns.push(ProjectedColumn {
            alias: "count".to_string(),
            kind: ColumnKind::Measure,
            source: ColumnSource::CountAll,
            sql: "COUNT(*)".to_string(),
            agg: Some(AggregateKind::Count),
            format: None,
        });
    }

    let projection = Projection { columns, group_by };
    let sql = render_sql(model, table, &projection);

    CompiledQuery { projection, sql }
}

fn render_sql(model: &QueryModel, table: &str, projection: &Projection) -> String {
    let select_list: Vec<String> = projection
        .columns
        .iter()
        .map(|col| format!("{} AS {}", col.sql, quote_ident(&col.alias)))
        .collect();

    let mut sql = format!(
        "SELECT {} FROM {}",
        select_list.join(", "),
        quote_ident(table)
    );

    let clauses: Vec<String> = model
        .filters
        .iter()
        .filter_map(|(field, value)| filter_clause(field, value))
        .collect();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if !projection.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&projection.group_by.join(", "));
    }

    if !model.sort.is_empty() {
        let keys: Vec<String> = model
            .sort
            .iter()
            .map(|key| format!("{} {}", quote_ident(&key.field), key.dir.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    if let Some(limit) = model.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    sql
}

fn filter_clause(field: &str, value: &FilterValue) -> Option<String> {
    let ident = quote_ident(field);
    match value {
        FilterValue::Equals(Value::Null) => None,
        FilterValue::Equals(v) => Some(format!("{} = {}", ident, literal(v))),
        FilterValue::OneOf(values) if values.is_empty() => None,
        FilterValue::OneOf(values) => {
            let list: Vec<String> = values.iter().map(literal).collect();
            Some(format!("{} IN ({})", ident, list.join(", ")))
        }
        FilterValue::Range(range) => {
            let mut bounds = Vec::new();
            if let Some(min) = range.min {
                bounds.push(format!("{} >= {}", ident, min));
            }
            if let Some(max) = range.max {
                bounds.push(format!("{} <= {}", ident, max));
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds.join(" AND "))
            }
        }
    }
}

/// Double-quote an identifier, doubling any embedded quote.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a filter value as a SQL literal; strings single-quote with
/// embedded quotes doubled.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}
