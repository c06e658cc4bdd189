use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::dataset::Row;

use super::ast::{BinaryOperator, Expr};
use super::parser::parse;

/// Compiles expressions lazily and memoizes them by exact text, so
/// repeated runs never re-parse the same formula. Parse failures are
/// cached too; such expressions evaluate to 0 for every row.
#[derive(Default)]
pub struct ExprCache {
    compiled: HashMap<String, Option<Arc<Expr>>>,
}

impl ExprCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `text` against `row`, soft-failing to 0.
    pub fn eval(&mut self, text: &str, row: &Row) -> f64 {
        let compiled = self
            .compiled
            .entry(text.to_string())
            .or_insert_with(|| match parse(text) {
                Ok(expr) => Some(Arc::new(expr)),
                Err(err) => {
                    tracing::debug!("expression '{}' failed to compile: {}", text, err);
                    None
                }
            })
            .clone();

        match compiled {
            Some(expr) => {
                let value = eval_expr(&expr, row);
                if value.is_finite() {
                    value
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.compiled.len()
    }
}

fn eval_expr(expr: &Expr, row: &Row) -> f64 {
    match expr {
        Expr::Number(n) => *n,
        Expr::Field(name) => row.get(name).map_or(0.0, coerce_number),
        Expr::Negate(operand) => -eval_expr(operand, row),
        Expr::BinaryOp { left, op, right } => {
            let l = eval_expr(left, row);
            let r = eval_expr(right, row);
            match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => l / r,
            }
        }
    }
}

/// Numeric view of a cell: numbers pass through, numeric strings parse,
/// everything else is 0.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_simple_arithmetic() {
        let mut cache = ExprCache::new();
        let r = row(json!({"revenue": 100, "clicks": 20}));
        assert_eq!(cache.eval("revenue / clicks", &r), 5.0);
        assert_eq!(cache.eval("revenue - clicks * 2", &r), 60.0);
        assert_eq!(cache.eval("(revenue - clicks) / 2", &r), 40.0);
    }

    #[test]
    fn test_division_by_zero_soft_fails() {
        let mut cache = ExprCache::new();
        let r = row(json!({"revenue": 100, "clicks": 0}));
        assert_eq!(cache.eval("revenue / clicks", &r), 0.0);
    }

    #[test]
    fn test_missing_field_soft_fails() {
        let mut cache = ExprCache::new();
        let r = row(json!({"revenue": 100}));
        assert_eq!(cache.eval("impressions + 1", &r), 1.0);
    }

    #[test]
    fn test_bad_expression_soft_fails() {
        let mut cache = ExprCache::new();
        let r = row(json!({"a": 1}));
        assert_eq!(cache.eval("a ++/ b", &r), 0.0);
        // Second call hits the cached failure.
        assert_eq!(cache.eval("a ++/ b", &r), 0.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_numeric_string_coercion() {
        let mut cache = ExprCache::new();
        let r = row(json!({"spend": "12.5", "label": "north"}));
        assert_eq!(cache.eval("spend * 2", &r), 25.0);
        assert_eq!(cache.eval("label + 1", &r), 1.0);
    }

    #[test]
    fn test_memoizes_by_text() {
        let mut cache = ExprCache::new();
        let r = row(json!({"a": 2}));
        cache.eval("a * 3", &r);
        cache.eval("a * 3", &r);
        cache.eval("a*3", &r);
        assert_eq!(cache.len(), 2);
    }
}
