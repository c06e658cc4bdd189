use crate::dataset::ColumnKind;
use crate::model::AggregateKind;

/// Where a projected column's per-row value comes from. Decided once at
/// compile time so the engine never re-derives "is this computed?" from
/// the generated SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    /// Bare column read from the row.
    Field(String),
    /// Formula evaluated by the expression engine.
    Expression(String),
    /// Row counter; every contributing row is worth 1.
    CountAll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedColumn {
    pub alias: String,
    pub kind: ColumnKind,
    pub source: ColumnSource,
    /// SQL fragment this column renders as, e.g. `SUM("spend")`.
    pub sql: String,
    pub agg: Option<AggregateKind>,
    pub format: Option<String>,
}

impl ProjectedColumn {
    pub fn is_measure(&self) -> bool {
        self.kind == ColumnKind::Measure
    }
}

/// Ordered output columns plus the parallel group-by key list
/// (dimension SQL expressions).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub columns: Vec<ProjectedColumn>,
    pub group_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub projection: Projection,
    pub sql: String,
}
