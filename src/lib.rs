pub mod client;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod expr;
pub mod model;
pub mod query;
pub mod snapshot;

pub use client::{AnalyticsClient, RunOutput};
pub use dataset::{parse_delimited, Column, ColumnKind, Dataset, Row};
pub use engine::{execute, sort_and_limit, QueryResult};
pub use error::{EngineError, EngineResult};
pub use expr::ExprCache;
pub use model::{
    AggregateKind, Dimension, FilterValue, Measure, Purpose, QueryModel, RangeFilter, RunMeta,
    SortDir, SortKey,
};
pub use query::{build_query, ColumnSource, CompiledQuery, Projection};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotPayload, SnapshotStore};
