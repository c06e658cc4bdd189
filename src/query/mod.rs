//! Compilation of a declarative [`crate::model::QueryModel`] into a
//! canonical [`Projection`] plus display-only SQL text.

pub mod compiler;
pub mod projection;

pub use compiler::build_query;
pub use projection::{ColumnSource, CompiledQuery, ProjectedColumn, Projection};
