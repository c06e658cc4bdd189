//! Restricted arithmetic expression engine for measure/filter formulas.
//!
//! Expressions reference row fields as bare identifiers, e.g.
//! `revenue / clicks`. The grammar covers identifiers, numeric literals,
//! `+ - * /`, unary minus and parentheses; nothing else. Evaluation is
//! soft-fail: a missing field, a parse error or a non-finite result all
//! yield 0 for that row instead of an error.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOperator, Expr};
pub use eval::ExprCache;
pub use parser::parse;
