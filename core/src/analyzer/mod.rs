//! Type checker / semantic analyzer.
//!
//! A single walk over the parsed AST that resolves named types, lays out
//! structs, types every expression, and inserts implicit cast nodes where the
//! conversion-cost model allows. The output is a fresh typed tree; the parsed
//! AST stays immutable, so checking the same parse twice produces identical
//! results.

pub mod analyzer;
pub mod typed_ast;
pub mod types;

#[cfg(test)]
mod analyzer_test;

pub use analyzer::{check, conversion_cost, ConversionCost, ConversionKind};
pub use typed_ast::{TypedExpr, TypedExprKind, TypedNode, TypedProgram, TypedStmt, TypedStmtKind};
pub use types::{StructField, StructLayout, TypeManager, VarType};
