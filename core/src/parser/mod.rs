//! Parser: token stream -> AST.
//!
//! Recursive descent for statements, a Pratt-style climb for expressions
//! with left-associative binary operators. Precedence, tightest last:
//! assignments (10), comparisons and logical operators (20), bitwise
//! operators (30), additive (40), multiplicative (50).

mod ast;
mod ast_dumper;
pub mod parser;

#[cfg(test)]
mod parser_test;

pub use ast::{
    Ast, BinaryOp, Constant, Expr, ExprKind, Node, Stmt, StmtKind, TypeName, UnaryOp,
};
pub use ast_dumper::dump_ast;
pub use parser::parse;
