//! The type-resolved tree produced by the checker and consumed by the
//! emitter.
//!
//! The parsed AST is never mutated: checking builds a fresh tree in the same
//! arena with every expression annotated by its resolved type and every
//! implicit conversion reified as an explicit [`TypedExprKind::Cast`] node.
//! Struct methods are lowered here to plain functions named
//! `Struct__Method` with an implicit leading `self` parameter, and method
//! calls to plain calls with the receiver as the first argument.

use crate::analyzer::types::{StructLayout, VarType};
use crate::parser::{BinaryOp, Constant, UnaryOp};
use crate::source::SourceRange;

#[derive(Debug)]
pub struct TypedExpr<'a> {
    /// The expression's resolved type.
    pub ty: &'a VarType<'a>,
    pub kind: TypedExprKind<'a>,
    pub range: SourceRange,
}

#[derive(Debug)]
pub enum TypedExprKind<'a> {
    Constant(Constant<'a>),
    VarRef {
        name: &'a str,
    },
    ArrayAccess {
        parent: &'a TypedExpr<'a>,
        index: &'a TypedExpr<'a>,
    },
    Member {
        parent: &'a TypedExpr<'a>,
        name: &'a str,
        /// Byte offset of the field within the parent struct.
        offset: usize,
    },
    Call {
        name: &'a str,
        args: &'a [&'a TypedExpr<'a>],
        is_extern: bool,
    },
    Paren {
        inner: &'a TypedExpr<'a>,
    },
    Cast {
        /// The type being converted from; the target is the node's own type.
        from: &'a VarType<'a>,
        inner: &'a TypedExpr<'a>,
    },
    Unary {
        op: UnaryOp,
        inner: &'a TypedExpr<'a>,
    },
    Binary {
        op: BinaryOp,
        lhs: &'a TypedExpr<'a>,
        rhs: &'a TypedExpr<'a>,
        /// The reconciled operand type the operation runs at. For
        /// comparisons this differs from the node's own type (bool).
        operand_ty: &'a VarType<'a>,
    },
}

#[derive(Debug)]
pub struct TypedStmt<'a> {
    pub kind: TypedStmtKind<'a>,
    pub range: SourceRange,
}

#[derive(Debug)]
pub enum TypedStmtKind<'a> {
    Compound {
        nodes: &'a [TypedNode<'a>],
    },
    VarDecl {
        name: &'a str,
        ty: &'a VarType<'a>,
        init: Option<&'a TypedExpr<'a>>,
    },
    ParamDecl {
        name: &'a str,
        ty: &'a VarType<'a>,
    },
    /// A function or lowered method. Extern declarations carry no body.
    Function {
        name: &'a str,
        params: &'a [&'a TypedStmt<'a>],
        return_ty: &'a VarType<'a>,
        body: Option<&'a TypedStmt<'a>>,
        is_extern: bool,
    },
    Struct {
        layout: &'a StructLayout<'a>,
        /// Methods lowered to `Function` statements under mangled names.
        methods: &'a [&'a TypedStmt<'a>],
    },
    While {
        cond: &'a TypedExpr<'a>,
        body: &'a TypedStmt<'a>,
    },
    DoWhile {
        body: &'a TypedStmt<'a>,
        cond: &'a TypedExpr<'a>,
    },
    For {
        prologue: &'a TypedStmt<'a>,
        cond: &'a TypedExpr<'a>,
        epilogue: &'a TypedExpr<'a>,
        body: &'a TypedStmt<'a>,
    },
    If {
        cond: &'a TypedExpr<'a>,
        body: &'a TypedStmt<'a>,
        else_body: Option<&'a TypedStmt<'a>>,
    },
    Return {
        value: &'a TypedExpr<'a>,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, Copy)]
pub enum TypedNode<'a> {
    Stmt(&'a TypedStmt<'a>),
    Expr(&'a TypedExpr<'a>),
}

/// The checker's output: top-level typed nodes in source order.
#[derive(Debug)]
pub struct TypedProgram<'a> {
    pub nodes: Vec<TypedNode<'a>>,
}
