//! The parsed syntax tree.
//!
//! Two closed sum types, [`ExprKind`] and [`StmtKind`], with every edge an
//! arena reference. Type annotations are kept textually (a [`TypeName`]) and
//! resolved by the type checker; the tree is immutable once parsing finishes.

use crate::source::SourceRange;

/// A literal value as parsed. Signedness lives in the variant, matching the
/// literal suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant<'a> {
    Bool(bool),
    Char(i8),
    Int { value: i32, unsigned: bool },
    Long { value: i64, unsigned: bool },
    Float(f32),
    Double(f64),
    Str(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    DivAssign,
    Mod,
    ModAssign,

    Less,
    LessOrEq,
    Greater,
    GreaterOrEq,

    BitAnd,
    BitAndAssign,
    LogicalAnd,
    BitOr,
    BitOrAssign,
    LogicalOr,
    BitXor,
    BitXorAssign,
    LogicalXor,

    Assign,
    IsEq,
    IsNotEq,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::AddAssign => "+=",
            BinaryOp::Sub => "-",
            BinaryOp::SubAssign => "-=",
            BinaryOp::Mul => "*",
            BinaryOp::MulAssign => "*=",
            BinaryOp::Div => "/",
            BinaryOp::DivAssign => "/=",
            BinaryOp::Mod => "%",
            BinaryOp::ModAssign => "%=",

            BinaryOp::Less => "<",
            BinaryOp::LessOrEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEq => ">=",

            BinaryOp::BitAnd => "&",
            BinaryOp::BitAndAssign => "&=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitOrAssign => "|=",
            BinaryOp::LogicalOr => "||",
            BinaryOp::BitXor => "^",
            BinaryOp::BitXorAssign => "^=",
            BinaryOp::LogicalXor => "^^",

            BinaryOp::Assign => "=",
            BinaryOp::IsEq => "==",
            BinaryOp::IsNotEq => "!=",
        }
    }

    /// `+=`, `-=`, `*=`, `/=`, `%=` and the bitwise in-place forms.
    pub fn is_in_place(self) -> bool {
        matches!(
            self,
            BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::ModAssign
                | BinaryOp::BitAndAssign
                | BinaryOp::BitOrAssign
                | BinaryOp::BitXorAssign
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::LessOrEq
                | BinaryOp::Greater
                | BinaryOp::GreaterOrEq
                | BinaryOp::IsEq
                | BinaryOp::IsNotEq
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd
                | BinaryOp::BitAndAssign
                | BinaryOp::LogicalAnd
                | BinaryOp::BitOr
                | BinaryOp::BitOrAssign
                | BinaryOp::LogicalOr
                | BinaryOp::BitXor
                | BinaryOp::BitXorAssign
                | BinaryOp::LogicalXor
        )
    }
}

/// A textual type annotation: a primitive keyword or a struct name,
/// optionally marked as an array of that element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeName<'a> {
    pub name: &'a str,
    pub array: bool,
    pub range: SourceRange,
}

#[derive(Debug, PartialEq)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    pub range: SourceRange,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind<'a> {
    Constant(Constant<'a>),
    VarRef {
        name: &'a str,
    },
    ArrayAccess {
        parent: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    SelfRef,
    Member {
        parent: &'a Expr<'a>,
        name: &'a str,
    },
    MethodCall {
        parent: &'a Expr<'a>,
        name: &'a str,
        args: &'a [&'a Expr<'a>],
    },
    Call {
        name: &'a str,
        args: &'a [&'a Expr<'a>],
    },
    Paren {
        inner: &'a Expr<'a>,
    },
    Cast {
        ty: TypeName<'a>,
        inner: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        inner: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    },
}

#[derive(Debug, PartialEq)]
pub struct Stmt<'a> {
    pub kind: StmtKind<'a>,
    pub range: SourceRange,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind<'a> {
    Compound {
        nodes: &'a [Node<'a>],
    },
    VarDecl {
        name: &'a str,
        ty: TypeName<'a>,
        init: Option<&'a Expr<'a>>,
    },
    ParamDecl {
        name: &'a str,
        ty: TypeName<'a>,
    },
    FunctionDecl {
        name: &'a str,
        params: &'a [&'a Stmt<'a>],
        return_ty: TypeName<'a>,
        body: Option<&'a Stmt<'a>>,
        is_extern: bool,
    },
    StructDecl {
        name: &'a str,
        fields: &'a [&'a Stmt<'a>],
    },
    FieldDecl {
        name: &'a str,
        ty: TypeName<'a>,
    },
    MethodDecl {
        name: &'a str,
        params: &'a [&'a Stmt<'a>],
        return_ty: TypeName<'a>,
        body: &'a Stmt<'a>,
    },
    While {
        cond: &'a Expr<'a>,
        body: &'a Stmt<'a>,
    },
    DoWhile {
        body: &'a Stmt<'a>,
        cond: &'a Expr<'a>,
    },
    For {
        prologue: &'a Stmt<'a>,
        cond: &'a Expr<'a>,
        epilogue: &'a Expr<'a>,
        body: &'a Stmt<'a>,
    },
    If {
        cond: &'a Expr<'a>,
        body: &'a Stmt<'a>,
        else_body: Option<&'a Stmt<'a>>,
    },
    Return {
        value: &'a Expr<'a>,
    },
    Break,
    Continue,
}

/// A top-level item: either a statement or a bare expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Stmt(&'a Stmt<'a>),
    Expr(&'a Expr<'a>),
}

/// The parse result: top-level nodes in source order plus the parser's
/// error flag. The emitter must never run when `is_valid()` is false.
#[derive(Debug)]
pub struct Ast<'a> {
    pub nodes: Vec<Node<'a>>,
    pub(crate) valid: bool,
}

impl<'a> Ast<'a> {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
