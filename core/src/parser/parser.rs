use bumpalo::Bump;

use crate::diagnostics::Diagnostics;
use crate::lexer::{Token, TokenKind};
use crate::parser::ast::{
    Ast, BinaryOp, Constant, Expr, ExprKind, Node, Stmt, StmtKind, TypeName, UnaryOp,
};
use crate::source::SourceRange;

/// Parse a token stream into an [`Ast`].
///
/// On error the parser reports a diagnostic at the previous token's range,
/// sets the error flag, resynchronizes at the next `;` or `}`, and keeps
/// going to gather further errors.
pub fn parse<'a>(
    arena: &'a Bump,
    tokens: &[Token<'a>],
    diagnostics: &mut Diagnostics,
) -> Ast<'a> {
    let mut parser = Parser {
        arena,
        tokens: tokens.to_vec(),
        index: 0,
        needs_semi: true,
        valid: true,
        diagnostics,
    };
    parser.parse_impl()
}

struct Parser<'a, 'd> {
    arena: &'a Bump,
    tokens: Vec<Token<'a>>,
    index: usize,
    needs_semi: bool,
    valid: bool,
    diagnostics: &'d mut Diagnostics,
}

impl<'a, 'd> Parser<'a, 'd> {
    fn parse_impl(&mut self) -> Ast<'a> {
        let mut nodes = Vec::new();

        while self.peek(0).is_some() {
            match self.parse_token() {
                Some(node) => nodes.push(node),
                None => self.synchronize(),
            }
        }

        tracing::debug!(nodes = nodes.len(), valid = self.valid, "parsed source");
        Ast {
            nodes,
            valid: self.valid,
        }
    }

    // === Token cursor ===

    fn peek(&self, count: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.index + count)
    }

    fn prev(&self) -> Option<&Token<'a>> {
        self.index.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn consume(&mut self) -> Token<'a> {
        debug_assert!(self.index < self.tokens.len(), "consume out of bounds");
        let token = self.tokens[self.index];
        self.index += 1;
        token
    }

    fn matches(&self, kind: TokenKind) -> bool {
        self.peek(0).map(|t| t.kind) == Some(kind)
    }

    fn try_consume(&mut self, kind: TokenKind, expected: &str) -> Option<Token<'a>> {
        if self.matches(kind) {
            Some(self.consume())
        } else {
            self.error_expected(expected);
            None
        }
    }

    /// Skip to just past the next `;`, or up to (not past) the next `}`.
    fn synchronize(&mut self) {
        while let Some(token) = self.peek(0) {
            match token.kind {
                TokenKind::Semi => {
                    self.consume();
                    return;
                }
                TokenKind::RightCurly => return,
                _ => {
                    self.consume();
                }
            }
        }
    }

    // === Errors ===

    fn error_expected(&mut self, expected: &str) {
        let (location, found) = match (self.prev(), self.peek(0)) {
            (Some(prev), _) => (prev.range.start, prev.kind.as_str()),
            (None, Some(next)) => (next.range.start, next.kind.as_str()),
            (None, None) => (Default::default(), "end of input"),
        };
        self.diagnostics.report(
            location,
            format!("Expected {expected} after token \"{found}\""),
        );
        self.valid = false;
    }

    fn error_too_large(&mut self, value: &str, range: SourceRange) {
        self.diagnostics
            .report(range.start, format!("Constant {value} is too large"));
        self.valid = false;
    }

    // === Allocation helpers ===

    fn expr(&self, kind: ExprKind<'a>, range: SourceRange) -> &'a Expr<'a> {
        self.arena.alloc(Expr { kind, range })
    }

    fn stmt(&self, kind: StmtKind<'a>, range: SourceRange) -> &'a Stmt<'a> {
        self.arena.alloc(Stmt { kind, range })
    }

    fn exprs(&self, items: Vec<&'a Expr<'a>>) -> &'a [&'a Expr<'a>] {
        self.arena.alloc_slice_copy(&items)
    }

    fn stmts(&self, items: Vec<&'a Stmt<'a>>) -> &'a [&'a Stmt<'a>] {
        self.arena.alloc_slice_copy(&items)
    }

    /// Range from `start` to the end of the last consumed token.
    fn range_to_prev(&self, start: SourceRange) -> SourceRange {
        match self.prev() {
            Some(prev) => start.to(prev.range),
            None => start,
        }
    }

    // === Type forms ===

    fn is_primitive_type(&self) -> bool {
        matches!(
            self.peek(0).map(|t| t.kind),
            Some(
                TokenKind::Void
                    | TokenKind::Bool
                    | TokenKind::Char
                    | TokenKind::UChar
                    | TokenKind::Short
                    | TokenKind::UShort
                    | TokenKind::Int
                    | TokenKind::UInt
                    | TokenKind::Long
                    | TokenKind::ULong
                    | TokenKind::Float
                    | TokenKind::Double
                    | TokenKind::String
            )
        )
    }

    /// Decide whether the cursor is looking at a type form: a primitive
    /// keyword, or an identifier followed by another identifier (declaration),
    /// a `)` (cast), or `[]` (array declaration).
    fn is_variable_type(&self) -> bool {
        if self.is_primitive_type() {
            return true;
        }

        if self.peek(0).map(|t| t.kind) != Some(TokenKind::Identifier) {
            return false;
        }

        match self.peek(1).map(|t| t.kind) {
            Some(TokenKind::Identifier) => true,
            Some(TokenKind::RightParen) => true,
            Some(TokenKind::LeftBracket) => {
                self.peek(2).map(|t| t.kind) == Some(TokenKind::RightBracket)
            }
            _ => false,
        }
    }

    fn parse_variable_type(&mut self) -> TypeName<'a> {
        let token = self.consume();
        let name = match token.kind {
            TokenKind::Identifier => token.data,
            _ => token.kind.as_str(),
        };

        let mut array = false;
        let mut range = token.range;
        if self.matches(TokenKind::LeftBracket)
            && self.peek(1).map(|t| t.kind) == Some(TokenKind::RightBracket)
        {
            self.consume();
            let close = self.consume();
            array = true;
            range = range.to(close.range);
        }

        TypeName { name, array, range }
    }

    // === Expressions ===

    fn parse_operator(&self) -> Option<BinaryOp> {
        Some(match self.peek(0)?.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::PlusEq => BinaryOp::AddAssign,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::MinusEq => BinaryOp::SubAssign,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::StarEq => BinaryOp::MulAssign,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::SlashEq => BinaryOp::DivAssign,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::PercentEq => BinaryOp::ModAssign,
            TokenKind::Ampersand => BinaryOp::BitAnd,
            TokenKind::AmpersandEq => BinaryOp::BitAndAssign,
            TokenKind::DoubleAmpersand => BinaryOp::LogicalAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::PipeEq => BinaryOp::BitOrAssign,
            TokenKind::DoublePipe => BinaryOp::LogicalOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::CaretEq => BinaryOp::BitXorAssign,
            TokenKind::DoubleCaret => BinaryOp::LogicalXor,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessOrEq => BinaryOp::LessOrEq,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterOrEq => BinaryOp::GreaterOrEq,
            TokenKind::Eq => BinaryOp::Assign,
            TokenKind::IsEq => BinaryOp::IsEq,
            TokenKind::IsNotEq => BinaryOp::IsNotEq,
            _ => return None,
        })
    }

    fn binary_precedence(op: BinaryOp) -> usize {
        match op {
            BinaryOp::Assign
            | BinaryOp::AddAssign
            | BinaryOp::SubAssign
            | BinaryOp::MulAssign
            | BinaryOp::DivAssign
            | BinaryOp::ModAssign
            | BinaryOp::BitAndAssign
            | BinaryOp::BitOrAssign
            | BinaryOp::BitXorAssign => 10,

            BinaryOp::Less
            | BinaryOp::LessOrEq
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEq
            | BinaryOp::IsEq
            | BinaryOp::IsNotEq
            | BinaryOp::LogicalAnd
            | BinaryOp::LogicalOr
            | BinaryOp::LogicalXor => 20,

            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => 30,

            BinaryOp::Add | BinaryOp::Sub => 40,

            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 50,
        }
    }

    fn parse_expression(&mut self, min_bp: usize) -> Option<&'a Expr<'a>> {
        let mut lhs = self.parse_value()?;

        while let Some(op) = self.parse_operator() {
            if Self::binary_precedence(op) < min_bp {
                break;
            }
            self.consume();

            let rhs = self.parse_expression(Self::binary_precedence(op) + 1)?;
            let range = lhs.range.to(rhs.range);
            lhs = self.expr(ExprKind::Binary { op, lhs, rhs }, range);
        }

        Some(lhs)
    }

    fn parse_call_arguments(&mut self) -> Option<Vec<&'a Expr<'a>>> {
        let mut args = Vec::new();
        loop {
            match self.peek(0) {
                None => {
                    self.error_expected("')'");
                    return None;
                }
                Some(t) if t.kind == TokenKind::RightParen => break,
                Some(_) => {
                    args.push(self.parse_expression(0)?);
                    if self.matches(TokenKind::Comma) {
                        self.consume();
                    }
                }
            }
        }
        Some(args)
    }

    /// Parse a primary value plus any postfix `.name`, `.name(args)` and
    /// `[index]` chains.
    fn parse_value(&mut self) -> Option<&'a Expr<'a>> {
        let token = self.peek(0).copied();
        let Some(token) = token else {
            self.error_expected("a value");
            return None;
        };

        let mut value = match token.kind {
            TokenKind::False => {
                self.consume();
                self.expr(ExprKind::Constant(Constant::Bool(false)), token.range)
            }
            TokenKind::True => {
                self.consume();
                self.expr(ExprKind::Constant(Constant::Bool(true)), token.range)
            }

            TokenKind::CharLit => {
                self.consume();
                let byte = token.data.as_bytes().first().copied().unwrap_or(0) as i8;
                self.expr(ExprKind::Constant(Constant::Char(byte)), token.range)
            }

            TokenKind::IntLit => {
                self.consume();
                let value = token.data.parse::<i32>().unwrap_or_else(|_| {
                    self.error_too_large(token.data, token.range);
                    0
                });
                self.expr(
                    ExprKind::Constant(Constant::Int {
                        value,
                        unsigned: false,
                    }),
                    token.range,
                )
            }
            TokenKind::UIntLit => {
                self.consume();
                let value = token.data.parse::<u32>().unwrap_or_else(|_| {
                    self.error_too_large(token.data, token.range);
                    0
                });
                self.expr(
                    ExprKind::Constant(Constant::Int {
                        value: value as i32,
                        unsigned: true,
                    }),
                    token.range,
                )
            }
            TokenKind::LongLit => {
                self.consume();
                let value = token.data.parse::<i64>().unwrap_or_else(|_| {
                    self.error_too_large(token.data, token.range);
                    0
                });
                self.expr(
                    ExprKind::Constant(Constant::Long {
                        value,
                        unsigned: false,
                    }),
                    token.range,
                )
            }
            TokenKind::ULongLit => {
                self.consume();
                let value = token.data.parse::<u64>().unwrap_or_else(|_| {
                    self.error_too_large(token.data, token.range);
                    0
                });
                self.expr(
                    ExprKind::Constant(Constant::Long {
                        value: value as i64,
                        unsigned: true,
                    }),
                    token.range,
                )
            }
            TokenKind::FloatLit => {
                self.consume();
                let value = token.data.parse::<f32>().unwrap_or_else(|_| {
                    self.error_too_large(token.data, token.range);
                    0.0
                });
                self.expr(ExprKind::Constant(Constant::Float(value)), token.range)
            }
            TokenKind::DoubleLit => {
                self.consume();
                let value = token.data.parse::<f64>().unwrap_or_else(|_| {
                    self.error_too_large(token.data, token.range);
                    0.0
                });
                self.expr(ExprKind::Constant(Constant::Double(value)), token.range)
            }
            TokenKind::StrLit => {
                self.consume();
                self.expr(ExprKind::Constant(Constant::Str(token.data)), token.range)
            }

            TokenKind::Minus => {
                self.consume();
                let inner = self.parse_value()?;
                let range = self.range_to_prev(token.range);
                self.expr(
                    ExprKind::Unary {
                        op: UnaryOp::Negate,
                        inner,
                    },
                    range,
                )
            }

            TokenKind::LeftParen => {
                self.consume();
                if self.is_variable_type() {
                    let ty = self.parse_variable_type();
                    self.try_consume(TokenKind::RightParen, "')'")?;
                    let inner = self.parse_value()?;
                    let range = self.range_to_prev(token.range);
                    self.expr(ExprKind::Cast { ty, inner }, range)
                } else {
                    let inner = self.parse_expression(0)?;
                    self.try_consume(TokenKind::RightParen, "')'")?;
                    let range = self.range_to_prev(token.range);
                    self.expr(ExprKind::Paren { inner }, range)
                }
            }

            TokenKind::SelfKw => {
                self.consume();
                self.expr(ExprKind::SelfRef, token.range)
            }

            TokenKind::Identifier => {
                self.consume();
                if self.matches(TokenKind::LeftParen) {
                    self.consume();
                    let args = self.parse_call_arguments()?;
                    self.try_consume(TokenKind::RightParen, "')'")?;
                    let range = self.range_to_prev(token.range);
                    self.expr(
                        ExprKind::Call {
                            name: token.data,
                            args: self.exprs(args),
                        },
                        range,
                    )
                } else {
                    self.expr(ExprKind::VarRef { name: token.data }, token.range)
                }
            }

            _ => {
                self.error_expected("a value");
                return None;
            }
        };

        // Postfix member access (foo.bar), method calls (foo.bar(..)) and
        // array access (foo[5]).
        while self.matches(TokenKind::Dot) || self.matches(TokenKind::LeftBracket) {
            let op = self.consume();

            if op.kind == TokenKind::Dot {
                let member = self.try_consume(TokenKind::Identifier, "identifier")?;

                if self.matches(TokenKind::LeftParen) {
                    self.consume();
                    let args = self.parse_call_arguments()?;
                    self.try_consume(TokenKind::RightParen, "')'")?;
                    let range = self.range_to_prev(value.range);
                    value = self.expr(
                        ExprKind::MethodCall {
                            parent: value,
                            name: member.data,
                            args: self.exprs(args),
                        },
                        range,
                    );
                } else {
                    let range = self.range_to_prev(value.range);
                    value = self.expr(
                        ExprKind::Member {
                            parent: value,
                            name: member.data,
                        },
                        range,
                    );
                }
            } else {
                let index = self.parse_expression(0)?;
                self.try_consume(TokenKind::RightBracket, "']'")?;
                let range = self.range_to_prev(value.range);
                value = self.expr(
                    ExprKind::ArrayAccess {
                        parent: value,
                        index,
                    },
                    range,
                );
            }
        }

        Some(value)
    }

    // === Statements ===

    fn parse_compound(&mut self) -> Option<&'a Stmt<'a>> {
        let open = self.try_consume(TokenKind::LeftCurly, "'{'")?;

        let mut nodes = Vec::new();
        loop {
            match self.peek(0) {
                None => {
                    self.error_expected("'}'");
                    return None;
                }
                Some(t) if t.kind == TokenKind::RightCurly => break,
                Some(_) => match self.parse_token() {
                    Some(node) => nodes.push(node),
                    None => self.synchronize(),
                },
            }
        }

        self.try_consume(TokenKind::RightCurly, "'}'")?;
        let range = self.range_to_prev(open.range);
        Some(self.stmt(
            StmtKind::Compound {
                nodes: self.arena.alloc_slice_copy(&nodes),
            },
            range,
        ))
    }

    /// A braced compound body, or a single statement wrapped in a synthetic
    /// compound.
    fn parse_compound_inline(&mut self) -> Option<&'a Stmt<'a>> {
        if self.matches(TokenKind::LeftCurly) {
            return self.parse_compound();
        }

        let token = self.peek(0).copied();
        let Some(token) = token else {
            self.error_expected("a statement");
            return None;
        };
        let start = token.range;
        let node = self.parse_token()?;
        let range = self.range_to_prev(start);
        Some(self.stmt(
            StmtKind::Compound {
                nodes: self.arena.alloc_slice_copy(&[node]),
            },
            range,
        ))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<&'a Stmt<'a>>> {
        let mut params = Vec::new();
        loop {
            match self.peek(0) {
                None => {
                    self.error_expected("')'");
                    return None;
                }
                Some(t) if t.kind == TokenKind::RightParen => break,
                Some(_) => {
                    let ty = self.parse_variable_type();
                    let ident = self.try_consume(TokenKind::Identifier, "identifier")?;

                    params.push(self.stmt(
                        StmtKind::ParamDecl {
                            name: ident.data,
                            ty,
                        },
                        ident.range,
                    ));

                    if self.matches(TokenKind::Comma) {
                        self.consume();
                    }
                }
            }
        }
        Some(params)
    }

    /// A type form was recognized: this is either a variable or a function
    /// declaration, depending on what follows the identifier.
    fn parse_type_led(&mut self, is_extern: bool) -> Option<&'a Stmt<'a>> {
        let start = self.peek(0).map(|t| t.range);
        let Some(start) = start else {
            self.error_expected("a type");
            return None;
        };
        let ty = self.parse_variable_type();

        if self.peek(1).map(|t| t.kind) == Some(TokenKind::LeftParen) {
            self.parse_function_decl(ty, start, is_extern)
        } else {
            self.parse_variable_decl(ty, start)
        }
    }

    fn parse_variable_decl(
        &mut self,
        ty: TypeName<'a>,
        start: SourceRange,
    ) -> Option<&'a Stmt<'a>> {
        let ident = self.try_consume(TokenKind::Identifier, "identifier")?;

        let init = if self.matches(TokenKind::Eq) {
            self.consume();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        let range = self.range_to_prev(start);
        Some(self.stmt(
            StmtKind::VarDecl {
                name: ident.data,
                ty,
                init,
            },
            range,
        ))
    }

    fn parse_function_decl(
        &mut self,
        return_ty: TypeName<'a>,
        start: SourceRange,
        is_extern: bool,
    ) -> Option<&'a Stmt<'a>> {
        let ident = self.try_consume(TokenKind::Identifier, "identifier")?;
        self.try_consume(TokenKind::LeftParen, "'('")?;
        let params = self.parse_function_parameters()?;
        self.try_consume(TokenKind::RightParen, "')'")?;

        let body = if self.matches(TokenKind::LeftCurly) {
            let body = self.parse_compound()?;
            self.needs_semi = false;
            Some(body)
        } else {
            None
        };

        let range = self.range_to_prev(start);
        Some(self.stmt(
            StmtKind::FunctionDecl {
                name: ident.data,
                params: self.stmts(params),
                return_ty,
                body,
                is_extern,
            },
            range,
        ))
    }

    fn parse_extern(&mut self) -> Option<&'a Stmt<'a>> {
        self.consume();
        self.parse_type_led(true)
    }

    fn parse_struct_decl(&mut self) -> Option<&'a Stmt<'a>> {
        let start = self.consume().range;
        let ident = self.try_consume(TokenKind::Identifier, "identifier")?;

        self.try_consume(TokenKind::LeftCurly, "'{'")?;

        let mut fields = Vec::new();
        loop {
            match self.peek(0) {
                None => {
                    self.error_expected("'}'");
                    return None;
                }
                Some(t) if t.kind == TokenKind::RightCurly => break,
                Some(_) => {
                    if !self.is_variable_type() {
                        self.error_expected("a field or method declaration");
                        return None;
                    }

                    let ty = self.parse_variable_type();
                    let name = self.try_consume(TokenKind::Identifier, "identifier")?;

                    if self.matches(TokenKind::LeftParen) {
                        // Method: parameter list plus a braced body, no `;`.
                        self.consume();
                        let params = self.parse_function_parameters()?;
                        self.try_consume(TokenKind::RightParen, "')'")?;
                        let body = self.parse_compound()?;

                        fields.push(self.stmt(
                            StmtKind::MethodDecl {
                                name: name.data,
                                params: self.stmts(params),
                                return_ty: ty,
                                body,
                            },
                            name.range,
                        ));
                    } else {
                        self.try_consume(TokenKind::Semi, "';'")?;
                        fields.push(self.stmt(
                            StmtKind::FieldDecl {
                                name: name.data,
                                ty,
                            },
                            name.range,
                        ));
                    }
                }
            }
        }

        self.try_consume(TokenKind::RightCurly, "'}'")?;
        self.needs_semi = false;

        let range = self.range_to_prev(start);
        Some(self.stmt(
            StmtKind::StructDecl {
                name: ident.data,
                fields: self.stmts(fields),
            },
            range,
        ))
    }

    fn parse_while(&mut self) -> Option<&'a Stmt<'a>> {
        let start = self.consume().range;

        self.try_consume(TokenKind::LeftParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.try_consume(TokenKind::RightParen, "')'")?;
        let body = self.parse_compound_inline()?;

        self.needs_semi = false;
        let range = self.range_to_prev(start);
        Some(self.stmt(StmtKind::While { cond, body }, range))
    }

    fn parse_do_while(&mut self) -> Option<&'a Stmt<'a>> {
        let start = self.consume().range;

        let body = self.parse_compound_inline()?;
        self.try_consume(TokenKind::While, "while")?;
        self.try_consume(TokenKind::LeftParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.try_consume(TokenKind::RightParen, "')'")?;

        self.needs_semi = false;
        let range = self.range_to_prev(start);
        Some(self.stmt(StmtKind::DoWhile { body, cond }, range))
    }

    fn parse_for(&mut self) -> Option<&'a Stmt<'a>> {
        let start = self.consume().range;

        self.try_consume(TokenKind::LeftParen, "'('")?;
        let prologue = if self.is_statement_start() {
            self.parse_statement()?
        } else {
            // Expression prologue (`for (i = 0; ...`), wrapped in a
            // synthetic compound so the emitter sees one statement shape.
            let expr_start = self.peek(0)?.range;
            let expr = self.parse_expression(0)?;
            let range = self.range_to_prev(expr_start);
            self.stmt(
                StmtKind::Compound {
                    nodes: self.arena.alloc_slice_copy(&[Node::Expr(expr)]),
                },
                range,
            )
        };
        self.try_consume(TokenKind::Semi, "';'")?;
        let cond = self.parse_expression(0)?;
        self.try_consume(TokenKind::Semi, "';'")?;
        let epilogue = self.parse_expression(0)?;
        self.try_consume(TokenKind::RightParen, "')'")?;
        let body = self.parse_compound_inline()?;

        self.needs_semi = false;
        let range = self.range_to_prev(start);
        Some(self.stmt(
            StmtKind::For {
                prologue,
                cond,
                epilogue,
                body,
            },
            range,
        ))
    }

    fn parse_if(&mut self) -> Option<&'a Stmt<'a>> {
        let start = self.consume().range;

        self.try_consume(TokenKind::LeftParen, "'('")?;
        let cond = self.parse_expression(0)?;
        self.try_consume(TokenKind::RightParen, "')'")?;
        let body = self.parse_compound_inline()?;

        let else_body = if self.matches(TokenKind::Else) {
            self.consume();
            Some(self.parse_compound_inline()?)
        } else {
            None
        };

        self.needs_semi = false;
        let range = self.range_to_prev(start);
        Some(self.stmt(
            StmtKind::If {
                cond,
                body,
                else_body,
            },
            range,
        ))
    }

    fn parse_return(&mut self) -> Option<&'a Stmt<'a>> {
        let start = self.consume().range;
        let value = self.parse_expression(0)?;
        let range = self.range_to_prev(start);
        Some(self.stmt(StmtKind::Return { value }, range))
    }

    /// Parse a statement if one starts here; `None` with `valid` untouched
    /// means the caller should try an expression statement.
    fn parse_statement(&mut self) -> Option<&'a Stmt<'a>> {
        let kind = self.peek(0)?.kind;

        if self.is_variable_type() {
            return self.parse_type_led(false);
        }

        match kind {
            TokenKind::Extern => self.parse_extern(),
            TokenKind::Struct => self.parse_struct_decl(),
            TokenKind::LeftCurly => {
                let compound = self.parse_compound()?;
                self.needs_semi = false;
                Some(compound)
            }
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::If => self.parse_if(),
            TokenKind::Break => {
                let token = self.consume();
                Some(self.stmt(StmtKind::Break, token.range))
            }
            TokenKind::Continue => {
                let token = self.consume();
                Some(self.stmt(StmtKind::Continue, token.range))
            }
            TokenKind::Return => self.parse_return(),
            _ => None,
        }
    }

    fn is_statement_start(&self) -> bool {
        if self.is_variable_type() {
            return true;
        }
        matches!(
            self.peek(0).map(|t| t.kind),
            Some(
                TokenKind::Extern
                    | TokenKind::Struct
                    | TokenKind::LeftCurly
                    | TokenKind::While
                    | TokenKind::Do
                    | TokenKind::For
                    | TokenKind::If
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::Return
            )
        )
    }

    fn parse_token(&mut self) -> Option<Node<'a>> {
        let node = if self.is_statement_start() {
            Node::Stmt(self.parse_statement()?)
        } else {
            Node::Expr(self.parse_expression(0)?)
        };

        if self.needs_semi {
            self.try_consume(TokenKind::Semi, "';'")?;
        }
        self.needs_semi = true;

        Some(node)
    }
}
