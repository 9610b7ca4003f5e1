use bumpalo::Bump;
use hashbrown::HashMap;

use crate::analyzer::typed_ast::{
    TypedExpr, TypedExprKind, TypedNode, TypedProgram, TypedStmt, TypedStmtKind,
};
use crate::analyzer::types::{StructField, StructLayout, TypeManager, VarType};
use crate::diagnostics::Diagnostics;
use crate::parser::{
    Ast, BinaryOp, Constant, Expr, ExprKind, Node, Stmt, StmtKind, TypeName, UnaryOp,
};
use crate::scope_stack::ScopeStack;
use crate::source::SourceRange;

/// How two types relate for the purpose of converting one to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    None,
    Promotion,
    Narrowing,
}

/// The cost of converting a source type into a destination type, as used to
/// choose between a no-op, an implicit cast, and requiring an explicit cast.
#[derive(Debug, Clone, Copy)]
pub struct ConversionCost {
    pub kind: ConversionKind,
    pub cast_needed: bool,
    pub signed_mismatch: bool,
    pub implicit_possible: bool,
    pub explicit_possible: bool,
}

/// Compute how expensive it is to convert `src` into `dst`, as in
/// `dst_ty var = src_expr;`.
pub fn conversion_cost(dst: &VarType<'_>, src: &VarType<'_>) -> ConversionCost {
    let mut cost = ConversionCost {
        kind: ConversionKind::None,
        cast_needed: true,
        signed_mismatch: false,
        implicit_possible: true,
        explicit_possible: true,
    };

    if dst.is_signed() != src.is_signed() {
        cost.signed_mismatch = true;
        cost.implicit_possible = false;
    }

    if dst.same_kind(src) {
        cost.cast_needed = cost.signed_mismatch;
        return cost;
    }

    // Destination wider than source is a promotion.
    let width = |dst_wider: bool| {
        if dst_wider {
            ConversionKind::Promotion
        } else {
            ConversionKind::Narrowing
        }
    };

    if dst.is_integral() {
        if src.is_integral() {
            cost.kind = width(dst.size() > src.size());
        } else if src.is_floating() {
            cost.implicit_possible = false;
            cost.kind = width(dst.size() > src.size());
        } else {
            cost.implicit_possible = false;
            cost.explicit_possible = false;
        }
    } else if dst.is_floating() {
        if src.is_floating() {
            cost.kind = width(dst.size() > src.size());
        } else if src.is_integral() {
            cost.implicit_possible = false;
            cost.kind = width(dst.size() > src.size());
        } else {
            cost.implicit_possible = false;
            cost.explicit_possible = false;
        }
    } else {
        // void, string, array, struct: nothing converts across kinds.
        cost.implicit_possible = false;
        cost.explicit_possible = false;
    }

    cost
}

/// Run the type checker over a parsed AST, producing the typed tree.
///
/// The parsed AST is read-only; every reported problem lands in
/// `diagnostics` and the caller must not emit when any were reported.
pub fn check<'a>(
    arena: &'a Bump,
    types: &'a TypeManager<'a>,
    ast: &Ast<'a>,
    diagnostics: &mut Diagnostics,
) -> TypedProgram<'a> {
    let mut checker = Checker {
        arena,
        types,
        diagnostics,
        scopes: ScopeStack::new(),
        functions: HashMap::new(),
        structs: HashMap::new(),
        return_types: Vec::new(),
        loop_depth: 0,
    };

    // Pre-register top-level function signatures so call sites may precede
    // definitions. Extern redefinition is detected here, where declarations
    // are seen in source order.
    for node in &ast.nodes {
        if let Node::Stmt(stmt) = node
            && let StmtKind::FunctionDecl {
                name,
                params,
                return_ty,
                body,
                is_extern,
            } = &stmt.kind
        {
            let already_extern = checker
                .functions
                .get(name)
                .map(|existing| existing.is_extern)
                .unwrap_or(false);
            if already_extern && body.is_some() {
                checker.error(
                    stmt.range,
                    format!("Defining function marked extern: {}", name),
                );
            }
            checker.register_function_signature(name, params, return_ty, *is_extern);
        }
    }

    let nodes = ast
        .nodes
        .iter()
        .map(|node| checker.check_node(*node))
        .collect();

    tracing::debug!("type check finished");
    TypedProgram { nodes }
}

#[derive(Clone, Copy)]
struct VarSymbol<'a> {
    ty: &'a VarType<'a>,
}

#[derive(Clone, Copy)]
struct FuncSig<'a> {
    params: &'a [&'a VarType<'a>],
    return_ty: &'a VarType<'a>,
    is_extern: bool,
}

struct Checker<'a, 'd> {
    arena: &'a Bump,
    types: &'a TypeManager<'a>,
    diagnostics: &'d mut Diagnostics,
    scopes: ScopeStack<'a, VarSymbol<'a>>,
    functions: HashMap<&'a str, FuncSig<'a>>,
    structs: HashMap<&'a str, &'a VarType<'a>>,
    /// Expected return type per enclosing function scope; empty at top level.
    return_types: Vec<&'a VarType<'a>>,
    loop_depth: usize,
}

impl<'a, 'd> Checker<'a, 'd> {
    fn error(&mut self, range: SourceRange, message: impl Into<String>) {
        self.diagnostics.report(range.start, message);
    }

    fn expr(
        &self,
        ty: &'a VarType<'a>,
        kind: TypedExprKind<'a>,
        range: SourceRange,
    ) -> &'a TypedExpr<'a> {
        self.arena.alloc(TypedExpr { ty, kind, range })
    }

    fn stmt(&self, kind: TypedStmtKind<'a>, range: SourceRange) -> &'a TypedStmt<'a> {
        self.arena.alloc(TypedStmt { kind, range })
    }

    // === Types ===

    /// Resolve a type form without reporting unknown names; used by the
    /// signature pre-registration pass, which may run before a struct is
    /// declared.
    fn resolve_type_quiet(&self, name: &TypeName<'a>) -> &'a VarType<'a> {
        let base = self
            .types
            .primitive(name.name)
            .or_else(|| self.structs.get(name.name).copied())
            .unwrap_or(self.types.void());
        if name.array && !matches!(base, VarType::Void) {
            self.types.array(base)
        } else {
            base
        }
    }

    fn register_function_signature(
        &mut self,
        name: &'a str,
        params: &'a [&'a Stmt<'a>],
        return_ty: &TypeName<'a>,
        is_extern: bool,
    ) {
        let return_ty = self.resolve_type_quiet(return_ty);
        let mut param_types = Vec::new();
        for param in params {
            if let StmtKind::ParamDecl { ty, .. } = &param.kind {
                param_types.push(self.resolve_type_quiet(ty));
            }
        }
        self.functions.insert(
            name,
            FuncSig {
                params: self.arena.alloc_slice_copy(&param_types),
                return_ty,
                is_extern,
            },
        );
    }

    fn resolve_type_name(&mut self, name: &TypeName<'a>) -> &'a VarType<'a> {
        let base = match self.types.primitive(name.name) {
            Some(ty) => ty,
            None => match self.structs.get(name.name) {
                Some(ty) => *ty,
                None => {
                    self.error(
                        name.range,
                        format!("Undeclared identifier {}", name.name),
                    );
                    self.types.void()
                }
            },
        };

        if name.array {
            if matches!(base, VarType::Void) {
                self.error(name.range, "Array element type cannot be void");
                return self.types.void();
            }
            self.types.array(base)
        } else {
            base
        }
    }

    // === Conversions ===

    /// Reconcile `expr` to `dst`, inserting an implicit cast node when one is
    /// needed and legal.
    fn reconcile(
        &mut self,
        dst: &'a VarType<'a>,
        expr: &'a TypedExpr<'a>,
    ) -> &'a TypedExpr<'a> {
        let cost = conversion_cost(dst, expr.ty);
        if !cost.cast_needed {
            return expr;
        }

        if cost.implicit_possible {
            self.insert_implicit_cast(dst, expr)
        } else {
            self.error(
                expr.range,
                format!("Cannot implicitly cast from {} to {}", expr.ty, dst),
            );
            expr
        }
    }

    fn insert_implicit_cast(
        &mut self,
        dst: &'a VarType<'a>,
        expr: &'a TypedExpr<'a>,
    ) -> &'a TypedExpr<'a> {
        // Idempotence: a cast node that already produces the target type is
        // left alone.
        if let TypedExprKind::Cast { .. } = expr.kind
            && core::ptr::eq(expr.ty, dst)
        {
            return expr;
        }

        self.expr(
            dst,
            TypedExprKind::Cast {
                from: expr.ty,
                inner: expr,
            },
            expr.range,
        )
    }

    // === Expressions ===

    fn is_lvalue(expr: &Expr<'a>) -> bool {
        matches!(
            expr.kind,
            ExprKind::VarRef { .. } | ExprKind::Member { .. } | ExprKind::ArrayAccess { .. }
        )
    }

    fn check_expr(&mut self, expr: &'a Expr<'a>) -> &'a TypedExpr<'a> {
        let range = expr.range;

        match &expr.kind {
            ExprKind::Constant(constant) => {
                let ty = match constant {
                    Constant::Bool(_) => self.types.bool(),
                    Constant::Char(_) => self.types.char(),
                    Constant::Int { unsigned: false, .. } => self.types.int(),
                    Constant::Int { unsigned: true, .. } => self.types.uint(),
                    Constant::Long { unsigned: false, .. } => self.types.long(),
                    Constant::Long { unsigned: true, .. } => self.types.ulong(),
                    Constant::Float(_) => self.types.float(),
                    Constant::Double(_) => self.types.double(),
                    Constant::Str(_) => self.types.string(),
                };
                self.expr(ty, TypedExprKind::Constant(*constant), range)
            }

            ExprKind::VarRef { name } => {
                let name = *name;
                let ty = match self.scopes.lookup(name) {
                    Some(symbol) => symbol.ty,
                    None => {
                        self.error(range, format!("Undeclared identifier {}", name));
                        self.types.void()
                    }
                };
                self.expr(ty, TypedExprKind::VarRef { name }, range)
            }

            ExprKind::SelfRef => {
                let ty = match self.scopes.lookup("self") {
                    Some(symbol) => symbol.ty,
                    None => {
                        self.error(range, "self is only valid inside a method");
                        self.types.void()
                    }
                };
                self.expr(ty, TypedExprKind::VarRef { name: "self" }, range)
            }

            ExprKind::ArrayAccess { parent, index } => {
                let parent = self.check_expr(parent);
                let element = match parent.ty {
                    VarType::Array { element } => *element,
                    other => {
                        self.error(range, format!("Cannot index a value of type {}", other));
                        self.types.void()
                    }
                };

                let index = self.check_expr(index);
                let index = self.reconcile(self.types.int(), index);

                self.expr(element, TypedExprKind::ArrayAccess { parent, index }, range)
            }

            ExprKind::Member { parent, name } => {
                let name = *name;
                let parent = self.check_expr(parent);
                let (ty, offset) = match parent.ty {
                    VarType::Struct { layout } => match layout.field(name) {
                        Some(field) => (field.ty, field.offset),
                        None => {
                            self.error(
                                range,
                                format!("Unknown field {} in struct {}", name, layout.name),
                            );
                            (self.types.void(), 0)
                        }
                    },
                    other => {
                        self.error(
                            range,
                            format!("Member access on non-struct type {}", other),
                        );
                        (self.types.void(), 0)
                    }
                };

                self.expr(ty, TypedExprKind::Member { parent, name, offset }, range)
            }

            ExprKind::MethodCall { parent, name, args } => {
                let parent = self.check_expr(parent);
                let layout = match parent.ty {
                    VarType::Struct { layout } => Some(*layout),
                    other => {
                        self.error(
                            range,
                            format!("Method call on non-struct type {}", other),
                        );
                        None
                    }
                };

                let Some(layout) = layout else {
                    return self.expr(
                        self.types.void(),
                        TypedExprKind::Paren { inner: parent },
                        range,
                    );
                };

                let mangled: &'a str = self
                    .arena
                    .alloc_str(&format!("{}__{}", layout.name, name));

                let sig = self.functions.get(mangled).copied();
                let Some(sig) = sig else {
                    self.error(range, format!("No matching function to call: {}", name));
                    return self.expr(
                        self.types.void(),
                        TypedExprKind::Paren { inner: parent },
                        range,
                    );
                };

                // The receiver occupies the first parameter slot.
                if sig.params.len() != args.len() + 1 {
                    self.error(range, format!("No matching function to call: {}", name));
                }

                let mut call_args = vec![parent];
                for (i, arg) in args.iter().enumerate() {
                    let arg = self.check_expr(arg);
                    match sig.params.get(i + 1) {
                        Some(param_ty) => call_args.push(self.reconcile_argument(param_ty, arg)),
                        None => call_args.push(arg),
                    }
                }

                self.expr(
                    sig.return_ty,
                    TypedExprKind::Call {
                        name: mangled,
                        args: self.arena.alloc_slice_copy(&call_args),
                        is_extern: false,
                    },
                    range,
                )
            }

            ExprKind::Call { name, args } => {
                let name = *name;
                let sig = self.functions.get(name).copied();
                let Some(sig) = sig else {
                    self.error(range, format!("Undeclared identifier {}", name));
                    let args: Vec<_> = args.iter().map(|a| self.check_expr(a)).collect();
                    return self.expr(
                        self.types.void(),
                        TypedExprKind::Call {
                            name,
                            args: self.arena.alloc_slice_copy(&args),
                            is_extern: false,
                        },
                        range,
                    );
                };

                if sig.params.len() != args.len() {
                    self.error(range, format!("No matching function to call: {}", name));
                }

                let mut call_args = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let arg = self.check_expr(arg);
                    match sig.params.get(i) {
                        Some(param_ty) => call_args.push(self.reconcile_argument(param_ty, arg)),
                        None => call_args.push(arg),
                    }
                }

                self.expr(
                    sig.return_ty,
                    TypedExprKind::Call {
                        name,
                        args: self.arena.alloc_slice_copy(&call_args),
                        is_extern: sig.is_extern,
                    },
                    range,
                )
            }

            ExprKind::Paren { inner } => {
                let inner = self.check_expr(inner);
                self.expr(inner.ty, TypedExprKind::Paren { inner }, range)
            }

            ExprKind::Cast { ty, inner } => {
                let inner = self.check_expr(inner);
                let dst = self.resolve_type_name(ty);

                let cost = conversion_cost(dst, inner.ty);
                if !cost.explicit_possible {
                    self.error(
                        range,
                        format!("Cannot cast from {} to {}", inner.ty, dst),
                    );
                }

                self.expr(
                    dst,
                    TypedExprKind::Cast {
                        from: inner.ty,
                        inner,
                    },
                    range,
                )
            }

            ExprKind::Unary { op, inner } => {
                let inner = self.check_expr(inner);
                match op {
                    UnaryOp::Negate => {
                        if !inner.ty.is_integral() && !inner.ty.is_floating() {
                            self.error(
                                range,
                                format!("Cannot negate a value of type {}", inner.ty),
                            );
                        }
                    }
                    UnaryOp::Not => {
                        if !matches!(inner.ty, VarType::Bool) {
                            self.error(
                                range,
                                format!("Cannot apply ! to a value of type {}", inner.ty),
                            );
                        }
                    }
                }
                self.expr(inner.ty, TypedExprKind::Unary { op: *op, inner }, range)
            }

            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, range),
        }
    }

    fn reconcile_argument(
        &mut self,
        param_ty: &'a VarType<'a>,
        arg: &'a TypedExpr<'a>,
    ) -> &'a TypedExpr<'a> {
        let cost = conversion_cost(param_ty, arg.ty);
        if !cost.cast_needed {
            return arg;
        }
        if cost.implicit_possible {
            return self.insert_implicit_cast(param_ty, arg);
        }
        self.error(
            arg.range,
            format!(
                "Mismatched function argument types, parameter type is {}, while argument type is {}",
                param_ty, arg.ty
            ),
        );
        arg
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
        range: SourceRange,
    ) -> &'a TypedExpr<'a> {
        let typed_lhs = self.check_expr(lhs);
        let typed_rhs = self.check_expr(rhs);

        // Assignments and in-place operators write through the left side:
        // the left must be a modifiable lvalue and the right side converts
        // to its type.
        if op == BinaryOp::Assign || op.is_in_place() {
            if !Self::is_lvalue(lhs) {
                self.error(lhs.range, "Expression must be a modifiable lvalue");
            }

            let lhs_ty = typed_lhs.ty;
            let cost = conversion_cost(lhs_ty, typed_rhs.ty);
            let typed_rhs = if !cost.cast_needed {
                typed_rhs
            } else if cost.implicit_possible {
                self.insert_implicit_cast(lhs_ty, typed_rhs)
            } else {
                self.error(
                    range,
                    format!("Mismatched types, have {} and {}", lhs_ty, typed_rhs.ty),
                );
                typed_rhs
            };

            if op != BinaryOp::Assign
                && !lhs_ty.is_integral()
                && !lhs_ty.is_floating()
            {
                self.error(
                    range,
                    format!("Invalid operands of type {} to operator {}", lhs_ty, op.as_str()),
                );
            }

            return self.expr(
                lhs_ty,
                TypedExprKind::Binary {
                    op,
                    lhs: typed_lhs,
                    rhs: typed_rhs,
                    operand_ty: lhs_ty,
                },
                range,
            );
        }

        // Everything else reconciles the narrower operand to the wider type.
        let cost = conversion_cost(typed_lhs.ty, typed_rhs.ty);
        let (typed_lhs, typed_rhs, common) = if !cost.cast_needed {
            (typed_lhs, typed_rhs, typed_lhs.ty)
        } else if cost.implicit_possible {
            if typed_lhs.ty.size() > typed_rhs.ty.size() {
                let rhs = self.insert_implicit_cast(typed_lhs.ty, typed_rhs);
                (typed_lhs, rhs, typed_lhs.ty)
            } else {
                let lhs = self.insert_implicit_cast(typed_rhs.ty, typed_lhs);
                (lhs, typed_rhs, typed_rhs.ty)
            }
        } else {
            self.error(
                range,
                format!(
                    "Mismatched types, have {} and {}",
                    typed_lhs.ty, typed_rhs.ty
                ),
            );
            (typed_lhs, typed_rhs, typed_lhs.ty)
        };

        if !common.is_integral() && !common.is_floating() {
            self.error(
                range,
                format!("Invalid operands of type {} to operator {}", common, op.as_str()),
            );
        }

        let result_ty = if op.is_comparison() {
            self.types.bool()
        } else {
            common
        };

        self.expr(
            result_ty,
            TypedExprKind::Binary {
                op,
                lhs: typed_lhs,
                rhs: typed_rhs,
                operand_ty: common,
            },
            range,
        )
    }

    // === Statements ===

    fn check_node(&mut self, node: Node<'a>) -> TypedNode<'a> {
        match node {
            Node::Stmt(stmt) => TypedNode::Stmt(self.check_stmt(stmt)),
            Node::Expr(expr) => TypedNode::Expr(self.check_expr(expr)),
        }
    }

    /// Check a compound's children in the current scope and build the typed
    /// compound node. Callers decide whether a fresh scope wraps it.
    fn check_compound_children(&mut self, stmt: &'a Stmt<'a>) -> &'a TypedStmt<'a> {
        let StmtKind::Compound { nodes } = &stmt.kind else {
            // The parser always hands compounds here.
            return self.check_stmt(stmt);
        };

        let typed: Vec<_> = nodes.iter().map(|node| self.check_node(*node)).collect();
        self.stmt(
            TypedStmtKind::Compound {
                nodes: self.arena.alloc_slice_fill_iter(typed),
            },
            stmt.range,
        )
    }

    fn check_scoped_compound(&mut self, stmt: &'a Stmt<'a>) -> &'a TypedStmt<'a> {
        self.scopes.push();
        let compound = self.check_compound_children(stmt);
        let _ = self.scopes.pop();
        compound
    }

    fn declare_var(&mut self, name: &'a str, ty: &'a VarType<'a>, range: SourceRange) {
        if self.scopes.bind(name, VarSymbol { ty }).is_err() {
            self.error(range, format!("Redeclaring identifier {}", name));
        }
    }

    fn check_stmt(&mut self, stmt: &'a Stmt<'a>) -> &'a TypedStmt<'a> {
        let range = stmt.range;

        match &stmt.kind {
            StmtKind::Compound { .. } => self.check_scoped_compound(stmt),

            StmtKind::VarDecl { name, ty, init } => {
                let name = *name;
                let ty = self.resolve_type_name(ty);
                if matches!(ty, VarType::Void) {
                    self.error(range, format!("Cannot declare {} with type void", name));
                }

                self.declare_var(name, ty, range);

                let init = init.map(|init| {
                    let init = self.check_expr(init);
                    self.reconcile(ty, init)
                });

                self.stmt(TypedStmtKind::VarDecl { name, ty, init }, range)
            }

            StmtKind::ParamDecl { name, ty } => {
                let name = *name;
                let ty = self.resolve_type_name(ty);
                self.declare_var(name, ty, range);
                self.stmt(TypedStmtKind::ParamDecl { name, ty }, range)
            }

            StmtKind::FunctionDecl {
                name,
                params,
                return_ty,
                body,
                is_extern,
            } => self.check_function(name, params, return_ty, *body, *is_extern, None, range),

            StmtKind::StructDecl { name, fields } => self.check_struct(name, fields, range),

            StmtKind::While { cond, body } => {
                let cond = self.check_condition(cond);
                self.loop_depth += 1;
                let body = self.check_scoped_compound(body);
                self.loop_depth -= 1;
                self.stmt(TypedStmtKind::While { cond, body }, range)
            }

            StmtKind::DoWhile { body, cond } => {
                self.loop_depth += 1;
                let body = self.check_scoped_compound(body);
                self.loop_depth -= 1;
                let cond = self.check_condition(cond);
                self.stmt(TypedStmtKind::DoWhile { body, cond }, range)
            }

            StmtKind::For {
                prologue,
                cond,
                epilogue,
                body,
            } => {
                self.scopes.push();
                let prologue = self.check_stmt(prologue);
                let cond = self.check_condition(cond);
                let epilogue = self.check_expr(epilogue);
                self.loop_depth += 1;
                let body = self.check_scoped_compound(body);
                self.loop_depth -= 1;
                let _ = self.scopes.pop();

                self.stmt(
                    TypedStmtKind::For {
                        prologue,
                        cond,
                        epilogue,
                        body,
                    },
                    range,
                )
            }

            StmtKind::If {
                cond,
                body,
                else_body,
            } => {
                let cond = self.check_condition(cond);
                let body = self.check_scoped_compound(body);
                let else_body = else_body.map(|e| self.check_scoped_compound(e));
                self.stmt(
                    TypedStmtKind::If {
                        cond,
                        body,
                        else_body,
                    },
                    range,
                )
            }

            StmtKind::Return { value } => {
                let expected = self.return_types.last().copied();
                let value = self.check_expr(value);

                let value = match expected {
                    Some(expected) => self.reconcile(expected, value),
                    None => {
                        self.error(range, "Cannot return from a non-function scope");
                        value
                    }
                };

                self.stmt(TypedStmtKind::Return { value }, range)
            }

            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(range, "break outside of a loop");
                }
                self.stmt(TypedStmtKind::Break, range)
            }

            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(range, "continue outside of a loop");
                }
                self.stmt(TypedStmtKind::Continue, range)
            }

            StmtKind::FieldDecl { .. } | StmtKind::MethodDecl { .. } => {
                // Only reachable through a malformed tree; struct members are
                // handled by check_struct.
                self.error(range, "Declaration is only valid inside a struct");
                self.stmt(TypedStmtKind::Break, range)
            }
        }
    }

    fn check_condition(&mut self, cond: &'a Expr<'a>) -> &'a TypedExpr<'a> {
        let cond = self.check_expr(cond);
        if !matches!(cond.ty, VarType::Bool) {
            self.error(
                cond.range,
                format!("Condition must be a bool, have {}", cond.ty),
            );
        }
        cond
    }

    /// Check a function or method declaration. For methods, `self_ty` is the
    /// receiver struct type, inserted as an implicit first parameter named
    /// `self`.
    #[allow(clippy::too_many_arguments)]
    fn check_function(
        &mut self,
        name: &'a str,
        params: &'a [&'a Stmt<'a>],
        return_ty: &TypeName<'a>,
        body: Option<&'a Stmt<'a>>,
        is_extern: bool,
        self_ty: Option<&'a VarType<'a>>,
        range: SourceRange,
    ) -> &'a TypedStmt<'a> {
        let return_ty = self.resolve_type_name(return_ty);

        let mut param_types = Vec::new();
        if let Some(self_ty) = self_ty {
            param_types.push(self_ty);
        }
        for param in params {
            if let StmtKind::ParamDecl { ty, .. } = &param.kind {
                let ty = self.resolve_type_name(ty);
                param_types.push(ty);
            }
        }

        self.functions.insert(
            name,
            FuncSig {
                params: self.arena.alloc_slice_copy(&param_types),
                return_ty,
                is_extern,
            },
        );

        let mut typed_params = Vec::new();
        let body = body.map(|body| {
            self.scopes.push();
            self.return_types.push(return_ty);

            if let Some(self_ty) = self_ty {
                self.declare_var("self", self_ty, range);
                typed_params.push(self.stmt(
                    TypedStmtKind::ParamDecl {
                        name: "self",
                        ty: self_ty,
                    },
                    range,
                ));
            }
            for param in params {
                typed_params.push(self.check_stmt(param));
            }

            // Parameters and body share the function scope.
            let body = self.check_compound_children(body);

            self.return_types.pop();
            let _ = self.scopes.pop();
            body
        });

        if body.is_none() {
            // Extern and forward declarations still carry typed parameters.
            for param in params {
                if let StmtKind::ParamDecl { name, ty } = &param.kind {
                    let ty = self.resolve_type_name(ty);
                    typed_params.push(self.stmt(
                        TypedStmtKind::ParamDecl { name: *name, ty },
                        param.range,
                    ));
                }
            }
        }

        self.stmt(
            TypedStmtKind::Function {
                name,
                params: self.arena.alloc_slice_copy(&typed_params),
                return_ty,
                body,
                is_extern,
            },
            range,
        )
    }

    fn check_struct(
        &mut self,
        name: &'a str,
        fields: &'a [&'a Stmt<'a>],
        range: SourceRange,
    ) -> &'a TypedStmt<'a> {
        if self.structs.contains_key(name) {
            self.error(range, format!("Redeclaring identifier {}", name));
        }

        // Field layout first: offsets are running sums, no padding.
        let mut layout_fields = Vec::new();
        let mut size = 0usize;
        for field in fields {
            if let StmtKind::FieldDecl { name, ty } = &field.kind {
                let ty = self.resolve_type_name(ty);
                layout_fields.push(StructField {
                    name: *name,
                    offset: size,
                    ty,
                });
                size += ty.size();
            }
        }

        let layout: &'a StructLayout<'a> = self.arena.alloc(StructLayout {
            name,
            fields: self.arena.alloc_slice_fill_iter(layout_fields),
            size,
        });
        let struct_ty = self.types.strukt(layout);
        self.structs.insert(name, struct_ty);

        // Register every method signature before checking any body so
        // methods can call each other regardless of declaration order.
        for field in fields {
            if let StmtKind::MethodDecl {
                name: method_name,
                params,
                return_ty,
                ..
            } = &field.kind
            {
                let mangled: &'a str = self
                    .arena
                    .alloc_str(&format!("{}__{}", name, method_name));
                let return_ty = self.resolve_type_name(return_ty);

                let mut param_types = vec![struct_ty];
                for param in *params {
                    if let StmtKind::ParamDecl { ty, .. } = &param.kind {
                        param_types.push(self.resolve_type_name(ty));
                    }
                }

                self.functions.insert(
                    mangled,
                    FuncSig {
                        params: self.arena.alloc_slice_copy(&param_types),
                        return_ty,
                        is_extern: false,
                    },
                );
            }
        }

        // Methods compile as global functions named Struct__Method with the
        // receiver as an implicit first parameter.
        let mut methods = Vec::new();
        for field in fields {
            if let StmtKind::MethodDecl {
                name: method_name,
                params,
                return_ty,
                body,
            } = &field.kind
            {
                let mangled: &'a str = self
                    .arena
                    .alloc_str(&format!("{}__{}", name, method_name));
                methods.push(self.check_function(
                    mangled,
                    params,
                    return_ty,
                    Some(*body),
                    false,
                    Some(struct_ty),
                    field.range,
                ));
            }
        }

        self.stmt(
            TypedStmtKind::Struct {
                layout,
                methods: self.arena.alloc_slice_copy(&methods),
            },
            range,
        )
    }
}
