//! Diagnostic AST renderer: one node per line, children indented.

use core::fmt::Write;

use crate::parser::ast::{Ast, Constant, Expr, ExprKind, Node, Stmt, StmtKind, TypeName};

pub fn dump_ast(ast: &Ast<'_>) -> String {
    let mut out = String::new();
    for node in &ast.nodes {
        dump_node(&mut out, *node, 0);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn type_name(ty: &TypeName<'_>) -> String {
    if ty.array {
        format!("{}[]", ty.name)
    } else {
        ty.name.to_string()
    }
}

fn dump_node(out: &mut String, node: Node<'_>, depth: usize) {
    match node {
        Node::Stmt(stmt) => dump_stmt(out, stmt, depth),
        Node::Expr(expr) => dump_expr(out, expr, depth),
    }
}

fn dump_stmt(out: &mut String, stmt: &Stmt<'_>, depth: usize) {
    indent(out, depth);
    match &stmt.kind {
        StmtKind::Compound { nodes } => {
            out.push_str("compound\n");
            for node in *nodes {
                dump_node(out, *node, depth + 1);
            }
        }
        StmtKind::VarDecl { name, ty, init } => {
            let _ = writeln!(out, "var-decl {} : {}", name, type_name(ty));
            if let Some(init) = init {
                dump_expr(out, init, depth + 1);
            }
        }
        StmtKind::ParamDecl { name, ty } => {
            let _ = writeln!(out, "param-decl {} : {}", name, type_name(ty));
        }
        StmtKind::FunctionDecl {
            name,
            params,
            return_ty,
            body,
            is_extern,
        } => {
            let qualifier = if *is_extern { "extern " } else { "" };
            let _ = writeln!(out, "{}function {} -> {}", qualifier, name, type_name(return_ty));
            for param in *params {
                dump_stmt(out, param, depth + 1);
            }
            if let Some(body) = body {
                dump_stmt(out, body, depth + 1);
            }
        }
        StmtKind::StructDecl { name, fields } => {
            let _ = writeln!(out, "struct {}", name);
            for field in *fields {
                dump_stmt(out, field, depth + 1);
            }
        }
        StmtKind::FieldDecl { name, ty } => {
            let _ = writeln!(out, "field {} : {}", name, type_name(ty));
        }
        StmtKind::MethodDecl {
            name,
            params,
            return_ty,
            body,
        } => {
            let _ = writeln!(out, "method {} -> {}", name, type_name(return_ty));
            for param in *params {
                dump_stmt(out, param, depth + 1);
            }
            dump_stmt(out, body, depth + 1);
        }
        StmtKind::While { cond, body } => {
            out.push_str("while\n");
            dump_expr(out, cond, depth + 1);
            dump_stmt(out, body, depth + 1);
        }
        StmtKind::DoWhile { body, cond } => {
            out.push_str("do-while\n");
            dump_stmt(out, body, depth + 1);
            dump_expr(out, cond, depth + 1);
        }
        StmtKind::For {
            prologue,
            cond,
            epilogue,
            body,
        } => {
            out.push_str("for\n");
            dump_stmt(out, prologue, depth + 1);
            dump_expr(out, cond, depth + 1);
            dump_expr(out, epilogue, depth + 1);
            dump_stmt(out, body, depth + 1);
        }
        StmtKind::If {
            cond,
            body,
            else_body,
        } => {
            out.push_str("if\n");
            dump_expr(out, cond, depth + 1);
            dump_stmt(out, body, depth + 1);
            if let Some(else_body) = else_body {
                indent(out, depth);
                out.push_str("else\n");
                dump_stmt(out, else_body, depth + 1);
            }
        }
        StmtKind::Return { value } => {
            out.push_str("return\n");
            dump_expr(out, value, depth + 1);
        }
        StmtKind::Break => out.push_str("break\n"),
        StmtKind::Continue => out.push_str("continue\n"),
    }
}

fn dump_expr(out: &mut String, expr: &Expr<'_>, depth: usize) {
    indent(out, depth);
    match &expr.kind {
        ExprKind::Constant(constant) => {
            let _ = match constant {
                Constant::Bool(v) => writeln!(out, "constant bool {}", v),
                Constant::Char(v) => writeln!(out, "constant char '{}'", *v as u8 as char),
                Constant::Int { value, unsigned } if *unsigned => {
                    writeln!(out, "constant uint {}", *value as u32)
                }
                Constant::Int { value, .. } => writeln!(out, "constant int {}", value),
                Constant::Long { value, unsigned } if *unsigned => {
                    writeln!(out, "constant ulong {}", *value as u64)
                }
                Constant::Long { value, .. } => writeln!(out, "constant long {}", value),
                Constant::Float(v) => writeln!(out, "constant float {}", v),
                Constant::Double(v) => writeln!(out, "constant double {}", v),
                Constant::Str(v) => writeln!(out, "constant string \"{}\"", v),
            };
        }
        ExprKind::VarRef { name } => {
            let _ = writeln!(out, "var-ref {}", name);
        }
        ExprKind::ArrayAccess { parent, index } => {
            out.push_str("array-access\n");
            dump_expr(out, parent, depth + 1);
            dump_expr(out, index, depth + 1);
        }
        ExprKind::SelfRef => out.push_str("self\n"),
        ExprKind::Member { parent, name } => {
            let _ = writeln!(out, "member {}", name);
            dump_expr(out, parent, depth + 1);
        }
        ExprKind::MethodCall { parent, name, args } => {
            let _ = writeln!(out, "method-call {}", name);
            dump_expr(out, parent, depth + 1);
            for arg in *args {
                dump_expr(out, arg, depth + 1);
            }
        }
        ExprKind::Call { name, args } => {
            let _ = writeln!(out, "call {}", name);
            for arg in *args {
                dump_expr(out, arg, depth + 1);
            }
        }
        ExprKind::Paren { inner } => {
            out.push_str("paren\n");
            dump_expr(out, inner, depth + 1);
        }
        ExprKind::Cast { ty, inner } => {
            let _ = writeln!(out, "cast {}", type_name(ty));
            dump_expr(out, inner, depth + 1);
        }
        ExprKind::Unary { op, inner } => {
            let _ = writeln!(out, "unary {}", op.as_str());
            dump_expr(out, inner, depth + 1);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let _ = writeln!(out, "binary {}", op.as_str());
            dump_expr(out, lhs, depth + 1);
            dump_expr(out, rhs, depth + 1);
        }
    }
}
