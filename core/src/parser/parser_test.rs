use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::{parse, Ast, BinaryOp, Constant, ExprKind, Node, StmtKind, UnaryOp};
use crate::diagnostics::Diagnostics;
use crate::lexer::Lexer;

fn parse_source<'a>(arena: &'a Bump, source: &'a str) -> Ast<'a> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex(source, &mut diagnostics);
    let ast = parse(arena, &tokens, &mut diagnostics);
    assert!(
        ast.is_valid() && !diagnostics.has_errors(),
        "unexpected parse failure: {:?}",
        diagnostics.iter().collect::<Vec<_>>()
    );
    ast
}

fn parse_invalid<'a>(arena: &'a Bump, source: &'a str) -> Ast<'a> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex(source, &mut diagnostics);
    let ast = parse(arena, &tokens, &mut diagnostics);
    assert!(!ast.is_valid(), "expected a parse failure");
    assert!(diagnostics.has_errors());
    ast
}

#[test]
fn test_precedence_mul_binds_tighter_than_add() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "2 + 3 * 4;");

    // Expect Add(2, Mul(3, 4)).
    let Node::Expr(expr) = ast.nodes[0] else {
        panic!("expected expression node");
    };
    let ExprKind::Binary { op, lhs, rhs } = &expr.kind else {
        panic!("expected binary node");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        lhs.kind,
        ExprKind::Constant(Constant::Int { value: 2, .. })
    ));
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_left_associativity() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "1 - 2 - 3;");

    // Expect Sub(Sub(1, 2), 3).
    let Node::Expr(expr) = ast.nodes[0] else {
        panic!("expected expression node");
    };
    let ExprKind::Binary { op, lhs, .. } = &expr.kind else {
        panic!("expected binary node");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(
        lhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Sub,
            ..
        }
    ));
}

#[test]
fn test_assignment_precedence_is_loosest() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "x = 1 + 2;");

    let Node::Expr(expr) = ast.nodes[0] else {
        panic!("expected expression node");
    };
    let ExprKind::Binary { op, lhs, rhs } = &expr.kind else {
        panic!("expected binary node");
    };
    assert_eq!(*op, BinaryOp::Assign);
    assert!(matches!(lhs.kind, ExprKind::VarRef { name: "x" }));
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn test_unary_minus() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "int b = -3;");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement node");
    };
    let StmtKind::VarDecl { init: Some(init), .. } = &stmt.kind else {
        panic!("expected var decl with initializer");
    };
    assert!(matches!(
        init.kind,
        ExprKind::Unary {
            op: UnaryOp::Negate,
            ..
        }
    ));
}

#[test]
fn test_paren_vs_cast_disambiguation() {
    let arena = Bump::new();

    let ast = parse_source(&arena, "int a = (1 - 4);");
    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::VarDecl { init: Some(init), .. } = &stmt.kind else {
        panic!("expected init");
    };
    assert!(matches!(init.kind, ExprKind::Paren { .. }));

    let ast = parse_source(&arena, "float f = (float) 1;");
    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::VarDecl { init: Some(init), .. } = &stmt.kind else {
        panic!("expected init");
    };
    let ExprKind::Cast { ty, .. } = &init.kind else {
        panic!("expected cast, got {:?}", init.kind);
    };
    assert_eq!(ty.name, "float");
}

#[test]
fn test_function_declaration() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "int add(int x, int y) { return x + y; }");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::FunctionDecl {
        name,
        params,
        return_ty,
        body,
        is_extern,
    } = &stmt.kind
    else {
        panic!("expected function declaration");
    };
    assert_eq!(*name, "add");
    assert_eq!(params.len(), 2);
    assert_eq!(return_ty.name, "int");
    assert!(body.is_some());
    assert!(!is_extern);
}

#[test]
fn test_extern_function_declaration() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "extern int Add(int a, int b);");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::FunctionDecl {
        body, is_extern, ..
    } = &stmt.kind
    else {
        panic!("expected function declaration");
    };
    assert!(body.is_none());
    assert!(is_extern);
}

#[test]
fn test_struct_with_fields_and_method() {
    let arena = Bump::new();
    let ast = parse_source(
        &arena,
        "struct P { int x; int y; int Sum() { return self.x + self.y; } }",
    );

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::StructDecl { name, fields } = &stmt.kind else {
        panic!("expected struct declaration");
    };
    assert_eq!(*name, "P");
    assert_eq!(fields.len(), 3);
    assert!(matches!(fields[0].kind, StmtKind::FieldDecl { name: "x", .. }));
    assert!(matches!(fields[1].kind, StmtKind::FieldDecl { name: "y", .. }));
    assert!(matches!(fields[2].kind, StmtKind::MethodDecl { name: "Sum", .. }));
}

#[test]
fn test_single_statement_body_wrapped_in_compound() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "while (x < 10) x += 1;");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::While { body, .. } = &stmt.kind else {
        panic!("expected while");
    };
    let StmtKind::Compound { nodes } = &body.kind else {
        panic!("expected synthetic compound body");
    };
    assert_eq!(nodes.len(), 1);
}

#[test]
fn test_if_else() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "if (x == 4) { return true; } else { return false; }");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::If { else_body, .. } = &stmt.kind else {
        panic!("expected if");
    };
    assert!(else_body.is_some());
}

#[test]
fn test_for_loop() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "for (int i = 0; i < 5; i += 1) { x += i; }");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::For { prologue, .. } = &stmt.kind else {
        panic!("expected for");
    };
    assert!(matches!(prologue.kind, StmtKind::VarDecl { name: "i", .. }));
}

#[test]
fn test_do_while() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "do { x += 1; } while (x < 3)");
    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    assert!(matches!(stmt.kind, StmtKind::DoWhile { .. }));
}

#[test]
fn test_break_and_continue() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "while (true) { break; continue; }");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::While { body, .. } = &stmt.kind else {
        panic!("expected while");
    };
    let StmtKind::Compound { nodes } = &body.kind else {
        panic!("expected compound");
    };
    assert!(matches!(nodes[0], Node::Stmt(s) if s.kind == StmtKind::Break));
    assert!(matches!(nodes[1], Node::Stmt(s) if s.kind == StmtKind::Continue));
}

#[test]
fn test_method_call_and_member_chains() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "p.pos.Length(2);");

    let Node::Expr(expr) = ast.nodes[0] else {
        panic!("expected expression");
    };
    let ExprKind::MethodCall { parent, name, args } = &expr.kind else {
        panic!("expected method call");
    };
    assert_eq!(*name, "Length");
    assert_eq!(args.len(), 1);
    assert!(matches!(parent.kind, ExprKind::Member { name: "pos", .. }));
}

#[test]
fn test_array_access_postfix() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "values[i + 1];");

    let Node::Expr(expr) = ast.nodes[0] else {
        panic!("expected expression");
    };
    assert!(matches!(expr.kind, ExprKind::ArrayAccess { .. }));
}

#[test]
fn test_array_type_declaration() {
    let arena = Bump::new();
    let ast = parse_source(&arena, "int[] xs;");

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    let StmtKind::VarDecl { ty, .. } = &stmt.kind else {
        panic!("expected var decl");
    };
    assert!(ty.array);
    assert_eq!(ty.name, "int");
}

#[test]
fn test_missing_semicolon_sets_error_flag() {
    let arena = Bump::new();
    parse_invalid(&arena, "int x = 1");
}

#[test]
fn test_error_recovery_gathers_multiple_errors() {
    let arena = Bump::new();
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex("int = 1; int y 2;", &mut diagnostics);
    let ast = parse(&arena, &tokens, &mut diagnostics);

    assert!(!ast.is_valid());
    assert!(diagnostics.len() >= 2, "expected both errors to be reported");
}

#[test]
fn test_node_ranges_cover_source_text() {
    let arena = Bump::new();
    let source = "int a = 2 + 3;";
    let ast = parse_source(&arena, source);

    let Node::Stmt(stmt) = ast.nodes[0] else {
        panic!("expected statement");
    };
    assert_eq!(stmt.range.text(source), "int a = 2 + 3");
}
