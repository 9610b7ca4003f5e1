use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::{check, conversion_cost, ConversionKind, TypeManager, VarType};
use crate::analyzer::typed_ast::{TypedExprKind, TypedNode, TypedProgram, TypedStmtKind};
use crate::diagnostics::Diagnostics;
use crate::lexer::Lexer;
use crate::parser;

fn check_source<'a>(arena: &'a Bump, source: &'a str) -> (TypedProgram<'a>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::lex(source, &mut diagnostics);
    let ast = parser::parse(arena, &tokens, &mut diagnostics);
    assert!(ast.is_valid(), "parse failed: {:?}", diagnostics.iter().collect::<Vec<_>>());

    let types = TypeManager::new(arena);
    let typed = check(arena, types, &ast, &mut diagnostics);
    (typed, diagnostics)
}

fn check_ok<'a>(arena: &'a Bump, source: &'a str) -> TypedProgram<'a> {
    let (typed, diagnostics) = check_source(arena, source);
    assert!(
        !diagnostics.has_errors(),
        "unexpected type errors: {:?}",
        diagnostics.iter().collect::<Vec<_>>()
    );
    typed
}

fn check_err(source: &str, expected_fragment: &str) {
    let arena = Bump::new();
    let source = arena.alloc_str(source);
    let (_, diagnostics) = check_source(&arena, source);
    assert!(
        diagnostics.iter().any(|d| d.message.contains(expected_fragment)),
        "expected a diagnostic containing {expected_fragment:?}, got {:?}",
        diagnostics.iter().collect::<Vec<_>>()
    );
}

// === Conversion cost model ===

#[test]
fn test_identical_types_need_no_cast() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);

    let cost = conversion_cost(types.int(), types.int());
    assert!(!cost.cast_needed);
    assert_eq!(cost.kind, ConversionKind::None);
}

#[test]
fn test_integral_widening_is_implicit_promotion() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);

    let cost = conversion_cost(types.long(), types.int());
    assert!(cost.cast_needed);
    assert!(cost.implicit_possible);
    assert_eq!(cost.kind, ConversionKind::Promotion);

    let cost = conversion_cost(types.short(), types.long());
    assert_eq!(cost.kind, ConversionKind::Narrowing);
    assert!(cost.implicit_possible);
}

#[test]
fn test_sign_mismatch_disables_implicit() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);

    let cost = conversion_cost(types.uint(), types.int());
    assert!(cost.cast_needed);
    assert!(cost.signed_mismatch);
    assert!(!cost.implicit_possible);
    assert!(cost.explicit_possible);
}

#[test]
fn test_integral_to_floating_is_explicit_only() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);

    let cost = conversion_cost(types.float(), types.int());
    assert!(!cost.implicit_possible);
    assert!(cost.explicit_possible);

    let cost = conversion_cost(types.int(), types.double());
    assert!(!cost.implicit_possible);
    assert!(cost.explicit_possible);
}

#[test]
fn test_string_does_not_convert() {
    let arena = Bump::new();
    let types = TypeManager::new(&arena);

    let cost = conversion_cost(types.int(), types.string());
    assert!(!cost.implicit_possible);
    assert!(!cost.explicit_possible);
}

// === Implicit cast insertion ===

#[test]
fn test_initializer_gets_widening_cast() {
    let arena = Bump::new();
    let typed = check_ok(&arena, "long l = 5;");

    let TypedNode::Stmt(stmt) = typed.nodes[0] else {
        panic!("expected statement");
    };
    let TypedStmtKind::VarDecl { init: Some(init), .. } = &stmt.kind else {
        panic!("expected initializer");
    };
    let TypedExprKind::Cast { from, .. } = &init.kind else {
        panic!("expected implicit cast, got {:?}", init.kind);
    };
    assert!(matches!(init.ty, VarType::Long { signed: true }));
    assert!(matches!(from, VarType::Int { signed: true }));
}

#[test]
fn test_binary_operands_reconcile_to_wider_type() {
    let arena = Bump::new();
    let typed = check_ok(&arena, "long l = 2l; long r = l + 5;");

    let TypedNode::Stmt(stmt) = typed.nodes[1] else {
        panic!("expected statement");
    };
    let TypedStmtKind::VarDecl { init: Some(init), .. } = &stmt.kind else {
        panic!("expected initializer");
    };
    let TypedExprKind::Binary { rhs, operand_ty, .. } = &init.kind else {
        panic!("expected binary expression");
    };
    // The int literal widens to long and the operation runs at long width.
    assert!(matches!(rhs.kind, TypedExprKind::Cast { .. }));
    assert!(matches!(operand_ty, VarType::Long { signed: true }));
}

#[test]
fn test_comparison_yields_bool_with_operand_type() {
    let arena = Bump::new();
    let typed = check_ok(&arena, "bool b = 2 < 3;");

    let TypedNode::Stmt(stmt) = typed.nodes[0] else {
        panic!("expected statement");
    };
    let TypedStmtKind::VarDecl { init: Some(init), .. } = &stmt.kind else {
        panic!("expected initializer");
    };
    let TypedExprKind::Binary { operand_ty, .. } = &init.kind else {
        panic!("expected binary expression");
    };
    assert!(matches!(init.ty, VarType::Bool));
    assert!(matches!(operand_ty, VarType::Int { signed: true }));
}

#[test]
fn test_call_argument_promotion() {
    let arena = Bump::new();
    let typed = check_ok(
        &arena,
        "long Take(long v) { return v; } long main() { return Take(3); }",
    );

    let TypedNode::Stmt(stmt) = typed.nodes[1] else {
        panic!("expected statement");
    };
    let TypedStmtKind::Function { body: Some(body), .. } = &stmt.kind else {
        panic!("expected function body");
    };
    let TypedStmtKind::Compound { nodes } = &body.kind else {
        panic!("expected compound");
    };
    let TypedNode::Stmt(ret) = nodes[0] else {
        panic!("expected return");
    };
    let TypedStmtKind::Return { value } = &ret.kind else {
        panic!("expected return");
    };
    let TypedExprKind::Call { args, .. } = &value.kind else {
        panic!("expected call");
    };
    assert!(matches!(args[0].kind, TypedExprKind::Cast { .. }));
}

// === Errors ===

#[test]
fn test_sign_mismatch_assignment_is_an_error() {
    check_err("uint u = 5;", "Cannot implicitly cast");
}

#[test]
fn test_float_initializer_for_int_is_an_error() {
    check_err("int i = 1.0;", "Cannot implicitly cast");
}

#[test]
fn test_explicit_cast_allows_sign_change() {
    let arena = Bump::new();
    check_ok(&arena, "uint u = (uint) 5;");
}

#[test]
fn test_undeclared_identifier() {
    check_err("x = 5;", "Undeclared identifier x");
}

#[test]
fn test_redeclaration_in_same_scope() {
    check_err("int x; int x;", "Redeclaring identifier x");
}

#[test]
fn test_shadowing_in_inner_scope_is_allowed() {
    let arena = Bump::new();
    check_ok(&arena, "int x = 1; { int x = 2; }");
}

#[test]
fn test_assignment_to_non_lvalue() {
    check_err("5 = 3;", "modifiable lvalue");
}

#[test]
fn test_compound_assignment_to_non_lvalue() {
    check_err("int f() { return 1; } int main() { f() += 1; return 0; }", "modifiable lvalue");
}

#[test]
fn test_return_outside_function() {
    check_err("return 5;", "non-function scope");
}

#[test]
fn test_call_arity_mismatch() {
    check_err(
        "int f(int a) { return a; } int main() { return f(1, 2); }",
        "No matching function",
    );
}

#[test]
fn test_defining_extern_function() {
    check_err(
        "extern int f(int a); int f(int a) { return a; }",
        "Defining function marked extern",
    );
}

#[test]
fn test_unknown_type_name() {
    check_err("Widget w;", "Undeclared identifier Widget");
}

#[test]
fn test_break_outside_loop() {
    check_err("break;", "break outside of a loop");
}

#[test]
fn test_continue_outside_loop() {
    check_err("continue;", "continue outside of a loop");
}

#[test]
fn test_condition_must_be_bool() {
    check_err("int x = 1; while (x) { }", "Condition must be a bool");
}

#[test]
fn test_self_outside_method() {
    check_err("int x = self;", "only valid inside a method");
}

// === Structs ===

#[test]
fn test_struct_layout_running_sum_offsets() {
    let arena = Bump::new();
    let typed = check_ok(&arena, "struct M { int a; long b; char c; }");

    let TypedNode::Stmt(stmt) = typed.nodes[0] else {
        panic!("expected statement");
    };
    let TypedStmtKind::Struct { layout, .. } = &stmt.kind else {
        panic!("expected struct");
    };

    assert_eq!(layout.size, 13);
    assert_eq!(layout.fields.len(), 3);
    assert_eq!(layout.fields[0].offset, 0);
    assert_eq!(layout.fields[1].offset, 4);
    assert_eq!(layout.fields[2].offset, 12);
}

#[test]
fn test_method_lowered_with_self_parameter() {
    let arena = Bump::new();
    let typed = check_ok(
        &arena,
        "struct P { int x; int y; int Sum() { return self.x + self.y; } }",
    );

    let TypedNode::Stmt(stmt) = typed.nodes[0] else {
        panic!("expected statement");
    };
    let TypedStmtKind::Struct { methods, .. } = &stmt.kind else {
        panic!("expected struct");
    };
    let TypedStmtKind::Function { name, params, .. } = &methods[0].kind else {
        panic!("expected lowered method");
    };
    assert_eq!(*name, "P__Sum");
    assert_eq!(params.len(), 1);
    assert!(matches!(
        params[0].kind,
        TypedStmtKind::ParamDecl { name: "self", .. }
    ));
}

#[test]
fn test_method_call_lowers_to_call_with_receiver() {
    let arena = Bump::new();
    let typed = check_ok(
        &arena,
        "struct P { int x; int Get() { return self.x; } } \
         int main() { P p; p.x = 1; return p.Get(); }",
    );

    let TypedNode::Stmt(stmt) = typed.nodes[1] else {
        panic!("expected statement");
    };
    let TypedStmtKind::Function { body: Some(body), .. } = &stmt.kind else {
        panic!("expected main body");
    };
    let TypedStmtKind::Compound { nodes } = &body.kind else {
        panic!("expected compound");
    };
    let TypedNode::Stmt(ret) = nodes[2] else {
        panic!("expected return");
    };
    let TypedStmtKind::Return { value } = &ret.kind else {
        panic!("expected return");
    };
    let TypedExprKind::Call { name, args, .. } = &value.kind else {
        panic!("expected lowered call, got {:?}", value.kind);
    };
    assert_eq!(*name, "P__Get");
    assert_eq!(args.len(), 1);
    assert!(matches!(args[0].kind, TypedExprKind::VarRef { name: "p" }));
}

#[test]
fn test_member_offsets_resolved() {
    let arena = Bump::new();
    let typed = check_ok(
        &arena,
        "struct P { int x; int y; } int main() { P p; return p.y; }",
    );

    let TypedNode::Stmt(stmt) = typed.nodes[1] else {
        panic!("expected statement");
    };
    let TypedStmtKind::Function { body: Some(body), .. } = &stmt.kind else {
        panic!("expected main body");
    };
    let TypedStmtKind::Compound { nodes } = &body.kind else {
        panic!("expected compound");
    };
    let TypedNode::Stmt(ret) = nodes[1] else {
        panic!("expected return");
    };
    let TypedStmtKind::Return { value } = &ret.kind else {
        panic!("expected return");
    };
    let TypedExprKind::Member { offset, .. } = &value.kind else {
        panic!("expected member access");
    };
    assert_eq!(*offset, 4);
}

#[test]
fn test_unknown_member() {
    check_err(
        "struct P { int x; } int main() { P p; return p.z; }",
        "Unknown field z",
    );
}
