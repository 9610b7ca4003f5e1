//! End-to-end scenarios through the embedding surface: compile, run the
//! top-level code, then call functions and read globals by name.

use blacklua_core::api::Context;
use blacklua_core::vm::{RuntimeError, SlotIndex, Vm};

fn run(source: &str) -> Context {
    let mut ctx = Context::new();
    let program = ctx.compile_string(source).expect("compilation failed");
    ctx.run(&program, "runtime-test").expect("execution failed");
    ctx
}

#[test]
fn runtime_variable_declaration() {
    let mut ctx = run("bool f = false;\n\
                       bool t = true;\n\
                       int  i = 99;");

    ctx.push_global("f").unwrap();
    assert!(!ctx.get_bool(-1).unwrap());
    ctx.push_global("t").unwrap();
    assert!(ctx.get_bool(-1).unwrap());
    ctx.push_global("i").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 99);
}

#[test]
fn runtime_basic_expressions() {
    let mut ctx = run("int a = 2 + 3 * 4;\n\
                       int b = (1 - 4);\n\
                       int c = 20 / 2;");

    ctx.push_global("a").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 14);
    ctx.push_global("b").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), -3);
    ctx.push_global("c").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 10);
}

#[test]
fn runtime_functions() {
    let mut ctx = run("int add(int x, int y) { return x + y; }\n\
                       int main() { return add(10, 14); }");

    ctx.call("main", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 24);
}

#[test]
fn runtime_control_flow() {
    let mut ctx = run("int While() {\n\
                           int i = 0;\n\
                           while (i < 10) { i += 1; }\n\
                           return i - 1;\n\
                       }\n\
                       bool If() {\n\
                           int x = 3;\n\
                           if (x == 4) { return true; } else { return false; }\n\
                       }");

    ctx.call("While", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 9);
    ctx.pop(1).unwrap();

    ctx.call("If", "runtime-test").unwrap();
    assert!(!ctx.get_bool(-1).unwrap());
    ctx.pop(1).unwrap();
}

#[test]
fn runtime_extern_binding() {
    fn bl_add(vm: &mut Vm) -> Result<(), RuntimeError> {
        let lhs = vm.get_int(SlotIndex::from(-3))?;
        let rhs = vm.get_int(SlotIndex::from(-2))?;
        vm.store_int(SlotIndex::from(-1), lhs + rhs)
    }

    let mut ctx = Context::new();
    ctx.add_extern("Add", bl_add);

    let program = ctx
        .compile_string("extern int Add(int a, int b);\n\
                         int main() { return Add(7, 5); }")
        .unwrap();
    ctx.run(&program, "runtime-test").unwrap();

    ctx.call("main", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 12);
}

#[test]
fn runtime_struct_field_access() {
    let mut ctx = run("struct P { int x; int y; }\n\
                       int main() {\n\
                           P p;\n\
                           p.x = 3; p.y = 4;\n\
                           return p.x + p.y;\n\
                       }");

    ctx.call("main", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 7);
}

#[test]
fn runtime_method_call() {
    let mut ctx = run("struct P {\n\
                           int x;\n\
                           int y;\n\
                           int Sum() { return self.x + self.y; }\n\
                       }\n\
                       int main() {\n\
                           P p;\n\
                           p.x = 3; p.y = 4;\n\
                           return p.Sum();\n\
                       }");

    ctx.call("main", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 7);
}

#[test]
fn runtime_for_loop() {
    let mut ctx = run("int Sum() {\n\
                           int total = 0;\n\
                           for (int i = 0; i < 5; i += 1) { total += i; }\n\
                           return total;\n\
                       }");

    ctx.call("Sum", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 10);
}

#[test]
fn runtime_do_while() {
    let mut ctx = run("int Count() {\n\
                           int x = 0;\n\
                           do { x += 1; } while (x < 3)\n\
                           return x;\n\
                       }\n\
                       int RunsOnce() {\n\
                           int x = 9;\n\
                           do { x += 1; } while (false)\n\
                           return x;\n\
                       }");

    ctx.call("Count", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 3);
    ctx.pop(1).unwrap();

    ctx.call("RunsOnce", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 10);
}

#[test]
fn runtime_break_and_continue() {
    let mut ctx = run("int FirstPastFive() {\n\
                           int i = 0;\n\
                           while (i < 100) {\n\
                               if (i > 5) { break; }\n\
                               i += 1;\n\
                           }\n\
                           return i;\n\
                       }\n\
                       int CountOdd() {\n\
                           int i = 0;\n\
                           int n = 0;\n\
                           while (i < 10) {\n\
                               i += 1;\n\
                               if (i % 2 == 0) { continue; }\n\
                               n += 1;\n\
                           }\n\
                           return n;\n\
                       }");

    ctx.call("FirstPastFive", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 6);
    ctx.pop(1).unwrap();

    ctx.call("CountOdd", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 5);
}

#[test]
fn runtime_casts() {
    let mut ctx = run("double d = (double) 2;\n\
                       int i = (int) 3.9;\n\
                       float f = (float) 1;");

    ctx.push_global("d").unwrap();
    assert_eq!(ctx.get_double(-1).unwrap(), 2.0);
    ctx.push_global("i").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 3);
    ctx.push_global("f").unwrap();
    assert_eq!(ctx.get_float(-1).unwrap(), 1.0);
}

#[test]
fn runtime_numeric_types() {
    let mut ctx = run("long l = 5l + 2l;\n\
                       int m = -7 % 3;\n\
                       double h = 10.0 / 4.0;\n\
                       char c = 'A';");

    ctx.push_global("l").unwrap();
    assert_eq!(ctx.get_long(-1).unwrap(), 7);
    ctx.push_global("m").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), -1);
    ctx.push_global("h").unwrap();
    assert_eq!(ctx.get_double(-1).unwrap(), 2.5);
    ctx.push_global("c").unwrap();
    assert_eq!(ctx.get_char(-1).unwrap(), b'A' as i8);
}

#[test]
fn runtime_implicit_promotion_in_call() {
    let mut ctx = run("long Twice(long v) { return v + v; }\n\
                       long main() { return Twice(21); }");

    ctx.call("main", "runtime-test").unwrap();
    assert_eq!(ctx.get_long(-1).unwrap(), 42);
}

#[test]
fn runtime_nested_scopes_and_shadowing() {
    let mut ctx = run("int Value() {\n\
                           int x = 1;\n\
                           { int y = 10; x += y; }\n\
                           return x;\n\
                       }");

    ctx.call("Value", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 11);
}

#[test]
fn runtime_recursion() {
    let mut ctx = run("int Fib(int n) {\n\
                           if (n < 2) { return n; }\n\
                           return Fib(n - 1) + Fib(n - 2);\n\
                       }\n\
                       int main() { return Fib(10); }");

    ctx.call("main", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 55);
}

#[test]
fn runtime_stack_frames_balance() {
    let mut ctx = run("int i = 0;\n\
                       while (i < 3) { i += 1; }\n\
                       if (i == 3) { i += 10; }\n\
                       for (int j = 0; j < 2; j += 1) { i += j; }");

    assert_eq!(ctx.vm().frame_depth(), 0);
    ctx.push_global("i").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 14);
}

#[test]
fn runtime_determinism() {
    let source = "int a = 2 + 3 * 4; int main() { int i = 0; while (i < 5) { i += 1; } return i; }";

    let mut first = Context::new();
    let program_a = first.compile_string(source).unwrap();
    let mut second = Context::new();
    let program_b = second.compile_string(source).unwrap();

    // Emitter purity: byte-identical opcode streams.
    assert_eq!(first.disassemble(&program_a), second.disassemble(&program_b));

    first.run(&program_a, "m").unwrap();
    second.run(&program_b, "m").unwrap();

    first.call("main", "m").unwrap();
    second.call("main", "m").unwrap();
    assert_eq!(first.get_int(-1).unwrap(), second.get_int(-1).unwrap());
}

#[test]
fn runtime_array_builtins_through_host() {
    // The host builds an array, hands the script its handle through a
    // global, and the script reads elements through the index builtin.
    fn make_array(vm: &mut Vm) -> Result<(), RuntimeError> {
        let handle = vm.alloc_array(4, 3);

        // Fill with 5, 6, 7 through element references.
        for i in 0..3i32 {
            vm.push_bytes(8)?;
            vm.store_pointer(SlotIndex::from(-1), handle)?;
            vm.push_bytes(4)?;
            vm.store_int(SlotIndex::from(-1), i)?;
            vm.push_bytes(4)?;
            blacklua_core::stdlib::bl_array_index(vm)?;
            vm.store_int(SlotIndex::from(-1), 5 + i)?;
            vm.pop()?;
            vm.pop()?;
            vm.pop()?;
        }

        vm.store_pointer(SlotIndex::from(-1), handle)
    }

    let mut ctx = Context::new();
    ctx.add_extern("MakeArray", make_array);

    let program = ctx
        .compile_string("extern int[] MakeArray();\n\
                         int[] xs = MakeArray();\n\
                         int mid = xs[1];")
        .unwrap();
    ctx.run(&program, "runtime-test").unwrap();

    ctx.push_global("mid").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 6);
}

#[test]
fn runtime_array_element_is_writable_reference() {
    fn make_array(vm: &mut Vm) -> Result<(), RuntimeError> {
        let handle = vm.alloc_array(4, 2);
        vm.store_pointer(SlotIndex::from(-1), handle)
    }

    let mut ctx = Context::new();
    ctx.add_extern("MakeArray", make_array);

    let program = ctx
        .compile_string("extern int[] MakeArray();\n\
                         int[] xs = MakeArray();\n\
                         int Fill() {\n\
                             xs[0] = 8;\n\
                             return xs[0];\n\
                         }")
        .unwrap();
    ctx.run(&program, "runtime-test").unwrap();

    ctx.call("Fill", "runtime-test").unwrap();
    assert_eq!(ctx.get_int(-1).unwrap(), 8);
}
