//! Scénarios de bout en bout : source → compilation → exécution.

use gnbs_core::value::Value;
use gnbs_vm::{InterpretError, RuntimeError, Vm};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn run_ok(src: &str) -> String {
    let (mut vm, out) = Vm::with_captured_output();
    if let Err(e) = vm.interpret(src) {
        panic!("échec inattendu pour {src:?} :\n{e}");
    }
    out.get()
}

fn runtime_error(src: &str) -> RuntimeError {
    let (mut vm, _) = Vm::with_captured_output();
    match vm.interpret(src) {
        Err(InterpretError::Runtime(e)) => e,
        other => panic!("erreur d'exécution attendue pour {src:?}, obtenu {other:?}"),
    }
}

#[test]
fn globals_add_up() {
    assert_eq!(run_ok("var a = 1; var b = 2; print a + b;"), "3\n");
}

#[test]
fn string_concatenation_is_interned() {
    let (mut vm, _) = Vm::with_captured_output();
    vm.interpret("\"foo\" + \"bar\";").unwrap();
    assert!(vm.heap().lookup("foobar").is_some());

    vm.interpret("var s = \"foo\" + \"bar\";").unwrap();
    assert_eq!(vm.global("s"), vm.heap().lookup("foobar").map(Value::Str));
}

#[test]
fn mixed_number_types_fail_at_runtime() {
    let (mut vm, _) = Vm::with_captured_output();
    // la compilation passe : seule l'exécution échoue
    assert!(vm.compile("1 + 1.0;").is_ok());
    let err = vm.interpret("1 + 1.0;").unwrap_err();
    assert_eq!(err.exit_code(), 70);
    assert_eq!(err.to_string(), "operands must have the same type\n[line 1:5] in script");
}

#[test]
fn for_loop_counts() {
    assert_eq!(run_ok("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
}

#[test]
fn undefined_global_read() {
    let err = runtime_error("print undeclared;");
    assert_eq!(err.kind.to_string(), "undefined variable 'undeclared'");
}

#[test]
fn compile_errors_do_not_run() {
    let (mut vm, out) = Vm::with_captured_output();
    let err = vm.interpret("print 1; print ;").unwrap_err();
    assert_eq!(err.exit_code(), 65);
    assert_eq!(err.to_string(), "[line 1:16] Error at ';': Expect expression.");
    assert_eq!(out.get(), "");
}

#[test]
fn deep_nesting_is_a_compile_error() {
    let (mut vm, out) = Vm::with_captured_output();
    let src = format!("print {}1{};", "(".repeat(200_000), ")".repeat(200_000));
    let err = vm.interpret(&src).unwrap_err();
    assert_eq!(err.exit_code(), 65);
    assert!(err.to_string().ends_with("Too much nesting."));
    assert_eq!(out.get(), "");

    // la VM reste utilisable
    vm.interpret("print (((1)));").unwrap();
    assert_eq!(out.get(), "1\n");
}

#[test]
fn loops_run_the_expected_number_of_times() {
    let src = "
        var total = 0;
        var i = 0;
        while (i < 100) {
            total = total + i;
            i = i + 1;
        }
        for (var j = 0; j < 10; j = j + 1) total = total + 1;
        print total;
    ";
    assert_eq!(run_ok(src), "4960\n");
}

#[test]
fn if_else_and_short_circuit() {
    let src = "
        if (1 > 2) print \"no\"; else print \"yes\";
        if (null) print \"no\";
        print false and undefined_is_never_read;
        print true or undefined_is_never_read;
        print null or \"fallback\";
        print 1 and 2;
    ";
    assert_eq!(run_ok(src), "yes\nfalse\ntrue\nfallback\n2\n");
}

#[test]
fn locals_shadow_and_assign() {
    let src = "
        var a = \"global\";
        {
            var a = \"outer\";
            {
                var a = \"inner\";
                print a;
            }
            a = a + \"!\";
            print a;
        }
        print a;
    ";
    assert_eq!(run_ok(src), "inner\nouter!\nglobal\n");
}

#[test]
fn functions_and_recursion() {
    let src = "
        function fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(15);
        function noop() {}
        print noop();
        print fib;
        {
            function twice(x) { return x * 2; }
            print twice(3);
        }
    ";
    assert_eq!(run_ok(src), "610\nnull\n<fn fib>\n6\n");
}

#[test]
fn arity_is_enforced() {
    let decl = "function add(a, b) { return a + b; }";
    assert_eq!(run_ok(&format!("{decl} print add(1, 2);")), "3\n");
    for call in ["add(1);", "add(1, 2, 3);"] {
        let err = runtime_error(&format!("{decl} {call}"));
        let got = if call == "add(1);" { 1 } else { 3 };
        assert_eq!(err.kind.to_string(), format!("expected 2 arguments but got {got}"));
    }
}

#[test]
fn runtime_trace_lists_frames_innermost_first() {
    let src = "function inner() {\n  return 1 + null;\n}\nfunction outer() {\n  return inner();\n}\nouter();";
    let err = runtime_error(src);
    assert_eq!(
        err.to_string(),
        "operands must be numbers\n[line 2:14] in inner()\n[line 5:16] in outer()\n[line 7:7] in script"
    );
}

#[test]
fn numbers_print_in_display_form() {
    assert_eq!(run_ok("print 2.0; print 2.5; print 7 / 2; print -3; print 10.0 / 4.0;"), "2\n2.5\n3\n-3\n2.5\n");
}

proptest! {
    #[test]
    fn execution_is_deterministic(values in prop::collection::vec(-1000i64..1000, 1..20)) {
        let mut src = String::from("var acc = 0;\n");
        for (i, v) in values.iter().enumerate() {
            src.push_str(&format!("var v{i} = {v};\nacc = acc + v{i};\nprint acc;\n"));
        }
        src.push_str("for (var k = 0; k < 3; k = k + 1) print acc - k;\n");
        let first = run_ok(&src);
        let second = run_ok(&src);
        prop_assert_eq!(&first, &second);
        let last = first.lines().nth(values.len() - 1).map(str::to_owned);
        prop_assert_eq!(last, Some(values.iter().sum::<i64>().to_string()));
    }
}
