//! Unit tests for CFG construction and class assembly.

use indoc::indoc;

use jay_cfg::{Op, dump_method};

use crate::test_utils::{assert_error, compile_err, compile_ok, error_line};

#[test]
fn arithmetic_lowers_to_three_address_code() {
    let class = compile_ok(indoc! {r#"
        class Main {
            void main() {
                print(1 + 2 * 3);
            }
        }
    "#});
    let method = class.method("main").unwrap();
    assert_eq!(
        dump_method(method, &class.vars),
        "void main():\n    t0 = 2 * 3\n    t1 = 1 + t0\n    call print(t1)\n"
    );
}

#[test]
fn methods_return_through_the_return_label() {
    let class = compile_ok(indoc! {r#"
        class Main {
            Int add(Int a, Int b) {
                return a + b;
            }
            void main() {
                println(add(2, 3));
            }
        }
    "#});
    let add = class.method("add").unwrap();
    assert_eq!(
        dump_method(add, &class.vars),
        "Int add(Int a, Int b):\n    t3 = a + b\n    t0 = t3\n    goto L0\nL0:\n"
    );
    let main = class.method("main").unwrap();
    assert_eq!(
        dump_method(main, &class.vars),
        "void main():\n    t4 = call add(2, 3)\n    call println(t4)\n"
    );
}

#[test]
fn while_loops_have_the_continue_condition_body_shape() {
    let class = compile_ok(indoc! {r#"
        class Main {
            void m(Int n) {
                while (n > 0) {
                    n = n - 1;
                }
            }
        }
    "#});
    let method = class.method("m").unwrap();
    assert_eq!(
        dump_method(method, &class.vars),
        concat!(
            "void m(Int n):\n",
            "L0:\n",
            "    t1 = n > 0\n",
            "    if t1 goto L1 else goto L2\n",
            "L1:\n",
            "    t2 = n - 1\n",
            "    n = t2\n",
            "    goto L0\n",
            "L2:\n",
        )
    );
}

#[test]
fn short_circuit_conditions_flatten_into_jumps() {
    let class = compile_ok(indoc! {r#"
        class Main {
            void m(Bool a, Bool b) {
                if (a && b)
                    print(1);
            }
        }
    "#});
    let method = class.method("m").unwrap();
    // Two conditional branches, no boolean temporaries.
    let branches = method
        .statements
        .iter()
        .filter(|s| s.op == Op::If)
        .count();
    assert_eq!(branches, 2);
    assert!(method.statements.iter().all(|s| s.op != Op::Assign));
}

#[test]
fn boolean_expressions_in_value_position_use_a_temporary() {
    let class = compile_ok(indoc! {r#"
        class Main {
            void m(Bool a, Bool b) {
                var c = a || b;
                print(c);
            }
        }
    "#});
    let method = class.method("m").unwrap();
    let assigns = method
        .statements
        .iter()
        .filter(|s| s.op == Op::Assign)
        .count();
    // true-arm assign, false-arm assign, and the declaration assign.
    assert_eq!(assigns, 3);
}

#[test]
fn switch_lowers_to_a_single_statement_with_distinct_targets() {
    let class = compile_ok(indoc! {r#"
        class Main {
            void m(Int x) {
                switch (x) {
                    case 1:
                        print(1);
                        break;
                    case 2:
                        print(2);
                        break;
                }
            }
        }
    "#});
    let method = class.method("m").unwrap();
    let switch = method
        .statements
        .iter()
        .find(|s| s.op == Op::Switch)
        .expect("switch statement");
    // Two cases plus the implicit default to the finish label.
    assert_eq!(switch.targets.len(), 3);
    assert!(switch.targets.iter().filter(|(v, _)| v.is_none()).count() == 1);
    // Every target label anchors a statement in the method.
    for (_, label) in &switch.targets {
        assert!(
            method.statements.iter().any(|s| s.label == Some(*label)),
            "dangling label {label:?}"
        );
    }
}

#[test]
fn every_jump_target_is_anchored() {
    let class = compile_ok(indoc! {r#"
        class Main {
            Int collatz(Int n) {
                var steps = 0;
                while (n != 1) {
                    if (n % 2 == 0)
                        n = n / 2;
                    else
                        n = 3 * n + 1;
                    steps++;
                }
                return steps;
            }
        }
    "#});
    let method = class.method("collatz").unwrap();
    for statement in &method.statements {
        for (_, label) in &statement.targets {
            assert!(
                method.statements.iter().any(|s| s.label == Some(*label)),
                "dangling label {label:?}"
            );
        }
    }
}

#[test]
fn for_in_iterates_with_index_and_length() {
    let class = compile_ok(indoc! {r#"
        class Main {
            void m(Int[] values) {
                for (var v in values) {
                    print(v);
                }
            }
        }
    "#});
    let method = class.method("m").unwrap();
    let ops: Vec<Op> = method.statements.iter().map(|s| s.op).collect();
    assert!(ops.contains(&Op::ArrayLength));
    assert!(ops.contains(&Op::ArrayGet));
    assert!(ops.contains(&Op::LessThan));
}

#[test]
fn fall_through_between_cases_is_rejected_at_the_next_case() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void m(Int x) {
                switch (x) {
                    case 1:
                        print(1);
                    case 2:
                        print(2);
                }
            }
        }
    "#});
    assert_error(&diagnostics, "Falling through in a switch statement");
    assert_eq!(
        error_line(&diagnostics, "Falling through in a switch statement"),
        6
    );
}

#[test]
fn empty_cases_may_share_a_body() {
    compile_ok(indoc! {r#"
        class Main {
            void m(Int x) {
                switch (x) {
                    case 1:
                    case 2:
                        print(2);
                        break;
                }
            }
        }
    "#});
}

#[test]
fn a_break_that_leaves_the_switch_permits_the_next_case() {
    compile_ok(indoc! {r#"
        class Main {
            void m(Int x) {
                switch (x) {
                    case 1:
                        while (true) {
                            break 2;
                        }
                    case 2:
                        print(2);
                        break;
                }
            }
        }
    "#});
}

#[test]
fn duplicate_case_values_and_defaults_are_rejected() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void m(Int x) {
                switch (x) {
                    case 1:
                        break;
                    case 1:
                        break;
                }
            }
        }
    "#});
    assert_error(&diagnostics, "Duplicate case label");

    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void m(Int x) {
                switch (x) {
                    default:
                        break;
                    default:
                        break;
                }
            }
        }
    "#});
    assert_error(&diagnostics, "Duplicate default label");
}

#[test]
fn uninitialized_reads_are_reported() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            Int f(Bool b) {
                Int x;
                if (b)
                    x = 1;
                return x;
            }
        }
    "#});
    assert_error(&diagnostics, "Variable may be used before it is initialized");
}

#[test]
fn initialization_on_every_path_satisfies_definite_assignment() {
    compile_ok(indoc! {r#"
        class Main {
            Int f(Bool b) {
                Int x;
                if (b)
                    x = 1;
                else
                    x = 2;
                return x;
            }
        }
    "#});
}

#[test]
fn switch_arms_with_default_satisfy_definite_assignment() {
    compile_ok(indoc! {r#"
        class Main {
            Int f(Int v) {
                Int x;
                switch (v) {
                    case 1:
                        x = 1;
                        break;
                    default:
                        x = 2;
                        break;
                }
                return x;
            }
        }
    "#});
}

#[test]
fn switch_without_default_leaves_variables_unassigned() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            Int f(Int v) {
                Int x;
                switch (v) {
                    case 1:
                        x = 1;
                        break;
                }
                return x;
            }
        }
    "#});
    assert_error(&diagnostics, "Variable may be used before it is initialized");
}

#[test]
fn a_method_that_may_finish_without_a_value_is_reported() {
    let diagnostics = compile_err("class Main { Int f(Bool b) { if (b) return 1; } }");
    assert_error(&diagnostics, "Method may finish without returning a value");
}

#[test]
fn returning_on_every_path_satisfies_the_return_check() {
    compile_ok(indoc! {r#"
        class Main {
            Int f(Bool b) {
                if (b)
                    return 1;
                else
                    return 2;
            }
        }
    "#});
}

#[test]
fn return_presence_is_checked_against_the_signature() {
    let diagnostics = compile_err("class Main { void m() { return 1; } }");
    assert_error(&diagnostics, "Cannot return a value from a void method");

    let diagnostics = compile_err("class Main { Int m() { return; } }");
    assert_error(&diagnostics, "Must return a non-void value");
}

#[test]
fn break_counts_are_validated() {
    let diagnostics = compile_err("class Main { void m() { while (true) { break 0; } } }");
    assert_error(&diagnostics, "Number of loops must be positive");

    let diagnostics = compile_err("class Main { void m() { while (true) { break 2; } } }");
    assert_error(&diagnostics, "Attempting to break out of non-loop");

    let diagnostics = compile_err("class Main { void m() { while (true) { break 1L; } } }");
    assert_error(
        &diagnostics,
        "Number of loops must be an integer literal, not a long literal",
    );

    let diagnostics = compile_err("class Main { void m() { continue; } }");
    assert_error(&diagnostics, "Attempting to continue non-loop");
}

#[test]
fn nested_break_counts_resolve_outward() {
    compile_ok(indoc! {r#"
        class Main {
            void m() {
                for (var i = 0; i < 3; i++) {
                    for (var j = 0; j < 3; j++) {
                        if (i == j)
                            break 2;
                        else
                            continue 2;
                    }
                }
            }
        }
    "#});
}

#[test]
fn call_shape_is_validated() {
    let diagnostics = compile_err("class Main { void m() { ghost(); } }");
    assert_error(&diagnostics, "Calling an unknown method");

    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void take(Int a, Int b) { }
            void m() {
                take(1);
            }
        }
    "#});
    assert_error(&diagnostics, "Too few arguments to method call");

    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void take(Int a) { }
            void m() {
                take(1, 2, 3);
            }
        }
    "#});
    // Reported once, not once per surplus argument.
    let count = diagnostics
        .iter()
        .filter(|m| m.message.contains("Too many arguments to method call"))
        .count();
    assert_eq!(count, 1);
}

#[test]
fn surplus_arguments_to_a_zero_parameter_method_are_rejected() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void take() { }
            void m() {
                take(1);
            }
        }
    "#});
    assert_error(&diagnostics, "Too many arguments to method call");
}

#[test]
fn void_results_cannot_be_used_as_values() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void nothing() { }
            void m() {
                print(nothing());
            }
        }
    "#});
    assert_error(&diagnostics, "Cannot use the return value of a void method");
}

#[test]
fn assignment_targets_are_restricted() {
    let diagnostics = compile_err("class Main { void m() { 1 = 2; } }");
    assert_error(&diagnostics, "Invalid left-hand side");

    let diagnostics = compile_err(indoc! {r#"
        class Main {
            Int get() { return 1; }
            void m() {
                get() = 2;
            }
        }
    "#});
    assert_error(&diagnostics, "Invalid left-hand side");
}

#[test]
fn increment_targets_are_restricted() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            Int get() { return 1; }
            void m() {
                get()++;
            }
        }
    "#});
    assert_error(
        &diagnostics,
        "Increment / decrement operator may only be used on variables or array elements",
    );
}

#[test]
fn duplicate_methods_are_rejected() {
    let diagnostics = compile_err(indoc! {r#"
        class Main {
            void m() { }
            void m() { }
        }
    "#});
    assert_error(&diagnostics, "Multiple methods with the same identifier");
}

#[test]
fn auto_requires_an_initializer() {
    let diagnostics = compile_err("class Main { void m() { var x; print(x); } }");
    assert_error(
        &diagnostics,
        "Usage of the auto type is limited to variables that are assigned",
    );
}

#[test]
fn oversized_literals_are_rejected() {
    let diagnostics = compile_err("class Main { void m() { print(2147483648); } }");
    assert_error(&diagnostics, "Literal value is too large for Int data type");

    let diagnostics =
        compile_err("class Main { void m() { print(9223372036854775808L); } }");
    assert_error(&diagnostics, "Literal value is too large for Long data type");

    compile_ok("class Main { void m() { print(2147483648L); } }");
}

#[test]
fn field_initializers_become_init_statements() {
    let class = compile_ok(indoc! {r#"
        class Main {
            Int count = 42;
            Int untouched;
            void m() {
                print(count);
            }
        }
    "#});
    assert_eq!(class.fields.len(), 2);
    let assigns = class
        .init_statements
        .iter()
        .filter(|s| s.op == Op::Assign)
        .count();
    assert_eq!(assigns, 1);
    let destination = class.init_statements[0].destination.unwrap();
    assert_eq!(Some(destination), class.fields.get("count").copied());
}

#[test]
fn class_interface_reflects_fields_and_methods() {
    let class = compile_ok(indoc! {r#"
        class Counter {
            Int count = 0;
            Int[] history;
            Int add(Int amount) {
                count = count + amount;
                return count;
            }
            void reset() {
                count = 0;
            }
        }
    "#});
    let interface = class.interface();
    assert_eq!(interface.identifier, "Counter");
    assert_eq!(interface.fields.len(), 2);
    assert_eq!(interface.fields[0].identifier, "count");
    assert_eq!(interface.fields[1].ty.to_string(), "Int[]");
    let add = interface.method("add").unwrap();
    assert_eq!(add.return_type.as_ref().unwrap().to_string(), "Int");
    assert_eq!(add.arg_types.len(), 1);
    assert!(interface.method("reset").unwrap().return_type.is_none());
}
