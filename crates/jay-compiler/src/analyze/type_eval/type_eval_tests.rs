//! Unit tests for expression type evaluation.
//!
//! Most checks go through the full pipeline and observe the storage types
//! the evaluation assigns to variables, which is exactly what the emitter
//! consumes.

use indoc::indoc;

use jay_cfg::{ReducedType, dump_method};

use crate::test_utils::{assert_error, compile_err, compile_ok, var_reduced_type};

#[test]
fn literals_type_their_variables() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m() {
                var a = 1;
                var b = 1L;
                var c = 1.5f;
                var d = 1.5;
                var e = true;
                print(a); print(b); print(c); print(d); print(e);
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "a"), ReducedType::Int);
    assert_eq!(var_reduced_type(&class, "b"), ReducedType::Long);
    assert_eq!(var_reduced_type(&class, "c"), ReducedType::Float);
    assert_eq!(var_reduced_type(&class, "d"), ReducedType::Double);
    assert_eq!(var_reduced_type(&class, "e"), ReducedType::Bool);
}

#[test]
fn arithmetic_promotes_to_the_least_common_type() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m() {
                var a = 1 + 2L;
                var b = 1 + 1.5f;
                var c = 1L * 2.5;
                print(a); print(b); print(c);
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "a"), ReducedType::Long);
    assert_eq!(var_reduced_type(&class, "b"), ReducedType::Float);
    assert_eq!(var_reduced_type(&class, "c"), ReducedType::Double);
}

#[test]
fn branches_merge_to_the_least_common_type() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m(Bool condition) {
                var x = 1;
                if (condition)
                    x = 2;
                else
                    x = 2.5;
                println(x);
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "x"), ReducedType::Double);
}

#[test]
fn ternary_arms_merge_structurally() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m(Bool condition) {
                var t = condition ? 1 : 2.5;
                print(t);
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "t"), ReducedType::Double);
}

#[test]
fn loop_widening_reaches_a_fixpoint() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m() {
                var a = 1;
                var e = 1.5f;
                for (var i = 0; i < 3; i++) {
                    a += e;
                }
                println(a);
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "a"), ReducedType::Float);
    assert_eq!(var_reduced_type(&class, "i"), ReducedType::Int);
}

#[test]
fn widening_propagates_through_a_chain_across_iterations() {
    // One pass only discovers e; each further pass moves the Double one
    // variable up the chain.
    let class = compile_ok(indoc! {r#"
        class C {
            void m(Int iterations) {
                var a = 1;
                var b = 1;
                var c = 1;
                var d = 1;
                var e = 1;
                for (var i = 0; i < iterations; i++) {
                    a += b;
                    b += c;
                    c += d;
                    d += e;
                    e += 1.5;
                }
                println(a);
            }
        }
    "#});
    for name in ["a", "b", "c", "d", "e"] {
        assert_eq!(var_reduced_type(&class, name), ReducedType::Double, "{name}");
    }
}

#[test]
fn a_no_op_before_the_loop_does_not_change_the_result() {
    let with_noop = compile_ok(indoc! {r#"
        class C {
            void m() {
                var a = 1;
                var e = 1.5f;
                ;
                for (var i = 0; i < 3; i++) {
                    a += e;
                }
                println(a);
            }
        }
    "#});
    let without = compile_ok(indoc! {r#"
        class C {
            void m() {
                var a = 1;
                var e = 1.5f;
                for (var i = 0; i < 3; i++) {
                    a += e;
                }
                println(a);
            }
        }
    "#});
    let m_with = with_noop.method("m").unwrap();
    let m_without = without.method("m").unwrap();
    assert_eq!(
        dump_method(m_with, &with_noop.vars),
        dump_method(m_without, &without.vars)
    );
}

#[test]
fn do_while_bodies_are_analyzed_before_the_condition() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m() {
                var x = 1;
                do {
                    x += 0.5;
                } while (x < 10);
                println(x);
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "x"), ReducedType::Double);
}

#[test]
fn while_condition_must_be_boolean() {
    let diagnostics = compile_err("class C { void m(Int x) { while (x) { } } }");
    assert_error(&diagnostics, "Condition must be a boolean value");
}

#[test]
fn boolean_operands_are_checked() {
    let diagnostics = compile_err("class C { void m(Int x, Bool b) { print(b && x); } }");
    assert_error(&diagnostics, "Operand must be a boolean");
}

#[test]
fn arithmetic_operands_must_be_numbers() {
    let diagnostics = compile_err("class C { void m(Bool b) { print(b + 1); } }");
    assert_error(&diagnostics, "Operand must be a number");
}

#[test]
fn mod_and_bitwise_need_integer_like_operands() {
    let diagnostics = compile_err("class C { void m() { print(1.5 % 2); } }");
    assert_error(&diagnostics, "Operand must be of an integer-like type");

    let diagnostics = compile_err("class C { void m() { print(1.5 & 2); } }");
    assert_error(&diagnostics, "Operand must be of an integer-like type");
}

#[test]
fn shift_amounts_must_be_int_or_byte() {
    let diagnostics = compile_err("class C { void m() { print(1 << 2L); } }");
    assert_error(&diagnostics, "Operand to bit shift must be an Int or Byte");

    compile_ok("class C { void m() { print(1 << 2); } }");
}

#[test]
fn argument_types_are_checked_positionally() {
    let diagnostics = compile_err(indoc! {r#"
        class C {
            void take(Int x) { }
            void m() {
                take(1.5);
            }
        }
    "#});
    assert_error(&diagnostics, "Method argument is of incorrect type");
}

#[test]
fn return_values_must_match_the_declared_type() {
    let diagnostics = compile_err("class C { Int m() { return 1.5; } }");
    assert_error(&diagnostics, "Return value is of incorrect type");

    // Widening the other way is fine.
    compile_ok("class C { Double m() { return 1; } }");
}

#[test]
fn assignments_to_fixed_slots_are_checked() {
    // Fields have fixed types.
    let diagnostics = compile_err(indoc! {r#"
        class C {
            Int count;
            void m() {
                count = 1.5;
            }
        }
    "#});
    assert_error(&diagnostics, "Incompatible types in assignment");

    // Arguments too.
    let diagnostics = compile_err("class C { void m(Int x) { x = 1.5; } }");
    assert_error(&diagnostics, "Incompatible types in assignment");
}

#[test]
fn declared_locals_check_their_initializers() {
    let diagnostics = compile_err("class C { void m() { Int x = 1.5; print(x); } }");
    assert_error(&diagnostics, "Incompatible types in assignment");

    compile_ok("class C { void m() { Double x = 1; print(x); } }");
}

#[test]
fn switch_scrutinee_must_be_int_or_byte() {
    let diagnostics =
        compile_err("class C { void m(Long x) { switch (x) { case 1: print(1); break; } } }");
    assert_error(&diagnostics, "Operand must be an Int or Byte");
}

#[test]
fn case_values_must_be_int_literals() {
    let diagnostics =
        compile_err("class C { void m(Int x) { switch (x) { case 1L: break; } } }");
    assert_error(&diagnostics, "Type of case value must be Int");
}

#[test]
fn loop_diagnostics_are_reported_once() {
    let diagnostics = compile_err(indoc! {r#"
        class C {
            void m(Int x) {
                while (x > 0) {
                    print(true + 1);
                }
            }
        }
    "#});
    let count = diagnostics
        .iter()
        .filter(|m| m.message.contains("Operand must be a number"))
        .count();
    assert_eq!(count, 1);
}

#[test]
fn for_in_binds_the_element_type() {
    let class = compile_ok(indoc! {r#"
        class C {
            void m(Int[] values) {
                for (var v in values) {
                    print(v);
                }
                for (Double d in values) {
                    print(d);
                }
            }
        }
    "#});
    assert_eq!(var_reduced_type(&class, "v"), ReducedType::Int);
    assert_eq!(var_reduced_type(&class, "d"), ReducedType::Double);
}

#[test]
fn array_indexing_types_check() {
    let diagnostics = compile_err("class C { void m(Int x) { print(x[0]); } }");
    assert_error(&diagnostics, "Operand must be an array");

    let diagnostics = compile_err("class C { void m(Int[] a) { print(a[1L]); } }");
    assert_error(&diagnostics, "Array index must be an integer");

    let class = compile_ok("class C { void m(Int[][] grid) { var row = grid[0]; var cell = row[1]; print(cell); } }");
    assert_eq!(var_reduced_type(&class, "row"), ReducedType::Object);
    assert_eq!(var_reduced_type(&class, "cell"), ReducedType::Int);
}

#[test]
fn var_fields_infer_their_types_from_initializers() {
    let class = compile_ok(indoc! {r#"
        class C {
            var total = 1.5;
            void m() {
                print(total);
            }
        }
    "#});
    assert_eq!(
        class.field_types.get("total").unwrap().reduced(),
        ReducedType::Double
    );
}
