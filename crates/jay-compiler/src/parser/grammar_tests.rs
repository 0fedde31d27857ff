//! Unit tests for the grammar.

use indoc::indoc;

use crate::diagnostics::Diagnostics;
use crate::parser::{NodeKind, parse_file};
use crate::test_utils::{find_method, parse};

#[test]
fn parses_a_class_with_fields_and_methods() {
    let (ast, root) = parse(indoc! {r#"
        class Counter {
            Int count = 0;
            void increment() {
                count = count + 1;
            }
            Int get() {
                return count;
            }
        }
    "#});
    assert_eq!(ast.kind(root), NodeKind::File);
    let class = ast.expect_child(root, 0);
    assert_eq!(ast.kind(class), NodeKind::ClassDefinition);
    assert_eq!(ast.token(ast.expect_child(class, 0)), "Counter");
    find_method(&ast, root, "increment");
    find_method(&ast, root, "get");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (ast, root) = parse("class C { void m() { print(1 + 2 * 3); } }");
    let method = find_method(&ast, root, "m");
    let body = ast.expect_child(method, 3);
    let call = ast.expect_child(body, 1);
    assert_eq!(ast.kind(call), NodeKind::MethodCall);
    let plus = ast.expect_child(call, 1);
    assert_eq!(ast.kind(plus), NodeKind::Plus);
    assert_eq!(ast.kind(ast.expect_child(plus, 0)), NodeKind::IntLiteral);
    assert_eq!(ast.kind(ast.expect_child(plus, 1)), NodeKind::Mult);
}

#[test]
fn assignment_is_right_associative() {
    let (ast, root) = parse("class C { void m(Int a, Int b) { a = b = 1; } }");
    let method = find_method(&ast, root, "m");
    let body = ast.expect_child(method, 3);
    let outer = ast.expect_child(body, 1);
    assert_eq!(ast.kind(outer), NodeKind::AssignmentExpression);
    let inner = ast.expect_child(outer, 2);
    assert_eq!(ast.kind(inner), NodeKind::AssignmentExpression);
}

#[test]
fn parses_array_types_and_indexing() {
    let (ast, root) = parse(indoc! {r#"
        class C {
            Int[][] grid;
            void m() {
                grid[0][1] = 2;
                print(grid.length);
            }
        }
    "#});
    let method = find_method(&ast, root, "m");
    let body = ast.expect_child(method, 3);
    let first = ast.expect_child(ast.expect_child(body, 0), 1);
    assert_eq!(ast.kind(first), NodeKind::AssignmentExpression);
    assert_eq!(ast.kind(ast.expect_child(first, 0)), NodeKind::ArrayGet);
}

#[test]
fn parses_control_flow_statements() {
    let (ast, root) = parse(indoc! {r#"
        class C {
            void m(Int x) {
                while (x > 0) x--;
                do { x++; } while (x < 10);
                for (var i = 0; i < 3; i++) print(i);
                switch (x) {
                    case 1:
                        break;
                    default:
                        return;
                }
            }
        }
    "#});
    let method = find_method(&ast, root, "m");
    let mut kinds = Vec::new();
    let mut list = ast.expect_child(method, 3);
    while ast.kind(list) == NodeKind::StatementList {
        kinds.push(ast.kind(ast.expect_child(list, 1)));
        list = ast.expect_child(list, 0);
    }
    kinds.reverse();
    assert_eq!(
        kinds,
        vec![
            NodeKind::While,
            NodeKind::DoWhile,
            NodeKind::For,
            NodeKind::Switch,
        ]
    );
}

#[test]
fn parses_for_in_with_and_without_declared_type() {
    let (ast, root) = parse(indoc! {r#"
        class C {
            void m(Int[] values) {
                for (Int v in values) print(v);
                for (var w in values) print(w);
            }
        }
    "#});
    let method = find_method(&ast, root, "m");
    let list = ast.expect_child(method, 3);
    let second = ast.expect_child(list, 1);
    assert_eq!(ast.kind(second), NodeKind::ForIn);
    assert_eq!(ast.kind(ast.expect_child(second, 0)), NodeKind::Auto);
    let first = ast.expect_child(ast.expect_child(list, 0), 1);
    assert_eq!(ast.kind(first), NodeKind::ForIn);
    assert_eq!(ast.kind(ast.expect_child(first, 0)), NodeKind::Type);
}

#[test]
fn break_with_count_keeps_the_literal() {
    let (ast, root) = parse("class C { void m() { while (true) { break 1; } } }");
    let method = find_method(&ast, root, "m");
    let body = ast.expect_child(method, 3);
    let while_node = ast.expect_child(body, 1);
    let block = ast.expect_child(while_node, 1);
    let break_node = ast.expect_child(ast.expect_child(block, 0), 1);
    assert_eq!(ast.kind(break_node), NodeKind::Break);
    assert_eq!(ast.token(ast.expect_child(break_node, 0)), "1");
}

#[test]
fn syntax_errors_report_a_line_and_fail_the_parse() {
    let mut diagnostics = Diagnostics::new();
    let result = parse_file("class C {\n    void m() { if } \n}", &mut diagnostics);
    assert!(result.is_none());
    assert!(diagnostics.has_errors());
    assert!(diagnostics.iter().any(|m| m.line == 2));
}

#[test]
fn plain_expressions_are_not_statements() {
    let mut diagnostics = Diagnostics::new();
    let result = parse_file("class C { void m() { 1 + 2; } }", &mut diagnostics);
    assert!(result.is_none());
    assert!(diagnostics.has_errors());
}

#[test]
fn trailing_input_after_the_class_is_rejected() {
    let mut diagnostics = Diagnostics::new();
    let result = parse_file("class C { } class D { }", &mut diagnostics);
    assert!(result.is_none());
    assert!(diagnostics.has_errors());
}
