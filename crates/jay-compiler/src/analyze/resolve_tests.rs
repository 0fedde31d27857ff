//! Unit tests for scope resolution.

use std::collections::HashSet;

use indoc::indoc;

use crate::analyze::resolve_vars;
use crate::diagnostics::Diagnostics;
use crate::parser::{Ast, NodeId, NodeKind};
use crate::test_utils::{find_method, parse};

fn resolve(source: &str) -> (Ast, NodeId, crate::analyze::VarMap, Diagnostics) {
    resolve_with_fields(source, &[])
}

fn resolve_with_fields(
    source: &str,
    fields: &[&str],
) -> (Ast, NodeId, crate::analyze::VarMap, Diagnostics) {
    let (ast, root) = parse(source);
    let method = find_method(&ast, root, "m");
    let field_identifiers: HashSet<String> = fields.iter().map(|f| f.to_string()).collect();
    let mut diagnostics = Diagnostics::new();
    let var_map = resolve_vars(&ast, method, &field_identifiers, &mut diagnostics);
    (ast, method, var_map, diagnostics)
}

/// All identifier occurrences with the given token text, in source order.
fn occurrences(ast: &Ast, token: &str) -> Vec<NodeId> {
    (0..ast.len() as u32)
        .map(NodeId)
        .filter(|id| ast.kind(*id) == NodeKind::Identifier && ast.token(*id) == token)
        .collect()
}

#[test]
fn declarations_and_uses_share_an_id() {
    let (ast, _method, var_map, diagnostics) = resolve(indoc! {r#"
        class C {
            void m() {
                Int x = 1;
                print(x);
            }
        }
    "#});
    assert!(diagnostics.is_empty());
    let xs = occurrences(&ast, "x");
    assert_eq!(xs.len(), 2);
    let id = var_map.get(xs[0]).expect("declaration has an id");
    assert_eq!(var_map.get(xs[1]), Some(id));
}

#[test]
fn sequential_scopes_reuse_names_with_fresh_ids() {
    let (ast, _method, var_map, diagnostics) = resolve(indoc! {r#"
        class C {
            void m() {
                { Int x = 1; print(x); }
                { Int x = 2; print(x); }
            }
        }
    "#});
    assert!(diagnostics.is_empty());
    let xs = occurrences(&ast, "x");
    assert_eq!(xs.len(), 4);
    let first = var_map.get(xs[0]).unwrap();
    let second = var_map.get(xs[2]).unwrap();
    assert_ne!(first, second);
    assert_eq!(var_map.get(xs[1]), Some(first));
    assert_eq!(var_map.get(xs[3]), Some(second));
}

#[test]
fn shadowing_a_visible_local_is_an_error() {
    let (_ast, _method, _var_map, diagnostics) = resolve(indoc! {r#"
        class C {
            void m() {
                Int x = 1;
                { Int x = 2; }
            }
        }
    "#});
    assert!(
        diagnostics
            .iter()
            .any(|m| m.message.contains("Multiple variables with the same identifier"))
    );
}

#[test]
fn colliding_with_an_argument_is_an_error() {
    let (_ast, _method, _var_map, diagnostics) =
        resolve("class C { void m(Int x) { Int x = 1; } }");
    assert!(
        diagnostics
            .iter()
            .any(|m| m.message.contains("Multiple variables with the same identifier"))
    );
}

#[test]
fn duplicate_arguments_are_an_error() {
    let (_ast, _method, _var_map, diagnostics) =
        resolve("class C { void m(Int x, Int x) { } }");
    assert!(diagnostics.iter().any(|m| {
        m.message
            .contains("Multiple method arguments with the same identifier")
    }));
}

#[test]
fn arguments_and_fields_resolve_to_none() {
    let (ast, _method, var_map, diagnostics) = resolve_with_fields(
        "class C { void m(Int a) { print(a); print(f); } }",
        &["f"],
    );
    assert!(diagnostics.is_empty());
    let a_use = *occurrences(&ast, "a").last().unwrap();
    assert!(var_map.contains(a_use));
    assert_eq!(var_map.get(a_use), None);
    let f_use = *occurrences(&ast, "f").last().unwrap();
    assert!(var_map.contains(f_use));
    assert_eq!(var_map.get(f_use), None);
}

#[test]
fn undeclared_variables_are_reported_and_map_to_none() {
    let (ast, _method, var_map, diagnostics) = resolve("class C { void m() { print(ghost); } }");
    assert!(
        diagnostics
            .iter()
            .any(|m| m.message.contains("Variable not declared in this scope"))
    );
    let ghost = occurrences(&ast, "ghost")[0];
    assert!(var_map.contains(ghost));
    assert_eq!(var_map.get(ghost), None);
}

#[test]
fn for_in_loop_variable_is_declared_in_the_loop_scope() {
    let (ast, _method, var_map, diagnostics) = resolve(indoc! {r#"
        class C {
            void m(Int[] values) {
                for (var v in values) print(v);
            }
        }
    "#});
    assert!(diagnostics.is_empty());
    let vs = occurrences(&ast, "v");
    assert_eq!(vs.len(), 2);
    let id = var_map.get(vs[0]).expect("loop variable has an id");
    assert_eq!(var_map.get(vs[1]), Some(id));
}

#[test]
fn a_variable_is_not_visible_after_its_scope_closes() {
    let (_ast, _method, _var_map, diagnostics) = resolve(indoc! {r#"
        class C {
            void m() {
                { Int x = 1; }
                print(x);
            }
        }
    "#});
    assert!(
        diagnostics
            .iter()
            .any(|m| m.message.contains("Variable not declared in this scope"))
    );
}

#[test]
fn method_call_names_are_not_variable_uses() {
    let (ast, _method, var_map, diagnostics) = resolve(indoc! {r#"
        class C {
            void m() {
                helper();
            }
            void helper() { }
        }
    "#});
    assert!(diagnostics.is_empty());
    let helper_calls = occurrences(&ast, "helper");
    // The callee name inside m is excluded from the map entirely.
    assert!(helper_calls.iter().all(|id| !var_map.contains(*id)));
}
