//! Shared helpers for the unit tests.

use jay_cfg::{Class, ReducedType};

use crate::diagnostics::Diagnostics;
use crate::parser::{Ast, NodeId, NodeKind, parse_file};

/// Parses a source file, panicking on syntax errors.
pub fn parse(source: &str) -> (Ast, NodeId) {
    let mut diagnostics = Diagnostics::new();
    match parse_file(source, &mut diagnostics) {
        Some((ast, root)) => (ast, root),
        None => panic!("unexpected syntax error:\n{}", diagnostics.render("test.jay")),
    }
}

/// The `MethodDefinition` node for `name` in a parsed file.
pub fn find_method(ast: &Ast, root: NodeId, name: &str) -> NodeId {
    let class = ast.expect_child(root, 0);
    let mut items = ast.expect_child(class, 1);
    while ast.kind(items) == NodeKind::ClassBodyItemList {
        let item = ast.expect_child(items, 1);
        if ast.kind(item) == NodeKind::MethodDefinition
            && ast.token(ast.expect_child(item, 1)) == name
        {
            return item;
        }
        items = ast.expect_child(items, 0);
    }
    panic!("no method named {name}");
}

/// Compiles a source file, panicking on any diagnostic.
pub fn compile_ok(source: &str) -> Class {
    match crate::driver::compile_source(source) {
        Ok(class) => class,
        Err(diagnostics) => panic!(
            "unexpected compile errors:\n{}",
            diagnostics.render("test.jay")
        ),
    }
}

/// Compiles a source file, panicking unless it produces diagnostics.
pub fn compile_err(source: &str) -> Diagnostics {
    match crate::driver::compile_source(source) {
        Ok(_) => panic!("expected compile errors, compilation succeeded"),
        Err(diagnostics) => diagnostics,
    }
}

/// Asserts that some diagnostic message contains `needle`.
pub fn assert_error(diagnostics: &Diagnostics, needle: &str) {
    assert!(
        diagnostics.iter().any(|m| m.message.contains(needle)),
        "no diagnostic contains {:?}; got:\n{}",
        needle,
        diagnostics.render("test.jay")
    );
}

/// The line of the first diagnostic whose message contains `needle`.
pub fn error_line(diagnostics: &Diagnostics, needle: &str) -> u32 {
    diagnostics
        .iter()
        .find(|m| m.message.contains(needle))
        .unwrap_or_else(|| panic!("no diagnostic contains {needle:?}"))
        .line
}

/// The reduced storage type of the named variable in a compiled class.
pub fn var_reduced_type(class: &Class, identifier: &str) -> ReducedType {
    for index in 0..class.vars.len() {
        let info = class.vars.info(jay_cfg::VarId(index as u32));
        if info.identifier == identifier {
            return info.reduced_type;
        }
    }
    panic!("no variable named {identifier}");
}
