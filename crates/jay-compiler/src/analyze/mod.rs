//! Semantic analyses: scope resolution, break flow, and type evaluation.

pub mod break_flow;
pub mod resolve;
pub mod type_eval;

#[cfg(test)]
mod resolve_tests;

pub use break_flow::BreakFlow;
pub use resolve::{LocalId, VarMap, resolve_vars};
pub use type_eval::{TypeEvaluation, evaluate_field_initializers, evaluate_method};

use jay_cfg::Type;

use crate::parser::{Ast, NodeId, NodeKind};

/// The [`Type`] denoted by a `Type`/`TypeArray` node; `None` for `Auto`.
pub fn ast_type(ast: &Ast, node: NodeId) -> Option<Type> {
    match ast.kind(node) {
        NodeKind::Auto => None,
        NodeKind::TypeArray => {
            let inner = ast_type(ast, ast.expect_child(node, 0)).expect("auto cannot be an array");
            Some(inner.array_of())
        }
        NodeKind::Type => {
            let name = ast.token(ast.expect_child(node, 0));
            Some(Type::scalar(name))
        }
        kind => unreachable!("not a type node: {kind:?}"),
    }
}
