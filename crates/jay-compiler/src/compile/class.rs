//! Class assembly: field initialization, then each method.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use jay_cfg::{Class, MethodInterface, Operand, Type, VarTable};

use crate::analyze::{ast_type, evaluate_field_initializers, evaluate_method, resolve_vars};
use crate::compile::method::MethodCompiler;
use crate::diagnostics::Diagnostics;
use crate::parser::{Ast, NodeId, NodeKind};

/// Built-in methods available to every class.
fn built_in_method_interfaces() -> IndexMap<String, MethodInterface> {
    let mut interfaces = IndexMap::new();
    for name in ["print", "println"] {
        interfaces.insert(
            name.to_string(),
            MethodInterface {
                identifier: name.to_string(),
                return_type: None,
                arg_types: vec![Type::object()],
            },
        );
    }
    interfaces
}

/// Flattens a left-recursive `ClassBodyItemList` into item nodes in
/// declaration order.
fn class_body_items(ast: &Ast, node: NodeId) -> Vec<NodeId> {
    let mut items = Vec::new();
    let mut node = node;
    while ast.kind(node) == NodeKind::ClassBodyItemList {
        items.push(ast.expect_child(node, 1));
        node = ast.expect_child(node, 0);
    }
    debug_assert_eq!(ast.kind(node), NodeKind::EmptyClassBodyItemList);
    items.reverse();
    items
}

/// Collects `(identifier node, has initializer)` for each declared item.
fn declaration_item_identifiers(ast: &Ast, list: NodeId, out: &mut Vec<(NodeId, bool)>) {
    if ast.kind(list) == NodeKind::VarDeclarationList {
        declaration_item_identifiers(ast, ast.expect_child(list, 0), out);
        declaration_item_identifiers(ast, ast.expect_child(list, 1), out);
    } else {
        match ast.kind(list) {
            NodeKind::Identifier => out.push((list, false)),
            NodeKind::AssignmentExpression => out.push((ast.expect_child(list, 0), true)),
            kind => unreachable!("not a variable declaration item: {kind:?}"),
        }
    }
}

fn method_interface(ast: &Ast, method: NodeId) -> MethodInterface {
    let return_type_node = ast.expect_child(method, 0);
    let return_type = if ast.kind(return_type_node) == NodeKind::Void {
        None
    } else {
        ast_type(ast, return_type_node)
    };
    let mut arg_types = Vec::new();
    if let Some(args) = ast.child(method, 2) {
        collect_arg_types(ast, args, &mut arg_types);
    }
    MethodInterface {
        identifier: ast.token(ast.expect_child(method, 1)).to_string(),
        return_type,
        arg_types,
    }
}

fn collect_arg_types(ast: &Ast, node: NodeId, arg_types: &mut Vec<Type>) {
    if ast.kind(node) == NodeKind::ArgList {
        collect_arg_types(ast, ast.expect_child(node, 0), arg_types);
        push_arg_type(ast, ast.expect_child(node, 1), arg_types);
    } else {
        push_arg_type(ast, node, arg_types);
    }
}

fn push_arg_type(ast: &Ast, arg: NodeId, arg_types: &mut Vec<Type>) {
    debug_assert_eq!(ast.kind(arg), NodeKind::Arg);
    if let Some(ty) = ast_type(ast, ast.expect_child(arg, 0)) {
        arg_types.push(ty);
    }
}

/// Compiles the single class of a parsed file into its CFG representation.
/// Returns `None` when any error was reported; the class is never
/// materialized from an erroneous source file.
pub fn compile_file(ast: &Ast, root: NodeId, diagnostics: &mut Diagnostics) -> Option<Class> {
    debug_assert_eq!(ast.kind(root), NodeKind::File);
    let class_node = ast.expect_child(root, 0);
    let identifier = ast.token(ast.expect_child(class_node, 0)).to_string();
    let items = class_body_items(ast, ast.expect_child(class_node, 1));

    // Method interfaces, builtins included. Overloading is unsupported, so
    // duplicate names are rejected outright.
    let mut method_interfaces = built_in_method_interfaces();
    for item in &items {
        if ast.kind(*item) != NodeKind::MethodDefinition {
            continue;
        }
        let interface = method_interface(ast, *item);
        if method_interfaces.contains_key(&interface.identifier) {
            diagnostics.error("Multiple methods with the same identifier", ast.line(*item));
            continue;
        }
        method_interfaces.insert(interface.identifier.clone(), interface);
    }

    // Field names in declaration order, with declared types where present.
    // `var` fields get their types from their initializers below.
    let field_declarations: Vec<NodeId> = items
        .iter()
        .copied()
        .filter(|item| ast.kind(*item) == NodeKind::VarDeclaration)
        .collect();
    let mut field_order: Vec<String> = Vec::new();
    let mut declared_field_types: IndexMap<String, Type> = IndexMap::new();
    for declaration in &field_declarations {
        let declared = ast_type(ast, ast.expect_child(*declaration, 0));
        let mut identifiers = Vec::new();
        declaration_item_identifiers(ast, ast.expect_child(*declaration, 1), &mut identifiers);
        for (identifier_node, has_initializer) in identifiers {
            let name = ast.token(identifier_node).to_string();
            if field_order.contains(&name) {
                diagnostics.error(
                    "Multiple variables with the same identifier",
                    ast.line(identifier_node),
                );
                continue;
            }
            field_order.push(name.clone());
            if let Some(ty) = &declared {
                declared_field_types.insert(name, ty.clone());
            } else if !has_initializer {
                diagnostics.error(
                    "Usage of the auto type is limited to variables that are assigned in \
                     their declaration statement",
                    ast.line(identifier_node),
                );
            }
        }
    }

    // Evaluate field initializers: type checks for declared fields, type
    // inference for `var` fields.
    let (field_evaluation, inferred_field_types) = evaluate_field_initializers(
        ast,
        &field_declarations,
        &declared_field_types,
        &method_interfaces,
        diagnostics,
    );
    let mut field_types: IndexMap<String, Type> = IndexMap::new();
    for name in &field_order {
        let ty = declared_field_types
            .get(name)
            .or_else(|| inferred_field_types.get(name))
            .cloned()
            .unwrap_or_else(Type::object);
        field_types.insert(name.clone(), ty);
    }
    let field_identifiers: HashSet<String> = field_order.iter().cloned().collect();

    // One variable table owns every operand in the class.
    let mut vars = VarTable::new();
    let mut fields: IndexMap<String, Operand> = IndexMap::new();
    let mut field_vars: HashMap<String, Operand> = HashMap::new();
    for (name, ty) in &field_types {
        let operand = Operand::Var(vars.alloc(ty.reduced(), name.clone(), true));
        fields.insert(name.clone(), operand);
        field_vars.insert(name.clone(), operand);
    }

    // Field initializers become the class's init statements.
    let empty_var_map = crate::analyze::VarMap::default();
    let init_statements = MethodCompiler::new(
        ast,
        &field_evaluation,
        &empty_var_map,
        &method_interfaces,
        &field_vars,
        &mut vars,
        diagnostics,
        None,
    )
    .compile_field_initializers(&field_declarations);

    // Compile each method: resolve, evaluate, build.
    let mut methods = IndexMap::new();
    for item in &items {
        if ast.kind(*item) != NodeKind::MethodDefinition {
            continue;
        }
        let var_map = resolve_vars(ast, *item, &field_identifiers, diagnostics);
        let evaluation = evaluate_method(
            ast,
            *item,
            &field_types,
            &var_map,
            &method_interfaces,
            diagnostics,
        );
        let return_type_node = ast.expect_child(*item, 0);
        let return_var = if ast.kind(return_type_node) == NodeKind::Void {
            None
        } else {
            ast_type(ast, return_type_node)
                .map(|ty| Operand::Var(vars.alloc_temp(ty.reduced())))
        };
        let method = MethodCompiler::new(
            ast,
            &evaluation,
            &var_map,
            &method_interfaces,
            &field_vars,
            &mut vars,
            diagnostics,
            return_var,
        )
        .compile(*item);
        if !methods.contains_key(&method.identifier) {
            methods.insert(method.identifier.clone(), method);
        }
    }

    if diagnostics.has_errors() {
        return None;
    }
    Some(Class {
        identifier,
        fields,
        field_types,
        methods,
        init_statements,
        vars,
    })
}
