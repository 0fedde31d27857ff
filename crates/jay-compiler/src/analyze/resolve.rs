//! Variable scope resolution.
//!
//! Assigns each local-variable identifier occurrence in a method a stable
//! id. Occurrences that refer to a field or an argument, and occurrences
//! that resolve to nothing, map to `None`; downstream passes treat those by
//! name instead.

use std::collections::{HashMap, HashSet};

use crate::diagnostics::Diagnostics;
use crate::parser::{Ast, NodeId, NodeKind};

/// Id of a local (non-argument, non-field) variable within one method.
pub type LocalId = u32;

/// Resolution result: identifier occurrence -> local variable id.
#[derive(Debug, Clone, Default)]
pub struct VarMap {
    map: HashMap<NodeId, Option<LocalId>>,
    count: u32,
}

impl VarMap {
    /// The local id for an identifier occurrence; `None` when the
    /// occurrence names a field, an argument, or nothing at all.
    pub fn get(&self, node: NodeId) -> Option<LocalId> {
        self.map.get(&node).copied().flatten()
    }

    /// Whether the resolver visited this occurrence at all.
    pub fn contains(&self, node: NodeId) -> bool {
        self.map.contains_key(&node)
    }

    /// The number of local ids allocated.
    pub fn local_count(&self) -> u32 {
        self.count
    }

    /// Every resolved occurrence: `(occurrence node, local id or None)`.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<LocalId>)> + '_ {
        self.map.iter().map(|(node, local)| (*node, *local))
    }
}

struct Resolver<'a> {
    ast: &'a Ast,
    field_identifiers: &'a HashSet<String>,
    diagnostics: &'a mut Diagnostics,
    arg_identifiers: HashSet<String>,
    /// Identifier -> id for every local currently in scope.
    all_vars: HashMap<String, LocalId>,
    /// Scope frames; each holds the identifiers it declared.
    frames: Vec<Vec<String>>,
    result: VarMap,
}

impl<'a> Resolver<'a> {
    fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop_frame(&mut self) {
        for identifier in self.frames.pop().expect("unbalanced scope frames") {
            self.all_vars.remove(&identifier);
        }
    }

    /// Declares the local named by `node` (an `Identifier`), reporting
    /// collisions with arguments, fields, and visible locals. The
    /// declaration receives an id either way so later passes can proceed.
    fn create_var(&mut self, node: NodeId) {
        debug_assert_eq!(self.ast.kind(node), NodeKind::Identifier);
        let identifier = self.ast.token(node).to_string();
        let id = self.result.count;
        self.result.count += 1;
        self.result.map.insert(node, Some(id));
        if self.arg_identifiers.contains(&identifier)
            || self.field_identifiers.contains(&identifier)
            || self.all_vars.contains_key(&identifier)
        {
            self.diagnostics.error(
                "Multiple variables with the same identifier",
                self.ast.line(node),
            );
        } else {
            self.all_vars.insert(identifier.clone(), id);
            self.frames
                .last_mut()
                .expect("no open scope frame")
                .push(identifier);
        }
    }

    /// Resolves a use of the identifier at `node`.
    fn resolve_use(&mut self, node: NodeId) {
        let identifier = self.ast.token(node);
        let id = if self.field_identifiers.contains(identifier)
            || self.arg_identifiers.contains(identifier)
        {
            None
        } else if let Some(id) = self.all_vars.get(identifier) {
            Some(*id)
        } else {
            self.diagnostics
                .error("Variable not declared in this scope", self.ast.line(node));
            None
        };
        self.result.map.insert(node, id);
    }

    fn visit_var_declaration_item(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::Identifier => self.create_var(node),
            NodeKind::AssignmentExpression => {
                self.create_var(self.ast.expect_child(node, 0));
                self.visit(self.ast.expect_child(node, 2));
            }
            kind => unreachable!("not a variable declaration item: {kind:?}"),
        }
    }

    fn visit_var_declaration_list(&mut self, node: NodeId) {
        if self.ast.kind(node) == NodeKind::VarDeclarationList {
            self.visit_var_declaration_list(self.ast.expect_child(node, 0));
            self.visit_var_declaration_item(self.ast.expect_child(node, 1));
        } else {
            self.visit_var_declaration_item(node);
        }
    }

    fn visit_children(&mut self, node: NodeId) {
        for index in 0..4 {
            if let Some(child) = self.ast.child(node, index) {
                self.visit(child);
            }
        }
    }

    fn visit(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::Arg => {
                let identifier = self.ast.token(self.ast.expect_child(node, 1)).to_string();
                if !self.arg_identifiers.insert(identifier) {
                    self.diagnostics.error(
                        "Multiple method arguments with the same identifier",
                        self.ast.line(node),
                    );
                }
            }
            NodeKind::Identifier => self.resolve_use(node),
            NodeKind::MethodCall => {
                // Skip the callee name; it is not a variable.
                if let Some(args) = self.ast.child(node, 1) {
                    self.visit(args);
                }
            }
            NodeKind::Type | NodeKind::TypeArray | NodeKind::Auto | NodeKind::Void => {}
            NodeKind::VarDeclaration => {
                self.visit_var_declaration_list(self.ast.expect_child(node, 1));
            }
            NodeKind::ForIn => {
                self.push_frame();
                self.create_var(self.ast.expect_child(node, 1));
                self.visit(self.ast.expect_child(node, 2));
                self.visit(self.ast.expect_child(node, 3));
                self.pop_frame();
            }
            NodeKind::Block
            | NodeKind::DoWhile
            | NodeKind::For
            | NodeKind::Switch
            | NodeKind::While => {
                self.push_frame();
                self.visit_children(node);
                self.pop_frame();
            }
            _ => self.visit_children(node),
        }
    }
}

/// Resolves the local variables of one `MethodDefinition` node.
pub fn resolve_vars(
    ast: &Ast,
    method: NodeId,
    field_identifiers: &HashSet<String>,
    diagnostics: &mut Diagnostics,
) -> VarMap {
    debug_assert_eq!(ast.kind(method), NodeKind::MethodDefinition);
    let mut resolver = Resolver {
        ast,
        field_identifiers,
        diagnostics,
        arg_identifiers: HashSet::new(),
        all_vars: HashMap::new(),
        frames: Vec::new(),
        result: VarMap::default(),
    };
    resolver.push_frame();
    if let Some(args) = ast.child(method, 2) {
        resolver.visit(args);
    }
    resolver.visit(ast.expect_child(method, 3));
    resolver.pop_frame();
    resolver.result
}
