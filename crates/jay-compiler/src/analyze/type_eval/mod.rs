//! Expression type evaluation.
//!
//! Computes one compile-time type for every expression in a method. The
//! principle is simple: an expression's type follows from its operands, and
//! a variable's type at a join point is the least common type over the
//! incoming branches. The machinery earns its keep on loops: one
//! iteration's analysis can raise a variable's type and thereby change the
//! type of an expression visited earlier in the same iteration, so each
//! loop body is re-visited until a pass changes no expression type. Errors
//! are suppressed during those trial passes and reported in one final pass,
//! so each problem is reported once.
//!
//! ```text
//! void foo(Int iterations) {
//!     var a = 1;
//!     var e = 1;
//!     for (var i = 0; i < iterations; i++) {
//!         a += e;
//!         e += 1.5;
//!     }
//!     println(a);   // a: Double, visible only after a second pass
//! }
//! ```
//!
//! Definite-assignment diagnostics are owned by the CFG builder; an
//! uninitialized read here silently types as `Object`.

pub mod snapshot;

#[cfg(test)]
mod type_eval_tests;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use jay_cfg::{MethodInterface, ReducedType, Type};

use crate::analyze::resolve::{LocalId, VarMap};
use crate::analyze::ast_type;
use crate::diagnostics::Diagnostics;
use crate::parser::literals::{has_long_suffix, int_literal_value};
use crate::parser::{Ast, NodeId, NodeKind};

use snapshot::{Snapshot, TypeRef};

/// The result of type evaluation: one type per expression node.
#[derive(Debug, Default)]
pub struct TypeEvaluation {
    node_types: HashMap<NodeId, TypeRef>,
}

impl TypeEvaluation {
    /// The type of an expression node. Panics when the node is not an
    /// expression this evaluation visited.
    pub fn full(&self, node: NodeId) -> &Type {
        self.node_types
            .get(&node)
            .expect("missing expression type")
    }

    pub fn try_full(&self, node: NodeId) -> Option<&Type> {
        self.node_types.get(&node).map(Rc::as_ref)
    }

    pub fn reduced(&self, node: NodeId) -> ReducedType {
        self.full(node).reduced()
    }

    /// The storage type of each local: the least common type over all of
    /// the local's occurrences. A loop can widen a variable past its
    /// declaration-site type, so the declaration alone is not enough.
    pub fn local_storage_types(&self, var_map: &VarMap) -> HashMap<LocalId, Type> {
        let mut storage: HashMap<LocalId, Type> = HashMap::new();
        for (node, local) in var_map.iter() {
            let Some(local) = local else { continue };
            let Some(ty) = self.node_types.get(&node) else {
                continue;
            };
            storage
                .entry(local)
                .and_modify(|current| *current = current.least_common(ty))
                .or_insert_with(|| (**ty).clone());
        }
        storage
    }
}

/// The least common type of two shared types, reusing an input when it
/// already is the answer.
fn lct(a: &TypeRef, b: &TypeRef) -> TypeRef {
    let result = a.least_common(b);
    if result == **a {
        a.clone()
    } else if result == **b {
        b.clone()
    } else {
        Rc::new(result)
    }
}

/// Whether `ty` can be stored in a slot of type `candidate`.
fn is_subtype(ty: &Type, candidate: &Type) -> bool {
    if candidate.class_name() == "Object" && candidate.dims() == 0 {
        return true;
    }
    ty.least_common(candidate) == *candidate
}

struct TypeEvaluator<'a> {
    ast: &'a Ast,
    field_types: &'a IndexMap<String, Type>,
    /// Types inferred for `var` fields while visiting field initializers.
    inferred_field_types: IndexMap<String, Type>,
    declaring_fields: bool,
    var_map: &'a VarMap,
    method_interfaces: &'a IndexMap<String, MethodInterface>,
    diagnostics: &'a mut Diagnostics,
    arg_types: HashMap<String, Type>,
    return_type: Option<Type>,
    node_types: HashMap<NodeId, TypeRef>,
    /// Break levels of the open break targets; each value indexes
    /// `incoming_stack`.
    break_levels: Vec<usize>,
    continue_levels: Vec<usize>,
    /// Current type per definitely initialized local.
    all_var_types: HashMap<LocalId, TypeRef>,
    /// Per branch: previous type (or `None` for "was uninitialized") of
    /// each local the branch changed. A `None` frame marks an unreachable
    /// point; frames pushed under it stay `None`.
    reverse_stack: Vec<Option<HashMap<LocalId, Option<TypeRef>>>>,
    /// Per branch: the snapshot head. Branch heads extend their parents.
    snapshot_stack: Vec<Snapshot>,
    /// Per open break/continue target: the snapshot heads captured at the
    /// departures that target it.
    incoming_stack: Vec<Vec<Snapshot>>,
    /// Per enclosing loop: `incoming_stack` sizes before the loop, for
    /// reclaiming trial-run captures.
    prev_incoming_sizes: Vec<HashMap<usize, usize>>,
    /// Per enclosing loop: whether we are in a trial iteration, which
    /// suppresses diagnostics.
    checking_stack: Vec<bool>,
    /// Per enclosing loop: whether the current pass changed any type.
    changed_stack: Vec<bool>,
}

impl<'a> TypeEvaluator<'a> {
    fn new(
        ast: &'a Ast,
        field_types: &'a IndexMap<String, Type>,
        var_map: &'a VarMap,
        method_interfaces: &'a IndexMap<String, MethodInterface>,
        diagnostics: &'a mut Diagnostics,
        return_type: Option<Type>,
        declaring_fields: bool,
    ) -> Self {
        let mut evaluator = Self {
            ast,
            field_types,
            inferred_field_types: IndexMap::new(),
            declaring_fields,
            var_map,
            method_interfaces,
            diagnostics,
            arg_types: HashMap::new(),
            return_type,
            node_types: HashMap::new(),
            break_levels: Vec::new(),
            continue_levels: Vec::new(),
            all_var_types: HashMap::new(),
            reverse_stack: Vec::new(),
            snapshot_stack: Vec::new(),
            incoming_stack: Vec::new(),
            prev_incoming_sizes: Vec::new(),
            checking_stack: Vec::new(),
            changed_stack: Vec::new(),
        };
        evaluator.snapshot_stack.push(None);
        evaluator.prev_incoming_sizes.push(HashMap::new());
        evaluator.checking_stack.push(false);
        evaluator.changed_stack.push(false);
        evaluator.push_branch();
        evaluator
    }

    fn emit_error(&mut self, node: NodeId, message: &str) {
        if !*self.checking_stack.last().unwrap() {
            self.diagnostics.error(message, self.ast.line(node));
        }
    }

    fn field_type(&self, identifier: &str) -> Option<Type> {
        self.inferred_field_types
            .get(identifier)
            .or_else(|| self.field_types.get(identifier))
            .cloned()
    }

    fn unreachable_here(&self) -> bool {
        matches!(self.reverse_stack.last(), Some(None))
    }

    // ---- Branch machinery -----------------------------------------------

    /// Records a local's new type (or loss of type) in `all_var_types` and
    /// the current snapshot.
    fn set_var_type(&mut self, var: LocalId, ty: Option<TypeRef>) {
        match &ty {
            Some(t) => {
                self.all_var_types.insert(var, t.clone());
            }
            None => {
                self.all_var_types.remove(&var);
            }
        }
        let top = self.snapshot_stack.last_mut().unwrap();
        *top = snapshot::push(top, var, ty);
    }

    fn push_branch(&mut self) {
        let frame = if self.unreachable_here() {
            None
        } else {
            Some(HashMap::new())
        };
        self.reverse_stack.push(frame);
        let top = self.snapshot_stack.last().cloned().unwrap_or(None);
        self.snapshot_stack.push(top);
    }

    /// Closes a branch that may or may not have executed: every local the
    /// branch changed reverts to the least common of its new and previous
    /// types (or to uninitialized). Returns the branch's snapshot head.
    fn pop_branch(&mut self) -> Snapshot {
        if let Some(frame) = self.reverse_stack.pop().unwrap() {
            for (var, prev) in frame {
                match prev {
                    None => {
                        self.all_var_types.remove(&var);
                    }
                    Some(prev_ty) => {
                        if let Some(current) = self.all_var_types.get(&var).cloned() {
                            let merged = lct(&current, &prev_ty);
                            self.all_var_types.insert(var, merged);
                        }
                    }
                }
            }
        }
        self.snapshot_stack.pop().unwrap()
    }

    fn push_break_level(&mut self) {
        self.break_levels
            .push(self.break_levels.len() + self.continue_levels.len());
        self.incoming_stack.push(Vec::new());
    }

    fn push_continue_level(&mut self) {
        self.continue_levels
            .push(self.break_levels.len() + self.continue_levels.len());
        self.incoming_stack.push(Vec::new());
    }

    /// Updates the current state to reflect that this point is reached
    /// (only) from the branches whose heads are `incoming`. Locals present
    /// in every arm become initialized at the least common type over arms;
    /// locals in only some arms stay uninitialized. No reachable arms mark
    /// the point unreachable.
    fn merge_incoming_branches(&mut self, incoming: Vec<Snapshot>) {
        // The point may have just become reachable again.
        if self.unreachable_here() {
            *self.reverse_stack.last_mut().unwrap() = Some(HashMap::new());
        }

        if incoming.is_empty() {
            let frame = self.reverse_stack.last_mut().unwrap().take().unwrap();
            for (var, prev) in frame {
                self.set_var_type(var, prev);
            }
            *self.snapshot_stack.last_mut().unwrap() = None;
            return;
        }

        let ancestor = if incoming.len() > 1 {
            snapshot::least_common_ancestor(&incoming)
        } else {
            self.snapshot_stack.last().cloned().unwrap()
        };

        // Locals initialized in every arm but not before the merge.
        let mut newly_initialized: HashSet<LocalId> = HashSet::new();
        for (index, head) in incoming.iter().enumerate() {
            let arm = snapshot::to_map(head, &ancestor);
            if index == 0 {
                for var in arm.keys() {
                    if !self.all_var_types.contains_key(var) {
                        newly_initialized.insert(*var);
                    }
                }
            } else {
                newly_initialized.retain(|var| arm.contains_key(var));
            }
        }

        for head in &incoming {
            let arm = snapshot::to_map(head, &ancestor);
            for (var, ty) in arm {
                let prev = self.all_var_types.get(&var).cloned();
                if let Some(frame) = self.reverse_stack.last_mut().unwrap().as_mut() {
                    frame.entry(var).or_insert_with(|| prev.clone());
                }
                match prev {
                    Some(current) => {
                        let merged = lct(&current, &ty);
                        self.set_var_type(var, Some(merged));
                    }
                    None => {
                        if newly_initialized.contains(&var) {
                            self.set_var_type(var, Some(ty));
                        }
                    }
                }
            }
        }
    }

    fn pop_incoming_var_types(&mut self) {
        let incoming = self.incoming_stack.pop().unwrap();
        self.merge_incoming_branches(incoming);
    }

    fn pop_break_level(&mut self) {
        self.pop_incoming_var_types();
        self.break_levels.pop();
    }

    fn pop_continue_level(&mut self) {
        self.pop_incoming_var_types();
        self.continue_levels.pop();
    }

    // ---- Variables ------------------------------------------------------

    /// Records the type a variable assumes after an assignment at `node`
    /// (an `Identifier`). Fields and arguments have fixed types, so storing
    /// an incompatible value is an error; locals are flow-typed and simply
    /// take the new type.
    fn set_var_value_type(&mut self, node: NodeId, ty: TypeRef) {
        debug_assert_eq!(self.ast.kind(node), NodeKind::Identifier);
        self.node_types.insert(node, ty.clone());
        match self.var_map.get(node) {
            None => {
                let identifier = self.ast.token(node);
                if let Some(field_ty) = self.field_type(identifier) {
                    if !is_subtype(&ty, &field_ty) {
                        self.emit_error(node, "Incompatible types in assignment");
                    }
                } else if let Some(arg_ty) = self.arg_types.get(identifier).cloned() {
                    if !is_subtype(&ty, &arg_ty) {
                        self.emit_error(node, "Incompatible types in assignment");
                    }
                }
            }
            Some(var) => {
                if self.unreachable_here() {
                    return;
                }
                if let Some(current) = self.all_var_types.get(&var) {
                    if **current == *ty {
                        return;
                    }
                }
                let prev = self.all_var_types.get(&var).cloned();
                if let Some(frame) = self.reverse_stack.last_mut().unwrap().as_mut() {
                    frame.entry(var).or_insert(prev);
                }
                self.set_var_type(var, Some(ty));
            }
        }
    }

    fn element_type(&self, array: &TypeRef) -> TypeRef {
        if array.dims() == 0 {
            array.clone()
        } else {
            Rc::new(array.element_type())
        }
    }

    // ---- Expressions ----------------------------------------------------

    fn visit_array_get(&mut self, node: NodeId) -> TypeRef {
        let array = self.visit_expression(self.ast.expect_child(node, 0));
        if array.dims() == 0 {
            self.emit_error(node, "Operand must be an array");
        }
        let index = self.visit_expression(self.ast.expect_child(node, 1));
        if !index.is_integer_like() || index.is_more_promoted_than(&Type::int_type()) {
            self.emit_error(node, "Array index must be an integer");
        }
        self.element_type(&array)
    }

    fn compound_operation(kind: NodeKind) -> Option<NodeKind> {
        match kind {
            NodeKind::Assign => None,
            NodeKind::PlusAssign => Some(NodeKind::Plus),
            NodeKind::MinusAssign => Some(NodeKind::Minus),
            NodeKind::MultAssign => Some(NodeKind::Mult),
            NodeKind::DivAssign => Some(NodeKind::Div),
            NodeKind::ModAssign => Some(NodeKind::Mod),
            NodeKind::AndAssign => Some(NodeKind::BitwiseAnd),
            NodeKind::OrAssign => Some(NodeKind::BitwiseOr),
            NodeKind::XorAssign => Some(NodeKind::Xor),
            NodeKind::LeftShiftAssign => Some(NodeKind::LeftShift),
            NodeKind::RightShiftAssign => Some(NodeKind::RightShift),
            NodeKind::UnsignedRightShiftAssign => Some(NodeKind::UnsignedRightShift),
            kind => unreachable!("not an assignment operator: {kind:?}"),
        }
    }

    fn visit_assignment_expression(&mut self, node: NodeId) -> TypeRef {
        let lhs = self.ast.expect_child(node, 0);
        let operation = Self::compound_operation(self.ast.kind(self.ast.expect_child(node, 1)));
        let rhs = self.ast.expect_child(node, 2);

        let array_element = if self.ast.kind(lhs) == NodeKind::ArrayGet {
            Some(self.visit_expression(lhs))
        } else {
            None
        };
        let ty = match operation {
            None => self.visit_expression(rhs),
            Some(op) => self.visit_math_expression(node, lhs, Some(rhs), op),
        };
        match self.ast.kind(lhs) {
            NodeKind::Identifier => {
                self.set_var_value_type(lhs, ty.clone());
                ty
            }
            NodeKind::ArrayGet => {
                let element = array_element.unwrap();
                if !is_subtype(&ty, &element) {
                    self.emit_error(lhs, "Incorrect element type for array");
                }
                element
            }
            // Invalid left-hand sides are the CFG builder's diagnostic;
            // the value still has a type.
            _ => ty,
        }
    }

    fn visit_math_expression(
        &mut self,
        node: NodeId,
        operand1: NodeId,
        operand2: Option<NodeId>,
        operation: NodeKind,
    ) -> TypeRef {
        match operation {
            NodeKind::BitwiseAnd | NodeKind::BitwiseOr | NodeKind::Xor | NodeKind::Mod => {
                let type1 = self.visit_expression(operand1);
                if !type1.is_integer_like() {
                    self.emit_error(node, "Operand must be of an integer-like type");
                }
                let type2 = self.visit_expression(operand2.unwrap());
                if !type2.is_integer_like() {
                    self.emit_error(node, "Operand must be of an integer-like type");
                }
                lct(&type1, &type2)
            }
            NodeKind::BitwiseInvert => {
                let ty = self.visit_expression(operand1);
                if !ty.is_integer_like() {
                    self.emit_error(node, "Operand must be of an integer-like type");
                }
                ty
            }
            NodeKind::Div | NodeKind::Minus | NodeKind::Mult | NodeKind::Plus => {
                let type1 = self.visit_expression(operand1);
                if !type1.is_numeric() {
                    self.emit_error(node, "Operand must be a number");
                }
                let type2 = self.visit_expression(operand2.unwrap());
                if !type2.is_numeric() {
                    self.emit_error(node, "Operand must be a number");
                }
                lct(&type1, &type2)
            }
            NodeKind::GreaterThan
            | NodeKind::GreaterThanOrEqualTo
            | NodeKind::LessThan
            | NodeKind::LessThanOrEqualTo => {
                let type1 = self.visit_expression(operand1);
                if !type1.is_numeric() {
                    self.emit_error(node, "Operand must be a number");
                }
                let type2 = self.visit_expression(operand2.unwrap());
                if !type2.is_numeric() {
                    self.emit_error(node, "Operand must be a number");
                }
                Rc::new(Type::bool_type())
            }
            NodeKind::LeftShift | NodeKind::RightShift | NodeKind::UnsignedRightShift => {
                let type1 = self.visit_expression(operand1);
                if !type1.is_integer_like() {
                    self.emit_error(node, "Operand must be of an integer-like type");
                }
                let type2 = self.visit_expression(operand2.unwrap());
                if type2.dims() > 0 || !matches!(type2.class_name(), "Int" | "Byte") {
                    self.emit_error(node, "Operand to bit shift must be an Int or Byte");
                }
                type1
            }
            NodeKind::Negate => {
                let ty = self.visit_expression(operand1);
                if !ty.is_numeric() {
                    self.emit_error(node, "Operand must be a number");
                }
                ty
            }
            kind => unreachable!("not a math expression: {kind:?}"),
        }
    }

    fn visit_boolean_expression(&mut self, node: NodeId) -> TypeRef {
        match self.ast.kind(node) {
            NodeKind::BooleanAnd | NodeKind::BooleanOr => {
                let type1 = self.visit_expression(self.ast.expect_child(node, 0));
                if !type1.is_bool() {
                    self.emit_error(node, "Operand must be a boolean");
                }
                // The right operand only sometimes evaluates.
                self.push_branch();
                let type2 = self.visit_expression(self.ast.expect_child(node, 1));
                if !type2.is_bool() {
                    self.emit_error(node, "Operand must be a boolean");
                }
                self.pop_branch();
                Rc::new(Type::bool_type())
            }
            NodeKind::Equals | NodeKind::NotEquals => {
                self.visit_expression(self.ast.expect_child(node, 0));
                self.visit_expression(self.ast.expect_child(node, 1));
                Rc::new(Type::bool_type())
            }
            NodeKind::Not => {
                let ty = self.visit_expression(self.ast.expect_child(node, 0));
                if !ty.is_bool() {
                    self.emit_error(node, "Operand must be a boolean");
                }
                Rc::new(Type::bool_type())
            }
            NodeKind::Ternary => {
                let condition = self.visit_expression(self.ast.expect_child(node, 0));
                if !condition.is_bool() {
                    self.emit_error(node, "Operand must be a boolean");
                }
                let mut incoming = Vec::new();
                self.push_branch();
                let then_type = self.visit_expression(self.ast.expect_child(node, 1));
                incoming.push(self.pop_branch());
                self.push_branch();
                let else_type = self.visit_expression(self.ast.expect_child(node, 2));
                incoming.push(self.pop_branch());
                self.merge_incoming_branches(incoming);
                lct(&then_type, &else_type)
            }
            kind => unreachable!("not a boolean expression: {kind:?}"),
        }
    }

    fn visit_literal(&mut self, node: NodeId) -> TypeRef {
        let ty = match self.ast.kind(node) {
            NodeKind::True | NodeKind::False => Type::bool_type(),
            NodeKind::IntLiteral => {
                if has_long_suffix(self.ast.token(node)) {
                    Type::scalar("Long")
                } else {
                    Type::int_type()
                }
            }
            NodeKind::FloatLiteral => {
                let text = self.ast.token(node);
                if text.ends_with('f') || text.ends_with('F') {
                    Type::scalar("Float")
                } else {
                    Type::scalar("Double")
                }
            }
            kind => unreachable!("not a literal: {kind:?}"),
        };
        Rc::new(ty)
    }

    fn visit_var_use(&mut self, node: NodeId) -> TypeRef {
        match self.var_map.get(node) {
            None => {
                let identifier = self.ast.token(node);
                if let Some(ty) = self.arg_types.get(identifier) {
                    Rc::new(ty.clone())
                } else if let Some(ty) = self.field_type(identifier) {
                    Rc::new(ty)
                } else {
                    Rc::new(Type::object())
                }
            }
            Some(var) => {
                if self.unreachable_here() {
                    // Unreachable code still gets types; use the nearest
                    // reachable state so storage types stay meaningful.
                    return self
                        .all_var_types
                        .get(&var)
                        .cloned()
                        .unwrap_or_else(|| Rc::new(Type::object()));
                }
                if let Some(current) = self.all_var_types.get(&var).cloned() {
                    if let Some(stored) = self.node_types.get(&node).cloned() {
                        // Merging with the previous answer keeps loop
                        // re-visits from oscillating; without this the
                        // evaluator can take exponential time.
                        lct(&current, &stored)
                    } else {
                        current
                    }
                } else {
                    // Not definitely initialized; the CFG builder reports
                    // that. Substitute Object and continue.
                    Rc::new(Type::object())
                }
            }
        }
    }

    fn visit_expression_list(&mut self, node: NodeId, types: &mut Vec<TypeRef>) {
        if self.ast.kind(node) == NodeKind::ExpressionList {
            self.visit_expression_list(self.ast.expect_child(node, 0), types);
            let ty = self.visit_expression(self.ast.expect_child(node, 1));
            types.push(ty);
        } else {
            let ty = self.visit_expression(node);
            types.push(ty);
        }
    }

    /// Returns `None` for calls to void methods.
    fn visit_method_call(&mut self, node: NodeId) -> Option<TypeRef> {
        let identifier = self.ast.token(self.ast.expect_child(node, 0)).to_string();
        let mut types = Vec::new();
        if let Some(args) = self.ast.child(node, 1) {
            self.visit_expression_list(args, &mut types);
        }
        match self.method_interfaces.get(&identifier) {
            None => Some(Rc::new(Type::object())),
            Some(interface) => {
                let arg_types = interface.arg_types.clone();
                let return_type = interface.return_type.clone();
                for (ty, expected) in types.iter().zip(&arg_types) {
                    if !is_subtype(ty, expected) {
                        self.emit_error(node, "Method argument is of incorrect type");
                    }
                }
                return_type.map(Rc::new)
            }
        }
    }

    fn visit_increment_expression(&mut self, node: NodeId) -> TypeRef {
        let ty = self.visit_expression(self.ast.expect_child(node, 0));
        if !ty.is_numeric() {
            self.emit_error(
                node,
                "Increment / decrement operator may only be used on numbers",
            );
        }
        ty
    }

    fn visit_expression(&mut self, node: NodeId) -> TypeRef {
        let ty = match self.ast.kind(node) {
            NodeKind::ArrayGet => self.visit_array_get(node),
            NodeKind::ArrayLength => {
                let array = self.visit_expression(self.ast.expect_child(node, 0));
                if array.dims() == 0 {
                    self.emit_error(node, "Operand must be an array");
                }
                Rc::new(Type::int_type())
            }
            NodeKind::AssignmentExpression => self.visit_assignment_expression(node),
            NodeKind::BitwiseAnd
            | NodeKind::BitwiseInvert
            | NodeKind::BitwiseOr
            | NodeKind::Div
            | NodeKind::GreaterThan
            | NodeKind::GreaterThanOrEqualTo
            | NodeKind::LeftShift
            | NodeKind::LessThan
            | NodeKind::LessThanOrEqualTo
            | NodeKind::Minus
            | NodeKind::Mod
            | NodeKind::Mult
            | NodeKind::Negate
            | NodeKind::Plus
            | NodeKind::RightShift
            | NodeKind::UnsignedRightShift
            | NodeKind::Xor => {
                let operand1 = self.ast.expect_child(node, 0);
                let operand2 = self.ast.child(node, 1);
                self.visit_math_expression(node, operand1, operand2, self.ast.kind(node))
            }
            NodeKind::BooleanAnd
            | NodeKind::BooleanOr
            | NodeKind::Equals
            | NodeKind::Not
            | NodeKind::NotEquals
            | NodeKind::Ternary => self.visit_boolean_expression(node),
            NodeKind::True | NodeKind::False | NodeKind::IntLiteral | NodeKind::FloatLiteral => {
                self.visit_literal(node)
            }
            NodeKind::Identifier => self.visit_var_use(node),
            NodeKind::MethodCall => self
                .visit_method_call(node)
                .unwrap_or_else(|| Rc::new(Type::object())),
            NodeKind::PostDecrement
            | NodeKind::PostIncrement
            | NodeKind::PreDecrement
            | NodeKind::PreIncrement => self.visit_increment_expression(node),
            kind => unreachable!("not an expression: {kind:?}"),
        };
        match self.node_types.get(&node) {
            Some(stored) if **stored == *ty => stored.clone(),
            _ => {
                self.node_types.insert(node, ty.clone());
                *self.changed_stack.last_mut().unwrap() = true;
                ty
            }
        }
    }

    // ---- Statements -----------------------------------------------------

    fn visit_control_flow_statement(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            kind @ (NodeKind::Break | NodeKind::Continue) => {
                let count = match self.ast.child(node, 0) {
                    None => 1,
                    Some(literal) => int_literal_value(self.ast.token(literal))
                        .filter(|value| *value > 0)
                        .unwrap_or(1),
                };
                let levels = if kind == NodeKind::Break {
                    &self.break_levels
                } else {
                    &self.continue_levels
                };
                if !levels.is_empty() && !self.unreachable_here() {
                    let index = levels.len() - (count as usize).min(levels.len());
                    let target_level = levels[index];
                    let sizes = self.prev_incoming_sizes.last_mut().unwrap();
                    sizes
                        .entry(target_level)
                        .or_insert_with(|| self.incoming_stack[target_level].len());
                    let head = self.snapshot_stack.last().cloned().unwrap();
                    self.incoming_stack[target_level].push(head);
                }
            }
            NodeKind::Return => {
                if let Some(value) = self.ast.child(node, 0) {
                    let ty = self.visit_expression(value);
                    if let Some(return_type) = self.return_type.clone() {
                        if !is_subtype(&ty, &return_type) {
                            self.emit_error(node, "Return value is of incorrect type");
                        }
                    }
                }
            }
            kind => unreachable!("not a control flow statement: {kind:?}"),
        }

        // Whatever follows in this branch is unreachable: revert every
        // local the branch changed and mark the frame.
        if let Some(frame) = self.reverse_stack.last_mut().unwrap().take() {
            for (var, prev) in frame {
                self.set_var_type(var, prev);
            }
            *self.snapshot_stack.last_mut().unwrap() = None;
        }
    }

    /// The part of a loop that executes exactly once, before any trial
    /// iterations.
    fn visit_loop_initialization(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::DoWhile | NodeKind::While => {}
            NodeKind::For => self.visit_statement_list(self.ast.expect_child(node, 0)),
            NodeKind::ForIn => {
                let collection = self.visit_expression(self.ast.expect_child(node, 2));
                if collection.dims() == 0 {
                    self.emit_error(self.ast.expect_child(node, 2), "Operand must be an array");
                }
                let element = self.element_type(&collection);
                let variable = self.ast.expect_child(node, 1);
                match ast_type(self.ast, self.ast.expect_child(node, 0)) {
                    Some(declared) => {
                        if !is_subtype(&element, &declared) {
                            self.emit_error(variable, "Incompatible types in assignment");
                        }
                        self.set_var_value_type(variable, Rc::new(declared));
                    }
                    None => self.set_var_value_type(variable, element),
                }
            }
            kind => unreachable!("not a loop: {kind:?}"),
        }
    }

    /// The part of a loop that executes both unconditionally and on every
    /// iteration.
    fn visit_loop_initialization_and_iteration(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::DoWhile => {
                self.visit_statement(self.ast.expect_child(node, 0));
                self.visit_expression(self.ast.expect_child(node, 1));
            }
            NodeKind::For => {
                self.visit_expression(self.ast.expect_child(node, 1));
            }
            NodeKind::ForIn => {}
            NodeKind::While => {
                self.visit_expression(self.ast.expect_child(node, 0));
            }
            kind => unreachable!("not a loop: {kind:?}"),
        }
    }

    fn visit_loop_iteration(&mut self, node: NodeId) {
        self.push_branch();
        match self.ast.kind(node) {
            NodeKind::DoWhile => {
                self.visit_statement(self.ast.expect_child(node, 0));
                let condition = self.ast.expect_child(node, 1);
                let ty = self.visit_expression(condition);
                if !ty.is_bool() {
                    self.emit_error(condition, "Condition must be a boolean value");
                }
            }
            NodeKind::For => {
                self.visit_statement(self.ast.expect_child(node, 3));
                self.visit_statement_list(self.ast.expect_child(node, 2));
                let condition = self.ast.expect_child(node, 1);
                let ty = self.visit_expression(condition);
                if !ty.is_bool() {
                    self.emit_error(condition, "Condition must be a boolean value");
                }
            }
            NodeKind::ForIn => {
                self.visit_statement(self.ast.expect_child(node, 3));
            }
            NodeKind::While => {
                let condition = self.ast.expect_child(node, 0);
                let ty = self.visit_expression(condition);
                if !ty.is_bool() {
                    self.emit_error(condition, "Condition must be a boolean value");
                }
                self.visit_statement(self.ast.expect_child(node, 1));
            }
            kind => unreachable!("not a loop: {kind:?}"),
        }
        self.pop_branch();
    }

    /// After the first trial iteration: condense the snapshot entries the
    /// trial added (keeping one entry per local) and drop the incoming
    /// captures the trial recorded, so loop analysis stays O(n) in memory.
    fn condense_loop_iteration(&mut self, end: &Snapshot) {
        let start = self.snapshot_stack.last().cloned().unwrap();
        *self.snapshot_stack.last_mut().unwrap() = snapshot::condense(&start, end);
        let sizes = std::mem::take(self.prev_incoming_sizes.last_mut().unwrap());
        for (level, size) in sizes {
            self.incoming_stack[level].truncate(size);
        }
    }

    /// Folds the finished loop's pre-loop incoming sizes into the enclosing
    /// loop's record, so an outer trial run can reclaim them too. The
    /// enclosing record's own entries take precedence.
    fn pop_incoming_sizes(&mut self) {
        let popped = self.prev_incoming_sizes.pop().unwrap();
        let parent = self.prev_incoming_sizes.last_mut().unwrap();
        for (level, size) in popped {
            parent.entry(level).or_insert(size);
        }
    }

    /// Propagates a set changed flag to the enclosing loop's entry.
    fn propagate_changed(&mut self) {
        let len = self.changed_stack.len();
        if len >= 2 && self.changed_stack[len - 1] {
            self.changed_stack[len - 2] = true;
        }
    }

    fn visit_loop(&mut self, node: NodeId) {
        self.visit_loop_initialization(node);
        self.push_break_level();
        self.push_continue_level();
        let snapshot_before = self.snapshot_stack.last().cloned().unwrap();
        self.prev_incoming_sizes.push(HashMap::new());
        self.checking_stack.push(true);
        if self.ast.kind(node) != NodeKind::DoWhile {
            self.visit_loop_initialization_and_iteration(node);
            self.changed_stack.push(true);
        } else {
            // A do-while body runs unconditionally, so its first visit is
            // part of initialization; iterate again only if it changed
            // something.
            self.changed_stack.push(false);
            self.visit_loop_initialization_and_iteration(node);
            self.propagate_changed();
        }

        // Trial iterations until a pass reaches a fixpoint.
        let mut first = true;
        while *self.changed_stack.last().unwrap() {
            if first {
                self.condense_loop_iteration(&snapshot_before);
                first = false;
            }
            *self.changed_stack.last_mut().unwrap() = false;
            self.visit_loop_iteration(node);
            self.propagate_changed();
        }

        self.pop_incoming_sizes();
        self.checking_stack.pop();
        self.changed_stack.pop();
        if !*self.checking_stack.last().unwrap() {
            // One more pass over the body, emitting diagnostics this time.
            // Skipped inside an enclosing trial run, which is what keeps
            // nested loops from going exponential.
            self.visit_loop_iteration(node);
        }

        let head = self.snapshot_stack.last().cloned().unwrap();
        self.incoming_stack.last_mut().unwrap().push(head);
        self.pop_break_level();
        let head = self.snapshot_stack.last().cloned().unwrap();
        self.incoming_stack.last_mut().unwrap().push(head);
        self.pop_continue_level();
    }

    fn visit_case_list(&mut self, node: NodeId, has_default: &mut bool) {
        if self.ast.kind(node) == NodeKind::EmptyCaseList {
            return;
        }
        debug_assert_eq!(self.ast.kind(node), NodeKind::CaseList);
        self.visit_case_list(self.ast.expect_child(node, 0), has_default);
        let label = self.ast.expect_child(node, 1);
        if self.ast.kind(label) == NodeKind::CaseLabelDefault {
            *has_default = true;
        } else {
            let literal = self.ast.expect_child(label, 0);
            self.visit_expression(literal);
            if has_long_suffix(self.ast.token(literal)) {
                self.emit_error(label, "Type of case value must be Int");
            }
        }
        let statements = self.ast.expect_child(node, 2);
        if self.ast.kind(statements) != NodeKind::EmptyStatementList {
            self.push_branch();
            self.visit_statement_list(statements);
            self.pop_branch();
        }
    }

    fn visit_selection_statement(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::If => {
                let condition = self.ast.expect_child(node, 0);
                let ty = self.visit_expression(condition);
                if !ty.is_bool() {
                    self.emit_error(condition, "Condition must be a boolean value");
                }
                self.push_branch();
                self.visit_statement(self.ast.expect_child(node, 1));
                self.pop_branch();
            }
            NodeKind::IfElse => {
                let condition = self.ast.expect_child(node, 0);
                let ty = self.visit_expression(condition);
                if !ty.is_bool() {
                    self.emit_error(condition, "Condition must be a boolean value");
                }
                self.push_branch();
                self.visit_statement(self.ast.expect_child(node, 1));
                let then_reachable = !self.unreachable_here();
                let then_head = self.pop_branch();
                self.push_branch();
                self.visit_statement(self.ast.expect_child(node, 2));
                let else_reachable = !self.unreachable_here();
                let else_head = self.pop_branch();
                let mut incoming = Vec::new();
                if then_reachable {
                    incoming.push(then_head);
                }
                if else_reachable {
                    incoming.push(else_head);
                }
                self.merge_incoming_branches(incoming);
            }
            NodeKind::Switch => {
                // Unlike if-else, the arms need no explicit merge: every
                // case records its departures against the switch's break
                // target, so popping the break level does the merging.
                self.push_break_level();
                let scrutinee = self.ast.expect_child(node, 0);
                let ty = self.visit_expression(scrutinee);
                if !ty.is_integer_like() || ty.class_name() == "Long" {
                    self.emit_error(scrutinee, "Operand must be an Int or Byte");
                }
                let mut has_default = false;
                self.visit_case_list(self.ast.expect_child(node, 1), &mut has_default);
                if !has_default {
                    // The scrutinee may match nothing and fall out.
                    let head = self.snapshot_stack.last().cloned().unwrap();
                    self.incoming_stack.last_mut().unwrap().push(head);
                }
                self.pop_break_level();
            }
            kind => unreachable!("not a selection statement: {kind:?}"),
        }
    }

    fn visit_var_declaration_item(&mut self, node: NodeId, declared: Option<&Type>) {
        match self.ast.kind(node) {
            NodeKind::Identifier => {}
            NodeKind::AssignmentExpression => {
                let source = self.visit_expression(self.ast.expect_child(node, 2));
                let identifier = self.ast.expect_child(node, 0);
                if self.var_map.get(identifier).is_some() {
                    // A local: an explicit declared type pins the initial
                    // type; var/auto takes the initializer's type.
                    let ty = match declared {
                        Some(declared) => {
                            if !is_subtype(&source, declared) {
                                self.emit_error(node, "Incompatible types in assignment");
                            }
                            Rc::new(declared.clone())
                        }
                        None => source,
                    };
                    self.set_var_value_type(identifier, ty);
                } else {
                    if self.declaring_fields && declared.is_none() {
                        let name = self.ast.token(identifier).to_string();
                        self.inferred_field_types.insert(name, (*source).clone());
                    }
                    self.set_var_value_type(identifier, source);
                }
            }
            kind => unreachable!("not a variable declaration item: {kind:?}"),
        }
    }

    fn visit_var_declaration_list(&mut self, node: NodeId, declared: Option<&Type>) {
        if self.ast.kind(node) == NodeKind::VarDeclarationList {
            self.visit_var_declaration_list(self.ast.expect_child(node, 0), declared);
            self.visit_var_declaration_item(self.ast.expect_child(node, 1), declared);
        } else {
            self.visit_var_declaration_item(node, declared);
        }
    }

    fn visit_statement(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::AssignmentExpression
            | NodeKind::PostDecrement
            | NodeKind::PostIncrement
            | NodeKind::PreDecrement
            | NodeKind::PreIncrement => {
                self.visit_expression(node);
            }
            NodeKind::Block => self.visit_statement_list(self.ast.expect_child(node, 0)),
            NodeKind::Break | NodeKind::Continue | NodeKind::Return => {
                self.visit_control_flow_statement(node)
            }
            NodeKind::DoWhile | NodeKind::For | NodeKind::ForIn | NodeKind::While => {
                self.visit_loop(node)
            }
            NodeKind::EmptyStatement => {}
            NodeKind::If | NodeKind::IfElse | NodeKind::Switch => {
                self.visit_selection_statement(node)
            }
            NodeKind::MethodCall => {
                self.visit_method_call(node);
            }
            NodeKind::VarDeclaration => {
                let declared = ast_type(self.ast, self.ast.expect_child(node, 0));
                self.visit_var_declaration_list(self.ast.expect_child(node, 1), declared.as_ref());
            }
            kind => unreachable!("not a statement: {kind:?}"),
        }
    }

    fn visit_statement_list(&mut self, node: NodeId) {
        if self.ast.kind(node) == NodeKind::EmptyStatementList {
            return;
        }
        debug_assert_eq!(self.ast.kind(node), NodeKind::StatementList);
        self.visit_statement_list(self.ast.expect_child(node, 0));
        self.visit_statement(self.ast.expect_child(node, 1));
    }

    fn visit_arg(&mut self, node: NodeId) {
        debug_assert_eq!(self.ast.kind(node), NodeKind::Arg);
        let identifier = self.ast.token(self.ast.expect_child(node, 1)).to_string();
        if let std::collections::hash_map::Entry::Vacant(entry) = self.arg_types.entry(identifier)
        {
            if let Some(ty) = ast_type(self.ast, self.ast.expect_child(node, 0)) {
                entry.insert(ty);
            }
        }
    }

    fn visit_arg_list(&mut self, node: NodeId) {
        if self.ast.kind(node) == NodeKind::Arg {
            self.visit_arg(node);
        } else {
            debug_assert_eq!(self.ast.kind(node), NodeKind::ArgList);
            self.visit_arg_list(self.ast.expect_child(node, 0));
            self.visit_arg(self.ast.expect_child(node, 1));
        }
    }
}

/// Evaluates the expression types of one `MethodDefinition` node.
pub fn evaluate_method(
    ast: &Ast,
    method: NodeId,
    field_types: &IndexMap<String, Type>,
    var_map: &VarMap,
    method_interfaces: &IndexMap<String, MethodInterface>,
    diagnostics: &mut Diagnostics,
) -> TypeEvaluation {
    debug_assert_eq!(ast.kind(method), NodeKind::MethodDefinition);
    let return_type_node = ast.expect_child(method, 0);
    let return_type = if ast.kind(return_type_node) == NodeKind::Void {
        None
    } else {
        ast_type(ast, return_type_node)
    };
    let mut evaluator = TypeEvaluator::new(
        ast,
        field_types,
        var_map,
        method_interfaces,
        diagnostics,
        return_type,
        false,
    );
    if let Some(args) = ast.child(method, 2) {
        evaluator.visit_arg_list(args);
    }
    evaluator.visit_statement_list(ast.expect_child(method, 3));
    TypeEvaluation {
        node_types: evaluator.node_types,
    }
}

/// Evaluates the field-initializer expressions of a class, in declaration
/// order. Returns the evaluation plus the types inferred for `var` fields.
pub fn evaluate_field_initializers(
    ast: &Ast,
    declarations: &[NodeId],
    field_types: &IndexMap<String, Type>,
    method_interfaces: &IndexMap<String, MethodInterface>,
    diagnostics: &mut Diagnostics,
) -> (TypeEvaluation, IndexMap<String, Type>) {
    let var_map = VarMap::default();
    let mut evaluator = TypeEvaluator::new(
        ast,
        field_types,
        &var_map,
        method_interfaces,
        diagnostics,
        None,
        true,
    );
    for declaration in declarations {
        evaluator.visit_statement(*declaration);
    }
    (
        TypeEvaluation {
            node_types: evaluator.node_types,
        },
        evaluator.inferred_field_types,
    )
}
