//! CFG construction for one method.
//!
//! Walks a method AST top-down, appending three-address statements.
//! Compilation leans on the earlier analyses: identifier occurrences come
//! pre-resolved, every expression node carries its evaluated type, and the
//! break-flow analysis answers fall-through questions. What remains here is
//! lowering (labels, temporaries, conditional jumps) plus the structural
//! diagnostics: definite assignment, argument counts, return presence,
//! switch shape, and break/continue counts.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use jay_cfg::{
    Label, Method, MethodInterface, Op, Operand, ReducedType, Statement, Type, Universe,
    UniverseSet, Value, VarId, VarTable,
};

use crate::analyze::break_flow::BreakFlow;
use crate::analyze::resolve::{LocalId, VarMap};
use crate::analyze::type_eval::TypeEvaluation;
use crate::analyze::ast_type;
use crate::diagnostics::Diagnostics;
use crate::parser::literals::{
    double_literal_value, float_literal_value, has_float_suffix, has_long_suffix,
    int_literal_value,
};
use crate::parser::{Ast, NodeId, NodeKind};

pub struct MethodCompiler<'a> {
    ast: &'a Ast,
    types: &'a TypeEvaluation,
    /// Storage type per local, the least common type over its occurrences.
    local_types: HashMap<LocalId, Type>,
    var_map: &'a VarMap,
    method_interfaces: &'a IndexMap<String, MethodInterface>,
    field_vars: &'a HashMap<String, Operand>,
    vars: &'a mut VarTable,
    diagnostics: &'a mut Diagnostics,
    statements: Vec<Statement>,
    arg_vars: HashMap<String, Operand>,
    local_operands: HashMap<LocalId, Operand>,
    next_label: u32,
    break_flow: BreakFlow<'a>,
    var_universe: Universe<VarId>,
    /// Locals definitely initialized at the current point. When the point
    /// is unreachable, the set of the nearest reachable parent branch.
    all_initialized: UniverseSet<VarId>,
    /// Per open branch: the locals it initialized (beyond its parents).
    /// `None` marks an unreachable point.
    initialized_stack: Vec<Option<UniverseSet<VarId>>>,
    /// Per break/continue/loop-end label: the initialized sets captured at
    /// the reachable departures that target it.
    incoming_initialized: HashMap<Label, Vec<UniverseSet<VarId>>>,
}

impl<'a> MethodCompiler<'a> {
    pub fn new(
        ast: &'a Ast,
        types: &'a TypeEvaluation,
        var_map: &'a VarMap,
        method_interfaces: &'a IndexMap<String, MethodInterface>,
        field_vars: &'a HashMap<String, Operand>,
        vars: &'a mut VarTable,
        diagnostics: &'a mut Diagnostics,
        return_var: Option<Operand>,
    ) -> Self {
        let mut next_label = 0;
        let return_label = Label(next_label);
        next_label += 1;
        let var_universe = Universe::new();
        let all_initialized = UniverseSet::new(&var_universe);
        Self {
            ast,
            types,
            local_types: types.local_storage_types(var_map),
            var_map,
            method_interfaces,
            field_vars,
            vars,
            diagnostics,
            statements: Vec::new(),
            arg_vars: HashMap::new(),
            local_operands: HashMap::new(),
            next_label,
            break_flow: BreakFlow::new(ast, return_var, return_label),
            var_universe,
            all_initialized,
            initialized_stack: Vec::new(),
            incoming_initialized: HashMap::new(),
        }
    }

    fn emit_error(&mut self, node: NodeId, message: &str) {
        self.diagnostics.error(message, self.ast.line(node));
    }

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn full(&self, node: NodeId) -> &Type {
        self.types.full(node)
    }

    fn temp_for(&mut self, node: NodeId) -> Operand {
        Operand::Var(self.vars.alloc_temp(self.types.reduced(node)))
    }

    fn temp(&mut self, reduced: ReducedType) -> Operand {
        Operand::Var(self.vars.alloc_temp(reduced))
    }

    fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    fn push_label(&mut self, label: Label) {
        self.statements.push(Statement::from_label(label));
    }

    // ---- Initialized-variable tracking ----------------------------------

    fn reachable(&self) -> bool {
        !matches!(self.initialized_stack.last(), Some(None))
    }

    fn push_initialized_branch(&mut self) {
        if self.reachable() {
            self.initialized_stack
                .push(Some(UniverseSet::new(&self.var_universe)));
        } else {
            self.initialized_stack.push(None);
        }
    }

    /// Discards a branch whose initializations must not survive it (an
    /// `if` without `else`, a loop body).
    fn pop_initialized_branch(&mut self) {
        if let Some(set) = self.initialized_stack.pop().expect("unbalanced branch stack") {
            self.all_initialized.difference(&set);
        }
    }

    /// Marks the current point unreachable.
    fn mark_unreachable(&mut self) {
        self.pop_initialized_branch();
        self.initialized_stack.push(None);
    }

    fn mark_var_initialized(&mut self, operand: Operand) {
        let Operand::Var(id) = operand else { return };
        let info = self.vars.info(id);
        if info.is_field || info.identifier.is_empty() {
            return;
        }
        if !self.all_initialized.contains(&id) && self.reachable() {
            self.all_initialized.add(&id);
            if let Some(top) = self.initialized_stack.last_mut().unwrap().as_mut() {
                top.add(&id);
            }
        }
    }

    /// Accounts for the break/continue statements that target `label`:
    /// every arriving snapshot is intersected into the current branch.
    fn merge_incoming_initialized(&mut self, label: Label) {
        let Some(incoming) = self.incoming_initialized.remove(&label) else {
            return;
        };
        if !self.reachable() {
            *self.initialized_stack.last_mut().unwrap() = Some(incoming[0].clone());
        }
        let top = self.initialized_stack.last_mut().unwrap().as_mut().unwrap();
        self.all_initialized.difference(top);
        for set in &incoming {
            top.intersect(set);
        }
        self.all_initialized.union_with(top);
    }

    // ---- Variables ------------------------------------------------------

    /// The operand for an identifier occurrence. With `must_be_initialized`
    /// (a right-hand-side read), reports locals that are not definitely
    /// initialized at a reachable point.
    fn var_operand(&mut self, node: NodeId, must_be_initialized: bool) -> Operand {
        debug_assert_eq!(self.ast.kind(node), NodeKind::Identifier);
        match self.var_map.get(node) {
            Some(local) => {
                let operand = *self
                    .local_operands
                    .get(&local)
                    .expect("variable used before it was created");
                if must_be_initialized && self.reachable() {
                    if let Operand::Var(id) = operand {
                        if !self.all_initialized.contains(&id) {
                            self.emit_error(
                                node,
                                "Variable may be used before it is initialized",
                            );
                        }
                    }
                }
                operand
            }
            None => {
                let identifier = self.ast.token(node);
                if let Some(operand) = self.arg_vars.get(identifier) {
                    *operand
                } else if let Some(operand) = self.field_vars.get(identifier) {
                    *operand
                } else {
                    // Undeclared; the resolver already reported it.
                    Operand::Var(self.vars.alloc_temp(ReducedType::Object))
                }
            }
        }
    }

    /// The storage type of the local declared at `node`, when the type
    /// evaluation saw any occurrence of it.
    fn local_storage_reduced(&self, node: NodeId) -> Option<ReducedType> {
        let local = self.var_map.get(node)?;
        self.local_types.get(&local).map(Type::reduced)
    }

    /// Creates the operand for a variable declared at `node`.
    fn create_var(&mut self, node: NodeId, reduced: ReducedType, is_arg: bool) -> Operand {
        debug_assert_eq!(self.ast.kind(node), NodeKind::Identifier);
        let identifier = self.ast.token(node).to_string();
        let id = self.vars.alloc(reduced, identifier.clone(), false);
        let operand = Operand::Var(id);
        if is_arg {
            self.arg_vars.insert(identifier, operand);
        } else {
            let local = self
                .var_map
                .get(node)
                .expect("declaration without a resolved id");
            self.local_operands.insert(local, operand);
        }
        operand
    }

    // ---- Expressions ----------------------------------------------------

    fn literal_operand(&mut self, node: NodeId) -> Operand {
        match self.ast.kind(node) {
            NodeKind::True => Operand::Literal(Value::Bool(true)),
            NodeKind::False => Operand::Literal(Value::Bool(false)),
            NodeKind::IntLiteral => {
                let text = self.ast.token(node);
                let is_long = has_long_suffix(text);
                match int_literal_value(text) {
                    Some(value) if is_long => Operand::Literal(Value::Long(value)),
                    Some(value) => Operand::Literal(Value::Int(value as i32)),
                    None => {
                        if is_long {
                            self.emit_error(node, "Literal value is too large for Long data type");
                            Operand::Literal(Value::Long(0))
                        } else {
                            self.emit_error(node, "Literal value is too large for Int data type");
                            Operand::Literal(Value::Int(0))
                        }
                    }
                }
            }
            NodeKind::FloatLiteral => {
                let text = self.ast.token(node);
                if has_float_suffix(text) {
                    Operand::Literal(Value::Float(float_literal_value(text)))
                } else {
                    Operand::Literal(Value::Double(double_literal_value(text)))
                }
            }
            kind => unreachable!("not a literal: {kind:?}"),
        }
    }

    fn binary_op(kind: NodeKind) -> Op {
        match kind {
            NodeKind::BitwiseAnd | NodeKind::AndAssign => Op::BitwiseAnd,
            NodeKind::BitwiseOr | NodeKind::OrAssign => Op::BitwiseOr,
            NodeKind::Div | NodeKind::DivAssign => Op::Div,
            NodeKind::Equals => Op::Equals,
            NodeKind::GreaterThan => Op::GreaterThan,
            NodeKind::GreaterThanOrEqualTo => Op::GreaterThanOrEqualTo,
            NodeKind::LeftShift | NodeKind::LeftShiftAssign => Op::LeftShift,
            NodeKind::LessThan => Op::LessThan,
            NodeKind::LessThanOrEqualTo => Op::LessThanOrEqualTo,
            NodeKind::Minus | NodeKind::MinusAssign => Op::Minus,
            NodeKind::Mod | NodeKind::ModAssign => Op::Mod,
            NodeKind::Mult | NodeKind::MultAssign => Op::Mult,
            NodeKind::NotEquals => Op::NotEquals,
            NodeKind::Plus | NodeKind::PlusAssign => Op::Plus,
            NodeKind::RightShift | NodeKind::RightShiftAssign => Op::RightShift,
            NodeKind::UnsignedRightShift | NodeKind::UnsignedRightShiftAssign => {
                Op::UnsignedRightShift
            }
            NodeKind::Xor | NodeKind::XorAssign => Op::Xor,
            kind => unreachable!("no binary operation for {kind:?}"),
        }
    }

    /// Whether an indexing expression is well-formed enough to lower to
    /// `ArrayGet`/`ArraySet`. The type errors themselves were already
    /// reported during type evaluation.
    fn array_element_valid(&self, array_node: NodeId, index_node: NodeId) -> bool {
        let array = self.full(array_node);
        let index = self.full(index_node);
        array.dims() > 0
            && index.is_integer_like()
            && !index.is_more_promoted_than(&Type::int_type())
    }

    /// Emits an `ArrayGet`, or a suitable substitute when the operands are
    /// not actually indexable.
    fn append_array_get(
        &mut self,
        index_node: NodeId,
        array_node: NodeId,
        array: Operand,
        index: Operand,
    ) -> Operand {
        if self.full(array_node).dims() == 0 {
            return array;
        }
        let index = if self.array_element_valid(array_node, index_node) {
            index
        } else {
            Operand::Literal(Value::Int(0))
        };
        let destination = self.temp(self.full(array_node).element_type().reduced());
        self.push(Statement::new(
            Op::ArrayGet,
            Some(destination),
            array,
            Some(index),
        ));
        destination
    }

    /// Lowers `&&`/`||`/`!`/constant conditions into direct conditional
    /// jumps, avoiding the temporaries a `compile_expression` of the same
    /// node would produce.
    fn compile_conditional_jump(&mut self, node: NodeId, true_label: Label, false_label: Label) {
        match self.ast.kind(node) {
            NodeKind::BooleanAnd => {
                let intermediate = self.fresh_label();
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 0),
                    intermediate,
                    false_label,
                );
                self.push_label(intermediate);
                self.push_initialized_branch();
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 1),
                    true_label,
                    false_label,
                );
                self.pop_initialized_branch();
            }
            NodeKind::BooleanOr => {
                let intermediate = self.fresh_label();
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 0),
                    true_label,
                    intermediate,
                );
                self.push_label(intermediate);
                self.push_initialized_branch();
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 1),
                    true_label,
                    false_label,
                );
                self.pop_initialized_branch();
            }
            NodeKind::Not => {
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 0),
                    false_label,
                    true_label,
                );
            }
            NodeKind::True => self.push(Statement::jump(true_label)),
            NodeKind::False => self.push(Statement::jump(false_label)),
            _ => {
                let operand = self.compile_expression(node);
                self.push(Statement::branch(operand, true_label, false_label));
            }
        }
    }

    fn compile_math_expression(&mut self, node: NodeId) -> Operand {
        match self.ast.kind(node) {
            NodeKind::BitwiseInvert | NodeKind::Negate => {
                let operand = self.compile_expression(self.ast.expect_child(node, 0));
                let destination = self.temp_for(node);
                let op = if self.ast.kind(node) == NodeKind::Negate {
                    Op::Negate
                } else {
                    Op::BitwiseInvert
                };
                self.push(Statement::new(op, Some(destination), operand, None));
                destination
            }
            kind => {
                let source1 = self.compile_expression(self.ast.expect_child(node, 0));
                let source2 = self.compile_expression(self.ast.expect_child(node, 1));
                let destination = self.temp_for(node);
                self.push(Statement::new(
                    Self::binary_op(kind),
                    Some(destination),
                    source1,
                    Some(source2),
                ));
                destination
            }
        }
    }

    fn compile_boolean_expression(&mut self, node: NodeId) -> Operand {
        match self.ast.kind(node) {
            NodeKind::BooleanAnd | NodeKind::BooleanOr => {
                let destination = self.temp(ReducedType::Bool);
                let true_label = self.fresh_label();
                let false_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.compile_conditional_jump(node, true_label, false_label);
                self.push_label(true_label);
                self.push(Statement::new(
                    Op::Assign,
                    Some(destination),
                    Operand::Literal(Value::Bool(true)),
                    None,
                ));
                self.push(Statement::jump(end_label));
                self.push_label(false_label);
                self.push(Statement::new(
                    Op::Assign,
                    Some(destination),
                    Operand::Literal(Value::Bool(false)),
                    None,
                ));
                self.push_label(end_label);
                destination
            }
            NodeKind::Equals | NodeKind::NotEquals => self.compile_math_expression(node),
            NodeKind::Not => {
                let operand = self.compile_expression(self.ast.expect_child(node, 0));
                let destination = self.temp(ReducedType::Bool);
                self.push(Statement::new(Op::Not, Some(destination), operand, None));
                destination
            }
            NodeKind::Ternary => {
                let destination = self.temp_for(node);
                let true_label = self.fresh_label();
                let false_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.compile_conditional_jump(self.ast.expect_child(node, 0), true_label, false_label);

                self.push_initialized_branch();
                self.push_label(true_label);
                let true_value = self.compile_expression(self.ast.expect_child(node, 1));
                self.push(Statement::new(Op::Assign, Some(destination), true_value, None));
                self.push(Statement::jump(end_label));
                let then_set = self.initialized_stack.pop().unwrap();
                if let Some(set) = &then_set {
                    self.all_initialized.difference(set);
                }

                self.push_initialized_branch();
                self.push_label(false_label);
                let false_value = self.compile_expression(self.ast.expect_child(node, 2));
                self.push(Statement::new(Op::Assign, Some(destination), false_value, None));
                self.push_label(end_label);
                let else_set = self.initialized_stack.pop().unwrap();
                if let Some(set) = &else_set {
                    self.all_initialized.difference(set);
                }

                self.merge_branch_pair(then_set, else_set);
                destination
            }
            kind => unreachable!("not a boolean expression: {kind:?}"),
        }
    }

    /// Joins two closed arms: locals initialized in both survive; two
    /// unreachable arms make the join unreachable.
    fn merge_branch_pair(
        &mut self,
        then_set: Option<UniverseSet<VarId>>,
        else_set: Option<UniverseSet<VarId>>,
    ) {
        let merged = match (then_set, else_set) {
            (None, None) => None,
            (Some(set), None) | (None, Some(set)) => Some(set),
            (Some(mut then_set), Some(else_set)) => {
                then_set.intersect(&else_set);
                Some(then_set)
            }
        };
        match merged {
            None => self.mark_unreachable(),
            Some(set) => {
                if let Some(top) = self.initialized_stack.last_mut().unwrap().as_mut() {
                    top.union_with(&set);
                    self.all_initialized.union_with(&set);
                }
            }
        }
    }

    fn compile_assignment_expression(&mut self, node: NodeId) -> Operand {
        let lhs = self.ast.expect_child(node, 0);
        let op_kind = self.ast.kind(self.ast.expect_child(node, 1));
        let rhs = self.ast.expect_child(node, 2);
        let is_compound = op_kind != NodeKind::Assign;

        match self.ast.kind(lhs) {
            NodeKind::Identifier => {
                let destination = self.var_operand(lhs, is_compound);
                let mut source = self.compile_expression(rhs);
                if is_compound {
                    let result = self.temp_for(node);
                    self.push(Statement::new(
                        Self::binary_op(op_kind),
                        Some(result),
                        destination,
                        Some(source),
                    ));
                    source = result;
                }
                self.push(Statement::new(Op::Assign, Some(destination), source, None));
                self.mark_var_initialized(destination);
                destination
            }
            NodeKind::ArrayGet => {
                let array_node = self.ast.expect_child(lhs, 0);
                let index_node = self.ast.expect_child(lhs, 1);
                let array = self.compile_expression(array_node);
                let index = self.compile_expression(index_node);
                let valid = self.array_element_valid(array_node, index_node);
                let destination = if valid && is_compound {
                    self.append_array_get(index_node, array_node, array, index)
                } else {
                    self.temp_for(lhs)
                };
                let mut source = self.compile_expression(rhs);
                if is_compound {
                    let result = self.temp_for(node);
                    self.push(Statement::new(
                        Self::binary_op(op_kind),
                        Some(result),
                        destination,
                        Some(source),
                    ));
                    source = result;
                }
                self.push(Statement::new(Op::Assign, Some(destination), source, None));
                if valid {
                    self.push(Statement::new(
                        Op::ArraySet,
                        Some(array),
                        index,
                        Some(destination),
                    ));
                }
                destination
            }
            _ => {
                self.emit_error(
                    node,
                    "Invalid left-hand side; must be a variable or an array element",
                );
                self.compile_expression(lhs);
                self.compile_expression(rhs)
            }
        }
    }

    fn compile_increment_expression(&mut self, node: NodeId) -> Operand {
        let target = self.ast.expect_child(node, 0);
        if !matches!(
            self.ast.kind(target),
            NodeKind::Identifier | NodeKind::ArrayGet
        ) {
            self.emit_error(
                node,
                "Increment / decrement operator may only be used on variables or array elements",
            );
            return self.compile_expression(target);
        }

        let mut array_access: Option<(Operand, Operand)> = None;
        let operand = if self.ast.kind(target) == NodeKind::Identifier {
            self.var_operand(target, true)
        } else {
            let array_node = self.ast.expect_child(target, 0);
            let index_node = self.ast.expect_child(target, 1);
            let array = self.compile_expression(array_node);
            let index = self.compile_expression(index_node);
            if self.array_element_valid(array_node, index_node) {
                array_access = Some((array, index));
            }
            self.append_array_get(index_node, array_node, array, index)
        };

        let destination = if self.ast.kind(target) == NodeKind::Identifier {
            operand
        } else {
            self.temp_for(target)
        };
        let op = match self.ast.kind(node) {
            NodeKind::PostIncrement | NodeKind::PreIncrement => Op::Plus,
            _ => Op::Minus,
        };
        let result = match self.ast.kind(node) {
            NodeKind::PostDecrement | NodeKind::PostIncrement => {
                let result = self.temp_for(node);
                self.push(Statement::new(Op::Assign, Some(result), operand, None));
                self.push(Statement::new(
                    op,
                    Some(destination),
                    operand,
                    Some(Operand::one()),
                ));
                result
            }
            _ => {
                self.push(Statement::new(
                    op,
                    Some(destination),
                    operand,
                    Some(Operand::one()),
                ));
                destination
            }
        };
        if let Some((array, index)) = array_access {
            self.push(Statement::new(
                Op::ArraySet,
                Some(array),
                index,
                Some(destination),
            ));
        }
        result
    }

    fn compile_method_call_args(
        &mut self,
        node: NodeId,
        max_args: usize,
        args: &mut Vec<Operand>,
        overflow_reported: &mut bool,
    ) {
        let arg = if self.ast.kind(node) == NodeKind::ExpressionList {
            self.compile_method_call_args(
                self.ast.expect_child(node, 0),
                max_args,
                args,
                overflow_reported,
            );
            self.compile_expression(self.ast.expect_child(node, 1))
        } else {
            self.compile_expression(node)
        };
        if args.len() == max_args {
            // Report the overflow once, at the first surplus argument.
            if !*overflow_reported {
                *overflow_reported = true;
                self.emit_error(node, "Too many arguments to method call");
            }
        } else {
            args.push(arg);
        }
    }

    /// Returns the destination operand, or `None` for void methods.
    fn compile_method_call(&mut self, node: NodeId) -> Option<Operand> {
        let identifier = self.ast.token(self.ast.expect_child(node, 0)).to_string();
        let Some(interface) = self.method_interfaces.get(&identifier) else {
            self.emit_error(node, "Calling an unknown method");
            return Some(Operand::Literal(Value::Int(0)));
        };
        let arg_count = interface.arg_types.len();
        let destination = interface
            .return_type
            .as_ref()
            .map(|ty| ty.reduced())
            .map(|reduced| self.temp(reduced));
        let mut args = Vec::new();
        let mut overflow_reported = false;
        if let Some(list) = self.ast.child(node, 1) {
            self.compile_method_call_args(list, arg_count, &mut args, &mut overflow_reported);
        }
        if args.len() < arg_count {
            self.emit_error(node, "Too few arguments to method call");
        } else {
            self.push(Statement::method_call(identifier, args, destination));
        }
        destination
    }

    fn compile_expression(&mut self, node: NodeId) -> Operand {
        match self.ast.kind(node) {
            NodeKind::ArrayGet => {
                let array_node = self.ast.expect_child(node, 0);
                let index_node = self.ast.expect_child(node, 1);
                let array = self.compile_expression(array_node);
                let index = self.compile_expression(index_node);
                self.append_array_get(index_node, array_node, array, index)
            }
            NodeKind::ArrayLength => {
                let array_node = self.ast.expect_child(node, 0);
                let array = self.compile_expression(array_node);
                if self.full(array_node).dims() == 0 {
                    return array;
                }
                let destination = self.temp(ReducedType::Int);
                self.push(Statement::new(Op::ArrayLength, Some(destination), array, None));
                destination
            }
            NodeKind::AssignmentExpression => self.compile_assignment_expression(node),
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
            | NodeKind::Xor => self.compile_math_expression(node),
            NodeKind::BooleanAnd
            | NodeKind::BooleanOr
            | NodeKind::Equals
            | NodeKind::Not
            | NodeKind::NotEquals
            | NodeKind::Ternary => self.compile_boolean_expression(node),
            NodeKind::True | NodeKind::False | NodeKind::IntLiteral | NodeKind::FloatLiteral => {
                self.literal_operand(node)
            }
            NodeKind::Identifier => self.var_operand(node, true),
            NodeKind::MethodCall => match self.compile_method_call(node) {
                Some(destination) => destination,
                None => {
                    self.emit_error(node, "Cannot use the return value of a void method");
                    Operand::Literal(Value::Int(0))
                }
            },
            NodeKind::PostDecrement
            | NodeKind::PostIncrement
            | NodeKind::PreDecrement
            | NodeKind::PreIncrement => self.compile_increment_expression(node),
            kind => unreachable!("not an expression: {kind:?}"),
        }
    }

    // ---- Declarations ---------------------------------------------------

    fn compile_var_declaration_item(&mut self, node: NodeId, declared: Option<&Type>) {
        match self.ast.kind(node) {
            NodeKind::AssignmentExpression => {
                let source = self.compile_expression(self.ast.expect_child(node, 2));
                let identifier = self.ast.expect_child(node, 0);
                let reduced = self
                    .local_storage_reduced(identifier)
                    .unwrap_or_else(|| self.types.reduced(identifier));
                let destination = self.create_var(identifier, reduced, false);
                self.push(Statement::new(Op::Assign, Some(destination), source, None));
                self.mark_var_initialized(destination);
            }
            NodeKind::Identifier => {
                let declared_reduced = match declared {
                    Some(ty) => ty.reduced(),
                    None => {
                        self.emit_error(
                            node,
                            "Usage of the auto type is limited to variables that are assigned \
                             in their declaration statement",
                        );
                        ReducedType::Int
                    }
                };
                let reduced = self.local_storage_reduced(node).unwrap_or(declared_reduced);
                self.create_var(node, reduced, false);
            }
            kind => unreachable!("not a variable declaration item: {kind:?}"),
        }
    }

    fn compile_var_declaration_list(&mut self, node: NodeId, declared: Option<&Type>) {
        if self.ast.kind(node) == NodeKind::VarDeclarationList {
            self.compile_var_declaration_list(self.ast.expect_child(node, 0), declared);
            self.compile_var_declaration_item(self.ast.expect_child(node, 1), declared);
        } else {
            self.compile_var_declaration_item(node, declared);
        }
    }

    // ---- Control flow ---------------------------------------------------

    fn compile_loop(&mut self, node: NodeId) {
        let continue_label = self.fresh_label();
        let end_label = self.fresh_label();
        self.break_flow.push_break_target(end_label);
        self.break_flow.push_continue_target(continue_label);
        match self.ast.kind(node) {
            NodeKind::DoWhile => {
                let start_label = self.fresh_label();
                self.push_label(start_label);
                self.compile_statement(self.ast.expect_child(node, 0));
                self.push_label(continue_label);
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 1),
                    start_label,
                    end_label,
                );
            }
            NodeKind::For => {
                let start_label = self.fresh_label();
                let body_label = self.fresh_label();
                self.compile_statement_list(self.ast.expect_child(node, 0));
                self.push_label(start_label);
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 1),
                    body_label,
                    end_label,
                );
                self.push_label(body_label);
                self.push_initialized_branch();
                self.compile_statement(self.ast.expect_child(node, 3));
                self.push_label(continue_label);
                self.compile_statement_list(self.ast.expect_child(node, 2));
                self.push(Statement::jump(start_label));
                self.pop_initialized_branch();
            }
            NodeKind::ForIn => {
                let collection_node = self.ast.expect_child(node, 2);
                let collection = self.compile_expression(collection_node);
                let start_label = self.fresh_label();
                let body_label = self.fresh_label();
                let index = self.temp(ReducedType::Int);
                let length = self.temp(ReducedType::Int);
                let another_iteration = self.temp(ReducedType::Bool);
                self.push(Statement::new(
                    Op::ArrayLength,
                    Some(length),
                    collection,
                    None,
                ));
                self.push(Statement::new(
                    Op::Assign,
                    Some(index),
                    Operand::Literal(Value::Int(0)),
                    None,
                ));
                self.push_label(start_label);
                self.push(Statement::new(
                    Op::LessThan,
                    Some(another_iteration),
                    index,
                    Some(length),
                ));
                self.push(Statement::branch(another_iteration, body_label, end_label));
                self.push_label(body_label);

                let variable_node = self.ast.expect_child(node, 1);
                let loop_var_reduced = self
                    .local_storage_reduced(variable_node)
                    .unwrap_or_else(|| self.types.reduced(variable_node));
                let loop_var = self.create_var(variable_node, loop_var_reduced, false);
                let element = self.temp(self.full(collection_node).element_type().reduced());
                self.push(Statement::new(
                    Op::ArrayGet,
                    Some(element),
                    collection,
                    Some(index),
                ));
                self.push(Statement::new(Op::Assign, Some(loop_var), element, None));
                self.mark_var_initialized(loop_var);

                self.push_initialized_branch();
                self.compile_statement(self.ast.expect_child(node, 3));
                self.push_label(continue_label);
                self.push(Statement::new(
                    Op::Plus,
                    Some(index),
                    index,
                    Some(Operand::one()),
                ));
                self.push(Statement::jump(start_label));
                self.pop_initialized_branch();
            }
            NodeKind::While => {
                let body_label = self.fresh_label();
                self.push_label(continue_label);
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 0),
                    body_label,
                    end_label,
                );
                self.push_label(body_label);
                self.push_initialized_branch();
                self.compile_statement(self.ast.expect_child(node, 1));
                self.push(Statement::jump(continue_label));
                self.pop_initialized_branch();
            }
            kind => unreachable!("not a loop: {kind:?}"),
        }
        self.push_label(end_label);
        self.break_flow.pop_break_target();
        self.merge_incoming_initialized(end_label);
        self.break_flow.pop_continue_target();
        self.merge_incoming_initialized(continue_label);
    }

    fn compile_case_list(
        &mut self,
        node: NodeId,
        next_case_label: Option<NodeId>,
        targets: &mut Vec<(Option<Value>, Label)>,
        seen_values: &mut HashSet<i32>,
        have_default: &mut bool,
    ) {
        if self.ast.kind(node) == NodeKind::EmptyCaseList {
            return;
        }
        debug_assert_eq!(self.ast.kind(node), NodeKind::CaseList);
        let label_node = self.ast.expect_child(node, 1);
        self.compile_case_list(
            self.ast.expect_child(node, 0),
            Some(label_node),
            targets,
            seen_values,
            have_default,
        );

        let value = if self.ast.kind(label_node) == NodeKind::CaseLabelDefault {
            if *have_default {
                self.emit_error(node, "Duplicate default label");
            }
            *have_default = true;
            None
        } else {
            let literal = self.ast.expect_child(label_node, 0);
            let operand = self.literal_operand(literal);
            let value = match operand {
                Operand::Literal(Value::Int(value)) => value,
                // A Long case value was already rejected; substitute 0.
                _ => 0,
            };
            if !seen_values.insert(value) {
                self.emit_error(node, "Duplicate case label");
            }
            Some(Value::Int(value))
        };

        let statements = self.ast.expect_child(node, 2);
        if self.ast.kind(statements) != NodeKind::EmptyStatementList
            && next_case_label.is_some()
            && !self.break_flow.always_breaks(statements)
        {
            self.emit_error(
                next_case_label.unwrap(),
                "Falling through in a switch statement is not permitted.  Perhaps you are \
                 missing a break statement.",
            );
        }

        let case_label = self.fresh_label();
        targets.push((value, case_label));
        self.push_label(case_label);
        if self.ast.kind(statements) != NodeKind::EmptyStatementList {
            self.push_initialized_branch();
            self.compile_statement_list(statements);
            self.pop_initialized_branch();
        }
    }

    fn compile_selection_statement(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::If => {
                let true_label = self.fresh_label();
                let false_label = self.fresh_label();
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 0),
                    true_label,
                    false_label,
                );
                self.push_label(true_label);
                self.push_initialized_branch();
                self.compile_statement(self.ast.expect_child(node, 1));
                self.pop_initialized_branch();
                self.push_label(false_label);
            }
            NodeKind::IfElse => {
                let true_label = self.fresh_label();
                let false_label = self.fresh_label();
                let finish_label = self.fresh_label();
                self.compile_conditional_jump(
                    self.ast.expect_child(node, 0),
                    true_label,
                    false_label,
                );

                self.push_initialized_branch();
                self.push_label(true_label);
                self.compile_statement(self.ast.expect_child(node, 1));
                self.push(Statement::jump(finish_label));
                let then_set = self.initialized_stack.pop().unwrap();
                if let Some(set) = &then_set {
                    self.all_initialized.difference(set);
                }

                self.push_initialized_branch();
                self.push_label(false_label);
                self.compile_statement(self.ast.expect_child(node, 2));
                self.push_label(finish_label);
                let else_set = self.initialized_stack.pop().unwrap();
                if let Some(set) = &else_set {
                    self.all_initialized.difference(set);
                }

                self.merge_branch_pair(then_set, else_set);
            }
            NodeKind::Switch => {
                let finish_label = self.fresh_label();
                self.break_flow.push_break_target(finish_label);
                let scrutinee = self.compile_expression(self.ast.expect_child(node, 0));
                let switch_index = self.statements.len();
                self.push(Statement::switch(scrutinee, Vec::new()));

                let mut targets = Vec::new();
                let mut seen_values = HashSet::new();
                let mut have_default = false;
                self.compile_case_list(
                    self.ast.expect_child(node, 1),
                    None,
                    &mut targets,
                    &mut seen_values,
                    &mut have_default,
                );

                if !have_default {
                    // A scrutinee matching no case falls out to the end.
                    targets.push((None, finish_label));
                } else if let Some(first) = self
                    .incoming_initialized
                    .get(&finish_label)
                    .and_then(|sets| sets.first())
                    .cloned()
                {
                    if let Some(top) = self.initialized_stack.last_mut().unwrap().as_mut() {
                        top.union_with(&first);
                    }
                } else {
                    self.mark_unreachable();
                }
                self.statements[switch_index].targets = targets;
                self.push_label(finish_label);
                self.break_flow.pop_break_target();
                self.merge_incoming_initialized(finish_label);
            }
            kind => unreachable!("not a selection statement: {kind:?}"),
        }
    }

    fn compile_control_flow_statement(&mut self, node: NodeId) {
        let kind = self.ast.kind(node);
        let label = match kind {
            NodeKind::Break | NodeKind::Continue => {
                let count = match self.ast.child(node, 0) {
                    None => 1,
                    Some(literal) => {
                        let text = self.ast.token(literal);
                        if has_long_suffix(text) {
                            self.emit_error(
                                node,
                                "Number of loops must be an integer literal, not a long literal",
                            );
                            return;
                        }
                        match int_literal_value(text) {
                            Some(value) => value as i32,
                            None => {
                                self.emit_error(
                                    literal,
                                    "Literal value is too large for Int data type",
                                );
                                return;
                            }
                        }
                    }
                };
                if count <= 0 {
                    self.emit_error(node, "Number of loops must be positive");
                    return;
                }
                let target = if kind == NodeKind::Break {
                    self.break_flow.break_target(count)
                } else {
                    self.break_flow.continue_target(count)
                };
                match target {
                    Some(label) => label,
                    None => {
                        let message = if kind == NodeKind::Break {
                            "Attempting to break out of non-loop"
                        } else {
                            "Attempting to continue non-loop"
                        };
                        self.emit_error(node, message);
                        return;
                    }
                }
            }
            NodeKind::Return => {
                if let Some(value_node) = self.ast.child(node, 0) {
                    let operand = self.compile_expression(value_node);
                    match self.break_flow.return_var() {
                        None => {
                            self.emit_error(node, "Cannot return a value from a void method")
                        }
                        Some(return_var) => self.push(Statement::new(
                            Op::Assign,
                            Some(return_var),
                            operand,
                            None,
                        )),
                    }
                } else if self.break_flow.return_var().is_some() {
                    self.emit_error(node, "Must return a non-void value");
                }
                self.break_flow.return_label()
            }
            kind => unreachable!("not a control flow statement: {kind:?}"),
        };

        self.push(Statement::jump(label));
        if self.reachable() {
            if kind != NodeKind::Return {
                self.incoming_initialized
                    .entry(label)
                    .or_default()
                    .push(self.all_initialized.clone());
            }
            self.mark_unreachable();
        }
    }

    fn compile_statement(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::AssignmentExpression => {
                self.compile_expression(node);
            }
            NodeKind::Block => self.compile_statement_list(self.ast.expect_child(node, 0)),
            NodeKind::Break | NodeKind::Continue | NodeKind::Return => {
                self.compile_control_flow_statement(node)
            }
            NodeKind::DoWhile | NodeKind::For | NodeKind::ForIn | NodeKind::While => {
                self.compile_loop(node)
            }
            NodeKind::EmptyStatement => {}
            NodeKind::If | NodeKind::IfElse | NodeKind::Switch => {
                self.compile_selection_statement(node)
            }
            NodeKind::MethodCall => {
                self.compile_method_call(node);
            }
            NodeKind::PostDecrement
            | NodeKind::PostIncrement
            | NodeKind::PreDecrement
            | NodeKind::PreIncrement => {
                self.compile_increment_expression(node);
            }
            NodeKind::VarDeclaration => {
                let declared = ast_type(self.ast, self.ast.expect_child(node, 0));
                self.compile_var_declaration_list(
                    self.ast.expect_child(node, 1),
                    declared.as_ref(),
                );
            }
            kind => unreachable!("not a statement: {kind:?}"),
        }
    }

    fn compile_statement_list(&mut self, node: NodeId) {
        if self.ast.kind(node) == NodeKind::EmptyStatementList {
            return;
        }
        debug_assert_eq!(self.ast.kind(node), NodeKind::StatementList);
        self.compile_statement_list(self.ast.expect_child(node, 0));
        self.compile_statement(self.ast.expect_child(node, 1));
    }

    fn create_arg_vars(&mut self, node: NodeId, args: &mut Vec<Operand>, arg_types: &mut Vec<Type>) {
        if self.ast.kind(node) == NodeKind::ArgList {
            self.create_arg_vars(self.ast.expect_child(node, 0), args, arg_types);
            self.create_arg_var(self.ast.expect_child(node, 1), args, arg_types);
        } else {
            self.create_arg_var(node, args, arg_types);
        }
    }

    fn create_arg_var(&mut self, node: NodeId, args: &mut Vec<Operand>, arg_types: &mut Vec<Type>) {
        debug_assert_eq!(self.ast.kind(node), NodeKind::Arg);
        let ty = ast_type(self.ast, self.ast.expect_child(node, 0))
            .expect("argument types are explicit");
        let operand = self.create_var(self.ast.expect_child(node, 1), ty.reduced(), true);
        args.push(operand);
        arg_types.push(ty);
    }

    /// Compiles one `MethodDefinition` into a [`Method`].
    pub fn compile(mut self, method: NodeId) -> Method {
        debug_assert_eq!(self.ast.kind(method), NodeKind::MethodDefinition);
        let identifier = self.ast.token(self.ast.expect_child(method, 1)).to_string();
        let return_type_node = self.ast.expect_child(method, 0);
        let return_type = if self.ast.kind(return_type_node) == NodeKind::Void {
            None
        } else {
            ast_type(self.ast, return_type_node)
        };
        let return_var = self.break_flow.return_var();
        let return_label = self.break_flow.return_label();

        self.push_initialized_branch();
        let mut args = Vec::new();
        let mut arg_types = Vec::new();
        if let Some(arg_list) = self.ast.child(method, 2) {
            self.create_arg_vars(arg_list, &mut args, &mut arg_types);
        }
        self.compile_statement_list(self.ast.expect_child(method, 3));

        if return_var.is_some() && self.reachable() {
            // The point before the return label is reachable, so control
            // can reach the end of the method with no value assigned.
            self.emit_error(method, "Method may finish without returning a value");
        }
        self.pop_initialized_branch();
        self.push_label(return_label);

        Method {
            identifier,
            return_type,
            return_var,
            args,
            arg_types,
            statements: self.statements,
        }
    }

    /// Compiles class field declarations into initializer statements: each
    /// initialized field gets an `Assign` from its compiled initializer
    /// expression, in declaration order.
    pub fn compile_field_initializers(mut self, declarations: &[NodeId]) -> Vec<Statement> {
        self.push_initialized_branch();
        for declaration in declarations {
            debug_assert_eq!(self.ast.kind(*declaration), NodeKind::VarDeclaration);
            self.compile_field_declaration_list(self.ast.expect_child(*declaration, 1));
        }
        self.pop_initialized_branch();
        self.statements
    }

    fn compile_field_declaration_list(&mut self, node: NodeId) {
        if self.ast.kind(node) == NodeKind::VarDeclarationList {
            self.compile_field_declaration_list(self.ast.expect_child(node, 0));
            self.compile_field_declaration_item(self.ast.expect_child(node, 1));
        } else {
            self.compile_field_declaration_item(node);
        }
    }

    fn compile_field_declaration_item(&mut self, node: NodeId) {
        if self.ast.kind(node) != NodeKind::AssignmentExpression {
            return;
        }
        let source = self.compile_expression(self.ast.expect_child(node, 2));
        let identifier = self.ast.token(self.ast.expect_child(node, 0));
        if let Some(destination) = self.field_vars.get(identifier).copied() {
            self.push(Statement::new(Op::Assign, Some(destination), source, None));
        }
    }
}
