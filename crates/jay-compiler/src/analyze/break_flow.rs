//! Break/continue/return flow analysis.
//!
//! Tracks the stacks of enclosing break and continue targets while a method
//! compiles, resolves `break n`/`continue n` to labels, and answers whether
//! executing a statement (list) is guaranteed to depart via
//! break/continue/return. The CFG builder uses the latter to reject switch
//! fall-through.

use std::collections::HashMap;

use jay_cfg::{Label, Operand};

use crate::parser::literals::int_literal_value;
use crate::parser::{Ast, NodeId, NodeKind};

/// Flow state for the method currently being compiled.
///
/// The "break level" at a point is the number of enclosing break targets
/// plus continue targets; a switch contributes one break target, a loop one
/// of each. Level 0 is the method body.
pub struct BreakFlow<'a> {
    ast: &'a Ast,
    break_targets: Vec<Label>,
    continue_targets: Vec<Label>,
    break_levels: Vec<i32>,
    continue_levels: Vec<i32>,
    max_break_levels: HashMap<NodeId, i32>,
    return_var: Option<Operand>,
    return_label: Label,
}

impl<'a> BreakFlow<'a> {
    pub fn new(ast: &'a Ast, return_var: Option<Operand>, return_label: Label) -> Self {
        Self {
            ast,
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
            break_levels: Vec::new(),
            continue_levels: Vec::new(),
            max_break_levels: HashMap::new(),
            return_var,
            return_label,
        }
    }

    fn level(&self) -> i32 {
        (self.break_levels.len() + self.continue_levels.len()) as i32
    }

    pub fn push_break_target(&mut self, label: Label) {
        self.break_levels.push(self.level());
        self.break_targets.push(label);
    }

    pub fn push_continue_target(&mut self, label: Label) {
        self.continue_levels.push(self.level());
        self.continue_targets.push(label);
    }

    pub fn pop_break_target(&mut self) {
        self.break_targets.pop();
        self.break_levels.pop();
    }

    pub fn pop_continue_target(&mut self) {
        self.continue_targets.pop();
        self.continue_levels.pop();
    }

    /// The label a `break n` jumps to, or `None` when `n` is out of range.
    pub fn break_target(&self, count: i32) -> Option<Label> {
        if count > 0 && count as usize <= self.break_targets.len() {
            Some(self.break_targets[self.break_targets.len() - count as usize])
        } else {
            None
        }
    }

    /// The label a `continue n` jumps to, or `None` when `n` is out of range.
    pub fn continue_target(&self, count: i32) -> Option<Label> {
        if count > 0 && count as usize <= self.continue_targets.len() {
            Some(self.continue_targets[self.continue_targets.len() - count as usize])
        } else {
            None
        }
    }

    pub fn return_label(&self) -> Label {
        self.return_label
    }

    pub fn return_var(&self) -> Option<Operand> {
        self.return_var
    }

    /// The jump count of a `Break`/`Continue` node. Absent counts mean 1;
    /// literals outside `i32` saturate.
    pub fn jump_count(&self, node: NodeId) -> i32 {
        match self.ast.child(node, 0) {
            None => 1,
            Some(literal) => match int_literal_value(self.ast.token(literal)) {
                Some(value) => value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
                None => i32::MAX,
            },
        }
    }

    /// Whether a case list contains a `default` label.
    pub fn has_default_label(&self, case_list: NodeId) -> bool {
        match self.ast.kind(case_list) {
            NodeKind::EmptyCaseList => false,
            NodeKind::CaseList => {
                let label = self.ast.expect_child(case_list, 1);
                self.ast.kind(label) == NodeKind::CaseLabelDefault
                    || self.has_default_label(self.ast.expect_child(case_list, 0))
            }
            kind => unreachable!("not a switch statement body: {kind:?}"),
        }
    }

    /// The smallest break level reached along any execution path through
    /// `node`. A result below the current level means execution never
    /// reaches whatever follows the node; `-1` means every path returns.
    /// Memoized per node.
    fn max_break_level(&mut self, node: NodeId) -> i32 {
        if let Some(cached) = self.max_break_levels.get(&node) {
            return *cached;
        }
        let level = self.level();
        let result = match self.ast.kind(node) {
            NodeKind::Block => self.max_break_level(self.ast.expect_child(node, 0)),
            NodeKind::Break => {
                let count = self.jump_count(node);
                if count > 0 && count as usize <= self.break_levels.len() {
                    self.break_levels[self.break_levels.len() - count as usize]
                } else {
                    0
                }
            }
            NodeKind::Continue => {
                let count = self.jump_count(node);
                if count > 0 && count as usize <= self.continue_levels.len() {
                    self.continue_levels[self.continue_levels.len() - count as usize]
                } else {
                    0
                }
            }
            NodeKind::Return => -1,
            NodeKind::StatementList => {
                // Sequencing: if the earlier statements already break, the
                // last statement is never reached.
                let earlier = self.max_break_level(self.ast.expect_child(node, 0));
                if earlier >= level {
                    self.max_break_level(self.ast.expect_child(node, 1))
                } else {
                    earlier
                }
            }
            NodeKind::IfElse => {
                let then_level = self.max_break_level(self.ast.expect_child(node, 1));
                let else_level = self.max_break_level(self.ast.expect_child(node, 2));
                then_level.max(else_level)
            }
            NodeKind::CaseList => {
                let rest = self.max_break_level(self.ast.expect_child(node, 0));
                let statements = self.ast.expect_child(node, 2);
                if self.ast.kind(statements) == NodeKind::EmptyStatementList {
                    rest
                } else {
                    rest.max(self.max_break_level(statements))
                }
            }
            NodeKind::EmptyCaseList => -1,
            NodeKind::DoWhile | NodeKind::For | NodeKind::ForIn | NodeKind::While => {
                self.break_levels.push(self.level());
                self.continue_levels.push(self.level());
                let body = match self.ast.kind(node) {
                    NodeKind::DoWhile => self.ast.expect_child(node, 0),
                    NodeKind::While => self.ast.expect_child(node, 1),
                    _ => self.ast.expect_child(node, 3),
                };
                let body_level = self.max_break_level(body);
                self.break_levels.pop();
                self.continue_levels.pop();
                body_level.min(level)
            }
            NodeKind::Switch => {
                self.break_levels.push(self.level());
                let body = self.ast.expect_child(node, 1);
                let result = if !self.has_default_label(body) {
                    // Without a default the scrutinee may match nothing and
                    // execution falls out normally.
                    level
                } else {
                    self.max_break_level(body).min(level)
                };
                self.break_levels.pop();
                result
            }
            _ => level,
        };
        self.max_break_levels.insert(node, result);
        result
    }

    /// Whether executing `node` always departs via break/continue/return,
    /// so a statement placed after it could never run.
    pub fn always_breaks(&mut self, node: NodeId) -> bool {
        self.max_break_level(node) < self.level()
    }
}
