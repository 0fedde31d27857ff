//! Human-readable listing of compiled methods.
//!
//! The dump is line-oriented and stable: labels are numbered in order of
//! first mention, temporaries print as `t<id>`, and source variables print
//! by identifier. Tests and `jayc dump` both consume it.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt::Write;

use crate::ir::{Label, Method, Op, Operand, Statement, Value, VarTable};

struct Dumper<'a> {
    vars: &'a VarTable,
    label_names: HashMap<Label, usize>,
}

impl<'a> Dumper<'a> {
    fn new(vars: &'a VarTable) -> Self {
        Self {
            vars,
            label_names: HashMap::new(),
        }
    }

    fn label(&mut self, label: Label) -> String {
        let next = self.label_names.len();
        let index = *self.label_names.entry(label).or_insert(next);
        format!("L{index}")
    }

    fn value(value: &Value) -> String {
        match value {
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => format!("{v}L"),
            Value::Float(v) => format!("{v}f"),
            Value::Double(v) => v.to_string(),
        }
    }

    fn operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Literal(value) => Self::value(value),
            Operand::Var(id) => {
                let info = self.vars.info(*id);
                if info.identifier.is_empty() {
                    format!("t{}", id.0)
                } else {
                    info.identifier.clone()
                }
            }
        }
    }

    fn binary_op(op: Op) -> &'static str {
        match op {
            Op::BitwiseAnd => "&",
            Op::BitwiseOr => "|",
            Op::Div => "/",
            Op::Equals => "==",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEqualTo => ">=",
            Op::LeftShift => "<<",
            Op::LessThan => "<",
            Op::LessThanOrEqualTo => "<=",
            Op::Minus => "-",
            Op::Mod => "%",
            Op::Mult => "*",
            Op::NotEquals => "!=",
            Op::Plus => "+",
            Op::RightShift => ">>",
            Op::UnsignedRightShift => ">>>",
            Op::Xor => "^",
            _ => unreachable!("not a binary operation: {op:?}"),
        }
    }

    fn statement(&mut self, statement: &Statement, out: &mut String) {
        let dest = statement.destination.as_ref().map(|d| self.operand(d));
        let arg1 = statement.arg1.as_ref().map(|a| self.operand(a));
        let arg2 = statement.arg2.as_ref().map(|a| self.operand(a));
        match statement.op {
            Op::Nop => {}
            Op::Assign => {
                let _ = writeln!(out, "    {} = {}", dest.unwrap(), arg1.unwrap());
            }
            Op::Negate | Op::Not | Op::BitwiseInvert => {
                let sign = match statement.op {
                    Op::Negate => "-",
                    Op::Not => "!",
                    _ => "~",
                };
                let _ = writeln!(out, "    {} = {}{}", dest.unwrap(), sign, arg1.unwrap());
            }
            Op::ArrayGet => {
                let _ = writeln!(
                    out,
                    "    {} = {}[{}]",
                    dest.unwrap(),
                    arg1.unwrap(),
                    arg2.unwrap()
                );
            }
            Op::ArraySet => {
                let _ = writeln!(
                    out,
                    "    {}[{}] = {}",
                    dest.unwrap(),
                    arg1.unwrap(),
                    arg2.unwrap()
                );
            }
            Op::ArrayLength => {
                let _ = writeln!(out, "    {} = {}.length", dest.unwrap(), arg1.unwrap());
            }
            Op::If => {
                let true_target = self.label(statement.targets[0].1);
                let false_target = self.label(statement.targets[1].1);
                let _ = writeln!(
                    out,
                    "    if {} goto {} else goto {}",
                    arg1.unwrap(),
                    true_target,
                    false_target
                );
            }
            Op::Jump => {
                let target = self.label(statement.targets[0].1);
                let _ = writeln!(out, "    goto {target}");
            }
            Op::Switch => {
                let arms: Vec<String> = statement
                    .targets
                    .iter()
                    .map(|(value, label)| {
                        let name = self.label(*label);
                        match value {
                            Some(v) => format!("{} -> {name}", Self::value(v)),
                            None => format!("default -> {name}"),
                        }
                    })
                    .collect();
                let _ = writeln!(out, "    switch {} {{ {} }}", arg1.unwrap(), arms.join(", "));
            }
            Op::MethodCall => {
                let call = statement.method.as_ref().unwrap();
                let args: Vec<String> = call.args.iter().map(|a| self.operand(a)).collect();
                match dest {
                    Some(dest) => {
                        let _ = writeln!(
                            out,
                            "    {} = call {}({})",
                            dest,
                            call.identifier,
                            args.join(", ")
                        );
                    }
                    None => {
                        let _ = writeln!(out, "    call {}({})", call.identifier, args.join(", "));
                    }
                }
            }
            _ => {
                let _ = writeln!(
                    out,
                    "    {} = {} {} {}",
                    dest.unwrap(),
                    arg1.unwrap(),
                    Self::binary_op(statement.op),
                    arg2.unwrap()
                );
            }
        }
    }
}

/// Renders a method's statement listing.
pub fn dump_method(method: &Method, vars: &VarTable) -> String {
    let mut used_labels: HashSet<Label> = HashSet::new();
    for statement in &method.statements {
        for (_, label) in &statement.targets {
            used_labels.insert(*label);
        }
    }

    let mut dumper = Dumper::new(vars);
    let mut out = String::new();
    let return_type = method
        .return_type
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "void".to_string());
    let args: Vec<String> = method
        .args
        .iter()
        .zip(&method.arg_types)
        .map(|(arg, ty)| format!("{} {}", ty, dumper.operand(arg)))
        .collect();
    let _ = writeln!(
        out,
        "{} {}({}):",
        return_type,
        method.identifier,
        args.join(", ")
    );
    for statement in &method.statements {
        if let Some(label) = statement.label {
            if used_labels.contains(&label) {
                let name = dumper.label(label);
                let _ = writeln!(out, "{name}:");
            }
        }
        dumper.statement(statement, &mut out);
    }
    out
}
