//! C++ source emission.
//!
//! Renders a compiled class as a header and an implementation file, with
//! method bodies spelled out as label/goto three-address code. Identifier
//! prefixes keep the C++ namespaces from colliding: `c_` classes, `m_`
//! methods, `f_` fields, `v_` source locals, `e_` expression temporaries.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use jay_cfg::{Class, Label, Method, Op, Operand, ReducedType, Statement, Value, VarId, VarTable};

/// Error emitting C++ for a class.
///
/// Arrays and object classes type-check and lower to the CFG, but they
/// have no C++ representation yet, so emission rejects them up front
/// instead of producing code that cannot compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot emit C++ for class `{class}`: {detail}")]
pub struct CppEmitError {
    pub class: String,
    pub detail: String,
}

fn unsupported(class: &Class, detail: String) -> CppEmitError {
    CppEmitError {
        class: class.identifier.clone(),
        detail,
    }
}

fn is_object(class: &Class, operand: &Operand) -> bool {
    operand.reduced_type(&class.vars) == ReducedType::Object
}

fn check_statements(
    class: &Class,
    statements: &[Statement],
    context: &str,
) -> Result<(), CppEmitError> {
    for statement in statements {
        if matches!(statement.op, Op::ArrayGet | Op::ArrayLength | Op::ArraySet) {
            return Err(unsupported(class, format!("{context} uses arrays")));
        }
        let operands = [statement.destination, statement.arg1, statement.arg2];
        if operands
            .iter()
            .flatten()
            .any(|operand| is_object(class, operand))
        {
            return Err(unsupported(
                class,
                format!("{context} uses an array or object value"),
            ));
        }
        if let Some(call) = &statement.method {
            if call.args.iter().any(|arg| is_object(class, arg)) {
                return Err(unsupported(
                    class,
                    format!("{context} passes an array or object value"),
                ));
            }
        }
    }
    Ok(())
}

/// Checks that a class stays within the subset the emitter can express in
/// C++: no array operations and no array- or object-typed values.
fn check_class(class: &Class) -> Result<(), CppEmitError> {
    for (name, operand) in &class.fields {
        if is_object(class, operand) {
            return Err(unsupported(
                class,
                format!("field `{name}` has an array or object type"),
            ));
        }
    }
    check_statements(class, &class.init_statements, "a field initializer")?;
    for method in class.methods.values() {
        if method.args.iter().any(|arg| is_object(class, arg)) {
            return Err(unsupported(
                class,
                format!("method `{}` takes an array or object argument", method.identifier),
            ));
        }
        if let Some(return_var) = &method.return_var {
            if is_object(class, return_var) {
                return Err(unsupported(
                    class,
                    format!("method `{}` returns an array or object value", method.identifier),
                ));
            }
        }
        let context = format!("method `{}`", method.identifier);
        check_statements(class, &method.statements, &context)?;
    }
    Ok(())
}

struct CppEmitter<'a> {
    vars: &'a VarTable,
    out: String,
    /// C++ identifiers for the non-field variables of the current method.
    local_identifiers: HashMap<VarId, String>,
    /// Occurrences per source identifier; scoping allows several locals
    /// with the same name in one method.
    name_counts: HashMap<String, u32>,
    temp_count: u32,
    label_indices: HashMap<Label, usize>,
}

impl<'a> CppEmitter<'a> {
    fn new(vars: &'a VarTable) -> Self {
        Self {
            vars,
            out: String::new(),
            local_identifiers: HashMap::new(),
            name_counts: HashMap::new(),
            temp_count: 0,
            label_indices: HashMap::new(),
        }
    }

    fn reset_method_state(&mut self) {
        self.local_identifiers.clear();
        self.name_counts.clear();
        self.label_indices.clear();
        self.temp_count = 0;
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str("    ");
        }
    }

    fn cpp_type(reduced: ReducedType) -> &'static str {
        match reduced {
            ReducedType::Bool => "bool",
            ReducedType::Byte => "char",
            ReducedType::Int => "int",
            ReducedType::Long => "long long",
            ReducedType::Float => "float",
            ReducedType::Double => "double",
            ReducedType::Object => {
                unreachable!("array and object values are rejected before emission")
            }
        }
    }

    fn declare_local(&mut self, id: VarId) {
        let info = self.vars.info(id);
        debug_assert!(!info.is_field, "not a local variable");
        debug_assert!(
            !self.local_identifiers.contains_key(&id),
            "variable is already declared"
        );
        let name = if info.identifier.is_empty() {
            let name = format!("e_{}", self.temp_count);
            self.temp_count += 1;
            name
        } else {
            let count = self.name_counts.entry(info.identifier.clone()).or_insert(0);
            let name = format!("v_{}_{}", info.identifier, count);
            *count += 1;
            name
        };
        self.local_identifiers.insert(id, name);
    }

    fn declare_local_if_necessary(&mut self, operand: Operand) {
        let Operand::Var(id) = operand else { return };
        if self.vars.info(id).is_field || self.local_identifiers.contains_key(&id) {
            return;
        }
        self.declare_local(id);
        self.indent(1);
        let line = format!(
            "{} {};\n",
            Self::cpp_type(self.vars.info(id).reduced_type),
            self.local_identifiers[&id]
        );
        self.out.push_str(&line);
    }

    fn operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Var(id) => {
                let info = self.vars.info(*id);
                if info.is_field {
                    format!("f_{}", info.identifier)
                } else {
                    self.local_identifiers
                        .get(id)
                        .expect("missing local variable declaration")
                        .clone()
                }
            }
            Operand::Literal(Value::Bool(value)) => value.to_string(),
            Operand::Literal(Value::Int(value)) => value.to_string(),
            Operand::Literal(Value::Long(value)) => format!("{value}ll"),
            Operand::Literal(Value::Double(value)) => value.to_string(),
            Operand::Literal(Value::Float(value)) => {
                let mut text = value.to_string();
                if !text.contains('.') && !text.contains('e') {
                    text.push('.');
                }
                text.push('f');
                text
            }
        }
    }

    fn label_name(&mut self, label: Label) -> String {
        let next = self.label_indices.len();
        let index = *self.label_indices.entry(label).or_insert(next);
        format!("label{index}")
    }

    fn binary_operator(op: Op) -> &'static str {
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
            Op::Xor => "^",
            op => unreachable!("not a binary operation: {op:?}"),
        }
    }

    fn unary_operator(op: Op) -> &'static str {
        match op {
            Op::BitwiseInvert => "~",
            Op::Negate => "-",
            Op::Not => "!",
            op => unreachable!("not a unary operation: {op:?}"),
        }
    }

    fn jump_statement(&mut self, statement: &Statement) {
        match statement.op {
            Op::If => {
                let condition = self.operand(statement.arg1.as_ref().unwrap());
                let true_name = self.label_name(statement.targets[0].1);
                let false_name = self.label_name(statement.targets[1].1);
                self.indent(1);
                let _ = writeln!(self.out, "if ({condition})");
                self.indent(2);
                let _ = writeln!(self.out, "goto {true_name};");
                self.indent(1);
                self.out.push_str("else\n");
                self.indent(2);
                let _ = writeln!(self.out, "goto {false_name};");
            }
            Op::Jump => {
                let name = self.label_name(statement.targets[0].1);
                self.indent(1);
                let _ = writeln!(self.out, "goto {name};");
            }
            Op::Switch => {
                let scrutinee = self.operand(statement.arg1.as_ref().unwrap());
                self.indent(1);
                let _ = writeln!(self.out, "switch ({scrutinee}) {{");
                for (value, label) in &statement.targets {
                    let name = self.label_name(*label);
                    self.indent(2);
                    match value {
                        None => self.out.push_str("default:\n"),
                        Some(value) => {
                            let text = self.operand(&Operand::Literal(*value));
                            let _ = writeln!(self.out, "case {text}:");
                        }
                    }
                    self.indent(3);
                    let _ = writeln!(self.out, "goto {name};");
                }
                self.indent(1);
                self.out.push_str("}\n");
            }
            op => unreachable!("not a jump statement: {op:?}"),
        }
    }

    fn method_call(&mut self, statement: &Statement) {
        let call = statement.method.as_ref().expect("not a method call");
        self.indent(1);
        if call.identifier == "print" || call.identifier == "println" {
            let arg = &call.args[0];
            let rendered = if arg.reduced_type(self.vars) == ReducedType::Bool {
                format!("({} ? \"true\" : \"false\")", self.operand(arg))
            } else {
                self.operand(arg)
            };
            let _ = write!(self.out, "cout << {rendered}");
            if call.identifier == "println" {
                self.out.push_str(" << '\\n'");
            }
            self.out.push_str(";\n");
        } else {
            if let Some(destination) = &statement.destination {
                let rendered = self.operand(destination);
                let _ = write!(self.out, "{rendered} = ");
            }
            let args: Vec<String> = call.args.iter().map(|arg| self.operand(arg)).collect();
            let _ = writeln!(self.out, "m_{}({});", call.identifier, args.join(", "));
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement.op {
            Op::ArrayGet | Op::ArrayLength | Op::ArraySet => {
                unreachable!("array operations are rejected before emission")
            }
            Op::Assign => {
                let destination = self.operand(statement.destination.as_ref().unwrap());
                let source = self.operand(statement.arg1.as_ref().unwrap());
                self.indent(1);
                let _ = writeln!(self.out, "{destination} = {source};");
            }
            Op::BitwiseInvert | Op::Negate | Op::Not => {
                let destination = self.operand(statement.destination.as_ref().unwrap());
                let operator = Self::unary_operator(statement.op);
                let source = self.operand(statement.arg1.as_ref().unwrap());
                self.indent(1);
                let _ = writeln!(self.out, "{destination} = {operator}{source};");
            }
            Op::If | Op::Jump | Op::Switch => self.jump_statement(statement),
            Op::MethodCall => self.method_call(statement),
            Op::Nop => {}
            Op::UnsignedRightShift => {
                // C++ has no >>>; shift through the unsigned representation.
                let destination = statement.destination.as_ref().unwrap();
                let ty = Self::cpp_type(destination.reduced_type(self.vars));
                let destination = self.operand(destination);
                let source1 = self.operand(statement.arg1.as_ref().unwrap());
                let source2 = self.operand(statement.arg2.as_ref().unwrap());
                self.indent(1);
                let _ = writeln!(
                    self.out,
                    "{destination} = ({ty})(((unsigned {ty}){source1}) >> {source2});"
                );
            }
            _ => {
                let destination = self.operand(statement.destination.as_ref().unwrap());
                let source1 = self.operand(statement.arg1.as_ref().unwrap());
                let operator = Self::binary_operator(statement.op);
                let source2 = self.operand(statement.arg2.as_ref().unwrap());
                self.indent(1);
                let _ = writeln!(self.out, "{destination} = {source1} {operator} {source2};");
            }
        }
    }

    fn statements(&mut self, statements: &[Statement]) {
        let mut used_labels: HashSet<Label> = HashSet::new();
        for statement in statements {
            let operands = [statement.destination, statement.arg1, statement.arg2];
            for operand in operands.into_iter().flatten() {
                self.declare_local_if_necessary(operand);
            }
            if let Some(call) = &statement.method {
                for arg in &call.args {
                    self.declare_local_if_necessary(*arg);
                }
            }
            for (_, label) in &statement.targets {
                used_labels.insert(*label);
            }
        }
        for statement in statements {
            if let Some(label) = statement.label {
                if used_labels.contains(&label) {
                    let name = self.label_name(label);
                    let _ = writeln!(self.out, "{name}:;");
                }
            }
            self.statement(statement);
        }
    }

    /// The method prototype, without the trailing semicolon. With a class
    /// identifier, qualifies the method name (`c_Foo::m_bar`).
    fn method_signature(&mut self, method: &Method, class_identifier: &str, indentation: usize) {
        self.reset_method_state();
        self.indent(indentation);
        match &method.return_var {
            None => self.out.push_str("void "),
            Some(return_var) => {
                let ty = Self::cpp_type(return_var.reduced_type(self.vars));
                let _ = write!(self.out, "{ty} ");
            }
        }
        if !class_identifier.is_empty() {
            let _ = write!(self.out, "c_{class_identifier}::");
        }
        let _ = write!(self.out, "m_{}(", method.identifier);
        for (index, arg) in method.args.iter().enumerate() {
            if index > 0 {
                self.out.push(',');
            }
            self.out.push('\n');
            self.indent(indentation + 1);
            let ty = Self::cpp_type(arg.reduced_type(self.vars));
            let _ = write!(self.out, "{ty} ");
            if let Operand::Var(id) = arg {
                self.declare_local(*id);
            }
            let rendered = self.operand(arg);
            self.out.push_str(&rendered);
        }
        self.out.push(')');
    }

    fn method(&mut self, method: &Method, class_identifier: &str) {
        self.method_signature(method, class_identifier, 0);
        self.out.push_str(" {\n");
        if let Some(return_var) = method.return_var {
            if let Operand::Var(id) = return_var {
                self.declare_local(id);
            }
            self.indent(1);
            let ty = Self::cpp_type(return_var.reduced_type(self.vars));
            let rendered = self.operand(&return_var);
            let _ = writeln!(self.out, "{ty} {rendered};");
        }
        self.statements(&method.statements);
        if let Some(return_var) = method.return_var {
            let rendered = self.operand(&return_var);
            self.indent(1);
            let _ = writeln!(self.out, "return {rendered};");
        }
        self.out.push_str("}\n");
    }

    fn field_declarations(&mut self, class: &Class) {
        for operand in class.fields.values() {
            self.indent(1);
            let ty = Self::cpp_type(operand.reduced_type(self.vars));
            let rendered = self.operand(operand);
            let _ = writeln!(self.out, "{ty} {rendered};");
        }
    }

    fn header_file(&mut self, class: &Class) {
        let _ = writeln!(self.out, "#ifndef COMPILER_{}_DEFINED", class.identifier);
        let _ = writeln!(self.out, "#define COMPILER_{}_DEFINED", class.identifier);
        self.out.push('\n');
        let _ = writeln!(self.out, "class c_{} {{", class.identifier);
        self.out.push_str("public:\n");
        self.field_declarations(class);
        for method in class.methods.values() {
            self.method_signature(method, "", 1);
            self.out.push_str(";\n");
        }
        self.indent(1);
        self.out.push_str("void init();\n");
        self.out.push_str("};\n\n");
        self.out.push_str("#endif\n");
    }

    fn implementation_file(&mut self, class: &Class) {
        self.out.push_str("#include <iostream>\n");
        let _ = writeln!(self.out, "#include \"{}.hpp\"", class.identifier);
        self.out.push('\n');
        self.out.push_str("using namespace std;\n\n");
        for method in class.methods.values() {
            self.method(method, &class.identifier);
            self.out.push('\n');
        }
        let _ = writeln!(self.out, "void c_{}::init() {{", class.identifier);
        self.reset_method_state();
        self.statements(&class.init_statements);
        self.out.push_str("}\n");
    }
}

/// Renders the C++ header file for a compiled class. Fails when the class
/// uses arrays or object values, which have no C++ lowering yet.
pub fn header_file(class: &Class) -> Result<String, CppEmitError> {
    check_class(class)?;
    let mut emitter = CppEmitter::new(&class.vars);
    emitter.header_file(class);
    Ok(emitter.out)
}

/// Renders the C++ implementation file for a compiled class. Fails when
/// the class uses arrays or object values, which have no C++ lowering yet.
pub fn implementation_file(class: &Class) -> Result<String, CppEmitError> {
    check_class(class)?;
    let mut emitter = CppEmitter::new(&class.vars);
    emitter.implementation_file(class);
    Ok(emitter.out)
}

/// Renders the `main.cpp` that constructs the main class and calls its
/// entry method.
pub fn main_file(class_identifier: &str, main_method: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#include \"{class_identifier}.hpp\"");
    out.push('\n');
    out.push_str("int main() {\n");
    let _ = writeln!(out, "    c_{class_identifier} mainObject;");
    let _ = writeln!(out, "    mainObject.init();");
    let _ = writeln!(out, "    mainObject.m_{main_method}();");
    out.push_str("    return 0;\n");
    out.push_str("}\n");
    out
}
