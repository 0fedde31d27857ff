//! The three-address intermediate representation.
//!
//! A compiled method is a linear vector of [`Statement`]s. Jumps name
//! [`Label`]s, and a statement that is a jump target carries the label; the
//! control-flow graph is implicit in the label references, so the ownership
//! graph stays acyclic. The class owns the variable table every operand
//! refers into.

use indexmap::IndexMap;

use crate::interface::{ClassInterface, FieldInterface, MethodInterface};
use crate::types::{ReducedType, Type};

/// An identity token used as a jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// A literal value carried directly by an operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn reduced_type(&self) -> ReducedType {
        match self {
            Value::Bool(_) => ReducedType::Bool,
            Value::Int(_) => ReducedType::Int,
            Value::Long(_) => ReducedType::Long,
            Value::Float(_) => ReducedType::Float,
            Value::Double(_) => ReducedType::Double,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Index of a variable in its class's [`VarTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// A variable's compile-time shape. The identifier is empty for compiler
/// temporaries, which never appear in the source file.
#[derive(Debug, Clone)]
pub struct VarInfo {
    pub reduced_type: ReducedType,
    pub identifier: String,
    pub is_field: bool,
}

/// Table of every variable a class's IR refers to. Fields persist for the
/// class's lifetime; locals, arguments, and temporaries for their method.
#[derive(Debug, Clone, Default)]
pub struct VarTable {
    vars: Vec<VarInfo>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_temp(&mut self, reduced_type: ReducedType) -> VarId {
        self.alloc(reduced_type, String::new(), false)
    }

    pub fn alloc(
        &mut self,
        reduced_type: ReducedType,
        identifier: impl Into<String>,
        is_field: bool,
    ) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            reduced_type,
            identifier: identifier.into(),
            is_field,
        });
        id
    }

    pub fn info(&self, id: VarId) -> &VarInfo {
        &self.vars[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// An expression operand: a literal value or a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(Value),
    Var(VarId),
}

impl Operand {
    pub fn literal_true() -> Self {
        Operand::Literal(Value::Bool(true))
    }

    pub fn one() -> Self {
        Operand::Literal(Value::Int(1))
    }

    pub fn reduced_type(&self, vars: &VarTable) -> ReducedType {
        match self {
            Operand::Literal(value) => value.reduced_type(),
            Operand::Var(id) => vars.info(*id).reduced_type,
        }
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Operand::Var(id) => Some(*id),
            _ => None,
        }
    }
}

/// The operation a [`Statement`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// destination = arg1[arg2], bounds-checked.
    ArrayGet,
    /// destination = arg1.length.
    ArrayLength,
    /// destination[arg1] = arg2, bounds-checked.
    ArraySet,
    /// destination = arg1.
    Assign,
    BitwiseAnd,
    /// destination = ~arg1.
    BitwiseInvert,
    BitwiseOr,
    Div,
    Equals,
    GreaterThan,
    GreaterThanOrEqualTo,
    /// Conditional branch on the boolean arg1; targets are
    /// `[(true, L1), (default, L2)]`.
    If,
    /// Unconditional jump; targets are `[(default, L)]`.
    Jump,
    LeftShift,
    LessThan,
    LessThanOrEqualTo,
    MethodCall,
    Minus,
    Mod,
    Mult,
    /// destination = -arg1.
    Negate,
    /// destination = !arg1.
    Not,
    NotEquals,
    /// No effect; carries a label so it can anchor a jump target.
    Nop,
    Plus,
    RightShift,
    /// Multi-way branch on the Int arg1; targets pair Int literals (or
    /// `None` for the default) with labels.
    Switch,
    UnsignedRightShift,
    Xor,
}

/// A method call's auxiliary data: callee identifier and argument operands.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallData {
    pub identifier: String,
    pub args: Vec<Operand>,
}

/// One three-address statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub op: Op,
    pub destination: Option<Operand>,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    /// The label identifying this statement, when it is a jump target.
    pub label: Option<Label>,
    /// Callee and arguments, for `Op::MethodCall`.
    pub method: Option<MethodCallData>,
    /// Jump targets for `If`/`Jump`/`Switch`: `(match value, label)` pairs
    /// where `None` marks the default target. At most one default per
    /// statement, and switch match values are distinct Int literals.
    pub targets: Vec<(Option<Value>, Label)>,
}

impl Statement {
    pub fn new(op: Op, destination: Option<Operand>, arg1: Operand, arg2: Option<Operand>) -> Self {
        Self {
            op,
            destination,
            arg1: Some(arg1),
            arg2,
            label: None,
            method: None,
            targets: Vec::new(),
        }
    }

    /// A `Nop` anchoring the given label.
    pub fn from_label(label: Label) -> Self {
        Self {
            op: Op::Nop,
            destination: None,
            arg1: None,
            arg2: None,
            label: Some(label),
            method: None,
            targets: Vec::new(),
        }
    }

    /// An unconditional jump to `target`.
    pub fn jump(target: Label) -> Self {
        Self {
            op: Op::Jump,
            destination: None,
            arg1: None,
            arg2: None,
            label: None,
            method: None,
            targets: vec![(None, target)],
        }
    }

    /// A conditional branch on the boolean `condition`.
    pub fn branch(condition: Operand, true_target: Label, false_target: Label) -> Self {
        Self {
            op: Op::If,
            destination: None,
            arg1: Some(condition),
            arg2: None,
            label: None,
            method: None,
            targets: vec![
                (Some(Value::Bool(true)), true_target),
                (None, false_target),
            ],
        }
    }

    pub fn method_call(
        identifier: impl Into<String>,
        args: Vec<Operand>,
        destination: Option<Operand>,
    ) -> Self {
        Self {
            op: Op::MethodCall,
            destination,
            arg1: None,
            arg2: None,
            label: None,
            method: Some(MethodCallData {
                identifier: identifier.into(),
                args,
            }),
            targets: Vec::new(),
        }
    }

    pub fn switch(scrutinee: Operand, targets: Vec<(Option<Value>, Label)>) -> Self {
        Self {
            op: Op::Switch,
            destination: None,
            arg1: Some(scrutinee),
            arg2: None,
            label: None,
            method: None,
            targets,
        }
    }
}

/// A compiled method: its signature, its return plumbing, and the linear
/// statement sequence. The statements end with a label-only `Nop` to which
/// every `return` jumps.
#[derive(Debug, Clone)]
pub struct Method {
    pub identifier: String,
    pub return_type: Option<Type>,
    pub return_var: Option<Operand>,
    pub args: Vec<Operand>,
    pub arg_types: Vec<Type>,
    pub statements: Vec<Statement>,
}

impl Method {
    pub fn interface(&self) -> MethodInterface {
        MethodInterface {
            identifier: self.identifier.clone(),
            return_type: self.return_type.clone(),
            arg_types: self.arg_types.clone(),
        }
    }
}

/// A compiled class: fields in declaration order, uniquely named methods,
/// the field-initializer statements run before any constructor body, and
/// the variable table that owns all of the above's operands.
#[derive(Debug, Clone)]
pub struct Class {
    pub identifier: String,
    pub fields: IndexMap<String, Operand>,
    pub field_types: IndexMap<String, Type>,
    pub methods: IndexMap<String, Method>,
    pub init_statements: Vec<Statement>,
    pub vars: VarTable,
}

impl Class {
    pub fn method(&self, identifier: &str) -> Option<&Method> {
        self.methods.get(identifier)
    }

    /// The externally visible shape of this class.
    pub fn interface(&self) -> ClassInterface {
        ClassInterface {
            identifier: self.identifier.clone(),
            fields: self
                .field_types
                .iter()
                .map(|(identifier, ty)| FieldInterface {
                    identifier: identifier.clone(),
                    ty: ty.clone(),
                })
                .collect(),
            methods: self.methods.values().map(Method::interface).collect(),
        }
    }
}
