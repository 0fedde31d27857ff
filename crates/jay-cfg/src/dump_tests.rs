//! Unit tests for the method dump.

use crate::dump::dump_method;
use crate::ir::{Label, Method, Op, Operand, Statement, Value, VarTable};
use crate::types::{ReducedType, Type};

#[test]
fn dumps_arithmetic_and_calls() {
    let mut vars = VarTable::new();
    let t0 = Operand::Var(vars.alloc_temp(ReducedType::Int));
    let t1 = Operand::Var(vars.alloc_temp(ReducedType::Int));
    let two = Operand::Literal(Value::Int(2));
    let three = Operand::Literal(Value::Int(3));
    let one = Operand::Literal(Value::Int(1));
    let end = Label(0);

    let method = Method {
        identifier: "main".to_string(),
        return_type: None,
        return_var: None,
        args: vec![],
        arg_types: vec![],
        statements: vec![
            Statement::new(Op::Mult, Some(t0), two, Some(three)),
            Statement::new(Op::Plus, Some(t1), one, Some(t0)),
            Statement::method_call("print", vec![t1], None),
            Statement::jump(end),
            Statement::from_label(end),
        ],
    };

    let dump = dump_method(&method, &vars);
    assert_eq!(
        dump,
        "void main():\n    t0 = 2 * 3\n    t1 = 1 + t0\n    call print(t1)\n    goto L0\nL0:\n"
    );
}

#[test]
fn labels_are_numbered_in_order_of_first_mention() {
    let mut vars = VarTable::new();
    let cond = Operand::Var(vars.alloc(ReducedType::Bool, "b", false));
    let first = Label(10);
    let second = Label(20);

    let method = Method {
        identifier: "pick".to_string(),
        return_type: Some(Type::int_type()),
        return_var: Some(cond),
        args: vec![cond],
        arg_types: vec![Type::bool_type()],
        statements: vec![
            Statement::branch(cond, first, second),
            Statement::from_label(first),
            Statement::from_label(second),
        ],
    };

    let dump = dump_method(&method, &vars);
    assert_eq!(
        dump,
        "Int pick(Bool b):\n    if b goto L0 else goto L1\nL0:\nL1:\n"
    );
}

#[test]
fn unreferenced_labels_are_omitted() {
    let vars = VarTable::new();
    let orphan = Label(3);
    let method = Method {
        identifier: "quiet".to_string(),
        return_type: None,
        return_var: None,
        args: vec![],
        arg_types: vec![],
        statements: vec![Statement::from_label(orphan)],
    };
    assert_eq!(dump_method(&method, &vars), "void quiet():\n");
}
