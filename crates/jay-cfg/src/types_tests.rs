//! Unit tests for the type model.

use crate::types::{ReducedType, Type};

#[test]
fn display_writes_code_strings() {
    assert_eq!(Type::int_type().to_string(), "Int");
    assert_eq!(Type::new("Int", 2).to_string(), "Int[][]");
    assert_eq!(Type::new("Widget", 1).to_string(), "Widget[]");
}

#[test]
fn from_str_round_trips() {
    for ty in [
        Type::bool_type(),
        Type::int_type(),
        Type::scalar("Double"),
        Type::new("Int", 1),
        Type::new("Long", 3),
        Type::new("Widget", 2),
        Type::object(),
    ] {
        let parsed: Type = ty.to_string().parse().unwrap();
        assert_eq!(parsed, ty);
    }
}

#[test]
fn from_str_rejects_malformed_strings() {
    for s in ["", "Int[", "Int]", "Int[]x", "Int[][", "[]", "Int[]]", "a b"] {
        assert!(s.parse::<Type>().is_err(), "accepted {s:?}");
    }
}

#[test]
fn numeric_predicates() {
    assert!(Type::scalar("Byte").is_numeric());
    assert!(Type::scalar("Double").is_numeric());
    assert!(!Type::bool_type().is_numeric());
    assert!(!Type::new("Int", 1).is_numeric());
    assert!(!Type::scalar("Widget").is_numeric());

    assert!(Type::scalar("Long").is_integer_like());
    assert!(!Type::scalar("Float").is_integer_like());
    assert!(!Type::new("Byte", 1).is_integer_like());

    assert!(Type::bool_type().is_bool());
    assert!(!Type::new("Bool", 1).is_bool());
}

#[test]
fn promotion_is_totally_ordered() {
    let order = ["Byte", "Int", "Long", "Float", "Double"];
    for (i, a) in order.iter().enumerate() {
        for (j, b) in order.iter().enumerate() {
            let a = Type::scalar(*a);
            let b = Type::scalar(*b);
            assert_eq!(a.is_more_promoted_than(&b), i > j);
        }
    }
}

#[test]
fn least_common_type() {
    let int = Type::int_type();
    let double = Type::scalar("Double");
    assert_eq!(int.least_common(&int), int);
    assert_eq!(int.least_common(&double), double);
    assert_eq!(double.least_common(&int), double);

    // Any array operand widens the result to Object.
    let int_array = Type::new("Int", 1);
    assert_eq!(int.least_common(&int_array), Type::object());
    assert_eq!(int_array.least_common(&int_array), int_array);

    // Mixed non-numeric scalars widen to Object.
    assert_eq!(int.least_common(&Type::bool_type()), Type::object());
    assert_eq!(
        Type::scalar("Widget").least_common(&Type::scalar("Gadget")),
        Type::object()
    );
}

#[test]
fn reduced_projection() {
    assert_eq!(Type::bool_type().reduced(), ReducedType::Bool);
    assert_eq!(Type::scalar("Byte").reduced(), ReducedType::Byte);
    assert_eq!(Type::int_type().reduced(), ReducedType::Int);
    assert_eq!(Type::scalar("Long").reduced(), ReducedType::Long);
    assert_eq!(Type::scalar("Float").reduced(), ReducedType::Float);
    assert_eq!(Type::scalar("Double").reduced(), ReducedType::Double);
    assert_eq!(Type::new("Int", 1).reduced(), ReducedType::Object);
    assert_eq!(Type::scalar("Widget").reduced(), ReducedType::Object);
}

#[test]
fn element_and_array_types() {
    let matrix = Type::new("Int", 2);
    assert_eq!(matrix.element_type(), Type::new("Int", 1));
    assert_eq!(matrix.element_type().element_type(), Type::int_type());
    assert_eq!(Type::int_type().array_of(), Type::new("Int", 1));
}
