//! Unit tests for literal decoding.

use crate::parser::literals::{
    double_literal_value, float_literal_value, has_float_suffix, has_long_suffix,
    int_literal_value,
};

#[test]
fn suffix_detection() {
    assert!(has_long_suffix("1l"));
    assert!(has_long_suffix("1L"));
    assert!(!has_long_suffix("1"));
    assert!(has_float_suffix("1.5f"));
    assert!(has_float_suffix("1.5F"));
    assert!(!has_float_suffix("1.5"));
}

#[test]
fn decimal_int_literals() {
    assert_eq!(int_literal_value("0"), Some(0));
    assert_eq!(int_literal_value("42"), Some(42));
    assert_eq!(int_literal_value("2147483647"), Some(2147483647));
    // One past Int max needs the Long suffix.
    assert_eq!(int_literal_value("2147483648"), None);
    assert_eq!(int_literal_value("2147483648L"), Some(2147483648));
    assert_eq!(
        int_literal_value("9223372036854775807L"),
        Some(9223372036854775807)
    );
    assert_eq!(int_literal_value("9223372036854775808L"), None);
}

#[test]
fn hex_int_literals() {
    assert_eq!(int_literal_value("0x0"), Some(0));
    assert_eq!(int_literal_value("0x1f"), Some(31));
    assert_eq!(int_literal_value("0x7fffffff"), Some(2147483647));
    // Hex wraps like the machine representation.
    assert_eq!(int_literal_value("0xffffffff"), Some(-1));
    assert_eq!(int_literal_value("0xffffffffL"), Some(0xffffffff));
    assert_eq!(int_literal_value("0x100000000"), None);
    assert_eq!(int_literal_value("0xffffffffffffffffL"), Some(-1));
    assert_eq!(int_literal_value("0x10000000000000000L"), None);
}

#[test]
fn float_literals() {
    assert_eq!(double_literal_value("1.5"), 1.5);
    assert_eq!(double_literal_value("2.5e-3"), 0.0025);
    assert_eq!(float_literal_value("1.5f"), 1.5f32);
    assert_eq!(float_literal_value("2F"), 2.0f32);
}
