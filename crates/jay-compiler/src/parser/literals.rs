//! Decoding of numeric literal token text.

/// Whether the literal text carries a Long suffix (`l`/`L`).
pub fn has_long_suffix(text: &str) -> bool {
    text.ends_with('l') || text.ends_with('L')
}

/// Whether the literal text carries a Float suffix (`f`/`F`).
pub fn has_float_suffix(text: &str) -> bool {
    text.ends_with('f') || text.ends_with('F')
}

/// Computes the integer value of an Int or Long literal token, decimal or
/// hexadecimal. Returns `None` when the value is outside the bounds of the
/// literal's type (Int unless the `l`/`L` suffix is present).
///
/// Hexadecimal literals wrap like the machine representation does, so
/// `0xffffffff` is the Int value -1.
pub fn int_literal_value(text: &str) -> Option<i64> {
    let is_long = has_long_suffix(text);
    let digits = if is_long {
        &text[..text.len() - 1]
    } else {
        text
    };
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > if is_long { 16 } else { 8 } {
            return None;
        }
        let mut value: i64 = 0;
        for c in hex.chars() {
            value = (value << 4) | i64::from(c.to_digit(16)?);
        }
        if !is_long {
            value = i64::from(value as i32);
        }
        Some(value)
    } else {
        let value: i64 = digits.parse().ok()?;
        if !is_long && i32::try_from(value).is_err() {
            return None;
        }
        Some(value)
    }
}

/// The Double value of a float literal token without an `f`/`F` suffix.
pub fn double_literal_value(text: &str) -> f64 {
    text.parse().expect("lexer produced a malformed float literal")
}

/// The Float value of a float literal token with an `f`/`F` suffix.
pub fn float_literal_value(text: &str) -> f32 {
    text[..text.len() - 1]
        .parse()
        .expect("lexer produced a malformed float literal")
}
