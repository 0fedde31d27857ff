//! Compile-time types and the numeric promotion lattice.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The projection of a [`Type`] used by operands and the emitter: the
/// primitive types plus a single `Object` bucket for arrays and classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReducedType {
    Bool,
    Byte,
    Int,
    Long,
    Float,
    Double,
    Object,
}

/// The compile-time type of an expression or variable: a class name plus an
/// array dimension count. `Int` is `("Int", 0)`, `Int[][]` is `("Int", 2)`.
///
/// The primitive class names are `Bool`, `Byte`, `Int`, `Long`, `Float`, and
/// `Double`; any other name denotes an object class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    class_name: String,
    dims: u32,
}

impl Type {
    pub fn new(class_name: impl Into<String>, dims: u32) -> Self {
        Self {
            class_name: class_name.into(),
            dims,
        }
    }

    pub fn scalar(class_name: impl Into<String>) -> Self {
        Self::new(class_name, 0)
    }

    pub fn bool_type() -> Self {
        Self::scalar("Bool")
    }

    pub fn int_type() -> Self {
        Self::scalar("Int")
    }

    pub fn object() -> Self {
        Self::scalar("Object")
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn dims(&self) -> u32 {
        self.dims
    }

    /// The type of the elements of arrays of this type. Callers guard on
    /// `dims() > 0`; a scalar maps to itself so error recovery can proceed.
    pub fn element_type(&self) -> Type {
        Type::new(self.class_name.clone(), self.dims.saturating_sub(1))
    }

    pub fn array_of(&self) -> Type {
        Type::new(self.class_name.clone(), self.dims + 1)
    }

    pub fn is_bool(&self) -> bool {
        self.dims == 0 && self.class_name == "Bool"
    }

    /// Whether this type can be an operand to arithmetic.
    pub fn is_numeric(&self) -> bool {
        self.dims == 0
            && matches!(
                self.class_name.as_str(),
                "Byte" | "Int" | "Long" | "Float" | "Double"
            )
    }

    pub fn is_integer_like(&self) -> bool {
        self.dims == 0 && matches!(self.class_name.as_str(), "Byte" | "Int" | "Long")
    }

    /// Relative promotion level; greater is more promoted. Only meaningful
    /// for numeric types.
    fn promotion_level(&self) -> u32 {
        match self.class_name.as_str() {
            "Byte" => 1,
            "Int" => 2,
            "Long" => 3,
            "Float" => 4,
            "Double" => 5,
            _ => 0,
        }
    }

    /// Whether `other` promotes to `self`. Promotion is the widening that
    /// makes `1 + 2.0` well-typed: the Int operand widens to Double. False
    /// when the types are equal. Assumes both sides are numeric.
    pub fn is_more_promoted_than(&self, other: &Type) -> bool {
        self.promotion_level() > other.promotion_level()
    }

    /// The lowest common ancestor of two types; the type of
    /// `cond ? <self> : <other>`. Identical types map to themselves, arrays
    /// and mixed non-numeric scalars widen to `Object`, and numeric pairs
    /// pick the more promoted side.
    pub fn least_common(&self, other: &Type) -> Type {
        if self == other {
            self.clone()
        } else if self.dims > 0 || other.dims > 0 {
            Type::object()
        } else if self.is_numeric() && other.is_numeric() {
            if self.is_more_promoted_than(other) {
                self.clone()
            } else {
                other.clone()
            }
        } else {
            Type::object()
        }
    }

    pub fn reduced(&self) -> ReducedType {
        if self.dims > 0 {
            return ReducedType::Object;
        }
        match self.class_name.as_str() {
            "Bool" => ReducedType::Bool,
            "Byte" => ReducedType::Byte,
            "Int" => ReducedType::Int,
            "Long" => ReducedType::Long,
            "Float" => ReducedType::Float,
            "Double" => ReducedType::Double,
            _ => ReducedType::Object,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class_name)?;
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Error parsing the code-string form of a [`Type`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a type code string: {0:?}")]
pub struct ParseTypeError(pub String);

impl FromStr for Type {
    type Err = ParseTypeError;

    /// Parses the code-string form produced by `Display`, e.g. `Int[][]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name_len = s.find('[').unwrap_or(s.len());
        let name = &s[..name_len];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ParseTypeError(s.to_string()));
        }
        let mut rest = &s[name_len..];
        let mut dims = 0u32;
        while !rest.is_empty() {
            match rest.strip_prefix("[]") {
                Some(tail) => {
                    dims += 1;
                    rest = tail;
                }
                None => return Err(ParseTypeError(s.to_string())),
            }
        }
        Ok(Type::new(name, dims))
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
