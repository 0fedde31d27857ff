//! Externally visible class shapes.
//!
//! A `ClassInterface` is the only thing that crosses compilation-unit
//! boundaries: the class name plus its typed fields and methods. It
//! round-trips through the `.int` JSON files, where types appear as code
//! strings (`"Int[][]"`) and a void return type appears as `"void"`.

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// The externally visible shape of a class field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInterface {
    pub identifier: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// The externally visible shape of a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInterface {
    pub identifier: String,
    #[serde(rename = "returnType", with = "void_type")]
    pub return_type: Option<Type>,
    #[serde(rename = "argTypes")]
    pub arg_types: Vec<Type>,
}

/// The externally visible shape of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInterface {
    pub identifier: String,
    pub fields: Vec<FieldInterface>,
    pub methods: Vec<MethodInterface>,
}

impl ClassInterface {
    pub fn field(&self, identifier: &str) -> Option<&FieldInterface> {
        self.fields.iter().find(|f| f.identifier == identifier)
    }

    pub fn method(&self, identifier: &str) -> Option<&MethodInterface> {
        self.methods.iter().find(|m| m.identifier == identifier)
    }
}

/// Serializes `None` return types as the string `"void"`.
mod void_type {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::Type;

    pub fn serialize<S: Serializer>(
        value: &Option<Type>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ty) => serializer.collect_str(ty),
            None => serializer.serialize_str("void"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Type>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "void" {
            Ok(None)
        } else {
            s.parse().map(Some).map_err(D::Error::custom)
        }
    }
}
