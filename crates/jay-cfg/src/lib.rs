//! IR and interface types for the Jay compiler.
//!
//! This crate owns the data the pipeline passes between phases:
//! - `types` - compile-time types and the numeric promotion lattice
//! - `ir` - labels, operands, three-address statements, methods, classes
//! - `interface` - the externally visible class shape (`.int` payload)
//! - `universe` - dense bit sets over a shared universe of values
//! - `dump` - human-readable method listings

pub mod dump;
pub mod interface;
pub mod ir;
pub mod types;
pub mod universe;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod types_tests;

pub use dump::dump_method;
pub use interface::{ClassInterface, FieldInterface, MethodInterface};
pub use ir::{Class, Label, Method, MethodCallData, Op, Operand, Statement, Value, VarId, VarTable};
pub use types::{ParseTypeError, ReducedType, Type};
pub use universe::{Universe, UniverseSet};
