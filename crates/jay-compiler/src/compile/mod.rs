//! CFG construction: method compilation and class assembly.
//!
//! Compilation is top-down and happens after the analyses: identifiers come
//! pre-resolved, expressions pre-typed, and break-flow questions
//! pre-answered. The module splits along the original phase boundary:
//! - `method` - one method AST to a linear three-address statement list
//! - `class` - field initializers, method interfaces, class assembly

pub mod class;
pub mod method;

#[cfg(test)]
mod compile_tests;

pub use class::compile_file;
pub use method::MethodCompiler;
