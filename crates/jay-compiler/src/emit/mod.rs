//! Output generation: C++ source and interface files.

pub mod cpp;
pub mod interface_io;

#[cfg(test)]
mod interface_io_tests;

pub use cpp::{CppEmitError, header_file, implementation_file, main_file};
pub use interface_io::{InterfaceReadError, read_class_interface, write_class_interface};
