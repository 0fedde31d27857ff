//! Build orchestration.
//!
//! A class compiles to four files in the build directory: `<Class>.int`
//! (interface JSON), `<Class>.hpp` and `<Class>.cpp` (emitted C++), and
//! `<Class>.o` (assembled by the host C++ compiler). Producing the text
//! outputs is separate from invoking the host compiler so the pipeline is
//! testable without one. A second entry point links previously built
//! objects into an executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use jay_cfg::{Class, ClassInterface};

use crate::compile;
use crate::diagnostics::Diagnostics;
use crate::emit;
use crate::parser;

/// Error from a driver operation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("compilation failed with {} error(s)", .0.error_count())]
    Compile(Diagnostics),
    #[error(transparent)]
    Emit(#[from] emit::CppEmitError),
    #[error("host C++ compiler failed: {0}")]
    HostCompiler(String),
    #[error(transparent)]
    Interface(#[from] emit::InterfaceReadError),
}

/// Compiles one source string to its CFG representation, or the
/// diagnostics explaining why there is none.
pub fn compile_source(source: &str) -> Result<Class, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let Some((ast, root)) = parser::parse_file(source, &mut diagnostics) else {
        return Err(diagnostics);
    };
    match compile::compile_file(&ast, root, &mut diagnostics) {
        Some(class) => Ok(class),
        None => Err(diagnostics),
    }
}

/// Compiles `filename` (relative to `src_dir`) and writes the `.int`,
/// `.hpp`, and `.cpp` outputs into `build_dir`. Returns the compiled
/// class's identifier.
pub fn build_class_files(
    src_dir: &Path,
    build_dir: &Path,
    filename: &str,
) -> Result<String, DriverError> {
    let source = std::fs::read_to_string(src_dir.join(filename))?;
    let class = compile_source(&source).map_err(DriverError::Compile)?;
    let identifier = class.identifier.clone();

    let header = emit::header_file(&class)?;
    let implementation = emit::implementation_file(&class)?;

    std::fs::create_dir_all(build_dir)?;
    let interface = class.interface();
    std::fs::write(
        build_dir.join(format!("{identifier}.int")),
        emit::write_class_interface(&interface),
    )?;
    std::fs::write(build_dir.join(format!("{identifier}.hpp")), header)?;
    std::fs::write(build_dir.join(format!("{identifier}.cpp")), implementation)?;
    Ok(identifier)
}

fn run_host_compiler(command: &mut Command) -> Result<(), DriverError> {
    let status = command.status().map_err(DriverError::Io)?;
    if status.success() {
        Ok(())
    } else {
        Err(DriverError::HostCompiler(status.to_string()))
    }
}

/// Assembles a previously emitted `<Class>.cpp` into `<Class>.o`.
pub fn assemble_object(build_dir: &Path, class_identifier: &str) -> Result<(), DriverError> {
    run_host_compiler(
        Command::new("c++")
            .arg("-c")
            .arg(build_dir.join(format!("{class_identifier}.cpp")))
            .arg("-Wall")
            .arg("-o")
            .arg(build_dir.join(format!("{class_identifier}.o"))),
    )
}

/// Compiles one source file all the way to an object file. Returns the
/// compiled class's identifier.
pub fn compile_file(
    src_dir: &Path,
    build_dir: &Path,
    filename: &str,
) -> Result<String, DriverError> {
    let identifier = build_class_files(src_dir, build_dir, filename)?;
    assemble_object(build_dir, &identifier)?;
    Ok(identifier)
}

/// Links the objects built for `class_identifier` into an executable whose
/// `main` constructs the class and calls `main_method`.
pub fn link_executable(
    build_dir: &Path,
    executable: &Path,
    class_identifier: &str,
    main_method: &str,
) -> Result<(), DriverError> {
    // The '+' cannot appear in a class identifier, so this name never
    // collides with a generated class file.
    let main_path: PathBuf = build_dir.join("temp+main.cpp");
    std::fs::write(&main_path, emit::main_file(class_identifier, main_method))?;
    run_host_compiler(
        Command::new("c++")
            .arg(build_dir.join(format!("{class_identifier}.o")))
            .arg(&main_path)
            .arg("-o")
            .arg(executable),
    )
}

/// Reads the interface written for `class_identifier` by a previous
/// [`build_class_files`] call.
pub fn read_class_interface(
    build_dir: &Path,
    class_identifier: &str,
) -> Result<ClassInterface, DriverError> {
    let text = std::fs::read_to_string(build_dir.join(format!("{class_identifier}.int")))?;
    Ok(emit::read_class_interface(&text)?)
}
