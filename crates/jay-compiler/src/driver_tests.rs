//! Unit tests for the build driver.
//!
//! These stop at the text outputs; assembling objects and linking need a
//! host C++ compiler and are exercised by the CLI in real use.

use indoc::indoc;

use crate::driver::{DriverError, build_class_files, compile_source, read_class_interface};

const COUNTER: &str = indoc! {r#"
    class Counter {
        Int count = 0;
        Int add(Int amount) {
            count = count + amount;
            return count;
        }
        void main() {
            println(add(2, 3));
        }
    }
"#};

#[test]
fn build_writes_interface_and_cpp_files() {
    let src = tempfile::tempdir().unwrap();
    let build = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("Counter.jay"), COUNTER).unwrap();

    let identifier = build_class_files(src.path(), build.path(), "Counter.jay").unwrap();
    assert_eq!(identifier, "Counter");

    let interface = read_class_interface(build.path(), "Counter").unwrap();
    assert_eq!(interface.identifier, "Counter");
    assert!(interface.method("add").is_some());

    let header = std::fs::read_to_string(build.path().join("Counter.hpp")).unwrap();
    assert!(header.contains("class c_Counter"));
    let implementation = std::fs::read_to_string(build.path().join("Counter.cpp")).unwrap();
    assert!(implementation.contains("int c_Counter::m_add("));
}

#[test]
fn build_creates_the_build_directory() {
    let src = tempfile::tempdir().unwrap();
    let build = tempfile::tempdir().unwrap();
    let nested = build.path().join("out/debug");
    std::fs::write(src.path().join("Counter.jay"), COUNTER).unwrap();

    build_class_files(src.path(), &nested, "Counter.jay").unwrap();
    assert!(nested.join("Counter.int").exists());
}

#[test]
fn compile_errors_surface_as_diagnostics() {
    let src = tempfile::tempdir().unwrap();
    let build = tempfile::tempdir().unwrap();
    std::fs::write(
        src.path().join("Bad.jay"),
        "class Bad { void m() { print(ghost); } }",
    )
    .unwrap();

    match build_class_files(src.path(), build.path(), "Bad.jay") {
        Err(DriverError::Compile(diagnostics)) => {
            assert!(diagnostics.has_errors());
            let rendered = diagnostics.render("Bad.jay");
            assert!(rendered.contains("Bad.jay:1"));
        }
        other => panic!("expected compile diagnostics, got {other:?}"),
    }
    // No outputs for a failed compile.
    assert!(!build.path().join("Bad.int").exists());
}

#[test]
fn array_programs_fail_the_build_with_an_emit_error() {
    let src = tempfile::tempdir().unwrap();
    let build = tempfile::tempdir().unwrap();
    std::fs::write(
        src.path().join("Arrays.jay"),
        "class Arrays { void m(Int[] a) { print(a[0]); } }",
    )
    .unwrap();

    match build_class_files(src.path(), build.path(), "Arrays.jay") {
        Err(DriverError::Emit(error)) => {
            assert_eq!(error.class, "Arrays");
        }
        other => panic!("expected an emit error, got {other:?}"),
    }
    // A rejected class leaves no partial outputs behind.
    assert!(!build.path().join("Arrays.int").exists());
    assert!(!build.path().join("Arrays.hpp").exists());
}

#[test]
fn missing_source_files_are_io_errors() {
    let src = tempfile::tempdir().unwrap();
    let build = tempfile::tempdir().unwrap();
    match build_class_files(src.path(), build.path(), "Missing.jay") {
        Err(DriverError::Io(_)) => {}
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[test]
fn compile_source_returns_the_class_or_diagnostics() {
    assert!(compile_source(COUNTER).is_ok());
    assert!(compile_source("class Broken {").is_err());
    let diagnostics = compile_source("class C { void m() { print(1 +) ; } }").unwrap_err();
    assert!(diagnostics.has_errors());
}
