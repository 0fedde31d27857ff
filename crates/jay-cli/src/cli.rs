use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jayc", bin_name = "jayc")]
#[command(about = "Compiler for the Jay language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile one source file to interface, C++, and object files
    #[command(after_help = "EXAMPLES:\n  jayc build src build Counter.jay")]
    Build {
        /// Root source directory
        src_root: PathBuf,
        /// Build output directory
        build_dir: PathBuf,
        /// Source file, relative to the root source directory
        file: String,
    },

    /// Link previously built object files into an executable
    #[command(after_help = "EXAMPLES:\n  jayc link build counter Counter main")]
    Link {
        /// Build directory holding the compiled objects
        build_dir: PathBuf,
        /// Executable file to produce
        output: PathBuf,
        /// Identifier of the class containing the main method
        class: String,
        /// Identifier of the main method (takes no arguments)
        method: String,
    },

    /// Compile a source file in memory and print its CFG listing
    Dump {
        /// Source file to compile
        file: PathBuf,
    },
}
