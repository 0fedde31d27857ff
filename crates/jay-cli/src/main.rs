mod cli;
mod commands;

use clap::Parser;

use cli::{Cli, Command};
use commands::build::BuildArgs;
use commands::dump::DumpArgs;
use commands::link::LinkArgs;

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            src_root,
            build_dir,
            file,
        } => commands::build::run(BuildArgs {
            src_root,
            build_dir,
            file,
        }),
        Command::Link {
            build_dir,
            output,
            class,
            method,
        } => commands::link::run(LinkArgs {
            build_dir,
            output,
            class,
            method,
        }),
        Command::Dump { file } => commands::dump::run(DumpArgs { file }),
    }
}
