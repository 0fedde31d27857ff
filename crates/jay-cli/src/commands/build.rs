use std::path::PathBuf;

use jay_compiler::DriverError;

pub struct BuildArgs {
    pub src_root: PathBuf,
    pub build_dir: PathBuf,
    pub file: String,
}

pub fn run(args: BuildArgs) {
    match jay_compiler::compile_file(&args.src_root, &args.build_dir, &args.file) {
        Ok(_) => {}
        Err(DriverError::Compile(diagnostics)) => {
            eprint!("{}", diagnostics.render(&args.file));
            std::process::exit(1);
        }
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}
