use std::path::PathBuf;

pub struct LinkArgs {
    pub build_dir: PathBuf,
    pub output: PathBuf,
    pub class: String,
    pub method: String,
}

pub fn run(args: LinkArgs) {
    if let Err(error) =
        jay_compiler::link_executable(&args.build_dir, &args.output, &args.class, &args.method)
    {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
