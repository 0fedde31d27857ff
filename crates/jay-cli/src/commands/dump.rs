use std::path::PathBuf;

use jay_cfg::dump_method;

pub struct DumpArgs {
    pub file: PathBuf,
}

pub fn run(args: DumpArgs) {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };
    let path = args.file.display().to_string();
    match jay_compiler::compile_source(&source) {
        Ok(class) => {
            for (index, method) in class.methods.values().enumerate() {
                if index > 0 {
                    println!();
                }
                print!("{}", dump_method(method, &class.vars));
            }
        }
        Err(diagnostics) => {
            eprint!("{}", diagnostics.render(&path));
            std::process::exit(1);
        }
    }
}
