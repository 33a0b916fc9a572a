extern crate charon;
extern crate getopts;

use charon::{
    cli::{run, Action::*},
    core::{Config, Options, Target},
};
use std::{
    env,
    fs,
    io::{self, Read},
    process::exit,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let bin = args[0].clone();

    let mut opts = getopts::Options::new();
    opts.optopt("o", "", "Output file name", "FILE");
    opts.optflag("S", "", "Print generated Lua");
    opts.optflag("p", "", "Print parse tree");
    opts.optflag("r", "run", "Run the generated Lua with the lua interpreter");
    opts.optopt("", "preset", "Code generation preset, defaults to module", "cli|module");
    opts.optopt("", "target", "Lua version to generate code for, defaults to 5.3", "5.1|5.2|5.3|5.4");
    opts.optflag("", "embed-runtime", "Inline the runtime shim in the output");
    opts.optflag("", "no-runtime", "Don't load the runtime shim at all");
    opts.optflag("", "global", "Publish the package in the global environment");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => fail(&f.to_string()),
    };

    if matches.opt_present("h") {
        print!("{}", opts.usage(&format!("Usage: {} [options] [FILE]", bin)));
        return;
    }

    let mut options = match matches.opt_str("preset").as_deref() {
        None | Some("module") => Options::module(),
        Some("cli") => Options::cli(),
        Some(other) => fail(&format!("Unknown preset `{}`, expected cli or module", other)),
    };

    if let Some(target) = matches.opt_str("target") {
        options.target = target.parse::<Target>().unwrap_or_else(|e| fail(&e.to_string()));
    }

    options.embed_runtime = matches.opt_present("embed-runtime");
    options.no_runtime_require = matches.opt_present("no-runtime");
    options.global_export = matches.opt_present("global");

    if options.embed_runtime && options.no_runtime_require {
        fail("--embed-runtime and --no-runtime are mutually exclusive");
    }

    // Read the source from the first free argument, stdin otherwise
    let (source, program) = match matches.free.first() {
        Some(path) => match fs::read_to_string(path) {
            Ok(program) => (path.clone(), program),
            Err(e) => fail(&format!("Failed to read {}: {}", path, e)),
        },
        None => {
            let mut program = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut program) {
                fail(&format!("Expected a program in stdin: {}", e))
            }
            (String::from("stdin"), program)
        }
    };

    let print = matches.opt_present("S");
    let output = matches.opt_str("o").unwrap_or_else(|| {
        if matches.free.is_empty() {
            String::from("out.lua")
        } else {
            Config::lua(&source)
        }
    });

    let config = Config { source, program, output, options };

    let action = if matches.opt_present("p") {
        Parse
    } else if print {
        Print
    } else if matches.opt_present("r") {
        Run
    } else {
        Compile
    };

    // Run the entire CLI with config
    match run(&config, action) {
        Err(e) => {
            eprintln!("{}", e);
            exit(1)
        }
        Ok(Some(out)) => println!("{}", out),
        Ok(None) => {}
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    exit(2)
}
