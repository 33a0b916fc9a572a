//! Command line interface for charon

use crate::{
    compiler::compile,
    core::{Config, Error, Options, Result},
    parser::parse,
};

use std::{fs, path::PathBuf, process::Command};

#[derive(Copy, Clone)]
pub enum Action {
    /// Print the parse tree
    Parse,
    /// Print the generated Lua
    Print,
    /// Write the generated Lua to the output file
    Compile,
    /// Compile and run the output with the `lua` interpreter
    Run,
}

pub fn run(config: &Config, action: Action) -> Result<Option<String>> {
    match action {
        Action::Parse => {
            let prog = parse(&config.program)?;
            let tree = prog.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n");

            Ok(Some(tree))
        }
        Action::Print => Ok(Some(compile(&config.program, &config.source, &config.options)?)),
        Action::Compile => {
            gen(config)?;

            Ok(None)
        }
        Action::Run => {
            gen(config)?;
            exec(config)
        }
    }
}

/// Compile the program and write the output file
pub fn gen(config: &Config) -> Result<()> {
    let code = compile(&config.program, &config.source, &config.options)?;

    fs::write(&config.output, code)
        .map_err(|e| Error::Io { message: format!("Failed to write to {}", &config.output), e })?;

    log::info!("Compiled {} into {}", config.source, config.output);

    Ok(())
}

/// Compile a source file into a Lua file
///
/// The output goes next to the source with a `.lua` extension unless `dest`
/// says otherwise. Returns the path written to.
pub fn compile_file(src: &str, dest: Option<&str>, options: &Options) -> Result<String> {
    let program = fs::read_to_string(src)
        .map_err(|e| Error::Io { message: format!("Failed to read {}", src), e })?;

    let config = Config {
        source: src.to_string(),
        program,
        output: dest.map_or_else(|| Config::lua(src), String::from),
        options: options.clone(),
    };

    gen(&config)?;

    Ok(config.output)
}

/// Run the generated Lua file and return its output
///
/// The interpreter runs in the directory of the output file, so a required
/// runtime shim is looked up next to it.
pub fn exec(config: &Config) -> Result<Option<String>> {
    let path = PathBuf::from(&config.output).canonicalize()?;

    let mut lua = Command::new("lua");
    lua.arg(&path);
    if let Some(dir) = path.parent() {
        lua.current_dir(dir);
    }

    let exe = lua
        .output()
        .map_err(|e| Error::Io { message: String::from("Failed to execute the lua interpreter"), e })?;

    if exe.status.success() {
        Ok(Some(String::from_utf8_lossy(&exe.stdout).trim().to_string()))
    } else {
        Err(Error::Runtime(format!(
            "Lua exited with code `{:?}`\n{}",
            exe.status.code(),
            String::from_utf8_lossy(&exe.stderr).trim()
        )))
    }
}
