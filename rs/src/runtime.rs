//! The Lua runtime shim
//!
//! Generated code leans on a small Lua library for lists, tables, atoms and
//! the function versions of the operators. Programs either `require` it at
//! load time or carry a copy of it inline.

/// Source of the shim, a chunk that builds and returns the `charon` table
pub const SOURCE: &str = include_str!("charon-runtime.lua");

/// Preamble loading the shim as a module
pub const REQUIRE: &str = "local charon = require 'charon-runtime';";

/// The shim rewritten to run inside a `do ... end` block of another chunk
///
/// The embedding chunk declares `charon` itself, so the first `local charon`
/// declaration and the `return charon;` of the shim are commented out. Every
/// line is indented by two spaces.
pub fn embedded() -> String {
    let mut declared = false;

    let lines = SOURCE.lines().map(|line| {
        if !declared && line.starts_with("local charon") {
            declared = true;
            format!("-- {}", line)
        } else if line.trim() == "return charon;" {
            format!("-- {}", line)
        } else {
            line.to_string()
        }
    });

    let mut out = String::new();
    for line in lines {
        out.push('\n');
        out.push_str(&line);
    }

    out.replace('\n', "\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shim() {
        assert!(SOURCE.starts_with("local charon = {};"));
        assert!(SOURCE.trim_end().ends_with("return charon;"));
    }

    #[test]
    fn embedding() {
        let rt = embedded();

        assert!(rt.starts_with("\n  -- local charon = {};\n"));
        assert!(rt.contains("\n  -- return charon;"));
        assert!(rt.contains("\n  function charon.str(...)"));
        assert!(!rt.contains("\nlocal charon"));
    }

    #[test]
    fn defines_stdlib() {
        use crate::stdlib::STDLIB;

        for def in STDLIB {
            let name = def.fallback.unwrap_or(def.name);
            if let Some(field) = name.strip_prefix("charon.") {
                let defined = SOURCE.contains(&format!("function charon.{}(", field))
                    || SOURCE.contains(&format!("charon.{} = ", field));
                assert!(defined, "{} is missing from the runtime", name);
            }
        }
    }
}
