//! Source aware error reporting
//!
//! Every error that escapes the compiler is rendered the same way, regardless
//! of the stage it came from:
//!
//! ```txt
//! Purity violation: Impure functions cannot be invoked from a pure context!
//!   --> samples/lib.crn:3:3
//!  3 |   (println! "hi"))
//!    |   ^^^^^^^^^^^^^^^
//! ```
use crate::core::{Error, Location};
use colored::Colorize;

/// Where the bug reports go
pub const ISSUES: &str = "https://github.com/sigmasoldi3r/charon-lang/issues/new";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `source:line:column` of the start of a location
pub fn source_location(source_name: &str, at: &Location) -> String {
    format!("{}:{}:{}", source_name, at.start.line, at.start.column)
}

/// Two line excerpt of the code at a location
///
/// The first line is the offending source line, the second one replaces every
/// character of that line with a blank except under the exact span, which
/// gets a caret. Tabs are kept so that the carets line up in terminals.
pub fn code_slice(code: &str, at: &Location) -> String {
    let line = code.lines().nth(at.start.line.saturating_sub(1)).unwrap_or("");
    let width = line.chars().count();

    let from = at.start.column.max(1);
    let to = if at.end.line == at.start.line { at.end.column } else { width + 1 };
    // Empty spans still deserve a single caret
    let to = to.max(from + 1);

    let underline: String = line
        .chars()
        .enumerate()
        .map(|(i, c)| match i + 1 {
            col if col >= from && col < to => '^',
            _ if c == '\t' => '\t',
            _ => ' ',
        })
        .chain(std::iter::repeat('^').take(if from > width { 1 } else { 0 }))
        .collect();

    let number = at.start.line.to_string();
    let pad = " ".repeat(number.len());

    format!("{} | {}\n{} | {}", number, line, pad, underline.trim_end())
}

/// Render an error with its source excerpt
pub fn render(source_name: &str, code: &str, cause: &Error) -> String {
    let mut out = format!("{}: {}\n", cause.title().red().bold(), cause.message());

    match cause.location() {
        Some(at) => {
            out += &format!("  --> {}\n", source_location(source_name, &at));
            out += &code_slice(code, &at);
            out += "\n";
        }
        None => out += &format!("  --> {}\n", source_name),
    }

    if let Error::Internal { report: Some(report), .. } = cause {
        out += report;
        out += "\n";
    }

    out
}

/// Pre filled issue for errors that can only be caused by a compiler bug
///
/// `what` names the broken component and `context` the place that noticed.
pub fn bug_report(what: &str, context: &str, code: &str, at: &Location) -> String {
    let title = format!("[v{}] Code generation fault at {}", VERSION, context);
    let body = format!(
        "## System information\n```\nCompiler version v{}\nPlatform {}\n```\n\n\
         Context: {}\n\n## Code check\n\nCode that produced the issue:\n```clj\n{}\n```\n\n\
         Location: Line {}, column {}\nStarts at `{}` and ends at `{}`\n\n\
         Please do not hesitate to provide additional steps for reproduction.\n",
        VERSION,
        std::env::consts::OS,
        context,
        code,
        at.start.line,
        at.start.column,
        at.start.offset,
        at.end.offset
    );

    let query = [("title", title.as_str()), ("labels", "bug,codegen"), ("body", body.as_str())]
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("This likely indicates a bug in {}, please open an issue here {}?{}", what, ISSUES, query)
}

/// Percent encode everything except the unreserved URI characters
fn encode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'!' | b'~' | b'*'
            | b'\'' | b'(' | b')' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position;
    use pretty_assertions::assert_eq;

    fn at(line: usize, start: usize, end: usize) -> Location {
        Location {
            start: Position { offset: 0, line, column: start },
            end: Position { offset: 0, line, column: end },
        }
    }

    #[test]
    fn caret() {
        let code = "(def x 1)\n(println! x)\n";

        assert_eq!(code_slice(code, &at(2, 2, 10)), "2 | (println! x)\n  |  ^^^^^^^^");
        assert_eq!(code_slice(code, &at(1, 1, 10)), "1 | (def x 1)\n  | ^^^^^^^^^");
    }

    #[test]
    fn tabs() {
        let code = "\t(f)";
        assert_eq!(code_slice(code, &at(1, 2, 5)), "1 | \t(f)\n  | \t^^^");
    }

    #[test]
    fn multiline() {
        let code = "(let [x 1]\n  x)";
        let mut loc = at(1, 1, 4);
        loc.end.line = 2;

        assert_eq!(code_slice(code, &loc), "1 | (let [x 1]\n  | ^^^^^^^^^^");
    }

    #[test]
    fn location() {
        assert_eq!(source_location("lib.crn", &at(3, 7, 9)), "lib.crn:3:7");
    }

    #[test]
    fn encoding() {
        assert_eq!(encode("a b&c"), "a%20b%26c");
        assert_eq!(encode("bug,codegen"), "bug%2Ccodegen");
    }

    #[test]
    fn report() {
        let r = bug_report("the code generator", "for inliner", "(for)", &at(1, 1, 6));
        assert!(r.starts_with("This likely indicates a bug in the code generator"));
        assert!(r.contains("labels=bug%2Ccodegen"));
        assert!(r.contains(ISSUES));
    }
}
