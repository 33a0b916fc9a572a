//! Core types shared by most of the program
use crate::diagnostics;
use colored::Colorize;
use std::{fmt, str::FromStr};

/// A single point in the source text
///
/// Offsets are 0 based byte offsets, lines and columns start at 1 like every
/// editor out there.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Span of source text a term was parsed from
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

/// A program is an ordered sequence of top level invocations
pub type Program = Vec<Invoke>;

/// Abstract Syntax Tree
///
/// Terms are produced once by the parser and never mutated afterwards, macros
/// that rewrite code synthesize fresh terms instead.
#[derive(Debug, PartialEq, Clone)]
pub enum Term {
    // `[a b c]`
    List { values: Vec<Term>, at: Location },
    // `{k v}` or the escaped form `'{:k v}` with plain string keys
    Table { values: Vec<Term>, escaped: bool, at: Location },
    // `(target args...)`
    Invoke(Invoke),
    // `root::field:method`
    Access(Access),
    Number(Token),
    // String literals keep their quotes and escapes as written
    Str(Token),
    // `:name`, stored without the colon
    Symbol(Token),
    Name(Token),
    // The reflective self reference `#'`
    Wildcard(Token),
}

/// Any leaf of the syntax tree
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub value: String,
    pub at: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Invoke {
    pub target: Box<Term>,
    pub args: Vec<Term>,
    pub at: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Access {
    pub root: Token,
    pub segments: Vec<Segment>,
    pub at: Location,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Segment {
    pub name: Token,
    pub mode: Mode,
    pub at: Location,
}

/// Access expression segment operators
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mode {
    /// `:`, method style access with an implicit self
    Bound,
    /// `::`, plain field access
    Unbound,
    /// `:?`, reserved
    BoundCoalesce,
    /// `::?`, reserved
    UnboundCoalesce,
}

impl Token {
    pub fn new<S: Into<String>>(value: S, at: Location) -> Self {
        Token { value: value.into(), at }
    }
}

impl Invoke {
    /// Build a call to a named target, used by macros that rewrite code
    pub fn call<S: Into<String>>(target: S, at: Location, args: Vec<Term>) -> Self {
        Invoke { target: Box::new(Term::Name(Token::new(target, at))), args, at }
    }

    /// Name of the target if it is a plain name
    pub fn name(&self) -> Option<&str> {
        match self.target.as_ref() {
            Term::Name(t) => Some(&t.value),
            _ => None,
        }
    }
}

impl Term {
    pub fn location(&self) -> Location {
        match self {
            Term::List { at, .. } | Term::Table { at, .. } => *at,
            Term::Invoke(i) => i.at,
            Term::Access(a) => a.at,
            Term::Number(t) | Term::Str(t) | Term::Symbol(t) | Term::Name(t) | Term::Wildcard(t) => {
                t.at
            }
        }
    }

    /// Human readable type of the term for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Term::List { .. } => "List",
            Term::Table { .. } => "Table",
            Term::Invoke(..) => "Invoke",
            Term::Access(..) => "AccessExpression",
            Term::Number(..) => "Number",
            Term::Str(..) => "String",
            Term::Symbol(..) => "Symbol",
            Term::Name(..) => "Name",
            Term::Wildcard(..) => "Wildcard",
        }
    }

    pub fn as_name(&self) -> Option<&Token> {
        match self {
            Term::Name(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Token> {
        match self {
            Term::Symbol(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, Term::Name(t) if t.value == name)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Bound => write!(f, ":"),
            Mode::Unbound => write!(f, "::"),
            Mode::BoundCoalesce => write!(f, ":?"),
            Mode::UnboundCoalesce => write!(f, "::?"),
        }
    }
}

fn spaced(f: &mut fmt::Formatter, terms: &[Term]) -> fmt::Result {
    let mut l = terms.iter().peekable();
    while let Some(elem) = l.next() {
        if l.peek().is_some() {
            write!(f, "{} ", elem)?;
        } else {
            write!(f, "{}", elem)?;
        }
    }
    Ok(())
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.root.value)?;
        for s in &self.segments {
            write!(f, "{}{}", s.mode, s.name.value)?;
        }
        Ok(())
    }
}

impl fmt::Display for Invoke {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.target)?;
        if !self.args.is_empty() {
            write!(f, " ")?;
            spaced(f, &self.args)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::List { values, .. } => {
                write!(f, "[")?;
                spaced(f, values)?;
                write!(f, "]")
            }
            Term::Table { values, escaped, .. } => {
                write!(f, "{}{{", if *escaped { "'" } else { "" })?;
                spaced(f, values)?;
                write!(f, "}}")
            }
            Term::Invoke(i) => write!(f, "{}", i),
            Term::Access(a) => write!(f, "{}", a),
            Term::Symbol(t) => write!(f, ":{}", t.value),
            Term::Number(t) | Term::Str(t) | Term::Name(t) | Term::Wildcard(t) => {
                write!(f, "{}", t.value)
            }
        }
    }
}

/// Lua versions the generated code can target
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Target {
    Lua51,
    Lua52,
    Lua53,
    Lua54,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "5.1" => Ok(Target::Lua51),
            "5.2" => Ok(Target::Lua52),
            "5.3" => Ok(Target::Lua53),
            "5.4" => Ok(Target::Lua54),
            _ => Err(Error::Config(format!("Unknown Lua target `{}`, expected one of 5.1-5.4", s))),
        }
    }
}

/// Shape of the generated compilation unit
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Output {
    /// A chunk returning its package table, loadable with `require`
    Module,
}

/// Code generation switches
#[derive(Debug, PartialEq, Clone)]
pub struct Options {
    pub mode: Output,
    /// Thread `...` through the closures generated for blocks, so that `(...)`
    /// keeps working inside `let`, `if`, `do` and friends.
    pub variadic_closures: bool,
    /// Inline the runtime shim instead of requiring it
    pub embed_runtime: bool,
    /// Emit no runtime acquisition at all
    pub no_runtime_require: bool,
    /// Publish the package table as `_G[<module>]` instead of returning it
    pub global_export: bool,
    pub target: Target,
}

impl Options {
    /// Preset for scripts run straight from the command line
    pub fn cli() -> Self {
        Options { variadic_closures: true, ..Options::module() }
    }

    /// Preset for libraries loaded with `require`
    pub fn module() -> Self {
        Options {
            mode: Output::Module,
            variadic_closures: false,
            embed_runtime: false,
            no_runtime_require: false,
            global_export: false,
            target: Target::Lua53,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::module()
    }
}

/// Control behavior and external interaction of the program.
pub struct Config {
    /// Name of the source, used in diagnostics
    pub source: String,
    /// Program is the input source
    pub program: String,
    /// Path of the generated Lua file
    pub output: String,
    pub options: Options,
}

impl Config {
    /// Default output path for a source file, `foo.crn` compiles to `foo.lua`
    pub fn lua(source: &str) -> String {
        match source.rfind('.') {
            Some(dot) if !source[dot..].contains('/') => format!("{}.lua", &source[..dot]),
            _ => format!("{}.lua", source),
        }
    }
}

/// Custom error type for all of charon
///
/// Every variant except `Io`, `Config` and `Runtime` is a compilation error
/// and aborts the current compilation unit; `Compile` wraps whichever of them
/// surfaced with the source it happened in.
#[derive(Debug)]
pub enum Error {
    // Malformed source text
    Parser { message: String, at: Option<Location> },
    // Malformed macro arguments, wrong arity or term shapes
    Syntax { message: String, at: Option<Location> },
    // Use of an unbound identifier
    Reference { name: String, message: String, at: Option<Location> },
    // Impure call or definition from a pure function
    Purity { message: String, at: Option<Location> },
    // Redeclarations and misused meta specifiers
    Type { message: String, at: Option<Location> },
    // A macro expanded through something that is not a name
    BadMacro { message: String, at: Option<Location> },
    // Internal errors are unexpected errors within the compiler
    Internal { message: String, report: Option<String>, at: Option<Location> },
    // Bad command line or compile options
    Config(String),
    Io { message: String, e: std::io::Error },
    // The generated program failed when run
    Runtime(String),
    // Any of the above, annotated with the source it came from
    Compile { source_name: String, code: String, cause: Box<Error> },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn syntax<S: Into<String>>(message: S, at: Location) -> Self {
        Error::Syntax { message: message.into(), at: Some(at) }
    }

    pub fn purity<S: Into<String>>(message: S, at: Location) -> Self {
        Error::Purity { message: message.into(), at: Some(at) }
    }

    pub fn types<S: Into<String>>(message: S, at: Location) -> Self {
        Error::Type { message: message.into(), at: Some(at) }
    }

    pub fn reference(name: &str, at: Location) -> Self {
        Error::Reference {
            name: name.to_string(),
            message: format!("Undefined reference to '{}'", name),
            at: Some(at),
        }
    }

    /// The innermost error, looking through compile wrappers
    pub fn cause(&self) -> &Error {
        match self {
            Error::Compile { cause, .. } => cause.cause(),
            e => e,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Parser { at, .. }
            | Error::Syntax { at, .. }
            | Error::Reference { at, .. }
            | Error::Purity { at, .. }
            | Error::Type { at, .. }
            | Error::BadMacro { at, .. }
            | Error::Internal { at, .. } => *at,
            Error::Compile { cause, .. } => cause.location(),
            Error::Config(_) | Error::Io { .. } | Error::Runtime(_) => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Error::Parser { .. } => "Failed to parse program",
            Error::Syntax { .. } => "Syntax error",
            Error::Reference { .. } => "Reference error",
            Error::Purity { .. } => "Purity violation",
            Error::Type { .. } => "Type error",
            Error::BadMacro { .. } => "Bad macro definition",
            Error::Internal { .. } => "Something went wrong!",
            Error::Config(_) => "Invalid configuration",
            Error::Io { .. } => "Failed to read or write a file",
            Error::Runtime(_) => "Runtime error",
            Error::Compile { cause, .. } => cause.title(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::Parser { message, .. }
            | Error::Syntax { message, .. }
            | Error::Reference { message, .. }
            | Error::Purity { message, .. }
            | Error::Type { message, .. }
            | Error::BadMacro { message, .. }
            | Error::Internal { message, .. }
            | Error::Config(message)
            | Error::Runtime(message) => message.clone(),
            Error::Io { message, e } => format!("{} {}", message, e),
            Error::Compile { cause, .. } => cause.message(),
        }
    }
}

// Implement std::convert::From for Error; from io::Error
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io { message: String::from(""), e: error }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Compile { source_name, code, cause } => {
                write!(f, "{}", diagnostics::render(source_name, code, cause))
            }
            Self::Internal { message, report, .. } => {
                writeln!(f, "{}\n", self.title().red().bold())?;
                writeln!(f, "{}", message)?;
                if let Some(report) = report {
                    writeln!(f, "{}", report)?;
                }
                Ok(())
            }
            _ => {
                writeln!(f, "{}\n", self.title().red().bold())?;
                writeln!(f, "{}", self.message())
            }
        }
    }
}
