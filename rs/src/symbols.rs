//! Binding descriptors
//!
//! Every name the compiler knows about is described by a [Binding]: the name
//! it was written with, the name it is emitted as, what it can do and where it
//! is visible.
//!
//! Local names are mangled into a content derived identifier so that they can
//! never collide with Lua keywords or the runtime and so that compiling the
//! same source twice yields byte identical output. The name `counter` always
//! becomes the same `__val_xxxxxxxx`, independent of where or in which order it
//! is declared.
use crate::stdlib::Macro;
use murmur3::murmur3_32;
use std::io::Cursor;

/// Prefix of every mangled name
pub const PREFIX: &str = "__val_";

// Fixed seed, changing this changes every generated program
const SEED: u32 = 0x6368_726e;

/// What a binding can be used for
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind {
    /// A plain value
    Local,
    /// A function without side effects
    Func,
    /// A function with side effects, not callable from pure functions
    ImpureFunc,
    /// A special form, expanded by the compiler
    Macro(Macro),
}

/// Where a binding is visible
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Scope {
    /// Block local, shadows freely
    Local,
    /// Module top level, declare once
    Package,
    /// Shared across modules through `_G`, last writer wins
    Global,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Binding {
    // Emitted name
    pub name: String,
    // Surface name
    pub original: String,
    pub kind: Kind,
    pub scope: Scope,
    // Plain function implementing an operator macro, for when the operator is
    // passed around as a value
    pub fallback: Option<&'static str>,
}

/// Deterministic internal name for a surface identifier
pub fn mangle(original: &str) -> String {
    let hash = murmur3_32(&mut Cursor::new(original.as_bytes()), SEED)
        .expect("hashing an in-memory buffer cannot fail");

    format!("{}{:08x}", PREFIX, hash)
}

impl Binding {
    /// Convert a surface name into a binding, kind and scope are filled in
    /// afterwards by the caller.
    pub fn from_name(original: &str, preserve: bool) -> Self {
        let name = if preserve { original.to_string() } else { mangle(original) };

        Binding { name, original: original.to_string(), kind: Kind::Func, scope: Scope::Local, fallback: None }
    }

    /// Emitted code referencing this binding from within package `ns`
    pub fn reference(&self, ns: &str) -> String {
        match self.scope {
            Scope::Package => format!("{}[\"{}\"]", ns, self.original),
            Scope::Global => format!("_G[\"{}\"]", self.name),
            Scope::Local => self.name.clone(),
        }
    }

    pub fn is_macro(&self) -> bool {
        matches!(self.kind, Kind::Macro(_))
    }
}
