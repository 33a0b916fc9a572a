/*!

# Charon

A compiler from Charon, a small Lisp, to Lua.

```clj
(defn add [a b] (+ a b))
(defn! main [] (println! (add 1 2)))
```

Charon programs are a sequence of invocations. Everything that isn't a plain
function call is a special form expanded by the compiler into a Lua
expression; there are no user defined macros.

## Where do I get started? 🕵️‍♀️

Start at [compile](compiler::compile) and follow the code into
[emit](compiler::emit), which lowers every term. The scope table and
everything else the code generator carries around lives in
[state](compiler::state).

The language itself is described in [docs].

## Pipeline

1. [parser] turns source text into a [Program](core::Program).
2. The code generator walks the top level invocations in order. Names are
   resolved against a scope table seeded with the [standard bindings][stdlib]
   and special forms are expanded on the spot.
3. The generated statements are wrapped with a preamble that loads the
   [runtime] shim and a footer that exports the package table.

Any error aborts the compilation and is reported with the offending source
excerpt, see [diagnostics].

## All the different kind of functions

Functions in Charon live at a few different levels, depending on who gets to
see the arguments.

**Primitives**

Operators like `+`, `=` and `and` are expanded into native Lua operators by
[primitives]. They are variadic and comparisons hold pairwise, `(< a b c)` is
`(a<b and a<c and b<c)`.

**Special forms**

`let`, `if`, `fn` and friends get their arguments unevaluated and decide how to
lower them. Some of them, like the threading macros and `xor`, are pure syntax
rewrites found in [lang].

**Runtime**

Functions like `vector/map` and `println!` are implemented in Lua in the
[runtime] shim. An operator passed around as a value is replaced with its
runtime counterpart, so `(vector/map + ...)` still works.

**Externs**

Anything else must be declared with `declare` before use, along with whether it
is pure. Externs are never renamed.

*/

pub mod cli;
pub mod compiler;
pub mod core;
pub mod diagnostics;
pub mod docs;
pub mod lambda;
pub mod lang;
pub mod modules;
pub mod parser;
pub mod primitives;
pub mod runtime;
pub mod stdlib;
pub mod symbols;

pub use crate::{cli::compile_file, compiler::compile};
