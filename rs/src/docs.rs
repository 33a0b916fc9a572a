/*!
# ✏ Language notes

# Syntax

```clj
; Comments run to the end of the line
(f a b)          ; invocation
[1 2 3]          ; list, 0 based at runtime
{:a 1 "b" 2}     ; table
'{:a 1}          ; escaped table, symbol keys become plain strings
:name            ; symbol
obj::field       ; field access
(obj:method 1)   ; method call, `obj` is passed as self
(:key table)     ; same as (table/get :key table)
(0 list)         ; same as (list/get 0 list)
```

Commas are whitespace. Only invocations are allowed at the top level.

# Names

Every local name is mangled into `__val_` followed by eight hex characters
derived from the name alone, so the same program always compiles to the same
Lua. Package definitions are stored in the package table by their surface name
and externs are never renamed.

# Special forms

| Form        | Example                                    |
|-------------|--------------------------------------------|
| `def`       | `(def pi 3.14)`, `(def add [a b] (+ a b))` |
| `def!`      | `(def! log [x] (println! x))`              |
| `defn`      | `(defn add [a b] (+ a b))`                 |
| `defn!`     | `(defn! main [] (println! "hi"))`          |
| `defn-`     | private, not exported in the package table |
| `declare`   | `(declare print tostring :impure)`         |
| `let`       | `(let [x 1 [a b] pair] ...)`               |
| `if`        | `(if cond then else)`                      |
| `when`      | `(when x 1 "one" [_ 2] "two" _ "many")`    |
| `do`        | `(do a b c)`                               |
| `for`       | `(for [x xs] ...)`, `(for [v k t] ...)`    |
| `fn`        | `(fn [a & rest] ...)`                      |
| `try`       | `(try (risky) (catch [e] (println! e)))`   |
| `import`    | `(import [a b] :from "lib")`               |
| `module`    | `(module app [:import lib :from "lib"])`   |
| `->`, `<-`  | thread first, thread last                  |
| `-<`, `->>` | parallel thread first and last             |

`(for [i (range 1 10)] ...)` is compiled into a numeric Lua loop without ever
building the range.

# Purity

Functions are pure unless they are defined with one of the `!` forms. Inside a
pure function it is an error to

1. call an impure function, like `println!` or an extern declared `:impure`
2. define anything, `def`, `defn` and `declare` are all rejected

Anonymous functions inherit the purity of the scope they are written in.

```clj
(defn! log [x] (println! x))
(defn add [a b] (log a) (+ a b))  ; Purity violation
```

# Output

The generated chunk loads the runtime shim, creates the package table, runs
the program and returns the package table, so that it can be loaded with
`require`. With global export the table is published as `_G["<module>"]`
instead, named after the `module` declaration or the source file.

```lua
local charon = require 'charon-runtime';
local __local_package = {};
__local_package["add"] = (function() local __self_ref__; ... end)();
return __local_package;
```

# Targets

Code is generated for Lua 5.3 by default. Older targets only differ in the way
`^` is emitted, as `math.pow` calls.
*/
