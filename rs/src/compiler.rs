//! Entry point for the Charon compiler

/// State for the code generator
pub mod state {
    use crate::{
        core::{Error, Location, Options, Result, Token},
        diagnostics,
        stdlib::STDLIB,
        symbols::{Binding, Kind, Scope},
    };
    use std::{borrow::Borrow, collections::HashMap, hash::Hash};

    /// Name of the package table when the module isn't exported globally
    pub const LOCAL_PACKAGE: &str = "__local_package";

    /// Contextual nested key value storage
    ///
    /// Frames live in an arena and point to their parent by index; the root
    /// frame is always the first one. Lookups walk from the current frame up to
    /// the root, insertions only ever touch the current frame or the root.
    ///
    /// Frames are strictly nested, they are entered when the code generator
    /// walks into a lexical construct and left when it returns from it.
    pub struct Context<K, V> {
        frames: Vec<Frame<K, V>>,
        current: usize,
    }

    struct Frame<K, V> {
        parent: Option<usize>,
        store: HashMap<K, V>,
    }

    impl<K: Eq + Hash, V> Default for Context<K, V> {
        fn default() -> Self {
            Context { frames: vec![Frame { parent: None, store: HashMap::new() }], current: 0 }
        }
    }

    impl<K: Eq + Hash, V> Context<K, V> {
        pub fn enter(&mut self) {
            self.frames.push(Frame { parent: Some(self.current), store: HashMap::new() });
            self.current = self.frames.len() - 1;
        }

        /// Drop the current frame, leaving the root is a no-op
        pub fn leave(&mut self) {
            if let Some(parent) = self.frames[self.current].parent {
                self.frames.truncate(self.current);
                self.current = parent;
            }
        }

        /// Backtrack the key through the frames, return the first match
        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Hash + Eq + ?Sized,
        {
            let mut frame = Some(self.current);
            while let Some(index) = frame {
                if let Some(v) = self.frames[index].store.get(key) {
                    return Some(v);
                }
                frame = self.frames[index].parent;
            }
            None
        }

        /// Set a value in the current frame only
        pub fn set(&mut self, key: K, value: V) {
            self.frames[self.current].store.insert(key, value);
        }

        /// Get a value from the root frame, ignoring everything in between
        pub fn get_top<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Hash + Eq + ?Sized,
        {
            self.frames[0].store.get(key)
        }

        pub fn set_top(&mut self, key: K, value: V) {
            self.frames[0].store.insert(key, value);
        }

        pub fn has<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Hash + Eq + ?Sized,
        {
            self.get(key).is_some()
        }

        /// Number of frames between the current one and the root, inclusive
        pub fn depth(&self) -> usize {
            let mut depth = 0;
            let mut frame = Some(self.current);
            while let Some(index) = frame {
                depth += 1;
                frame = self.frames[index].parent;
            }
            depth
        }
    }

    /// State for the code generator; easier to bundle it all into a struct than
    /// pass several arguments in.
    ///
    /// `names` is the scope table, seeded with the standard bindings.
    ///
    /// `purity` runs in parallel with the frames of `names`; a pure frame
    /// rejects every impure call made from it or from any frame nested in it.
    ///
    /// `ns_ref` is the expression the package table is reached through. It
    /// starts out as a local table and is re-pointed to `_G[<module>]` when
    /// exporting globally, which may happen halfway through the program once a
    /// `module` declaration shows up.
    pub struct State<'a> {
        pub options: &'a Options,
        pub source_name: String,
        pub code: String,
        pub ns_ref: String,
        names: Context<String, Binding>,
        purity: Vec<bool>,
        module_name: Option<String>,
    }

    impl<'a> State<'a> {
        pub fn new(options: &'a Options) -> Self {
            let mut names = Context::default();
            for def in STDLIB {
                names.set(def.surface.to_string(), def.binding());
            }

            State {
                options,
                source_name: String::from("???"),
                code: String::new(),
                ns_ref: String::from(LOCAL_PACKAGE),
                names,
                purity: vec![false],
                module_name: None,
            }
        }

        /// Enter a new lexical scope, pure or impure; inherited when `None`
        pub fn enter(&mut self, pure: Option<bool>) {
            let pure = pure.unwrap_or_else(|| self.pure());
            self.names.enter();
            self.purity.push(pure);
        }

        pub fn leave(&mut self) {
            if self.purity.len() > 1 {
                self.purity.pop();
                self.names.leave();
            }
        }

        /// Run `f` in a fresh scope, which is left whether `f` fails or not
        pub fn scoped<T, F>(&mut self, pure: Option<bool>, f: F) -> Result<T>
        where
            F: FnOnce(&mut Self) -> Result<T>,
        {
            self.enter(pure);
            let result = f(self);
            self.leave();
            result
        }

        pub fn pure(&self) -> bool {
            self.purity.last().copied().unwrap_or(false)
        }

        pub fn depth(&self) -> usize {
            self.names.depth()
        }

        pub fn get(&self, name: &str) -> Option<&Binding> {
            self.names.get(name)
        }

        /// Get the binding of a name or fail with a reference error
        pub fn checked(&self, name: &Token) -> Result<Binding> {
            self.get(&name.value).cloned().ok_or_else(|| Error::reference(&name.value, name.at))
        }

        /// Register a new storage place (variable or function)
        ///
        /// Package and global bindings go to the root scope, everything else
        /// into the current one. Package bindings are declare once.
        pub fn register(
            &mut self,
            token: &Token,
            kind: Kind,
            scope: Scope,
            preserve: bool,
        ) -> Result<Binding> {
            let mut data = Binding::from_name(&token.value, preserve);
            data.kind = kind;
            data.scope = scope;

            match scope {
                Scope::Package => {
                    if let Some(Binding { scope: Scope::Package, .. }) = self.names.get_top(&data.original) {
                        return Err(Error::types(
                            format!("Attempting to redeclare {}!", data.original),
                            token.at,
                        ));
                    }
                    self.names.set_top(data.original.clone(), data.clone());
                }
                Scope::Global => self.names.set_top(data.original.clone(), data.clone()),
                Scope::Local => self.names.set(data.original.clone(), data.clone()),
            }

            Ok(data)
        }

        /// Code referencing a binding, package bindings go through `ns_ref`
        pub fn reference(&self, data: &Binding) -> String {
            data.reference(&self.ns_ref)
        }

        /// Parameter list of the closures generated for blocks
        pub fn closure(&self) -> &'static str {
            if self.options.variadic_closures {
                "..."
            } else {
                ""
            }
        }

        pub fn module_name(&self) -> Option<&str> {
            self.module_name.as_deref()
        }

        pub fn set_module_name(&mut self, name: &str) {
            self.module_name = Some(name.to_string());
            if self.options.global_export {
                self.ns_ref = global(name);
            }
        }

        /// Module name assumed when exporting globally without a declaration
        pub fn fallback_module(&self) -> &str {
            let name = self.source_name.as_str();
            match name.rfind('.') {
                Some(dot)
                    if dot + 1 < name.len()
                        && name[dot + 1..].chars().all(|c| c.is_alphanumeric() || c == '_') =>
                {
                    &name[..dot]
                }
                _ => name,
            }
        }

        /// Bug report link for errors that point at a broken compiler
        pub fn bug(&self, what: &str, context: &str, at: Location) -> String {
            diagnostics::bug_report(what, context, &self.code, &at)
        }

        /// Log a non fatal problem along with the offending code
        pub fn warn(&self, message: &str, at: Location) {
            log::warn!(
                "{}\n  at {}\n{}",
                message,
                diagnostics::source_location(&self.source_name, &at),
                diagnostics::code_slice(&self.code, &at)
            );
        }
    }

    /// Package table published through the global environment
    pub fn global(module: &str) -> String {
        format!("_G[\"{}\"]", module)
    }

}

/// Emit Lua code for the Charon AST.
///
/// This module implements bulk of the compiler and is a good place to start
/// reading code. Every special form lowers into a Lua expression; most blocks
/// become an immediately invoked closure so that they can be used anywhere an
/// expression can.
pub mod emit {
    use crate::{
        compiler::state::{global, State},
        core::*,
        lambda,
        lang::{self, Slot},
        modules, primitives, runtime,
        stdlib::Macro,
        symbols::{Kind, Scope},
    };

    /// Generated code of a single statement
    ///
    /// `separator` is false for statements that must not be followed by a
    /// `;`, like the comments emitted for extern declarations.
    #[derive(Debug, PartialEq)]
    pub struct Stmt {
        pub code: String,
        pub separator: bool,
    }

    impl Stmt {
        /// Code with its separator, unless it already ends with one
        pub fn terminated(self) -> String {
            if self.separator && !self.code.ends_with(';') {
                self.code + ";"
            } else {
                self.code
            }
        }
    }

    impl From<String> for Stmt {
        fn from(code: String) -> Self {
            Stmt { code, separator: true }
        }
    }

    /// Top level interface to the emit module
    pub fn program(s: &mut State, prog: &[Invoke]) -> Result<String> {
        let rt = if s.options.embed_runtime {
            format!("local charon = {{}};\ndo{}\nend", runtime::embedded())
        } else if s.options.no_runtime_require {
            String::new()
        } else {
            String::from(runtime::REQUIRE)
        };

        if s.options.global_export {
            s.ns_ref = global(s.fallback_module());
        }

        let body = statements(s, prog)?;

        if s.options.global_export && s.module_name().is_none() {
            log::warn!(
                "No module name defined for the global module {}, assuming \"{}\"",
                s.source_name,
                s.fallback_module()
            );
        }

        let (header, footer) = if s.options.global_export {
            (format!("{}\n{} = {{}};\n", rt, s.ns_ref), format!("\n-- End module {}", s.ns_ref))
        } else {
            (format!("{}\nlocal {} = {{}};\n", rt, s.ns_ref), format!("\nreturn {};\n", s.ns_ref))
        };

        Ok(header + &body + &footer)
    }

    /// Generate every top level form, one per line
    pub fn statements(s: &mut State, prog: &[Invoke]) -> Result<String> {
        let mut out = Vec::with_capacity(prog.len());

        for inv in prog {
            out.push(invoke(s, inv)?.terminated());
        }

        Ok(out.join("\n"))
    }

    /// Generate a term used as a statement
    pub fn statement(s: &mut State, term: &Term) -> Result<Stmt> {
        match term {
            Term::Invoke(inv) => invoke(s, inv),
            term => eval(s, term).map(Stmt::from),
        }
    }

    /// Evaluate a term into a Lua expression
    pub fn eval(s: &mut State, term: &Term) -> Result<String> {
        match term {
            Term::List { values, .. } => list(s, values),

            Term::Table { values, escaped, .. } => table(s, values, *escaped),

            Term::Invoke(inv) => Ok(invoke(s, inv)?.code),

            Term::Access(a) => {
                if a.segments.iter().any(|seg| matches!(seg.mode, Mode::Bound | Mode::BoundCoalesce)) {
                    let expected = a.segments.iter().map(|seg| seg.name.value.as_str()).collect::<Vec<_>>();
                    return Err(Error::syntax(
                        format!(
                            "Except for function calls, all property access must be unbounded (using the :: operator), expecting \"{}::{}\" but saw \"{}\"",
                            a.root.value,
                            expected.join("::"),
                            a
                        ),
                        a.at,
                    ));
                }
                access(s, a)
            }

            Term::Name(t) => name(s, t),

            Term::Symbol(t) => Ok(format!("charon.symbol\"{}\"", t.value)),

            Term::Number(t) => Ok(t.value.clone()),

            Term::Str(t) => Ok(t.value.replace('\n', "\\n").replace('\r', "\\r")),

            Term::Wildcard(t) => Err(Error::syntax("Unexpected wildcard symbol.", t.at)),
        }
    }

    /// Generate the code for an invocation, for example `(some-func 3 2 "hi")`
    pub fn invoke(s: &mut State, inv: &Invoke) -> Result<Stmt> {
        match inv.target.as_ref() {
            // `(:key m)` and `(0 v)` are sugar for indexed access
            Term::Symbol(_) | Term::Number(_) => invoke(s, &lang::indexed(inv)),

            Term::Wildcard(t) => {
                if t.value != "#'" {
                    return Err(Error::syntax(format!("Unexpected token {}", t.value), t.at));
                }
                Ok(format!("__self_ref__({})", args(s, &inv.args)?).into())
            }

            Term::Name(t) => {
                let target = s.checked(t)?;

                if s.pure() && target.kind == Kind::ImpureFunc {
                    return Err(Error::purity(
                        "Impure functions cannot be invoked from a pure context!",
                        inv.at,
                    ));
                }

                if let Kind::Macro(m) = target.kind {
                    return expand(s, m, inv);
                }

                let args = args(s, &inv.args)?;
                Ok(format!("{}({})", s.reference(&target), args).into())
            }

            Term::Access(a) => {
                let target = access(s, a)?;
                Ok(format!("{}({})", target, args(s, &inv.args)?).into())
            }

            other => Err(Error::Internal {
                message: format!(
                    "Attempting to generate a function call outside the boundaries of a valid target, found {}.",
                    other.kind()
                ),
                report: Some(s.bug("the code generator", "generate call expression", inv.at)),
                at: Some(inv.at),
            }),
        }
    }

    /// Expand a macro
    ///
    /// Macros get the raw argument terms and control their own evaluation.
    fn expand(s: &mut State, m: Macro, inv: &Invoke) -> Result<Stmt> {
        let args = &inv.args;

        let code = match m {
            Macro::Def { pure } => lambda::def(s, inv, pure)?,
            Macro::Defn { pure, private } => lambda::defn(s, inv, pure, private)?,
            Macro::Declare => return modules::declare(s, inv),
            Macro::Import => modules::import(s, args, inv.at)?,
            Macro::Module => modules::module(s, inv)?,
            Macro::Let => vars(s, inv)?,
            Macro::If => cond(s, inv)?,
            Macro::When => when(s, inv)?,
            Macro::Do => {
                let c = s.closure();
                format!("(function({c}) {} end)({c})", body(s, args)?, c = c)
            }
            Macro::For => s.scoped(None, |s| each(s, inv))?,
            Macro::Fn => lambda::anonymous(s, inv)?,
            Macro::Try => attempt(s, inv)?,
            Macro::Catch => catch(s, inv)?,
            Macro::ThreeDots => String::from("charon.list{...}"),
            Macro::ThreadFirst => eval(s, &lang::thread(args, Slot::First, inv.at)?)?,
            Macro::ThreadLast => eval(s, &lang::thread(args, Slot::Last, inv.at)?)?,
            Macro::ThreadParallel => eval(s, &lang::thread_parallel(args, Slot::First, inv.at)?)?,
            Macro::ThreadParallelLast => eval(s, &lang::thread_parallel(args, Slot::Last, inv.at)?)?,
            Macro::Not => primitives::not(s, inv)?,
            Macro::Operator(op) => primitives::call(s, op, inv)?,
        };

        Ok(code.into())
    }

    /// Generate call arguments
    ///
    /// An operator passed as an argument is replaced with its plain function
    /// counterpart, so that `(atom/apply! a + 1)` works.
    pub fn args(s: &mut State, terms: &[Term]) -> Result<String> {
        let mut out = Vec::with_capacity(terms.len());

        for term in terms {
            if let Term::Name(t) = term {
                if let Some(data) = s.get(&t.value).filter(|data| data.is_macro()) {
                    let fallback = data.fallback.map(String::from).ok_or_else(|| Error::Internal {
                        message: format!(
                            "Invalid use of fallback macro checker: no fallback defined for `{}`.",
                            t.value
                        ),
                        report: Some(s.bug("the code generator", "fallback macro generation", t.at)),
                        at: Some(t.at),
                    })?;
                    out.push(fallback);
                    continue;
                }
            }
            out.push(eval(s, term)?);
        }

        Ok(out.join(","))
    }

    /// Reference a name used as a value
    fn name(s: &mut State, t: &Token) -> Result<String> {
        let data = s.checked(t)?;

        match data.kind {
            Kind::Macro(_) => data.fallback.map(String::from).ok_or_else(|| {
                Error::syntax(format!("Macro `{}` can't be used as a value!", t.value), t.at)
            }),
            _ => Ok(s.reference(&data)),
        }
    }

    /// Generate code for field access expressions like `(obj::field:method 1 2 3)`
    ///
    /// `:` accesses a method bound to the object, `::` a plain field. The null
    /// coalescing variants `:?` and `::?` are reserved and always rejected.
    pub fn access(s: &mut State, a: &Access) -> Result<String> {
        let root = s.checked(&a.root)?;

        if root.is_macro() {
            return Err(Error::BadMacro {
                message: format!(
                    "Attempting to expand macro `{}` with an invalid name! Symbols and access expressions are not allowed as macro names.",
                    a.root.value
                ),
                at: Some(a.at),
            });
        }

        let mut out = s.reference(&root);
        for segment in &a.segments {
            match segment.mode {
                Mode::Bound => out += &format!(":{}", segment.name.value),
                Mode::Unbound => out += &format!(".{}", segment.name.value),
                Mode::BoundCoalesce | Mode::UnboundCoalesce => {
                    return Err(Error::syntax(
                        "Null-coalescing access expressions are not supported, reserved for a future use. Remove the '?' symbol.",
                        segment.at,
                    ))
                }
            }
        }

        Ok(out)
    }

    fn list(s: &mut State, values: &[Term]) -> Result<String> {
        let values = values.iter().map(|v| eval(s, v)).collect::<Result<Vec<_>>>()?;
        Ok(format!("charon.list{{ {} }}", values.join(",")))
    }

    /// Generate a table literal
    ///
    /// Escaped tables like `'{:hi "you"}` translate symbol keys into plain
    /// string keys and skip the runtime wrapper.
    fn table(s: &mut State, values: &[Term], escaped: bool) -> Result<String> {
        let mut pairs = vec![];

        for pair in values.chunks(2) {
            let key = match &pair[0] {
                Term::Symbol(t) if escaped => format!("\"{}\"", t.value),
                key => eval(s, key)?,
            };

            let value = match pair.get(1) {
                Some(value) => eval(s, value)?,
                None => name(s, &Token::new("unit", pair[0].location()))?,
            };

            pairs.push(format!("[{}] = {}", key, value));
        }

        if escaped {
            Ok(format!("{{ {} }}", pairs.join(",")))
        } else {
            Ok(format!("charon.table{{ {} }}", pairs.join(",")))
        }
    }

    /// Join a list of terms, making the last one the return value
    ///
    /// Used for every block with a value: `do`, `let`, `if` branches and
    /// function bodies. Definitions have no value, a block ending with one
    /// returns unit.
    pub fn body(s: &mut State, terms: &[Term]) -> Result<String> {
        let mut out = vec![];

        for (i, term) in terms.iter().enumerate() {
            let definition = is_definition(s, term);
            let stmt = statement(s, term)?;

            if i + 1 < terms.len() {
                out.push(stmt.terminated());
            } else if definition {
                out.push(stmt.terminated());
                out.push(String::from("return charon.Unit;"));
            } else {
                out.push(format!("return {}", stmt.terminated()));
            }
        }

        Ok(out.join(""))
    }

    fn is_definition(s: &State, term: &Term) -> bool {
        match term {
            Term::Invoke(inv) => match inv.name().and_then(|name| s.get(name)) {
                Some(data) => matches!(data.kind, Kind::Macro(m) if m.is_definition()),
                None => false,
            },
            _ => false,
        }
    }

    /// Emit code for a let expression
    ///
    /// A new scope is created to hold the bindings. Values are generated before
    /// the name they are bound to is registered, so `(let [x (inc x)] ...)`
    /// refers to the outer `x`. Bindings are sequential, later values see the
    /// earlier names.
    pub fn vars(s: &mut State, inv: &Invoke) -> Result<String> {
        let bindings = match inv.args.first() {
            Some(Term::List { values, .. }) => values,
            Some(t) => return Err(Error::syntax("Let's first argument must be a binding vector!", t.location())),
            None => return Err(Error::syntax("Let expects a binding vector!", inv.at)),
        };

        if bindings.len() % 2 != 0 {
            return Err(Error::syntax("Let binding vectors must contain name and value pairs!", inv.at));
        }

        s.scoped(None, |s| {
            let mut bind = vec![];

            for pair in bindings.chunks(2) {
                let value = eval(s, &pair[1])?;

                match &pair[0] {
                    Term::Name(t) => bind.push(local(s, t, &value)?),
                    Term::List { values, .. } => destructure(s, values, &indexable(&value), "", &mut bind)?,
                    t => {
                        return Err(Error::syntax(
                            format!(
                                "Let binding pairs must start with names or destructuring expressions! found {}",
                                t.kind()
                            ),
                            t.location(),
                        ))
                    }
                }
            }

            let c = s.closure();
            Ok(format!("(function({c}) {}; {} end)({c})", bind.join(";"), body(s, &inv.args[1..])?, c = c))
        })
    }

    fn local(s: &mut State, name: &Token, value: &str) -> Result<String> {
        let data = s.register(name, Kind::Local, Scope::Local, false)?;
        Ok(format!("local {} = {}", data.name, value))
    }

    /// Bind every name of a possibly nested destructuring pattern
    ///
    /// `[[a b] c]` binds `a` to `v[0][0]`, `b` to `v[0][1]` and `c` to `v[1]`.
    fn destructure(s: &mut State, keys: &[Term], value: &str, tail: &str, bind: &mut Vec<String>) -> Result<()> {
        for (i, key) in keys.iter().enumerate() {
            let access = format!("{}[{}]", tail, i);

            match key {
                Term::List { values, .. } => destructure(s, values, value, &access, bind)?,
                Term::Name(t) => bind.push(local(s, t, &format!("{}{}", value, access))?),
                t => {
                    return Err(Error::syntax(
                        format!(
                            "Destructuring expressions can only contain names or destructuring expressions! found {}",
                            t.kind()
                        ),
                        t.location(),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Parenthesize anything that can't be indexed directly in Lua
    fn indexable(value: &str) -> String {
        let simple = value.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
            && value.chars().all(|c| c.is_alphanumeric() || c == '_');

        if simple {
            value.to_string()
        } else {
            format!("({})", value)
        }
    }

    /// Emit code for a conditional expression
    pub fn cond(s: &mut State, inv: &Invoke) -> Result<String> {
        let args = &inv.args;

        if args.len() < 2 || args.len() > 3 {
            return Err(Error::syntax(
                "If expects a condition, a branch and an optional else branch!",
                inv.at,
            ));
        }

        let condition = eval(s, &args[0])?;
        let then = eval(s, &args[1])?;
        let otherwise = body(s, &args[2..])?;

        let c = s.closure();
        Ok(format!(
            "(function({c}) if {} then return {}; else {} end end)({c})",
            condition,
            then,
            otherwise,
            c = c
        ))
    }

    /// Emit code for pattern matching
    ///
    /// Cases are tested top to bottom and the first match wins. A case is
    /// either `_` (the fallback), a list pattern compared position by position
    /// skipping `_`, or any other term compared for equality.
    pub fn when(s: &mut State, inv: &Invoke) -> Result<String> {
        let (value, cases) = inv
            .args
            .split_first()
            .ok_or_else(|| Error::syntax("When expects a value to match!", inv.at))?;

        if cases.len() % 2 != 0 {
            return Err(Error::syntax(
                "When match expressions must be in pairs! Found stray key at the end of the block.",
                inv.at,
            ));
        }

        let condition = eval(s, value)?;
        let mut branches = vec![];
        let mut fallback: Option<&Term> = None;

        for case in cases.chunks(2) {
            let (key, then) = (&case[0], &case[1]);

            if key.is_name("_") {
                if fallback.is_some() {
                    s.warn("Repeated fallback case on when!", key.location());
                }
                fallback = Some(then);
                continue;
            }

            let then = eval(s, then)?;
            let test = match key {
                Term::List { values, .. } => {
                    let mut test = vec![format!("type({}) == 'table'", condition)];
                    for (i, v) in values.iter().enumerate().filter(|(_, v)| !v.is_name("_")) {
                        test.push(format!("{}[{}] == {}", indexable(&condition), i, eval(s, v)?));
                    }
                    test.join(" and ")
                }
                key => format!("{} == {}", condition, eval(s, key)?),
            };

            branches.push(format!("if {} then return {};", test, then));
        }

        let otherwise = match fallback {
            Some(term) => body(s, std::slice::from_ref(term))?,
            None => String::new(),
        };

        let c = s.closure();
        if branches.is_empty() {
            return Ok(format!("(function({c}) {} end)({c})", otherwise, c = c));
        }

        let otherwise = if otherwise.is_empty() { otherwise } else { format!(" else {}", otherwise) };
        Ok(format!("(function({c}) {}{} end end)({c})", branches.join(" else"), otherwise, c = c))
    }

    /// Emit code for a loop, in the loop's own scope
    ///
    /// `[v (range a b)]` is inlined into a numeric loop, any other iterable
    /// goes through `pairs`, discarding the keys unless a key name is given as
    /// in `[v k iterable]`.
    fn each(s: &mut State, inv: &Invoke) -> Result<String> {
        let binding = match inv.args.first() {
            Some(Term::List { values, .. }) => values,
            Some(t) => return Err(Error::syntax("For loop first argument must be a binding vector!", t.location())),
            None => return Err(Error::syntax("For loop first argument must be a binding vector!", inv.at)),
        };

        if binding.len() < 2 || binding.len() > 3 {
            return Err(Error::syntax(
                "For loop binding vector must have either two or three arguments.",
                inv.args[0].location(),
            ));
        }

        let item = binding[0].as_name().ok_or_else(|| {
            Error::syntax("For loop binding vector's first argument must be a name!", binding[0].location())
        })?;

        let key = match binding.len() {
            3 => Some(binding[1].as_name().ok_or_else(|| {
                Error::syntax(
                    "If looping in pairs the second argument (the key) must be also a name!",
                    binding[1].location(),
                )
            })?),
            _ => None,
        };

        let iterable = &binding[binding.len() - 1];

        // The header is generated before the loop variables are bound
        let header = match iterable {
            Term::Invoke(range) if key.is_none() && range.name() == Some("range") && inlinable(&range.args) => {
                let bounds = range.args.iter().map(|a| eval(s, a)).collect::<Result<Vec<_>>>()?;
                Head::Range(bounds.join(", "))
            }
            it if key.is_some() => Head::Pairs(eval(s, it)?),
            it => Head::Values(eval(s, it)?),
        };

        let v = s.register(item, Kind::Local, Scope::Local, false)?;
        let v = s.reference(&v);
        let k = match key {
            Some(k) => Some(s.register(k, Kind::Local, Scope::Local, false)?),
            None => None,
        };

        let terms = inv.args[1..].iter().map(|t| eval(s, t)).collect::<Result<Vec<_>>>()?.join(";");

        let body = match (header, k) {
            (Head::Range(bounds), _) => format!("for {}={} do {} end", v, bounds, terms),
            (Head::Pairs(it), Some(k)) => {
                format!("for {}, {} in pairs({}) do {} end", s.reference(&k), v, it, terms)
            }
            (Head::Values(it), _) => format!("for _, {} in pairs({}) do {} end", v, it, terms),
            (Head::Pairs(_), None) => {
                return Err(Error::Internal {
                    message: String::from(
                        "Unexpected error while generating for loop code, the inline might have failed due to a false positive.",
                    ),
                    report: Some(s.bug("the code generator", "for inliner", inv.at)),
                    at: Some(inv.at),
                })
            }
        };

        let c = s.closure();
        Ok(format!("(function({c}) {} end)({c})", body, c = c))
    }

    enum Head {
        Range(String),
        Pairs(String),
        Values(String),
    }

    // A numeric for takes a start, a limit and an optional step
    fn inlinable(args: &[Term]) -> bool {
        args.len() == 2 || args.len() == 3
    }

    /// Emit a protected call
    ///
    /// `catch` forms anywhere in the body handle the error, the remaining forms
    /// are the protected body.
    fn attempt(s: &mut State, inv: &Invoke) -> Result<String> {
        let (catching, trying): (Vec<Term>, Vec<Term>) = inv.args.iter().cloned().partition(lang::is_catch);

        let trying = body(s, &trying)?;
        let catching = body(s, &catching)?;

        let c = s.closure();
        let forward = if c.is_empty() { "" } else { ", ..." };
        Ok(format!(
            "(function({c}) local _ok, _err = pcall(function({c}) {} end{}); if _ok then return _err; else {} end end)({c})",
            trying,
            forward,
            catching,
            c = c
        ))
    }

    fn catch(s: &mut State, inv: &Invoke) -> Result<String> {
        let binding = match inv.args.first() {
            Some(Term::List { values, .. }) => values,
            _ => {
                return Err(Error::syntax(
                    "Catch first argument must be a binding vector with one argument!",
                    inv.at,
                ))
            }
        };

        let err = binding
            .first()
            .and_then(Term::as_name)
            .ok_or_else(|| Error::syntax("Catch's first binding element must be a name!", inv.args[0].location()))?;

        s.scoped(None, |s| {
            let err = s.register(err, Kind::Local, Scope::Local, false)?;
            let body = body(s, &inv.args[1..])?;
            Ok(format!("(function({}) {} end)(_err)", s.reference(&err), body))
        })
    }

}

/// Compile a source file into Lua
///
/// Errors of any stage are wrapped into a single [Error::Compile] that knows
/// how to render itself with the offending source excerpt.
pub fn compile(source: &str, source_name: &str, options: &crate::core::Options) -> crate::core::Result<String> {
    use crate::{core::Error, parser::parse};

    let wrap = |cause: Error| Error::Compile {
        source_name: source_name.to_string(),
        code: source.to_string(),
        cause: Box::new(cause),
    };

    log::debug!("Compiling {}", source_name);

    let prog = parse(source).map_err(wrap)?;

    let mut s = state::State::new(options);
    s.source_name = source_name.to_string();
    s.code = source.to_string();

    emit::program(&mut s, &prog).map_err(wrap)
}
