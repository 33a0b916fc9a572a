//! Charon functions
//!
//! Every function, named or anonymous, is emitted as a closure that knows
//! itself. The closure is built inside an immediately invoked wrapper that
//! binds it to `__self_ref__`, so that `#'` can recurse even into anonymous
//! functions:
//!
//! ```lua
//! (function() local __self_ref__; __self_ref__ = function(a, b) ... end; return __self_ref__; end)()
//! ```
//!
//! Functions are pure unless defined with one of the `!` forms. The body of a
//! pure function is generated in a pure scope, and any impure call found in it
//! is a compile time error.
//!
//! A binding vector may end with `& rest`, which collects the remaining
//! arguments of the call into a runtime list.
use crate::{
    compiler::{
        emit::{body, eval},
        state::State,
    },
    core::*,
    symbols::{Binding, Kind, Scope},
};

/// `def` and `def!`, a package value or a function with a binding vector
pub fn def(s: &mut State, inv: &Invoke, pure: bool) -> Result<String> {
    if s.pure() {
        return Err(Error::purity("Value definition cannot be done from pure context.", inv.at));
    }

    match inv.args.as_slice() {
        [Term::Name(_), Term::List { .. }, _, ..] => define(s, inv, pure, false),

        [Term::Name(name), value] if pure => {
            // The value can't see the name it is being bound to
            let value = eval(s, value)?;
            let data = s.register(name, Kind::Local, Scope::Package, false)?;
            Ok(format!("{} = {};", s.reference(&data), value))
        }

        [Term::Name(_), _] => Err(Error::syntax("Values can't be impure, use `def` for values.", inv.at)),

        _ => Err(Error::syntax(
            "Definitions must start with a name followed by a value or a binding vector!",
            inv.at,
        )),
    }
}

/// `defn`, `defn!` and their private `defn-` counterparts
pub fn defn(s: &mut State, inv: &Invoke, pure: bool, private: bool) -> Result<String> {
    if s.pure() {
        return Err(Error::purity("Cannot define new functions inside a pure context!", inv.at));
    }

    if inv.args.len() < 2 {
        return Err(Error::syntax(
            "Function definitions need at least a name and a binding vector!",
            inv.at,
        ));
    }

    define(s, inv, pure, private)
}

/// Define a named function
///
/// The name is registered before the body is generated so that the function
/// can call itself by name. A `:global` symbol right after the binding vector
/// exports the function through `_G` with its name unmangled.
fn define(s: &mut State, inv: &Invoke, pure: bool, private: bool) -> Result<String> {
    let name = inv.args[0].as_name().ok_or_else(|| {
        Error::syntax("First argument of a function definition should be a name!", inv.args[0].location())
    })?;

    let params = match &inv.args[1] {
        Term::List { values, .. } => values,
        t => return Err(Error::syntax("Missing binding vector!", t.location())),
    };

    let global = matches!(inv.args.get(2), Some(Term::Symbol(t)) if t.value == "global");
    let terms = &inv.args[if global { 3 } else { 2 }..];

    let kind = if pure { Kind::Func } else { Kind::ImpureFunc };

    let data = if global {
        s.register(name, kind, Scope::Global, true)?
    } else if private {
        s.register(name, kind, Scope::Local, false)?
    } else {
        s.register(name, kind, Scope::Package, false)?
    };

    log::trace!("Defining {} as {}", data.original, data.name);

    let code = s.scoped(Some(pure), |s| closure(s, params, terms))?;
    let target = s.reference(&data);

    if private && !global {
        Ok(format!("local {t}; {t} = {}", code, t = target))
    } else {
        Ok(format!("{} = {}", target, code))
    }
}

/// Anonymous functions, `(fn [a b] ...)`
///
/// The body inherits the purity of the surrounding scope.
pub fn anonymous(s: &mut State, inv: &Invoke) -> Result<String> {
    let params = match inv.args.first() {
        Some(Term::List { values, .. }) => values,
        Some(t) => return Err(Error::syntax("Function expression's first argument must be a binding vector!", t.location())),
        None => return Err(Error::syntax("Function expression's first argument must be a binding vector!", inv.at)),
    };

    s.scoped(None, |s| closure(s, params, &inv.args[1..]))
}

/// Self referencing closure, expects to be called in the function's own scope
fn closure(s: &mut State, params: &[Term], terms: &[Term]) -> Result<String> {
    let (args, rest) = parameters(s, params)?;

    let (spread, varargs) = match rest {
        Some(rest) => (
            if args.is_empty() { "..." } else { ", ..." },
            format!(" local {} = charon.list{{...}};", s.reference(&rest)),
        ),
        None => ("", String::new()),
    };

    let body = if terms.is_empty() { String::from("return charon.Unit;") } else { body(s, terms)? };

    Ok(format!(
        "(function() local __self_ref__; __self_ref__ = function({}{}){} {} end; return __self_ref__; end)()",
        args.join(", "),
        spread,
        varargs,
        body
    ))
}

/// Bind the formal arguments in the current scope
///
/// Everything after `&` goes to the variadic tail, which must be exactly one
/// name.
fn parameters(s: &mut State, params: &[Term]) -> Result<(Vec<String>, Option<Binding>)> {
    let mut args = vec![];
    let mut rest: Option<&Token> = None;
    let mut variadic: Option<Location> = None;

    for param in params {
        let name = param
            .as_name()
            .ok_or_else(|| Error::syntax("Binding vectors should contain only names!", param.location()))?;

        if variadic.is_some() {
            if rest.is_some() {
                return Err(Error::syntax(
                    "Unexpected token after variadic binder. Only one name allowed after '&'.",
                    name.at,
                ));
            }
            rest = Some(name);
        } else if name.value == "&" {
            variadic = Some(name.at);
        } else {
            let data = s.register(name, Kind::Local, Scope::Local, false)?;
            args.push(s.reference(&data));
        }
    }

    match (variadic, rest) {
        (Some(at), None) => Err(Error::syntax("Expected a name after the variadic binder '&'.", at)),
        (_, Some(rest)) => Ok((args, Some(s.register(rest, Kind::Local, Scope::Local, false)?))),
        (None, None) => Ok((args, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::emit, parser::parse, symbols::mangle};
    use pretty_assertions::assert_eq;

    fn gen(src: &str) -> Result<String> {
        let options = Options::module();
        let mut s = State::new(&options);
        emit::statements(&mut s, &parse(src)?)
    }

    #[test]
    fn defn() {
        let (a, b) = (mangle("a"), mangle("b"));

        assert_eq!(
            gen("(defn add [a b] (+ a b))").unwrap(),
            format!(
                r#"__local_package["add"] = (function() local __self_ref__; __self_ref__ = function({a}, {b}) return ({a}+{b}); end; return __self_ref__; end)();"#,
                a = a,
                b = b
            )
        );
    }

    #[test]
    fn empty_body() {
        assert_eq!(
            gen("(defn nothing [])").unwrap(),
            r#"__local_package["nothing"] = (function() local __self_ref__; __self_ref__ = function() return charon.Unit; end; return __self_ref__; end)();"#
        );
    }

    #[test]
    fn def_function() {
        let out = gen("(def add [a b] (+ a b))").unwrap();
        assert!(out.starts_with(r#"__local_package["add"] = (function() local __self_ref__;"#));

        // Impure functions are defined with the bang forms
        assert!(gen(r#"(def! hello [] (println! "hi"))"#).is_ok());
        assert!(matches!(gen(r#"(def hello [] (println! "hi"))"#).unwrap_err(), Error::Purity { .. }));
    }

    #[test]
    fn values() {
        assert_eq!(gen("(def pi 3.14)").unwrap(), r#"__local_package["pi"] = 3.14;"#);
        assert_eq!(gen("(def xs [1 2])").unwrap(), r#"__local_package["xs"] = charon.list{ 1,2 };"#);

        assert!(matches!(gen("(def! pi 3.14)").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(def 1 2)").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(def pi 3) (def pi 4)").unwrap_err(), Error::Type { .. }));
        assert!(matches!(gen("(def x x)").unwrap_err(), Error::Reference { .. }));
    }

    #[test]
    fn variadic() {
        let (a, rest) = (mangle("a"), mangle("rest"));

        assert_eq!(
            gen("(fn [a & rest] rest)").unwrap(),
            format!(
                "(function() local __self_ref__; __self_ref__ = function({a}, ...) local {rest} = charon.list{{...}}; return {rest}; end; return __self_ref__; end)();",
                a = a,
                rest = rest
            )
        );

        assert!(gen("(fn [& rest] rest)").unwrap().contains("= function(...) local"));

        assert!(matches!(gen("(fn [a &] a)").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(fn [& a b] a)").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(fn [1] 1)").unwrap_err(), Error::Syntax { .. }));
    }

    #[test]
    fn recursion() {
        let n = mangle("n");
        let out = gen("(defn loop [n] (loop n))").unwrap();

        assert!(out.contains(&format!(r#"return __local_package["loop"]({});"#, n)));
        assert!(gen("(defn loop [n] (#' n))").unwrap().contains(&format!("return __self_ref__({});", n)));
    }

    #[test]
    fn purity() {
        assert!(matches!(gen(r#"(defn f [] (println! "x"))"#).unwrap_err(), Error::Purity { .. }));
        assert!(gen(r#"(defn! f [] (println! "x"))"#).is_ok());

        // Nothing can be defined inside a pure function
        assert!(matches!(gen("(defn f [] (defn g [] 1))").unwrap_err(), Error::Purity { .. }));
        assert!(matches!(gen("(defn f [] (def x 1))").unwrap_err(), Error::Purity { .. }));

        // Anonymous functions inherit purity
        assert!(matches!(gen(r#"(defn f [] (fn [] (println! "x")))"#).unwrap_err(), Error::Purity { .. }));
        assert!(gen(r#"(defn! f [] (fn [] (println! "x")))"#).is_ok());
    }

    #[test]
    fn private() {
        let f = mangle("f");
        let out = gen("(defn- f [] 1) (f)").unwrap();

        assert!(out.starts_with(&format!("local {f}; {f} = (function()", f = f)));
        assert!(out.ends_with(&format!("\n{}();", f)));
    }

    #[test]
    fn global() {
        let out = gen("(defn hello [] :global 1)").unwrap();
        assert!(out.starts_with(r#"_G["hello"] = (function()"#));
    }
}
