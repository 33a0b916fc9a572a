//! Module system and foreign symbols
//!
//! Imports lower into plain `require` calls. Extern declarations produce no
//! code at all, they only tell the compiler about names defined elsewhere and
//! whether calling them has side effects.
use crate::{
    compiler::{
        emit::{eval, Stmt},
        state::State,
    },
    core::*,
    symbols::{Kind, Scope},
};

/// `(import ...)`
///
/// ```clj
/// (import "lib")                   ; require("lib")
/// (import lib :from "lib")         ; local lib = require("lib")
/// (import [a b] :from "lib")       ; a and b from the package table of lib
/// ```
pub fn import(s: &mut State, args: &[Term], at: Location) -> Result<String> {
    let first = args.first().ok_or_else(|| Error::syntax("Import expects a module to import!", at))?;

    match (first, args.len()) {
        (Term::Str(_), 1) => return Ok(format!("require({});", eval(s, first)?)),
        (Term::Name(t), 1) => return Ok(format!("require(\"{}\");", t.value)),
        (_, 1) => {
            return Err(Error::syntax(
                format!("Unexpected {} found as import source, expecting a string or a name.", first.kind()),
                first.location(),
            ))
        }
        (_, 3) => {}
        _ => {
            return Err(Error::syntax(
                "Import expects either a module or a binding followed by `:from` and a module!",
                at,
            ))
        }
    }

    match &args[1] {
        Term::Symbol(t) if t.value == "from" => {}
        Term::Symbol(t) => {
            return Err(Error::syntax(
                format!("Import's second argument is a symbol: expected ':from' but found ':{}'", t.value),
                t.at,
            ))
        }
        t => return Err(Error::syntax("Import's second argument must be the symbol :from!", t.location())),
    }

    let source = eval(s, &args[2])?;

    match first {
        Term::Name(t) => {
            let data = s.register(t, Kind::Local, Scope::Local, false)?;
            Ok(format!("local {} = require({});", data.name, source))
        }

        Term::List { values, .. } => {
            let mut declare = String::new();
            let mut bind = String::new();

            for value in values {
                let name = value
                    .as_name()
                    .ok_or_else(|| Error::syntax("Import binding vectors expect names only.", value.location()))?;

                let data = s.register(name, Kind::Local, Scope::Local, false)?;
                declare += &format!("local {};\n", data.name);
                bind += &format!("{} = __package[\"{}\"];", data.name, data.original);
            }

            Ok(format!("{}do local __package = require({}); {} end", declare, source, bind))
        }

        t => Err(Error::syntax(
            format!("Unexpected {} found as first import argument. Expecting name or binding vector.", t.kind()),
            t.location(),
        )),
    }
}

/// `(module name [:import ...] ...)`
///
/// Names the package and imports its dependencies. The name decides the global
/// table a package is published under when exporting globally.
pub fn module(s: &mut State, inv: &Invoke) -> Result<String> {
    let name = match inv.args.first() {
        Some(Term::Name(t)) => t,
        Some(t) => {
            return Err(Error::syntax(
                format!("Module names should be valid identifiers, found {}.", t.kind()),
                t.location(),
            ))
        }
        None => {
            return Err(Error::syntax(
                "Module declaration must contain at least the name of the module.",
                inv.at,
            ))
        }
    };

    s.set_module_name(&name.value);

    let mut imports = vec![];
    for term in &inv.args[1..] {
        // Either `[:import ...]` or `(:import ...)`
        let values = match term {
            Term::List { values, .. } => values.clone(),
            Term::Invoke(inv) => {
                let mut values = vec![inv.target.as_ref().clone()];
                values.extend(inv.args.iter().cloned());
                values
            }
            t => {
                return Err(Error::syntax(
                    "Module declaration tail arguments can only contain import lists.",
                    t.location(),
                ))
            }
        };

        if values.len() != 2 && values.len() != 4 {
            return Err(Error::syntax(
                "Module's import lists contains wrong number of arguments, expected 2 or 4.",
                term.location(),
            ));
        }

        match values[0].as_symbol() {
            Some(t) if t.value == "import" => {}
            _ => return Err(Error::syntax("Import lists must start with :import!", values[0].location())),
        }

        imports.push(import(s, &values[1..], term.location())?);
    }

    Ok(format!("-- Module {}\n{}", name.value, imports.join("\n")))
}

/// `(declare name... :pure)`
///
/// Introduce names defined outside of Charon. Meta-specifiers `:pure` and
/// `:impure` make the names callable functions, `:global` declares them in
/// the root scope. Declared names are never mangled.
pub fn declare(s: &mut State, inv: &Invoke) -> Result<Stmt> {
    if s.pure() {
        return Err(Error::purity("Extern definition cannot be done from pure context.", inv.at));
    }

    let mut meta: Vec<&str> = vec![];
    let mut names = vec![];

    for term in &inv.args {
        match term {
            Term::Name(t) => names.push(t),
            Term::Symbol(t) => {
                let specifier = t.value.as_str();
                if !matches!(specifier, "pure" | "impure" | "global") {
                    return Err(Error::syntax(format!("Unexpected meta-specifier found: \"{}\"", specifier), t.at));
                }
                if meta.contains(&specifier) {
                    return Err(Error::types(format!("{} meta-specifier was already declared.", specifier), t.at));
                }
                meta.push(specifier);
            }
            t => {
                return Err(Error::syntax(
                    "Only names and meta-specifiers are allowed in extern definitions!",
                    t.location(),
                ))
            }
        }
    }

    let kind = match (meta.contains(&"pure"), meta.contains(&"impure")) {
        (true, true) => return Err(Error::types("Extern symbols can't be both pure and impure.", inv.at)),
        (true, false) => Kind::Func,
        (false, true) => Kind::ImpureFunc,
        (false, false) => Kind::Local,
    };

    let scope = if meta.contains(&"global") { Scope::Global } else { Scope::Local };

    let mut declared = vec![];
    for name in names {
        declared.push(s.register(name, kind, scope, true)?.name);
    }

    Ok(Stmt {
        code: format!("--[[ Extern symbol {} {{{}}} ]]", declared.join(","), meta.join(",")),
        separator: false,
    })
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
    fn imports() {
        let lib = mangle("lib");
        let (a, b) = (mangle("a"), mangle("b"));

        assert_eq!(gen(r#"(import "lib")"#).unwrap(), r#"require("lib");"#);
        assert_eq!(gen("(import lib)").unwrap(), r#"require("lib");"#);
        assert_eq!(
            gen(r#"(import lib :from "lib")"#).unwrap(),
            format!(r#"local {} = require("lib");"#, lib)
        );
        assert_eq!(
            gen(r#"(import [a b] :from "lib")"#).unwrap(),
            format!(
                "local {a};\nlocal {b};\ndo local __package = require(\"lib\"); {a} = __package[\"a\"];{b} = __package[\"b\"]; end;",
                a = a,
                b = b
            )
        );
    }

    #[test]
    fn bad_imports() {
        assert!(matches!(gen(r#"(import lib :in "lib")"#).unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen(r#"(import lib "lib")"#).unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen(r#"(import 1 :from "lib")"#).unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen(r#"(import [1] :from "lib")"#).unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(import)").unwrap_err(), Error::Syntax { .. }));
    }

    #[test]
    fn modules() {
        let lib = mangle("lib");

        assert_eq!(gen("(module app)").unwrap(), "-- Module app\n;");
        assert_eq!(
            gen(r#"(module app [:import lib :from "lib"] (:import "other"))"#).unwrap(),
            format!("-- Module app\nlocal {} = require(\"lib\");\nrequire(\"other\");", lib)
        );

        assert!(matches!(gen("(module)").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen(r#"(module "app")"#).unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(module app [:import])").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(module app [:export x])").unwrap_err(), Error::Syntax { .. }));
    }

    #[test]
    fn declares() {
        assert_eq!(gen("(declare print :impure)").unwrap(), "--[[ Extern symbol print {impure} ]]");
        assert_eq!(gen("(declare a b)").unwrap(), "--[[ Extern symbol a,b {} ]]");
        assert_eq!(
            gen("(declare tostring :pure) (tostring 1)").unwrap(),
            "--[[ Extern symbol tostring {pure} ]]\ntostring(1);"
        );
    }

    #[test]
    fn declare_errors() {
        assert!(matches!(gen("(declare x :fast)").unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(declare x :pure :pure)").unwrap_err(), Error::Type { .. }));
        assert!(matches!(gen("(declare x :pure :impure)").unwrap_err(), Error::Type { .. }));
        assert!(matches!(gen(r#"(declare "x")"#).unwrap_err(), Error::Syntax { .. }));
        assert!(matches!(gen("(defn f [] (declare x))").unwrap_err(), Error::Purity { .. }));
    }

    #[test]
    fn declared_purity() {
        assert!(gen("(declare log :pure) (defn f [] (log 1))").is_ok());
        assert!(matches!(
            gen("(declare log :impure) (defn f [] (log 1))").unwrap_err(),
            Error::Purity { .. }
        ));
        assert!(gen("(declare log :impure) (defn! f [] (log 1))").is_ok());
    }

    #[test]
    fn global_declare() {
        let options = Options::module();
        let mut s = State::new(&options);

        s.enter(None);
        emit::statements(&mut s, &parse("(declare love :global)").unwrap()).unwrap();
        s.leave();

        assert_eq!(s.reference(s.get("love").unwrap()), r#"_G["love"]"#);
    }
}
