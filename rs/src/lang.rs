//! Charon language transformations
//!
//! Some macros are easier to describe as a rewrite of the syntax tree than as
//! code generation. The functions here take the raw argument terms of a macro
//! and synthesize the equivalent plain terms, which the code generator then
//! lowers like any other code. Nothing in here touches the scope table.
use crate::core::{Error, Invoke, Location, Result, Term, Token};

/// Where the threaded value goes in each stage
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Slot {
    First,
    Last,
}

/// Naive unique pairs, where (a, b) is the same as (b, a)
///
/// Pairs follow the order of the input and never include an element with
/// itself: `[a b c]` yields `(a, b) (a, c) (b, c)`.
pub fn unique_pairs<T>(list: &[T]) -> Vec<(&T, &T)> {
    let mut pairs = Vec::with_capacity(list.len() * list.len().saturating_sub(1) / 2);

    for (i, top) in list.iter().enumerate() {
        for bot in &list[i + 1..] {
            pairs.push((top, bot));
        }
    }

    pairs
}

/// Thread a value through a list of calls
///
/// `(-> v (f a) (g b))` becomes `(g (f v a) b)` and `(<- v (f a) (g b))`
/// becomes `(g b (f a v))`.
pub fn thread(args: &[Term], slot: Slot, at: Location) -> Result<Term> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| Error::syntax("Threading needs an initial value!", at))?;

    rest.iter().try_fold(first.clone(), |value, stage| {
        Ok(Term::Invoke(insert(stage, value, slot)?))
    })
}

/// Pass the same value to every call, collecting the results in a list
///
/// `(-< v (f a) (g b))` becomes `[(f v a) (g v b)]`.
pub fn thread_parallel(args: &[Term], slot: Slot, at: Location) -> Result<Term> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| Error::syntax("Threading needs an initial value!", at))?;

    let values = rest
        .iter()
        .map(|stage| Ok(Term::Invoke(insert(stage, first.clone(), slot)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Term::List { values, at })
}

fn insert(stage: &Term, value: Term, slot: Slot) -> Result<Invoke> {
    let mut call = match stage {
        Term::Invoke(inv) => inv.clone(),
        t => {
            return Err(Error::syntax(
                format!("Threading stages must be invocations, found {}", t.kind()),
                t.location(),
            ))
        }
    };

    match slot {
        Slot::First => call.args.insert(0, value),
        Slot::Last => call.args.push(value),
    }

    Ok(call)
}

/// Rewrite exclusive or in terms of `and`, `or` and `not`
///
/// The terms are folded from the left, so `(xor a b c)` is `(xor (xor a b) c)`
/// and a single term is returned unchanged.
pub fn xor(args: &[Term], at: Location) -> Result<Term> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| Error::syntax("XOR function accepts at least one argument.", at))?;

    Ok(rest.iter().fold(first.clone(), |root, term| {
        let (l, r) = (root.location(), term.location());

        let a = call("and", r, vec![call("not", l, vec![root.clone()]), term.clone()]);
        let b = call("and", l, vec![root, call("not", r, vec![term.clone()])]);

        call("or", at, vec![a, b])
    }))
}

fn call(name: &str, at: Location, args: Vec<Term>) -> Term {
    Term::Invoke(Invoke::call(name, at, args))
}

/// Rewrite `(:key m)` into `(table/get :key m)` and `(0 v)` into `(list/get 0 v)`
///
/// Symbols made of an integer index lists too, `(:1 v)` is `(list/get 1 v)`.
pub fn indexed(inv: &Invoke) -> Invoke {
    let (getter, key) = match inv.target.as_ref() {
        Term::Symbol(t) if t.value.parse::<i64>().is_ok() => ("list/get", Term::Number(t.clone())),
        Term::Symbol(t) => ("table/get", Term::Symbol(t.clone())),
        Term::Number(t) => ("list/get", Term::Number(t.clone())),
        other => ("table/get", other.clone()),
    };

    let mut args = Vec::with_capacity(inv.args.len() + 1);
    args.push(key);
    args.extend(inv.args.iter().cloned());

    Invoke { target: Box::new(Term::Name(Token::new(getter, inv.target.location()))), args, at: inv.at }
}

/// Is this term a `(catch ...)` clause of a try block?
pub fn is_catch(term: &Term) -> bool {
    matches!(term, Term::Invoke(inv) if inv.name() == Some("catch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse1, parse_term};
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use std::collections::HashMap;

    fn args(src: &str) -> Vec<Term> {
        parse1(src).args
    }

    #[test]
    fn pairs() {
        assert_eq!(unique_pairs(&[1, 2, 3]), vec![(&1, &2), (&1, &3), (&2, &3)]);
        assert_eq!(unique_pairs(&[1]), Vec::<(&i32, &i32)>::new());
        assert_eq!(unique_pairs::<i32>(&[]), vec![]);
    }

    #[quickcheck]
    fn pair_count(list: Vec<u8>) -> bool {
        let n = list.len();
        unique_pairs(&list).len() == n * n.saturating_sub(1) / 2
    }

    #[test]
    fn threading() {
        let at = Location::default();

        let t = thread(&args("(-> v (f a) (g b))"), Slot::First, at).unwrap();
        assert_eq!(t.to_string(), "(g (f v a) b)");

        let t = thread(&args("(<- v (f a) (g b))"), Slot::Last, at).unwrap();
        assert_eq!(t.to_string(), "(g b (f a v))");

        let t = thread(&args("(-> v)"), Slot::First, at).unwrap();
        assert_eq!(t.to_string(), "v");

        assert!(thread(&[], Slot::First, at).is_err());
        assert!(thread(&args("(-> v f)"), Slot::First, at).is_err());
    }

    #[test]
    fn parallel() {
        let at = Location::default();

        let t = thread_parallel(&args("(-< v (f a) (g b))"), Slot::First, at).unwrap();
        assert_eq!(t.to_string(), "[(f v a) (g v b)]");

        let t = thread_parallel(&args("(->> v (f a) (g b))"), Slot::Last, at).unwrap();
        assert_eq!(t.to_string(), "[(f a v) (g b v)]");
    }

    #[test]
    fn xors() {
        let at = Location::default();

        assert_eq!(xor(&args("(xor a)"), at).unwrap().to_string(), "a");
        assert_eq!(
            xor(&args("(xor a b)"), at).unwrap().to_string(),
            "(or (and (not a) b) (and a (not b)))"
        );
        assert!(matches!(xor(&[], at).unwrap_err(), Error::Syntax { .. }));
    }

    fn truth(term: &Term, env: &HashMap<&str, bool>) -> bool {
        match term {
            Term::Name(t) => env[t.value.as_str()],
            Term::Invoke(inv) => {
                let values: Vec<bool> = inv.args.iter().map(|a| truth(a, env)).collect();
                match inv.name() {
                    Some("and") => values.iter().all(|v| *v),
                    Some("or") => values.iter().any(|v| *v),
                    Some("not") => !values[0],
                    other => panic!("unexpected call {:?}", other),
                }
            }
            t => panic!("unexpected term {}", t),
        }
    }

    #[quickcheck]
    fn xor_truth_table(a: bool, b: bool, c: bool) -> bool {
        let env: HashMap<_, _> = vec![("a", a), ("b", b), ("c", c)].into_iter().collect();
        let term = xor(&args("(xor a b c)"), Location::default()).unwrap();

        truth(&term, &env) == (a ^ b ^ c)
    }

    #[test]
    fn indexing() {
        assert_eq!(indexed(&parse1("(:key m)")).to_string(), "(table/get :key m)");
        assert_eq!(indexed(&parse1("(:1 v)")).to_string(), "(list/get 1 v)");
        assert_eq!(indexed(&parse1("(0 v)")).to_string(), "(list/get 0 v)");
    }

    #[test]
    fn catches() {
        assert!(is_catch(&parse_term("(catch [e] e)")));
        assert!(!is_catch(&parse_term("(try 1)")));
        assert!(!is_catch(&parse_term("catch")));
    }
}
