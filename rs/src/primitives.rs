//! Operators lowered straight into Lua expressions rather than runtime calls.
//!
//! Every operator is variadic. Arithmetic and logic operators join their
//! arguments, comparisons hold between every pair of arguments:
//!
//! ```clj
//! (+ a b c)  ; (a+b+c)
//! (< a b c)  ; (a<b and a<c and b<c)
//! ```
use crate::{
    compiler::{emit::eval, state::State},
    core::*,
    lang,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operator {
    Plus,
    Minus,
    Div,
    Mul,
    Pow,
    Eq,
    Neq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    And,
    Or,
    Nand,
    Nor,
    Xor,
}

impl Operator {
    /// Lua spelling of the operator, xor has none
    fn lua(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Div => "/",
            Operator::Mul => "*",
            Operator::Pow => "^",
            Operator::Eq => "==",
            Operator::Neq => "~=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::GtEq => ">=",
            Operator::LtEq => "<=",
            Operator::And | Operator::Nand => " and ",
            Operator::Or | Operator::Nor => " or ",
            Operator::Xor => unreachable!("xor is rewritten into and/or before lowering"),
        }
    }
}

/// Generate an operator invocation
pub fn call(s: &mut State, op: Operator, inv: &Invoke) -> Result<String> {
    // Exclusive or is sugar over the other logic operators
    if op == Operator::Xor {
        return eval(s, &lang::xor(&inv.args, inv.at)?);
    }

    if inv.args.len() < 2 {
        return Err(Error::syntax(
            format!("Operator {} needs at least two arguments!", inv.target),
            inv.at,
        ));
    }

    let args = inv.args.iter().map(|a| operand(s, a)).collect::<Result<Vec<_>>>()?;

    let code = match op {
        Operator::Eq | Operator::Neq | Operator::Gt | Operator::Lt | Operator::GtEq | Operator::LtEq => {
            let pairs = lang::unique_pairs(&args)
                .into_iter()
                .map(|(a, b)| format!("{}{}{}", a, op.lua(), b))
                .collect::<Vec<_>>();
            format!("({})", pairs.join(" and "))
        }

        Operator::Nand | Operator::Nor => format!("(not ({}))", args.join(op.lua())),

        Operator::Pow => pow(&args, s.options.target),

        _ => format!("({})", args.join(op.lua())),
    };

    Ok(code)
}

// `a - -1` would start a comment
fn operand(s: &mut State, term: &Term) -> Result<String> {
    let code = eval(s, term)?;
    Ok(if code.starts_with('-') { format!("({})", code) } else { code })
}

// Left fold like every other operator, Lua before 5.3 has no exponent operator
fn pow(args: &[String], target: Target) -> String {
    let mut acc = args[0].clone();
    for arg in &args[1..] {
        acc = if target < Target::Lua53 {
            format!("math.pow({}, {})", acc, arg)
        } else {
            format!("({}^{})", acc, arg)
        };
    }
    acc
}

/// Logical negation, the only unary operator
pub fn not(s: &mut State, inv: &Invoke) -> Result<String> {
    match inv.args.as_slice() {
        [arg] => Ok(format!("(not {})", eval(s, arg)?)),
        _ => Err(Error::syntax("Not operator only accepts one argument!", inv.at)),
    }
}
