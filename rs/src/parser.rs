//! A Charon parser in nom.
//!
//! Describes the grammar below in Rust as closely as possible using the nom
//! parser combinator library. Every parser takes the [Source] it is working on
//! along with the remaining input, so that terms can be tagged with their
//! location as they are built.
//!
//! ```BNF
//! <program>  → <invoke>*
//! <term>     → <invoke> | <list> | <table> | <string> | <target>
//! <invoke>   → ( <target> <term>* )
//! <target>   → <wildcard> | <symbol> | <number> | <access> | <name>
//! <list>     → [ <term>* ]
//! <table>    → { <term>* } | '{ <term>* }
//! <access>   → <name> <segment>+
//! <segment>  → : <name> | :: <name> | :? <name> | ::? <name>
//! <symbol>   → : <subsequent>+
//! <name>     → <initial> <subsequent>*
//! <wildcard> → #'
//! ```
//!
//! Whitespace, commas and `;` line comments separate terms.
use crate::core::*;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace1, not_line_ending, satisfy},
    combinator::{eof, map, not, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Source text with an index of line starts
struct Source<'a> {
    text: &'a str,
    lines: Vec<usize>,
}

impl<'a> Source<'a> {
    fn new(text: &'a str) -> Self {
        let lines = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1)).collect();
        Source { text, lines }
    }

    /// Position of the remaining input `rest` within the source
    fn position(&self, rest: &str) -> Position {
        let offset = self.text.len() - rest.len();
        let line = match self.lines.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };
        let column = self.text[self.lines[line]..offset].chars().count() + 1;

        Position { offset, line: line + 1, column }
    }

    fn span(&self, from: &str, to: &str) -> Location {
        Location { start: self.position(from), end: self.position(to) }
    }
}

/// A program is a sequence of invocations
fn program<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Program> {
    let (i, _) = ws(i)?;
    let (i, prog) = many0(terminated(|i: &'a str| invoke(src, i), ws))(i)?;
    let (i, _) = eof(i)?;

    Ok((i, prog))
}

fn term<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Term> {
    alt((
        map(|i: &'a str| invoke(src, i), Term::Invoke),
        |i: &'a str| list(src, i),
        |i: &'a str| table(src, i),
        map(|i: &'a str| leaf(src, i, string), Term::Str),
        |i: &'a str| target(src, i),
    ))(i)
}

fn terms<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Vec<Term>> {
    many0(terminated(|i: &'a str| term(src, i), ws))(i)
}

/// `(target args...)`
fn invoke<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Invoke> {
    let (rest, _) = pair(char('('), ws)(i)?;
    let (rest, target) = target(src, rest)?;
    let (rest, args) = many0(preceded(ws, |i: &'a str| term(src, i)))(rest)?;
    let (rest, _) = pair(ws, char(')'))(rest)?;

    Ok((rest, Invoke { target: Box::new(target), args, at: src.span(i, rest) }))
}

/// Anything that can be called
///
/// Numbers and symbols are valid targets, `(:key m)` and `(0 v)` index into
/// tables and lists.
fn target<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Term> {
    alt((
        map(|i: &'a str| leaf(src, i, wildcard), Term::Wildcard),
        map(|i: &'a str| leaf(src, i, symbol), Term::Symbol),
        map(|i: &'a str| leaf(src, i, number), Term::Number),
        |i: &'a str| reference(src, i),
    ))(i)
}

fn list<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Term> {
    let (rest, values) = delimited(pair(char('['), ws), |i: &'a str| terms(src, i), char(']'))(i)?;

    Ok((rest, Term::List { values, at: src.span(i, rest) }))
}

fn table<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Term> {
    let (rest, (quote, values)) = pair(
        opt(char('\'')),
        delimited(pair(char('{'), ws), |i: &'a str| terms(src, i), char('}')),
    )(i)?;

    Ok((rest, Term::Table { values, escaped: quote.is_some(), at: src.span(i, rest) }))
}

/// A name, optionally followed by access segments
fn reference<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Term> {
    let (rest, root) = leaf(src, i, identifier)?;
    let (rest, segments) = many0(|i: &'a str| segment(src, i))(rest)?;

    if segments.is_empty() {
        Ok((rest, Term::Name(root)))
    } else {
        Ok((rest, Term::Access(Access { root, segments, at: src.span(i, rest) })))
    }
}

fn segment<'a>(src: &Source<'a>, i: &'a str) -> IResult<&'a str, Segment> {
    let (rest, mode) = alt((
        value(Mode::UnboundCoalesce, tag("::?")),
        value(Mode::Unbound, tag("::")),
        value(Mode::BoundCoalesce, tag(":?")),
        value(Mode::Bound, tag(":")),
    ))(i)?;
    let (rest, name) = leaf(src, rest, identifier)?;

    Ok((rest, Segment { name, mode, at: src.span(i, rest) }))
}

/// Wrap the text matched by a parser into a located token
fn leaf<'a>(
    src: &Source<'a>,
    i: &'a str,
    parser: fn(&'a str) -> IResult<&'a str, &'a str>,
) -> IResult<&'a str, Token> {
    let (rest, text) = parser(i)?;
    Ok((rest, Token::new(text, src.span(i, rest))))
}

fn identifier(i: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(initial), take_while(subsequent)))(i)
}

fn initial(c: char) -> bool {
    c.is_alphabetic() || "!$%&*/<=>?~_^+-.|".contains(c)
}

fn subsequent(c: char) -> bool {
    initial(c) || c.is_numeric()
}

/// `:name`, the token keeps the name only
fn symbol(i: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(subsequent))(i)
}

/// Integers and decimals, not immediately followed by a name
fn number(i: &str) -> IResult<&str, &str> {
    terminated(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        not(satisfy(subsequent)),
    )(i)
}

/// String literals are kept verbatim, quotes and escapes included
fn string(i: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('"'),
        many0(alt((is_not("\"\\"), recognize(pair(char('\\'), anychar))))),
        char('"'),
    )))(i)
}

fn wildcard(i: &str) -> IResult<&str, &str> {
    tag("#'")(i)
}

/// Whitespace, commas and comments
fn ws(i: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, comment, tag(",")))))(i)
}

fn comment(i: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), not_line_ending))(i)
}

/// Parse the whole program
pub fn parse(text: &str) -> Result<Program> {
    let src = Source::new(text);

    match program(&src, text) {
        Ok((_rest, prog)) => Ok(prog),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let found = e.input.chars().next();
            let end = found.map_or(0, char::len_utf8);
            let message = match found {
                Some('(') => String::from("Malformed expression, check the arguments and the closing parenthesis."),
                Some(c) => format!("Unexpected `{}`, expecting an invocation.", c),
                None => String::from("Unexpected end of input."),
            };

            Err(Error::Parser { message, at: Some(src.span(e.input, &e.input[end..])) })
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(Error::Parser { message: String::from("Unexpected end of input."), at: None })
        }
    }
}

/// Parse a single invocation for testing, return or panic
#[cfg(test)]
pub fn parse1(i: &str) -> Invoke {
    let src = Source::new(i);
    match invoke(&src, i) {
        Ok((_rest, e)) => e,
        Err(e) => panic!("Failed to parse `{}`: {:?}", i, e),
    }
}

/// Parse any single term for testing, return or panic
#[cfg(test)]
pub fn parse_term(i: &str) -> Term {
    let src = Source::new(i);
    match term(&src, i) {
        Ok((_rest, e)) => e,
        Err(e) => panic!("Failed to parse `{}`: {:?}", i, e),
    }
}
