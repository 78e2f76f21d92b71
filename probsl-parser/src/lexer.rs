//! Whitespace/comment skipping and token-level helpers, threaded
//! through every parser as the `full` + `input` pair the whole module
//! uses to compute spans (`position(full, input) == full.len() -
//! input.len()`, the byte offset already consumed).

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while};
use nom::character::complete::{alpha1, alphanumeric1, char, multispace1};
use nom::combinator::{not, peek, recognize, value, verify};
use nom::multi::many0;
use nom::sequence::pair;
use nom::{IResult, Parser};

pub type PResult<'a, T> = IResult<&'a str, T>;

/// Byte offset already consumed from the full source.
pub fn position(full: &str, current: &str) -> usize {
    full.len() - current.len()
}

fn line_comment(input: &str) -> PResult<&str> {
    recognize(pair(tag("//"), take_while(|c| c != '\n'))).parse(input)
}

fn block_comment(input: &str) -> PResult<&str> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

/// Skips whitespace and comments; always succeeds, possibly consuming
/// nothing.
pub fn ws(input: &str) -> PResult<()> {
    value(
        (),
        many0(alt((value((), multispace1), value((), line_comment), value((), block_comment)))),
    )
    .parse(input)
}

const KEYWORDS: &[&str] = &[
    "int", "bool", "true", "false", "if", "else", "while", "observe", "discrete",
];

fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Parses an exact keyword, skipping leading whitespace, and requires
/// that it not be immediately followed by another identifier
/// character (so `ifx` doesn't parse as `if` then `x`).
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        let (input, word) = verify(
            recognize(pair(tag(kw), peek(not(alphanumeric1)))),
            |s: &str| s == kw,
        )
        .parse(input)?;
        Ok((input, word))
    }
}

/// Parses an identifier, skipping leading whitespace; rejects SL's
/// reserved keywords.
pub fn identifier(input: &str) -> PResult<String> {
    let (input, _) = ws(input)?;
    let (input, id) = verify(
        recognize(pair(alt((alpha1, tag("_"))), many0(alt((alphanumeric1, tag("_")))))),
        |s: &str| !is_keyword(s),
    )
    .parse(input)?;
    Ok((input, id.to_string()))
}

/// Parses a fixed symbol (`+`, `==`, `{`, ...), skipping leading
/// whitespace.
pub fn symbol<'a>(sym: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        tag(sym).parse(input)
    }
}

/// A single ASCII digit-or-sign-led integer literal, skipping leading
/// whitespace.
pub fn int_literal(input: &str) -> PResult<i64> {
    let (input, _) = ws(input)?;
    let (input, text) = recognize(pair(
        nom::combinator::opt(char('-')),
        nom::character::complete::digit1,
    ))
    .parse(input)?;
    let value: i64 = text.parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((input, value))
}

/// A float literal (`0.5`, `-1.0`), used only inside `discrete`
/// tables (spec §3 restricts floats to probability constants).
pub fn float_literal(input: &str) -> PResult<f64> {
    let (input, _) = ws(input)?;
    let (input, text) = recognize((
        nom::combinator::opt(char('-')),
        nom::character::complete::digit1,
        char('.'),
        nom::character::complete::digit1,
    ))
    .parse(input)?;
    let value: f64 = text.parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Float))
    })?;
    Ok((input, value))
}
