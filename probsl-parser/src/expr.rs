//! Expression parsing, in precedence order: equality (`==`, `<`) binds
//! looser than additive (`+`, `-`), which binds looser than primaries.

use crate::ast::{BinOp, Expr, ExprKind, Span};
use crate::lexer::{float_literal, identifier, int_literal, keyword, position, symbol, PResult};
use nom::branch::alt;
use nom::combinator::value;
use nom::multi::separated_list1;
use nom::sequence::delimited;
use nom::Parser;

/// Parses any expression.
pub fn expression<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    equality_expr(full, input)
}

fn equality_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (mut input, mut lhs) = additive_expr(full, input)?;

    loop {
        let op = alt((
            value(BinOp::Eq, symbol("==")),
            value(BinOp::Lt, symbol("<")),
        ))
        .parse(input);

        match op {
            Ok((rest, op)) => {
                let (rest, rhs) = additive_expr(full, rest)?;
                let end = position(full, rest);
                lhs = Expr::new(
                    ExprKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    Span::new(start, end),
                );
                input = rest;
            }
            Err(_) => break,
        }
    }

    Ok((input, lhs))
}

fn additive_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (mut input, mut lhs) = primary_expr(full, input)?;

    loop {
        let op = alt((
            value(BinOp::Add, symbol("+")),
            value(BinOp::Sub, symbol("-")),
        ))
        .parse(input);

        match op {
            Ok((rest, op)) => {
                let (rest, rhs) = primary_expr(full, rest)?;
                let end = position(full, rest);
                lhs = Expr::new(
                    ExprKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    Span::new(start, end),
                );
                input = rest;
            }
            Err(_) => break,
        }
    }

    Ok((input, lhs))
}

fn primary_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    alt((
        |i| discrete_expr(full, i),
        |i| paren_expr(full, i),
        |i| bool_literal_expr(full, i),
        |i| int_literal_expr(full, i),
        |i| identifier_expr(full, i),
    ))
    .parse(input)
}

fn paren_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    delimited(symbol("("), |i| expression(full, i), symbol(")")).parse(input)
}

fn bool_literal_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (input, value) = alt((value(true, keyword("true")), value(false, keyword("false")))).parse(input)?;
    let end = position(full, input);
    Ok((input, Expr::new(ExprKind::BoolLiteral(value), Span::new(start, end))))
}

fn int_literal_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (input, value) = int_literal(input)?;
    let end = position(full, input);
    Ok((input, Expr::new(ExprKind::IntLiteral(value), Span::new(start, end))))
}

fn identifier_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (input, name) = identifier(input)?;
    let end = position(full, input);
    Ok((input, Expr::new(ExprKind::Identifier(name), Span::new(start, end))))
}

/// `discrete({1: 0.5, 2: 0.5})`: an ordered table of int outcomes and
/// the probability of each, kept in source order (spec §3
/// `DiscreteDistribution`).
fn discrete_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (input, _) = keyword("discrete")(input)?;
    let (input, _) = symbol("(")(input)?;
    let (input, _) = symbol("{")(input)?;
    let (input, entries) = separated_list1(symbol(","), |i| table_entry(full, i)).parse(input)?;
    let (input, _) = symbol("}")(input)?;
    let (input, _) = symbol(")")(input)?;
    let end = position(full, input);
    Ok((input, Expr::new(ExprKind::Discrete(entries), Span::new(start, end))))
}

fn table_entry<'a>(_full: &'a str, input: &'a str) -> PResult<'a, (i64, f64)> {
    let (input, key) = int_literal(input)?;
    let (input, _) = symbol(":")(input)?;
    let (input, p) = float_literal(input)?;
    Ok((input, (key, p)))
}
