//! Statement and program parsing.

use crate::ast::{Block, Program, Span, Stmt, StmtKind, TypeName};
use crate::expr::expression;
use crate::lexer::{identifier, keyword, position, symbol, ws, PResult};
use nom::branch::alt;
use nom::combinator::{all_consuming, opt, value};
use nom::multi::many0;
use nom::sequence::delimited;
use nom::Parser;

fn type_name(input: &str) -> PResult<TypeName> {
    alt((
        value(TypeName::Int, keyword("int")),
        value(TypeName::Bool, keyword("bool")),
    ))
    .parse(input)
}

fn var_decl<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let start = position(full, input);
    let (input, ty) = type_name(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = symbol("=")(input)?;
    let (input, value) = expression(full, input)?;
    let (input, _) = symbol(";")(input)?;
    let end = position(full, input);
    Ok((
        input,
        Stmt::new(StmtKind::VarDecl { ty, name, value }, Span::new(start, end)),
    ))
}

fn assign_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let start = position(full, input);
    let (input, name) = identifier(input)?;
    let (input, _) = symbol("=")(input)?;
    let (input, value) = expression(full, input)?;
    let (input, _) = symbol(";")(input)?;
    let end = position(full, input);
    Ok((input, Stmt::new(StmtKind::Assign { name, value }, Span::new(start, end))))
}

fn block<'a>(full: &'a str, input: &'a str) -> PResult<'a, Block> {
    delimited(symbol("{"), many0(|i| stmt(full, i)), symbol("}")).parse(input)
}

fn if_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let start = position(full, input);
    let (input, _) = keyword("if")(input)?;
    let (input, cond) = expression(full, input)?;
    let (input, then_branch) = block(full, input)?;
    let (input, else_branch) = opt(|i| else_tail(full, i)).parse(input)?;
    let end = position(full, input);
    Ok((
        input,
        Stmt::new(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            Span::new(start, end),
        ),
    ))
}

fn else_tail<'a>(full: &'a str, input: &'a str) -> PResult<'a, Block> {
    let (input, _) = keyword("else")(input)?;
    alt((
        |i| block(full, i),
        |i| {
            let (i, nested) = if_stmt(full, i)?;
            Ok((i, vec![nested]))
        },
    ))
    .parse(input)
}

fn while_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let start = position(full, input);
    let (input, _) = keyword("while")(input)?;
    let (input, cond) = expression(full, input)?;
    let (input, body) = block(full, input)?;
    let end = position(full, input);
    Ok((input, Stmt::new(StmtKind::While { cond, body }, Span::new(start, end))))
}

/// `observe(E);` or `observe E;` (spec §3 allows either form).
fn observe_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let start = position(full, input);
    let (input, _) = keyword("observe")(input)?;
    let (input, cond) = alt((
        |i| delimited(symbol("("), |i2| expression(full, i2), symbol(")")).parse(i),
        |i| expression(full, i),
    ))
    .parse(input)?;
    let (input, _) = symbol(";")(input)?;
    let end = position(full, input);
    Ok((input, Stmt::new(StmtKind::Observe { cond }, Span::new(start, end))))
}

fn block_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let start = position(full, input);
    let (input, inner) = block(full, input)?;
    let end = position(full, input);
    Ok((input, Stmt::new(StmtKind::Block(inner), Span::new(start, end))))
}

pub fn stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    alt((
        |i| var_decl(full, i),
        |i| if_stmt(full, i),
        |i| while_stmt(full, i),
        |i| observe_stmt(full, i),
        |i| block_stmt(full, i),
        |i| assign_stmt(full, i),
    ))
    .parse(input)
}

/// Parses a whole SL source file into a [`Program`]: a flat sequence
/// of top-level statements, trailing whitespace permitted, nothing
/// else.
pub fn program(input: &str) -> PResult<Program> {
    let full = input;
    let (input, statements) =
        all_consuming(|i| {
            let (i, stmts) = many0(|i2| stmt(full, i2)).parse(i)?;
            let (i, _) = ws(i)?;
            Ok((i, stmts))
        })
        .parse(input)?;
    Ok((input, Program { statements }))
}
