//! Lexer, AST, and recursive-descent parser for SL source text.

pub mod ast;
pub mod expr;
pub mod lexer;
pub mod stmt;

pub use ast::{BinOp, Block, Expr, ExprKind, Program, Span, Stmt, StmtKind, TypeName};

/// A parse failure, anchored to the byte offset nom gave up at.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// Parses a complete SL source file.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    match stmt::program(source) {
        Ok((_, program)) => Ok(program),
        Err(err) => {
            let offset = match &err {
                nom::Err::Error(e) | nom::Err::Failure(e) => source.len() - e.input.len(),
                nom::Err::Incomplete(_) => source.len(),
            };
            Err(ParseError {
                message: format!("unexpected input: {err}"),
                span: Span::new(offset, offset),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_var_decl() {
        let program = parse("int x = 42;").unwrap();
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(
            program.statements[0].kind,
            StmtKind::VarDecl { ty: TypeName::Int, .. }
        ));
    }

    #[test]
    fn parses_additive_and_equality_precedence() {
        let program = parse("bool c = 1 + 2 == 3;").unwrap();
        let StmtKind::VarDecl { value, .. } = &program.statements[0].kind else {
            panic!("expected a var decl")
        };
        match &value.kind {
            ExprKind::Binary { op: BinOp::Eq, lhs, rhs } => {
                assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Add, .. }));
                assert!(matches!(rhs.kind, ExprKind::IntLiteral(3)));
            }
            other => panic!("expected top-level ==, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_else() {
        let program = parse("if true { int x = 1; } else { int x = 2; }").unwrap();
        assert!(matches!(program.statements[0].kind, StmtKind::If { .. }));
    }

    #[test]
    fn parses_while_loop() {
        let program = parse("while true { int x = 1; }").unwrap();
        assert!(matches!(program.statements[0].kind, StmtKind::While { .. }));
    }

    #[test]
    fn parses_observe_with_and_without_parens() {
        let a = parse("observe(true);").unwrap();
        let b = parse("observe true;").unwrap();
        assert!(matches!(a.statements[0].kind, StmtKind::Observe { .. }));
        assert!(matches!(b.statements[0].kind, StmtKind::Observe { .. }));
    }

    #[test]
    fn parses_discrete_table_in_source_order() {
        let program = parse("int x = discrete({1: 0.25, 2: 0.75});").unwrap();
        let StmtKind::VarDecl { value, .. } = &program.statements[0].kind else {
            panic!("expected a var decl")
        };
        assert_eq!(
            value.kind,
            ExprKind::Discrete(vec![(1, 0.25), (2, 0.75)])
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("int x = ;").is_err());
    }
}
