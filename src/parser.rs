use crate::ast::*;
use crate::builder::Stage;
use crate::error::{ErrorKind, NodeError, Result};
use crate::token::{Spanned, Token};

/// Recursive descent parser for graph scripts.
///
/// Statements are LL(1); expressions use Pratt-style precedence climbing
/// with postfix member access, calls and indexing.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the next token.
    fn next(&mut self, expected: &str) -> Result<Spanned> {
        match self.tokens.get(self.pos) {
            Some(s) => {
                self.pos += 1;
                Ok(s.clone())
            }
            None => Err(NodeError::unexpected_eof(expected)),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span> {
        match self.peek_spanned() {
            Some(s) if &s.token == expected => {
                let span = s.span.clone();
                self.pos += 1;
                Ok(span)
            }
            Some(s) => Err(NodeError::unexpected_token(
                expected.describe(),
                s.token.describe(),
                s.span.clone(),
            )),
            None => Err(NodeError::unexpected_eof(expected.describe())),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span)> {
        let s = self.next("identifier")?;
        match s.token {
            Token::Ident(name) => Ok((name, s.span)),
            other => Err(NodeError::unexpected_token("identifier", other.describe(), s.span)),
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn last_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span.clone()
        } else {
            0..0
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// Parse a complete script.
    pub fn parse(&mut self) -> Result<Script> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(Script { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let statement = match self.peek() {
            Some(Token::Let) => {
                let start = self.expect(&Token::Let)?.start;
                let (name, _) = self.expect_ident()?;
                self.expect(&Token::Assign)?;
                let value = self.parse_expr(0)?;
                Statement::Let {
                    name,
                    value,
                    span: start..self.last_span().end,
                }
            }
            Some(Token::Output) => {
                let start = self.expect(&Token::Output)?.start;
                let (name, span) = self.expect_ident()?;
                let stage = match name.as_str() {
                    "vertex" => Stage::Vertex,
                    "fragment" => Stage::Fragment,
                    "compute" => Stage::Compute,
                    _ => {
                        return Err(NodeError::unexpected_token(
                            "'vertex', 'fragment' or 'compute'",
                            "identifier",
                            span,
                        ))
                    }
                };
                self.expect(&Token::Assign)?;
                let value = self.parse_expr(0)?;
                Statement::Output {
                    stage,
                    value,
                    span: start..self.last_span().end,
                }
            }
            _ => Statement::Expr(self.parse_expr(0)?),
        };
        self.expect(&Token::Semicolon)?;
        Ok(statement)
    }

    // ── Expressions (Pratt precedence climbing) ───────────────────────

    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::OrOr) => BinOp::Or,
                Some(Token::AndAnd) => BinOp::And,
                Some(Token::EqualEqual) => BinOp::Equal,
                Some(Token::Less) => BinOp::Less,
                Some(Token::Greater) => BinOp::Greater,
                Some(Token::LessEqual) => BinOp::LessEqual,
                Some(Token::GreaterEqual) => BinOp::GreaterEqual,
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };

            if op.precedence() <= min_prec {
                break;
            }

            self.pos += 1; // consume operator
            let right = self.parse_expr(op.precedence())?;
            let span = left.span.start..right.span.end;
            left = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.at(&Token::Minus) {
            let start = self.expect(&Token::Minus)?.start;
            let operand = self.parse_unary()?;
            let span = start..operand.span.end;
            return Ok(match operand.kind {
                ExprKind::Number(v) => Expr {
                    kind: ExprKind::Number(-v),
                    span,
                },
                _ => Expr {
                    kind: ExprKind::Negate(Box::new(operand)),
                    span,
                },
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let s = self.next("member name")?;
                    let name = match s.token {
                        Token::Ident(name) => name,
                        Token::Int(index) => index.to_string(),
                        other => {
                            return Err(NodeError::unexpected_token(
                                "member name",
                                other.describe(),
                                s.span,
                            ))
                        }
                    };
                    let span = expr.span.start..s.span.end;
                    expr = Expr {
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            name,
                        },
                        span,
                    };
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    let span = expr.span.start..self.last_span().end;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr(0)?;
                    let end = self.expect(&Token::RBracket)?.end;
                    let span = expr.span.start..end;
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.at(&Token::RParen) {
            if self.peek().is_none() {
                return Err(NodeError::unexpected_eof("')'"));
            }
            args.push(self.parse_expr(0)?);
            if !self.at(&Token::Comma) {
                break;
            }
            self.pos += 1;
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let s = self.next("expression")?;
        let kind = match s.token {
            Token::Float(v) => ExprKind::Number(v),
            Token::Int(v) => ExprKind::Number(v as f64),
            Token::True => ExprKind::Bool(true),
            Token::False => ExprKind::Bool(false),
            Token::String(v) => ExprKind::String(v),
            Token::Ident(name) => ExprKind::Ident(name),
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                let end = self.expect(&Token::RParen)?.end;
                return Ok(Expr {
                    kind: inner.kind,
                    span: s.span.start..end,
                });
            }
            other => {
                return Err(NodeError {
                    kind: ErrorKind::UnexpectedToken {
                        expected: "expression".to_string(),
                        got: other.describe().to_string(),
                    },
                    span: Some(s.span),
                })
            }
        };
        Ok(Expr { kind, span: s.span })
    }
}

/// Lex and parse a script.
pub fn parse(source: &str) -> Result<Script> {
    let tokens = crate::lexer::lex(source)?;
    Parser::new(tokens).parse()
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(src: &str) -> Expr {
        let script = parse(&format!("{src};")).expect("source should parse");
        match script.statements.into_iter().next() {
            Some(Statement::Expr(expr)) => expr,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn parse_statements() {
        let script = parse(
            r#"
            let tint = uniform("vec3", "tint");
            output fragment = vec4(tint, 1.0);
            "#,
        )
        .unwrap();
        assert_eq!(script.statements.len(), 2);
        assert!(matches!(&script.statements[0], Statement::Let { name, .. } if name == "tint"));
        assert!(matches!(
            &script.statements[1],
            Statement::Output { stage: Stage::Fragment, .. }
        ));
    }

    #[test]
    fn parse_operator_precedence() {
        // 0.3 + sin(time) * 0.05 parses as 0.3 + (sin(time) * 0.05)
        let expr = parse_expr("0.3 + sin(time) * 0.05");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn parse_comparison_binds_looser_than_arithmetic() {
        let expr = parse_expr("a + 1.0 < b && c");
        let ExprKind::Binary { op, left, .. } = expr.kind else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinOp::And);
        assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Less, .. }));
    }

    #[test]
    fn parse_member_chains() {
        let expr = parse_expr("positionLocal.xyz.mul(2.0)[1]");
        let ExprKind::Index { object, .. } = expr.kind else {
            panic!("expected an index");
        };
        let ExprKind::Call { callee, args } = object.kind else {
            panic!("expected a call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(callee.kind, ExprKind::Member { ref name, .. } if name == "mul"));
        assert_eq!(expr.span, 0..29);
    }

    #[test]
    fn negative_literals_fold() {
        let expr = parse_expr("-2.0");
        assert!(matches!(expr.kind, ExprKind::Number(v) if v == -2.0));
        assert!(matches!(parse_expr("-a").kind, ExprKind::Negate(_)));
    }

    #[test]
    fn errors_carry_spans() {
        let err = parse("output pixel = 1.0;").unwrap_err();
        assert_eq!(err.span, Some(7..12));

        let err = parse("let a = (1.0 + 2.0;").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedToken { .. }));
        assert_eq!(err.to_string(), "expected ')', got ';' (at byte 18..19)");

        let err = parse("let a = 1.0").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedEof { .. }));
    }
}
