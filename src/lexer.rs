use logos::Logos;

use crate::error::{ErrorKind, NodeError, Result};
use crate::token::{Spanned, Token};

/// Tokenize a graph script into a vector of spanned tokens.
pub fn lex(source: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => {
                tokens.push(Spanned { token, span });
            }
            Err(()) => {
                let fragment = &source[span.clone()];
                return Err(NodeError {
                    kind: ErrorKind::UnrecognizedToken(fragment.to_string()),
                    span: Some(span),
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_output_statement() {
        let source = r#"
            // tinted position
            output fragment = vec4(positionLocal.xyz * 0.5, 1.0);
        "#;

        let tokens = lex(source).expect("lexing should succeed");
        let kinds: Vec<_> = tokens.iter().map(|t| &t.token).collect();

        assert_eq!(kinds[0], &Token::Output);
        assert!(matches!(kinds[1], Token::Ident(s) if s == "fragment"));
        assert_eq!(kinds[2], &Token::Assign);
        assert!(matches!(kinds[3], Token::Ident(s) if s == "vec4"));
        assert_eq!(kinds[4], &Token::LParen);
        assert!(matches!(kinds[5], Token::Ident(s) if s == "positionLocal"));
        assert_eq!(kinds[6], &Token::Dot);
        assert!(matches!(kinds[7], Token::Ident(s) if s == "xyz"));
        assert_eq!(kinds[8], &Token::Star);
        assert!(matches!(kinds[9], Token::Float(v) if (*v - 0.5).abs() < 1e-10));
        assert_eq!(kinds[10], &Token::Comma);
        assert!(matches!(kinds[11], Token::Float(v) if (*v - 1.0).abs() < 1e-10));
        assert_eq!(kinds[12], &Token::RParen);
        assert_eq!(kinds[13], &Token::Semicolon);
        assert_eq!(tokens.len(), 14);
    }

    #[test]
    fn lex_two_character_operators() {
        let tokens = lex("a <= b && c >= d || e == f").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.token.clone()).collect();
        assert_eq!(kinds[1], Token::LessEqual);
        assert_eq!(kinds[3], Token::AndAnd);
        assert_eq!(kinds[5], Token::GreaterEqual);
        assert_eq!(kinds[7], Token::OrOr);
        assert_eq!(kinds[9], Token::EqualEqual);
    }

    #[test]
    fn lex_numeric_members() {
        let tokens = lex("m.2").unwrap();
        assert_eq!(tokens[1].token, Token::Dot);
        assert_eq!(tokens[2].token, Token::Int(2));

        let tokens = lex("2.5e-1").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].token, Token::Float(v) if (v - 0.25).abs() < 1e-10));
    }

    #[test]
    fn lex_rejects_unknown_characters() {
        let err = lex("let a = $;").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnrecognizedToken(ref s) if s == "$"));
        assert_eq!(err.span, Some(8..9));
    }
}
