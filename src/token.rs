use logos::Logos;

/// Tokens of a graph script.
///
/// Only `let`, `output` and the boolean literals are keywords. Stage names,
/// builtins and element names are identifiers resolved during evaluation.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|//[^\n]*")]
pub enum Token {
    // ── Keywords ───────────────────────────────────────────────────────
    #[token("let")]
    Let,
    #[token("output")]
    Output,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // ── Literals ───────────────────────────────────────────────────────
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", priority = 2, callback = |lex| lex.slice().parse::<u64>().ok())]
    Int(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    String(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", priority = 1, callback = |lex| Some(lex.slice().to_string()))]
    Ident(String),

    // ── Operators ──────────────────────────────────────────────────────
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,

    // ── Delimiters ─────────────────────────────────────────────────────
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

impl Token {
    /// Human-readable name for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Let => "'let'",
            Token::Output => "'output'",
            Token::True => "'true'",
            Token::False => "'false'",
            Token::Float(_) => "float",
            Token::Int(_) => "integer",
            Token::String(_) => "string",
            Token::Ident(_) => "identifier",
            Token::Assign => "'='",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Star => "'*'",
            Token::Slash => "'/'",
            Token::Percent => "'%'",
            Token::Less => "'<'",
            Token::Greater => "'>'",
            Token::LessEqual => "'<='",
            Token::GreaterEqual => "'>='",
            Token::EqualEqual => "'=='",
            Token::AndAnd => "'&&'",
            Token::OrOr => "'||'",
            Token::Comma => "','",
            Token::Dot => "'.'",
            Token::Semicolon => "';'",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBracket => "'['",
            Token::RBracket => "']'",
        }
    }
}

/// A token with its source location (byte offset span).
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}
