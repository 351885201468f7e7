use std::fmt;
use std::ops::Range;

/// All errors produced while building or compiling a node graph.
#[derive(Debug)]
pub struct NodeError {
    pub kind: ErrorKind,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Lexer encountered an unrecognized character/sequence.
    #[error("unrecognized token: {0}")]
    UnrecognizedToken(String),
    /// Parser expected one thing, got another.
    #[error("expected {expected}, got {got}")]
    UnexpectedToken { expected: String, got: String },
    /// Parser reached end of input unexpectedly.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    /// An enum-like configuration field holds a value no case handles.
    #[error("{node}: unknown {field} '{value}'")]
    UnknownVariant {
        node: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("redefinition of node element {0}")]
    DuplicateElement(String),
    #[error("node element {0} is not a function")]
    NotCallable(String),
    #[error("{node} has no member '{member}'")]
    UnknownMember { node: String, member: String },
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{function}: missing input '{input}'")]
    MissingInput { function: String, input: String },
    /// A deferred node was asked for its type before it was constructed.
    #[error("type of {0} is not resolved before construction")]
    Unresolved(String),
    #[error("cyclic graph: {0} depends on itself")]
    Cycle(String),
    #[error("{language} does not support {feature}")]
    Unsupported {
        language: &'static str,
        feature: String,
    },
    #[error("{0}")]
    Message(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(span) = &self.span {
            write!(f, " (at byte {}..{})", span.start, span.end)?;
        }

        Ok(())
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for NodeError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;

/// Shorthand constructors.
impl NodeError {
    pub fn unexpected_token(expected: &str, got: &str, span: Range<usize>) -> Self {
        Self {
            kind: ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                got: got.to_string(),
            },
            span: Some(span),
        }
    }

    pub fn unexpected_eof(expected: &str) -> Self {
        ErrorKind::UnexpectedEof {
            expected: expected.to_string(),
        }
        .into()
    }

    pub fn unknown_variant(node: &'static str, field: &'static str, value: &str) -> Self {
        ErrorKind::UnknownVariant {
            node,
            field,
            value: value.to_string(),
        }
        .into()
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument(msg.into()).into()
    }

    pub fn unsupported(language: &'static str, feature: impl Into<String>) -> Self {
        ErrorKind::Unsupported {
            language,
            feature: feature.into(),
        }
        .into()
    }

    pub fn message(msg: impl Into<String>) -> Self {
        ErrorKind::Message(msg.into()).into()
    }

    /// Attach a source span if none is recorded yet.
    pub fn with_span(mut self, span: Range<usize>) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_span() {
        let err = NodeError::unexpected_token("';'", "')'", 4..5);
        assert_eq!(err.to_string(), "expected ';', got ')' (at byte 4..5)");
    }

    #[test]
    fn unknown_variant_names_node_and_value() {
        let err = NodeError::unknown_variant("SceneNode", "scope", "fogDensity");
        assert_eq!(err.to_string(), "SceneNode: unknown scope 'fogDensity'");
    }

    #[test]
    fn with_span_keeps_first_span() {
        let err = NodeError::invalid_argument("x").with_span(1..2).with_span(7..9);
        assert_eq!(err.span, Some(1..2));
    }
}
