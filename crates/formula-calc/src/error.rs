use serde::{Deserialize, Serialize};

/// Byte range in the formula text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// Malformed formula text. The whole parse is rejected; there is no partial result.
///
/// `line` and `column` are 1-based and count characters; `span` is a byte range into the text
/// that was handed to the parser (including any leading `=`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            span,
            line,
            column,
        }
    }

    /// Byte offset the error points at.
    pub fn position(&self) -> usize {
        self.span.start
    }
}
