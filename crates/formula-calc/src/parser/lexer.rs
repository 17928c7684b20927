//! Token stream over the scanner, with a materialized buffer for speculative lookahead.

use std::sync::OnceLock;

use formula_refs::{is_name_char, is_name_start, Reference};
use regex::Regex;

use super::scanner::{Position, Scanner};
use crate::{ErrorKind, ParseError, Span};

/// Every operator the lexer recognizes, longest match wins.
pub(crate) const OPERATORS: &[&str] = &[
    ":", "!", ",", "%", "^", "*", "/", "+", "-", "&", "=", "<", ">", "<=", ">=", "<>",
];

const PUNCTUATION: &str = ";(){}[]";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    String(String),
    Symbol { name: String, quoted: bool },
    Operator(&'static str),
    Punctuation(char),
    Reference(Reference),
    Function(String),
    Bool(bool),
    SheetMarker,
    Error(ErrorKind),
    Unknown(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    /// Set on symbols directly followed by whitespace.
    pub space_after: bool,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Operator(o) if o == op)
    }

    pub fn is_punc(&self, ch: char) -> bool {
        matches!(self.kind, TokenKind::Punctuation(c) if c == ch)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// An unquoted symbol's text.
    pub fn bare_symbol(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Symbol {
                name,
                quoted: false,
            } => Some(name),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(n) => format!("number «{n}»"),
            TokenKind::String(s) => format!("string «{s}»"),
            TokenKind::Symbol { name, .. } => format!("symbol «{name}»"),
            TokenKind::Operator(op) => format!("operator «{op}»"),
            TokenKind::Punctuation(ch) => format!("punctuation «{ch}»"),
            TokenKind::Reference(r) => format!("reference «{r}»"),
            TokenKind::Function(name) => format!("function «{name}»"),
            TokenKind::Bool(b) => format!("boolean «{}»", if *b { "TRUE" } else { "FALSE" }),
            TokenKind::SheetMarker => "«#sheet»".to_string(),
            TokenKind::Error(kind) => format!("error «{kind}»"),
            TokenKind::Unknown(ch) => format!("character «{ch}»"),
            TokenKind::Eof => "end of input".to_string(),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.span, self.line, self.column)
    }
}

/// Whether unrecognized input aborts the lex or becomes [`TokenKind::Unknown`].
///
/// The tolerant mode is only for editor tooling; compilation always lexes strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexMode {
    Strict,
    Tolerant,
}

pub(crate) struct Lexer<'a> {
    scanner: Scanner<'a>,
    mode: LexMode,
    tokens: Vec<Token>,
    index: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(scanner: Scanner<'a>, mode: LexMode) -> Self {
        Self {
            scanner,
            mode,
            tokens: Vec::new(),
            index: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.scanner.source()
    }

    /// Returns the next token. `Eof` is sticky: reading it does not move the cursor.
    pub fn next(&mut self) -> Result<Token, ParseError> {
        self.fill(self.index)?;
        let tok = self.tokens[self.index].clone();
        if !tok.is_eof() {
            self.index += 1;
        }
        Ok(tok)
    }

    /// Offers the next `n` tokens (padded with `Eof`) to `rule`.
    ///
    /// If the rule accepts, it returns its result and how many tokens it consumed, and the
    /// cursor moves past them. Otherwise the cursor is restored and nothing is consumed.
    pub fn ahead<T>(
        &mut self,
        n: usize,
        rule: impl FnOnce(&[Token]) -> Option<(T, usize)>,
    ) -> Result<Option<T>, ParseError> {
        let saved = self.index;
        self.fill(saved + n.saturating_sub(1))?;
        match rule(&self.tokens[saved..saved + n]) {
            Some((value, consumed)) => {
                self.index = saved + consumed;
                Ok(Some(value))
            }
            None => {
                self.index = saved;
                Ok(None)
            }
        }
    }

    fn fill(&mut self, upto: usize) -> Result<(), ParseError> {
        while self.tokens.len() <= upto {
            let tok = match self.tokens.last() {
                Some(last) if last.is_eof() => last.clone(),
                _ => self.read_token()?,
            };
            self.tokens.push(tok);
        }
        Ok(())
    }

    fn read_token(&mut self) -> Result<Token, ParseError> {
        self.scanner.read_while(|ch, _| is_whitespace(ch));
        let start = self.scanner.position();
        let Some(ch) = self.scanner.peek() else {
            return Ok(self.finish(TokenKind::Eof, start, false));
        };

        let kind = if ch == '"' {
            let (text, closed) = self.scanner.read_escaped('"');
            if !closed && self.mode == LexMode::Strict {
                return Err(error_at(start, "Unterminated string"));
            }
            TokenKind::String(text)
        } else if ch == '\'' {
            let (name, closed) = self.scanner.read_escaped('\'');
            if !closed && self.mode == LexMode::Strict {
                return Err(error_at(start, "Unterminated quoted name"));
            }
            let space = self.scanner.peek().is_some_and(is_whitespace);
            return Ok(self.finish(TokenKind::Symbol { name, quoted: true }, start, space));
        } else if ch.is_ascii_digit() {
            self.read_number()?
        } else if is_name_start(ch) {
            let name = self.scanner.read_while(|ch, _| is_name_char(ch)).to_string();
            let space = self.scanner.peek().is_some_and(is_whitespace);
            return Ok(self.finish(
                TokenKind::Symbol {
                    name,
                    quoted: false,
                },
                start,
                space,
            ));
        } else if is_operator_char(ch) {
            let text = self.scanner.read_while(|ch, acc| extends_operator(acc, ch));
            match OPERATORS.iter().find(|op| **op == text) {
                Some(op) => TokenKind::Operator(*op),
                None => return Err(error_at(start, format!("Unknown operator: {text}"))),
            }
        } else if PUNCTUATION.contains(ch) {
            self.scanner.next();
            TokenKind::Punctuation(ch)
        } else if let Some(raw) = self.scanner.looking_at(error_literal_re()) {
            self.scanner.skip(raw)?;
            TokenKind::Error(ErrorKind::from_literal(raw).unwrap_or(ErrorKind::Value))
        } else if let Some(raw) = self.sheet_marker() {
            self.scanner.skip(raw)?;
            TokenKind::SheetMarker
        } else if self.mode == LexMode::Strict {
            return Err(self.scanner.croak(format!("Can't handle character: {ch}")));
        } else {
            self.scanner.next();
            TokenKind::Unknown(ch)
        };
        Ok(self.finish(kind, start, false))
    }

    fn read_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.scanner.position();
        let mut has_dot = false;
        let text = self.scanner.read_while(|ch, _| {
            if ch == '.' {
                return !std::mem::replace(&mut has_dot, true);
            }
            ch.is_ascii_digit()
        });
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(TokenKind::Number(n)),
            _ => Err(error_at(start, format!("Invalid number: {text}"))),
        }
    }

    fn sheet_marker(&self) -> Option<&'a str> {
        static SHEET_RE: OnceLock<Regex> = OnceLock::new();
        let re = SHEET_RE.get_or_init(|| Regex::new(r"(?i)^#sheet").expect("valid regex"));
        let raw = self.scanner.looking_at(re)?;
        let after = self.source()[self.scanner.position().offset + raw.len()..]
            .chars()
            .next();
        match after {
            Some(ch) if is_name_char(ch) => None,
            _ => Some(raw),
        }
    }

    fn finish(&self, kind: TokenKind, start: Position, space_after: bool) -> Token {
        Token {
            kind,
            span: Span::new(start.offset, self.scanner.position().offset),
            line: start.line,
            column: start.column,
            space_after,
        }
    }
}

fn error_literal_re() -> &'static Regex {
    static ERROR_RE: OnceLock<Regex> = OnceLock::new();
    ERROR_RE.get_or_init(|| Regex::new(r"(?i)^#(?:n/a|[a-z0-9/]+[?!])").expect("valid regex"))
}

fn error_at(pos: Position, message: impl Into<String>) -> ParseError {
    ParseError::new(
        message,
        Span::new(pos.offset, pos.offset),
        pos.line,
        pos.column,
    )
}

pub(crate) fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{a0}')
}

fn is_operator_char(ch: char) -> bool {
    OPERATORS.iter().any(|op| op.len() == 1 && op.starts_with(ch))
}

/// True if `acc` followed by `ch` is still an operator.
fn extends_operator(acc: &str, ch: char) -> bool {
    OPERATORS
        .iter()
        .any(|op| op.len() == acc.len() + ch.len_utf8() && op.starts_with(acc) && op.ends_with(ch))
}
