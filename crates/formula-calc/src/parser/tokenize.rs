//! Best-effort tokenizer for editor tooling (highlighting, reference pickers).

use formula_refs::Reference;

use super::lexer::{LexMode, Lexer, Token, TokenKind};
use super::scanner::Scanner;
use super::try_parse_reference;
use crate::{ErrorKind, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorTokenKind {
    /// The `=` that starts a formula.
    StartExpression,
    Number(f64),
    String(String),
    Symbol(String),
    Function(String),
    Reference(Reference),
    Bool(bool),
    Operator(String),
    Punctuation(char),
    Error(ErrorKind),
    SheetMarker,
    /// A character the formula grammar has no use for.
    Unknown(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorToken {
    pub kind: EditorTokenKind,
    pub span: Span,
}

/// Tokenize `text` without failing.
///
/// Unknown characters become [`EditorTokenKind::Unknown`]. Unterminated strings run to the end
/// of the input. Output stops early only at input the tolerant lexer still cannot read.
pub fn tokenize(text: &str) -> Vec<EditorToken> {
    let mut lexer = Lexer::new(Scanner::new(text), LexMode::Tolerant);
    let mut out = Vec::new();
    loop {
        match next_token(&mut lexer, text) {
            Ok(Some(tok)) => out.push(tok),
            Ok(None) | Err(_) => break,
        }
    }

    if let Some(first) = out.first_mut() {
        if first.kind == EditorTokenKind::Operator("=".to_string()) {
            first.kind = EditorTokenKind::StartExpression;
        }
    }
    out
}

fn next_token(
    lexer: &mut Lexer<'_>,
    text: &str,
) -> Result<Option<EditorToken>, crate::ParseError> {
    if let Some(tok) = lexer.ahead(4, |w| maybe_range(w, text))? {
        return Ok(Some(tok));
    }
    if let Some(tok) = lexer.ahead(2, maybe_call)? {
        return Ok(Some(tok));
    }

    let tok = lexer.next()?;
    let kind = match tok.kind {
        TokenKind::Eof => return Ok(None),
        TokenKind::Symbol { name, quoted } => {
            let source = &text[tok.span.start..tok.span.end];
            if let (false, Some(r)) = (quoted, try_parse_reference(source)) {
                EditorTokenKind::Reference(r)
            } else if !quoted && name.eq_ignore_ascii_case("true") {
                EditorTokenKind::Bool(true)
            } else if !quoted && name.eq_ignore_ascii_case("false") {
                EditorTokenKind::Bool(false)
            } else {
                EditorTokenKind::Symbol(name)
            }
        }
        TokenKind::Number(n) => EditorTokenKind::Number(n),
        TokenKind::String(s) => EditorTokenKind::String(s),
        TokenKind::Operator(op) => EditorTokenKind::Operator(op.to_string()),
        TokenKind::Punctuation(ch) => EditorTokenKind::Punctuation(ch),
        TokenKind::Error(kind) => EditorTokenKind::Error(kind),
        TokenKind::SheetMarker => EditorTokenKind::SheetMarker,
        TokenKind::Unknown(ch) => EditorTokenKind::Unknown(ch),
        TokenKind::Bool(b) => EditorTokenKind::Bool(b),
        TokenKind::Function(name) => EditorTokenKind::Function(name),
        TokenKind::Reference(r) => EditorTokenKind::Reference(r),
    };
    Ok(Some(EditorToken {
        kind,
        span: tok.span,
    }))
}

/// Operands that can start or end a range: symbols and whole-row numbers.
fn range_operand(tok: &Token) -> bool {
    matches!(
        tok.kind,
        TokenKind::Symbol { quoted: false, .. } | TokenKind::Number(_)
    )
}

// X : Y, unless Y is a function name
fn maybe_range(w: &[Token], text: &str) -> Option<(EditorToken, usize)> {
    let [a, b, c, d] = w else {
        return None;
    };
    if !(range_operand(a) && b.is_op(":") && range_operand(c)) {
        return None;
    }
    if d.is_punc('(') && !c.space_after {
        return None;
    }
    let span = a.span.to(c.span);
    let reference = try_parse_reference(&text[span.start..span.end])?;
    Some((
        EditorToken {
            kind: EditorTokenKind::Reference(reference),
            span,
        },
        3,
    ))
}

// NAME(
fn maybe_call(w: &[Token]) -> Option<(EditorToken, usize)> {
    let [a, b] = w else {
        return None;
    };
    let name = a.bare_symbol()?;
    if !b.is_punc('(') || a.space_after {
        return None;
    }
    Some((
        EditorToken {
            kind: EditorTokenKind::Function(name.to_string()),
            span: a.span,
        },
        1,
    ))
}
