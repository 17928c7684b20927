//! Character cursor over formula text.

use regex::Regex;

use crate::{ParseError, Span};

/// Cursor location. `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

pub(crate) struct Scanner<'a> {
    src: &'a str,
    pos: Position,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::starting_at(src, 0)
    }

    /// Starts scanning at byte `offset` (e.g. after a leading `=`). Spans and line/column
    /// numbers still refer to the whole of `src`.
    pub fn starting_at(src: &'a str, offset: usize) -> Self {
        let mut scanner = Self {
            src,
            pos: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
        };
        while scanner.pos.offset < offset && scanner.next().is_some() {}
        scanner
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos.offset..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.offset += ch.len_utf8();
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(ch)
    }

    /// Consumes characters while `pred(next_char, consumed_so_far)` holds.
    pub fn read_while(&mut self, mut pred: impl FnMut(char, &str) -> bool) -> &'a str {
        let start = self.pos.offset;
        while let Some(ch) = self.peek() {
            if !pred(ch, &self.src[start..self.pos.offset]) {
                break;
            }
            self.next();
        }
        &self.src[start..self.pos.offset]
    }

    /// Reads a delimited literal starting at the opening delimiter, up to the first unescaped
    /// `end` (consumed). A backslash escapes the following character.
    ///
    /// Returns the unescaped text and whether the terminator was found.
    pub fn read_escaped(&mut self, end: char) -> (String, bool) {
        self.next();
        let mut out = String::new();
        let mut escaped = false;
        while let Some(ch) = self.next() {
            if escaped {
                out.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == end {
                return (out, true);
            } else {
                out.push(ch);
            }
        }
        (out, false)
    }

    /// Matches `re` at the cursor without consuming anything.
    pub fn looking_at(&self, re: &Regex) -> Option<&'a str> {
        let rest = self.rest();
        re.find(rest)
            .filter(|m| m.start() == 0)
            .map(|m| &rest[..m.end()])
    }

    /// Consumes `expected` or fails at the cursor.
    pub fn skip(&mut self, expected: &str) -> Result<(), ParseError> {
        if !self.rest().starts_with(expected) {
            return Err(self.croak(format!("Expected {expected}")));
        }
        for _ in expected.chars() {
            self.next();
        }
        Ok(())
    }

    pub fn croak(&self, message: impl Into<String>) -> ParseError {
        let end = self.pos.offset + self.peek().map_or(0, char::len_utf8);
        ParseError::new(
            message,
            Span::new(self.pos.offset, end),
            self.pos.line,
            self.pos.column,
        )
    }
}
