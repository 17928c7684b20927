//! Folds multi-token reference spellings (`Sheet1:Sheet3!A1:C3`, `A:A`, `1:1`, ...) into single
//! reference tokens.
//!
//! Rules are tried longest first. Every rule also checks the token after its match: an open
//! paren directly abutting the last operand means the operand is really a function name, so
//! `A1:CHOOSE(2,A1,A2)` stays a range operator over a call while `A1:C3 (A2,A3)` folds `A1:C3`.

use formula_refs::{
    col_from_name, Bound, CellRef, NameRef, RangeRef, Reference, Relativity, SheetLimits,
};

use super::lexer::{Lexer, Token, TokenKind};
use crate::ParseError;

pub(crate) struct RefStream<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    limits: SheetLimits,
}

impl<'a> RefStream<'a> {
    pub fn new(lexer: Lexer<'a>, limits: SheetLimits) -> Self {
        Self {
            lexer,
            peeked: None,
            limits,
        }
    }

    pub fn source(&self) -> &'a str {
        self.lexer.source()
    }

    pub fn peek(&mut self) -> Result<&Token, ParseError> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.read_next()?,
        };
        Ok(self.peeked.insert(tok))
    }

    pub fn next(&mut self) -> Result<Token, ParseError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.read_next(),
        }
    }

    fn read_next(&mut self) -> Result<Token, ParseError> {
        let limits = self.limits;
        if let Some(tok) = self.lexer.ahead(8, |w| range_3d(w, limits))? {
            return Ok(tok);
        }
        if let Some(tok) = self.lexer.ahead(6, |w| cell_3d(w, limits))? {
            return Ok(tok);
        }
        if let Some(tok) = self.lexer.ahead(6, |w| sheet_range(w, limits))? {
            return Ok(tok);
        }
        if let Some(tok) = self.lexer.ahead(4, |w| sheet_cell(w, limits))? {
            return Ok(tok);
        }
        if let Some(tok) = self.lexer.ahead(4, |w| range(w, limits))? {
            return Ok(tok);
        }
        if let Some(tok) = self.lexer.ahead(2, |w| cell(w, limits))? {
            return Ok(tok);
        }
        if let Some(tok) = self.lexer.ahead(2, funcall)? {
            return Ok(tok);
        }

        let mut tok = self.lexer.next()?;
        if let Some(name) = tok.bare_symbol() {
            if name.eq_ignore_ascii_case("true") {
                tok.kind = TokenKind::Bool(true);
            } else if name.eq_ignore_ascii_case("false") {
                tok.kind = TokenKind::Bool(false);
            }
        }
        Ok(tok)
    }
}

/// One side of a range before the corners are paired up.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Cell(CellRef),
    Row { row: i32, absolute: bool },
    Col { col: i32, absolute: bool },
}

fn operand(tok: &Token, limits: SheetLimits) -> Option<Operand> {
    match &tok.kind {
        TokenKind::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(limits.max_rows) => {
            Some(Operand::Row {
                row: *n as i32 - 1,
                absolute: false,
            })
        }
        TokenKind::Symbol {
            name,
            quoted: false,
        } => symbol_operand(name, limits),
        _ => None,
    }
}

fn symbol_operand(name: &str, limits: SheetLimits) -> Option<Operand> {
    if let Ok(cell) = CellRef::from_a1_with_limits(name, limits) {
        return Some(Operand::Cell(cell));
    }
    let (absolute, rest) = match name.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        let row: u32 = rest.parse().ok()?;
        return limits.has_row(row).then(|| Operand::Row {
            row: row as i32 - 1,
            absolute,
        });
    }
    let col = col_from_name(rest).ok()?;
    limits.has_col(col).then(|| Operand::Col {
        col: col as i32,
        absolute,
    })
}

/// Pairs two operands of the same shape into range corners.
fn corners(a: &Token, b: &Token, limits: SheetLimits) -> Option<(CellRef, CellRef)> {
    let rel = |absolute: bool, axis: Relativity| {
        if absolute {
            Relativity::ABSOLUTE
        } else {
            axis
        }
    };
    match (operand(a, limits)?, operand(b, limits)?) {
        (Operand::Cell(tl), Operand::Cell(br)) => Some((tl, br)),
        (
            Operand::Row { row: r1, absolute: a1 },
            Operand::Row { row: r2, absolute: a2 },
        ) => Some((
            CellRef::with_bounds(Bound::At(r1), Bound::Start, rel(a1, Relativity::ROW)),
            CellRef::with_bounds(Bound::At(r2), Bound::End, rel(a2, Relativity::ROW)),
        )),
        (
            Operand::Col { col: c1, absolute: a1 },
            Operand::Col { col: c2, absolute: a2 },
        ) => Some((
            CellRef::with_bounds(Bound::Start, Bound::At(c1), rel(a1, Relativity::COL)),
            CellRef::with_bounds(Bound::End, Bound::At(c2), rel(a2, Relativity::COL)),
        )),
        _ => None,
    }
}

fn single_cell(tok: &Token, limits: SheetLimits) -> Option<CellRef> {
    match operand(tok, limits)? {
        Operand::Cell(cell) => Some(cell),
        _ => None,
    }
}

fn sheet_name(tok: &Token) -> Option<&str> {
    match &tok.kind {
        TokenKind::Symbol { name, .. } => Some(name),
        _ => None,
    }
}

/// False when `follow` is an open paren glued to `last`, i.e. `last` is a function name.
fn not_called(last: &Token, follow: &Token) -> bool {
    !(follow.is_punc('(') && !last.space_after)
}

fn folded(window: &[Token], consumed: usize, reference: Reference) -> (Token, usize) {
    let first = &window[0];
    let last = &window[consumed - 1];
    let tok = Token {
        kind: TokenKind::Reference(reference),
        span: first.span.to(last.span),
        line: first.line,
        column: first.column,
        space_after: last.space_after,
    };
    (tok, consumed)
}

// Sheet1 : Sheet2 ! A1 : C3 (not followed by a glued paren)
fn range_3d(w: &[Token], limits: SheetLimits) -> Option<(Token, usize)> {
    let [a, b, c, d, e, f, g, h] = w else {
        return None;
    };
    if !(b.is_op(":") && d.is_op("!") && f.is_op(":") && not_called(g, h)) {
        return None;
    }
    let (first, last) = (sheet_name(a)?, sheet_name(c)?);
    let (tl, br) = corners(e, g, limits)?;
    let range = RangeRef::new(tl.with_sheet(first, true), br.with_sheet(last, true));
    Some(folded(w, 7, range.into()))
}

// Sheet1 : Sheet2 ! A1
fn cell_3d(w: &[Token], limits: SheetLimits) -> Option<(Token, usize)> {
    let [a, b, c, d, e, f] = w else {
        return None;
    };
    if !(b.is_op(":") && d.is_op("!") && not_called(e, f)) {
        return None;
    }
    let (first, last) = (sheet_name(a)?, sheet_name(c)?);
    let cell = single_cell(e, limits)?;
    let range = RangeRef::new(
        cell.clone().with_sheet(first, true),
        cell.with_sheet(last, true),
    );
    Some(folded(w, 5, range.into()))
}

// Sheet1 ! A1 : C3
fn sheet_range(w: &[Token], limits: SheetLimits) -> Option<(Token, usize)> {
    let [a, b, c, d, e, f] = w else {
        return None;
    };
    if !(b.is_op("!") && d.is_op(":") && not_called(e, f)) {
        return None;
    }
    let sheet = sheet_name(a)?;
    let (tl, br) = corners(c, e, limits)?;
    let mut range = RangeRef::new(tl, br);
    range.set_sheet(sheet, true);
    Some(folded(w, 5, range.into()))
}

// Sheet1 ! A1, or Sheet1 ! Name
fn sheet_cell(w: &[Token], limits: SheetLimits) -> Option<(Token, usize)> {
    let [a, b, c, d] = w else {
        return None;
    };
    if !(b.is_op("!") && not_called(c, d)) {
        return None;
    }
    let sheet = sheet_name(a)?;
    let reference: Reference = match single_cell(c, limits) {
        Some(cell) => cell.with_sheet(sheet, true).into(),
        None => NameRef::new(sheet_name(c)?).with_sheet(sheet, true).into(),
    };
    Some(folded(w, 3, reference))
}

// A1 : C3, A:C, 1:3
fn range(w: &[Token], limits: SheetLimits) -> Option<(Token, usize)> {
    let [a, b, c, d] = w else {
        return None;
    };
    if !(b.is_op(":") && not_called(c, d)) {
        return None;
    }
    let (tl, br) = corners(a, c, limits)?;
    Some(folded(w, 3, RangeRef::new(tl, br).into()))
}

// A1
fn cell(w: &[Token], limits: SheetLimits) -> Option<(Token, usize)> {
    let [a, b] = w else {
        return None;
    };
    a.bare_symbol()?;
    if !not_called(a, b) {
        return None;
    }
    let cell = single_cell(a, limits)?;
    Some(folded(w, 1, cell.into()))
}

// NAME(
fn funcall(w: &[Token]) -> Option<(Token, usize)> {
    let [a, b] = w else {
        return None;
    };
    let name = a.bare_symbol()?;
    if !(b.is_punc('(') && !a.space_after) {
        return None;
    }
    let mut tok = a.clone();
    tok.kind = TokenKind::Function(name.to_string());
    Some((tok, 1))
}
