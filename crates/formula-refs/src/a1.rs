use crate::{Relativity, SheetLimits};

/// Errors that can occur when parsing an A1 cell reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum A1ParseError {
    #[error("empty A1 reference")]
    Empty,
    #[error("missing column in A1 reference")]
    MissingColumn,
    #[error("missing row in A1 reference")]
    MissingRow,
    #[error("invalid column in A1 reference")]
    InvalidColumn,
    #[error("invalid row in A1 reference")]
    InvalidRow,
    #[error("trailing characters in A1 reference")]
    TrailingCharacters,
}

/// Column letters for a 0-indexed column (`0` -> `A`, `27` -> `AB`).
pub fn col_to_name(col: u32) -> String {
    // A1 columns are bijective base-26.
    let mut n = u64::from(col) + 1;
    let mut out = Vec::<char>::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// 0-indexed column for column letters (case-insensitive).
pub fn col_from_name(s: &str) -> Result<u32, A1ParseError> {
    let mut col: u32 = 0;
    for b in s.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(A1ParseError::InvalidColumn);
        }
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    if col == 0 {
        return Err(A1ParseError::MissingColumn);
    }
    Ok(col - 1)
}

/// Parses `A1`, `$A1`, `A$1` or `$A$1` into 0-indexed `(row, col)` plus relativity.
pub(crate) fn parse_cell(
    a1: &str,
    limits: SheetLimits,
) -> Result<(u32, u32, Relativity), A1ParseError> {
    if a1.is_empty() {
        return Err(A1ParseError::Empty);
    }

    let bytes = a1.as_bytes();
    let mut idx = 0usize;
    let col_absolute = bytes.first() == Some(&b'$');
    if col_absolute {
        idx += 1;
    }

    let col_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        idx += 1;
    }
    if idx == col_start {
        return Err(A1ParseError::MissingColumn);
    }
    let col_str = &a1[col_start..idx];

    let row_absolute = bytes.get(idx) == Some(&b'$');
    if row_absolute {
        idx += 1;
    }

    let row_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == row_start {
        return Err(A1ParseError::MissingRow);
    }
    if idx != bytes.len() {
        return Err(A1ParseError::TrailingCharacters);
    }

    let col = col_from_name(col_str)?;
    if !limits.has_col(col) {
        return Err(A1ParseError::InvalidColumn);
    }
    let row_1_based: u32 = a1[row_start..idx]
        .parse()
        .map_err(|_| A1ParseError::InvalidRow)?;
    if !limits.has_row(row_1_based) {
        return Err(A1ParseError::InvalidRow);
    }

    Ok((
        row_1_based - 1,
        col,
        Relativity::from_markers(col_absolute, row_absolute),
    ))
}

/// Characters that may start an unquoted sheet name, defined name or function name.
pub fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '$' || ch == '_' || ch.is_lowercase() || ch.is_uppercase()
}

pub fn is_name_char(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit() || ch == '.'
}

/// Returns true if `name` must be written in single quotes to survive re-parsing.
///
/// That is the case for anything that is not a plain identifier, and for identifiers the
/// formula lexer would read as something else (a cell like `A1`, or a boolean).
pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => is_name_start(first) && chars.all(is_name_char),
        None => false,
    };
    !plain
        || parse_cell(name, SheetLimits::EXCEL).is_ok()
        || name.eq_ignore_ascii_case("true")
        || name.eq_ignore_ascii_case("false")
}

/// Writes `name`, quoted and backslash-escaped when [`needs_quoting`] says so.
pub(crate) fn write_name(out: &mut String, name: &str) {
    if !needs_quoting(name) {
        out.push_str(name);
        return;
    }
    out.push('\'');
    for ch in name.chars() {
        if ch == '\'' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
}

/// Writes `Sheet!` or `First:Last!`.
pub(crate) fn write_sheet_prefix(out: &mut String, first: &str, last: Option<&str>) {
    write_name(out, first);
    if let Some(last) = last {
        out.push(':');
        write_name(out, last);
    }
    out.push('!');
}
