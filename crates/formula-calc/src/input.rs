//! Classification of raw cell input into literals and formulas.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::{parse_formula, ParseError, ParsedFormula};

/// `num_days_from_ce` of 1899-12-30, day zero of spreadsheet date serials.
const SERIAL_EPOCH_DAYS: i32 = 693_594;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Raw content typed into or loaded into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl From<&str> for CellInput {
    fn from(value: &str) -> Self {
        CellInput::Text(value.to_string())
    }
}

impl From<String> for CellInput {
    fn from(value: String) -> Self {
        CellInput::Text(value)
    }
}

impl From<f64> for CellInput {
    fn from(value: f64) -> Self {
        CellInput::Number(value)
    }
}

impl From<bool> for CellInput {
    fn from(value: bool) -> Self {
        CellInput::Bool(value)
    }
}

impl From<NaiveDate> for CellInput {
    fn from(value: NaiveDate) -> Self {
        CellInput::Date(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Number(f64),
    Bool(bool),
    /// Already divided by 100.
    Percent(f64),
    /// Days since 1899-12-30.
    Date(f64),
    String(String),
    Formula(ParsedFormula),
}

/// Classify input for cell `(sheet, row, col)`.
///
/// Text starting with `=` and anything after it is parsed as a formula at that cell; parse
/// failures are returned as errors. Other text becomes a number, percentage, boolean or date
/// when it looks like one, and a string otherwise. A leading `'` forces a string.
pub fn parse(
    sheet: &str,
    row: u32,
    col: u32,
    input: impl Into<CellInput>,
) -> Result<CellContent, ParseError> {
    let text = match input.into() {
        CellInput::Date(date) => return Ok(CellContent::Date(date_serial(date))),
        CellInput::Number(n) => return Ok(CellContent::Number(n)),
        CellInput::Bool(b) => return Ok(CellContent::Bool(b)),
        CellInput::Text(text) => text,
    };

    if let Some(rest) = text.strip_prefix('\'') {
        return Ok(CellContent::String(rest.to_string()));
    }

    if percent_re().is_match(&text) {
        if let Ok(n) = text[..text.len() - 1].parse::<f64>() {
            return Ok(CellContent::Percent(n / 100.0));
        }
    }

    if let Some(rest) = text.strip_prefix('=') {
        if rest.trim().is_empty() {
            return Ok(CellContent::String(text));
        }
        return parse_formula(sheet, row, col, &text).map(CellContent::Formula);
    }

    if text.eq_ignore_ascii_case("true") {
        return Ok(CellContent::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(CellContent::Bool(false));
    }

    let trimmed = text.trim();
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    {
        return Ok(CellContent::Date(date_serial(date)));
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(CellContent::Number(n)),
        _ => Ok(CellContent::String(text)),
    }
}

/// Spreadsheet serial number of `date`.
pub fn date_serial(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - SERIAL_EPOCH_DAYS)
}

fn percent_re() -> &'static Regex {
    static PERCENT_RE: OnceLock<Regex> = OnceLock::new();
    PERCENT_RE.get_or_init(|| Regex::new(r"^[0-9.]+%$").expect("valid regex"))
}
