use core::fmt;

use serde::{Deserialize, Serialize};

use crate::a1::{self, A1ParseError};
use crate::{coord, Bound, Relativity, SheetLimits};

/// A reference to a single cell, or to one corner of a [`crate::RangeRef`].
///
/// `row`/`col` hold either absolute 0-indexed coordinates or, for axes flagged in `rel`,
/// offsets from a home cell (see [`CellRef::relative_to`]).
///
/// The sheet is *explicit* when it was written in the formula (`Sheet2!A1`) and implicit when
/// it was filled in from the formula's home sheet. Only explicit sheets are printed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: Bound,
    pub col: Bound,
    pub rel: Relativity,
    #[serde(default)]
    sheet: Option<String>,
    #[serde(default)]
    explicit_sheet: bool,
}

impl CellRef {
    /// A cell at absolute 0-indexed `(row, col)`.
    pub fn new(row: i32, col: i32, rel: Relativity) -> Self {
        Self::with_bounds(Bound::At(row), Bound::At(col), rel)
    }

    pub fn with_bounds(row: Bound, col: Bound, rel: Relativity) -> Self {
        Self {
            row,
            col,
            rel,
            sheet: None,
            explicit_sheet: false,
        }
    }

    /// Parse an A1-style reference (e.g. `A1`, `$B$2`); `$` markers set the relativity.
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        Self::from_a1_with_limits(a1.trim(), SheetLimits::EXCEL)
    }

    pub fn from_a1_with_limits(a1: &str, limits: SheetLimits) -> Result<Self, A1ParseError> {
        let (row, col, rel) = a1::parse_cell(a1, limits)?;
        Ok(Self::new(coord(row), coord(col), rel))
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// True if the sheet was written explicitly.
    pub fn has_sheet(&self) -> bool {
        self.explicit_sheet
    }

    pub fn set_sheet(&mut self, name: impl Into<String>, explicit: bool) {
        self.sheet = Some(name.into());
        self.explicit_sheet = explicit;
    }

    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, explicit: bool) -> Self {
        self.set_sheet(name, explicit);
        self
    }

    /// Defaults the sheet to `name` unless one was written explicitly.
    pub fn qualify(&mut self, name: &str) {
        if !self.explicit_sheet {
            self.sheet = Some(name.to_string());
        }
    }

    pub fn is_finite(&self) -> bool {
        self.row.is_finite() && self.col.is_finite()
    }

    /// False once a coordinate has moved before row 1 or column A.
    pub fn is_valid(&self) -> bool {
        self.row.index().map_or(true, |v| v >= 0) && self.col.index().map_or(true, |v| v >= 0)
    }

    /// Stores relative axes as offsets from the home cell `(row, col)`.
    #[must_use]
    pub fn relative_to(&self, row: u32, col: u32) -> Self {
        self.offset_by(-coord(row), -coord(col))
    }

    /// Inverse of [`CellRef::relative_to`]: turns offsets back into coordinates.
    #[must_use]
    pub fn absolute_from(&self, row: u32, col: u32) -> Self {
        self.offset_by(coord(row), coord(col))
    }

    /// Coordinates as seen from the home cell `(sheet, row, col)`. An implicit sheet follows
    /// the home sheet.
    #[must_use]
    pub fn resolve(&self, sheet: &str, row: u32, col: u32) -> Self {
        let mut out = self.absolute_from(row, col);
        out.qualify(sheet);
        out
    }

    /// Same coordinates with both axes marked absolute.
    #[must_use]
    pub fn to_absolute(&self) -> Self {
        Self {
            rel: Relativity::ABSOLUTE,
            ..self.clone()
        }
    }

    fn offset_by(&self, rows: i32, cols: i32) -> Self {
        let mut out = self.clone();
        if self.rel.col() {
            out.col = self.col.shift(cols);
        }
        if self.rel.row() {
            out.row = self.row.shift(rows);
        }
        out
    }

    /// Writes the A1 form without any sheet prefix.
    pub(crate) fn write_a1(&self, out: &mut String) {
        if !self.is_valid() {
            out.push_str("#REF!");
            return;
        }
        if let Bound::At(col) = self.col {
            if !self.rel.col() {
                out.push('$');
            }
            out.push_str(&a1::col_to_name(col.unsigned_abs()));
        }
        if let Bound::At(row) = self.row {
            if !self.rel.row() {
                out.push('$');
            }
            out.push_str(&(i64::from(row) + 1).to_string());
        }
    }

    pub(crate) fn same_position(&self, other: &CellRef) -> bool {
        self.row == other.row && self.col == other.col && self.rel == other.rel
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if let (true, Some(sheet)) = (self.explicit_sheet, self.sheet.as_deref()) {
            a1::write_sheet_prefix(&mut out, sheet, None);
        }
        self.write_a1(&mut out);
        f.write_str(&out)
    }
}
