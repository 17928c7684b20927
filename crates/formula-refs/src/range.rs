use core::fmt;

use serde::{Deserialize, Serialize};

use crate::a1;
use crate::{Bound, CellRef, Relativity, SheetLimits};

/// A rectangle between two corners.
///
/// A corner may be open on one axis (`A:C` is whole columns, `1:3` whole rows). When the
/// corners carry different explicit sheets the range is 3-D (`Sheet1:Sheet3!A1:B2`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRef {
    pub top_left: CellRef,
    pub bottom_right: CellRef,
}

impl RangeRef {
    pub fn new(top_left: CellRef, bottom_right: CellRef) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Every cell of a sheet (written `#sheet`).
    pub fn whole_sheet() -> Self {
        Self::new(
            CellRef::with_bounds(Bound::Start, Bound::Start, Relativity::ABSOLUTE),
            CellRef::with_bounds(Bound::End, Bound::End, Relativity::ABSOLUTE),
        )
    }

    pub fn is_whole_sheet(&self) -> bool {
        self.top_left.row == Bound::Start
            && self.top_left.col == Bound::Start
            && self.bottom_right.row == Bound::End
            && self.bottom_right.col == Bound::End
    }

    pub fn is_whole_rows(&self) -> bool {
        self.top_left.col == Bound::Start
            && self.bottom_right.col == Bound::End
            && self.top_left.row.is_finite()
            && self.bottom_right.row.is_finite()
    }

    pub fn is_whole_cols(&self) -> bool {
        self.top_left.row == Bound::Start
            && self.bottom_right.row == Bound::End
            && self.top_left.col.is_finite()
            && self.bottom_right.col.is_finite()
    }

    /// True if the corners name two different explicit sheets.
    pub fn is_3d(&self) -> bool {
        self.top_left.has_sheet()
            && self.bottom_right.has_sheet()
            && self.top_left.sheet() != self.bottom_right.sheet()
    }

    pub fn sheet(&self) -> Option<&str> {
        self.top_left.sheet()
    }

    pub fn has_sheet(&self) -> bool {
        self.top_left.has_sheet()
    }

    pub fn set_sheet(&mut self, name: &str, explicit: bool) {
        self.top_left.set_sheet(name, explicit);
        self.bottom_right.set_sheet(name, explicit);
    }

    pub fn qualify(&mut self, name: &str) {
        self.top_left.qualify(name);
        self.bottom_right.qualify(name);
    }

    pub fn is_valid(&self) -> bool {
        self.top_left.is_valid() && self.bottom_right.is_valid()
    }

    #[must_use]
    pub fn relative_to(&self, row: u32, col: u32) -> Self {
        Self::new(
            self.top_left.relative_to(row, col),
            self.bottom_right.relative_to(row, col),
        )
    }

    #[must_use]
    pub fn absolute_from(&self, row: u32, col: u32) -> Self {
        Self::new(
            self.top_left.absolute_from(row, col),
            self.bottom_right.absolute_from(row, col),
        )
    }

    #[must_use]
    pub fn resolve(&self, sheet: &str, row: u32, col: u32) -> Self {
        Self::new(
            self.top_left.resolve(sheet, row, col),
            self.bottom_right.resolve(sheet, row, col),
        )
    }

    #[must_use]
    pub fn to_absolute(&self) -> Self {
        Self::new(self.top_left.to_absolute(), self.bottom_right.to_absolute())
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let tl = &self.top_left;
        let br = &self.bottom_right;

        if let (true, Some(first)) = (tl.has_sheet(), tl.sheet()) {
            let last = if self.is_3d() { br.sheet() } else { None };
            a1::write_sheet_prefix(&mut out, first, last);
        } else if self.is_whole_sheet() {
            return f.write_str("#sheet");
        }

        if self.is_whole_sheet() {
            // `#sheet` cannot carry a sheet prefix; spell out every column instead.
            out.push_str("A:");
            out.push_str(&a1::col_to_name(SheetLimits::EXCEL.max_cols - 1));
        } else if self.is_3d() && tl.same_position(br) {
            tl.write_a1(&mut out);
        } else {
            tl.write_a1(&mut out);
            out.push(':');
            br.write_a1(&mut out);
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(a1: &str) -> CellRef {
        CellRef::from_a1(a1).unwrap()
    }

    #[test]
    fn prints_cells_rows_and_columns() {
        let r = RangeRef::new(cell("A1"), cell("$C$3"));
        assert_eq!(r.to_string(), "A1:$C$3");

        let cols = RangeRef::new(
            CellRef::with_bounds(Bound::Start, Bound::At(0), Relativity::COL),
            CellRef::with_bounds(Bound::End, Bound::At(2), Relativity::ABSOLUTE),
        );
        assert!(cols.is_whole_cols());
        assert_eq!(cols.to_string(), "A:$C");

        let rows = RangeRef::new(
            CellRef::with_bounds(Bound::At(0), Bound::Start, Relativity::ROW),
            CellRef::with_bounds(Bound::At(0), Bound::End, Relativity::ROW),
        );
        assert!(rows.is_whole_rows());
        assert_eq!(rows.to_string(), "1:1");
    }

    #[test]
    fn sheet_prefixes() {
        let mut r = RangeRef::new(cell("A1"), cell("B2"));
        r.set_sheet("Data", true);
        assert_eq!(r.to_string(), "Data!A1:B2");

        let r3d = RangeRef::new(
            cell("A1").with_sheet("Jan", true),
            cell("A1").with_sheet("Dec 2", true),
        );
        assert!(r3d.is_3d());
        assert_eq!(r3d.to_string(), "Jan:'Dec 2'!A1");
    }

    #[test]
    fn whole_sheet() {
        let mut r = RangeRef::whole_sheet();
        r.qualify("Sheet1");
        assert_eq!(r.to_string(), "#sheet");
        r.set_sheet("Sheet1", true);
        assert_eq!(r.to_string(), "Sheet1!A:XFD");
    }

    #[test]
    fn corners_move_independently() {
        let r = RangeRef::new(cell("A1"), cell("$B$2")).relative_to(3, 3);
        assert_eq!(r.absolute_from(4, 3).to_string(), "A2:$B$2");
    }
}
