use serde::{Deserialize, Serialize};

/// One coordinate of a cell reference.
///
/// Whole-row and whole-column references have no value on one axis; the corners of such a
/// range sit at [`Bound::Start`] and [`Bound::End`] of that axis instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bound {
    Start,
    At(i32),
    End,
}

impl Bound {
    #[inline]
    pub const fn index(self) -> Option<i32> {
        match self {
            Bound::At(v) => Some(v),
            Bound::Start | Bound::End => None,
        }
    }

    #[inline]
    pub const fn is_finite(self) -> bool {
        matches!(self, Bound::At(_))
    }

    /// Moves a finite bound by `delta`. Open bounds stay where they are.
    #[inline]
    #[must_use]
    pub const fn shift(self, delta: i32) -> Self {
        match self {
            Bound::At(v) => Bound::At(v.saturating_add(delta)),
            other => other,
        }
    }
}

/// Per-axis relativity bitmask.
///
/// Bit `1` marks the column relative, bit `2` the row. A relative axis moves when the formula
/// is copied; an absolute one (written with `$`) does not.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relativity(u8);

impl Relativity {
    pub const ABSOLUTE: Relativity = Relativity(0);
    pub const COL: Relativity = Relativity(1);
    pub const ROW: Relativity = Relativity(2);
    pub const RELATIVE: Relativity = Relativity(3);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Relativity(bits & 3)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn col(self) -> bool {
        self.0 & 1 != 0
    }

    #[inline]
    pub const fn row(self) -> bool {
        self.0 & 2 != 0
    }

    /// Builds the mask from the `$` markers of an A1 reference.
    #[inline]
    pub const fn from_markers(col_absolute: bool, row_absolute: bool) -> Self {
        let col = if col_absolute { 0 } else { 1 };
        let row = if row_absolute { 0 } else { 2 };
        Relativity(col | row)
    }
}
