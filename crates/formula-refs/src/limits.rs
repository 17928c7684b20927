use serde::{Deserialize, Serialize};

/// Grid size used to decide which symbols are cell references.
///
/// `XFD1048576` is the last addressable cell of a default workbook; anything beyond it is a
/// name, not a reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetLimits {
    pub max_rows: u32,
    pub max_cols: u32,
}

impl SheetLimits {
    pub const EXCEL: SheetLimits = SheetLimits {
        max_rows: 1_048_576,
        max_cols: 16_384,
    };

    /// Returns true if the 1-based `row` is addressable.
    #[inline]
    pub const fn has_row(&self, row: u32) -> bool {
        row >= 1 && row <= self.max_rows
    }

    /// Returns true if the 0-indexed `col` is addressable.
    #[inline]
    pub const fn has_col(&self, col: u32) -> bool {
        col < self.max_cols
    }
}

impl Default for SheetLimits {
    fn default() -> Self {
        Self::EXCEL
    }
}
