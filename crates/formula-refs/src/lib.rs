#![forbid(unsafe_code)]

//! Reference model for spreadsheet formulas.
//!
//! A formula refers to other cells through one of four reference shapes:
//! - [`CellRef`]: a single cell, or one corner of a range,
//! - [`RangeRef`]: a rectangle between two corners (possibly spanning sheets),
//! - [`NameRef`]: a defined name,
//! - [`UnionRef`]: an ordered list of references.
//!
//! Coordinates are **0-indexed** and may be stored either absolutely or as offsets from a home
//! cell, depending on the per-axis [`Relativity`] bits. The compiler stores relative axes as
//! offsets so identically-shaped formulas at different cells carry identical references.

mod a1;
mod bound;
mod cell;
mod limits;
mod range;
mod reference;

pub use a1::{col_from_name, col_to_name, is_name_char, is_name_start, needs_quoting, A1ParseError};
pub use bound::{Bound, Relativity};
pub use cell::CellRef;
pub use limits::SheetLimits;
pub use range::RangeRef;
pub use reference::{NameRef, Reference, UnionRef};

/// Converts a 0-indexed home coordinate into the signed space references are stored in.
#[inline]
pub(crate) fn coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
