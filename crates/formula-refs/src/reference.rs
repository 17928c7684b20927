use core::fmt;

use serde::{Deserialize, Serialize};

use crate::a1;
use crate::{CellRef, RangeRef};

/// A defined name, optionally scoped to a sheet (`Sheet1!Total`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
    #[serde(default)]
    sheet: Option<String>,
    #[serde(default)]
    explicit_sheet: bool,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheet: None,
            explicit_sheet: false,
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

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

    pub fn qualify(&mut self, name: &str) {
        if !self.explicit_sheet {
            self.sheet = Some(name.to_string());
        }
    }
}

impl fmt::Display for NameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if let (true, Some(sheet)) = (self.explicit_sheet, self.sheet.as_deref()) {
            a1::write_sheet_prefix(&mut out, sheet, None);
        }
        a1::write_name(&mut out, &self.name);
        f.write_str(&out)
    }
}

/// An ordered list of references (`A1,B2:C3`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionRef {
    pub refs: Vec<Reference>,
}

impl UnionRef {
    pub fn new(refs: Vec<Reference>) -> Self {
        Self { refs }
    }
}

impl fmt::Display for UnionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.refs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

/// Any reference a formula can hold.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reference {
    Cell(CellRef),
    Range(RangeRef),
    Name(NameRef),
    Union(UnionRef),
}

impl Reference {
    pub fn sheet(&self) -> Option<&str> {
        match self {
            Reference::Cell(c) => c.sheet(),
            Reference::Range(r) => r.sheet(),
            Reference::Name(n) => n.sheet(),
            Reference::Union(u) => u.refs.first().and_then(Reference::sheet),
        }
    }

    /// True if a sheet was written explicitly. A union has one only if all of its parts do.
    pub fn has_sheet(&self) -> bool {
        match self {
            Reference::Cell(c) => c.has_sheet(),
            Reference::Range(r) => r.has_sheet(),
            Reference::Name(n) => n.has_sheet(),
            Reference::Union(u) => u.refs.iter().all(Reference::has_sheet),
        }
    }

    pub fn set_sheet(&mut self, name: &str, explicit: bool) {
        match self {
            Reference::Cell(c) => c.set_sheet(name, explicit),
            Reference::Range(r) => r.set_sheet(name, explicit),
            Reference::Name(n) => n.set_sheet(name, explicit),
            Reference::Union(u) => u.refs.iter_mut().for_each(|r| r.set_sheet(name, explicit)),
        }
    }

    /// Defaults the sheet of every part that has no explicit one.
    pub fn qualify(&mut self, name: &str) {
        match self {
            Reference::Cell(c) => c.qualify(name),
            Reference::Range(r) => r.qualify(name),
            Reference::Name(n) => n.qualify(name),
            Reference::Union(u) => u.refs.iter_mut().for_each(|r| r.qualify(name)),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Reference::Cell(c) => c.is_valid(),
            Reference::Range(r) => r.is_valid(),
            Reference::Name(_) => true,
            Reference::Union(u) => u.refs.iter().all(Reference::is_valid),
        }
    }

    #[must_use]
    pub fn relative_to(&self, row: u32, col: u32) -> Self {
        self.map_cells(&|c| c.relative_to(row, col))
    }

    #[must_use]
    pub fn absolute_from(&self, row: u32, col: u32) -> Self {
        self.map_cells(&|c| c.absolute_from(row, col))
    }

    /// The reference as seen from a formula at `(sheet, row, col)`: offsets become
    /// coordinates and implicit sheets follow `sheet`.
    #[must_use]
    pub fn resolve(&self, sheet: &str, row: u32, col: u32) -> Self {
        let mut out = self.absolute_from(row, col);
        out.qualify(sheet);
        out
    }

    #[must_use]
    pub fn to_absolute(&self) -> Self {
        self.map_cells(&CellRef::to_absolute)
    }

    fn map_cells(&self, f: &dyn Fn(&CellRef) -> CellRef) -> Self {
        match self {
            Reference::Cell(c) => Reference::Cell(f(c)),
            Reference::Range(r) => {
                Reference::Range(RangeRef::new(f(&r.top_left), f(&r.bottom_right)))
            }
            Reference::Name(n) => Reference::Name(n.clone()),
            Reference::Union(u) => {
                Reference::Union(UnionRef::new(u.refs.iter().map(|r| r.map_cells(f)).collect()))
            }
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Cell(c) => c.fmt(f),
            Reference::Range(r) => r.fmt(f),
            Reference::Name(n) => n.fmt(f),
            Reference::Union(u) => u.fmt(f),
        }
    }
}

impl From<CellRef> for Reference {
    fn from(value: CellRef) -> Self {
        Reference::Cell(value)
    }
}

impl From<RangeRef> for Reference {
    fn from(value: RangeRef) -> Self {
        Reference::Range(value)
    }
}

impl From<NameRef> for Reference {
    fn from(value: NameRef) -> Self {
        Reference::Name(value)
    }
}

impl From<UnionRef> for Reference {
    fn from(value: UnionRef) -> Self {
        Reference::Union(value)
    }
}
