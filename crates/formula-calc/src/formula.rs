use std::fmt;
use std::sync::Arc;

use formula_refs::Reference;

use crate::eval::{Body, Host, Scope};
use crate::printer::Printer;

/// A compiled formula placed at a home cell.
///
/// The executable code and the printer depend only on the expression shape and are shared by
/// every formula with the same [signature](Formula::signature). The reference table and the
/// home cell belong to this formula alone.
#[derive(Clone)]
pub struct Formula {
    refs: Arc<[Reference]>,
    absolute: Arc<[Reference]>,
    code: Body,
    printer: Printer,
    signature: Arc<str>,
    sheet: Arc<str>,
    row: u32,
    col: u32,
}

impl Formula {
    pub(crate) fn new(
        refs: Vec<Reference>,
        code: Body,
        printer: Printer,
        signature: Arc<str>,
        sheet: &str,
        row: u32,
        col: u32,
    ) -> Self {
        let refs: Arc<[Reference]> = refs.into();
        let absolute = resolve_all(&refs, sheet, row, col);
        Self {
            refs,
            absolute,
            code,
            printer,
            signature,
            sheet: Arc::from(sheet),
            row,
            col,
        }
    }

    /// Run the formula. The result arrives at [`Host::resolve`], possibly after the host has
    /// resumed suspended continuations.
    pub fn evaluate(&self, host: &mut dyn Host) {
        (self.code)(Scope::new(self.absolute.clone()), host)
    }

    /// Reference table with relative axes stored as offsets from the home cell.
    pub fn refs(&self) -> &[Reference] {
        &self.refs
    }

    /// Reference table as seen from the home cell.
    pub fn absolute_refs(&self) -> &[Reference] {
        &self.absolute
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Location-independent shape of the expression; the cache key.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Formula text (without `=`) at the home cell.
    pub fn to_formula_string(&self) -> String {
        self.print_at(self.row, self.col)
    }

    /// Formula text as if this formula were filled to `(row, col)`.
    pub fn print_at(&self, row: u32, col: u32) -> String {
        self.printer.print_at(&self.refs, row, col)
    }

    /// The same formula filled to another cell. Code and printer are shared.
    #[must_use]
    pub fn clone_at(&self, sheet: &str, row: u32, col: u32) -> Self {
        Self {
            refs: self.refs.clone(),
            absolute: resolve_all(&self.refs, sheet, row, col),
            code: self.code.clone(),
            printer: self.printer.clone(),
            signature: self.signature.clone(),
            sheet: Arc::from(sheet),
            row,
            col,
        }
    }

    /// True if both formulas run the same compiled code.
    pub fn shares_code_with(&self, other: &Formula) -> bool {
        Arc::ptr_eq(&self.code, &other.code) && self.printer.ptr_eq(&other.printer)
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("signature", &self.signature)
            .field("refs", &self.refs)
            .field("sheet", &self.sheet)
            .field("row", &self.row)
            .field("col", &self.col)
            .finish_non_exhaustive()
    }
}

fn resolve_all(refs: &[Reference], sheet: &str, row: u32, col: u32) -> Arc<[Reference]> {
    refs.iter().map(|r| r.resolve(sheet, row, col)).collect()
}
