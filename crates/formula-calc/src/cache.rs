use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::codegen::generate;
use crate::cps::Transformer;
use crate::eval::Body;
use crate::printer::Printer;
use crate::{Formula, ParsedFormula};

/// Code and printer shared by every formula with one signature.
#[derive(Clone)]
struct CompiledShape {
    code: Body,
    printer: Printer,
}

/// Compiled formula shapes keyed by signature.
///
/// The signature prints references as positional placeholders, so a formula filled across a
/// range compiles once and every other cell gets a clone with its own reference table.
/// Entries are never evicted; [`FormulaCache::clear`] drops them all.
///
/// Concurrent compiles of a new shape may both transform it; the first insert wins.
#[derive(Default)]
pub struct FormulaCache {
    entries: DashMap<Arc<str>, CompiledShape, ahash::RandomState>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by [`compile`].
    pub fn global() -> &'static FormulaCache {
        static GLOBAL: OnceLock<FormulaCache> = OnceLock::new();
        GLOBAL.get_or_init(FormulaCache::new)
    }

    /// Number of distinct shapes compiled.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn compile(&self, parsed: &ParsedFormula) -> Formula {
        let printer = Printer::new(&parsed.expr);
        let signature: Arc<str> = printer.signature().into();

        let cached = self.entries.get(&*signature).map(|entry| entry.clone());
        let shape = match cached {
            Some(shape) => {
                log::trace!("formula cache hit: {signature}");
                shape
            }
            None => {
                log::debug!(
                    "compiling formula shape {signature} ({} references)",
                    parsed.refs.len()
                );
                self.entries
                    .entry(signature.clone())
                    .or_insert_with(|| {
                        let mut transformer = Transformer::new();
                        let term = transformer.transform(&parsed.expr);
                        log::trace!(
                            "cps form of {signature} uses {} variables",
                            transformer.var_count()
                        );
                        CompiledShape {
                            code: generate(&term),
                            printer,
                        }
                    })
                    .clone()
            }
        };

        Formula::new(
            parsed.refs.clone(),
            shape.code,
            shape.printer,
            signature,
            &parsed.sheet,
            parsed.row,
            parsed.col,
        )
    }
}

/// Compile with the process-wide [`FormulaCache`].
pub fn compile(parsed: &ParsedFormula) -> Formula {
    FormulaCache::global().compile(parsed)
}
