#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Spreadsheet formula parsing and compilation.
//!
//! [`parse_formula`] turns formula text written at a home cell into a [`ParsedFormula`]: an
//! expression tree whose references point into a table of [`Reference`]s stored relative to
//! that cell. [`compile`] (or an explicit [`FormulaCache`]) turns it into a [`Formula`], whose
//! code is shared by every formula with the same shape, so a formula filled down a column
//! compiles once.
//!
//! ## Evaluation
//!
//! Compiled formulas run in continuation-passing style against a host implementing [`Host`].
//! Every operator and function call goes through [`Host::invoke`] together with a
//! [`Continuation`]; the host may resume it immediately or store it and resume it later, for
//! example once a dependency has been calculated. `IF`, `AND` and `OR` short-circuit through
//! [`Host::branch`], so an arm that is not selected is never evaluated.
//!
//! Operators are invoked under the names `binary+`, `binary:`, `binary ` (intersection),
//! `binary,` (union), `unary-`, `unary%` and so on.
//!
//! ## Editing
//!
//! [`ParsedFormula::to_formula_string`] and [`Formula::print_at`] print formulas back to text
//! with the parentheses the grouping requires. [`tokenize`] is a tolerant tokenizer for
//! editor tooling and [`parse`] classifies raw cell input.

mod ast;
mod cache;
mod codegen;
mod cps;
mod error;
mod eval;
mod formula;
mod input;
mod parser;
mod printer;
mod value;

pub use ast::{
    BinaryExpr, BinaryOp, Expr, FunctionCall, ParsedFormula, PostfixExpr, PostfixOp, PrefixExpr,
    PrefixOp,
};
pub use cache::{compile, FormulaCache};
pub use error::{ParseError, Span};
pub use eval::{AsDynHost, Continuation, Host, Thunk};
pub use formula::Formula;
pub use input::{date_serial, parse, CellContent, CellInput};
pub use parser::tokenize::{tokenize, EditorToken, EditorTokenKind};
pub use parser::{
    parse_formula, parse_formula_with, parse_reference, try_parse_reference, ParseOptions,
    EXCEL_MAX_ARGS,
};
pub use value::{ErrorKind, Value};

pub use formula_refs;
pub use formula_refs::{CellRef, NameRef, RangeRef, Reference, SheetLimits, UnionRef};
