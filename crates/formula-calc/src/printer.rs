//! Formula text rendering.
//!
//! A [`Printer`] is built once per expression shape as a tree of closures. Reference nodes
//! print through a [`RefSource`], so the same printer renders the location-independent
//! signature (`#0+#1`) and the display text at any home cell.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use formula_refs::Reference;

use crate::ast::{POSTFIX_RANK, PREFIX_RANK};
use crate::{BinaryOp, Expr};

/// Supplies the text for reference slot `index`.
pub(crate) trait RefSource {
    fn write_ref(&self, index: usize, out: &mut String);
}

/// Placeholder text for every slot; the signature is the cache key.
struct Signature;

impl RefSource for Signature {
    fn write_ref(&self, index: usize, out: &mut String) {
        let _ = write!(out, "#{index}");
    }
}

/// A relative reference table placed at a home cell.
struct Placed<'r> {
    refs: &'r [Reference],
    row: u32,
    col: u32,
}

impl RefSource for Placed<'_> {
    fn write_ref(&self, index: usize, out: &mut String) {
        match self.refs.get(index) {
            Some(r) => {
                let _ = write!(out, "{}", r.absolute_from(self.row, self.col));
            }
            None => out.push_str("#REF!"),
        }
    }
}

type Emit = Arc<dyn Fn(&dyn RefSource, &mut String) + Send + Sync>;

#[derive(Clone)]
pub struct Printer {
    emit: Emit,
}

impl Printer {
    pub fn new(expr: &Expr) -> Self {
        Self {
            emit: child(expr, 0, true),
        }
    }

    /// Formula text (without `=`) for a reference table stored relative to `(row, col)`.
    pub fn print_at(&self, refs: &[Reference], row: u32, col: u32) -> String {
        self.render(&Placed { refs, row, col })
    }

    /// Location-independent text of the expression shape.
    pub fn signature(&self) -> String {
        self.render(&Signature)
    }

    pub fn ptr_eq(&self, other: &Printer) -> bool {
        Arc::ptr_eq(&self.emit, &other.emit)
    }

    fn render(&self, src: &dyn RefSource) -> String {
        let mut out = String::new();
        (self.emit)(src, &mut out);
        out
    }
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer").finish_non_exhaustive()
    }
}

/// Emitter for `expr` printed in a slot that needs parentheses below rank `threshold`.
///
/// `commas` is false inside function arguments and array cells, where a bare `,` would be read
/// as a separator.
fn child(expr: &Expr, threshold: u8, commas: bool) -> Emit {
    let union = matches!(expr, Expr::Binary(b) if b.op == BinaryOp::Union);
    if expr.rank() < threshold || (union && !commas) {
        parens(build(expr, true))
    } else {
        build(expr, commas)
    }
}

fn emit(f: impl Fn(&dyn RefSource, &mut String) + Send + Sync + 'static) -> Emit {
    Arc::new(f)
}

fn parens(inner: Emit) -> Emit {
    emit(move |src, out| {
        out.push('(');
        inner(src, out);
        out.push(')');
    })
}

fn build(expr: &Expr, commas: bool) -> Emit {
    match expr {
        Expr::Number(n) => {
            let text = n.to_string();
            emit(move |_, out| out.push_str(&text))
        }
        Expr::String(s) => {
            let text = quote(s);
            emit(move |_, out| out.push_str(&text))
        }
        Expr::Bool(b) => {
            let text = if *b { "TRUE" } else { "FALSE" };
            emit(move |_, out| out.push_str(text))
        }
        Expr::Error(kind) => {
            let text = kind.as_str();
            emit(move |_, out| out.push_str(text))
        }
        Expr::Null => emit(|_, _| {}),
        Expr::Ref(index) => {
            let index = *index;
            emit(move |src, out| src.write_ref(index, out))
        }
        Expr::Prefix(p) => {
            let op = p.op.as_str();
            let operand = child(&p.expr, PREFIX_RANK, commas);
            emit(move |src, out| {
                out.push_str(op);
                operand(src, out);
            })
        }
        Expr::Postfix(p) => {
            let op = p.op.as_str();
            let operand = child(&p.expr, POSTFIX_RANK, commas);
            emit(move |src, out| {
                operand(src, out);
                out.push_str(op);
            })
        }
        Expr::Binary(b) => {
            let prec = b.op.precedence();
            let op = b.op.as_str();

            let left = child(&b.left, prec, commas);
            let right = if guard_right(b.op, &b.right) {
                parens(build(&b.right, true))
            } else {
                child(&b.right, prec + 1, commas)
            };
            emit(move |src, out| {
                left(src, out);
                out.push_str(op);
                right(src, out);
            })
        }
        Expr::Call(call) => {
            let name = call.name.clone();
            let args: Vec<Emit> = call.args.iter().map(|arg| child(arg, 0, false)).collect();
            emit(move |src, out| {
                out.push_str(&name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg(src, out);
                }
                out.push(')');
            })
        }
        Expr::Array(rows) => {
            let rows: Vec<Vec<Emit>> = rows
                .iter()
                .map(|row| row.iter().map(|cell| child(cell, 0, false)).collect())
                .collect();
            emit(move |src, out| {
                out.push_str("{ ");
                for (r, row) in rows.iter().enumerate() {
                    if r > 0 {
                        out.push_str("; ");
                    }
                    for (c, cell) in row.iter().enumerate() {
                        if c > 0 {
                            out.push_str(", ");
                        }
                        cell(src, out);
                    }
                }
                out.push_str(" }");
            })
        }
    }
}

/// True if the text of `expr` starts with an operand the reference recognizer could fold into
/// the token before it (a reference or a bare number).
fn starts_foldable(expr: &Expr) -> bool {
    match expr {
        Expr::Ref(_) | Expr::Number(_) => true,
        Expr::Postfix(p) => starts_foldable(&p.expr),
        Expr::Binary(b) => starts_foldable(&b.left),
        _ => false,
    }
}

/// True if the text of `expr` starts with a number or a function call. Other operands only
/// continue an intersection when parenthesized: a name or a literal after a space is trailing
/// input, and the printer cannot tell a name reference from a cell reference.
fn starts_intersectable(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) | Expr::Call(_) => true,
        Expr::Postfix(p) => starts_intersectable(&p.expr),
        Expr::Binary(b) => starts_intersectable(&b.left),
        _ => false,
    }
}

/// Right operands that would lex differently when printed bare.
fn guard_right(op: BinaryOp, right: &Expr) -> bool {
    match op {
        // `A1:(B1)` is not the range `A1:B1`, and `total:(X1)` is not a column range.
        BinaryOp::Range | BinaryOp::Sheet => starts_foldable(right),
        // `A1 (-B1)` is not `A1 -B1`, and `A1 Total` does not parse.
        BinaryOp::Intersect => !starts_intersectable(right),
        _ => false,
    }
}

/// String literal with `"` and `\` escaped.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
