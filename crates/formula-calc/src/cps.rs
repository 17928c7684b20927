//! Continuation-passing rewrite of parsed expressions.
//!
//! Every operator and function becomes a [`Term::Call`] that hands its result to an explicit
//! continuation. `IF`, `AND` and `OR` become [`Term::Branch`] nodes whose arms are thunks, so a
//! host runs only the selected arm even when evaluation suspends.

use std::fmt;
use std::sync::Arc;

use crate::{ErrorKind, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum VarKind {
    /// A value delivered to a continuation.
    Result,
    /// Continuation parameter of a then-thunk.
    Then,
    /// Continuation parameter of an else-thunk.
    Else,
}

/// Transformer-generated variable; unique within one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Var {
    pub kind: VarKind,
    pub id: u32,
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            VarKind::Result => 'r',
            VarKind::Then => 't',
            VarKind::Else => 'e',
        };
        write!(f, "{prefix}{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Atom {
    Number(f64),
    String(Arc<str>),
    Bool(bool),
    Error(ErrorKind),
    /// Index into the reference table.
    Ref(usize),
    Null,
    Var(Var),
    Matrix(Vec<Vec<Atom>>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lambda {
    pub param: Var,
    pub body: Box<Term>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Term {
    /// Host function call; the result goes to `k`.
    Call {
        name: String,
        k: Lambda,
        args: Vec<Atom>,
    },
    /// Run `then` or `otherwise` (thunks taking a continuation) depending on `cond`; either
    /// arm resumes `k`.
    Branch {
        cond: Atom,
        then: Lambda,
        otherwise: Lambda,
        k: Lambda,
    },
    /// Pass `value` to the continuation bound to `k`.
    Resume { k: Var, value: Atom },
    /// Final value of the formula.
    Return(Atom),
}

type Cont<'a> = Box<dyn FnOnce(&mut Transformer, Atom) -> Term + 'a>;
type Finish<'a> = Box<dyn FnOnce(&mut Transformer, Vec<Atom>) -> Term + 'a>;

/// Sub-expressions of the short-circuit forms.
#[derive(Clone, Copy)]
enum Operand<'a> {
    Expr(&'a Expr),
    Bool(bool),
    And(&'a [Expr]),
    Or(&'a [Expr]),
}

#[derive(Debug, Default)]
pub(crate) struct Transformer {
    next_var: u32,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables introduced so far.
    pub fn var_count(&self) -> u32 {
        self.next_var
    }

    pub fn transform(&mut self, expr: &Expr) -> Term {
        self.cps(expr, Box::new(|_, atom| Term::Return(atom)))
    }

    fn gensym(&mut self, kind: VarKind) -> Var {
        let id = self.next_var;
        self.next_var += 1;
        Var { kind, id }
    }

    fn cps<'a>(&mut self, expr: &'a Expr, k: Cont<'a>) -> Term {
        if let Some(atom) = leaf(expr) {
            return k(self, atom);
        }
        match expr {
            Expr::Number(_)
            | Expr::String(_)
            | Expr::Bool(_)
            | Expr::Error(_)
            | Expr::Ref(_)
            | Expr::Null => unreachable!("leaves are handled above"),
            Expr::Prefix(p) => {
                let name = format!("unary{}", p.op.as_str());
                self.call(name, vec![&*p.expr], k)
            }
            Expr::Postfix(p) => {
                let name = format!("unary{}", p.op.as_str());
                self.call(name, vec![&*p.expr], k)
            }
            Expr::Binary(b) => {
                let name = format!("binary{}", b.op.as_str());
                self.call(name, vec![&*b.left, &*b.right], k)
            }
            Expr::Call(call) => {
                let args = call.args.as_slice();
                let name = call.name.as_str();
                if name.eq_ignore_ascii_case("IF") && (1..=3).contains(&args.len()) {
                    let arm = |i: usize, default: bool| {
                        args.get(i).map_or(Operand::Bool(default), Operand::Expr)
                    };
                    self.branch(Operand::Expr(&args[0]), arm(1, true), arm(2, false), k)
                } else if name.eq_ignore_ascii_case("AND") {
                    self.operand(Operand::And(args), k)
                } else if name.eq_ignore_ascii_case("OR") {
                    self.operand(Operand::Or(args), k)
                } else if args.is_empty() && name.eq_ignore_ascii_case("TRUE") {
                    k(self, Atom::Bool(true))
                } else if args.is_empty() && name.eq_ignore_ascii_case("FALSE") {
                    k(self, Atom::Bool(false))
                } else {
                    self.call(call.name.clone(), args.iter().collect(), k)
                }
            }
            Expr::Array(rows) => {
                let shape: Vec<usize> = rows.iter().map(Vec::len).collect();
                let cells: Vec<&'a Expr> = rows.iter().flatten().collect();
                self.sequence(
                    cells.into_iter(),
                    Vec::new(),
                    Box::new(move |t, atoms| {
                        let mut atoms = atoms.into_iter();
                        let matrix = shape
                            .iter()
                            .map(|&width| atoms.by_ref().take(width).collect())
                            .collect();
                        k(t, Atom::Matrix(matrix))
                    }),
                )
            }
        }
    }

    /// Evaluates `args` left to right, then calls `name` with their values.
    fn call<'a>(&mut self, name: String, args: Vec<&'a Expr>, k: Cont<'a>) -> Term {
        let result = self.gensym(VarKind::Result);
        let rest = k(self, Atom::Var(result));
        let k = Lambda {
            param: result,
            body: Box::new(rest),
        };
        self.sequence(
            args.into_iter(),
            Vec::new(),
            Box::new(move |_, args| Term::Call { name, k, args }),
        )
    }

    /// Leaves are taken in a loop; only operators and calls continue through a closure, so a
    /// wide list of plain values does not deepen the stack.
    fn sequence<'a>(
        &mut self,
        mut pending: std::vec::IntoIter<&'a Expr>,
        mut done: Vec<Atom>,
        finish: Finish<'a>,
    ) -> Term {
        loop {
            let Some(expr) = pending.next() else {
                return finish(self, done);
            };
            match leaf(expr) {
                Some(atom) => done.push(atom),
                None => {
                    return self.cps(
                        expr,
                        Box::new(move |t, atom| {
                            done.push(atom);
                            t.sequence(pending, done, finish)
                        }),
                    )
                }
            }
        }
    }

    fn operand<'a>(&mut self, operand: Operand<'a>, k: Cont<'a>) -> Term {
        match operand {
            Operand::Expr(expr) => self.cps(expr, k),
            Operand::Bool(b) => k(self, Atom::Bool(b)),
            // AND(a, b...) is IF(a, AND(b...), FALSE)
            Operand::And(args) => match args.split_first() {
                None => k(self, Atom::Bool(true)),
                Some((first, rest)) => {
                    self.branch(Operand::Expr(first), Operand::And(rest), Operand::Bool(false), k)
                }
            },
            // OR(a, b...) is IF(a, TRUE, OR(b...))
            Operand::Or(args) => match args.split_first() {
                None => k(self, Atom::Bool(false)),
                Some((first, rest)) => {
                    self.branch(Operand::Expr(first), Operand::Bool(true), Operand::Or(rest), k)
                }
            },
        }
    }

    fn branch<'a>(
        &mut self,
        cond: Operand<'a>,
        then: Operand<'a>,
        otherwise: Operand<'a>,
        k: Cont<'a>,
    ) -> Term {
        self.operand(
            cond,
            Box::new(move |t, cond| {
                let result = t.gensym(VarKind::Result);
                let rest = Lambda {
                    param: result,
                    body: Box::new(k(t, Atom::Var(result))),
                };
                let then = t.thunk(VarKind::Then, then);
                let otherwise = t.thunk(VarKind::Else, otherwise);
                Term::Branch {
                    cond,
                    then,
                    otherwise,
                    k: rest,
                }
            }),
        )
    }

    fn thunk(&mut self, kind: VarKind, operand: Operand<'_>) -> Lambda {
        let k = self.gensym(kind);
        let body = self.operand(operand, Box::new(move |_, value| Term::Resume { k, value }));
        Lambda {
            param: k,
            body: Box::new(body),
        }
    }
}

/// The atom for an expression that needs no call to evaluate.
fn leaf(expr: &Expr) -> Option<Atom> {
    Some(match expr {
        Expr::Number(n) => Atom::Number(*n),
        Expr::String(s) => Atom::String(Arc::from(s.as_str())),
        Expr::Bool(b) => Atom::Bool(*b),
        Expr::Error(kind) => Atom::Error(*kind),
        Expr::Ref(index) => Atom::Ref(*index),
        Expr::Null => Atom::Null,
        Expr::Prefix(_)
        | Expr::Postfix(_)
        | Expr::Binary(_)
        | Expr::Call(_)
        | Expr::Array(_) => return None,
    })
}
