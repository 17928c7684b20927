use formula_refs::Reference;
use serde::{Deserialize, Serialize};

use crate::ErrorKind;

/// Print rank of prefix `+`/`-`, above every binary operator.
pub(crate) const PREFIX_RANK: u8 = 11;
/// Print rank of postfix `%`.
pub(crate) const POSTFIX_RANK: u8 = 12;
/// Rank of nodes that never need parentheses.
pub(crate) const ATOM_RANK: u8 = 13;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    String(String),
    Bool(bool),
    Error(ErrorKind),
    /// Index into [`ParsedFormula::refs`].
    Ref(usize),
    Prefix(PrefixExpr),
    Postfix(PostfixExpr),
    Binary(BinaryExpr),
    Call(FunctionCall),
    /// Rows of cells.
    Array(Vec<Vec<Expr>>),
    /// An empty argument slot, e.g. the middle of `FOO(1,,3)`.
    Null,
}

impl Expr {
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Expr::Binary(b) => b.op.precedence(),
            Expr::Prefix(_) => PREFIX_RANK,
            Expr::Postfix(_) => POSTFIX_RANK,
            _ => ATOM_RANK,
        }
    }

    /// Height of the tree; leaves are 1.
    pub fn depth(&self) -> usize {
        let children = match self {
            Expr::Prefix(p) => p.expr.depth(),
            Expr::Postfix(p) => p.expr.depth(),
            Expr::Binary(b) => b.left.depth().max(b.right.depth()),
            Expr::Call(call) => call.args.iter().map(Expr::depth).max().unwrap_or(0),
            Expr::Array(rows) => rows.iter().flatten().map(Expr::depth).max().unwrap_or(0),
            _ => 0,
        };
        children + 1
    }

    /// Operators and calls in the tree. Each one becomes a call whose continuation holds the
    /// rest of the formula, so this is also the nesting of the compiled code.
    pub fn operations(&self) -> usize {
        match self {
            Expr::Prefix(p) => p.expr.operations() + 1,
            Expr::Postfix(p) => p.expr.operations() + 1,
            Expr::Binary(b) => b.left.operations() + b.right.operations() + 1,
            Expr::Call(call) => call.args.iter().map(Expr::operations).sum::<usize>() + 1,
            Expr::Array(rows) => rows.iter().flatten().map(Expr::operations).sum(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixOp {
    Plus,
    Minus,
}

impl PrefixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PrefixOp::Plus => "+",
            PrefixOp::Minus => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixExpr {
    pub op: PrefixOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Percent,
}

impl PostfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Percent => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Range,
    Sheet,
    Intersect,
    Union,
    Pow,
    Mul,
    Div,
    Add,
    Sub,
    Concat,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    /// Binding strength; `:` binds tightest, comparisons loosest.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Range => 10,
            BinaryOp::Sheet => 9,
            BinaryOp::Intersect => 8,
            BinaryOp::Union => 7,
            BinaryOp::Pow => 5,
            BinaryOp::Mul | BinaryOp::Div => 4,
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Concat => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Range => ":",
            BinaryOp::Sheet => "!",
            BinaryOp::Intersect => " ",
            BinaryOp::Union => ",",
            BinaryOp::Pow => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        }
    }

    pub(crate) fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            ":" => BinaryOp::Range,
            "!" => BinaryOp::Sheet,
            "," => BinaryOp::Union,
            "^" => BinaryOp::Pow,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "&" => BinaryOp::Concat,
            "=" => BinaryOp::Eq,
            "<>" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name as written.
    pub name: String,
    pub args: Vec<Expr>,
}

/// Result of parsing a formula at a home cell.
///
/// Relative reference axes in `refs` are stored as offsets from `(row, col)`, so two
/// formulas that differ only by where they were filled to have equal `expr` and `refs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFormula {
    pub expr: Expr,
    pub refs: Vec<Reference>,
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl ParsedFormula {
    /// Formula text (without `=`) as displayed at the home cell.
    pub fn to_formula_string(&self) -> String {
        crate::printer::Printer::new(&self.expr).print_at(&self.refs, self.row, self.col)
    }

    /// Debug dump of the parse result.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
