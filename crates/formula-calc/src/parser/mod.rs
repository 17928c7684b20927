//! Formula lexer and parser.

mod lexer;
mod references;
mod scanner;
pub(crate) mod tokenize;

use std::sync::OnceLock;

use formula_refs::{CellRef, NameRef, RangeRef, Reference, SheetLimits};
use regex::Regex;

use crate::{
    BinaryExpr, BinaryOp, Expr, FunctionCall, ParseError, ParsedFormula, PostfixExpr, PostfixOp,
    PrefixExpr, PrefixOp,
};
use lexer::{LexMode, Lexer, Token, TokenKind};
use references::RefStream;
use scanner::Scanner;

/// Spreadsheet display limit on formula length, in characters.
const EXCEL_MAX_FORMULA_CHARS: usize = 8_192;
/// Nesting of parentheses, calls, arrays and prefix operators.
const EXCEL_MAX_NESTING: usize = 64;
/// Height of the parsed tree. Bounds recursion in the printer, transformer and generator.
const MAX_EXPR_DEPTH: usize = 512;
/// Operators and calls per formula. Bounds how deeply the compiled continuations nest.
const MAX_OPERATIONS: usize = 512;
/// Arguments per function call.
pub const EXCEL_MAX_ARGS: usize = 255;

/// Limits and grid size used while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_formula_chars: usize,
    pub max_nesting: usize,
    pub max_depth: usize,
    pub max_operations: usize,
    /// Symbols past these limits are names, not cell references.
    pub limits: SheetLimits,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_formula_chars: EXCEL_MAX_FORMULA_CHARS,
            max_nesting: EXCEL_MAX_NESTING,
            max_depth: MAX_EXPR_DEPTH,
            max_operations: MAX_OPERATIONS,
            limits: SheetLimits::EXCEL,
        }
    }
}

/// Parse `formula` as written in cell `(sheet, row, col)`. A leading `=` is optional.
///
/// References without an explicit sheet get `sheet`, and their relative axes are stored as
/// offsets from `(row, col)`.
pub fn parse_formula(
    sheet: &str,
    row: u32,
    col: u32,
    formula: &str,
) -> Result<ParsedFormula, ParseError> {
    parse_formula_with(sheet, row, col, formula, &ParseOptions::default())
}

pub fn parse_formula_with(
    sheet: &str,
    row: u32,
    col: u32,
    formula: &str,
    opts: &ParseOptions,
) -> Result<ParsedFormula, ParseError> {
    let char_len = formula.chars().count();
    if char_len > opts.max_formula_chars {
        return Err(ParseError::new(
            format!(
                "Formula exceeds the {}-character limit (got {char_len})",
                opts.max_formula_chars
            ),
            crate::Span::new(0, formula.len()),
            1,
            1,
        ));
    }

    let start = usize::from(formula.starts_with('='));
    let scanner = Scanner::starting_at(formula, start);
    let stream = RefStream::new(Lexer::new(scanner, LexMode::Strict), opts.limits);
    let mut parser = Parser::new(stream, sheet, row, col, opts);

    let expr = parser.parse_expression(true)?;
    let tok = parser.stream.peek()?;
    if !tok.is_eof() {
        return Err(tok.error(format!("Unexpected {}", tok.describe())));
    }

    let depth = expr.depth();
    if depth > opts.max_depth {
        return Err(ParseError::new(
            format!(
                "Formula nesting exceeds the {}-level limit (got {depth})",
                opts.max_depth
            ),
            crate::Span::new(start, formula.len()),
            1,
            start + 1,
        ));
    }

    let operations = expr.operations();
    if operations > opts.max_operations {
        return Err(ParseError::new(
            format!(
                "Formula exceeds the {}-operation limit (got {operations})",
                opts.max_operations
            ),
            crate::Span::new(start, formula.len()),
            1,
            start + 1,
        ));
    }

    Ok(ParsedFormula {
        expr,
        refs: parser.refs,
        sheet: sheet.to_string(),
        row,
        col,
    })
}

/// Parse text that must be nothing but references: `A1`, `Sheet1!A1:B2`, `A:A`, `#sheet`,
/// or a comma-separated list of cells and ranges (returned as a union).
///
/// The result is always absolute. Names are rejected.
pub fn parse_reference(text: &str) -> Result<Reference, ParseError> {
    let fail = || {
        ParseError::new(
            format!("Cannot parse reference: {text}"),
            crate::Span::new(0, text.len()),
            1,
            1,
        )
    };

    if text.eq_ignore_ascii_case("#sheet") {
        return Ok(RangeRef::whole_sheet().into());
    }

    // Plain A1 is by far the most common input.
    if a1_re().is_match(text) {
        return CellRef::from_a1_with_limits(text, SheetLimits::EXCEL)
            .map(|cell| cell.to_absolute().into())
            .map_err(|_| fail());
    }

    let lexer = Lexer::new(Scanner::new(text), LexMode::Strict);
    let mut stream = RefStream::new(lexer, SheetLimits::EXCEL);
    let mut parts = Vec::new();
    loop {
        let tok = stream.next()?;
        match tok.kind {
            TokenKind::Reference(r @ (Reference::Cell(_) | Reference::Range(_))) => {
                parts.push(r.to_absolute());
            }
            _ => return Err(fail()),
        }
        let tok = stream.next()?;
        if tok.is_eof() {
            break;
        }
        if !tok.is_op(",") {
            return Err(fail());
        }
    }

    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(formula_refs::UnionRef::new(parts).into())
    }
}

/// Like [`parse_reference`], for validation: any mismatch is `None`.
pub fn try_parse_reference(text: &str) -> Option<Reference> {
    parse_reference(text).ok()
}

fn a1_re() -> &'static Regex {
    static A1_RE: OnceLock<Regex> = OnceLock::new();
    A1_RE.get_or_init(|| Regex::new(r"^\$?[A-Za-z]+\$?[0-9]+$").expect("valid regex"))
}

struct Parser<'a, 'o> {
    stream: RefStream<'a>,
    sheet: &'a str,
    row: u32,
    col: u32,
    opts: &'o ParseOptions,
    refs: Vec<Reference>,
    nesting: usize,
}

impl<'a, 'o> Parser<'a, 'o> {
    fn new(
        stream: RefStream<'a>,
        sheet: &'a str,
        row: u32,
        col: u32,
        opts: &'o ParseOptions,
    ) -> Self {
        Self {
            stream,
            sheet,
            row,
            col,
            opts,
            refs: Vec::new(),
            nesting: 0,
        }
    }

    /// `commas` says whether `,` is the union operator here (top level, parentheses) or an
    /// argument separator (function arguments, array cells).
    fn parse_expression(&mut self, commas: bool) -> Result<Expr, ParseError> {
        let atom = self.parse_atom()?;
        self.parse_binary(atom, 0, commas)
    }

    /// Precedence climbing: fold operators binding tighter than `min_prec` into `left`.
    fn parse_binary(&mut self, mut left: Expr, min_prec: u8, commas: bool) -> Result<Expr, ParseError> {
        loop {
            let Some(op) = self.peek_binary(commas)? else {
                return Ok(left);
            };
            let prec = op.precedence();
            if prec <= min_prec {
                return Ok(left);
            }
            if op != BinaryOp::Intersect {
                self.stream.next()?;
            }
            let atom = self.parse_atom()?;
            let right = self.parse_binary(atom, prec, commas)?;
            left = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
    }

    /// The operator joining the current operand to the next one, if any. An operand that
    /// follows directly, with no operator in between, is an implicit intersection.
    fn peek_binary(&mut self, commas: bool) -> Result<Option<BinaryOp>, ParseError> {
        let tok = self.stream.peek()?;
        Ok(match &tok.kind {
            TokenKind::Operator(",") if !commas => None,
            TokenKind::Operator(op) => BinaryOp::from_operator(op),
            TokenKind::Punctuation('(')
            | TokenKind::Reference(_)
            | TokenKind::Number(_)
            | TokenKind::Function(_) => Some(BinaryOp::Intersect),
            _ => None,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let tok = self.stream.next()?;
        let expr = match tok.kind {
            TokenKind::Reference(r) => self.add_reference(r),
            TokenKind::SheetMarker => self.add_reference(RangeRef::whole_sheet().into()),
            TokenKind::Function(name) => self.nested(&tok.span, |p| p.parse_call(name))?,
            TokenKind::Punctuation('(') => self.nested(&tok.span, |p| {
                let inner = p.parse_expression(true)?;
                p.expect_punc(')')?;
                Ok(inner)
            })?,
            TokenKind::Punctuation('{') => self.nested(&tok.span, Self::parse_array)?,
            TokenKind::Number(n) => Expr::Number(n),
            TokenKind::String(s) => Expr::String(s),
            TokenKind::Bool(b) => Expr::Bool(b),
            TokenKind::Error(kind) => Expr::Error(kind),
            TokenKind::Symbol { name, .. } => self.add_reference(NameRef::new(name).into()),
            TokenKind::Operator(op @ ("+" | "-")) => {
                let op = if op == "+" {
                    PrefixOp::Plus
                } else {
                    PrefixOp::Minus
                };
                let operand = self.nested(&tok.span, Self::parse_atom)?;
                Expr::Prefix(PrefixExpr {
                    op,
                    expr: Box::new(operand),
                })
            }
            TokenKind::Eof => return Err(tok.error("Incomplete expression")),
            _ => return Err(tok.error(format!("Parse error: unexpected {}", tok.describe()))),
        };
        self.maybe_percent(expr)
    }

    fn maybe_percent(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        while self.stream.peek()?.is_op("%") {
            self.stream.next()?;
            expr = Expr::Postfix(PostfixExpr {
                op: PostfixOp::Percent,
                expr: Box::new(expr),
            });
        }
        Ok(expr)
    }

    /// Arguments after the function name; `F()` has none, every other empty slot is
    /// [`Expr::Null`].
    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        self.expect_punc('(')?;
        let mut args = Vec::new();
        if self.stream.peek()?.is_punc(')') {
            self.stream.next()?;
        } else {
            loop {
                let tok = self.stream.peek()?;
                if args.len() == EXCEL_MAX_ARGS {
                    return Err(tok.error(format!("Too many arguments (max {EXCEL_MAX_ARGS})")));
                }
                if tok.is_op(",") || tok.is_punc(')') {
                    args.push(Expr::Null);
                } else {
                    args.push(self.parse_expression(false)?);
                }
                if self.stream.peek()?.is_punc(')') {
                    self.stream.next()?;
                    break;
                }
                self.expect_op(",")?;
            }
        }
        Ok(Expr::Call(FunctionCall { name, args }))
    }

    /// `{ 1, 2; 3, 4 }`, after the opening brace.
    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let mut rows = vec![Vec::new()];
        let mut first = true;
        loop {
            let tok = self.stream.peek()?;
            if tok.is_punc('}') || tok.is_eof() {
                break;
            }
            if first {
                first = false;
            } else if tok.is_punc(';') {
                self.stream.next()?;
                rows.push(Vec::new());
            } else {
                self.expect_op(",")?;
            }
            let cell = self.parse_expression(false)?;
            if let Some(row) = rows.last_mut() {
                row.push(cell);
            }
        }
        self.expect_punc('}')?;
        Ok(Expr::Array(rows))
    }

    /// Qualify with the home sheet, store relative axes as offsets, and record the reference.
    fn add_reference(&mut self, mut reference: Reference) -> Expr {
        reference.qualify(self.sheet);
        let reference = reference.relative_to(self.row, self.col);
        self.refs.push(reference);
        Expr::Ref(self.refs.len() - 1)
    }

    fn nested<T>(
        &mut self,
        span: &crate::Span,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting >= self.opts.max_nesting {
            let pos = self.stream.source()[..span.start].chars().count() + 1;
            return Err(ParseError::new(
                format!(
                    "Formula nesting exceeds the {}-level limit",
                    self.opts.max_nesting
                ),
                *span,
                1,
                pos,
            ));
        }
        self.nesting += 1;
        let out = f(self);
        self.nesting -= 1;
        out
    }

    fn expect_punc(&mut self, ch: char) -> Result<Token, ParseError> {
        let tok = self.stream.next()?;
        if tok.is_punc(ch) {
            Ok(tok)
        } else {
            Err(tok.error(format!(
                "Expected punctuation «{ch}» but found {}",
                tok.describe()
            )))
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<Token, ParseError> {
        let tok = self.stream.next()?;
        if tok.is_op(op) {
            Ok(tok)
        } else {
            Err(tok.error(format!(
                "Expected operator «{op}» but found {}",
                tok.describe()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_refs::{Bound, Relativity};
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> ParsedFormula {
        parse_formula("Sheet1", 0, 0, src).unwrap()
    }

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse("1+2*3").expr,
            bin(BinaryOp::Add, num(1.0), bin(BinaryOp::Mul, num(2.0), num(3.0)))
        );
        assert_eq!(
            parse("(1+2)*3").expr,
            bin(BinaryOp::Mul, bin(BinaryOp::Add, num(1.0), num(2.0)), num(3.0))
        );
    }

    #[test]
    fn operators_are_left_associative() {
        assert_eq!(
            parse("1-2-3").expr,
            bin(BinaryOp::Sub, bin(BinaryOp::Sub, num(1.0), num(2.0)), num(3.0))
        );
    }

    #[test]
    fn prefix_applies_to_the_atom() {
        assert_eq!(
            parse("-2^2").expr,
            bin(
                BinaryOp::Pow,
                Expr::Prefix(PrefixExpr {
                    op: PrefixOp::Minus,
                    expr: Box::new(num(2.0)),
                }),
                num(2.0)
            )
        );
    }

    #[test]
    fn percent_repeats() {
        let percent = |e: Expr| {
            Expr::Postfix(PostfixExpr {
                op: PostfixOp::Percent,
                expr: Box::new(e),
            })
        };
        assert_eq!(parse("50%%").expr, percent(percent(num(50.0))));
    }

    #[test]
    fn gaps_become_null_arguments() {
        let Expr::Call(call) = parse("FOO(1,,3)").expr else {
            panic!("expected a call");
        };
        assert_eq!(call.args, vec![num(1.0), Expr::Null, num(3.0)]);

        let Expr::Call(call) = parse("FOO()").expr else {
            panic!("expected a call");
        };
        assert!(call.args.is_empty());

        let Expr::Call(call) = parse("FOO(,)").expr else {
            panic!("expected a call");
        };
        assert_eq!(call.args, vec![Expr::Null, Expr::Null]);
    }

    #[test]
    fn references_are_stored_relative_to_home() {
        let parsed = parse_formula("Sheet1", 5, 2, "=A1+$B$2").unwrap();
        assert_eq!(parsed.expr, bin(BinaryOp::Add, Expr::Ref(0), Expr::Ref(1)));

        let Reference::Cell(a1) = &parsed.refs[0] else {
            panic!("expected a cell");
        };
        assert_eq!((a1.row, a1.col), (Bound::At(-5), Bound::At(-2)));
        assert_eq!(a1.sheet(), Some("Sheet1"));
        assert!(!a1.has_sheet());

        let Reference::Cell(b2) = &parsed.refs[1] else {
            panic!("expected a cell");
        };
        assert_eq!((b2.row, b2.col, b2.rel), (Bound::At(1), Bound::At(1), Relativity::ABSOLUTE));
    }

    #[test]
    fn bare_symbols_are_names() {
        let parsed = parse("Total*Rate");
        assert_eq!(
            parsed.refs,
            vec![
                Reference::Name(NameRef::new("Total").with_sheet("Sheet1", false)),
                Reference::Name(NameRef::new("Rate").with_sheet("Sheet1", false)),
            ]
        );
    }

    #[test]
    fn space_before_paren_is_intersection() {
        let parsed = parse("A1:C3 (A2,A3)");
        assert_eq!(
            parsed.expr,
            bin(
                BinaryOp::Intersect,
                Expr::Ref(0),
                bin(BinaryOp::Union, Expr::Ref(1), Expr::Ref(2))
            )
        );
        assert!(matches!(parsed.refs[0], Reference::Range(_)));
    }

    #[test]
    fn glued_paren_is_a_call_endpoint() {
        let parsed = parse("A1:CHOOSE(2,A1,A2)");
        let Expr::Binary(b) = &parsed.expr else {
            panic!("expected a binary node");
        };
        assert_eq!(b.op, BinaryOp::Range);
        assert_eq!(*b.left, Expr::Ref(0));
        assert!(matches!(&*b.right, Expr::Call(call) if call.name == "CHOOSE" && call.args.len() == 3));
        assert!(matches!(parsed.refs[0], Reference::Cell(_)));
    }

    #[test]
    fn commas_separate_arguments_but_unite_in_parens() {
        let Expr::Call(call) = parse("SUM((A1,B1),C1)").expr else {
            panic!("expected a call");
        };
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0], bin(BinaryOp::Union, Expr::Ref(0), Expr::Ref(1)));
    }

    #[test]
    fn arrays() {
        assert_eq!(
            parse("{1,2;3,4}").expr,
            Expr::Array(vec![vec![num(1.0), num(2.0)], vec![num(3.0), num(4.0)]])
        );
    }

    #[test]
    fn sheet_marker_is_the_home_sheet() {
        let parsed = parse("ROWS(#sheet)");
        let Reference::Range(r) = &parsed.refs[0] else {
            panic!("expected a range");
        };
        assert!(r.is_whole_sheet());
        assert_eq!(r.sheet(), Some("Sheet1"));
    }

    #[test]
    fn incomplete_input_points_past_the_operator() {
        let err = parse_formula("Sheet1", 0, 0, "=1+").unwrap_err();
        assert_eq!(err.message, "Incomplete expression");
        assert!(err.position() >= 2);
    }

    #[test]
    fn trailing_input_is_rejected() {
        let err = parse_formula("Sheet1", 0, 0, "1 2)").unwrap_err();
        assert!(err.message.contains("Unexpected"), "{err}");
    }

    #[test]
    fn only_operand_starts_continue_an_intersection() {
        for text in ["=1 \"x\"", "=TRUE FALSE", "=#N/A #N/A", "=A1 Total", "=A1 {1}", "=A1 #sheet"] {
            let err = parse_formula("Sheet1", 0, 0, text).unwrap_err();
            assert!(err.message.starts_with("Unexpected"), "{text}: {err}");
        }

        let parsed = parse("A1 (Total)");
        assert_eq!(parsed.expr, bin(BinaryOp::Intersect, Expr::Ref(0), Expr::Ref(1)));
        for text in ["A1 B1", "A:A 2", "Total SUM(B1)"] {
            let parsed = parse(text);
            assert!(
                matches!(&parsed.expr, Expr::Binary(b) if b.op == BinaryOp::Intersect),
                "{text}: {:?}",
                parsed.expr
            );
        }
    }

    #[test]
    fn calls_take_at_most_255_arguments() {
        let call = |n: usize| format!("=SUM({})", vec!["1"; n].join(","));
        let Expr::Call(sum) = parse(&call(EXCEL_MAX_ARGS)).expr else {
            panic!("expected a call");
        };
        assert_eq!(sum.args.len(), EXCEL_MAX_ARGS);

        let err = parse_formula("S", 0, 0, &call(EXCEL_MAX_ARGS + 1)).unwrap_err();
        assert_eq!(err.message, "Too many arguments (max 255)");
        // Empty slots count too.
        let gaps = format!("=SUM({})", ",".repeat(EXCEL_MAX_ARGS));
        assert!(parse_formula("S", 0, 0, &gaps).is_err());
    }

    #[test]
    fn operations_are_bounded() {
        let opts = ParseOptions {
            max_operations: 3,
            ..ParseOptions::default()
        };
        assert!(parse_formula_with("S", 0, 0, "SUM(-A1, 2%)", &opts).is_ok());
        let err = parse_formula_with("S", 0, 0, "SUM(-A1, 2%)+1", &opts).unwrap_err();
        assert!(err.message.contains("operation limit"), "{err}");
        // Array cells that are plain values cost nothing.
        assert!(parse_formula_with("S", 0, 0, "SUM({1,2;3,4})", &opts).is_ok());
    }

    #[test]
    fn nesting_is_bounded() {
        let opts = ParseOptions {
            max_nesting: 3,
            ..ParseOptions::default()
        };
        assert!(parse_formula_with("S", 0, 0, "(((1)))", &opts).is_ok());
        let err = parse_formula_with("S", 0, 0, "((((1))))", &opts).unwrap_err();
        assert!(err.message.contains("nesting"));
    }

    #[test]
    fn length_is_bounded() {
        let long = "1+".repeat(5_000) + "1";
        let err = parse_formula("S", 0, 0, &long).unwrap_err();
        assert!(err.message.contains("character limit"));
    }

    #[test]
    fn reference_only_parsing() {
        assert_eq!(
            parse_reference("b2").unwrap(),
            Reference::Cell(formula_refs::CellRef::new(1, 1, Relativity::ABSOLUTE))
        );
        assert_eq!(parse_reference("A1:B2,Data!C3").unwrap().to_string(), "$A$1:$B$2,Data!$C$3");
        assert!(parse_reference("#SHEET").is_ok());
        assert_eq!(try_parse_reference("Total"), None);
        assert_eq!(try_parse_reference("A1+B1"), None);
        assert_eq!(try_parse_reference("XFE1"), None);
        assert_eq!(try_parse_reference(""), None);
    }
}
