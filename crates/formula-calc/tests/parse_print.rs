use formula_calc::{
    parse_formula, parse_formula_with, parse_reference, BinaryOp, Expr, ParseOptions, Reference,
};
use pretty_assertions::assert_eq;

fn print(text: &str) -> String {
    parse_formula("Sheet1", 3, 2, text)
        .unwrap_or_else(|err| panic!("{text:?} failed to parse: {err}"))
        .to_formula_string()
}

#[test]
fn prints_only_the_parentheses_grouping_needs() {
    assert_eq!(print("=1+2*3"), "1+2*3");
    assert_eq!(print("=(1+2)*3"), "(1+2)*3");
    assert_eq!(print("=((1))+(2*3)"), "1+2*3");
    assert_eq!(print("=1-(2-3)"), "1-(2-3)");
    assert_eq!(print("=(1-2)-3"), "1-2-3");
    assert_eq!(print("=2^(3^2)"), "2^(3^2)");
    assert_eq!(print("=-(1+2)"), "-(1+2)");
    assert_eq!(print("=(-1)%"), "(-1)%");
    assert_eq!(print("=-1%"), "-1%");
    assert_eq!(print("=\"a\"&\"b\"=\"ab\""), "\"a\"&\"b\"=\"ab\"");
}

#[test]
fn normalizes_spacing() {
    assert_eq!(print("=SUM( A1 , B2:C3 )"), "SUM(A1, B2:C3)");
    assert_eq!(print("= 1 + 2"), "1+2");
    assert_eq!(print("={1,2;3,4}"), "{ 1, 2; 3, 4 }");
    assert_eq!(print("=FOO(1,,3)"), "FOO(1, , 3)");
}

#[test]
fn references_print_as_written() {
    assert_eq!(print("=A:A"), "A:A");
    assert_eq!(print("=1:1"), "1:1");
    assert_eq!(print("=$A$1+B$2+$C3"), "$A$1+B$2+$C3");
    assert_eq!(print("=Sheet2!A1+'My Sheet'!B2:C4"), "Sheet2!A1+'My Sheet'!B2:C4");
    assert_eq!(print("=Total*Rate"), "Total*Rate");
    assert_eq!(print("=ROWS(#sheet)"), "ROWS(#sheet)");
}

#[test]
fn whitespace_decides_between_intersection_and_call() {
    let spaced = parse_formula("Sheet1", 0, 0, "=A1:C3 (A2,A3)").unwrap();
    let Expr::Binary(b) = &spaced.expr else {
        panic!("expected a binary expression");
    };
    assert_eq!(b.op, BinaryOp::Intersect);
    assert_eq!(spaced.to_formula_string(), "A1:C3 (A2,A3)");

    let glued = parse_formula("Sheet1", 0, 0, "=A1:C3(A2,A3)").unwrap();
    let Expr::Binary(b) = &glued.expr else {
        panic!("expected a binary expression");
    };
    assert_eq!(b.op, BinaryOp::Range);
    assert!(matches!(&*b.right, Expr::Call(call) if call.name == "C3"));
    assert_eq!(glued.to_formula_string(), "A1:C3(A2, A3)");
}

#[test]
fn operands_that_would_lex_differently_are_wrapped() {
    for (text, expected) in [
        ("=Total:(A1)", "Total:(A1)"),
        ("=A1:(Total)", "A1:(Total)"),
        ("=(A1):B1", "A1:(B1)"),
        ("=A1 (-B1)", "A1 (-B1)"),
        ("=(A1 B1)+1", "A1 (B1)+1"),
        ("=1:3 (A1)", "1:3 (A1)"),
        ("=A1 B1:C2", "A1 (B1:C2)"),
        ("=A1 (Total)", "A1 (Total)"),
        ("=A1 (\"x\")", "A1 (\"x\")"),
        ("=A1 ({1,2})", "A1 ({ 1, 2 })"),
        ("=A1 SUM(B1)", "A1 SUM(B1)"),
        ("=A1 2%", "A1 2%"),
    ] {
        let first = parse_formula("Sheet1", 5, 5, text)
            .unwrap_or_else(|err| panic!("{text:?} failed to parse: {err}"));
        let printed = first.to_formula_string();
        assert_eq!(printed, expected, "{text}");
        let second = parse_formula("Sheet1", 5, 5, &printed)
            .unwrap_or_else(|err| panic!("{printed:?} failed to reparse: {err}"));
        assert_eq!(first, second, "{text} printed as {printed}");
    }
}

#[test]
fn only_operand_starts_continue_an_intersection() {
    for text in ["=1 \"x\"", "=TRUE FALSE", "=A1 Total", "=A1 {1}", "=\"a\" #N/A"] {
        let err = parse_formula("Sheet1", 0, 0, text).unwrap_err();
        assert!(err.message.starts_with("Unexpected"), "{text}: {err}");
    }
}

#[test]
fn overflowing_numbers_are_rejected() {
    let text = format!("={}", "9".repeat(400));
    let err = parse_formula("Sheet1", 0, 0, &text).unwrap_err();
    assert!(err.message.starts_with("Invalid number"), "{err}");
    assert_eq!(err.column, 2);
}

#[test]
fn unions_are_wrapped_inside_arguments() {
    assert_eq!(print("=SUM((A1,B1),C1)"), "SUM((A1,B1), C1)");
    assert_eq!(print("=A1,B1"), "A1,B1");
}

#[test]
fn printed_text_reparses_to_the_same_formula() {
    for text in [
        "=IF(A1>0, \"pos\", IF(A1<0, \"neg\", \"zero\"))",
        "=SUM(Data!A1:A10)/COUNT(Data!A1:A10)",
        "=-A1^2+B$3%",
        "={1, \"x\"; TRUE, #N/A}",
        "=A1:INDEX(B1:B3, 2)",
        "=\"say \\\"hi\\\"\"",
    ] {
        let first = parse_formula("Sheet1", 7, 4, text).unwrap();
        let printed = first.to_formula_string();
        let second = parse_formula("Sheet1", 7, 4, &printed).unwrap();
        assert_eq!(first, second, "{text} printed as {printed}");
    }
}

#[test]
fn errors_carry_a_message_and_span() {
    let err = parse_formula("Sheet1", 0, 0, "=1+").unwrap_err();
    assert_eq!(err.message, "Incomplete expression");

    let err = parse_formula("Sheet1", 0, 0, "=SUM(1").unwrap_err();
    assert!(err.span.start <= 6, "{err}");

    let opts = ParseOptions {
        max_nesting: 2,
        ..ParseOptions::default()
    };
    assert!(parse_formula_with("Sheet1", 0, 0, "=((1))", &opts).is_ok());
    assert!(parse_formula_with("Sheet1", 0, 0, "=(((1)))", &opts).is_err());
}

#[test]
fn reference_parsing() {
    let Reference::Cell(cell) = parse_reference("b7").unwrap() else {
        panic!("expected a cell");
    };
    assert_eq!(cell.to_string(), "$B$7");

    let Reference::Union(union) = parse_reference("A1, C2:D3").unwrap() else {
        panic!("expected a union");
    };
    assert_eq!(union.refs.len(), 2);
    assert_eq!(union.to_string(), "$A$1,$C$2:$D$3");

    assert!(parse_reference("1+2").is_err());
    assert_eq!(
        parse_reference("1+2").unwrap_err().message,
        "Cannot parse reference: 1+2"
    );
}
