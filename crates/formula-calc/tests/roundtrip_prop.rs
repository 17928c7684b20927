#![cfg(not(target_arch = "wasm32"))]

use formula_calc::parse_formula;
use proptest::prelude::*;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};

const CASES: u32 = 256;
const ROUNDTRIP_SEED: [u8; 32] = [0x5a; 32];

fn assert_roundtrip(text: &str, row: u32, col: u32) -> Result<(), TestCaseError> {
    let first = parse_formula("Sheet1", row, col, text)
        .map_err(|e| TestCaseError::fail(format!("parse failed: text={text:?} err={e}")))?;
    let printed = first.to_formula_string();
    let second = parse_formula("Sheet1", row, col, &printed).map_err(|e| {
        TestCaseError::fail(format!(
            "reparse failed: text={text:?} printed={printed:?} err={e}"
        ))
    })?;

    prop_assert_eq!(&first.expr, &second.expr, "printed as {:?}", printed);
    prop_assert_eq!(&first.refs, &second.refs, "printed as {:?}", printed);
    Ok(())
}

fn arb_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..=1000).prop_map(|n| n.to_string()),
        (0u32..=99, 1u32..=99).prop_map(|(int, frac)| format!("{int}.{frac:02}")),
        "[a-z]{0,6}".prop_map(|s| format!("\"{s}\"")),
        Just("TRUE".to_string()),
        Just("FALSE".to_string()),
        Just("#N/A".to_string()),
        Just("#DIV/0!".to_string()),
        Just("A1".to_string()),
        Just("$B$2".to_string()),
        Just("C$3:$D4".to_string()),
        Just("Data!E5".to_string()),
        Just("'Q1 Data'!A1:B9".to_string()),
        Just("A:C".to_string()),
        Just("2:4".to_string()),
        Just("Rate".to_string()),
    ]
}

fn arb_binary_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("/"),
        Just("^"),
        Just("&"),
        Just("="),
        Just("<>"),
        Just("<="),
        Just(">"),
        Just(":"),
    ]
}

fn arb_formula() -> impl Strategy<Value = String> {
    arb_leaf().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            (inner.clone(), arb_binary_op(), inner.clone())
                .prop_map(|(a, op, b)| format!("{a}{op}{b}")),
            (inner.clone(), arb_binary_op(), inner.clone())
                .prop_map(|(a, op, b)| format!("({a}){op}({b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{a} ({b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a}) ({b})")),
            inner.clone().prop_map(|a| format!("-{a}")),
            inner.clone().prop_map(|a| format!("({a})%")),
            prop::collection::vec(inner.clone(), 1..4)
                .prop_map(|args| format!("SUM({})", args.join(", "))),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, a, b)| format!("IF({c}, {a}, {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{{{a}, {b}; 1, 2}}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("SUM(({a}), ({b}))")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("SUM(({a},{b}))")),
        ]
    })
}

#[test]
fn roundtrip_regressions() {
    for text in [
        "=-(1+2)%",
        "=(A1:C3)*2",
        "=2^-1",
        "=1-(-1)",
        "=\"a\"&(1<2)",
        "=SUM(A:C, 2:4)",
        "=Total:(A1)",
        "=A1:(Total)",
        "=A1 (-B1)",
        "=(A1 B1)+1",
        "=1:3 (A1)",
        "=(1):3",
        "=\"a\":(2 (Rate))",
    ] {
        assert_roundtrip(text, 4, 3).unwrap();
    }
}

#[test]
fn proptest_print_then_parse_roundtrip() {
    let mut runner = TestRunner::new_with_rng(
        Config {
            cases: CASES,
            failure_persistence: None,
            ..Config::default()
        },
        TestRng::from_seed(RngAlgorithm::ChaCha, &ROUNDTRIP_SEED),
    );

    runner
        .run(&(arb_formula(), 4u32..50, 3u32..30), |(text, row, col)| {
            assert_roundtrip(&format!("={text}"), row, col)
        })
        .unwrap();
}
