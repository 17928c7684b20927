#![no_main]

use libfuzzer_sys::fuzz_target;

/// The parser enforces the 8,192-character display limit itself; the harness only keeps lossy
/// UTF-8 conversion and tokenization bounded.
const EXCEL_MAX_FORMULA_CHARS: usize = 8_192;
const MAX_FUZZ_FORMULA_CHARS: usize = EXCEL_MAX_FORMULA_CHARS + 256;
const MAX_INPUT_BYTES: usize = MAX_FUZZ_FORMULA_CHARS * 4; // max UTF-8 bytes per char

fn truncate_to_chars(s: &str, max_chars: usize) -> &str {
    let mut count = 0usize;
    for (idx, _) in s.char_indices() {
        if count == max_chars {
            return &s[..idx];
        }
        count += 1;
    }
    s
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };

    let input = String::from_utf8_lossy(data);
    let formula = truncate_to_chars(&input, MAX_FUZZ_FORMULA_CHARS);

    // Vary the home cell so relative offsets (including ones that leave the grid) get exercised.
    let row = u32::from(data[0]) % 128;
    let col = u32::from(data.get(1).copied().unwrap_or(0)) % 64;

    // The editor tokenizer must accept anything.
    let _ = formula_calc::tokenize(formula);
    let _ = formula_calc::try_parse_reference(formula);

    let Ok(parsed) = formula_calc::parse_formula("Sheet1", row, col, formula) else {
        return;
    };

    // Printed text must parse back to the same tree and reference table. Normalized spacing can
    // make it longer than the input, so only the length limit is lifted.
    let printed = parsed.to_formula_string();
    let opts = formula_calc::ParseOptions {
        max_formula_chars: usize::MAX,
        ..formula_calc::ParseOptions::default()
    };
    let reparsed = formula_calc::parse_formula_with("Sheet1", row, col, &printed, &opts)
        .unwrap_or_else(|err| panic!("printed formula {printed:?} does not parse: {err}"));
    assert_eq!(parsed.expr, reparsed.expr, "round trip of {printed:?}");
    assert_eq!(parsed.refs, reparsed.refs, "round trip of {printed:?}");
});
