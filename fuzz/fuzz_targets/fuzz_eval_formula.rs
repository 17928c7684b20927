#![no_main]

use libfuzzer_sys::fuzz_target;

use formula_calc::{Continuation, ErrorKind, Host, Value};

/// Keep evaluation fuzzing bounded: many inputs quickly, no pathological allocations.
const MAX_EVAL_FORMULA_CHARS: usize = 2_048;
const MAX_INPUT_BYTES: usize = MAX_EVAL_FORMULA_CHARS * 4; // max UTF-8 bytes per char

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

/// Answers every call with a number derived from the arguments. Every `defer_every`-th call is
/// parked and resumed after the formula body returns.
#[derive(Default)]
struct FuzzHost {
    calls: usize,
    defer_every: usize,
    parked: Vec<(Continuation, Value)>,
    resolved: Option<Value>,
}

impl Host for FuzzHost {
    fn invoke(&mut self, _name: &str, k: Continuation, args: Vec<Value>) {
        self.calls += 1;
        let value = args
            .iter()
            .map(|v| match v {
                Value::Number(n) => *n,
                Value::Error(_) => f64::NAN,
                _ => 1.0,
            })
            .fold(0.0, |acc, n| acc + n);
        let value = if value.is_finite() {
            Value::Number(value)
        } else {
            Value::Error(ErrorKind::Num)
        };
        if self.defer_every > 0 && self.calls % self.defer_every == 0 {
            self.parked.push((k, value));
        } else {
            k.resume(self, value);
        }
    }

    fn resolve(&mut self, value: Value) {
        assert!(self.resolved.is_none(), "formula resolved twice");
        self.resolved = Some(value);
    }
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
    let formula = truncate_to_chars(&input, MAX_EVAL_FORMULA_CHARS);

    let Ok(parsed) = formula_calc::parse_formula("Sheet1", 5, 5, formula) else {
        return;
    };
    let compiled = formula_calc::compile(&parsed);

    let mut host = FuzzHost {
        defer_every: usize::from(data[0] % 4),
        ..FuzzHost::default()
    };
    compiled.evaluate(&mut host);
    while let Some((k, value)) = host.parked.pop() {
        k.resume(&mut host, value);
    }
    assert!(host.resolved.is_some(), "formula never resolved");

    // A clone elsewhere runs the same code.
    let moved = compiled.clone_at("Sheet2", 0, 0);
    assert!(moved.shares_code_with(&compiled));
});
