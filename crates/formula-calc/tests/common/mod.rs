#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use formula_calc::formula_refs::Bound;
use formula_calc::{Continuation, ErrorKind, Host, Reference, Value};

/// Cell values keyed by `(sheet, row, col)`.
#[derive(Debug, Default, Clone)]
pub struct Grid {
    cells: HashMap<(String, u32, u32), f64>,
}

impl Grid {
    pub fn with(mut self, sheet: &str, a1: &str, value: f64) -> Self {
        let cell = formula_calc::CellRef::from_a1(a1).expect("valid A1");
        let (Bound::At(row), Bound::At(col)) = (cell.row, cell.col) else {
            panic!("finite cell expected");
        };
        self.cells
            .insert((sheet.to_string(), row as u32, col as u32), value);
        self
    }

    fn number(&self, value: &Value) -> Result<f64, ErrorKind> {
        match value {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(f64::from(u8::from(*b))),
            Value::Null => Ok(0.0),
            Value::Error(kind) => Err(*kind),
            Value::Ref(Reference::Cell(cell)) => {
                let (Bound::At(row), Bound::At(col)) = (cell.row, cell.col) else {
                    return Err(ErrorKind::Value);
                };
                let key = (
                    cell.sheet().unwrap_or_default().to_string(),
                    row as u32,
                    col as u32,
                );
                Ok(self.cells.get(&key).copied().unwrap_or(0.0))
            }
            _ => Err(ErrorKind::Value),
        }
    }

    /// A handful of operators and functions, enough to observe evaluation order and results.
    pub fn apply(&self, name: &str, args: &[Value]) -> Value {
        let nums: Result<Vec<f64>, ErrorKind> = args
            .iter()
            .filter(|v| !matches!(v, Value::Null))
            .map(|v| self.number(v))
            .collect();
        let nums = match nums {
            Ok(nums) => nums,
            Err(kind) => return Value::Error(kind),
        };
        let num = |n: f64| {
            if n.is_finite() {
                Value::Number(n)
            } else {
                Value::Error(ErrorKind::Num)
            }
        };
        match (name.to_ascii_uppercase().as_str(), nums.as_slice()) {
            ("BINARY+", [a, b]) => num(a + b),
            ("BINARY-", [a, b]) => num(a - b),
            ("BINARY*", [a, b]) => num(a * b),
            ("BINARY/", [_, b]) if *b == 0.0 => Value::Error(ErrorKind::Div0),
            ("BINARY/", [a, b]) => num(a / b),
            ("BINARY^", [a, b]) => num(a.powf(*b)),
            ("BINARY=", [a, b]) => Value::Bool(a == b),
            ("BINARY<", [a, b]) => Value::Bool(a < b),
            ("BINARY>", [a, b]) => Value::Bool(a > b),
            ("UNARY-", [a]) => num(-a),
            ("UNARY+", [a]) => num(*a),
            ("UNARY%", [a]) => num(a / 100.0),
            ("SUM", nums) => num(nums.iter().sum()),
            ("COUNT", nums) => Value::Number(nums.len() as f64),
            _ => Value::Error(ErrorKind::Name),
        }
    }
}

/// Answers every call before returning.
#[derive(Debug, Default)]
pub struct SyncHost {
    pub grid: Grid,
    pub calls: Vec<String>,
    pub args: Vec<Vec<Value>>,
    pub result: Option<Value>,
}

impl SyncHost {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            ..Self::default()
        }
    }
}

impl Host for SyncHost {
    fn invoke(&mut self, name: &str, k: Continuation, args: Vec<Value>) {
        let value = self.grid.apply(name, &args);
        self.calls.push(name.to_string());
        self.args.push(args);
        k.resume(self, value);
    }

    fn resolve(&mut self, value: Value) {
        assert!(self.result.is_none(), "resolved twice");
        self.result = Some(value);
    }
}

/// Queues every call; [`DeferredHost::run_pending`] answers them later, like a host waiting on
/// other cells.
#[derive(Debug, Default)]
pub struct DeferredHost {
    pub grid: Grid,
    pub queue: VecDeque<(String, Continuation, Vec<Value>)>,
    pub calls: Vec<String>,
    pub result: Option<Value>,
}

impl DeferredHost {
    pub fn run_pending(&mut self) {
        while let Some((name, k, args)) = self.queue.pop_front() {
            let value = self.grid.apply(&name, &args);
            self.calls.push(name);
            k.resume(self, value);
        }
    }
}

impl Host for DeferredHost {
    fn invoke(&mut self, name: &str, k: Continuation, args: Vec<Value>) {
        self.queue.push_back((name.to_string(), k, args));
    }

    fn resolve(&mut self, value: Value) {
        assert!(self.result.is_none(), "resolved twice");
        self.result = Some(value);
    }
}

pub fn compile(sheet: &str, row: u32, col: u32, text: &str) -> formula_calc::Formula {
    let parsed = formula_calc::parse_formula(sheet, row, col, text).expect("formula parses");
    formula_calc::compile(&parsed)
}

pub fn eval(text: &str, grid: Grid) -> SyncHost {
    let formula = compile("Sheet1", 0, 5, text);
    let mut host = SyncHost::new(grid);
    formula.evaluate(&mut host);
    host
}
