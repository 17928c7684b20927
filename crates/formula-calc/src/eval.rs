//! Runtime contract between generated code and the recalculation host.
//!
//! Generated code never returns a value. It calls into the [`Host`] with a [`Continuation`]
//! that the host resumes, immediately or later, with the result. A host that needs to wait
//! for another cell can keep the continuation and resume it once the value is known.

use std::fmt;
use std::sync::Arc;

use formula_refs::Reference;

use crate::{ErrorKind, Value};

/// Compiled code for one continuation body.
pub(crate) type Body = Arc<dyn Fn(Scope, &mut dyn Host) + Send + Sync>;

/// Recalculation engine hooks used by compiled formulas.
pub trait Host: AsDynHost {
    /// Call function `name` (including operators such as `binary+` and `unary-`) and
    /// eventually resume `k` with its result.
    fn invoke(&mut self, name: &str, k: Continuation, args: Vec<Value>);

    /// Truthiness used by `IF`, `AND` and `OR`. `Err` carries the value to produce instead,
    /// usually an error.
    fn coerce_bool(&self, value: &Value) -> Result<bool, Value> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Null => Ok(false),
            Value::String(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
            Value::Error(kind) => Err(Value::Error(*kind)),
            _ => Err(Value::Error(ErrorKind::Value)),
        }
    }

    /// Run exactly one of the arms with `k`, or resume `k` with the coercion error.
    fn branch(&mut self, cond: Value, then: Thunk, otherwise: Thunk, k: Continuation) {
        match self.coerce_bool(&cond) {
            Ok(true) => then.run(self.as_dyn_host(), k),
            Ok(false) => otherwise.run(self.as_dyn_host(), k),
            Err(err) => k.resume(self.as_dyn_host(), err),
        }
    }

    /// Receives the final value of the formula.
    fn resolve(&mut self, value: Value);
}

/// Lets provided [`Host`] methods hand `self` to code expecting `&mut dyn Host`.
pub trait AsDynHost {
    fn as_dyn_host(&mut self) -> &mut dyn Host;
}

impl<T: Host> AsDynHost for T {
    fn as_dyn_host(&mut self) -> &mut dyn Host {
        self
    }
}

/// "The rest of the formula", waiting for one value.
#[derive(Clone)]
pub struct Continuation {
    body: Body,
    scope: Scope,
}

impl Continuation {
    pub(crate) fn new(body: Body, scope: Scope) -> Self {
        Self { body, scope }
    }

    pub fn resume(self, host: &mut dyn Host, value: Value) {
        let scope = self.scope.bind(Slot::Value(value));
        (self.body)(scope, host)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// One arm of a conditional, not yet evaluated.
#[derive(Clone)]
pub struct Thunk {
    body: Body,
    scope: Scope,
}

impl Thunk {
    pub(crate) fn new(body: Body, scope: Scope) -> Self {
        Self { body, scope }
    }

    /// Evaluate the arm; its value goes to `k`.
    pub fn run(self, host: &mut dyn Host, k: Continuation) {
        let scope = self.scope.bind(Slot::Cont(k));
        (self.body)(scope, host)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Slot {
    Value(Value),
    Cont(Continuation),
}

#[derive(Debug)]
pub(crate) struct Binding {
    slot: Slot,
    next: Option<Arc<Binding>>,
}

/// Evaluation context: the formula's reference table and the bound variables, innermost first.
#[derive(Clone, Debug)]
pub(crate) struct Scope {
    refs: Arc<[Reference]>,
    env: Option<Arc<Binding>>,
}

impl Scope {
    pub fn new(refs: Arc<[Reference]>) -> Self {
        Self { refs, env: None }
    }

    pub fn bind(self, slot: Slot) -> Self {
        Self {
            refs: self.refs,
            env: Some(Arc::new(Binding {
                slot,
                next: self.env,
            })),
        }
    }

    /// Reference slot `index`, or `#REF!` when it is missing or off the grid.
    pub fn reference(&self, index: usize) -> Value {
        match self.refs.get(index) {
            Some(r) if r.is_valid() => Value::Ref(r.clone()),
            _ => Value::Error(ErrorKind::Ref),
        }
    }

    fn slot(&self, depth: usize) -> &Slot {
        let mut binding = self.env.as_deref();
        for _ in 0..depth {
            binding = binding.and_then(|b| b.next.as_deref());
        }
        match binding {
            Some(b) => &b.slot,
            None => unreachable!("variable at depth {depth} is not bound"),
        }
    }

    pub fn value(&self, depth: usize) -> Value {
        match self.slot(depth) {
            Slot::Value(value) => value.clone(),
            Slot::Cont(_) => unreachable!("continuation bound where a value was expected"),
        }
    }

    pub fn continuation(&self, depth: usize) -> Continuation {
        match self.slot(depth) {
            Slot::Cont(k) => k.clone(),
            Slot::Value(_) => unreachable!("value bound where a continuation was expected"),
        }
    }
}
