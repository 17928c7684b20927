//! Lowers CPS terms into a graph of closures.
//!
//! Variables resolve at generation time to a depth in the runtime binding chain, and reference
//! atoms to an index into the table carried by the [`Scope`]. The generated code holds no
//! formula-specific data, so one body serves every formula with the same shape.

use std::sync::Arc;

use crate::cps::{Atom, Lambda, Term, Var};
use crate::eval::{Body, Continuation, Host, Scope, Thunk};
use crate::Value;

type Load = Arc<dyn Fn(&Scope) -> Value + Send + Sync>;

/// Variables in scope at the node being generated, innermost last.
#[derive(Default)]
struct Env {
    vars: Vec<Var>,
}

impl Env {
    fn depth(&self, var: Var) -> usize {
        match self.vars.iter().rev().position(|v| *v == var) {
            Some(depth) => depth,
            None => unreachable!("unbound variable {var}"),
        }
    }
}

/// Generate the body for a whole transformed formula. Run it with [`Scope::new`].
pub(crate) fn generate(term: &Term) -> Body {
    term_body(term, &mut Env::default())
}

fn body(f: impl Fn(Scope, &mut dyn Host) + Send + Sync + 'static) -> Body {
    Arc::new(f)
}

fn loader(f: impl Fn(&Scope) -> Value + Send + Sync + 'static) -> Load {
    Arc::new(f)
}

fn term_body(term: &Term, env: &mut Env) -> Body {
    match term {
        Term::Return(atom) => {
            let value = load(atom, env);
            body(move |scope, host| host.resolve(value(&scope)))
        }
        Term::Resume { k, value } => {
            let depth = env.depth(*k);
            let value = load(value, env);
            body(move |scope, host| {
                let v = value(&scope);
                scope.continuation(depth).resume(host, v)
            })
        }
        Term::Call { name, k, args } => {
            let name: Arc<str> = Arc::from(name.as_str());
            let args: Vec<Load> = args.iter().map(|a| load(a, env)).collect();
            let k = lambda_body(k, env);
            body(move |scope, host| {
                let args = args.iter().map(|a| a(&scope)).collect();
                host.invoke(&name, Continuation::new(k.clone(), scope), args)
            })
        }
        Term::Branch {
            cond,
            then,
            otherwise,
            k,
        } => {
            let cond = load(cond, env);
            let then = lambda_body(then, env);
            let otherwise = lambda_body(otherwise, env);
            let k = lambda_body(k, env);
            body(move |scope, host| {
                let cond = cond(&scope);
                let then = Thunk::new(then.clone(), scope.clone());
                let otherwise = Thunk::new(otherwise.clone(), scope.clone());
                host.branch(cond, then, otherwise, Continuation::new(k.clone(), scope))
            })
        }
    }
}

fn lambda_body(lambda: &Lambda, env: &mut Env) -> Body {
    env.vars.push(lambda.param);
    let body = term_body(&lambda.body, env);
    env.vars.pop();
    body
}

fn load(atom: &Atom, env: &Env) -> Load {
    match atom {
        Atom::Number(n) => {
            let n = *n;
            loader(move |_| Value::Number(n))
        }
        Atom::String(s) => {
            let s = s.clone();
            loader(move |_| Value::String(s.clone()))
        }
        Atom::Bool(b) => {
            let b = *b;
            loader(move |_| Value::Bool(b))
        }
        Atom::Error(kind) => {
            let kind = *kind;
            loader(move |_| Value::Error(kind))
        }
        Atom::Null => loader(|_| Value::Null),
        Atom::Ref(index) => {
            let index = *index;
            loader(move |scope| scope.reference(index))
        }
        Atom::Var(var) => {
            let depth = env.depth(*var);
            loader(move |scope| scope.value(depth))
        }
        Atom::Matrix(rows) => {
            let rows: Vec<Vec<Load>> = rows
                .iter()
                .map(|row| row.iter().map(|cell| load(cell, env)).collect())
                .collect();
            loader(move |scope| {
                Value::Matrix(
                    rows.iter()
                        .map(|row| row.iter().map(|cell| cell(scope)).collect())
                        .collect(),
                )
            })
        }
    }
}
