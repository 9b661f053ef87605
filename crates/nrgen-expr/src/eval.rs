//! Double-precision evaluation of expression graphs.

use crate::graph::ExprGraph;
use crate::node::{ExprId, Node};
use crate::symbol::Symbol;

/// `base ^ exp`, using `powi` when the exponent is integral.
///
/// Shared with the lowered-program interpreter so both evaluate powers the
/// same way.
#[inline]
pub fn pow(base: f64, exp: f64) -> f64 {
    if exp.fract() == 0.0 && exp.abs() <= i32::MAX as f64 {
        base.powi(exp as i32)
    } else {
        base.powf(exp)
    }
}

impl ExprGraph {
    /// Evaluate an expression with concrete inputs.
    ///
    /// `inputs[n]` provides the value for the symbol with `SymId` index `n`.
    /// Walks the graph in topological order (which is just index order, since
    /// children are always created before parents).
    pub fn eval(&self, expr: ExprId, inputs: &[f64]) -> f64 {
        self.eval_many_with(&[expr], |_, sid| inputs[sid])[0]
    }

    /// Evaluate an expression, resolving each symbol through `value_of`.
    ///
    /// Only symbols reachable from `expr` are queried.
    pub fn eval_with(&self, expr: ExprId, value_of: impl Fn(&Symbol) -> f64) -> f64 {
        self.eval_many_with(&[expr], |sym, _| value_of(sym))[0]
    }

    /// Evaluate multiple output expressions, sharing intermediate values.
    pub fn eval_many(&self, exprs: &[ExprId], value_of: impl Fn(&Symbol) -> f64) -> Vec<f64> {
        self.eval_many_with(exprs, |sym, _| value_of(sym))
    }

    fn eval_many_with(&self, exprs: &[ExprId], value_of: impl Fn(&Symbol, usize) -> f64) -> Vec<f64> {
        let Some(max_id) = exprs.iter().map(|e| e.0).max() else {
            return Vec::new();
        };
        let n = max_id as usize + 1;
        let live = self.live_mask(exprs);
        let mut vals = vec![0.0f64; n];

        for i in 0..n {
            if !live[i] {
                continue;
            }
            vals[i] = match self.node(ExprId(i as u32)) {
                Node::Sym(s) => value_of(self.symbol(s), s.0 as usize),
                lit @ (Node::Rational(..) | Node::Float(_)) => lit.as_f64().unwrap_or_default(),
                Node::Add(a, b) => vals[a.0 as usize] + vals[b.0 as usize],
                Node::Mul(a, b) => vals[a.0 as usize] * vals[b.0 as usize],
                Node::Neg(a) => -vals[a.0 as usize],
                Node::Div(a, b) => vals[a.0 as usize] / vals[b.0 as usize],
                Node::Pow(a, b) => pow(vals[a.0 as usize], vals[b.0 as usize]),
                Node::Call(f, a) => f.apply(vals[a.0 as usize]),
            };
        }

        exprs.iter().map(|e| vals[e.0 as usize]).collect()
    }
}
