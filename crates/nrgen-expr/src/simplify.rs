//! Pattern-matched simplification rules.
//!
//! Literal arithmetic is folded exactly on rationals. Rules that would change
//! the IEEE result of a non-literal expression (reassociation, distribution)
//! are never applied.

use std::collections::HashMap;

use num_rational::Ratio;

use crate::graph::ExprGraph;
use crate::node::{ExprId, Node};

impl ExprGraph {
    /// Simplify an expression by applying rewrite rules to fixpoint.
    ///
    /// Bottom-up: simplify children first, then match parent. Iterates
    /// until no more changes occur.
    pub fn simplify(&mut self, expr: ExprId) -> ExprId {
        let mut memo = HashMap::new();
        self.simplify_inner(expr, &mut memo)
    }

    /// Simplify several expressions, sharing work between them.
    pub fn simplify_all(&mut self, exprs: &[ExprId]) -> Vec<ExprId> {
        let mut memo = HashMap::new();
        exprs.iter().map(|&e| self.simplify_inner(e, &mut memo)).collect()
    }

    fn simplify_inner(&mut self, expr: ExprId, memo: &mut HashMap<ExprId, ExprId>) -> ExprId {
        if let Some(&cached) = memo.get(&expr) {
            return cached;
        }

        // First, simplify children
        let simplified_children = match self.node(expr) {
            Node::Sym(_) | Node::Rational(..) | Node::Float(_) => expr,
            Node::Add(a, b) => {
                let sa = self.simplify_inner(a, memo);
                let sb = self.simplify_inner(b, memo);
                self.add(sa, sb)
            }
            Node::Mul(a, b) => {
                let sa = self.simplify_inner(a, memo);
                let sb = self.simplify_inner(b, memo);
                self.mul(sa, sb)
            }
            Node::Div(a, b) => {
                let sa = self.simplify_inner(a, memo);
                let sb = self.simplify_inner(b, memo);
                self.div(sa, sb)
            }
            Node::Pow(a, b) => {
                let sa = self.simplify_inner(a, memo);
                let sb = self.simplify_inner(b, memo);
                self.pow(sa, sb)
            }
            Node::Neg(a) => {
                let sa = self.simplify_inner(a, memo);
                self.neg(sa)
            }
            Node::Call(f, a) => {
                let sa = self.simplify_inner(a, memo);
                self.call(f, sa)
            }
        };

        // Now apply rewrite rules on the node with simplified children
        let result = self.rewrite(simplified_children);

        // If rewrite changed something, simplify again (fixpoint)
        let final_result = if result != simplified_children {
            self.simplify_inner(result, memo)
        } else {
            result
        };

        memo.insert(expr, final_result);
        final_result
    }

    fn ratio(&self, id: ExprId) -> Option<Ratio<i128>> {
        self.node(id)
            .as_rational()
            .map(|(p, q)| Ratio::new(p as i128, q as i128))
    }

    /// Intern an exact result, or give up if it does not fit in i64.
    fn rational_from(&mut self, r: Ratio<i128>) -> Option<ExprId> {
        let p = i64::try_from(*r.numer()).ok()?;
        let q = i64::try_from(*r.denom()).ok()?;
        Some(self.rational(p, q))
    }

    /// Apply one round of rewrite rules.
    fn rewrite(&mut self, expr: ExprId) -> ExprId {
        let minus_one = Node::Rational(-1, 1);
        match self.node(expr) {
            // --- Identity / Annihilation ---
            Node::Add(a, b) if a == ExprId::ZERO => b,
            Node::Add(a, b) if b == ExprId::ZERO => a,
            Node::Mul(a, b) if a == ExprId::ONE => b,
            Node::Mul(a, b) if b == ExprId::ONE => a,
            Node::Mul(a, b) if a == ExprId::ZERO || b == ExprId::ZERO => ExprId::ZERO,
            Node::Mul(a, b) if self.node(a) == minus_one => self.neg(b),
            Node::Mul(a, b) if self.node(b) == minus_one => self.neg(a),
            Node::Div(a, b) if b == ExprId::ONE => a,
            Node::Div(a, _) if a == ExprId::ZERO => ExprId::ZERO,
            Node::Pow(a, b) if b == ExprId::ONE => a,
            Node::Pow(_, b) if b == ExprId::ZERO => ExprId::ONE,

            Node::Neg(a) => match self.node(a) {
                // Neg(Neg(x)) → x
                Node::Neg(inner) => inner,
                Node::Rational(p, q) => match p.checked_neg() {
                    Some(np) => self.rational(np, q),
                    None => expr,
                },
                Node::Float(bits) => self.float(-f64::from_bits(bits)),
                _ => expr,
            },

            Node::Add(a, b) => {
                // Add(x, Neg(x)) → ZERO
                if self.node(b) == Node::Neg(a) || self.node(a) == Node::Neg(b) {
                    return ExprId::ZERO;
                }
                if let (Some(ra), Some(rb)) = (self.ratio(a), self.ratio(b)) {
                    return self.rational_from(ra + rb).unwrap_or(expr);
                }
                if let (Some(va), Some(vb)) = (self.node(a).as_f64(), self.node(b).as_f64()) {
                    return self.float(va + vb);
                }
                expr
            }

            Node::Mul(a, b) => {
                if let (Some(ra), Some(rb)) = (self.ratio(a), self.ratio(b)) {
                    return self.rational_from(ra * rb).unwrap_or(expr);
                }
                if let (Some(va), Some(vb)) = (self.node(a).as_f64(), self.node(b).as_f64()) {
                    return self.float(va * vb);
                }
                expr
            }

            Node::Div(a, b) => {
                if let (Some(ra), Some(rb)) = (self.ratio(a), self.ratio(b)) {
                    if rb == Ratio::from_integer(0) {
                        return expr;
                    }
                    return self.rational_from(ra / rb).unwrap_or(expr);
                }
                expr
            }

            Node::Pow(a, b) => {
                // Exact small integer powers of rationals.
                if let (Some(ra), Some((n, 1))) = (self.ratio(a), self.node(b).as_rational()) {
                    if n.unsigned_abs() <= 16 && !(n < 0 && ra == Ratio::from_integer(0)) {
                        if let Some(r) = checked_powi(ra, n) {
                            return self.rational_from(r).unwrap_or(expr);
                        }
                    }
                }
                expr
            }

            _ => expr,
        }
    }
}

fn checked_powi(base: Ratio<i128>, n: i64) -> Option<Ratio<i128>> {
    let mut num: i128 = 1;
    let mut den: i128 = 1;
    for _ in 0..n.unsigned_abs() {
        num = num.checked_mul(*base.numer())?;
        den = den.checked_mul(*base.denom())?;
    }
    let r = Ratio::new(num, den);
    Some(if n < 0 { r.recip() } else { r })
}
