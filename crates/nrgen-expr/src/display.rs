//! Pretty-printing for expressions.

use crate::graph::ExprGraph;
use crate::node::{ExprId, Node};

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

impl ExprGraph {
    /// Format an expression as a human-readable infix string.
    ///
    /// `Add(a, Neg(b))` prints as `a - b`; parentheses appear only where
    /// precedence requires them.
    pub fn fmt_expr(&self, expr: ExprId) -> String {
        self.fmt_prec(expr).0
    }

    fn fmt_at_least(&self, expr: ExprId, min: u8) -> String {
        let (s, p) = self.fmt_prec(expr);
        if p < min {
            format!("({s})")
        } else {
            s
        }
    }

    fn fmt_prec(&self, expr: ExprId) -> (String, u8) {
        match self.node(expr) {
            Node::Sym(s) => (self.symbol(s).to_string(), PREC_ATOM),
            Node::Rational(p, 1) if p < 0 => (p.to_string(), PREC_UNARY),
            Node::Rational(p, 1) => (p.to_string(), PREC_ATOM),
            Node::Rational(p, q) => (format!("{p}/{q}"), PREC_MUL),
            Node::Float(bits) => {
                let v = f64::from_bits(bits);
                let prec = if v.is_sign_negative() { PREC_UNARY } else { PREC_ATOM };
                (format!("{v:?}"), prec)
            }
            Node::Add(a, b) => {
                if let Node::Neg(c) = self.node(b) {
                    let s = format!("{} - {}", self.fmt_at_least(a, PREC_ADD), self.fmt_at_least(c, PREC_MUL));
                    return (s, PREC_ADD);
                }
                if let Node::Neg(c) = self.node(a) {
                    let s = format!("{} - {}", self.fmt_at_least(b, PREC_ADD), self.fmt_at_least(c, PREC_MUL));
                    return (s, PREC_ADD);
                }
                let s = format!("{} + {}", self.fmt_at_least(a, PREC_ADD), self.fmt_at_least(b, PREC_ADD));
                (s, PREC_ADD)
            }
            Node::Mul(a, b) => {
                let s = format!("{}*{}", self.fmt_at_least(a, PREC_MUL), self.fmt_at_least(b, PREC_UNARY));
                (s, PREC_MUL)
            }
            Node::Div(a, b) => {
                let s = format!("{}/{}", self.fmt_at_least(a, PREC_MUL), self.fmt_at_least(b, PREC_UNARY));
                (s, PREC_MUL)
            }
            Node::Neg(a) => (format!("-{}", self.fmt_at_least(a, PREC_UNARY)), PREC_UNARY),
            Node::Pow(a, b) => {
                let s = format!("{}^{}", self.fmt_at_least(a, PREC_ATOM), self.fmt_at_least(b, PREC_POW));
                (s, PREC_POW)
            }
            Node::Call(f, a) => (format!("{}({})", f.c_name(), self.fmt_expr(a)), PREC_ATOM),
        }
    }
}
