//! Lowered straight-line programs and their interpreter.
//!
//! A [`Program`] is an ordered list of assignments. Each right-hand side is
//! a small expression tree over inputs, constants and previously assigned
//! temporaries.

use nrgen_expr::eval::pow;
use nrgen_expr::node::rational_value;
use nrgen_expr::{Func, Symbol};

use crate::config::VectorConfig;

/// A free symbol the program reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub symbol: Symbol,
    /// Grid read expression for gridfunction values; `None` for symbols that
    /// are already in scope.
    pub read: Option<String>,
}

impl Input {
    /// Name of the local holding this value.
    pub fn name(&self) -> String {
        self.symbol.to_string()
    }
}

/// A literal the program uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Rational(i64, i64),
    Float(u64),
}

impl Constant {
    pub fn value(&self) -> f64 {
        match *self {
            Constant::Rational(p, q) => rational_value(p, q),
            Constant::Float(bits) => f64::from_bits(bits),
        }
    }

    /// The integer value, if this is an integer literal.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Constant::Rational(p, 1) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Vector-lane intrinsics produced by [`vectorize`](crate::vectorize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Add,
    Sub,
    Mul,
    Div,
    /// `a*b + c`
    FusedMulAdd,
    /// `a*b - c`
    FusedMulSub,
    /// `c - a*b`
    NegFusedMulAdd,
    Pow,
    Math(Func),
}

impl Intrinsic {
    /// Conventional intrinsic macro name.
    pub fn name(&self) -> String {
        match self {
            Intrinsic::Add => "AddSIMD".into(),
            Intrinsic::Sub => "SubSIMD".into(),
            Intrinsic::Mul => "MulSIMD".into(),
            Intrinsic::Div => "DivSIMD".into(),
            Intrinsic::FusedMulAdd => "FusedMulAddSIMD".into(),
            Intrinsic::FusedMulSub => "FusedMulSubSIMD".into(),
            Intrinsic::NegFusedMulAdd => "NegFusedMulAddSIMD".into(),
            Intrinsic::Pow => "PowSIMD".into(),
            Intrinsic::Math(Func::Upwind) => Func::Upwind.c_name().into(),
            Intrinsic::Math(f) => {
                let c = f.c_name();
                let mut name = c.trim_start_matches('f').to_string();
                if let Some(first) = name.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{name}SIMD")
            }
        }
    }

    fn apply(&self, args: &[f64]) -> f64 {
        match (self, args) {
            (Intrinsic::Add, [a, b]) => a + b,
            (Intrinsic::Sub, [a, b]) => a - b,
            (Intrinsic::Mul, [a, b]) => a * b,
            (Intrinsic::Div, [a, b]) => a / b,
            (Intrinsic::FusedMulAdd, [a, b, c]) => a.mul_add(*b, *c),
            (Intrinsic::FusedMulSub, [a, b, c]) => a.mul_add(*b, -c),
            (Intrinsic::NegFusedMulAdd, [a, b, c]) => (-a).mul_add(*b, *c),
            (Intrinsic::Pow, [a, b]) => pow(*a, *b),
            (Intrinsic::Math(f), [a]) => f.apply(*a),
            _ => f64::NAN,
        }
    }
}

/// Right-hand side expression of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Input(usize),
    Const(usize),
    Temp(usize),
    Neg(Box<Term>),
    Binary(BinOp, Box<Term>, Box<Term>),
    Call(Func, Box<Term>),
    Intrinsic(Intrinsic, Vec<Term>),
}

impl Term {
    pub fn binary(op: BinOp, a: Term, b: Term) -> Self {
        Term::Binary(op, Box::new(a), Box::new(b))
    }

    /// Whether this term is a bare operand (no operator).
    pub fn is_operand(&self) -> bool {
        matches!(self, Term::Input(_) | Term::Const(_) | Term::Temp(_))
    }

    /// Count operators in this term.
    pub fn op_count(&self) -> usize {
        match self {
            Term::Input(_) | Term::Const(_) | Term::Temp(_) => 0,
            Term::Neg(a) | Term::Call(_, a) => 1 + a.op_count(),
            Term::Binary(_, a, b) => 1 + a.op_count() + b.op_count(),
            Term::Intrinsic(_, args) => 1 + args.iter().map(Term::op_count).sum::<usize>(),
        }
    }
}

/// Assignment destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Temp(usize),
    Output(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub target: Target,
    pub value: Term,
}

/// A lowered batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub inputs: Vec<Input>,
    pub constants: Vec<Constant>,
    pub statements: Vec<Stmt>,
    /// Output targets, in batch order.
    pub outputs: Vec<String>,
    pub num_temps: usize,
    /// Set once the program has been rewritten into vector intrinsics.
    pub vector: Option<VectorConfig>,
    /// Infix rendering of each source expression, kept for verbose output.
    pub sources: Vec<String>,
}

impl Program {
    /// Run the program on one lane.
    ///
    /// `inputs[k]` is the value of `self.inputs[k]`. Returns one value per
    /// output, in batch order.
    pub fn eval(&self, inputs: &[f64]) -> Vec<f64> {
        let consts: Vec<f64> = self.constants.iter().map(Constant::value).collect();
        let mut temps = vec![0.0f64; self.num_temps];
        let mut outs = vec![0.0f64; self.outputs.len()];

        for stmt in &self.statements {
            let v = eval_term(&stmt.value, inputs, &consts, &temps);
            match stmt.target {
                Target::Temp(k) => temps[k] = v,
                Target::Output(k) => outs[k] = v,
            }
        }
        outs
    }

    /// Run the program, resolving inputs by symbol.
    pub fn eval_with(&self, value_of: impl Fn(&Symbol) -> f64) -> Vec<f64> {
        let inputs: Vec<f64> = self.inputs.iter().map(|i| value_of(&i.symbol)).collect();
        self.eval(&inputs)
    }

    /// Total operator count across all statements.
    pub fn op_count(&self) -> usize {
        self.statements.iter().map(|s| s.value.op_count()).sum()
    }
}

fn eval_term(t: &Term, inputs: &[f64], consts: &[f64], temps: &[f64]) -> f64 {
    let ev = |t: &Term| eval_term(t, inputs, consts, temps);
    match t {
        Term::Input(k) => inputs[*k],
        Term::Const(k) => consts[*k],
        Term::Temp(k) => temps[*k],
        Term::Neg(a) => -ev(a),
        Term::Binary(op, a, b) => {
            let (a, b) = (ev(a), ev(b));
            match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Pow => pow(a, b),
            }
        }
        Term::Call(f, a) => f.apply(ev(a)),
        Term::Intrinsic(op, args) => {
            let vals: Vec<f64> = args.iter().map(ev).collect();
            op.apply(&vals)
        }
    }
}
