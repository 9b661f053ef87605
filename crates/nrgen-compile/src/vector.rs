//! Vector-intrinsic lowering of a scalar program.
//!
//! Runs after CSE so that every constant is broadcast once, no matter how
//! many statements use it.

use crate::config::VectorConfig;
use crate::program::{BinOp, Constant, Intrinsic, Program, Stmt, Term};

struct Lowering {
    constants: Vec<Constant>,
    fma: bool,
}

impl Lowering {
    fn constant(&mut self, c: Constant) -> Term {
        let k = match self.constants.iter().position(|&x| x == c) {
            Some(k) => k,
            None => {
                self.constants.push(c);
                self.constants.len() - 1
            }
        };
        Term::Const(k)
    }

    fn integer_exponent(&self, t: &Term) -> Option<i64> {
        match t {
            Term::Const(k) => self.constants[*k].as_integer(),
            _ => None,
        }
    }

    fn call(op: Intrinsic, args: Vec<Term>) -> Term {
        Term::Intrinsic(op, args)
    }

    fn lower(&mut self, t: &Term) -> Term {
        match t {
            Term::Input(_) | Term::Const(_) | Term::Temp(_) | Term::Intrinsic(..) => t.clone(),
            Term::Neg(a) => {
                let minus_one = self.constant(Constant::Rational(-1, 1));
                let a = self.lower(a);
                Self::call(Intrinsic::Mul, vec![minus_one, a])
            }
            Term::Call(f, a) => {
                let a = self.lower(a);
                Self::call(Intrinsic::Math(*f), vec![a])
            }
            Term::Binary(BinOp::Add, a, b) if self.fma => match (a.as_ref(), b.as_ref()) {
                (Term::Binary(BinOp::Mul, x, y), c) | (c, Term::Binary(BinOp::Mul, x, y)) => {
                    let args = vec![self.lower(x), self.lower(y), self.lower(c)];
                    Self::call(Intrinsic::FusedMulAdd, args)
                }
                _ => self.plain(BinOp::Add, a, b),
            },
            Term::Binary(BinOp::Sub, a, b) if self.fma => match (a.as_ref(), b.as_ref()) {
                (Term::Binary(BinOp::Mul, x, y), c) => {
                    let args = vec![self.lower(x), self.lower(y), self.lower(c)];
                    Self::call(Intrinsic::FusedMulSub, args)
                }
                (c, Term::Binary(BinOp::Mul, x, y)) => {
                    let args = vec![self.lower(x), self.lower(y), self.lower(c)];
                    Self::call(Intrinsic::NegFusedMulAdd, args)
                }
                _ => self.plain(BinOp::Sub, a, b),
            },
            Term::Binary(BinOp::Pow, a, b) => {
                let base = self.lower(a);
                match self.integer_exponent(b) {
                    Some(2) => Self::call(Intrinsic::Mul, vec![base.clone(), base]),
                    Some(3) => {
                        let sq = Self::call(Intrinsic::Mul, vec![base.clone(), base.clone()]);
                        Self::call(Intrinsic::Mul, vec![sq, base])
                    }
                    Some(-1) => {
                        let one = self.constant(Constant::Rational(1, 1));
                        Self::call(Intrinsic::Div, vec![one, base])
                    }
                    _ => {
                        let exp = self.lower(b);
                        Self::call(Intrinsic::Pow, vec![base, exp])
                    }
                }
            }
            Term::Binary(op, a, b) => self.plain(*op, a, b),
        }
    }

    fn plain(&mut self, op: BinOp, a: &Term, b: &Term) -> Term {
        let intrinsic = match op {
            BinOp::Add => Intrinsic::Add,
            BinOp::Sub => Intrinsic::Sub,
            BinOp::Mul => Intrinsic::Mul,
            BinOp::Div => Intrinsic::Div,
            BinOp::Pow => Intrinsic::Pow,
        };
        let args = vec![self.lower(a), self.lower(b)];
        Self::call(intrinsic, args)
    }
}

/// Rewrite every arithmetic operator in `program` into a vector intrinsic.
///
/// Negation becomes a multiply by a broadcast `-1`; small integer powers
/// become multiplies. Fractional powers stay `PowSIMD`, since `sqrt` and
/// `pow(x, 0.5)` disagree at `-0` and `-inf`. Without FMA fusion the rewritten program evaluates
/// each lane to the same bits as the scalar one, except for `x^3`, whose
/// association may differ from `powi`.
pub fn vectorize(program: &Program, config: &VectorConfig) -> Program {
    let mut lowering = Lowering {
        constants: program.constants.clone(),
        fma: config.fma,
    };
    let statements = program
        .statements
        .iter()
        .map(|s| Stmt {
            target: s.target,
            value: lowering.lower(&s.value),
        })
        .collect();

    Program {
        inputs: program.inputs.clone(),
        constants: lowering.constants,
        statements,
        outputs: program.outputs.clone(),
        num_temps: program.num_temps,
        vector: Some(config.clone()),
        sources: program.sources.clone(),
    }
}
