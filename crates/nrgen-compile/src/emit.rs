//! C source emission for lowered programs.
//!
//! Scalar programs emit plain C with integer literals inlined and every other
//! literal declared once. Vectorized programs declare every literal as a
//! double and broadcast it with `ConstSIMD`, and read grid values with
//! `ReadSIMD`.

use crate::config::LowerConfig;
use crate::program::{BinOp, Constant, Program, Target, Term};

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_ATOM: u8 = 5;

fn signed(n: i64) -> String {
    if n < 0 {
        format!("m{}", n.unsigned_abs())
    } else {
        n.to_string()
    }
}

/// C spelling of a literal. Non-finite values use the `<math.h>` macros.
fn c_literal(c: &Constant) -> String {
    match *c {
        Constant::Rational(p, 1) => format!("{p}.0"),
        Constant::Rational(p, q) => format!("{p}.0/{q}.0"),
        Constant::Float(bits) => {
            let v = f64::from_bits(bits);
            if v.is_nan() {
                "NAN".to_string()
            } else if v.is_infinite() {
                if v > 0.0 { "INFINITY" } else { "-INFINITY" }.to_string()
            } else {
                format!("{v:?}")
            }
        }
    }
}

struct Names<'a> {
    program: &'a Program,
    config: &'a LowerConfig,
    simd: bool,
}

impl Names<'_> {
    fn constant(&self, k: usize) -> String {
        let c = &self.program.constants[k];
        let name = match *c {
            Constant::Rational(-1, 1) => "NegativeOne_".to_string(),
            Constant::Rational(p, 1) => format!("Integer_{}", signed(p)),
            Constant::Rational(p, q) => format!("Rational_{}_{q}", signed(p)),
            Constant::Float(_) => format!("Float_{k}"),
        };
        if self.simd {
            format!("_{name}")
        } else {
            name
        }
    }

    fn temp(&self, k: usize) -> String {
        format!("{}{k}", self.config.temp_prefix)
    }

    fn operand(&self, t: &Term) -> Option<(String, u8)> {
        match *t {
            Term::Input(k) => Some((self.program.inputs[k].name(), PREC_ATOM)),
            Term::Temp(k) => Some((self.temp(k), PREC_ATOM)),
            Term::Const(k) => match self.program.constants[k].as_integer() {
                Some(n) if !self.simd && n < 0 => Some((n.to_string(), PREC_UNARY)),
                Some(n) if !self.simd => Some((n.to_string(), PREC_ATOM)),
                _ => Some((self.constant(k), PREC_ATOM)),
            },
            _ => None,
        }
    }

    fn at_least(&self, t: &Term, min: u8) -> String {
        let (s, p) = self.render(t);
        if p < min {
            format!("({s})")
        } else {
            s
        }
    }

    /// Render a term; C evaluates left to right, so right operands of
    /// same-precedence operators are always parenthesized.
    fn render(&self, t: &Term) -> (String, u8) {
        if let Some(op) = self.operand(t) {
            return op;
        }
        match t {
            Term::Neg(a) => (format!("-{}", self.at_least(a, PREC_ATOM)), PREC_UNARY),
            Term::Binary(BinOp::Add, a, b) => (
                format!("{} + {}", self.at_least(a, PREC_ADD), self.at_least(b, PREC_MUL)),
                PREC_ADD,
            ),
            Term::Binary(BinOp::Sub, a, b) => (
                format!("{} - {}", self.at_least(a, PREC_ADD), self.at_least(b, PREC_MUL)),
                PREC_ADD,
            ),
            Term::Binary(BinOp::Mul, a, b) => (
                format!("{}*{}", self.at_least(a, PREC_MUL), self.at_least(b, PREC_UNARY)),
                PREC_MUL,
            ),
            Term::Binary(BinOp::Div, a, b) => (
                format!("{}/{}", self.at_least(a, PREC_MUL), self.at_least(b, PREC_UNARY)),
                PREC_MUL,
            ),
            Term::Binary(BinOp::Pow, a, b) => {
                let base = self.render(a).0;
                let exp = match **b {
                    Term::Const(k) => self.program.constants[k].as_integer(),
                    _ => None,
                };
                let s = match exp {
                    Some(2) => format!("(({base})*({base}))"),
                    Some(3) => format!("(({base})*({base})*({base}))"),
                    Some(-1) => format!("(1.0/({base}))"),
                    _ => format!("pow({base}, {})", self.render(b).0),
                };
                (s, PREC_ATOM)
            }
            Term::Call(f, a) => (format!("{}({})", f.c_name(), self.render(a).0), PREC_ATOM),
            Term::Intrinsic(op, args) => {
                let args: Vec<String> = args.iter().map(|a| self.render(a).0).collect();
                (format!("{}({})", op.name(), args.join(", ")), PREC_ATOM)
            }
            Term::Input(_) | Term::Const(_) | Term::Temp(_) => (String::new(), PREC_ATOM),
        }
    }
}

impl Program {
    /// Emit the program as a C block.
    pub fn to_c(&self, config: &LowerConfig) -> String {
        let names = Names {
            program: self,
            config,
            simd: self.vector.is_some(),
        };
        let real = &config.real_type;
        let vec_type = self.vector.as_ref().map(|v| v.vec_type.as_str()).unwrap_or(real);
        let (open, indent) = if config.include_braces { ("{\n", "  ") } else { ("", "") };

        let mut src = String::with_capacity(1024);
        if config.verbose {
            src.push_str("/*\n");
            src.push_str(&format!(
                " *  {} outputs, {} inputs, {} temporaries, {} operations\n",
                self.outputs.len(),
                self.inputs.len(),
                self.num_temps,
                self.op_count()
            ));
            for (name, source) in self.outputs.iter().zip(&self.sources) {
                src.push_str(&format!(" *  {name} = {source}\n"));
            }
            src.push_str(" */\n");
        }
        src.push_str(open);

        // Constants
        for (k, c) in self.constants.iter().enumerate() {
            let name = names.constant(k);
            if names.simd {
                src.push_str(&format!("{indent}const double dbl{name} = {};\n", c_literal(c)));
                src.push_str(&format!("{indent}const {vec_type} {name} = ConstSIMD(dbl{name});\n"));
            } else if c.as_integer().is_none() {
                src.push_str(&format!("{indent}const {real} {name} = {};\n", c_literal(c)));
            }
        }

        // Grid reads
        for input in &self.inputs {
            if let Some(read) = &input.read {
                let name = input.name();
                if names.simd {
                    src.push_str(&format!("{indent}const {vec_type} {name} = ReadSIMD(&{read});\n"));
                } else {
                    src.push_str(&format!("{indent}const {real} {name} = {read};\n"));
                }
            }
        }

        // Temporaries and outputs
        for stmt in &self.statements {
            let rhs = names.render(&stmt.value).0;
            match stmt.target {
                Target::Temp(k) => {
                    src.push_str(&format!("{indent}const {vec_type} {} = {rhs};\n", names.temp(k)));
                }
                Target::Output(k) => {
                    let out = &self.outputs[k];
                    if names.simd && out.contains('[') {
                        src.push_str(&format!("{indent}WriteSIMD(&{out}, {rhs});\n"));
                    } else {
                        src.push_str(&format!("{indent}{out} = {rhs};\n"));
                    }
                }
            }
        }

        if config.include_braces {
            src.push_str("}\n");
        }
        src
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorConfig;
    use crate::program::{Input, Stmt};
    use crate::vectorize;
    use nrgen_expr::Symbol;

    #[test]
    fn non_finite_literals_are_valid_c() {
        assert_eq!(c_literal(&Constant::Float(f64::INFINITY.to_bits())), "INFINITY");
        assert_eq!(c_literal(&Constant::Float(f64::NEG_INFINITY.to_bits())), "-INFINITY");
        assert_eq!(c_literal(&Constant::Float(f64::NAN.to_bits())), "NAN");
        assert_eq!(c_literal(&Constant::Float(0.1f64.to_bits())), "0.1");
        assert_eq!(c_literal(&Constant::Float((-0.0f64).to_bits())), "-0.0");
    }

    fn sample() -> Program {
        // tmp0 = x + y; a = 1/2*tmp0*tmp0; b = tmp0 - (x - 2)
        Program {
            inputs: vec![
                Input {
                    symbol: Symbol::scalar("x"),
                    read: Some("in_gfs[IDX4(XGF, i0, i1, i2)]".into()),
                },
                Input { symbol: Symbol::scalar("y"), read: None },
            ],
            constants: vec![Constant::Rational(1, 2), Constant::Rational(2, 1)],
            statements: vec![
                Stmt {
                    target: Target::Temp(0),
                    value: Term::binary(BinOp::Add, Term::Input(0), Term::Input(1)),
                },
                Stmt {
                    target: Target::Output(0),
                    value: Term::binary(
                        BinOp::Mul,
                        Term::binary(BinOp::Mul, Term::Const(0), Term::Temp(0)),
                        Term::Temp(0),
                    ),
                },
                Stmt {
                    target: Target::Output(1),
                    value: Term::binary(
                        BinOp::Sub,
                        Term::Temp(0),
                        Term::binary(BinOp::Sub, Term::Input(0), Term::Const(1)),
                    ),
                },
            ],
            outputs: vec!["a".into(), "rhs[0]".into()],
            num_temps: 1,
            vector: None,
            sources: Vec::new(),
        }
    }

    #[test]
    fn scalar_c() {
        let src = sample().to_c(&LowerConfig::default());
        let expected = "{
  const REAL Rational_1_2 = 1.0/2.0;
  const REAL x = in_gfs[IDX4(XGF, i0, i1, i2)];
  const REAL tmp0 = x + y;
  a = Rational_1_2*tmp0*tmp0;
  rhs[0] = tmp0 - (x - 2);
}
";
        assert_eq!(src, expected);
    }

    #[test]
    fn simd_c() {
        let v = vectorize(&sample(), &VectorConfig::default());
        let cfg = LowerConfig { include_braces: false, ..LowerConfig::default() };
        let src = v.to_c(&cfg);
        let expected = "const double dbl_Rational_1_2 = 1.0/2.0;
const REAL_SIMD_ARRAY _Rational_1_2 = ConstSIMD(dbl_Rational_1_2);
const double dbl_Integer_2 = 2.0;
const REAL_SIMD_ARRAY _Integer_2 = ConstSIMD(dbl_Integer_2);
const REAL_SIMD_ARRAY x = ReadSIMD(&in_gfs[IDX4(XGF, i0, i1, i2)]);
const REAL_SIMD_ARRAY tmp0 = AddSIMD(x, y);
a = MulSIMD(MulSIMD(_Rational_1_2, tmp0), tmp0);
WriteSIMD(&rhs[0], SubSIMD(tmp0, SubSIMD(x, _Integer_2)));
";
        assert_eq!(src, expected);
    }

    #[test]
    fn verbose_header() {
        let mut p = sample();
        p.sources = vec!["(x + y)^2/2".into(), "y + 2".into()];
        let cfg = LowerConfig { verbose: true, ..LowerConfig::default() };
        let src = p.to_c(&cfg);
        assert!(src.starts_with("/*\n *  2 outputs, 2 inputs, 1 temporaries, 5 operations\n"));
        assert!(src.contains(" *  a = (x + y)^2/2\n"));
    }
}
