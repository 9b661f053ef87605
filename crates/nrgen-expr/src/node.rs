//! Expression node types, ExprId and SymId handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle into the expression graph. Lightweight (4 bytes), Copy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) u32);

/// Well-known node indices, pre-populated in every graph.
impl ExprId {
    /// The rational 0 (index 0).
    pub const ZERO: Self = Self(0);
    /// The rational 1 (index 1).
    pub const ONE: Self = Self(1);
    /// The rational 2 (index 2).
    pub const TWO: Self = Self(2);

    /// Create an ExprId from a raw index.
    #[inline]
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// The raw index of this expression in the graph.
    #[inline]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Handle into the graph's symbol table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymId(pub(crate) u32);

impl SymId {
    /// The raw index of this symbol in the graph's symbol table.
    #[inline]
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Unary transcendental and elementary functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Func {
    Sqrt,
    Cbrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Abs,
    /// Upwind selector: 1 for a positive argument, otherwise 0.
    Upwind,
}

impl Func {
    /// The C math library spelling.
    pub fn c_name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Cbrt => "cbrt",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Abs => "fabs",
            Func::Upwind => "UPWIND_ALG",
        }
    }

    /// Apply the function to a double.
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sqrt => x.sqrt(),
            Func::Cbrt => x.cbrt(),
            Func::Exp => x.exp(),
            Func::Log => x.ln(),
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Abs => x.abs(),
            Func::Upwind => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// A node in the expression graph.
///
/// Three atom types plus seven operators. Subtraction is `Add(a, Neg(b))`;
/// division is kept as its own node so that emitted code divides exactly
/// where the expression divides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    // Atoms
    /// Named symbol, resolved through the graph's symbol table.
    Sym(SymId),
    /// Exact rational `p / q`, normalized with `q > 0`.
    Rational(i64, i64),
    /// Inexact literal stored as bits for Hash/Eq.
    Float(u64),

    // Operators
    /// Addition (operands in canonical order).
    Add(ExprId, ExprId),
    /// Multiplication (operands in canonical order).
    Mul(ExprId, ExprId),
    /// Negation.
    Neg(ExprId),
    /// Division.
    Div(ExprId, ExprId),
    /// Power `base ^ exponent`.
    Pow(ExprId, ExprId),
    /// Unary function call.
    Call(Func, ExprId),
}

impl Node {
    /// Create a `Float` node from an f64 value.
    #[inline]
    pub fn float(v: f64) -> Self {
        Self::Float(v.to_bits())
    }

    /// Numeric value of a literal node, or `None`.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Rational(p, q) => Some(rational_value(p, q)),
            Self::Float(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }

    /// `(p, q)` of a rational literal, or `None`.
    #[inline]
    pub fn as_rational(&self) -> Option<(i64, i64)> {
        match *self {
            Self::Rational(p, q) => Some((p, q)),
            _ => None,
        }
    }

    /// Whether this node has no children.
    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self, Self::Sym(_) | Self::Rational(..) | Self::Float(_))
    }

    /// Whether this node is a literal.
    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Rational(..) | Self::Float(_))
    }

    /// Visit the children in operand order.
    pub fn for_each_child(&self, mut f: impl FnMut(ExprId)) {
        match *self {
            Self::Sym(_) | Self::Rational(..) | Self::Float(_) => {}
            Self::Add(a, b) | Self::Mul(a, b) | Self::Div(a, b) | Self::Pow(a, b) => {
                f(a);
                f(b);
            }
            Self::Neg(a) | Self::Call(_, a) => f(a),
        }
    }

    /// Rebuild this node with every child passed through `f`.
    pub fn map_children(self, mut f: impl FnMut(ExprId) -> ExprId) -> Self {
        match self {
            Self::Sym(_) | Self::Rational(..) | Self::Float(_) => self,
            Self::Add(a, b) => Self::Add(f(a), f(b)),
            Self::Mul(a, b) => Self::Mul(f(a), f(b)),
            Self::Div(a, b) => Self::Div(f(a), f(b)),
            Self::Pow(a, b) => Self::Pow(f(a), f(b)),
            Self::Neg(a) => Self::Neg(f(a)),
            Self::Call(func, a) => Self::Call(func, f(a)),
        }
    }
}

/// Double-precision value of `p / q`, a single correctly rounded division.
#[inline]
pub fn rational_value(p: i64, q: i64) -> f64 {
    p as f64 / q as f64
}
