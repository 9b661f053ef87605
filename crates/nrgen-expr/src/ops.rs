//! Operator overloads for `ExprId`.
//!
//! Every operator inserts into the thread-local expression graph.

use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::node::{ExprId, Func};
use crate::with_graph;

// --- Operator impls (all delegate to graph ops) ---

impl Add for ExprId {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        with_graph(|g| g.add(self, rhs))
    }
}

impl Sub for ExprId {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        with_graph(|g| g.sub(self, rhs))
    }
}

impl Mul for ExprId {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        with_graph(|g| g.mul(self, rhs))
    }
}

impl Div for ExprId {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        with_graph(|g| g.div(self, rhs))
    }
}

impl Neg for ExprId {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        with_graph(|g| g.neg(self))
    }
}

impl AddAssign for ExprId {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for ExprId {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for ExprId {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for ExprId {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

/// Left-to-right sum; the empty sum is zero.
impl Sum for ExprId {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.reduce(|acc, x| acc + x).unwrap_or(ExprId::ZERO)
    }
}

/// Left-to-right product; the empty product is one.
impl Product for ExprId {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.reduce(|acc, x| acc * x).unwrap_or(ExprId::ONE)
    }
}

// --- Elementary functions ---

impl ExprId {
    /// `self ^ exp`.
    #[inline]
    pub fn pow(self, exp: Self) -> Self {
        with_graph(|g| g.pow(self, exp))
    }

    /// `self ^ n` for an integer `n`.
    #[inline]
    pub fn powi(self, n: i64) -> Self {
        with_graph(|g| g.powi(self, n))
    }

    #[inline]
    fn call(self, func: Func) -> Self {
        with_graph(|g| g.call(func, self))
    }

    pub fn sqrt(self) -> Self {
        self.call(Func::Sqrt)
    }

    pub fn cbrt(self) -> Self {
        self.call(Func::Cbrt)
    }

    pub fn exp(self) -> Self {
        self.call(Func::Exp)
    }

    /// Natural logarithm.
    pub fn ln(self) -> Self {
        self.call(Func::Log)
    }

    pub fn sin(self) -> Self {
        self.call(Func::Sin)
    }

    pub fn cos(self) -> Self {
        self.call(Func::Cos)
    }

    pub fn tan(self) -> Self {
        self.call(Func::Tan)
    }

    pub fn asin(self) -> Self {
        self.call(Func::Asin)
    }

    pub fn acos(self) -> Self {
        self.call(Func::Acos)
    }

    pub fn atan(self) -> Self {
        self.call(Func::Atan)
    }

    pub fn sinh(self) -> Self {
        self.call(Func::Sinh)
    }

    pub fn cosh(self) -> Self {
        self.call(Func::Cosh)
    }

    pub fn tanh(self) -> Self {
        self.call(Func::Tanh)
    }

    pub fn abs(self) -> Self {
        self.call(Func::Abs)
    }
}
