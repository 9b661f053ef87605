//! nrgen-tensor: indexed symbolic tensors with declared slot symmetries.
//!
//! Tensors are flat containers of [`ExprId`](nrgen_expr::ExprId) handles in
//! the thread-local expression graph. Declaring a tensor generates one free
//! symbol per independent component; contraction is ordinary iteration:
//!
//! ```
//! use nrgen_expr::{trace, ExprId};
//! use nrgen_tensor::{declare, zero};
//!
//! let (g, trace_k) = trace(|| {
//!     let gamma_uu = declare("gammaUU", 2, 3, "sym01").unwrap();
//!     let k_dd = declare("KDD", 2, 3, "sym01").unwrap();
//!     let mut sum = ExprId::ZERO;
//!     for i in 0..3 {
//!         for j in 0..3 {
//!             sum += gamma_uu[&[i, j][..]] * k_dd[&[i, j][..]];
//!         }
//!     }
//!     let _acc = zero(1, 3).unwrap();
//!     sum
//! });
//! assert_eq!(g.free_symbols(&[trace_k]).len(), 12);
//! ```

pub mod error;
pub mod indexed;
pub mod shape;
pub mod symmetry;

pub use error::{Result, TensorError};
pub use indexed::{
    declare, declare_derivative, declare_dissipation, declare_upwind, declare_with, zero, zero_with,
    IndexedTensor,
};
pub use shape::{Shape, MAX_RANK};
pub use symmetry::{Canonical, PairKind, SlotPair, Symmetry};
