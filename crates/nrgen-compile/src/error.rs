//! Lowering errors

use thiserror::Error;

/// Lowering result type
pub type Result<T> = std::result::Result<T, LowerError>;

/// Errors raised while lowering an expression batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("derivative symbol `{symbol}` has no declared gridfunction `{base}`")]
    UnresolvedDerivativeSymbol { symbol: String, base: String },

    #[error("derivative symbol `{symbol}` is not a first or second derivative along x, y or z")]
    UnsupportedDerivative { symbol: String },

    #[error("finite-difference order {0} must be even and in 2..={max}", max = crate::fd::MAX_FD_ORDER)]
    InvalidFdOrder(usize),

    #[error("nothing to lower: empty batch")]
    EmptyBatch,

    #[error("output target `{0}` assigned twice in one batch")]
    DuplicateOutput(String),
}
