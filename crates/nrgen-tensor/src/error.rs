//! Tensor declaration errors

use thiserror::Error;

/// Tensor result type
pub type Result<T> = std::result::Result<T, TensorError>;

/// Errors raised while declaring or addressing indexed tensors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("invalid symmetry `{spec}`: {reason}")]
    InvalidSymmetry { spec: String, reason: String },

    #[error("rank {0} is outside 0..=4")]
    RankOutOfRange(usize),

    #[error("tensor dimension must be at least 1")]
    ZeroDimension,

    #[error("index {index:?} out of range for rank-{rank} tensor of dimension {dim}")]
    IndexOutOfRange { index: Vec<usize>, rank: usize, dim: usize },

    #[error("component {index:?} of `{name}` is identically zero under its symmetry")]
    ForcedZero { name: String, index: Vec<usize> },
}
