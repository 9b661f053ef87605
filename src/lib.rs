//! nrgen: tensor-indexed symbolic expressions to registered C kernels
//!
//! Facade over the workspace crates:
//!
//! - [`expr`]: interned symbolic expression graph with typed symbols
//! - [`tensor`]: indexed tensors with declared index symmetries
//! - [`compile`]: finite differences, CSE, vector lowering and C emission
//! - [`registry`]: kernel registry and two-phase deferred registration
//!
//! Kernel routines build expressions against the thread-local graph (every
//! dispatch entry gets a fresh one) and turn them into C with [`codegen`].
//!
//! # Example
//!
//! ```
//! use nrgen::{codegen, declare, ExprId, LowerConfig};
//!
//! let (_graph, src) = nrgen::trace(|| {
//!     let k = declare("KDD", 2, 3, "sym01").unwrap();
//!     let trace_k: ExprId = (0..3).map(|i| k[&[i, i][..]]).sum();
//!     codegen(&[("trK", trace_k)], &LowerConfig::default()).unwrap()
//! });
//! assert!(src.contains("trK = "));
//! ```

pub mod logging;

pub use nrgen_compile as compile;
pub use nrgen_expr as expr;
pub use nrgen_registry as registry;
pub use nrgen_tensor as tensor;

pub use nrgen_compile::{lower, lower_to_c, FdConfig, LowerConfig, LowerError, Program, VectorConfig};
pub use nrgen_expr::{trace, with_graph, DerivKind, ExprGraph, ExprId, Func, Symbol};
pub use nrgen_registry::{
    Args, DispatchMode, Discovery, GenerationSession, KernelBatch, KernelBody, KernelRecord, KernelRegistry,
    KernelRoutine, Partition, RegistryError, SessionConfig,
};
pub use nrgen_tensor::{
    declare, declare_derivative, declare_dissipation, declare_upwind, declare_with, zero, zero_with, IndexedTensor,
    Symmetry,
};

fn owned(outputs: &[(&str, ExprId)]) -> Vec<(String, ExprId)> {
    outputs.iter().map(|&(name, e)| (name.to_string(), e)).collect()
}

/// Lower `outputs`, built in the thread-local graph, to C statements.
pub fn codegen(outputs: &[(&str, ExprId)], config: &LowerConfig) -> Result<String, LowerError> {
    let batch = owned(outputs);
    with_graph(|g| lower_to_c(g, &batch, config))
}

/// Lower `outputs` from `graph` into the statements of a kernel body.
pub fn kernel_body(
    graph: &ExprGraph,
    outputs: &[(&str, ExprId)],
    config: &LowerConfig,
) -> Result<KernelBody, LowerError> {
    Ok(KernelBody::new(lower_to_c(graph, &owned(outputs), config)?))
}
