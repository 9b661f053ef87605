//! Lowering of symbolic expression batches into straight-line C kernels.
//!
//! Builds on [`nrgen_expr`] to turn an ordered batch of
//! `(output target, expression)` pairs into an ordered list of assignments:
//!
//! - **Finite-difference substitution**: derivative symbols become stencil sums
//! - **Algebraic simplification**: optional exact rational folding
//! - **Constant folding** and **dead code elimination**
//! - **Common subexpression elimination**: shared nodes become temporaries
//! - **Vector lowering**: arithmetic rewritten into SIMD intrinsics
//!
//! # Example
//!
//! ```
//! use nrgen_compile::{lower, LowerConfig};
//! use nrgen_expr::{trace, ExprId};
//!
//! let (g, (a, b)) = trace(|| {
//!     let x = ExprId::scalar("x");
//!     let y = ExprId::scalar("y");
//!     let s = (x + y).sin();
//!     (s * x, s * y)
//! });
//! let batch = vec![("a".to_string(), a), ("b".to_string(), b)];
//! let config = LowerConfig::default();
//! let program = lower(&g, &batch, &config).unwrap();
//! assert_eq!(program.num_temps, 1);
//! println!("{}", program.to_c(&config));
//! ```

pub mod config;
pub mod cse;
mod emit;
pub mod error;
pub mod fd;
pub mod passes;
pub mod program;
mod vector;

pub use config::{FdConfig, LowerConfig, VectorConfig};
pub use error::{LowerError, Result};
pub use fd::{fornberg_weights, Stencil, SubstituteFiniteDifferences};
pub use passes::{EliminateDeadCode, FoldConstants, OptimizationPass, PassManager, SimplifyAlgebraic};
pub use program::{BinOp, Constant, Input, Intrinsic, Program, Stmt, Target, Term};
pub use vector::vectorize;

use std::collections::HashSet;

use tracing::{debug, info};

use nrgen_expr::{ExprGraph, ExprId};

/// The pass pipeline `config` asks for.
pub fn pipeline(config: &LowerConfig) -> PassManager {
    let mut pm = PassManager::new();
    if let Some(fd) = &config.fd {
        pm.add(SubstituteFiniteDifferences::new(fd.clone()));
    }
    if config.simplify {
        pm.add(SimplifyAlgebraic);
    }
    pm.add(FoldConstants);
    pm.add(EliminateDeadCode);
    pm
}

/// Lower a batch of `(output target, expression)` pairs.
///
/// Temporaries are shared across the whole batch. The result depends only on
/// the batch and the configuration.
pub fn lower(graph: &ExprGraph, batch: &[(String, ExprId)], config: &LowerConfig) -> Result<Program> {
    if batch.is_empty() {
        return Err(LowerError::EmptyBatch);
    }
    let mut seen = HashSet::new();
    for (name, _) in batch {
        if !seen.insert(name.as_str()) {
            return Err(LowerError::DuplicateOutput(name.clone()));
        }
    }

    let roots: Vec<ExprId> = batch.iter().map(|(_, e)| *e).collect();
    let (g, outs) = pipeline(config).run(graph, &roots)?;

    let lowered: Vec<(String, ExprId)> = batch
        .iter()
        .zip(outs)
        .map(|((name, _), e)| (name.clone(), e))
        .collect();
    let mut program = cse::build_program(&g, &lowered, config.cse, config.fd.as_ref());
    if config.verbose {
        program.sources = roots.iter().map(|&e| graph.fmt_expr(e)).collect();
    }
    debug!(
        temps = program.num_temps,
        inputs = program.inputs.len(),
        constants = program.constants.len(),
        "common subexpressions eliminated"
    );

    if let Some(vector) = &config.vector {
        program = vectorize(&program, vector);
    }

    info!(
        outputs = program.outputs.len(),
        statements = program.statements.len(),
        ops = program.op_count(),
        vectorized = program.vector.is_some(),
        "lowered batch"
    );
    Ok(program)
}

/// [`lower`] straight to C source.
pub fn lower_to_c(graph: &ExprGraph, batch: &[(String, ExprId)], config: &LowerConfig) -> Result<String> {
    Ok(lower(graph, batch, config)?.to_c(config))
}
