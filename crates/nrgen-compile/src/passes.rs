//! Optimization passes for expression graphs.

use tracing::debug;

use nrgen_expr::eval::pow;
use nrgen_expr::{ExprGraph, ExprId, Node};

use crate::error::Result;

/// A single optimization pass over an expression graph.
pub trait OptimizationPass {
    /// Name of this pass (for logging).
    fn name(&self) -> &str;

    /// Run the pass. Returns a new graph and remapped output expressions.
    fn run(&self, graph: &ExprGraph, outputs: &[ExprId]) -> Result<(ExprGraph, Vec<ExprId>)>;
}

/// Manages a pipeline of optimization passes.
pub struct PassManager {
    passes: Vec<Box<dyn OptimizationPass + Send + Sync>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the pipeline.
    pub fn add(&mut self, pass: impl OptimizationPass + Send + Sync + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes in sequence, stopping at the first failure.
    pub fn run(&self, graph: &ExprGraph, outputs: &[ExprId]) -> Result<(ExprGraph, Vec<ExprId>)> {
        let mut g = graph.clone();
        let mut outs = outputs.to_vec();

        for pass in &self.passes {
            let (new_g, new_outs) = pass.run(&g, &outs)?;
            debug!(pass = pass.name(), before = g.len(), after = new_g.len(), "pass finished");
            g = new_g;
            outs = new_outs;
        }

        Ok((g, outs))
    }

    /// Names of the registered passes, in run order.
    pub fn names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Number of registered passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Literal for a folded value, preferring an exact integer when it is one.
fn literal(g: &mut ExprGraph, v: f64) -> ExprId {
    let integral = v.fract() == 0.0 && v.abs() < 9.0e15 && !(v == 0.0 && v.is_sign_negative());
    if integral {
        g.int(v as i64)
    } else {
        g.float(v)
    }
}

/// Constant folding: evaluate subexpressions that depend only on literals.
///
/// Folding uses the same double-precision operations as evaluation, so the
/// folded graph evaluates to exactly the same bits.
pub struct FoldConstants;

impl OptimizationPass for FoldConstants {
    fn name(&self) -> &str {
        "FoldConstants"
    }

    fn run(&self, graph: &ExprGraph, outputs: &[ExprId]) -> Result<(ExprGraph, Vec<ExprId>)> {
        let nodes = graph.nodes_slice();
        let live = graph.live_mask(outputs);

        let mut new_g = ExprGraph::new();
        let mut remap = vec![ExprId::ZERO; nodes.len()];

        for (i, &node) in nodes.iter().enumerate() {
            if !live[i] {
                continue;
            }
            if node.is_atom() {
                remap[i] = new_g.import(graph, node, &remap);
                continue;
            }
            let val = |id: ExprId| new_g.node(remap[id.index() as usize]).as_f64();
            let folded = match node {
                Node::Add(a, b) => val(a).zip(val(b)).map(|(a, b)| a + b),
                Node::Mul(a, b) => val(a).zip(val(b)).map(|(a, b)| a * b),
                Node::Div(a, b) => val(a).zip(val(b)).map(|(a, b)| a / b),
                Node::Pow(a, b) => val(a).zip(val(b)).map(|(a, b)| pow(a, b)),
                Node::Neg(a) => val(a).map(|a| -a),
                Node::Call(f, a) => val(a).map(|a| f.apply(a)),
                Node::Sym(_) | Node::Rational(..) | Node::Float(_) => None,
            };
            remap[i] = match folded {
                Some(v) => literal(&mut new_g, v),
                None => new_g.import(graph, node, &remap),
            };
        }

        let new_outputs = outputs.iter().map(|o| remap[o.index() as usize]).collect();
        Ok((new_g, new_outputs))
    }
}

/// Dead code elimination: remove nodes not reachable from outputs.
pub struct EliminateDeadCode;

impl OptimizationPass for EliminateDeadCode {
    fn name(&self) -> &str {
        "EliminateDeadCode"
    }

    fn run(&self, graph: &ExprGraph, outputs: &[ExprId]) -> Result<(ExprGraph, Vec<ExprId>)> {
        let live = graph.live_mask(outputs);

        // Rebuild with only live nodes
        let mut new_g = ExprGraph::new();
        let mut remap = vec![ExprId::ZERO; graph.len()];
        for (i, &node) in graph.nodes_slice().iter().enumerate() {
            if live[i] {
                remap[i] = new_g.import(graph, node, &remap);
            }
        }

        let new_outputs = outputs.iter().map(|o| remap[o.index() as usize]).collect();
        Ok((new_g, new_outputs))
    }
}

/// Algebraic simplification using nrgen-expr's built-in simplifier.
///
/// Literal arithmetic is folded exactly, so results may differ from the
/// unsimplified graph in the last bit.
pub struct SimplifyAlgebraic;

impl OptimizationPass for SimplifyAlgebraic {
    fn name(&self) -> &str {
        "SimplifyAlgebraic"
    }

    fn run(&self, graph: &ExprGraph, outputs: &[ExprId]) -> Result<(ExprGraph, Vec<ExprId>)> {
        let mut g = graph.clone();
        let simplified = g.simplify_all(outputs);
        Ok((g, simplified))
    }
}
