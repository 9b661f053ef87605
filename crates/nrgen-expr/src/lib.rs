//! nrgen-expr: interned symbolic expression graph.
//!
//! Expressions are built through a thread-local graph, either explicitly via
//! [`with_graph`] or implicitly through operator overloads on [`ExprId`].
//! Every structurally identical subexpression is interned once, so the graph
//! is already common-subexpression eliminated.
//!
//! # Quick start
//!
//! ```
//! use nrgen_expr::{trace, ExprId, Symbol};
//!
//! let (g, e) = trace(|| {
//!     let x = ExprId::scalar("x");
//!     let y = ExprId::scalar("y");
//!     (x + y) * (x + y)
//! });
//!
//! let v = g.eval_with(e, |s| if s.base == "x" { 1.0 } else { 2.0 });
//! assert_eq!(v, 9.0);
//! assert_eq!(g.fmt_expr(e), "(x + y)*(x + y)");
//! ```

pub mod display;
pub mod eval;
pub mod graph;
pub mod node;
mod ops;
pub mod simplify;
pub mod symbol;

pub use graph::ExprGraph;
pub use node::{ExprId, Func, Node, SymId};
pub use symbol::{DerivKind, Symbol};

use std::cell::RefCell;

thread_local! {
    static GRAPH: RefCell<ExprGraph> = RefCell::new(ExprGraph::new());
}

/// Access the thread-local graph.
pub fn with_graph<F, R>(f: F) -> R
where
    F: FnOnce(&mut ExprGraph) -> R,
{
    GRAPH.with(|g| f(&mut g.borrow_mut()))
}

/// Puts the caller's graph back, also when the traced closure unwinds.
struct Restore(Option<ExprGraph>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(old) = self.0.take() {
            // The thread-local may already be gone during thread teardown.
            let _ = GRAPH.try_with(|g| *g.borrow_mut() = old);
        }
    }
}

/// Run a closure with a fresh graph, returning the graph and result.
///
/// Installs a new empty graph, runs `f` (which builds expressions via
/// `ExprId` arithmetic), then extracts the graph and restores the previous one.
/// The previous graph is restored even if `f` panics.
pub fn trace<F, R>(f: F) -> (ExprGraph, R)
where
    F: FnOnce() -> R,
{
    let mut restore = Restore(Some(with_graph(std::mem::take)));
    let result = f();
    let old = restore.0.take().unwrap_or_default();
    let graph = with_graph(|g| std::mem::replace(g, old));
    (graph, result)
}

impl ExprId {
    /// A symbol node in the thread-local graph.
    #[inline]
    pub fn sym(symbol: Symbol) -> Self {
        with_graph(|g| g.sym(symbol))
    }

    /// A plain scalar symbol in the thread-local graph.
    #[inline]
    pub fn scalar(name: &str) -> Self {
        Self::sym(Symbol::scalar(name))
    }

    /// An integer literal in the thread-local graph.
    #[inline]
    pub fn int(n: i64) -> Self {
        with_graph(|g| g.int(n))
    }

    /// An exact rational literal in the thread-local graph.
    #[inline]
    pub fn rational(p: i64, q: i64) -> Self {
        with_graph(|g| g.rational(p, q))
    }

    /// An inexact literal in the thread-local graph.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        with_graph(|g| g.float(v))
    }
}
