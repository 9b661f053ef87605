//! Expression graph with structural interning (automatic CSE).

use std::collections::HashMap;

use num_rational::Ratio;

use crate::node::{ExprId, Func, Node, SymId};
use crate::symbol::Symbol;

/// Arena-based expression graph with structural interning.
///
/// Identical subexpressions always return the same `ExprId`. Operands of
/// `Add` and `Mul` are stored in ascending `ExprId` order, so `a + b` and
/// `b + a` intern to the same node.
#[derive(Clone, Debug)]
pub struct ExprGraph {
    nodes: Vec<Node>,
    intern: HashMap<Node, ExprId>,
    symbols: Vec<Symbol>,
    symbol_ids: HashMap<Symbol, SymId>,
}

impl ExprGraph {
    /// Create a new graph pre-populated with ZERO, ONE, TWO.
    pub fn new() -> Self {
        let mut g = Self {
            nodes: Vec::new(),
            intern: HashMap::new(),
            symbols: Vec::new(),
            symbol_ids: HashMap::new(),
        };
        let z = g.insert(Node::Rational(0, 1));
        debug_assert_eq!(z, ExprId::ZERO);
        let o = g.insert(Node::Rational(1, 1));
        debug_assert_eq!(o, ExprId::ONE);
        let t = g.insert(Node::Rational(2, 1));
        debug_assert_eq!(t, ExprId::TWO);
        g
    }

    /// Total number of nodes in the graph.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty (it never is after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up the node for an ExprId.
    #[inline]
    pub fn node(&self, id: ExprId) -> Node {
        self.nodes[id.0 as usize]
    }

    /// All nodes in topological (index) order.
    #[inline]
    pub fn nodes_slice(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a symbol by id.
    #[inline]
    pub fn symbol(&self, id: SymId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    /// The symbol table, indexed by `SymId`.
    #[inline]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Id of an already interned symbol.
    pub fn symbol_id(&self, symbol: &Symbol) -> Option<SymId> {
        self.symbol_ids.get(symbol).copied()
    }

    /// The symbol behind a `Sym` node, if `id` is one.
    pub fn as_symbol(&self, id: ExprId) -> Option<&Symbol> {
        match self.node(id) {
            Node::Sym(s) => Some(self.symbol(s)),
            _ => None,
        }
    }

    /// Internal: insert a node, returning its interned ExprId.
    fn insert(&mut self, node: Node) -> ExprId {
        if let Some(&id) = self.intern.get(&node) {
            return id;
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.intern.insert(node, id);
        id
    }

    /// Create (or reuse) a symbol node.
    pub fn sym(&mut self, symbol: Symbol) -> ExprId {
        let sid = match self.symbol_ids.get(&symbol) {
            Some(&sid) => sid,
            None => {
                let sid = SymId(self.symbols.len() as u32);
                self.symbols.push(symbol.clone());
                self.symbol_ids.insert(symbol, sid);
                sid
            }
        };
        self.insert(Node::Sym(sid))
    }

    /// Create an exact rational literal `p / q`.
    ///
    /// Panics if `q == 0`.
    pub fn rational(&mut self, p: i64, q: i64) -> ExprId {
        assert!(q != 0, "rational literal with zero denominator");
        let r = Ratio::new(p, q);
        self.insert(Node::Rational(*r.numer(), *r.denom()))
    }

    /// Create an integer literal.
    #[inline]
    pub fn int(&mut self, n: i64) -> ExprId {
        self.insert(Node::Rational(n, 1))
    }

    /// Create an inexact literal.
    #[inline]
    pub fn float(&mut self, v: f64) -> ExprId {
        self.insert(Node::float(v))
    }

    /// Add two expressions.
    #[inline]
    pub fn add(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let (a, b) = if b < a { (b, a) } else { (a, b) };
        self.insert(Node::Add(a, b))
    }

    /// Subtract: `a + (-b)`.
    #[inline]
    pub fn sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let nb = self.neg(b);
        self.add(a, nb)
    }

    /// Multiply two expressions.
    #[inline]
    pub fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let (a, b) = if b < a { (b, a) } else { (a, b) };
        self.insert(Node::Mul(a, b))
    }

    /// Negate an expression.
    #[inline]
    pub fn neg(&mut self, a: ExprId) -> ExprId {
        self.insert(Node::Neg(a))
    }

    /// Divide `a / b`.
    #[inline]
    pub fn div(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.insert(Node::Div(a, b))
    }

    /// Raise `a` to the power `b`.
    #[inline]
    pub fn pow(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.insert(Node::Pow(a, b))
    }

    /// Raise `a` to an integer power.
    #[inline]
    pub fn powi(&mut self, a: ExprId, n: i64) -> ExprId {
        let e = self.int(n);
        self.pow(a, e)
    }

    /// Apply a unary function.
    #[inline]
    pub fn call(&mut self, func: Func, a: ExprId) -> ExprId {
        self.insert(Node::Call(func, a))
    }

    /// Square root.
    #[inline]
    pub fn sqrt(&mut self, a: ExprId) -> ExprId {
        self.call(Func::Sqrt, a)
    }

    /// Re-create `node` (taken from `src`) in this graph, with its children
    /// already mapped through `remap` (indexed by `src` ExprIds).
    pub fn import(&mut self, src: &ExprGraph, node: Node, remap: &[ExprId]) -> ExprId {
        match node {
            Node::Sym(s) => self.sym(src.symbol(s).clone()),
            Node::Rational(p, q) => self.insert(Node::Rational(p, q)),
            Node::Float(bits) => self.insert(Node::Float(bits)),
            Node::Add(a, b) => self.add(remap[a.0 as usize], remap[b.0 as usize]),
            Node::Mul(a, b) => self.mul(remap[a.0 as usize], remap[b.0 as usize]),
            other => {
                let mapped = other.map_children(|c| remap[c.0 as usize]);
                self.insert(mapped)
            }
        }
    }

    /// Mark every node reachable from `outputs`.
    pub fn live_mask(&self, outputs: &[ExprId]) -> Vec<bool> {
        let mut live = vec![false; self.nodes.len()];
        let mut stack: Vec<ExprId> = outputs.to_vec();
        while let Some(id) = stack.pop() {
            let i = id.0 as usize;
            if live[i] {
                continue;
            }
            live[i] = true;
            self.nodes[i].for_each_child(|c| stack.push(c));
        }
        live
    }

    /// Symbols reachable from `outputs`, in symbol-table order.
    pub fn free_symbols(&self, outputs: &[ExprId]) -> Vec<SymId> {
        let live = self.live_mask(outputs);
        let mut syms: Vec<SymId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| live[*i])
            .filter_map(|(_, n)| match n {
                Node::Sym(s) => Some(*s),
                _ => None,
            })
            .collect();
        syms.sort();
        syms
    }
}

impl Default for ExprGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_populated() {
        let g = ExprGraph::new();
        assert_eq!(g.node(ExprId::ZERO).as_f64(), Some(0.0));
        assert_eq!(g.node(ExprId::ONE).as_f64(), Some(1.0));
        assert_eq!(g.node(ExprId::TWO).as_f64(), Some(2.0));
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn interning() {
        let mut g = ExprGraph::new();
        let x = g.sym(Symbol::scalar("x"));
        let x2 = g.sym(Symbol::scalar("x"));
        assert_eq!(x, x2);
        assert_eq!(g.symbols().len(), 1);

        let a = g.add(x, ExprId::ONE);
        let a2 = g.add(x, ExprId::ONE);
        assert_eq!(a, a2);
    }

    #[test]
    fn commutative_operands_canonicalized() {
        let mut g = ExprGraph::new();
        let x = g.sym(Symbol::scalar("x"));
        let y = g.sym(Symbol::scalar("y"));
        assert_eq!(g.add(x, y), g.add(y, x));
        assert_eq!(g.mul(x, y), g.mul(y, x));
        // Division does not commute.
        assert_ne!(g.div(x, y), g.div(y, x));
    }

    #[test]
    fn rationals_normalized() {
        let mut g = ExprGraph::new();
        let half = g.rational(2, 4);
        let half2 = g.rational(-1, -2);
        assert_eq!(half, half2);
        assert_eq!(g.node(half), Node::Rational(1, 2));
        assert_eq!(g.rational(4, 2), ExprId::TWO);
    }

    #[test]
    fn import_remaps_symbols() {
        let mut src = ExprGraph::new();
        let y = src.sym(Symbol::scalar("y"));
        let x = src.sym(Symbol::scalar("x"));
        let s = src.add(x, y);

        let mut dst = ExprGraph::new();
        let mut remap = vec![ExprId::ZERO; src.len()];
        for (i, node) in src.nodes_slice().iter().enumerate() {
            remap[i] = dst.import(&src, *node, &remap);
        }
        let out = remap[s.index() as usize];
        assert_eq!(dst.as_symbol(remap[x.index() as usize]), Some(&Symbol::scalar("x")));
        assert!(matches!(dst.node(out), Node::Add(..)));
    }

    #[test]
    fn free_symbols_only_live() {
        let mut g = ExprGraph::new();
        let x = g.sym(Symbol::scalar("x"));
        let _dead = g.sym(Symbol::scalar("dead"));
        let e = g.mul(x, x);
        let syms = g.free_symbols(&[e]);
        assert_eq!(syms.len(), 1);
        assert_eq!(g.symbol(syms[0]), &Symbol::scalar("x"));
    }
}
