//! Common-subexpression elimination: graph to straight-line program.
//!
//! The graph is already interned, so structurally identical subexpressions
//! share a node. A non-atomic node referenced more than once across the
//! whole batch becomes a temporary. Temporaries, inputs and constants are
//! numbered by first occurrence in a post-order walk of the outputs, taken
//! in batch order, so the result never depends on hash iteration order.

use std::collections::HashMap;

use nrgen_expr::{ExprGraph, ExprId, Node};

use crate::config::FdConfig;
use crate::program::{BinOp, Constant, Input, Program, Stmt, Target, Term};

/// Number of references to each node from live parents and from the outputs.
pub fn use_counts(graph: &ExprGraph, outputs: &[ExprId]) -> Vec<u32> {
    let live = graph.live_mask(outputs);
    let mut uses = vec![0u32; graph.len()];
    for (i, node) in graph.nodes_slice().iter().enumerate() {
        if live[i] {
            node.for_each_child(|c| uses[c.index() as usize] += 1);
        }
    }
    for o in outputs {
        uses[o.index() as usize] += 1;
    }
    uses
}

struct Builder<'a> {
    graph: &'a ExprGraph,
    fd: Option<&'a FdConfig>,
    hoist: Vec<bool>,
    temp_of: HashMap<ExprId, usize>,
    input_of: HashMap<ExprId, usize>,
    const_of: HashMap<ExprId, usize>,
    inputs: Vec<Input>,
    constants: Vec<Constant>,
    statements: Vec<Stmt>,
}

impl<'a> Builder<'a> {
    fn operand(&mut self, id: ExprId) -> Option<Term> {
        if let Some(&k) = self.temp_of.get(&id) {
            return Some(Term::Temp(k));
        }
        match self.graph.node(id) {
            Node::Sym(s) => {
                let next = self.inputs.len();
                let k = *self.input_of.entry(id).or_insert(next);
                if k == next {
                    let symbol = self.graph.symbol(s).clone();
                    let read = self
                        .fd
                        .filter(|fd| fd.is_gridfunction(&symbol.base))
                        .map(|fd| render_read(&fd.read_template, &symbol.field_name(), symbol.stencil));
                    self.inputs.push(Input { symbol, read });
                }
                Some(Term::Input(k))
            }
            Node::Rational(p, q) => Some(Term::Const(self.constant(id, Constant::Rational(p, q)))),
            Node::Float(bits) => Some(Term::Const(self.constant(id, Constant::Float(bits)))),
            _ => None,
        }
    }

    fn constant(&mut self, id: ExprId, c: Constant) -> usize {
        let next = self.constants.len();
        let k = *self.const_of.entry(id).or_insert(next);
        if k == next {
            self.constants.push(c);
        }
        k
    }

    /// Lower `id`, emitting any temporaries it needs first.
    fn term(&mut self, id: ExprId) -> Term {
        if let Some(t) = self.operand(id) {
            return t;
        }
        let t = self.inline(id);
        if self.hoist[id.index() as usize] {
            let k = self.temp_of.len();
            self.temp_of.insert(id, k);
            self.statements.push(Stmt { target: Target::Temp(k), value: t });
            Term::Temp(k)
        } else {
            t
        }
    }

    /// Whether `id` will be inlined as a `Neg` node.
    fn inline_neg(&self, id: ExprId) -> Option<ExprId> {
        match self.graph.node(id) {
            Node::Neg(inner) if !self.hoist[id.index() as usize] => Some(inner),
            _ => None,
        }
    }

    fn inline(&mut self, id: ExprId) -> Term {
        match self.graph.node(id) {
            Node::Add(a, b) => {
                if let Some(nb) = self.inline_neg(b) {
                    let (a, nb) = (self.term(a), self.term(nb));
                    return Term::binary(BinOp::Sub, a, nb);
                }
                if let Some(na) = self.inline_neg(a) {
                    let (na, b) = (self.term(na), self.term(b));
                    return Term::binary(BinOp::Sub, b, na);
                }
                let (a, b) = (self.term(a), self.term(b));
                Term::binary(BinOp::Add, a, b)
            }
            Node::Mul(a, b) => {
                let (a, b) = (self.term(a), self.term(b));
                Term::binary(BinOp::Mul, a, b)
            }
            Node::Div(a, b) => {
                let (a, b) = (self.term(a), self.term(b));
                Term::binary(BinOp::Div, a, b)
            }
            Node::Pow(a, b) => {
                let (a, b) = (self.term(a), self.term(b));
                Term::binary(BinOp::Pow, a, b)
            }
            Node::Neg(a) => Term::Neg(Box::new(self.term(a))),
            Node::Call(f, a) => Term::Call(f, Box::new(self.term(a))),
            Node::Sym(_) | Node::Rational(..) | Node::Float(_) => {
                // Atoms are always operands.
                self.operand(id).unwrap_or(Term::Const(0))
            }
        }
    }
}

/// Render a stencil read from `template` for the field `field` at `offset`.
pub fn render_read(template: &str, field: &str, offset: [i8; 3]) -> String {
    let index = |axis: usize| match offset[axis] {
        0 => format!("i{axis}"),
        o if o > 0 => format!("i{axis}+{o}"),
        o => format!("i{axis}{o}"),
    };
    template
        .replace("{gf}", &field.to_ascii_uppercase())
        .replace("{i0}", &index(0))
        .replace("{i1}", &index(1))
        .replace("{i2}", &index(2))
}

/// Build the straight-line program for `outputs`.
///
/// With `cse` off nothing is hoisted: every output is a single inlined
/// expression.
pub fn build_program(
    graph: &ExprGraph,
    outputs: &[(String, ExprId)],
    cse: bool,
    fd: Option<&FdConfig>,
) -> Program {
    let roots: Vec<ExprId> = outputs.iter().map(|(_, e)| *e).collect();
    let hoist: Vec<bool> = if cse {
        use_counts(graph, &roots)
            .into_iter()
            .zip(graph.nodes_slice())
            .map(|(n, node)| n > 1 && !node.is_atom())
            .collect()
    } else {
        vec![false; graph.len()]
    };

    let mut b = Builder {
        graph,
        fd,
        hoist,
        temp_of: HashMap::new(),
        input_of: HashMap::new(),
        const_of: HashMap::new(),
        inputs: Vec::new(),
        constants: Vec::new(),
        statements: Vec::new(),
    };

    for (k, &root) in roots.iter().enumerate() {
        let value = b.term(root);
        b.statements.push(Stmt { target: Target::Output(k), value });
    }

    Program {
        inputs: b.inputs,
        constants: b.constants,
        statements: b.statements,
        outputs: outputs.iter().map(|(name, _)| name.clone()).collect(),
        num_temps: b.temp_of.len(),
        vector: None,
        sources: Vec::new(),
    }
}
