use std::collections::BTreeSet;
use std::ops::Index;

use nrgen_expr::{with_graph, ExprId, Symbol};

use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::symmetry::{Canonical, Symmetry};

/// A rank-0..=4 container of expressions over `0..dim` in every slot.
///
/// Entries are handles into the thread-local expression graph, so a tensor
/// is only meaningful inside the graph (or `trace`) it was built in.
#[derive(Debug, Clone)]
pub struct IndexedTensor {
    name: String,
    shape: Shape,
    symmetry: Symmetry,
    entries: Vec<ExprId>,
    symbols: Vec<Symbol>,
}

/// Declare a tensor of free symbols named after `name`, honoring `symmetry`.
///
/// One symbol is created per independent component; components related by
/// symmetry share it (negated across an antisymmetric swap), and components
/// forced to equal their own negation are zero.
pub fn declare(name: &str, rank: usize, dim: usize, symmetry: &str) -> Result<IndexedTensor> {
    let symmetry = symmetry.parse::<Symmetry>()?;
    declare_with(name, rank, dim, symmetry)
}

/// [`declare`] with an already built symmetry.
pub fn declare_with(name: &str, rank: usize, dim: usize, symmetry: Symmetry) -> Result<IndexedTensor> {
    build(name, rank, dim, symmetry, |idx| Symbol::component(name, idx))
}

/// Declare the `deriv_order`-th partial derivatives of a rank-`base_rank`
/// tensor. The trailing `deriv_order` slots are derivative directions, so
/// `declare_derivative("hDD", 2, 1, 3, "sym01")` holds `hDD_dD012` at
/// `[0, 1, 2]`.
pub fn declare_derivative(
    name: &str,
    base_rank: usize,
    deriv_order: usize,
    dim: usize,
    symmetry: &str,
) -> Result<IndexedTensor> {
    let symmetry = symmetry.parse::<Symmetry>()?;
    build(name, base_rank + deriv_order, dim, symmetry, |idx| {
        Symbol::derivative(name, &idx[..base_rank], &idx[base_rank..])
    })
}

/// Upwinded first derivatives of a rank-`base_rank` tensor; the last slot is
/// the direction (`vetU_dupD01` at `[0, 1]`).
pub fn declare_upwind(name: &str, base_rank: usize, dim: usize, symmetry: &str) -> Result<IndexedTensor> {
    let symmetry = symmetry.parse::<Symmetry>()?;
    build(name, base_rank + 1, dim, symmetry, |idx| {
        Symbol::upwind(name, &idx[..base_rank], idx[base_rank])
    })
}

/// Kreiss-Oliger dissipation of a rank-`base_rank` tensor along each direction.
pub fn declare_dissipation(name: &str, base_rank: usize, dim: usize, symmetry: &str) -> Result<IndexedTensor> {
    let symmetry = symmetry.parse::<Symmetry>()?;
    build(name, base_rank + 1, dim, symmetry, |idx| {
        Symbol::kreiss_oliger(name, &idx[..base_rank], idx[base_rank])
    })
}

/// A tensor of literal zeros, used as an accumulator.
pub fn zero(rank: usize, dim: usize) -> Result<IndexedTensor> {
    zero_with(rank, dim, Symmetry::none())
}

/// A zero tensor whose `set` writes whole symmetry orbits.
pub fn zero_with(rank: usize, dim: usize, symmetry: Symmetry) -> Result<IndexedTensor> {
    let shape = Shape::new(rank, dim)?;
    symmetry.validate(rank)?;
    Ok(IndexedTensor {
        name: String::new(),
        entries: vec![ExprId::ZERO; shape.numel()],
        shape,
        symmetry,
        symbols: Vec::new(),
    })
}

fn build(
    name: &str,
    rank: usize,
    dim: usize,
    symmetry: Symmetry,
    symbol_for: impl Fn(&[usize]) -> Symbol,
) -> Result<IndexedTensor> {
    let shape = Shape::new(rank, dim)?;
    symmetry.validate(rank)?;

    let mut entries = Vec::with_capacity(shape.numel());
    let mut symbols = Vec::new();
    let mut seen = BTreeSet::new();
    for idx in shape.indices() {
        let entry = match symmetry.canonical(&idx) {
            Canonical::Zero => ExprId::ZERO,
            Canonical::Entry { index, sign } => {
                let symbol = symbol_for(&index);
                if seen.insert(symbol.clone()) {
                    symbols.push(symbol.clone());
                }
                with_graph(|g| {
                    let s = g.sym(symbol);
                    if sign < 0 {
                        g.neg(s)
                    } else {
                        s
                    }
                })
            }
        };
        entries.push(entry);
    }

    Ok(IndexedTensor {
        name: name.to_string(),
        shape,
        symmetry,
        entries,
        symbols,
    })
}

impl IndexedTensor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn dim(&self) -> usize {
        self.shape.dim()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn symmetry(&self) -> &Symmetry {
        &self.symmetry
    }

    /// The component at `index`.
    pub fn get(&self, index: &[usize]) -> Result<ExprId> {
        Ok(self.entries[self.shape.offset(index)?])
    }

    /// Write `value` at `index` and at every component related to it by the
    /// symmetry, negating across antisymmetric swaps.
    pub fn set(&mut self, index: &[usize], value: ExprId) -> Result<()> {
        self.shape.offset(index)?;
        let orbit = self.symmetry.orbit(index).ok_or_else(|| TensorError::ForcedZero {
            name: self.name.clone(),
            index: index.to_vec(),
        })?;
        let negated = if orbit.values().any(|&s| s < 0) {
            with_graph(|g| g.neg(value))
        } else {
            value
        };
        for (idx, sign) in orbit {
            let off = self.shape.offset(&idx)?;
            self.entries[off] = if sign < 0 { negated } else { value };
        }
        Ok(())
    }

    /// Free symbols generated at declaration, in canonical index order.
    pub fn free_symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Flat row-major entries.
    pub fn entries(&self) -> &[ExprId] {
        &self.entries
    }

    /// Every `(index, component)` pair in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, ExprId)> + '_ {
        self.shape.indices().zip(self.entries.iter().copied())
    }
}

/// Panicking access, for equation code that indexes in tight loops.
impl Index<&[usize]> for IndexedTensor {
    type Output = ExprId;

    fn index(&self, index: &[usize]) -> &ExprId {
        match self.shape.offset(index) {
            Ok(off) => &self.entries[off],
            Err(e) => panic!("{e}"),
        }
    }
}
