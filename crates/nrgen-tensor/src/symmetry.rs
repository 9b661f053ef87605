//! Index-slot symmetry specifications.
//!
//! A symmetry is a set of slot transpositions, each either symmetric
//! (swapping the two indices leaves the component unchanged) or
//! antisymmetric (swapping flips its sign). Specifications are written as
//! `_`-separated tokens: `sym01`, `anti12`, `sym01_sym23`. A token naming more
//! than two slots (`sym012`) declares every pair among them.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorError};

/// Whether a transposition preserves or flips the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairKind {
    Sym,
    Anti,
}

/// One declared transposition of slots `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotPair {
    pub a: usize,
    pub b: usize,
    pub kind: PairKind,
}

/// Where a component lives after applying the symmetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonical {
    /// Stored as `sign * tensor[index]`, where `index` is the orbit's
    /// lexicographically smallest member.
    Entry { index: Vec<usize>, sign: i8 },
    /// The component equals minus itself.
    Zero,
}

/// A set of symmetric / antisymmetric slot transpositions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symmetry {
    pairs: Vec<SlotPair>,
}

impl Symmetry {
    /// No symmetry: every component is independent.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add a symmetric transposition of slots `a` and `b`.
    pub fn sym(self, a: usize, b: usize) -> Self {
        self.with(a, b, PairKind::Sym)
    }

    /// Add an antisymmetric transposition of slots `a` and `b`.
    pub fn anti(self, a: usize, b: usize) -> Self {
        self.with(a, b, PairKind::Anti)
    }

    fn with(mut self, a: usize, b: usize, kind: PairKind) -> Self {
        let (a, b) = if b < a { (b, a) } else { (a, b) };
        let pair = SlotPair { a, b, kind };
        if !self.pairs.contains(&pair) {
            self.pairs.push(pair);
        }
        self
    }

    pub fn pairs(&self) -> &[SlotPair] {
        &self.pairs
    }

    pub fn is_none(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Check the specification against a tensor rank.
    pub fn validate(&self, rank: usize) -> Result<()> {
        let invalid = |reason: String| TensorError::InvalidSymmetry {
            spec: self.to_string(),
            reason,
        };
        for p in &self.pairs {
            if p.a == p.b {
                return Err(invalid(format!("slot {} paired with itself", p.a)));
            }
            if p.b >= rank {
                return Err(invalid(format!("slot {} out of range for rank {rank}", p.b)));
            }
            let clash = self
                .pairs
                .iter()
                .any(|q| q.a == p.a && q.b == p.b && q.kind != p.kind);
            if clash {
                return Err(invalid(format!(
                    "slots {},{} declared both symmetric and antisymmetric",
                    p.a, p.b
                )));
            }
        }
        // On distinct slot labels the orbit is the generated permutation
        // group; a sign clash there means the transpositions contradict.
        let slots: Vec<usize> = (0..rank).collect();
        if self.orbit(&slots).is_none() {
            return Err(invalid("transpositions imply contradictory signs".to_string()));
        }
        Ok(())
    }

    /// Every member of `index`'s orbit, with its sign relative to `index`.
    ///
    /// Returns `None` when the orbit reaches some tuple with both signs, i.e.
    /// the component is identically zero.
    pub fn orbit(&self, index: &[usize]) -> Option<BTreeMap<Vec<usize>, i8>> {
        let mut seen: BTreeMap<Vec<usize>, i8> = BTreeMap::new();
        let mut queue = VecDeque::new();
        seen.insert(index.to_vec(), 1);
        queue.push_back((index.to_vec(), 1i8));

        while let Some((idx, sign)) = queue.pop_front() {
            for p in &self.pairs {
                let mut next = idx.clone();
                next.swap(p.a, p.b);
                let next_sign = match p.kind {
                    PairKind::Sym => sign,
                    PairKind::Anti => -sign,
                };
                match seen.get(&next) {
                    Some(&s) if s != next_sign => return None,
                    Some(_) => {}
                    None => {
                        seen.insert(next.clone(), next_sign);
                        queue.push_back((next, next_sign));
                    }
                }
            }
        }
        Some(seen)
    }

    /// Canonical representative of `index` under this symmetry.
    pub fn canonical(&self, index: &[usize]) -> Canonical {
        match self.orbit(index) {
            None => Canonical::Zero,
            Some(orbit) => match orbit.into_iter().next() {
                Some((index, sign)) => Canonical::Entry { index, sign },
                None => Canonical::Zero,
            },
        }
    }
}

impl FromStr for Symmetry {
    type Err = TensorError;

    fn from_str(spec: &str) -> Result<Self> {
        let invalid = |reason: String| TensorError::InvalidSymmetry {
            spec: spec.to_string(),
            reason,
        };
        let spec_trimmed = spec.trim();
        if spec_trimmed.is_empty() || spec_trimmed == "nosym" {
            return Ok(Self::none());
        }

        let mut out = Self::none();
        for token in spec_trimmed.split('_') {
            let (kind, digits) = if let Some(d) = token.strip_prefix("sym") {
                (PairKind::Sym, d)
            } else if let Some(d) = token.strip_prefix("anti") {
                (PairKind::Anti, d)
            } else {
                return Err(invalid(format!("unknown token `{token}`")));
            };
            let slots: Vec<usize> = digits
                .chars()
                .map(|c| c.to_digit(10).map(|d| d as usize))
                .collect::<Option<_>>()
                .ok_or_else(|| invalid(format!("token `{token}` must name slots by digit")))?;
            if slots.len() < 2 {
                return Err(invalid(format!("token `{token}` names fewer than two slots")));
            }
            for (i, &a) in slots.iter().enumerate() {
                for &b in &slots[i + 1..] {
                    if a == b {
                        return Err(invalid(format!("slot {a} paired with itself")));
                    }
                    out = out.with(a, b, kind);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return f.write_str("nosym");
        }
        for (i, p) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("_")?;
            }
            let kind = match p.kind {
                PairKind::Sym => "sym",
                PairKind::Anti => "anti",
            };
            write!(f, "{kind}{}{}", p.a, p.b)?;
        }
        Ok(())
    }
}
