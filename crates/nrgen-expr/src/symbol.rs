//! Structured symbol identity.
//!
//! A symbol is compared by its parts, never by its rendered name. The name
//! only exists for emitted code: `hDD01`, `hDD_dD012`, `uu_dDD00`,
//! `vetU_dupD01`, `uu_dKOD2`, `uu_i0p1_i1_i2`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which finite-difference operator a derivative symbol stands for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DerivKind {
    /// Centered partial derivative (`_dD`, `_dDD`).
    #[default]
    Centered,
    /// First derivative upwinded along a control vector (`_dupD`).
    Upwind,
    /// Kreiss-Oliger dissipation operator (`_dKOD`).
    KreissOliger,
}

/// Typed identity of a free symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    /// Base name (`"hDD"`, `"alpha"`).
    pub base: String,
    /// Tensor component indices.
    pub indices: Vec<u8>,
    /// Partial derivative directions, sorted. Empty for an undifferentiated symbol.
    pub deriv: Vec<u8>,
    /// Grid offset of a stencil read along each axis. All-zero for the local point.
    pub stencil: [i8; 3],
    #[serde(default)]
    pub kind: DerivKind,
}

impl Symbol {
    /// A plain scalar symbol.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            base: name.into(),
            indices: Vec::new(),
            deriv: Vec::new(),
            stencil: [0; 3],
            kind: DerivKind::Centered,
        }
    }

    /// A tensor component symbol.
    pub fn component(base: impl Into<String>, indices: &[usize]) -> Self {
        Self {
            base: base.into(),
            indices: indices.iter().map(|&i| i as u8).collect(),
            deriv: Vec::new(),
            stencil: [0; 3],
            kind: DerivKind::Centered,
        }
    }

    /// A partial derivative of a tensor component along `dirs`.
    ///
    /// Directions are sorted: partial derivatives commute.
    pub fn derivative(base: impl Into<String>, indices: &[usize], dirs: &[usize]) -> Self {
        let mut deriv: Vec<u8> = dirs.iter().map(|&d| d as u8).collect();
        deriv.sort_unstable();
        Self {
            base: base.into(),
            indices: indices.iter().map(|&i| i as u8).collect(),
            deriv,
            stencil: [0; 3],
            kind: DerivKind::Centered,
        }
    }

    /// First derivative along `dir`, upwinded along the control vector.
    pub fn upwind(base: impl Into<String>, indices: &[usize], dir: usize) -> Self {
        Self {
            kind: DerivKind::Upwind,
            ..Self::derivative(base, indices, &[dir])
        }
    }

    /// Kreiss-Oliger dissipation of a field component along `dir`.
    pub fn kreiss_oliger(base: impl Into<String>, indices: &[usize], dir: usize) -> Self {
        Self {
            kind: DerivKind::KreissOliger,
            ..Self::derivative(base, indices, &[dir])
        }
    }

    /// The same field read at a grid offset.
    pub fn at_offset(&self, stencil: [i8; 3]) -> Self {
        Self {
            base: self.base.clone(),
            indices: self.indices.clone(),
            deriv: Vec::new(),
            stencil,
            kind: DerivKind::Centered,
        }
    }

    /// The undifferentiated field this symbol refers to, at the local point.
    pub fn field(&self) -> Self {
        self.at_offset([0; 3])
    }

    /// Total derivative order.
    #[inline]
    pub fn deriv_order(&self) -> usize {
        self.deriv.len()
    }

    /// Whether this symbol names a derivative.
    #[inline]
    pub fn is_derivative(&self) -> bool {
        !self.deriv.is_empty()
    }

    /// Whether this symbol is a stencil read away from the local point.
    #[inline]
    pub fn is_offset(&self) -> bool {
        self.stencil != [0; 3]
    }

    /// Name of the underlying field component (`hDD01`), ignoring derivatives and offsets.
    pub fn field_name(&self) -> String {
        let mut s = self.base.clone();
        push_digits(&mut s, &self.indices);
        s
    }
}

fn push_digits(s: &mut String, digits: &[u8]) {
    for d in digits {
        s.push(char::from(b'0' + d % 10));
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = self.base.clone();
        if !self.deriv.is_empty() {
            match self.kind {
                DerivKind::Centered => {
                    s.push_str("_d");
                    s.extend(std::iter::repeat('D').take(self.deriv.len()));
                }
                DerivKind::Upwind => s.push_str("_dupD"),
                DerivKind::KreissOliger => s.push_str("_dKOD"),
            }
        }
        push_digits(&mut s, &self.indices);
        push_digits(&mut s, &self.deriv);
        if self.is_offset() {
            for (axis, &off) in self.stencil.iter().enumerate() {
                s.push_str(&format!("_i{axis}"));
                match off {
                    0 => {}
                    o if o > 0 => s.push_str(&format!("p{o}")),
                    o => s.push_str(&format!("m{}", -(o as i16))),
                }
            }
        }
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_names() {
        assert_eq!(Symbol::scalar("alpha").to_string(), "alpha");
        assert_eq!(Symbol::component("hDD", &[0, 1]).to_string(), "hDD01");
    }

    #[test]
    fn derivative_names() {
        assert_eq!(Symbol::derivative("hDD", &[0, 1], &[2]).to_string(), "hDD_dD012");
        assert_eq!(Symbol::derivative("uu", &[], &[1, 0]).to_string(), "uu_dDD01");
    }

    #[test]
    fn upwind_and_dissipation_names() {
        let up = Symbol::upwind("vetU", &[0], 1);
        assert_eq!(up.to_string(), "vetU_dupD01");
        assert_ne!(up, Symbol::derivative("vetU", &[0], &[1]));
        assert_eq!(Symbol::kreiss_oliger("uu", &[], 2).to_string(), "uu_dKOD2");
        assert_eq!(up.at_offset([0, 1, 0]).to_string(), "vetU0_i0_i1p1_i2");
        assert_eq!(up.field(), Symbol::component("vetU", &[0]));
    }

    #[test]
    fn derivative_directions_commute() {
        assert_eq!(
            Symbol::derivative("uu", &[], &[2, 0]),
            Symbol::derivative("uu", &[], &[0, 2])
        );
    }

    #[test]
    fn stencil_names() {
        let uu = Symbol::scalar("uu");
        assert_eq!(uu.at_offset([1, 0, -2]).to_string(), "uu_i0p1_i1_i2m2");
        assert_eq!(uu.at_offset([0, 0, 0]), uu);
    }

    #[test]
    fn field_strips_derivative() {
        let d = Symbol::derivative("vU", &[2], &[0]);
        assert_eq!(d.field(), Symbol::component("vU", &[2]));
        assert_eq!(d.field_name(), "vU2");
    }
}
