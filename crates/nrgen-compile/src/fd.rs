//! Finite-difference stencils and derivative-symbol substitution.
//!
//! Weights come from Fornberg's recurrence evaluated over exact rationals,
//! so a stencil of order `p` reproduces derivatives of polynomials of degree
//! `<= p` exactly.
//!
//! Besides centered derivatives the pass expands upwinded first derivatives
//! (`_dupD`), which pick the stencil shifted one point toward the side the
//! control vector points to, and Kreiss-Oliger dissipation (`_dKOD`), the
//! `(p + 2)`-th undivided difference scaled so the highest grid mode is
//! damped at unit rate.

use num_rational::Ratio;
use tracing::debug;

use nrgen_expr::{DerivKind, ExprGraph, ExprId, Func, Node, Symbol};

use crate::config::FdConfig;
use crate::error::{LowerError, Result};
use crate::passes::OptimizationPass;

/// Largest supported accuracy order.
pub const MAX_FD_ORDER: usize = 16;

/// Weights of the `m`-th derivative at 0 on the given integer grid points.
pub fn fornberg_weights(m: usize, points: &[i64]) -> Vec<Ratio<i128>> {
    let n = points.len();
    let zero = Ratio::from_integer(0i128);
    let x = |i: usize| Ratio::from_integer(points[i] as i128);
    let mut c = vec![vec![zero; m + 1]; n];
    if n == 0 {
        return Vec::new();
    }

    let mut c1 = Ratio::from_integer(1i128);
    let mut c4 = x(0);
    c[0][0] = Ratio::from_integer(1);
    for i in 1..n {
        let mn = i.min(m);
        let mut c2 = Ratio::from_integer(1i128);
        let c5 = c4;
        c4 = x(i);
        for j in 0..i {
            let c3 = x(i) - x(j);
            c2 *= c3;
            if j == i - 1 {
                for k in (1..=mn).rev() {
                    let kk = Ratio::from_integer(k as i128);
                    c[i][k] = c1 * (kk * c[i - 1][k - 1] - c5 * c[i - 1][k]) / c2;
                }
                c[i][0] = -c1 * c5 * c[i - 1][0] / c2;
            }
            for k in (1..=mn).rev() {
                let kk = Ratio::from_integer(k as i128);
                c[j][k] = (c4 * c[j][k] - kk * c[j][k - 1]) / c3;
            }
            c[j][0] = c4 * c[j][0] / c3;
        }
        c1 = c2;
    }
    c.into_iter().map(|row| row[m]).collect()
}

/// A 1-D stencil: `(offset, weight)` pairs with nonzero weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stencil {
    pub taps: Vec<(i8, Ratio<i128>)>,
}

fn check_order(order: usize) -> Result<()> {
    if order < 2 || order % 2 != 0 || order > MAX_FD_ORDER {
        return Err(LowerError::InvalidFdOrder(order));
    }
    Ok(())
}

fn binomial(n: i128, k: i128) -> i128 {
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

impl Stencil {
    /// Centered stencil for the `m`-th derivative at accuracy `order`.
    pub fn centered(m: usize, order: usize) -> Result<Self> {
        Self::shifted(m, order, 0)
    }

    /// The centered point set moved by `shift` grid points. Upwinded first
    /// derivatives use `shift = +1` and `-1`.
    pub fn shifted(m: usize, order: usize, shift: i64) -> Result<Self> {
        check_order(order)?;
        let half = (order / 2) as i64;
        let points: Vec<i64> = (shift - half..=shift + half).collect();
        let weights = fornberg_weights(m, &points);
        let taps = points
            .iter()
            .zip(weights)
            .filter(|(_, w)| *w != Ratio::from_integer(0))
            .map(|(&p, w)| (p as i8, w))
            .collect();
        Ok(Self { taps })
    }

    /// Kreiss-Oliger dissipation for a scheme of accuracy `order`.
    ///
    /// Weights are `-(-1)^k C(2r, k + r) / 4^r` for `r = order/2 + 1`, so the
    /// stencil annihilates polynomials of degree `< 2r` and maps the
    /// alternating mode `(-1)^k` to `-1`.
    pub fn kreiss_oliger(order: usize) -> Result<Self> {
        check_order(order)?;
        let r = (order / 2 + 1) as i128;
        let scale = 1i128 << (2 * r);
        let taps = (-r..=r)
            .map(|k| {
                let sign = if k % 2 == 0 { -1 } else { 1 };
                (k as i8, Ratio::new(sign * binomial(2 * r, k + r), scale))
            })
            .collect();
        Ok(Self { taps })
    }

    /// Farthest grid point the stencil reads.
    pub fn reach(&self) -> usize {
        self.taps.iter().map(|&(k, _)| k.unsigned_abs() as usize).max().unwrap_or(0)
    }
}

/// Every stencil the pass may need at one accuracy order.
struct Stencils {
    first: Stencil,
    second: Stencil,
    upwind: Stencil,
    downwind: Stencil,
    dissipation: Stencil,
}

impl Stencils {
    fn new(order: usize) -> Result<Self> {
        Ok(Self {
            first: Stencil::centered(1, order)?,
            second: Stencil::centered(2, order)?,
            upwind: Stencil::shifted(1, order, 1)?,
            downwind: Stencil::shifted(1, order, -1)?,
            dissipation: Stencil::kreiss_oliger(order)?,
        })
    }
}

/// Replaces derivative symbols of declared gridfunctions with stencil sums.
///
/// `uu_dD0` becomes `sum_k w_k * uu(i0 + k) * invdxx0`; mixed second
/// derivatives use the tensor product of first-derivative stencils.
pub struct SubstituteFiniteDifferences {
    config: FdConfig,
}

impl SubstituteFiniteDifferences {
    pub fn new(config: FdConfig) -> Self {
        Self { config }
    }

    fn inv_dx(&self, g: &mut ExprGraph, dir: usize) -> ExprId {
        g.sym(Symbol::scalar(format!("{}{dir}", self.config.inv_dx_prefix)))
    }

    fn weight(&self, g: &mut ExprGraph, w: Ratio<i128>) -> Result<ExprId> {
        match (i64::try_from(*w.numer()), i64::try_from(*w.denom())) {
            (Ok(p), Ok(q)) => Ok(g.rational(p, q)),
            _ => Err(LowerError::InvalidFdOrder(self.config.order)),
        }
    }

    /// Sum of `weight * read` over the given stencil points.
    fn stencil_sum(
        &self,
        g: &mut ExprGraph,
        field: &Symbol,
        points: impl IntoIterator<Item = ([i8; 3], Ratio<i128>)>,
    ) -> Result<ExprId> {
        let mut acc: Option<ExprId> = None;
        for (offset, w) in points {
            let read = g.sym(field.at_offset(offset));
            let w = self.weight(g, w)?;
            let term = g.mul(w, read);
            acc = Some(match acc {
                Some(a) => g.add(a, term),
                None => term,
            });
        }
        Ok(acc.unwrap_or(ExprId::ZERO))
    }

    fn expand(&self, g: &mut ExprGraph, symbol: &Symbol, st: &Stencils) -> Result<ExprId> {
        if !self.config.is_gridfunction(&symbol.base) {
            return Err(LowerError::UnresolvedDerivativeSymbol {
                symbol: symbol.to_string(),
                base: symbol.base.clone(),
            });
        }
        let unsupported = || LowerError::UnsupportedDerivative {
            symbol: symbol.to_string(),
        };
        if symbol.deriv.iter().any(|&d| d > 2) {
            return Err(unsupported());
        }
        let axis = |dir: u8, k: i8| {
            let mut off = [0i8; 3];
            off[dir as usize] = k;
            off
        };
        let along = |s: &Stencil, d: u8| {
            s.taps.iter().map(|&(k, w)| (axis(d, k), w)).collect::<Vec<_>>()
        };

        match (symbol.kind, &symbol.deriv[..]) {
            (DerivKind::Centered, &[d]) => {
                let sum = self.stencil_sum(g, symbol, along(&st.first, d))?;
                let inv = self.inv_dx(g, d as usize);
                Ok(g.mul(sum, inv))
            }
            (DerivKind::Centered, &[d, e]) if d == e => {
                let sum = self.stencil_sum(g, symbol, along(&st.second, d))?;
                let inv = self.inv_dx(g, d as usize);
                let inv2 = g.mul(inv, inv);
                Ok(g.mul(sum, inv2))
            }
            (DerivKind::Centered, &[d, e]) => {
                let points = st.first.taps.iter().flat_map(|&(k, wk)| {
                    st.first.taps.iter().map(move |&(l, wl)| {
                        let mut off = axis(d, k);
                        off[e as usize] = l;
                        (off, wk * wl)
                    })
                });
                let sum = self.stencil_sum(g, symbol, points)?;
                let inv_d = self.inv_dx(g, d as usize);
                let inv_e = self.inv_dx(g, e as usize);
                let inv = g.mul(inv_d, inv_e);
                Ok(g.mul(sum, inv))
            }
            (DerivKind::Upwind, &[d]) => {
                // ddn + UPWIND_ALG(control) * (dup - ddn)
                let up = self.stencil_sum(g, symbol, along(&st.upwind, d))?;
                let down = self.stencil_sum(g, symbol, along(&st.downwind, d))?;
                let control =
                    g.sym(Symbol::component(self.config.upwind_control.as_str(), &[d as usize]));
                let select = g.call(Func::Upwind, control);
                let diff = g.sub(up, down);
                let picked = g.mul(select, diff);
                let sum = g.add(down, picked);
                let inv = self.inv_dx(g, d as usize);
                Ok(g.mul(sum, inv))
            }
            (DerivKind::KreissOliger, &[d]) => {
                let sum = self.stencil_sum(g, symbol, along(&st.dissipation, d))?;
                let inv = self.inv_dx(g, d as usize);
                Ok(g.mul(sum, inv))
            }
            _ => Err(unsupported()),
        }
    }
}

impl OptimizationPass for SubstituteFiniteDifferences {
    fn name(&self) -> &str {
        "SubstituteFiniteDifferences"
    }

    fn run(&self, graph: &ExprGraph, outputs: &[ExprId]) -> Result<(ExprGraph, Vec<ExprId>)> {
        let stencils = Stencils::new(self.config.order)?;

        let live = graph.live_mask(outputs);
        let mut new_g = ExprGraph::new();
        let mut remap = vec![ExprId::ZERO; graph.len()];
        let mut substituted = 0usize;

        for (i, &node) in graph.nodes_slice().iter().enumerate() {
            if !live[i] {
                continue;
            }
            remap[i] = match node {
                Node::Sym(s) if graph.symbol(s).is_derivative() => {
                    substituted += 1;
                    self.expand(&mut new_g, graph.symbol(s), &stencils)?
                }
                _ => new_g.import(graph, node, &remap),
            };
        }

        debug!(
            order = self.config.order,
            substituted,
            nodes = new_g.len(),
            "finite-difference substitution"
        );
        let new_outputs = outputs.iter().map(|o| remap[o.index() as usize]).collect();
        Ok((new_g, new_outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(p: i128, q: i128) -> Ratio<i128> {
        Ratio::new(p, q)
    }

    #[test]
    fn second_order_weights() {
        let d1 = Stencil::centered(1, 2).unwrap();
        assert_eq!(d1.taps, vec![(-1, r(-1, 2)), (1, r(1, 2))]);
        let d2 = Stencil::centered(2, 2).unwrap();
        assert_eq!(d2.taps, vec![(-1, r(1, 1)), (0, r(-2, 1)), (1, r(1, 1))]);
    }

    #[test]
    fn fourth_order_weights() {
        let d1 = Stencil::centered(1, 4).unwrap();
        assert_eq!(
            d1.taps,
            vec![(-2, r(1, 12)), (-1, r(-2, 3)), (1, r(2, 3)), (2, r(-1, 12))]
        );
        let d2 = Stencil::centered(2, 4).unwrap();
        assert_eq!(
            d2.taps,
            vec![(-2, r(-1, 12)), (-1, r(4, 3)), (0, r(-5, 2)), (1, r(4, 3)), (2, r(-1, 12))]
        );
    }

    #[test]
    fn weights_annihilate_constants() {
        for order in [2, 4, 6, 8] {
            for m in [1, 2] {
                let s = Stencil::centered(m, order).unwrap();
                let total: Ratio<i128> = s.taps.iter().map(|&(_, w)| w).sum();
                assert_eq!(total, r(0, 1), "m={m} order={order}");
            }
        }
    }

    #[test]
    fn upwind_weights() {
        let up = Stencil::shifted(1, 2, 1).unwrap();
        assert_eq!(up.taps, vec![(0, r(-3, 2)), (1, r(2, 1)), (2, r(-1, 2))]);
        let down = Stencil::shifted(1, 2, -1).unwrap();
        assert_eq!(down.taps, vec![(-2, r(1, 2)), (-1, r(-2, 1)), (0, r(3, 2))]);
        assert_eq!(Stencil::shifted(1, 4, 1).unwrap().reach(), 3);
    }

    #[test]
    fn dissipation_weights() {
        let ko = Stencil::kreiss_oliger(2).unwrap();
        assert_eq!(
            ko.taps,
            vec![(-2, r(-1, 16)), (-1, r(1, 4)), (0, r(-3, 8)), (1, r(1, 4)), (2, r(-1, 16))]
        );
        for order in [2, 4, 6, 8] {
            let ko = Stencil::kreiss_oliger(order).unwrap();
            assert_eq!(ko.reach(), order / 2 + 1);
            // Polynomials below degree order + 2 are left alone.
            for degree in 0..order as u32 + 2 {
                let moment: Ratio<i128> =
                    ko.taps.iter().map(|&(k, w)| w * (k as i128).pow(degree)).sum();
                assert_eq!(moment, r(0, 1), "order={order} degree={degree}");
            }
            // The alternating mode is damped at unit rate.
            let alt: Ratio<i128> = ko
                .taps
                .iter()
                .map(|&(k, w)| if k % 2 == 0 { w } else { -w })
                .sum();
            assert_eq!(alt, r(-1, 1), "order={order}");
        }
    }

    #[test]
    fn rejects_odd_and_tiny_orders() {
        assert_eq!(Stencil::centered(1, 3), Err(LowerError::InvalidFdOrder(3)));
        assert_eq!(Stencil::centered(1, 0), Err(LowerError::InvalidFdOrder(0)));
        assert_eq!(Stencil::centered(1, 18), Err(LowerError::InvalidFdOrder(18)));
        assert_eq!(Stencil::kreiss_oliger(5), Err(LowerError::InvalidFdOrder(5)));
    }

    #[test]
    fn substitutes_first_derivative() {
        let mut g = ExprGraph::new();
        let d = g.sym(Symbol::derivative("uu", &[], &[0]));
        let pass = SubstituteFiniteDifferences::new(FdConfig::new(2, ["uu"]));
        let (ng, outs) = pass.run(&g, &[d]).unwrap();
        let reads: Vec<String> = ng
            .free_symbols(&outs)
            .into_iter()
            .map(|s| ng.symbol(s).to_string())
            .collect();
        assert_eq!(reads, vec!["uu_i0m1_i1_i2", "uu_i0p1_i1_i2", "invdxx0"]);
        // (u(+1) - u(-1)) / 2 * invdxx0
        let v = ng.eval_with(outs[0], |s| match s.to_string().as_str() {
            "uu_i0m1_i1_i2" => 1.0,
            "uu_i0p1_i1_i2" => 5.0,
            _ => 10.0,
        });
        assert_eq!(v, 20.0);
    }

    #[test]
    fn unresolved_base_is_an_error() {
        let mut g = ExprGraph::new();
        let d = g.sym(Symbol::derivative("vv", &[], &[1]));
        let pass = SubstituteFiniteDifferences::new(FdConfig::new(4, ["uu"]));
        let err = pass.run(&g, &[d]).unwrap_err();
        assert_eq!(
            err,
            LowerError::UnresolvedDerivativeSymbol {
                symbol: "vv_dD1".into(),
                base: "vv".into()
            }
        );
    }

    #[test]
    fn substitutes_upwind_derivative() {
        let mut g = ExprGraph::new();
        let d = g.sym(Symbol::upwind("uu", &[], 0));
        let pass = SubstituteFiniteDifferences::new(FdConfig::new(2, ["uu"]));
        let (ng, outs) = pass.run(&g, &[d]).unwrap();
        let names: Vec<String> = ng
            .free_symbols(&outs)
            .into_iter()
            .map(|s| ng.symbol(s).to_string())
            .collect();
        assert!(names.contains(&"betaU0".to_string()));
        assert!(names.contains(&"uu_i0p2_i1_i2".to_string()));
        assert!(names.contains(&"uu_i0m2_i1_i2".to_string()));
        // A ramp `max(k, 0)` has slope 1 ahead of the origin and 0 behind it,
        // so the result shows which side the control selected.
        let ramp = |control: f64| {
            ng.eval_with(outs[0], |s| match s.base.as_str() {
                "betaU" => control,
                "invdxx0" => 1.0,
                _ => f64::from(s.stencil[0].max(0)),
            })
        };
        assert_eq!(ramp(1.0), 1.0);
        assert_eq!(ramp(-1.0), 0.0);
        assert_eq!(ramp(0.0), 0.0);
    }

    #[test]
    fn upwind_second_derivative_unsupported() {
        let mut g = ExprGraph::new();
        let d = g.sym(Symbol {
            deriv: vec![0, 0],
            ..Symbol::upwind("uu", &[], 0)
        });
        let pass = SubstituteFiniteDifferences::new(FdConfig::new(2, ["uu"]));
        assert!(matches!(
            pass.run(&g, &[d]),
            Err(LowerError::UnsupportedDerivative { .. })
        ));
    }

    #[test]
    fn third_derivative_unsupported() {
        let mut g = ExprGraph::new();
        let d = g.sym(Symbol::derivative("uu", &[], &[0, 0, 1]));
        let pass = SubstituteFiniteDifferences::new(FdConfig::new(4, ["uu"]));
        assert!(matches!(
            pass.run(&g, &[d]),
            Err(LowerError::UnsupportedDerivative { .. })
        ));
    }
}
