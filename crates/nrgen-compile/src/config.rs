//! Lowering configuration.

use serde::{Deserialize, Serialize};

/// How a batch is lowered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerConfig {
    /// Hoist subexpressions used more than once into temporaries.
    pub cse: bool,
    /// Run exact algebraic simplification before CSE.
    pub simplify: bool,
    /// Replace derivative symbols with finite-difference stencils.
    pub fd: Option<FdConfig>,
    /// Rewrite arithmetic into vector intrinsics after CSE.
    pub vector: Option<VectorConfig>,
    /// Wrap the emitted block in `{ }`.
    pub include_braces: bool,
    /// Prefix the emitted block with a comment describing the batch.
    pub verbose: bool,
    pub temp_prefix: String,
    /// Scalar type name used in emitted declarations.
    pub real_type: String,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self {
            cse: true,
            simplify: false,
            fd: None,
            vector: None,
            include_braces: true,
            verbose: false,
            temp_prefix: "tmp".to_string(),
            real_type: "REAL".to_string(),
        }
    }
}

impl LowerConfig {
    pub fn with_fd(mut self, fd: FdConfig) -> Self {
        self.fd = Some(fd);
        self
    }

    pub fn with_vector(mut self, vector: VectorConfig) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_cse(mut self, cse: bool) -> Self {
        self.cse = cse;
        self
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }
}

/// Finite-difference substitution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdConfig {
    /// Accuracy order of the centered stencils (even, >= 2).
    pub order: usize,
    /// Base names of the fields stored on the grid (`"uu"`, `"hDD"`).
    pub gridfunctions: Vec<String>,
    /// How a stencil point is read. `{gf}` is the upper-cased field name,
    /// `{i0}`..`{i2}` the offset loop indices.
    pub read_template: String,
    /// Prefix of the inverse grid-spacing symbols (`invdxx0`..`invdxx2`).
    pub inv_dx_prefix: String,
    /// Base name of the vector that picks the upwind side of `_dupD`
    /// derivatives; component `d` controls direction `d`.
    pub upwind_control: String,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            order: 4,
            gridfunctions: Vec::new(),
            read_template: "in_gfs[IDX4({gf}GF, {i0}, {i1}, {i2})]".to_string(),
            inv_dx_prefix: "invdxx".to_string(),
            upwind_control: "betaU".to_string(),
        }
    }
}

impl FdConfig {
    pub fn new<S: Into<String>>(order: usize, gridfunctions: impl IntoIterator<Item = S>) -> Self {
        Self {
            order,
            gridfunctions: gridfunctions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_gridfunction(&self, base: &str) -> bool {
        self.gridfunctions.iter().any(|g| g == base)
    }

    /// Ghost zones a kernel needs: half the centered stencil width, plus one
    /// when upwinded or dissipation stencils are in use.
    pub fn ghost_zones(&self, upwind_or_dissipation: bool) -> usize {
        self.order / 2 + usize::from(upwind_or_dissipation)
    }
}

/// Vector-intrinsic lowering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Lanes per vector register.
    pub width: usize,
    /// Fuse `a*b + c` and `a*b - c` into fused multiply-add intrinsics.
    /// Fused results are not bit-identical to the scalar program.
    pub fma: bool,
    /// Vector type name used in emitted declarations.
    pub vec_type: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            width: 4,
            fma: false,
            vec_type: "REAL_SIMD_ARRAY".to_string(),
        }
    }
}
