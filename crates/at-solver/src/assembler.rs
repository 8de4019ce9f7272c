// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Operator Assembly
// ─────────────────────────────────────────────────────────────────────
//! Base operators are built once per image into an immutable
//! [`OperatorBundle`]; the two alternating systems are assembled from it:
//!
//!   u-system:  (h·(−δ diag(v²) d0) + α h² Id0) u = h² α g
//!   v-system:  (h·BB(λ,ε) + h·diag(w²)) v = (h/ε)(λ/4) 𝟙,   w = d0 u
//!   BB(λ,ε)  = ελ·curl_curl + λ/(4ε)·Id1

use at_dec::{Duality, Form, FormSpace, GrayRaster, GridCalculus, Operator};
use at_types::{ATError, ATResult};

/// Derivative, Hodge and identity operators of one pixel grid, plus the
/// compositions the solver and the energies need.
#[derive(Debug, Clone)]
pub struct OperatorBundle {
    calculus: GridCalculus,
    pub d0: Operator,
    pub d1: Operator,
    pub dual_d0: Operator,
    pub dual_d1: Operator,
    pub primal_h1: Operator,
    pub primal_h2: Operator,
    pub dual_h1: Operator,
    pub dual_h2: Operator,
    pub id0: Operator,
    pub id1: Operator,
    /// δ = ⋆̃2 d̃1 ⋆1, primal 1-forms → primal 0-forms
    pub codifferential: Operator,
    /// −(d0 δ + ⋆̃1 d̃0 ⋆2 d1), λ-free, positive definite
    pub curl_curl: Operator,
}

impl OperatorBundle {
    pub fn new(calculus: GridCalculus) -> ATResult<Self> {
        let d0 = calculus.derivative(0, Duality::Primal)?;
        let d1 = calculus.derivative(1, Duality::Primal)?;
        let dual_d0 = calculus.derivative(0, Duality::Dual)?;
        let dual_d1 = calculus.derivative(1, Duality::Dual)?;
        let primal_h1 = calculus.hodge(1, Duality::Primal)?;
        let primal_h2 = calculus.hodge(2, Duality::Primal)?;
        let dual_h1 = calculus.hodge(1, Duality::Dual)?;
        let dual_h2 = calculus.hodge(2, Duality::Dual)?;
        let id0 = calculus.identity(0, Duality::Primal)?;
        let id1 = calculus.identity(1, Duality::Primal)?;

        let codifferential = dual_h2.compose(&dual_d1)?.compose(&primal_h1)?;
        let rot = dual_h1
            .compose(&dual_d0)?
            .compose(&primal_h2)?
            .compose(&d1)?;
        let curl_curl = d0.compose(&codifferential)?.add(&rot)?.scaled(-1.0);

        log::debug!(
            "operator bundle: d0 {}x{} ({} nnz), curl_curl {}x{} ({} nnz)",
            d0.rows(),
            d0.cols(),
            d0.nnz(),
            curl_curl.rows(),
            curl_curl.cols(),
            curl_curl.nnz()
        );

        Ok(Self {
            calculus,
            d0,
            d1,
            dual_d0,
            dual_d1,
            primal_h1,
            primal_h2,
            dual_h1,
            dual_h2,
            id0,
            id1,
            codifferential,
            curl_curl,
        })
    }

    /// Bundle over the pixel grid of `raster`.
    pub fn for_raster(raster: &GrayRaster) -> ATResult<Self> {
        Self::new(GridCalculus::for_raster(raster)?)
    }

    pub fn calculus(&self) -> &GridCalculus {
        &self.calculus
    }

    /// Number of pixels (primal 0-cells).
    pub fn n0(&self) -> usize {
        self.id0.rows()
    }

    /// Number of edges (primal 1-cells).
    pub fn n1(&self) -> usize {
        self.id1.rows()
    }

    /// w = d0 u
    pub fn gradient(&self, u: &Form) -> ATResult<Form> {
        self.d0.apply(u)
    }

    /// −δ diag(v²) d0 = d0ᵀ diag(v²) d0
    pub fn weighted_laplacian(&self, v: &Form) -> ATResult<Operator> {
        let v2 = self.calculus.diagonal(&v.squared())?;
        Ok(self
            .codifferential
            .compose(&v2)?
            .compose(&self.d0)?
            .scaled(-1.0))
    }

    /// Left-hand side of the u-system for the current edge field.
    pub fn intensity_system(&self, v: &Form, alpha: f64, h: f64) -> ATResult<Operator> {
        self.weighted_laplacian(v)?
            .scaled(h)
            .add(&self.id0.scaled(alpha * h * h))
    }

    /// h² α g
    pub fn intensity_rhs(&self, g: &Form, alpha: f64, h: f64) -> ATResult<Vec<f64>> {
        if g.space() != FormSpace::primal(0) || g.len() != self.n0() {
            return Err(ATError::Dimension(format!(
                "intensity input is a {} of length {}, expected {} pixels",
                g.space(),
                g.len(),
                self.n0()
            )));
        }
        Ok(g.scaled(h * h * alpha).into_values())
    }

    /// BB(λ,ε), fixed for one (λ, ε) pair.
    pub fn edge_base(&self, lambda: f64, epsilon: f64) -> ATResult<EdgeBase> {
        if epsilon.is_nan() || epsilon <= 0.0 {
            return Err(ATError::Config(format!("epsilon must be > 0, got {epsilon}")));
        }
        let bb = self
            .curl_curl
            .scaled(epsilon * lambda)
            .add(&self.id1.scaled(lambda / (4.0 * epsilon)))?;
        Ok(EdgeBase {
            lambda,
            epsilon,
            bb,
        })
    }

    /// Left-hand side of the v-system for the current gradient w = d0 u.
    pub fn edge_system(&self, base: &EdgeBase, w: &Form, h: f64) -> ATResult<Operator> {
        let w2 = self.calculus.diagonal(&w.squared())?;
        Ok(base.bb.add(&w2)?.scaled(h))
    }

    /// (h/ε)(λ/4) 𝟙
    pub fn edge_rhs(&self, base: &EdgeBase, h: f64) -> Vec<f64> {
        vec![h / base.epsilon * base.lambda / 4.0; self.n1()]
    }
}

/// The (λ, ε)-dependent, state-independent part of the v-system.
#[derive(Debug, Clone)]
pub struct EdgeBase {
    pub lambda: f64,
    pub epsilon: f64,
    pub bb: Operator,
}
