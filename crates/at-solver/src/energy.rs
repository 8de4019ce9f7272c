// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Energy Terms
// ─────────────────────────────────────────────────────────────────────
//! Diagnostic AT energies for a (u, v) state:
//!   fidelity        Σ α (u − g)²
//!   diffusion       uᵀ d0ᵀ diag(v²) d0 u
//!   edge smoothness λ ε vᵀ curl_curl v
//!   edge penalty    Σ λ/(4ε) (1 − v)²
//!   perimeter       h (smoothness + penalty)
//!   total           h² fidelity + h (diffusion + smoothness + penalty)

use at_dec::Form;
use at_types::{ATError, ATResult, EnergyReport};

use crate::assembler::OperatorBundle;

pub struct EnergyReporter<'a> {
    bundle: &'a OperatorBundle,
    alpha: f64,
    grid_step: f64,
}

impl<'a> EnergyReporter<'a> {
    pub fn new(bundle: &'a OperatorBundle, alpha: f64, grid_step: f64) -> Self {
        Self {
            bundle,
            alpha,
            grid_step,
        }
    }

    pub fn fidelity(&self, u: &Form, g: &Form) -> ATResult<f64> {
        if u.space() != g.space() || u.len() != g.len() {
            return Err(ATError::Dimension(format!(
                "fidelity between {} ({}) and {} ({})",
                u.space(),
                u.len(),
                g.space(),
                g.len()
            )));
        }
        Ok(u.values()
            .iter()
            .zip(g.values().iter())
            .map(|(a, b)| self.alpha * (a - b) * (a - b))
            .sum())
    }

    pub fn diffusion(&self, u: &Form, v: &Form) -> ATResult<f64> {
        self.bundle
            .weighted_laplacian(v)?
            .quadratic_form(u.values())
    }

    pub fn edge_smoothness(&self, v: &Form, lambda: f64, epsilon: f64) -> ATResult<f64> {
        Ok(lambda * epsilon * self.bundle.curl_curl.quadratic_form(v.values())?)
    }

    pub fn edge_penalty(&self, v: &Form, lambda: f64, epsilon: f64) -> f64 {
        let weight = lambda / (4.0 * epsilon);
        v.values().iter().map(|x| weight * (1.0 - x) * (1.0 - x)).sum()
    }

    /// All terms for the final state of one λ value.
    pub fn report(
        &self,
        lambda: f64,
        epsilon: f64,
        g: &Form,
        u: &Form,
        v: &Form,
    ) -> ATResult<EnergyReport> {
        let h = self.grid_step;
        let fidelity = self.fidelity(u, g)?;
        let diffusion = self.diffusion(u, v)?;
        let edge_smoothness = self.edge_smoothness(v, lambda, epsilon)?;
        let edge_penalty = self.edge_penalty(v, lambda, epsilon);
        let report = EnergyReport {
            lambda,
            alpha: self.alpha,
            epsilon,
            fidelity,
            diffusion,
            edge_smoothness,
            edge_penalty,
            perimeter: h * (edge_smoothness + edge_penalty),
            total: h * h * fidelity + h * (diffusion + edge_smoothness + edge_penalty),
        };
        if !report.total.is_finite() {
            return Err(ATError::Numerical(format!(
                "non-finite energy at lambda={lambda}: {report:?}"
            )));
        }
        if !report.is_well_formed() {
            log::warn!("negative energy terms: {report:?}");
        }
        Ok(report)
    }
}
