// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — SPD Linear Solvers
// ─────────────────────────────────────────────────────────────────────
//! Capability "solve A x = b for sparse SPD A" behind one trait, with a
//! direct LDLᵀ backend and a Jacobi-preconditioned conjugate gradient.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sprs::{FillInReduction, SymmetryCheck};
use sprs_ldl::Ldl;

use at_dec::Operator;
use at_types::{ATError, ATResult, LinearSystem};

/// Sparse symmetric positive-definite solver.
pub trait SpdSolver {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Solve `a · x = rhs`. Any failure, including a non-finite
    /// solution, is reported as [`ATError::LinearSolveFailed`].
    fn solve(&mut self, system: LinearSystem, a: &Operator, rhs: &[f64]) -> ATResult<Vec<f64>>;
}

fn check_square(system: LinearSystem, a: &Operator, rhs: &[f64]) -> ATResult<()> {
    if a.rows() != a.cols() || a.rows() != rhs.len() {
        return Err(ATError::solve_failed(
            system,
            format!(
                "{}x{} matrix with right-hand side of length {}",
                a.rows(),
                a.cols(),
                rhs.len()
            ),
        ));
    }
    Ok(())
}

fn check_finite(system: LinearSystem, x: &[f64]) -> ATResult<()> {
    match x.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(ATError::solve_failed(
            system,
            format!("non-finite solution at index {i}"),
        )),
        None => Ok(()),
    }
}

// ── Direct LDLᵀ ──────────────────────────────────────────────────────

/// Sparse LDLᵀ with reverse Cuthill-McKee ordering. Rejects matrices
/// that are not symmetric or whose D has a non-positive pivot.
///
/// RCM keeps the fill inside the band of the grid, so factorization
/// cost grows like n·W² for a W-wide image; see [`SolverBackend::suggested`].
#[derive(Debug, Clone)]
pub struct LdlSolver {
    /// Relative tolerance of the symmetry check.
    pub symmetry_tol: f64,
}

impl Default for LdlSolver {
    fn default() -> Self {
        Self {
            symmetry_tol: 1e-10,
        }
    }
}

impl SpdSolver for LdlSolver {
    fn name(&self) -> &'static str {
        "ldl"
    }

    fn solve(&mut self, system: LinearSystem, a: &Operator, rhs: &[f64]) -> ATResult<Vec<f64>> {
        check_square(system, a, rhs)?;
        if !a.is_symmetric(self.symmetry_tol) {
            return Err(ATError::solve_failed(system, "matrix is not symmetric"));
        }

        // RCM needs at least two rows; a 1x1 system only has one ordering
        let ordering = if a.rows() < 2 {
            FillInReduction::NoReduction
        } else {
            FillInReduction::ReverseCuthillMcKee
        };
        let ldl = Ldl::new()
            .fill_in_reduction(ordering)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(a.matrix().view())
            .map_err(|e| ATError::solve_failed(system, format!("factorization: {e:?}")))?;

        if let Some((i, &d)) = ldl
            .d()
            .iter()
            .enumerate()
            .find(|&(_, &d)| !(d > 0.0 && d.is_finite()))
        {
            return Err(ATError::solve_failed(
                system,
                format!("pivot {i} is {d}, matrix is not positive definite"),
            ));
        }

        let x = ldl.solve(rhs);
        check_finite(system, &x)?;
        Ok(x)
    }
}

// ── Conjugate gradient ───────────────────────────────────────────────

/// Jacobi-preconditioned conjugate gradient.
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    /// Stop when ‖r‖ ≤ tolerance · ‖b‖.
    pub tolerance: f64,
    /// Iteration cap; `None` means 10 · n.
    pub max_iterations: Option<usize>,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: None,
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

impl SpdSolver for ConjugateGradient {
    fn name(&self) -> &'static str {
        "cg"
    }

    fn solve(&mut self, system: LinearSystem, a: &Operator, rhs: &[f64]) -> ATResult<Vec<f64>> {
        check_square(system, a, rhs)?;
        let n = rhs.len();
        let max_iter = self.max_iterations.unwrap_or(10 * n.max(1));

        let diag = a.diag();
        if let Some(i) = diag.iter().position(|&d| !(d > 0.0 && d.is_finite())) {
            return Err(ATError::solve_failed(
                system,
                format!("diagonal entry {i} is {}, matrix is not positive definite", diag[i]),
            ));
        }

        let b_norm = dot(rhs, rhs).sqrt();
        let mut x = vec![0.0; n];
        if b_norm == 0.0 {
            return Ok(x);
        }

        let mut r = rhs.to_vec();
        let mut z: Vec<f64> = r.iter().zip(diag.iter()).map(|(ri, di)| ri / di).collect();
        let mut p = z.clone();
        let mut rz = dot(&r, &z);

        for iter in 0..max_iter {
            let ap = a.mul_vec(&p)?;
            let curvature = dot(&p, &ap);
            if !(curvature > 0.0 && curvature.is_finite()) {
                return Err(ATError::solve_failed(
                    system,
                    format!("non-positive curvature {curvature} at iteration {iter}"),
                ));
            }
            let step = rz / curvature;
            for i in 0..n {
                x[i] += step * p[i];
                r[i] -= step * ap[i];
            }

            let r_norm = dot(&r, &r).sqrt();
            if r_norm <= self.tolerance * b_norm {
                check_finite(system, &x)?;
                log::debug!("{system}: cg converged in {} iterations", iter + 1);
                return Ok(x);
            }

            for i in 0..n {
                z[i] = r[i] / diag[i];
            }
            let rz_new = dot(&r, &z);
            let beta = rz_new / rz;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
            rz = rz_new;
        }

        Err(ATError::solve_failed(
            system,
            format!("no convergence after {max_iter} iterations"),
        ))
    }
}

// ── Backend selection ────────────────────────────────────────────────

/// Unknowns above which the banded LDLᵀ fill makes CG the faster backend.
pub const LDL_MAX_UNKNOWNS: usize = 1 << 15;

/// Which [`SpdSolver`] a run uses. LDLᵀ is the default and is exact up
/// to rounding; past [`LDL_MAX_UNKNOWNS`] unknowns its fill grows with
/// the image width and CG is usually an order of magnitude faster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    #[default]
    Ldl,
    #[serde(rename = "cg")]
    ConjugateGradient,
}

impl SolverBackend {
    /// Fresh solver of this kind with default settings.
    pub fn build(self) -> Box<dyn SpdSolver> {
        match self {
            Self::Ldl => Box::new(LdlSolver::default()),
            Self::ConjugateGradient => Box::new(ConjugateGradient::default()),
        }
    }

    /// Backend that scales to a system with `unknowns` rows.
    pub fn suggested(unknowns: usize) -> Self {
        if unknowns > LDL_MAX_UNKNOWNS {
            Self::ConjugateGradient
        } else {
            Self::Ldl
        }
    }
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ldl => write!(f, "ldl"),
            Self::ConjugateGradient => write!(f, "cg"),
        }
    }
}

impl FromStr for SolverBackend {
    type Err = ATError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ldl" => Ok(Self::Ldl),
            "cg" => Ok(Self::ConjugateGradient),
            other => Err(ATError::Config(format!(
                "unknown solver '{other}', expected 'ldl' or 'cg'"
            ))),
        }
    }
}
