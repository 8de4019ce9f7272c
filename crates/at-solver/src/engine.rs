// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Alternating Solver
// ─────────────────────────────────────────────────────────────────────
//! Three nested loops, outermost first:
//!   1. λ schedule: λ₁, λ₁/r, λ₁/r², … while λ ≥ λ₂
//!   2. ε annealing: ε ← ε/2 from 2ε₀, at most 5 steps, stop once ε/2 < h²
//!   3. coordinate descent: u-solve, v-solve, stop when sup|Δv| < tol
//!
//! After each λ the energies are sampled and the caller receives the
//! state for export. A failed linear solve abandons the current (λ, ε)
//! and keeps the last solved u, v.

use serde::{Deserialize, Serialize};

use at_dec::{Form, FormSpace, GrayRaster};
use at_types::{ATConfig, ATResult, EnergyReport, LinearSystem};

use crate::assembler::{EdgeBase, OperatorBundle};
use crate::energy::EnergyReporter;
use crate::spd::{SolverBackend, SpdSolver};

/// λ₁, λ₁/r, λ₁/r², … down to the last value ≥ λ₂.
///
/// A ratio ≤ 1 or a non-positive λ₂ yields λ₁ alone.
pub fn lambda_schedule(lambda_1: f64, lambda_2: f64, ratio: f64) -> Vec<f64> {
    if !(ratio > 1.0 && lambda_2 > 0.0) {
        return vec![lambda_1];
    }
    let mut out = Vec::new();
    let mut lambda = lambda_1;
    while lambda >= lambda_2 {
        out.push(lambda);
        lambda /= ratio;
    }
    out
}

/// ε values of one annealing pass, at most `max_steps` of them.
///
/// The first value is always kept when `max_steps ≥ 1`, even if it is
/// already below h².
pub fn epsilon_schedule(epsilon: f64, grid_step: f64, ratio: f64, max_steps: usize) -> Vec<f64> {
    let h2 = grid_step * grid_step;
    let mut out = Vec::new();
    let mut eps = ratio * epsilon;
    for _ in 0..max_steps {
        eps /= ratio;
        out.push(eps);
        if eps / ratio < h2 {
            break;
        }
    }
    out
}

/// Coordinate-descent outcome at one ε.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpsilonLog {
    pub epsilon: f64,
    /// Completed u/v iterations.
    pub iterations: usize,
    /// sup|v_new − v_old| of the last completed iteration.
    pub last_variation: Option<f64>,
    pub converged: bool,
    /// Set when a linear solve failed and this ε was abandoned.
    pub failure: Option<String>,
}

/// Everything recorded for one λ value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LambdaLog {
    pub step: usize,
    pub lambda: f64,
    pub epsilons: Vec<EpsilonLog>,
    pub final_epsilon: f64,
    pub energies: EnergyReport,
}

impl LambdaLog {
    pub fn has_failure(&self) -> bool {
        self.epsilons.iter().any(|e| e.failure.is_some())
    }
}

/// Alternating minimisation of the AT functional over one image.
pub struct AlternatingSolver {
    pub cfg: ATConfig,
    bundle: OperatorBundle,
    solver: Box<dyn SpdSolver>,
    /// Normalised input, never modified.
    g: Form,
    u: Form,
    v: Form,
    pub log: Vec<LambdaLog>,
}

impl AlternatingSolver {
    /// Build the operator bundle for `raster` and initialise u = α g, v = 1.
    pub fn new(raster: &GrayRaster, config: ATConfig, solver: Box<dyn SpdSolver>) -> ATResult<Self> {
        config.validate()?;
        let cfg = config.normalised();

        log::info!(
            "building operators for {}x{} image",
            raster.width(),
            raster.height()
        );
        let bundle = OperatorBundle::for_raster(raster)?;
        let g = bundle.calculus().primal_form0_from_raster(raster)?;
        let u = g.scaled(cfg.alpha);
        let v = bundle
            .calculus()
            .constant_form(FormSpace::primal(1), 1.0);

        Ok(Self {
            cfg,
            bundle,
            solver,
            g,
            u,
            v,
            log: Vec::new(),
        })
    }

    pub fn with_backend(
        raster: &GrayRaster,
        config: ATConfig,
        backend: SolverBackend,
    ) -> ATResult<Self> {
        let suggested = SolverBackend::suggested(raster.width() * raster.height());
        if backend == SolverBackend::Ldl && suggested != backend {
            log::warn!(
                "{backend} solver on a {}x{} image, {suggested} is expected to be faster",
                raster.width(),
                raster.height()
            );
        }
        Self::new(raster, config, backend.build())
    }

    pub fn bundle(&self) -> &OperatorBundle {
        &self.bundle
    }

    pub fn g(&self) -> &Form {
        &self.g
    }

    pub fn u(&self) -> &Form {
        &self.u
    }

    pub fn v(&self) -> &Form {
        &self.v
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn lambda_schedule(&self) -> Vec<f64> {
        lambda_schedule(self.cfg.lambda_1, self.cfg.lambda_2, self.cfg.lambda_ratio)
    }

    pub fn epsilon_schedule(&self) -> Vec<f64> {
        epsilon_schedule(
            self.cfg.epsilon,
            self.cfg.grid_step,
            self.cfg.epsilon_ratio,
            self.cfg.annealing_steps,
        )
    }

    // ------------------------------------------------------------------
    // Coordinate descent
    // ------------------------------------------------------------------

    /// One u-solve followed by one v-solve. Returns sup|v_new − v_old|.
    ///
    /// u is kept if its solve succeeded even when the v-solve then fails.
    pub fn iterate(&mut self, base: &EdgeBase) -> ATResult<f64> {
        let h = self.cfg.grid_step;
        let alpha = self.cfg.alpha;

        let a = self.bundle.intensity_system(&self.v, alpha, h)?;
        let rhs = self.bundle.intensity_rhs(&self.g, alpha, h)?;
        let u = self.solver.solve(LinearSystem::Intensity, &a, &rhs)?;
        log::debug!("{}: {} OK", LinearSystem::Intensity, self.solver.name());
        self.u.assign(u)?;

        let w = self.bundle.gradient(&self.u)?;
        let b = self.bundle.edge_system(base, &w, h)?;
        let rhs = self.bundle.edge_rhs(base, h);
        let v = self.solver.solve(LinearSystem::EdgeField, &b, &rhs)?;
        log::debug!("{}: {} OK", LinearSystem::EdgeField, self.solver.name());

        let mut v = Form::from_values(FormSpace::primal(1), v);
        if self.cfg.clamp_edge_field {
            v.clamp(0.0, 1.0);
        }
        let delta = v.sup_distance(&self.v)?;
        self.v = v;
        Ok(delta)
    }

    /// Coordinate descent at a fixed (λ, ε), up to `max_iterations`.
    pub fn descend(&mut self, base: &EdgeBase) -> ATResult<EpsilonLog> {
        let mut outcome = EpsilonLog {
            epsilon: base.epsilon,
            ..Default::default()
        };
        for iter in 0..self.cfg.max_iterations {
            match self.iterate(base) {
                Ok(delta) => {
                    outcome.iterations = iter + 1;
                    outcome.last_variation = Some(delta);
                    log::debug!("iter {iter}: sup|dv| = {delta:e}");
                    if delta < self.cfg.tolerance {
                        outcome.converged = true;
                        break;
                    }
                }
                Err(e) if e.is_solve_failure() => {
                    log::error!(
                        "lambda={} epsilon={} iter {iter}: {e}",
                        base.lambda,
                        base.epsilon
                    );
                    outcome.failure = Some(e.to_string());
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Annealing and λ schedule
    // ------------------------------------------------------------------

    /// ε annealing for one λ, then the energy sample.
    pub fn run_lambda(&mut self, step: usize, lambda: f64) -> ATResult<LambdaLog> {
        log::info!("lambda = {lambda}");
        let mut epsilons = Vec::new();
        for epsilon in self.epsilon_schedule() {
            log::info!("  epsilon = {epsilon}");
            let base = self.bundle.edge_base(lambda, epsilon)?;
            epsilons.push(self.descend(&base)?);
        }
        let final_epsilon = epsilons.last().map_or(self.cfg.epsilon, |e| e.epsilon);

        let energies = EnergyReporter::new(&self.bundle, self.cfg.alpha, self.cfg.grid_step)
            .report(lambda, final_epsilon, &self.g, &self.u, &self.v)?;
        log::info!(
            "lambda = {lambda}: AT total {} (fidelity {}, diffusion {}, smoothness {}, penalty {})",
            energies.total,
            energies.fidelity,
            energies.diffusion,
            energies.edge_smoothness,
            energies.edge_penalty
        );

        let entry = LambdaLog {
            step,
            lambda,
            epsilons,
            final_epsilon,
            energies,
        };
        self.log.push(entry.clone());
        Ok(entry)
    }

    /// Full λ schedule. `on_lambda` receives each λ's log with the
    /// current u and v; an error from it aborts the run.
    pub fn run<F>(&mut self, mut on_lambda: F) -> ATResult<Vec<LambdaLog>>
    where
        F: FnMut(&LambdaLog, &Form, &Form) -> ATResult<()>,
    {
        let schedule = self.lambda_schedule();
        log::info!(
            "{} lambda values, {} solver, at most {} iterations per epsilon",
            schedule.len(),
            self.solver.name(),
            self.cfg.max_iterations
        );
        let mut logs = Vec::with_capacity(schedule.len());
        for (step, lambda) in schedule.into_iter().enumerate() {
            let entry = self.run_lambda(step, lambda)?;
            on_lambda(&entry, &self.u, &self.v)?;
            logs.push(entry);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spd::LdlSolver;
    use at_types::ATError;

    /// 4x4 image, left two columns black, right two white.
    fn step_image() -> GrayRaster {
        let row = [0u8, 0, 255, 255];
        GrayRaster::from_pixels(4, 4, row.repeat(4)).unwrap()
    }

    fn step_config() -> ATConfig {
        ATConfig {
            alpha: 1.0,
            epsilon: 1.0,
            grid_step: 1.0,
            max_iterations: 10,
            ..ATConfig::default()
        }
        .with_single_lambda(0.05)
    }

    /// LDL that fails every v-system solve.
    struct FailingEdgeSolver(LdlSolver);

    impl SpdSolver for FailingEdgeSolver {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn solve(
            &mut self,
            system: LinearSystem,
            a: &at_dec::Operator,
            rhs: &[f64],
        ) -> ATResult<Vec<f64>> {
            match system {
                LinearSystem::EdgeField => Err(ATError::solve_failed(system, "injected")),
                LinearSystem::Intensity => self.0.solve(system, a, rhs),
            }
        }
    }

    #[test]
    fn test_lambda_schedule_count() {
        let s = lambda_schedule(0.3125, 0.01, 2.0);
        assert_eq!(s, vec![0.3125, 0.15625, 0.078125, 0.0390625, 0.01953125]);
        assert_eq!(lambda_schedule(0.05, 0.05, 2.0), vec![0.05]);
        assert_eq!(lambda_schedule(0.05, 0.05, 1.0), vec![0.05]);
        assert!(lambda_schedule(0.01, 0.05, 2.0).is_empty());
    }

    #[test]
    fn test_lambda_schedule_default_length() {
        let cfg = ATConfig::default();
        let s = lambda_schedule(cfg.lambda_1, cfg.lambda_2, cfg.lambda_ratio);
        let expected = ((cfg.lambda_1 / cfg.lambda_2).ln() / cfg.lambda_ratio.ln()).floor() as usize + 1;
        assert_eq!(s.len(), expected);
        assert!(s.windows(2).all(|w| w[1] < w[0]));
        assert!(*s.last().unwrap() >= cfg.lambda_2);
    }

    #[test]
    fn test_epsilon_schedule() {
        assert_eq!(epsilon_schedule(4.0, 1.0, 2.0, 5), vec![4.0, 2.0, 1.0]);
        assert_eq!(epsilon_schedule(1.0, 0.5, 2.0, 5), vec![1.0, 0.5, 0.25]);
        assert_eq!(
            epsilon_schedule(100.0, 1.0, 2.0, 5),
            vec![100.0, 50.0, 25.0, 12.5, 6.25]
        );
        // first step always runs
        assert_eq!(epsilon_schedule(1.0, 1.0, 2.0, 5), vec![1.0]);
        assert_eq!(epsilon_schedule(0.1, 1.0, 2.0, 1), vec![0.1]);
        assert!(epsilon_schedule(4.0, 1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn test_initial_state() {
        let cfg = ATConfig {
            alpha: 0.5,
            ..ATConfig::default()
        };
        let s = AlternatingSolver::with_backend(&step_image(), cfg, SolverBackend::Ldl).unwrap();
        assert_eq!(s.g().values()[3], 1.0);
        assert_eq!(s.u().values()[3], 0.5);
        assert!(s.v().values().iter().all(|&x| x == 1.0));
        assert_eq!(s.v().len(), s.bundle().n1());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = ATConfig {
            grid_step: 0.0,
            ..ATConfig::default()
        };
        assert!(AlternatingSolver::with_backend(&step_image(), cfg, SolverBackend::Ldl).is_err());
    }

    #[test]
    fn test_two_pixel_images_solve() {
        for (w, h) in [(1, 2), (2, 1)] {
            let raster = GrayRaster::from_pixels(w, h, vec![0, 255]).unwrap();
            for backend in [SolverBackend::Ldl, SolverBackend::ConjugateGradient] {
                let mut s = AlternatingSolver::with_backend(&raster, step_config(), backend)
                    .unwrap();
                let logs = s.run(|_, _, _| Ok(())).unwrap();
                assert!(!logs[0].has_failure(), "{w}x{h} {backend}: {:?}", logs[0]);
                assert_eq!(s.v().len(), 1);
                let (u, v) = (s.u().values(), s.v().values()[0]);
                assert!(u[0] < u[1], "{w}x{h} {backend}: u = {u:?}");
                assert!(v.is_finite() && v < 1.0, "{w}x{h} {backend}: v = {v}");
                assert!(logs[0].energies.is_well_formed());
            }
        }
    }

    #[test]
    fn test_step_edge_detected() {
        let mut s =
            AlternatingSolver::with_backend(&step_image(), step_config(), SolverBackend::Ldl)
                .unwrap();
        let logs = s.run(|_, _, _| Ok(())).unwrap();
        assert_eq!(logs.len(), 1);
        let lam = &logs[0];
        assert_eq!(lam.epsilons.len(), 1);
        assert_eq!(lam.final_epsilon, 1.0);
        let eps = &lam.epsilons[0];
        assert!(eps.converged, "{eps:?}");
        assert!(eps.iterations < 10, "{eps:?}");
        assert!(eps.failure.is_none());

        let complex = s.bundle().calculus().complex();
        let v = s.v().values();
        let mut step_max = f64::MIN;
        let mut other_min = f64::MAX;
        for (k, &x) in complex.cells(1).iter().zip(v) {
            if k.kx == 3 && k.ky % 2 == 0 {
                step_max = step_max.max(x);
            } else {
                other_min = other_min.min(x);
            }
        }
        assert!(step_max < 0.05, "v on step edges = {step_max}");
        assert!(step_max < other_min, "step {step_max} vs other {other_min}");

        let u = s.u().values();
        for y in 0..4 {
            for x in 0..4 {
                let val = u[y * 4 + x];
                if x < 2 {
                    assert!(val < 0.01, "u({x},{y}) = {val}");
                } else {
                    assert!(val > 0.99, "u({x},{y}) = {val}");
                }
            }
        }
        assert!(lam.energies.is_well_formed(), "{:?}", lam.energies);
    }

    #[test]
    fn test_cg_backend_agrees_with_ldl() {
        let mut a =
            AlternatingSolver::with_backend(&step_image(), step_config(), SolverBackend::Ldl)
                .unwrap();
        let mut b = AlternatingSolver::with_backend(
            &step_image(),
            step_config(),
            SolverBackend::ConjugateGradient,
        )
        .unwrap();
        a.run(|_, _, _| Ok(())).unwrap();
        b.run(|_, _, _| Ok(())).unwrap();
        let d = a.v().sup_distance(b.v()).unwrap();
        assert!(d < 1e-6, "sup|v_ldl - v_cg| = {d}");
    }

    #[test]
    fn test_constant_image_keeps_u_at_g() {
        let raster = GrayRaster::filled(3, 3, 128);
        let cfg = ATConfig::default().with_single_lambda(0.1);
        let mut s = AlternatingSolver::with_backend(&raster, cfg, SolverBackend::Ldl).unwrap();
        let logs = s.run(|_, _, _| Ok(())).unwrap();

        let d = s.u().sup_distance(s.g()).unwrap();
        assert!(d < 1e-9, "sup|u - g| = {d}");
        let w = s.bundle().gradient(s.u()).unwrap();
        assert!(w.values().iter().all(|x| x.abs() < 1e-9));

        // v solves the reduced system h·BB(λ,ε) v = (h/ε)(λ/4) 𝟙
        let base = s.bundle().edge_base(0.1, logs[0].final_epsilon).unwrap();
        let h = s.cfg.grid_step;
        let expected = LdlSolver::default()
            .solve(
                LinearSystem::EdgeField,
                &base.bb.scaled(h),
                &s.bundle().edge_rhs(&base, h),
            )
            .unwrap();
        for (a, b) in s.v().values().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-9, "v {a} vs reduced {b}");
        }
        assert!(logs[0].energies.diffusion.abs() < 1e-12);
        assert!(logs[0].energies.fidelity < 1e-12);
    }

    #[test]
    fn test_termination_bounds() {
        let raster = GrayRaster::from_pixels(3, 2, vec![10, 200, 30, 90, 250, 0]).unwrap();
        let cfg = ATConfig {
            lambda_1: 0.3125,
            lambda_2: 0.01,
            lambda_ratio: 2.0,
            epsilon: 4.0,
            max_iterations: 3,
            ..ATConfig::default()
        };
        let mut s = AlternatingSolver::with_backend(&raster, cfg, SolverBackend::Ldl).unwrap();
        let mut seen = Vec::new();
        let logs = s
            .run(|entry, u, v| {
                assert_eq!(u.len(), 6);
                assert_eq!(v.len(), 7);
                seen.push(entry.lambda);
                Ok(())
            })
            .unwrap();
        assert_eq!(logs.len(), 5);
        assert_eq!(seen, vec![0.3125, 0.15625, 0.078125, 0.0390625, 0.01953125]);
        assert_eq!(s.log.len(), 5);
        for lam in &logs {
            assert_eq!(lam.epsilons.len(), 3);
            assert_eq!(lam.final_epsilon, 1.0);
            for e in &lam.epsilons {
                assert!(e.iterations <= 3);
                if e.iterations < 3 {
                    assert!(e.converged);
                    let dv = e.last_variation.unwrap();
                    assert!(dv < 1e-4, "early exit with variation {dv}");
                }
            }
        }
    }

    #[test]
    fn test_zero_iterations_leaves_state() {
        let cfg = ATConfig {
            max_iterations: 0,
            ..step_config()
        };
        let mut s =
            AlternatingSolver::with_backend(&step_image(), cfg, SolverBackend::Ldl).unwrap();
        let logs = s.run(|_, _, _| Ok(())).unwrap();
        let e = &logs[0].epsilons[0];
        assert_eq!(e.iterations, 0);
        assert!(!e.converged);
        assert!(e.last_variation.is_none());
        assert_eq!(s.u(), &s.g().scaled(1.0));
    }

    #[test]
    fn test_clamp_edge_field_option() {
        let cfg = ATConfig {
            clamp_edge_field: true,
            ..step_config()
        };
        let mut s =
            AlternatingSolver::with_backend(&step_image(), cfg, SolverBackend::Ldl).unwrap();
        s.run(|_, _, _| Ok(())).unwrap();
        assert!(s.v().values().iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn test_solve_failure_recorded_and_run_continues() {
        let cfg = ATConfig {
            lambda_1: 0.1,
            lambda_2: 0.05,
            lambda_ratio: 2.0,
            ..step_config()
        };
        let solver = Box::new(FailingEdgeSolver(LdlSolver::default()));
        let mut s = AlternatingSolver::new(&step_image(), cfg, solver).unwrap();
        let logs = s.run(|_, _, _| Ok(())).unwrap();
        assert_eq!(logs.len(), 2);
        for lam in &logs {
            assert!(lam.has_failure());
            let e = &lam.epsilons[0];
            assert_eq!(e.iterations, 0);
            assert!(e.failure.as_deref().unwrap_or("").contains("v-system"));
        }
        // v never solved, u solved with v = 1
        assert!(s.v().values().iter().all(|&x| x == 1.0));
        assert!(s.u().sup_distance(s.g()).unwrap() > 0.0);
    }

    #[test]
    fn test_callback_error_aborts() {
        let cfg = ATConfig {
            lambda_1: 0.1,
            lambda_2: 0.01,
            lambda_ratio: 2.0,
            max_iterations: 2,
            ..ATConfig::default()
        };
        let mut s = AlternatingSolver::with_backend(&step_image(), cfg, SolverBackend::Ldl).unwrap();
        let err = s
            .run(|_, _, _| Err(ATError::Image("disk full".into())))
            .unwrap_err();
        assert!(matches!(err, ATError::Image(_)));
        assert_eq!(s.log.len(), 1);
    }
}
