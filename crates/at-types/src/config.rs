// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ATError, ATResult};

/// Parameters of one Ambrosio-Tortorelli run.
///
/// ```text
///  /
///  | a.(u-g)^2 + v^2 |grad u|^2 + le.|grad v|^2 + (l/4e).(1-v)^2
///  /
/// ```
///
/// Missing fields take their defaults when deserialised, so a partial
/// JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ATConfig {
    /// Fidelity weight α.
    /// Default: 1.0.
    pub alpha: f64,

    /// Base half edge-width ε₀. Annealing starts from this value.
    /// Default: 1.0.
    pub epsilon: f64,

    /// Grid step h.
    /// Default: 1.0.
    pub grid_step: f64,

    /// Initial (largest) λ of the schedule.
    /// Default: 0.3125.
    pub lambda_1: f64,

    /// Final λ; the schedule stops once λ drops below it.
    /// Default: 0.00005.
    pub lambda_2: f64,

    /// Division ratio between successive λ values.
    /// Default: √2.
    pub lambda_ratio: f64,

    /// Coordinate-descent iteration cap per (λ, ε).
    /// Default: 10.
    pub max_iterations: usize,

    /// Sup-norm variation of v below which coordinate descent stops.
    /// Default: 1e-4.
    pub tolerance: f64,

    /// Maximum number of ε-annealing steps per λ, at least 1.
    /// Default: 5.
    pub annealing_steps: usize,

    /// Division ratio of ε between annealing steps.
    /// Default: 2.0.
    pub epsilon_ratio: f64,

    /// Clamp v to [0, 1] after every v-solve.
    /// Default: false.
    pub clamp_edge_field: bool,
}

impl Default for ATConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            epsilon: 1.0,
            grid_step: 1.0,
            lambda_1: 0.3125,
            lambda_2: 0.00005,
            lambda_ratio: std::f64::consts::SQRT_2,
            max_iterations: 10,
            tolerance: 1e-4,
            annealing_steps: 5,
            epsilon_ratio: 2.0,
            clamp_edge_field: false,
        }
    }
}

fn require_positive(name: &str, value: f64) -> ATResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ATError::Config(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

impl ATConfig {
    /// Run a single λ value: λ₁ = λ₂ = `lambda`.
    pub fn with_single_lambda(mut self, lambda: f64) -> Self {
        self.lambda_1 = lambda;
        self.lambda_2 = lambda;
        self
    }

    /// Validate configuration parameters.
    ///
    /// The λ ordering and the ratio are not checked here; those are
    /// clamped by [`ATConfig::normalised`] instead of being rejected.
    pub fn validate(&self) -> ATResult<()> {
        require_positive("alpha", self.alpha)?;
        require_positive("epsilon", self.epsilon)?;
        require_positive("grid_step", self.grid_step)?;
        require_positive("lambda_1", self.lambda_1)?;
        require_positive("lambda_2", self.lambda_2)?;
        require_positive("tolerance", self.tolerance)?;
        if !self.lambda_ratio.is_finite() {
            return Err(ATError::Config(format!(
                "lambda_ratio must be finite, got {}",
                self.lambda_ratio
            )));
        }
        if self.annealing_steps == 0 {
            return Err(ATError::Config(
                "annealing_steps must be at least 1".into(),
            ));
        }
        if !self.epsilon_ratio.is_finite() || self.epsilon_ratio <= 1.0 {
            return Err(ATError::Config(format!(
                "epsilon_ratio must be > 1, got {}",
                self.epsilon_ratio
            )));
        }
        Ok(())
    }

    /// Apply the silent clamps on the λ schedule.
    ///
    /// λ₂ > λ₁ becomes λ₂ = λ₁; a ratio ≤ 1 becomes √2.
    pub fn normalised(mut self) -> Self {
        if self.lambda_2 > self.lambda_1 {
            log::warn!(
                "lambda_2={} > lambda_1={}, clamping lambda_2 to lambda_1",
                self.lambda_2,
                self.lambda_1
            );
            self.lambda_2 = self.lambda_1;
        }
        if self.lambda_ratio <= 1.0 {
            log::warn!(
                "lambda_ratio={} <= 1, falling back to sqrt(2)",
                self.lambda_ratio
            );
            self.lambda_ratio = std::f64::consts::SQRT_2;
        }
        self
    }

    /// Load from JSON string. Absent fields keep their defaults.
    pub fn from_json(json: &str) -> ATResult<Self> {
        serde_json::from_str(json).map_err(|e| ATError::Config(format!("JSON parse error: {e}")))
    }

    /// Serialise to pretty JSON.
    pub fn to_json(&self) -> ATResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ATError::Config(format!("JSON encode error: {e}")))
    }
}
