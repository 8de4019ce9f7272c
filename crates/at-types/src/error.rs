// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use thiserror::Error;

/// Which of the two alternating linear systems a solve belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearSystem {
    /// `(h·D0ᵀ diag(v²) D0 + α h² Id) u = h² α g`
    Intensity,
    /// `(h·BB(λ,ε) + h·diag(w²)) v = (h/ε)(λ/4) 𝟙`
    EdgeField,
}

impl fmt::Display for LinearSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intensity => write!(f, "u-system"),
            Self::EdgeField => write!(f, "v-system"),
        }
    }
}

/// Root error type for all kernel failures.
#[derive(Error, Debug)]
pub enum ATError {
    /// Invalid parameter set.
    #[error("config error: {0}")]
    Config(String),

    /// Grid or raster has an unusable shape.
    #[error("shape error: {0}")]
    Shape(String),

    /// Operator/form spaces or lengths do not line up.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    /// The SPD backend could not factorize or solve a system.
    #[error("linear solve failed on {system}: {reason}")]
    LinearSolveFailed { system: LinearSystem, reason: String },

    /// NaN/Inf reached a place that requires finite values.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Report or raster file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(String),
}

impl ATError {
    pub fn solve_failed(system: LinearSystem, reason: impl Into<String>) -> Self {
        Self::LinearSolveFailed {
            system,
            reason: reason.into(),
        }
    }

    /// True for failures the alternating solver recovers from by
    /// abandoning the current (λ, ε) configuration.
    pub fn is_solve_failure(&self) -> bool {
        matches!(self, Self::LinearSolveFailed { .. })
    }
}

pub type ATResult<T> = Result<T, ATError>;
