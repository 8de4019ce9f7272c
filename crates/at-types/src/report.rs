// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Energy Report Types
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

/// Header line of the tab-separated report file.
pub const REPORT_HEADER: &str =
    "#  l\ta\te\ta(u-g)^2\tv^2|grad u|^2\tle|grad v|^2\tl(1-v)^2/4e\tl.per\tAT tot";

/// Truncate toward zero to `digits` decimals.
///
/// Non-finite values pass through unchanged.
#[inline]
pub fn truncate_decimals(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits);
    (value * scale).trunc() / scale
}

/// The five AT energy terms and their combinations for one λ value.
///
/// Sampled from the final u, v, ε of that λ. Diagnostics only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyReport {
    pub lambda: f64,
    pub alpha: f64,
    /// Last ε used by the annealing loop.
    pub epsilon: f64,
    /// Σ α (u − g)²
    pub fidelity: f64,
    /// uᵀ D0ᵀ diag(v²) D0 u
    pub diffusion: f64,
    /// λ ε vᵀ curl_curl v
    pub edge_smoothness: f64,
    /// Σ λ/(4ε) (1 − v)²
    pub edge_penalty: f64,
    /// h (edge_smoothness + edge_penalty)
    pub perimeter: f64,
    /// h² fidelity + h (diffusion + edge_smoothness + edge_penalty)
    pub total: f64,
}

impl EnergyReport {
    /// One tab-separated report row with the column truncations applied.
    pub fn to_row(&self) -> String {
        let cols = [
            truncate_decimals(self.lambda, 8),
            self.alpha,
            truncate_decimals(self.epsilon, 4),
            truncate_decimals(self.fidelity, 5),
            truncate_decimals(self.diffusion, 5),
            truncate_decimals(self.edge_smoothness, 5),
            truncate_decimals(self.edge_penalty, 5),
            truncate_decimals(self.perimeter, 5),
            truncate_decimals(self.total, 5),
        ];
        cols.iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\t")
    }

    /// Every energy term is finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        [
            self.fidelity,
            self.diffusion,
            self.edge_smoothness,
            self.edge_penalty,
            self.perimeter,
            self.total,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_positive() {
        assert_eq!(truncate_decimals(0.123456789, 5), 0.12345);
        assert_eq!(truncate_decimals(2.99999, 2), 2.99);
    }

    #[test]
    fn test_truncate_toward_zero_for_negative() {
        assert_eq!(truncate_decimals(-1.23456, 3), -1.234);
    }

    #[test]
    fn test_truncate_non_finite_passthrough() {
        assert!(truncate_decimals(f64::NAN, 4).is_nan());
        assert_eq!(truncate_decimals(f64::INFINITY, 4), f64::INFINITY);
    }

    #[test]
    fn test_header_has_nine_columns() {
        assert_eq!(REPORT_HEADER.split('\t').count(), 9);
        assert!(REPORT_HEADER.starts_with('#'));
    }

    #[test]
    fn test_row_truncates_columns() {
        let report = EnergyReport {
            lambda: 0.3125,
            alpha: 1.0,
            epsilon: 0.123456,
            fidelity: 1.234567,
            diffusion: 0.0,
            edge_smoothness: 2.5,
            edge_penalty: 0.000019,
            perimeter: 2.500019,
            total: 3.734586,
        };
        let row = report.to_row();
        let cols: Vec<&str> = row.split('\t').collect();
        assert_eq!(cols.len(), 9);
        assert_eq!(cols[0], "0.3125");
        assert_eq!(cols[1], "1");
        assert_eq!(cols[2], "0.1234");
        assert_eq!(cols[3], "1.23456");
        assert_eq!(cols[4], "0");
        assert_eq!(cols[6], "0.00001");
        assert_eq!(cols[8], "3.73458");
    }

    #[test]
    fn test_well_formed() {
        let mut report = EnergyReport::default();
        assert!(report.is_well_formed());
        report.diffusion = -1e-3;
        assert!(!report.is_well_formed());
        report.diffusion = f64::NAN;
        assert!(!report.is_well_formed());
    }
}
