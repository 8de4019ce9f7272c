// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Discrete Forms
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use at_types::{ATError, ATResult};

/// Which complex a form or operator lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duality {
    Primal,
    Dual,
}

/// Degree + complex of a form, e.g. primal 1-forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormSpace {
    pub order: usize,
    pub duality: Duality,
}

impl FormSpace {
    pub const fn primal(order: usize) -> Self {
        Self {
            order,
            duality: Duality::Primal,
        }
    }

    pub const fn dual(order: usize) -> Self {
        Self {
            order,
            duality: Duality::Dual,
        }
    }

    /// Dimension of the primal cells carrying this space's values
    /// in a 2-complex: dual k-cells sit on primal (2−k)-cells.
    pub fn primal_cell_dim(&self) -> usize {
        match self.duality {
            Duality::Primal => self.order,
            Duality::Dual => 2 - self.order.min(2),
        }
    }
}

impl fmt::Display for FormSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = match self.duality {
            Duality::Primal => "primal",
            Duality::Dual => "dual",
        };
        write!(f, "{d} {}-form", self.order)
    }
}

/// Values attached to every cell of one form space.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    space: FormSpace,
    values: Vec<f64>,
}

impl Form {
    pub fn zeros(space: FormSpace, len: usize) -> Self {
        Self::constant(space, len, 0.0)
    }

    pub fn constant(space: FormSpace, len: usize, value: f64) -> Self {
        Self {
            space,
            values: vec![value; len],
        }
    }

    pub fn from_values(space: FormSpace, values: Vec<f64>) -> Self {
        Self { space, values }
    }

    pub fn space(&self) -> FormSpace {
        self.space
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Replace the values, keeping the space. Length must not change.
    pub fn assign(&mut self, values: Vec<f64>) -> ATResult<()> {
        if values.len() != self.values.len() {
            return Err(ATError::Dimension(format!(
                "cannot assign {} values to a {} of length {}",
                values.len(),
                self.space,
                self.values.len()
            )));
        }
        self.values = values;
        Ok(())
    }

    pub fn scaled(&self, s: f64) -> Self {
        Self {
            space: self.space,
            values: self.values.iter().map(|&x| s * x).collect(),
        }
    }

    /// Elementwise square, used for the diagonal mass terms.
    pub fn squared(&self) -> Self {
        Self {
            space: self.space,
            values: self.values.iter().map(|&x| x * x).collect(),
        }
    }

    pub fn dot(&self, other: &Form) -> ATResult<f64> {
        self.check_compatible(other)?;
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum())
    }

    /// max |self − other|
    pub fn sup_distance(&self, other: &Form) -> ATResult<f64> {
        self.check_compatible(other)?;
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .fold(0.0, |acc: f64, (a, b)| acc.max((a - b).abs())))
    }

    /// (min, max) of the values; `None` for an empty form.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let first = *self.values.first()?;
        Some(
            self.values
                .iter()
                .fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x))),
        )
    }

    pub fn clamp(&mut self, lo: f64, hi: f64) {
        for x in self.values.iter_mut() {
            *x = x.clamp(lo, hi);
        }
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|x| x.is_finite())
    }

    fn check_compatible(&self, other: &Form) -> ATResult<()> {
        if self.space != other.space || self.len() != other.len() {
            return Err(ATError::Dimension(format!(
                "{} of length {} vs {} of length {}",
                self.space,
                self.len(),
                other.space,
                other.len()
            )));
        }
        Ok(())
    }
}
