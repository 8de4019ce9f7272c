// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Sparse Form Operators
// ─────────────────────────────────────────────────────────────────────
//! Linear maps between form spaces, stored as CSR matrices.
//!
//! Every operator records its source and target space; composition and
//! sums check them, so a mis-ordered product is an error instead of a
//! silently wrong matrix.

use sprs::{CsMat, TriMat};

use at_types::{ATError, ATResult};

use crate::form::{Form, FormSpace};

#[derive(Debug, Clone)]
pub struct Operator {
    source: FormSpace,
    target: FormSpace,
    /// rows = target length, cols = source length
    matrix: CsMat<f64>,
}

impl Operator {
    pub fn new(source: FormSpace, target: FormSpace, matrix: CsMat<f64>) -> Self {
        let matrix = if matrix.is_csr() {
            matrix
        } else {
            matrix.to_csr()
        };
        Self {
            source,
            target,
            matrix,
        }
    }

    /// Build from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(
        source: FormSpace,
        target: FormSpace,
        shape: (usize, usize),
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut tri = TriMat::new(shape);
        for (r, c, v) in triplets {
            tri.add_triplet(r, c, v);
        }
        Self::new(source, target, tri.to_csr())
    }

    /// Diagonal operator on `space` with the given entries.
    pub fn diagonal(space: FormSpace, diag: &[f64]) -> Self {
        let n = diag.len();
        let matrix = CsMat::new((n, n), (0..=n).collect(), (0..n).collect(), diag.to_vec());
        Self::new(space, space, matrix)
    }

    /// Identity on `space` of length `n`.
    pub fn identity(space: FormSpace, n: usize) -> Self {
        Self::new(space, space, CsMat::eye(n))
    }

    /// Same matrix, reinterpreted as mapping into `target`.
    pub fn retarget(self, target: FormSpace) -> Operator {
        Self { target, ..self }
    }

    pub fn source(&self) -> FormSpace {
        self.source
    }

    pub fn target(&self) -> FormSpace {
        self.target
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> CsMat<f64> {
        self.matrix
    }

    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    pub fn cols(&self) -> usize {
        self.matrix.cols()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Entry at (row, col); structural zeros read as 0.
    pub fn coeff(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }

    /// `self ∘ rhs`: apply `rhs` first, then `self`.
    pub fn compose(&self, rhs: &Operator) -> ATResult<Operator> {
        if rhs.target != self.source || rhs.rows() != self.cols() {
            return Err(ATError::Dimension(format!(
                "cannot compose ({} -> {}, {}x{}) after ({} -> {}, {}x{})",
                self.source,
                self.target,
                self.rows(),
                self.cols(),
                rhs.source,
                rhs.target,
                rhs.rows(),
                rhs.cols()
            )));
        }
        let product = &self.matrix * &rhs.matrix;
        Ok(Operator::new(rhs.source, self.target, product))
    }

    pub fn add(&self, other: &Operator) -> ATResult<Operator> {
        if self.source != other.source
            || self.target != other.target
            || self.matrix.shape() != other.matrix.shape()
        {
            return Err(ATError::Dimension(format!(
                "cannot add ({} -> {}, {}x{}) and ({} -> {}, {}x{})",
                self.source,
                self.target,
                self.rows(),
                self.cols(),
                other.source,
                other.target,
                other.rows(),
                other.cols()
            )));
        }
        let sum = &self.matrix + &other.matrix;
        Ok(Operator::new(self.source, self.target, sum))
    }

    pub fn scaled(&self, s: f64) -> Operator {
        Operator::new(self.source, self.target, self.matrix.map(|&x| s * x))
    }

    /// Adjoint with respect to the standard inner products.
    pub fn transpose(&self) -> Operator {
        Operator::new(self.target, self.source, self.matrix.transpose_view().to_csr())
    }

    /// y = A x on raw slices.
    pub fn mul_vec(&self, x: &[f64]) -> ATResult<Vec<f64>> {
        if x.len() != self.cols() {
            return Err(ATError::Dimension(format!(
                "operator with {} columns applied to vector of length {}",
                self.cols(),
                x.len()
            )));
        }
        let mut y = vec![0.0; self.rows()];
        for (row, vec) in self.matrix.outer_iterator().enumerate() {
            y[row] = vec.iter().map(|(col, &a)| a * x[col]).sum();
        }
        Ok(y)
    }

    /// Apply to a form of the source space.
    pub fn apply(&self, form: &Form) -> ATResult<Form> {
        if form.space() != self.source {
            return Err(ATError::Dimension(format!(
                "operator on {} applied to a {}",
                self.source,
                form.space()
            )));
        }
        Ok(Form::from_values(self.target, self.mul_vec(form.values())?))
    }

    /// xᵀ A x as one sparse mat-vec plus a dot product.
    pub fn quadratic_form(&self, x: &[f64]) -> ATResult<f64> {
        if self.rows() != self.cols() {
            return Err(ATError::Dimension(format!(
                "quadratic form of a non-square {}x{} operator",
                self.rows(),
                self.cols()
            )));
        }
        let ax = self.mul_vec(x)?;
        Ok(x.iter().zip(ax.iter()).map(|(a, b)| a * b).sum())
    }

    /// Diagonal entries (structural zeros as 0).
    pub fn diag(&self) -> Vec<f64> {
        let n = self.rows().min(self.cols());
        let mut d = vec![0.0; n];
        for (row, vec) in self.matrix.outer_iterator().enumerate().take(n) {
            if let Some(&a) = vec.get(row) {
                d[row] = a;
            }
        }
        d
    }

    /// Symmetric up to `rel_tol · max|a_ij|`.
    pub fn is_symmetric(&self, rel_tol: f64) -> bool {
        if self.rows() != self.cols() {
            return false;
        }
        let scale = self
            .matrix
            .data()
            .iter()
            .fold(0.0_f64, |acc, a| acc.max(a.abs()))
            .max(f64::MIN_POSITIVE);
        let tol = rel_tol * scale;
        self.matrix.outer_iterator().enumerate().all(|(row, vec)| {
            vec.iter()
                .all(|(col, &a)| (a - self.coeff(col, row)).abs() <= tol)
        })
    }
}
