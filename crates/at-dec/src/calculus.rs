// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Grid Calculus
// ─────────────────────────────────────────────────────────────────────
//! Discrete exterior calculus on the pixel complex.
//!
//! Sign conventions (n = 2, unit cell measures):
//!   - d0: edge (lower → upper pixel) gets −1 / +1
//!   - d1: face boundary counter-clockwise, bottom/right +1, top/left −1
//!   - dual d_(n−1−k) = (−1)^(k+1) d_kᵀ
//!   - primal ⋆_k = +Id, dual ⋆_k = (−1)^(k(n−k)) Id
//!
//! With these, −⋆̃2 d̃1 ⋆1 = d0ᵀ and the curl-curl operator
//! −(d0 ⋆̃2 d̃1 ⋆1 + ⋆̃1 d̃0 ⋆2 d1) = d0 d0ᵀ + d1ᵀ d1 is positive definite.

use at_types::{ATError, ATResult};

use crate::complex::PixelComplex;
use crate::form::{Duality, Form, FormSpace};
use crate::operator::Operator;
use crate::raster::GrayRaster;

/// Embedding dimension of the pixel complex.
pub const DIM: usize = 2;

#[derive(Debug, Clone)]
pub struct GridCalculus {
    complex: PixelComplex,
}

impl GridCalculus {
    pub fn new(width: usize, height: usize) -> ATResult<Self> {
        let complex = PixelComplex::new(width, height)?;
        log::debug!(
            "pixel complex {width}x{height}: {} vertices, {} edges, {} faces",
            complex.cell_count(0),
            complex.cell_count(1),
            complex.cell_count(2)
        );
        Ok(Self { complex })
    }

    /// Calculus over the pixel grid of `raster`.
    pub fn for_raster(raster: &GrayRaster) -> ATResult<Self> {
        Self::new(raster.width(), raster.height())
    }

    pub fn complex(&self) -> &PixelComplex {
        &self.complex
    }

    /// Number of values of a form in `space`.
    pub fn len(&self, space: FormSpace) -> usize {
        if space.order > DIM {
            return 0;
        }
        self.complex.cell_count(space.primal_cell_dim())
    }

    pub fn zero_form(&self, space: FormSpace) -> Form {
        Form::zeros(space, self.len(space))
    }

    pub fn constant_form(&self, space: FormSpace, value: f64) -> Form {
        Form::constant(space, self.len(space), value)
    }

    /// Normalised intensities `pixel / 255` as a primal 0-form.
    pub fn primal_form0_from_raster(&self, raster: &GrayRaster) -> ATResult<Form> {
        if raster.width() != self.complex.width() || raster.height() != self.complex.height() {
            return Err(ATError::Shape(format!(
                "raster {}x{} does not match complex {}x{}",
                raster.width(),
                raster.height(),
                self.complex.width(),
                self.complex.height()
            )));
        }
        let values = self
            .complex
            .cells(0)
            .iter()
            .map(|k| {
                let (x, y) = k.pixel();
                f64::from(raster.get(x, y).unwrap_or(0)) / 255.0
            })
            .collect();
        Ok(Form::from_values(FormSpace::primal(0), values))
    }

    /// Exterior derivative `d_k` on the primal or dual complex.
    pub fn derivative(&self, order: usize, duality: Duality) -> ATResult<Operator> {
        if order >= DIM {
            return Err(ATError::Dimension(format!(
                "no {order}-derivative on a {DIM}-complex"
            )));
        }
        match duality {
            Duality::Primal => Ok(self.primal_derivative(order)),
            Duality::Dual => {
                // d̃_(n−1−k) = (−1)^(k+1) d_kᵀ
                let k = DIM - 1 - order;
                let sign = if (k + 1) % 2 == 0 { 1.0 } else { -1.0 };
                let transposed = self.primal_derivative(k).transpose().scaled(sign);
                Ok(Operator::new(
                    FormSpace::dual(order),
                    FormSpace::dual(order + 1),
                    transposed.into_matrix(),
                ))
            }
        }
    }

    fn primal_derivative(&self, order: usize) -> Operator {
        let c = &self.complex;
        let source = FormSpace::primal(order);
        let target = FormSpace::primal(order + 1);
        let shape = (c.cell_count(order + 1), c.cell_count(order));
        if order == 0 {
            let triplets = (0..c.cell_count(1)).filter_map(|e| {
                c.edge_endpoints(e)
                    .map(|(lo, hi)| [(e, lo, -1.0), (e, hi, 1.0)])
            });
            Operator::from_triplets(source, target, shape, triplets.flatten())
        } else {
            let triplets = (0..c.cell_count(2)).filter_map(|f| {
                c.face_boundary(f)
                    .map(|b| b.map(|(edge, sign)| (f, edge, sign)))
            });
            Operator::from_triplets(source, target, shape, triplets.flatten())
        }
    }

    /// Hodge star from the `order`-forms of `duality` to the
    /// complementary forms of the other complex.
    pub fn hodge(&self, order: usize, duality: Duality) -> ATResult<Operator> {
        if order > DIM {
            return Err(ATError::Dimension(format!(
                "no {order}-hodge on a {DIM}-complex"
            )));
        }
        let (source, target, sign) = match duality {
            Duality::Primal => (FormSpace::primal(order), FormSpace::dual(DIM - order), 1.0),
            Duality::Dual => {
                // ⋆⋆ = (−1)^(k(n−k)) on primal k-forms, k = n − order
                let k = DIM - order;
                let sign = if (k * (DIM - k)) % 2 == 0 { 1.0 } else { -1.0 };
                (FormSpace::dual(order), FormSpace::primal(DIM - order), sign)
            }
        };
        let n = self.len(source);
        Ok(Operator::diagonal(source, &vec![sign; n]).retarget(target))
    }

    /// Identity (unit mass) on the `order`-forms of `duality`.
    pub fn identity(&self, order: usize, duality: Duality) -> ATResult<Operator> {
        if order > DIM {
            return Err(ATError::Dimension(format!(
                "no {order}-forms on a {DIM}-complex"
            )));
        }
        let space = FormSpace { order, duality };
        Ok(Operator::identity(space, self.len(space)))
    }

    /// Mass operator with the values of `form` on its diagonal.
    pub fn diagonal(&self, form: &Form) -> ATResult<Operator> {
        if form.len() != self.len(form.space()) {
            return Err(ATError::Dimension(format!(
                "{} has {} values, complex has {} cells",
                form.space(),
                form.len(),
                self.len(form.space())
            )));
        }
        Ok(Operator::diagonal(form.space(), form.values()))
    }
}
