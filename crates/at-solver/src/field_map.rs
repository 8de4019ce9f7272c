// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Form → Raster Mapping
// ─────────────────────────────────────────────────────────────────────

use at_dec::{Form, FormSpace, GrayRaster, PixelComplex};
use at_types::{ATError, ATResult};

/// `clamp(round(x · 255), 0, 255)`; NaN maps to 0.
#[inline]
pub fn to_gray(x: f64) -> u8 {
    let scaled = (x * 255.0).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, 255.0) as u8
}

/// Writes u and v back to pixel rasters. Values are scaled linearly,
/// never normalised against the form's own range.
pub struct ImageFieldMapper<'a> {
    complex: &'a PixelComplex,
}

impl<'a> ImageFieldMapper<'a> {
    pub fn new(complex: &'a PixelComplex) -> Self {
        Self { complex }
    }

    fn check(&self, form: &Form, space: FormSpace) -> ATResult<()> {
        let expected = self.complex.cell_count(space.order);
        if form.space() != space || form.len() != expected {
            return Err(ATError::Dimension(format!(
                "cannot map a {} of length {} as a {space} of length {expected}",
                form.space(),
                form.len()
            )));
        }
        if let Some((lo, hi)) = form.min_max() {
            log::info!("{space}: min {lo} max {hi}");
        }
        Ok(())
    }

    /// Primal 0-form → raster of the pixel grid's size.
    pub fn intensity_raster(&self, u: &Form) -> ATResult<GrayRaster> {
        self.check(u, FormSpace::primal(0))?;
        let mut raster = GrayRaster::filled(self.complex.width(), self.complex.height(), 0);
        for (k, &x) in self.complex.cells(0).iter().zip(u.values()) {
            let (px, py) = k.pixel();
            raster.set(px, py, to_gray(x))?;
        }
        Ok(raster)
    }

    /// Primal 1-form → raster over the Khalimsky domain. Pixel and face
    /// positions stay white (255).
    pub fn edge_raster(&self, v: &Form) -> ATResult<GrayRaster> {
        self.check(v, FormSpace::primal(1))?;
        let mut raster = GrayRaster::filled(self.complex.k_width(), self.complex.k_height(), 255);
        for (k, &x) in self.complex.cells(1).iter().zip(v.values()) {
            raster.set(k.kx, k.ky, to_gray(x))?;
        }
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_gray_clamps_and_rounds() {
        assert_eq!(to_gray(0.0), 0);
        assert_eq!(to_gray(-0.3), 0);
        assert_eq!(to_gray(1.0), 255);
        assert_eq!(to_gray(1.7), 255);
        assert_eq!(to_gray(0.5), 128);
        assert_eq!(to_gray(0.2), 51);
        assert_eq!(to_gray(f64::NAN), 0);
    }

    #[test]
    fn test_intensity_raster_layout() {
        let c = PixelComplex::new(3, 2).unwrap();
        let m = ImageFieldMapper::new(&c);
        let u = Form::from_values(
            FormSpace::primal(0),
            vec![0.0, 0.2, 1.0, 1.5, -1.0, 0.4],
        );
        let r = m.intensity_raster(&u).unwrap();
        assert_eq!((r.width(), r.height()), (3, 2));
        assert_eq!(r.pixels(), &[0, 51, 255, 255, 0, 102]);
    }

    #[test]
    fn test_edge_raster_background_and_edges() {
        let c = PixelComplex::new(2, 2).unwrap();
        let m = ImageFieldMapper::new(&c);
        // edges in Khalimsky order: (1,0), (0,1), (2,1), (1,2)
        let v = Form::from_values(FormSpace::primal(1), vec![0.0, 0.2, 0.4, 2.0]);
        let r = m.edge_raster(&v).unwrap();
        assert_eq!((r.width(), r.height()), (3, 3));
        #[rustfmt::skip]
        let expected = [
            255, 0,   255,
            51,  255, 102,
            255, 255, 255,
        ];
        assert_eq!(r.pixels(), &expected);
    }

    #[test]
    fn test_wrong_form_rejected() {
        let c = PixelComplex::new(2, 2).unwrap();
        let m = ImageFieldMapper::new(&c);
        let v = Form::zeros(FormSpace::primal(1), 4);
        assert!(m.intensity_raster(&v).is_err());
        assert!(m.edge_raster(&Form::zeros(FormSpace::primal(1), 3)).is_err());
    }
}
