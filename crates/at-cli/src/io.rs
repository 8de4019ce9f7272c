// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Image and Report Files
// ─────────────────────────────────────────────────────────────────────

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder};

use at_dec::GrayRaster;
use at_types::{ATError, ATResult, EnergyReport, REPORT_HEADER};

/// Decode any supported image; colour inputs are reduced to luma.
pub fn read_raster(path: &Path) -> ATResult<GrayRaster> {
    let img = image::open(path)
        .map_err(|e| ATError::Image(format!("{}: {e}", path.display())))?
        .to_luma8();
    let (w, h) = img.dimensions();
    GrayRaster::from_pixels(w as usize, h as usize, img.into_raw())
}

/// Binary 8-bit PGM.
pub fn write_pgm(path: &Path, raster: &GrayRaster) -> ATResult<()> {
    let file = BufWriter::new(File::create(path)?);
    PnmEncoder::new(file)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(
            raster.pixels(),
            raster.width() as u32,
            raster.height() as u32,
            ExtendedColorType::L8,
        )
        .map_err(|e| ATError::Image(format!("{}: {e}", path.display())))
}

/// `<base>-l<λ:.7>-u.pgm` and `<base>-l<λ:.7>-v.pgm`
pub fn output_paths(base: &str, lambda: f64) -> (PathBuf, PathBuf) {
    (
        PathBuf::from(format!("{base}-l{lambda:.7}-u.pgm")),
        PathBuf::from(format!("{base}-l{lambda:.7}-v.pgm")),
    )
}

/// Tab-separated energy report, one row per λ, flushed after each row.
pub struct ReportWriter {
    out: BufWriter<File>,
}

impl ReportWriter {
    pub fn create(path: &Path) -> ATResult<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{REPORT_HEADER}")?;
        out.flush()?;
        Ok(Self { out })
    }

    pub fn append(&mut self, energies: &EnergyReport) -> ATResult<()> {
        writeln!(self.out, "{}", energies.to_row())?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths_format() {
        let (u, v) = output_paths("out/AT", 0.05);
        assert_eq!(u, PathBuf::from("out/AT-l0.0500000-u.pgm"));
        assert_eq!(v, PathBuf::from("out/AT-l0.0500000-v.pgm"));
        let (u, _) = output_paths("AT", 0.3125);
        assert_eq!(u, PathBuf::from("AT-l0.3125000-u.pgm"));
    }

    #[test]
    fn test_pgm_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.pgm");
        let raster = GrayRaster::from_pixels(3, 2, vec![0, 50, 100, 150, 200, 255]).unwrap();
        write_pgm(&path, &raster).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P5"), "header {:?}", &bytes[..2]);
        let back = read_raster(&path).unwrap();
        assert_eq!(back, raster);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_raster(&dir.path().join("nope.pgm")).unwrap_err();
        assert!(matches!(err, ATError::Image(_)), "got {err}");
    }

    #[test]
    fn test_report_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AT.txt");
        let mut w = ReportWriter::create(&path).unwrap();
        w.append(&EnergyReport {
            lambda: 0.05,
            alpha: 1.0,
            epsilon: 1.0,
            fidelity: 0.123456789,
            ..EnergyReport::default()
        })
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], REPORT_HEADER);
        let cols: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(cols.len(), 9);
        assert_eq!(cols[0], "0.05");
        assert_eq!(cols[3], "0.12345");
    }
}
