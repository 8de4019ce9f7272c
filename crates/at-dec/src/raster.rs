// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Grayscale Raster
// ─────────────────────────────────────────────────────────────────────
//! Row-major 8-bit grayscale buffer. Decoding and encoding live in the
//! binary; the kernel only reads and fills pixels.

use at_types::{ATError, ATResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayRaster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl GrayRaster {
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> ATResult<Self> {
        if pixels.len() != width * height {
            return Err(ATError::Shape(format!(
                "{} pixels for a {width}x{height} raster",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Write one pixel; out-of-range coordinates are an error.
    pub fn set(&mut self, x: usize, y: usize, value: u8) -> ATResult<()> {
        if x >= self.width || y >= self.height {
            return Err(ATError::Shape(format!(
                "pixel ({x}, {y}) outside {}x{} raster",
                self.width, self.height
            )));
        }
        self.pixels[y * self.width + x] = value;
        Ok(())
    }
}
