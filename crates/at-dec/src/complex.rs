// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Pixel Cell Complex
// ─────────────────────────────────────────────────────────────────────
//! Cubical complex over a W×H pixel grid, addressed in Khalimsky
//! coordinates on the doubled domain `[0, 2W−2] × [0, 2H−2]`.
//!
//! - (even, even): primal 0-cells, one per pixel
//! - (odd, even) / (even, odd): primal 1-cells, one per adjacency
//! - (odd, odd): primal 2-cells, one per unit square of four pixels
//!
//! Within each dimension, indices follow Khalimsky raster order.

use at_types::{ATError, ATResult};

/// Cell position on the doubled (Khalimsky) grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KCoords {
    pub kx: usize,
    pub ky: usize,
}

impl KCoords {
    pub fn new(kx: usize, ky: usize) -> Self {
        Self { kx, ky }
    }

    /// Topological dimension of the cell at these coordinates.
    pub fn dimension(&self) -> usize {
        (self.kx & 1) + (self.ky & 1)
    }

    /// Pixel coordinates of a 0-cell.
    pub fn pixel(&self) -> (usize, usize) {
        (self.kx / 2, self.ky / 2)
    }
}

const NO_CELL: usize = usize::MAX;

/// Index maps between cells and their per-dimension indices.
#[derive(Debug, Clone)]
pub struct PixelComplex {
    width: usize,
    height: usize,
    /// `cells[d][i]` = Khalimsky coordinates of the i-th d-cell.
    cells: [Vec<KCoords>; 3],
    /// Dense lookup over the Khalimsky domain: index within its dimension.
    lookup: Vec<usize>,
}

impl PixelComplex {
    /// Build the complex for a `width × height` pixel grid.
    ///
    /// At least two pixels are required so the complex has an edge.
    pub fn new(width: usize, height: usize) -> ATResult<Self> {
        if width == 0 || height == 0 {
            return Err(ATError::Shape(format!(
                "pixel grid must be non-empty, got {width}x{height}"
            )));
        }
        if width * height < 2 {
            return Err(ATError::Shape(format!(
                "pixel grid needs at least two pixels, got {width}x{height}"
            )));
        }

        let kw = 2 * width - 1;
        let kh = 2 * height - 1;
        let mut cells: [Vec<KCoords>; 3] = [
            Vec::with_capacity(width * height),
            Vec::with_capacity((width - 1) * height + width * (height - 1)),
            Vec::with_capacity((width - 1) * (height - 1)),
        ];
        let mut lookup = vec![NO_CELL; kw * kh];

        for ky in 0..kh {
            for kx in 0..kw {
                let k = KCoords::new(kx, ky);
                let dim = k.dimension();
                lookup[ky * kw + kx] = cells[dim].len();
                cells[dim].push(k);
            }
        }

        Ok(Self {
            width,
            height,
            cells,
            lookup,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Width of the Khalimsky domain (2W − 1).
    pub fn k_width(&self) -> usize {
        2 * self.width - 1
    }

    /// Height of the Khalimsky domain (2H − 1).
    pub fn k_height(&self) -> usize {
        2 * self.height - 1
    }

    /// Number of primal cells of dimension `dim` (0, 1 or 2).
    pub fn cell_count(&self, dim: usize) -> usize {
        self.cells.get(dim).map_or(0, Vec::len)
    }

    /// Khalimsky coordinates of the `index`-th cell of dimension `dim`.
    pub fn coords(&self, dim: usize, index: usize) -> Option<KCoords> {
        self.cells.get(dim).and_then(|c| c.get(index)).copied()
    }

    /// All cells of dimension `dim`, in index order.
    pub fn cells(&self, dim: usize) -> &[KCoords] {
        self.cells.get(dim).map_or(&[], Vec::as_slice)
    }

    /// Index of the cell at `k` within its dimension.
    pub fn index_of(&self, k: KCoords) -> Option<usize> {
        if k.kx >= self.k_width() || k.ky >= self.k_height() {
            return None;
        }
        match self.lookup[k.ky * self.k_width() + k.kx] {
            NO_CELL => None,
            i => Some(i),
        }
    }

    /// Index of the 0-cell of pixel `(x, y)`.
    pub fn pixel_index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Lower and upper pixel (0-cell indices) of an edge.
    ///
    /// Lower means smaller coordinate along the edge direction.
    pub fn edge_endpoints(&self, edge: usize) -> Option<(usize, usize)> {
        let k = self.coords(1, edge)?;
        let (lo, hi) = if k.kx & 1 == 1 {
            (KCoords::new(k.kx - 1, k.ky), KCoords::new(k.kx + 1, k.ky))
        } else {
            (KCoords::new(k.kx, k.ky - 1), KCoords::new(k.kx, k.ky + 1))
        };
        Some((self.index_of(lo)?, self.index_of(hi)?))
    }

    /// Oriented boundary of a face: `(edge index, ±1)` for bottom, right,
    /// top and left edges, counter-clockwise.
    pub fn face_boundary(&self, face: usize) -> Option<[(usize, f64); 4]> {
        let k = self.coords(2, face)?;
        let bottom = self.index_of(KCoords::new(k.kx, k.ky - 1))?;
        let right = self.index_of(KCoords::new(k.kx + 1, k.ky))?;
        let top = self.index_of(KCoords::new(k.kx, k.ky + 1))?;
        let left = self.index_of(KCoords::new(k.kx - 1, k.ky))?;
        Some([(bottom, 1.0), (right, 1.0), (top, -1.0), (left, -1.0)])
    }
}
