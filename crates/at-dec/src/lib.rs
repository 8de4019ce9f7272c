// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Discrete Exterior Calculus
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Pixel cell complex, primal/dual forms, sparse derivative and Hodge
//! operators, and the grayscale raster they are built from.

pub mod calculus;
pub mod complex;
pub mod form;
pub mod operator;
pub mod raster;

pub use calculus::{GridCalculus, DIM};
pub use complex::{KCoords, PixelComplex};
pub use form::{Duality, Form, FormSpace};
pub use operator::Operator;
pub use raster::GrayRaster;
