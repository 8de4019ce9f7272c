// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy shared by the
//! Ambrosio-Tortorelli segmentation kernel.

pub mod config;
pub mod error;
pub mod report;

pub use config::ATConfig;
pub use error::{ATError, ATResult, LinearSystem};
pub use report::{truncate_decimals, EnergyReport, REPORT_HEADER};
