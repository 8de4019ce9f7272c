// ─────────────────────────────────────────────────────────────────────
// Ambrosio-Tortorelli Kernel — Alternating Solver
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Ambrosio-Tortorelli approximation of the Mumford-Shah functional on
//! a grayscale image: jointly a smoothed intensity u and an edge field v.
//!
//! Architecture:
//!   - OperatorBundle: derivative/Hodge operators built once per image
//!   - SpdSolver: LDLᵀ or conjugate-gradient backend for both systems
//!   - AlternatingSolver: λ schedule → ε annealing → coordinate descent
//!   - EnergyReporter: five AT energy terms per λ value
//!   - ImageFieldMapper: u and v back to 8-bit rasters

pub mod assembler;
pub mod energy;
pub mod engine;
pub mod field_map;
pub mod spd;

pub use assembler::{EdgeBase, OperatorBundle};
pub use energy::EnergyReporter;
pub use engine::{epsilon_schedule, lambda_schedule, AlternatingSolver, EpsilonLog, LambdaLog};
pub use field_map::{to_gray, ImageFieldMapper};
pub use spd::{ConjugateGradient, LdlSolver, SolverBackend, SpdSolver, LDL_MAX_UNKNOWNS};
