//! optimization — estimation wrapper, parameter algebra, and unified error surface.
//!
//! Purpose
//! -------
//! Provide a cohesive optimization layer for structural model estimation:
//! parameter-space mapping between free and full vectors, an Argmin-backed
//! control wrapper that minimizes a criterion function and records its
//! progress, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - `parameters`: expand free vectors into full parameterizations under a
//!   fixed mask and decode the shock covariance from a full vector.
//! - `estimation`: configure, lock and run an estimation with one of the
//!   supported optimizers, keeping the best step and writing progress
//!   artifacts.
//! - Normalize configuration issues, numerical failures, reporting failures
//!   and backend solver errors into a single enum (`errors::OptError`) with
//!   a common result alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Invalid states are reported as `OptError`, not panics.
//! - Criterion values handed to the optimizers are finite.
//!
//! Conventions
//! -----------
//! - Parameters are `ndarray` vectors (`Theta`); the criterion is minimized.
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//!
//! Downstream usage
//! ----------------
//! - Front-ends import the curated surface via `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover local contracts; integration tests
//!   under `tests/` run complete estimations.

pub mod errors;
pub mod estimation;
pub mod parameters;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dcm_estimation::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::estimation::prelude::*;
    pub use super::parameters::{CholeskyBlockDecoder, ParameterDecoder, XInfo};
}
