//! dcm_estimation — optimization control for dynamic discrete-choice estimation.
//!
//! Purpose
//! -------
//! Serve as the crate root for the estimation wrapper of a structural dynamic
//! discrete-choice model. The model solution and the simulated-likelihood
//! criterion live elsewhere; this crate turns a partially fixed parameter
//! vector into full parameterizations, drives a numerical optimizer against
//! the criterion, tracks the best-known solution and persists progress.
//!
//! Key behaviors
//! -------------
//! - Re-export the `optimization` module as the public crate surface.
//! - Keep the outer collaborators (criterion backend, covariance decoder,
//!   progress sink) behind traits so they can be swapped or mocked.
//!
//! Invariants & assumptions
//! ------------------------
//! - Single-threaded, synchronous evaluation.
//! - One `EstimationWrapper` serves one optimization attempt.
//!
//! Conventions
//! -----------
//! - Errors are `OptError` values behind `OptResult<T>`.
//! - Structured events are emitted through `tracing`; installing a
//!   subscriber is the caller's business.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; end-to-end estimations on toy
//!   criteria live in `tests/`.

pub mod optimization;

pub use optimization::prelude;
