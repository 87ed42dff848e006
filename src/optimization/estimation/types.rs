//! estimation::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and solver aliases used by the estimation
//! wrapper so the rest of the code stays agnostic to `ndarray` and Argmin
//! generics.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for parameter vectors, gradients, inverse
//!   Hessians and scalar criterion values (`Theta`, `Grad`, `InvHessian`,
//!   `Cost`).
//! - Expose pre-wired solver aliases for the two backends: BFGS with a
//!   More–Thuente line search and the Nelder–Mead simplex.
//! - Hold the sentinel used to initialize criterion snapshots.
//!
//! Invariants & assumptions
//! ------------------------
//! - All vectors and matrices are `ndarray` containers over `f64`.
//! - `Cost` is the criterion being *minimized*; no sign flips happen
//!   anywhere in this crate.
//!
//! Testing notes
//! -------------
//! - Only aliases and constants live here; they are exercised by the
//!   backend and wrapper tests.
use argmin::solver::{
    linesearch::MoreThuenteLineSearch, neldermead::NelderMead, quasinewton::BFGS,
};
use ndarray::{Array1, Array2};

/// Parameter vector, free or full depending on context.
pub type Theta = Array1<f64>;

/// Gradient of the criterion with respect to the free parameters.
pub type Grad = Array1<f64>;

/// Dense inverse-Hessian approximation carried by BFGS.
pub type InvHessian = Array2<f64>;

/// Scalar criterion value (minimized).
pub type Cost = f64;

/// Initial value of every criterion snapshot; any finite evaluation improves on it.
pub const HUGE_FLOAT: f64 = 1.0e20;

/// More–Thuente line search specialized to this crate's numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// Quasi-Newton solver of the gradient backend.
pub type Bfgs = BFGS<MoreThuenteLS, Cost>;

/// Simplex solver of the derivative-free backend.
pub type Simplex = NelderMead<Theta, Cost>;
