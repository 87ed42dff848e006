//! estimation — argmin-powered control wrapper for criterion minimization.
//!
//! Purpose
//! -------
//! Drive the estimation of a structural model by minimizing a user-supplied
//! criterion function over the free part of its parameter vector. Callers
//! provide the criterion (in two interchangeable versions), a covariance
//! decoder and a reporter, configure the run, lock it, and call
//! [`EstimationWrapper::optimize`].
//!
//! Key behaviors
//! -------------
//! - [`config`] and [`integrity`] hold the configuration and enforce the
//!   unlocked → locked discipline; validation happens once, at `lock()`.
//! - [`wrapper`] composes the criterion function: free → full vector,
//!   version-selected backend, tracking, progress reporting.
//! - [`dispatcher`] picks the evaluate-only path or a backend from
//!   [`backends`], and reports the tracked best step.
//! - [`adapter`] and [`finite_diff`] bridge the criterion into `argmin`.
//! - [`tracker`] keeps start / best / current snapshots; [`reporter`] turns
//!   them into progress artifacts.
//!
//! Invariants & assumptions
//! ------------------------
//! - The criterion is minimized as given; no sign flips.
//! - Criterion values are finite; anything else aborts the run.
//! - Each wrapper instance serves a single optimization attempt.
//!
//! Conventions
//! -----------
//! - Parameter vectors are [`Theta`] (`Array1<f64>`); free vectors enter the
//!   wrapper, full vectors are what the tracker, reporter and criterion see.
//! - Errors bubble up as [`crate::optimization::errors::OptResult`];
//!   non-convergence is not an error but a result with `success == false`.
//!
//! Downstream usage
//! ----------------
//! - Build [`CriterionVersions`] from two closures, construct an
//!   [`EstimationWrapper`] with a [`CholeskyBlockDecoder`]-style decoder and
//!   a [`DiskReporter`], set attributes (or apply an [`OptimizerSection`]
//!   read from JSON), `lock()`, then `optimize(x0)`.
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule cover the local contract (warn-code
//!   messages, budget accounting, lock transitions, artifact layout).
//! - Integration tests under `tests/` run complete estimations on toy
//!   criteria with both backends.
//!
//! [`CholeskyBlockDecoder`]: crate::optimization::parameters::CholeskyBlockDecoder

pub mod adapter;
pub mod backends;
pub mod config;
pub mod criterion;
pub mod dispatcher;
pub mod finite_diff;
pub mod integrity;
pub mod reporter;
pub mod tracker;
pub mod types;
pub mod validation;
pub mod wrapper;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adapter::Objective;
pub use self::config::{
    AttrValue, BackendConfig, BfgsOptions, ConfigKey, CriterionVersion, DirectionSetOptions,
    OptimizerKind, OptimizerOptions, OptimizerSection, OptionRecord, OptionValue, Settings,
};
pub use self::criterion::{CriterionBackend, CriterionVersions};
pub use self::dispatcher::EstimationResult;
pub use self::reporter::{DiskReporter, FinalReport, MemoryReporter, Progress, Reporter};
pub use self::tracker::{EvaluationTracker, RunState};
pub use self::types::{Cost, Grad, HUGE_FLOAT, Theta};
pub use self::wrapper::EstimationWrapper;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dcm_estimation::optimization::estimation::prelude::*;
//
// to import the main estimation surface in a single line.

pub mod prelude {
    pub use super::config::{
        AttrValue, CriterionVersion, OptimizerKind, OptimizerSection, OptionRecord, OptionValue,
    };
    pub use super::criterion::CriterionVersions;
    pub use super::dispatcher::EstimationResult;
    pub use super::reporter::{DiskReporter, MemoryReporter, Reporter};
    pub use super::types::{Cost, Theta};
    pub use super::wrapper::EstimationWrapper;
}
