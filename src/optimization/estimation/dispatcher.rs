//! estimation::dispatcher — from locked settings to an estimation result.
//!
//! Purpose
//! -------
//! Decide how an estimation runs: a single evaluation at the start vector
//! when `maxiter == 0`, otherwise a full backend run. Whatever the backend
//! does, the reported solution is the best step the wrapper tracked, and the
//! backend's warn code becomes a success flag plus a fixed message.
//!
//! Key behaviors
//! -------------
//! - `maxiter == 0`: one `crit_func(x0)` call; `x = x0`, `fun` is that value,
//!   `success = true`.
//! - `maxiter > 0`: the configured backend minimizes the objective; `x` and
//!   `fun` come from [`Objective::best_step`].
//!
//! Invariants & assumptions
//! ------------------------
//! - `x0` is a free vector. On the evaluate-only path `x` is that free
//!   vector; after a backend run it is the full best-step vector.
use tracing::info;

use crate::optimization::{
    errors::OptResult,
    estimation::{
        adapter::Objective,
        backends::{RunControl, backend_for, translate_warn_code},
        config::{BackendConfig, Settings},
        types::{Cost, Theta},
    },
};

/// Message of the evaluate-only path.
pub const MSG_EVALUATE_ONLY: &str = "Evaluation of criterion function at starting values.";

/// Outcome of `optimize`.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationResult {
    pub x: Theta,
    pub fun: Cost,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerDispatcher {
    backend: BackendConfig,
    control: RunControl,
}

impl OptimizerDispatcher {
    pub fn new(settings: &Settings) -> Self {
        Self {
            backend: settings.backend,
            control: RunControl { maxiter: settings.maxiter, verbose: settings.verbose },
        }
    }

    /// Run the estimation from the free start vector `x0`.
    ///
    /// # Errors
    /// Fatal errors from the criterion, the reporter or backend setup.
    /// Non-convergence is not an error; it shows up as `success == false`.
    pub fn run(&self, objective: &dyn Objective, x0: Theta) -> OptResult<EstimationResult> {
        if self.control.maxiter == 0 {
            let fun = objective.crit_func(&x0)?;
            return Ok(EstimationResult {
                x: x0,
                fun,
                success: true,
                message: MSG_EVALUATE_ONLY.to_string(),
            });
        }

        let backend = backend_for(&self.backend);
        info!(
            optimizer = %backend.kind(),
            maxiter = self.control.maxiter,
            num_free = x0.len(),
            "starting optimizer"
        );
        let outcome = backend.minimize(objective, x0, self.control)?;
        let (success, message) = translate_warn_code(backend.kind(), outcome.warn_code);
        info!(
            optimizer = %backend.kind(),
            warn_code = outcome.warn_code,
            iterations = ?outcome.iterations,
            "optimizer finished"
        );

        let (x, fun) = objective.best_step()?;
        Ok(EstimationResult { x, fun, success, message: message.to_string() })
    }
}
