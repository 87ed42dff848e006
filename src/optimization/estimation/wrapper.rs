//! estimation::wrapper — the estimation façade.
//!
//! Purpose
//! -------
//! Own everything one estimation attempt needs (configuration guard,
//! criterion backends, covariance decoder, tracker, reporter) and expose the
//! two operations that matter: [`EstimationWrapper::crit_func`], the
//! objective handed to the optimizers, and [`EstimationWrapper::optimize`].
//!
//! Key behaviors
//! -------------
//! - Configuration happens through `set_attr` / `set` / `apply_section` while
//!   unlocked; `lock` validates it.
//! - `crit_func` expands the free vector, evaluates the configured criterion
//!   version, records the value, decodes the three shock covariances and
//!   writes interim progress.
//! - `optimize` dispatches to the configured backend and closes the progress
//!   artifacts with a final report.
//!
//! Invariants & assumptions
//! ------------------------
//! - One wrapper is one optimization attempt; the run state is never reset.
//! - Both operations require the configuration to be locked.
//! - Single-threaded: tracker and reporter live in `RefCell`s because
//!   `argmin` only lends the problem immutably.
use std::cell::RefCell;

use chrono::Local;
use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::{
        adapter::Objective,
        config::{AttrValue, ConfigKey, OptimizerSection, Settings},
        criterion::CriterionVersions,
        dispatcher::{EstimationResult, OptimizerDispatcher},
        integrity::IntegrityGuard,
        reporter::{FinalReport, Progress, Reporter, SnapshotCovariances},
        tracker::{EvaluationTracker, RunState},
        types::{Cost, Theta},
        validation::validate_value,
    },
    parameters::{ParameterDecoder, shocks_covariance},
};

pub struct EstimationWrapper<A> {
    guard: IntegrityGuard<A>,
    criterion: CriterionVersions<A>,
    decoder: Box<dyn ParameterDecoder>,
    decoder_debug: bool,
    tracker: RefCell<EvaluationTracker>,
    reporter: RefCell<Box<dyn Reporter>>,
}

impl<A> EstimationWrapper<A> {
    pub fn new(
        criterion: CriterionVersions<A>, decoder: impl ParameterDecoder + 'static,
        reporter: impl Reporter + 'static,
    ) -> Self {
        Self {
            guard: IntegrityGuard::new(),
            criterion,
            decoder: Box::new(decoder),
            decoder_debug: true,
            tracker: RefCell::new(EvaluationTracker::new()),
            reporter: RefCell::new(Box::new(reporter)),
        }
    }

    /// Debug flag passed to the covariance decoder; on by default, so every
    /// decoded Cholesky factor is checked for non-finite entries.
    pub fn with_decoder_debug(mut self, is_debug: bool) -> Self {
        self.decoder_debug = is_debug;
        self
    }

    pub fn decoder_debug(&self) -> bool {
        self.decoder_debug
    }

    // ---- Configuration ----

    /// # Errors
    /// See [`IntegrityGuard::set_attr`].
    pub fn set_attr(&mut self, key: &str, value: AttrValue<A>) -> OptResult<()> {
        self.guard.set_attr(key, value)
    }

    /// # Errors
    /// See [`IntegrityGuard::set`].
    pub fn set(&mut self, key: ConfigKey, value: AttrValue<A>) -> OptResult<()> {
        self.guard.set(key, value)
    }

    /// Apply the optimizer block of a configuration file.
    ///
    /// # Errors
    /// [`OptError::AlreadyLocked`] while locked.
    pub fn apply_section(&mut self, section: OptimizerSection) -> OptResult<()> {
        for (key, value) in section.into_attrs() {
            self.guard.set(key, value)?;
        }
        Ok(())
    }

    /// # Errors
    /// See [`IntegrityGuard::lock`].
    pub fn lock(&mut self) -> OptResult<()> {
        self.guard.lock().map(|_| ())
    }

    /// # Errors
    /// See [`IntegrityGuard::unlock`].
    pub fn unlock(&mut self) -> OptResult<()> {
        self.guard.unlock()
    }

    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    /// # Errors
    /// [`OptError::NotLocked`] if not locked.
    pub fn settings(&self) -> OptResult<&Settings> {
        self.guard.settings()
    }

    /// Snapshot of the run state.
    pub fn run_state(&self) -> RunState {
        self.tracker.borrow().state().clone()
    }

    /// Free entries of the configured baseline, the usual start vector.
    ///
    /// # Errors
    /// [`OptError::NotLocked`] if not locked.
    pub fn free_start(&self) -> OptResult<Theta> {
        let (_, x_info, _) = self.guard.locked_parts()?;
        Ok(x_info.free_start())
    }

    // ---- Operations ----

    /// Criterion value at the free vector `x_free`.
    ///
    /// # Errors
    /// - [`OptError::NotLocked`] if not locked.
    /// - Mapping errors from [`crate::optimization::parameters::reconstruct`].
    /// - Errors of the criterion backend, or
    ///   [`OptError::NonFiniteCriterion`] for a non-finite value.
    /// - Decoding or reporting errors.
    pub fn crit_func(&self, x_free: &Theta) -> OptResult<Cost> {
        let (settings, x_info, args) = self.guard.locked_parts()?;
        let x_all = x_info.reconstruct(x_free)?;

        let crit_val = self.criterion.evaluate(settings.version, &x_all, args)?;
        validate_value(crit_val)?;

        let event = self.tracker.borrow_mut().record(&x_all, crit_val);
        let tracker = self.tracker.borrow();
        let state = tracker.state();
        debug!(evaluation = state.num_evals, criterion = crit_val, "criterion evaluated");
        if let Some(step) = &event.step {
            info!(step = step.index, criterion = step.value, "criterion improved");
        }

        let covariances = SnapshotCovariances {
            start: self.covariance_of(state.paras_start.as_ref())?,
            step: self.covariance_of(state.paras_steps.as_ref().or(state.paras_start.as_ref()))?,
            current: self.covariance_of(state.paras_curre.as_ref())?,
        };
        let progress = Progress { state, event: &event, covariances: &covariances };
        self.reporter.borrow_mut().write_interim(&progress)?;

        Ok(crit_val)
    }

    /// Estimate from the free start vector `x0`.
    ///
    /// # Errors
    /// - [`OptError::NotLocked`] if not locked.
    /// - Any fatal error raised while evaluating or reporting.
    pub fn optimize(&self, x0: &Theta) -> OptResult<EstimationResult> {
        let dispatcher = OptimizerDispatcher::new(self.guard.settings()?);
        let result = dispatcher.run(self, x0.clone())?;

        let report = FinalReport {
            success: result.success,
            message: result.message.clone(),
            criterion: result.fun,
            timestamp: Local::now(),
        };
        self.reporter.borrow_mut().write_final(&report)?;

        let num_evals = self.tracker.borrow().state().num_evals;
        if result.success {
            info!(
                criterion = result.fun,
                num_evals,
                message = %result.message,
                "estimation finished"
            );
        } else {
            warn!(
                criterion = result.fun,
                num_evals,
                message = %result.message,
                "estimation did not converge"
            );
        }
        Ok(result)
    }

    fn covariance_of(&self, x_all: Option<&Theta>) -> OptResult<Array2<f64>> {
        match x_all {
            Some(x_all) => shocks_covariance(self.decoder.as_ref(), x_all, self.decoder_debug),
            None => Err(OptError::NoEvaluationRecorded),
        }
    }
}

impl<A> Objective for EstimationWrapper<A> {
    fn crit_func(&self, x_free: &Theta) -> OptResult<Cost> {
        EstimationWrapper::crit_func(self, x_free)
    }

    fn best_step(&self) -> OptResult<(Theta, Cost)> {
        self.tracker.borrow().best_step()
    }
}

impl<A> std::fmt::Debug for EstimationWrapper<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimationWrapper")
            .field("locked", &self.guard.is_locked())
            .field("run_state", &self.tracker.borrow().state())
            .finish_non_exhaustive()
    }
}
