//! estimation::backends — per-optimizer adapters around `argmin` solvers.
//!
//! Purpose
//! -------
//! Turn a validated [`BackendConfig`] into a configured `argmin` executor,
//! run it against the wrapper's [`Objective`], and normalize however the run
//! ended into a small integer warn code. Codes are local to each backend and
//! only [`translate_warn_code`] gives them meaning.
//!
//! Key behaviors
//! -------------
//! - **BFGS**: More–Thuente line search, `gtol` as gradient-norm tolerance,
//!   identity initial inverse Hessian, forward-difference gradients with step
//!   `epsilon`.
//!   Codes: 0 converged, 1 iteration cap reached, 2 the solver broke down
//!   (line search failure, stalled progress).
//! - **DIRECTION-SET**: derivative-free Nelder–Mead. `ftol` is the tolerance
//!   on the spread of simplex criterion values, `xtol` the smallest edge of the
//!   initial simplex, `maxfun` the evaluation budget.
//!   Codes: 0 converged, 1 evaluation budget spent, 2 iteration cap reached.
//!   The initial simplex is evaluated before the executor starts, so its
//!   failures are returned like any other.
//! - Errors raised by the criterion itself, the reporter or the
//!   configuration are never turned into codes; they abort the run.
//!
//! Invariants & assumptions
//! ------------------------
//! - The result vector is not taken from the solver. Callers read the
//!   tracker's best step after `minimize` returns.
//! - `maxiter >= 1`; the evaluate-only path never reaches a backend.
//!
//! Conventions
//! -----------
//! - With the `obs_slog` feature and `verbose` set, an
//!   `argmin_observer_slog::SlogLogger` is attached with
//!   `ObserverMode::Always`.
use argmin::core::{Executor, State, TerminationReason, TerminationStatus};
use tracing::debug;

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::{
        adapter::{CriterionAdapter, Objective},
        config::{BackendConfig, BfgsOptions, DirectionSetOptions, OptimizerKind},
        types::{Bfgs, InvHessian, MoreThuenteLS, Simplex, Theta},
    },
};

/// Message reported when a backend converged.
pub const MSG_SUCCESS: &str = "Optimization terminated successfully.";
pub const MSG_DIRECTION_SET_MAXFUN: &str = "Maximum number of function evaluations.";
pub const MSG_DIRECTION_SET_MAXITER: &str = "Maximum number of iterations.";
pub const MSG_BFGS_MAXITER: &str = "Maximum number of iterations exceeded.";
pub const MSG_BFGS_STALLED: &str = "Gradient and/or function calls not changing.";

/// Relative perturbation used to span the initial simplex.
pub const SIMPLEX_RELATIVE_EDGE: f64 = 0.1;
/// Edge used for coordinates at (or very near) zero.
pub const SIMPLEX_MIN_EDGE: f64 = 0.00025;

/// Run limits shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunControl {
    pub maxiter: u64,
    pub verbose: bool,
}

/// How a backend run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOutcome {
    pub warn_code: u8,
    /// Solver iterations, when the executor finished normally.
    pub iterations: Option<u64>,
}

pub trait OptimizerBackend {
    fn kind(&self) -> OptimizerKind;

    /// Minimize `objective` starting from the free vector `x0`.
    ///
    /// # Errors
    /// Fatal errors from the criterion, the reporter or solver setup.
    fn minimize(
        &self, objective: &dyn Objective, x0: Theta, control: RunControl,
    ) -> OptResult<BackendOutcome>;
}

/// Backend for a validated configuration.
pub fn backend_for(config: &BackendConfig) -> Box<dyn OptimizerBackend> {
    match config {
        BackendConfig::Bfgs(options) => Box::new(BfgsBackend { options: *options }),
        BackendConfig::DirectionSet(options) => Box::new(DirectionSetBackend { options: *options }),
    }
}

/// `(success, message)` for a backend's warn code.
pub fn translate_warn_code(kind: OptimizerKind, warn_code: u8) -> (bool, &'static str) {
    match (kind, warn_code) {
        (OptimizerKind::DirectionSet, 1) => (false, MSG_DIRECTION_SET_MAXFUN),
        (OptimizerKind::DirectionSet, 2) => (false, MSG_DIRECTION_SET_MAXITER),
        (OptimizerKind::Bfgs, 1) => (false, MSG_BFGS_MAXITER),
        (OptimizerKind::Bfgs, 2) => (false, MSG_BFGS_STALLED),
        _ => (true, MSG_SUCCESS),
    }
}

// ---- BFGS ----

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BfgsBackend {
    pub options: BfgsOptions,
}

impl BfgsBackend {
    fn termination_code(status: &TerminationStatus) -> u8 {
        match status {
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => 1,
            TerminationStatus::Terminated(TerminationReason::SolverExit(_)) => 2,
            _ => 0,
        }
    }
}

impl OptimizerBackend for BfgsBackend {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::Bfgs
    }

    fn minimize(
        &self, objective: &dyn Objective, x0: Theta, control: RunControl,
    ) -> OptResult<BackendOutcome> {
        let problem = CriterionAdapter::new(objective).with_gradient_step(self.options.epsilon);
        let solver = Bfgs::new(MoreThuenteLS::new()).with_tolerance_grad(self.options.gtol)?;
        let inv_hessian = InvHessian::eye(x0.len());

        let mut executor = Executor::new(problem, solver);
        executor = executor.configure(|state| {
            state.param(x0).inv_hessian(inv_hessian).max_iters(control.maxiter)
        });
        #[cfg(feature = "obs_slog")]
        if control.verbose {
            let observer = argmin_observer_slog::SlogLogger::term_noblock();
            executor =
                executor.add_observer(observer, argmin::core::observers::ObserverMode::Always);
        }

        match executor.run() {
            Ok(result) => {
                let state = result.state();
                let warn_code = Self::termination_code(state.get_termination_status());
                Ok(BackendOutcome { warn_code, iterations: Some(state.get_iter()) })
            }
            Err(err) => {
                let err = OptError::from(err);
                if err.is_solver_breakdown() {
                    debug!(error = %err, "BFGS stopped on a solver failure");
                    Ok(BackendOutcome { warn_code: 2, iterations: None })
                } else {
                    Err(err)
                }
            }
        }
    }
}

// ---- DIRECTION-SET ----

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSetBackend {
    pub options: DirectionSetOptions,
}

impl DirectionSetBackend {
    /// `x0` plus one vertex per coordinate, each shifted along that axis.
    ///
    /// The shift is 10% of the coordinate, but never below `xtol` nor
    /// below [`SIMPLEX_MIN_EDGE`].
    pub fn initial_simplex(&self, x0: &Theta) -> Vec<Theta> {
        let mut vertices = Vec::with_capacity(x0.len() + 1);
        vertices.push(x0.clone());
        for i in 0..x0.len() {
            let edge = (SIMPLEX_RELATIVE_EDGE * x0[i].abs())
                .max(self.options.xtol)
                .max(SIMPLEX_MIN_EDGE);
            let mut vertex = x0.clone();
            vertex[i] += edge;
            vertices.push(vertex);
        }
        vertices
    }

    fn termination_code(status: &TerminationStatus) -> u8 {
        match status {
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => 2,
            _ => 0,
        }
    }
}

impl OptimizerBackend for DirectionSetBackend {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::DirectionSet
    }

    fn minimize(
        &self, objective: &dyn Objective, x0: Theta, control: RunControl,
    ) -> OptResult<BackendOutcome> {
        let problem = CriterionAdapter::new(objective).with_budget(self.options.maxfun);
        let vertices = self.initial_simplex(&x0);
        match problem.prime(&vertices) {
            Ok(()) => {}
            Err(OptError::EvaluationBudgetExhausted { maxfun }) => {
                debug!(maxfun, "direction-set budget spent on the initial simplex");
                return Ok(BackendOutcome { warn_code: 1, iterations: None });
            }
            Err(err) => return Err(err),
        }
        let solver = Simplex::new(vertices).with_sd_tolerance(self.options.ftol)?;

        let mut executor = Executor::new(problem, solver);
        executor = executor.configure(|state| state.max_iters(control.maxiter));
        #[cfg(feature = "obs_slog")]
        if control.verbose {
            let observer = argmin_observer_slog::SlogLogger::term_noblock();
            executor =
                executor.add_observer(observer, argmin::core::observers::ObserverMode::Always);
        }

        match executor.run() {
            Ok(result) => {
                let state = result.state();
                let warn_code = Self::termination_code(state.get_termination_status());
                Ok(BackendOutcome { warn_code, iterations: Some(state.get_iter()) })
            }
            Err(err) => match OptError::from(err) {
                OptError::EvaluationBudgetExhausted { maxfun } => {
                    debug!(maxfun, "direction-set evaluation budget spent");
                    Ok(BackendOutcome { warn_code: 1, iterations: None })
                }
                err => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::estimation::{tracker::EvaluationTracker, types::Cost};
    use ndarray::array;
    use std::cell::{Cell, RefCell};

    /// Objective recording into a tracker, like the wrapper does.
    struct Tracked<F: Fn(&Theta) -> Cost> {
        f: F,
        tracker: RefCell<EvaluationTracker>,
    }

    impl<F: Fn(&Theta) -> Cost> Tracked<F> {
        fn new(f: F) -> Self {
            Self { f, tracker: RefCell::new(EvaluationTracker::new()) }
        }

        fn num_evals(&self) -> u64 {
            self.tracker.borrow().state().num_evals
        }
    }

    impl<F: Fn(&Theta) -> Cost> Objective for Tracked<F> {
        fn crit_func(&self, x_free: &Theta) -> OptResult<Cost> {
            let value = (self.f)(x_free);
            self.tracker.borrow_mut().record(x_free, value);
            Ok(value)
        }

        fn best_step(&self) -> OptResult<(Theta, Cost)> {
            self.tracker.borrow().best_step()
        }
    }

    fn sphere(x: &Theta) -> Cost {
        x.dot(x)
    }

    fn cliff(x: &Theta) -> Cost {
        if x.iter().all(|&v| v > 0.5) { x.sum() } else { 1e308 }
    }

    fn rosenbrock(x: &Theta) -> Cost {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    fn control(maxiter: u64) -> RunControl {
        RunControl { maxiter, verbose: false }
    }

    fn direction_set(maxfun: u64) -> DirectionSetBackend {
        DirectionSetBackend { options: DirectionSetOptions { xtol: 1e-4, ftol: 1e-12, maxfun } }
    }

    #[test]
    // Purpose
    // -------
    // Warn codes translate into the fixed success flags and messages.
    fn warn_codes_translate_to_messages() {
        let ds = OptimizerKind::DirectionSet;
        let bfgs = OptimizerKind::Bfgs;

        assert_eq!(translate_warn_code(ds, 1), (false, "Maximum number of function evaluations."));
        assert_eq!(translate_warn_code(ds, 2), (false, "Maximum number of iterations."));
        assert_eq!(translate_warn_code(ds, 0), (true, "Optimization terminated successfully."));
        assert_eq!(translate_warn_code(bfgs, 1), (false, "Maximum number of iterations exceeded."));
        assert_eq!(
            translate_warn_code(bfgs, 2),
            (false, "Gradient and/or function calls not changing.")
        );
        assert_eq!(translate_warn_code(bfgs, 0), (true, "Optimization terminated successfully."));
        assert_eq!(translate_warn_code(bfgs, 7), (true, MSG_SUCCESS));
    }

    #[test]
    // Purpose
    // -------
    // Termination reasons map onto each backend's own codes.
    fn termination_reasons_map_per_backend() {
        let max_iters = TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        let converged = TerminationStatus::Terminated(TerminationReason::SolverConverged);
        let exit = TerminationStatus::Terminated(TerminationReason::SolverExit("stall".into()));

        assert_eq!(BfgsBackend::termination_code(&max_iters), 1);
        assert_eq!(BfgsBackend::termination_code(&exit), 2);
        assert_eq!(BfgsBackend::termination_code(&converged), 0);
        assert_eq!(DirectionSetBackend::termination_code(&max_iters), 2);
        assert_eq!(DirectionSetBackend::termination_code(&converged), 0);
    }

    #[test]
    // Purpose
    // -------
    // The initial simplex has n + 1 vertices and respects the edge floor.
    fn initial_simplex_respects_xtol() {
        let backend = DirectionSetBackend {
            options: DirectionSetOptions { xtol: 0.5, ftol: 1e-8, maxfun: 100 },
        };

        let simplex = backend.initial_simplex(&array![0.0, 20.0]);

        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[0], array![0.0, 20.0]);
        assert_eq!(simplex[1], array![0.5, 20.0]);
        assert_eq!(simplex[2], array![0.0, 22.0]);
    }

    #[test]
    // Purpose
    // -------
    // BFGS converges on a smooth bowl and the tracked best step is the
    // minimizer.
    //
    // Given
    // -----
    // - f(x) = |x|² from (1, -2); gtol 1e-4, epsilon 1e-7, 100 iterations.
    //
    // Expect
    // ------
    // - Warn code 0; best step within 1e-3 of the origin.
    fn bfgs_converges_on_sphere() {
        // Arrange
        let objective = Tracked::new(sphere);
        let backend = BfgsBackend { options: BfgsOptions { gtol: 1e-4, epsilon: 1e-7 } };

        // Act
        let outcome = backend.minimize(&objective, array![1.0, -2.0], control(100)).unwrap();

        // Assert
        assert_eq!(outcome.warn_code, 0);
        let (x, fun) = objective.best_step().unwrap();
        assert!(x.iter().all(|v| v.abs() < 1e-3), "best step {x:?}");
        assert!(fun < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration cap is BFGS code 1.
    fn bfgs_iteration_cap_is_code_one() {
        let objective = Tracked::new(rosenbrock);
        let backend = BfgsBackend { options: BfgsOptions { gtol: 1e-10, epsilon: 1e-8 } };

        let outcome = backend.minimize(&objective, array![-1.2, 1.0], control(1)).unwrap();

        assert_eq!(outcome.warn_code, 1);
        assert_eq!(outcome.iterations, Some(1));
    }

    #[test]
    // Purpose
    // -------
    // A spent evaluation budget is direction-set code 1, and the budget is
    // never exceeded.
    fn direction_set_budget_is_code_one() {
        let objective = Tracked::new(rosenbrock);

        let outcome =
            direction_set(10).minimize(&objective, array![-1.2, 1.0], control(1000)).unwrap();

        assert_eq!(outcome.warn_code, 1);
        assert_eq!(objective.num_evals(), 10);
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration cap is direction-set code 2.
    fn direction_set_iteration_cap_is_code_two() {
        let objective = Tracked::new(rosenbrock);

        let outcome =
            direction_set(10_000).minimize(&objective, array![-1.2, 1.0], control(3)).unwrap();

        assert_eq!(outcome.warn_code, 2);
    }

    #[test]
    // Purpose
    // -------
    // The simplex collapses onto the minimum of a bowl.
    fn direction_set_converges_on_sphere() {
        let objective = Tracked::new(sphere);

        let outcome =
            direction_set(20_000).minimize(&objective, array![1.0, 2.0], control(5_000)).unwrap();

        assert_eq!(outcome.warn_code, 0);
        let (x, _) = objective.best_step().unwrap();
        assert!(x.iter().all(|v| v.abs() < 1e-3), "best step {x:?}");
    }

    #[test]
    // Purpose
    // -------
    // A budget smaller than the initial simplex is still direction-set
    // code 1, not a failure.
    //
    // Given
    // -----
    // - Two free parameters (three simplex vertices) and `maxfun = 2`.
    //
    // Expect
    // ------
    // - Warn code 1; exactly two criterion calls; the best step is usable.
    fn budget_below_simplex_size_is_code_one() {
        // Arrange
        let objective = Tracked::new(sphere);

        // Act
        let outcome =
            direction_set(2).minimize(&objective, array![1.0, 2.0], control(100)).unwrap();

        // Assert
        assert_eq!(outcome, BackendOutcome { warn_code: 1, iterations: None });
        assert_eq!(objective.num_evals(), 2);
        assert_eq!(objective.best_step().unwrap().1, 5.0);
    }

    #[test]
    // Purpose
    // -------
    // A criterion failure on a vertex of the initial simplex is returned as
    // an error.
    //
    // Given
    // -----
    // - A criterion that fails with `NonFiniteCriterion` whenever x₀ > 1;
    //   start (1, 1), so the first shifted vertex (1.1, 1) fails.
    //
    // Expect
    // ------
    // - `Err(NonFiniteCriterion)` after two criterion calls.
    fn failure_on_initial_simplex_is_returned() {
        // Arrange
        struct Ridge {
            calls: Cell<u32>,
        }
        impl Objective for Ridge {
            fn crit_func(&self, x_free: &Theta) -> OptResult<Cost> {
                self.calls.set(self.calls.get() + 1);
                if x_free[0] > 1.0 {
                    Err(OptError::NonFiniteCriterion { value: f64::NAN })
                } else {
                    Ok(x_free.dot(x_free))
                }
            }
            fn best_step(&self) -> OptResult<(Theta, Cost)> {
                Err(OptError::NoEvaluationRecorded)
            }
        }
        let objective = Ridge { calls: Cell::new(0) };

        // Act
        let err =
            direction_set(100).minimize(&objective, array![1.0, 1.0], control(50)).unwrap_err();

        // Assert
        assert!(matches!(err, OptError::NonFiniteCriterion { .. }));
        assert_eq!(objective.calls.get(), 2);
    }

    #[test]
    // Purpose
    // -------
    // A line search that breaks down ends a BFGS run with code 2 instead of
    // an error.
    //
    // Given
    // -----
    // - f(x) = x₀ + x₁ while both coordinates exceed 0.5, and 1e308
    //   elsewhere; start (1, 2). The first trial step lands on the plateau
    //   and the More–Thuente interpolation overflows.
    //
    // Expect
    // ------
    // - Warn code 2; the best step is still the start at value 3.
    fn bfgs_line_search_breakdown_is_code_two() {
        // Arrange
        let objective = Tracked::new(cliff);
        let backend = BfgsBackend { options: BfgsOptions { gtol: 1e-8, epsilon: 1e-7 } };

        // Act
        let outcome = backend.minimize(&objective, array![1.0, 2.0], control(50)).unwrap();

        // Assert
        assert_eq!(outcome, BackendOutcome { warn_code: 2, iterations: None });
        assert_eq!(objective.best_step().unwrap(), (array![1.0, 2.0], 3.0));
        let (success, message) = translate_warn_code(backend.kind(), outcome.warn_code);
        assert!(!success);
        assert_eq!(message, MSG_BFGS_STALLED);
    }

    #[test]
    // Purpose
    // -------
    // Criterion failures abort the run instead of becoming warn codes.
    fn criterion_errors_are_fatal() {
        struct Failing;
        impl Objective for Failing {
            fn crit_func(&self, _: &Theta) -> OptResult<Cost> {
                Err(OptError::NonFiniteCriterion { value: f64::NAN })
            }
            fn best_step(&self) -> OptResult<(Theta, Cost)> {
                Err(OptError::NoEvaluationRecorded)
            }
        }
        let bfgs = BfgsBackend { options: BfgsOptions { gtol: 1e-5, epsilon: 1e-6 } };

        let bfgs_err = bfgs.minimize(&Failing, array![1.0], control(10)).unwrap_err();
        let ds_err = direction_set(50).minimize(&Failing, array![1.0], control(10)).unwrap_err();

        assert!(matches!(bfgs_err, OptError::NonFiniteCriterion { .. }));
        assert!(matches!(ds_err, OptError::NonFiniteCriterion { .. }));
    }
}
