//! estimation::tracker — start / best-step / current bookkeeping of a run.
//!
//! Purpose
//! -------
//! Record every criterion evaluation of a single optimization run and keep
//! three snapshots: the first evaluation (start), the best evaluation so far
//! (step) and the most recent one (current).
//!
//! Key behaviors
//! -------------
//! - [`EvaluationTracker::record`] counts every evaluation, but only strict
//!   improvements become steps ("keep best, log only improvements").
//! - Each call returns an [`EvaluationEvent`] telling the reporter whether
//!   this was the first evaluation and whether it produced a step.
//!
//! Invariants & assumptions
//! ------------------------
//! - `value_steps` never increases across `record` calls.
//! - Step indices start at zero and increase by one per improvement.
//! - Criterion values are finite; the wrapper rejects anything else before
//!   calling `record`.
use chrono::{DateTime, Local};

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::types::{Cost, HUGE_FLOAT, Theta},
};

/// Mutable state of one optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub value_start: Cost,
    pub value_steps: Cost,
    pub value_curre: Cost,
    pub paras_start: Option<Theta>,
    pub paras_steps: Option<Theta>,
    pub paras_curre: Option<Theta>,
    pub num_steps: u64,
    pub num_evals: u64,
    pub is_first: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            value_start: HUGE_FLOAT,
            value_steps: HUGE_FLOAT,
            value_curre: HUGE_FLOAT,
            paras_start: None,
            paras_steps: None,
            paras_curre: None,
            num_steps: 0,
            num_evals: 0,
            is_first: true,
        }
    }
}

/// An evaluation that strictly improved the best criterion value.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub index: u64,
    pub value: Cost,
    pub timestamp: DateTime<Local>,
}

/// What a single `record` call changed.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationEvent {
    /// First evaluation of the run; the step log must be reset.
    pub is_first: bool,
    /// Present when the evaluation improved the best value.
    pub step: Option<StepRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationTracker {
    state: RunState,
}

impl EvaluationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Record the evaluation `crit_val` at the full vector `x_all`.
    pub fn record(&mut self, x_all: &Theta, crit_val: Cost) -> EvaluationEvent {
        let state = &mut self.state;
        state.num_evals += 1;
        state.value_curre = crit_val;
        state.paras_curre = Some(x_all.clone());

        let is_first = state.is_first;
        if is_first {
            state.value_start = crit_val;
            state.paras_start = Some(x_all.clone());
            state.is_first = false;
        }

        let mut step = None;
        if crit_val < state.value_steps {
            state.value_steps = crit_val;
            state.paras_steps = Some(x_all.clone());
            step = Some(StepRecord {
                index: state.num_steps,
                value: crit_val,
                timestamp: Local::now(),
            });
            state.num_steps += 1;
        }

        EvaluationEvent { is_first, step }
    }

    /// Best full vector and its criterion value.
    ///
    /// Values at or above [`HUGE_FLOAT`] never become steps; until one does,
    /// the start snapshot stands in for the best step.
    ///
    /// # Errors
    /// - [`OptError::NoEvaluationRecorded`] before the first evaluation.
    pub fn best_step(&self) -> OptResult<(Theta, Cost)> {
        let state = &self.state;
        match (&state.paras_steps, &state.paras_start) {
            (Some(paras), _) => Ok((paras.clone(), state.value_steps)),
            (None, Some(paras)) => Ok((paras.clone(), state.value_start)),
            (None, None) => Err(OptError::NoEvaluationRecorded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The first record call always seeds the start snapshot.
    //
    // Given
    // -----
    // - A fresh tracker and one evaluation at `[1, 2]` with value 5.0.
    //
    // Expect
    // ------
    // - Start, step and current all equal that evaluation; step index 0;
    //   `is_first` cleared.
    fn first_record_sets_start_snapshot() {
        // Arrange
        let mut tracker = EvaluationTracker::new();
        let x = array![1.0, 2.0];

        // Act
        let event = tracker.record(&x, 5.0);

        // Assert
        let state = tracker.state();
        assert!(event.is_first);
        assert_eq!(event.step.as_ref().map(|s| s.index), Some(0));
        assert_eq!(state.value_start, 5.0);
        assert_eq!(state.paras_start.as_ref(), Some(&x));
        assert_eq!(state.value_steps, 5.0);
        assert_eq!(state.value_curre, 5.0);
        assert_eq!((state.num_evals, state.num_steps), (1, 1));
        assert!(!state.is_first);
    }

    #[test]
    // Purpose
    // -------
    // Only strict improvements are steps; the best value never increases.
    //
    // Given
    // -----
    // - Values 4, 6, 4, 3, 7, 1 recorded in sequence.
    //
    // Expect
    // ------
    // - Steps at 4, 3, 1 with indices 0, 1, 2; `value_steps` non-increasing;
    //   start stays at the first evaluation; six evaluations counted.
    fn best_value_is_non_increasing() {
        let mut tracker = EvaluationTracker::new();
        let values = [4.0, 6.0, 4.0, 3.0, 7.0, 1.0];

        let mut previous_best = HUGE_FLOAT;
        let mut steps = Vec::new();
        for (i, &value) in values.iter().enumerate() {
            let event = tracker.record(&array![i as f64], value);
            assert_eq!(event.is_first, i == 0);
            if let Some(step) = event.step {
                steps.push((step.index, step.value));
            }
            assert!(tracker.state().value_steps <= previous_best);
            previous_best = tracker.state().value_steps;
        }

        assert_eq!(steps, vec![(0, 4.0), (1, 3.0), (2, 1.0)]);
        let state = tracker.state();
        assert_eq!(state.value_start, 4.0);
        assert_eq!(state.paras_start, Some(array![0.0]));
        assert_eq!(state.paras_steps, Some(array![5.0]));
        assert_eq!(state.value_curre, 1.0);
        assert_eq!((state.num_evals, state.num_steps), (6, 3));
    }

    #[test]
    // Purpose
    // -------
    // `best_step` is unavailable until something has been recorded.
    fn best_step_requires_an_evaluation() {
        let mut tracker = EvaluationTracker::new();
        assert_eq!(tracker.best_step().unwrap_err(), OptError::NoEvaluationRecorded);

        tracker.record(&array![0.5], 2.0);
        tracker.record(&array![0.7], 3.0);

        assert_eq!(tracker.best_step().unwrap(), (array![0.5], 2.0));
    }

    #[test]
    // Purpose
    // -------
    // Evaluations at or above the sentinel are counted but never become
    // steps; the start snapshot serves as the best step meanwhile.
    //
    // Given
    // -----
    // - Values 1e21, 2e21, then 4.
    //
    // Expect
    // ------
    // - No step for the first two; `best_step` returns the start; the third
    //   evaluation becomes step 0.
    fn values_above_sentinel_fall_back_to_start() {
        let mut tracker = EvaluationTracker::new();

        let first = tracker.record(&array![1.0], 1e21);
        let second = tracker.record(&array![2.0], 2e21);

        assert!(first.step.is_none() && second.step.is_none());
        assert_eq!(tracker.state().paras_steps, None);
        assert_eq!(tracker.best_step().unwrap(), (array![1.0], 1e21));

        let third = tracker.record(&array![3.0], 4.0);

        assert_eq!(third.step.map(|s| s.index), Some(0));
        assert_eq!(tracker.best_step().unwrap(), (array![3.0], 4.0));
    }
}
