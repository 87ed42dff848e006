//! Adapter that exposes the wrapper's criterion function as an `argmin`
//! problem.
//!
//! The criterion is already a cost (it is minimized as is), so no sign flips
//! happen here. Gradients are forward differences of the same criterion with
//! the configured step; every evaluation they trigger goes through
//! [`Objective::crit_func`] and is therefore tracked and reported.
//!
//! An optional evaluation budget caps the number of criterion calls. Once it
//! is spent, `cost` fails with [`OptError::EvaluationBudgetExhausted`], which
//! stops the executor; the backend turns that error into a termination code.
//!
//! `argmin`'s Nelder–Mead evaluates its initial simplex without propagating
//! errors. The direction-set backend therefore evaluates those vertices up
//! front with [`CriterionAdapter::prime`]; `cost` then hands the stored
//! values back in order instead of calling the criterion again.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use argmin::core::{CostFunction, Error, Gradient};

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::{
        finite_diff::forward_diff_gradient,
        types::{Cost, Grad, Theta},
    },
};

/// What the optimizer backends need from the wrapper.
pub trait Objective {
    /// Criterion value at the free parameter vector `x_free`.
    fn crit_func(&self, x_free: &Theta) -> OptResult<Cost>;

    /// Best full parameter vector seen so far and its value.
    fn best_step(&self) -> OptResult<(Theta, Cost)>;
}

/// Bridges an [`Objective`] to `argmin`'s `CostFunction` and `Gradient`.
pub struct CriterionAdapter<'a> {
    objective: &'a dyn Objective,
    epsilon: Option<f64>,
    budget: Option<u64>,
    evals: Cell<u64>,
    primed: RefCell<VecDeque<(Theta, Cost)>>,
}

impl<'a> CriterionAdapter<'a> {
    /// Adapter for derivative-free solvers; `gradient` is unavailable.
    pub fn new(objective: &'a dyn Objective) -> Self {
        Self {
            objective,
            epsilon: None,
            budget: None,
            evals: Cell::new(0),
            primed: RefCell::new(VecDeque::new()),
        }
    }

    /// Enable forward-difference gradients with step `epsilon`.
    pub fn with_gradient_step(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Allow at most `maxfun` criterion calls.
    pub fn with_budget(mut self, maxfun: u64) -> Self {
        self.budget = Some(maxfun);
        self
    }

    /// Criterion calls made through this adapter.
    pub fn evaluations(&self) -> u64 {
        self.evals.get()
    }

    /// Evaluate `points` now and serve the values to the next `cost` calls
    /// made at exactly those points, in the same order.
    ///
    /// # Errors
    /// The first failing evaluation, including an exhausted budget.
    pub fn prime(&self, points: &[Theta]) -> OptResult<()> {
        for point in points {
            let cost = self.evaluate(point)?;
            self.primed.borrow_mut().push_back((point.clone(), cost));
        }
        Ok(())
    }

    fn take_primed(&self, theta: &Theta) -> Option<Cost> {
        let mut primed = self.primed.borrow_mut();
        if matches!(primed.front(), Some((point, _)) if point == theta) {
            primed.pop_front().map(|(_, cost)| cost)
        } else {
            None
        }
    }

    fn evaluate(&self, theta: &Theta) -> OptResult<Cost> {
        if let Some(maxfun) = self.budget {
            if self.evals.get() >= maxfun {
                return Err(OptError::EvaluationBudgetExhausted { maxfun });
            }
        }
        self.evals.set(self.evals.get() + 1);
        self.objective.crit_func(theta)
    }
}

impl CostFunction for CriterionAdapter<'_> {
    type Param = Theta;
    type Output = Cost;

    /// # Errors
    /// Anything `crit_func` returns, or the exhausted budget.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        if let Some(cost) = self.take_primed(theta) {
            return Ok(cost);
        }
        Ok(self.evaluate(theta)?)
    }
}

impl Gradient for CriterionAdapter<'_> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let epsilon = self.epsilon.ok_or_else(|| OptError::NotImplemented {
            text: "Gradient requested from a derivative-free criterion adapter.".to_string(),
        })?;
        Ok(forward_diff_gradient(theta, epsilon, |x| self.evaluate(x))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::cell::RefCell;

    struct Quadratic {
        seen: RefCell<Vec<Theta>>,
    }

    impl Objective for Quadratic {
        fn crit_func(&self, x_free: &Theta) -> OptResult<Cost> {
            self.seen.borrow_mut().push(x_free.clone());
            Ok(x_free.dot(x_free))
        }

        fn best_step(&self) -> OptResult<(Theta, Cost)> {
            Err(OptError::NoEvaluationRecorded)
        }
    }

    #[test]
    // Purpose
    // -------
    // The budget counts every call, including those made for gradients.
    //
    // Given
    // -----
    // - A budget of 4 on a 2-parameter problem.
    //
    // Expect
    // ------
    // - One gradient (3 calls) plus one cost succeed; the next cost fails
    //   with `EvaluationBudgetExhausted` and never reaches the objective.
    fn budget_covers_cost_and_gradient_calls() {
        // Arrange
        let objective = Quadratic { seen: RefCell::new(Vec::new()) };
        let adapter = CriterionAdapter::new(&objective).with_gradient_step(1e-6).with_budget(4);
        let x = array![1.0, 2.0];

        // Act
        let grad = adapter.gradient(&x).unwrap();
        let cost = adapter.cost(&x).unwrap();
        let exhausted = adapter.cost(&x).unwrap_err();

        // Assert
        assert!((grad[0] - 2.0).abs() < 1e-4 && (grad[1] - 4.0).abs() < 1e-4);
        assert_eq!(cost, 5.0);
        assert_eq!(OptError::from(exhausted), OptError::EvaluationBudgetExhausted { maxfun: 4 });
        assert_eq!(adapter.evaluations(), 4);
        assert_eq!(objective.seen.borrow().len(), 4);
    }

    #[test]
    // Purpose
    // -------
    // Primed points are evaluated once; matching `cost` calls reuse them.
    //
    // Given
    // -----
    // - Two primed points, then `cost` at both and once more at the first.
    //
    // Expect
    // ------
    // - The objective sees three calls; the budget counts three.
    fn primed_points_are_served_once() {
        // Arrange
        let objective = Quadratic { seen: RefCell::new(Vec::new()) };
        let adapter = CriterionAdapter::new(&objective).with_budget(10);
        let points = [array![1.0, 0.0], array![0.0, 2.0]];

        // Act
        adapter.prime(&points).unwrap();
        let first = adapter.cost(&points[0]).unwrap();
        let second = adapter.cost(&points[1]).unwrap();
        let again = adapter.cost(&points[0]).unwrap();

        // Assert
        assert_eq!((first, second, again), (1.0, 4.0, 1.0));
        assert_eq!(objective.seen.borrow().len(), 3);
        assert_eq!(adapter.evaluations(), 3);
    }

    #[test]
    // Purpose
    // -------
    // Priming stops at the first failure and returns it.
    fn prime_propagates_budget_exhaustion() {
        let objective = Quadratic { seen: RefCell::new(Vec::new()) };
        let adapter = CriterionAdapter::new(&objective).with_budget(1);

        let err = adapter.prime(&[array![1.0], array![2.0]]).unwrap_err();

        assert_eq!(err, OptError::EvaluationBudgetExhausted { maxfun: 1 });
        assert_eq!(objective.seen.borrow().len(), 1);
    }

    #[test]
    // Purpose
    // -------
    // Without a step the adapter refuses to differentiate.
    fn gradient_requires_step() {
        let objective = Quadratic { seen: RefCell::new(Vec::new()) };
        let adapter = CriterionAdapter::new(&objective);

        let err = OptError::from(adapter.gradient(&array![0.0]).unwrap_err());

        assert!(matches!(err, OptError::NotImplemented { .. }));
        assert!(objective.seen.borrow().is_empty());
    }
}
