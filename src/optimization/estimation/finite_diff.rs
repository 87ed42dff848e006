//! estimation::finite_diff — forward-difference gradients.
//!
//! Purpose
//! -------
//! Approximate the gradient of the criterion for the quasi-Newton backend
//! with a caller-chosen step, the `epsilon` option of that backend.
//!
//! Key behaviors
//! -------------
//! - [`forward_diff_gradient`] evaluates `f(θ)` once and `f(θ + ε·eᵢ)` once
//!   per coordinate, so a gradient costs `n + 1` criterion calls. Every one
//!   of them flows through the wrapper and is recorded like any other
//!   evaluation.
//! - The first failing evaluation aborts the gradient and its error is
//!   returned unchanged.
//!
//! Invariants & assumptions
//! ------------------------
//! - `epsilon > 0`; guaranteed by option validation at lock time.
//! - Returned gradients satisfy [`validate_grad`].
use crate::optimization::{
    errors::OptResult,
    estimation::{
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};

/// Forward-difference gradient of `func` at `theta` with step `epsilon`.
///
/// # Errors
/// - Any error returned by `func`.
/// - [`crate::optimization::errors::OptError::InvalidGradient`] if a
///   difference quotient is not finite.
pub fn forward_diff_gradient<F>(theta: &Theta, epsilon: f64, func: F) -> OptResult<Grad>
where
    F: Fn(&Theta) -> OptResult<Cost>,
{
    let dim = theta.len();
    let f0 = func(theta)?;
    let mut grad = Grad::zeros(dim);
    let mut shifted = theta.clone();
    for i in 0..dim {
        shifted[i] = theta[i] + epsilon;
        let fi = func(&shifted)?;
        grad[i] = (fi - f0) / epsilon;
        shifted[i] = theta[i];
    }
    validate_grad(&grad, dim)?;
    Ok(grad)
}
