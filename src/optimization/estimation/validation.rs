//! Validation helpers for estimation settings and solver output.
//!
//! This module centralizes the consistency checks used across the wrapper:
//!
//! - **Backend options**: [`require_positive_float`], [`require_positive_int`]
//!   check presence, type and sign of a field in an option record.
//! - **Gradient validation**: [`validate_grad`] enforces correct dimension
//!   and finite entries.
//! - **Criterion values**: [`validate_value`] rejects non-finite criterion
//!   outputs.
//!
//! Each helper reports a domain-specific [`OptError`] variant so that lock
//! failures and evaluation failures read the same way everywhere.
use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::{
        config::{OptionRecord, OptionValue},
        types::Grad,
    },
};

/// Fetch `field` from `record` as a finite, strictly positive float.
///
/// Integers are rejected: tolerances must be given as floats.
///
/// # Errors
/// - [`OptError::MissingOption`] if the field is absent.
/// - [`OptError::InvalidOptionType`] if it is not a float.
/// - [`OptError::InvalidOptionValue`] if it is non-finite or ≤ 0.0.
pub fn require_positive_float(
    record: &OptionRecord, optimizer: &'static str, field: &'static str,
) -> OptResult<f64> {
    match record.get(field) {
        None => Err(OptError::MissingOption { optimizer, field }),
        Some(OptionValue::Float(value)) => {
            let value = *value;
            if !value.is_finite() {
                return Err(OptError::InvalidOptionValue {
                    optimizer,
                    field,
                    value,
                    reason: "Tolerance must be finite.",
                });
            }
            if value <= 0.0 {
                return Err(OptError::InvalidOptionValue {
                    optimizer,
                    field,
                    value,
                    reason: "Tolerance must be positive.",
                });
            }
            Ok(value)
        }
        Some(_) => Err(OptError::InvalidOptionType { optimizer, field, expected: "a float" }),
    }
}

/// Fetch `field` from `record` as a strictly positive integer.
///
/// # Errors
/// - [`OptError::MissingOption`] if the field is absent.
/// - [`OptError::InvalidOptionType`] if it is not an integer.
/// - [`OptError::InvalidOptionValue`] if it is ≤ 0.
pub fn require_positive_int(
    record: &OptionRecord, optimizer: &'static str, field: &'static str,
) -> OptResult<u64> {
    match record.get(field) {
        None => Err(OptError::MissingOption { optimizer, field }),
        Some(OptionValue::Int(value)) if *value > 0 => Ok(*value as u64),
        Some(OptionValue::Int(value)) => Err(OptError::InvalidOptionValue {
            optimizer,
            field,
            value: *value as f64,
            reason: "Limit must be positive.",
        }),
        Some(_) => Err(OptError::InvalidOptionType { optimizer, field, expected: "an integer" }),
    }
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value of the first
///   offending element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that a criterion value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCriterion`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCriterion { value });
    }
    Ok(())
}
