//! parameters::mapper — free ↔ full parameter vectors.
//!
//! Purpose
//! -------
//! Translate between the vector the optimizer moves (free parameters only)
//! and the full model parameterization consumed by the criterion backend,
//! using a baseline vector and a fixed mask.
//!
//! Key behaviors
//! -------------
//! - [`reconstruct`] walks the baseline in order, emitting the baseline value
//!   at fixed positions and the next free value elsewhere.
//! - [`extract_free`] is its left-inverse on the free positions.
//! - [`XInfo`] bundles baseline and mask and validates their lengths once.
//!
//! Invariants & assumptions
//! ------------------------
//! - `fixed.len() == baseline.len()`.
//! - Every free vector has exactly as many entries as `fixed` has `false`
//!   entries.
//! - Reconstructed vectors are finite; anything else is a contract violation
//!   reported as [`OptError`].
use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::types::Theta,
};

/// Baseline parameter vector paired with its fixed mask.
///
/// `fixed[i] == true` holds parameter `i` at `baseline[i]` during
/// estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct XInfo {
    baseline: Theta,
    fixed: Vec<bool>,
}

impl XInfo {
    /// Pair a baseline with its mask.
    ///
    /// # Errors
    /// - [`OptError::MaskLengthMismatch`] if the lengths differ.
    pub fn new(baseline: Theta, fixed: Vec<bool>) -> OptResult<Self> {
        check_mask(&baseline, &fixed)?;
        Ok(Self { baseline, fixed })
    }

    /// Treat every parameter as free.
    pub fn all_free(baseline: Theta) -> Self {
        let fixed = vec![false; baseline.len()];
        Self { baseline, fixed }
    }

    pub fn baseline(&self) -> &Theta {
        &self.baseline
    }

    pub fn fixed(&self) -> &[bool] {
        &self.fixed
    }

    /// Number of positions the optimizer is allowed to move.
    pub fn num_free(&self) -> usize {
        count_free(&self.fixed)
    }

    /// Full vector for the free values `free`. See [`reconstruct`].
    pub fn reconstruct(&self, free: &Theta) -> OptResult<Theta> {
        reconstruct(free, &self.baseline, &self.fixed)
    }

    /// Free values of the baseline itself, the natural starting point.
    pub fn free_start(&self) -> Theta {
        self.baseline
            .iter()
            .zip(&self.fixed)
            .filter(|(_, is_fixed)| !**is_fixed)
            .map(|(v, _)| *v)
            .collect()
    }
}

/// Expand a free vector into the full parameter vector.
///
/// Positions where `fixed` is `true` take the baseline value; the remaining
/// positions consume `free` in order.
///
/// # Errors
/// - [`OptError::MaskLengthMismatch`] if `fixed` and `baseline` differ in length.
/// - [`OptError::FreeLengthMismatch`] if `free` does not hold exactly one value
///   per free position.
/// - [`OptError::NonFiniteParameter`] for the first non-finite emitted value.
pub fn reconstruct(free: &Theta, baseline: &Theta, fixed: &[bool]) -> OptResult<Theta> {
    check_mask(baseline, fixed)?;
    let expected = count_free(fixed);
    if free.len() != expected {
        return Err(OptError::FreeLengthMismatch { expected, found: free.len() });
    }

    let mut next_free = free.iter();
    let mut full = Theta::zeros(baseline.len());
    for (index, (&base, &is_fixed)) in baseline.iter().zip(fixed).enumerate() {
        let value = if is_fixed {
            base
        } else {
            match next_free.next() {
                Some(v) => *v,
                None => return Err(OptError::FreeLengthMismatch { expected, found: free.len() }),
            }
        };
        if !value.is_finite() {
            return Err(OptError::NonFiniteParameter { index, value });
        }
        full[index] = value;
    }
    Ok(full)
}

/// Keep the entries of `full` at free positions, in order.
///
/// # Errors
/// - [`OptError::MaskLengthMismatch`] if `fixed` and `full` differ in length.
pub fn extract_free(full: &Theta, fixed: &[bool]) -> OptResult<Theta> {
    check_mask(full, fixed)?;
    Ok(full.iter().zip(fixed).filter(|(_, is_fixed)| !**is_fixed).map(|(v, _)| *v).collect())
}

// ---- Helper Methods ----

fn check_mask(baseline: &Theta, fixed: &[bool]) -> OptResult<()> {
    if baseline.len() != fixed.len() {
        return Err(OptError::MaskLengthMismatch { baseline: baseline.len(), mask: fixed.len() });
    }
    Ok(())
}

fn count_free(fixed: &[bool]) -> usize {
    fixed.iter().filter(|is_fixed| !**is_fixed).count()
}
