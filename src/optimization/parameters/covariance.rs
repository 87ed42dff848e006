//! Shock covariance reconstruction from a full parameter vector.
//!
//! The location of the Cholesky factor inside the full vector belongs to the
//! model's parameter layout, so it is delegated to a [`ParameterDecoder`].
//! This module only turns the decoded factor `L` into `Σ = L Lᵀ`.
use ndarray::Array2;

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::types::Theta,
};

/// Decodes the lower-triangular covariance factor of the reward shocks.
///
/// `is_debug` asks the decoder to run its own consistency checks.
pub trait ParameterDecoder {
    fn shocks_cholesky(&self, x_all: &Theta, is_debug: bool) -> OptResult<Array2<f64>>;
}

/// Reads a lower-triangular factor stored row by row in a contiguous block.
///
/// For `num_shocks = 4` the block holds the ten entries
/// `l00, l10, l11, l20, l21, l22, l30, l31, l32, l33`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CholeskyBlockDecoder {
    offset: Option<usize>,
    num_shocks: usize,
}

impl CholeskyBlockDecoder {
    /// Block starting at `offset`.
    pub fn new(offset: usize, num_shocks: usize) -> Self {
        Self { offset: Some(offset), num_shocks }
    }

    /// Block occupying the last `num_shocks (num_shocks + 1) / 2` entries.
    pub fn trailing(num_shocks: usize) -> Self {
        Self { offset: None, num_shocks }
    }

    pub fn num_shocks(&self) -> usize {
        self.num_shocks
    }

    fn block_len(&self) -> usize {
        self.num_shocks * (self.num_shocks + 1) / 2
    }
}

impl ParameterDecoder for CholeskyBlockDecoder {
    fn shocks_cholesky(&self, x_all: &Theta, is_debug: bool) -> OptResult<Array2<f64>> {
        let block = self.block_len();
        let start = match self.offset {
            Some(offset) => offset,
            None => x_all.len().checked_sub(block).ok_or(OptError::CholeskyOutOfRange {
                required: block,
                available: x_all.len(),
            })?,
        };
        if start + block > x_all.len() {
            return Err(OptError::CholeskyOutOfRange {
                required: start + block,
                available: x_all.len(),
            });
        }

        let n = self.num_shocks;
        let mut factor = Array2::zeros((n, n));
        let mut k = start;
        for row in 0..n {
            for col in 0..=row {
                let value = x_all[k];
                if is_debug && !value.is_finite() {
                    return Err(OptError::InvalidCholeskyEntry { row, col, value });
                }
                factor[[row, col]] = value;
                k += 1;
            }
        }
        Ok(factor)
    }
}

/// `Σ = L Lᵀ` for the factor decoded from `x_all`.
pub fn shocks_covariance<D: ParameterDecoder + ?Sized>(
    decoder: &D, x_all: &Theta, is_debug: bool,
) -> OptResult<Array2<f64>> {
    let factor = decoder.shocks_cholesky(x_all, is_debug)?;
    Ok(factor.dot(&factor.t()))
}
