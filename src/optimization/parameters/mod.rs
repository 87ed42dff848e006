//! parameters — parameter-space algebra for the estimation wrapper.
//!
//! Purpose
//! -------
//! Map the optimizer's free vector onto the full model parameterization and
//! decode the reward-shock covariance from a full vector for reporting.
//!
//! Key behaviors
//! -------------
//! - [`mapper`]: [`reconstruct`] / [`extract_free`] under a fixed mask, and
//!   the [`XInfo`] bundle of baseline plus mask.
//! - [`covariance`]: the [`ParameterDecoder`] seam and `Σ = L Lᵀ`.
//!
//! Conventions
//! -----------
//! - Full vectors are laid out by the model; this module never assumes a
//!   particular length or position beyond what [`XInfo`] and the decoder
//!   state.

pub mod covariance;
pub mod mapper;

pub use self::covariance::{CholeskyBlockDecoder, ParameterDecoder, shocks_covariance};
pub use self::mapper::{XInfo, extract_free, reconstruct};
