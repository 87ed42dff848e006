//! estimation::criterion — the criterion function seam.
//!
//! The wrapper never solves or simulates the model itself. It calls a
//! [`CriterionBackend`] with the full parameter vector and the opaque
//! arguments supplied at configuration time. Two interchangeable backends are
//! held side by side in [`CriterionVersions`]; the configured
//! [`CriterionVersion`] picks one per evaluation.
//!
//! Any `Fn(&Theta, &A) -> OptResult<Cost>` closure is a backend.
use crate::optimization::{
    errors::OptResult,
    estimation::{
        config::CriterionVersion,
        types::{Cost, Theta},
    },
};

/// Criterion function `(full parameter vector, args) -> value`.
///
/// Implementations return the value to be minimized. Finiteness is checked by
/// the caller.
pub trait CriterionBackend<A> {
    fn evaluate(&self, x_all: &Theta, args: &A) -> OptResult<Cost>;
}

impl<A, F> CriterionBackend<A> for F
where
    F: Fn(&Theta, &A) -> OptResult<Cost>,
{
    fn evaluate(&self, x_all: &Theta, args: &A) -> OptResult<Cost> {
        self(x_all, args)
    }
}

/// The native and reference implementations of the same criterion.
pub struct CriterionVersions<A> {
    native: Box<dyn CriterionBackend<A>>,
    reference: Box<dyn CriterionBackend<A>>,
}

impl<A> CriterionVersions<A> {
    pub fn new(
        native: impl CriterionBackend<A> + 'static, reference: impl CriterionBackend<A> + 'static,
    ) -> Self {
        Self { native: Box::new(native), reference: Box::new(reference) }
    }

    /// Use one implementation for both versions.
    pub fn single(backend: impl CriterionBackend<A> + Clone + 'static) -> Self {
        Self::new(backend.clone(), backend)
    }

    pub fn evaluate(&self, version: CriterionVersion, x_all: &Theta, args: &A) -> OptResult<Cost> {
        match version {
            CriterionVersion::Native => self.native.evaluate(x_all, args),
            CriterionVersion::Reference => self.reference.evaluate(x_all, args),
        }
    }
}

impl<A> std::fmt::Debug for CriterionVersions<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriterionVersions").finish_non_exhaustive()
    }
}
