use argmin::core::{ArgminError, Error};

/// Crate-wide result alias for estimation operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Integrity guard ----
    /// Configuration mutation or `lock()` attempted while locked.
    AlreadyLocked,

    /// `unlock()`, `crit_func` or `optimize` attempted while unlocked.
    NotLocked,

    /// Configuration key is not recognized.
    UnknownConfigKey {
        key: String,
    },

    /// Value supplied for a configuration key has the wrong type.
    AttrTypeMismatch {
        key: &'static str,
        found: &'static str,
    },

    /// Required configuration field was never set.
    MissingAttribute {
        key: &'static str,
    },

    /// Maximum iterations must be a non-negative integer.
    InvalidMaxIter {
        max_iter: i64,
        reason: &'static str,
    },

    /// Configuration section could not be parsed.
    InvalidConfigSection {
        text: String,
    },

    // ---- Optimizer selection and options ----
    /// Optimizer identifier has no backend.
    UnknownOptimizer {
        name: String,
    },

    /// Criterion version identifier is not recognized.
    UnknownVersion {
        name: String,
    },

    /// The selected optimizer has no option record.
    OptimizerOptionsMissing {
        optimizer: &'static str,
    },

    /// A required backend option is absent.
    MissingOption {
        optimizer: &'static str,
        field: &'static str,
    },

    /// A backend option has the wrong type.
    InvalidOptionType {
        optimizer: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    /// A backend option is out of range.
    InvalidOptionValue {
        optimizer: &'static str,
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    // ---- Parameter mapping ----
    /// Fixed mask and baseline vector differ in length.
    MaskLengthMismatch {
        baseline: usize,
        mask: usize,
    },

    /// Free vector length does not match the number of free positions.
    FreeLengthMismatch {
        expected: usize,
        found: usize,
    },

    /// Reconstructed parameter vectors must be finite.
    NonFiniteParameter {
        index: usize,
        value: f64,
    },

    // ---- Criterion ----
    /// Criterion backend returned a non-finite value.
    NonFiniteCriterion {
        value: f64,
    },

    /// The evaluation budget of the backend is used up.
    EvaluationBudgetExhausted {
        maxfun: u64,
    },

    /// Result requested before any evaluation was recorded.
    NoEvaluationRecorded,

    // ---- Gradient ----
    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- Covariance decoding ----
    /// Parameter vector too short to hold the Cholesky block.
    CholeskyOutOfRange {
        required: usize,
        available: usize,
    },

    /// Cholesky factor entries must be finite.
    InvalidCholeskyEntry {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Reporting ----
    /// Writing a progress artifact failed.
    Io {
        path: String,
        text: String,
    },

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl OptError {
    /// Errors raised by the solver itself rather than by the criterion,
    /// the configuration or the reporting layer.
    ///
    /// Backend adapters treat these as a stalled run (non-convergence)
    /// instead of aborting the estimation.
    pub fn is_solver_breakdown(&self) -> bool {
        matches!(
            self,
            OptError::InvalidParameter { .. }
                | OptError::NotInitialized { .. }
                | OptError::ConditionViolated { .. }
                | OptError::PotentialBug { .. }
                | OptError::ImpossibleError { .. }
                | OptError::BackendError { .. }
        )
    }
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Integrity guard ----
            OptError::AlreadyLocked => {
                write!(f, "Estimation configuration is locked")
            }
            OptError::NotLocked => {
                write!(f, "Estimation configuration is not locked")
            }
            OptError::UnknownConfigKey { key } => {
                write!(f, "Unknown configuration key '{key}'")
            }
            OptError::AttrTypeMismatch { key, found } => {
                write!(f, "Configuration key '{key}' cannot hold a value of type {found}")
            }
            OptError::MissingAttribute { key } => {
                write!(f, "Configuration key '{key}' was never set")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidConfigSection { text } => {
                write!(f, "Invalid optimizer configuration section: {text}")
            }

            // ---- Optimizer selection and options ----
            OptError::UnknownOptimizer { name } => {
                write!(f, "Optimizer '{name}' is not implemented")
            }
            OptError::UnknownVersion { name } => {
                write!(f, "Criterion version '{name}' is not recognized")
            }
            OptError::OptimizerOptionsMissing { optimizer } => {
                write!(f, "No options provided for optimizer {optimizer}")
            }
            OptError::MissingOption { optimizer, field } => {
                write!(f, "Option '{field}' missing for optimizer {optimizer}")
            }
            OptError::InvalidOptionType { optimizer, field, expected } => {
                write!(f, "Option '{field}' for optimizer {optimizer} must be {expected}")
            }
            OptError::InvalidOptionValue { optimizer, field, value, reason } => {
                write!(f, "Invalid option '{field}' = {value} for optimizer {optimizer}: {reason}")
            }

            // ---- Parameter mapping ----
            OptError::MaskLengthMismatch { baseline, mask } => {
                write!(f, "Fixed mask length {mask} does not match baseline length {baseline}")
            }
            OptError::FreeLengthMismatch { expected, found } => {
                write!(f, "Free parameter length mismatch: expected {expected}, found {found}")
            }
            OptError::NonFiniteParameter { index, value } => {
                write!(f, "Non-finite parameter at index {index}: {value}")
            }

            // ---- Criterion ----
            OptError::NonFiniteCriterion { value } => {
                write!(f, "Non-finite criterion value: {value}")
            }
            OptError::EvaluationBudgetExhausted { maxfun } => {
                write!(f, "Evaluation budget of {maxfun} criterion calls exhausted")
            }
            OptError::NoEvaluationRecorded => {
                write!(f, "No criterion evaluation has been recorded")
            }

            // ---- Gradient ----
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- Covariance decoding ----
            OptError::CholeskyOutOfRange { required, available } => {
                write!(
                    f,
                    "Cholesky block needs {required} parameters, only {available} available"
                )
            }
            OptError::InvalidCholeskyEntry { row, col, value } => {
                write!(f, "Invalid Cholesky entry at ({row}, {col}): {value}, must be finite")
            }

            // ---- Reporting ----
            OptError::Io { path, text } => {
                write!(f, "Failed to write '{path}': {text}")
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised by our own cost function come back wrapped by argmin.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(own) => return own,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<serde_json::Error> for OptError {
    fn from(err: serde_json::Error) -> Self {
        OptError::InvalidConfigSection { text: err.to_string() }
    }
}
