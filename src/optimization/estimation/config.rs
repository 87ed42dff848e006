//! estimation::config — typed configuration of an estimation run.
//!
//! Purpose
//! -------
//! Hold every setting the wrapper needs before a run (optimizer choice,
//! per-backend options, criterion version, iteration cap, parameter mask,
//! criterion arguments) and turn it into validated [`Settings`] at lock time.
//!
//! Key behaviors
//! -------------
//! - [`OptimizerKind`] and [`CriterionVersion`] are closed enums parsed from
//!   their identifiers; unknown identifiers fail immediately.
//! - Backend options arrive as loosely typed [`OptionRecord`]s (as read from a
//!   configuration file) and are checked field by field when locking via
//!   [`BfgsOptions::from_record`] / [`DirectionSetOptions::from_record`].
//! - [`ConfigKey`] and [`AttrValue`] give a string-keyed `set_attr` surface
//!   on top of the typed [`Configuration`].
//! - [`OptimizerSection`] is the serde view of the optimizer block of a
//!   configuration file.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every field except `verbose` is optional until `lock()`; completeness is
//!   checked there, not on assignment.
//! - A value is only stored under the key whose type it matches.
use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::validation::{require_positive_float, require_positive_int},
    parameters::XInfo,
};

/// Optimizer backends known to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Quasi-Newton line-search minimizer (options `gtol`, `epsilon`).
    #[serde(rename = "BFGS")]
    Bfgs,
    /// Derivative-free minimizer (options `xtol`, `ftol`, `maxfun`).
    #[serde(rename = "DIRECTION-SET")]
    DirectionSet,
}

impl OptimizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerKind::Bfgs => "BFGS",
            OptimizerKind::DirectionSet => "DIRECTION-SET",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerKind {
    type Err = OptError;

    /// Parse an optimizer identifier (case-insensitive).
    ///
    /// Any identifier without a backend returns `OptError::UnknownOptimizer`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BFGS" => Ok(OptimizerKind::Bfgs),
            "DIRECTION-SET" => Ok(OptimizerKind::DirectionSet),
            _ => Err(OptError::UnknownOptimizer { name: s.to_string() }),
        }
    }
}

/// Which implementation of the criterion function to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriterionVersion {
    #[serde(rename = "NATIVE")]
    Native,
    #[serde(rename = "REFERENCE")]
    Reference,
}

impl CriterionVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionVersion::Native => "NATIVE",
            CriterionVersion::Reference => "REFERENCE",
        }
    }
}

impl fmt::Display for CriterionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriterionVersion {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NATIVE" => Ok(CriterionVersion::Native),
            "REFERENCE" => Ok(CriterionVersion::Reference),
            _ => Err(OptError::UnknownVersion { name: s.to_string() }),
        }
    }
}

/// A single backend option as it appears in a configuration file.
///
/// Integers and floats are kept apart: `1` is an `Int`, `1.0` a `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Option fields of one backend, keyed by name.
pub type OptionRecord = BTreeMap<String, OptionValue>;

/// Option records of every configured backend.
pub type OptimizerOptions = BTreeMap<OptimizerKind, OptionRecord>;

/// Validated options of the gradient backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BfgsOptions {
    /// Gradient-norm tolerance.
    pub gtol: f64,
    /// Forward-difference step for the numerical gradient.
    pub epsilon: f64,
}

impl BfgsOptions {
    /// Check and extract `gtol` and `epsilon` (both positive floats).
    pub fn from_record(record: &OptionRecord) -> OptResult<Self> {
        let name = OptimizerKind::Bfgs.as_str();
        let gtol = require_positive_float(record, name, "gtol")?;
        let epsilon = require_positive_float(record, name, "epsilon")?;
        Ok(Self { gtol, epsilon })
    }
}

/// Validated options of the derivative-free backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSetOptions {
    /// Acceptable resolution in parameter space.
    pub xtol: f64,
    /// Acceptable spread of criterion values at convergence.
    pub ftol: f64,
    /// Maximum number of criterion evaluations.
    pub maxfun: u64,
}

impl DirectionSetOptions {
    /// Check and extract `xtol`, `ftol` (positive floats) and `maxfun`
    /// (positive integer).
    pub fn from_record(record: &OptionRecord) -> OptResult<Self> {
        let name = OptimizerKind::DirectionSet.as_str();
        let maxfun = require_positive_int(record, name, "maxfun")?;
        let xtol = require_positive_float(record, name, "xtol")?;
        let ftol = require_positive_float(record, name, "ftol")?;
        Ok(Self { xtol, ftol, maxfun })
    }
}

/// The selected backend together with its validated options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackendConfig {
    Bfgs(BfgsOptions),
    DirectionSet(DirectionSetOptions),
}

impl BackendConfig {
    pub fn kind(&self) -> OptimizerKind {
        match self {
            BackendConfig::Bfgs(_) => OptimizerKind::Bfgs,
            BackendConfig::DirectionSet(_) => OptimizerKind::DirectionSet,
        }
    }
}

/// Typed view of a configuration that passed `lock()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend: BackendConfig,
    pub version: CriterionVersion,
    pub maxiter: u64,
    pub verbose: bool,
}

/// Recognized configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    OptimizerUsed,
    OptimizerOptions,
    Version,
    Maxiter,
    XInfo,
    Args,
    Verbose,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::OptimizerUsed => "optimizer_used",
            ConfigKey::OptimizerOptions => "optimizer_options",
            ConfigKey::Version => "version",
            ConfigKey::Maxiter => "maxiter",
            ConfigKey::XInfo => "x_info",
            ConfigKey::Args => "args",
            ConfigKey::Verbose => "verbose",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimizer_used" => Ok(ConfigKey::OptimizerUsed),
            "optimizer_options" => Ok(ConfigKey::OptimizerOptions),
            "version" => Ok(ConfigKey::Version),
            "maxiter" => Ok(ConfigKey::Maxiter),
            "x_info" => Ok(ConfigKey::XInfo),
            "args" => Ok(ConfigKey::Args),
            "verbose" => Ok(ConfigKey::Verbose),
            _ => Err(OptError::UnknownConfigKey { key: s.to_string() }),
        }
    }
}

/// A value destined for one configuration key.
///
/// `Text` is accepted for `optimizer_used` and `version` and parsed as an
/// identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue<A> {
    OptimizerUsed(OptimizerKind),
    OptimizerOptions(OptimizerOptions),
    Version(CriterionVersion),
    Maxiter(i64),
    XInfo(XInfo),
    Args(A),
    Verbose(bool),
    Text(String),
}

impl<A> AttrValue<A> {
    fn type_name(&self) -> &'static str {
        match self {
            AttrValue::OptimizerUsed(_) => "OptimizerKind",
            AttrValue::OptimizerOptions(_) => "OptimizerOptions",
            AttrValue::Version(_) => "CriterionVersion",
            AttrValue::Maxiter(_) => "integer",
            AttrValue::XInfo(_) => "XInfo",
            AttrValue::Args(_) => "criterion arguments",
            AttrValue::Verbose(_) => "bool",
            AttrValue::Text(_) => "text",
        }
    }
}

/// Raw configuration as assembled by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration<A> {
    optimizer_used: Option<OptimizerKind>,
    optimizer_options: Option<OptimizerOptions>,
    version: Option<CriterionVersion>,
    maxiter: Option<i64>,
    x_info: Option<XInfo>,
    args: Option<A>,
    verbose: bool,
}

impl<A> Default for Configuration<A> {
    fn default() -> Self {
        Self {
            optimizer_used: None,
            optimizer_options: None,
            version: None,
            maxiter: None,
            x_info: None,
            args: None,
            verbose: false,
        }
    }
}

impl<A> Configuration<A> {
    /// Store `value` under `key`.
    ///
    /// # Errors
    /// - [`OptError::AttrTypeMismatch`] if the value does not fit the key.
    /// - [`OptError::UnknownOptimizer`] / [`OptError::UnknownVersion`] for
    ///   unrecognized identifiers passed as `Text`.
    pub fn set(&mut self, key: ConfigKey, value: AttrValue<A>) -> OptResult<()> {
        match (key, value) {
            (ConfigKey::OptimizerUsed, AttrValue::OptimizerUsed(kind)) => {
                self.optimizer_used = Some(kind)
            }
            (ConfigKey::OptimizerUsed, AttrValue::Text(name)) => {
                self.optimizer_used = Some(name.parse()?)
            }
            (ConfigKey::OptimizerOptions, AttrValue::OptimizerOptions(options)) => {
                self.optimizer_options = Some(options)
            }
            (ConfigKey::Version, AttrValue::Version(version)) => self.version = Some(version),
            (ConfigKey::Version, AttrValue::Text(name)) => self.version = Some(name.parse()?),
            (ConfigKey::Maxiter, AttrValue::Maxiter(maxiter)) => self.maxiter = Some(maxiter),
            (ConfigKey::XInfo, AttrValue::XInfo(x_info)) => self.x_info = Some(x_info),
            (ConfigKey::Args, AttrValue::Args(args)) => self.args = Some(args),
            (ConfigKey::Verbose, AttrValue::Verbose(verbose)) => self.verbose = verbose,
            (key, value) => {
                return Err(OptError::AttrTypeMismatch {
                    key: key.as_str(),
                    found: value.type_name(),
                });
            }
        }
        Ok(())
    }

    pub fn optimizer_used(&self) -> Option<OptimizerKind> {
        self.optimizer_used
    }

    pub fn optimizer_options(&self) -> Option<&OptimizerOptions> {
        self.optimizer_options.as_ref()
    }

    pub fn version(&self) -> Option<CriterionVersion> {
        self.version
    }

    pub fn maxiter(&self) -> Option<i64> {
        self.maxiter
    }

    pub fn x_info(&self) -> Option<&XInfo> {
        self.x_info.as_ref()
    }

    pub fn args(&self) -> Option<&A> {
        self.args.as_ref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Validate the configuration and produce typed [`Settings`].
    ///
    /// Checks, in order: the options of every configured backend (whether or
    /// not it is selected), completeness of the required fields, that the
    /// selected optimizer has options, and that `maxiter >= 0`.
    pub fn validate(&self) -> OptResult<Settings> {
        let options =
            self.optimizer_options.as_ref().ok_or(OptError::MissingAttribute {
                key: ConfigKey::OptimizerOptions.as_str(),
            })?;

        let mut bfgs = None;
        let mut direction_set = None;
        for (kind, record) in options {
            match kind {
                OptimizerKind::Bfgs => bfgs = Some(BfgsOptions::from_record(record)?),
                OptimizerKind::DirectionSet => {
                    direction_set = Some(DirectionSetOptions::from_record(record)?)
                }
            }
        }

        let kind = self
            .optimizer_used
            .ok_or(OptError::MissingAttribute { key: ConfigKey::OptimizerUsed.as_str() })?;
        let backend = match kind {
            OptimizerKind::Bfgs => bfgs.map(BackendConfig::Bfgs),
            OptimizerKind::DirectionSet => direction_set.map(BackendConfig::DirectionSet),
        }
        .ok_or(OptError::OptimizerOptionsMissing { optimizer: kind.as_str() })?;

        let version =
            self.version.ok_or(OptError::MissingAttribute { key: ConfigKey::Version.as_str() })?;

        let maxiter =
            self.maxiter.ok_or(OptError::MissingAttribute { key: ConfigKey::Maxiter.as_str() })?;
        if maxiter < 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: maxiter,
                reason: "Maximum iterations must be non-negative.",
            });
        }

        if self.x_info.is_none() {
            return Err(OptError::MissingAttribute { key: ConfigKey::XInfo.as_str() });
        }
        if self.args.is_none() {
            return Err(OptError::MissingAttribute { key: ConfigKey::Args.as_str() });
        }

        Ok(Settings { backend, version, maxiter: maxiter as u64, verbose: self.verbose })
    }
}

/// Optimizer block of a configuration file.
///
/// ```json
/// {
///   "optimizer_used": "BFGS",
///   "optimizer_options": {
///     "BFGS": { "gtol": 1e-5, "epsilon": 1e-6 },
///     "DIRECTION-SET": { "xtol": 1e-4, "ftol": 1e-4, "maxfun": 1000 }
///   },
///   "version": "NATIVE",
///   "maxiter": 100
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSection {
    pub optimizer_used: OptimizerKind,
    pub optimizer_options: OptimizerOptions,
    pub version: CriterionVersion,
    pub maxiter: i64,
}

impl OptimizerSection {
    pub fn from_json(text: &str) -> OptResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Key/value pairs ready for `set_attr`.
    pub fn into_attrs<A>(self) -> Vec<(ConfigKey, AttrValue<A>)> {
        vec![
            (ConfigKey::OptimizerUsed, AttrValue::OptimizerUsed(self.optimizer_used)),
            (ConfigKey::OptimizerOptions, AttrValue::OptimizerOptions(self.optimizer_options)),
            (ConfigKey::Version, AttrValue::Version(self.version)),
            (ConfigKey::Maxiter, AttrValue::Maxiter(self.maxiter)),
        ]
    }
}
