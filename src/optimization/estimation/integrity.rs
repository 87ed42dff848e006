//! estimation::integrity — lock discipline around the configuration.
//!
//! Purpose
//! -------
//! Keep the configuration mutable only while unlocked, validate it exactly
//! once on [`IntegrityGuard::lock`], and hand out the validated [`Settings`]
//! only while locked.
//!
//! Key behaviors
//! -------------
//! - `set_attr` accepts a string key, so configuration can be driven from
//!   files; unknown keys and values of the wrong type are rejected.
//! - `lock` runs [`Configuration::validate`] and stores the resulting
//!   settings in [`LockState::Locked`].
//! - `unlock` drops the settings; the raw configuration is kept.
//!
//! Invariants & assumptions
//! ------------------------
//! - No configuration field changes while locked.
//! - `lock` only from unlocked, `unlock` only from locked.
use tracing::info;

use crate::optimization::{
    errors::{OptError, OptResult},
    estimation::config::{AttrValue, ConfigKey, Configuration, Settings},
    parameters::XInfo,
};

/// Lock state of the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    Unlocked,
    Locked(Settings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityGuard<A> {
    config: Configuration<A>,
    state: LockState,
}

impl<A> Default for IntegrityGuard<A> {
    fn default() -> Self {
        Self { config: Configuration::default(), state: LockState::Unlocked }
    }
}

impl<A> IntegrityGuard<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked(_))
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn config(&self) -> &Configuration<A> {
        &self.config
    }

    /// Set the attribute named `key`.
    ///
    /// # Errors
    /// - [`OptError::AlreadyLocked`] while locked.
    /// - [`OptError::UnknownConfigKey`] for an unrecognized key.
    /// - Any error of [`IntegrityGuard::set`].
    pub fn set_attr(&mut self, key: &str, value: AttrValue<A>) -> OptResult<()> {
        if self.is_locked() {
            return Err(OptError::AlreadyLocked);
        }
        self.set(key.parse()?, value)
    }

    /// Typed variant of [`IntegrityGuard::set_attr`].
    ///
    /// # Errors
    /// - [`OptError::AlreadyLocked`] while locked.
    /// - [`OptError::AttrTypeMismatch`] if `value` does not fit `key`.
    pub fn set(&mut self, key: ConfigKey, value: AttrValue<A>) -> OptResult<()> {
        if self.is_locked() {
            return Err(OptError::AlreadyLocked);
        }
        self.config.set(key, value)
    }

    /// Validate the configuration and freeze it.
    ///
    /// # Errors
    /// - [`OptError::AlreadyLocked`] if already locked.
    /// - Any validation error; the guard then stays unlocked.
    pub fn lock(&mut self) -> OptResult<&Settings> {
        if self.is_locked() {
            return Err(OptError::AlreadyLocked);
        }
        let settings = self.config.validate()?;
        info!(
            optimizer = %settings.backend.kind(),
            version = %settings.version,
            maxiter = settings.maxiter,
            "estimation configuration locked"
        );
        self.state = LockState::Locked(settings);
        self.settings()
    }

    /// # Errors
    /// [`OptError::NotLocked`] if not locked.
    pub fn unlock(&mut self) -> OptResult<()> {
        if !self.is_locked() {
            return Err(OptError::NotLocked);
        }
        self.state = LockState::Unlocked;
        info!("estimation configuration unlocked");
        Ok(())
    }

    /// Validated settings.
    ///
    /// # Errors
    /// [`OptError::NotLocked`] if not locked.
    pub fn settings(&self) -> OptResult<&Settings> {
        match &self.state {
            LockState::Locked(settings) => Ok(settings),
            LockState::Unlocked => Err(OptError::NotLocked),
        }
    }

    /// Settings together with the parameter mask and criterion arguments.
    ///
    /// # Errors
    /// [`OptError::NotLocked`] if not locked.
    pub fn locked_parts(&self) -> OptResult<(&Settings, &XInfo, &A)> {
        let settings = self.settings()?;
        let x_info = self
            .config
            .x_info()
            .ok_or(OptError::MissingAttribute { key: ConfigKey::XInfo.as_str() })?;
        let args =
            self.config.args().ok_or(OptError::MissingAttribute { key: ConfigKey::Args.as_str() })?;
        Ok((settings, x_info, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::estimation::config::{
        OptimizerKind, OptimizerOptions, OptionRecord, OptionValue,
    };
    use ndarray::array;

    fn options() -> OptimizerOptions {
        let bfgs: OptionRecord = [
            ("gtol".to_string(), OptionValue::Float(1e-5)),
            ("epsilon".to_string(), OptionValue::Float(1e-6)),
        ]
        .into_iter()
        .collect();
        [(OptimizerKind::Bfgs, bfgs)].into_iter().collect()
    }

    fn configured() -> IntegrityGuard<Vec<u8>> {
        let mut guard = IntegrityGuard::new();
        guard.set_attr("optimizer_used", AttrValue::Text("BFGS".to_string())).unwrap();
        guard.set_attr("optimizer_options", AttrValue::OptimizerOptions(options())).unwrap();
        guard.set_attr("version", AttrValue::Text("NATIVE".to_string())).unwrap();
        guard.set_attr("maxiter", AttrValue::Maxiter(10)).unwrap();
        let x_info = XInfo::new(array![1.0, 2.0], vec![false, true]).unwrap();
        guard.set_attr("x_info", AttrValue::XInfo(x_info)).unwrap();
        guard.set_attr("args", AttrValue::Args(vec![1, 2, 3])).unwrap();
        guard
    }

    #[test]
    // Purpose
    // -------
    // Walk the full lock/unlock cycle.
    //
    // Given
    // -----
    // - A complete configuration.
    //
    // Expect
    // ------
    // - Settings only while locked; mutation and a second lock rejected while
    //   locked; unlocking twice rejected.
    fn lock_cycle() {
        // Arrange
        let mut guard = configured();
        assert_eq!(guard.settings().unwrap_err(), OptError::NotLocked);

        // Act / Assert
        let maxiter = guard.lock().unwrap().maxiter;
        assert_eq!(maxiter, 10);
        assert!(guard.is_locked());
        assert_eq!(guard.lock().unwrap_err(), OptError::AlreadyLocked);
        assert_eq!(
            guard.set_attr("maxiter", AttrValue::Maxiter(5)).unwrap_err(),
            OptError::AlreadyLocked
        );
        let (_, x_info, args) = guard.locked_parts().unwrap();
        assert_eq!(x_info.num_free(), 1);
        assert_eq!(args, &vec![1, 2, 3]);

        guard.unlock().unwrap();
        assert_eq!(guard.unlock().unwrap_err(), OptError::NotLocked);
        guard.set_attr("maxiter", AttrValue::Maxiter(5)).unwrap();
        assert_eq!(guard.lock().unwrap().maxiter, 5);
    }

    #[test]
    // Purpose
    // -------
    // Unknown keys and mistyped values are rejected on assignment.
    fn set_attr_rejects_unknown_and_mistyped() {
        let mut guard: IntegrityGuard<()> = IntegrityGuard::new();

        assert_eq!(
            guard.set_attr("max_iterations", AttrValue::Maxiter(1)).unwrap_err(),
            OptError::UnknownConfigKey { key: "max_iterations".to_string() }
        );
        assert!(matches!(
            guard.set_attr("maxiter", AttrValue::Verbose(true)),
            Err(OptError::AttrTypeMismatch { key: "maxiter", .. })
        ));
        assert!(matches!(
            guard.set_attr("optimizer_used", AttrValue::Text("NEWTON".to_string())),
            Err(OptError::UnknownOptimizer { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A failed validation leaves the guard unlocked.
    fn failed_lock_stays_unlocked() {
        let mut guard = configured();
        guard.set_attr("maxiter", AttrValue::Maxiter(-1)).unwrap();

        assert!(matches!(guard.lock(), Err(OptError::InvalidMaxIter { max_iter: -1, .. })));
        assert_eq!(guard.state(), &LockState::Unlocked);
    }
}
