//! Profile registry: logical connection name to configured driver.
//!
//! The registry is built once at startup and handed to the rest of the
//! application inside its context object; it is read-many afterwards.
//! Re-registration of a live profile is refused rather than silently
//! replacing a driver other components may already hold.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DbConfig, expand_env_vars};
use crate::driver::DriverRef;
use crate::sea::{ConnectOpts, SeaDriver};
use crate::{DbError, Result};

/// The profile used when a caller does not name one.
pub const DEFAULT_PROFILE: &str = "default";

/// Write-once mapping from profile name to driver.
#[derive(Default)]
pub struct DbRegistry {
    drivers: HashMap<String, DriverRef>,
}

impl DbRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-built driver under a profile name.
    ///
    /// # Errors
    /// Returns [`DbError::DuplicateProfile`] when the profile is taken.
    pub fn register(&mut self, profile: &str, driver: DriverRef) -> Result<()> {
        if self.drivers.contains_key(profile) {
            return Err(DbError::DuplicateProfile(profile.to_owned()));
        }
        self.drivers.insert(profile.to_owned(), driver);
        Ok(())
    }

    /// Connect a [`SeaDriver`] and register it under `profile`.
    ///
    /// # Errors
    /// Returns an error on duplicate profile, unknown DSN scheme or
    /// connection failure.
    pub async fn connect(&mut self, profile: &str, dsn: &str) -> Result<DriverRef> {
        self.connect_with(profile, dsn, ConnectOpts::default()).await
    }

    /// [`DbRegistry::connect`] with explicit connection options.
    ///
    /// # Errors
    /// Same as [`DbRegistry::connect`].
    pub async fn connect_with(
        &mut self,
        profile: &str,
        dsn: &str,
        opts: ConnectOpts,
    ) -> Result<DriverRef> {
        if self.drivers.contains_key(profile) {
            return Err(DbError::DuplicateProfile(profile.to_owned()));
        }
        let dsn = expand_env_vars(dsn)?;
        let driver: DriverRef = Arc::new(SeaDriver::connect(&dsn, opts).await?);
        self.drivers.insert(profile.to_owned(), Arc::clone(&driver));
        Ok(driver)
    }

    /// Build a registry from configuration, connecting every profile.
    ///
    /// # Errors
    /// Returns the first connection or configuration error encountered.
    pub async fn from_config(cfg: &DbConfig) -> Result<Self> {
        let mut registry = Self::new();
        for (profile, pc) in &cfg.profiles {
            let opts = ConnectOpts {
                acquire_timeout: pc.acquire_timeout.or(ConnectOpts::default().acquire_timeout),
                sql_logging: pc.sql_logging,
            };
            registry.connect_with(profile, &pc.dsn, opts).await?;
        }
        Ok(registry)
    }

    /// Look up a profile.
    #[must_use]
    pub fn driver(&self, profile: &str) -> Option<DriverRef> {
        self.drivers.get(profile).map(Arc::clone)
    }

    /// Look up a profile, treating absence as a configuration error.
    ///
    /// # Errors
    /// Returns [`DbError::UnknownProfile`] when the profile was never
    /// configured.
    pub fn driver_or_err(&self, profile: &str) -> Result<DriverRef> {
        self.driver(profile)
            .ok_or_else(|| DbError::UnknownProfile(profile.to_owned()))
    }

    /// Iterate over the configured profile names.
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DbRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbRegistry")
            .field("profiles", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}
