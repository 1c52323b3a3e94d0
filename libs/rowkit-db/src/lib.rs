//! Database driver abstraction for the rowkit core.
//!
//! This crate owns everything below the query builder: the [`Driver`]
//! capability trait, a `sea-orm`-backed implementation covering `SQLite`,
//! `PostgreSQL` and `MySQL`, the `:name` / `{name}` parameter substitution
//! protocol, and the profile registry that maps logical connection names to
//! configured drivers.
//!
//! # Features
//! - `pg`, `mysql`, `sqlite`: enable the corresponding sea-orm backends
//!
//! # Example
//! ```rust,no_run
//! use rowkit_db::{DEFAULT_PROFILE, DbRegistry, Driver, Params};
//!
//! # async fn demo() -> rowkit_db::Result<()> {
//! let mut registry = DbRegistry::new();
//! registry.connect(DEFAULT_PROFILE, "sqlite::memory:").await?;
//!
//! let driver = registry.driver_or_err(DEFAULT_PROFILE)?;
//! let rows = driver
//!     .query(
//!         "SELECT * FROM {table} WHERE age > :age",
//!         &Params::new().ident("{table}", "users").bind(":age", 30),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod params;
pub mod registry;
pub mod sea;
pub mod value;

pub use config::{DbConfig, ProfileConfig};
pub use driver::{Driver, DriverRef, ExecOutcome, LockMode, Row};
pub use params::Params;
pub use registry::{DEFAULT_PROFILE, DbRegistry};
pub use sea::{ConnectOpts, SeaDriver};
pub use value::DbValue;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the driver layer.
///
/// Every variant except [`DbError::Storage`] is a configuration-class error:
/// it is raised before any I/O happens and indicates a bug in the calling
/// code or the deployment. `Storage` carries the driver's own failure
/// message and is the one callers are expected to recover from.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("unknown DSN scheme: {0}")]
    UnknownDsn(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}: invalid database profile (not configured?)")]
    UnknownProfile(String),

    #[error("{0}: database profile is already registered")]
    DuplicateProfile(String),

    #[error("a transaction is already open on this connection")]
    NestedTransaction,

    #[error("no transaction is open on this connection")]
    NoTransaction,

    #[error("environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("query failed: {message}")]
    Storage { message: String },

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

impl DbEngine {
    /// Detect the engine from a DSN scheme prefix.
    ///
    /// Only the scheme is inspected; the tail (credentials, host, params) is
    /// left untouched.
    ///
    /// # Errors
    /// Returns [`DbError::UnknownDsn`] when the scheme is not recognized.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_owned()))
        }
    }
}
