//! The driver capability trait consumed by the query builder and the
//! record layer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{DbEngine, Params, Result};

/// One fetched row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Shared handle to a configured driver.
pub type DriverRef = Arc<dyn Driver>;

/// Outcome of a statement that does not produce rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Engine-generated id of the last inserted row, when the engine
    /// reports one. Never populated on PostgreSQL (RETURNING covers it).
    pub last_insert_id: Option<i64>,
}

/// Table lock mode for [`Driver::lock_tables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// Abstraction over one SQL dialect connection.
///
/// Implementations receive the raw template plus a [`Params`] mapping and
/// are responsible for running the substitution protocol before execution:
/// value placeholders become native binds, identifier placeholders are
/// substituted verbatim.
///
/// Transaction primitives operate on the connection's single session. A
/// component that wants transactional behavior must check
/// [`Driver::in_transaction`] first and only ever roll back a transaction
/// it opened itself.
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// The engine behind this connection.
    fn engine(&self) -> DbEngine;

    /// Whether the dialect can return affected-row data directly from
    /// INSERT/UPDATE (`RETURNING *`).
    fn has_returning(&self) -> bool;

    /// Quote a string as a SQL literal.
    ///
    /// Prefer value placeholders; this exists for the rare spot (IN-clause
    /// assembly, ad-hoc tooling) where a literal is unavoidable.
    fn escape(&self, raw: &str) -> String;

    /// Run a row-producing statement.
    ///
    /// # Errors
    /// [`crate::DbError::Storage`] with the driver's message on failure.
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// Run a statement for its side effect.
    ///
    /// # Errors
    /// [`crate::DbError::Storage`] with the driver's message on failure.
    async fn execute(&self, sql: &str, params: &Params) -> Result<ExecOutcome>;

    /// Open a transaction on this connection.
    ///
    /// # Errors
    /// [`crate::DbError::NestedTransaction`] when one is already open;
    /// callers must check [`Driver::in_transaction`] and join instead.
    async fn begin(&self) -> Result<()>;

    /// Whether a transaction opened through [`Driver::begin`] is pending.
    fn in_transaction(&self) -> bool;

    /// Commit the open transaction.
    ///
    /// # Errors
    /// [`crate::DbError::NoTransaction`] when none is open.
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// [`crate::DbError::NoTransaction`] when none is open.
    async fn rollback(&self) -> Result<()>;

    /// Acquire table-level locks. Table names are caller-trusted
    /// identifiers, same trust level as `{name}` placeholders.
    ///
    /// # Errors
    /// [`crate::DbError::Storage`] on engine refusal (e.g. PostgreSQL
    /// requires an open transaction).
    async fn lock_tables(&self, tables: &[(&str, LockMode)]) -> Result<()>;

    /// Release table-level locks where the engine needs an explicit
    /// release (`MySQL`); a no-op elsewhere.
    ///
    /// # Errors
    /// [`crate::DbError::Storage`] on engine refusal.
    async fn unlock_tables(&self) -> Result<()>;
}
