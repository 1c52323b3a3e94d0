//! `sea-orm`-backed [`Driver`] implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, FromQueryResult,
    Statement, Value,
};
use serde_json::Value as Json;

use crate::driver::{Driver, ExecOutcome, LockMode, Row};
use crate::params::expand;
use crate::{DbEngine, DbError, DbValue, Params, Result};

/// Connection options.
#[derive(Debug, Clone)]
pub struct ConnectOpts {
    /// Timeout to acquire the connection.
    pub acquire_timeout: Option<Duration>,
    /// Forward statements to the sqlx logger.
    pub sql_logging: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            acquire_timeout: Some(Duration::from_secs(30)),
            sql_logging: false,
        }
    }
}

/// A single-connection driver over a `sea-orm` [`DatabaseConnection`].
///
/// The pool is capped at one connection on purpose: transaction and
/// table-lock statements are session-scoped, so every statement must land
/// on the same backend connection for `begin`/`commit` and the
/// in-transaction flag to be coherent. Pooling design is out of scope for
/// this layer.
pub struct SeaDriver {
    engine: DbEngine,
    conn: DatabaseConnection,
    dsn: String,
    tx_open: AtomicBool,
}

impl SeaDriver {
    /// Connect and build a driver.
    ///
    /// # Errors
    /// Returns an error when the DSN scheme is unknown or the connection
    /// fails.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = DbEngine::from_dsn(dsn)?;

        let mut conn_opts = ConnectOptions::new(dsn.to_owned());
        conn_opts
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(opts.sql_logging);
        if let Some(timeout) = opts.acquire_timeout {
            conn_opts.acquire_timeout(timeout);
        }

        let conn = Database::connect(conn_opts).await?;
        Ok(Self {
            engine,
            conn,
            dsn: dsn.to_owned(),
            tx_open: AtomicBool::new(false),
        })
    }

    /// The DSN this driver was configured with.
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    fn backend(&self) -> DbBackend {
        match self.engine {
            DbEngine::Postgres => DbBackend::Postgres,
            DbEngine::MySql => DbBackend::MySql,
            DbEngine::Sqlite => DbBackend::Sqlite,
        }
    }

    fn statement(&self, sql: &str, params: &Params) -> Statement {
        let (expanded, binds) = expand(sql, params, self.engine);
        tracing::debug!(target: "rowkit_db", sql = %expanded, binds = binds.len(), "execute");
        Statement::from_sql_and_values(self.backend(), expanded, binds.into_iter().map(bind_value))
    }
}

impl std::fmt::Debug for SeaDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeaDriver")
            .field("engine", &self.engine)
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}

/// Map a bind value onto the engine-native representation.
///
/// Temporal, uuid and json values are bound in their canonical textual
/// forms so the same record round-trips identically across engines; the
/// record layer's coercion pipeline parses them back on load.
fn bind_value(v: DbValue) -> Value {
    match v {
        DbValue::Null => Value::String(None),
        DbValue::Bool(b) => Value::from(b),
        DbValue::Int(i) => Value::from(i),
        DbValue::Float(x) => Value::from(x),
        DbValue::Text(s) => Value::from(s),
        DbValue::DateTime(t) => Value::from(t.to_rfc3339()),
        DbValue::Uuid(u) => Value::from(u.to_string()),
        DbValue::Json(j) => Value::from(j.to_string()),
    }
}

fn storage_err(e: sea_orm::DbErr) -> DbError {
    DbError::Storage {
        message: e.to_string(),
    }
}

#[async_trait]
impl Driver for SeaDriver {
    fn engine(&self) -> DbEngine {
        self.engine
    }

    fn has_returning(&self) -> bool {
        // Mirrors the supported-driver matrix: only PostgreSQL advertises
        // RETURNING, so the insert/update fallback paths stay exercised on
        // the other engines.
        self.engine == DbEngine::Postgres
    }

    fn escape(&self, raw: &str) -> String {
        let quoted = if self.engine == DbEngine::MySql {
            raw.replace('\\', "\\\\").replace('\'', "''")
        } else {
            raw.replace('\'', "''")
        };
        format!("'{quoted}'")
    }

    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let stmt = self.statement(sql, params);
        let rows = self.conn.query_all(stmt).await.map_err(storage_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            match Json::from_query_result(row, "").map_err(storage_err)? {
                Json::Object(map) => out.push(map),
                other => {
                    return Err(DbError::Storage {
                        message: format!("unexpected row shape: {other}"),
                    });
                }
            }
        }
        Ok(out)
    }

    async fn execute(&self, sql: &str, params: &Params) -> Result<ExecOutcome> {
        let stmt = self.statement(sql, params);
        let res = self.conn.execute(stmt).await.map_err(storage_err)?;

        // ExecResult::last_insert_id is unsupported on PostgreSQL; RETURNING
        // covers row retrieval there.
        let last_insert_id = if self.engine == DbEngine::Postgres {
            None
        } else {
            let id = res.last_insert_id();
            if id == 0 { None } else { i64::try_from(id).ok() }
        };

        Ok(ExecOutcome {
            rows_affected: res.rows_affected(),
            last_insert_id,
        })
    }

    async fn begin(&self) -> Result<()> {
        if self.tx_open.swap(true, Ordering::SeqCst) {
            return Err(DbError::NestedTransaction);
        }
        if let Err(e) = self.conn.execute_unprepared("BEGIN").await {
            self.tx_open.store(false, Ordering::SeqCst);
            return Err(storage_err(e));
        }
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.tx_open.load(Ordering::SeqCst)
    }

    async fn commit(&self) -> Result<()> {
        if !self.tx_open.load(Ordering::SeqCst) {
            return Err(DbError::NoTransaction);
        }
        self.conn
            .execute_unprepared("COMMIT")
            .await
            .map_err(storage_err)?;
        self.tx_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        if !self.tx_open.load(Ordering::SeqCst) {
            return Err(DbError::NoTransaction);
        }
        self.conn
            .execute_unprepared("ROLLBACK")
            .await
            .map_err(storage_err)?;
        self.tx_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn lock_tables(&self, tables: &[(&str, LockMode)]) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }
        match self.engine {
            DbEngine::MySql => {
                let locks = tables
                    .iter()
                    .map(|(table, mode)| {
                        let mode = match mode {
                            LockMode::Write => "WRITE",
                            LockMode::Read => "READ",
                        };
                        format!("{table} {mode}")
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.conn
                    .execute_unprepared(&format!("LOCK TABLES {locks}"))
                    .await
                    .map_err(storage_err)?;
            }
            DbEngine::Postgres => {
                // LOCK TABLE is only valid inside a transaction; the engine
                // reports the violation as a storage failure.
                for (table, mode) in tables {
                    let mode = match mode {
                        LockMode::Write => "ACCESS EXCLUSIVE",
                        LockMode::Read => "ACCESS SHARE",
                    };
                    self.conn
                        .execute_unprepared(&format!("LOCK TABLE {table} IN {mode} MODE"))
                        .await
                        .map_err(storage_err)?;
                }
            }
            DbEngine::Sqlite => {
                // The whole file is locked by the enclosing transaction.
            }
        }
        Ok(())
    }

    async fn unlock_tables(&self) -> Result<()> {
        if self.engine == DbEngine::MySql {
            self.conn
                .execute_unprepared("UNLOCK TABLES")
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }
}
