//! Join-table maintenance for many-to-many associations: replace the
//! full link set of one record in a delete-then-insert pair, under an
//! explicitly chosen transaction scope.

use rowkit_db::{DbError, DbValue, Driver, Params};

use crate::context::Env;
use crate::query::QueryBuilder;
use crate::record::Record;
use crate::schema::Schema;
use crate::{RecordError, Result};

/// Shape of a join table between two models.
#[derive(Debug, Clone, Copy)]
pub struct LinkTable {
    /// The join table itself.
    pub table: &'static str,
    /// Column referencing the record whose links are being replaced.
    pub source_key: &'static str,
    /// Column referencing the linked model.
    pub target_key: &'static str,
}

/// Who owns the transaction around the delete-then-insert pair.
///
/// `Own` opens, commits and (on failure) rolls back a transaction here;
/// it refuses to run when one is already open. `Join` participates in
/// the caller's transaction: it never commits or rolls back, and
/// failures simply propagate upward for the owner to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxScope {
    Own,
    Join,
}

impl TxScope {
    /// Choose a scope from the driver's current transaction state.
    #[must_use]
    pub fn detect(driver: &dyn Driver) -> Self {
        if driver.in_transaction() {
            TxScope::Join
        } else {
            TxScope::Own
        }
    }
}

/// Replace every link row of `record` in `link.table` with one row per
/// id in `others`. An empty `others` just clears the links.
///
/// Returns `false` (after logging) when a statement fails on storage;
/// under [`TxScope::Own`] the transaction is rolled back first, under
/// [`TxScope::Join`] nothing is rolled back — the transaction owner
/// decides.
///
/// # Errors
/// [`RecordError::UnsavedRecord`] when `record` is NEW;
/// [`rowkit_db::DbError::NestedTransaction`] when [`TxScope::Own`] finds
/// a transaction already open; configuration-class errors otherwise.
pub async fn replace_links<S: Schema>(
    env: &Env,
    record: &Record<S>,
    link: &LinkTable,
    others: &[DbValue],
    scope: TxScope,
) -> Result<bool> {
    if record.is_new() {
        return Err(RecordError::UnsavedRecord);
    }
    let id = record
        .id()
        .cloned()
        .ok_or(RecordError::MissingId(S::TABLE))?;
    let driver = env.db().driver_or_err(record.profile())?;

    let base = Params::new()
        .ident("{join_table}", link.table)
        .ident("{source_key}", link.source_key)
        .ident("{target_key}", link.target_key)
        .bind(":id", id);
    let delete_sql = "DELETE FROM {join_table} WHERE {source_key} = :id";

    if others.is_empty() {
        return match driver.execute(delete_sql, &base).await {
            Ok(_) => Ok(true),
            Err(DbError::Storage { message }) => {
                tracing::warn!(
                    target: "rowkit_record::links",
                    table = link.table,
                    error = %message,
                    "link clear failed"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        };
    }

    let mut insert_params = base.clone();
    let mut tuples = Vec::with_capacity(others.len());
    for (i, other) in others.iter().enumerate() {
        let tag = format!(":val_{i}");
        tuples.push(format!("(:id, {tag})"));
        insert_params = insert_params.bind(&tag, other.clone());
    }
    let insert_sql = format!(
        "INSERT INTO {{join_table}} ({{source_key}}, {{target_key}}) VALUES {}",
        tuples.join(", ")
    );

    if scope == TxScope::Own {
        driver.begin().await?;
    }

    let steps = async {
        driver.execute(delete_sql, &base).await?;
        driver.execute(&insert_sql, &insert_params).await?;
        Ok::<(), DbError>(())
    }
    .await;

    match (scope, steps) {
        (TxScope::Own, Ok(())) => {
            driver.commit().await?;
            Ok(true)
        }
        (TxScope::Own, Err(DbError::Storage { message })) => {
            tracing::warn!(
                target: "rowkit_record::links",
                table = link.table,
                error = %message,
                "link replacement failed; rolling back"
            );
            driver.rollback().await?;
            Ok(false)
        }
        (TxScope::Own, Err(e)) => {
            // best effort; the statement error is the interesting one
            let _ = driver.rollback().await;
            Err(e.into())
        }
        (TxScope::Join, Ok(())) => Ok(true),
        (TxScope::Join, Err(DbError::Storage { message })) => {
            tracing::warn!(
                target: "rowkit_record::links",
                table = link.table,
                error = %message,
                "link replacement failed inside caller's transaction"
            );
            Ok(false)
        }
        (TxScope::Join, Err(e)) => Err(e.into()),
    }
}

/// Decorate a linked-model builder with the INNER JOIN over the join
/// table, ready for `select()` on the linked side.
///
/// # Errors
/// [`RecordError::MissingId`] when `record` has no id; otherwise the
/// builder's own restrictions apply.
pub fn link_join<S: Schema, T: Schema>(
    record: &Record<S>,
    link: &LinkTable,
    query: &QueryBuilder<T>,
) -> Result<QueryBuilder<T>> {
    let id = record
        .id()
        .cloned()
        .ok_or(RecordError::MissingId(S::TABLE))?;
    query.join(
        "INNER JOIN {m2m_join_table} AS m2m \
         ON m2m.{m2m_source_key} = :m2m_id \
         AND m2m.{m2m_target_key} = {m2m_linked_table}.id",
        Params::new()
            .ident("{m2m_join_table}", link.table)
            .ident("{m2m_source_key}", link.source_key)
            .ident("{m2m_target_key}", link.target_key)
            .ident("{m2m_linked_table}", T::TABLE)
            .bind(":m2m_id", id),
    )
}
