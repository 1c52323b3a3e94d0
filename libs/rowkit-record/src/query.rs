//! The immutable SQL statement composer.
//!
//! Every chain method returns a derived copy of the builder, so a base
//! query can be branched safely. As clauses accumulate, the set of legal
//! terminal operations narrows monotonically; a call outside the current
//! set fails with [`RecordError::Restricted`] before any I/O happens.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde_json::Value as Json;

use rowkit_db::{DEFAULT_PROFILE, DbValue, Driver, DriverRef, Params, Row};

use crate::context::Env;
use crate::record::Record;
use crate::schema::Schema;
use crate::{RecordError, Result};

/// Serialized field values heading into a SET or VALUES clause.
pub type FieldMap = BTreeMap<String, DbValue>;

/// A set of statement operations, used to track which terminals are still
/// legal for a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSet(u8);

impl OpSet {
    pub const INSERT: OpSet = OpSet(1);
    pub const SELECT: OpSet = OpSet(1 << 1);
    pub const UPDATE: OpSet = OpSet(1 << 2);
    pub const DELETE: OpSet = OpSet(1 << 3);
    pub const ALL: OpSet = OpSet(0b1111);

    /// Union of two sets.
    #[must_use]
    pub const fn or(self, other: OpSet) -> OpSet {
        OpSet(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersect(self, other: OpSet) -> OpSet {
        OpSet(self.0 & other.0)
    }

    #[must_use]
    pub const fn contains(self, other: OpSet) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OpSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (bit, name) in [
            (OpSet::INSERT, "INSERT"),
            (OpSet::SELECT, "SELECT"),
            (OpSet::UPDATE, "UPDATE"),
            (OpSet::DELETE, "DELETE"),
        ] {
            if self.contains(bit) {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "(none)")?;
        }
        Ok(())
    }
}

/// How many results a SELECT is expected to produce; controls the shape
/// of [`Selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arity {
    /// Don't make any expectations.
    #[default]
    Surprise,
    /// Expect no result; reserved for side-effect-only selects.
    ExpectNone,
    /// Expect exactly one result; more than one logs a warning.
    ExpectOne,
    /// Always return a collection, even for zero or one rows.
    ExpectMany,
}

/// Normalized result of a SELECT.
pub enum Selection<S: Schema> {
    None,
    One(Record<S>),
    Many(Vec<Record<S>>),
}

impl<S: Schema> Selection<S> {
    /// Flatten into a vector regardless of shape.
    #[must_use]
    pub fn into_vec(self) -> Vec<Record<S>> {
        match self {
            Selection::None => Vec::new(),
            Selection::One(record) => vec![record],
            Selection::Many(records) => records,
        }
    }

    /// The first record, if any.
    #[must_use]
    pub fn into_option(self) -> Option<Record<S>> {
        match self {
            Selection::None => None,
            Selection::One(record) => Some(record),
            Selection::Many(records) => records.into_iter().next(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Selection::None => 0,
            Selection::One(_) => 1,
            Selection::Many(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Schema> fmt::Debug for Selection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::None => write!(f, "Selection::None"),
            Selection::One(_) => write!(f, "Selection::One({})", S::TABLE),
            Selection::Many(records) => {
                write!(f, "Selection::Many({} x {})", records.len(), S::TABLE)
            }
        }
    }
}

/// Chainable, immutable statement composer for one target entity.
pub struct QueryBuilder<S: Schema> {
    arity: Arity,
    allowed: OpSet,
    join: String,
    filter: String,
    set_clause: String,
    group_by: String,
    order_by: String,
    limit: String,
    lock: &'static str,
    params: Params,
    profile: String,
    /// Derivation depth; used to generate unique SET tags so chained
    /// builders never collide.
    height: u32,
    _entity: PhantomData<fn() -> S>,
}

impl<S: Schema> Clone for QueryBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            arity: self.arity,
            allowed: self.allowed,
            join: self.join.clone(),
            filter: self.filter.clone(),
            set_clause: self.set_clause.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit.clone(),
            lock: self.lock,
            params: self.params.clone(),
            profile: self.profile.clone(),
            height: self.height,
            _entity: PhantomData,
        }
    }
}

impl<S: Schema> std::fmt::Debug for QueryBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("arity", &self.arity)
            .field("allowed", &self.allowed)
            .field("join", &self.join)
            .field("filter", &self.filter)
            .field("set_clause", &self.set_clause)
            .field("group_by", &self.group_by)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("lock", &self.lock)
            .field("params", &self.params)
            .field("profile", &self.profile)
            .field("height", &self.height)
            .finish()
    }
}

impl<S: Schema> Default for QueryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> QueryBuilder<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::with(OpSet::ALL, Arity::Surprise)
    }

    pub(crate) fn with(allowed: OpSet, arity: Arity) -> Self {
        Self {
            arity,
            allowed,
            join: String::new(),
            filter: String::new(),
            set_clause: String::new(),
            group_by: String::new(),
            order_by: String::new(),
            limit: String::new(),
            lock: "",
            params: Params::new(),
            profile: DEFAULT_PROFILE.to_owned(),
            height: 0,
            _entity: PhantomData,
        }
    }

    /// Derived copy with bumped height.
    fn derive(&self) -> Self {
        let mut next = self.clone();
        next.height += 1;
        next
    }

    fn narrowed(&self, ops: OpSet) -> Result<OpSet> {
        let future = self.allowed.intersect(ops);
        if future.is_empty() {
            return Err(RecordError::Restricted {
                requested: ops,
                allowed: self.allowed,
            });
        }
        Ok(future)
    }

    /// Validate that `ops` is still legal without changing state.
    fn ensure(&self, ops: OpSet) -> Result<()> {
        self.narrowed(ops).map(|_| ())
    }

    /// Intersect the allowed-operation set with `ops`.
    ///
    /// With `apply` false this only validates; with `apply` true the
    /// returned builder carries the narrowed set.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] when the intersection is empty.
    pub fn restrict_to(&self, ops: OpSet, apply: bool) -> Result<Self> {
        let future = self.narrowed(ops)?;
        let mut next = self.clone();
        if apply {
            next.allowed = future;
        }
        Ok(next)
    }

    /// The operations still legal for this builder.
    #[must_use]
    pub fn allowed(&self) -> OpSet {
        self.allowed
    }

    #[must_use]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Override the result-arity hint (e.g. force `ExpectMany` when a
    /// caller-supplied `first(n)` must still produce a collection).
    #[must_use]
    pub fn with_arity(&self, arity: Arity) -> Self {
        let mut next = self.derive();
        next.arity = arity;
        next
    }

    /// Route this query to another configured database profile.
    ///
    /// # Errors
    /// [`rowkit_db::DbError::UnknownProfile`] when the profile was never
    /// configured.
    pub fn query_on(&self, env: &Env, profile: &str) -> Result<Self> {
        env.db().driver_or_err(profile)?;
        let mut next = self.derive();
        next.profile = profile.to_owned();
        Ok(next)
    }

    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Append a JOIN fragment. Several joins can be chained.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside {SELECT, UPDATE, DELETE}.
    pub fn join(&self, fragment: &str, params: Params) -> Result<Self> {
        let allowed = self.narrowed(OpSet::SELECT.or(OpSet::UPDATE).or(OpSet::DELETE))?;
        let mut next = self.derive();
        next.allowed = allowed;
        if !next.join.is_empty() {
            next.join.push(' ');
        }
        next.join.push_str(fragment);
        next.params.merge(&params);
        Ok(next)
    }

    /// AND a condition into the WHERE clause.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside {SELECT, UPDATE, DELETE}.
    pub fn filter(&self, condition: &str, params: Params) -> Result<Self> {
        let allowed = self.narrowed(OpSet::SELECT.or(OpSet::UPDATE).or(OpSet::DELETE))?;
        let mut next = self.derive();
        next.allowed = allowed;
        if next.filter.is_empty() {
            next.filter.push_str("WHERE ");
        } else {
            next.filter.push_str(" AND ");
        }
        next.filter.push('(');
        next.filter.push_str(condition);
        next.filter.push(')');
        next.params.merge(&params);
        Ok(next)
    }

    /// Scope to one row by primary key.
    ///
    /// # Errors
    /// Same as [`QueryBuilder::filter`].
    pub fn by_id(&self, id: impl Into<DbValue>) -> Result<Self> {
        self.filter("id = :scope_id", Params::new().bind(":scope_id", id))
    }

    /// Set the ORDER BY clause; the last call wins.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside SELECT.
    pub fn order_by(&self, expr: &str, params: Params) -> Result<Self> {
        let allowed = self.narrowed(OpSet::SELECT)?;
        let mut next = self.derive();
        next.allowed = allowed;
        next.order_by = format!("ORDER BY {expr}");
        next.params.merge(&params);
        Ok(next)
    }

    /// Set the GROUP BY clause; the last call wins.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside SELECT.
    pub fn group_by(&self, expr: &str, params: Params) -> Result<Self> {
        let allowed = self.narrowed(OpSet::SELECT)?;
        let mut next = self.derive();
        next.allowed = allowed;
        next.group_by = format!("GROUP BY {expr}");
        next.params.merge(&params);
        Ok(next)
    }

    /// Set the LIMIT clause; the last call wins. Emitted as
    /// `LIMIT count OFFSET offset`, which every supported dialect accepts.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside SELECT.
    pub fn limit(&self, offset: u64, count: u64) -> Result<Self> {
        let allowed = self.narrowed(OpSet::SELECT)?;
        let mut next = self.derive();
        next.allowed = allowed;
        next.limit = if offset == 0 {
            format!("LIMIT {count}")
        } else {
            format!("LIMIT {count} OFFSET {offset}")
        };
        Ok(next)
    }

    /// Limit to the first `n` rows from offset zero.
    ///
    /// When `n == 1` the arity hint becomes [`Arity::ExpectOne`] so the
    /// selection collapses to a single record. For a user-provided `n`
    /// that must always yield a collection, use [`QueryBuilder::limit`]
    /// (or re-apply [`Arity::ExpectMany`]): `first` leaves the hint alone
    /// for any other `n`.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside SELECT.
    pub fn first(&self, n: u64) -> Result<Self> {
        let mut next = self.limit(0, n)?;
        if n == 1 {
            next.arity = Arity::ExpectOne;
        }
        Ok(next)
    }

    /// Build a parameterized SET clause from serialized field values.
    /// An empty map returns the builder unchanged. NULLs are emitted as
    /// the SQL literal so they behave identically across engines.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] outside UPDATE.
    pub fn set(&self, fields: &FieldMap) -> Result<Self> {
        if fields.is_empty() {
            return Ok(self.clone());
        }
        let allowed = self.narrowed(OpSet::UPDATE)?;
        let mut next = self.derive();
        next.allowed = allowed;

        let tag_prefix = format!("__set{}", self.height);
        let mut params = std::mem::take(&mut next.params);
        let mut assignments = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let name_tag = format!("{{{tag_prefix}_{name}}}");
            params = params.ident(&name_tag, name.clone());
            let value_tag = if value.is_null() {
                let tag = format!("{{{tag_prefix}_{name}_value}}");
                params = params.ident(&tag, "NULL");
                tag
            } else {
                let tag = format!(":{tag_prefix}_{name}_value");
                params = params.bind(&tag, value.clone());
                tag
            };
            assignments.push(format!("{name_tag} = {value_tag}"));
        }
        next.params = params;
        next.set_clause = format!("SET {}", assignments.join(", "));
        Ok(next)
    }

    fn base_params(&self, extra: Option<&Params>) -> Params {
        let mut params = self.params.clone();
        if let Some(extra) = extra {
            params.merge(extra);
        }
        params.ident("{__table}", S::TABLE)
    }

    fn driver(&self, env: &Env) -> Result<DriverRef> {
        Ok(env.db().driver_or_err(&self.profile)?)
    }

    fn assemble(parts: &[&str]) -> String {
        parts
            .iter()
            .copied()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the accumulated SELECT and materialize the rows.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] when SELECT is no longer legal;
    /// storage failures surface as [`RecordError::Db`] after being
    /// logged.
    pub async fn select(&self, env: &Env) -> Result<Selection<S>> {
        self.select_with(env, None, Params::new()).await
    }

    /// [`QueryBuilder::select`] with an explicit select list.
    ///
    /// # Errors
    /// Same as [`QueryBuilder::select`].
    pub async fn select_with(
        &self,
        env: &Env,
        expr: Option<&str>,
        params: Params,
    ) -> Result<Selection<S>> {
        self.ensure(OpSet::SELECT)?;
        let driver = self.driver(env)?;

        let select_list = expr.unwrap_or("{__table}.*");
        let sql = Self::assemble(&[
            "SELECT",
            select_list,
            "FROM {__table}",
            &self.join,
            &self.filter,
            &self.group_by,
            &self.order_by,
            &self.limit,
            self.lock,
        ]);
        let merged = self.base_params(Some(&params));

        let rows = driver.query(&sql, &merged).await.map_err(|e| {
            tracing::warn!(target: "rowkit_record::query", table = S::TABLE, error = %e, "SELECT failed");
            e
        })?;

        if self.arity == Arity::ExpectOne && rows.len() > 1 {
            tracing::warn!(
                target: "rowkit_record::query",
                table = S::TABLE,
                rows = rows.len(),
                "SELECT expected one result but got a collection"
            );
        }

        let mut records: Vec<Record<S>> =
            rows.iter().map(|row| Record::load(row, &self.profile)).collect();

        Ok(if self.arity == Arity::ExpectMany {
            Selection::Many(records)
        } else {
            match records.len() {
                0 => Selection::None,
                1 => Selection::One(records.remove(0)),
                _ => Selection::Many(records),
            }
        })
    }

    /// SELECT with a `FOR UPDATE` suffix; meaningful inside a
    /// transaction.
    ///
    /// # Errors
    /// Same as [`QueryBuilder::select`].
    pub async fn select_for_update(
        &self,
        env: &Env,
        expr: Option<&str>,
        params: Params,
    ) -> Result<Selection<S>> {
        let mut locked = self.clone();
        locked.lock = "FOR UPDATE";
        locked.select_with(env, expr, params).await
    }

    /// Insert exactly one row and return it.
    ///
    /// With a RETURNING-capable driver the inserted row comes straight
    /// back from the INSERT. Otherwise the row is re-selected by the
    /// supplied id, or by the engine's last-insert-id when the map did
    /// not contain one. That fallback is inherently racy under concurrent
    /// writers (the reselect can observe another writer's row); this is a
    /// documented limitation of the non-RETURNING path, kept as-is.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] when INSERT is no longer legal;
    /// storage failures surface as [`RecordError::Db`] after logging.
    pub async fn insert_one(&self, env: &Env, fields: &FieldMap) -> Result<Row> {
        self.ensure(OpSet::INSERT)?;
        let driver = self.driver(env)?;

        let mut params = self.base_params(None);
        let mut columns = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(fields.len());
        let mut supplied_id = None;
        for (name, value) in fields {
            let name_tag = format!("{{_{name}}}");
            params = params.ident(&name_tag, name.clone());
            columns.push(name_tag);
            if value.is_null() {
                let tag = format!("{{_{name}_value}}");
                params = params.ident(&tag, "NULL");
                values.push(tag);
            } else {
                let tag = format!(":_{name}_value");
                params = params.bind(&tag, value.clone());
                values.push(tag);
            }
            if name == "id" {
                supplied_id = Some(value.clone());
            }
        }
        let columns = columns.join(", ");
        let values = values.join(", ");

        if driver.has_returning() {
            let sql = format!("INSERT INTO {{__table}} ({columns}) VALUES ({values}) RETURNING *");
            let rows = driver.query(&sql, &params).await.map_err(|e| {
                tracing::warn!(target: "rowkit_record::query", table = S::TABLE, error = %e, "INSERT failed");
                e
            })?;
            return rows.into_iter().next().ok_or_else(|| {
                RecordError::Db(rowkit_db::DbError::Storage {
                    message: "INSERT .. RETURNING produced no row".to_owned(),
                })
            });
        }

        let sql = format!("INSERT INTO {{__table}} ({columns}) VALUES ({values})");
        let outcome = driver.execute(&sql, &params).await.map_err(|e| {
            tracing::warn!(target: "rowkit_record::query", table = S::TABLE, error = %e, "INSERT failed");
            e
        })?;

        let reselect_id = match supplied_id.filter(|v| !v.is_null()) {
            Some(id) => id,
            None => match outcome.last_insert_id {
                Some(id) => DbValue::Int(id),
                None => {
                    return Err(RecordError::Db(rowkit_db::DbError::Storage {
                        message: "cannot locate inserted row: no id supplied and the driver reported no last insert id".to_owned(),
                    }));
                }
            },
        };
        let rows = driver
            .query(
                "SELECT * FROM {__table} WHERE id = :__inserted_id",
                &self
                    .base_params(None)
                    .bind(":__inserted_id", reselect_id),
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| {
            RecordError::Db(rowkit_db::DbError::Storage {
                message: "inserted row vanished before reselect".to_owned(),
            })
        })
    }

    /// Run the accumulated UPDATE and return the updated row.
    ///
    /// Without RETURNING support the row is re-selected by `id_hint`
    /// (the row's id — the *new* id when the update changes it).
    ///
    /// # Errors
    /// [`RecordError::Restricted`] when UPDATE is no longer legal;
    /// [`RecordError::MissingId`] when the fallback reselect has no hint;
    /// storage failures surface as [`RecordError::Db`] after logging.
    pub async fn update(&self, env: &Env, id_hint: Option<DbValue>) -> Result<Row> {
        self.ensure(OpSet::UPDATE)?;
        let driver = self.driver(env)?;

        if self.set_clause.is_empty() {
            tracing::warn!(
                target: "rowkit_record::query",
                table = S::TABLE,
                "update() called without a previous set() call"
            );
        }

        let params = self.base_params(None);
        let sql = Self::assemble(&["UPDATE {__table}", &self.set_clause, &self.filter]);

        if driver.has_returning() {
            let sql = format!("{sql} RETURNING *");
            let rows = driver.query(&sql, &params).await.map_err(|e| {
                tracing::warn!(target: "rowkit_record::query", table = S::TABLE, error = %e, "UPDATE failed");
                e
            })?;
            return rows.into_iter().next().ok_or_else(|| {
                RecordError::Db(rowkit_db::DbError::Storage {
                    message: "UPDATE matched no rows".to_owned(),
                })
            });
        }

        driver.execute(&sql, &params).await.map_err(|e| {
            tracing::warn!(target: "rowkit_record::query", table = S::TABLE, error = %e, "UPDATE failed");
            e
        })?;

        let id = id_hint.ok_or(RecordError::MissingId(S::TABLE))?;
        let rows = driver
            .query(
                "SELECT * FROM {__table} WHERE id = :__updated_id",
                &self.base_params(None).bind(":__updated_id", id),
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| {
            RecordError::Db(rowkit_db::DbError::Storage {
                message: "UPDATE matched no rows".to_owned(),
            })
        })
    }

    /// Run the accumulated DELETE.
    ///
    /// Returns `false` (after logging) on storage failure rather than an
    /// error, so callers can inspect and react.
    ///
    /// # Errors
    /// [`RecordError::Restricted`] when DELETE is no longer legal.
    pub async fn delete(&self, env: &Env) -> Result<bool> {
        self.ensure(OpSet::DELETE)?;
        let driver = self.driver(env)?;

        let params = self.base_params(None);
        let sql = Self::assemble(&["DELETE FROM {__table}", &self.filter]);

        match driver.execute(&sql, &params).await {
            Ok(_) => Ok(true),
            Err(rowkit_db::DbError::Storage { message }) => {
                tracing::warn!(
                    target: "rowkit_record::query",
                    table = S::TABLE,
                    error = %message,
                    "DELETE failed"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn aggregate(&self, env: &Env, func: &str, expr: &str) -> Result<Json> {
        self.ensure(OpSet::SELECT)?;
        let driver = self.driver(env)?;

        let params = self.base_params(None).ident("{__agg_expr}", expr);
        let sql = Self::assemble(&[
            &format!("SELECT {func}({{__agg_expr}}) AS value FROM {{__table}}"),
            &self.join,
            &self.filter,
        ]);

        let rows = driver.query(&sql, &params).await.map_err(|e| {
            tracing::warn!(target: "rowkit_record::query", table = S::TABLE, error = %e, "aggregate failed");
            e
        })?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("value"))
            .unwrap_or(Json::Null))
    }

    /// `SELECT COUNT(*)` honoring previous filters.
    ///
    /// # Errors
    /// Same as the other aggregates.
    pub async fn count(&self, env: &Env) -> Result<i64> {
        let value = self.aggregate(env, "COUNT", "*").await?;
        match value {
            Json::Number(n) => Ok(n.as_i64().unwrap_or_default()),
            Json::String(s) => Ok(s.parse().unwrap_or_default()),
            _ => Ok(0),
        }
    }

    /// `SELECT AVG(expr)`; `None` when the table slice is empty.
    ///
    /// # Errors
    /// Same as the other aggregates.
    pub async fn average(&self, env: &Env, expr: &str) -> Result<Option<f64>> {
        let value = self.aggregate(env, "AVG", expr).await?;
        Ok(match value {
            Json::Number(n) => n.as_f64(),
            Json::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    /// `SELECT SUM(expr)` as the engine's raw scalar.
    ///
    /// # Errors
    /// Same as the other aggregates.
    pub async fn sum(&self, env: &Env, expr: &str) -> Result<Json> {
        self.aggregate(env, "SUM", expr).await
    }

    /// `SELECT MIN(expr)` as the engine's raw scalar.
    ///
    /// # Errors
    /// Same as the other aggregates.
    pub async fn min(&self, env: &Env, expr: &str) -> Result<Json> {
        self.aggregate(env, "MIN", expr).await
    }

    /// `SELECT MAX(expr)` as the engine's raw scalar.
    ///
    /// # Errors
    /// Same as the other aggregates.
    pub async fn max(&self, env: &Env, expr: &str) -> Result<Json> {
        self.aggregate(env, "MAX", expr).await
    }
}
