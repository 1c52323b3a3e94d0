//! One storage row as one typed object.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use chrono::Utc;
use serde_json::Value as Json;
use uuid::Uuid;

use rowkit_authz::Resource;
use rowkit_db::{DEFAULT_PROFILE, DbValue, Driver, Params, Row};

use crate::coerce;
use crate::context::Env;
use crate::query::{Arity, FieldMap, QueryBuilder, Selection};
use crate::schema::{FieldKind, Schema};
use crate::validation::Validation;
use crate::{RecordError, Result};

/// A mutable entity backed by one row of `S::TABLE`.
///
/// Lifecycle: records start NEW (no backing row); a successful `save`
/// makes them PERSISTED; a successful `destroy` resets them to NEW. A
/// failed save or destroy leaves the state untouched.
pub struct Record<S: Schema> {
    values: BTreeMap<&'static str, DbValue>,
    transient: BTreeMap<String, DbValue>,
    dirty: BTreeSet<&'static str>,
    validation: Validation,
    persisted: bool,
    profile: String,
    _entity: PhantomData<fn() -> S>,
}

impl<S: Schema> Clone for Record<S> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            transient: self.transient.clone(),
            dirty: self.dirty.clone(),
            validation: self.validation.clone(),
            persisted: self.persisted,
            profile: self.profile.clone(),
            _entity: PhantomData,
        }
    }
}

impl<S: Schema> Default for Record<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> Record<S> {
    fn empty(profile: &str) -> Self {
        Self {
            values: BTreeMap::new(),
            transient: BTreeMap::new(),
            dirty: BTreeSet::new(),
            validation: Validation::new(),
            persisted: false,
            profile: profile.to_owned(),
            _entity: PhantomData,
        }
    }

    /// A fresh NEW record with declared defaults applied (and dirty, so
    /// they are included in the first INSERT).
    #[must_use]
    pub fn new() -> Self {
        let mut record = Self::empty(DEFAULT_PROFILE);
        record.apply_defaults();
        record
    }

    /// A NEW record initialized from trusted or semi-trusted input.
    /// Unknown keys are rejected; use [`Record::update_properties`] for
    /// untrusted input so protected fields are filtered instead.
    ///
    /// # Errors
    /// [`RecordError::UnknownProperty`] for a key that is neither a
    /// declared field nor a declared transient attribute;
    /// [`RecordError::Coerce`] when a value refuses coercion.
    pub fn with_fields(props: Json) -> Result<Self> {
        let mut record = Self::empty(DEFAULT_PROFILE);
        if let Json::Object(map) = props {
            for (name, value) in map {
                record.set_field(&name, value)?;
            }
        }
        record.apply_defaults();
        Ok(record)
    }

    /// The load factory: materialize a PERSISTED, clean record from a
    /// storage row. Values are parsed by declared kind; anything
    /// unparseable is logged and stored as NULL (storage is trusted, so
    /// this signals schema drift rather than caller error). Columns
    /// without a declaration land in the transient map.
    #[must_use]
    pub fn load(row: &Row, profile: &str) -> Self {
        let mut record = Self::empty(profile);
        record.absorb_row(row);
        record.persisted = true;
        record
    }

    fn apply_defaults(&mut self) {
        for descriptor in S::descriptors() {
            let name = descriptor.name;
            if let Some(default) = descriptor.default {
                if !self.values.contains_key(name) {
                    // defaults pass through the same coercion as any
                    // assignment
                    if let Err(e) = self.set_field(name, default) {
                        tracing::warn!(
                            target: "rowkit_record",
                            table = S::TABLE,
                            field = name,
                            error = %e,
                            "default value failed coercion"
                        );
                    }
                }
            }
        }
    }

    fn absorb_row(&mut self, row: &Row) {
        let descriptors = S::descriptors();
        for (column, json) in row {
            if let Some(descriptor) = descriptors.iter().find(|d| d.name == column.as_str()) {
                let incoming = DbValue::from(json.clone());
                match coerce::parse(descriptor.kind, incoming) {
                    Ok(value) => {
                        self.values.insert(descriptor.name, value);
                    }
                    Err(message) => {
                        tracing::warn!(
                            target: "rowkit_record",
                            table = S::TABLE,
                            field = descriptor.name,
                            error = %message,
                            "stored value failed coercion; keeping NULL"
                        );
                        self.values.insert(descriptor.name, DbValue::Null);
                    }
                }
            } else {
                self.transient
                    .insert(column.clone(), DbValue::from(json.clone()));
            }
        }
        self.dirty.clear();
    }

    // ---- field access ----

    /// Read a declared field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DbValue> {
        self.values.get(name)
    }

    /// Read a transient (non-persisted) attribute.
    #[must_use]
    pub fn get_transient(&self, name: &str) -> Option<&DbValue> {
        self.transient.get(name)
    }

    /// The primary key value, when set and non-null.
    #[must_use]
    pub fn id(&self) -> Option<&DbValue> {
        self.values.get("id").filter(|v| !v.is_null())
    }

    /// Assign one field through the coercion pipeline.
    ///
    /// Declared fields are coerced by kind and marked dirty only when
    /// the coerced value differs from the stored one. Names declared
    /// transient are plain attribute assignments with no dirty tracking.
    ///
    /// # Errors
    /// [`RecordError::UnknownProperty`] for undeclared names;
    /// [`RecordError::Coerce`] when the value refuses coercion.
    pub fn set_field(&mut self, name: &str, value: impl Into<DbValue>) -> Result<()> {
        let descriptors = S::descriptors();
        if let Some(descriptor) = descriptors.iter().find(|d| d.name == name) {
            let coerced = coerce::parse(descriptor.kind, value.into()).map_err(|message| {
                RecordError::Coerce {
                    field: name.to_owned(),
                    kind: descriptor.kind,
                    message,
                }
            })?;
            if self.values.get(descriptor.name) == Some(&coerced) {
                return Ok(());
            }
            self.values.insert(descriptor.name, coerced);
            self.dirty.insert(descriptor.name);
            Ok(())
        } else if S::transient().contains(&name) {
            self.transient.insert(name.to_owned(), value.into());
            Ok(())
        } else {
            Err(RecordError::UnknownProperty(name.to_owned()))
        }
    }

    /// Bulk-assign from semi-trusted input (e.g. a form submission).
    ///
    /// Protected fields are skipped with a warning; unknown keys abort
    /// the call.
    ///
    /// # Errors
    /// [`RecordError::UnknownProperty`] for a key that is neither a
    /// declared field nor a declared transient attribute;
    /// [`RecordError::Coerce`] when a value refuses coercion.
    pub fn update_properties(&mut self, props: Json) -> Result<()> {
        let Json::Object(map) = props else {
            return Ok(());
        };
        let descriptors = S::descriptors();
        for (name, value) in map {
            if let Some(descriptor) = descriptors.iter().find(|d| d.name == name) {
                if descriptor.protected {
                    tracing::warn!(
                        target: "rowkit_record",
                        table = S::TABLE,
                        field = %name,
                        "filtering out protected field in bulk update"
                    );
                    continue;
                }
            }
            self.set_field(&name, value)?;
        }
        Ok(())
    }

    // ---- lifecycle ----

    /// Whether no backing row exists yet.
    #[must_use]
    pub fn is_new(&self) -> bool {
        !self.persisted
    }

    /// Whether at least one field differs from the stored row.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_new() || !self.dirty.is_empty()
    }

    /// The names changed since the last successful save.
    #[must_use]
    pub fn dirty_fields(&self) -> Vec<&'static str> {
        self.dirty.iter().copied().collect()
    }

    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    // ---- validation ----

    /// Errors from the last validity check.
    #[must_use]
    pub fn errors(&self) -> &Validation {
        &self.validation
    }

    /// Messages for one field from the last validity check.
    #[must_use]
    pub fn errors_on(&self, field: &str) -> &[String] {
        self.validation.on(field)
    }

    /// Reset the error map, run the schema's validation hook and report
    /// whether the record can be saved in its current state.
    pub fn is_valid(&mut self) -> bool {
        let mut validation = Validation::new();
        S::validate(self, &mut validation);
        self.validation = validation;
        self.validation.is_empty()
    }

    // ---- persistence ----

    /// Validate and save; see [`Record::save_with`].
    ///
    /// # Errors
    /// Same as [`Record::save_with`].
    pub async fn save(&mut self, env: &Env) -> Result<bool> {
        self.save_with(env, true).await
    }

    /// INSERT (when NEW) or UPDATE (when PERSISTED) the dirty fields.
    ///
    /// Lifecycle-managed fields are assigned immediately before
    /// persistence: a uuid id on first save (when the id field is
    /// uuid-kind and unset), `created_at`/`created_by` on first save,
    /// `updated_at`/`updated_by` on every save; the actor comes from the
    /// env's subject source. When persistence fails, every stamped field
    /// is rolled back to its exact pre-save value and dirty state.
    ///
    /// Returns `Ok(false)` on validation failure or storage failure (the
    /// latter after logging); configuration-class errors propagate.
    ///
    /// # Errors
    /// [`RecordError::MissingId`] when updating a persisted record that
    /// lost its id; any configuration-class error from the builder.
    pub async fn save_with(&mut self, env: &Env, validate: bool) -> Result<bool> {
        let was_new = self.is_new();
        if validate && !self.is_valid() {
            return Ok(false);
        }

        let descriptors = S::descriptors();
        let has_field = |name: &str| descriptors.iter().any(|d| d.name == name);
        let id_is_uuid = descriptors
            .iter()
            .any(|d| d.name == "id" && d.kind == FieldKind::Uuid);

        // Capture (field, previous value, previous dirty bit) before each
        // stamp so a failed save can restore the exact pre-save state.
        let mut stamped: Vec<(&'static str, Option<DbValue>, bool)> = Vec::new();
        let mut stamp = |record: &mut Self, name: &'static str, value: DbValue| -> Result<()> {
            stamped.push((
                name,
                record.values.get(name).cloned(),
                record.dirty.contains(name),
            ));
            record.set_field(name, value)
        };

        let now = Utc::now();
        let actor = env.subject().current_subject();

        if was_new && id_is_uuid && self.id().is_none() {
            stamp(self, "id", DbValue::Uuid(Uuid::new_v4()))?;
        }
        if was_new && has_field("created_at") {
            stamp(self, "created_at", DbValue::DateTime(now))?;
        }
        if was_new && has_field("created_by") {
            if let Some(actor) = actor.clone() {
                stamp(self, "created_by", actor)?;
            }
        }
        if has_field("updated_at") {
            stamp(self, "updated_at", DbValue::DateTime(now))?;
        }
        if has_field("updated_by") {
            if let Some(actor) = actor {
                stamp(self, "updated_by", actor)?;
            }
        }

        let mut fields = FieldMap::new();
        for name in &self.dirty {
            if let Some(value) = self.values.get(name) {
                fields.insert((*name).to_owned(), coerce::serialize(value.clone()));
            }
        }

        let outcome: Result<Row> = if !was_new && fields.is_empty() {
            // an UPDATE with no changes: don't touch the database, the
            // row already matches
            Ok(Row::new())
        } else {
            let query = QueryBuilder::<S>::new().query_on(env, &self.profile)?;
            if was_new {
                query.insert_one(env, &fields).await
            } else {
                let id = self.id().cloned().ok_or(RecordError::MissingId(S::TABLE))?;
                query
                    .by_id(id.clone())?
                    .set(&fields)?
                    .update(env, Some(id))
                    .await
            }
        };

        match outcome {
            Ok(row) => {
                self.persisted = true;
                // refresh from the returned row: covers server-generated
                // columns
                self.absorb_row(&row);
                Ok(true)
            }
            Err(e) if e.is_storage_failure() => {
                tracing::error!(
                    target: "rowkit_record",
                    table = S::TABLE,
                    error = %e,
                    "database failed to save record"
                );
                for (name, previous, was_dirty) in stamped.into_iter().rev() {
                    match previous {
                        Some(value) => {
                            self.values.insert(name, value);
                        }
                        None => {
                            self.values.remove(name);
                        }
                    }
                    if was_dirty {
                        self.dirty.insert(name);
                    } else {
                        self.dirty.remove(name);
                    }
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// DELETE the backing row.
    ///
    /// A no-op on a NEW record, so repeated destroys are safe. A storage
    /// failure is fatal to the caller — partial deletion state is
    /// dangerous — and surfaces as [`RecordError::DestroyFailed`]. On
    /// success the record resets to NEW.
    ///
    /// # Errors
    /// [`RecordError::MissingId`] when the persisted record has no id;
    /// [`RecordError::DestroyFailed`] when the DELETE fails.
    pub async fn destroy(&mut self, env: &Env) -> Result<()> {
        if self.is_new() {
            return Ok(());
        }
        let id = self.id().cloned().ok_or(RecordError::MissingId(S::TABLE))?;

        let deleted = QueryBuilder::<S>::new()
            .query_on(env, &self.profile)?
            .by_id(id.clone())?
            .delete(env)
            .await?;
        if !deleted {
            return Err(RecordError::DestroyFailed {
                kind: S::resource_kind(),
                id: id.to_string(),
            });
        }
        self.persisted = false;
        Ok(())
    }

    // ---- static factories ----

    /// A SELECT-only builder expecting a collection.
    #[must_use]
    pub fn all() -> QueryBuilder<S> {
        QueryBuilder::with(crate::query::OpSet::SELECT, Arity::ExpectMany)
    }

    /// A builder limited to the first `n` rows. With `n == 1` the
    /// selection collapses to a single record; any other `n` keeps the
    /// collection shape inherited from [`Record::all`].
    ///
    /// # Errors
    /// Never fails in practice; kept fallible for chain uniformity.
    pub fn first(n: u64) -> Result<QueryBuilder<S>> {
        Self::all().first(n)
    }

    /// Fetch one record by id from the default profile.
    ///
    /// # Errors
    /// Storage failures and configuration-class errors from the chain.
    pub async fn find(env: &Env, id: impl Into<DbValue>) -> Result<Option<Record<S>>> {
        Ok(Self::first(1)?.by_id(id)?.select(env).await?.into_option())
    }

    /// Run a raw SQL template through the substitution protocol and
    /// materialize records of this type. `{__table}` is pre-bound for
    /// convenience.
    ///
    /// # Errors
    /// Storage failures and configuration-class errors from the chain.
    pub async fn find_by_sql(
        env: &Env,
        sql: &str,
        params: Params,
        arity: Arity,
    ) -> Result<Selection<S>> {
        let driver = env.db().driver_or_err(DEFAULT_PROFILE)?;
        let merged = params.ident("{__table}", S::TABLE);
        let rows = driver.query(sql, &merged).await.map_err(|e| {
            tracing::warn!(target: "rowkit_record", table = S::TABLE, error = %e, "raw SELECT failed");
            e
        })?;

        let mut records: Vec<Record<S>> = rows
            .iter()
            .map(|row| Record::load(row, DEFAULT_PROFILE))
            .collect();
        Ok(if arity == Arity::ExpectMany {
            Selection::Many(records)
        } else {
            match records.len() {
                0 => Selection::None,
                1 => Selection::One(records.remove(0)),
                _ => Selection::Many(records),
            }
        })
    }

    /// [`Record::find_by_sql`] always returning a collection.
    ///
    /// # Errors
    /// Same as [`Record::find_by_sql`].
    pub async fn find_all_by_sql(env: &Env, sql: &str, params: Params) -> Result<Vec<Record<S>>> {
        Ok(Self::find_by_sql(env, sql, params, Arity::ExpectMany)
            .await?
            .into_vec())
    }
}

impl<S: Schema> Resource for Record<S> {
    fn resource_kind(&self) -> &str {
        S::resource_kind()
    }

    fn attribute(&self, name: &str) -> Option<DbValue> {
        self.values.get(name).cloned()
    }
}

impl<S: Schema> std::fmt::Debug for Record<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("table", &S::TABLE)
            .field("persisted", &self.persisted)
            .field("values", &self.values)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
