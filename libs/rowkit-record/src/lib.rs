//! Query builder and record layer of the rowkit core.
//!
//! Two tightly coupled pieces live here:
//!
//! - [`QueryBuilder`]: an immutable, chainable statement composer. Every
//!   chain method returns a derived copy, so a base query can be reused
//!   across branches; the set of legal operations narrows monotonically as
//!   clauses are added, and an illegal call fails before any I/O.
//! - [`Record`]: one storage row as one typed object, with declared field
//!   descriptors, a coercion pipeline, dirty tracking, validation and
//!   NEW/PERSISTED lifecycle semantics.
//!
//! Both operate through the driver registry inside an [`Env`] — there are
//! no process-wide singletons.
//!
//! ```rust,no_run
//! use rowkit_record::{Env, FieldDescriptor, FieldKind, Params, Record, Schema};
//!
//! struct Article;
//!
//! impl Schema for Article {
//!     const TABLE: &'static str = "articles";
//!
//!     fn descriptors() -> Vec<FieldDescriptor> {
//!         vec![
//!             FieldDescriptor::new("id", FieldKind::Uuid).protected(),
//!             FieldDescriptor::new("title", FieldKind::Text),
//!         ]
//!     }
//! }
//!
//! # async fn demo(env: &Env) -> rowkit_record::Result<()> {
//! let drafts = Record::<Article>::all()
//!     .filter("title LIKE :p", Params::new().bind(":p", "draft%"))?
//!     .select(env)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod coerce;
pub mod context;
pub mod links;
pub mod query;
pub mod record;
pub mod schema;
pub mod validation;

pub use context::{Anonymous, Env, FixedSubject, SubjectSource};
pub use links::{LinkTable, TxScope, link_join, replace_links};
pub use query::{Arity, FieldMap, OpSet, QueryBuilder, Selection};
pub use record::Record;
pub use schema::{FieldDescriptor, FieldKind, Schema};
pub use validation::{ErrorKey, Validation};

// The shared value and parameter types come from the driver layer.
pub use rowkit_db::{DbValue, Params};

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Typed error for the builder and record layer.
///
/// `Restricted`, `UnknownProperty` and `MissingId` are configuration-class
/// errors raised before any I/O. Storage failures arrive wrapped in `Db`
/// and are recoverable; `save` converts them into a `false` return,
/// `destroy` escalates them to `DestroyFailed`.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("operation not permitted for this query: requested {requested}, allowed {allowed}")]
    Restricted {
        requested: query::OpSet,
        allowed: query::OpSet,
    },

    #[error("{0}: unknown or inaccessible property")]
    UnknownProperty(String),

    #[error("{field}: cannot coerce value into {kind}: {message}")]
    Coerce {
        field: String,
        kind: schema::FieldKind,
        message: String,
    },

    #[error("{0}: record has no id value")]
    MissingId(&'static str),

    #[error("could not destroy {kind}(id={id})")]
    DestroyFailed { kind: &'static str, id: String },

    #[error("operation requires a persisted record")]
    UnsavedRecord,

    #[error(transparent)]
    Db(#[from] rowkit_db::DbError),
}

impl RecordError {
    /// Whether this is a recoverable storage failure rather than a
    /// configuration-class error.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, RecordError::Db(rowkit_db::DbError::Storage { .. }))
    }
}
