//! Field declarations: an explicit typed-descriptor table per model,
//! replacing reflection-based field dispatch.

use std::fmt;

use rowkit_db::DbValue;

use crate::record::Record;
use crate::validation::Validation;

/// Declared type of a field; selects the coercion function pair applied on
/// assignment and before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
    Uuid,
    /// Pass-through default.
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::DateTime => write!(f, "datetime"),
            FieldKind::Json => write!(f, "json"),
            FieldKind::Uuid => write!(f, "uuid"),
            FieldKind::Text => write!(f, "text"),
        }
    }
}

/// Declaration of one persisted field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Value assigned on construction when none is supplied.
    pub default: Option<DbValue>,
    /// Protected fields are skipped (with a warning) by bulk assignment
    /// from untrusted input; ids and audit fields belong here.
    pub protected: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            protected: false,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<DbValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

/// A model's static shape: table, fields, validation and authorization
/// identity.
///
/// Implementations are zero-sized tag types; all per-row state lives in
/// [`Record`].
pub trait Schema: Sized + 'static {
    /// The backing table.
    const TABLE: &'static str;

    /// The declared persisted fields.
    fn descriptors() -> Vec<FieldDescriptor>;

    /// The authorization resource kind; defaults to the table name.
    #[must_use]
    fn resource_kind() -> &'static str {
        Self::TABLE
    }

    /// Non-persisted attributes that bulk assignment may set. Anything
    /// else that is not a declared field is rejected.
    #[must_use]
    fn transient() -> &'static [&'static str] {
        &[]
    }

    /// Model validation hook; report problems through `errors`.
    fn validate(record: &Record<Self>, errors: &mut Validation) {
        let _ = (record, errors);
    }
}
