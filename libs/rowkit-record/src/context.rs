//! The dependency-injected context replacing the original's global state:
//! the driver registry plus the current-subject accessor used for audit
//! fields.

use std::sync::Arc;

use rowkit_db::{DbRegistry, DbValue};

/// Supplies "who is performing this operation" for audit-field
/// population (`created_by` / `updated_by`).
///
/// Implemented by the surrounding application; the accessor must be
/// request-scoped, never shared across concurrent requests.
pub trait SubjectSource: Send + Sync {
    fn current_subject(&self) -> Option<DbValue>;
}

/// No authenticated subject; audit actor fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl SubjectSource for Anonymous {
    fn current_subject(&self) -> Option<DbValue> {
        None
    }
}

/// A constant subject id, handy for tests and batch jobs.
#[derive(Debug, Clone)]
pub struct FixedSubject(pub DbValue);

impl SubjectSource for FixedSubject {
    fn current_subject(&self) -> Option<DbValue> {
        Some(self.0.clone())
    }
}

/// Everything a record or query operation needs from the outside world.
pub struct Env {
    db: DbRegistry,
    subject: Arc<dyn SubjectSource>,
}

impl Env {
    /// Build an environment with no authenticated subject.
    #[must_use]
    pub fn new(db: DbRegistry) -> Self {
        Self {
            db,
            subject: Arc::new(Anonymous),
        }
    }

    #[must_use]
    pub fn with_subject(db: DbRegistry, subject: Arc<dyn SubjectSource>) -> Self {
        Self { db, subject }
    }

    #[must_use]
    pub fn db(&self) -> &DbRegistry {
        &self.db
    }

    #[must_use]
    pub fn subject(&self) -> &dyn SubjectSource {
        self.subject.as_ref()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env").field("db", &self.db).finish_non_exhaustive()
    }
}
