//! Declarative authorization for the rowkit core.
//!
//! An [`Ability`] is built once per subject (typically the request's
//! authenticated user), fed a set of `allow` rules, and then asked yes/no
//! questions through [`Ability::authorize`]. Rules are keyed by an
//! `(action, resource kind)` pair and may carry conditions evaluated
//! against a concrete resource instance.
//!
//! ```rust
//! use rowkit_authz::{Ability, Condition, Target};
//!
//! # fn demo() -> Result<(), rowkit_authz::AuthzError> {
//! let mut ability = Ability::new();
//! ability.allow(&["login"], "", vec![])?;
//! ability.allow(&["read"], "Doc", vec![Condition::attr("owner_id", 7)])?;
//!
//! assert!(ability.authorize("login", Target::None));
//! assert!(!ability.authorize("destroy", Target::Kind("Doc")));
//! # Ok(())
//! # }
//! ```
//!
//! Rules routinely close over the subject they were built for, so an
//! `Ability` must never be shared across subjects; build a fresh one per
//! subject instead.

pub mod ability;
pub mod resource;

pub use ability::{Ability, Condition};
pub use resource::{Resource, Target};

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Construction-time errors of the rule engine.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("duplicate authorization rule for (action={action}, resource={resource})")]
    DuplicateRule { action: String, resource: String },
}
