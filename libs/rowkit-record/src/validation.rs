//! Validation error collection: per-field message lists plus a sentinel
//! key for whole-object errors. Rebuilt from scratch on every validity
//! check.

use std::collections::BTreeMap;

/// Where a validation message is anchored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKey {
    /// A whole-object error not tied to any single field.
    Base,
    Field(String),
}

/// Ordered validation messages keyed by field (or the base sentinel).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    errors: BTreeMap<ErrorKey, Vec<String>>,
}

impl Validation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a message to a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(ErrorKey::Field(field.into()))
            .or_default()
            .push(message.into());
    }

    /// Attach a whole-object message.
    pub fn add_base(&mut self, message: impl Into<String>) {
        self.errors
            .entry(ErrorKey::Base)
            .or_default()
            .push(message.into());
    }

    /// Messages for one field.
    #[must_use]
    pub fn on(&self, field: &str) -> &[String] {
        self.errors
            .get(&ErrorKey::Field(field.to_owned()))
            .map_or(&[], Vec::as_slice)
    }

    /// Whole-object messages.
    #[must_use]
    pub fn base(&self) -> &[String] {
        self.errors.get(&ErrorKey::Base).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total message count across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ErrorKey, &[String])> {
        self.errors.iter().map(|(k, v)| (k, v.as_slice()))
    }
}
