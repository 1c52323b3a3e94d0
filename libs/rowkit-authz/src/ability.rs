//! Rule registration and evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use rowkit_db::DbValue;

use crate::resource::{Resource, Target};
use crate::{AuthzError, Result};

type Predicate = Arc<dyn Fn(&dyn Resource) -> bool + Send + Sync>;

/// One condition attached to an allow rule.
///
/// All conditions of a rule must hold for the rule to authorize. `Static`
/// conditions are folded away at registration time: a `false` makes the
/// whole rule unregistrable (it could never apply), a `true` is discarded
/// as trivial.
#[derive(Clone)]
pub enum Condition {
    /// A boolean known at registration time.
    Static(bool),
    /// All listed attributes of the candidate instance must be equal to
    /// the given values. Only satisfiable by a concrete instance.
    Attrs(Vec<(String, DbValue)>),
    /// Arbitrary predicate over the candidate instance. Only satisfiable
    /// by a concrete instance.
    Predicate(Predicate),
}

impl Condition {
    #[must_use]
    pub fn when(value: bool) -> Self {
        Condition::Static(value)
    }

    #[must_use]
    pub fn attr(name: impl Into<String>, value: impl Into<DbValue>) -> Self {
        Condition::Attrs(vec![(name.into(), value.into())])
    }

    #[must_use]
    pub fn attrs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<DbValue>,
    {
        Condition::Attrs(
            pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }

    pub fn check(f: impl Fn(&dyn Resource) -> bool + Send + Sync + 'static) -> Self {
        Condition::Predicate(Arc::new(f))
    }

    fn eval(&self, target: Target<'_>) -> bool {
        match (self, target.instance()) {
            (Condition::Static(value), _) => *value,
            (Condition::Attrs(pairs), Some(instance)) => pairs
                .iter()
                .all(|(name, expected)| instance.attribute(name).as_ref() == Some(expected)),
            (Condition::Predicate(predicate), Some(instance)) => predicate(instance),
            // instance-only conditions against a bare kind or no resource:
            // vacuous denial, not vacuous truth
            (Condition::Attrs(_) | Condition::Predicate(_), None) => false,
        }
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Static(value) => write!(f, "Static({value})"),
            Condition::Attrs(pairs) => f.debug_tuple("Attrs").field(pairs).finish(),
            Condition::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

#[derive(Clone, Debug)]
enum Rule {
    Always(bool),
    All(Vec<Condition>),
}

/// The per-subject rule set.
///
/// Built once for a subject and cached for that subject's lifetime. Not
/// meant to be shared across subjects: registered conditions usually
/// close over the subject's own attributes.
#[derive(Default)]
pub struct Ability {
    rules: HashMap<(String, String), Rule>,
}

impl Ability {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an allow rule for every listed action against one
    /// resource kind (the empty string means "no resource").
    ///
    /// Boolean conditions are evaluated now: any `false` makes the rule
    /// moot and nothing is registered; `true`s are dropped as trivial.
    /// The remaining conditions are AND-combined at authorization time.
    ///
    /// # Errors
    /// Returns [`AuthzError::DuplicateRule`] when a rule already exists
    /// for an `(action, resource)` pair.
    pub fn allow(
        &mut self,
        actions: &[&str],
        resource: &str,
        conditions: Vec<Condition>,
    ) -> Result<()> {
        let mut residual = Vec::new();
        for condition in conditions {
            match condition {
                // this rule can never apply; registering it would only
                // shadow the (action, resource) slot
                Condition::Static(false) => return Ok(()),
                Condition::Static(true) => {}
                other => residual.push(other),
            }
        }

        let rule = if residual.is_empty() {
            Rule::Always(true)
        } else {
            Rule::All(residual)
        };

        for action in actions {
            let key = ((*action).to_owned(), resource.to_owned());
            if self.rules.contains_key(&key) {
                return Err(AuthzError::DuplicateRule {
                    action: (*action).to_owned(),
                    resource: resource.to_owned(),
                });
            }
            self.rules.insert(key, rule.clone());
        }
        Ok(())
    }

    /// Decide whether the subject may perform `action` on `target`.
    ///
    /// No matching rule means denial.
    #[must_use]
    pub fn authorize(&self, action: &str, target: Target<'_>) -> bool {
        let key = (action.to_owned(), target.resource_kind().to_owned());
        match self.rules.get(&key) {
            None => false,
            Some(Rule::Always(value)) => *value,
            Some(Rule::All(conditions)) => {
                conditions.iter().all(|condition| condition.eval(target))
            }
        }
    }

    /// Number of registered rules; handy for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ability")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}
