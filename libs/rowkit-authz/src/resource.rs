//! The resource side of an authorization check.

use rowkit_db::DbValue;

/// Something rules can be evaluated against: a kind tag plus readable
/// attributes.
pub trait Resource {
    /// The category key this resource belongs to (usually the model's
    /// type name).
    fn resource_kind(&self) -> &str;

    /// Read one attribute for condition evaluation.
    fn attribute(&self, name: &str) -> Option<DbValue>;
}

/// The target of an [`crate::Ability::authorize`] call.
///
/// `Kind` supports checking against a type name without an instance
/// ("can create a Doc"); `None` is for actions that have no resource at
/// all ("login"). Conditions that need a concrete instance evaluate to
/// false against the other two variants.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    None,
    Kind(&'a str),
    Instance(&'a dyn Resource),
}

impl<'a> Target<'a> {
    /// The resource-kind key used for rule lookup; the empty string for
    /// no-resource actions.
    #[must_use]
    pub fn resource_kind(&self) -> &'a str {
        match *self {
            Target::None => "",
            Target::Kind(kind) => kind,
            Target::Instance(instance) => instance.resource_kind(),
        }
    }

    #[must_use]
    pub fn instance(&self) -> Option<&'a dyn Resource> {
        match *self {
            Target::Instance(instance) => Some(instance),
            Target::None | Target::Kind(_) => None,
        }
    }
}

impl std::fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::None => write!(f, "Target::None"),
            Target::Kind(kind) => write!(f, "Target::Kind({kind})"),
            Target::Instance(instance) => {
                write!(f, "Target::Instance({})", instance.resource_kind())
            }
        }
    }
}
