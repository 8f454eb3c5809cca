//! Context tiers.
//!
//! A [`Container`](crate::container::Container) holds two contexts:
//! - [`Tier::Current`]: short-lived, replaced by the host per operation
//! - [`Tier::Permanent`]: created with the container, never replaced
//!
//! Lookups always consult the current tier first.
use std::fmt;

/// Names one of the two context slots of a container.
///
/// # Examples
/// ```
/// use keneth_container::tier::Tier;
///
/// assert_eq!(Tier::LOOKUP_ORDER, [Tier::Current, Tier::Permanent]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The ambient context of the running operation, e.g. one request.
    ///
    /// Constructed services are cached here.
    Current,

    /// The process-wide context.
    ///
    /// Holds default bindings and explicitly elevated instances.
    Permanent,
}

impl Tier {
    /// Order in which bindings and instances are looked up.
    pub const LOOKUP_ORDER: [Tier; 2] = [Tier::Current, Tier::Permanent];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Current => write!(f, "current"),
            Tier::Permanent => write!(f, "permanent"),
        }
    }
}
