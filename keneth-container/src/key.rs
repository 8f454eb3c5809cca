//! Service identification keys.
//!
//! [`ServiceKey`] identifies a service type inside the container. Instance
//! caches, target stacks and the registry are all keyed by it.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use keneth_support::rendering::shorten_type_name;

/// Uniquely identifies a service type.
///
/// Two keys are equal when their [`TypeId`]s are equal; the type name is
/// carried only for diagnostics.
///
/// # Examples
/// ```
/// use keneth_container::key::ServiceKey;
///
/// struct Repo;
///
/// let key = ServiceKey::of::<Repo>();
/// assert!(key.type_name().ends_with("Repo"));
/// assert_eq!(key, ServiceKey::of::<Repo>());
/// assert_ne!(key, ServiceKey::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceKey {
    /// Creates the key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the service type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without module paths, for error output.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.type_name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Repo;
    struct Handler;

    #[test]
    fn key_carries_type_name() {
        let key = ServiceKey::of::<Repo>();
        assert!(key.type_name().contains("Repo"));
        assert_eq!(key.short_name(), "Repo");
    }

    #[test]
    fn equality_follows_type_id() {
        assert_eq!(ServiceKey::of::<Repo>(), ServiceKey::of::<Repo>());
        assert_ne!(ServiceKey::of::<Repo>(), ServiceKey::of::<Handler>());
    }

    #[test]
    fn key_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ServiceKey::of::<Repo>(), "repo");
        map.insert(ServiceKey::of::<Handler>(), "handler");
        assert_eq!(map.get(&ServiceKey::of::<Repo>()), Some(&"repo"));
        assert_eq!(map.get(&ServiceKey::of::<bool>()), None);
    }

    #[test]
    fn unsized_type_key() {
        trait Port {}
        let key = ServiceKey::of::<dyn Port>();
        assert!(key.type_name().contains("Port"));
    }
}
