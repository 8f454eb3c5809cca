//! Service registry, the default signature reader.
//!
//! The container never inspects types itself. It asks a
//! [`SignatureReader`] whether a type is a service and, if so, how to build
//! it. [`ServiceRegistry`] answers from explicit registrations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AlreadyRegisteredError, KenethError};
use crate::key::ServiceKey;
use crate::service::ServiceDescriptor;

/// Source of service descriptors for the resolution engine.
///
/// A type is a service exactly when [`read`](SignatureReader::read)
/// returns a descriptor for it.
pub trait SignatureReader: Send + Sync {
    /// Returns how to build `key`, or `None` if it is not a service.
    fn read(&self, key: &ServiceKey) -> Option<Arc<ServiceDescriptor>>;

    fn is_service(&self, key: &ServiceKey) -> bool {
        self.read(key).is_some()
    }

    /// All known services, for validation and suggestions.
    fn services(&self) -> Vec<ServiceKey> {
        Vec::new()
    }
}

/// Stores service descriptors by key.
///
/// Populated by the builder, then shared read-only by every container
/// created from it.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    descriptors: HashMap<ServiceKey, Arc<ServiceDescriptor>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    ///
    /// # Errors
    /// Returns [`KenethError::AlreadyRegistered`] if the key is
    /// already registered and `allow_override` is false.
    pub fn register(
        &mut self,
        descriptor: ServiceDescriptor,
        allow_override: bool,
    ) -> Result<(), KenethError> {
        let key = *descriptor.key();

        if !allow_override && self.descriptors.contains_key(&key) {
            return Err(KenethError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }

        debug!(
            key = %key,
            dependencies = descriptor.signature().len(),
            "Registered service"
        );
        self.descriptors.insert(key, Arc::new(descriptor));
        Ok(())
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl SignatureReader for ServiceRegistry {
    fn read(&self, key: &ServiceKey) -> Option<Arc<ServiceDescriptor>> {
        self.descriptors.get(key).cloned()
    }

    fn services(&self) -> Vec<ServiceKey> {
        self.descriptors.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    struct Repo;

    fn repo_descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new::<Repo, _>(Signature::new(), |_| Ok(Repo))
    }

    #[test]
    fn register_and_read() {
        let mut reg = ServiceRegistry::new();
        reg.register(repo_descriptor(), false).unwrap();

        let key = ServiceKey::of::<Repo>();
        assert!(reg.is_service(&key));
        assert!(reg.read(&key).is_some());
        assert_eq!(reg.services(), vec![key]);
    }

    #[test]
    fn unknown_type_is_not_a_service() {
        let reg = ServiceRegistry::new();
        assert!(!reg.is_service(&ServiceKey::of::<String>()));
    }

    #[test]
    fn duplicate_fails() {
        let mut reg = ServiceRegistry::new();
        reg.register(repo_descriptor(), false).unwrap();
        match reg.register(repo_descriptor(), false) {
            Err(KenethError::AlreadyRegistered(e)) => {
                assert_eq!(e.key, ServiceKey::of::<Repo>());
            }
            other => panic!("Expected AlreadyRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_with_override_ok() {
        let mut reg = ServiceRegistry::new();
        reg.register(repo_descriptor(), false).unwrap();
        assert!(reg.register(repo_descriptor(), true).is_ok());
        assert_eq!(reg.len(), 1);
    }
}
