//! Provider trait, a module of related registrations.
//!
//! Providers group services and default bindings by concern:
//!
//! ```rust,ignore
//! struct StorageProvider;
//!
//! impl Provider for StorageProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) {
//!         registry.register_binding("db_url", Arc::new(String::from("sqlite://mem")));
//!         registry.register_service(ServiceDescriptor::of::<Repo>());
//!     }
//! }
//!
//! let container = Container::builder()
//!     .add_provider(&StorageProvider)
//!     .add_provider(&HttpProvider)
//!     .build()?;
//! ```

use crate::context::AnyArc;
use crate::service::ServiceDescriptor;

/// A module that registers related services into a container builder.
pub trait Provider: Send + Sync {
    /// Register services and bindings.
    ///
    /// Called once, while the container is being built.
    fn register(&self, registry: &mut dyn ProviderRegistry);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The part of the builder API exposed to [`Provider`]s.
///
/// Keeping it a trait lets providers be tested without a real builder.
pub trait ProviderRegistry {
    /// Register a service descriptor.
    fn register_service(&mut self, descriptor: ServiceDescriptor);

    /// Add a binding to the permanent context.
    fn register_binding(&mut self, key: String, value: AnyArc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use std::sync::Arc;

    #[derive(Default)]
    struct MockRegistry {
        services: usize,
        bindings: Vec<String>,
    }

    impl ProviderRegistry for MockRegistry {
        fn register_service(&mut self, _descriptor: ServiceDescriptor) {
            self.services += 1;
        }

        fn register_binding(&mut self, key: String, _value: AnyArc) {
            self.bindings.push(key);
        }
    }

    struct Clock;

    struct TestProvider;

    impl Provider for TestProvider {
        fn register(&self, registry: &mut dyn ProviderRegistry) {
            registry.register_binding("tz".into(), Arc::new("UTC"));
            registry.register_service(ServiceDescriptor::new::<Clock, _>(
                Signature::new().binding("tz"),
                |_| Ok(Clock),
            ));
        }
    }

    #[test]
    fn provider_registers_services_and_bindings() {
        let mut registry = MockRegistry::default();
        TestProvider.register(&mut registry);

        assert_eq!(registry.services, 1);
        assert_eq!(registry.bindings, vec!["tz".to_string()]);
    }

    #[test]
    fn provider_has_name() {
        assert!(TestProvider.name().contains("TestProvider"));
    }
}
