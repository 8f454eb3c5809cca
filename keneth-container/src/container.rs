//! # The Container
//!
//! Resolves services and callables against two contexts:
//!
//! ```text
//! ContainerBuilder ──build()──> Container
//!                                 ├── permanent: Arc<Context>   (created once)
//!                                 └── current:   Arc<Context>   (replaced by the host)
//!                                        │
//!                                  create_scope()
//!                                        │
//!                                        ▼
//!                                 Container (same permanent, fresh current)
//! ```
//!
//! Bindings and instances are looked up in the current context first and
//! fall back to the permanent one. Constructed services are cached in the
//! current context only; [`Container::elevate`] is the explicit way to move
//! one into the permanent context.
//!
//! # Examples
//! ```rust
//! use keneth_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Repo {
//!     url: String,
//! }
//!
//! impl Service for Repo {
//!     fn signature() -> Signature {
//!         Signature::new().binding("db_url")
//!     }
//!
//!     fn construct(args: &Arguments) -> Result<Self> {
//!         Ok(Repo { url: args.binding::<String>("db_url")?.to_string() })
//!     }
//! }
//!
//! let container = Container::builder()
//!     .binding("db_url", String::from("sqlite://mem"))
//!     .service::<Repo>()
//!     .build()
//!     .expect("Failed to build container");
//!
//! let repo: Arc<Repo> = container.provide().expect("Failed to provide");
//! assert_eq!(repo.url, "sqlite://mem");
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use keneth_support::rendering::suggest_similar;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use crate::context::{AnyArc, Context, downcast_binding};
use crate::error::{
    CircularDependencyError, KenethError, NotAServiceError, Result, UnresolvedBindingError,
};
use crate::graph::GraphValidator;
use crate::key::ServiceKey;
use crate::provider::{Provider, ProviderRegistry};
use crate::registry::{ServiceRegistry, SignatureReader};
use crate::service::{Service, ServiceDescriptor, ServiceEntry};
use crate::settings::ContainerSettings;
use crate::signature::{Arguments, BindingFallback, Dependency, Injectable, Resolved, Signature};
use crate::tier::Tier;

const MAX_SUGGESTIONS: usize = 3;

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] from registered services and default bindings.
///
/// Registration never fails eagerly; the first problem is reported by
/// [`build()`](ContainerBuilder::build).
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .binding("db_url", String::from("sqlite://mem"))
///     .service::<Repo>()
///     .service::<Handler>()
///     .build()?;
/// ```
pub struct ContainerBuilder {
    registry: ServiceRegistry,
    permanent: Context,
    settings: ContainerSettings,
    errors: Vec<KenethError>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registry: ServiceRegistry::new(),
            permanent: Context::new(),
            settings: ContainerSettings::default(),
            errors: Vec::new(),
        }
    }

    /// Replaces all settings at once.
    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Allow a later registration to replace an earlier one.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.settings.allow_override = allow;
        self
    }

    /// Validate the service graph during `build()`. On by default.
    pub fn validate(mut self, validate: bool) -> Self {
        self.settings.validate_on_build = validate;
        self
    }

    // ── Services ──

    /// Register a type implementing [`Service`].
    pub fn service<S: Service>(self) -> Self {
        self.descriptor(ServiceDescriptor::of::<S>())
    }

    /// Register `T` with an explicit signature and factory.
    pub fn service_with<T, F>(self, signature: Signature, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.descriptor(ServiceDescriptor::new::<T, F>(signature, factory))
    }

    /// Register a prepared descriptor.
    pub fn descriptor(mut self, descriptor: ServiceDescriptor) -> Self {
        self.register_service(descriptor);
        self
    }

    /// Register every service submitted with [`service!`](crate::service!).
    ///
    /// Entries whose type is already registered are skipped.
    pub fn discover(mut self) -> Self {
        for entry in inventory::iter::<ServiceEntry> {
            let descriptor = entry.descriptor();
            if self.registry.contains(descriptor.key()) {
                trace!(key = %descriptor.key(), "Discovered service already registered");
                continue;
            }
            debug!(service = entry.type_name(), "Discovered service");
            self.register_service(descriptor);
        }
        self
    }

    // ── Bindings ──

    /// Add a binding to the permanent context.
    pub fn binding<T: Any + Send + Sync>(self, key: impl Into<String>, value: T) -> Self {
        self.permanent.add_binding(key, value);
        self
    }

    // ── Provider modules ──

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(&mut self);
        self
    }

    // ── Build ──

    /// Build the container.
    ///
    /// # Errors
    /// The first registration error, or a graph validation error when
    /// validation is enabled.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        info!(
            registered = self.registry.len(),
            bindings = self.permanent.binding_count(),
            "Building container"
        );

        if self.settings.validate_on_build {
            GraphValidator::new(&self.registry).validate()?;
        }

        info!("Container built successfully");
        Ok(Container::with_permanent(
            Arc::new(self.registry),
            Arc::new(self.permanent),
        ))
    }
}

impl ProviderRegistry for ContainerBuilder {
    fn register_service(&mut self, descriptor: ServiceDescriptor) {
        if let Err(err) = self.registry.register(descriptor, self.settings.allow_override) {
            warn!(error = %err, "Registration rejected");
            self.errors.push(err);
        }
    }

    fn register_binding(&mut self, key: String, value: AnyArc) {
        self.permanent.add_binding_any(key, value);
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Dependency injection container with a current and a permanent context.
///
/// `Container` is `Send + Sync`, but its current context carries a single
/// target stack and is meant for one thread at a time. Two threads resolving
/// through the same container can see each other's targets and get a
/// spurious [`KenethError::CircularDependency`]. Give each thread its own
/// [`create_scope`](Self::create_scope) instead; scopes share the permanent
/// context.
pub struct Container {
    reader: Arc<dyn SignatureReader>,
    permanent: Arc<Context>,
    current: RwLock<Arc<Context>>,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Create a container over a custom [`SignatureReader`].
    pub fn new(reader: impl SignatureReader + 'static) -> Self {
        Self::with_permanent(Arc::new(reader), Arc::new(Context::new()))
    }

    /// Create a container over `reader` with an existing permanent context.
    pub fn with_permanent(reader: Arc<dyn SignatureReader>, permanent: Arc<Context>) -> Self {
        Self {
            reader,
            permanent,
            current: RwLock::new(Arc::new(Context::new())),
        }
    }

    // ── Contexts ──

    /// The current (ambient) context.
    pub fn get_context(&self) -> Arc<Context> {
        self.current.read().clone()
    }

    /// The permanent context. Never replaced.
    pub fn get_permanent_context(&self) -> Arc<Context> {
        self.permanent.clone()
    }

    /// Returns the context installed for `tier`.
    pub fn context(&self, tier: Tier) -> Arc<Context> {
        match tier {
            Tier::Current => self.get_context(),
            Tier::Permanent => self.get_permanent_context(),
        }
    }

    /// Installs `context` as the current context and returns the previous one.
    pub fn set_context(&self, context: Arc<Context>) -> Arc<Context> {
        let previous = std::mem::replace(&mut *self.current.write(), context);
        debug!("Current context replaced");
        previous
    }

    /// Installs a fresh, empty current context and returns the previous one.
    pub fn reset_context(&self) -> Arc<Context> {
        self.set_context(Arc::new(Context::new()))
    }

    /// Drops every instance cached in the current context.
    pub fn clear_context(&self) {
        self.get_context().clear_instances();
        debug!("Current context cleared");
    }

    /// A container sharing this one's services and permanent context, with
    /// its own fresh current context.
    ///
    /// Use one per request or per thread.
    pub fn create_scope(&self) -> Container {
        debug!("Creating new scope");
        Container::with_permanent(self.reader.clone(), self.permanent.clone())
    }

    // ── Two-tier lookups ──

    /// Looks `key` up in the current context, then the permanent one.
    pub fn get_binding(&self, key: &str) -> Option<AnyArc> {
        self.resolution().binding(key)
    }

    /// Typed variant of [`get_binding`](Self::get_binding).
    ///
    /// # Errors
    /// [`KenethError::TypeMismatch`] if the bound value is not a `T`.
    pub fn binding<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        self.get_binding(key)
            .map(|value| downcast_binding(key, value))
            .transpose()
    }

    /// Looks an instance up in the current context, then the permanent one.
    pub fn get_instance_from_type(&self, key: &ServiceKey) -> Option<AnyArc> {
        self.resolution().cached(key).map(|(instance, _)| instance)
    }

    /// Typed variant of [`get_instance_from_type`](Self::get_instance_from_type).
    pub fn instance<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_instance_from_type(&ServiceKey::of::<T>())
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// Returns `true` if the signature reader knows `T` as a service.
    pub fn is_service<T: ?Sized + 'static>(&self) -> bool {
        self.reader.is_service(&ServiceKey::of::<T>())
    }

    // ── Resolution ──

    /// Provides the instance of service `T`, constructing it if needed.
    ///
    /// ```rust,ignore
    /// let handler: Arc<Handler> = container.provide()?;
    /// ```
    ///
    /// # Errors
    /// - [`KenethError::NotAService`]: `T` is not a registered service
    /// - [`KenethError::CircularDependency`]: `T` is already being built
    /// - [`KenethError::UnresolvedBinding`]: a required binding is missing
    ///
    /// Resolution uses the current context's target stack, so concurrent
    /// callers each need their own [`create_scope`](Self::create_scope).
    pub fn provide<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let key = ServiceKey::of::<T>();
        self.provide_key(&key)?
            .downcast::<T>()
            .map_err(|_| KenethError::TypeMismatch {
                what: format!("service {key}"),
                expected: type_name::<T>(),
            })
    }

    /// Erased variant of [`provide`](Self::provide).
    pub fn provide_key(&self, key: &ServiceKey) -> Result<AnyArc> {
        trace!(key = %key, "Providing");
        self.resolution().provide(key, None)
    }

    /// Resolves `target`'s dependencies and invokes it.
    ///
    /// The target itself is not pushed onto the target stack. Its output is
    /// returned unchanged. Like [`provide`](Self::provide), one container
    /// serves one thread at a time.
    pub fn call<I: Injectable>(&self, target: I) -> Result<I::Output> {
        let name = target.name();
        let args = self.resolution().resolve(&target.signature(), &name)?;
        trace!(target = %name, arguments = args.len(), "Invoking");
        target.invoke(&args)
    }

    /// Copies the current context's instance of `T` into the permanent
    /// context. Returns `false` if the current context has none.
    pub fn elevate<T: Any + Send + Sync>(&self) -> bool {
        let key = ServiceKey::of::<T>();
        match self.get_context().get_instance_from_type(&key) {
            Some(instance) => {
                self.permanent.add_instance_any(instance);
                debug!(key = %key, from = %Tier::Current, to = %Tier::Permanent, "Instance elevated");
                true
            }
            None => false,
        }
    }

    /// Walks the whole service graph for cycles and unknown dependencies.
    pub fn validate(&self) -> Result<()> {
        GraphValidator::new(self.reader.as_ref()).validate()
    }

    fn resolution(&self) -> Resolution<'_> {
        Resolution {
            reader: self.reader.as_ref(),
            current: self.get_context(),
            permanent: &self.permanent,
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.reader.services().len())
            .field("current", &*self.get_context())
            .field("permanent", &*self.permanent)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Resolution (internal)
// ═══════════════════════════════════════════

/// One resolution tree, pinned to the current context it started with.
struct Resolution<'a> {
    reader: &'a dyn SignatureReader,
    current: Arc<Context>,
    permanent: &'a Context,
}

impl Resolution<'_> {
    fn provide(&self, key: &ServiceKey, required_by: Option<&str>) -> Result<AnyArc> {
        // Marker check comes before the caches.
        let descriptor = self
            .reader
            .read(key)
            .ok_or_else(|| self.not_a_service(key, required_by))?;

        if let Some((instance, tier)) = self.cached(key) {
            trace!(key = %key, tier = %tier, "Reusing cached instance");
            return Ok(instance);
        }

        let _guard = TargetGuard::acquire(&self.current, *key)?;

        let args = self.resolve(descriptor.signature(), key.type_name())?;
        let instance = descriptor.construct(&args)?;
        self.current.add_instance_any(instance.clone());

        debug!(key = %key, "Service constructed");
        Ok(instance)
    }

    fn resolve(&self, signature: &Signature, target: &str) -> Result<Arguments> {
        let mut values = Vec::with_capacity(signature.len());

        for dependency in signature.dependencies() {
            let value = match dependency {
                Dependency::Service(key) => Resolved::Service(*key, self.provide(key, Some(target))?),
                Dependency::Binding { key, fallback } => {
                    let value = match (self.binding(key), fallback) {
                        (Some(value), _) => Some(value),
                        (None, BindingFallback::Default(default)) => Some(default.clone()),
                        (None, BindingFallback::Optional) => None,
                        (None, BindingFallback::Required) => {
                            return Err(KenethError::UnresolvedBinding(UnresolvedBindingError {
                                key: key.clone(),
                                required_by: target.to_string(),
                            }));
                        }
                    };
                    Resolved::Binding(key.clone(), value)
                }
            };
            values.push(value);
        }

        Ok(Arguments::new(target, values))
    }

    fn binding(&self, key: &str) -> Option<AnyArc> {
        self.current
            .get_binding(key)
            .or_else(|_| self.permanent.get_binding(key))
            .ok()
    }

    fn cached(&self, key: &ServiceKey) -> Option<(AnyArc, Tier)> {
        Tier::LOOKUP_ORDER.into_iter().find_map(|tier| {
            let context = match tier {
                Tier::Current => &*self.current,
                Tier::Permanent => self.permanent,
            };
            context.get_instance_from_type(key).map(|instance| (instance, tier))
        })
    }

    fn not_a_service(&self, key: &ServiceKey, required_by: Option<&str>) -> KenethError {
        let known: Vec<&'static str> = self
            .reader
            .services()
            .iter()
            .map(ServiceKey::type_name)
            .collect();

        KenethError::NotAService(NotAServiceError {
            requested: *key,
            required_by: required_by.map(str::to_string),
            suggestions: suggest_similar(key.type_name(), &known, MAX_SUGGESTIONS),
        })
    }
}

/// Holds one entry on a context's target stack; pops it on drop.
struct TargetGuard<'a> {
    context: &'a Context,
    key: ServiceKey,
}

impl<'a> TargetGuard<'a> {
    /// Pushes `key` unless it is already on the stack.
    fn acquire(context: &'a Context, key: ServiceKey) -> Result<Self> {
        let targets = context.get_targets();

        if let Some(start) = targets.iter().position(|k| *k == key) {
            let mut chain = targets[start..].to_vec();
            chain.push(key);

            warn!(cycle = ?chain, "Circular dependency detected!");
            return Err(KenethError::CircularDependency(CircularDependencyError { chain }));
        }

        context.add_target(key);
        trace!(key = %key, depth = targets.len() + 1, "Target pushed");
        Ok(Self { context, key })
    }
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        match self.context.remove_target(&self.key) {
            Some(0) => {}
            Some(above) => {
                warn!(key = %self.key, above, "Target released out of order");
            }
            None => warn!(key = %self.key, "Target missing from stack"),
        }
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::context::{AnyArc, Context};
    pub use crate::error::{KenethError, Result};
    pub use crate::key::ServiceKey;
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::registry::{ServiceRegistry, SignatureReader};
    pub use crate::service::{Service, ServiceDescriptor};
    pub use crate::settings::ContainerSettings;
    pub use crate::signature::{Arguments, Injectable, Signature, inject};
    pub use crate::tier::Tier;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
