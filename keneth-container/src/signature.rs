//! Declared dependencies and their resolved values.
//!
//! Rust has no runtime reflection over parameter lists, so every target
//! declares what it needs with a [`Signature`]. The container hands the
//! resolved values back as [`Arguments`].
//!
//! ```rust
//! use keneth_container::signature::Signature;
//!
//! struct Repo;
//!
//! let sig = Signature::new()
//!     .service::<Repo>()
//!     .binding("db_url")
//!     .binding_or("pool_size", 4usize)
//!     .optional_binding("replica_url");
//! assert_eq!(sig.len(), 4);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::context::{AnyArc, downcast_binding};
use crate::error::{KenethError, Result};
use crate::key::ServiceKey;

/// What happens when a binding is absent from both contexts.
#[derive(Clone)]
pub enum BindingFallback {
    /// Resolution fails with [`KenethError::UnresolvedBinding`].
    Required,
    /// The argument resolves to `None`.
    Optional,
    /// The argument resolves to this value.
    Default(AnyArc),
}

impl fmt::Debug for BindingFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingFallback::Required => write!(f, "Required"),
            BindingFallback::Optional => write!(f, "Optional"),
            BindingFallback::Default(_) => write!(f, "Default(..)"),
        }
    }
}

/// One entry of a [`Signature`].
#[derive(Debug, Clone)]
pub enum Dependency {
    /// Resolved through `provide`.
    Service(ServiceKey),
    /// Resolved through the two-tier binding lookup.
    Binding {
        key: String,
        fallback: BindingFallback,
    },
}

impl Dependency {
    /// Whether an absent value is an error.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Dependency::Service(_)
                | Dependency::Binding {
                    fallback: BindingFallback::Required,
                    ..
                }
        )
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Service(key) => write!(f, "service {key}"),
            Dependency::Binding { key, .. } => write!(f, "binding {key:?}"),
        }
    }
}

/// Ordered list of the dependencies a constructor or callable declares.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    dependencies: Vec<Dependency>,
}

impl Signature {
    /// An empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a service dependency on `T`.
    pub fn service<T: ?Sized + 'static>(mut self) -> Self {
        self.dependencies.push(Dependency::Service(ServiceKey::of::<T>()));
        self
    }

    /// Declares a required binding.
    pub fn binding(self, key: impl Into<String>) -> Self {
        self.with_binding(key, BindingFallback::Required)
    }

    /// Declares a binding that resolves to `None` when absent.
    pub fn optional_binding(self, key: impl Into<String>) -> Self {
        self.with_binding(key, BindingFallback::Optional)
    }

    /// Declares a binding with a default value.
    pub fn binding_or<T: Any + Send + Sync>(self, key: impl Into<String>, default: T) -> Self {
        self.with_binding(key, BindingFallback::Default(Arc::new(default)))
    }

    pub fn with_binding(mut self, key: impl Into<String>, fallback: BindingFallback) -> Self {
        self.dependencies.push(Dependency::Binding {
            key: key.into(),
            fallback,
        });
        self
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Service keys only, in declaration order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceKey> {
        self.dependencies.iter().filter_map(|dep| match dep {
            Dependency::Service(key) => Some(key),
            Dependency::Binding { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// A resolved argument.
#[derive(Clone)]
pub(crate) enum Resolved {
    Service(ServiceKey, AnyArc),
    Binding(String, Option<AnyArc>),
}

/// Resolved values for one [`Signature`], in declaration order.
///
/// Handed to constructors and callables. Accessors look values up by type
/// (services) or by name (bindings).
pub struct Arguments {
    target: String,
    values: Vec<Resolved>,
}

impl Arguments {
    pub(crate) fn new(target: impl Into<String>, values: Vec<Resolved>) -> Self {
        Self {
            target: target.into(),
            values,
        }
    }

    /// Name of the target these arguments were resolved for.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the resolved service `T`.
    ///
    /// # Errors
    /// [`KenethError::UndeclaredDependency`] if the signature has no
    /// `service::<T>()` entry.
    pub fn service<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let wanted = ServiceKey::of::<T>();
        let found = self.values.iter().find_map(|value| match value {
            Resolved::Service(key, instance) if *key == wanted => Some(instance.clone()),
            _ => None,
        });

        let instance = found.ok_or_else(|| self.undeclared(format!("service {wanted}")))?;
        instance.downcast::<T>().map_err(|_| KenethError::TypeMismatch {
            what: format!("service {wanted}"),
            expected: type_name::<T>(),
        })
    }

    /// Returns a binding declared as required or with a default.
    ///
    /// An optional binding that resolved to nothing is reported as
    /// [`KenethError::UnresolvedBinding`].
    pub fn binding<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        self.optional_binding::<T>(key)?.ok_or_else(|| {
            KenethError::UnresolvedBinding(crate::error::UnresolvedBindingError {
                key: key.to_string(),
                required_by: self.target.clone(),
            })
        })
    }

    /// Returns a binding that may be absent.
    pub fn optional_binding<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        let slot = self.values.iter().find_map(|value| match value {
            Resolved::Binding(name, value) if name == key => Some(value.clone()),
            _ => None,
        });

        match slot {
            None => Err(self.undeclared(format!("binding {key:?}"))),
            Some(None) => Ok(None),
            Some(Some(value)) => downcast_binding(key, value).map(Some),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn undeclared(&self, dependency: String) -> KenethError {
        KenethError::UndeclaredDependency {
            target: self.target.clone(),
            dependency,
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .values
            .iter()
            .map(|value| match value {
                Resolved::Service(key, _) => key.short_name(),
                Resolved::Binding(name, Some(_)) => format!("{name:?}"),
                Resolved::Binding(name, None) => format!("{name:?} (absent)"),
            })
            .collect();
        f.debug_struct("Arguments")
            .field("target", &self.target)
            .field("values", &names)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Callables
// ═══════════════════════════════════════════

/// Something [`Container::call`](crate::container::Container::call) can invoke.
///
/// The callable is never pushed onto the target stack; only the services it
/// depends on are.
pub trait Injectable {
    type Output;

    /// Dependencies to resolve before invoking.
    fn signature(&self) -> Signature;

    /// Runs the callable with resolved arguments.
    fn invoke(self, args: &Arguments) -> Result<Self::Output>;

    /// Name used in error messages.
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }
}

/// A closure paired with its declared signature.
pub struct Injected<F> {
    name: String,
    signature: Signature,
    func: F,
}

impl<F> Injected<F> {
    /// Overrides the name shown in errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Wraps `func` so the container can call it.
///
/// ```rust
/// use keneth_container::prelude::*;
///
/// let container = Container::builder().binding("greeting", "hello").build().unwrap();
/// let shout = inject(Signature::new().binding("greeting"), |args| {
///     let greeting = args.binding::<&str>("greeting")?;
///     Ok(greeting.to_uppercase())
/// });
/// assert_eq!(container.call(shout).unwrap(), "HELLO");
/// ```
pub fn inject<F, R>(signature: Signature, func: F) -> Injected<F>
where
    F: FnOnce(&Arguments) -> Result<R>,
{
    Injected {
        name: type_name::<F>().to_string(),
        signature,
        func,
    }
}

impl<F, R> Injectable for Injected<F>
where
    F: FnOnce(&Arguments) -> Result<R>,
{
    type Output = R;

    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn invoke(self, args: &Arguments) -> Result<R> {
        (self.func)(args)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Repo;
    #[derive(Debug)]
    struct Handler;

    fn args_with(values: Vec<Resolved>) -> Arguments {
        Arguments::new("test", values)
    }

    #[test]
    fn signature_keeps_declaration_order() {
        let sig = Signature::new()
            .binding("a")
            .service::<Repo>()
            .optional_binding("b");

        let rendered: Vec<String> = sig.dependencies().iter().map(ToString::to_string).collect();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].starts_with("binding"));
        assert!(rendered[1].contains("Repo"));
        assert_eq!(sig.services().count(), 1);
    }

    #[test]
    fn requiredness() {
        let sig = Signature::new()
            .service::<Repo>()
            .binding("a")
            .optional_binding("b")
            .binding_or("c", 1u8);
        let required: Vec<bool> = sig.dependencies().iter().map(Dependency::is_required).collect();
        assert_eq!(required, vec![true, true, false, false]);
    }

    #[test]
    fn typed_service_access() {
        let args = args_with(vec![Resolved::Service(ServiceKey::of::<Repo>(), Arc::new(Repo))]);
        assert!(args.service::<Repo>().is_ok());

        match args.service::<Handler>() {
            Err(KenethError::UndeclaredDependency { dependency, .. }) => {
                assert!(dependency.contains("Handler"));
            }
            other => panic!("Expected UndeclaredDependency, got: {other:?}"),
        }
    }

    #[test]
    fn binding_access() {
        let args = args_with(vec![
            Resolved::Binding("url".into(), Some(Arc::new(String::from("sqlite://mem")))),
            Resolved::Binding("replica".into(), None),
        ]);

        assert_eq!(*args.binding::<String>("url").unwrap(), "sqlite://mem");
        assert!(args.optional_binding::<String>("replica").unwrap().is_none());
        assert!(matches!(
            args.binding::<String>("replica"),
            Err(KenethError::UnresolvedBinding(_))
        ));
        assert!(matches!(
            args.binding::<u32>("url"),
            Err(KenethError::TypeMismatch { .. })
        ));
        assert!(matches!(
            args.binding::<String>("other"),
            Err(KenethError::UndeclaredDependency { .. })
        ));
    }

    #[test]
    fn injected_closure_invokes() {
        let target = inject(Signature::new(), |args| Ok(args.len())).named("count");
        assert_eq!(target.name(), "count");
        assert!(target.signature().is_empty());
        assert_eq!(target.invoke(&args_with(vec![])).unwrap(), 0);
    }
}
