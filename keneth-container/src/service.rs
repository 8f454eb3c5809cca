//! The service marker and its erased descriptor.
//!
//! Implementing [`Service`] is how a type opts into auto-construction.
//! The container only ever sees the erased [`ServiceDescriptor`], produced
//! either from a `Service` impl or from an explicit factory.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::context::AnyArc;
use crate::error::{KenethError, Result};
use crate::key::ServiceKey;
use crate::signature::{Arguments, Signature};

/// Marks a type the container may construct on demand.
///
/// # Examples
/// ```rust
/// use keneth_container::prelude::*;
///
/// struct Repo {
///     url: String,
/// }
///
/// impl Service for Repo {
///     fn signature() -> Signature {
///         Signature::new().binding("db_url")
///     }
///
///     fn construct(args: &Arguments) -> Result<Self> {
///         let url = args.binding::<String>("db_url")?;
///         Ok(Repo { url: url.to_string() })
///     }
/// }
/// ```
pub trait Service: Send + Sync + Sized + 'static {
    /// Constructor dependencies. Defaults to none.
    fn signature() -> Signature {
        Signature::new()
    }

    /// Builds the service from its resolved dependencies.
    fn construct(args: &Arguments) -> Result<Self>;
}

/// Erased constructor stored in a [`ServiceDescriptor`].
pub type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<AnyArc> + Send + Sync>;

/// Everything the container needs to build one service type.
#[derive(Clone)]
pub struct ServiceDescriptor {
    key: ServiceKey,
    signature: Signature,
    construct: ConstructFn,
}

impl ServiceDescriptor {
    /// Describes a type implementing [`Service`].
    pub fn of<S: Service>() -> Self {
        Self::new::<S, _>(S::signature(), S::construct)
    }

    /// Describes `T` with an explicit signature and factory.
    ///
    /// This is the registration path for types that cannot implement
    /// [`Service`] themselves, e.g. foreign types.
    pub fn new<T, F>(signature: Signature, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            key: ServiceKey::of::<T>(),
            signature,
            construct: Arc::new(move |args: &Arguments| {
                Ok(Arc::new(factory(args)?) as AnyArc)
            }),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Runs the factory. The returned instance is checked to be of the
    /// described type.
    pub fn construct(&self, args: &Arguments) -> Result<AnyArc> {
        let instance = (self.construct)(args)?;
        if (*instance).type_id() != self.key.type_id() {
            return Err(KenethError::TypeMismatch {
                what: format!("constructed {}", self.key),
                expected: self.key.type_name(),
            });
        }
        Ok(instance)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("signature", &self.signature)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Link-time discovery
// ═══════════════════════════════════════════

/// A service submitted for discovery with [`service!`](crate::service!).
///
/// [`ContainerBuilder::discover`](crate::container::ContainerBuilder::discover)
/// registers every submitted entry.
pub struct ServiceEntry {
    describe: fn() -> ServiceDescriptor,
    type_name: fn() -> &'static str,
}

impl ServiceEntry {
    pub const fn of<S: Service>() -> Self {
        Self {
            describe: ServiceDescriptor::of::<S>,
            type_name: type_name::<S>,
        }
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        (self.describe)()
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }
}

inventory::collect!(ServiceEntry);

/// Submits a [`Service`] type for link-time discovery.
///
/// ```rust,ignore
/// struct Mailer;
/// impl Service for Mailer { /* ... */ }
///
/// keneth_container::service!(Mailer);
///
/// let container = Container::builder().discover().build()?;
/// ```
#[macro_export]
macro_rules! service {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::service::ServiceEntry::of::<$ty>()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Resolved;

    struct Clock;

    impl Service for Clock {
        fn construct(_: &Arguments) -> Result<Self> {
            Ok(Clock)
        }
    }

    struct Repo {
        url: String,
    }

    impl Service for Repo {
        fn signature() -> Signature {
            Signature::new().binding("db_url")
        }

        fn construct(args: &Arguments) -> Result<Self> {
            Ok(Repo {
                url: args.binding::<String>("db_url")?.to_string(),
            })
        }
    }

    #[test]
    fn descriptor_from_service_impl() {
        let descriptor = ServiceDescriptor::of::<Repo>();
        assert_eq!(*descriptor.key(), ServiceKey::of::<Repo>());
        assert_eq!(descriptor.signature().len(), 1);

        let args = Arguments::new(
            "Repo",
            vec![Resolved::Binding("db_url".into(), Some(Arc::new(String::from("sqlite://mem"))))],
        );
        let instance = descriptor.construct(&args).unwrap();
        let repo = instance.downcast::<Repo>().ok().unwrap();
        assert_eq!(repo.url, "sqlite://mem");
    }

    #[test]
    fn default_signature_is_empty() {
        assert!(ServiceDescriptor::of::<Clock>().signature().is_empty());
    }

    #[test]
    fn explicit_factory_for_foreign_type() {
        let descriptor = ServiceDescriptor::new::<Vec<u8>, _>(Signature::new(), |_| Ok(vec![1, 2]));
        assert_eq!(*descriptor.key(), ServiceKey::of::<Vec<u8>>());

        let instance = descriptor.construct(&Arguments::new("Vec<u8>", vec![])).unwrap();
        assert_eq!(*instance.downcast::<Vec<u8>>().ok().unwrap(), vec![1, 2]);
    }

    #[test]
    fn factory_errors_propagate() {
        let descriptor = ServiceDescriptor::new::<Clock, _>(Signature::new(), |_| {
            Err(KenethError::construction(ServiceKey::of::<Clock>(), "no clock source"))
        });
        let err = descriptor.construct(&Arguments::new("Clock", vec![])).err().unwrap();
        assert!(err.to_string().contains("no clock source"));
    }

    #[test]
    fn entry_describes_service() {
        const ENTRY: ServiceEntry = ServiceEntry::of::<Repo>();
        assert!(ENTRY.type_name().ends_with("Repo"));
        assert_eq!(*ENTRY.descriptor().key(), ServiceKey::of::<Repo>());
    }
}
