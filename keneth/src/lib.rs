//! # Keneth: context-scoped dependency injection for Rust
//!
//! Services declare what they need with a [`Signature`](signature::Signature);
//! the [`Container`] builds them on demand, caches one instance per type in
//! the current context, and falls back to a permanent context for
//! process-wide bindings and instances.
//!
//! ```rust
//! use keneth::prelude::*;
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
//!     .unwrap();
//!
//! let url = container
//!     .call(inject(Signature::new().service::<Repo>(), |args| {
//!         Ok(args.service::<Repo>()?.url.clone())
//!     }))
//!     .unwrap();
//! assert_eq!(url, "sqlite://mem");
//! ```

pub use keneth_container::*;
pub use keneth_support::*;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    struct Beacon {
        region: String,
    }

    impl Service for Beacon {
        fn signature() -> Signature {
            Signature::new().binding_or("region", String::from("eu-west"))
        }

        fn construct(args: &Arguments) -> Result<Self> {
            Ok(Beacon {
                region: args.binding::<String>("region")?.to_string(),
            })
        }
    }

    crate::service!(Beacon);

    #[test]
    fn discover_registers_submitted_services() {
        let container = Container::builder().discover().build().unwrap();
        assert!(container.is_service::<Beacon>());

        let beacon: Arc<Beacon> = container.provide().unwrap();
        assert_eq!(beacon.region, "eu-west");
    }

    #[test]
    fn discover_keeps_explicit_registration() {
        let container = Container::builder()
            .service_with::<Beacon, _>(Signature::new(), |_| {
                Ok(Beacon {
                    region: "local".into(),
                })
            })
            .discover()
            .build()
            .unwrap();

        let beacon: Arc<Beacon> = container.provide().unwrap();
        assert_eq!(beacon.region, "local");
    }

    #[test]
    fn rendering_is_reexported() {
        assert_eq!(crate::rendering::shorten_type_name("a::b::C"), "C");
    }
}
