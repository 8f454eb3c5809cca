//! Resolution engine for Keneth DI.

pub mod container;
pub mod context;
pub mod error;
mod graph;
pub mod key;
pub mod provider;
pub mod registry;
pub mod service;
pub mod settings;
pub mod signature;
pub mod tier;

pub use container::{Container, ContainerBuilder, prelude};
pub use context::{AnyArc, Context};
pub use error::{KenethError, Result};
pub use key::ServiceKey;
pub use service::Service;
pub use tier::Tier;

#[doc(hidden)]
pub use inventory;
