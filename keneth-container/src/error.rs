//! Error types for Keneth container operations.
//!
//! Every failure of `provide` or `call` is a programmer or configuration
//! error, so messages name the types involved and end with a hint.

use std::fmt;

use keneth_support::rendering::render_chain;

use crate::key::ServiceKey;

/// Main error type for all Keneth operations.
#[derive(Debug, thiserror::Error)]
pub enum KenethError {
    /// Binding lookup missed in a single context.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// Requested type is not a registered service.
    #[error("{}", .0)]
    NotAService(NotAServiceError),

    /// A type was requested while it was already being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A required binding is missing from both contexts.
    #[error("{}", .0)]
    UnresolvedBinding(UnresolvedBindingError),

    /// A stored value is not of the requested type.
    #[error("Type mismatch for {what}: expected {expected}")]
    TypeMismatch {
        what: String,
        expected: &'static str,
    },

    /// A constructor asked for an argument its signature never declared.
    #[error("{target} asked for {dependency}, which is not declared in its signature")]
    UndeclaredDependency {
        target: String,
        dependency: String,
    },

    /// The service constructor itself failed.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: ServiceKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Service was already registered (when override is disabled).
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),
}

impl KenethError {
    /// Wraps a domain error raised while constructing `key`.
    pub fn construction(
        key: ServiceKey,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        KenethError::ConstructionFailed {
            key,
            source: source.into(),
        }
    }
}

/// Binding lookup miss in one context.
#[derive(Debug)]
pub struct NotFoundError {
    pub key: String,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding not found in context: {:?}", self.key)
    }
}

/// Error when a type without the service marker is requested.
#[derive(Debug)]
pub struct NotAServiceError {
    /// The type that was requested
    pub requested: ServiceKey,
    /// What declared it as a dependency (if anything)
    pub required_by: Option<String>,
    /// Registered services with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotAServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Not a service: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: implement Service for {} and register it, or supply it as a binding",
            self.requested.short_name()
        )
    }
}

/// Error when a circular dependency is detected.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The cycle, starting and ending with the same type.
    /// Example: `[A, B, A]`
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(ServiceKey::short_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: break the cycle by moving shared state into a binding or a third service"
        )
    }
}

/// Error when a required binding is absent from both contexts.
#[derive(Debug)]
pub struct UnresolvedBindingError {
    /// The binding name
    pub key: String,
    /// The service or callable that declared it
    pub required_by: String,
}

impl fmt::Display for UnresolvedBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unresolved binding {:?}\n  Required by: {}",
            self.key, self.required_by
        )?;
        write!(
            f,
            "\n  Hint: add_binding({:?}, ..) on the current or permanent context, or declare a default",
            self.key
        )
    }
}

/// Error when trying to register a service that already exists.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: ServiceKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.key)?;
        write!(
            f,
            "\n  Hint: enable allow_override on the builder to replace it"
        )
    }
}

/// Convenient Result type for Keneth operations.
pub type Result<T> = std::result::Result<T, KenethError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Repo;
    struct Handler;

    #[test]
    fn not_a_service_display() {
        let err = KenethError::NotAService(NotAServiceError {
            requested: ServiceKey::of::<Repo>(),
            required_by: Some("Handler".into()),
            suggestions: vec!["app::Repository".into()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("Not a service"));
        assert!(msg.contains("Required by: Handler"));
        assert!(msg.contains("app::Repository"));
    }

    #[test]
    fn circular_dependency_display() {
        let err = KenethError::CircularDependency(CircularDependencyError {
            chain: vec![
                ServiceKey::of::<Handler>(),
                ServiceKey::of::<Repo>(),
                ServiceKey::of::<Handler>(),
            ],
        });

        let msg = format!("{err}");
        assert!(msg.contains("Handler → Repo → Handler"));
    }

    #[test]
    fn unresolved_binding_display() {
        let err = KenethError::UnresolvedBinding(UnresolvedBindingError {
            key: "db_url".into(),
            required_by: "Repo".into(),
        });

        let msg = format!("{err}");
        assert!(msg.contains("\"db_url\""));
        assert!(msg.contains("Repo"));
    }

    #[test]
    fn construction_keeps_source() {
        use std::error::Error as _;

        let err = KenethError::construction(ServiceKey::of::<Repo>(), "connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert!(err.source().is_some());
    }
}
