//! Static validation of the service graph.
//!
//! Runtime resolution already rejects cycles and unknown services, but only
//! for the part of the graph a request happens to touch. The validator walks
//! every registered service up front:
//! - every service dependency must itself be a service
//! - no service may (transitively) depend on itself
//!
//! Bindings are not checked; they may legitimately appear only in a
//! request's current context.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, KenethError, NotAServiceError};
use crate::key::ServiceKey;
use crate::registry::SignatureReader;

/// Depth-first walk over a [`SignatureReader`]'s services.
///
/// `path` mirrors the runtime target stack so cycle chains are reported in
/// the same shape as [`Container::provide`](crate::container::Container::provide)
/// reports them.
pub(crate) struct GraphValidator<'a> {
    reader: &'a dyn SignatureReader,
    visiting: HashSet<ServiceKey>,
    validated: HashSet<ServiceKey>,
    path: Vec<ServiceKey>,
}

impl<'a> GraphValidator<'a> {
    pub fn new(reader: &'a dyn SignatureReader) -> Self {
        Self {
            reader,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates every service the reader knows about.
    ///
    /// # Errors
    /// - [`KenethError::CircularDependency`]: cycle detected
    /// - [`KenethError::NotAService`]: a dependency is not a service
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), KenethError> {
        let mut keys = self.reader.services();
        // Deterministic error reporting
        keys.sort_by_key(|key| key.type_name());

        debug!(service_count = keys.len(), "Starting service graph validation");

        for key in keys {
            self.validate_key(&key)?;
        }

        debug!("Service graph validation passed");
        Ok(())
    }

    fn validate_key(&mut self, key: &ServiceKey) -> Result<(), KenethError> {
        if self.validated.contains(key) {
            return Ok(());
        }

        if self.visiting.contains(key) {
            let start = self.path.iter().position(|k| k == key).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(*key);

            warn!(cycle = ?chain, "Circular dependency detected during validation");
            return Err(KenethError::CircularDependency(CircularDependencyError { chain }));
        }

        let descriptor = self.reader.read(key).ok_or_else(|| {
            KenethError::NotAService(NotAServiceError {
                requested: *key,
                required_by: self.path.last().map(|k| k.type_name().to_string()),
                suggestions: Vec::new(),
            })
        })?;

        self.visiting.insert(*key);
        self.path.push(*key);

        for dep in descriptor.signature().services() {
            self.validate_key(dep)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(*key);

        Ok(())
    }
}
