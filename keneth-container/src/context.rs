//! Scoped storage for one resolution context.
//!
//! A [`Context`] holds three independent stores:
//! - **bindings**: named values, the last layer before a binding error
//! - **targets**: the services currently being constructed, for cycle detection
//! - **instances**: services already built in this context, one per type
//!
//! All methods take `&self`; a permanent context is shared between threads.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::error::{KenethError, NotFoundError, Result};
use crate::key::ServiceKey;

/// Type-erased shared value, as stored in bindings and instance caches.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Scoped store of bindings, in-flight targets and built instances.
///
/// # Examples
/// ```
/// use keneth_container::context::Context;
/// use std::sync::Arc;
///
/// let ctx = Context::new();
/// ctx.add_binding("db_url", String::from("sqlite://mem"))
///    .add_instance(Arc::new(7u32));
///
/// assert_eq!(*ctx.binding::<String>("db_url").unwrap(), "sqlite://mem");
/// assert_eq!(ctx.instance::<u32>().map(|v| *v), Some(7));
/// ```
#[derive(Default)]
pub struct Context {
    bindings: RwLock<HashMap<String, AnyArc>>,
    targets: Mutex<Vec<ServiceKey>>,
    instances: DashMap<TypeId, AnyArc>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Bindings ──

    /// Stores `value` under `key`, replacing any previous value.
    pub fn add_binding<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> &Self {
        self.add_binding_any(key, Arc::new(value))
    }

    /// Stores an already erased value under `key`.
    pub fn add_binding_any(&self, key: impl Into<String>, value: AnyArc) -> &Self {
        let key = key.into();
        trace!(key = %key, "Binding stored");
        self.bindings.write().insert(key, value);
        self
    }

    /// Returns the value bound to `key` in this context.
    ///
    /// # Errors
    /// [`KenethError::NotFound`] if this context has no such binding.
    pub fn get_binding(&self, key: &str) -> Result<AnyArc> {
        self.bindings
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| KenethError::NotFound(NotFoundError { key: key.to_string() }))
    }

    /// Typed variant of [`get_binding`](Self::get_binding).
    pub fn binding<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        downcast_binding(key, self.get_binding(key)?)
    }

    /// Returns `true` if `key` is bound in this context.
    pub fn has_binding(&self, key: &str) -> bool {
        self.bindings.read().contains_key(key)
    }

    /// Removes a binding, returning its value.
    pub fn remove_binding(&self, key: &str) -> Option<AnyArc> {
        self.bindings.write().remove(key)
    }

    /// Number of bindings in this context.
    pub fn binding_count(&self) -> usize {
        self.bindings.read().len()
    }

    // ── Targets ──

    /// Pushes `target` onto the resolution stack.
    ///
    /// The caller must [`pop_target`](Self::pop_target) or
    /// [`remove_target`](Self::remove_target) on every exit path.
    pub fn add_target(&self, target: ServiceKey) -> &Self {
        self.targets.lock().push(target);
        self
    }

    /// Pops the most recently pushed target.
    pub fn pop_target(&self) -> Option<ServiceKey> {
        self.targets.lock().pop()
    }

    /// Removes the most recent occurrence of `target` from the stack.
    ///
    /// Returns how many entries sat above it, so `Some(0)` means it was on
    /// top, or `None` if `target` was not on the stack at all.
    pub fn remove_target(&self, target: &ServiceKey) -> Option<usize> {
        let mut targets = self.targets.lock();
        let index = targets.iter().rposition(|k| k == target)?;
        targets.remove(index);
        Some(targets.len() - index)
    }

    /// Snapshot of the resolution stack, most recent last.
    pub fn get_targets(&self) -> Vec<ServiceKey> {
        self.targets.lock().clone()
    }

    // ── Instances ──

    /// Caches `instance` under its concrete type `T`.
    ///
    /// An instance of the same type already cached here is replaced.
    pub fn add_instance<T: Any + Send + Sync>(&self, instance: Arc<T>) -> &Self {
        self.add_instance_any(instance)
    }

    /// Caches an erased instance under the type of the value it points to.
    pub fn add_instance_any(&self, instance: AnyArc) -> &Self {
        // Deref first: the key is the pointee's type, not `Arc`'s.
        let type_id = (*instance).type_id();
        self.instances.insert(type_id, instance);
        self
    }

    /// Exact-type lookup in the instance cache.
    pub fn get_instance_from_type(&self, key: &ServiceKey) -> Option<AnyArc> {
        self.instances.get(&key.type_id()).map(|entry| entry.value().clone())
    }

    /// Typed variant of [`get_instance_from_type`](Self::get_instance_from_type).
    pub fn instance<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_instance_from_type(&ServiceKey::of::<T>())
            .and_then(|any| any.downcast::<T>().ok())
    }

    /// Drops every cached instance. Bindings and targets are untouched.
    pub fn clear_instances(&self) {
        let dropped = self.instances.len();
        self.instances.clear();
        trace!(dropped, "Instances cleared");
    }

    /// Number of cached instances in this context.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

pub(crate) fn downcast_binding<T: Any + Send + Sync>(key: &str, value: AnyArc) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| KenethError::TypeMismatch {
        what: format!("binding {key:?}"),
        expected: type_name::<T>(),
    })
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("bindings", &self.binding_count())
            .field("targets", &self.targets.lock().len())
            .field("instances", &self.instance_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Repo;
    #[derive(Debug)]
    struct Handler;

    #[test]
    fn binding_last_write_wins() {
        let ctx = Context::new();
        ctx.add_binding("x", 1i32).add_binding("x", 2i32);

        assert_eq!(*ctx.binding::<i32>("x").unwrap(), 2);
        assert_eq!(ctx.binding_count(), 1);
    }

    #[test]
    fn missing_binding_is_not_found() {
        let ctx = Context::new();
        match ctx.get_binding("absent") {
            Err(KenethError::NotFound(e)) => assert_eq!(e.key, "absent"),
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn binding_type_mismatch() {
        let ctx = Context::new();
        ctx.add_binding("port", 8080u16);
        match ctx.binding::<String>("port") {
            Err(KenethError::TypeMismatch { expected, .. }) => {
                assert!(expected.contains("String"));
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn remove_binding() {
        let ctx = Context::new();
        ctx.add_binding("x", 1i32);
        assert!(ctx.remove_binding("x").is_some());
        assert!(!ctx.has_binding("x"));
    }

    #[test]
    fn targets_stack_order() {
        let ctx = Context::new();
        ctx.add_target(ServiceKey::of::<Handler>())
            .add_target(ServiceKey::of::<Repo>());

        assert_eq!(
            ctx.get_targets(),
            vec![ServiceKey::of::<Handler>(), ServiceKey::of::<Repo>()]
        );
        assert_eq!(ctx.pop_target(), Some(ServiceKey::of::<Repo>()));
        assert_eq!(ctx.get_targets(), vec![ServiceKey::of::<Handler>()]);
    }

    #[test]
    fn remove_target_takes_most_recent_occurrence() {
        let ctx = Context::new();
        let (handler, repo) = (ServiceKey::of::<Handler>(), ServiceKey::of::<Repo>());
        ctx.add_target(handler).add_target(repo).add_target(handler);

        assert_eq!(ctx.remove_target(&repo), Some(1));
        assert_eq!(ctx.get_targets(), vec![handler, handler]);
        assert_eq!(ctx.remove_target(&handler), Some(0));
        assert_eq!(ctx.remove_target(&repo), None);
        assert_eq!(ctx.get_targets(), vec![handler]);
    }

    #[test]
    fn instance_keyed_by_concrete_type() {
        let ctx = Context::new();
        let repo = Arc::new(Repo);
        ctx.add_instance(repo.clone());

        let found = ctx.instance::<Repo>().unwrap();
        assert!(Arc::ptr_eq(&repo, &found));
        assert!(ctx.instance::<Handler>().is_none());
    }

    #[test]
    fn erased_instance_keyed_by_pointee() {
        let ctx = Context::new();
        let erased: AnyArc = Arc::new(Repo);
        ctx.add_instance_any(erased);

        assert!(ctx.get_instance_from_type(&ServiceKey::of::<Repo>()).is_some());
        assert!(ctx.get_instance_from_type(&ServiceKey::of::<AnyArc>()).is_none());
    }

    #[test]
    fn instance_overwrite() {
        let ctx = Context::new();
        let first = Arc::new(Repo);
        let second = Arc::new(Repo);
        ctx.add_instance(first.clone()).add_instance(second.clone());

        let found = ctx.instance::<Repo>().unwrap();
        assert!(Arc::ptr_eq(&second, &found));
        assert_eq!(ctx.instance_count(), 1);
    }

    #[test]
    fn clear_instances_keeps_bindings_and_targets() {
        let ctx = Context::new();
        ctx.add_binding("x", 1i32)
            .add_target(ServiceKey::of::<Repo>())
            .add_instance(Arc::new(Repo));

        ctx.clear_instances();
        ctx.clear_instances();

        assert_eq!(ctx.instance_count(), 0);
        assert!(ctx.has_binding("x"));
        assert_eq!(ctx.get_targets().len(), 1);
    }

    #[test]
    fn concurrent_instance_writes_are_not_lost() {
        #[derive(Debug)]
        struct Counter(usize);

        let ctx = Context::new();
        std::thread::scope(|s| {
            for i in 0..8 {
                let ctx = &ctx;
                s.spawn(move || {
                    ctx.add_instance(Arc::new(Counter(i)));
                    assert!(ctx.instance::<Counter>().is_some());
                });
            }
        });

        assert_eq!(ctx.instance_count(), 1);
        assert!(ctx.instance::<Counter>().unwrap().0 < 8);
    }
}
