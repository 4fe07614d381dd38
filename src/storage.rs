//! Concurrent bean registry
//!
//! Uses DashMap for lock-free concurrent reads. Holds descriptors, the
//! singleton cache and the set of beans currently being created.
//!
//! Singletons are cached in one `OnceCell` per key, so concurrent first
//! requests for the same key run its factory at most once. In-creation
//! marks are per thread: a thread waiting on another thread's cell is not
//! a cycle.

use crate::descriptor::BeanDescriptor;
use crate::error::{DiError, Result};
use crate::key::BeanKey;
use crate::provider::AnyArc;
use ahash::RandomState;
use dashmap::{DashMap, DashSet};
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

type Marker = (BeanKey, ThreadId);

/// Thread-safe storage for bean descriptors and instances
pub(crate) struct Registry {
    descriptors: DashMap<BeanKey, Arc<BeanDescriptor>, RandomState>,
    singletons: DashMap<BeanKey, Arc<OnceCell<AnyArc>>, RandomState>,
    in_creation: DashSet<Marker, RandomState>,
    /// Serializes registration; holds the next ordinal
    registration: Mutex<usize>,
}

impl Registry {
    /// Create empty storage with shard count scaled to the expected size.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            descriptors: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            singletons: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            in_creation: DashSet::with_hasher(RandomState::new()),
            registration: Mutex::new(0),
        }
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    /// Register a descriptor.
    ///
    /// Fails with [`DiError::DuplicateBeanName`] when two beans share a
    /// name and either of them was named explicitly, whichever comes first,
    /// or when the same type is registered twice under the same name.
    /// Default names of different types may coincide. Ready instances are
    /// cached immediately.
    pub(crate) fn register(&self, mut descriptor: BeanDescriptor) -> Result<Arc<BeanDescriptor>> {
        let mut next = self.registration.lock().unwrap_or_else(PoisonError::into_inner);

        let key = descriptor.key().clone();
        let name_taken = self.descriptors.iter().any(|entry| {
            entry.key().same_name(key.name())
                && (descriptor.has_explicit_name() || entry.value().has_explicit_name())
        });
        if name_taken || self.descriptors.contains_key(&key) {
            return Err(DiError::DuplicateBeanName {
                name: key.name().to_owned(),
                type_name: key.type_name(),
            });
        }

        descriptor.set_ordinal(*next);
        *next += 1;

        let descriptor = Arc::new(descriptor);
        if let Some(instance) = descriptor.factory().instance() {
            self.cache_singleton(&key, Arc::clone(instance));
        }
        self.descriptors.insert(key, Arc::clone(&descriptor));

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_context",
            bean = descriptor.key().name(),
            bean_type = descriptor.key().type_name(),
            scope = %descriptor.scope(),
            primary = descriptor.is_primary(),
            bean_count = self.descriptors.len(),
            "Registered bean descriptor"
        );

        Ok(descriptor)
    }

    #[inline]
    pub(crate) fn descriptor(&self, key: &BeanKey) -> Option<Arc<BeanDescriptor>> {
        self.descriptors.get(key).map(|d| Arc::clone(d.value()))
    }

    /// Descriptors assignable to `type_id`, optionally restricted to `name`,
    /// in registration order.
    pub(crate) fn candidates_for(&self, type_id: TypeId, name: Option<&str>) -> Vec<Arc<BeanDescriptor>> {
        let mut candidates: Vec<_> = self
            .descriptors
            .iter()
            .filter(|entry| entry.value().is_assignable_to(type_id))
            .filter(|entry| name.is_none_or(|name| entry.key().same_name(name)))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        candidates.sort_by_key(|d| d.ordinal());
        candidates
    }

    /// Every descriptor in registration order
    pub(crate) fn descriptors(&self) -> Vec<Arc<BeanDescriptor>> {
        let mut all: Vec<_> = self.descriptors.iter().map(|e| Arc::clone(e.value())).collect();
        all.sort_by_key(|d| d.ordinal());
        all
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.descriptors.len()
    }

    // =========================================================================
    // Singletons
    // =========================================================================

    fn cell(&self, key: &BeanKey) -> Arc<OnceCell<AnyArc>> {
        Arc::clone(self.singletons.entry(key.clone()).or_default().value())
    }

    /// Cached singleton instance, if already created
    #[inline]
    pub(crate) fn singleton_for(&self, key: &BeanKey) -> Option<AnyArc> {
        self.singletons
            .get(key)
            .and_then(|cell| cell.value().get().map(Arc::clone))
    }

    /// Cache `instance` unless one is already cached. Returns whether it was
    /// stored.
    pub(crate) fn cache_singleton(&self, key: &BeanKey, instance: AnyArc) -> bool {
        self.cell(key).set(instance).is_ok()
    }

    /// Return the cached singleton or create it with `create`.
    ///
    /// Concurrent callers for the same key block until the first one
    /// finishes; `create` runs at most once per successful initialization.
    /// A failed `create` leaves the cell empty.
    pub(crate) fn get_or_create_singleton<F>(&self, key: &BeanKey, create: F) -> Result<AnyArc>
    where
        F: FnOnce() -> Result<AnyArc>,
    {
        // The map guard must not be held while the factory runs, since the
        // factory resolves other beans through this registry.
        let cell = self.cell(key);
        cell.get_or_try_init(create).map(Arc::clone)
    }

    // =========================================================================
    // In-creation marks
    // =========================================================================

    /// Whether the current thread is creating `key`
    #[inline]
    pub(crate) fn is_in_creation(&self, key: &BeanKey) -> bool {
        self.in_creation
            .contains(&(key.clone(), thread::current().id()))
    }

    /// Mark `key` as being created by the current thread. The mark is
    /// removed when the guard drops, including on error paths.
    pub(crate) fn mark_in_creation(&self, key: &BeanKey) -> CreationGuard<'_> {
        let marker = (key.clone(), thread::current().id());

        #[cfg(feature = "logging")]
        trace!(
            target: "bean_context",
            bean = key.name(),
            "Marking bean as in creation"
        );

        self.in_creation.insert(marker.clone());
        CreationGuard {
            set: &self.in_creation,
            marker: Some(marker),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("descriptors", &self.descriptors.len())
            .field("singletons", &self.singletons.len())
            .field("in_creation", &self.in_creation.len())
            .finish()
    }
}

/// Clears an in-creation mark on drop
pub(crate) struct CreationGuard<'a> {
    set: &'a DashSet<Marker, RandomState>,
    marker: Option<Marker>,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        if let Some(marker) = self.marker.take() {
            self.set.remove(&marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BeanDefinition;

    struct Pool(u32);

    fn pool(id: u32) -> BeanDescriptor {
        BeanDefinition::instance(Pool(id)).into_descriptor()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::with_capacity(0);
        let registered = registry.register(pool(1)).unwrap();

        assert_eq!(registered.key().name(), "Pool");
        assert_eq!(registry.len(), 1);
        assert!(registry.descriptor(registered.key()).is_some());
        assert!(registry.singleton_for(registered.key()).is_some());
    }

    #[test]
    fn test_duplicate_explicit_name() {
        let registry = Registry::with_capacity(0);
        registry
            .register(BeanDefinition::instance(1u32).named("shared").into_descriptor())
            .unwrap();

        let err = registry
            .register(BeanDefinition::instance(Pool(0)).named("shared").into_descriptor())
            .unwrap_err();
        assert!(matches!(err, DiError::DuplicateBeanName { ref name, .. } if name == "shared"));
    }

    #[test]
    fn test_explicit_name_clashing_with_default_name() {
        let registry = Registry::with_capacity(0);
        registry.register(pool(1)).unwrap();

        let err = registry
            .register(BeanDefinition::instance(7u8).named("Pool").into_descriptor())
            .unwrap_err();
        assert!(matches!(err, DiError::DuplicateBeanName { .. }));
    }

    #[test]
    fn test_default_name_clashing_with_explicit_name() {
        let registry = Registry::with_capacity(0);
        registry
            .register(BeanDefinition::instance(7u8).named("Pool").into_descriptor())
            .unwrap();

        let err = registry.register(pool(1)).unwrap_err();
        assert!(matches!(err, DiError::DuplicateBeanName { ref name, .. } if name == "Pool"));
    }

    #[test]
    fn test_default_names_of_different_types() {
        mod other {
            pub struct Pool;
        }

        let registry = Registry::with_capacity(0);
        registry.register(pool(1)).unwrap();
        registry
            .register(BeanDefinition::instance(other::Pool).into_descriptor())
            .unwrap();
        assert_eq!(registry.candidates_for(TypeId::of::<Pool>(), Some("Pool")).len(), 1);
    }

    #[test]
    fn test_same_type_same_default_name() {
        let registry = Registry::with_capacity(0);
        registry.register(pool(1)).unwrap();
        assert!(registry.register(pool(2)).is_err());
    }

    #[test]
    fn test_candidates_in_registration_order() {
        let registry = Registry::with_capacity(0);
        for name in ["c", "a", "b"] {
            registry
                .register(BeanDefinition::instance(Pool(0)).named(name).into_descriptor())
                .unwrap();
        }

        let names: Vec<_> = registry
            .candidates_for(TypeId::of::<Pool>(), None)
            .iter()
            .map(|d| d.key().name().to_owned())
            .collect();
        assert_eq!(names, ["c", "a", "b"]);

        assert_eq!(registry.candidates_for(TypeId::of::<Pool>(), Some("a")).len(), 1);
        assert!(registry.candidates_for(TypeId::of::<String>(), None).is_empty());
    }

    #[test]
    fn test_failed_create_leaves_cell_empty() {
        let registry = Registry::with_capacity(0);
        let key = BeanKey::of::<Pool>("Pool");

        let err = registry.get_or_create_singleton(&key, || Err(DiError::Internal("nope".into())));
        assert!(err.is_err());
        assert!(registry.singleton_for(&key).is_none());

        let created = registry
            .get_or_create_singleton(&key, || Ok(Arc::new(Pool(3)) as AnyArc))
            .unwrap();
        assert_eq!(created.downcast::<Pool>().unwrap().0, 3);
        assert!(!registry.cache_singleton(&key, Arc::new(Pool(4))));
    }

    #[test]
    fn test_creation_guard_unmarks() {
        let registry = Registry::with_capacity(0);
        let key = BeanKey::of::<Pool>("Pool");
        {
            let _guard = registry.mark_in_creation(&key);
            assert!(registry.is_in_creation(&key));
        }
        assert!(!registry.is_in_creation(&key));
    }

    #[test]
    fn test_marks_are_per_thread() {
        let registry = Registry::with_capacity(0);
        let key = BeanKey::of::<Pool>("Pool");
        let _guard = registry.mark_in_creation(&key);

        std::thread::scope(|s| {
            s.spawn(|| assert!(!registry.is_in_creation(&key)));
        });
    }
}
