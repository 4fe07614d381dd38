//! The bean container
//!
//! The `Container` owns the registry, runs the startup sequence and
//! resolves beans by type, by type and qualifier name, or as the list of all
//! beans assignable to a type.
//!
//! Startup runs in fixed phases:
//!
//! 1. discovery fills a catalog
//! 2. before-population hooks run, seeing only the discovery session
//! 3. every discovered descriptor is registered (population)
//! 4. after-population hooks run, resolving whatever they declare
//! 5. the container is ready and no longer accepts registrations
//!
//! Instantiation is lazy: nothing is built until it is first requested.

use crate::binder::{BindReport, Binder, Configurable};
use crate::descriptor::{BeanDefinition, BeanDescriptor};
use crate::discovery::{Catalog, Discovery, DiscoverySession};
use crate::hooks::{self, HookPhase};
use crate::key::BeanKey;
use crate::property::{MapPropertySource, PropertySource};
use crate::provider::{AnyArc, Injectable, Scope};
use crate::resolver;
use crate::resolvable::Resolvable;
use crate::storage::Registry;
use crate::{DiError, Result};
use once_cell::sync::OnceCell;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, info, trace, warn};

// =============================================================================
// Policies and state
// =============================================================================

/// Which scopes take part in cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Singletons and prototypes are both marked while being created, so a
    /// prototype that reaches itself again is reported instead of
    /// recursing without bound.
    #[default]
    AllScopes,
    /// Only singletons are marked. A prototype cycle is reported at the
    /// first singleton on the loop, or not at all if it has none.
    SingletonOnly,
}

/// Lifecycle of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContainerState {
    Uninitialized = 0,
    Discovering = 1,
    BeforeHooks = 2,
    Populated = 3,
    AfterHooks = 4,
    Ready = 5,
    Failed = 6,
}

impl ContainerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Discovering,
            2 => Self::BeforeHooks,
            3 => Self::Populated,
            4 => Self::AfterHooks,
            5 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Discovering => "discovering",
            Self::BeforeHooks => "before-hooks",
            Self::Populated => "populated",
            Self::AfterHooks => "after-hooks",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Container
// =============================================================================

struct Inner {
    registry: Registry,
    properties: Box<dyn PropertySource>,
    cycle_policy: CyclePolicy,
    state: AtomicU8,
    session: OnceCell<DiscoverySession>,
}

/// Bean container.
///
/// Cheap to clone; clones share the same registry.
///
/// # Examples
///
/// ```rust
/// use bean_context::{BeanDefinition, Container};
/// use std::sync::Arc;
///
/// struct Repository;
/// struct Service {
///     repo: Arc<Repository>,
/// }
///
/// let container = Container::new();
/// container.register(BeanDefinition::from_fn(|| Repository)).unwrap();
/// container
///     .register(BeanDefinition::constructor(|repo: Arc<Repository>| Service { repo }))
///     .unwrap();
///
/// let service = container.get::<Service>().unwrap();
/// let repo = container.get::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&service.repo, &repo));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

/// Builder for a [`Container`]
pub struct ContainerBuilder {
    properties: Option<Box<dyn PropertySource>>,
    cycle_policy: CyclePolicy,
    capacity: usize,
}

impl ContainerBuilder {
    /// Property source used to bind configuration beans
    pub fn properties(mut self, source: impl PropertySource + 'static) -> Self {
        self.properties = Some(Box::new(source));
        self
    }

    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Expected number of beans
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "bean_context",
            cycle_policy = ?self.cycle_policy,
            capacity = self.capacity,
            "Creating bean container"
        );

        Container {
            inner: Arc::new(Inner {
                registry: Registry::with_capacity(self.capacity),
                properties: self
                    .properties
                    .unwrap_or_else(|| Box::new(MapPropertySource::new())),
                cycle_policy: self.cycle_policy,
                state: AtomicU8::new(ContainerState::Uninitialized as u8),
                session: OnceCell::new(),
            }),
        }
    }
}

impl Container {
    /// Create a container with no properties and the default cycle policy.
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder {
            properties: None,
            cycle_policy: CyclePolicy::default(),
            capacity: 0,
        }
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Run discovery, hooks and population.
    ///
    /// Only the first call does anything; later calls fail with
    /// [`DiError::AlreadyInitialized`]. Any failure leaves the container in
    /// [`ContainerState::Failed`].
    pub fn initialize(&self, discovery: &dyn Discovery) -> Result<()> {
        self.inner
            .state
            .compare_exchange(
                ContainerState::Uninitialized as u8,
                ContainerState::Discovering as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| DiError::AlreadyInitialized)?;

        #[cfg(feature = "logging")]
        info!(
            target: "bean_context",
            root = discovery.root(),
            "Initializing bean container"
        );

        match self.start(discovery) {
            Ok(()) => {
                self.set_state(ContainerState::Ready);

                #[cfg(feature = "logging")]
                info!(
                    target: "bean_context",
                    root = discovery.root(),
                    bean_count = self.len(),
                    "Bean container ready"
                );
                Ok(())
            }
            Err(err) => {
                self.set_state(ContainerState::Failed);

                #[cfg(feature = "logging")]
                warn!(
                    target: "bean_context",
                    root = discovery.root(),
                    error = %err,
                    "Bean container startup failed"
                );
                Err(err)
            }
        }
    }

    fn start(&self, discovery: &dyn Discovery) -> Result<()> {
        let mut catalog = Catalog::new();
        discovery.discover(&mut catalog)?;

        let session = DiscoverySession::new(discovery.root(), &catalog);
        if self.inner.session.set(session.clone()).is_err() {
            return Err(DiError::Internal("discovery session set twice".into()));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_context",
            root = discovery.root(),
            bean_count = session.beans().len(),
            modules = session.modules().len(),
            "Discovery complete"
        );

        let (beans, before, after) = catalog.into_parts();

        self.set_state(ContainerState::BeforeHooks);
        hooks::run_all(HookPhase::Before, before, self)?;

        for descriptor in beans {
            self.admit(descriptor)?;
        }
        self.inner
            .registry
            .register(BeanDefinition::instance(session).into_descriptor())?;
        self.set_state(ContainerState::Populated);

        self.set_state(ContainerState::AfterHooks);
        hooks::run_all(HookPhase::After, after, self)?;

        Ok(())
    }

    #[inline]
    fn set_state(&self, state: ContainerState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn state(&self) -> ContainerState {
        ContainerState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether registrations are refused: once ready, or after a failed start
    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(self.state(), ContainerState::Ready | ContainerState::Failed)
    }

    /// The discovery session, once discovery has run
    pub fn session(&self) -> Option<DiscoverySession> {
        self.inner.session.get().cloned()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a bean outside of discovery.
    ///
    /// Allowed until the container is ready.
    pub fn register<T: Injectable>(&self, definition: BeanDefinition<T>) -> Result<BeanKey> {
        self.register_descriptor(definition.into_descriptor())
    }

    /// Register a ready instance under its default name
    pub fn register_instance<T: Injectable>(&self, instance: T) -> Result<BeanKey> {
        self.register(BeanDefinition::instance(instance))
    }

    /// Register an erased descriptor
    pub fn register_descriptor(&self, descriptor: BeanDescriptor) -> Result<BeanKey> {
        if self.is_locked() {
            return Err(DiError::Locked);
        }
        let registered = self.admit(descriptor)?;
        Ok(registered.key().clone())
    }

    /// Prepare pending instances, then hand the descriptor to the registry
    fn admit(&self, descriptor: BeanDescriptor) -> Result<Arc<BeanDescriptor>> {
        let descriptor = descriptor.prepare(self)?;
        self.inner.registry.register(descriptor)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the single bean assignable to `I`.
    ///
    /// With several candidates the one flagged primary wins.
    #[inline]
    pub fn get<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        self.resolve_as::<I>(None)
    }

    /// Resolve a bean assignable to `I`, preferring the one named `name`.
    #[inline]
    pub fn get_named<I: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<I>> {
        self.resolve_as::<I>(Some(name))
    }

    /// Like [`get`](Self::get), but `None` on any failure
    #[inline]
    pub fn try_get<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.get::<I>().ok()
    }

    /// Resolve any injectable argument shape: `Qualified`, `BeanSet`,
    /// `Option<Arc<T>>` or a tuple of them.
    #[inline]
    pub fn resolve<R: Resolvable>(&self) -> Result<R> {
        R::resolve(self)
    }

    /// Every bean assignable to `I`, in registration order
    pub fn get_all<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<I>>> {
        self.inner
            .registry
            .candidates_for(TypeId::of::<I>(), None)
            .iter()
            .map(|descriptor| self.instance_as::<I>(descriptor))
            .collect()
    }

    /// Key of the bean a request for `I` (and `name`) would resolve to
    pub fn resolve_key<I: ?Sized + 'static>(&self, name: Option<&str>) -> Result<BeanKey> {
        let candidates = self.inner.registry.candidates_for(TypeId::of::<I>(), None);
        resolver::select(type_name::<I>(), name, &candidates).map(|d| d.key().clone())
    }

    /// Whether anything is registered that can be resolved as `I`
    pub fn contains<I: ?Sized + 'static>(&self) -> bool {
        TypeId::of::<I>() == TypeId::of::<Container>()
            || !self
                .inner
                .registry
                .candidates_for(TypeId::of::<I>(), None)
                .is_empty()
    }

    fn resolve_as<I: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>) -> Result<Arc<I>> {
        if let Some(handle) = self.self_as::<I>() {
            return Ok(handle);
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "bean_context",
            requested = type_name::<I>(),
            qualifier = name,
            "Resolving bean"
        );

        let candidates = self.inner.registry.candidates_for(TypeId::of::<I>(), None);
        let descriptor = resolver::select(type_name::<I>(), name, &candidates)?;
        self.instance_as::<I>(&descriptor)
    }

    /// The container itself, when `I` is `Container`
    fn self_as<I: ?Sized + 'static>(&self) -> Option<Arc<I>> {
        if TypeId::of::<I>() != TypeId::of::<Container>() {
            return None;
        }
        let handle: Box<dyn Any> = Box::new(Arc::new(self.clone()));
        handle.downcast::<Arc<I>>().ok().map(|boxed| *boxed)
    }

    fn instance_as<I: ?Sized + Send + Sync + 'static>(&self, descriptor: &Arc<BeanDescriptor>) -> Result<Arc<I>> {
        let instance = self.instantiate(descriptor)?;
        descriptor.view::<I>(instance).ok_or_else(|| {
            DiError::Internal(format!(
                "bean {} cannot be viewed as {}",
                descriptor.key(),
                type_name::<I>()
            ))
        })
    }

    /// Produce an instance for a registered descriptor, honoring its scope
    /// and the in-creation marks.
    fn instantiate(&self, descriptor: &Arc<BeanDescriptor>) -> Result<AnyArc> {
        let registry = &self.inner.registry;
        let key = descriptor.key();

        if registry.is_in_creation(key) {
            #[cfg(feature = "logging")]
            debug!(
                target: "bean_context",
                bean = key.name(),
                bean_type = key.type_name(),
                "Circular dependency detected"
            );
            return Err(DiError::circular(key));
        }

        match descriptor.scope() {
            Scope::Prototype => {
                let _guard = match self.inner.cycle_policy {
                    CyclePolicy::AllScopes => Some(registry.mark_in_creation(key)),
                    CyclePolicy::SingletonOnly => None,
                };
                self.create(descriptor)
            }
            Scope::Singleton => {
                if let Some(instance) = registry.singleton_for(key) {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "bean_context",
                        bean = key.name(),
                        location = "singleton_cache",
                        "Bean resolved from cache"
                    );
                    return Ok(instance);
                }
                let _guard = registry.mark_in_creation(key);
                registry.get_or_create_singleton(key, || self.create(descriptor))
            }
        }
    }

    fn create(&self, descriptor: &BeanDescriptor) -> Result<AnyArc> {
        #[cfg(feature = "logging")]
        debug!(
            target: "bean_context",
            bean = descriptor.key().name(),
            bean_type = descriptor.key().type_name(),
            scope = %descriptor.scope(),
            "Creating bean instance"
        );

        descriptor.factory().create(self, descriptor.key())
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Bind properties into `target` below its prefix.
    ///
    /// Values that do not convert are logged and skipped.
    pub fn bind_configuration<T: Configurable>(&self, target: &mut T) -> BindReport {
        let report = Binder::new(self.inner.properties.as_ref()).bind(target);

        #[cfg(feature = "logging")]
        {
            for failure in report.failures() {
                warn!(
                    target: "bean_context",
                    key = %failure.key,
                    error = %failure.error,
                    "Failed to bind configuration property"
                );
            }
            for prefix in report.skipped() {
                warn!(
                    target: "bean_context",
                    prefix = %prefix,
                    "Skipped nested configuration without a default constructor"
                );
            }
            debug!(
                target: "bean_context",
                configuration = type_name::<T>(),
                prefix = T::prefix(),
                applied = report.applied().len(),
                "Bound configuration bean"
            );
        }

        report
    }

    /// The property source configuration beans are bound from
    pub fn properties(&self) -> &dyn PropertySource {
        self.inner.properties.as_ref()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Registered descriptors in registration order
    pub fn descriptors(&self) -> Vec<Arc<BeanDescriptor>> {
        self.inner.registry.descriptors()
    }

    /// Descriptor registered under `key`
    pub fn descriptor(&self, key: &BeanKey) -> Option<Arc<BeanDescriptor>> {
        self.inner.registry.descriptor(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn cycle_policy(&self) -> CyclePolicy {
        self.inner.cycle_policy
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("state", &self.state())
            .field("cycle_policy", &self.inner.cycle_policy)
            .field("registry", &self.inner.registry)
            .finish()
    }
}
