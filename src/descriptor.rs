//! Bean definitions and descriptors
//!
//! [`BeanDefinition`] is the typed builder a module fills in. Adding it to a
//! [`Catalog`](crate::Catalog) (or registering it directly) turns it into a
//! type-erased [`BeanDescriptor`], which is what the registry stores.
//!
//! # Example
//!
//! ```rust
//! use bean_context::{BeanDefinition, Scope};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! let def = BeanDefinition::from_fn(|| English)
//!     .named("english")
//!     .primary()
//!     .implements::<dyn Greeter>(|e| e as Arc<dyn Greeter>);
//!
//! let descriptor = def.into_descriptor();
//! assert_eq!(descriptor.key().name(), "english");
//! assert_eq!(descriptor.scope(), Scope::Singleton);
//! assert!(descriptor.is_primary());
//! ```

use crate::binder::Configurable;
use crate::container::Container;
use crate::error::{BoxError, Result};
use crate::factory::{self, BeanFactory, FactoryKind, PostConstruct, Produce};
use crate::key::{default_name, BeanKey};
use crate::provider::{AnyArc, Contract, Injectable, Scope};
use crate::resolvable::{Param, Resolvable};
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// BeanDefinition
// =============================================================================

enum Source<T> {
    Instance(T),
    Produce {
        produce: Produce<T>,
        host: Option<&'static str>,
    },
}

/// Typed description of one bean.
pub struct BeanDefinition<T: Injectable> {
    name: Option<String>,
    scope: Scope,
    primary: bool,
    contracts: Vec<Contract>,
    params: Vec<Param>,
    source: Source<T>,
    post_construct: Option<PostConstruct<T>>,
    configuration_prefix: Option<&'static str>,
}

impl<T: Injectable> BeanDefinition<T> {
    fn with_source(source: Source<T>, params: Vec<Param>) -> Self {
        Self {
            name: None,
            scope: Scope::Singleton,
            primary: false,
            contracts: Vec::new(),
            params,
            source,
            post_construct: None,
            configuration_prefix: None,
        }
    }

    /// Bean built by a function without arguments
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::constructor(move |_: ()| f())
    }

    /// Bean built by a constructor function from its declared arguments.
    ///
    /// The argument type `D` is anything [`Resolvable`], usually a tuple.
    pub fn constructor<D, F>(f: F) -> Self
    where
        D: Resolvable + 'static,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        Self::with_source(
            Source::Produce {
                produce: factory::constructor(f),
                host: None,
            },
            D::params(),
        )
    }

    /// Bean built by a constructor that may fail
    pub fn try_constructor<D, F>(f: F) -> Self
    where
        D: Resolvable + 'static,
        F: Fn(D) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::with_source(
            Source::Produce {
                produce: factory::try_constructor(f),
                host: None,
            },
            D::params(),
        )
    }

    /// Bean produced by a provider method on a `Default` host.
    ///
    /// The bean is named after the method unless renamed with
    /// [`named`](Self::named). A fresh host is built for every invocation.
    pub fn method<H, D, F>(method: &str, f: F) -> Self
    where
        H: Default + 'static,
        D: Resolvable + 'static,
        F: Fn(&H, D) -> T + Send + Sync + 'static,
    {
        Self::method_on(|| Some(H::default()), method, f)
    }

    /// Provider method whose host is built by `construct`.
    pub fn method_on<H, D, F>(construct: fn() -> Option<H>, method: &str, f: F) -> Self
    where
        H: 'static,
        D: Resolvable + 'static,
        F: Fn(&H, D) -> T + Send + Sync + 'static,
    {
        let mut def = Self::with_source(
            Source::Produce {
                produce: factory::method(construct, f),
                host: Some(type_name::<H>()),
            },
            D::params(),
        );
        def.name = Some(method.to_owned());
        def
    }

    /// A ready instance. Always singleton scoped.
    ///
    /// With [`bind_configuration`](Self::bind_configuration) the instance is
    /// bound once, when it is registered with a container.
    pub fn instance(value: T) -> Self {
        Self::with_source(Source::Instance(value), Vec::new())
    }

    /// Explicit bean name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `scope(Scope::Prototype)`
    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    /// Prefer this bean when several match an unqualified request
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Make the bean resolvable as `I` as well, typically a trait object.
    pub fn implements<I>(mut self, cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.contracts.push(Contract::view::<T, I, _>(cast));
        self
    }

    /// Formal parameters of the factory
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Erase into a descriptor. Unnamed definitions get the default name of
    /// their type.
    pub fn into_descriptor(self) -> BeanDescriptor {
        let type_name = type_name::<T>();
        let explicit_name = self.name.is_some();
        let name = self
            .name
            .unwrap_or_else(|| default_name(type_name).to_owned());

        let mut contracts = Vec::with_capacity(self.contracts.len() + 1);
        contracts.push(Contract::concrete::<T>());
        contracts.extend(self.contracts);

        let (factory, scope) = match self.source {
            Source::Instance(instance) => {
                let factory = match self.post_construct {
                    None => BeanFactory::Instance(Arc::new(instance) as AnyArc),
                    Some(post) => BeanFactory::Pending(factory::erase(factory::take_once(instance), Some(post))),
                };
                (factory, Scope::Singleton)
            }
            Source::Produce { produce, host } => {
                let create = factory::erase(produce, self.post_construct);
                let factory = match host {
                    Some(host) => BeanFactory::Method { host, create },
                    None => BeanFactory::Constructor(create),
                };
                (factory, self.scope)
            }
        };

        BeanDescriptor {
            key: BeanKey::new(TypeId::of::<T>(), type_name, name),
            explicit_name,
            scope,
            primary: self.primary,
            contracts,
            params: self.params,
            factory,
            configuration_prefix: self.configuration_prefix,
            ordinal: 0,
        }
    }
}

impl<T: Injectable + Configurable> BeanDefinition<T> {
    /// Bind configuration properties into every fresh instance before it is
    /// shared, using the type's prefix.
    pub fn bind_configuration(mut self) -> Self {
        let bind: PostConstruct<T> = Arc::new(|bean: &mut T, container: &Container| {
            container.bind_configuration(bean);
        });
        self.post_construct = Some(bind);
        self.configuration_prefix = Some(T::prefix());
        self
    }
}

impl<T: Injectable + Configurable + Default> BeanDefinition<T> {
    /// A configuration bean: default-constructed, then bound.
    pub fn configuration() -> Self {
        Self::from_fn(T::default).bind_configuration()
    }
}

impl<T: Injectable> fmt::Debug for BeanDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("type", &type_name::<T>())
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .finish()
    }
}

// =============================================================================
// BeanDescriptor
// =============================================================================

/// Type-erased bean description held by the registry.
#[derive(Clone)]
pub struct BeanDescriptor {
    key: BeanKey,
    explicit_name: bool,
    scope: Scope,
    primary: bool,
    contracts: Vec<Contract>,
    params: Vec<Param>,
    factory: BeanFactory,
    configuration_prefix: Option<&'static str>,
    ordinal: usize,
}

impl BeanDescriptor {
    #[inline]
    pub fn key(&self) -> &BeanKey {
        &self.key
    }

    /// Whether the name was given explicitly rather than derived from the type
    #[inline]
    pub fn has_explicit_name(&self) -> bool {
        self.explicit_name
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[inline]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Names of every type the bean can be resolved as
    pub fn contracts(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.contracts.iter().map(Contract::type_name)
    }

    /// Whether the bean can be resolved as the type with `type_id`
    #[inline]
    pub fn is_assignable_to(&self, type_id: TypeId) -> bool {
        self.contracts.iter().any(|c| c.type_id() == type_id)
    }

    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[inline]
    pub fn factory_kind(&self) -> FactoryKind {
        self.factory.kind()
    }

    /// Property prefix, for configuration beans
    #[inline]
    pub fn configuration_prefix(&self) -> Option<&'static str> {
        self.configuration_prefix
    }

    /// Registration order, the order candidates are reported in
    #[inline]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[inline]
    pub(crate) fn set_ordinal(&mut self, ordinal: usize) {
        self.ordinal = ordinal;
    }

    #[inline]
    pub(crate) fn factory(&self) -> &BeanFactory {
        &self.factory
    }

    /// Turn a pending instance into a ready one against `container`.
    pub(crate) fn prepare(mut self, container: &Container) -> Result<Self> {
        if let BeanFactory::Pending(create) = &self.factory {
            let instance = create(container, &self.key)?;
            self.factory = BeanFactory::Instance(instance);
        }
        Ok(self)
    }

    /// View a produced instance as `I`
    pub(crate) fn view<I: ?Sized + Send + Sync + 'static>(&self, instance: AnyArc) -> Option<Arc<I>> {
        let wanted = TypeId::of::<I>();
        self.contracts
            .iter()
            .find(|c| c.type_id() == wanted)?
            .apply::<I>(instance)
    }
}

impl fmt::Debug for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDescriptor")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("factory", &self.factory.kind())
            .field("contracts", &self.contracts().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[derive(Default)]
    struct Shapes;

    #[test]
    fn test_default_name_from_type() {
        let descriptor = BeanDefinition::from_fn(|| Square).into_descriptor();
        assert_eq!(descriptor.key().name(), "Square");
        assert!(!descriptor.has_explicit_name());
        assert_eq!(descriptor.factory_kind(), FactoryKind::Constructor);
    }

    #[test]
    fn test_method_named_after_method() {
        let descriptor = BeanDefinition::method("unitSquare", |_: &Shapes, _: ()| Square).into_descriptor();
        assert_eq!(descriptor.key().name(), "unitSquare");
        assert!(descriptor.has_explicit_name());
        assert!(matches!(descriptor.factory_kind(), FactoryKind::Method { .. }));
    }

    #[test]
    fn test_instance_is_always_singleton() {
        let descriptor = BeanDefinition::instance(Square).prototype().into_descriptor();
        assert_eq!(descriptor.scope(), Scope::Singleton);
        assert!(descriptor.factory().instance().is_some());
    }

    #[test]
    fn test_contract_view() {
        let descriptor = BeanDefinition::instance(Square)
            .implements::<dyn Shape>(|s| s as Arc<dyn Shape>)
            .into_descriptor();

        assert!(descriptor.is_assignable_to(TypeId::of::<Square>()));
        assert!(descriptor.is_assignable_to(TypeId::of::<dyn Shape>()));
        assert!(!descriptor.is_assignable_to(TypeId::of::<String>()));

        let instance = descriptor.factory().instance().cloned().unwrap();
        let shape = descriptor.view::<dyn Shape>(instance).unwrap();
        assert_eq!(shape.sides(), 4);
    }

    #[derive(Default)]
    struct Limits {
        max: u32,
    }

    impl Configurable for Limits {
        fn prefix() -> &'static str {
            "limits"
        }

        fn bind(&mut self, binder: &mut crate::Binder<'_>, prefix: &str) {
            binder.scalar(&mut self.max, prefix, "max");
        }
    }

    #[test]
    fn test_bound_instance_is_prepared_once() {
        let container = Container::builder()
            .properties(crate::MapPropertySource::new().with("limits.max", "12"))
            .build();
        let descriptor = BeanDefinition::instance(Limits { max: 1 })
            .bind_configuration()
            .into_descriptor();
        assert_eq!(descriptor.factory_kind(), FactoryKind::Instance);
        assert!(descriptor.factory().instance().is_none());

        let prepared = descriptor.clone().prepare(&container).unwrap();
        let instance = prepared.factory().instance().cloned().unwrap();
        assert_eq!(instance.downcast::<Limits>().unwrap().max, 12);

        assert!(descriptor.prepare(&container).is_err());
    }

    #[test]
    fn test_params_recorded() {
        let def = BeanDefinition::constructor(|(_, _): (Arc<String>, Option<Arc<u32>>)| Square);
        assert_eq!(def.params().len(), 2);
        assert_eq!(def.into_descriptor().params().len(), 2);
    }
}
