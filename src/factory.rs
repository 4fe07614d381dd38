//! Factory kinds for creating bean instances
//!
//! A bean is produced in one of three ways: it was handed over as a ready
//! instance, it is built by a constructor function from its declared
//! arguments, or it is the result of a provider method called on a freshly
//! built host value.
//!
//! The typed producers are erased into [`BeanFactory`] when a definition
//! becomes a descriptor, so the registry stores one enum regardless of the
//! bean's type.

use crate::container::Container;
use crate::error::{BoxError, DiError, Result};
use crate::key::BeanKey;
use crate::provider::{AnyArc, Injectable};
use crate::resolvable::Resolvable;
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "logging")]
use tracing::trace;

/// Typed producer: resolves the declared arguments and runs the body
pub(crate) type Produce<T> = Arc<dyn Fn(&Container, &BeanKey) -> Result<T> + Send + Sync>;

/// Runs on the fresh instance before it is shared
pub(crate) type PostConstruct<T> = Arc<dyn Fn(&mut T, &Container) + Send + Sync>;

type CreateFn = Arc<dyn Fn(&Container, &BeanKey) -> Result<AnyArc> + Send + Sync>;

/// How a descriptor's instances come to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    /// A ready instance supplied at registration
    Instance,
    /// A constructor function
    Constructor,
    /// A provider method on the named host type
    Method { host: &'static str },
}

impl fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryKind::Instance => f.write_str("instance"),
            FactoryKind::Constructor => f.write_str("constructor"),
            FactoryKind::Method { host } => write!(f, "method on {host}"),
        }
    }
}

/// Type-erased factory stored in a descriptor
#[derive(Clone)]
pub(crate) enum BeanFactory {
    Instance(AnyArc),
    /// An instance still to be prepared, turned into `Instance` on
    /// registration with a container
    Pending(CreateFn),
    Constructor(CreateFn),
    Method { host: &'static str, create: CreateFn },
}

impl BeanFactory {
    /// Produce an instance for `key`.
    pub(crate) fn create(&self, container: &Container, key: &BeanKey) -> Result<AnyArc> {
        #[cfg(feature = "logging")]
        trace!(
            target: "bean_context",
            bean = key.name(),
            factory = %self.kind(),
            "Invoking bean factory"
        );

        match self {
            BeanFactory::Instance(instance) => Ok(Arc::clone(instance)),
            BeanFactory::Pending(create) => create(container, key),
            BeanFactory::Constructor(create) => create(container, key),
            BeanFactory::Method { create, .. } => create(container, key),
        }
    }

    /// Ready instance, if the bean was registered as one
    #[inline]
    pub(crate) fn instance(&self) -> Option<&AnyArc> {
        match self {
            BeanFactory::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> FactoryKind {
        match self {
            BeanFactory::Instance(_) | BeanFactory::Pending(_) => FactoryKind::Instance,
            BeanFactory::Constructor(_) => FactoryKind::Constructor,
            BeanFactory::Method { host, .. } => FactoryKind::Method { host },
        }
    }
}

// =============================================================================
// Typed producers
// =============================================================================

/// Producer handing out `value` once. Later calls fail.
pub(crate) fn take_once<T: Injectable>(value: T) -> Produce<T> {
    let slot = Mutex::new(Some(value));
    Arc::new(move |_container, key| {
        slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| DiError::Internal(format!("instance for bean {key} was already taken")))
    })
}

/// Producer for a constructor that cannot fail
pub(crate) fn constructor<T, D, F>(f: F) -> Produce<T>
where
    T: Injectable,
    D: Resolvable,
    F: Fn(D) -> T + Send + Sync + 'static,
{
    Arc::new(move |container, _key| {
        let args = D::resolve(container)?;
        Ok(f(args))
    })
}

/// Producer for a fallible constructor. Body errors become
/// [`DiError::FactoryInvocation`]; resolution errors of the arguments pass
/// through unchanged.
pub(crate) fn try_constructor<T, D, F>(f: F) -> Produce<T>
where
    T: Injectable,
    D: Resolvable,
    F: Fn(D) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
{
    Arc::new(move |container, key| {
        let args = D::resolve(container)?;
        f(args).map_err(|source| DiError::factory_failed(key.name(), source))
    })
}

/// Producer for a provider method on a host built by `construct`.
///
/// The host is built before the arguments are resolved.
pub(crate) fn method<H, T, D, F>(construct: fn() -> Option<H>, f: F) -> Produce<T>
where
    H: 'static,
    T: Injectable,
    D: Resolvable,
    F: Fn(&H, D) -> T + Send + Sync + 'static,
{
    Arc::new(move |container, key| {
        let host = construct().ok_or_else(|| {
            DiError::factory(
                key.name(),
                format!(
                    "{} must have a zero-argument constructor to host bean methods",
                    type_name::<H>()
                ),
            )
        })?;
        let args = D::resolve(container)?;
        Ok(f(&host, args))
    })
}

/// Erase a typed producer, applying `post` to each fresh instance.
pub(crate) fn erase<T: Injectable>(produce: Produce<T>, post: Option<PostConstruct<T>>) -> CreateFn {
    Arc::new(move |container, key| {
        let mut bean = produce(container, key)?;
        if let Some(post) = &post {
            post(&mut bean, container);
        }
        Ok(Arc::new(bean) as AnyArc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    #[derive(Default)]
    struct Config;

    impl Config {
        fn counter(&self) -> Counter {
            Counter(7)
        }
    }

    struct Orphan;

    #[test]
    fn test_constructor_without_args() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("Counter");
        let create = erase(constructor(|_: ()| Counter(1)), None);

        let instance = create(&container, &key).unwrap();
        assert_eq!(instance.downcast::<Counter>().unwrap().0, 1);
    }

    #[test]
    fn test_post_construct_runs_before_sharing() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("Counter");
        let post: PostConstruct<Counter> = Arc::new(|c: &mut Counter, _: &Container| c.0 += 10);
        let create = erase(constructor(|_: ()| Counter(1)), Some(post));

        let instance = create(&container, &key).unwrap();
        assert_eq!(instance.downcast::<Counter>().unwrap().0, 11);
    }

    #[test]
    fn test_body_failure_becomes_factory_invocation() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("Counter");
        let produce = try_constructor(|_: ()| -> std::result::Result<Counter, BoxError> {
            Err("disk full".into())
        });

        let err = match produce(&container, &key) {
            Err(err) => err,
            Ok(_) => panic!("factory should fail"),
        };
        assert!(matches!(err, DiError::FactoryInvocation { ref bean, .. } if bean == "Counter"));
    }

    #[test]
    fn test_argument_errors_pass_through() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("Counter");
        let produce = constructor(|_: Arc<Orphan>| Counter(0));

        assert!(matches!(produce(&container, &key), Err(DiError::NoBeanFound { .. })));
    }

    #[test]
    fn test_method_on_host() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("counter");
        let produce = method(|| Some(Config), |config: &Config, _: ()| config.counter());

        assert!(matches!(produce(&container, &key), Ok(Counter(7))));
    }

    #[test]
    fn test_method_without_host_constructor() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("counter");
        let produce = method(|| None::<Orphan>, |_: &Orphan, _: ()| Counter(0));

        match produce(&container, &key) {
            Err(DiError::FactoryInvocation { reason, .. }) => {
                assert!(reason.contains("zero-argument constructor"));
            }
            _ => panic!("expected factory invocation error"),
        }
    }

    #[test]
    fn test_take_once() {
        let container = Container::new();
        let key = BeanKey::of::<Counter>("Counter");
        let produce = take_once(Counter(5));

        assert!(matches!(produce(&container, &key), Ok(Counter(5))));
        assert!(matches!(produce(&container, &key), Err(DiError::Internal(_))));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FactoryKind::Constructor.to_string(), "constructor");
        assert_eq!(FactoryKind::Method { host: "Config" }.to_string(), "method on Config");
    }
}
