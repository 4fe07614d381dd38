//! Provider traits and contract views
//!
//! These define what can be registered as a bean, how long an instance
//! lives, and which types a bean can be resolved as.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// Type-erased bean instance
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can be registered as beans.
///
/// Automatically implemented for every `Send + Sync + 'static` type.
pub trait Injectable: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Injectable for T {}

/// Bean scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One instance, created on first resolution and cached for the
    /// lifetime of the container
    #[default]
    Singleton,

    /// New instance on every resolution; the caller owns it
    Prototype,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Prototype => f.write_str("prototype"),
        }
    }
}

type Upcast = Arc<dyn Fn(AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// A type a bean is assignable to.
///
/// Every bean is assignable to its own concrete type. Further contracts,
/// usually trait objects, are declared with
/// [`BeanDefinition::implements`](crate::BeanDefinition::implements) and
/// carry the conversion from the concrete `Arc<T>` to `Arc<I>`.
#[derive(Clone)]
pub struct Contract {
    type_id: TypeId,
    type_name: &'static str,
    upcast: Upcast,
}

impl Contract {
    /// Identity contract of the concrete type `T`
    pub(crate) fn concrete<T: Injectable>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            upcast: Arc::new(|instance: AnyArc| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Box::new(typed) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// View of a `T` bean as `I`
    pub(crate) fn view<T, I, F>(cast: F) -> Self
    where
        T: Injectable,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            upcast: Arc::new(move |instance: AnyArc| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Box::new(cast(typed)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Convert a stored instance into the contract type.
    ///
    /// Returns `None` when `I` is not this contract's type or the instance
    /// was not produced by the owning descriptor.
    pub(crate) fn apply<I: ?Sized + Send + Sync + 'static>(&self, instance: AnyArc) -> Option<Arc<I>> {
        if self.type_id != TypeId::of::<I>() {
            return None;
        }
        (self.upcast)(instance)?
            .downcast::<Arc<I>>()
            .ok()
            .map(|boxed| *boxed)
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("type_name", &self.type_name)
            .finish()
    }
}
