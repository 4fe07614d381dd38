//! Declared dependencies
//!
//! A factory or hook declares what it needs through its argument type.
//! Every argument type implements [`Resolvable`], which both describes the
//! formal parameter ([`Param`]) and knows how to satisfy it from a
//! [`Container`].
//!
//! # Supported Parameter Types
//!
//! - `Arc<T>` / `Arc<dyn Trait>` - single bean, no qualifier
//! - `Qualified<T, Q>` - single bean selected by the qualifier name `Q::NAME`
//! - `Option<Arc<T>>` - single bean, `None` when nothing is registered
//! - `Vec<Arc<T>>` - every bean assignable to `T`, in discovery order
//! - `BeanSet<T>` - every bean assignable to `T`, deduplicated
//! - `Container` - the container handle itself
//! - `DiscoverySession` - the session produced by discovery
//! - `()` and tuples of the above (up to 12)
//!
//! # Example
//!
//! ```rust
//! use bean_context::{qualifier, BeanDefinition, Qualified};
//! use std::sync::Arc;
//!
//! struct Pool;
//! struct Cache;
//! struct Repository {
//!     pool: Arc<Pool>,
//!     cache: Arc<Cache>,
//! }
//!
//! qualifier!(Replica = "replica");
//!
//! let repo = BeanDefinition::constructor(
//!     |(pool, cache): (Qualified<Pool, Replica>, Arc<Cache>)| Repository {
//!         pool: pool.into_inner(),
//!         cache,
//!     },
//! );
//! assert_eq!(repo.params().len(), 2);
//! ```

use crate::discovery::DiscoverySession;
use crate::{Container, DiError, Result};
use std::any::type_name;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

// =============================================================================
// Parameter descriptions
// =============================================================================

/// Description of one formal parameter of a factory or hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// A single bean of the given contract, optionally qualified by name
    Bean {
        type_name: &'static str,
        qualifier: Option<&'static str>,
    },
    /// A single bean that may be absent
    Optional { type_name: &'static str },
    /// Every bean assignable to the element type, in discovery order
    Sequence { element: &'static str },
    /// Every bean assignable to the element type, deduplicated
    Set { element: &'static str },
    /// The container handle
    Container,
    /// The discovery session
    Session,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Bean {
                type_name,
                qualifier: Some(name),
            } => write!(f, "{type_name} @ {name}"),
            Param::Bean { type_name, .. } => f.write_str(type_name),
            Param::Optional { type_name } => write!(f, "Option<{type_name}>"),
            Param::Sequence { element } => write!(f, "Vec<{element}>"),
            Param::Set { element } => write!(f, "BeanSet<{element}>"),
            Param::Container => f.write_str("Container"),
            Param::Session => f.write_str("DiscoverySession"),
        }
    }
}

// =============================================================================
// Resolvable
// =============================================================================

/// Types that can be resolved from a container as factory or hook arguments.
pub trait Resolvable: Sized {
    /// Resolve the argument.
    fn resolve(container: &Container) -> Result<Self>;

    /// Formal parameters this argument stands for.
    fn params() -> Vec<Param>;
}

impl Resolvable for () {
    #[inline]
    fn resolve(_container: &Container) -> Result<Self> {
        Ok(())
    }

    fn params() -> Vec<Param> {
        Vec::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for Arc<T> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        container.get::<T>()
    }

    fn params() -> Vec<Param> {
        vec![Param::Bean {
            type_name: type_name::<T>(),
            qualifier: None,
        }]
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for Option<Arc<T>> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        match container.get::<T>() {
            Ok(bean) => Ok(Some(bean)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn params() -> Vec<Param> {
        vec![Param::Optional {
            type_name: type_name::<T>(),
        }]
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for Vec<Arc<T>> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        container.get_all::<T>()
    }

    fn params() -> Vec<Param> {
        vec![Param::Sequence {
            element: type_name::<T>(),
        }]
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for BeanSet<T> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        Ok(container.get_all::<T>()?.into_iter().collect())
    }

    fn params() -> Vec<Param> {
        vec![Param::Set {
            element: type_name::<T>(),
        }]
    }
}

impl<T: ?Sized + Send + Sync + 'static, Q: Qualifier> Resolvable for Qualified<T, Q> {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        Ok(Qualified {
            bean: container.get_named::<T>(Q::NAME)?,
            _qualifier: PhantomData,
        })
    }

    fn params() -> Vec<Param> {
        vec![Param::Bean {
            type_name: type_name::<T>(),
            qualifier: Some(Q::NAME),
        }]
    }
}

impl Resolvable for Container {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        Ok(container.clone())
    }

    fn params() -> Vec<Param> {
        vec![Param::Container]
    }
}

impl Resolvable for DiscoverySession {
    #[inline]
    fn resolve(container: &Container) -> Result<Self> {
        container
            .session()
            .ok_or_else(|| DiError::no_bean::<DiscoverySession>(None))
    }

    fn params() -> Vec<Param> {
        vec![Param::Session]
    }
}

// Tuple implementations (1-12 elements)
macro_rules! impl_resolvable_tuple {
    ($($T:ident),+) => {
        impl<$($T: Resolvable),+> Resolvable for ($($T,)+) {
            #[inline]
            fn resolve(container: &Container) -> Result<Self> {
                Ok(($($T::resolve(container)?,)+))
            }

            fn params() -> Vec<Param> {
                let mut params = Vec::new();
                $(params.extend($T::params());)+
                params
            }
        }
    };
}

impl_resolvable_tuple!(A);
impl_resolvable_tuple!(A, B);
impl_resolvable_tuple!(A, B, C);
impl_resolvable_tuple!(A, B, C, D);
impl_resolvable_tuple!(A, B, C, D, E);
impl_resolvable_tuple!(A, B, C, D, E, F);
impl_resolvable_tuple!(A, B, C, D, E, F, G);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_resolvable_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

// =============================================================================
// Qualifiers
// =============================================================================

/// A compile-time qualifier name. Usually declared with [`qualifier!`].
pub trait Qualifier: 'static {
    const NAME: &'static str;
}

/// Declare qualifier marker types.
///
/// ```rust
/// use bean_context::{qualifier, Qualifier};
///
/// qualifier!(Primary = "primaryDataSource", Replica = "replica");
/// assert_eq!(Replica::NAME, "replica");
/// ```
#[macro_export]
macro_rules! qualifier {
    ($($marker:ident = $name:literal),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy)]
            pub struct $marker;

            impl $crate::Qualifier for $marker {
                const NAME: &'static str = $name;
            }
        )+
    };
}

/// A single bean selected by the qualifier `Q`.
pub struct Qualified<T: ?Sized, Q> {
    bean: Arc<T>,
    _qualifier: PhantomData<fn() -> Q>,
}

impl<T: ?Sized, Q: Qualifier> Qualified<T, Q> {
    /// The qualifier name this argument was resolved with
    #[inline]
    pub fn name(&self) -> &'static str {
        Q::NAME
    }

    #[inline]
    pub fn into_inner(self) -> Arc<T> {
        self.bean
    }
}

impl<T: ?Sized, Q> Deref for Qualified<T, Q> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.bean
    }
}

impl<T: ?Sized, Q> Clone for Qualified<T, Q> {
    fn clone(&self) -> Self {
        Self {
            bean: Arc::clone(&self.bean),
            _qualifier: PhantomData,
        }
    }
}

// =============================================================================
// BeanSet
// =============================================================================

/// Set-typed injection: all beans of a contract, deduplicated by instance
/// identity. Iteration order carries no meaning.
pub struct BeanSet<T: ?Sized> {
    beans: Vec<Arc<T>>,
}

impl<T: ?Sized> BeanSet<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.beans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    /// Whether this exact instance is a member
    pub fn contains(&self, bean: &Arc<T>) -> bool {
        let wanted = identity(bean);
        self.beans.iter().any(|b| identity(b) == wanted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.beans.iter()
    }

    pub fn into_vec(self) -> Vec<Arc<T>> {
        self.beans
    }
}

fn identity<T: ?Sized>(bean: &Arc<T>) -> usize {
    Arc::as_ptr(bean) as *const u8 as usize
}

impl<T: ?Sized> FromIterator<Arc<T>> for BeanSet<T> {
    fn from_iter<It: IntoIterator<Item = Arc<T>>>(iter: It) -> Self {
        let mut seen = HashSet::new();
        let beans = iter
            .into_iter()
            .filter(|bean| seen.insert(identity(bean)))
            .collect();
        Self { beans }
    }
}

impl<T: ?Sized> IntoIterator for BeanSet<T> {
    type Item = Arc<T>;
    type IntoIter = std::vec::IntoIter<Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.beans.into_iter()
    }
}

impl<T: ?Sized> fmt::Debug for BeanSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanSet").field("len", &self.beans.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Plugin: Send + Sync {}
    struct PluginA;
    impl Plugin for PluginA {}

    qualifier!(Fast = "fast");

    #[test]
    fn test_params_of_tuple() {
        let params = <(Arc<PluginA>, Vec<Arc<dyn Plugin>>, Container)>::params();
        assert_eq!(params.len(), 3);
        assert!(matches!(params[1], Param::Sequence { .. }));
        assert_eq!(params[2], Param::Container);
    }

    #[test]
    fn test_qualified_param_carries_name() {
        let params = <Qualified<PluginA, Fast>>::params();
        assert_eq!(
            params,
            vec![Param::Bean {
                type_name: type_name::<PluginA>(),
                qualifier: Some("fast"),
            }]
        );
    }

    #[test]
    fn test_unit_has_no_params() {
        assert!(<()>::params().is_empty());
        assert_eq!(<DiscoverySession>::params(), vec![Param::Session]);
    }

    #[test]
    fn test_bean_set_deduplicates_by_identity() {
        let a: Arc<dyn Plugin> = Arc::new(PluginA);
        let b: Arc<dyn Plugin> = Arc::new(PluginA);

        let set: BeanSet<dyn Plugin> = vec![a.clone(), b.clone(), a.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
        assert!(set.contains(&b));
    }

    #[test]
    fn test_param_display() {
        let param = Param::Bean {
            type_name: "Pool",
            qualifier: Some("replica"),
        };
        assert_eq!(param.to_string(), "Pool @ replica");
    }
}
