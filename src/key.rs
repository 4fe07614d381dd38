//! Bean keys: the declared type plus the bean name.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a registered bean.
///
/// The name is always present once a descriptor is registered: an unnamed
/// definition receives [`default_name`] of its type.
#[derive(Clone)]
pub struct BeanKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Arc<str>,
}

impl BeanKey {
    pub(crate) fn new(type_id: TypeId, type_name: &'static str, name: impl Into<Arc<str>>) -> Self {
        Self {
            type_id,
            type_name,
            name: name.into(),
        }
    }

    /// Key for type `T` under `name`.
    pub fn of<T: 'static>(name: &str) -> Self {
        Self::new(TypeId::of::<T>(), std::any::type_name::<T>(), name)
    }

    /// TypeId of the declared (concrete) type
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full type name of the declared type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Bean name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn same_name(&self, name: &str) -> bool {
        &*self.name == name
    }
}

impl PartialEq for BeanKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for BeanKey {}

impl Hash for BeanKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for BeanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_name)
    }
}

impl fmt::Debug for BeanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanKey")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Default bean name derived from a type name: the last path segment with
/// generic arguments removed.
///
/// ```rust
/// use bean_context::default_name;
///
/// assert_eq!(default_name("app::db::Postgres"), "Postgres");
/// assert_eq!(default_name("app::Cache<alloc::string::String>"), "Cache");
/// assert_eq!(default_name("u32"), "u32");
/// ```
pub fn default_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Postgres;

    #[test]
    fn test_key_equality_ignores_type_name_text() {
        let a = BeanKey::of::<Postgres>("db");
        let b = BeanKey::new(TypeId::of::<Postgres>(), "renamed", "db");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_keys_differ_by_name() {
        assert_ne!(BeanKey::of::<Postgres>("primary"), BeanKey::of::<Postgres>("replica"));
    }

    #[test]
    fn test_default_name_of_generic_type() {
        assert_eq!(default_name(std::any::type_name::<Vec<Postgres>>()), "Vec");
        assert_eq!(default_name(std::any::type_name::<Postgres>()), "Postgres");
    }

    #[test]
    fn test_display() {
        let key = BeanKey::of::<Postgres>("db");
        assert!(key.to_string().starts_with("db ("));
    }
}
