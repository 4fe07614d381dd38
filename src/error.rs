//! Error types for bean registration, resolution and startup

use crate::hooks::HookPhase;
use crate::key::BeanKey;
use thiserror::Error;

/// Boxed error returned by factory and hook bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while registering, resolving or starting beans
#[derive(Error, Debug)]
pub enum DiError {
    /// Two descriptors claim the same bean name
    #[error("Duplicate bean name: {name} (type {type_name})")]
    DuplicateBeanName {
        name: String,
        type_name: &'static str,
    },

    /// No descriptor is assignable to the requested type
    #[error("No bean definition found for type {type_name}")]
    NoBeanFound {
        type_name: &'static str,
        qualifier: Option<String>,
    },

    /// Several candidates and no usable qualifier or primary flag
    #[error(
        "Multiple beans found for type {type_name} and none is marked as primary: {candidates:?}. \
         Use a qualifier to specify the bean name"
    )]
    AmbiguousBean {
        type_name: &'static str,
        candidates: Vec<String>,
    },

    /// Several candidates are flagged primary for the same request
    #[error("Multiple primary beans found for type {type_name}: {candidates:?}")]
    AmbiguousPrimary {
        type_name: &'static str,
        candidates: Vec<String>,
    },

    /// A bean was requested again while it was still being created
    #[error("Circular dependency detected for bean: {key}")]
    CircularDependency { key: BeanKey },

    /// The factory (or its provider-method host) failed
    #[error("Failed to create bean {bean}: {reason}")]
    FactoryInvocation {
        bean: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A before/after hook failed; startup is aborted
    #[error("Error executing {phase} hook {hook}")]
    HookExecution {
        phase: HookPhase,
        hook: String,
        #[source]
        source: BoxError,
    },

    /// A before-population hook declares parameters it cannot receive
    #[error("Invalid {phase} hook {hook}: {reason}")]
    InvalidHook {
        phase: HookPhase,
        hook: String,
        reason: String,
    },

    /// The discovery collaborator failed to produce a catalog
    #[error("Discovery failed for {root}: {reason}")]
    Discovery { root: String, reason: String },

    /// `initialize` was called on a container that already left `Uninitialized`
    #[error("Container has already been initialized")]
    AlreadyInitialized,

    /// Container is ready and cannot be modified
    #[error("Container is locked - cannot register new beans")]
    Locked,

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a NoBeanFound error for a type
    #[inline]
    pub fn no_bean<T: ?Sized + 'static>(qualifier: Option<&str>) -> Self {
        Self::NoBeanFound {
            type_name: std::any::type_name::<T>(),
            qualifier: qualifier.map(str::to_owned),
        }
    }

    /// Create a FactoryInvocation error without an underlying cause
    #[inline]
    pub fn factory(bean: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FactoryInvocation {
            bean: bean.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a FactoryInvocation error wrapping the factory body's error
    #[inline]
    pub fn factory_failed(bean: impl Into<String>, source: BoxError) -> Self {
        Self::FactoryInvocation {
            bean: bean.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(key: &BeanKey) -> Self {
        Self::CircularDependency { key: key.clone() }
    }

    /// Whether this error means "nothing registered for the type"
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoBeanFound { .. })
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, DiError>;
