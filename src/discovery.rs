//! Discovery: collecting bean definitions and hooks
//!
//! The container does not scan anything itself. A [`Discovery`]
//! implementation fills a [`Catalog`] with bean descriptors and startup
//! hooks; [`Application`] does so from a list of [`Module`]s.
//!
//! # Example
//!
//! ```rust
//! use bean_context::{Application, BeanDefinition, Catalog, Container, Module, Result};
//!
//! struct Clock;
//!
//! struct CoreModule;
//!
//! impl Module for CoreModule {
//!     fn configure(&self, catalog: &mut Catalog) -> Result<()> {
//!         catalog.bean(BeanDefinition::from_fn(|| Clock));
//!         Ok(())
//!     }
//! }
//!
//! let app = Application::new("demo").module(CoreModule);
//! let container = Container::new();
//! container.initialize(&app).unwrap();
//!
//! assert!(container.contains::<Clock>());
//! ```

use crate::descriptor::{BeanDefinition, BeanDescriptor};
use crate::error::{DiError, Result};
use crate::hooks::{HookEntry, HookPhase};
use crate::provider::{Injectable, Scope};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

// =============================================================================
// Catalog
// =============================================================================

/// Everything a discovery pass found.
#[derive(Default)]
pub struct Catalog {
    beans: Vec<BeanDescriptor>,
    before: Vec<HookEntry>,
    after: Vec<HookEntry>,
    modules: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bean definition
    pub fn bean<T: Injectable>(&mut self, definition: BeanDefinition<T>) -> &mut Self {
        self.beans.push(definition.into_descriptor());
        self
    }

    /// Add an already erased descriptor
    pub fn descriptor(&mut self, descriptor: BeanDescriptor) -> &mut Self {
        self.beans.push(descriptor);
        self
    }

    /// Add a startup hook.
    ///
    /// Fails with [`DiError::InvalidHook`] when a before-population hook
    /// declares arguments other than a `DiscoverySession`.
    pub fn hook(&mut self, hook: HookEntry) -> Result<&mut Self> {
        hook.validate()?;
        match hook.phase() {
            HookPhase::Before => self.before.push(hook),
            HookPhase::After => self.after.push(hook),
        }
        Ok(self)
    }

    /// Bean descriptors in discovery order
    pub fn beans(&self) -> &[BeanDescriptor] {
        &self.beans
    }

    pub fn hooks(&self, phase: HookPhase) -> &[HookEntry] {
        match phase {
            HookPhase::Before => &self.before,
            HookPhase::After => &self.after,
        }
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub(crate) fn into_parts(self) -> (Vec<BeanDescriptor>, Vec<HookEntry>, Vec<HookEntry>) {
        (self.beans, self.before, self.after)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("beans", &self.beans.len())
            .field("before_hooks", &self.before.len())
            .field("after_hooks", &self.after.len())
            .field("modules", &self.modules)
            .finish()
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Source of bean definitions and hooks for a container.
pub trait Discovery {
    /// Name of what is being discovered, used in logs and errors
    fn root(&self) -> &str;

    /// Fill `catalog`.
    fn discover(&self, catalog: &mut Catalog) -> Result<()>;
}

/// A group of related bean definitions and hooks.
pub trait Module {
    /// Add this module's beans and hooks.
    fn configure(&self, catalog: &mut Catalog) -> Result<()>;

    /// Module name, recorded in the discovery session. Unnamed modules may
    /// be included any number of times.
    fn name(&self) -> Option<&str> {
        Some(std::any::type_name::<Self>())
    }
}

impl<F> Module for F
where
    F: Fn(&mut Catalog) -> Result<()>,
{
    fn configure(&self, catalog: &mut Catalog) -> Result<()> {
        self(catalog)
    }

    fn name(&self) -> Option<&str> {
        None
    }
}

/// Session entry for modules without a name
const ANONYMOUS_MODULE: &str = "anonymous";

/// Discovery over an explicit list of modules.
pub struct Application {
    root: String,
    modules: Vec<Box<dyn Module>>,
}

impl Application {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            modules: Vec::new(),
        }
    }

    /// Include a module. Modules are configured in the order they are added.
    pub fn module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }
}

impl Discovery for Application {
    fn root(&self) -> &str {
        &self.root
    }

    fn discover(&self, catalog: &mut Catalog) -> Result<()> {
        let mut named: Vec<&str> = Vec::with_capacity(self.modules.len());
        for module in &self.modules {
            if let Some(name) = module.name() {
                if named.contains(&name) {
                    return Err(DiError::Discovery {
                        root: self.root.clone(),
                        reason: format!("module {name} included twice"),
                    });
                }
                named.push(name);
            }
            let name = module.name().unwrap_or(ANONYMOUS_MODULE);

            #[cfg(feature = "logging")]
            debug!(
                target: "bean_context",
                root = %self.root,
                module = name,
                "Configuring module"
            );

            module.configure(catalog)?;
            catalog.modules.push(name.to_owned());
        }
        Ok(())
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("root", &self.root)
            .field(
                "modules",
                &self
                    .modules
                    .iter()
                    .map(|m| m.name().unwrap_or(ANONYMOUS_MODULE))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

// =============================================================================
// DiscoverySession
// =============================================================================

/// What discovery found, as seen by before-population hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanSummary {
    pub name: String,
    pub type_name: &'static str,
    pub scope: Scope,
    pub primary: bool,
}

#[derive(Debug)]
struct SessionInner {
    root: String,
    modules: Vec<String>,
    beans: Vec<BeanSummary>,
    before_hooks: usize,
    after_hooks: usize,
}

/// Result of the discovery pass.
///
/// Passed to before-population hooks that ask for it and registered as a
/// singleton bean once population starts. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DiscoverySession {
    inner: Arc<SessionInner>,
}

impl DiscoverySession {
    pub(crate) fn new(root: &str, catalog: &Catalog) -> Self {
        let beans = catalog
            .beans
            .iter()
            .map(|d| BeanSummary {
                name: d.key().name().to_owned(),
                type_name: d.key().type_name(),
                scope: d.scope(),
                primary: d.is_primary(),
            })
            .collect();

        Self {
            inner: Arc::new(SessionInner {
                root: root.to_owned(),
                modules: catalog.modules.clone(),
                beans,
                before_hooks: catalog.before.len(),
                after_hooks: catalog.after.len(),
            }),
        }
    }

    pub fn root(&self) -> &str {
        &self.inner.root
    }

    pub fn modules(&self) -> &[String] {
        &self.inner.modules
    }

    /// Discovered beans, in discovery order
    pub fn beans(&self) -> &[BeanSummary] {
        &self.inner.beans
    }

    pub fn bean_named(&self, name: &str) -> Option<&BeanSummary> {
        self.inner.beans.iter().find(|b| b.name == name)
    }

    pub fn hook_count(&self, phase: HookPhase) -> usize {
        match phase {
            HookPhase::Before => self.inner.before_hooks,
            HookPhase::After => self.inner.after_hooks,
        }
    }
}
