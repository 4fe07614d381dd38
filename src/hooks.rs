//! Startup hooks
//!
//! Hooks run around container population. Before-population hooks see only
//! the [`DiscoverySession`](crate::DiscoverySession); after-population hooks
//! may declare any resolvable arguments and run once every bean is
//! registered.
//!
//! Each invocation gets a fresh host instance built by the hook's host
//! constructor. Hooks of one phase run in ascending `order`; equal orders
//! keep their discovery order.

use crate::container::Container;
use crate::error::{BoxError, DiError, Result};
use crate::resolvable::{Param, Resolvable};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Order given to hooks that do not set one
pub const DEFAULT_HOOK_ORDER: i32 = 100;

/// Return type of hook bodies
pub type HookResult = std::result::Result<(), BoxError>;

type InvokeFn = Arc<dyn Fn(&Container) -> HookResult + Send + Sync>;

/// When a hook runs relative to population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// After discovery, before any bean is registered
    Before,
    /// After every discovered bean is registered
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Before => f.write_str("before-population"),
            HookPhase::After => f.write_str("after-population"),
        }
    }
}

/// A discovered startup hook.
#[derive(Clone)]
pub struct HookEntry {
    phase: HookPhase,
    order: i32,
    name: String,
    declaring_type: &'static str,
    params: Vec<Param>,
    invoke: InvokeFn,
}

impl HookEntry {
    /// Before-population hook hosted on a `Default` type.
    ///
    /// `D` must be `()` or `DiscoverySession`; anything else is rejected when
    /// the hook is added to a [`Catalog`](crate::Catalog).
    pub fn before<H, D, F>(name: impl Into<String>, f: F) -> Self
    where
        H: Default + 'static,
        D: Resolvable + 'static,
        F: Fn(&H, D) -> HookResult + Send + Sync + 'static,
    {
        Self::with_host(HookPhase::Before, name, || Some(H::default()), f)
    }

    /// After-population hook hosted on a `Default` type.
    pub fn after<H, D, F>(name: impl Into<String>, f: F) -> Self
    where
        H: Default + 'static,
        D: Resolvable + 'static,
        F: Fn(&H, D) -> HookResult + Send + Sync + 'static,
    {
        Self::with_host(HookPhase::After, name, || Some(H::default()), f)
    }

    /// Hook whose host is built by `construct`.
    ///
    /// A host that cannot be built (`construct` returns `None`) fails the
    /// hook when it runs.
    pub fn with_host<H, D, F>(
        phase: HookPhase,
        name: impl Into<String>,
        construct: fn() -> Option<H>,
        f: F,
    ) -> Self
    where
        H: 'static,
        D: Resolvable + 'static,
        F: Fn(&H, D) -> HookResult + Send + Sync + 'static,
    {
        let declaring_type = type_name::<H>();
        let invoke: InvokeFn = Arc::new(move |container: &Container| {
            let host = construct().ok_or_else(|| {
                format!("{declaring_type} must have a zero-argument constructor to host hooks")
            })?;
            let args = D::resolve(container)?;
            f(&host, args)
        });

        Self {
            phase,
            order: DEFAULT_HOOK_ORDER,
            name: name.into(),
            declaring_type,
            params: D::params(),
            invoke,
        }
    }

    /// Set the ordering value. Lower runs first.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[inline]
    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    #[inline]
    pub fn ordering(&self) -> i32 {
        self.order
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Qualified name used in logs and errors
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }

    /// Check the declared parameters against what the phase can supply.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.phase == HookPhase::After {
            return Ok(());
        }
        match self.params.as_slice() {
            [] | [Param::Session] => Ok(()),
            params => Err(DiError::InvalidHook {
                phase: self.phase,
                hook: self.qualified_name(),
                reason: format!(
                    "before-population hooks may only take no arguments or a DiscoverySession, found ({})",
                    params
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }

    pub(crate) fn run(&self, container: &Container) -> Result<()> {
        #[cfg(feature = "logging")]
        trace!(
            target: "bean_context",
            phase = %self.phase,
            hook = %self.qualified_name(),
            order = self.order,
            "Running hook"
        );

        (self.invoke)(container).map_err(|source| DiError::HookExecution {
            phase: self.phase,
            hook: self.qualified_name(),
            source,
        })
    }
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("phase", &self.phase)
            .field("order", &self.order)
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("params", &self.params)
            .finish()
    }
}

/// Run hooks in ascending order, stopping at the first failure.
pub(crate) fn run_all(phase: HookPhase, mut hooks: Vec<HookEntry>, container: &Container) -> Result<()> {
    // stable: equal orders keep discovery order
    hooks.sort_by_key(|hook| hook.order);

    #[cfg(feature = "logging")]
    debug!(
        target: "bean_context",
        phase = %phase,
        hook_count = hooks.len(),
        "Running startup hooks"
    );
    #[cfg(not(feature = "logging"))]
    let _ = phase;

    for hook in &hooks {
        hook.run(container)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoverySession;
    use std::sync::Arc;

    #[derive(Default)]
    struct Hooks;

    struct NoDefault;

    #[test]
    fn test_default_order() {
        let hook = HookEntry::before("warmup", |_: &Hooks, _: ()| Ok(()));
        assert_eq!(hook.ordering(), DEFAULT_HOOK_ORDER);
        assert_eq!(hook.order(5).ordering(), 5);
    }

    #[test]
    fn test_before_hook_accepts_session_only() {
        let none = HookEntry::before("a", |_: &Hooks, _: ()| Ok(()));
        let session = HookEntry::before("b", |_: &Hooks, _: DiscoverySession| Ok(()));
        assert!(none.validate().is_ok());
        assert!(session.validate().is_ok());

        let bean = HookEntry::before("c", |_: &Hooks, _: Arc<String>| Ok(()));
        let err = bean.validate().unwrap_err();
        assert!(matches!(err, DiError::InvalidHook { phase: HookPhase::Before, .. }));
    }

    #[test]
    fn test_after_hook_accepts_any_params() {
        let hook = HookEntry::after("report", |_: &Hooks, _: (Arc<String>, Container)| Ok(()));
        assert!(hook.validate().is_ok());
        assert_eq!(hook.params().len(), 2);
    }

    #[test]
    fn test_run_in_order_and_stable() {
        let container = Container::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let entry = |name: &'static str, order: i32| {
            let log = Arc::clone(&log);
            HookEntry::after(name, move |_: &Hooks, _: ()| {
                log.lock().unwrap().push(name);
                Ok(())
            })
            .order(order)
        };

        let hooks = vec![entry("late", 10), entry("first", 1), entry("second", 1)];
        run_all(HookPhase::After, hooks, &container).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "late"]);
    }

    #[test]
    fn test_failure_is_wrapped() {
        let container = Container::new();
        let hook = HookEntry::after("boom", |_: &Hooks, _: ()| Err("exploded".into()));

        let err = hook.run(&container).unwrap_err();
        match err {
            DiError::HookExecution { phase, hook, .. } => {
                assert_eq!(phase, HookPhase::After);
                assert!(hook.ends_with("::boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unbuildable_host_fails_hook() {
        let container = Container::new();
        let hook = HookEntry::with_host(HookPhase::After, "run", || None::<NoDefault>, |_, _: ()| Ok(()));
        assert!(matches!(hook.run(&container), Err(DiError::HookExecution { .. })));
    }

    #[test]
    fn test_missing_dependency_fails_hook() {
        let container = Container::new();
        let hook = HookEntry::after("needs", |_: &Hooks, _: Arc<NoDefault>| Ok(()));
        assert!(matches!(hook.run(&container), Err(DiError::HookExecution { .. })));
    }
}
