//! # bean-context - Bean Container with Startup Hooks for Rust
//!
//! A thread-safe bean container: modules declare beans and startup hooks,
//! the container registers them, runs the hooks in order and resolves beans
//! lazily by type, by qualifier name, or as collections.
//!
//! ## Features
//!
//! - **Singleton and prototype scopes** - singletons are built at most once,
//!   even under concurrent first requests
//! - **Qualifiers and primary beans** - pick one of several candidates by
//!   name, or by the `primary` flag
//! - **Trait-object contracts** - resolve a bean as `Arc<dyn Trait>`
//! - **Collection injection** - `Vec<Arc<T>>` and `BeanSet<T>` receive every
//!   matching bean
//! - **Cycle detection** - circular dependencies fail with the key that closed
//!   the loop
//! - **Configuration binding** - bean fields are filled from `prefix.field`
//!   properties, recursing into nested structs
//! - **Ordered startup hooks** - before and after population
//! - **Observable** - `tracing` events under the `bean_context` target
//!
//! ## Quick Start
//!
//! ```rust
//! use bean_context::{Application, BeanDefinition, Catalog, Container, Result};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let app = Application::new("quickstart").module(|catalog: &mut Catalog| -> Result<()> {
//!     catalog
//!         .bean(BeanDefinition::from_fn(|| Database { url: "postgres://localhost".into() }))
//!         .bean(BeanDefinition::constructor(|db: Arc<Database>| UserService { db }));
//!     Ok(())
//! });
//!
//! let container = Container::new();
//! container.initialize(&app).unwrap();
//!
//! let users = container.get::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Qualifiers and Primary Beans
//!
//! ```rust
//! use bean_context::{BeanDefinition, Container};
//! use std::sync::Arc;
//!
//! trait Cache: Send + Sync {
//!     fn kind(&self) -> &'static str;
//! }
//!
//! struct Memory;
//! impl Cache for Memory {
//!     fn kind(&self) -> &'static str { "memory" }
//! }
//!
//! struct Redis;
//! impl Cache for Redis {
//!     fn kind(&self) -> &'static str { "redis" }
//! }
//!
//! let container = Container::new();
//! container
//!     .register(
//!         BeanDefinition::from_fn(|| Memory)
//!             .primary()
//!             .implements::<dyn Cache>(|c| c as Arc<dyn Cache>),
//!     )
//!     .unwrap();
//! container
//!     .register(
//!         BeanDefinition::from_fn(|| Redis)
//!             .named("redis")
//!             .implements::<dyn Cache>(|c| c as Arc<dyn Cache>),
//!     )
//!     .unwrap();
//!
//! assert_eq!(container.get::<dyn Cache>().unwrap().kind(), "memory");
//! assert_eq!(container.get_named::<dyn Cache>("redis").unwrap().kind(), "redis");
//! assert_eq!(container.get_all::<dyn Cache>().unwrap().len(), 2);
//! ```

mod binder;
mod container;
mod descriptor;
mod discovery;
mod error;
mod factory;
mod hooks;
mod key;
pub mod logging;
mod property;
mod provider;
mod resolvable;
mod resolver;
mod storage;

pub use binder::{
    convert, property_key, BindReport, Binder, BindingFailure, Configurable, ConversionError,
    Scalar, ScalarKind, ScalarValue,
};
pub use container::{Container, ContainerBuilder, ContainerState, CyclePolicy};
pub use descriptor::{BeanDefinition, BeanDescriptor};
pub use discovery::{Application, BeanSummary, Catalog, Discovery, DiscoverySession, Module};
pub use error::{BoxError, DiError, Result};
pub use factory::FactoryKind;
pub use hooks::{HookEntry, HookPhase, HookResult, DEFAULT_HOOK_ORDER};
pub use key::{default_name, BeanKey};
pub use property::{
    EnvPropertySource, LayeredPropertySource, MapPropertySource, PropertiesError, PropertiesFile,
    PropertySource,
};
pub use provider::{AnyArc, Contract, Injectable, Scope};
pub use resolvable::{BeanSet, Param, Qualified, Qualifier, Resolvable};

#[cfg(feature = "derive")]
pub use bean_context_derive::Configuration;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Application, BeanDefinition, BeanSet, Catalog, Configurable, Container, DiError,
        DiscoverySession, HookEntry, HookResult, Module, Qualified, Result, Scope,
    };
    #[cfg(feature = "derive")]
    pub use crate::Configuration;
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    // A small shop application wired end to end.

    #[derive(Debug, Default)]
    struct DataSourceConfig {
        url: String,
        pool: PoolConfig,
    }

    #[derive(Debug, Default)]
    struct PoolConfig {
        max: u32,
    }

    impl Configurable for PoolConfig {
        fn bind(&mut self, binder: &mut Binder<'_>, prefix: &str) {
            binder.scalar(&mut self.max, prefix, "max");
        }
    }

    impl Configurable for DataSourceConfig {
        fn prefix() -> &'static str {
            "datasource"
        }

        fn bind(&mut self, binder: &mut Binder<'_>, prefix: &str) {
            binder.scalar(&mut self.url, prefix, "url");
            binder.nested(&mut self.pool, prefix, "pool");
        }
    }

    struct DataSource {
        url: String,
        max: u32,
    }

    trait Repository: Send + Sync {
        fn table(&self) -> &'static str;
    }

    struct Orders;
    impl Repository for Orders {
        fn table(&self) -> &'static str {
            "orders"
        }
    }

    struct Customers;
    impl Repository for Customers {
        fn table(&self) -> &'static str {
            "customers"
        }
    }

    struct Shop {
        source: Arc<DataSource>,
        repositories: Vec<Arc<dyn Repository>>,
    }

    static REQUESTS: AtomicU32 = AtomicU32::new(0);

    struct RequestId(u32);

    #[derive(Default)]
    struct Persistence;

    impl Persistence {
        fn data_source(&self, config: Arc<DataSourceConfig>) -> DataSource {
            DataSource {
                url: config.url.clone(),
                max: config.pool.max,
            }
        }
    }

    #[derive(Default)]
    struct ShopHooks;

    struct ShopModule {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Module for ShopModule {
        fn configure(&self, catalog: &mut Catalog) -> Result<()> {
            catalog
                .bean(BeanDefinition::<DataSourceConfig>::configuration())
                .bean(BeanDefinition::method(
                    "dataSource",
                    |p: &Persistence, config: Arc<DataSourceConfig>| p.data_source(config),
                ))
                .bean(BeanDefinition::from_fn(|| Orders).implements::<dyn Repository>(|r| r as Arc<dyn Repository>))
                .bean(BeanDefinition::from_fn(|| Customers).implements::<dyn Repository>(|r| r as Arc<dyn Repository>))
                .bean(BeanDefinition::constructor(
                    |(source, repositories): (Arc<DataSource>, Vec<Arc<dyn Repository>>)| Shop {
                        source,
                        repositories,
                    },
                ))
                .bean(BeanDefinition::from_fn(|| RequestId(REQUESTS.fetch_add(1, Ordering::SeqCst))).prototype());

            let events = Arc::clone(&self.events);
            catalog.hook(HookEntry::before(
                "validate",
                move |_: &ShopHooks, session: DiscoverySession| -> HookResult {
                    if session.bean_named("dataSource").is_none() {
                        return Err("no data source declared".into());
                    }
                    events.lock().unwrap().push("validated".into());
                    Ok(())
                },
            ))?;

            let events = Arc::clone(&self.events);
            catalog.hook(HookEntry::after(
                "open",
                move |_: &ShopHooks, shop: Arc<Shop>| -> HookResult {
                    events.lock().unwrap().push(format!("open:{}", shop.source.url));
                    Ok(())
                },
            ))?;
            Ok(())
        }
    }

    fn shop() -> (Container, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let app = Application::new("shop").module(ShopModule {
            events: Arc::clone(&events),
        });
        let container = Container::builder()
            .properties(
                MapPropertySource::new()
                    .with("datasource.url", "postgres://shop")
                    .with("datasource.pool.max", "12"),
            )
            .build();
        container.initialize(&app).unwrap();
        (container, events)
    }

    #[test]
    fn test_application_wiring() {
        let (container, events) = shop();

        let shop = container.get::<Shop>().unwrap();
        assert_eq!(shop.source.url, "postgres://shop");
        assert_eq!(shop.source.max, 12);

        let tables: Vec<_> = shop.repositories.iter().map(|r| r.table()).collect();
        assert_eq!(tables, ["orders", "customers"]);

        assert_eq!(*events.lock().unwrap(), ["validated", "open:postgres://shop"]);
    }

    #[test]
    fn test_method_bean_is_named_after_method() {
        let (container, _) = shop();
        let key = container.resolve_key::<DataSource>(None).unwrap();
        assert_eq!(key.name(), "dataSource");
        assert!(container.get_named::<DataSource>("dataSource").is_ok());
    }

    #[test]
    fn test_prototype_beans_are_fresh() {
        let (container, _) = shop();
        let a = container.get::<RequestId>().unwrap();
        let b = container.get::<RequestId>().unwrap();
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn test_session_is_a_bean() {
        let (container, _) = shop();
        let session = container.get::<DiscoverySession>().unwrap();
        assert_eq!(session.root(), "shop");
        assert_eq!(session.modules().len(), 1);
        assert!(container.descriptors().iter().any(|d| d.key().name() == "DiscoverySession"));
    }

    #[test]
    fn test_not_found_error() {
        let container = Container::new();
        let result = container.get::<Shop>();
        assert!(matches!(result, Err(DiError::NoBeanFound { .. })));
    }
}
