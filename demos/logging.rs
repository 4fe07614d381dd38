//! Example showing the events a container emits
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use bean_context::{
    Application, BeanDefinition, Catalog, Container, HookEntry, HookResult, MapPropertySource,
    Result,
};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
}

struct Missing;

#[derive(Default)]
struct Startup;

fn main() {
    let container = Container::builder()
        .properties(
            MapPropertySource::new()
                .with("logging.level", "trace")
                .with("logging.format", "pretty")
                .with("logging.container-only", "true"),
        )
        .build();

    // Subscriber configured from the logging.* properties above
    bean_context::logging::init_from(&container);

    println!("=== bean-context Logging Demo ===\n");

    let app = Application::new("logging-demo").module(|catalog: &mut Catalog| -> Result<()> {
        catalog
            .bean(BeanDefinition::from_fn(|| Database {
                url: "postgres://localhost/mydb".into(),
            }))
            .bean(BeanDefinition::constructor(|db: Arc<Database>| UserService { db }));

        // logs: "Running hook"
        catalog.hook(HookEntry::after(
            "warmup",
            |_: &Startup, users: Arc<UserService>| -> HookResult {
                println!("  [App] Warmed up user service");
                drop(users);
                Ok(())
            },
        ))?;
        Ok(())
    });

    // logs: "Initializing bean container", "Registered bean descriptor",
    // "Creating bean instance", "Bean container ready"
    container.initialize(&app).unwrap();

    // logs: "Bean resolved from cache"
    let _users = container.get::<UserService>().unwrap();

    // logs: "Resolving bean" and returns NoBeanFound
    assert!(container.try_get::<Missing>().is_none());

    println!("\n=== Demo Complete ===");
    println!("Beans registered: {}", container.len());
}
