//! Bootstrapping an application from modules and a properties file
//!
//! ```bash
//! cargo run --example bootstrap
//! ```

use bean_context::prelude::*;
use bean_context::{
    qualifier, Binder, EnvPropertySource, LayeredPropertySource, PropertiesFile,
};

const APPLICATION_PROPERTIES: &str = "\
# application.properties
server.host = 127.0.0.1
server.port = 8080
";

#[derive(Debug, Default)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl Configurable for ServerConfig {
    fn prefix() -> &'static str {
        "server"
    }

    fn bind(&mut self, binder: &mut Binder<'_>, prefix: &str) {
        binder.scalar(&mut self.host, prefix, "host");
        binder.scalar(&mut self.port, prefix, "port");
    }
}

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;
impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

struct German;
impl Greeter for German {
    fn greet(&self, name: &str) -> String {
        format!("Hallo, {name}!")
    }
}

qualifier!(GermanGreeter = "german");

struct Server {
    config: Arc<ServerConfig>,
    greeters: BeanSet<dyn Greeter>,
    fallback: Qualified<dyn Greeter, GermanGreeter>,
}

struct GreetingModule;

impl Module for GreetingModule {
    fn configure(&self, catalog: &mut Catalog) -> Result<()> {
        catalog
            .bean(
                BeanDefinition::from_fn(|| English)
                    .named("english")
                    .primary()
                    .implements::<dyn Greeter>(|g| g as Arc<dyn Greeter>),
            )
            .bean(
                BeanDefinition::from_fn(|| German)
                    .named("german")
                    .implements::<dyn Greeter>(|g| g as Arc<dyn Greeter>),
            );
        Ok(())
    }
}

#[derive(Default)]
struct ServerModule;

impl Module for ServerModule {
    fn configure(&self, catalog: &mut Catalog) -> Result<()> {
        catalog
            .bean(BeanDefinition::<ServerConfig>::configuration())
            .bean(BeanDefinition::constructor(
                |(config, greeters, fallback): (
                    Arc<ServerConfig>,
                    BeanSet<dyn Greeter>,
                    Qualified<dyn Greeter, GermanGreeter>,
                )| Server {
                    config,
                    greeters,
                    fallback,
                },
            ));

        catalog.hook(
            HookEntry::before("inventory", |_: &ServerModule, session: DiscoverySession| -> HookResult {
                println!("Discovered {} beans in {}", session.beans().len(), session.root());
                Ok(())
            })
            .order(10),
        )?;

        catalog.hook(HookEntry::after(
            "listen",
            |_: &ServerModule, (server, greeter): (Arc<Server>, Arc<dyn Greeter>)| -> HookResult {
                println!(
                    "Listening on {}:{} with {} greeters",
                    server.config.host,
                    server.config.port,
                    server.greeters.len()
                );
                println!("{}", greeter.greet("world"));
                println!("{}", server.fallback.greet("Welt"));
                Ok(())
            },
        ))?;
        Ok(())
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    bean_context::logging::init();

    // Environment variables (APP_SERVER_PORT=9000) override the file
    let properties = LayeredPropertySource::new()
        .layer(EnvPropertySource::with_prefix("app"))
        .layer(PropertiesFile::parse(APPLICATION_PROPERTIES)?);

    let container = Container::builder().properties(properties).build();
    let app = Application::new("bootstrap")
        .module(GreetingModule)
        .module(ServerModule);

    container.initialize(&app)?;
    println!("Container {} with {} beans", container.state(), container.len());
    Ok(())
}
