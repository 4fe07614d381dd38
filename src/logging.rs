//! Logging setup for bean-context
//!
//! All events are emitted under the `bean_context` target. This module
//! installs a `tracing-subscriber` formatter for them, either from code or
//! from the `logging.*` properties of a container.
//!
//! # Features
//!
//! - `logging` - emit events (default)
//! - `logging-json` - JSON structured output
//! - `logging-pretty` - colorful multi-line output
//!
//! # Example
//!
//! ```rust,ignore
//! use bean_context::logging;
//!
//! logging::builder()
//!     .debug()
//!     .container_only()
//!     .pretty()
//!     .init();
//! ```

use crate::binder::{Binder, Configurable};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "logging")]
use tracing::Level;

/// Target every container event is logged under
pub const TARGET: &str = "bean_context";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Multi-line colorful output
    Pretty,
    /// Single-line output
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Compact => f.write_str("compact"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Logging settings bound from `logging.level`, `logging.format` and
/// `logging.container-only`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub container_only: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".into(),
            format: LogFormat::default().to_string(),
            container_only: false,
        }
    }
}

impl Configurable for LoggingConfig {
    fn prefix() -> &'static str {
        "logging"
    }

    fn bind(&mut self, binder: &mut Binder<'_>, prefix: &str) {
        binder.scalar(&mut self.level, prefix, "level");
        binder.scalar(&mut self.format, prefix, "format");
        binder.scalar(&mut self.container_only, prefix, "container-only");
    }

    fn instantiate() -> Option<Self> {
        Some(Self::default())
    }
}

/// Builder for the logging subscriber
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder configured from bound [`LoggingConfig`]. Unknown level or
    /// format values keep the defaults.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::default();
        if let Ok(level) = config.level.parse::<Level>() {
            builder.level = level;
        }
        if let Ok(format) = config.format.parse::<LogFormat>() {
            builder.format = format;
        }
        if config.container_only {
            builder.target = Some(TARGET);
        }
        builder
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Only show container events
    pub fn container_only(mut self) -> Self {
        self.target = Some(TARGET);
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// `EnvFilter` directive for the configured level and target
    pub fn filter_directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the subscriber. Does nothing if one is already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::new(self.filter_directive());
        let layer = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_target(true);
        let registry = tracing_subscriber::registry().with(filter);

        // try_init: a second install is not an error for us
        let _ = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry.with(layer.json()).try_init(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => registry.with(layer).try_init(),
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            LogFormat::Compact => registry.with(layer.compact()).try_init(),
        };
    }

    /// Install the subscriber (no-op without a subscriber feature)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install a subscriber configured from `logging.*` properties of
/// `container`.
#[cfg(feature = "logging")]
pub fn init_from(container: &crate::Container) {
    let mut config = LoggingConfig::default();
    container.bind_configuration(&mut config);
    LoggingBuilder::from_config(&config).init();
}

/// Install the default subscriber: JSON when `logging-json` is enabled,
/// pretty otherwise.
#[cfg(feature = "logging")]
pub fn init() {
    #[cfg(feature = "logging-json")]
    builder().json().init();
    #[cfg(not(feature = "logging-json"))]
    builder().pretty().init();
}

/// JSON structured logging at debug level, for log aggregation
#[cfg(feature = "logging")]
pub fn init_json() {
    builder().json().debug().init();
}

/// Human readable logging at debug level
#[cfg(feature = "logging")]
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Debug logging for container events only; other crates are filtered out
#[cfg(feature = "logging")]
pub fn init_container_only() {
    builder().container_only().debug().init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::MapPropertySource;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" compact ".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_binding() {
        let props = MapPropertySource::new()
            .with("logging.level", "trace")
            .with("logging.container-only", "true");

        let mut config = LoggingConfig::default();
        Binder::new(&props).bind(&mut config);

        assert_eq!(config.level, "trace");
        assert_eq!(config.format, "json");
        assert!(config.container_only);
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_builder_from_config() {
        let config = LoggingConfig {
            level: "warn".into(),
            format: "pretty".into(),
            container_only: true,
        };
        let builder = LoggingBuilder::from_config(&config);

        assert_eq!(builder.level, Level::WARN);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.filter_directive(), "bean_context=warn");
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new().trace().compact().with_file();
        assert_eq!(builder.format, LogFormat::Compact);
        assert!(builder.with_file);
        assert_eq!(builder.filter_directive(), "trace");
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_bad_config_keeps_defaults() {
        let config = LoggingConfig {
            level: "loud".into(),
            format: "xml".into(),
            container_only: false,
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
    }
}
