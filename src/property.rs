//! Property sources
//!
//! A [`PropertySource`] answers flat dotted keys such as `server.port`. The
//! container consults one source when binding configuration beans.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Lookup of raw property values by key.
pub trait PropertySource: Send + Sync {
    /// Raw value for `key`, or `None` when absent.
    fn property(&self, key: &str) -> Option<String>;
}

impl<F> PropertySource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    #[inline]
    fn property(&self, key: &str) -> Option<String> {
        self(key)
    }
}

// =============================================================================
// In-memory map
// =============================================================================

/// Properties held in memory.
///
/// ```rust
/// use bean_context::{MapPropertySource, PropertySource};
///
/// let props = MapPropertySource::new()
///     .with("server.port", "8080")
///     .with("server.host", "localhost");
///
/// assert_eq!(props.property("server.port").as_deref(), Some("8080"));
/// assert_eq!(props.property("server.tls"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    entries: HashMap<String, String>,
}

impl MapPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PropertySource for MapPropertySource {
    #[inline]
    fn property(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

impl From<HashMap<String, String>> for MapPropertySource {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapPropertySource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Properties read from environment variables.
///
/// `server.port` is looked up as `SERVER_PORT`, or `APP_SERVER_PORT` with
/// the prefix `APP`. Dots and dashes become underscores.
#[derive(Debug, Clone, Default)]
pub struct EnvPropertySource {
    prefix: Option<String>,
}

impl EnvPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name for a property key
    pub fn variable_name(&self, key: &str) -> String {
        let body: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{}_{body}", prefix.to_ascii_uppercase()),
            None => body,
        }
    }
}

impl PropertySource for EnvPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

// =============================================================================
// Properties files
// =============================================================================

/// Error loading a properties file
#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error("Failed to read properties file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed property on line {line}: {content}")]
    Malformed { line: usize, content: String },
}

/// Properties parsed from `key=value` text, as in `application.properties`.
///
/// Blank lines and lines starting with `#` or `!` are ignored. The first
/// `=` or `:` separates key and value; both are trimmed.
#[derive(Debug, Clone, Default)]
pub struct PropertiesFile {
    entries: MapPropertySource,
}

impl PropertiesFile {
    /// Parse properties text.
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let mut entries = MapPropertySource::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(split) = line.find(['=', ':']) else {
                return Err(PropertiesError::Malformed {
                    line: index + 1,
                    content: line.to_owned(),
                });
            };
            let key = line[..split].trim();
            if key.is_empty() {
                return Err(PropertiesError::Malformed {
                    line: index + 1,
                    content: line.to_owned(),
                });
            }
            entries.insert(key, line[split + 1..].trim());
        }
        Ok(Self { entries })
    }

    /// Read and parse a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PropertiesError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PropertiesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PropertySource for PropertiesFile {
    #[inline]
    fn property(&self, key: &str) -> Option<String> {
        self.entries.property(key)
    }
}

// =============================================================================
// Layering
// =============================================================================

/// Sources consulted in order; the first one that has a key wins.
#[derive(Default)]
pub struct LayeredPropertySource {
    layers: Vec<Box<dyn PropertySource>>,
}

impl LayeredPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer below the existing ones
    pub fn layer(mut self, source: impl PropertySource + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }
}

impl PropertySource for LayeredPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.property(key))
    }
}

impl fmt::Debug for LayeredPropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredPropertySource")
            .field("layers", &self.layers.len())
            .finish()
    }
}
