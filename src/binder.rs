//! Configuration binding
//!
//! Copies property values into the fields of a configuration bean. Each
//! field is looked up under `prefix.field`; nested configuration structs
//! recurse with the longer prefix.
//!
//! Binding never fails as a whole. A missing key leaves the field untouched,
//! a value that does not convert is reported and skipped, and an absent
//! nested struct that cannot be instantiated has its subtree skipped. The
//! outcome is returned as a [`BindReport`].
//!
//! # Example
//!
//! ```rust
//! use bean_context::{Binder, Configurable, MapPropertySource};
//!
//! #[derive(Default)]
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl Configurable for Server {
//!     fn prefix() -> &'static str {
//!         "server"
//!     }
//!
//!     fn bind(&mut self, binder: &mut Binder<'_>, prefix: &str) {
//!         binder.scalar(&mut self.host, prefix, "host");
//!         binder.scalar(&mut self.port, prefix, "port");
//!     }
//! }
//!
//! let props = MapPropertySource::new()
//!     .with("server.host", "example.org")
//!     .with("server.port", "not-a-port");
//!
//! let mut server = Server::default();
//! let report = Binder::new(&props).bind(&mut server);
//!
//! assert_eq!(server.host, "example.org");
//! assert_eq!(server.port, 0);
//! assert_eq!(report.failures().len(), 1);
//! ```

use crate::property::PropertySource;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Conversion table
// =============================================================================

/// Scalar target types a property can be converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Char,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::String => "String",
            ScalarKind::Char => "char",
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::Isize => "isize",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::Usize => "usize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A converted property value
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Str(String),
    Char(char),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// A raw property value that does not convert to the field's type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {raw:?} to {kind}: {reason}")]
pub struct ConversionError {
    pub kind: ScalarKind,
    pub raw: String,
    pub reason: String,
}

fn conversion_error(kind: ScalarKind, raw: &str, reason: impl fmt::Display) -> ConversionError {
    ConversionError {
        kind,
        raw: raw.to_owned(),
        reason: reason.to_string(),
    }
}

/// Convert a raw value to `kind`.
///
/// Numbers are parsed after trimming whitespace. Booleans are lenient:
/// `true` in any letter case is `true`, every other value is `false`.
pub fn convert(kind: ScalarKind, raw: &str) -> Result<ScalarValue, ConversionError> {
    macro_rules! parse {
        ($ty:ty, $variant:ident) => {
            raw.trim()
                .parse::<$ty>()
                .map(|v| ScalarValue::$variant(v.into()))
                .map_err(|e| conversion_error(kind, raw, e))
        };
        ($ty:ty, $variant:ident as $wide:ty) => {
            raw.trim()
                .parse::<$ty>()
                .map(|v| ScalarValue::$variant(v as $wide))
                .map_err(|e| conversion_error(kind, raw, e))
        };
    }

    match kind {
        ScalarKind::String => Ok(ScalarValue::Str(raw.to_owned())),
        ScalarKind::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(ScalarValue::Char(c)),
                _ => Err(conversion_error(kind, raw, "expected exactly one character")),
            }
        }
        ScalarKind::Bool => Ok(ScalarValue::Bool(raw.trim().eq_ignore_ascii_case("true"))),
        ScalarKind::I8 => parse!(i8, Int),
        ScalarKind::I16 => parse!(i16, Int),
        ScalarKind::I32 => parse!(i32, Int),
        ScalarKind::I64 => parse!(i64, Int),
        ScalarKind::Isize => parse!(isize, Int as i64),
        ScalarKind::U8 => parse!(u8, UInt),
        ScalarKind::U16 => parse!(u16, UInt),
        ScalarKind::U32 => parse!(u32, UInt),
        ScalarKind::U64 => parse!(u64, UInt),
        ScalarKind::Usize => parse!(usize, UInt as u64),
        ScalarKind::F32 => parse!(f32, Float),
        ScalarKind::F64 => parse!(f64, Float),
    }
}

/// Field types that bind from a single property value.
pub trait Scalar: Sized {
    const KIND: ScalarKind;

    /// Narrow a converted value to `Self`
    fn from_value(value: ScalarValue) -> Option<Self>;

    /// Convert a raw property value
    fn parse_property(raw: &str) -> Result<Self, ConversionError> {
        let value = convert(Self::KIND, raw)?;
        Self::from_value(value).ok_or_else(|| conversion_error(Self::KIND, raw, "value out of range"))
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident, $variant:ident;)+) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                #[inline]
                fn from_value(value: ScalarValue) -> Option<Self> {
                    match value {
                        ScalarValue::$variant(v) => <$ty>::try_from(v).ok(),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_scalar! {
    i8 => I8, Int;
    i16 => I16, Int;
    i32 => I32, Int;
    i64 => I64, Int;
    isize => Isize, Int;
    u8 => U8, UInt;
    u16 => U16, UInt;
    u32 => U32, UInt;
    u64 => U64, UInt;
    usize => Usize, UInt;
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Scalar for char {
    const KIND: ScalarKind = ScalarKind::Char;

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl Scalar for f64 {
    const KIND: ScalarKind = ScalarKind::F64;

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl Scalar for f32 {
    const KIND: ScalarKind = ScalarKind::F32;

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Float(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl<S: Scalar> Scalar for Option<S> {
    const KIND: ScalarKind = S::KIND;

    #[inline]
    fn from_value(value: ScalarValue) -> Option<Self> {
        S::from_value(value).map(Some)
    }
}

// =============================================================================
// Configurable
// =============================================================================

/// Types whose fields can be bound from properties.
///
/// Usually derived with `#[derive(Configuration)]` (feature `derive`).
pub trait Configurable {
    /// Prefix used when the type is bound as a configuration bean
    fn prefix() -> &'static str
    where
        Self: Sized,
    {
        ""
    }

    /// Bind every field below `prefix`.
    fn bind(&mut self, binder: &mut Binder<'_>, prefix: &str);

    /// Build an instance for an absent nested field, if the type allows it
    fn instantiate() -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

/// Property key for `attribute` below `prefix`
pub fn property_key(prefix: &str, attribute: &str) -> String {
    if prefix.is_empty() {
        attribute.to_owned()
    } else {
        format!("{prefix}.{attribute}")
    }
}

// =============================================================================
// Binder
// =============================================================================

/// A property that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingFailure {
    pub key: String,
    pub error: ConversionError,
}

/// Outcome of one binding pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    applied: Vec<String>,
    failures: Vec<BindingFailure>,
    skipped: Vec<String>,
}

impl BindReport {
    /// Keys whose values were written into fields
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// Keys whose values did not convert
    pub fn failures(&self) -> &[BindingFailure] {
        &self.failures
    }

    /// Prefixes of nested structs that were absent and could not be built
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Walks a configuration struct, pulling values from a property source.
pub struct Binder<'a> {
    source: &'a dyn PropertySource,
    report: BindReport,
}

impl<'a> Binder<'a> {
    pub fn new(source: &'a dyn PropertySource) -> Self {
        Self {
            source,
            report: BindReport::default(),
        }
    }

    /// Bind `target` below its own prefix.
    pub fn bind<C: Configurable>(self, target: &mut C) -> BindReport {
        self.bind_at(target, C::prefix())
    }

    /// Bind `target` below `prefix`.
    pub fn bind_at<C: Configurable>(mut self, target: &mut C, prefix: &str) -> BindReport {
        target.bind(&mut self, prefix);
        self.report
    }

    /// Bind one scalar field from `prefix.attribute`.
    pub fn scalar<S: Scalar>(&mut self, field: &mut S, prefix: &str, attribute: &str) {
        let key = property_key(prefix, attribute);
        let Some(raw) = self.source.property(&key) else {
            return;
        };
        match S::parse_property(&raw) {
            Ok(value) => {
                *field = value;
                self.report.applied.push(key);
            }
            Err(error) => self.report.failures.push(BindingFailure { key, error }),
        }
    }

    /// Recurse into a nested configuration field.
    pub fn nested<C: Configurable>(&mut self, field: &mut C, prefix: &str, attribute: &str) {
        let prefix = property_key(prefix, attribute);
        field.bind(self, &prefix);
    }

    /// Recurse into an optional nested field, instantiating it when absent.
    pub fn nested_optional<C: Configurable>(&mut self, field: &mut Option<C>, prefix: &str, attribute: &str) {
        let prefix = property_key(prefix, attribute);
        if field.is_none() {
            *field = C::instantiate();
        }
        match field {
            Some(nested) => nested.bind(self, &prefix),
            None => self.report.skipped.push(prefix),
        }
    }
}

impl fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder").field("report", &self.report).finish()
    }
}
