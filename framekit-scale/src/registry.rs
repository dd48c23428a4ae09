//! Named filter constructors.
//!
//! A [`FilterRegistry`] is filled once at startup and then only read;
//! callers hold it by reference instead of consulting global tables.

use crate::coeffs::ScaleAlgorithm;
use crate::error::{Result, ScaleError};
use crate::filter::{NullFilter, ScaleFilter, VideoFilter};
use framekit_core::PixelFormat;
use std::collections::HashMap;
use std::fmt;

type Factory = Box<dyn Fn(&FilterArgs) -> Result<Box<dyn VideoFilter>> + Send + Sync>;

/// Options of a filter, parsed from `key=value:key=value`.
///
/// Options without a key are positional and get the keys passed to
/// [`FilterArgs::parse`] in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    values: HashMap<String, String>,
}

impl FilterArgs {
    /// Parse an option string, naming positional options after `positional`.
    pub fn parse(args: &str, positional: &[&str]) -> Result<Self> {
        let mut values = HashMap::new();
        let mut next_positional = positional.iter();
        for part in args.split(':').filter(|p| !p.is_empty()) {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => {
                    let key = next_positional.next().ok_or_else(|| {
                        ScaleError::InvalidConfig(format!("unexpected option '{}'", part))
                    })?;
                    (key.to_string(), part.trim().to_string())
                }
            };
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Raw value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Integer value of `key`.
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.get(key)
            .map(|v| {
                v.parse().map_err(|_| {
                    ScaleError::InvalidConfig(format!("option {}={} is not a number", key, v))
                })
            })
            .transpose()
    }
}

/// Registry of filter implementations.
#[derive(Default)]
pub struct FilterRegistry {
    factories: HashMap<String, Factory>,
}

impl FilterRegistry {
    /// Create a registry holding the built-in filters.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register("null", |_| Ok(Box::new(NullFilter::new())));
        registry.register("scale", |args| {
            scale_from_args(args).map(|f| Box::new(f) as Box<dyn VideoFilter>)
        });
        registry
    }

    /// Register a filter factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&FilterArgs) -> Result<Box<dyn VideoFilter>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Check if a filter is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered filter names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create a filter from a description such as `scale=w=640:h=360`.
    pub fn create(&self, description: &str) -> Result<Box<dyn VideoFilter>> {
        let (name, args) = description.split_once('=').unwrap_or((description, ""));
        let factory = self
            .factories
            .get(name.trim())
            .ok_or_else(|| ScaleError::InvalidConfig(format!("unknown filter: {}", name)))?;
        let positional: &[&str] = if name.trim() == "scale" { &["w", "h"] } else { &[] };
        factory(&FilterArgs::parse(args, positional)?)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

fn parse_format(name: &str) -> Option<PixelFormat> {
    match name {
        "gray" => Some(PixelFormat::Gray8),
        _ => PixelFormat::ALL.into_iter().find(|f| f.to_string() == name),
    }
}

fn parse_algorithm(name: &str) -> Option<ScaleAlgorithm> {
    match name {
        "point" | "neighbor" => Some(ScaleAlgorithm::Point),
        "bilinear" => Some(ScaleAlgorithm::Bilinear),
        "bicubic" => Some(ScaleAlgorithm::Bicubic),
        "lanczos" => Some(ScaleAlgorithm::Lanczos),
        _ => None,
    }
}

fn scale_from_args(args: &FilterArgs) -> Result<ScaleFilter> {
    let width = args
        .get_u32("w")?
        .ok_or_else(|| ScaleError::InvalidConfig("scale needs a width".into()))?;
    let height = args
        .get_u32("h")?
        .ok_or_else(|| ScaleError::InvalidConfig("scale needs a height".into()))?;

    let mut filter = ScaleFilter::new(width, height)?;
    if let Some(name) = args.get("format") {
        let format = parse_format(name)
            .ok_or_else(|| ScaleError::InvalidConfig(format!("unknown pixel format: {}", name)))?;
        filter = filter.with_format(format);
    }
    if let Some(name) = args.get("flags") {
        let algorithm = parse_algorithm(name)
            .ok_or_else(|| ScaleError::InvalidConfig(format!("unknown scaler: {}", name)))?;
        filter = filter.with_algorithm(algorithm);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_filters() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.names(), vec!["null", "scale"]);
        assert!(registry.contains("scale"));
        assert_eq!(registry.create("null").unwrap().name(), "null");
    }

    #[test]
    fn test_scale_options() {
        let registry = FilterRegistry::new();
        let filter = registry.create("scale=320:240:format=yuv420p").unwrap();
        assert_eq!(filter.name(), "scale_320x240");

        let filter = registry.create("scale=w=64:h=32:flags=lanczos").unwrap();
        assert_eq!(filter.name(), "scale_64x32");
    }

    #[test]
    fn test_bad_descriptions() {
        let registry = FilterRegistry::new();
        assert!(registry.create("blur").is_err());
        assert!(registry.create("scale=w=64").is_err());
        assert!(registry.create("scale=w=x:h=2").is_err());
        assert!(registry.create("scale=8:8:format=yuv9").is_err());
        assert!(registry.create("scale=8:8:9").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = FilterArgs::parse("10:h=20:extra=yes", &["w", "h"]).unwrap();
        assert_eq!(args.get_u32("w").unwrap(), Some(10));
        assert_eq!(args.get_u32("h").unwrap(), Some(20));
        assert_eq!(args.get("extra"), Some("yes"));
        assert_eq!(args.get("missing"), None);
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FilterRegistry::new();
        registry.register("copy", |_| Ok(Box::new(NullFilter::new())));
        assert_eq!(registry.names(), vec!["copy", "null", "scale"]);
    }
}
