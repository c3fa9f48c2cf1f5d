//! Format registry

use crate::Format;
use std::collections::BTreeMap;

/// Formats keyed by name
///
/// Built once at startup. Registering a name twice is a wiring mistake and
/// panics.
#[derive(Debug, Default, Clone)]
pub struct FormatRegistry {
    formats: BTreeMap<&'static str, Format>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in format
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::register_all(&mut registry);
        registry
    }

    /// Add a format
    ///
    /// # Panics
    ///
    /// Panics if a format with the same name is already registered.
    pub fn register(&mut self, format: Format) {
        if self.formats.contains_key(format.name) {
            panic!("format {:?} registered more than once", format.name);
        }
        tracing::debug!(format = format.name, "registered format");
        self.formats.insert(format.name, format);
    }

    pub fn lookup(&self, name: &str) -> Option<&Format> {
        self.formats.get(name)
    }

    /// The format whose name is the longest extension of `path`
    pub fn guess(&self, path: &str) -> Option<&Format> {
        self.formats
            .values()
            .filter(|f| {
                path.len() > f.name.len()
                    && path.ends_with(f.name)
                    && path.as_bytes()[path.len() - f.name.len() - 1] == b'.'
            })
            .max_by_key(|f| f.name.len())
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        self.formats.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.formats.values()
    }
}
