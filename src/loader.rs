//! Template loaders
//!
//! A [`Loader`] maps a logical template name to source text. The engine
//! asks for already-resolved names (include paths are normalized against
//! the including template before the loader sees them). Filesystem
//! loading is the host's concern; the in-memory loader here covers
//! embedded template sets and tests.

use rustc_hash::FxHashMap;

use crate::render::errors::{ErrorKind, TemplateError};

/// Maps a logical template name to `(source_text, canonical_name)`.
pub trait Loader {
    fn load(&self, name: &str) -> Result<(String, String), TemplateError>;
}

/// A loader over an in-memory name → source map.
#[derive(Default)]
pub struct MemoryLoader {
    templates: FxHashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    /// Add a template source under a logical name.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), text.into());
    }
}

impl Loader for MemoryLoader {
    fn load(&self, name: &str) -> Result<(String, String), TemplateError> {
        match self.templates.get(name) {
            Some(text) => Ok((text.clone(), name.to_string())),
            None => Err(TemplateError::new(
                ErrorKind::NotFound,
                format!("template not found: {}", name),
                name,
                0,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.insert("a.tmpl", "hello");

        let (text, canonical) = loader.load("a.tmpl").unwrap();
        assert_eq!(text, "hello");
        assert_eq!(canonical, "a.tmpl");

        let err = loader.load("missing.tmpl").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
