use std::{collections::hash_map::Entry, sync::Arc};

use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

/// One source fragment of a compilation unit.
pub type Source = Arc<str>;

/// Id of the bundled standard library fragments.
pub const STDLIB: &str = "stdlib";

const DEFINITIONS: &str = include_str!("stdlib/definitions.wgsl");
const RANDOM: &str = include_str!("stdlib/random.wgsl");

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("sources already registered: {0}")]
    AlreadyExists(String),
    #[error("sources not found: {0}")]
    NotFound(String),
}

/// Maps source ids to ordered lists of fragments.
///
/// Filled once before kernels are registered and read-only afterwards. The first registration of
/// an id wins.
#[derive(Debug, Default, Clone)]
pub struct SourcesRegistry {
    sources: HashMap<String, Vec<Source>>,
}

impl SourcesRegistry {
    /// A registry holding the bundled standard library under [`STDLIB`].
    ///
    /// The library defines `real` and `real2` (`f64` based under `-D USE_DOUBLE_PRECISION`),
    /// `PI`, complex arithmetic and a PCG random number generator.
    pub fn with_stdlib() -> Self {
        let mut sources = HashMap::default();
        sources.insert(STDLIB.into(), vec![DEFINITIONS.into(), RANDOM.into()]);
        Self { sources }
    }

    pub fn register<S: Into<Source>>(
        &mut self,
        id: impl Into<String>,
        fragments: impl IntoIterator<Item = S>,
    ) -> Result<(), SourceError> {
        match self.sources.entry(id.into()) {
            Entry::Occupied(entry) => Err(SourceError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                log::info!("registered sources: {}", entry.key());
                entry.insert(fragments.into_iter().map(Into::into).collect());
                Ok(())
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Result<&[Source], SourceError> {
        self.sources
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Concatenates the fragments of `ids`, in order. Libraries go first.
    pub fn assemble(&self, ids: &[&str]) -> Result<Vec<Source>, SourceError> {
        let mut sources = vec![];
        for id in ids {
            sources.extend_from_slice(self.find_by_id(id)?);
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{STDLIB, SourceError, SourcesRegistry};

    #[test]
    fn test_register() -> Result<(), SourceError> {
        let mut registry = SourcesRegistry::default();
        registry.register("newton-fractal", ["fn a() {}", "fn b() {}"])?;

        let err = registry
            .register("newton-fractal", ["fn c() {}"])
            .expect_err("first registration wins");
        assert!(matches!(err, SourceError::AlreadyExists(id) if id == "newton-fractal"));

        let sources = registry.find_by_id("newton-fractal")?;
        assert_eq!(sources.len(), 2);
        assert_eq!(&*sources[0], "fn a() {}");

        let err = registry.find_by_id("mandelbrot").expect_err("not registered");
        assert!(matches!(err, SourceError::NotFound(id) if id == "mandelbrot"));
        Ok(())
    }

    #[test]
    fn test_assemble() -> Result<(), SourceError> {
        let mut registry = SourcesRegistry::with_stdlib();
        assert!(registry.contains(STDLIB));
        registry.register("newton-fractal", ["fn newton() {}"])?;

        let sources = registry.assemble(&[STDLIB, "newton-fractal"])?;
        assert_eq!(sources.len(), 3);
        assert!(sources[0].contains("alias real"));
        assert!(sources[1].contains("fn random("));
        assert_eq!(&*sources[2], "fn newton() {}");

        // fragments are shared, not copied
        let stdlib = registry.find_by_id(STDLIB)?;
        assert!(Arc::ptr_eq(&sources[0], &stdlib[0]));

        assert!(registry.assemble(&[STDLIB, "mandelbrot"]).is_err());
        Ok(())
    }
}
