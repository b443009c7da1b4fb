use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use super::config::{ArgExtension, Configuration, ParseError, parse_configuration};
use crate::kernel::{KernelId, ReflectedArg};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration not found: {0}")]
    NotFound(KernelId),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ParseError),
}

/// Raw configuration texts per kernel, parsed lazily once the kernel's arguments are known.
#[derive(Debug, Clone)]
pub struct ConfigurationStorage<E = ()> {
    raw: HashMap<KernelId, String>,
    parsed: HashMap<KernelId, Arc<Configuration<E>>>,
}

impl<E> Default for ConfigurationStorage<E> {
    fn default() -> Self {
        Self {
            raw: Default::default(),
            parsed: Default::default(),
        }
    }
}

impl<E: ArgExtension> ConfigurationStorage<E> {
    /// Stores the trimmed `text` for `id`. Parsing is deferred.
    ///
    /// Line numbers of parse errors count from the first line of the trimmed text.
    ///
    /// Replacing the text of an already parsed configuration keeps the parsed result.
    pub fn register_configuration(&mut self, id: KernelId, text: &str) {
        let text = text.trim().to_string();
        if self.raw.insert(id.clone(), text).is_some() {
            log::info!("replaced configuration text: {id}");
        }
    }

    /// Returns the parsed configuration of `id`, parsing it against `args` on first request.
    pub fn find_or_parse_configuration(
        &mut self,
        id: &KernelId,
        args: &[ReflectedArg],
    ) -> Result<Arc<Configuration<E>>, ConfigError> {
        if let Some(config) = self.parsed.get(id) {
            return Ok(config.clone());
        }
        let text = self.raw.get(id).ok_or_else(|| {
            log::error!("configuration not found: {id}");
            ConfigError::NotFound(id.clone())
        })?;

        log::info!("parsing configuration: {id}");
        let config = Arc::new(parse_configuration(text, args)?);
        self.parsed.insert(id.clone(), config.clone());
        Ok(config)
    }

    /// The stored text of `id`.
    #[inline]
    pub fn raw(&self, id: &KernelId) -> Option<&str> {
        self.raw.get(id).map(String::as_str)
    }

    #[inline]
    pub fn is_parsed(&self, id: &KernelId) -> bool {
        self.parsed.contains_key(id)
    }

    /// Forgets both the text and the parsed result of `id`. Returns `true` if anything was stored.
    pub fn remove(&mut self, id: &KernelId) -> bool {
        let raw = self.raw.remove(id).is_some();
        let parsed = self.parsed.remove(id).is_some();
        raw || parsed
    }
}
