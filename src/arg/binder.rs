use derive_more::{Display, From};
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use super::KernelArgValue;
use crate::{
    kernel::KernelInstance,
    platform::{KernelObject, PlatformError},
};

/// Refers to a kernel argument by name or by native index.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, From)]
pub enum ArgKey {
    #[display("{_0}")]
    Name(String),
    #[display("#{_0}")]
    Index(usize),
}

impl From<&str> for ArgKey {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

/// A sparse set of argument bindings.
pub type KernelArgs = HashMap<ArgKey, KernelArgValue>;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("no such argument: {0}")]
    NoSuchArgument(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Binds every value of `args` to its argument slot.
///
/// Names resolve through the instance's reflected name map. Indices go to the platform as they
/// are, which rejects the out-of-range ones.
pub fn apply_args<K: KernelObject>(
    instance: &KernelInstance<K>,
    args: &KernelArgs,
) -> Result<(), BindError> {
    for (key, value) in args {
        let index = match key {
            ArgKey::Name(name) => instance
                .arg_index(name)
                .ok_or_else(|| BindError::NoSuchArgument(name.clone()))?,
            ArgKey::Index(index) => *index,
        };
        instance
            .kernel()
            .set_arg(index, value)
            .inspect_err(|err| log::error!("failed to bind {value} to {key}: {err}"))?;
    }
    Ok(())
}
