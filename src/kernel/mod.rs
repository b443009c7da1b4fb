//! Kernels: logical identities, source fragments, buildable bases and compiled instances.

use derive_more::Display;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    arg::{BindError, KernelArgs, apply_args},
    platform::{ContextId, DeviceBuildLog, KernelObject, PlatformError},
};

pub mod base;
pub mod reflect;
pub mod source;

pub use base::KernelBase;
pub use reflect::{ArgNameMap, ReflectedArg};
pub use source::{STDLIB, Source, SourceError, SourcesRegistry};

/// Logical identity of a kernel.
///
/// `src` names the source and doubles as the entry point name; `settings` tells apart different
/// builds (options, fragments) of the same source.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("{src}/{settings}")]
pub struct KernelId {
    pub src: String,
    pub settings: String,
}

impl KernelId {
    #[inline]
    pub fn new(src: impl Into<String>, settings: impl Into<String>) -> Self {
        let src = src.into();
        let settings = settings.into();
        Self { src, settings }
    }
}

/// Key of the compilation cache: a kernel compiled in a specific context.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("{id}@{context}")]
pub struct CompilationContext {
    pub id: KernelId,
    pub context: ContextId,
}

/// A compiled kernel with its reflected argument metadata.
#[derive(Debug, Clone)]
pub struct KernelInstance<K> {
    kernel: K,
    names: ArgNameMap,
    image_arg: usize,
    dimension_args: Vec<usize>,
    arguments: Vec<ReflectedArg>,
}

impl<K: KernelObject> KernelInstance<K> {
    /// Reflects `kernel` and collects everything downstream consumers need.
    pub fn new(kernel: K) -> Result<Self, PlatformError> {
        let names = reflect::map_names_to_arg_indices(&kernel)?;
        let image_arg = reflect::detect_image_arg_index(&names);
        let dimension_args = reflect::detect_dimension_arg_indices(&names);
        let arguments = reflect::detect_argument_types_and_names(&kernel)?;
        Ok(Self {
            kernel,
            names,
            image_arg,
            dimension_args,
            arguments,
        })
    }

    /// Binds `args` to the kernel's argument slots.
    #[inline]
    pub fn apply(&self, args: &KernelArgs) -> Result<(), BindError> {
        apply_args(self, args)
    }
}

impl<K> KernelInstance<K> {
    #[inline]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    #[inline]
    pub fn names(&self) -> &ArgNameMap {
        &self.names
    }

    /// Index of the argument called `name`.
    #[inline]
    pub fn arg_index(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// The index of the `image` argument, or `None` if the kernel has none.
    pub fn image_arg(&self) -> Option<usize> {
        self.names
            .contains_key(reflect::IMAGE_ARG)
            .then_some(self.image_arg)
    }

    /// Indices of the `width`, `height` and `depth` arguments that exist, in that order.
    #[inline]
    pub fn dimension_args(&self) -> &[usize] {
        &self.dimension_args
    }

    /// Types and names of all arguments in native order.
    #[inline]
    pub fn arguments(&self) -> &[ReflectedArg] {
        &self.arguments
    }
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("kernel not found: {0}")]
    NotFound(KernelId),
    #[error("build failed with code {code}: {message}{}", .logs.iter().format(""))]
    Build {
        code: i32,
        message: String,
        logs: Vec<DeviceBuildLog>,
    },
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}
