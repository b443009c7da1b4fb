//! `kiln` compiles compute kernels from registered source fragments, caches the compiled
//! instances per context and binds arguments to them by name or by index.
//!
//! ## Key Components
//! 1. [`platform`]: the compute platform seam. [`platform::headless`] builds and reflects WGSL
//!    with naga alone; `platform::gpu` (feature `gpu`) additionally creates wgpu pipelines.
//! 2. [`kernel`]: source fragments, kernel bases, argument reflection and compiled instances.
//! 3. [`backend`]: the registry of kernel bases and the per-context compilation cache.
//! 4. [`arg`]: typed argument values, per-kernel argument configuration and argument binding.

pub mod arg;
pub mod backend;
pub mod kernel;
pub mod platform;

#[cfg(test)]
mod testing;

pub use arg::{ArgKey, ConfigurationStorage, KernelArgType, KernelArgValue, KernelArgs};
pub use backend::Backend;
pub use kernel::{KernelBase, KernelError, KernelId, KernelInstance, SourcesRegistry};
pub use platform::{ComputeContext, KernelObject, Platform, PlatformError};
