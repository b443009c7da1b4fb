//! The compute platform boundary.
//!
//! Everything the runtime needs from a native compute API goes through the traits here:
//! building a program in a context, creating a kernel by entry point name, introspecting the
//! kernel's arguments and binding values to its argument slots. All calls are synchronous.

use derive_more::{Deref, Display};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arg::KernelArgValue;

#[cfg(feature = "gpu")]
pub mod gpu;
pub mod headless;
pub mod shader;

/// Identity of a compute context, handed out once when the context is created.
#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, Hash, Deref)]
pub struct ContextId(uid::Id<ContextId>);

impl ContextId {
    #[inline]
    pub fn new() -> Self {
        Self(uid::Id::new())
    }
}

/// Address space an argument lives in, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AddressQualifier {
    Global,
    Constant,
    Local,
    Private,
}

/// Platform-reported information of one kernel argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgInfo {
    pub name: String,
    pub type_name: String,
    pub qualifier: AddressQualifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("platform error {code}: {message}")]
pub struct PlatformError {
    pub code: i32,
    pub message: String,
}

impl PlatformError {
    pub const BUILD_PROGRAM_FAILURE: i32 = -11;
    pub const INVALID_BUILD_OPTIONS: i32 = -43;
    pub const INVALID_PROGRAM: i32 = -44;
    pub const INVALID_KERNEL_NAME: i32 = -46;
    pub const INVALID_ARG_INDEX: i32 = -49;
    pub const INVALID_ARG_VALUE: i32 = -50;
    pub const INVALID_ARG_SIZE: i32 = -51;

    #[inline]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        Self { code, message }
    }
}

/// Build log of a program for one device of a context.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceBuildLog {
    pub device: String,
    /// Echo of the options the program was built with.
    pub options: String,
    pub log: String,
}

impl DeviceBuildLog {
    /// Returns `true` if the log holds nothing but whitespace.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.log.trim().is_empty()
    }
}

impl std::fmt::Display for DeviceBuildLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "build options: {}", self.options)?;
        writeln!(f, "build log for device {}:", self.device)?;
        match self.is_empty() {
            true => write!(f, "(empty)"),
            false => write!(f, "{}", self.log.trim_end()),
        }
    }
}

/// A failed program build: the platform error plus a log for every device of the context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct BuildFailure {
    pub error: PlatformError,
    pub logs: Vec<DeviceBuildLog>,
}

/// A native compute context: a device (or a group of devices) kernels are built for.
pub trait ComputeContext: Clone {
    /// The identity of the context. Two contexts never share one.
    fn id(&self) -> ContextId;
    /// Names of the devices associated with the context.
    fn devices(&self) -> Vec<String>;
}

/// A compiled kernel handle.
///
/// Copies of a handle refer to the same native kernel, including its argument slots.
pub trait KernelObject: Clone {
    /// The entry point name.
    fn name(&self) -> &str;
    fn num_args(&self) -> usize;
    fn arg_info(&self, index: usize) -> Result<ArgInfo, PlatformError>;
    /// Binds `value` to the argument slot at `index`.
    fn set_arg(&self, index: usize, value: &KernelArgValue) -> Result<(), PlatformError>;
}

pub trait Platform {
    type Context: ComputeContext;
    type Queue: Clone;
    type Program;
    type Kernel: KernelObject;

    /// Builds one compilation unit with the given space-separated options.
    fn build_program(
        &self,
        context: &Self::Context,
        source: &str,
        options: &str,
    ) -> Result<Self::Program, BuildFailure>;

    /// Build logs of a successfully built program, one per device of the context.
    fn build_logs(&self, context: &Self::Context, program: &Self::Program) -> Vec<DeviceBuildLog>;

    /// Creates a kernel from the entry point called `name`.
    fn create_kernel(&self, program: &Self::Program, name: &str)
    -> Result<Self::Kernel, PlatformError>;
}
