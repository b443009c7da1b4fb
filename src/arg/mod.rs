//! Kernel arguments: values, the type catalog, configuration and binding.

pub mod binder;
pub mod config;
pub mod storage;
pub mod types;
pub mod value;

pub use binder::{ArgKey, BindError, KernelArgs, apply_args};
pub use config::{
    ArgExtension, ArgProperties, Configuration, ExtensionError, ParseError, ParseErrorKind, Tokens,
    parse_configuration,
};
pub use kiln_derive::ArgExtension;
pub use storage::{ConfigError, ConfigurationStorage};
pub use types::{
    FromComponents, KernelArgClass, KernelArgType, KernelArgTypeTraits, find_type_traits,
};
pub use value::KernelArgValue;
