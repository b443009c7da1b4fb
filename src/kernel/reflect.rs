//! Runtime discovery of a compiled kernel's argument names and types.

use derive_more::Display;
use rustc_hash::FxHashMap as HashMap;

use crate::{
    arg::KernelArgType,
    platform::{AddressQualifier, KernelObject, PlatformError},
};

pub type ArgNameMap = HashMap<String, usize>;

pub const IMAGE_ARG: &str = "image";
pub const DIMENSION_ARGS: [&str; 3] = ["width", "height", "depth"];

/// Detected type and name of one kernel argument.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
#[display("{} {}", r#type, name)]
pub struct ReflectedArg {
    pub r#type: KernelArgType,
    pub name: String,
}

impl ReflectedArg {
    #[inline]
    pub fn new(r#type: KernelArgType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self { r#type, name }
    }
}

/// Maps argument names to their indices. Later arguments win on duplicate names.
pub fn map_names_to_arg_indices<K: KernelObject>(kernel: &K) -> Result<ArgNameMap, PlatformError> {
    let mut names = ArgNameMap::default();
    for index in 0..kernel.num_args() {
        let info = kernel.arg_info(index)?;
        names.insert(info.name, index);
    }
    Ok(names)
}

/// Index of the `image` argument, `0` if there is none.
///
/// The fallback is not meaningful; check `names` for presence.
#[inline]
pub fn detect_image_arg_index(names: &ArgNameMap) -> usize {
    names.get(IMAGE_ARG).copied().unwrap_or_default()
}

/// Indices of the `width`, `height` and `depth` arguments, skipping the ones that are absent.
pub fn detect_dimension_arg_indices(names: &ArgNameMap) -> Vec<usize> {
    DIMENSION_ARGS
        .iter()
        .filter_map(|&name| names.get(name).copied())
        .collect()
}

/// Classifies one argument: the type catalog first, then the address qualifier.
pub fn detect_kernel_arg_type(type_name: &str, qualifier: AddressQualifier) -> KernelArgType {
    match (KernelArgType::from_type_name(type_name), qualifier) {
        (Some(r#type), _) => r#type,
        (None, AddressQualifier::Private) => KernelArgType::Unknown,
        (None, _) => KernelArgType::Buffer,
    }
}

/// Types and names of all arguments, in native order.
pub fn detect_argument_types_and_names<K: KernelObject>(
    kernel: &K,
) -> Result<Vec<ReflectedArg>, PlatformError> {
    let arguments = (0..kernel.num_args())
        .map(|index| {
            let info = kernel.arg_info(index)?;
            let r#type = detect_kernel_arg_type(&info.type_name, info.qualifier);
            Ok(ReflectedArg::new(r#type, info.name))
        })
        .collect::<Result<Vec<_>, PlatformError>>()?;
    log::info!(
        "reflected {}: [{}]",
        kernel.name(),
        itertools::join(&arguments, ", ")
    );
    Ok(arguments)
}
