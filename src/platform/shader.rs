//! WGSL front end shared by the platforms.
//!
//! A compilation unit goes through three stages:
//! 1. build options (`-D NAME[=VALUE]`) become macro definitions for the `gpp` preprocessor;
//! 2. the preprocessed text is parsed by the naga WGSL front end;
//! 3. the module is validated, which also yields the usage info needed for argument reflection.
//!
//! Kernel arguments are the resource-bound globals an entry point uses, ordered by
//! `(group, binding)`.

use std::sync::{Arc, Mutex};

use itertools::Itertools;
use naga::{
    AddressSpace, Handle, ImageClass, ImageDimension, Module, ResourceBinding, Scalar, ScalarKind,
    ShaderStage, Type, TypeInner,
    valid::{Capabilities, ModuleInfo, ValidationFlags, Validator},
};

use super::{AddressQualifier, ArgInfo, BuildFailure, DeviceBuildLog, KernelObject, PlatformError};
use crate::arg::{KernelArgType, KernelArgValue};

/// A preprocessed, parsed and validated WGSL module.
#[derive(Debug)]
pub struct ShaderProgram {
    source: String,
    options: String,
    module: Module,
    info: ModuleInfo,
}

impl ShaderProgram {
    /// Runs the front end on `source`. On failure every device in `devices` gets a log section.
    pub fn compile(
        source: &str,
        options: &str,
        capabilities: Capabilities,
        devices: &[String],
    ) -> Result<Self, BuildFailure> {
        let failure = |error: PlatformError, log: String| {
            let logs = devices
                .iter()
                .map(|device| DeviceBuildLog {
                    device: device.clone(),
                    options: options.to_string(),
                    log: log.clone(),
                })
                .collect();
            BuildFailure { error, logs }
        };
        let build_error = |message: String| {
            PlatformError::new(PlatformError::BUILD_PROGRAM_FAILURE, message)
        };

        let defines = parse_options(options).map_err(|err| {
            let log = err.message.clone();
            failure(err, log)
        })?;

        let mut context = gpp::Context::new();
        context.macros.extend(defines);
        let source = gpp::process_str(source, &mut context)
            .map_err(|err| failure(build_error(format!("preprocessor: {err}")), err.to_string()))?;

        let module = naga::front::wgsl::parse_str(&source)
            .map_err(|err| failure(build_error(err.to_string()), err.emit_to_string(&source)))?;

        let mut validator = Validator::new(ValidationFlags::all(), capabilities);
        let info = validator
            .validate(&module)
            .map_err(|err| failure(build_error(err.to_string()), err.emit_to_string(&source)))?;

        let options = options.to_string();
        Ok(Self {
            source,
            options,
            module,
            info,
        })
    }

    /// The preprocessed source the module was parsed from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn options(&self) -> &str {
        &self.options
    }

    #[inline]
    pub fn module(&self) -> &Module {
        &self.module
    }

    #[inline]
    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Build logs of the program. The front end reports nothing on success.
    pub fn logs(&self, devices: &[String]) -> Vec<DeviceBuildLog> {
        devices
            .iter()
            .map(|device| DeviceBuildLog {
                device: device.clone(),
                options: self.options.clone(),
                log: String::new(),
            })
            .collect()
    }

    /// Reflects the arguments of entry point `index`.
    pub fn reflect(&self, index: usize) -> Vec<ShaderArg> {
        let usage = self.info.get_entry_point(index);
        self.module
            .global_variables
            .iter()
            .filter(|&(handle, _)| !usage[handle].is_empty())
            .filter_map(|(_, var)| var.binding.clone().map(|binding| (binding, var)))
            .sorted_by_key(|(binding, _)| (binding.group, binding.binding))
            .map(|(binding, var)| {
                let name = var.name.clone().unwrap_or_default();
                let type_name = type_name(&self.module, var.ty);
                let qualifier = match var.space {
                    AddressSpace::Storage { .. } | AddressSpace::Handle => AddressQualifier::Global,
                    AddressSpace::Uniform => AddressQualifier::Constant,
                    AddressSpace::WorkGroup => AddressQualifier::Local,
                    _ => AddressQualifier::Private,
                };
                let info = ArgInfo {
                    name,
                    type_name,
                    qualifier,
                };
                ShaderArg { info, binding }
            })
            .collect()
    }
}

/// Turns OpenCL-style build options into macro definitions.
///
/// Accepts `-D NAME`, `-DNAME` and the `=VALUE` forms of both. A bare name is defined to `1`.
pub fn parse_options(options: &str) -> Result<Vec<(String, String)>, PlatformError> {
    let mut defines = vec![];
    let mut tokens = options.split_whitespace();
    while let Some(token) = tokens.next() {
        let define = match token.strip_prefix("-D") {
            Some("") => tokens.next().ok_or_else(|| {
                PlatformError::new(
                    PlatformError::INVALID_BUILD_OPTIONS,
                    "missing macro name after `-D`",
                )
            })?,
            Some(define) => define,
            None => {
                return Err(PlatformError::new(
                    PlatformError::INVALID_BUILD_OPTIONS,
                    format!("unrecognized build option `{token}`"),
                ));
            }
        };
        let (name, value) = define.split_once('=').unwrap_or((define, "1"));
        defines.push((name.to_string(), value.to_string()));
    }
    Ok(defines)
}

fn scalar_name(scalar: Scalar) -> &'static str {
    match (scalar.kind, scalar.width) {
        (ScalarKind::Sint, 4) => "i32",
        (ScalarKind::Sint, 8) => "i64",
        (ScalarKind::Uint, 4) => "u32",
        (ScalarKind::Uint, 8) => "u64",
        (ScalarKind::Float, 2) => "f16",
        (ScalarKind::Float, 4) => "f32",
        (ScalarKind::Float, 8) => "f64",
        (ScalarKind::Bool, _) => "bool",
        _ => "abstract",
    }
}

/// WGSL spelling of a type, without storage formats or access modes.
fn type_name(module: &Module, ty: Handle<Type>) -> String {
    let r#type = &module.types[ty];
    match r#type.inner {
        TypeInner::Scalar(scalar) => scalar_name(scalar).to_string(),
        TypeInner::Vector { size, scalar } => format!("vec{}<{}>", size as u8, scalar_name(scalar)),
        TypeInner::Atomic(scalar) => format!("atomic<{}>", scalar_name(scalar)),
        TypeInner::Array { base, .. } => format!("array<{}>", type_name(module, base)),
        TypeInner::Image { dim, class, .. } => {
            let dim = match dim {
                ImageDimension::D1 => "1d",
                ImageDimension::D2 => "2d",
                ImageDimension::D3 => "3d",
                ImageDimension::Cube => "cube",
            };
            match class {
                ImageClass::Storage { .. } => format!("texture_storage_{dim}"),
                ImageClass::Depth { .. } => format!("texture_depth_{dim}"),
                _ => format!("texture_{dim}"),
            }
        }
        TypeInner::Sampler { .. } => "sampler".to_string(),
        _ => r#type.name.clone().unwrap_or_else(|| "struct".to_string()),
    }
}

/// A reflected kernel argument: platform info plus the resource binding it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderArg {
    pub info: ArgInfo,
    pub binding: ResourceBinding,
}

#[derive(Debug)]
struct ShaderKernelInner {
    program: Arc<ShaderProgram>,
    name: String,
    workgroup_size: [u32; 3],
    args: Vec<ShaderArg>,
    slots: Mutex<Vec<Option<KernelArgValue>>>,
}

/// A compute entry point of a [`ShaderProgram`] together with its argument slots.
///
/// Clones share the slots; equality is handle identity.
#[derive(Debug, Clone)]
pub struct ShaderKernel(Arc<ShaderKernelInner>);

impl PartialEq for ShaderKernel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ShaderKernel {}

impl ShaderKernel {
    pub fn new(program: Arc<ShaderProgram>, name: &str) -> Result<Self, PlatformError> {
        let (index, entry) = program
            .module
            .entry_points
            .iter()
            .find_position(|entry| entry.stage == ShaderStage::Compute && entry.name == name)
            .ok_or_else(|| {
                PlatformError::new(
                    PlatformError::INVALID_KERNEL_NAME,
                    format!("no compute entry point named `{name}`"),
                )
            })?;
        let workgroup_size = entry.workgroup_size;
        let args = program.reflect(index);
        let slots = Mutex::new(vec![None; args.len()]);
        let name = name.to_string();
        Ok(Self(Arc::new(ShaderKernelInner {
            program,
            name,
            workgroup_size,
            args,
            slots,
        })))
    }

    #[inline]
    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.0.program
    }

    #[inline]
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.0.workgroup_size
    }

    #[inline]
    pub fn args(&self) -> &[ShaderArg] {
        &self.0.args
    }

    /// The value currently bound at `index`.
    pub fn value(&self, index: usize) -> Option<KernelArgValue> {
        let slots = self.0.slots.lock().expect("failed to lock");
        slots.get(index).copied().flatten()
    }

    /// A snapshot of all argument slots.
    pub fn values(&self) -> Vec<Option<KernelArgValue>> {
        self.0.slots.lock().expect("failed to lock").clone()
    }

    /// The bytes currently bound at `index`, ready to be uploaded.
    #[inline]
    pub fn bytes(&self, index: usize) -> Option<Box<[u8]>> {
        self.value(index).map(|value| value.to_bytes())
    }
}

impl KernelObject for ShaderKernel {
    #[inline]
    fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    fn num_args(&self) -> usize {
        self.0.args.len()
    }

    fn arg_info(&self, index: usize) -> Result<ArgInfo, PlatformError> {
        self.0
            .args
            .get(index)
            .map(|arg| arg.info.clone())
            .ok_or_else(|| invalid_index(index, self.num_args()))
    }

    fn set_arg(&self, index: usize, value: &KernelArgValue) -> Result<(), PlatformError> {
        let arg = self
            .0
            .args
            .get(index)
            .ok_or_else(|| invalid_index(index, self.num_args()))?;
        let invalid_value = |reason: String| {
            PlatformError::new(
                PlatformError::INVALID_ARG_VALUE,
                format!(
                    "argument #{index} ({} {}) {reason}",
                    arg.info.type_name, arg.info.name
                ),
            )
        };

        let (r#type, size) = KernelArgType::from_type_name(&arg.info.type_name)
            .and_then(|r#type| r#type.size().map(|size| (r#type, size)))
            .ok_or_else(|| invalid_value("does not take a value".into()))?;

        // integers bind to integer slots and floats to float slots, regardless of signedness
        let class = |r#type: KernelArgType| r#type.traits().map(|traits| traits.class);
        if class(r#type) != class(value.arg_type()) {
            let reason = format!("cannot take {value} of type {}", value.arg_type());
            return Err(invalid_value(reason));
        }

        if size != value.size() {
            return Err(PlatformError::new(
                PlatformError::INVALID_ARG_SIZE,
                format!(
                    "argument #{index} ({} {}) takes {size} bytes, got {} from {value}",
                    arg.info.type_name,
                    arg.info.name,
                    value.size()
                ),
            ));
        }

        let mut slots = self.0.slots.lock().expect("failed to lock");
        slots[index] = Some(*value);
        Ok(())
    }
}

fn invalid_index(index: usize, count: usize) -> PlatformError {
    PlatformError::new(
        PlatformError::INVALID_ARG_INDEX,
        format!("argument index {index} is out of range ({count} arguments)"),
    )
}
