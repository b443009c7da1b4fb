//! A platform that runs the WGSL front end without touching any device.
//!
//! Programs are parsed, validated and reflected by naga; argument slots are held in memory.
//! Useful for tests and for checking kernels on machines without an adapter.

use std::sync::Arc;

use naga::valid::Capabilities;

use super::{
    BuildFailure, ComputeContext, ContextId, DeviceBuildLog, Platform, PlatformError,
    shader::{ShaderKernel, ShaderProgram},
};

#[derive(Debug, Clone)]
pub struct NagaContext {
    id: ContextId,
    device: String,
}

impl Default for NagaContext {
    fn default() -> Self {
        Self::new("naga")
    }
}

impl NagaContext {
    /// Creates a context with a single (virtual) device of the given name.
    pub fn new(device: impl Into<String>) -> Self {
        let id = ContextId::new();
        let device = device.into();
        Self { id, device }
    }
}

impl ComputeContext for NagaContext {
    #[inline]
    fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    fn devices(&self) -> Vec<String> {
        vec![self.device.clone()]
    }
}

#[derive(Debug, Clone)]
pub struct NagaPlatform {
    capabilities: Capabilities,
}

impl Default for NagaPlatform {
    fn default() -> Self {
        Self::with_capabilities(Capabilities::all())
    }
}

impl NagaPlatform {
    /// Validates programs against `capabilities` instead of everything naga supports.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl Platform for NagaPlatform {
    type Context = NagaContext;
    type Queue = ();
    type Program = Arc<ShaderProgram>;
    type Kernel = ShaderKernel;

    fn build_program(
        &self,
        context: &Self::Context,
        source: &str,
        options: &str,
    ) -> Result<Self::Program, BuildFailure> {
        let devices = context.devices();
        ShaderProgram::compile(source, options, self.capabilities, &devices).map(Arc::new)
    }

    fn build_logs(&self, context: &Self::Context, program: &Self::Program) -> Vec<DeviceBuildLog> {
        program.logs(&context.devices())
    }

    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, PlatformError> {
        ShaderKernel::new(program.clone(), name)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use naga::valid::Capabilities;

    use super::{NagaContext, NagaPlatform};
    use crate::{
        platform::{ComputeContext, KernelObject, Platform, PlatformError},
        testing::{NEWTON_FRACTAL, SCALE},
    };

    #[test]
    fn test_context() {
        let x = NagaContext::default();
        let y = NagaContext::new("other");
        assert_ne!(x.id(), y.id());
        assert_eq!(x.id(), x.clone().id());
        assert_eq!(x.devices(), vec!["naga".to_string()]);
        assert_eq!(y.devices(), vec!["other".to_string()]);
    }

    #[test]
    fn test_build() -> Result<(), Box<dyn Error>> {
        let platform = NagaPlatform::default();
        let context = NagaContext::default();

        let program = platform.build_program(&context, NEWTON_FRACTAL, "")?;
        let logs = platform.build_logs(&context, &program);
        assert_eq!(logs.len(), 1);
        assert!(logs[0].is_empty());

        let kernel = platform.create_kernel(&program, "newton_fractal")?;
        assert_eq!(kernel.name(), "newton_fractal");
        assert_eq!(kernel.num_args(), 7);

        let err = platform
            .create_kernel(&program, "missing")
            .expect_err("no such kernel");
        assert_eq!(err.code, PlatformError::INVALID_KERNEL_NAME);
        Ok(())
    }

    #[test]
    fn test_capabilities() {
        let platform = NagaPlatform::with_capabilities(Capabilities::empty());
        let context = NagaContext::default();

        let failure = platform
            .build_program(&context, SCALE, "-D USE_DOUBLE_PRECISION")
            .expect_err("f64 requires a capability");
        assert_eq!(failure.error.code, PlatformError::BUILD_PROGRAM_FAILURE);
        assert!(platform.build_program(&context, SCALE, "").is_ok());
    }
}
