use std::{borrow::Cow, sync::Arc};

use naga::{ResourceBinding, valid::Capabilities};
use thiserror::Error;

use super::{
    BuildFailure, ComputeContext, ContextId, DeviceBuildLog, KernelObject, Platform, PlatformError,
    shader::{ShaderArg, ShaderKernel, ShaderProgram},
};
use crate::{arg::KernelArgValue, backend::Backend, platform::ArgInfo};

#[derive(Debug, Clone)]
pub struct GpuContext {
    id: ContextId,
    /// Handle to a WebGPU compute device.
    device: wgpu::Device,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    pub fn new(device: wgpu::Device, adapter_info: wgpu::AdapterInfo) -> Self {
        let id = ContextId::new();
        Self {
            id,
            device,
            adapter_info,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}

impl ComputeContext for GpuContext {
    #[inline]
    fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    fn devices(&self) -> Vec<String> {
        vec![self.adapter_info.name.clone()]
    }
}

#[derive(Debug, Clone)]
pub struct GpuProgram {
    shader: Arc<ShaderProgram>,
    module: wgpu::ShaderModule,
}

impl GpuProgram {
    #[inline]
    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    #[inline]
    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }
}

/// A compute entry point of a shader module. Argument slots are shared among clones.
#[derive(Debug, Clone)]
pub struct GpuKernel {
    kernel: ShaderKernel,
    module: wgpu::ShaderModule,
}

impl PartialEq for GpuKernel {
    fn eq(&self, other: &Self) -> bool {
        self.kernel == other.kernel
    }
}

impl GpuKernel {
    #[inline]
    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    #[inline]
    pub fn args(&self) -> &[ShaderArg] {
        self.kernel.args()
    }

    #[inline]
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.kernel.workgroup_size()
    }

    /// Creates a compute pipeline of the entry point with an automatic layout.
    pub fn pipeline(&self, context: &GpuContext) -> wgpu::ComputePipeline {
        let name = self.kernel.name();
        context
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: None,
                module: &self.module,
                entry_point: Some(name),
                compilation_options: Default::default(),
                cache: None,
            })
    }

    /// Uploads every bound value into its own uniform buffer.
    pub fn uniforms(&self, context: &GpuContext) -> Vec<(ResourceBinding, wgpu::Buffer)> {
        use wgpu::util::DeviceExt;
        self.kernel
            .args()
            .iter()
            .enumerate()
            .filter_map(|(index, arg)| self.kernel.bytes(index).map(|contents| (arg, contents)))
            .map(|(arg, contents)| {
                let buffer = context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(arg.info.name.as_str()),
                        contents: &contents,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    });
                (arg.binding.clone(), buffer)
            })
            .collect()
    }
}

impl KernelObject for GpuKernel {
    #[inline]
    fn name(&self) -> &str {
        self.kernel.name()
    }

    #[inline]
    fn num_args(&self) -> usize {
        self.kernel.num_args()
    }

    #[inline]
    fn arg_info(&self, index: usize) -> Result<ArgInfo, PlatformError> {
        self.kernel.arg_info(index)
    }

    #[inline]
    fn set_arg(&self, index: usize, value: &KernelArgValue) -> Result<(), PlatformError> {
        self.kernel.set_arg(index, value)
    }
}

#[derive(Debug, Default, Clone)]
pub struct GpuPlatform;

impl Platform for GpuPlatform {
    type Context = GpuContext;
    type Queue = wgpu::Queue;
    type Program = GpuProgram;
    type Kernel = GpuKernel;

    fn build_program(
        &self,
        context: &Self::Context,
        source: &str,
        options: &str,
    ) -> Result<Self::Program, BuildFailure> {
        let devices = context.devices();
        let shader = ShaderProgram::compile(source, options, Capabilities::all(), &devices)?;

        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: None,
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader.source())),
        });
        if let Some(err) = futures::executor::block_on(device.pop_error_scope()) {
            let log = err.to_string();
            let logs = devices
                .into_iter()
                .map(|device| DeviceBuildLog {
                    device,
                    options: options.to_string(),
                    log: log.clone(),
                })
                .collect();
            let error = PlatformError::new(
                PlatformError::BUILD_PROGRAM_FAILURE,
                "device rejected the shader module",
            );
            return Err(BuildFailure { error, logs });
        }

        let shader = Arc::new(shader);
        Ok(GpuProgram { shader, module })
    }

    fn build_logs(&self, context: &Self::Context, program: &Self::Program) -> Vec<DeviceBuildLog> {
        program.shader.logs(&context.devices())
    }

    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, PlatformError> {
        let kernel = ShaderKernel::new(program.shader.clone(), name)?;
        let module = program.module.clone();
        Ok(GpuKernel { kernel, module })
    }
}

pub struct GpuBuilder {
    pub adapter: wgpu::Adapter,
    pub features: wgpu::Features,
    pub limits: wgpu::Limits,
}

#[derive(Debug, Error)]
pub enum GpuBuildError {
    #[error("failed to request adaptor")]
    RequestAdapterError(#[from] wgpu::RequestAdapterError),
    #[error("failed to request device")]
    RequestDeviceError(#[from] wgpu::RequestDeviceError),
}

/// Requests the default adapter of the default instance.
pub async fn default_adapter() -> Result<wgpu::Adapter, GpuBuildError> {
    let instance = wgpu::Instance::default();
    let adapter = instance.request_adapter(&Default::default()).await?;
    Ok(adapter)
}

impl GpuBuilder {
    pub fn new(adapter: wgpu::Adapter) -> Self {
        Self {
            adapter,
            features: wgpu::Features::empty(),
            limits: Default::default(),
        }
    }

    pub async fn build(self) -> Result<Backend<GpuPlatform>, GpuBuildError> {
        let Self {
            adapter,
            features,
            limits,
        } = self;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: features,
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("created context on {} ({:?})", info.name, info.backend);
        let context = GpuContext::new(device, info);
        Ok(Backend::new(GpuPlatform, context, queue))
    }

    pub fn limits(mut self, limits: wgpu::Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn features(mut self, features: wgpu::Features) -> Self {
        self.features = features;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{GpuBuilder, default_adapter};
    use crate::{
        arg::{ArgKey, KernelArgValue, KernelArgs},
        kernel::{KernelBase, KernelId},
        platform::KernelObject,
        testing::NEWTON_FRACTAL,
    };

    #[tokio::test]
    async fn test_gpu_kernel() -> Result<(), Box<dyn Error>> {
        let adapter = match default_adapter().await {
            Ok(adapter) => adapter,
            Err(err) => {
                log::warn!("skipped: {err}");
                return Ok(());
            }
        };
        let mut backend = GpuBuilder::new(adapter).build().await?;

        let id = KernelId::new("newton_fractal", "default");
        let base = KernelBase::new(vec![NEWTON_FRACTAL.into()], vec![]);
        backend.register_kernel(id.clone(), base);

        let instance = backend.compile_kernel(&id)?;
        assert_eq!(instance.kernel().name(), "newton_fractal");
        assert_eq!(instance.image_arg(), Some(0));
        assert_eq!(instance.dimension_args(), &[1, 2]);

        let args = KernelArgs::from_iter([
            (ArgKey::from("width"), KernelArgValue::Int32(64)),
            (ArgKey::from("height"), KernelArgValue::Int32(64)),
            (ArgKey::from("scale"), KernelArgValue::Float32(0.5)),
        ]);
        instance.apply(&args)?;

        let uniforms = instance.kernel().uniforms(backend.context());
        let bindings: Vec<_> = uniforms.iter().map(|(binding, _)| binding.binding).collect();
        assert_eq!(bindings, [1, 2, 5]);

        let _pipeline = instance.kernel().pipeline(backend.context());
        Ok(())
    }
}
