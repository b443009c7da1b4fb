//! Kernels and a counting platform shared by the unit tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::platform::{
    BuildFailure, DeviceBuildLog, Platform, PlatformError,
    headless::{NagaContext, NagaPlatform},
    shader::{ShaderKernel, ShaderProgram},
};

pub const NEWTON_FRACTAL: &str = r#"
@group(0) @binding(0) var image: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(1) var<uniform> width: u32;
@group(0) @binding(2) var<uniform> height: u32;
@group(0) @binding(3) var<uniform> seed: u32;
@group(0) @binding(4) var<uniform> center: vec2<f32>;
@group(0) @binding(5) var<uniform> scale: f32;
@group(0) @binding(6) var<storage, read_write> hits: array<u32>;

@compute @workgroup_size(8, 8, 1)
fn newton_fractal(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= width || id.y >= height) {
        return;
    }
    let z = center + scale * vec2<f32>(f32(id.x), f32(id.y));
    let v = fract(length(z) + f32(seed));
    hits[id.y * width + id.x] = seed;
    textureStore(image, vec2<i32>(id.xy), vec4<f32>(v, v, v, 1.0));
}
"#;

pub const SCALE: &str = r#"
#ifdef USE_DOUBLE_PRECISION
alias real = f64;
#else
alias real = f32;
#endif

@group(0) @binding(0) var<storage, read_write> data: array<real>;
@group(0) @binding(1) var<uniform> factor: real;

@compute @workgroup_size(64)
fn scale(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = data[id.x] * factor;
}
"#;

/// Counts program builds on top of [`NagaPlatform`].
#[derive(Debug, Default, Clone)]
pub struct Phony {
    platform: NagaPlatform,
    builds: Arc<AtomicUsize>,
}

impl Phony {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Acquire)
    }
}

impl Platform for Phony {
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
        self.builds.fetch_add(1, Ordering::AcqRel);
        self.platform.build_program(context, source, options)
    }

    fn build_logs(&self, context: &Self::Context, program: &Self::Program) -> Vec<DeviceBuildLog> {
        self.platform.build_logs(context, program)
    }

    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, PlatformError> {
        self.platform.create_kernel(program, name)
    }
}
