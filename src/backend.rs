use rustc_hash::FxHashMap as HashMap;

use crate::{
    kernel::{CompilationContext, KernelBase, KernelError, KernelId, KernelInstance},
    platform::{ComputeContext, Platform},
};

pub type KernelRegistry = HashMap<KernelId, KernelBase>;
pub type CompilationCache<K> = HashMap<CompilationContext, KernelInstance<K>>;

/// Compiles registered kernels on demand and caches them per compute context.
///
/// Owns the current context and its default queue. No internal locking: callers sharing a
/// backend across threads serialize access themselves.
pub struct Backend<P: Platform> {
    platform: P,
    context: P::Context,
    queue: P::Queue,
    registry: KernelRegistry,
    cache: CompilationCache<P::Kernel>,
}

impl<P: Platform> Backend<P> {
    pub fn new(platform: P, context: P::Context, queue: P::Queue) -> Self {
        Self {
            platform,
            context,
            queue,
            registry: Default::default(),
            cache: Default::default(),
        }
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[inline]
    pub fn context(&self) -> &P::Context {
        &self.context
    }

    #[inline]
    pub fn queue(&self) -> &P::Queue {
        &self.queue
    }

    /// Registers `base` under `id`, replacing any previous definition which is returned.
    ///
    /// Replacing a definition evicts the kernels compiled from it in every context.
    pub fn register_kernel(&mut self, id: KernelId, base: KernelBase) -> Option<KernelBase> {
        let previous = self.registry.insert(id.clone(), base);
        match previous {
            Some(_) => {
                self.cache.retain(|key, _| key.id != id);
                log::info!("updated kernel: {id}");
            }
            None => log::info!("inserted kernel: {id}"),
        }
        previous
    }

    pub fn find_kernel_base(&self, id: &KernelId) -> Result<&KernelBase, KernelError> {
        self.registry
            .get(id)
            .ok_or_else(|| KernelError::NotFound(id.clone()))
    }

    /// Returns the kernel compiled in the current context, building and reflecting it on a miss.
    ///
    /// The source id is the entry point name. Failed builds are not cached.
    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    pub fn compile_kernel(
        &mut self,
        id: &KernelId,
    ) -> Result<KernelInstance<P::Kernel>, KernelError> {
        let key = CompilationContext {
            id: id.clone(),
            context: self.context.id(),
        };
        if let Some(instance) = self.cache.get(&key) {
            log::info!("cache hit: {key}");
            return Ok(instance.clone());
        }
        log::info!("cache miss: {key}");

        let base = self.find_kernel_base(id).inspect_err(|err| log::error!("{err}"))?;
        let program = base.build(&self.platform, &self.context)?;
        let instance = self
            .platform
            .create_kernel(&program, &id.src)
            .and_then(KernelInstance::new)
            .inspect_err(|err| log::error!("failed to create kernel {id}: {err}"))?;

        self.cache.insert(key, instance.clone());
        Ok(instance)
    }

    /// Drops every compiled kernel. The registry is untouched.
    pub fn clear_cache(&mut self) {
        log::info!("cleared {} cached kernels", self.cache.len());
        self.cache.clear();
    }

    /// Makes `context` current. Kernels compiled in other contexts stay cached.
    pub fn switch_context(&mut self, context: P::Context, queue: P::Queue) {
        log::info!("switched context: {} -> {}", self.context.id(), context.id());
        self.context = context;
        self.queue = queue;
    }

    /// Ids of all registered kernels, sorted.
    pub fn registered(&self) -> Vec<&KernelId> {
        let mut ids: Vec<_> = self.registry.keys().collect();
        ids.sort();
        ids
    }

    /// Number of compiled kernels across all contexts.
    #[inline]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
