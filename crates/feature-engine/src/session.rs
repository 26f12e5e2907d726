use shape_kernel::Kernel;
use sketch_solver::cache::CacheStats;
use sketch_solver::SketchCache;

use crate::config::EngineConfig;
use crate::resources::HandleRegistry;

/// Runtime companion of one part studio: its kernel, solved-sketch cache and
/// the handles its ops own. One session per studio; never shared.
pub struct StudioSession {
    pub(crate) kernel: Box<dyn Kernel + Send>,
    pub(crate) sketches: SketchCache,
    pub(crate) registry: HandleRegistry,
    pub(crate) config: EngineConfig,
    generation: u64,
}

impl StudioSession {
    pub fn new(kernel: impl Kernel + Send + 'static, config: EngineConfig) -> Self {
        Self::with_kernel(Box::new(kernel), config)
    }

    pub fn with_kernel(kernel: Box<dyn Kernel + Send>, config: EngineConfig) -> Self {
        tracing::debug!(kernel = kernel.name(), "session opened");
        Self {
            kernel,
            sketches: SketchCache::default(),
            registry: HandleRegistry::new(),
            config,
            generation: 0,
        }
    }

    pub fn kernel(&self) -> &dyn Kernel {
        &*self.kernel
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn sketch_stats(&self) -> CacheStats {
        self.sketches.stats()
    }

    pub fn sketch_cache(&self) -> &SketchCache {
        &self.sketches
    }

    /// Generation stamped on the next rebuild report.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Free every handle owned by the studio's ops.
    pub fn release_all(&mut self) -> usize {
        self.registry.release_all(&mut *self.kernel)
    }
}

impl Drop for StudioSession {
    fn drop(&mut self) {
        let freed = self.release_all();
        tracing::debug!(freed, "session closed");
    }
}

impl std::fmt::Debug for StudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioSession")
            .field("kernel", &self.kernel.name())
            .field("owned", &self.registry.len())
            .field("generation", &self.generation)
            .finish()
    }
}
