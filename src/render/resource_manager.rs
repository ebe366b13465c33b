use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::error::{ChartError, ChartResult};
use crate::render::buffer::{Buffer, BufferDescriptor};
use crate::render::device::RenderDevice;
use crate::render::shader::{Shader, ShaderSource};
use crate::render::texture::{Texture, TextureDescriptor};

/// Work queued from another thread, run on the render thread with access to
/// the manager and the device.
pub type RenderThreadOp =
    Box<dyn FnOnce(&mut ResourceManager, &mut dyn RenderDevice) -> ChartResult<()> + Send>;

type PendingQueue = Arc<Mutex<VecDeque<RenderThreadOp>>>;

/// Cloneable, thread-safe handle for queueing render-thread work.
#[derive(Clone)]
pub struct RenderQueueHandle {
    queue: PendingQueue,
}

impl RenderQueueHandle {
    pub fn run_on_render_thread<F>(&self, op: F)
    where
        F: FnOnce(&mut ResourceManager, &mut dyn RenderDevice) -> ChartResult<()> + Send + 'static,
    {
        self.queue.lock().push_back(Box::new(op));
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.lock().len()
    }
}

impl fmt::Debug for RenderQueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderQueueHandle")
            .field("pending", &self.pending_len())
            .finish()
    }
}

/// A resource detached from its name, waiting to be released on the render
/// thread.
enum Retired {
    Shader(Box<dyn Shader>),
    Buffer(Box<dyn Buffer>),
    Texture(Box<dyn Texture>),
}

impl Retired {
    fn dispose(mut self) {
        match &mut self {
            Self::Shader(shader) => shader.dispose(),
            Self::Buffer(buffer) => buffer.dispose(),
            Self::Texture(texture) => texture.dispose(),
        }
    }
}

/// Summary of one [`ResourceManager::process_pending_operations`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingReport {
    pub executed: usize,
    pub failed: usize,
    pub disposed: usize,
}

/// Owns every named GPU resource of a chart.
///
/// Lookups are by name and creation is lazy. All methods run on the render
/// thread; other threads go through [`RenderQueueHandle`].
pub struct ResourceManager {
    initialized: bool,
    shaders: IndexMap<String, Box<dyn Shader>>,
    buffers: IndexMap<String, Box<dyn Buffer>>,
    textures: IndexMap<String, Box<dyn Texture>>,
    pending: PendingQueue,
    retired: Vec<Retired>,
}

impl ResourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: false,
            shaders: IndexMap::new(),
            buffers: IndexMap::new(),
            textures: IndexMap::new(),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            retired: Vec::new(),
        }
    }

    /// Compiles the built-in programs. Compile failures leave invalid shaders
    /// registered and are logged; they do not fail initialization.
    pub fn initialize(&mut self, device: &mut dyn RenderDevice) -> ChartResult<()> {
        if !device.is_initialized() {
            return Err(ChartError::NotInitialized("render device"));
        }
        debug!(backend = %device.backend(), "initialize resource manager");
        for source in ShaderSource::builtins() {
            let name = source.name().to_owned();
            let valid = self.create_shader(device, &name, &source)?.is_valid();
            if valid {
                debug!(shader = %name, "loaded built-in shader");
            }
        }
        self.initialized = true;
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn queue_handle(&self) -> RenderQueueHandle {
        RenderQueueHandle {
            queue: Arc::clone(&self.pending),
        }
    }

    /// Queues `op` for the next [`Self::process_pending_operations`].
    pub fn run_on_render_thread<F>(&self, op: F)
    where
        F: FnOnce(&mut ResourceManager, &mut dyn RenderDevice) -> ChartResult<()> + Send + 'static,
    {
        self.pending.lock().push_back(Box::new(op));
    }

    /// Runs every operation queued before this call, in enqueue order, then
    /// releases retired resources. Operations queued while draining wait for
    /// the next call. A failing operation is logged and does not stop the
    /// rest.
    pub fn process_pending_operations(&mut self, device: &mut dyn RenderDevice) -> PendingReport {
        let batch = std::mem::take(&mut *self.pending.lock());
        let mut report = PendingReport::default();

        for op in batch {
            match op(self, &mut *device) {
                Ok(()) => report.executed += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(error = %err, "queued render-thread operation failed");
                }
            }
        }

        report.disposed = self.drain_retired();
        if report.executed + report.failed + report.disposed > 0 {
            trace!(
                executed = report.executed,
                failed = report.failed,
                disposed = report.disposed,
                "processed pending operations"
            );
        }
        report
    }

    fn drain_retired(&mut self) -> usize {
        let retired = std::mem::take(&mut self.retired);
        let count = retired.len();
        for resource in retired {
            resource.dispose();
        }
        count
    }

    pub fn create_shader(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        source: &ShaderSource,
    ) -> ChartResult<&mut (dyn Shader + 'static)> {
        let shader = device.create_shader(source)?;
        if !shader.is_valid() {
            error!(shader = %name, "shader failed to compile; draws using it will be skipped");
        }
        Ok(self.register_shader(name, shader))
    }

    /// Registers `shader` under `name`. A shader previously registered under
    /// the same name is released on the next drain.
    pub fn register_shader(
        &mut self,
        name: &str,
        shader: Box<dyn Shader>,
    ) -> &mut (dyn Shader + 'static) {
        let (index, previous) = self.shaders.insert_full(name.to_owned(), shader);
        if let Some(previous) = previous {
            self.retired.push(Retired::Shader(previous));
        }
        &mut *self.shaders[index]
    }

    #[must_use]
    pub fn shader(&self, name: &str) -> Option<&dyn Shader> {
        self.shaders.get(name).map(|resource| &**resource)
    }

    pub fn shader_mut(&mut self, name: &str) -> Option<&mut (dyn Shader + 'static)> {
        self.shaders.get_mut(name).map(|resource| &mut **resource)
    }

    /// Returns the buffer registered under `name`, creating it from
    /// `descriptor` on first use. Later calls ignore `descriptor`.
    pub fn get_or_create_buffer(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        descriptor: &BufferDescriptor,
    ) -> ChartResult<&mut (dyn Buffer + 'static)> {
        let index = match self.buffers.get_index_of(name) {
            Some(index) => index,
            None => {
                let buffer = device.create_buffer(&descriptor.labeled(name))?;
                debug!(
                    buffer = %name,
                    floats_per_vertex = descriptor.floats_per_vertex(),
                    "created buffer"
                );
                self.buffers.insert_full(name.to_owned(), buffer).0
            }
        };
        Ok(&mut *self.buffers[index])
    }

    #[must_use]
    pub fn buffer(&self, name: &str) -> Option<&dyn Buffer> {
        self.buffers.get(name).map(|resource| &**resource)
    }

    pub fn buffer_mut(&mut self, name: &str) -> Option<&mut (dyn Buffer + 'static)> {
        self.buffers.get_mut(name).map(|resource| &mut **resource)
    }

    /// Disposes and forgets a buffer. Returns `false` when no buffer had
    /// that name.
    pub fn dispose_buffer(&mut self, name: &str) -> bool {
        match self.buffers.shift_remove(name) {
            Some(mut buffer) => {
                buffer.dispose();
                debug!(buffer = %name, "disposed buffer");
                true
            }
            None => false,
        }
    }

    /// Detaches a buffer now and releases it on the next drain, for buffers
    /// that in-flight GPU work may still read.
    pub fn retire_buffer(&mut self, name: &str) -> bool {
        match self.buffers.shift_remove(name) {
            Some(buffer) => {
                self.retired.push(Retired::Buffer(buffer));
                true
            }
            None => false,
        }
    }

    pub fn create_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        descriptor: &TextureDescriptor,
    ) -> ChartResult<&mut (dyn Texture + 'static)> {
        let texture = device.create_texture(descriptor)?;
        Ok(self.register_texture(name, texture))
    }

    /// Registers `texture` under `name`; a replaced texture is released on
    /// the next drain.
    pub fn register_texture(
        &mut self,
        name: &str,
        texture: Box<dyn Texture>,
    ) -> &mut (dyn Texture + 'static) {
        let (index, previous) = self.textures.insert_full(name.to_owned(), texture);
        if let Some(previous) = previous {
            self.retired.push(Retired::Texture(previous));
        }
        &mut *self.textures[index]
    }

    #[must_use]
    pub fn texture(&self, name: &str) -> Option<&dyn Texture> {
        self.textures.get(name).map(|resource| &**resource)
    }

    pub fn texture_mut(&mut self, name: &str) -> Option<&mut (dyn Texture + 'static)> {
        self.textures.get_mut(name).map(|resource| &mut **resource)
    }

    pub fn dispose_texture(&mut self, name: &str) -> bool {
        match self.textures.shift_remove(name) {
            Some(mut texture) => {
                texture.dispose();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Releases everything: shaders, then buffers, then textures, then any
    /// retired resources still waiting. Queued operations are dropped
    /// without running.
    pub fn dispose(&mut self) {
        debug!(
            shaders = self.shaders.len(),
            buffers = self.buffers.len(),
            textures = self.textures.len(),
            "dispose resource manager"
        );
        self.initialized = false;

        for (_, mut shader) in self.shaders.drain(..) {
            shader.dispose();
        }
        for (_, mut buffer) in self.buffers.drain(..) {
            buffer.dispose();
        }
        for (_, mut texture) in self.textures.drain(..) {
            texture.dispose();
        }
        self.drain_retired();

        let dropped = {
            let mut queue = self.pending.lock();
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        if dropped > 0 {
            warn!(dropped, "dropped queued render-thread operations on dispose");
        }
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("initialized", &self.initialized)
            .field("shaders", &self.shaders.keys().collect::<Vec<_>>())
            .field("buffers", &self.buffers.keys().collect::<Vec<_>>())
            .field("textures", &self.textures.keys().collect::<Vec<_>>())
            .field("retired", &self.retired.len())
            .finish()
    }
}
