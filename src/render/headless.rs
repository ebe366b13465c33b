//! Recording backend that needs no GPU.
//!
//! Every call is validated the way a real driver would and appended to a log
//! that tests, benchmarks and headless hosts can inspect through
//! [`HeadlessRecorder`]. Draws optionally capture the exact vertex floats.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{ChartError, ChartResult};
use crate::render::buffer::{Buffer, BufferDescriptor, grown_capacity};
use crate::render::color::Color;
use crate::render::device::{
    BlendMode, DeviceCapabilities, DrawMode, PixelRect, RenderBackend, RenderDevice,
};
use crate::render::shader::{Shader, ShaderSource, ShaderStage, UniformValue};
use crate::render::texture::{Texture, TextureDescriptor, check_texture_upload};

const MAX_LINE_WIDTH: f32 = 10.0;
const MAX_TEXTURE_SIZE: u32 = 8192;

/// One recorded device-level operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Initialize,
    Dispose,
    BeginFrame,
    EndFrame,
    SetViewport(PixelRect),
    Resize { width: u32, height: u32 },
    SetScissorEnabled(bool),
    SetScissor(PixelRect),
    SetBlendMode(BlendMode),
    SetLineWidth(f32),
    SetLineSmoothing(bool),
    Clear(Color),
    CreateShader { name: String, valid: bool },
    CreateBuffer { label: Option<String> },
    CreateTexture { width: u32, height: u32 },
    BindShader(String),
    UnbindShader(String),
    /// Bind/uniform call on a shader that failed to compile.
    InvalidShaderUse(String),
    SetUniform { shader: String, name: String },
    Upload {
        label: Option<String>,
        floats: usize,
        reallocated: bool,
    },
    BindBuffer(Option<String>),
    Draw {
        label: Option<String>,
        mode: DrawMode,
        vertices: usize,
    },
    UnbindBuffer(Option<String>),
    UploadTexture { bytes: usize },
    BindTexture { unit: u32 },
    UnbindTexture,
    DisposeShader(String),
    DisposeBuffer(Option<String>),
    DisposeTexture,
    Synchronize,
}

/// Snapshot of everything that influenced one draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub frame: u64,
    pub buffer: Option<String>,
    pub mode: DrawMode,
    pub first: usize,
    pub vertex_count: usize,
    pub floats_per_vertex: usize,
    /// Interleaved floats of the drawn vertices; empty when capture is off.
    pub vertices: Vec<f32>,
    pub shader: Option<String>,
    pub uniforms: IndexMap<String, UniformValue>,
    pub line_width: f32,
    pub blend_mode: BlendMode,
    pub scissor: Option<PixelRect>,
}

impl DrawCall {
    /// Floats of vertex `index` within this draw.
    #[must_use]
    pub fn vertex(&self, index: usize) -> Option<&[f32]> {
        let start = index * self.floats_per_vertex;
        self.vertices.get(start..start + self.floats_per_vertex)
    }

    /// `(x, y)` of every captured vertex.
    pub fn positions(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.vertices
            .chunks_exact(self.floats_per_vertex.max(1))
            .map(|v| (v[0], v.get(1).copied().unwrap_or_default()))
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

#[derive(Debug)]
struct ShaderRecord {
    name: String,
    uniforms: IndexMap<String, UniformValue>,
}

#[derive(Debug)]
struct HeadlessState {
    initialized: bool,
    calls: Vec<DeviceCall>,
    draws: Vec<DrawCall>,
    frame: u64,
    in_frame: bool,
    viewport: PixelRect,
    bound_shader: Option<u64>,
    shaders: HashMap<u64, ShaderRecord>,
    next_id: u64,
    line_width: f32,
    line_smoothing: bool,
    blend_mode: BlendMode,
    scissor_enabled: bool,
    scissor: PixelRect,
    failing_shaders: HashSet<String>,
    max_buffer_floats: Option<usize>,
    capture_vertices: bool,
}

impl HeadlessState {
    fn record(&mut self, call: DeviceCall) {
        self.calls.push(call);
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_live(&self, what: &'static str) -> ChartResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ChartError::NotInitialized(what))
        }
    }
}

type SharedState = Arc<Mutex<HeadlessState>>;

/// Read access to everything a [`HeadlessDevice`] recorded. Stays valid after
/// the device itself has been boxed and handed to an engine.
#[derive(Debug, Clone)]
pub struct HeadlessRecorder {
    state: SharedState,
}

impl HeadlessRecorder {
    #[must_use]
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.lock().draws.clone()
    }

    /// Draws recorded for buffers labeled `label`.
    #[must_use]
    pub fn draws_for(&self, label: &str) -> Vec<DrawCall> {
        self.state
            .lock()
            .draws
            .iter()
            .filter(|draw| draw.buffer.as_deref() == Some(label))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.state.lock().draws.len()
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.state.lock().frame
    }

    #[must_use]
    pub fn is_in_frame(&self) -> bool {
        self.state.lock().in_frame
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Clears recorded calls and draws (useful between test steps).
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.draws.clear();
    }

    /// Makes every later compile of `name` fail.
    pub fn fail_shader(&self, name: impl Into<String>) {
        self.state.lock().failing_shaders.insert(name.into());
    }

    /// Caps buffer growth so uploads beyond `floats` report an allocation
    /// failure.
    pub fn limit_buffer_floats(&self, floats: Option<usize>) {
        self.state.lock().max_buffer_floats = floats;
    }
}

/// A [`RenderDevice`] that records instead of rendering.
#[derive(Debug)]
pub struct HeadlessDevice {
    state: SharedState,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                initialized: false,
                calls: Vec::new(),
                draws: Vec::new(),
                frame: 0,
                in_frame: false,
                viewport: PixelRect::default(),
                bound_shader: None,
                shaders: HashMap::new(),
                next_id: 0,
                line_width: 1.0,
                line_smoothing: false,
                blend_mode: BlendMode::Alpha,
                scissor_enabled: false,
                scissor: PixelRect::default(),
                failing_shaders: HashSet::new(),
                max_buffer_floats: None,
                capture_vertices: true,
            })),
        }
    }

    /// Stops copying vertex data into [`DrawCall::vertices`]; for benchmarks.
    #[must_use]
    pub fn without_vertex_capture(self) -> Self {
        self.state.lock().capture_vertices = false;
        self
    }

    #[must_use]
    pub fn with_failing_shader(self, name: impl Into<String>) -> Self {
        self.state.lock().failing_shaders.insert(name.into());
        self
    }

    #[must_use]
    pub fn recorder(&self) -> HeadlessRecorder {
        HeadlessRecorder {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for HeadlessDevice {
    fn backend(&self) -> RenderBackend {
        RenderBackend::Headless
    }

    fn initialize(&mut self) -> ChartResult<()> {
        let mut state = self.state.lock();
        if !state.initialized {
            state.initialized = true;
            state.record(DeviceCall::Initialize);
            debug!("headless device initialized");
        }
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = self.state.lock();
        if state.initialized {
            state.initialized = false;
            state.in_frame = false;
            state.bound_shader = None;
            state.record(DeviceCall::Dispose);
        }
    }

    fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    fn begin_frame(&mut self) -> ChartResult<()> {
        let mut state = self.state.lock();
        state.check_live("headless device")?;
        state.frame += 1;
        state.in_frame = true;
        state.record(DeviceCall::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> ChartResult<()> {
        let mut state = self.state.lock();
        state.check_live("headless device")?;
        state.in_frame = false;
        state.record(DeviceCall::EndFrame);
        Ok(())
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        let mut state = self.state.lock();
        state.viewport = rect;
        state.record(DeviceCall::SetViewport(rect));
    }

    fn resize(&mut self, width: u32, height: u32) -> ChartResult<()> {
        if width == 0 || height == 0 {
            return Err(ChartError::InvalidViewport { width, height });
        }
        self.state.lock().record(DeviceCall::Resize { width, height });
        Ok(())
    }

    fn set_scissor_enabled(&mut self, enabled: bool) {
        let mut state = self.state.lock();
        state.scissor_enabled = enabled;
        state.record(DeviceCall::SetScissorEnabled(enabled));
    }

    fn set_scissor(&mut self, rect: PixelRect) {
        let mut state = self.state.lock();
        state.scissor = rect;
        state.record(DeviceCall::SetScissor(rect));
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        let mut state = self.state.lock();
        state.blend_mode = mode;
        state.record(DeviceCall::SetBlendMode(mode));
    }

    fn set_line_width(&mut self, width: f32) {
        let width = if width.is_finite() {
            width.clamp(1.0, MAX_LINE_WIDTH)
        } else {
            1.0
        };
        let mut state = self.state.lock();
        state.line_width = width;
        state.record(DeviceCall::SetLineWidth(width));
    }

    fn set_line_smoothing(&mut self, enabled: bool) {
        let mut state = self.state.lock();
        state.line_smoothing = enabled;
        state.record(DeviceCall::SetLineSmoothing(enabled));
    }

    fn clear(&mut self, color: Color) {
        self.state.lock().record(DeviceCall::Clear(color));
    }

    fn create_shader(&mut self, source: &ShaderSource) -> ChartResult<Box<dyn Shader>> {
        let mut state = self.state.lock();
        state.check_live("headless device")?;
        let valid = !state.failing_shaders.contains(source.name())
            && [ShaderStage::Vertex, ShaderStage::Fragment]
                .into_iter()
                .all(|stage| {
                    source
                        .stage(stage)
                        .is_some_and(|src| !src.trim().is_empty() && src.contains("main"))
                });
        let id = state.next_id();
        state.shaders.insert(
            id,
            ShaderRecord {
                name: source.name().to_owned(),
                uniforms: IndexMap::new(),
            },
        );
        state.record(DeviceCall::CreateShader {
            name: source.name().to_owned(),
            valid,
        });
        drop(state);

        Ok(Box::new(HeadlessShader {
            id,
            name: source.name().to_owned(),
            valid,
            disposed: false,
            state: Arc::clone(&self.state),
        }))
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> ChartResult<Box<dyn Buffer>> {
        let mut state = self.state.lock();
        state.check_live("headless device")?;
        let capacity = descriptor.initial_capacity();
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| ChartError::BufferAllocation {
                requested_floats: capacity,
            })?;
        state.record(DeviceCall::CreateBuffer {
            label: descriptor.label().map(str::to_owned),
        });
        drop(state);

        Ok(Box::new(HeadlessBuffer {
            descriptor: descriptor.clone(),
            storage,
            capacity,
            vertex_count: 0,
            initialized: true,
            state: Arc::clone(&self.state),
        }))
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> ChartResult<Box<dyn Texture>> {
        let mut state = self.state.lock();
        state.check_live("headless device")?;
        descriptor.validate(MAX_TEXTURE_SIZE)?;
        state.record(DeviceCall::CreateTexture {
            width: descriptor.width,
            height: descriptor.height,
        });
        drop(state);

        Ok(Box::new(HeadlessTexture {
            descriptor: *descriptor,
            texels: Vec::new(),
            initialized: true,
            state: Arc::clone(&self.state),
        }))
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_line_width: MAX_LINE_WIDTH,
            max_texture_size: MAX_TEXTURE_SIZE,
            renderer_info: "headless recorder".to_owned(),
            supports_pixel_readback: false,
        }
    }

    fn synchronize(&mut self) -> ChartResult<()> {
        self.state.lock().record(DeviceCall::Synchronize);
        Ok(())
    }
}

struct HeadlessShader {
    id: u64,
    name: String,
    valid: bool,
    disposed: bool,
    state: SharedState,
}

impl HeadlessShader {
    fn usable(&self, state: &mut HeadlessState) -> bool {
        if self.valid && !self.disposed {
            true
        } else {
            state.record(DeviceCall::InvalidShaderUse(self.name.clone()));
            false
        }
    }
}

impl Shader for HeadlessShader {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid && !self.disposed
    }

    fn bind(&mut self) {
        let mut state = self.state.lock();
        if self.usable(&mut state) {
            state.bound_shader = Some(self.id);
            state.record(DeviceCall::BindShader(self.name.clone()));
        }
    }

    fn unbind(&mut self) {
        let mut state = self.state.lock();
        if self.usable(&mut state) {
            if state.bound_shader == Some(self.id) {
                state.bound_shader = None;
            }
            state.record(DeviceCall::UnbindShader(self.name.clone()));
        }
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let mut state = self.state.lock();
        if !self.usable(&mut state) {
            return;
        }
        if let Some(record) = state.shaders.get_mut(&self.id) {
            record.uniforms.insert(name.to_owned(), value);
        }
        state.record(DeviceCall::SetUniform {
            shader: self.name.clone(),
            name: name.to_owned(),
        });
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let mut state = self.state.lock();
        state.shaders.remove(&self.id);
        if state.bound_shader == Some(self.id) {
            state.bound_shader = None;
        }
        state.record(DeviceCall::DisposeShader(self.name.clone()));
    }
}

struct HeadlessBuffer {
    descriptor: BufferDescriptor,
    storage: Vec<f32>,
    capacity: usize,
    vertex_count: usize,
    initialized: bool,
    state: SharedState,
}

impl HeadlessBuffer {
    fn label(&self) -> Option<String> {
        self.descriptor.label().map(str::to_owned)
    }
}

impl Buffer for HeadlessBuffer {
    fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    fn upload(&mut self, data: &[f32]) -> ChartResult<()> {
        if !self.initialized {
            return Err(ChartError::NotInitialized("buffer"));
        }
        let mut state = self.state.lock();
        state.check_live("headless device")?;

        let reallocated = data.len() > self.capacity;
        if reallocated {
            let new_capacity = grown_capacity(self.capacity, data.len());
            if state.max_buffer_floats.is_some_and(|max| new_capacity > max) {
                return Err(ChartError::BufferAllocation {
                    requested_floats: new_capacity,
                });
            }
            let mut grown = Vec::new();
            grown
                .try_reserve_exact(new_capacity)
                .map_err(|_| ChartError::BufferAllocation {
                    requested_floats: new_capacity,
                })?;
            trace!(
                label = ?self.descriptor.label(),
                old_capacity = self.capacity,
                new_capacity,
                "grow buffer"
            );
            self.storage = grown;
            self.capacity = new_capacity;
        }

        if self.storage.len() < data.len() {
            self.storage.resize(data.len(), 0.0);
        }
        self.storage[..data.len()].copy_from_slice(data);
        self.vertex_count = data.len() / self.descriptor.floats_per_vertex();

        state.record(DeviceCall::Upload {
            label: self.label(),
            floats: data.len(),
            reallocated,
        });
        Ok(())
    }

    fn draw_range(&mut self, mode: DrawMode, first: usize, count: usize) -> ChartResult<()> {
        if !self.initialized {
            return Err(ChartError::NotInitialized("buffer"));
        }
        let end = first.saturating_add(count);
        if end > self.vertex_count {
            return Err(ChartError::IndexOutOfBounds {
                index: end,
                len: self.vertex_count,
            });
        }

        let mut state = self.state.lock();
        state.check_live("headless device")?;
        if count == 0 {
            return Ok(());
        }

        let fpv = self.descriptor.floats_per_vertex();
        let vertices = if state.capture_vertices {
            self.storage[first * fpv..end * fpv].to_vec()
        } else {
            Vec::new()
        };
        let (shader, uniforms) = match state.bound_shader.and_then(|id| state.shaders.get(&id)) {
            Some(record) => (Some(record.name.clone()), record.uniforms.clone()),
            None => (None, IndexMap::new()),
        };
        let draw = DrawCall {
            frame: state.frame,
            buffer: self.label(),
            mode,
            first,
            vertex_count: count,
            floats_per_vertex: fpv,
            vertices,
            shader,
            uniforms,
            line_width: state.line_width,
            blend_mode: state.blend_mode,
            scissor: state.scissor_enabled.then_some(state.scissor),
        };

        state.record(DeviceCall::BindBuffer(self.label()));
        state.record(DeviceCall::Draw {
            label: self.label(),
            mode,
            vertices: count,
        });
        state.record(DeviceCall::UnbindBuffer(self.label()));
        state.draws.push(draw);
        Ok(())
    }

    fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    fn set_vertex_count(&mut self, count: usize) {
        let max = self.storage.len() / self.descriptor.floats_per_vertex();
        self.vertex_count = count.min(max);
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn dispose(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;
        self.storage = Vec::new();
        self.capacity = 0;
        self.vertex_count = 0;
        self.state
            .lock()
            .record(DeviceCall::DisposeBuffer(self.label()));
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

struct HeadlessTexture {
    descriptor: TextureDescriptor,
    texels: Vec<u8>,
    initialized: bool,
    state: SharedState,
}

impl Texture for HeadlessTexture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    fn upload(&mut self, data: &[u8]) -> ChartResult<()> {
        if !self.initialized {
            return Err(ChartError::NotInitialized("texture"));
        }
        check_texture_upload(&self.descriptor, data)?;
        self.texels.clear();
        self.texels.extend_from_slice(data);
        self.state
            .lock()
            .record(DeviceCall::UploadTexture { bytes: data.len() });
        Ok(())
    }

    fn bind(&mut self, unit: u32) {
        if self.initialized {
            self.state.lock().record(DeviceCall::BindTexture { unit });
        }
    }

    fn unbind(&mut self) {
        if self.initialized {
            self.state.lock().record(DeviceCall::UnbindTexture);
        }
    }

    fn dispose(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;
        self.texels = Vec::new();
        self.state.lock().record(DeviceCall::DisposeTexture);
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
