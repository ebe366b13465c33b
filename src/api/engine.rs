use tracing::{debug, trace, warn};

use crate::core::{AxisSet, CoordinateSystem, TimeSeries, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{
    BackendRegistry, BlendMode, Color, DeviceCapabilities, PendingReport, PixelRect,
    RenderBackend, RenderContext, RenderDevice, RenderQueueHandle, ResourceManager,
};

use super::ChartEngineConfig;

/// Main orchestration facade consumed by host applications.
///
/// `ChartEngine` owns the render device, its resources, the viewport and the
/// value axes. Hosts mutate the viewport and axes between frames and draw
/// series inside [`ChartEngine::render_frame`]. Everything here runs on the
/// render thread; other threads queue work through [`Self::queue_handle`].
pub struct ChartEngine {
    device: Box<dyn RenderDevice>,
    resources: ResourceManager,
    viewport: Viewport,
    axes: AxisSet,
    bar_duration_ms: i64,
    background: Color,
    frame_index: u64,
    disposed: bool,
}

/// Outcome of one [`ChartEngine::render_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub pending: PendingReport,
}

impl ChartEngine {
    /// Creates an engine on the backend selected by `config.backend`, using
    /// the providers compiled into this crate.
    pub fn new(config: ChartEngineConfig) -> ChartResult<Self> {
        Self::with_registry(config, &BackendRegistry::with_builtin_providers())
    }

    pub fn with_registry(config: ChartEngineConfig, registry: &BackendRegistry) -> ChartResult<Self> {
        config.validate()?;
        let device = registry.create_device(config.backend, config.width, config.height)?;
        Self::with_device(config, device)
    }

    /// Creates an engine around an already constructed device, initializing
    /// it when needed and compiling the built-in shaders.
    pub fn with_device(
        config: ChartEngineConfig,
        mut device: Box<dyn RenderDevice>,
    ) -> ChartResult<Self> {
        config.validate()?;
        let viewport = config.viewport()?;
        let axes = config.axes()?;

        if !device.is_initialized() {
            device.initialize()?;
        }
        device.resize(viewport.width, viewport.height)?;
        let mut resources = ResourceManager::new();
        resources.initialize(device.as_mut())?;

        debug!(
            backend = %device.backend(),
            width = viewport.width,
            height = viewport.height,
            "chart engine initialized"
        );
        Ok(Self {
            device,
            resources,
            viewport,
            axes,
            bar_duration_ms: config.bar_duration_ms,
            background: config.background,
            frame_index: 0,
            disposed: false,
        })
    }

    #[must_use]
    pub fn backend(&self) -> RenderBackend {
        self.device.backend()
    }

    #[must_use]
    pub fn capabilities(&self) -> DeviceCapabilities {
        self.device.capabilities()
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    #[must_use]
    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    pub fn axes_mut(&mut self) -> &mut AxisSet {
        &mut self.axes
    }

    #[must_use]
    pub fn coordinates(&self) -> CoordinateSystem<'_> {
        CoordinateSystem::new(&self.viewport, &self.axes)
    }

    /// Resizes the viewport and the device surface together. The viewport
    /// keeps its previous size when the device refuses the new one.
    pub fn set_size(&mut self, width: u32, height: u32) -> ChartResult<()> {
        let (old_width, old_height) = (self.viewport.width, self.viewport.height);
        self.viewport.set_size(width, height)?;
        if let Err(err) = self.device.resize(width, height) {
            self.viewport.set_size(old_width, old_height)?;
            return Err(err);
        }
        Ok(())
    }

    #[must_use]
    pub fn bar_duration_ms(&self) -> i64 {
        self.bar_duration_ms
    }

    pub fn set_bar_duration(&mut self, bar_duration_ms: i64) -> ChartResult<()> {
        if bar_duration_ms <= 0 {
            return Err(ChartError::InvalidData(format!(
                "bar duration must be > 0 ms, got {bar_duration_ms}"
            )));
        }
        self.bar_duration_ms = bar_duration_ms;
        Ok(())
    }

    #[must_use]
    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, background: Color) -> ChartResult<()> {
        background.validate()?;
        self.background = background;
        Ok(())
    }

    #[must_use]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    /// Handle other threads use to queue render-thread work.
    #[must_use]
    pub fn queue_handle(&self) -> RenderQueueHandle {
        self.resources.queue_handle()
    }

    /// Number of frames rendered so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Renders one frame.
    ///
    /// Begins the frame, runs queued render-thread operations, sets the
    /// viewport, clears to the background and hands `draw` a [`Frame`]. The
    /// frame is ended even when `draw` fails; the drawing error wins over an
    /// end-of-frame error.
    pub fn render_frame<F>(&mut self, draw: F) -> ChartResult<FrameReport>
    where
        F: FnOnce(&mut Frame<'_>) -> ChartResult<()>,
    {
        if self.disposed {
            return Err(ChartError::NotInitialized("chart engine"));
        }
        self.device.begin_frame()?;

        let pending = self.resources.process_pending_operations(self.device.as_mut());
        self.device.set_viewport(PixelRect::new(
            0,
            0,
            self.viewport.width,
            self.viewport.height,
        ));
        self.device.clear(self.background);
        self.device.set_blend_mode(BlendMode::Alpha);

        let mut frame = Frame {
            device: self.device.as_mut(),
            resources: &mut self.resources,
            viewport: &self.viewport,
            axes: &self.axes,
            bar_duration_ms: self.bar_duration_ms,
        };
        let drawn = draw(&mut frame);
        let ended = self.device.end_frame();

        self.frame_index += 1;
        trace!(
            frame = self.frame_index,
            executed = pending.executed,
            failed = pending.failed,
            "frame rendered"
        );
        drawn?;
        ended?;
        Ok(FrameReport {
            frame: self.frame_index,
            pending,
        })
    }

    /// Copies the last frame as packed `0xAARRGGBB` pixels sized to the
    /// viewport.
    pub fn read_pixels(&mut self) -> ChartResult<Vec<u32>> {
        if self.disposed {
            return Err(ChartError::NotInitialized("chart engine"));
        }
        if !self.device.supports_pixel_readback() {
            return Err(ChartError::ReadbackUnsupported(self.device.backend().name()));
        }
        let len = self.viewport.width as usize * self.viewport.height as usize;
        let mut pixels = vec![0_u32; len];
        self.device.read_pixels(&mut pixels)?;
        Ok(pixels)
    }

    /// Waits for outstanding GPU work, then releases every resource and the
    /// device. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Err(err) = self.device.synchronize() {
            warn!(error = %err, "device synchronize failed during dispose");
        }
        self.resources.dispose();
        self.device.dispose();
        self.disposed = true;
        debug!(frames = self.frame_index, "chart engine disposed");
    }
}

impl Drop for ChartEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ChartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartEngine")
            .field("backend", &self.device.backend())
            .field("viewport", &self.viewport)
            .field("axes", &self.axes.len())
            .field("frame_index", &self.frame_index)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

/// Drawing access for the duration of one frame.
pub struct Frame<'e> {
    device: &'e mut dyn RenderDevice,
    resources: &'e mut ResourceManager,
    viewport: &'e Viewport,
    axes: &'e AxisSet,
    bar_duration_ms: i64,
}

impl Frame<'_> {
    /// Context with no visible range; suited to grid-based renderers.
    pub fn context(&mut self) -> RenderContext<'_> {
        RenderContext::new(
            &mut *self.device,
            &mut *self.resources,
            CoordinateSystem::new(self.viewport, self.axes),
        )
        .with_bar_duration(self.bar_duration_ms)
    }

    /// Context whose visible range is resolved against `series`.
    pub fn context_for(&mut self, series: &dyn TimeSeries) -> RenderContext<'_> {
        let mut ctx = self.context();
        ctx.resolve_visible_range(series);
        ctx
    }

    #[must_use]
    pub fn coordinates(&self) -> CoordinateSystem<'_> {
        CoordinateSystem::new(self.viewport, self.axes)
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        self.viewport
    }
}
