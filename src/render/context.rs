use glam::Mat4;

use crate::core::{CoordinateSystem, TimeSeries, Viewport, VisibleRange};
use crate::render::device::RenderDevice;
use crate::render::resource_manager::ResourceManager;

/// Default bar duration: one minute.
pub const DEFAULT_BAR_DURATION_MS: i64 = 60_000;

/// Orthographic pixel-space projection with the origin at the top-left and Y
/// growing downward.
#[must_use]
pub fn pixel_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
}

/// Everything a renderer needs for one draw: the device, the resources, the
/// coordinate transform and the visible slice of the data being drawn.
///
/// Built per series per frame; renderers never keep it.
pub struct RenderContext<'a> {
    device: &'a mut dyn RenderDevice,
    resources: &'a mut ResourceManager,
    coordinates: CoordinateSystem<'a>,
    visible: Option<VisibleRange>,
    bar_duration_ms: i64,
    projection: Mat4,
    scale_factor: f32,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        device: &'a mut dyn RenderDevice,
        resources: &'a mut ResourceManager,
        coordinates: CoordinateSystem<'a>,
    ) -> Self {
        let viewport = coordinates.viewport();
        Self {
            device,
            resources,
            coordinates,
            visible: None,
            bar_duration_ms: DEFAULT_BAR_DURATION_MS,
            projection: pixel_projection(viewport.width, viewport.height),
            scale_factor: 1.0,
        }
    }

    #[must_use]
    pub fn with_visible_range(mut self, visible: Option<VisibleRange>) -> Self {
        self.visible = visible;
        self
    }

    #[must_use]
    pub fn with_bar_duration(mut self, bar_duration_ms: i64) -> Self {
        self.bar_duration_ms = bar_duration_ms;
        self
    }

    pub fn set_visible_range(&mut self, visible: Option<VisibleRange>) {
        self.visible = visible;
    }

    /// Resolves the visible slice of `series` against the viewport's time
    /// window and stores it.
    pub fn resolve_visible_range(&mut self, series: &dyn TimeSeries) -> Option<VisibleRange> {
        let viewport = self.coordinates.viewport();
        self.visible = series.visible_range(viewport.start_time(), viewport.end_time());
        self.visible
    }

    #[must_use]
    pub fn visible_range(&self) -> Option<VisibleRange> {
        self.visible
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible.map_or(0, VisibleRange::count)
    }

    #[must_use]
    pub fn has_visible_data(&self) -> bool {
        self.visible.is_some()
    }

    #[must_use]
    pub fn bar_duration_ms(&self) -> i64 {
        self.bar_duration_ms
    }

    pub fn set_bar_duration(&mut self, bar_duration_ms: i64) {
        self.bar_duration_ms = bar_duration_ms;
    }

    /// Candle slot width in pixels for the current zoom level.
    #[must_use]
    pub fn bar_width(&self) -> f64 {
        self.coordinates.bar_width(self.bar_duration_ms)
    }

    #[must_use]
    pub fn coordinates(&self) -> &CoordinateSystem<'a> {
        &self.coordinates
    }

    #[must_use]
    pub fn viewport(&self) -> &'a Viewport {
        self.coordinates.viewport()
    }

    #[must_use]
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// HiDPI scale; never below 1.
    pub fn set_scale_factor(&mut self, scale: f32) {
        self.scale_factor = if scale.is_finite() { scale.max(1.0) } else { 1.0 };
    }

    #[must_use]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn device(&mut self) -> &mut dyn RenderDevice {
        &mut *self.device
    }

    pub fn resources(&mut self) -> &mut ResourceManager {
        &mut *self.resources
    }

    /// Splits the borrow so resources can be created against the device.
    pub fn device_and_resources(&mut self) -> (&mut dyn RenderDevice, &mut ResourceManager) {
        (&mut *self.device, &mut *self.resources)
    }
}
