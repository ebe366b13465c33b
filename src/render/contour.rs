use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::contour::{FLOATS_PER_SEGMENT, extract_contour};
use crate::core::{AxisId, CoordinateSystem, ScalarGrid};
use crate::error::ChartResult;
use crate::render::batch::{Batch, DrawStats, draw_batches, shader_is_usable};
use crate::render::buffer::BufferDescriptor;
use crate::render::color::Color;
use crate::render::context::RenderContext;
use crate::render::device::DrawMode;
use crate::render::resource_manager::ResourceManager;
use crate::render::scratch::VertexScratch;
use crate::render::shader::SHADER_DEFAULT;

const FLOATS_PER_VERTEX: usize = 6;

/// One iso-line level and its color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContourLevel {
    pub threshold: f32,
    pub color: Color,
}

impl ContourLevel {
    #[must_use]
    pub fn new(threshold: f32, color: Color) -> Self {
        Self { threshold, color }
    }
}

/// Draws marching-squares iso-lines of a [`ScalarGrid`] as one `Lines`
/// batch with per-vertex level colors.
///
/// Grid X coordinates are timestamps in milliseconds and Y coordinates are
/// values on the renderer's axis. Cells with missing samples leave gaps.
#[derive(Debug)]
pub struct ContourRenderer {
    buffer: String,
    axis: AxisId,
    levels: Vec<ContourLevel>,
    line_width: f32,
    descriptor: BufferDescriptor,
    screen_x: Vec<f64>,
    screen_y: Vec<f64>,
    segments: Vec<f32>,
    vertices: VertexScratch,
}

impl ContourRenderer {
    /// `name` keys this renderer's buffer (`contour.<name>`).
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            buffer: format!("contour.{name}"),
            axis: AxisId::default_axis(),
            levels: Vec::new(),
            line_width: 1.0,
            descriptor: BufferDescriptor::position_color_2d(1024 * FLOATS_PER_VERTEX),
            screen_x: Vec::new(),
            screen_y: Vec::new(),
            segments: Vec::new(),
            vertices: VertexScratch::new(FLOATS_PER_VERTEX, 0),
        }
    }

    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = ContourLevel>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    #[must_use]
    pub fn on_axis(mut self, axis: impl Into<AxisId>) -> Self {
        self.axis = axis.into();
        self
    }

    #[must_use]
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    #[must_use]
    pub fn levels(&self) -> &[ContourLevel] {
        &self.levels
    }

    pub fn set_levels(&mut self, levels: Vec<ContourLevel>) {
        self.levels = levels;
    }

    pub fn render(
        &mut self,
        ctx: &mut RenderContext<'_>,
        grid: &ScalarGrid<'_>,
    ) -> ChartResult<DrawStats> {
        if self.levels.is_empty() {
            return Ok(DrawStats::default());
        }
        if !shader_is_usable(ctx, SHADER_DEFAULT) {
            trace!(buffer = %self.buffer, "contour: default shader unusable");
            return Ok(DrawStats::default());
        }

        self.build_vertices(ctx.coordinates(), grid)?;
        let batch = Batch::new(
            &self.buffer,
            &self.descriptor,
            self.vertices.as_slice(),
            DrawMode::Lines,
        )
        .with_line_width(self.line_width);
        draw_batches(ctx, SHADER_DEFAULT, &[batch])
    }

    /// Extracts every level in screen space and appends colored vertices.
    ///
    /// The grid coordinates are mapped to pixels first; interpolation along
    /// a cell edge commutes with the linear transforms, so the segments come
    /// out in screen space without losing timestamp precision.
    pub fn build_vertices(
        &mut self,
        coordinates: &CoordinateSystem<'_>,
        grid: &ScalarGrid<'_>,
    ) -> ChartResult<()> {
        let axis = coordinates.axis(self.axis.as_str())?;
        let x_scale = coordinates.x_scale();
        self.screen_x.clear();
        self.screen_x
            .extend(grid.x_coords().iter().map(|&x| x_scale.map(x)));
        self.screen_y.clear();
        self.screen_y
            .extend(grid.y_coords().iter().map(|&y| axis.value_to_screen_y(y)));
        let screen = ScalarGrid::new(
            grid.values(),
            grid.rows(),
            grid.cols(),
            &self.screen_x,
            &self.screen_y,
        )?;

        self.vertices.reset();
        for level in &self.levels {
            self.segments.clear();
            let floats = extract_contour(&screen, level.threshold, &mut self.segments);
            let segment_count = floats / FLOATS_PER_SEGMENT;
            self.vertices
                .reserve_elements(self.vertices.vertex_count() / 2 + segment_count, 2);
            let rgba = level.color.to_array();
            for point in self.segments.chunks_exact(2) {
                self.vertices.push_vertex(point[0], point[1], rgba);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn vertices(&self) -> &[f32] {
        self.vertices.as_slice()
    }

    pub fn dispose(&mut self, resources: &mut ResourceManager) {
        resources.dispose_buffer(&self.buffer);
        self.vertices.clear_storage();
        self.segments = Vec::new();
    }
}
