use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{AxisCoordinates, AxisId, CoordinateSystem, ScalarSeries, TimeSeries, VisibleRange};
use crate::error::{ChartError, ChartResult};
use crate::render::batch::{Batch, DrawStats, draw_batches, shader_is_usable};
use crate::render::buffer::BufferDescriptor;
use crate::render::color::Color;
use crate::render::context::RenderContext;
use crate::render::device::DrawMode;
use crate::render::resource_manager::ResourceManager;
use crate::render::scratch::VertexScratch;
use crate::render::shader::SHADER_SIMPLE;

const FLOATS_PER_VERTEX: usize = 2;
const INITIAL_POINTS: usize = 1024;

fn default_line_color() -> Color {
    Color::rgb8(65, 131, 196)
}

fn default_line_width() -> f32 {
    1.5
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    #[serde(default = "default_line_color")]
    pub color: Color,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: default_line_color(),
            line_width: default_line_width(),
        }
    }
}

impl LineStyle {
    pub fn validate(&self) -> ChartResult<()> {
        self.color.validate()?;
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(ChartError::InvalidData(
                "line width must be finite and > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Draws a [`ScalarSeries`] as line strips with the `"simple"` program.
///
/// NaN values break the line; every run of two or more finite points is
/// its own strip. The visible range is padded by one point on each side so
/// the line reaches the plot edges.
#[derive(Debug)]
pub struct LineRenderer {
    buffer: String,
    style: LineStyle,
    axis: AxisId,
    descriptor: BufferDescriptor,
    points: VertexScratch,
    segments: Vec<Range<usize>>,
}

impl LineRenderer {
    /// `name` keys this renderer's buffer (`line.<name>`).
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            buffer: format!("line.{name}"),
            style: LineStyle::default(),
            axis: AxisId::default_axis(),
            descriptor: BufferDescriptor::position_only_2d(INITIAL_POINTS * FLOATS_PER_VERTEX),
            points: VertexScratch::new(FLOATS_PER_VERTEX, INITIAL_POINTS * FLOATS_PER_VERTEX),
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn on_axis(mut self, axis: impl Into<AxisId>) -> Self {
        self.axis = axis.into();
        self
    }

    #[must_use]
    pub fn style(&self) -> &LineStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: LineStyle) {
        self.style = style;
    }

    #[must_use]
    pub fn buffer_name(&self) -> &str {
        &self.buffer
    }

    pub fn render(
        &mut self,
        ctx: &mut RenderContext<'_>,
        series: &ScalarSeries,
    ) -> ChartResult<DrawStats> {
        let Some(range) = ctx.visible_range().filter(|_| !series.is_empty()) else {
            return Ok(DrawStats::default());
        };
        if !shader_is_usable(ctx, SHADER_SIMPLE) {
            trace!(series = series.id(), "line: simple shader unusable");
            return Ok(DrawStats::default());
        }

        self.build_vertices(ctx.coordinates(), range, series)?;
        if self.segments.is_empty() {
            return Ok(DrawStats::default());
        }

        let batch = Batch::new(
            &self.buffer,
            &self.descriptor,
            self.points.as_slice(),
            DrawMode::LineStrip,
        )
        .with_color(self.style.color.to_array())
        .with_line_width(self.style.line_width)
        .with_segments(&self.segments);
        draw_batches(ctx, SHADER_SIMPLE, &[batch])
    }

    /// Fills the point array and the strip ranges for `range` padded by one.
    pub fn build_vertices(
        &mut self,
        coordinates: &CoordinateSystem<'_>,
        range: VisibleRange,
        series: &ScalarSeries,
    ) -> ChartResult<()> {
        range.check_within(series.len())?;
        let axis = coordinates.axis(self.axis.as_str())?;
        let range = range.padded(1, series.len());
        self.points.reserve_elements(range.count(), 1);
        self.points.reset();
        self.segments.clear();
        build_polyline(
            &mut self.points,
            &mut self.segments,
            coordinates,
            &axis,
            series.timestamps(),
            series.values(),
            range,
        );
        Ok(())
    }

    #[must_use]
    pub fn vertices(&self) -> &[f32] {
        self.points.as_slice()
    }

    /// Vertex ranges of the strips built last.
    #[must_use]
    pub fn segments(&self) -> &[Range<usize>] {
        &self.segments
    }

    pub fn dispose(&mut self, resources: &mut ResourceManager) {
        resources.dispose_buffer(&self.buffer);
        self.points.clear_storage();
        self.segments = Vec::new();
    }
}

/// Appends `(x, y)` for each finite value and records one vertex range per
/// run of at least two finite points. Lone points are written but not
/// drawn.
pub(crate) fn build_polyline(
    out: &mut VertexScratch,
    segments: &mut Vec<Range<usize>>,
    coordinates: &CoordinateSystem<'_>,
    axis: &AxisCoordinates,
    timestamps: &[i64],
    values: &[f32],
    range: VisibleRange,
) {
    let mut run_start = out.vertex_count();
    for i in range.indices() {
        let value = values[i];
        if value.is_finite() {
            let x = coordinates.x_value_to_screen_x(timestamps[i]) as f32;
            let y = axis.value_to_screen_y(f64::from(value)) as f32;
            out.push_position(x, y);
        } else {
            close_run(segments, run_start, out.vertex_count(), 2);
            run_start = out.vertex_count();
        }
    }
    close_run(segments, run_start, out.vertex_count(), 2);
}

pub(crate) fn close_run(
    segments: &mut Vec<Range<usize>>,
    start: usize,
    end: usize,
    min_vertices: usize,
) {
    if end >= start + min_vertices {
        segments.push(start..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_shorter_than_minimum_are_dropped() {
        let mut segments = Vec::new();
        close_run(&mut segments, 0, 1, 2);
        close_run(&mut segments, 1, 4, 2);
        assert_eq!(segments, vec![1..4]);
    }
}
