use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{AxisId, BandSeries, CoordinateSystem, TimeSeries, VisibleRange};
use crate::error::{ChartError, ChartResult};
use crate::render::batch::{Batch, DrawStats, draw_batches, shader_is_usable};
use crate::render::buffer::BufferDescriptor;
use crate::render::color::Color;
use crate::render::context::RenderContext;
use crate::render::device::DrawMode;
use crate::render::line::{build_polyline, close_run};
use crate::render::resource_manager::ResourceManager;
use crate::render::scratch::VertexScratch;
use crate::render::shader::SHADER_SIMPLE;

const FLOATS_PER_VERTEX: usize = 2;
const INITIAL_POINTS: usize = 1024;

fn default_edge_color() -> Color {
    Color::rgb8(100, 149, 237)
}

fn default_middle_color() -> Option<Color> {
    Some(Color::rgb8(65, 131, 196))
}

fn default_fill_color() -> Color {
    Color::rgba8(100, 149, 237, 30)
}

fn default_line_width() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStyle {
    #[serde(default = "default_edge_color")]
    pub upper_color: Color,
    /// `None` hides the middle line.
    #[serde(default = "default_middle_color")]
    pub middle_color: Option<Color>,
    #[serde(default = "default_edge_color")]
    pub lower_color: Color,
    #[serde(default = "default_fill_color")]
    pub fill_color: Color,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    #[serde(default = "default_true")]
    pub show_fill: bool,
}

impl Default for BandStyle {
    fn default() -> Self {
        Self {
            upper_color: default_edge_color(),
            middle_color: default_middle_color(),
            lower_color: default_edge_color(),
            fill_color: default_fill_color(),
            line_width: default_line_width(),
            show_fill: true,
        }
    }
}

impl BandStyle {
    pub fn validate(&self) -> ChartResult<()> {
        self.upper_color.validate()?;
        self.lower_color.validate()?;
        self.fill_color.validate()?;
        if let Some(middle) = self.middle_color {
            middle.validate()?;
        }
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(ChartError::InvalidData(
                "line width must be finite and > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Scratch storage for one polyline of the band.
#[derive(Debug)]
struct Strip {
    buffer: String,
    points: VertexScratch,
    segments: Vec<Range<usize>>,
}

impl Strip {
    fn new(buffer: String, initial_floats: usize) -> Self {
        Self {
            buffer,
            points: VertexScratch::new(FLOATS_PER_VERTEX, initial_floats),
            segments: Vec::new(),
        }
    }

    fn reset(&mut self, vertices: usize) {
        self.points.reserve_elements(vertices, 1);
        self.points.reset();
        self.segments.clear();
    }

    fn batch<'s>(&'s self, descriptor: &'s BufferDescriptor, mode: DrawMode, color: Color) -> Batch<'s> {
        // Nothing to draw leaves the data empty so the batch is skipped.
        let data: &[f32] = if self.segments.is_empty() {
            &[]
        } else {
            self.points.as_slice()
        };
        Batch::new(&self.buffer, descriptor, data, mode)
            .with_color(color.to_array())
            .with_segments(&self.segments)
    }

    fn dispose(&mut self, resources: &mut ResourceManager) {
        resources.dispose_buffer(&self.buffer);
        self.points.clear_storage();
        self.segments = Vec::new();
    }
}

/// Draws a [`BandSeries`]: a translucent fill between upper and lower plus
/// the upper, lower and optional middle lines, all with the `"simple"`
/// program and a per-batch `uColor`.
///
/// Points where a value is NaN split the affected strip.
#[derive(Debug)]
pub struct BandRenderer {
    style: BandStyle,
    axis: AxisId,
    descriptor: BufferDescriptor,
    fill: Strip,
    upper: Strip,
    middle: Strip,
    lower: Strip,
}

impl BandRenderer {
    /// `name` keys the buffers (`band.<name>.fill`, `.upper`, `.middle`,
    /// `.lower`).
    #[must_use]
    pub fn new(name: &str) -> Self {
        let floats = INITIAL_POINTS * FLOATS_PER_VERTEX;
        Self {
            style: BandStyle::default(),
            axis: AxisId::default_axis(),
            descriptor: BufferDescriptor::position_only_2d(floats * 2),
            fill: Strip::new(format!("band.{name}.fill"), floats * 2),
            upper: Strip::new(format!("band.{name}.upper"), floats),
            middle: Strip::new(format!("band.{name}.middle"), floats),
            lower: Strip::new(format!("band.{name}.lower"), floats),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: BandStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn on_axis(mut self, axis: impl Into<AxisId>) -> Self {
        self.axis = axis.into();
        self
    }

    #[must_use]
    pub fn style(&self) -> &BandStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: BandStyle) {
        self.style = style;
    }

    pub fn render(
        &mut self,
        ctx: &mut RenderContext<'_>,
        series: &BandSeries,
    ) -> ChartResult<DrawStats> {
        let Some(range) = ctx.visible_range().filter(|_| !series.is_empty()) else {
            return Ok(DrawStats::default());
        };
        if !shader_is_usable(ctx, SHADER_SIMPLE) {
            trace!(series = series.id(), "band: simple shader unusable");
            return Ok(DrawStats::default());
        }

        self.build_vertices(ctx.coordinates(), range, series)?;

        let mut batches = Vec::with_capacity(4);
        if self.style.show_fill {
            batches.push(
                self.fill
                    .batch(&self.descriptor, DrawMode::TriangleStrip, self.style.fill_color),
            );
        }
        let first_line = batches.len();
        batches.push(
            self.upper
                .batch(&self.descriptor, DrawMode::LineStrip, self.style.upper_color),
        );
        batches.push(
            self.lower
                .batch(&self.descriptor, DrawMode::LineStrip, self.style.lower_color),
        );
        if let Some(middle) = self.style.middle_color {
            batches.push(self.middle.batch(&self.descriptor, DrawMode::LineStrip, middle));
        }
        batches[first_line].line_width = Some(self.style.line_width);

        draw_batches(ctx, SHADER_SIMPLE, &batches)
    }

    /// Builds the fill strip and the three lines for `range` padded by one.
    pub fn build_vertices(
        &mut self,
        coordinates: &CoordinateSystem<'_>,
        range: VisibleRange,
        series: &BandSeries,
    ) -> ChartResult<()> {
        range.check_within(series.len())?;
        let axis = coordinates.axis(self.axis.as_str())?;
        let range = range.padded(1, series.len());
        let count = range.count();
        self.fill.reset(count * 2);
        self.upper.reset(count);
        self.middle.reset(count);
        self.lower.reset(count);

        let timestamps = series.timestamps();
        let (upper, lower) = (series.upper(), series.lower());
        let fill = &mut self.fill;
        let mut run_start = 0;
        for i in range.indices() {
            if upper[i].is_finite() && lower[i].is_finite() {
                let x = coordinates.x_value_to_screen_x(timestamps[i]) as f32;
                fill.points
                    .push_position(x, axis.value_to_screen_y(f64::from(upper[i])) as f32);
                fill.points
                    .push_position(x, axis.value_to_screen_y(f64::from(lower[i])) as f32);
            } else {
                close_run(&mut fill.segments, run_start, fill.points.vertex_count(), 4);
                run_start = fill.points.vertex_count();
            }
        }
        close_run(&mut fill.segments, run_start, fill.points.vertex_count(), 4);

        for (strip, values) in [
            (&mut self.upper, series.upper()),
            (&mut self.middle, series.middle()),
            (&mut self.lower, series.lower()),
        ] {
            build_polyline(
                &mut strip.points,
                &mut strip.segments,
                coordinates,
                &axis,
                timestamps,
                values,
                range,
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn fill_vertices(&self) -> &[f32] {
        self.fill.points.as_slice()
    }

    #[must_use]
    pub fn fill_segments(&self) -> &[Range<usize>] {
        &self.fill.segments
    }

    #[must_use]
    pub fn upper_segments(&self) -> &[Range<usize>] {
        &self.upper.segments
    }

    pub fn dispose(&mut self, resources: &mut ResourceManager) {
        for strip in [
            &mut self.fill,
            &mut self.upper,
            &mut self.middle,
            &mut self.lower,
        ] {
            strip.dispose(resources);
        }
    }
}
