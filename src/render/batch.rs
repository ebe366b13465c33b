use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::ChartResult;
use crate::render::buffer::BufferDescriptor;
use crate::render::context::RenderContext;
use crate::render::device::DrawMode;
use crate::render::shader::{UNIFORM_COLOR, UNIFORM_PROJECTION};

/// What one renderer call sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawStats {
    pub draw_calls: usize,
    pub vertices: usize,
}

impl DrawStats {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.draw_calls == 0
    }
}

impl std::ops::AddAssign for DrawStats {
    fn add_assign(&mut self, rhs: Self) {
        self.draw_calls += rhs.draw_calls;
        self.vertices += rhs.vertices;
    }
}

/// One uploaded batch: a named buffer, its floats and how to draw them.
pub(crate) struct Batch<'s> {
    pub buffer: &'s str,
    pub descriptor: &'s BufferDescriptor,
    pub data: &'s [f32],
    pub mode: DrawMode,
    /// Uniform color for programs without per-vertex color.
    pub color: Option<[f32; 4]>,
    pub line_width: Option<f32>,
    /// Vertex sub-ranges drawn separately; `None` draws everything.
    pub segments: Option<&'s [Range<usize>]>,
}

impl<'s> Batch<'s> {
    pub fn new(
        buffer: &'s str,
        descriptor: &'s BufferDescriptor,
        data: &'s [f32],
        mode: DrawMode,
    ) -> Self {
        Self {
            buffer,
            descriptor,
            data,
            mode,
            color: None,
            line_width: None,
            segments: None,
        }
    }

    pub fn with_color(mut self, rgba: [f32; 4]) -> Self {
        self.color = Some(rgba);
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = Some(width);
        self
    }

    pub fn with_segments(mut self, segments: &'s [Range<usize>]) -> Self {
        self.segments = Some(segments);
        self
    }
}

/// Whether the named program exists and compiled.
pub(crate) fn shader_is_usable(ctx: &mut RenderContext<'_>, shader: &str) -> bool {
    ctx.resources()
        .shader(shader)
        .is_some_and(|program| program.is_valid())
}

/// Binds `shader`, sets the projection, then uploads and draws each
/// non-empty batch in order before unbinding.
///
/// An invalid or missing shader skips everything. A batch whose upload or
/// draw fails is dropped; the remaining batches still draw and the first
/// failure is returned once the shader is unbound.
pub(crate) fn draw_batches(
    ctx: &mut RenderContext<'_>,
    shader: &str,
    batches: &[Batch<'_>],
) -> ChartResult<DrawStats> {
    if !shader_is_usable(ctx, shader) {
        trace!(shader, "skipping draw: shader unavailable");
        return Ok(DrawStats::default());
    }

    let projection = *ctx.projection();
    let (device, resources) = ctx.device_and_resources();
    if let Some(program) = resources.shader_mut(shader) {
        program.bind();
        program.set_matrix4(UNIFORM_PROJECTION, &projection);
    }

    let mut stats = DrawStats::default();
    let mut failure = None;
    for batch in batches {
        if batch.data.is_empty() {
            continue;
        }
        if let Some(rgba) = batch.color {
            if let Some(program) = resources.shader_mut(shader) {
                program.set_color(UNIFORM_COLOR, rgba);
            }
        }
        if let Some(width) = batch.line_width {
            device.set_line_width(width);
        }

        let result = resources
            .get_or_create_buffer(&mut *device, batch.buffer, batch.descriptor)
            .and_then(|buffer| {
                buffer.upload(batch.data)?;
                let mut drawn = DrawStats::default();
                match batch.segments {
                    None => {
                        drawn.vertices = buffer.vertex_count();
                        drawn.draw_calls = 1;
                        buffer.draw(batch.mode)?;
                    }
                    Some(segments) => {
                        for segment in segments.iter().filter(|s| !s.is_empty()) {
                            buffer.draw_range(batch.mode, segment.start, segment.len())?;
                            drawn.vertices += segment.len();
                            drawn.draw_calls += 1;
                        }
                    }
                }
                Ok(drawn)
            });

        match result {
            Ok(drawn) => stats += drawn,
            Err(err) => {
                warn!(buffer = batch.buffer, error = %err, "dropping batch for this frame");
                failure.get_or_insert(err);
            }
        }
    }

    if let Some(program) = resources.shader_mut(shader) {
        program.unbind();
    }
    failure.map_or(Ok(stats), Err)
}
