use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};
use crate::render::buffer::{Buffer, BufferDescriptor};
use crate::render::color::Color;
use crate::render::shader::{Shader, ShaderSource};
use crate::render::texture::{Texture, TextureDescriptor};

/// Graphics APIs a device can be backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderBackend {
    Headless,
    Cairo,
    OpenGl,
    Vulkan,
    Metal,
    Direct3d12,
}

impl RenderBackend {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Headless => "headless",
            Self::Cairo => "cairo",
            Self::OpenGl => "opengl",
            Self::Vulkan => "vulkan",
            Self::Metal => "metal",
            Self::Direct3d12 => "direct3d12",
        }
    }
}

impl fmt::Display for RenderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backend requested by the host: a specific API or the best available one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    #[default]
    Auto,
    Specific(RenderBackend),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    LineStrip,
    LineLoop,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    None,
    #[default]
    Alpha,
    Additive,
    Multiply,
}

/// Integer pixel rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Limits reported by a device after initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub max_line_width: f32,
    pub max_texture_size: u32,
    pub renderer_info: String,
    pub supports_pixel_readback: bool,
}

/// GPU abstraction every backend implements.
///
/// All calls happen on the render thread. State setters are idempotent and
/// apply to the draw calls issued after them. Resource factories report
/// shader compile failures through [`Shader::is_valid`], never as errors.
pub trait RenderDevice {
    fn backend(&self) -> RenderBackend;

    fn initialize(&mut self) -> ChartResult<()>;

    fn dispose(&mut self);

    fn is_initialized(&self) -> bool;

    /// Starts GPU work for a frame. Backends without explicit frame
    /// boundaries treat this pair as a no-op.
    fn begin_frame(&mut self) -> ChartResult<()>;

    fn end_frame(&mut self) -> ChartResult<()>;

    fn set_viewport(&mut self, rect: PixelRect);

    /// Resizes the drawing surface. Contents drawn so far may be lost; the
    /// viewport is left for the next [`Self::set_viewport`].
    fn resize(&mut self, width: u32, height: u32) -> ChartResult<()> {
        let _ = (width, height);
        Ok(())
    }

    fn set_scissor_enabled(&mut self, enabled: bool);

    fn set_scissor(&mut self, rect: PixelRect);

    fn set_blend_mode(&mut self, mode: BlendMode);

    /// Sets the line width, clamped to the device maximum.
    fn set_line_width(&mut self, width: f32);

    fn set_line_smoothing(&mut self, enabled: bool);

    fn clear(&mut self, color: Color);

    fn create_shader(&mut self, source: &ShaderSource) -> ChartResult<Box<dyn Shader>>;

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> ChartResult<Box<dyn Buffer>>;

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> ChartResult<Box<dyn Texture>>;

    fn capabilities(&self) -> DeviceCapabilities;

    fn supports_pixel_readback(&self) -> bool {
        false
    }

    /// Copies the current frame as packed `0xAARRGGBB` pixels, row-major from
    /// the top-left, into `pixels` (length `width * height`).
    fn read_pixels(&mut self, pixels: &mut [u32]) -> ChartResult<()> {
        let _ = pixels;
        Err(ChartError::ReadbackUnsupported(self.backend().name()))
    }

    /// Blocks until outstanding GPU work has completed. Only teardown and
    /// measurement code should call this.
    fn synchronize(&mut self) -> ChartResult<()> {
        Ok(())
    }
}
