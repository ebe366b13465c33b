mod backend;
mod band;
mod batch;
mod buffer;
mod candlestick;
mod color;
mod color_rule;
mod context;
mod contour;
mod device;
mod headless;
mod line;
mod resource_manager;
mod scratch;
mod shader;
mod texture;

pub use backend::{BackendProvider, BackendRegistry, DEFAULT_PROVIDER_PRIORITY, HeadlessProvider};
pub use band::{BandRenderer, BandStyle};
pub use batch::DrawStats;
pub use buffer::{
    AttributeType, Buffer, BufferDescriptor, BufferDescriptorBuilder, BufferUsage,
    COLOR_ATTRIBUTE, POSITION_ATTRIBUTE, VertexAttribute, grown_capacity,
};
pub use candlestick::{
    BODY_VERTICES_PER_BAR, CandlestickRenderer, CandlestickStyle, ChartStyle, MAX_WIDTH_RATIO,
    MIN_WIDTH_RATIO, OUTLINE_VERTICES_PER_BAR, TICK_VERTICES_PER_BAR, WICK_VERTICES_PER_BAR,
};
pub use color::Color;
pub use color_rule::{CandleColorRule, ColorRule};
pub use context::{DEFAULT_BAR_DURATION_MS, RenderContext, pixel_projection};
pub use contour::{ContourLevel, ContourRenderer};
pub use device::{
    BackendPreference, BlendMode, DeviceCapabilities, DrawMode, PixelRect, RenderBackend,
    RenderDevice,
};
pub use headless::{DeviceCall, DrawCall, HeadlessDevice, HeadlessRecorder};
pub use line::{LineRenderer, LineStyle};
pub use resource_manager::{PendingReport, RenderQueueHandle, RenderThreadOp, ResourceManager};
pub use scratch::VertexScratch;
pub use shader::{
    SHADER_DEFAULT, SHADER_SIMPLE, SHADER_TEXT, Shader, ShaderSource, ShaderStage,
    UNIFORM_COLOR, UNIFORM_PROJECTION, UNIFORM_TEXTURE, UniformValue,
};
pub use texture::{Texture, TextureDescriptor, TextureFilter, TextureFormat, TextureWrap};

#[cfg(feature = "cairo-backend")]
mod cairo_backend;
#[cfg(feature = "cairo-backend")]
pub use cairo_backend::{CairoDevice, CairoProvider};
