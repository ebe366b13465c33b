use std::cell::RefCell;
use std::rc::Rc;

use cairo::{Context, Format, ImageSurface, Operator};
use glam::{Mat4, Vec4};
use tracing::{debug, warn};

use crate::error::{ChartError, ChartResult};
use crate::render::backend::BackendProvider;
use crate::render::buffer::{Buffer, BufferDescriptor, COLOR_ATTRIBUTE, grown_capacity};
use crate::render::color::Color;
use crate::render::device::{
    BlendMode, DeviceCapabilities, DrawMode, PixelRect, RenderBackend, RenderDevice,
};
use crate::render::shader::{
    Shader, ShaderSource, ShaderStage, UNIFORM_COLOR, UNIFORM_PROJECTION, UniformValue,
};
use crate::render::texture::{Texture, TextureDescriptor, check_texture_upload};

const MAX_LINE_WIDTH: f32 = 64.0;
const MAX_TEXTURE_SIZE: u32 = 4096;
const POINT_SIZE: f64 = 2.0;

/// Uniform values of one program; shared between the shader object and the
/// device while the program is bound.
#[derive(Debug, Clone, Copy)]
struct Uniforms {
    projection: Mat4,
    color: [f32; 4],
}

impl Default for Uniforms {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug)]
struct CairoState {
    surface: ImageSurface,
    initialized: bool,
    blend_mode: BlendMode,
    line_width: f64,
    antialias: bool,
    viewport: PixelRect,
    scissor_enabled: bool,
    scissor: PixelRect,
    program: Option<Rc<RefCell<Uniforms>>>,
}

impl CairoState {
    fn context(&self) -> ChartResult<Context> {
        let context = Context::new(&self.surface)
            .map_err(|err| map_backend_error("failed to create cairo context", err))?;
        context.set_operator(match self.blend_mode {
            BlendMode::None => Operator::Source,
            BlendMode::Alpha => Operator::Over,
            BlendMode::Additive => Operator::Add,
            BlendMode::Multiply => Operator::Multiply,
        });
        context.set_antialias(if self.antialias {
            cairo::Antialias::Default
        } else {
            cairo::Antialias::None
        });
        context.set_line_width(self.line_width);
        let viewport = self.viewport;
        context.rectangle(
            f64::from(viewport.x),
            f64::from(viewport.y),
            f64::from(viewport.width),
            f64::from(viewport.height),
        );
        context.clip();
        if self.scissor_enabled {
            let rect = self.scissor;
            context.rectangle(
                f64::from(rect.x),
                f64::from(rect.y),
                f64::from(rect.width),
                f64::from(rect.height),
            );
            context.clip();
        }
        Ok(context)
    }
}

type SharedState = Rc<RefCell<CairoState>>;

/// Software device rasterizing into an ARGB32 image surface.
///
/// Vertices are projected with the bound program's `uProjection`, so the same
/// renderers drive it as any GPU backend. Triangles are filled and lines
/// stroked with the color of their first vertex (or `uColor` for layouts
/// without a color attribute). Clip space maps onto the current viewport
/// rectangle and drawing is clipped to it.
#[derive(Debug)]
pub struct CairoDevice {
    state: SharedState,
}

impl CairoDevice {
    pub fn new(width: u32, height: u32) -> ChartResult<Self> {
        let surface = create_surface(width, height)?;
        Ok(Self {
            state: Rc::new(RefCell::new(CairoState {
                surface,
                initialized: false,
                blend_mode: BlendMode::Alpha,
                line_width: 1.0,
                antialias: true,
                viewport: PixelRect::new(0, 0, width, height),
                scissor_enabled: false,
                scissor: PixelRect::default(),
                program: None,
            })),
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.state.borrow().surface.width().max(0) as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.state.borrow().surface.height().max(0) as u32
    }

    /// Writes the current surface as PNG.
    pub fn write_png(&self, writer: &mut impl std::io::Write) -> ChartResult<()> {
        let state = self.state.borrow();
        state.surface.flush();
        state
            .surface
            .write_to_png(writer)
            .map_err(|err| ChartError::Backend(format!("failed to encode png: {err}")))
    }
}

impl RenderDevice for CairoDevice {
    fn backend(&self) -> RenderBackend {
        RenderBackend::Cairo
    }

    fn initialize(&mut self) -> ChartResult<()> {
        self.state.borrow_mut().initialized = true;
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = self.state.borrow_mut();
        state.initialized = false;
        state.program = None;
    }

    fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    fn begin_frame(&mut self) -> ChartResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ChartError::NotInitialized("cairo device"))
        }
    }

    fn end_frame(&mut self) -> ChartResult<()> {
        self.state.borrow().surface.flush();
        Ok(())
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.state.borrow_mut().viewport = rect;
    }

    /// Recreates the surface when the size changed; contents are lost and
    /// the viewport covers the new surface.
    fn resize(&mut self, width: u32, height: u32) -> ChartResult<()> {
        if width == self.width() && height == self.height() {
            return Ok(());
        }
        let surface = create_surface(width, height)?;
        let mut state = self.state.borrow_mut();
        state.surface = surface;
        state.viewport = PixelRect::new(0, 0, width, height);
        debug!(width, height, "resized cairo surface");
        Ok(())
    }

    fn set_scissor_enabled(&mut self, enabled: bool) {
        self.state.borrow_mut().scissor_enabled = enabled;
    }

    fn set_scissor(&mut self, rect: PixelRect) {
        self.state.borrow_mut().scissor = rect;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.borrow_mut().blend_mode = mode;
    }

    fn set_line_width(&mut self, width: f32) {
        let width = if width.is_finite() {
            width.clamp(1.0, MAX_LINE_WIDTH)
        } else {
            1.0
        };
        self.state.borrow_mut().line_width = f64::from(width);
    }

    fn set_line_smoothing(&mut self, enabled: bool) {
        self.state.borrow_mut().antialias = enabled;
    }

    fn clear(&mut self, color: Color) {
        let state = self.state.borrow();
        let result = Context::new(&state.surface).and_then(|context| {
            context.set_operator(Operator::Source);
            context.set_source_rgba(color.red, color.green, color.blue, color.alpha);
            context.paint()
        });
        if let Err(err) = result {
            warn!(error = %err, "failed to clear cairo surface");
        }
    }

    fn create_shader(&mut self, source: &ShaderSource) -> ChartResult<Box<dyn Shader>> {
        let valid = [ShaderStage::Vertex, ShaderStage::Fragment]
            .into_iter()
            .all(|stage| source.stage(stage).is_some_and(|src| !src.trim().is_empty()));
        Ok(Box::new(CairoShader {
            name: source.name().to_owned(),
            valid,
            uniforms: Rc::new(RefCell::new(Uniforms::default())),
            state: Rc::clone(&self.state),
        }))
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> ChartResult<Box<dyn Buffer>> {
        Ok(Box::new(CairoBuffer {
            descriptor: descriptor.clone(),
            data: Vec::with_capacity(descriptor.initial_capacity()),
            capacity: descriptor.initial_capacity(),
            vertex_count: 0,
            initialized: true,
            state: Rc::clone(&self.state),
        }))
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> ChartResult<Box<dyn Texture>> {
        descriptor.validate(MAX_TEXTURE_SIZE)?;
        Ok(Box::new(CairoTexture {
            descriptor: *descriptor,
            texels: Vec::new(),
            initialized: true,
        }))
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_line_width: MAX_LINE_WIDTH,
            max_texture_size: MAX_TEXTURE_SIZE,
            renderer_info: "cairo image surface".to_owned(),
            supports_pixel_readback: true,
        }
    }

    fn supports_pixel_readback(&self) -> bool {
        true
    }

    fn read_pixels(&mut self, pixels: &mut [u32]) -> ChartResult<()> {
        let state = self.state.borrow();
        let surface = &state.surface;
        surface.flush();
        let width = surface.width().max(0) as usize;
        let height = surface.height().max(0) as usize;
        let stride = surface.stride().max(0) as usize;
        if pixels.len() != width * height {
            return Err(ChartError::InvalidData(format!(
                "pixel buffer has {} entries, expected {}",
                pixels.len(),
                width * height
            )));
        }

        surface
            .with_data(|data| {
                for (row, out_row) in pixels.chunks_exact_mut(width).enumerate() {
                    let line = &data[row * stride..row * stride + width * 4];
                    for (dst, texel) in out_row.iter_mut().zip(line.chunks_exact(4)) {
                        let premultiplied =
                            u32::from_ne_bytes([texel[0], texel[1], texel[2], texel[3]]);
                        *dst = unpremultiply(premultiplied);
                    }
                }
            })
            .map_err(|err| ChartError::Backend(format!("failed to read cairo surface: {err}")))
    }
}

/// Registry entry for [`CairoDevice`]; software fallback above headless.
#[derive(Debug, Clone, Copy, Default)]
pub struct CairoProvider;

impl BackendProvider for CairoProvider {
    fn backend(&self) -> RenderBackend {
        RenderBackend::Cairo
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        10
    }

    fn create_device(&self, width: u32, height: u32) -> ChartResult<Box<dyn RenderDevice>> {
        Ok(Box::new(CairoDevice::new(width, height)?))
    }
}

struct CairoShader {
    name: String,
    valid: bool,
    uniforms: Rc<RefCell<Uniforms>>,
    state: SharedState,
}

impl Shader for CairoShader {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn bind(&mut self) {
        if self.valid {
            self.state.borrow_mut().program = Some(Rc::clone(&self.uniforms));
        }
    }

    fn unbind(&mut self) {
        let mut state = self.state.borrow_mut();
        if state
            .program
            .as_ref()
            .is_some_and(|bound| Rc::ptr_eq(bound, &self.uniforms))
        {
            state.program = None;
        }
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        if !self.valid {
            return;
        }
        let mut uniforms = self.uniforms.borrow_mut();
        match (name, value) {
            (UNIFORM_PROJECTION, UniformValue::Mat4(cols)) => {
                uniforms.projection = Mat4::from_cols_array(&cols);
            }
            (UNIFORM_COLOR, UniformValue::Vec4(rgba)) => uniforms.color = rgba,
            _ => {}
        }
    }

    fn dispose(&mut self) {
        self.unbind();
        self.valid = false;
    }
}

struct CairoBuffer {
    descriptor: BufferDescriptor,
    data: Vec<f32>,
    capacity: usize,
    vertex_count: usize,
    initialized: bool,
    state: SharedState,
}

impl CairoBuffer {
    fn vertex(&self, index: usize, uniforms: &Uniforms, viewport: PixelRect) -> (f64, f64, Color) {
        let fpv = self.descriptor.floats_per_vertex();
        let v = &self.data[index * fpv..(index + 1) * fpv];
        let clip = uniforms.projection * Vec4::new(v[0], v[1], 0.0, 1.0);
        let w = if clip.w == 0.0 { 1.0 } else { clip.w };
        let x = f64::from(viewport.x)
            + (f64::from(clip.x / w) + 1.0) * 0.5 * f64::from(viewport.width);
        let y = f64::from(viewport.y)
            + (1.0 - f64::from(clip.y / w)) * 0.5 * f64::from(viewport.height);

        let rgba = match self.descriptor.attribute(COLOR_ATTRIBUTE) {
            Some(attr) => {
                let at = attr.offset_floats();
                [v[at], v[at + 1], v[at + 2], v[at + 3]]
            }
            None => uniforms.color,
        };
        let color = Color::rgba(
            f64::from(rgba[0]),
            f64::from(rgba[1]),
            f64::from(rgba[2]),
            f64::from(rgba[3]),
        );
        (x, y, color)
    }
}

impl Buffer for CairoBuffer {
    fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    fn upload(&mut self, data: &[f32]) -> ChartResult<()> {
        if !self.initialized {
            return Err(ChartError::NotInitialized("buffer"));
        }
        if data.len() > self.capacity {
            let capacity = grown_capacity(self.capacity, data.len());
            let mut grown = Vec::new();
            grown
                .try_reserve_exact(capacity)
                .map_err(|_| ChartError::BufferAllocation {
                    requested_floats: capacity,
                })?;
            self.data = grown;
            self.capacity = capacity;
        }
        self.data.clear();
        self.data.extend_from_slice(data);
        self.vertex_count = data.len() / self.descriptor.floats_per_vertex();
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
        if count == 0 {
            return Ok(());
        }

        let state = self.state.borrow();
        let uniforms = match &state.program {
            Some(program) => *program.borrow(),
            None => {
                return Err(ChartError::Backend(
                    "draw issued without a bound program".to_owned(),
                ));
            }
        };
        let viewport = state.viewport;
        let context = state.context()?;
        let at = |i: usize| self.vertex(i, &uniforms, viewport);

        match mode {
            DrawMode::Triangles => {
                for tri in (first..end).step_by(3).filter(|&i| i + 2 < end) {
                    fill_polygon(&context, &[at(tri), at(tri + 1), at(tri + 2)])?;
                }
            }
            DrawMode::TriangleStrip => {
                for i in first..end.saturating_sub(2) {
                    fill_polygon(&context, &[at(i), at(i + 1), at(i + 2)])?;
                }
            }
            DrawMode::TriangleFan => {
                for i in first + 1..end.saturating_sub(1) {
                    fill_polygon(&context, &[at(first), at(i), at(i + 1)])?;
                }
            }
            DrawMode::Lines => {
                for i in (first..end).step_by(2).filter(|&i| i + 1 < end) {
                    stroke_path(&context, &[at(i), at(i + 1)], false)?;
                }
            }
            DrawMode::LineStrip | DrawMode::LineLoop => {
                let points: Vec<_> = (first..end).map(at).collect();
                stroke_path(&context, &points, mode == DrawMode::LineLoop)?;
            }
            DrawMode::Points => {
                for i in first..end {
                    let (x, y, color) = at(i);
                    set_color(&context, color);
                    context.rectangle(x - POINT_SIZE / 2.0, y - POINT_SIZE / 2.0, POINT_SIZE, POINT_SIZE);
                    context
                        .fill()
                        .map_err(|err| map_backend_error("failed to fill point", err))?;
                }
            }
        }
        Ok(())
    }

    fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    fn set_vertex_count(&mut self, count: usize) {
        self.vertex_count = count.min(self.data.len() / self.descriptor.floats_per_vertex());
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn dispose(&mut self) {
        self.initialized = false;
        self.data = Vec::new();
        self.capacity = 0;
        self.vertex_count = 0;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

struct CairoTexture {
    descriptor: TextureDescriptor,
    texels: Vec<u8>,
    initialized: bool,
}

impl Texture for CairoTexture {
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
        Ok(())
    }

    fn bind(&mut self, _unit: u32) {}

    fn unbind(&mut self) {}

    fn dispose(&mut self) {
        self.initialized = false;
        self.texels = Vec::new();
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

fn create_surface(width: u32, height: u32) -> ChartResult<ImageSurface> {
    let too_large = |v: u32| i32::try_from(v).is_err();
    if width == 0 || height == 0 || too_large(width) || too_large(height) {
        return Err(ChartError::InvalidViewport { width, height });
    }
    ImageSurface::create(Format::ARgb32, width as i32, height as i32)
        .map_err(|err| map_backend_error("failed to create cairo surface", err))
}

fn set_color(context: &Context, color: Color) {
    context.set_source_rgba(color.red, color.green, color.blue, color.alpha);
}

fn fill_polygon(context: &Context, points: &[(f64, f64, Color)]) -> ChartResult<()> {
    let Some(&(x0, y0, color)) = points.first() else {
        return Ok(());
    };
    set_color(context, color);
    context.move_to(x0, y0);
    for &(x, y, _) in &points[1..] {
        context.line_to(x, y);
    }
    context.close_path();
    context
        .fill()
        .map_err(|err| map_backend_error("failed to fill triangle", err))
}

fn stroke_path(context: &Context, points: &[(f64, f64, Color)], close: bool) -> ChartResult<()> {
    let Some(&(x0, y0, color)) = points.first() else {
        return Ok(());
    };
    set_color(context, color);
    context.move_to(x0, y0);
    for &(x, y, _) in &points[1..] {
        context.line_to(x, y);
    }
    if close {
        context.close_path();
    }
    context
        .stroke()
        .map_err(|err| map_backend_error("failed to stroke line", err))
}

/// Cairo stores premultiplied alpha; readback returns straight `0xAARRGGBB`.
fn unpremultiply(pixel: u32) -> u32 {
    let alpha = pixel >> 24;
    if alpha == 0 {
        return 0;
    }
    if alpha == 255 {
        return pixel;
    }
    let channel = |shift: u32| {
        let value = (pixel >> shift) & 0xff;
        ((value * 255 + alpha / 2) / alpha).min(255)
    };
    (alpha << 24) | (channel(16) << 16) | (channel(8) << 8) | channel(0)
}

fn map_backend_error(prefix: &str, err: cairo::Error) -> ChartError {
    ChartError::Backend(format!("{prefix}: {err}"))
}
