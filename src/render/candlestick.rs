use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{AxisCoordinates, AxisId, CoordinateSystem, OhlcSeries, TimeSeries, VisibleRange};
use crate::error::{ChartError, ChartResult};
use crate::render::batch::{Batch, DrawStats, draw_batches, shader_is_usable};
use crate::render::buffer::BufferDescriptor;
use crate::render::color::Color;
use crate::render::color_rule::{CandleColorRule, ColorRule};
use crate::render::context::RenderContext;
use crate::render::device::DrawMode;
use crate::render::resource_manager::ResourceManager;
use crate::render::scratch::VertexScratch;
use crate::render::shader::SHADER_DEFAULT;

pub const BODY_VERTICES_PER_BAR: usize = 6;
pub const WICK_VERTICES_PER_BAR: usize = 2;
pub const TICK_VERTICES_PER_BAR: usize = 4;
pub const OUTLINE_VERTICES_PER_BAR: usize = 8;

const FLOATS_PER_VERTEX: usize = 6;
const INITIAL_BARS: usize = 256;
const INITIAL_BUFFER_VERTICES: usize = 1024;

pub const MIN_WIDTH_RATIO: f32 = 0.1;
pub const MAX_WIDTH_RATIO: f32 = 1.0;

/// Bodies thinner than this many pixels are widened around their midpoint.
const MIN_BODY_HEIGHT_PX: f32 = 1.0;

/// How OHLC bars are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartStyle {
    /// Filled bodies plus gray wicks.
    #[default]
    Candlestick,
    /// Colored high-low line with an open tick left and a close tick right.
    OhlcBar,
    /// Bearish bodies filled, bullish bodies drawn as outlines.
    HollowCandle,
    /// Bodies and wicks both take the color rule's color.
    ColoredCandle,
    /// Candlestick geometry over a series already passed through
    /// [`crate::core::heikin_ashi`].
    HeikinAshi,
}

fn default_bullish_color() -> Color {
    Color::rgb8(38, 166, 91)
}

fn default_bearish_color() -> Color {
    Color::rgb8(214, 69, 65)
}

fn default_wick_color() -> Color {
    Color::rgb8(150, 150, 150)
}

fn default_body_width_ratio() -> f32 {
    0.8
}

fn default_tick_width_ratio() -> f32 {
    0.5
}

/// Serializable candlestick appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlestickStyle {
    #[serde(default = "default_bullish_color")]
    pub bullish_color: Color,
    #[serde(default = "default_bearish_color")]
    pub bearish_color: Color,
    #[serde(default = "default_wick_color")]
    pub wick_color: Color,
    /// Body width as a fraction of the bar slot.
    #[serde(default = "default_body_width_ratio")]
    pub body_width_ratio: f32,
    /// OHLC tick length as a fraction of the body width.
    #[serde(default = "default_tick_width_ratio")]
    pub tick_width_ratio: f32,
    #[serde(default)]
    pub chart_style: ChartStyle,
    #[serde(default)]
    pub color_rule: CandleColorRule,
}

impl Default for CandlestickStyle {
    fn default() -> Self {
        Self {
            bullish_color: default_bullish_color(),
            bearish_color: default_bearish_color(),
            wick_color: default_wick_color(),
            body_width_ratio: default_body_width_ratio(),
            tick_width_ratio: default_tick_width_ratio(),
            chart_style: ChartStyle::default(),
            color_rule: CandleColorRule::default(),
        }
    }
}

impl CandlestickStyle {
    #[must_use]
    pub fn with_chart_style(mut self, chart_style: ChartStyle) -> Self {
        self.chart_style = chart_style;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, bullish: Color, bearish: Color, wick: Color) -> Self {
        self.bullish_color = bullish;
        self.bearish_color = bearish;
        self.wick_color = wick;
        self
    }

    #[must_use]
    pub fn with_body_width_ratio(mut self, ratio: f32) -> Self {
        self.body_width_ratio = clamp_ratio(ratio);
        self
    }

    #[must_use]
    pub fn with_tick_width_ratio(mut self, ratio: f32) -> Self {
        self.tick_width_ratio = clamp_ratio(ratio);
        self
    }

    #[must_use]
    pub fn with_color_rule(mut self, rule: CandleColorRule) -> Self {
        self.color_rule = rule;
        self
    }

    /// Copy with both width ratios clamped into range.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            body_width_ratio: clamp_ratio(self.body_width_ratio),
            tick_width_ratio: clamp_ratio(self.tick_width_ratio),
            ..self
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        self.bullish_color.validate()?;
        self.bearish_color.validate()?;
        self.wick_color.validate()?;
        for (name, ratio) in [
            ("body_width_ratio", self.body_width_ratio),
            ("tick_width_ratio", self.tick_width_ratio),
        ] {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ChartError::InvalidData(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }
}

fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() {
        ratio.clamp(MIN_WIDTH_RATIO, MAX_WIDTH_RATIO)
    } else {
        default_body_width_ratio()
    }
}

/// Builds and draws OHLC series in any [`ChartStyle`].
///
/// Owns three scratch arrays (body, wick, tick) and three buffers keyed by
/// the renderer's name. Only the visible index range is ever read, so
/// per-frame cost does not depend on series length.
pub struct CandlestickRenderer {
    name: String,
    buffers: [String; 3],
    style: CandlestickStyle,
    color_rule: Box<dyn ColorRule>,
    axis: AxisId,
    descriptor: BufferDescriptor,
    body: VertexScratch,
    wick: VertexScratch,
    tick: VertexScratch,
    initialized: bool,
}

impl CandlestickRenderer {
    /// `name` keys this renderer's buffers (`candlestick.<name>.body`,
    /// `.wick` and `.tick`).
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_style(name, CandlestickStyle::default())
    }

    #[must_use]
    pub fn with_style(name: &str, style: CandlestickStyle) -> Self {
        let style = style.normalized();
        Self {
            name: name.to_owned(),
            buffers: [
                format!("candlestick.{name}.body"),
                format!("candlestick.{name}.wick"),
                format!("candlestick.{name}.tick"),
            ],
            color_rule: Box::new(style.color_rule),
            style,
            axis: AxisId::default_axis(),
            descriptor: BufferDescriptor::position_color_2d(
                INITIAL_BUFFER_VERTICES * FLOATS_PER_VERTEX,
            ),
            body: VertexScratch::new(
                FLOATS_PER_VERTEX,
                INITIAL_BARS * BODY_VERTICES_PER_BAR * FLOATS_PER_VERTEX,
            ),
            wick: VertexScratch::new(
                FLOATS_PER_VERTEX,
                INITIAL_BARS * WICK_VERTICES_PER_BAR * FLOATS_PER_VERTEX,
            ),
            tick: VertexScratch::new(
                FLOATS_PER_VERTEX,
                INITIAL_BARS * TICK_VERTICES_PER_BAR * FLOATS_PER_VERTEX,
            ),
            initialized: false,
        }
    }

    /// Draws against `axis` instead of the default axis.
    #[must_use]
    pub fn on_axis(mut self, axis: impl Into<AxisId>) -> Self {
        self.axis = axis.into();
        self
    }

    #[must_use]
    pub fn style(&self) -> &CandlestickStyle {
        &self.style
    }

    /// Replaces the style; the color rule is reset to the style's built-in
    /// rule.
    pub fn set_style(&mut self, style: CandlestickStyle) {
        self.style = style.normalized();
        self.color_rule = Box::new(self.style.color_rule);
    }

    #[must_use]
    pub fn chart_style(&self) -> ChartStyle {
        self.style.chart_style
    }

    pub fn set_chart_style(&mut self, chart_style: ChartStyle) {
        self.style.chart_style = chart_style;
    }

    pub fn set_colors(&mut self, bullish: Color, bearish: Color, wick: Color) {
        self.style = self.style.with_colors(bullish, bearish, wick);
    }

    /// Clamped to `[0.1, 1.0]`.
    pub fn set_body_width_ratio(&mut self, ratio: f32) {
        self.style.body_width_ratio = clamp_ratio(ratio);
    }

    /// Clamped to `[0.1, 1.0]`.
    pub fn set_tick_width_ratio(&mut self, ratio: f32) {
        self.style.tick_width_ratio = clamp_ratio(ratio);
    }

    pub fn set_color_rule(&mut self, rule: impl ColorRule + 'static) {
        self.color_rule = Box::new(rule);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn body_buffer(&self) -> &str {
        &self.buffers[0]
    }

    #[must_use]
    pub fn wick_buffer(&self) -> &str {
        &self.buffers[1]
    }

    /// Holds OHLC ticks, or hollow candle outlines.
    #[must_use]
    pub fn tick_buffer(&self) -> &str {
        &self.buffers[2]
    }

    #[must_use]
    pub fn axis(&self) -> &AxisId {
        &self.axis
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Creates the three buffers up front. [`Self::render`] does this lazily
    /// when skipped.
    pub fn initialize(&mut self, ctx: &mut RenderContext<'_>) -> ChartResult<()> {
        let (device, resources) = ctx.device_and_resources();
        for name in &self.buffers {
            resources.get_or_create_buffer(&mut *device, name, &self.descriptor)?;
        }
        self.initialized = true;
        debug!(name = %self.name, axis = %self.axis, "candlestick renderer initialized");
        Ok(())
    }

    /// Builds and draws the visible bars of `series`.
    ///
    /// Nothing is bound or uploaded when there is no visible data or the
    /// default shader is unusable.
    pub fn render(
        &mut self,
        ctx: &mut RenderContext<'_>,
        series: &OhlcSeries,
    ) -> ChartResult<DrawStats> {
        let Some(range) = ctx.visible_range().filter(|_| !series.is_empty()) else {
            trace!(series = series.id(), "candlestick: nothing visible");
            return Ok(DrawStats::default());
        };
        if !shader_is_usable(ctx, SHADER_DEFAULT) {
            trace!(series = series.id(), "candlestick: default shader unusable");
            return Ok(DrawStats::default());
        }
        if !self.initialized {
            self.initialize(ctx)?;
        }

        let bar_width = ctx.bar_width();
        self.build_vertices(ctx.coordinates(), range, bar_width, series)?;

        let [body_buffer, wick_buffer, tick_buffer] = &self.buffers;
        let body = Batch::new(body_buffer, &self.descriptor, self.body.as_slice(), DrawMode::Triangles);
        let wick = Batch::new(wick_buffer, &self.descriptor, self.wick.as_slice(), DrawMode::Lines);
        let tick = Batch::new(tick_buffer, &self.descriptor, self.tick.as_slice(), DrawMode::Lines);
        let stats = match self.style.chart_style {
            ChartStyle::OhlcBar => draw_batches(ctx, SHADER_DEFAULT, &[wick, tick])?,
            ChartStyle::HollowCandle => draw_batches(ctx, SHADER_DEFAULT, &[wick, body, tick])?,
            ChartStyle::Candlestick | ChartStyle::ColoredCandle | ChartStyle::HeikinAshi => {
                draw_batches(ctx, SHADER_DEFAULT, &[body, wick])?
            }
        };
        trace!(
            series = series.id(),
            bars = range.count(),
            draw_calls = stats.draw_calls,
            vertices = stats.vertices,
            "candlestick frame"
        );
        Ok(stats)
    }

    /// Fills the scratch arrays for `range` without touching the device.
    ///
    /// Capacity is checked for the whole range before the first write.
    pub fn build_vertices(
        &mut self,
        coordinates: &CoordinateSystem<'_>,
        range: VisibleRange,
        bar_width: f64,
        series: &OhlcSeries,
    ) -> ChartResult<()> {
        range.check_within(series.len())?;
        let axis = coordinates.axis(self.axis.as_str())?;
        let count = range.count();
        let tick_vertices = match self.style.chart_style {
            ChartStyle::HollowCandle => OUTLINE_VERTICES_PER_BAR,
            _ => TICK_VERTICES_PER_BAR,
        };
        self.body.reserve_elements(count, BODY_VERTICES_PER_BAR);
        self.wick.reserve_elements(count, WICK_VERTICES_PER_BAR);
        self.tick.reserve_elements(count, tick_vertices);
        self.body.reset();
        self.wick.reset();
        self.tick.reset();

        let bars = Bars {
            series,
            coordinates,
            axis,
            range,
        };
        let body_width = bar_width * f64::from(self.style.body_width_ratio);
        let half_body = body_width / 2.0;
        let bullish = self.style.bullish_color.to_array();
        let bearish = self.style.bearish_color.to_array();
        let wick = self.style.wick_color.to_array();
        let rule = self.color_rule.as_ref();

        match self.style.chart_style {
            ChartStyle::Candlestick | ChartStyle::HeikinAshi => {
                bars.for_each(|i, bar| {
                    let rgba = if rule.is_bullish(series, i) { bullish } else { bearish };
                    push_body(&mut self.body, bar.x, half_body, bar.open_y, bar.close_y, rgba);
                    push_line(&mut self.wick, bar.x, bar.high_y, bar.x, bar.low_y, wick);
                });
            }
            ChartStyle::ColoredCandle => {
                bars.for_each(|i, bar| {
                    let rgba = if rule.is_bullish(series, i) { bullish } else { bearish };
                    push_body(&mut self.body, bar.x, half_body, bar.open_y, bar.close_y, rgba);
                    push_line(&mut self.wick, bar.x, bar.high_y, bar.x, bar.low_y, rgba);
                });
            }
            ChartStyle::OhlcBar => {
                let tick_width = (body_width * f64::from(self.style.tick_width_ratio)) as f32;
                bars.for_each(|i, bar| {
                    let rgba = if series.is_bullish(i) { bullish } else { bearish };
                    push_line(&mut self.wick, bar.x, bar.high_y, bar.x, bar.low_y, rgba);
                    push_line(&mut self.tick, bar.x - tick_width, bar.open_y, bar.x, bar.open_y, rgba);
                    push_line(&mut self.tick, bar.x, bar.close_y, bar.x + tick_width, bar.close_y, rgba);
                });
            }
            ChartStyle::HollowCandle => {
                bars.for_each(|i, bar| {
                    if series.is_bullish(i) {
                        push_outline(&mut self.tick, bar.x, half_body, bar.close_y, bar.open_y, bullish);
                    } else {
                        push_body(&mut self.body, bar.x, half_body, bar.open_y, bar.close_y, bearish);
                    }
                    push_line(&mut self.wick, bar.x, bar.high_y, bar.x, bar.low_y, wick);
                });
            }
        }
        Ok(())
    }

    /// Floats written to the body array by the last build.
    #[must_use]
    pub fn body_vertices(&self) -> &[f32] {
        self.body.as_slice()
    }

    #[must_use]
    pub fn wick_vertices(&self) -> &[f32] {
        self.wick.as_slice()
    }

    /// Tick vertices for OHLC bars, outline vertices for hollow candles.
    #[must_use]
    pub fn tick_vertices(&self) -> &[f32] {
        self.tick.as_slice()
    }

    /// Floats currently allocated across the three scratch arrays.
    #[must_use]
    pub fn scratch_capacity(&self) -> usize {
        self.body.capacity() + self.wick.capacity() + self.tick.capacity()
    }

    /// Releases the scratch arrays and this renderer's buffers. Buffers of
    /// other renderers sharing `resources` are untouched.
    pub fn dispose(&mut self, resources: &mut ResourceManager) {
        for name in &self.buffers {
            resources.dispose_buffer(name);
        }
        self.body.clear_storage();
        self.wick.clear_storage();
        self.tick.clear_storage();
        self.initialized = false;
    }
}

impl fmt::Debug for CandlestickRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandlestickRenderer")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("axis", &self.axis)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Screen positions of one bar.
#[derive(Debug, Clone, Copy)]
struct BarPixels {
    x: f32,
    open_y: f32,
    high_y: f32,
    low_y: f32,
    close_y: f32,
}

struct Bars<'s, 'c> {
    series: &'s OhlcSeries,
    coordinates: &'s CoordinateSystem<'c>,
    axis: AxisCoordinates,
    range: VisibleRange,
}

impl Bars<'_, '_> {
    fn for_each(&self, mut f: impl FnMut(usize, BarPixels)) {
        let timestamps = self.series.timestamps();
        let open = self.series.open();
        let high = self.series.high();
        let low = self.series.low();
        let close = self.series.close();
        let y = |v: f32| self.axis.value_to_screen_y(f64::from(v)) as f32;
        for i in self.range.indices() {
            f(
                i,
                BarPixels {
                    x: self.coordinates.x_value_to_screen_x(timestamps[i]) as f32,
                    open_y: y(open[i]),
                    high_y: y(high[i]),
                    low_y: y(low[i]),
                    close_y: y(close[i]),
                },
            );
        }
    }
}

/// Doji guard: a body thinner than one pixel becomes exactly one pixel
/// around its midpoint. Returns `(top, bottom)` in screen space.
fn body_span(a_y: f32, b_y: f32) -> (f32, f32) {
    let top = a_y.min(b_y);
    let bottom = a_y.max(b_y);
    if (bottom - top) < MIN_BODY_HEIGHT_PX {
        let mid = (top + bottom) / 2.0;
        (mid - MIN_BODY_HEIGHT_PX / 2.0, mid + MIN_BODY_HEIGHT_PX / 2.0)
    } else {
        (top, bottom)
    }
}

/// Two triangles: (lt, lb, rb) and (lt, rb, rt).
fn push_body(out: &mut VertexScratch, x: f32, half_width: f64, a_y: f32, b_y: f32, rgba: [f32; 4]) {
    let (top, bottom) = body_span(a_y, b_y);
    let left = (f64::from(x) - half_width) as f32;
    let right = (f64::from(x) + half_width) as f32;
    out.push_vertex(left, top, rgba);
    out.push_vertex(left, bottom, rgba);
    out.push_vertex(right, bottom, rgba);
    out.push_vertex(left, top, rgba);
    out.push_vertex(right, bottom, rgba);
    out.push_vertex(right, top, rgba);
}

/// Rectangle outline as four line segments: top, bottom, left, right.
fn push_outline(
    out: &mut VertexScratch,
    x: f32,
    half_width: f64,
    a_y: f32,
    b_y: f32,
    rgba: [f32; 4],
) {
    let (top, bottom) = body_span(a_y, b_y);
    let left = (f64::from(x) - half_width) as f32;
    let right = (f64::from(x) + half_width) as f32;
    push_line(out, left, top, right, top, rgba);
    push_line(out, left, bottom, right, bottom, rgba);
    push_line(out, left, top, left, bottom, rgba);
    push_line(out, right, top, right, bottom, rgba);
}

#[inline]
fn push_line(out: &mut VertexScratch, x1: f32, y1: f32, x2: f32, y2: f32, rgba: [f32; 4]) {
    out.push_vertex(x1, y1, rgba);
    out.push_vertex(x2, y2, rgba);
}
