use crate::core::axis::{Axis, AxisAnchor, AxisId, AxisSet};
use crate::core::scale::LinearScale;
use crate::core::types::Viewport;
use crate::error::ChartResult;

/// Maps timestamps and axis values to screen pixels for one frame.
///
/// This is a read-only view over the viewport and the axis set. It holds no
/// cache, so it can be rebuilt or queried freely while building vertices.
/// Screen X grows with time; screen Y shrinks as values grow.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateSystem<'a> {
    viewport: &'a Viewport,
    axes: &'a AxisSet,
}

impl<'a> CoordinateSystem<'a> {
    #[must_use]
    pub fn new(viewport: &'a Viewport, axes: &'a AxisSet) -> Self {
        Self { viewport, axes }
    }

    #[must_use]
    pub fn viewport(&self) -> &'a Viewport {
        self.viewport
    }

    #[must_use]
    pub fn axes(&self) -> &'a AxisSet {
        self.axes
    }

    /// Time-to-pixel map over the plot area between the left and right insets.
    #[must_use]
    pub fn x_scale(&self) -> LinearScale {
        let left = f64::from(self.viewport.insets.left);
        LinearScale::new_unchecked(
            self.viewport.start_time() as f64,
            self.viewport.end_time() as f64,
            left,
            left + f64::from(self.viewport.chart_width()),
        )
    }

    #[inline]
    #[must_use]
    pub fn x_value_to_screen_x(&self, timestamp: i64) -> f64 {
        self.x_scale().map(timestamp as f64)
    }

    #[must_use]
    pub fn screen_x_to_x_value(&self, screen_x: f64) -> i64 {
        self.x_scale().invert(screen_x).round() as i64
    }

    /// Converts `timestamps` into screen X positions, writing into `out`.
    ///
    /// Only `min(timestamps.len(), out.len())` entries are written.
    pub fn x_values_to_screen_x(&self, timestamps: &[i64], out: &mut [f32]) {
        let scale = self.x_scale();
        for (dst, &t) in out.iter_mut().zip(timestamps) {
            *dst = scale.map(t as f64) as f32;
        }
    }

    /// Horizontal pixel length of a time span, independent of where it starts.
    #[must_use]
    pub fn pixel_width(&self, span_ms: i64) -> f64 {
        span_ms as f64 * self.viewport.pixels_per_ms()
    }

    /// Candle slot width for bars of `bar_duration_ms`; keeps candles
    /// proportional to the zoom level rather than to the number of visible bars.
    #[must_use]
    pub fn bar_width(&self, bar_duration_ms: i64) -> f64 {
        self.pixel_width(bar_duration_ms).max(0.0)
    }

    /// Resolves the transform for one axis so hot loops do a single lookup.
    pub fn axis(&self, id: &str) -> ChartResult<AxisCoordinates> {
        let axis = self.axes.get(id)?;
        Ok(AxisCoordinates::new(self.viewport, axis))
    }

    pub fn default_axis(&self) -> ChartResult<AxisCoordinates> {
        self.axis(AxisId::DEFAULT)
    }

    pub fn y_value_to_screen_y(&self, value: f64, axis_id: &str) -> ChartResult<f64> {
        Ok(self.axis(axis_id)?.value_to_screen_y(value))
    }

    pub fn screen_y_to_y_value(&self, screen_y: f64, axis_id: &str) -> ChartResult<f64> {
        Ok(self.axis(axis_id)?.screen_y_to_value(screen_y))
    }

    /// Whether a screen point lies inside the plot area (insets excluded).
    #[must_use]
    pub fn plot_contains(&self, screen_x: f64, screen_y: f64) -> bool {
        let left = f64::from(self.viewport.insets.left);
        let top = f64::from(self.viewport.insets.top);
        screen_x >= left
            && screen_x <= left + f64::from(self.viewport.chart_width())
            && screen_y >= top
            && screen_y <= top + f64::from(self.viewport.chart_height())
    }
}

/// Value-to-pixel transform of a single axis, resolved against a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCoordinates {
    scale: LinearScale,
    band_top: f64,
    band_height: f64,
}

impl AxisCoordinates {
    fn new(viewport: &Viewport, axis: &Axis) -> Self {
        let chart_height = f64::from(viewport.chart_height());
        let top_inset = f64::from(viewport.insets.top);
        let (band_top, band_height) = match axis.anchor() {
            AxisAnchor::Full => (top_inset, chart_height),
            AxisAnchor::Top => (top_inset, (chart_height * axis.height_ratio()).floor()),
            AxisAnchor::Bottom => {
                let height = (chart_height * axis.height_ratio()).floor();
                (top_inset + chart_height - height, height)
            }
        };

        Self {
            scale: LinearScale::new_unchecked(
                axis.min(),
                axis.max(),
                band_top + band_height,
                band_top,
            ),
            band_top,
            band_height,
        }
    }

    #[inline]
    #[must_use]
    pub fn value_to_screen_y(&self, value: f64) -> f64 {
        self.scale.map(value)
    }

    #[must_use]
    pub fn screen_y_to_value(&self, screen_y: f64) -> f64 {
        self.scale.invert(screen_y)
    }

    /// Vertical pixel length of a value span (positive for positive spans).
    #[must_use]
    pub fn pixel_height(&self, span: f64) -> f64 {
        -self.scale.scale_span(span)
    }

    /// Converts `values` into screen Y positions, writing into `out`.
    pub fn values_to_screen_y(&self, values: &[f32], out: &mut [f32]) {
        for (dst, &v) in out.iter_mut().zip(values) {
            *dst = self.scale.map(f64::from(v)) as f32;
        }
    }

    #[must_use]
    pub fn band_top(&self) -> f64 {
        self.band_top
    }

    #[must_use]
    pub fn band_height(&self) -> f64 {
        self.band_height
    }
}
