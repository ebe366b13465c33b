use serde::{Deserialize, Serialize};

use crate::core::{AxisSet, Insets, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{BackendPreference, CandlestickStyle, Color, DEFAULT_BAR_DURATION_MS};

/// Public engine bootstrap configuration.
///
/// This type is serializable so host applications can persist and reload a
/// chart setup. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartEngineConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub insets: Insets,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default = "default_end_time")]
    pub end_time: i64,
    #[serde(default)]
    pub axis_min: f64,
    #[serde(default = "default_axis_max")]
    pub axis_max: f64,
    #[serde(default = "default_bar_duration_ms")]
    pub bar_duration_ms: i64,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default)]
    pub backend: BackendPreference,
    #[serde(default)]
    pub candlestick_style: CandlestickStyle,
}

impl Default for ChartEngineConfig {
    fn default() -> Self {
        Self::new(default_width(), default_height())
    }
}

impl ChartEngineConfig {
    /// Creates a config for a `width` x `height` surface with default window,
    /// axis range and styling.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            insets: Insets::default(),
            start_time: 0,
            end_time: default_end_time(),
            axis_min: 0.0,
            axis_max: default_axis_max(),
            bar_duration_ms: default_bar_duration_ms(),
            background: default_background(),
            backend: BackendPreference::Auto,
            candlestick_style: CandlestickStyle::default(),
        }
    }

    #[must_use]
    pub fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    /// Sets the initial visible time window, in epoch milliseconds.
    #[must_use]
    pub fn with_time_window(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Sets the range of the default value axis.
    #[must_use]
    pub fn with_axis_range(mut self, min: f64, max: f64) -> Self {
        self.axis_min = min;
        self.axis_max = max;
        self
    }

    #[must_use]
    pub fn with_bar_duration(mut self, bar_duration_ms: i64) -> Self {
        self.bar_duration_ms = bar_duration_ms;
        self
    }

    #[must_use]
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_candlestick_style(mut self, style: CandlestickStyle) -> Self {
        self.candlestick_style = style;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        self.viewport()?;
        self.axes()?;
        if self.bar_duration_ms <= 0 {
            return Err(ChartError::InvalidData(format!(
                "bar duration must be > 0 ms, got {}",
                self.bar_duration_ms
            )));
        }
        self.background.validate()?;
        self.candlestick_style.validate()
    }

    /// Builds the initial viewport described by this config.
    pub fn viewport(&self) -> ChartResult<Viewport> {
        let viewport = Viewport::new(self.width, self.height).with_insets(self.insets);
        viewport.validate()?;
        viewport.with_time_window(self.start_time, self.end_time)
    }

    /// Builds an axis set holding only the default axis.
    pub fn axes(&self) -> ChartResult<AxisSet> {
        AxisSet::new(self.axis_min, self.axis_max)
    }

    /// Serializes config to pretty JSON for debug/config files.
    pub fn to_json_pretty(self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }

    /// Deserializes config from JSON.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse config: {e}")))
    }
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_end_time() -> i64 {
    100 * DEFAULT_BAR_DURATION_MS
}

fn default_axis_max() -> f64 {
    100.0
}

fn default_bar_duration_ms() -> i64 {
    DEFAULT_BAR_DURATION_MS
}

fn default_background() -> Color {
    Color::rgb8(19, 23, 34)
}
