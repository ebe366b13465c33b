use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Pixel insets reserved around the plot area for axes and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insets {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Insets {
    #[must_use]
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl Default for Insets {
    /// Room for a right-hand price axis and a bottom time axis.
    fn default() -> Self {
        Self::new(10, 60, 30, 0)
    }
}

/// Surface geometry plus the visible time window, in epoch milliseconds.
///
/// The owning UI layer mutates this between frames; renderers only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub insets: Insets,
    start_time: i64,
    end_time: i64,
    #[serde(skip)]
    pan_remainder_ms: PanRemainder,
}

/// Sub-millisecond pan accumulator; excluded from equality.
#[derive(Debug, Clone, Copy, Default)]
struct PanRemainder(f64);

impl PartialEq for PanRemainder {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for PanRemainder {}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            insets: Insets::default(),
            start_time: 0,
            end_time: 1,
            pan_remainder_ms: PanRemainder::default(),
        }
    }

    #[must_use]
    pub fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    pub fn with_time_window(mut self, start_time: i64, end_time: i64) -> ChartResult<Self> {
        self.set_time_window(start_time, end_time)?;
        Ok(self)
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn validate(self) -> ChartResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ChartError::InvalidViewport {
                width: self.width,
                height: self.height,
            })
        }
    }

    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    #[must_use]
    pub fn visible_duration(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// Plot-area width between the left and right insets, never below 1 px.
    #[must_use]
    pub fn chart_width(&self) -> u32 {
        self.width
            .saturating_sub(self.insets.left)
            .saturating_sub(self.insets.right)
            .max(1)
    }

    /// Plot-area height between the top and bottom insets, never below 1 px.
    #[must_use]
    pub fn chart_height(&self) -> u32 {
        self.height
            .saturating_sub(self.insets.top)
            .saturating_sub(self.insets.bottom)
            .max(1)
    }

    /// Horizontal pixels per millisecond of the visible window; zero when the
    /// window is empty.
    #[must_use]
    pub fn pixels_per_ms(&self) -> f64 {
        let duration = self.visible_duration();
        if duration > 0 {
            f64::from(self.chart_width()) / duration as f64
        } else {
            0.0
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> ChartResult<()> {
        if width == 0 || height == 0 {
            return Err(ChartError::InvalidViewport { width, height });
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn set_time_window(&mut self, start_time: i64, end_time: i64) -> ChartResult<()> {
        if end_time < start_time {
            return Err(ChartError::InvalidData(format!(
                "time window end ({end_time}) must be >= start ({start_time})"
            )));
        }
        self.start_time = start_time;
        self.end_time = end_time;
        self.pan_remainder_ms = PanRemainder::default();
        Ok(())
    }

    /// Shifts the time window by a horizontal drag distance.
    ///
    /// Positive `delta_px` drags content to the right, revealing earlier
    /// timestamps. Fractions of a millisecond are carried to the next call so
    /// slow drags on dense windows still move.
    pub fn pan_by_pixels(&mut self, delta_px: f64) {
        if !delta_px.is_finite() {
            return;
        }
        let ms_per_px = self.visible_duration() as f64 / f64::from(self.chart_width());
        self.pan_remainder_ms.0 += delta_px * ms_per_px;
        let whole = self.pan_remainder_ms.0.trunc();
        if whole != 0.0 {
            let shift = whole as i64;
            self.start_time -= shift;
            self.end_time -= shift;
            self.pan_remainder_ms.0 -= whole;
        }
    }

    /// Zooms the time window around a screen X anchor.
    ///
    /// `factor > 1` zooms in. The factor is clamped to `[0.1, 10]` and the
    /// resulting window is never narrower than 1 ms.
    pub fn zoom_time(&mut self, factor: f64, anchor_x: f64) {
        if !factor.is_finite() || factor <= 0.0 || !anchor_x.is_finite() {
            return;
        }
        let factor = factor.clamp(0.1, 10.0);
        let anchor_time = self.screen_x_to_time(anchor_x);
        let left = (anchor_time - self.start_time) as f64;
        let right = (self.end_time - anchor_time) as f64;
        self.start_time = anchor_time - (left / factor) as i64;
        self.end_time = anchor_time + (right / factor) as i64;
        if self.end_time - self.start_time < 1 {
            self.end_time = self.start_time + 1;
        }
    }

    fn screen_x_to_time(&self, x: f64) -> i64 {
        let normalized = (x - f64::from(self.insets.left)) / f64::from(self.chart_width());
        self.start_time + (normalized * self.visible_duration() as f64) as i64
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
