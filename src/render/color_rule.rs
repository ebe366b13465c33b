use serde::{Deserialize, Serialize};

use crate::core::OhlcSeries;
use crate::render::color::Color;

/// Decides whether a bar is drawn in the bullish or bearish color.
///
/// Rules are evaluated per bar while vertices are built and keep no state.
pub trait ColorRule: Send + Sync {
    fn is_bullish(&self, series: &OhlcSeries, index: usize) -> bool;

    fn color(&self, series: &OhlcSeries, index: usize, bullish: Color, bearish: Color) -> Color {
        if self.is_bullish(series, index) {
            bullish
        } else {
            bearish
        }
    }
}

/// Built-in rules. The previous-bar rules fall back to
/// [`CandleColorRule::CloseVsOpen`] on the first bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleColorRule {
    #[default]
    CloseVsOpen,
    CloseVsPrevClose,
    CloseVsPrevHigh,
    CloseVsPrevLow,
}

impl ColorRule for CandleColorRule {
    fn is_bullish(&self, series: &OhlcSeries, index: usize) -> bool {
        let close = series.close()[index];
        let reference = match (self, index.checked_sub(1)) {
            (Self::CloseVsOpen, _) | (_, None) => series.open()[index],
            (Self::CloseVsPrevClose, Some(prev)) => series.close()[prev],
            (Self::CloseVsPrevHigh, Some(prev)) => series.high()[prev],
            (Self::CloseVsPrevLow, Some(prev)) => series.low()[prev],
        };
        close >= reference
    }
}
