use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Identifier of a value axis. `AxisId::DEFAULT` is always registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisId(String);

impl AxisId {
    pub const DEFAULT: &'static str = "default";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn default_axis() -> Self {
        Self(Self::DEFAULT.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AxisId {
    fn default() -> Self {
        Self::default_axis()
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AxisId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for AxisId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Vertical band of the plot area an axis maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisAnchor {
    #[default]
    Full,
    Top,
    Bottom,
}

/// Which side of the plot the axis labels sit on. Layout only; transforms
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisPosition {
    Left,
    #[default]
    Right,
}

/// A named value range mapped onto the plot's vertical pixel span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    id: AxisId,
    min: f64,
    max: f64,
    #[serde(default)]
    anchor: AxisAnchor,
    #[serde(default = "default_height_ratio")]
    height_ratio: f64,
    #[serde(default)]
    position: AxisPosition,
    #[serde(default = "default_grow_by")]
    grow_by: f64,
}

impl Axis {
    #[must_use]
    pub fn new(id: impl Into<AxisId>) -> Self {
        Self {
            id: id.into(),
            min: 0.0,
            max: 1.0,
            anchor: AxisAnchor::Full,
            height_ratio: default_height_ratio(),
            position: AxisPosition::Right,
            grow_by: default_grow_by(),
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> ChartResult<Self> {
        self.set_range(min, max)?;
        Ok(self)
    }

    /// Restricts the axis to a fraction of the plot height at the given
    /// anchor, e.g. a volume overlay in the bottom 20%.
    pub fn with_layout(mut self, anchor: AxisAnchor, height_ratio: f64) -> ChartResult<Self> {
        if !height_ratio.is_finite() || height_ratio <= 0.0 || height_ratio > 1.0 {
            return Err(ChartError::InvalidData(format!(
                "axis height ratio must be in (0, 1], got {height_ratio}"
            )));
        }
        self.anchor = anchor;
        self.height_ratio = height_ratio;
        Ok(self)
    }

    #[must_use]
    pub fn with_position(mut self, position: AxisPosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn id(&self) -> &AxisId {
        &self.id
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    #[must_use]
    pub fn anchor(&self) -> AxisAnchor {
        self.anchor
    }

    #[must_use]
    pub fn height_ratio(&self) -> f64 {
        self.height_ratio
    }

    #[must_use]
    pub fn position(&self) -> AxisPosition {
        self.position
    }

    #[must_use]
    pub fn grow_by(&self) -> f64 {
        self.grow_by
    }

    pub fn set_grow_by(&mut self, grow_by: f64) -> ChartResult<()> {
        if !grow_by.is_finite() || grow_by < 0.0 {
            return Err(ChartError::InvalidData(
                "axis grow-by padding must be finite and >= 0".to_owned(),
            ));
        }
        self.grow_by = grow_by;
        Ok(())
    }

    /// Sets the visible value range. `max == min` is allowed and maps every
    /// value to the middle of the axis band.
    pub fn set_range(&mut self, min: f64, max: f64) -> ChartResult<()> {
        if !min.is_finite() || !max.is_finite() || max < min {
            return Err(ChartError::InvalidAxisRange { min, max });
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// Fits the range to observed data extremes, padded by `grow_by` of the
    /// span on each side. A flat series is padded by `grow_by` of its
    /// magnitude so it still renders centered.
    pub fn fit_to_values(&mut self, low: f64, high: f64) -> ChartResult<()> {
        if !low.is_finite() || !high.is_finite() || high < low {
            return Err(ChartError::InvalidAxisRange {
                min: low,
                max: high,
            });
        }
        let span = high - low;
        let pad = if span > 0.0 {
            span * self.grow_by
        } else {
            low.abs().max(1.0) * self.grow_by
        };
        self.set_range(low - pad, high + pad)
    }
}

fn default_height_ratio() -> f64 {
    1.0
}

fn default_grow_by() -> f64 {
    0.05
}

/// All value axes of a chart, keyed by id in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSet {
    axes: IndexMap<AxisId, Axis>,
}

impl AxisSet {
    /// Creates a set holding only the default axis with range `[min, max]`.
    pub fn new(min: f64, max: f64) -> ChartResult<Self> {
        let default = Axis::new(AxisId::default_axis()).with_range(min, max)?;
        let mut axes = IndexMap::new();
        axes.insert(default.id.clone(), default);
        Ok(Self { axes })
    }

    /// Registers or replaces an axis by id.
    pub fn insert(&mut self, axis: Axis) -> Option<Axis> {
        self.axes.insert(axis.id.clone(), axis)
    }

    /// Removes a non-default axis.
    pub fn remove(&mut self, id: &str) -> ChartResult<Axis> {
        if id == AxisId::DEFAULT {
            return Err(ChartError::InvalidData(
                "the default axis cannot be removed".to_owned(),
            ));
        }
        self.axes
            .shift_remove(id)
            .ok_or_else(|| ChartError::UnknownAxis(id.to_owned()))
    }

    pub fn get(&self, id: &str) -> ChartResult<&Axis> {
        self.axes
            .get(id)
            .ok_or_else(|| ChartError::UnknownAxis(id.to_owned()))
    }

    pub fn get_mut(&mut self, id: &str) -> ChartResult<&mut Axis> {
        self.axes
            .get_mut(id)
            .ok_or_else(|| ChartError::UnknownAxis(id.to_owned()))
    }

    pub fn default_axis(&self) -> ChartResult<&Axis> {
        self.get(AxisId::DEFAULT)
    }

    pub fn set_range(&mut self, id: &str, min: f64, max: f64) -> ChartResult<()> {
        self.get_mut(id)?.set_range(min, max)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.axes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Axis> {
        self.axes.values()
    }
}

impl Default for AxisSet {
    fn default() -> Self {
        let default = Axis::new(AxisId::default_axis());
        let mut axes = IndexMap::new();
        axes.insert(default.id.clone(), default);
        Self { axes }
    }
}
