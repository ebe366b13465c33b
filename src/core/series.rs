use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::primitives::{datetime_to_epoch_millis, decimal_to_f32, push_with_growth};
use crate::core::windowing::{self, VisibleRange};
use crate::error::{ChartError, ChartResult};

/// Read access shared by every time-indexed data source.
///
/// Timestamps are epoch milliseconds in strictly ascending order, so all
/// lookups are binary searches.
pub trait TimeSeries {
    fn id(&self) -> &str;

    fn timestamps(&self) -> &[i64];

    fn len(&self) -> usize {
        self.timestamps().len()
    }

    fn is_empty(&self) -> bool {
        self.timestamps().is_empty()
    }

    fn timestamp(&self, index: usize) -> ChartResult<i64> {
        let timestamps = self.timestamps();
        timestamps
            .get(index)
            .copied()
            .ok_or(ChartError::IndexOutOfBounds {
                index,
                len: timestamps.len(),
            })
    }

    fn index_at_or_before(&self, t: i64) -> Option<usize> {
        windowing::index_at_or_before(self.timestamps(), t)
    }

    fn index_at_or_after(&self, t: i64) -> Option<usize> {
        windowing::index_at_or_after(self.timestamps(), t)
    }

    fn visible_range(&self, start: i64, end: i64) -> Option<VisibleRange> {
        windowing::visible_range(self.timestamps(), start, end)
    }
}

/// Mutation notification delivered synchronously to series listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesEvent {
    Appended { index: usize, count: usize },
    Updated { index: usize },
    Removed { index: usize },
    Cleared,
}

/// Observer hook for series mutations, invoked synchronously on the mutating
/// thread. Closures of the form `|series_id: &str, event: SeriesEvent|`
/// implement it directly.
pub trait SeriesListener: Send {
    fn on_series_event(&mut self, series_id: &str, event: SeriesEvent);
}

impl<F> SeriesListener for F
where
    F: FnMut(&str, SeriesEvent) + Send,
{
    fn on_series_event(&mut self, series_id: &str, event: SeriesEvent) {
        self(series_id, event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn SeriesListener>)>,
}

impl Listeners {
    fn add(&mut self, listener: Box<dyn SeriesListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn notify(&mut self, series_id: &str, event: SeriesEvent) {
        for (_, listener) in &mut self.entries {
            listener.on_series_event(series_id, event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Ascending timestamp column plus the listener list every series carries.
#[derive(Debug, Default)]
struct TimeColumn {
    timestamps: Vec<i64>,
    listeners: Listeners,
}

impl TimeColumn {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            listeners: Listeners::default(),
        }
    }

    fn check_append(&self, t: i64) -> ChartResult<()> {
        match self.timestamps.last() {
            Some(&last) if t <= last => Err(ChartError::NonAscendingTimestamp { last, given: t }),
            _ => Ok(()),
        }
    }

    fn check_index(&self, index: usize) -> ChartResult<()> {
        if index < self.timestamps.len() {
            Ok(())
        } else {
            Err(ChartError::IndexOutOfBounds {
                index,
                len: self.timestamps.len(),
            })
        }
    }

    fn last_index_for(&self, t: i64) -> ChartResult<usize> {
        match self.timestamps.last() {
            Some(&last) if last == t => Ok(self.timestamps.len() - 1),
            Some(&last) => Err(ChartError::InvalidData(format!(
                "update timestamp {t} does not match last timestamp {last}"
            ))),
            None => Err(ChartError::IndexOutOfBounds { index: 0, len: 0 }),
        }
    }
}

fn check_ascending(timestamps: &[i64]) -> ChartResult<()> {
    for pair in timestamps.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ChartError::NonAscendingTimestamp {
                last: pair[0],
                given: pair[1],
            });
        }
    }
    Ok(())
}

fn check_column_len(name: &str, len: usize, expected: usize) -> ChartResult<()> {
    if len == expected {
        Ok(())
    } else {
        Err(ChartError::InvalidData(format!(
            "{name} column has {len} values, expected {expected}"
        )))
    }
}

/// One OHLCV sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub time: i64,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    #[serde(default)]
    pub volume: f32,
}

impl OhlcBar {
    /// Builds a validated bar.
    ///
    /// Invariants:
    /// - all prices are finite and volume is finite and `>= 0`
    /// - `low <= high`
    /// - `open` and `close` are within `[low, high]`
    pub fn new(
        time: i64,
        open: f32,
        high: f32,
        low: f32,
        close: f32,
        volume: f32,
    ) -> ChartResult<Self> {
        if !open.is_finite() || !high.is_finite() || !low.is_finite() || !close.is_finite() {
            return Err(ChartError::InvalidData(
                "ohlc values must be finite".to_owned(),
            ));
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(ChartError::InvalidData(
                "volume must be finite and >= 0".to_owned(),
            ));
        }
        if low > high {
            return Err(ChartError::InvalidData(
                "ohlc low must be <= high".to_owned(),
            ));
        }
        if open < low || open > high || close < low || close > high {
            return Err(ChartError::InvalidData(
                "ohlc open/close must be within low/high range".to_owned(),
            ));
        }

        Ok(Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Converts strongly-typed temporal/decimal input into a validated bar.
    pub fn from_decimal_time(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> ChartResult<Self> {
        Self::new(
            datetime_to_epoch_millis(time),
            decimal_to_f32(open, "open")?,
            decimal_to_f32(high, "high")?,
            decimal_to_f32(low, "low")?,
            decimal_to_f32(close, "close")?,
            decimal_to_f32(volume, "volume")?,
        )
    }

    #[must_use]
    pub fn is_bullish(self) -> bool {
        self.close >= self.open
    }
}

/// Columnar OHLCV storage. Renderers read the raw columns directly.
#[derive(Debug)]
pub struct OhlcSeries {
    id: String,
    time: TimeColumn,
    open: Vec<f32>,
    high: Vec<f32>,
    low: Vec<f32>,
    close: Vec<f32>,
    volume: Vec<f32>,
}

impl OhlcSeries {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, 0)
    }

    #[must_use]
    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            time: TimeColumn::with_capacity(capacity),
            open: Vec::with_capacity(capacity),
            high: Vec::with_capacity(capacity),
            low: Vec::with_capacity(capacity),
            close: Vec::with_capacity(capacity),
            volume: Vec::with_capacity(capacity),
        }
    }

    pub fn from_bars(id: impl Into<String>, bars: &[OhlcBar]) -> ChartResult<Self> {
        let mut series = Self::with_capacity(id, bars.len());
        for bar in bars {
            series.push_bar(*bar)?;
        }
        Ok(series)
    }

    /// Replaces all data with the given columns after validating lengths,
    /// timestamp order and every row under the same rules as
    /// [`OhlcBar::new`]. Nothing changes when any check fails. Listeners see
    /// `Cleared` then one `Appended`.
    pub fn load_from_arrays(
        &mut self,
        timestamps: &[i64],
        open: &[f32],
        high: &[f32],
        low: &[f32],
        close: &[f32],
        volume: &[f32],
    ) -> ChartResult<()> {
        let len = timestamps.len();
        check_column_len("open", open.len(), len)?;
        check_column_len("high", high.len(), len)?;
        check_column_len("low", low.len(), len)?;
        check_column_len("close", close.len(), len)?;
        check_column_len("volume", volume.len(), len)?;
        check_ascending(timestamps)?;
        for (i, &time) in timestamps.iter().enumerate() {
            OhlcBar::new(time, open[i], high[i], low[i], close[i], volume[i]).map_err(|err| {
                match err {
                    ChartError::InvalidData(reason) => {
                        ChartError::InvalidData(format!("row {i}: {reason}"))
                    }
                    other => other,
                }
            })?;
        }

        self.time.timestamps.clear();
        self.time.timestamps.extend_from_slice(timestamps);
        for (column, source) in [
            (&mut self.open, open),
            (&mut self.high, high),
            (&mut self.low, low),
            (&mut self.close, close),
            (&mut self.volume, volume),
        ] {
            column.clear();
            column.extend_from_slice(source);
        }

        trace!(series = %self.id, count = len, "load ohlc columns");
        self.time.listeners.notify(&self.id, SeriesEvent::Cleared);
        if len > 0 {
            self.time
                .listeners
                .notify(&self.id, SeriesEvent::Appended { index: 0, count: len });
        }
        Ok(())
    }

    fn push_bar(&mut self, bar: OhlcBar) -> ChartResult<()> {
        self.time.check_append(bar.time)?;
        push_with_growth(&mut self.time.timestamps, bar.time);
        push_with_growth(&mut self.open, bar.open);
        push_with_growth(&mut self.high, bar.high);
        push_with_growth(&mut self.low, bar.low);
        push_with_growth(&mut self.close, bar.close);
        push_with_growth(&mut self.volume, bar.volume);
        Ok(())
    }

    pub fn append(&mut self, bar: OhlcBar) -> ChartResult<()> {
        self.push_bar(bar)?;
        let index = self.len() - 1;
        trace!(series = %self.id, index, "append ohlc bar");
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Appended { index, count: 1 });
        Ok(())
    }

    /// Replaces the last bar; its timestamp must match.
    pub fn update_last(&mut self, bar: OhlcBar) -> ChartResult<()> {
        let index = self.time.last_index_for(bar.time)?;
        self.open[index] = bar.open;
        self.high[index] = bar.high;
        self.low[index] = bar.low;
        self.close[index] = bar.close;
        self.volume[index] = bar.volume;
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Updated { index });
        Ok(())
    }

    /// Updates the last bar when timestamps match, otherwise appends.
    pub fn upsert(&mut self, bar: OhlcBar) -> ChartResult<()> {
        if self.time.timestamps.last() == Some(&bar.time) {
            self.update_last(bar)
        } else {
            self.append(bar)
        }
    }

    pub fn remove(&mut self, index: usize) -> ChartResult<OhlcBar> {
        let bar = self.get(index)?;
        self.time.timestamps.remove(index);
        self.open.remove(index);
        self.high.remove(index);
        self.low.remove(index);
        self.close.remove(index);
        self.volume.remove(index);
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Removed { index });
        Ok(bar)
    }

    pub fn clear(&mut self) {
        self.time.timestamps.clear();
        self.open.clear();
        self.high.clear();
        self.low.clear();
        self.close.clear();
        self.volume.clear();
        self.time.listeners.notify(&self.id, SeriesEvent::Cleared);
    }

    pub fn get(&self, index: usize) -> ChartResult<OhlcBar> {
        self.time.check_index(index)?;
        Ok(OhlcBar {
            time: self.time.timestamps[index],
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
        })
    }

    #[must_use]
    pub fn last(&self) -> Option<OhlcBar> {
        self.len().checked_sub(1).and_then(|i| self.get(i).ok())
    }

    /// `true` when close >= open. Out-of-range indices are never bullish.
    #[must_use]
    pub fn is_bullish(&self, index: usize) -> bool {
        match (self.close.get(index), self.open.get(index)) {
            (Some(close), Some(open)) => close >= open,
            _ => false,
        }
    }

    #[must_use]
    pub fn open(&self) -> &[f32] {
        &self.open
    }

    #[must_use]
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    #[must_use]
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    #[must_use]
    pub fn close(&self) -> &[f32] {
        &self.close
    }

    #[must_use]
    pub fn volume(&self) -> &[f32] {
        &self.volume
    }

    /// Highest high over an inclusive index range, `None` when the range
    /// falls outside the data.
    #[must_use]
    pub fn highest_high(&self, range: VisibleRange) -> Option<f32> {
        self.high
            .get(range.indices())
            .and_then(|slice| slice.iter().copied().reduce(f32::max))
    }

    /// Lowest low over an inclusive index range.
    #[must_use]
    pub fn lowest_low(&self, range: VisibleRange) -> Option<f32> {
        self.low
            .get(range.indices())
            .and_then(|slice| slice.iter().copied().reduce(f32::min))
    }

    pub fn add_listener(&mut self, listener: impl SeriesListener + 'static) -> ListenerId {
        self.time.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.time.listeners.remove(id)
    }
}

impl TimeSeries for OhlcSeries {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps(&self) -> &[i64] {
        &self.time.timestamps
    }
}

/// Single-valued series (moving averages, closes). `NaN` marks a gap.
#[derive(Debug)]
pub struct ScalarSeries {
    id: String,
    time: TimeColumn,
    values: Vec<f32>,
}

impl ScalarSeries {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, 0)
    }

    #[must_use]
    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            time: TimeColumn::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn from_arrays(
        id: impl Into<String>,
        timestamps: &[i64],
        values: &[f32],
    ) -> ChartResult<Self> {
        let mut series = Self::with_capacity(id, timestamps.len());
        series.load_from_arrays(timestamps, values)?;
        Ok(series)
    }

    pub fn load_from_arrays(&mut self, timestamps: &[i64], values: &[f32]) -> ChartResult<()> {
        check_column_len("value", values.len(), timestamps.len())?;
        check_ascending(timestamps)?;
        self.time.timestamps.clear();
        self.time.timestamps.extend_from_slice(timestamps);
        self.values.clear();
        self.values.extend_from_slice(values);

        self.time.listeners.notify(&self.id, SeriesEvent::Cleared);
        if !timestamps.is_empty() {
            self.time.listeners.notify(
                &self.id,
                SeriesEvent::Appended {
                    index: 0,
                    count: timestamps.len(),
                },
            );
        }
        Ok(())
    }

    pub fn append(&mut self, time: i64, value: f32) -> ChartResult<()> {
        self.time.check_append(time)?;
        push_with_growth(&mut self.time.timestamps, time);
        push_with_growth(&mut self.values, value);
        let index = self.values.len() - 1;
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Appended { index, count: 1 });
        Ok(())
    }

    pub fn update_last(&mut self, time: i64, value: f32) -> ChartResult<()> {
        let index = self.time.last_index_for(time)?;
        self.values[index] = value;
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Updated { index });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ChartResult<(i64, f32)> {
        self.time.check_index(index)?;
        let time = self.time.timestamps.remove(index);
        let value = self.values.remove(index);
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Removed { index });
        Ok((time, value))
    }

    pub fn clear(&mut self) {
        self.time.timestamps.clear();
        self.values.clear();
        self.time.listeners.notify(&self.id, SeriesEvent::Cleared);
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn add_listener(&mut self, listener: impl SeriesListener + 'static) -> ListenerId {
        self.time.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.time.listeners.remove(id)
    }
}

impl TimeSeries for ScalarSeries {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps(&self) -> &[i64] {
        &self.time.timestamps
    }
}

/// Upper/middle/lower envelope (Bollinger, Keltner). `NaN` marks a gap.
#[derive(Debug)]
pub struct BandSeries {
    id: String,
    time: TimeColumn,
    upper: Vec<f32>,
    middle: Vec<f32>,
    lower: Vec<f32>,
}

impl BandSeries {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, 0)
    }

    #[must_use]
    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            time: TimeColumn::with_capacity(capacity),
            upper: Vec::with_capacity(capacity),
            middle: Vec::with_capacity(capacity),
            lower: Vec::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, time: i64, upper: f32, middle: f32, lower: f32) -> ChartResult<()> {
        self.time.check_append(time)?;
        push_with_growth(&mut self.time.timestamps, time);
        push_with_growth(&mut self.upper, upper);
        push_with_growth(&mut self.middle, middle);
        push_with_growth(&mut self.lower, lower);
        let index = self.upper.len() - 1;
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Appended { index, count: 1 });
        Ok(())
    }

    pub fn update_last(&mut self, time: i64, upper: f32, middle: f32, lower: f32) -> ChartResult<()> {
        let index = self.time.last_index_for(time)?;
        self.upper[index] = upper;
        self.middle[index] = middle;
        self.lower[index] = lower;
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Updated { index });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ChartResult<()> {
        self.time.check_index(index)?;
        self.time.timestamps.remove(index);
        self.upper.remove(index);
        self.middle.remove(index);
        self.lower.remove(index);
        self.time
            .listeners
            .notify(&self.id, SeriesEvent::Removed { index });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.time.timestamps.clear();
        self.upper.clear();
        self.middle.clear();
        self.lower.clear();
        self.time.listeners.notify(&self.id, SeriesEvent::Cleared);
    }

    #[must_use]
    pub fn upper(&self) -> &[f32] {
        &self.upper
    }

    #[must_use]
    pub fn middle(&self) -> &[f32] {
        &self.middle
    }

    #[must_use]
    pub fn lower(&self) -> &[f32] {
        &self.lower
    }

    pub fn add_listener(&mut self, listener: impl SeriesListener + 'static) -> ListenerId {
        self.time.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.time.listeners.remove(id)
    }
}

impl TimeSeries for BandSeries {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps(&self) -> &[i64] {
        &self.time.timestamps
    }
}
