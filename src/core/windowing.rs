use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Inclusive `[first, last]` index range of the data inside a time window.
///
/// Always holds `first <= last`; deserialization rejects inverted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct VisibleRange {
    first: usize,
    last: usize,
}

#[derive(Deserialize)]
struct RawRange {
    first: usize,
    last: usize,
}

impl TryFrom<RawRange> for VisibleRange {
    type Error = ChartError;

    fn try_from(raw: RawRange) -> ChartResult<Self> {
        Self::new(raw.first, raw.last).ok_or_else(|| {
            ChartError::InvalidData(format!(
                "visible range first {} exceeds last {}",
                raw.first, raw.last
            ))
        })
    }
}

impl VisibleRange {
    /// Returns `None` when `last < first`.
    #[must_use]
    pub fn new(first: usize, last: usize) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    #[must_use]
    pub fn first(self) -> usize {
        self.first
    }

    #[must_use]
    pub fn last(self) -> usize {
        self.last
    }

    /// Fails with [`ChartError::IndexOutOfBounds`] unless every index lies in
    /// a series of `len` points.
    pub fn check_within(self, len: usize) -> ChartResult<()> {
        if self.last >= len {
            return Err(ChartError::IndexOutOfBounds {
                index: self.last,
                len,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn count(self) -> usize {
        self.last - self.first + 1
    }

    #[must_use]
    pub fn contains(self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn indices(self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }

    /// Widens the range by `pad` on both sides, clamped to a series of `len`
    /// points. Line-like renderers use this so the segments entering and
    /// leaving the plot are not cut at the window edge.
    #[must_use]
    pub fn padded(self, pad: usize, len: usize) -> Self {
        let last_valid = len.saturating_sub(1);
        Self {
            first: self.first.saturating_sub(pad),
            last: self.last.saturating_add(pad).min(last_valid.max(self.last)),
        }
    }
}

/// Index of the last timestamp `<= t`, or `None` when `t` precedes all data.
#[must_use]
pub fn index_at_or_before(timestamps: &[i64], t: i64) -> Option<usize> {
    let (&first, &last) = (timestamps.first()?, timestamps.last()?);
    if t < first {
        return None;
    }
    if t >= last {
        return Some(timestamps.len() - 1);
    }
    Some(timestamps.partition_point(|&ts| ts <= t) - 1)
}

/// Index of the first timestamp `>= t`, or `None` when `t` follows all data.
#[must_use]
pub fn index_at_or_after(timestamps: &[i64], t: i64) -> Option<usize> {
    let (&first, &last) = (timestamps.first()?, timestamps.last()?);
    if t > last {
        return None;
    }
    if t <= first {
        return Some(0);
    }
    Some(timestamps.partition_point(|&ts| ts < t))
}

/// Resolves the indices of all timestamps inside `[start, end]`.
#[must_use]
pub fn visible_range(timestamps: &[i64], start: i64, end: i64) -> Option<VisibleRange> {
    let (start, end) = if start <= end {
        (start, end)
    } else {
        (end, start)
    };
    let first = index_at_or_after(timestamps, start)?;
    let last = index_at_or_before(timestamps, end)?;
    VisibleRange::new(first, last)
}
