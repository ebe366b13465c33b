use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ChartError, ChartResult};

pub fn decimal_to_f32(value: Decimal, field_name: &str) -> ChartResult<f32> {
    value
        .to_f32()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            ChartError::InvalidData(format!("{field_name} cannot be represented as f32"))
        })
}

#[must_use]
pub fn datetime_to_epoch_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub fn epoch_millis_to_datetime(millis: i64) -> ChartResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ChartError::InvalidData(format!("timestamp {millis} is out of range")))
}

/// Grows a column by half its capacity when full, so long-running appends
/// reallocate less eagerly than `Vec`'s doubling.
pub(crate) fn push_with_growth<T>(column: &mut Vec<T>, value: T) {
    if column.len() == column.capacity() {
        column.reserve_exact((column.capacity() / 2).max(16));
    }
    column.push(value);
}
