use std::str::FromStr;
use std::sync::Arc;

use chart_gpu::ChartError;
use chart_gpu::core::primitives::{datetime_to_epoch_millis, epoch_millis_to_datetime};
use chart_gpu::core::{
    BandSeries, OhlcBar, OhlcSeries, ScalarSeries, SeriesEvent, TimeSeries, VisibleRange,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

fn bar(time: i64, open: f32, high: f32, low: f32, close: f32) -> OhlcBar {
    OhlcBar::new(time, open, high, low, close, 0.0).expect("valid bar")
}

#[test]
fn ohlc_bar_rejects_inconsistent_prices() {
    assert!(OhlcBar::new(1, 10.0, 9.0, 8.0, 9.5, 0.0).is_err());
    assert!(OhlcBar::new(1, 10.0, 12.0, 13.0, 11.0, 0.0).is_err());
    assert!(OhlcBar::new(1, f32::NAN, 12.0, 8.0, 11.0, 0.0).is_err());
    assert!(OhlcBar::new(1, 10.0, 12.0, 8.0, 11.0, -1.0).is_err());
}

#[test]
fn append_requires_strictly_ascending_timestamps() {
    let mut series = OhlcSeries::new("s");
    series.append(bar(10, 1.0, 2.0, 0.5, 1.5)).expect("first");

    let err = series
        .append(bar(10, 1.0, 2.0, 0.5, 1.5))
        .expect_err("duplicate timestamp");
    assert!(matches!(
        err,
        ChartError::NonAscendingTimestamp { last: 10, given: 10 }
    ));
    assert_eq!(series.len(), 1);
}

#[test]
fn update_last_requires_matching_timestamp() {
    let mut series = OhlcSeries::new("s");
    series.append(bar(10, 1.0, 2.0, 0.5, 1.5)).expect("append");

    series
        .update_last(bar(10, 1.0, 3.0, 0.5, 2.5))
        .expect("same timestamp");
    assert_eq!(series.close(), &[2.5]);
    assert!(series.update_last(bar(11, 1.0, 3.0, 0.5, 2.5)).is_err());

    series.upsert(bar(11, 2.5, 3.0, 2.0, 2.0)).expect("appends");
    assert_eq!(series.len(), 2);
    assert!(!series.is_bullish(1));
}

#[test]
fn load_from_arrays_validates_lengths_and_order() {
    let mut series = OhlcSeries::new("s");
    let err = series
        .load_from_arrays(&[1, 2], &[1.0, 1.0], &[2.0], &[0.5, 0.5], &[1.5, 1.5], &[0.0, 0.0])
        .expect_err("short high column");
    assert!(matches!(err, ChartError::InvalidData(_)));

    let err = series
        .load_from_arrays(&[2, 1], &[1.0; 2], &[2.0; 2], &[0.5; 2], &[1.5; 2], &[0.0; 2])
        .expect_err("descending");
    assert!(matches!(err, ChartError::NonAscendingTimestamp { .. }));

    series
        .load_from_arrays(
            &[1, 2, 3],
            &[1.0, 2.0, 3.0],
            &[2.0, 4.0, 3.5],
            &[0.5, 1.0, 2.5],
            &[1.5, 3.0, 2.6],
            &[10.0, 20.0, 30.0],
        )
        .expect("load");
    assert_eq!(series.len(), 3);
    let range = VisibleRange::new(0, 2).expect("range");
    assert_eq!(series.highest_high(range), Some(4.0));
    assert_eq!(series.lowest_low(range), Some(0.5));
    assert_eq!(series.highest_high(VisibleRange::new(2, 9).expect("range")), None);
}

#[test]
fn load_from_arrays_rejects_invalid_rows_without_changes() {
    let mut series = OhlcSeries::from_bars("s", &[bar(1, 1.0, 2.0, 0.5, 1.5)]).expect("series");

    let err = series
        .load_from_arrays(
            &[1, 2],
            &[1.0, f32::NAN],
            &[2.0, 2.0],
            &[0.5, 0.5],
            &[1.5, 1.5],
            &[0.0, 0.0],
        )
        .expect_err("nan open");
    assert!(matches!(&err, ChartError::InvalidData(reason) if reason.starts_with("row 1:")));

    let err = series
        .load_from_arrays(&[1, 2], &[1.0; 2], &[2.0, 0.5], &[0.5, 1.0], &[1.5, 0.8], &[0.0; 2])
        .expect_err("low above high");
    assert!(matches!(err, ChartError::InvalidData(_)));

    let err = series
        .load_from_arrays(&[1], &[3.0], &[2.0], &[0.5], &[1.5], &[0.0])
        .expect_err("open above high");
    assert!(matches!(err, ChartError::InvalidData(_)));

    let err = series
        .load_from_arrays(&[1], &[1.0], &[2.0], &[0.5], &[1.5], &[-1.0])
        .expect_err("negative volume");
    assert!(matches!(err, ChartError::InvalidData(_)));

    assert_eq!(series.len(), 1);
    assert_eq!(series.close(), [1.5_f32].as_slice());
}

#[test]
fn remove_and_clear() {
    let mut series = OhlcSeries::from_bars(
        "s",
        &[bar(1, 1.0, 2.0, 0.5, 1.5), bar(2, 1.5, 2.0, 1.0, 1.2)],
    )
    .expect("series");

    let removed = series.remove(0).expect("remove");
    assert_eq!(removed.time, 1);
    assert_eq!(series.timestamps(), &[2]);
    assert!(series.remove(5).is_err());

    series.clear();
    assert!(series.is_empty());
    assert_eq!(series.last(), None);
}

#[test]
fn listeners_observe_mutations_in_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut series = ScalarSeries::new("sma");
    let id = series.add_listener(move |series_id: &str, event: SeriesEvent| {
        sink.lock().push((series_id.to_owned(), event));
    });

    series.append(1, 1.0).expect("append");
    series.append(2, 2.0).expect("append");
    series.update_last(2, 2.5).expect("update");
    series.remove(0).expect("remove");
    series.clear();

    let seen: Vec<SeriesEvent> = events.lock().iter().map(|(_, e)| *e).collect();
    assert_eq!(
        seen,
        vec![
            SeriesEvent::Appended { index: 0, count: 1 },
            SeriesEvent::Appended { index: 1, count: 1 },
            SeriesEvent::Updated { index: 1 },
            SeriesEvent::Removed { index: 0 },
            SeriesEvent::Cleared,
        ]
    );
    assert!(events.lock().iter().all(|(sid, _)| sid == "sma"));

    assert!(series.remove_listener(id));
    assert!(!series.remove_listener(id));
    series.append(5, 1.0).expect("append");
    assert_eq!(events.lock().len(), 5);
}

#[test]
fn bulk_load_notifies_cleared_then_appended() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut series = ScalarSeries::new("close");
    series.add_listener(move |_: &str, event: SeriesEvent| sink.lock().push(event));

    series
        .load_from_arrays(&[1, 2, 3], &[1.0, f32::NAN, 3.0])
        .expect("load");
    assert_eq!(
        *events.lock(),
        vec![
            SeriesEvent::Cleared,
            SeriesEvent::Appended { index: 0, count: 3 },
        ]
    );
    assert!(series.values()[1].is_nan());
}

#[test]
fn time_series_lookups() {
    let series = ScalarSeries::from_arrays("s", &[10, 20, 30, 40], &[1.0; 4]).expect("series");

    assert_eq!(series.index_at_or_before(25), Some(1));
    assert_eq!(series.index_at_or_after(25), Some(2));
    assert_eq!(series.index_at_or_before(5), None);
    assert_eq!(series.index_at_or_after(45), None);
    assert_eq!(series.visible_range(15, 35), VisibleRange::new(1, 2));
    assert_eq!(series.visible_range(21, 29), None);
    assert_eq!(series.timestamp(3).expect("in range"), 40);
    assert!(series.timestamp(4).is_err());
}

#[test]
fn band_series_keeps_columns_aligned() {
    let mut band = BandSeries::new("bb");
    band.append(1, 12.0, 10.0, 8.0).expect("append");
    band.append(2, f32::NAN, 10.5, f32::NAN).expect("gap");
    band.update_last(2, 13.0, 10.5, 8.5).expect("fill gap");

    assert_eq!(band.upper(), &[12.0, 13.0]);
    assert_eq!(band.middle(), &[10.0, 10.5]);
    assert_eq!(band.lower(), &[8.0, 8.5]);

    band.remove(0).expect("remove");
    assert_eq!(band.len(), 1);
    assert_eq!(band.timestamps(), &[2]);
}

#[test]
fn typed_inputs_convert_to_columns() {
    let time = Utc
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .expect("valid date");
    let bar = OhlcBar::from_decimal_time(
        time,
        Decimal::from_str("100.25").expect("decimal"),
        Decimal::from_str("101.5").expect("decimal"),
        Decimal::from_str("99.75").expect("decimal"),
        Decimal::from_str("101").expect("decimal"),
        Decimal::from_str("12.5").expect("decimal"),
    )
    .expect("bar");

    assert_eq!(bar.time, datetime_to_epoch_millis(time));
    assert_eq!(bar.open, 100.25);
    assert_eq!(bar.volume, 12.5);
    assert_eq!(
        epoch_millis_to_datetime(bar.time).expect("round trip"),
        time
    );
}
