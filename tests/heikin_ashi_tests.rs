use approx::assert_relative_eq;
use chart_gpu::core::{OhlcBar, OhlcSeries, TimeSeries, heikin_ashi, update_heikin_ashi};

fn bar(time: i64, open: f32, high: f32, low: f32, close: f32) -> OhlcBar {
    OhlcBar::new(time, open, high, low, close, 1.0).expect("valid bar")
}

fn source() -> OhlcSeries {
    OhlcSeries::from_bars(
        "src",
        &[
            bar(1, 10.0, 14.0, 9.0, 13.0),
            bar(2, 13.0, 15.0, 12.0, 12.5),
            bar(3, 12.5, 13.0, 10.0, 11.0),
        ],
    )
    .expect("series")
}

#[test]
fn transform_matches_definition() {
    let ha = heikin_ashi(&source()).expect("transform");
    assert_eq!(ha.len(), 3);
    assert_eq!(ha.id(), "src_ha");

    let first = ha.get(0).expect("bar");
    assert_relative_eq!(first.close, 11.5);
    assert_relative_eq!(first.open, 11.5);
    assert_relative_eq!(first.high, 14.0);
    assert_relative_eq!(first.low, 9.0);

    let second = ha.get(1).expect("bar");
    assert_relative_eq!(second.open, 11.5);
    assert_relative_eq!(second.close, 13.125);
    assert_relative_eq!(second.high, 15.0);
    assert_relative_eq!(second.low, 11.5);

    let third = ha.get(2).expect("bar");
    assert_relative_eq!(third.open, (11.5 + 13.125) / 2.0);
    assert_relative_eq!(third.close, 11.625);
    assert_eq!(ha.timestamps(), source().timestamps());
}

#[test]
fn incremental_append_matches_full_transform() {
    let mut src = source();
    let mut ha = heikin_ashi(&src).expect("transform");

    src.append(bar(4, 11.0, 12.0, 10.5, 11.8)).expect("append");
    src.append(bar(5, 11.8, 12.2, 11.0, 12.0)).expect("append");
    update_heikin_ashi(&mut ha, &src, 3).expect("update");

    let full = heikin_ashi(&src).expect("transform");
    assert_eq!(ha.len(), full.len());
    for i in 0..full.len() {
        assert_eq!(ha.get(i).expect("bar"), full.get(i).expect("bar"));
    }
}

#[test]
fn live_bar_update_recomputes_last_bar() {
    let mut src = source();
    let mut ha = heikin_ashi(&src).expect("transform");

    src.update_last(bar(3, 12.5, 16.0, 10.0, 15.5)).expect("update");
    update_heikin_ashi(&mut ha, &src, 2).expect("update");

    let full = heikin_ashi(&src).expect("transform");
    assert_eq!(ha.len(), 3);
    assert_eq!(ha.last(), full.last());
}

#[test]
fn updating_single_bar_series_uses_midpoint_open() {
    let mut src = OhlcSeries::from_bars("one", &[bar(1, 10.0, 14.0, 9.0, 13.0)]).expect("series");
    let mut ha = heikin_ashi(&src).expect("transform");

    src.update_last(bar(1, 10.0, 15.0, 9.0, 14.0)).expect("update");
    update_heikin_ashi(&mut ha, &src, 0).expect("update");

    let only = ha.get(0).expect("bar");
    assert_relative_eq!(only.open, 12.0);
    assert_relative_eq!(only.close, 12.0);
}

#[test]
fn update_past_end_is_a_no_op() {
    let src = source();
    let mut ha = heikin_ashi(&src).expect("transform");
    update_heikin_ashi(&mut ha, &src, 10).expect("no-op");
    assert_eq!(ha.len(), 3);
}
