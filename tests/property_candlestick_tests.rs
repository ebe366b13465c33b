use chart_gpu::core::{
    AxisSet, CoordinateSystem, Insets, OhlcBar, OhlcSeries, TimeSeries, Viewport, VisibleRange,
    heikin_ashi,
};
use chart_gpu::render::{BODY_VERTICES_PER_BAR, CandlestickRenderer, WICK_VERTICES_PER_BAR};
use proptest::prelude::*;

const FLOATS_PER_VERTEX: usize = 6;
const BAR_MS: i64 = 1_000;

fn bars() -> impl Strategy<Value = Vec<OhlcBar>> {
    prop::collection::vec((1.0_f32..500.0, 0.0_f32..1.0, 0.0_f32..1.0, 0.0_f32..50.0), 1..120)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (low, open_at, close_at, range))| {
                    let high = low + range;
                    OhlcBar::new(
                        i as i64 * BAR_MS,
                        low + range * open_at,
                        high,
                        low,
                        low + range * close_at,
                        1.0,
                    )
                    .expect("generated bar is consistent")
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn candle_geometry_stays_within_bar_extremes(bars in bars()) {
        let series = OhlcSeries::from_bars("p", &bars).expect("series");
        let viewport = Viewport::new(1200, 600)
            .with_insets(Insets::zero())
            .with_time_window(-BAR_MS, bars.len() as i64 * BAR_MS)
            .expect("window");
        let axes = AxisSet::new(0.0, 600.0).expect("axes");
        let coords = CoordinateSystem::new(&viewport, &axes);
        let axis = coords.default_axis().expect("axis");
        let bar_width = coords.bar_width(BAR_MS);

        let mut renderer = CandlestickRenderer::new("main");
        renderer
            .build_vertices(
                &coords,
                VisibleRange::new(0, series.len() - 1).expect("range"),
                bar_width,
                &series,
            )
            .expect("build");

        let body = renderer.body_vertices();
        let wick = renderer.wick_vertices();
        prop_assert_eq!(body.len(), series.len() * BODY_VERTICES_PER_BAR * FLOATS_PER_VERTEX);
        prop_assert_eq!(wick.len(), series.len() * WICK_VERTICES_PER_BAR * FLOATS_PER_VERTEX);

        for (i, bar) in bars.iter().enumerate() {
            let top = axis.value_to_screen_y(f64::from(bar.high)) as f32 - 1e-2;
            let bottom = axis.value_to_screen_y(f64::from(bar.low)) as f32 + 1e-2;
            let center = coords.x_value_to_screen_x(bar.time) as f32;
            let half_slot = (bar_width / 2.0) as f32 + 1e-2;

            let body_floats = BODY_VERTICES_PER_BAR * FLOATS_PER_VERTEX;
            let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
            for v in body[i * body_floats..(i + 1) * body_floats].chunks_exact(FLOATS_PER_VERTEX) {
                // Doji bodies keep a minimum visible height around the price.
                prop_assert!(v[1] >= top - 0.5 && v[1] <= bottom + 0.5);
                prop_assert!((v[0] - center).abs() <= half_slot);
                min_y = min_y.min(v[1]);
                max_y = max_y.max(v[1]);
            }
            prop_assert!(max_y - min_y >= 1.0 - 1e-4, "bar {} body is {} px tall", i, max_y - min_y);

            let wick_floats = WICK_VERTICES_PER_BAR * FLOATS_PER_VERTEX;
            for v in wick[i * wick_floats..(i + 1) * wick_floats].chunks_exact(FLOATS_PER_VERTEX) {
                prop_assert!(v[1] >= top && v[1] <= bottom);
            }
        }
    }

    #[test]
    fn heikin_ashi_bars_contain_their_open_and_close(bars in bars()) {
        let series = OhlcSeries::from_bars("p", &bars).expect("series");
        let ha = heikin_ashi(&series).expect("transform");
        prop_assert_eq!(ha.len(), series.len());

        for i in 0..ha.len() {
            let bar = ha.get(i).expect("bar");
            prop_assert!(bar.high >= bar.open.max(bar.close));
            prop_assert!(bar.low <= bar.open.min(bar.close));
            prop_assert!(bar.high >= series.high()[i]);
            prop_assert!(bar.low <= series.low()[i]);
        }
    }
}
