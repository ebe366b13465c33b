use chart_gpu::core::windowing::{index_at_or_after, index_at_or_before, visible_range};
use chart_gpu::core::{AxisSet, CoordinateSystem, Viewport};
use proptest::prelude::*;

fn ascending_timestamps() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1_i64..10_000, 1..200).prop_map(|steps| {
        let mut t = -500_000;
        steps
            .into_iter()
            .map(|step| {
                t += step;
                t
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn index_search_matches_linear_scan(
        timestamps in ascending_timestamps(),
        query in -600_000_i64..2_600_000
    ) {
        let before = timestamps.iter().rposition(|&ts| ts <= query);
        let after = timestamps.iter().position(|&ts| ts >= query);

        prop_assert_eq!(index_at_or_before(&timestamps, query), before);
        prop_assert_eq!(index_at_or_after(&timestamps, query), after);
    }

    #[test]
    fn visible_range_covers_exactly_the_window(
        timestamps in ascending_timestamps(),
        start in -600_000_i64..2_600_000,
        span in 0_i64..500_000
    ) {
        let end = start + span;
        let expected: Vec<usize> = timestamps
            .iter()
            .enumerate()
            .filter(|(_, ts)| (start..=end).contains(*ts))
            .map(|(i, _)| i)
            .collect();

        match visible_range(&timestamps, start, end) {
            Some(range) => {
                prop_assert_eq!(range.first(), expected[0]);
                prop_assert_eq!(range.last(), expected[expected.len() - 1]);
                prop_assert_eq!(range.count(), expected.len());
            }
            None => prop_assert!(expected.is_empty()),
        }
    }

    #[test]
    fn y_round_trip_property(
        min in -1_000_000.0f64..1_000_000.0,
        span in 0.001f64..1_000_000.0,
        factor in 0.0f64..1.0
    ) {
        let viewport = Viewport::new(2048, 1024);
        let axes = AxisSet::new(min, min + span).expect("valid axis");
        let coords = CoordinateSystem::new(&viewport, &axes);
        let value = min + factor * span;

        let y = coords.y_value_to_screen_y(value, "default").expect("to screen");
        let recovered = coords.screen_y_to_y_value(y, "default").expect("from screen");

        prop_assert!((recovered - value).abs() <= 1e-6 * span.max(1.0));
    }

    #[test]
    fn larger_values_are_never_lower_on_screen(
        a in -1_000.0f64..1_000.0,
        b in -1_000.0f64..1_000.0
    ) {
        let viewport = Viewport::new(800, 600);
        let axes = AxisSet::new(-1_000.0, 1_000.0).expect("valid axis");
        let axis = CoordinateSystem::new(&viewport, &axes).default_axis().expect("axis");
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(axis.value_to_screen_y(high) <= axis.value_to_screen_y(low));
    }
}
