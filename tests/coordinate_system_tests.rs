use approx::assert_relative_eq;
use chart_gpu::ChartError;
use chart_gpu::core::{Axis, AxisAnchor, AxisSet, CoordinateSystem, Insets, Viewport};

fn plain_viewport() -> Viewport {
    Viewport::new(1000, 500)
        .with_insets(Insets::zero())
        .with_time_window(0, 1000)
        .expect("valid window")
}

#[test]
fn x_maps_time_window_onto_plot_width() {
    let viewport = plain_viewport();
    let axes = AxisSet::new(0.0, 100.0).expect("axes");
    let coords = CoordinateSystem::new(&viewport, &axes);

    assert_relative_eq!(coords.x_value_to_screen_x(0), 0.0);
    assert_relative_eq!(coords.x_value_to_screen_x(250), 250.0);
    assert_relative_eq!(coords.x_value_to_screen_x(1000), 1000.0);
    assert_eq!(coords.screen_x_to_x_value(500.0), 500);
}

#[test]
fn x_honours_left_inset() {
    let viewport = Viewport::new(1060, 500)
        .with_insets(Insets::new(0, 0, 0, 60))
        .with_time_window(1_000, 2_000)
        .expect("valid window");
    let axes = AxisSet::default();
    let coords = CoordinateSystem::new(&viewport, &axes);

    assert_relative_eq!(coords.x_value_to_screen_x(1_000), 60.0);
    assert_relative_eq!(coords.x_value_to_screen_x(1_500), 560.0);
}

#[test]
fn y_grows_downward() {
    let viewport = plain_viewport();
    let axes = AxisSet::new(0.0, 100.0).expect("axes");
    let coords = CoordinateSystem::new(&viewport, &axes);

    let top = coords.y_value_to_screen_y(100.0, "default").expect("top");
    let mid = coords.y_value_to_screen_y(50.0, "default").expect("mid");
    let bottom = coords.y_value_to_screen_y(0.0, "default").expect("bottom");

    assert_relative_eq!(top, 0.0);
    assert_relative_eq!(mid, 250.0);
    assert_relative_eq!(bottom, 500.0);
}

#[test]
fn round_trip_within_tolerance() {
    let viewport = Viewport::new(1280, 720)
        .with_time_window(1_700_000_000_000, 1_700_003_600_000)
        .expect("valid window");
    let axes = AxisSet::new(27_000.0, 31_000.0).expect("axes");
    let coords = CoordinateSystem::new(&viewport, &axes);

    let y = coords.y_value_to_screen_y(29_123.5, "default").expect("y");
    let value = coords.screen_y_to_y_value(y, "default").expect("value");
    assert!((value - 29_123.5).abs() <= 1e-6);

    let t = 1_700_001_234_000;
    let x = coords.x_value_to_screen_x(t);
    assert!((coords.screen_x_to_x_value(x) - t).abs() <= 1);
}

#[test]
fn degenerate_axis_maps_to_band_midpoint() {
    let viewport = plain_viewport();
    let axes = AxisSet::new(42.0, 42.0).expect("flat axis is allowed");
    let coords = CoordinateSystem::new(&viewport, &axes);

    let y = coords.y_value_to_screen_y(42.0, "default").expect("y");
    assert_relative_eq!(y, 250.0);
    let y_other = coords.y_value_to_screen_y(1_000.0, "default").expect("y");
    assert_relative_eq!(y_other, 250.0);
}

#[test]
fn unknown_axis_is_an_error() {
    let viewport = plain_viewport();
    let axes = AxisSet::default();
    let coords = CoordinateSystem::new(&viewport, &axes);

    let err = coords
        .y_value_to_screen_y(1.0, "volume")
        .expect_err("axis was never registered");
    assert!(matches!(err, ChartError::UnknownAxis(id) if id == "volume"));
}

#[test]
fn bottom_anchored_axis_uses_its_band() {
    let viewport = plain_viewport();
    let mut axes = AxisSet::new(0.0, 100.0).expect("axes");
    axes.insert(
        Axis::new("volume")
            .with_range(0.0, 1_000.0)
            .expect("range")
            .with_layout(AxisAnchor::Bottom, 0.2)
            .expect("layout"),
    );
    let coords = CoordinateSystem::new(&viewport, &axes);
    let volume = coords.axis("volume").expect("volume axis");

    assert_relative_eq!(volume.band_top(), 400.0);
    assert_relative_eq!(volume.band_height(), 100.0);
    assert_relative_eq!(volume.value_to_screen_y(0.0), 500.0);
    assert_relative_eq!(volume.value_to_screen_y(1_000.0), 400.0);

    // The default axis still spans the full plot.
    let price = coords.default_axis().expect("default axis");
    assert_relative_eq!(price.value_to_screen_y(100.0), 0.0);
}

#[test]
fn pixel_spans_are_position_independent() {
    let viewport = plain_viewport();
    let axes = AxisSet::new(0.0, 100.0).expect("axes");
    let coords = CoordinateSystem::new(&viewport, &axes);

    assert_relative_eq!(coords.pixel_width(100), 100.0);
    assert_relative_eq!(coords.bar_width(10), 10.0);
    let axis = coords.default_axis().expect("axis");
    assert_relative_eq!(axis.pixel_height(10.0), 50.0);
}

#[test]
fn batch_transforms_match_single_transforms() {
    let viewport = plain_viewport();
    let axes = AxisSet::new(0.0, 100.0).expect("axes");
    let coords = CoordinateSystem::new(&viewport, &axes);

    let timestamps = [0_i64, 100, 400, 900];
    let mut xs = [0.0_f32; 4];
    coords.x_values_to_screen_x(&timestamps, &mut xs);
    assert_eq!(xs, [0.0, 100.0, 400.0, 900.0]);

    let values = [0.0_f32, 25.0, 100.0];
    let mut ys = [0.0_f32; 3];
    coords
        .default_axis()
        .expect("axis")
        .values_to_screen_y(&values, &mut ys);
    assert_eq!(ys, [500.0, 375.0, 0.0]);
}

#[test]
fn plot_area_excludes_insets() {
    let viewport = Viewport::new(800, 600)
        .with_insets(Insets::new(10, 60, 30, 0))
        .with_time_window(0, 10)
        .expect("valid window");
    let axes = AxisSet::default();
    let coords = CoordinateSystem::new(&viewport, &axes);

    assert!(coords.plot_contains(100.0, 100.0));
    assert!(!coords.plot_contains(780.0, 100.0));
    assert!(!coords.plot_contains(100.0, 5.0));
}

#[test]
fn viewport_pan_and_zoom_move_the_window() {
    let mut viewport = plain_viewport();
    viewport.pan_by_pixels(100.0);
    assert_eq!(viewport.start_time(), -100);
    assert_eq!(viewport.end_time(), 900);

    viewport.zoom_time(2.0, 500.0);
    assert_eq!(viewport.visible_duration(), 500);
    assert_eq!(viewport.start_time(), 150);

    let err = viewport
        .set_time_window(10, 5)
        .expect_err("end before start");
    assert!(matches!(err, ChartError::InvalidData(_)));
}

#[test]
fn fit_to_values_pads_the_observed_span() {
    let mut axis = Axis::new("price");
    axis.set_grow_by(0.1).expect("grow-by");

    axis.fit_to_values(100.0, 200.0).expect("fit");
    assert_relative_eq!(axis.min(), 90.0);
    assert_relative_eq!(axis.max(), 210.0);

    axis.fit_to_values(50.0, 50.0).expect("flat fit");
    assert_relative_eq!(axis.min(), 45.0);
    assert_relative_eq!(axis.max(), 55.0);

    assert!(matches!(
        axis.fit_to_values(10.0, f64::NAN),
        Err(ChartError::InvalidAxisRange { .. })
    ));
}

#[test]
fn default_axis_cannot_be_removed() {
    let mut axes = AxisSet::new(0.0, 1.0).expect("axes");
    axes.insert(Axis::new("volume"));

    assert!(axes.remove("default").is_err());
    assert!(matches!(
        axes.remove("missing"),
        Err(ChartError::UnknownAxis(_))
    ));
    assert_eq!(axes.remove("volume").expect("removed").id().as_str(), "volume");
    assert_eq!(axes.len(), 1);
}
