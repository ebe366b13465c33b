use approx::assert_relative_eq;
use chart_gpu::core::contour::{FLOATS_PER_SEGMENT, estimate_output_floats};
use chart_gpu::core::{
    AxisSet, CoordinateSystem, Insets, ScalarGrid, Viewport, extract_contour, extract_contours,
};
use chart_gpu::render::{
    Color, ContourLevel, ContourRenderer, DrawMode, HeadlessDevice, RenderContext, RenderDevice,
    ResourceManager, SHADER_DEFAULT,
};

const UNIT: [f64; 2] = [0.0, 1.0];

/// Values are `[bottom-left, bottom-right, top-left, top-right]`.
fn cell(values: &[f32; 4]) -> ScalarGrid<'_> {
    ScalarGrid::new(values, 2, 2, &UNIT, &UNIT).expect("grid")
}

#[test]
fn single_corner_above_threshold_cuts_that_corner() {
    let values = [0.0, 0.0, 0.0, 1.0];
    let mut out = Vec::new();
    let written = extract_contour(&cell(&values), 0.5, &mut out);

    assert_eq!(written, FLOATS_PER_SEGMENT);
    assert_eq!(out, vec![1.0, 0.5, 0.5, 1.0]);
}

#[test]
fn uniform_cells_produce_no_segments() {
    let below = [0.0; 4];
    let above = [1.0; 4];
    let mut out = Vec::new();

    assert_eq!(extract_contour(&cell(&below), 0.5, &mut out), 0);
    assert_eq!(extract_contour(&cell(&above), 0.5, &mut out), 0);
    assert!(out.is_empty());
}

#[test]
fn crossing_point_is_linearly_interpolated() {
    // Left column below, right column above: one vertical segment.
    let values = [0.0, 4.0, 0.0, 4.0];
    let mut out = Vec::new();
    extract_contour(&cell(&values), 1.0, &mut out);

    assert_eq!(out.len(), FLOATS_PER_SEGMENT);
    assert_relative_eq!(out[0], 0.25);
    assert_relative_eq!(out[2], 0.25);
    let ys = [out[1], out[3]];
    assert!(ys.contains(&0.0));
    assert!(ys.contains(&1.0));
}

#[test]
fn cells_with_missing_samples_are_skipped() {
    // 2 rows x 3 cols: the left cell touches NaN, the right one crosses.
    let values = [f32::NAN, 0.0, 1.0, 0.0, 0.0, 1.0];
    let grid = ScalarGrid::new(&values, 2, 3, &[0.0, 1.0, 2.0], &UNIT).expect("grid");
    let mut out = Vec::new();
    extract_contour(&grid, 0.5, &mut out);

    assert_eq!(out.len(), FLOATS_PER_SEGMENT);
    assert!(out.iter().step_by(2).all(|&x| (1.0..=2.0).contains(&x)));
}

#[test]
fn output_is_appended_after_existing_contents() {
    let values = [0.0, 0.0, 0.0, 1.0];
    let mut out = vec![9.0, 9.0];
    let written = extract_contour(&cell(&values), 0.5, &mut out);

    assert_eq!(written, 4);
    assert_eq!(&out[..2], &[9.0, 9.0]);
    assert_eq!(out.len(), 6);
}

#[test]
fn multiple_levels_report_per_level_floats() {
    let values = [0.0, 1.0, 2.0, 3.0];
    let grid = cell(&values);
    let mut out = Vec::new();
    let mut level_floats = Vec::new();

    let total = extract_contours(&grid, &[0.5, 2.5, 10.0], &mut out, &mut level_floats);

    assert_eq!(level_floats, vec![4, 4, 0]);
    assert_eq!(total, out.len());
    assert_eq!(total, 8);
    assert!(estimate_output_floats(2, 2, 3) >= total);
}

#[test]
fn grid_shape_is_validated() {
    let values = [0.0; 3];
    assert!(ScalarGrid::new(&values, 1, 3, &[0.0, 1.0, 2.0], &[0.0]).is_err());

    let values = [0.0; 4];
    assert!(ScalarGrid::new(&values, 2, 2, &[0.0, 1.0, 2.0], &UNIT).is_err());
}

#[test]
fn renderer_emits_colored_segments_in_screen_space() {
    let viewport = Viewport::new(1000, 500)
        .with_insets(Insets::zero())
        .with_time_window(0, 1000)
        .expect("window");
    let axes = AxisSet::new(0.0, 100.0).expect("axes");
    let values = [0.0, 0.0, 0.0, 1.0];
    let xs = [0.0, 1000.0];
    let ys = [0.0, 100.0];
    let grid = ScalarGrid::new(&values, 2, 2, &xs, &ys).expect("grid");
    let color = Color::rgb8(255, 128, 0);

    let mut device = HeadlessDevice::new();
    device.initialize().expect("device");
    let recorder = device.recorder();
    let mut resources = ResourceManager::new();
    resources.initialize(&mut device).expect("resources");

    let mut renderer = ContourRenderer::new("heat").with_levels([ContourLevel::new(0.5, color)]);
    let stats = {
        let mut ctx = RenderContext::new(
            &mut device,
            &mut resources,
            CoordinateSystem::new(&viewport, &axes),
        );
        renderer.render(&mut ctx, &grid).expect("render")
    };

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.vertices, 2);

    let vertices = renderer.vertices();
    assert_eq!(vertices.len(), 12);
    assert_relative_eq!(vertices[0], 1000.0, epsilon = 1e-3);
    assert_relative_eq!(vertices[1], 250.0, epsilon = 1e-3);
    assert_relative_eq!(vertices[6], 500.0, epsilon = 1e-3);
    assert_relative_eq!(vertices[7], 0.0, epsilon = 1e-3);
    assert_eq!(&vertices[2..6], &color.to_array());
    assert_eq!(&vertices[8..12], &color.to_array());

    let draws = recorder.draws_for("contour.heat");
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].mode, DrawMode::Lines);
    assert_eq!(draws[0].shader.as_deref(), Some(SHADER_DEFAULT));
}

#[test]
fn renderer_without_levels_draws_nothing() {
    let viewport = Viewport::new(100, 100);
    let axes = AxisSet::default();
    let values = [0.0, 0.0, 0.0, 1.0];
    let grid = cell(&values);

    let mut device = HeadlessDevice::new();
    device.initialize().expect("device");
    let recorder = device.recorder();
    let mut resources = ResourceManager::new();
    resources.initialize(&mut device).expect("resources");

    let stats = {
        let mut ctx = RenderContext::new(
            &mut device,
            &mut resources,
            CoordinateSystem::new(&viewport, &axes),
        );
        ContourRenderer::new("empty")
            .render(&mut ctx, &grid)
            .expect("render")
    };

    assert!(stats.is_empty());
    assert_eq!(recorder.draw_count(), 0);
}
