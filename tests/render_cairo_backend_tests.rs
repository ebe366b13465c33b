#![cfg(feature = "cairo-backend")]

use chart_gpu::core::{Insets, OhlcBar, OhlcSeries};
use chart_gpu::render::{
    BackendPreference, BackendRegistry, BufferDescriptor, CairoDevice, CandlestickRenderer,
    CandlestickStyle, Color, DrawMode, PixelRect, RenderBackend, RenderDevice, ResourceManager,
    SHADER_DEFAULT, UNIFORM_PROJECTION, UniformValue,
};
use chart_gpu::{ChartEngine, ChartEngineConfig, ChartError};

const WIDTH: u32 = 200;
const HEIGHT: u32 = 100;

fn config() -> ChartEngineConfig {
    ChartEngineConfig::new(WIDTH, HEIGHT)
        .with_insets(Insets::zero())
        .with_time_window(0, 1000)
        .with_axis_range(0.0, 100.0)
        .with_bar_duration(100)
        .with_background(Color::rgb8(10, 20, 30))
}

fn assert_pixel_near(actual: u32, expected: u32) {
    for shift in [0, 8, 16, 24] {
        let a = i32::try_from((actual >> shift) & 0xFF).expect("channel");
        let e = i32::try_from((expected >> shift) & 0xFF).expect("channel");
        assert!(
            (a - e).abs() <= 1,
            "pixel {actual:#010x} differs from {expected:#010x}"
        );
    }
}

#[test]
fn cairo_device_rejects_invalid_surface_size() {
    let err = CairoDevice::new(0, 480).expect_err("zero width must fail");
    assert!(matches!(err, ChartError::InvalidViewport { .. }));
}

#[test]
fn cairo_engine_rasterizes_background_and_candle_body() {
    let device = CairoDevice::new(WIDTH, HEIGHT).expect("device");
    let mut engine = ChartEngine::with_device(config(), Box::new(device)).expect("engine");
    assert!(engine.capabilities().supports_pixel_readback);

    let series = OhlcSeries::from_bars(
        "btc",
        &[OhlcBar::new(500, 20.0, 80.0, 10.0, 70.0, 1.0).expect("bar")],
    )
    .expect("series");
    let mut renderer = CandlestickRenderer::new("main");
    engine
        .render_frame(|frame| {
            let mut ctx = frame.context_for(&series);
            renderer.render(&mut ctx, &series)?;
            Ok(())
        })
        .expect("frame");

    let pixels = engine.read_pixels().expect("readback");
    assert_eq!(pixels.len(), (WIDTH * HEIGHT) as usize);
    let at = |x: u32, y: u32| pixels[(y * WIDTH + x) as usize];

    let background = Color::rgb8(10, 20, 30).to_argb_u32();
    assert_pixel_near(at(0, 0), background);
    assert_pixel_near(at(WIDTH - 1, HEIGHT - 1), background);

    // Body spans x 92..108 and y 30..80 on a 0.2 px/ms, 1 px/unit chart.
    let bullish = CandlestickStyle::default().bullish_color.to_argb_u32();
    assert_pixel_near(at(104, 55), bullish);
    assert_pixel_near(at(60, 55), background);
}

#[test]
fn cairo_surface_follows_viewport_resizes() {
    let device = CairoDevice::new(WIDTH, HEIGHT).expect("device");
    let mut engine = ChartEngine::with_device(config(), Box::new(device)).expect("engine");

    engine.set_size(64, 32).expect("resize");
    assert_eq!(engine.read_pixels().expect("readback before frame").len(), 64 * 32);

    engine.render_frame(|_| Ok(())).expect("frame");
    assert_eq!(engine.read_pixels().expect("readback").len(), 64 * 32);
}

#[test]
fn viewport_maps_clip_space_without_discarding_the_frame() {
    const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];
    let mut device = CairoDevice::new(WIDTH, HEIGHT).expect("device");
    device.initialize().expect("initialize");
    let mut resources = ResourceManager::new();
    resources.initialize(&mut device).expect("resources");

    let background = Color::rgb8(10, 20, 30);
    let fill = Color::rgb8(200, 100, 0);
    device.begin_frame().expect("frame");
    device.clear(background);
    device.set_viewport(PixelRect::new(100, 50, 50, 25));
    {
        let shader = resources.shader_mut(SHADER_DEFAULT).expect("shader");
        shader.bind();
        shader.set_uniform(UNIFORM_PROJECTION, UniformValue::Mat4(IDENTITY));
    }
    let rgba = fill.to_array();
    let corners = [
        (-1.0, -1.0),
        (1.0, -1.0),
        (1.0, 1.0),
        (-1.0, -1.0),
        (1.0, 1.0),
        (-1.0, 1.0),
    ];
    let quad: Vec<f32> = corners
        .into_iter()
        .flat_map(|(x, y)| [x, y, rgba[0], rgba[1], rgba[2], rgba[3]])
        .collect();
    let buffer = resources
        .get_or_create_buffer(&mut device, "quad", &BufferDescriptor::position_color_2d(64))
        .expect("buffer");
    buffer.upload(&quad).expect("upload");
    buffer.draw(DrawMode::Triangles).expect("draw");
    resources.shader_mut(SHADER_DEFAULT).expect("shader").unbind();
    device.end_frame().expect("frame");

    let mut pixels = vec![0_u32; (WIDTH * HEIGHT) as usize];
    device.read_pixels(&mut pixels).expect("readback");
    let at = |x: u32, y: u32| pixels[(y * WIDTH + x) as usize];

    // The quad fills exactly the 50x25 viewport at (100, 50).
    assert_pixel_near(at(125, 62), fill.to_argb_u32());
    assert_pixel_near(at(101, 51), fill.to_argb_u32());
    assert_pixel_near(at(10, 10), background.to_argb_u32());
    assert_pixel_near(at(160, 62), background.to_argb_u32());
    assert_pixel_near(at(125, 85), background.to_argb_u32());
}

#[test]
fn cairo_device_writes_png() {
    let mut device = CairoDevice::new(16, 8).expect("device");
    device.initialize().expect("initialize");
    device.begin_frame().expect("frame");
    device.clear(Color::rgb8(255, 0, 0));
    device.end_frame().expect("frame");

    let mut png = Vec::new();
    device.write_png(&mut png).expect("png");
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn cairo_outranks_headless_when_compiled_in() {
    let registry = BackendRegistry::with_builtin_providers();
    assert_eq!(
        registry.detect_best().expect("backend"),
        RenderBackend::Cairo
    );

    let engine = ChartEngine::with_registry(
        config().with_backend(BackendPreference::Auto),
        &registry,
    )
    .expect("engine");
    assert_eq!(engine.backend(), RenderBackend::Cairo);
}
