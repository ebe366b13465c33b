use chart_gpu::ChartEngineConfig;
use chart_gpu::ChartError;
use chart_gpu::core::Insets;
use chart_gpu::render::{
    BackendPreference, CandlestickStyle, ChartStyle, Color, DEFAULT_BAR_DURATION_MS,
    RenderBackend,
};

#[test]
fn defaults_describe_a_valid_chart() {
    let config = ChartEngineConfig::default();
    assert_eq!(config.width, 800);
    assert_eq!(config.height, 600);
    assert_eq!(config.insets, Insets::default());
    assert_eq!(config.bar_duration_ms, DEFAULT_BAR_DURATION_MS);
    assert_eq!(config.end_time, 100 * DEFAULT_BAR_DURATION_MS);
    assert_eq!(config.backend, BackendPreference::Auto);
    config.validate().expect("default config is valid");

    let viewport = config.viewport().expect("viewport");
    assert_eq!(viewport.start_time(), 0);
    assert_eq!(viewport.end_time(), config.end_time);
    assert!(config.axes().expect("axes").default_axis().is_ok());
}

#[test]
fn validate_rejects_bad_settings() {
    let err = ChartEngineConfig::new(0, 600)
        .validate()
        .expect_err("zero width");
    assert!(matches!(err, ChartError::InvalidViewport { width: 0, .. }));

    let err = ChartEngineConfig::default()
        .with_axis_range(5.0, 1.0)
        .validate()
        .expect_err("inverted axis range");
    assert!(matches!(err, ChartError::InvalidAxisRange { .. }));

    assert!(
        ChartEngineConfig::default()
            .with_time_window(100, 50)
            .validate()
            .is_err()
    );
    assert!(
        ChartEngineConfig::default()
            .with_bar_duration(0)
            .validate()
            .is_err()
    );
    assert!(
        ChartEngineConfig::default()
            .with_background(Color::rgba(1.5, 0.0, 0.0, 1.0))
            .validate()
            .is_err()
    );
}

#[test]
fn json_round_trip_preserves_every_field() {
    let config = ChartEngineConfig::new(1280, 720)
        .with_insets(Insets::new(4, 80, 24, 0))
        .with_time_window(1_700_000_000_000, 1_700_003_600_000)
        .with_axis_range(90.0, 110.0)
        .with_bar_duration(60_000)
        .with_background(Color::rgb8(0, 0, 0))
        .with_backend(BackendPreference::Specific(RenderBackend::Headless))
        .with_candlestick_style(
            CandlestickStyle::default().with_chart_style(ChartStyle::HollowCandle),
        );

    let json = config.to_json_pretty().expect("serialize");
    assert!(json.contains("\"hollow_candle\""));
    let parsed = ChartEngineConfig::from_json_str(&json).expect("parse");
    assert_eq!(parsed, config);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let parsed = ChartEngineConfig::from_json_str(r#"{ "width": 400 }"#).expect("parse");
    assert_eq!(parsed.width, 400);
    assert_eq!(parsed.height, 600);
    assert_eq!(parsed.bar_duration_ms, DEFAULT_BAR_DURATION_MS);
    assert_eq!(parsed.candlestick_style, CandlestickStyle::default());
}

#[test]
fn malformed_json_is_invalid_data() {
    let err = ChartEngineConfig::from_json_str("{ not json").expect_err("parse error");
    match err {
        ChartError::InvalidData(message) => assert!(message.starts_with("failed to parse config")),
        other => panic!("unexpected error: {other}"),
    }
}
