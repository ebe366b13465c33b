use chart_gpu::ChartError;
use chart_gpu::render::{
    BufferDescriptor, DeviceCall, DrawMode, HeadlessDevice, RenderDevice, ShaderSource,
    TextureDescriptor, UniformValue,
};

fn live_device() -> HeadlessDevice {
    let mut device = HeadlessDevice::new();
    device.initialize().expect("initialize");
    device
}

#[test]
fn upload_within_capacity_does_not_reallocate() {
    let mut device = live_device();
    let recorder = device.recorder();
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(16).labeled("points"))
        .expect("buffer");

    buffer.upload(&[0.0; 12]).expect("upload");
    assert_eq!(buffer.vertex_count(), 6);
    assert_eq!(buffer.capacity(), 16);
    assert_eq!(
        recorder.count_calls(|call| matches!(call, DeviceCall::Upload { reallocated: true, .. })),
        0
    );
}

#[test]
fn upload_past_capacity_grows_by_half() {
    let mut device = live_device();
    let recorder = device.recorder();
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(100).labeled("points"))
        .expect("buffer");

    buffer.upload(&[1.0; 120]).expect("grow");
    assert_eq!(buffer.capacity(), 150);
    assert_eq!(buffer.vertex_count(), 60);

    buffer.upload(&[1.0; 400]).expect("grow to fit");
    assert_eq!(buffer.capacity(), 400);

    // Shrinking data keeps the allocation.
    buffer.upload(&[1.0; 10]).expect("shrink");
    assert_eq!(buffer.capacity(), 400);
    assert_eq!(buffer.vertex_count(), 5);

    let grows = recorder.count_calls(|call| {
        matches!(call, DeviceCall::Upload { reallocated: true, .. })
    });
    assert_eq!(grows, 2);
}

#[test]
fn failed_growth_reports_allocation_error_and_keeps_contents() {
    let mut device = live_device();
    let recorder = device.recorder();
    recorder.limit_buffer_floats(Some(64));
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(32).labeled("points"))
        .expect("buffer");
    buffer.upload(&[2.0; 8]).expect("upload");

    let err = buffer.upload(&[0.0; 100]).expect_err("growth past limit");
    assert!(matches!(err, ChartError::BufferAllocation { requested_floats: 100 }));
    assert_eq!(buffer.vertex_count(), 4);
    assert_eq!(buffer.capacity(), 32);
}

#[test]
fn draw_records_vertices_and_mode() {
    let mut device = live_device();
    let recorder = device.recorder();
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(8).labeled("tri"))
        .expect("buffer");
    buffer
        .upload(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0])
        .expect("upload");

    buffer.draw(DrawMode::Triangles).expect("draw");

    let draws = recorder.draws_for("tri");
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].mode, DrawMode::Triangles);
    assert_eq!(draws[0].vertex_count, 3);
    assert_eq!(draws[0].vertex(2), Some(&[10.0, 10.0][..]));
    assert_eq!(draws[0].shader, None);
}

#[test]
fn draw_range_is_bounds_checked() {
    let mut device = live_device();
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(8))
        .expect("buffer");
    buffer.upload(&[0.0; 8]).expect("upload");

    let err = buffer
        .draw_range(DrawMode::LineStrip, 2, 3)
        .expect_err("past the end");
    assert!(matches!(err, ChartError::IndexOutOfBounds { index: 5, len: 4 }));
    buffer.draw_range(DrawMode::LineStrip, 1, 3).expect("in range");
}

#[test]
fn disposed_buffer_rejects_use() {
    let mut device = live_device();
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(8))
        .expect("buffer");
    buffer.dispose();
    buffer.dispose();

    assert!(!buffer.is_initialized());
    assert!(matches!(
        buffer.upload(&[0.0; 2]),
        Err(ChartError::NotInitialized(_))
    ));
}

#[test]
fn shader_without_entry_point_is_invalid_and_inert() {
    let mut device = live_device();
    let recorder = device.recorder();
    let source = ShaderSource::new("broken", "void nothing() {}", "void main() {}")
        .expect("non-empty source");
    let mut shader = device.create_shader(&source).expect("never an error");

    assert!(!shader.is_valid());
    shader.bind();
    shader.set_uniform("uColor", UniformValue::Vec4([1.0; 4]));
    assert_eq!(
        recorder.count_calls(|call| matches!(call, DeviceCall::BindShader(_))),
        0
    );
    assert_eq!(
        recorder.count_calls(|call| matches!(call, DeviceCall::InvalidShaderUse(_))),
        2
    );
}

#[test]
fn draws_snapshot_bound_shader_uniforms() {
    let mut device = live_device();
    let recorder = device.recorder();
    let mut shader = device
        .create_shader(&ShaderSource::builtin_simple())
        .expect("shader");
    let mut buffer = device
        .create_buffer(&BufferDescriptor::position_only_2d(4).labeled("seg"))
        .expect("buffer");
    buffer.upload(&[0.0, 0.0, 1.0, 1.0]).expect("upload");

    shader.bind();
    shader.set_color("uColor", [1.0, 0.0, 0.0, 1.0]);
    buffer.draw(DrawMode::Lines).expect("draw");
    shader.set_color("uColor", [0.0, 1.0, 0.0, 1.0]);
    buffer.draw(DrawMode::Lines).expect("draw");

    let draws = recorder.draws_for("seg");
    assert_eq!(draws[0].shader.as_deref(), Some("simple"));
    assert_eq!(
        draws[0].uniform("uColor"),
        Some(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
    );
    assert_eq!(
        draws[1].uniform("uColor"),
        Some(UniformValue::Vec4([0.0, 1.0, 0.0, 1.0]))
    );
}

#[test]
fn injected_shader_failure_by_name() {
    let mut device = HeadlessDevice::new().with_failing_shader("default");
    device.initialize().expect("initialize");

    let default = device
        .create_shader(&ShaderSource::builtin_default())
        .expect("shader");
    let simple = device
        .create_shader(&ShaderSource::builtin_simple())
        .expect("shader");
    assert!(!default.is_valid());
    assert!(simple.is_valid());
}

#[test]
fn line_width_is_clamped_to_device_range() {
    let mut device = live_device();
    let recorder = device.recorder();
    device.set_line_width(0.25);
    device.set_line_width(500.0);

    let widths: Vec<f32> = recorder
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DeviceCall::SetLineWidth(width) => Some(width),
            _ => None,
        })
        .collect();
    assert_eq!(widths, vec![1.0, device.capabilities().max_line_width]);
}

#[test]
fn frames_require_initialization() {
    let mut device = HeadlessDevice::new();
    assert!(matches!(
        device.begin_frame(),
        Err(ChartError::NotInitialized(_))
    ));

    device.initialize().expect("initialize");
    device.begin_frame().expect("begin");
    assert!(device.recorder().is_in_frame());
    device.end_frame().expect("end");
    assert_eq!(device.recorder().frame(), 1);
}

#[test]
fn oversized_texture_is_rejected() {
    let mut device = live_device();
    let max = device.capabilities().max_texture_size;
    assert!(device.create_texture(&TextureDescriptor::rgba(max + 1, 4)).is_err());
    assert!(device.create_texture(&TextureDescriptor::rgba(64, 64)).is_ok());
}

#[test]
fn headless_has_no_readback() {
    let mut device = live_device();
    assert!(!device.supports_pixel_readback());
    let mut pixels = vec![0_u32; 4];
    assert!(matches!(
        device.read_pixels(&mut pixels),
        Err(ChartError::ReadbackUnsupported("headless"))
    ));
}
