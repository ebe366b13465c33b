//! chart-gpu: backend-agnostic rendering core for large time-indexed
//! financial charts.
//!
//! The crate is split into `core` (series storage, axes, viewport, coordinate
//! math and contour extraction), `render` (the device abstraction, resource
//! management, backends and vertex-generating renderers) and `api` (the
//! engine facade hosts drive once per frame).

pub mod api;
pub mod core;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api::{ChartEngine, ChartEngineConfig, Frame, FrameReport};
pub use error::{ChartError, ChartResult};
