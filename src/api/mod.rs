mod engine;
mod engine_config;

pub use engine::{ChartEngine, Frame, FrameReport};
pub use engine_config::ChartEngineConfig;
