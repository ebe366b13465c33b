use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("index {index} out of bounds for series of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid axis range: min={min}, max={max}")]
    InvalidAxisRange { min: f64, max: f64 },

    #[error("unknown axis `{0}`")]
    UnknownAxis(String),

    #[error("timestamp {given} is not after last timestamp {last}")]
    NonAscendingTimestamp { last: i64, given: i64 },

    #[error("render backend `{backend}` is unavailable (available: {available:?})")]
    BackendUnavailable {
        backend: String,
        available: Vec<String>,
    },

    #[error("failed to allocate buffer storage for {requested_floats} floats")]
    BufferAllocation { requested_floats: usize },

    #[error("{0} is not initialized or was already disposed")]
    NotInitialized(&'static str),

    #[error("pixel readback is not supported by backend `{0}`")]
    ReadbackUnsupported(&'static str),

    #[error("backend failure: {0}")]
    Backend(String),
}
