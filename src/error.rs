use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoverageError>;

/// Everything that can go wrong before a sweep starts, plus the two ways a
/// sweep can stop early.
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("{axis} axis needs at least 2 samples, got {len}")]
    AxisTooShort { axis: &'static str, len: usize },

    #[error("{axis} axis is not strictly ascending at index {index}")]
    AxisNotAscending { axis: &'static str, index: usize },

    #[error("{axis} axis is not uniformly spaced at index {index}: step {step} vs mean {expected}")]
    AxisNotUniform {
        axis: &'static str,
        index: usize,
        step: f64,
        expected: f64,
    },

    #[error("{axis} axis drifts {offset} from a uniform grid at index {index} (step {step})")]
    AxisDrift {
        axis: &'static str,
        index: usize,
        offset: f64,
        step: f64,
    },

    #[error("{axis} axis has a non-finite value at index {index}")]
    NonFiniteCoordinate { axis: &'static str, index: usize },

    #[error("Elevation grid has {actual} samples, expected {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        actual: usize,
    },

    #[error("Elevation at row {row}, column {col} is not finite")]
    NonFiniteElevation { row: usize, col: usize },

    #[error("Radar at ({latitude}, {longitude}) lies outside the terrain extent")]
    RadarOutsideGrid { latitude: f64, longitude: f64 },

    #[error("Radar height above terrain must be finite, got {0}")]
    InvalidRadarHeight(f64),

    #[error("At least one flight level is required")]
    NoFlightLevels,

    #[error("Flight level {index} is not finite: {value}")]
    InvalidFlightLevel { index: usize, value: f64 },

    #[error("Invalid sampling parameters: {0}")]
    InvalidSampling(String),

    #[error("Refraction k-factor must be finite and positive, got {0}")]
    InvalidRefraction(f64),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Sweep cancelled after {completed} flight level(s)")]
    Cancelled { completed: usize },
}
