use thiserror::Error;

/// Failures of the spectral value types and the processing model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("values and over-exposure flags have different lengths {values} and {over_exposed}")]
    DimensionMismatch { values: usize, over_exposed: usize },

    #[error("no spectrum available")]
    NoSpectrum,

    #[error("no camera selected")]
    NoCamera,
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
