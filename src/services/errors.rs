// Analysis Errors
// Failures surfaced to callers of the analysis engine

use std::fmt;
use thiserror::Error;

use super::config_store::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonSide {
    A,
    B,
}

impl fmt::Display for ComparisonSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("text is too short: {chars} characters (minimum {min})")]
    InputTooShort { chars: usize, min: usize },
    #[error("text is too long: {chars} characters (maximum {max})")]
    InputTooLong { chars: usize, max: usize },
    #[error("unsupported file format: {extension:?} (supported: .txt, .pdf, .docx)")]
    UnsupportedFileFormat { extension: String },
    #[error("file is too large: {size} bytes (maximum {max})")]
    FileTooLarge { size: usize, max: usize },
    #[error("failed to extract text from {format} file: {message}")]
    ExtractionFailed { format: &'static str, message: String },
    #[error("text contains no word tokens")]
    InsufficientTokens,
    #[error("text {side} cannot be compared: {source}")]
    ComparisonInputInvalid {
        side: ComparisonSide,
        #[source]
        source: Box<AnalysisError>,
    },
    #[error("statistics task failed: {0}")]
    TaskFailed(String),
    #[error("invalid calibration: {0}")]
    InvalidCalibration(#[from] ConfigError),
}
