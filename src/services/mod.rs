// stylocheck Core Services
// Segmentation, lexical statistics, perplexity adapter and scoring

pub mod calibration;
pub mod config_store;
pub mod errors;
pub mod text_processor;
pub mod stylometry;
pub mod ngrams;
pub mod providers;
pub mod cache;
pub mod file_parser;
pub mod history_store;
pub mod detection;

pub use calibration::CalibrationConfig;
pub use config_store::{AppConfig, ConfigError, ConfigStore};
pub use errors::{AnalysisError, ComparisonSide};
pub use providers::{HttpPerplexityScorer, PerplexityScorer, ProviderError, UnconfiguredScorer};
pub use cache::{fingerprint, FingerprintCache};
pub use history_store::{AnalysisStore, JsonHistoryStore, StoreError};

pub use detection::{
    compare_profiles,
    derive_thresholds,
    score_authenticity,
    CalibrationError,
};
