// Detection Module
// Authenticity scoring organized into specialized submodules:
// - bands: perplexity banding, labels and confidence levels
// - scorer: hybrid perplexity + stylometry verdicts, including degraded mode
// - comparison: stylometric similarity between two texts
// - calibrate: offline threshold derivation from a labeled corpus

pub mod bands;
pub mod scorer;
pub mod comparison;
pub mod calibrate;

pub use bands::{confidence_level, perplexity_band, perplexity_label, ppx_signal};
pub use scorer::{score_authenticity, score_degraded, score_with_perplexity, stylometric_subscore};
pub use comparison::{compare_profiles, metric_differences, similarity_score};
pub use calibrate::{derive_thresholds, roc_auc, CalibrationError, DEFAULT_GRAY_RATIO};
