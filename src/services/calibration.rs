// Calibration Configuration
// Every tunable constant of the engine, versioned as a single object

use serde::{Deserialize, Serialize};

use crate::models::SimilarityBand;
use super::config_store::ConfigError;

/// Canonical schema of the calibration file. Other versions are rejected on load.
pub const CALIBRATION_SCHEMA_VERSION: u32 = 1;

const DEFAULT_CALIBRATION_VERSION: &str = "ppx-v2-2026-02";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub schema_version: u32,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub limits: InputLimits,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub lexical: LexicalConfig,
    #[serde(default)]
    pub ngrams: NgramConfig,
    #[serde(default)]
    pub perplexity: PerplexityThresholds,
    #[serde(default)]
    pub blend: BlendWeights,
    #[serde(default)]
    pub stylometric: StylometricSubscoreConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub confidence: ConfidenceCutoffs,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            schema_version: CALIBRATION_SCHEMA_VERSION,
            version: default_version(),
            limits: InputLimits::default(),
            segmenter: SegmenterConfig::default(),
            lexical: LexicalConfig::default(),
            ngrams: NgramConfig::default(),
            perplexity: PerplexityThresholds::default(),
            blend: BlendWeights::default(),
            stylometric: StylometricSubscoreConfig::default(),
            similarity: SimilarityConfig::default(),
            confidence: ConfidenceCutoffs::default(),
        }
    }
}

// ============ Input Limits ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputLimits {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

// ============ Segmenter ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Lowercase words that end with a period without closing the sentence.
    #[serde(default = "default_abbreviations")]
    pub abbreviations: Vec<String>,
    /// Tokens with at least this many characters count as long words.
    #[serde(default = "default_long_word_min_chars")]
    pub long_word_min_chars: usize,
    /// Fewer than one sentence per this many words switches to line-based
    /// segmentation (verse).
    #[serde(default = "default_verse_words_per_sentence")]
    pub verse_words_per_sentence: f64,
    /// Only lines longer than this many characters count as verse lines.
    #[serde(default = "default_min_verse_line_chars")]
    pub min_verse_line_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            abbreviations: default_abbreviations(),
            long_word_min_chars: default_long_word_min_chars(),
            verse_words_per_sentence: default_verse_words_per_sentence(),
            min_verse_line_chars: default_min_verse_line_chars(),
        }
    }
}

// ============ Lexical Statistics ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalConfig {
    #[serde(default = "default_mattr_window")]
    pub mattr_window: usize,
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub lix: LixScale,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            mattr_window: default_mattr_window(),
            stop_words: default_stop_words(),
            lix: LixScale::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LixBand {
    pub label: String,
    pub description: String,
}

/// Ascending cut-points; `bands[i]` covers scores below `cut_points[i]`,
/// the last band covers everything from the last cut-point up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LixScale {
    pub cut_points: Vec<f64>,
    pub bands: Vec<LixBand>,
}

impl Default for LixScale {
    fn default() -> Self {
        let band = |label: &str, description: &str| LixBand {
            label: label.to_string(),
            description: description.to_string(),
        };
        Self {
            cut_points: vec![25.0, 35.0, 45.0, 55.0],
            bands: vec![
                band("very easy", "Children's literature, fairy tales"),
                band("easy", "Popular prose, young adult fiction"),
                band("medium", "Fiction, contemporary prose"),
                band("difficult", "Serious literature, complex prose"),
                band("very difficult", "Avant-garde prose, scholarly texts"),
            ],
        }
    }
}

impl LixScale {
    pub fn band_for(&self, score: f64) -> Option<&LixBand> {
        let idx = self.cut_points.iter().take_while(|cut| score >= **cut).count();
        self.bands.get(idx)
    }
}

// ============ N-grams ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_ngram_count")]
    pub min_count: usize,
    /// When set, bigrams never span two sentences.
    #[serde(default)]
    pub respect_sentence_boundaries: bool,
}

impl Default for NgramConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_count: default_min_ngram_count(),
            respect_sentence_boundaries: false,
        }
    }
}

// ============ Perplexity Thresholds & Blend ============

/// Youden-optimal perplexity cut-points. At or below `t_low` reads as AI,
/// at or above `t_high` as human, strictly between is the gray zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerplexityThresholds {
    pub t_low: f64,
    pub t_high: f64,
}

impl Default for PerplexityThresholds {
    fn default() -> Self {
        Self {
            t_low: 32.03,
            t_high: 41.0623,
        }
    }
}

impl PerplexityThresholds {
    pub fn midpoint(&self) -> f64 {
        (self.t_low + self.t_high) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub perplexity: f64,
    pub stylometry: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            perplexity: 0.7,
            stylometry: 0.3,
        }
    }
}

// ============ Stylometric Sub-score ============

/// Reference range and weight of one feature. Values are min-max normalized
/// against `[low, high]` and clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScale {
    pub low: f64,
    pub high: f64,
    pub weight: f64,
}

impl FeatureScale {
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.high - self.low;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.low) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StylometricSubscoreConfig {
    pub ttr: FeatureScale,
    pub entropy: FeatureScale,
    pub vocab_richness: FeatureScale,
}

impl Default for StylometricSubscoreConfig {
    fn default() -> Self {
        Self {
            ttr: FeatureScale { low: 0.30, high: 0.90, weight: 0.4 },
            entropy: FeatureScale { low: 3.0, high: 9.5, weight: 0.3 },
            vocab_richness: FeatureScale { low: 0.20, high: 0.90, weight: 0.3 },
        }
    }
}

// ============ Similarity ============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTiers {
    pub very_high: f64,
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl Default for SimilarityTiers {
    fn default() -> Self {
        Self {
            very_high: 0.85,
            high: 0.70,
            moderate: 0.50,
            low: 0.30,
        }
    }
}

impl SimilarityTiers {
    pub fn band_for(&self, score: f64) -> SimilarityBand {
        if score >= self.very_high {
            SimilarityBand::VeryHigh
        } else if score >= self.high {
            SimilarityBand::High
        } else if score >= self.moderate {
            SimilarityBand::Moderate
        } else if score >= self.low {
            SimilarityBand::Low
        } else {
            SimilarityBand::VeryLow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Entropy difference (bits) that counts as completely dissimilar.
    #[serde(default = "default_entropy_scale")]
    pub entropy_scale: f64,
    /// Sentence-length difference (words) that counts as completely dissimilar.
    #[serde(default = "default_sentence_length_scale")]
    pub sentence_length_scale: f64,
    #[serde(default)]
    pub tiers: SimilarityTiers,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            entropy_scale: default_entropy_scale(),
            sentence_length_scale: default_sentence_length_scale(),
            tiers: SimilarityTiers::default(),
        }
    }
}

// ============ Confidence ============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceCutoffs {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceCutoffs {
    fn default() -> Self {
        Self { high: 0.80, medium: 0.65 }
    }
}

// ============ Validation ============

impl CalibrationConfig {
    /// Reject configurations the engine cannot apply consistently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != CALIBRATION_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema {
                found: self.schema_version as u64,
                expected: CALIBRATION_SCHEMA_VERSION,
            });
        }

        let limits = &self.limits;
        if limits.min_chars == 0 || limits.max_chars < limits.min_chars {
            return Err(invalid("text length limits must satisfy 0 < min_chars <= max_chars"));
        }
        if limits.max_file_bytes == 0 {
            return Err(invalid("max_file_bytes must be positive"));
        }

        if self.segmenter.long_word_min_chars == 0 {
            return Err(invalid("long_word_min_chars must be positive"));
        }
        let verse_ratio = self.segmenter.verse_words_per_sentence;
        if !verse_ratio.is_finite() || verse_ratio <= 0.0 {
            return Err(invalid("verse_words_per_sentence must be positive"));
        }
        if self.lexical.mattr_window == 0 {
            return Err(invalid("mattr_window must be positive"));
        }

        let lix = &self.lexical.lix;
        if lix.bands.len() != lix.cut_points.len() + 1 {
            return Err(invalid("LIX scale needs exactly one more band than cut-points"));
        }
        if !is_strictly_ascending(&lix.cut_points) {
            return Err(invalid("LIX cut-points must be finite and strictly ascending"));
        }

        if self.ngrams.top_k == 0 {
            return Err(invalid("ngram top_k must be positive"));
        }

        let ppx = &self.perplexity;
        if !(ppx.t_low.is_finite() && ppx.t_high.is_finite()) || ppx.t_low <= 0.0 {
            return Err(invalid("perplexity thresholds must be finite and positive"));
        }
        if ppx.t_low >= ppx.t_high {
            return Err(invalid("perplexity t_low must be below t_high"));
        }

        let blend = &self.blend;
        if !is_weight(blend.perplexity) || !is_weight(blend.stylometry) {
            return Err(invalid("blend weights must be finite and non-negative"));
        }
        if blend.perplexity + blend.stylometry <= 0.0 {
            return Err(invalid("blend weights must not both be zero"));
        }

        let stylo = &self.stylometric;
        for (name, scale) in [
            ("ttr", stylo.ttr),
            ("entropy", stylo.entropy),
            ("vocab_richness", stylo.vocab_richness),
        ] {
            if !is_weight(scale.weight) || !(scale.high > scale.low) {
                return Err(ConfigError::Invalid(format!(
                    "stylometric feature {} needs low < high and a non-negative weight",
                    name
                )));
            }
        }

        let sim = &self.similarity;
        if !(sim.entropy_scale > 0.0) || !(sim.sentence_length_scale > 0.0) {
            return Err(invalid("similarity scale constants must be positive"));
        }
        let tiers = &sim.tiers;
        if !is_strictly_ascending(&[tiers.low, tiers.moderate, tiers.high, tiers.very_high])
            || tiers.low < 0.0
            || tiers.very_high > 1.0
        {
            return Err(invalid("similarity tiers must ascend within [0, 1]"));
        }

        let conf = &self.confidence;
        if !(conf.medium <= conf.high) || conf.medium < 0.0 || conf.high > 1.0 {
            return Err(invalid("confidence cut-offs must satisfy 0 <= medium <= high <= 1"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn is_weight(w: f64) -> bool {
    w.is_finite() && w >= 0.0
}

fn is_strictly_ascending(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite()) && values.windows(2).all(|w| w[0] < w[1])
}

// ============ Default Value Functions ============

fn default_version() -> String { DEFAULT_CALIBRATION_VERSION.to_string() }
fn default_min_chars() -> usize { 50 }
fn default_max_chars() -> usize { 500_000 }
fn default_max_file_bytes() -> usize { 10 * 1024 * 1024 }
fn default_long_word_min_chars() -> usize { 7 }
fn default_verse_words_per_sentence() -> f64 { 40.0 }
fn default_min_verse_line_chars() -> usize { 5 }
fn default_mattr_window() -> usize { 50 }
fn default_top_k() -> usize { 10 }
fn default_min_ngram_count() -> usize { 2 }
fn default_entropy_scale() -> f64 { 6.5 }
fn default_sentence_length_scale() -> f64 { 20.0 }

fn default_abbreviations() -> Vec<String> {
    [
        "dr", "prof", "mgr", "inż", "hab", "itd", "itp", "np", "tj", "tzn", "św", "al", "ul",
        "nr", "str", "rozdz", "red", "wyd", "godz", "rys", "tab", "pkt", "ust", "art", "zob",
        "mr", "mrs", "ms", "vs", "st",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_stop_words() -> Vec<String> {
    [
        "i", "w", "z", "na", "do", "się", "nie", "to", "że", "a", "jak", "ale", "po", "co",
        "go", "jej", "jego", "za", "ten", "ta", "te", "tego", "tej", "o", "już", "by", "tak",
        "ze", "czy", "ich", "im", "przez", "pan", "była", "było", "były", "jest", "są",
        "będzie", "był", "być", "ma", "mam", "mają", "gdy", "bo", "mu", "mi", "nas", "nam",
        "on", "ona", "oni", "je", "też", "tylko", "więc", "tu", "tam",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
