// stylocheck Data Models
// Shapes produced by the analysis engine and persisted by the history store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============ Stylometry ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramCount {
    pub ngram: String,
    pub count: usize,
}

/// Deterministic lexical profile of a single text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylometricProfile {
    pub word_count: usize,
    pub sentence_count: usize,
    pub unique_words: usize,
    /// Moving-average type-token ratio (plain TTR for texts shorter than the window).
    pub ttr: f64,
    pub lexical_density: f64,
    /// Hapax legomena over distinct words.
    pub vocab_richness: f64,
    /// Shannon entropy of the word distribution, in bits.
    pub entropy: f64,
    pub avg_sentence_length: f64,
    #[serde(default)]
    pub top_ngrams: Vec<NgramCount>,
}

/// Literary extras reported next to the core profile. Not used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtendedMetrics {
    pub mtld: f64,
    pub yules_k: f64,
    pub entropy_norm: f64,
    pub sentence_length_std: f64,
    pub dialogue_ratio: f64,
    /// Occurrences per 1000 characters, keyed by mark name. `dash` sums
    /// em dashes, en dashes and hyphens.
    #[serde(default)]
    pub punctuation_per_1k_chars: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub lix_score: f64,
    pub lix_label: String,
    #[serde(default)]
    pub lix_description: String,
    pub punctuation_density: f64,
    pub long_word_ratio: f64,
    pub avg_word_length: f64,
}

// ============ Authenticity ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorshipLabel {
    Human,
    Ai,
}

impl AuthorshipLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Human,
    GrayZone,
    Ai,
}

impl ConfidenceBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::GrayZone => "gray_zone",
            Self::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityVerdict {
    /// Raw model perplexity; absent when the model could not be consulted.
    pub perplexity: Option<f64>,
    pub ppx_signal: Option<f64>,
    pub stylometric_subscore: f64,
    pub ai_probability: f64,
    pub human_probability: f64,
    pub label: AuthorshipLabel,
    pub confidence_band: ConfidenceBand,
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

// ============ Analysis Report ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub stylometry: StylometricProfile,
    pub quality: QualityProfile,
    pub ai_detection: AuthenticityVerdict,
    #[serde(default)]
    pub extended: ExtendedMetrics,
    pub calibration_version: String,
}

// ============ Similarity ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBand {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDifference {
    pub metric: String,
    pub value_a: f64,
    pub value_b: f64,
    pub normalized_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub profile_a: StylometricProfile,
    pub profile_b: StylometricProfile,
    pub similarity_score: f64,
    pub similarity_band: SimilarityBand,
    #[serde(default)]
    pub breakdown: Vec<MetricDifference>,
}

// ============ History ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub schema_version: u32,
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text_preview: String,
    pub text_length: usize,
    /// Complete analysed text. Absent in records written before it was kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    pub report: AnalysisReport,
}

impl AnalysisRecord {
    /// Full text when stored, otherwise the preview.
    pub fn text(&self) -> &str {
        self.full_text.as_deref().unwrap_or(&self.text_preview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisListItem {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text_preview: String,
    pub text_length: usize,
    pub ai_probability: f64,
    pub ttr: f64,
    pub lix_score: f64,
}

impl From<&AnalysisRecord> for AnalysisListItem {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            text_preview: record.text_preview.clone(),
            text_length: record.text_length,
            ai_probability: record.report.ai_detection.ai_probability,
            ttr: record.report.stylometry.ttr,
            lix_score: record.report.quality.lix_score,
        }
    }
}

// ============ Threshold Calibration ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub label: AuthorshipLabel,
    pub perplexity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub optimal_threshold: f64,
    pub t_low: f64,
    pub t_high: f64,
    pub auc: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Rows are true human / true ai, columns predicted human / predicted ai.
    pub confusion_matrix: [[usize; 2]; 2],
    pub n_human: usize,
    pub n_ai: usize,
}
