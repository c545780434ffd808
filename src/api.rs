// Analysis Engine
// Entry point tying segmentation, statistics, the perplexity model and scoring together

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::models::{AnalysisReport, ExtendedMetrics, QualityProfile, SimilarityResult, StylometricProfile};
use crate::services::cache::{fingerprint, FingerprintCache};
use crate::services::calibration::CalibrationConfig;
use crate::services::config_store::{load_calibration, AppConfig};
use crate::services::detection::{compare_profiles, score_authenticity};
use crate::services::errors::{AnalysisError, ComparisonSide};
use crate::services::file_parser::extract_text;
use crate::services::providers::{
    validate_perplexity, HttpPerplexityScorer, PerplexityScorer, ProviderError, UnconfiguredScorer,
};
use crate::services::stylometry::{compute_extended_metrics, compute_profile};
use crate::services::text_processor::{normalize_text, segment};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on a single model call; expiry degrades the verdict.
    pub model_timeout: Duration,
    pub max_inflight_model_calls: usize,
    /// Perplexity memo size; `None` disables memoization.
    pub cache_capacity: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(30),
            max_inflight_model_calls: 4,
            cache_capacity: Some(256),
        }
    }
}

/// Shared analysis engine. Cloning is cheap and clones share the model gate
/// and the perplexity cache.
#[derive(Clone)]
pub struct AnalysisEngine {
    calibration: Arc<CalibrationConfig>,
    scorer: Arc<dyn PerplexityScorer>,
    model_timeout: Duration,
    model_gate: Arc<Semaphore>,
    cache: Option<Arc<FingerprintCache>>,
}

impl AnalysisEngine {
    pub fn new(
        calibration: CalibrationConfig,
        scorer: Arc<dyn PerplexityScorer>,
        options: EngineOptions,
    ) -> Result<Self, AnalysisError> {
        calibration.validate()?;
        info!(
            "[ENGINE] Calibration {} (t_low={}, t_high={}), scorer={}",
            calibration.version,
            calibration.perplexity.t_low,
            calibration.perplexity.t_high,
            scorer.name()
        );

        Ok(Self {
            calibration: Arc::new(calibration),
            scorer,
            model_timeout: options.model_timeout,
            model_gate: Arc::new(Semaphore::new(options.max_inflight_model_calls.max(1))),
            cache: options.cache_capacity.map(|c| Arc::new(FingerprintCache::new(c))),
        })
    }

    /// Build an engine from application configuration: calibration file if
    /// one is configured, HTTP scorer if a model URL is set.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        let calibration = match &config.calibration_path {
            Some(path) => load_calibration(path)?,
            None => CalibrationConfig::default(),
        };

        let timeout = Duration::from_secs(config.model.timeout_secs.max(1));
        let scorer: Arc<dyn PerplexityScorer> = match config.model.base_url.as_deref() {
            Some(url) => match HttpPerplexityScorer::new(url, timeout) {
                Ok(scorer) => Arc::new(scorer),
                Err(e) => {
                    warn!("[ENGINE] Could not build HTTP scorer for {}: {}", url, e);
                    Arc::new(UnconfiguredScorer)
                }
            },
            None => Arc::new(UnconfiguredScorer),
        };

        let options = EngineOptions {
            model_timeout: timeout,
            max_inflight_model_calls: config.model.max_inflight,
            cache_capacity: if config.cache_enabled {
                EngineOptions::default().cache_capacity
            } else {
                None
            },
        };

        Self::new(calibration, scorer, options)
    }

    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    /// Full analysis of a text. Model failures degrade the verdict and are
    /// never returned as errors.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        self.analyze_with_cancel(text, std::future::pending::<()>()).await
    }

    /// Like [`analyze`](Self::analyze), but the model call is abandoned when
    /// `cancel` completes first. Statistics are still computed and the
    /// verdict degrades.
    pub async fn analyze_with_cancel<C>(&self, text: &str, cancel: C) -> Result<AnalysisReport, AnalysisError>
    where
        C: Future<Output = ()>,
    {
        let start = Instant::now();
        let text = self.prepare_text(text)?;
        info!("[ANALYZE] Starting analysis ({} chars)", text.chars().count());

        let model_future = async {
            tokio::select! {
                result = self.measure_perplexity(&text) => result,
                _ = cancel => {
                    info!("[ANALYZE] Model call cancelled");
                    Err(ProviderError::Cancelled)
                }
            }
        };
        // CPU-bound; keep it off the worker so the model request makes progress
        let stats_future = {
            let calibration = Arc::clone(&self.calibration);
            let text = text.clone();
            async move {
                tokio::task::spawn_blocking(move || compute_statistics(&text, &calibration))
                    .await
                    .unwrap_or_else(|e| Err(AnalysisError::TaskFailed(e.to_string())))
            }
        };

        let (perplexity, stats) = tokio::join!(model_future, stats_future);
        let (stylometry, quality, extended) = stats?;

        let ai_detection = score_authenticity(&stylometry, perplexity, &self.calibration);

        info!(
            "[ANALYZE] Done in {}ms: words={} ai={:.4} band={} degraded={}",
            start.elapsed().as_millis(),
            stylometry.word_count,
            ai_detection.ai_probability,
            ai_detection.confidence_band.as_str(),
            ai_detection.degraded
        );

        Ok(AnalysisReport {
            stylometry,
            quality,
            ai_detection,
            extended,
            calibration_version: self.calibration.version.clone(),
        })
    }

    /// Extract text from an uploaded `.txt`, `.pdf` or `.docx` file and analyze it.
    pub async fn analyze_file(&self, filename: &str, bytes: &[u8]) -> Result<AnalysisReport, AnalysisError> {
        let text = extract_text(filename, bytes, &self.calibration.limits)?;
        self.analyze(&text).await
    }

    /// Stylometric similarity of two texts. Never consults the model.
    pub fn compare(&self, text_a: &str, text_b: &str) -> Result<SimilarityResult, AnalysisError> {
        let profile_side = |side: ComparisonSide, text: &str| {
            self.prepare_text(text)
                .and_then(|t| compute_statistics(&t, &self.calibration))
                .map(|(profile, _, _)| profile)
                .map_err(|e| AnalysisError::ComparisonInputInvalid {
                    side,
                    source: Box::new(e),
                })
        };

        let a = profile_side(ComparisonSide::A, text_a)?;
        let b = profile_side(ComparisonSide::B, text_b)?;
        let result = compare_profiles(a, b, &self.calibration.similarity);

        info!(
            "[COMPARE] similarity={:.4} band={:?}",
            result.similarity_score, result.similarity_band
        );
        Ok(result)
    }

    fn prepare_text(&self, text: &str) -> Result<String, AnalysisError> {
        let limits = &self.calibration.limits;
        let chars = text.trim().chars().count();
        if chars < limits.min_chars {
            return Err(AnalysisError::InputTooShort {
                chars,
                min: limits.min_chars,
            });
        }
        if chars > limits.max_chars {
            return Err(AnalysisError::InputTooLong {
                chars,
                max: limits.max_chars,
            });
        }
        Ok(normalize_text(text))
    }

    async fn measure_perplexity(&self, text: &str) -> Result<f64, ProviderError> {
        let call = move || async move {
            let _permit = self
                .model_gate
                .acquire()
                .await
                .map_err(|_| ProviderError::ModelUnavailable("model gate closed".to_string()))?;
            match tokio::time::timeout(self.model_timeout, self.scorer.score(text)).await {
                // Scorers are external; a non-positive or non-finite value degrades
                Ok(result) => result.and_then(|value| validate_perplexity(Some(value))),
                Err(_) => {
                    warn!("[PERPLEXITY] Model call timed out after {:?}", self.model_timeout);
                    Err(ProviderError::Timeout(self.model_timeout))
                }
            }
        };

        match &self.cache {
            Some(cache) => cache.get_or_compute(&fingerprint(text), call).await,
            None => call().await,
        }
    }
}

fn compute_statistics(
    text: &str,
    calibration: &CalibrationConfig,
) -> Result<(StylometricProfile, QualityProfile, ExtendedMetrics), AnalysisError> {
    let segmentation = segment(text, &calibration.segmenter);
    let (stylometry, quality) = compute_profile(&segmentation, calibration)?;
    let extended = compute_extended_metrics(&segmentation, text);
    debug!(
        "[ANALYZE] Statistics: sentences={} words={} lix={:.2}",
        stylometry.sentence_count, stylometry.word_count, quality.lix_score
    );
    Ok((stylometry, quality, extended))
}
