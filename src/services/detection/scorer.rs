// Hybrid Authenticity Scorer
// Blends the perplexity signal with a stylometric sub-score into a verdict

use tracing::{debug, warn};

use crate::models::{AuthenticityVerdict, AuthorshipLabel, ConfidenceBand, StylometricProfile};
use crate::services::calibration::{CalibrationConfig, StylometricSubscoreConfig};
use crate::services::providers::ProviderError;

use super::bands::{confidence_level, perplexity_band, perplexity_label, ppx_signal};

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

/// AI-likeness from lexical features alone. Low diversity, low entropy and
/// few hapaxes push the score up.
pub fn stylometric_subscore(profile: &StylometricProfile, config: &StylometricSubscoreConfig) -> f64 {
    let features = [
        (config.ttr, profile.ttr),
        (config.entropy, profile.entropy),
        (config.vocab_richness, profile.vocab_richness),
    ];

    let total_weight: f64 = features.iter().map(|(scale, _)| scale.weight).sum();
    if total_weight <= 0.0 {
        return 0.5;
    }

    let weighted: f64 = features
        .iter()
        .map(|(scale, value)| scale.weight * (1.0 - scale.normalize(*value)))
        .sum();

    (weighted / total_weight).clamp(0.0, 1.0)
}

fn blend(ppx_signal: f64, subscore: f64, config: &CalibrationConfig) -> f64 {
    let w = &config.blend;
    let total = w.perplexity + w.stylometry;
    ((w.perplexity * ppx_signal + w.stylometry * subscore) / total).clamp(0.0, 1.0)
}

/// Verdict from a perplexity measurement. Band and label follow the raw
/// perplexity; the probabilities follow the blend.
pub fn score_with_perplexity(
    profile: &StylometricProfile,
    perplexity: f64,
    config: &CalibrationConfig,
) -> AuthenticityVerdict {
    let thresholds = &config.perplexity;
    let subscore = stylometric_subscore(profile, &config.stylometric);
    let signal = ppx_signal(perplexity, thresholds);
    let ai_probability = round4(blend(signal, subscore, config));
    let band = perplexity_band(perplexity, thresholds);

    debug!(
        "[SCORE] ppx={:.4} signal={:.4} stylo={:.4} ai={:.4} band={}",
        perplexity,
        signal,
        subscore,
        ai_probability,
        band.as_str()
    );

    AuthenticityVerdict {
        perplexity: Some(perplexity),
        ppx_signal: Some(round4(signal)),
        stylometric_subscore: round4(subscore),
        ai_probability,
        human_probability: 1.0 - ai_probability,
        label: perplexity_label(perplexity, thresholds),
        confidence_band: band,
        confidence: confidence_level(ai_probability, band, false, &config.confidence),
        degraded: false,
        warnings: Vec::new(),
    }
}

/// Verdict without a model measurement: stylometry only, always gray zone.
pub fn score_degraded(
    profile: &StylometricProfile,
    reason: &ProviderError,
    config: &CalibrationConfig,
) -> AuthenticityVerdict {
    let subscore = stylometric_subscore(profile, &config.stylometric);
    let ai_probability = round4(subscore);
    let band = ConfidenceBand::GrayZone;

    warn!("[SCORE] Degraded verdict: {}", reason);

    AuthenticityVerdict {
        perplexity: None,
        ppx_signal: None,
        stylometric_subscore: ai_probability,
        ai_probability,
        human_probability: 1.0 - ai_probability,
        label: if ai_probability > 0.5 {
            AuthorshipLabel::Ai
        } else {
            AuthorshipLabel::Human
        },
        confidence_band: band,
        confidence: confidence_level(ai_probability, band, true, &config.confidence),
        degraded: true,
        warnings: vec![format!("{}; verdict based on stylometry only", reason)],
    }
}

pub fn score_authenticity(
    profile: &StylometricProfile,
    perplexity: Result<f64, ProviderError>,
    config: &CalibrationConfig,
) -> AuthenticityVerdict {
    match perplexity {
        Ok(ppx) => score_with_perplexity(profile, ppx, config),
        Err(e) => score_degraded(profile, &e, config),
    }
}
