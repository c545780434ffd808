// Perplexity Bands
// Thresholds decide the category; blended probabilities only set the magnitude.

use crate::models::{AuthorshipLabel, ConfidenceBand, ConfidenceLevel};
use crate::services::calibration::{ConfidenceCutoffs, PerplexityThresholds};

/// At or below `t_low` is AI, at or above `t_high` is human.
pub fn perplexity_band(perplexity: f64, thresholds: &PerplexityThresholds) -> ConfidenceBand {
    if perplexity <= thresholds.t_low {
        ConfidenceBand::Ai
    } else if perplexity >= thresholds.t_high {
        ConfidenceBand::Human
    } else {
        ConfidenceBand::GrayZone
    }
}

/// Label for a raw perplexity. Inside the gray zone the midpoint between the
/// thresholds decides, and the midpoint itself reads as human.
pub fn perplexity_label(perplexity: f64, thresholds: &PerplexityThresholds) -> AuthorshipLabel {
    match perplexity_band(perplexity, thresholds) {
        ConfidenceBand::Ai => AuthorshipLabel::Ai,
        ConfidenceBand::Human => AuthorshipLabel::Human,
        ConfidenceBand::GrayZone => {
            if perplexity < thresholds.midpoint() {
                AuthorshipLabel::Ai
            } else {
                AuthorshipLabel::Human
            }
        }
    }
}

/// Perplexity mapped linearly onto an AI probability: 1.0 at `t_low` and
/// below, 0.0 at `t_high` and above.
pub fn ppx_signal(perplexity: f64, thresholds: &PerplexityThresholds) -> f64 {
    if perplexity <= thresholds.t_low {
        return 1.0;
    }
    if perplexity >= thresholds.t_high {
        return 0.0;
    }
    ((thresholds.t_high - perplexity) / (thresholds.t_high - thresholds.t_low)).clamp(0.0, 1.0)
}

pub fn confidence_level(
    ai_probability: f64,
    band: ConfidenceBand,
    degraded: bool,
    cutoffs: &ConfidenceCutoffs,
) -> ConfidenceLevel {
    if degraded || band == ConfidenceBand::GrayZone {
        return ConfidenceLevel::Low;
    }
    let strength = ai_probability.max(1.0 - ai_probability);
    if strength >= cutoffs.high {
        ConfidenceLevel::High
    } else if strength >= cutoffs.medium {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> PerplexityThresholds {
        PerplexityThresholds { t_low: 30.0, t_high: 40.0 }
    }

    #[test]
    fn test_threshold_endpoints_are_inclusive() {
        let t = thresholds();
        assert_eq!(perplexity_band(30.0, &t), ConfidenceBand::Ai);
        assert_eq!(perplexity_label(30.0, &t), AuthorshipLabel::Ai);
        assert_eq!(perplexity_band(40.0, &t), ConfidenceBand::Human);
        assert_eq!(perplexity_label(40.0, &t), AuthorshipLabel::Human);
        assert_eq!(perplexity_band(30.0001, &t), ConfidenceBand::GrayZone);
        assert_eq!(perplexity_band(39.9999, &t), ConfidenceBand::GrayZone);
    }

    #[test]
    fn test_gray_zone_midpoint_resolves_to_human() {
        let t = thresholds();
        assert_eq!(perplexity_band(35.0, &t), ConfidenceBand::GrayZone);
        assert_eq!(perplexity_label(35.0, &t), AuthorshipLabel::Human);
        assert_eq!(perplexity_label(34.99, &t), AuthorshipLabel::Ai);
        assert_eq!(perplexity_label(35.01, &t), AuthorshipLabel::Human);
    }

    #[test]
    fn test_default_calibration_thresholds() {
        let t = PerplexityThresholds::default();
        assert_eq!(perplexity_band(32.03, &t), ConfidenceBand::Ai);
        assert_eq!(perplexity_band(41.0623, &t), ConfidenceBand::Human);
        assert_eq!(perplexity_label(t.midpoint(), &t), AuthorshipLabel::Human);
    }

    #[test]
    fn test_ppx_signal_is_linear_between_thresholds() {
        let t = thresholds();
        assert_eq!(ppx_signal(10.0, &t), 1.0);
        assert_eq!(ppx_signal(30.0, &t), 1.0);
        assert!((ppx_signal(32.5, &t) - 0.75).abs() < 1e-12);
        assert!((ppx_signal(35.0, &t) - 0.5).abs() < 1e-12);
        assert_eq!(ppx_signal(40.0, &t), 0.0);
        assert_eq!(ppx_signal(400.0, &t), 0.0);
    }

    #[test]
    fn test_confidence_level() {
        let cutoffs = ConfidenceCutoffs::default();
        assert_eq!(confidence_level(0.9, ConfidenceBand::Ai, false, &cutoffs), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.1, ConfidenceBand::Human, false, &cutoffs), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.7, ConfidenceBand::Ai, false, &cutoffs), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.55, ConfidenceBand::Ai, false, &cutoffs), ConfidenceLevel::Low);
        assert_eq!(confidence_level(0.95, ConfidenceBand::GrayZone, false, &cutoffs), ConfidenceLevel::Low);
        assert_eq!(confidence_level(0.95, ConfidenceBand::GrayZone, true, &cutoffs), ConfidenceLevel::Low);
    }
}
