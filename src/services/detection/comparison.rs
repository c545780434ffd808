// Comparison Logic
// Stylometric similarity between two profiles

use crate::models::{MetricDifference, SimilarityResult, StylometricProfile};
use crate::services::calibration::SimilarityConfig;

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

/// Per-metric normalized differences, in fixed order: MATTR, lexical
/// density, entropy, average sentence length.
pub fn metric_differences(
    a: &StylometricProfile,
    b: &StylometricProfile,
    config: &SimilarityConfig,
) -> Vec<MetricDifference> {
    let metrics = [
        ("ttr", a.ttr, b.ttr, 1.0),
        ("lexical_density", a.lexical_density, b.lexical_density, 1.0),
        ("entropy", a.entropy, b.entropy, config.entropy_scale),
        (
            "avg_sentence_length",
            a.avg_sentence_length,
            b.avg_sentence_length,
            config.sentence_length_scale,
        ),
    ];

    metrics
        .iter()
        .map(|&(metric, value_a, value_b, scale)| MetricDifference {
            metric: metric.to_string(),
            value_a,
            value_b,
            normalized_diff: ((value_a - value_b).abs() / scale).clamp(0.0, 1.0),
        })
        .collect()
}

pub fn similarity_score(differences: &[MetricDifference]) -> f64 {
    if differences.is_empty() {
        return 1.0;
    }
    let mean = differences.iter().map(|d| d.normalized_diff).sum::<f64>() / differences.len() as f64;
    round4((1.0 - mean).clamp(0.0, 1.0))
}

pub fn compare_profiles(
    a: StylometricProfile,
    b: StylometricProfile,
    config: &SimilarityConfig,
) -> SimilarityResult {
    let mut breakdown = metric_differences(&a, &b, config);
    let similarity_score = similarity_score(&breakdown);
    for diff in &mut breakdown {
        diff.normalized_diff = round4(diff.normalized_diff);
    }

    SimilarityResult {
        similarity_band: config.tiers.band_for(similarity_score),
        similarity_score,
        profile_a: a,
        profile_b: b,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimilarityBand;

    fn profile(ttr: f64, density: f64, entropy: f64, asl: f64) -> StylometricProfile {
        StylometricProfile {
            word_count: 120,
            sentence_count: 10,
            unique_words: 80,
            ttr,
            lexical_density: density,
            vocab_richness: 0.5,
            entropy,
            avg_sentence_length: asl,
            top_ngrams: vec![],
        }
    }

    #[test]
    fn test_identical_profiles_are_fully_similar() {
        let p = profile(0.7, 0.6, 6.0, 14.0);
        let result = compare_profiles(p.clone(), p, &SimilarityConfig::default());
        assert_eq!(result.similarity_score, 1.0);
        assert_eq!(result.similarity_band, SimilarityBand::VeryHigh);
        assert!(result.breakdown.iter().all(|d| d.normalized_diff == 0.0));
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = profile(0.72, 0.55, 6.4, 11.0);
        let b = profile(0.51, 0.68, 7.9, 23.5);
        let config = SimilarityConfig::default();
        let ab = compare_profiles(a.clone(), b.clone(), &config);
        let ba = compare_profiles(b, a, &config);
        assert_eq!(ab.similarity_score, ba.similarity_score);
        assert_eq!(ab.similarity_band, ba.similarity_band);
    }

    #[test]
    fn test_scaled_differences() {
        let a = profile(0.5, 0.5, 3.0, 10.0);
        let b = profile(0.7, 0.6, 6.25, 20.0);
        let result = compare_profiles(a, b, &SimilarityConfig::default());
        let diffs: Vec<f64> = result.breakdown.iter().map(|d| d.normalized_diff).collect();
        assert_eq!(diffs, vec![0.2, 0.1, 0.5, 0.5]);
        // 1 - mean(0.2, 0.1, 0.5, 0.5)
        assert_eq!(result.similarity_score, 0.675);
        assert_eq!(result.similarity_band, SimilarityBand::Moderate);
    }

    #[test]
    fn test_differences_beyond_scale_are_capped() {
        let a = profile(0.0, 0.0, 0.0, 0.0);
        let b = profile(1.0, 1.0, 20.0, 100.0);
        let result = compare_profiles(a, b, &SimilarityConfig::default());
        assert_eq!(result.similarity_score, 0.0);
        assert_eq!(result.similarity_band, SimilarityBand::VeryLow);
    }
}
