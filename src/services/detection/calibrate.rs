// Threshold Derivation
// Youden-optimal perplexity cut-points from a labeled corpus

use thiserror::Error;
use tracing::info;

use crate::models::{AuthorshipLabel, LabeledSample, ThresholdReport};

pub const DEFAULT_GRAY_RATIO: f64 = 0.78;

#[derive(Error, Debug, PartialEq)]
pub enum CalibrationError {
    #[error("calibration corpus is empty")]
    EmptyCorpus,
    #[error("calibration corpus has no {0} samples")]
    MissingClass(&'static str),
    #[error("sample {index} has invalid perplexity {value}")]
    InvalidSample { index: usize, value: f64 },
    #[error("gray ratio must be in (0, 1), got {0}")]
    InvalidGrayRatio(f64),
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

/// Mann-Whitney AUC with AI as the positive class and lower perplexity as
/// the more AI-like score. Ties count half.
pub fn roc_auc(ai: &[f64], human: &[f64]) -> f64 {
    if ai.is_empty() || human.is_empty() {
        return 0.5;
    }
    let mut wins = 0.0;
    for &a in ai {
        for &h in human {
            if a < h {
                wins += 1.0;
            } else if a == h {
                wins += 0.5;
            }
        }
    }
    wins / (ai.len() * human.len()) as f64
}

struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

// Predict AI iff perplexity <= threshold
fn confusion_at(threshold: f64, ai: &[f64], human: &[f64]) -> Confusion {
    let tp = ai.iter().filter(|&&p| p <= threshold).count();
    let fp = human.iter().filter(|&&p| p <= threshold).count();
    Confusion {
        tp,
        fp,
        tn: human.len() - fp,
        fn_: ai.len() - tp,
    }
}

/// Derive suggested thresholds: `t_high` is the Youden-optimal cut and
/// `t_low` sits `gray_ratio` of the way down to zero.
pub fn derive_thresholds(samples: &[LabeledSample], gray_ratio: f64) -> Result<ThresholdReport, CalibrationError> {
    if samples.is_empty() {
        return Err(CalibrationError::EmptyCorpus);
    }
    if !(gray_ratio > 0.0 && gray_ratio < 1.0) {
        return Err(CalibrationError::InvalidGrayRatio(gray_ratio));
    }

    let mut ai = Vec::new();
    let mut human = Vec::new();
    for (index, sample) in samples.iter().enumerate() {
        if !sample.perplexity.is_finite() || sample.perplexity <= 0.0 {
            return Err(CalibrationError::InvalidSample {
                index,
                value: sample.perplexity,
            });
        }
        match sample.label {
            AuthorshipLabel::Ai => ai.push(sample.perplexity),
            AuthorshipLabel::Human => human.push(sample.perplexity),
        }
    }
    if ai.is_empty() {
        return Err(CalibrationError::MissingClass("ai"));
    }
    if human.is_empty() {
        return Err(CalibrationError::MissingClass("human"));
    }

    let mut candidates: Vec<f64> = samples.iter().map(|s| s.perplexity).collect();
    candidates.sort_by(|a, b| a.total_cmp(b));
    candidates.dedup();

    // Ties in J keep the lowest cut
    let mut best_threshold = candidates[0];
    let mut best_j = f64::NEG_INFINITY;
    for &t in &candidates {
        let c = confusion_at(t, &ai, &human);
        let tpr = c.tp as f64 / ai.len() as f64;
        let fpr = c.fp as f64 / human.len() as f64;
        let j = tpr - fpr;
        if j > best_j {
            best_j = j;
            best_threshold = t;
        }
    }

    let c = confusion_at(best_threshold, &ai, &human);
    let total = samples.len() as f64;
    let accuracy = (c.tp + c.tn) as f64 / total;
    let precision = if c.tp + c.fp > 0 {
        c.tp as f64 / (c.tp + c.fp) as f64
    } else {
        0.0
    };
    let recall = c.tp as f64 / ai.len() as f64;
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    let auc = roc_auc(&ai, &human);

    info!(
        "[CALIBRATE] n_ai={} n_human={} auc={:.4} t*={:.4} J={:.4}",
        ai.len(),
        human.len(),
        auc,
        best_threshold,
        best_j
    );

    Ok(ThresholdReport {
        optimal_threshold: best_threshold,
        t_low: round2(best_threshold * gray_ratio),
        t_high: best_threshold,
        auc: round4(auc),
        accuracy: round4(accuracy),
        precision: round4(precision),
        recall: round4(recall),
        f1: round4(f1),
        confusion_matrix: [[c.tn, c.fp], [c.fn_, c.tp]],
        n_human: human.len(),
        n_ai: ai.len(),
    })
}
