// Lexical Statistics
// Deterministic stylometric and readability metrics over a segmented text

use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use crate::models::{ExtendedMetrics, QualityProfile, StylometricProfile};
use super::calibration::CalibrationConfig;
use super::errors::AnalysisError;
use super::ngrams::top_bigrams;
use super::text_processor::Segmentation;

const MTLD_THRESHOLD: f64 = 0.72;
const MTLD_MIN_TOKENS: usize = 50;

const PUNCTUATION_MARKS: [(char, &str); 17] = [
    (',', "comma"),
    (';', "semicolon"),
    (':', "colon"),
    ('\u{2014}', "em_dash"),
    ('\u{2013}', "en_dash"),
    ('-', "hyphen"),
    ('\u{2026}', "ellipsis"),
    ('.', "period"),
    ('!', "exclamation"),
    ('?', "question"),
    ('"', "quote"),
    ('\u{201e}', "low_quote"),
    ('\u{201d}', "right_quote"),
    ('\u{2019}', "right_apostrophe"),
    ('\'', "apostrophe"),
    ('(', "left_paren"),
    (')', "right_paren"),
];

fn dialogue_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[\u{2014}\u{2013}-]\s+\S").expect("dialogue regex"))
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64).clamp(0.0, 1.0)
}

fn frequencies<'a>(tokens: &[&'a str]) -> HashMap<&'a str, usize> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for t in tokens {
        *freq.entry(*t).or_insert(0) += 1;
    }
    freq
}

/// Compute the stylometric and quality profiles of a segmented text.
/// Fails with `InsufficientTokens` when the text has no word tokens.
pub fn compute_profile(
    segmentation: &Segmentation,
    config: &CalibrationConfig,
) -> Result<(StylometricProfile, QualityProfile), AnalysisError> {
    let tokens = segmentation.normalized_tokens();
    let word_count = tokens.len();
    if word_count == 0 {
        return Err(AnalysisError::InsufficientTokens);
    }

    let sentence_count = segmentation.sentence_count().max(1);
    let freq = frequencies(&tokens);
    let unique_words = freq.len();
    let hapax = freq.values().filter(|&&c| c == 1).count();

    let stop_words: HashSet<&str> = config.lexical.stop_words.iter().map(String::as_str).collect();
    let content_tokens = tokens.iter().filter(|t| !stop_words.contains(**t)).count();

    let avg_sentence_length = word_count as f64 / sentence_count as f64;

    let stylometry = StylometricProfile {
        word_count,
        sentence_count: segmentation.sentence_count(),
        unique_words,
        ttr: mattr(&tokens, config.lexical.mattr_window),
        lexical_density: ratio(content_tokens, word_count),
        vocab_richness: ratio(hapax, unique_words),
        entropy: shannon_entropy(&freq, word_count),
        avg_sentence_length,
        top_ngrams: top_bigrams(segmentation, &config.ngrams),
    };

    let long_words = segmentation.long_word_count;
    let lix_score = avg_sentence_length + 100.0 * long_words as f64 / word_count as f64;
    let (lix_label, lix_description) = match config.lexical.lix.band_for(lix_score) {
        Some(band) => (band.label.clone(), band.description.clone()),
        None => (String::new(), String::new()),
    };

    let punctuation = segmentation.punctuation_count;
    let total_chars: usize = tokens.iter().map(|t| t.chars().count()).sum();

    let quality = QualityProfile {
        lix_score,
        lix_label,
        lix_description,
        punctuation_density: ratio(punctuation, word_count + punctuation),
        long_word_ratio: ratio(long_words, word_count),
        avg_word_length: total_chars as f64 / word_count as f64,
    };

    Ok((stylometry, quality))
}

/// Moving-average type-token ratio over windows of `window` tokens sliding by
/// one. Texts shorter than the window fall back to the plain type-token ratio.
pub fn mattr(tokens: &[&str], window: usize) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    if window == 0 || tokens.len() < window {
        let unique: HashSet<&str> = tokens.iter().copied().collect();
        return ratio(unique.len(), tokens.len());
    }

    let mut counts = frequencies(&tokens[..window]);
    let mut total = counts.len() as f64 / window as f64;

    for i in window..tokens.len() {
        let outgoing = tokens[i - window];
        if let Some(count) = counts.get_mut(outgoing) {
            *count -= 1;
            if *count == 0 {
                counts.remove(outgoing);
            }
        }
        *counts.entry(tokens[i]).or_insert(0) += 1;
        total += counts.len() as f64 / window as f64;
    }

    let windows = tokens.len() - window + 1;
    (total / windows as f64).clamp(0.0, 1.0)
}

/// Shannon entropy in bits of a word frequency table.
pub fn shannon_entropy(freq: &HashMap<&str, usize>, total: usize) -> f64 {
    if freq.len() <= 1 || total == 0 {
        return 0.0;
    }
    let n = total as f64;
    freq.values()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Supplementary literary measures; none of them feed the authenticity score.
pub fn compute_extended_metrics(segmentation: &Segmentation, text: &str) -> ExtendedMetrics {
    let tokens = segmentation.normalized_tokens();
    let freq = frequencies(&tokens);
    let entropy = shannon_entropy(&freq, tokens.len());
    let vocabulary = freq.len();

    let entropy_norm = if vocabulary > 1 {
        (entropy / (vocabulary as f64).log2()).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let lengths: Vec<usize> = segmentation.sentences.iter().map(|s| s.tokens.len()).collect();

    ExtendedMetrics {
        mtld: if tokens.len() >= MTLD_MIN_TOKENS {
            mtld(&tokens, MTLD_THRESHOLD)
        } else {
            0.0
        },
        yules_k: yules_k(&freq, tokens.len()),
        entropy_norm,
        sentence_length_std: population_std(&lengths),
        dialogue_ratio: dialogue_ratio(text),
        punctuation_per_1k_chars: punctuation_profile(text),
    }
}

/// Per-mark punctuation rates per 1000 characters. Marks that never occur are
/// left out; the `dash` aggregate is always present for non-empty text.
pub fn punctuation_profile(text: &str) -> BTreeMap<String, f64> {
    let total_chars = text.chars().count();
    if total_chars == 0 {
        return BTreeMap::new();
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in text.chars() {
        if PUNCTUATION_MARKS.iter().any(|(mark, _)| *mark == c) {
            *counts.entry(c).or_insert(0) += 1;
        }
    }

    let per_1k = |count: usize| (count as f64 / total_chars as f64 * 1000.0 * 10000.0).round() / 10000.0;

    let mut profile: BTreeMap<String, f64> = PUNCTUATION_MARKS
        .iter()
        .filter_map(|(mark, name)| counts.get(mark).map(|&n| (name.to_string(), per_1k(n))))
        .collect();

    let dashes: usize = ['\u{2014}', '\u{2013}', '-']
        .iter()
        .filter_map(|c| counts.get(c))
        .sum();
    profile.insert("dash".to_string(), per_1k(dashes));
    profile
}

/// Measure of textual lexical diversity, averaged over a forward and a backward pass.
pub fn mtld(tokens: &[&str], threshold: f64) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let forward = mtld_pass(tokens.iter().copied(), tokens.len(), threshold);
    let backward = mtld_pass(tokens.iter().rev().copied(), tokens.len(), threshold);
    (forward + backward) / 2.0
}

fn mtld_pass<'a>(tokens: impl Iterator<Item = &'a str>, len: usize, threshold: f64) -> f64 {
    let mut types: HashSet<&str> = HashSet::new();
    let mut token_count = 0usize;
    let mut factors = 0.0;

    for t in tokens {
        token_count += 1;
        types.insert(t);
        if types.len() as f64 / token_count as f64 <= threshold {
            factors += 1.0;
            types.clear();
            token_count = 0;
        }
    }

    // Partial factor for the unfinished segment
    if token_count > 0 {
        let ttr = types.len() as f64 / token_count as f64;
        if ttr < 1.0 {
            factors += (1.0 - ttr) / (1.0 - threshold).max(1e-9);
        }
    }

    len as f64 / factors.max(1e-9)
}

/// Yule's K: vocabulary concentration, higher for more repetitive texts.
pub fn yules_k(freq: &HashMap<&str, usize>, total: usize) -> f64 {
    if total <= 1 {
        return 0.0;
    }
    let s: usize = freq.values().map(|&c| c * (c - 1)).sum();
    1e4 * s as f64 / (total as f64 * (total - 1) as f64)
}

fn population_std(values: &[usize]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    let variance = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Share of non-empty lines that open with a dialogue dash.
pub fn dialogue_ratio(text: &str) -> f64 {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let dialogue = lines.iter().filter(|l| dialogue_line_re().is_match(l)).count();
    ratio(dialogue, lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::text_processor::segment;

    fn profile(text: &str) -> (StylometricProfile, QualityProfile) {
        let config = CalibrationConfig::default();
        let seg = segment(text, &config.segmenter);
        compute_profile(&seg, &config).unwrap()
    }

    #[test]
    fn test_distinct_words_entropy_is_log2_n() {
        let (stylo, _) = profile("alpha beta gamma delta epsilon zeta eta theta.");
        assert_eq!(stylo.unique_words, 8);
        assert!((stylo.entropy - 3.0).abs() < 1e-9);
        assert_eq!(stylo.vocab_richness, 1.0);
        assert_eq!(stylo.ttr, 1.0);
    }

    #[test]
    fn test_single_repeated_word() {
        let (stylo, _) = profile("echo echo echo echo echo.");
        assert_eq!(stylo.entropy, 0.0);
        assert_eq!(stylo.vocab_richness, 0.0);
        assert_eq!(stylo.unique_words, 1);
        assert!(stylo.top_ngrams.iter().all(|n| n.count >= 2));
        assert_eq!(stylo.top_ngrams[0].ngram, "echo echo");
    }

    #[test]
    fn test_lix_two_sentences_twenty_words_four_long() {
        let text = "aa bb cc dd ee ff gg hh abcdefg bcdefgh. \
                    ii jj kk ll mm nn oo pp cdefghi defghij.";
        let (stylo, quality) = profile(text);
        assert_eq!(stylo.word_count, 20);
        assert_eq!(stylo.sentence_count, 2);
        assert!((quality.lix_score - 30.0).abs() < 1e-9);
        assert_eq!(quality.lix_label, "easy");
        assert!((quality.long_word_ratio - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_token_stream_is_insufficient() {
        let config = CalibrationConfig::default();
        let seg = segment("123 456 ... 789 !!!", &config.segmenter);
        assert!(matches!(
            compute_profile(&seg, &config),
            Err(AnalysisError::InsufficientTokens)
        ));
    }

    #[test]
    fn test_lexical_density_uses_stop_words() {
        // "i", "w", "na" are stop words
        let (stylo, _) = profile("kot i pies w domu na wsi.");
        assert!((stylo.lexical_density - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_punctuation_density_and_word_length() {
        let (_, quality) = profile("Ala, ma kota!");
        // three words, two punctuation marks
        assert!((quality.punctuation_density - 0.4).abs() < 1e-12);
        assert!((quality.avg_word_length - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mattr_falls_back_below_window() {
        let tokens = vec!["a", "b", "a", "c"];
        assert_eq!(mattr(&tokens, 50), 0.75);
    }

    #[test]
    fn test_mattr_sliding_window() {
        let tokens = vec!["a", "b", "a", "b", "c"];
        // windows of 2: ab ba ab bc -> all ratio 1.0
        assert_eq!(mattr(&tokens, 2), 1.0);
        // windows of 3: aba(2/3) bab(2/3) abc(3/3)
        assert!((mattr(&tokens, 3) - (2.0 / 3.0 + 2.0 / 3.0 + 1.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mattr_window_equal_to_length_matches_ttr() {
        let tokens = vec!["a", "b", "a", "c"];
        assert_eq!(mattr(&tokens, 4), 0.75);
    }

    #[test]
    fn test_avg_sentence_length() {
        let (stylo, _) = profile("one two three. four five six seven eight nine.");
        assert_eq!(stylo.avg_sentence_length, 4.5);
    }

    #[test]
    fn test_yules_k_and_dialogue_ratio() {
        let tokens = vec!["a", "a", "b", "c"];
        let freq = frequencies(&tokens);
        // sum f(f-1) = 2, N(N-1) = 12
        assert!((yules_k(&freq, 4) - 1e4 * 2.0 / 12.0).abs() < 1e-9);

        let text = "\u{2014} Dzień dobry.\nNarracja trwa.\n- Do widzenia.\n\n";
        assert!((dialogue_ratio(text) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_extended_metrics_short_text_skips_mtld() {
        let config = CalibrationConfig::default();
        let text = "one two three. four five.";
        let seg = segment(text, &config.segmenter);
        let extended = compute_extended_metrics(&seg, text);
        assert_eq!(extended.mtld, 0.0);
        assert!((extended.entropy_norm - 1.0).abs() < 1e-9);
        assert!((extended.sentence_length_std - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mtld_on_repetitive_text_is_low() {
        let repetitive: Vec<&str> = ["la", "di", "da"].iter().cycle().take(90).copied().collect();
        let varied: Vec<String> = (0..90).map(|i| format!("w{}", i)).collect();
        let varied_refs: Vec<&str> = varied.iter().map(String::as_str).collect();
        assert!(mtld(&repetitive, MTLD_THRESHOLD) < mtld(&varied_refs, MTLD_THRESHOLD));
    }

    #[test]
    fn test_punctuation_profile_rates() {
        // 40 characters: two commas, one em dash, one hyphen, one period
        let text = "\u{2014} Tak, tak, to jest dobrze-znane.  ";
        let text = format!("{:<40}", text.trim_end());
        assert_eq!(text.chars().count(), 40);

        let profile = punctuation_profile(&text);
        assert_eq!(profile["comma"], 50.0);
        assert_eq!(profile["em_dash"], 25.0);
        assert_eq!(profile["hyphen"], 25.0);
        assert_eq!(profile["period"], 25.0);
        assert_eq!(profile["dash"], 50.0);
        assert!(!profile.contains_key("semicolon"));
    }

    #[test]
    fn test_punctuation_profile_empty_and_dashless() {
        assert!(punctuation_profile("").is_empty());

        let profile = punctuation_profile("bez kresek");
        assert_eq!(profile.len(), 1);
        assert_eq!(profile["dash"], 0.0);
    }
}
