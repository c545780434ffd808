// N-gram Extractor
// Frequent bigrams of normalized tokens, ranked deterministically

use std::collections::HashMap;

use crate::models::NgramCount;
use super::calibration::NgramConfig;
use super::text_processor::{Segmentation, Token};

struct BigramTally {
    count: usize,
    // Surface form of the first occurrence
    display: String,
}

/// Top bigrams by count (descending), ties broken by the normalized bigram.
/// Bigrams seen fewer than twice are never reported.
pub fn top_bigrams(segmentation: &Segmentation, config: &NgramConfig) -> Vec<NgramCount> {
    let streams: Vec<Vec<&Token>> = if config.respect_sentence_boundaries {
        segmentation
            .sentences
            .iter()
            .map(|s| s.tokens.iter().collect())
            .collect()
    } else {
        vec![segmentation.tokens().collect()]
    };

    let mut tallies: HashMap<String, BigramTally> = HashMap::new();
    for stream in &streams {
        for pair in stream.windows(2) {
            let key = format!("{} {}", pair[0].normalized, pair[1].normalized);
            tallies
                .entry(key)
                .or_insert_with(|| BigramTally {
                    count: 0,
                    display: format!("{} {}", pair[0].text, pair[1].text),
                })
                .count += 1;
        }
    }

    let min_count = config.min_count.max(2);
    let mut ranked: Vec<(String, BigramTally)> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.count >= min_count)
        .collect();

    ranked.sort_by(|(key_a, a), (key_b, b)| b.count.cmp(&a.count).then_with(|| key_a.cmp(key_b)));

    ranked
        .into_iter()
        .take(config.top_k)
        .map(|(_, tally)| NgramCount {
            ngram: tally.display,
            count: tally.count,
        })
        .collect()
}
