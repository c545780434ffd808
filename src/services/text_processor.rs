// Text Processing Service
// Normalization, sentence segmentation and word tokenization

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

use super::calibration::SegmenterConfig;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{Alphabetic}'\-]+").expect("word regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0B\x0C\u{00A0}\u{3000}]+").expect("whitespace regex"))
}

fn control_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("control char regex"))
}

fn line_break_hyphen_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\n(\p{Ll})").expect("hyphenation regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank lines regex"))
}

fn space_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("space run regex"))
}

/// Normalize typography and whitespace before analysis.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // Typographic quotes and apostrophes
    let mut s = text
        .replace(&['\u{201c}', '\u{201d}', '\u{201e}'][..], "\"")
        .replace(&['\u{2018}', '\u{2019}'][..], "'");

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    // Collapse horizontal whitespace, including non-breaking spaces
    s = horizontal_ws_re().replace_all(&s, " ").into_owned();

    s.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Clean text coming out of PDF/DOCX extraction.
pub fn clean_extracted_text(text: &str) -> String {
    let s = text.replace("\r\n", "\n");
    let s = control_chars_re().replace_all(&s, "");
    // Words hyphenated across a line break
    let s = line_break_hyphen_re().replace_all(&s, "$1");
    let s = blank_lines_re().replace_all(&s, "\n\n");
    let s = space_run_re().replace_all(&s, " ");
    s.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface form with original case.
    pub text: String,
    /// Lowercased form used for statistics.
    pub normalized: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    /// Byte offsets into the segmented text.
    pub start: usize,
    pub end: usize,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segmentation {
    pub sentences: Vec<Sentence>,
    pub punctuation_count: usize,
    pub long_word_count: usize,
}

impl Segmentation {
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.sentences.iter().flat_map(|s| s.tokens.iter())
    }

    pub fn normalized_tokens(&self) -> Vec<&str> {
        self.tokens().map(|t| t.normalized.as_str()).collect()
    }

    pub fn word_count(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }
}

/// Word tokens: maximal runs of letters, apostrophes and hyphens, with
/// leading/trailing apostrophes and hyphens stripped.
pub fn tokenize(text: &str) -> Vec<Token> {
    word_re()
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = m.as_str().trim_matches(|c| c == '\'' || c == '-');
            if trimmed.is_empty() {
                return None;
            }
            Some(Token {
                text: trimmed.to_string(),
                normalized: trimmed.to_lowercase(),
            })
        })
        .collect()
}

pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{2026}' | '\u{2014}' | '\u{2013}' | '\u{201e}' | '\u{201d}' | '\u{201c}' | '\u{ab}' | '\u{bb}' | '\u{2018}' | '\u{2019}'
        )
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\u{2026}')
}

/// Byte ranges of sentence candidates. A run of terminal punctuation closes
/// one sentence unless a digit touches it or a single period follows an
/// abbreviation or an initial.
pub fn split_sentence_spans(text: &str, config: &SegmenterConfig) -> Vec<Range<usize>> {
    let abbreviations: HashSet<String> = config
        .abbreviations
        .iter()
        .map(|a| a.trim_end_matches('.').to_lowercase())
        .collect();

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < chars.len() && is_terminal(chars[i].1) {
            i += 1;
        }

        let before = run_start.checked_sub(1).map(|p| chars[p].1);
        let after = chars.get(i).map(|(_, c)| *c);
        let touches_digit = before.map_or(false, |c| c.is_ascii_digit())
            || after.map_or(false, |c| c.is_ascii_digit());

        let single_period = i - run_start == 1 && chars[run_start].1 == '.';
        let run_byte = chars[run_start].0;
        let after_abbreviation =
            single_period && ends_with_abbreviation(&text[start..run_byte], &abbreviations);

        if touches_digit || after_abbreviation {
            continue;
        }

        let end = chars.get(i).map_or(text.len(), |(b, _)| *b);
        spans.push(start..end);
        start = end;
    }

    if start < text.len() {
        spans.push(start..text.len());
    }

    spans
}

fn ends_with_abbreviation(before: &str, abbreviations: &HashSet<String>) -> bool {
    let word: String = before
        .chars()
        .rev()
        .take_while(|c| c.is_alphabetic())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if word.is_empty() {
        return false;
    }

    // Initials such as "J. Kowalski"
    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    abbreviations.contains(&word.to_lowercase())
}

/// Byte ranges of lines longer than `min_chars` characters once trimmed.
pub fn verse_line_spans(text: &str, min_chars: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut offset = 0usize;
    for line in text.split('\n') {
        let end = offset + line.len();
        if line.trim().chars().count() > min_chars {
            spans.push(offset..end);
        }
        offset = end + 1;
    }
    spans
}

fn sentences_from_spans(text: &str, spans: Vec<Range<usize>>) -> Vec<Sentence> {
    spans
        .into_iter()
        .filter_map(|span| {
            let slice = &text[span.clone()];
            let tokens = tokenize(slice);
            if tokens.is_empty() {
                return None;
            }
            Some(Sentence {
                text: slice.trim().to_string(),
                start: span.start,
                end: span.end,
                tokens,
            })
        })
        .collect()
}

/// Split text into sentences of word tokens and count punctuation and long words.
/// Segments without any word token are dropped; when nothing remains the whole
/// input is treated as one sentence. Text with very few sentence ends for its
/// length (verse) is split on lines instead, when that yields more segments.
pub fn segment(text: &str, config: &SegmenterConfig) -> Segmentation {
    let mut sentences = sentences_from_spans(text, split_sentence_spans(text, config));

    let word_count = tokenize(text).len();
    if word_count > 0 && (sentences.len() as f64) < word_count as f64 / config.verse_words_per_sentence {
        let lines = sentences_from_spans(text, verse_line_spans(text, config.min_verse_line_chars));
        if lines.len() > sentences.len() {
            sentences = lines;
        }
    }

    if sentences.is_empty() && !text.trim().is_empty() {
        sentences.push(Sentence {
            text: text.trim().to_string(),
            start: 0,
            end: text.len(),
            tokens: tokenize(text),
        });
    }

    let mut segmentation = Segmentation {
        sentences,
        punctuation_count: 0,
        long_word_count: 0,
    };

    segmentation.long_word_count = segmentation
        .tokens()
        .filter(|t| t.normalized.chars().count() >= config.long_word_min_chars)
        .count();

    // Apostrophes and hyphens inside words are part of the token, not punctuation
    let total_punct = text.chars().filter(|c| is_punctuation(*c)).count();
    let inside_tokens: usize = segmentation
        .tokens()
        .map(|t| t.text.chars().filter(|c| *c == '\'' || *c == '-').count())
        .sum();
    segmentation.punctuation_count = total_punct.saturating_sub(inside_tokens);

    segmentation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SegmenterConfig {
        SegmenterConfig::default()
    }

    fn sentence_texts(text: &str) -> Vec<String> {
        segment(text, &config())
            .sentences
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_normalize_text() {
        let input = "\u{201e}Tak\u{201d}\u{a0}\u{a0}powiedział  it\u{2019}s\r\n  done ";
        assert_eq!(normalize_text(input), "\"Tak\" powiedział it's\ndone");
    }

    #[test]
    fn test_clean_extracted_text() {
        let input = "infor-\nmation\x00 here\n\n\n\nNext   part -\nKept";
        assert_eq!(clean_extracted_text(input), "information here\n\nNext part -\nKept");
    }

    #[test]
    fn test_tokenize_keeps_inner_apostrophes_and_hyphens() {
        let tokens = tokenize("Don't stop - well-known 'quoted' Łódź");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Don't", "stop", "well-known", "quoted", "Łódź"]);
        assert_eq!(tokens[4].normalized, "łódź");
    }

    #[test]
    fn test_decimal_does_not_split() {
        let texts = sentence_texts("Pi is 3.14 today. Next one.");
        assert_eq!(texts, vec!["Pi is 3.14 today.", "Next one."]);
    }

    #[test]
    fn test_terminal_run_is_one_boundary() {
        let texts = sentence_texts("Wait... What?! Yes.");
        assert_eq!(texts, vec!["Wait...", "What?!", "Yes."]);
    }

    #[test]
    fn test_no_terminal_punctuation_is_one_sentence() {
        let seg = segment("just words without an ending", &config());
        assert_eq!(seg.sentence_count(), 1);
        assert_eq!(seg.word_count(), 5);
    }

    #[test]
    fn test_abbreviation_and_initial_do_not_split() {
        let texts = sentence_texts("Spotkał dr. Nowaka wczoraj. J. Kowalski napisał list. Koniec.");
        assert_eq!(
            texts,
            vec!["Spotkał dr. Nowaka wczoraj.", "J. Kowalski napisał list.", "Koniec."]
        );
    }

    #[test]
    fn test_token_free_segments_are_dropped() {
        let seg = segment("First one. ... Second one.", &config());
        assert_eq!(seg.sentence_count(), 2);
    }

    #[test]
    fn test_punctuation_excludes_inner_hyphens() {
        let seg = segment("Hello, world! Well-known.", &config());
        assert_eq!(seg.punctuation_count, 3);
    }

    #[test]
    fn test_long_word_count() {
        let seg = segment("extraordinary cat elephant planets", &config());
        // "planets" has exactly seven characters
        assert_eq!(seg.long_word_count, 3);
    }

    #[test]
    fn test_sentence_offsets_cover_text() {
        let text = "Ala ma kota. Kot ma Alę!";
        let seg = segment(text, &config());
        assert_eq!(seg.sentences[0].start, 0);
        assert_eq!(seg.sentences[1].end, text.len());
        assert_eq!(text[seg.sentences[1].start..seg.sentences[1].end].trim(), "Kot ma Alę!");
    }

    #[test]
    fn test_verse_is_split_on_lines() {
        let poem = "Litwo, ojczyzno moja, ty jesteś jak zdrowie\n\
            ile cię trzeba cenić, ten tylko się dowie\n\
            kto cię stracił, dziś piękność twą w całej ozdobie\n\
            widzę i opisuję, bo tęsknię po tobie\n\
            Panno święta, co jasnej bronisz Częstochowy\n\
            i w Ostrej świecisz Bramie, ty co gród zamkowy\n\
            nowogródzki ochraniasz z jego wiernym ludem\n\
            ok\n\
            jak mnie dziecko do zdrowia powróciłaś cudem.";
        let seg = segment(poem, &config());
        // "ok" is too short to count as a verse line
        assert_eq!(seg.sentence_count(), 8);
        assert_eq!(seg.sentences[0].text, "Litwo, ojczyzno moja, ty jesteś jak zdrowie");
        assert!(seg.sentences[7].text.ends_with("cudem."));
        assert_eq!(poem[seg.sentences[1].start..seg.sentences[1].end].trim(), seg.sentences[1].text);
    }

    #[test]
    fn test_prose_keeps_sentence_split() {
        let prose = "Pierwsze zdanie jest krótkie.\nDrugie też.\nTrzecie kończy tekst.";
        let texts = sentence_texts(prose);
        assert_eq!(texts.len(), 3);

        let mut strict = config();
        strict.verse_words_per_sentence = 1.0;
        // Three sentences over nine words is below one per word, but line
        // splitting gives no more segments than sentence splitting
        assert_eq!(segment(prose, &strict).sentence_count(), 3);
    }
}
