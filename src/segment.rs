//! Chapter text segmentation into slides.
//!
//! Sentences are found by punctuation only (`.`, `!`, `?`). Abbreviations,
//! decimals and quoted dialogue are not special-cased.

use serde::Serialize;

pub const DEFAULT_WORD_LIMIT: usize = 400;
pub const MAX_WORD_LIMIT: usize = 10_000;
pub const WORD_LIMIT_ENV: &str = "NOVEL_SLIDES_DEFAULT_WORD_LIMIT";

/// Reads a configured default word limit, falling back to
/// [`DEFAULT_WORD_LIMIT`] when the value is unset, blank, or outside
/// `1..=MAX_WORD_LIMIT`.
pub fn parse_default_word_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_WORD_LIMIT;
    };
    match raw.parse::<usize>() {
        Ok(n) if (1..=MAX_WORD_LIMIT).contains(&n) => n,
        _ => {
            tracing::warn!(
                value = %raw,
                default = DEFAULT_WORD_LIMIT,
                "ignoring {WORD_LIMIT_ENV}; expected 1..={MAX_WORD_LIMIT}"
            );
            DEFAULT_WORD_LIMIT
        }
    }
}

/// A slide produced by [`pack_slides`] before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideDraft {
    pub order_number: u32,
    pub content: String,
}

/// Splits `text` on runs of sentence terminators, dropping blank fragments.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Greedily packs sentences into slides of at most `word_limit` words.
///
/// Every sentence is re-terminated with a period. A sentence that alone
/// exceeds the limit still becomes its own slide.
pub fn pack_slides(text: &str, word_limit: usize) -> Vec<SlideDraft> {
    let mut slides = Vec::new();
    let mut current = String::new();
    let mut current_words = 0;

    for sentence in split_sentences(text) {
        let words = word_count(sentence);

        if !current.is_empty() && current_words + words > word_limit {
            flush(&mut slides, &mut current);
            current_words = 0;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
        current.push('.');
        current_words += words;
    }

    flush(&mut slides, &mut current);
    slides
}

fn flush(slides: &mut Vec<SlideDraft>, current: &mut String) {
    if current.trim().is_empty() {
        return;
    }
    let order_number = u32::try_from(slides.len() + 1).unwrap_or(u32::MAX);
    slides.push(SlideDraft {
        order_number,
        content: std::mem::take(current),
    });
}
