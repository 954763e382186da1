//! Text Normalizer
//!
//! Deterministic cleanup of assembled OCR text. Applying the normalizer to
//! its own output is a no-op.
//!
//! Spacing markers produced by the assembler (double spaces, four-space
//! tabs, tab characters) are collapsed here to a single space.

use once_cell::sync::Lazy;
use regex::Regex;

use super::words::WordList;

static LINE_ENDINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").unwrap());
static LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").unwrap());
static LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{L})(\p{Nd})").unwrap());
static DIGIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Nd})(\p{L})").unwrap());
static PUNCT_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.,;:!?])(\p{Lu})").unwrap());
static LETTER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").unwrap());
static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r" +([,.;:!?])").unwrap());
static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

/// Idempotent text cleanup
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    words: WordList,
}

impl TextNormalizer {
    pub fn new(words: WordList) -> Self {
        Self { words }
    }

    pub fn apply(&self, text: &str) -> String {
        let text = LINE_ENDINGS.replace_all(text, "\n");

        // Boundaries between glued tokens
        let text = LOWER_UPPER.replace_all(&text, "$1 $2");
        let text = LETTER_DIGIT.replace_all(&text, "$1 $2");
        let text = DIGIT_LETTER.replace_all(&text, "$1 $2");
        let text = PUNCT_UPPER.replace_all(&text, "$1 $2");
        let text = LETTER_RUN.replace_all(&text, |caps: &regex::Captures| {
            match self.words.split_concatenated(&caps[0]) {
                Some(parts) => parts.join(" "),
                None => caps[0].to_string(),
            }
        });

        // Whitespace and punctuation spacing
        let text = HORIZONTAL_SPACE.replace_all(&text, " ");
        let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");

        let trimmed: Vec<&str> = text.split('\n').map(|l| l.trim_matches(' ')).collect();
        let text = trimmed.join("\n");

        let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n\n");
        text.trim_matches(|c| c == '\n' || c == ' ').to_string()
    }
}
