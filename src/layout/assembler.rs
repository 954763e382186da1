//! Line & Page Assembler
//!
//! Flows recognized words into text. Recognizers hand back isolated word
//! boxes, so spacing is rebuilt from geometry, escalating through three
//! strategies until the output contains whitespace:
//!
//! 1. `LineGrouped` - words sorted left to right inside each recognized line
//! 2. `GlobalResort` - every word on the page sorted by (top, left)
//! 3. `PatternBoundary` - character transitions and the word list
//!
//! Each strategy is a pure function of the page.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::geometry::Extent;

use super::spacing::{SpacingClassifier, SpacingDecision};
use super::types::{Line, Page, Word};
use super::words::WordList;

static LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").unwrap());
static LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{L})(\p{Nd})").unwrap());
static DIGIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Nd})(\p{L})").unwrap());
static PUNCT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.,;:!?])(\p{L})").unwrap());
static LETTER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").unwrap());

/// Spacing strategies in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LineGrouped,
    GlobalResort,
    PatternBoundary,
}

impl Strategy {
    pub const ESCALATION: [Strategy; 3] = [
        Strategy::LineGrouped,
        Strategy::GlobalResort,
        Strategy::PatternBoundary,
    ];
}

/// Flows pages of recognized words into text
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    classifier: SpacingClassifier,
    words: WordList,
}

impl Assembler {
    pub fn new(classifier: SpacingClassifier, words: WordList) -> Self {
        Self { classifier, words }
    }

    /// Assemble all pages, separated by a blank line
    pub fn assemble_pages(&self, pages: &[Page]) -> String {
        pages
            .iter()
            .map(|p| self.assemble(p))
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Assemble one page, escalating strategies while spacing is missing but
    /// structurally inferable.
    pub fn assemble(&self, page: &Page) -> String {
        let needs_spacing = page.lines.iter().any(|l| {
            l.words.iter().filter(|w| !w.text.trim().is_empty()).count() >= 2
        });

        let mut last = String::new();
        for strategy in Strategy::ESCALATION {
            let text = match strategy {
                Strategy::LineGrouped => self.line_grouped(page),
                Strategy::GlobalResort => self.global_resort(page),
                Strategy::PatternBoundary => self.pattern_boundary(&last),
            };

            if !needs_spacing || text.contains(char::is_whitespace) {
                if strategy != Strategy::LineGrouped {
                    tracing::debug!(page = page.page, ?strategy, "Spacing recovered by fallback strategy");
                }
                return text;
            }
            last = text;
        }

        tracing::warn!(page = page.page, "No spacing could be inferred for page");
        last
    }

    /// Text of a single line with words in left-to-right order
    pub fn line_text(&self, line: &Line) -> String {
        let words = sorted_left_to_right(&line.words);
        let mut text = String::new();
        let mut previous: Option<&Word> = None;

        for word in words {
            let token = word.text.trim();
            if token.is_empty() {
                continue;
            }
            if let Some(prev) = previous {
                let decision = self.classifier.classify(prev, word);
                text.push_str(decision.intra_line_separator());
            }
            text.push_str(token);
            previous = Some(word);
        }

        text
    }

    fn line_grouped(&self, page: &Page) -> String {
        let mut text = String::new();
        let mut previous: Option<&Line> = None;

        for line in page.lines.iter().filter(|l| !l.is_empty()) {
            let line_text = self.line_text(line);
            if let Some(prev) = previous {
                let (decision, axis) = self
                    .classifier
                    .classify_extents(prev.extent(), line.extent());
                text.push_str(decision.flow_separator(axis));
            }
            text.push_str(&line_text);
            previous = Some(line);
        }

        text
    }

    fn global_resort(&self, page: &Page) -> String {
        let mut words: Vec<&Word> = page.words().filter(|w| !w.text.trim().is_empty()).collect();
        words.sort_by(|a, b| compare_reading_order(a.extent(), b.extent()));

        let mut text = String::new();
        let mut previous: Option<&Word> = None;
        for word in words {
            if let Some(prev) = previous {
                let (decision, axis) = self
                    .classifier
                    .classify_extents(prev.extent(), word.extent());
                let separator = match decision {
                    // Gluing across words is what this pass exists to undo
                    SpacingDecision::None => "",
                    other => other.flow_separator(axis),
                };
                text.push_str(separator);
            }
            text.push_str(word.text.trim());
            previous = Some(word);
        }

        text
    }

    fn pattern_boundary(&self, text: &str) -> String {
        let text = LOWER_UPPER.replace_all(text, "$1 $2");
        let text = LETTER_DIGIT.replace_all(&text, "$1 $2");
        let text = DIGIT_LETTER.replace_all(&text, "$1 $2");
        let text = PUNCT_LETTER.replace_all(&text, "$1 $2");

        LETTER_RUN
            .replace_all(&text, |caps: &regex::Captures| {
                self.words.segment_lenient(&caps[0]).join(" ")
            })
            .into_owned()
    }
}

/// Stable left-to-right order; words with unknown geometry keep their
/// recognition order after the positioned ones.
fn sorted_left_to_right(words: &[Word]) -> Vec<&Word> {
    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| match (a.extent(), b.extent()) {
        (Some(a), Some(b)) => a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

fn compare_reading_order(a: Option<Extent>, b: Option<Extent>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a
            .top
            .partial_cmp(&b.top)
            .unwrap_or(Ordering::Equal)
            .then(a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
