//! Paragraph Segmenter
//!
//! Re-derives paragraph and sentence boundaries from line-length and
//! punctuation cues once text has been flowed and normalized.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmenterConfig {
    /// Lines shorter than this may be headings
    pub short_line_chars: usize,
    /// Length difference from the previous line that marks a heading
    pub heading_length_delta: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            short_line_chars: 50,
            heading_length_delta: 20,
        }
    }
}

/// How two consecutive lines are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    Paragraph,
    Sentence,
    Continuation,
}

impl Join {
    fn separator(self) -> &'static str {
        match self {
            Join::Paragraph => "\n\n",
            Join::Sentence => "\n",
            Join::Continuation => " ",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParagraphSegmenter {
    config: SegmenterConfig,
}

impl ParagraphSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn segment(&self, text: &str) -> String {
        let mut out = String::new();
        let mut previous: Option<&str> = None;
        let mut current: Option<&str> = None;
        let mut pending_blank = false;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                if current.is_some() {
                    pending_blank = true;
                }
                continue;
            }

            if let Some(cur) = current {
                let join = if pending_blank {
                    Join::Paragraph
                } else {
                    self.join(previous, cur, line)
                };
                out.push_str(join.separator());
            }
            out.push_str(line);

            previous = current;
            current = Some(line);
            pending_blank = false;
        }

        out
    }

    fn join(&self, previous: Option<&str>, current: &str, next: &str) -> Join {
        let terminal = current.ends_with(['.', '!', '?']);
        let next_upper = next.chars().next().is_some_and(char::is_uppercase);

        if terminal && next_upper {
            return Join::Paragraph;
        }

        let current_len = current.chars().count();
        if current_len < self.config.short_line_chars {
            if let Some(prev) = previous {
                let prev_len = prev.chars().count();
                if current_len.abs_diff(prev_len) > self.config.heading_length_delta {
                    return Join::Paragraph;
                }
            }
        }

        if terminal {
            Join::Sentence
        } else {
            Join::Continuation
        }
    }
}
