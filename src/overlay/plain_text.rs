//! Plain paginated text rendering
//!
//! Last tier of the overlay degrade chain: the recognized text typeset with
//! visible ink on US Letter pages. Never depends on the source document.

use lopdf::content::{Content, Operation};
use lopdf::dictionary;
use serde::{Deserialize, Serialize};

use super::pdf::{self, PdfBuilder};
use super::OverlayError;

const FONT_NAME: &str = "F1";

/// Average Helvetica advance as a fraction of the font size
const HELVETICA_AVERAGE_ADVANCE: f64 = 0.55;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlainTextConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub font_size: f64,
    /// Line spacing as a multiple of the font size
    pub leading: f64,
}

impl Default for PlainTextConfig {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 72.0,
            font_size: 11.0,
            leading: 1.3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer {
    config: PlainTextConfig,
}

impl PlainTextRenderer {
    pub fn new(config: PlainTextConfig) -> Self {
        Self { config }
    }

    /// Render text onto as many pages as needed. Returns the document and
    /// its page count.
    pub fn render(&self, text: &str) -> Result<(Vec<u8>, usize), OverlayError> {
        if text.trim().is_empty() {
            return Err(OverlayError::EmptyText);
        }

        let c = &self.config;
        let usable_width = (c.page_width - 2.0 * c.margin).max(c.font_size);
        let usable_height = (c.page_height - 2.0 * c.margin).max(c.font_size);
        let max_chars = ((usable_width / (c.font_size * HELVETICA_AVERAGE_ADVANCE)) as usize).max(1);
        let line_height = c.font_size * c.leading;
        let lines_per_page = ((usable_height / line_height) as usize).max(1);

        let lines = wrap(text.trim(), max_chars);

        let mut builder = PdfBuilder::new();
        let font_id = builder.add_object(pdf::standard_font("Helvetica"));

        for chunk in lines.chunks(lines_per_page) {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![FONT_NAME.into(), pdf::real(c.font_size)]),
                Operation::new("TL", vec![pdf::real(line_height)]),
                Operation::new(
                    "Td",
                    vec![pdf::real(c.margin), pdf::real(c.page_height - c.margin - c.font_size)],
                ),
            ];
            for line in chunk {
                if !line.is_empty() {
                    operations.push(Operation::new("Tj", vec![pdf::text_operand(line)]));
                }
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations }.encode()?;
            let resources = dictionary! { "Font" => dictionary! { FONT_NAME => font_id } };
            builder.add_page(c.page_width, c.page_height, resources, content);
        }

        let page_count = builder.page_count();
        tracing::debug!(lines = lines.len(), page_count, "Rendered plain text document");
        Ok((builder.finish()?, page_count))
    }
}

/// Greedy word wrap. Blank lines are kept and words longer than a line are
/// split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if current_len > 0 {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                out.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > max_chars && current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }

        out.push(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("the quick brown fox", 10), vec!["the quick", "brown fox"]);
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde", "fghij", "kl"]);
        assert_eq!(wrap("hi abcdefghijkl", 5), vec!["hi", "abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_renders_visible_text() {
        let (bytes, pages) = PlainTextRenderer::default()
            .render("Recognized text\n\nSecond paragraph")
            .unwrap();
        assert_eq!(pages, 1);
        assert_eq!(
            testing::shown_text(&bytes),
            vec![vec!["Recognized text".to_string(), "Second paragraph".to_string()]]
        );
        assert!(!testing::operators(&bytes)[0].contains(&"Tr".to_string()));
    }

    #[test]
    fn test_paginates_long_text() {
        let text = (1..=120).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let (bytes, pages) = PlainTextRenderer::default().render(&text).unwrap();

        // 648pt of usable height at 14.3pt per line
        assert_eq!(pages, 3);
        let shown = testing::shown_text(&bytes);
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[0].len(), 45);
        assert_eq!(shown[2].last().map(String::as_str), Some("line 120"));
    }

    #[test]
    fn test_empty_text_is_an_error() {
        let result = PlainTextRenderer::default().render(" \n\t ");
        assert!(matches!(result, Err(OverlayError::EmptyText)));
    }
}
