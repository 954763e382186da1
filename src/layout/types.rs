//! Layout Types
//!
//! Recognized words, lines and pages, and the result handed from recognition
//! to the overlay composer.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Extent, Quad};

/// Confidence reported when the engine returns no per-word scores
pub const DEFAULT_ENGINE_CONFIDENCE: f64 = 80.0;

/// A single recognized word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// Recognized text
    pub text: String,
    /// Pixel-space bounding quadrilateral
    #[serde(default)]
    pub bounding_box: Quad,
    /// Confidence in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Word {
    pub fn new(text: impl Into<String>, bounding_box: Quad) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Non-degenerate extent, `None` for unknown geometry
    pub fn extent(&self) -> Option<Extent> {
        geometry::known_extent(&self.bounding_box)
    }
}

/// A recognized line. Word order is recognition order, not reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    #[serde(default)]
    pub words: Vec<Word>,
    /// Aggregate box reported by the recognizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Quad>,
    /// Line text as reported by the recognizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Line {
    pub fn new(words: Vec<Word>) -> Self {
        Self {
            words,
            bounding_box: None,
            text: None,
        }
    }

    /// True when no word carries visible text
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| w.text.trim().is_empty())
    }

    /// Line extent: the aggregate box when usable, otherwise the union of
    /// the word boxes.
    pub fn extent(&self) -> Option<Extent> {
        self.bounding_box
            .as_ref()
            .and_then(geometry::known_extent)
            .or_else(|| geometry::union(self.words.iter().filter_map(Word::extent)))
    }

    /// Union of the word boxes only, ignoring the aggregate box
    pub fn word_extent(&self) -> Option<Extent> {
        geometry::union(self.words.iter().filter_map(Word::extent))
    }
}

/// A recognized page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Page number (1-indexed)
    #[serde(default)]
    pub page: usize,
    /// Page width in pixels, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Page height in pixels, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Page {
    pub fn new(page: usize, lines: Vec<Line>) -> Self {
        Self {
            page,
            width: None,
            height: None,
            lines,
        }
    }

    pub fn with_dimensions(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Pixel dimensions when both are known and positive
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() => {
                Some((w, h))
            }
            _ => None,
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

/// Where the text of a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Text produced by the external recognizer
    RealRecognition,
    /// Recognition skipped because the document already has a text layer
    SkippedExistingText,
    /// Placeholder produced because recognition was unavailable or failed
    SimulatedFallback,
}

/// Recognized content, resolved once at the pipeline boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RecognizedContent {
    /// Text without geometry
    Plain(String),
    /// Pages with word geometry
    Paged(Vec<Page>),
}

/// Output of a recognition pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub content: RecognizedContent,
    pub provenance: Provenance,
    /// Overall confidence (0-100)
    pub confidence: f64,
    /// Engine tag (e.g. "read-api", "existing-text-layer", "simulated")
    pub engine: String,
    pub page_count: usize,
}

impl RecognitionResult {
    /// Result of a real recognition pass. Confidence is the mean word
    /// confidence, or [`DEFAULT_ENGINE_CONFIDENCE`] when none was reported.
    pub fn recognized(pages: Vec<Page>, engine: impl Into<String>) -> Self {
        let scores: Vec<f64> = pages
            .iter()
            .flat_map(|p| p.words())
            .filter_map(|w| w.confidence)
            .filter(|c| c.is_finite())
            .collect();

        let confidence = if scores.is_empty() {
            DEFAULT_ENGINE_CONFIDENCE
        } else {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            (mean * 100.0).clamp(0.0, 100.0)
        };

        Self {
            page_count: pages.len(),
            content: RecognizedContent::Paged(pages),
            provenance: Provenance::RealRecognition,
            confidence,
            engine: engine.into(),
        }
    }

    /// Result reusing an existing text layer
    pub fn existing_text(text: String, page_count: usize) -> Self {
        Self {
            content: RecognizedContent::Plain(text),
            provenance: Provenance::SkippedExistingText,
            confidence: 100.0,
            engine: "existing-text-layer".to_string(),
            page_count,
        }
    }

    /// Pages with geometry; empty for plain content
    pub fn pages(&self) -> &[Page] {
        match &self.content {
            RecognizedContent::Paged(pages) => pages,
            RecognizedContent::Plain(_) => &[],
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.provenance == Provenance::SimulatedFallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: f64, conf: Option<f64>) -> Word {
        Word {
            text: text.to_string(),
            bounding_box: Quad::from_rect(left, 0.0, 10.0, 10.0),
            confidence: conf,
        }
    }

    #[test]
    fn test_confidence_is_mean_percentage() {
        let page = Page::new(
            1,
            vec![Line::new(vec![
                word("a", 0.0, Some(0.9)),
                word("b", 20.0, Some(0.7)),
                word("c", 40.0, None),
            ])],
        );
        let result = RecognitionResult::recognized(vec![page], "read-api");
        assert!((result.confidence - 80.0).abs() < 1e-9);
        assert_eq!(result.page_count, 1);
        assert_eq!(result.provenance, Provenance::RealRecognition);
    }

    #[test]
    fn test_confidence_defaults_without_scores() {
        let page = Page::new(1, vec![Line::new(vec![word("a", 0.0, None)])]);
        let result = RecognitionResult::recognized(vec![page], "read-api");
        assert_eq!(result.confidence, DEFAULT_ENGINE_CONFIDENCE);
    }

    #[test]
    fn test_line_extent_falls_back_to_words() {
        let mut line = Line::new(vec![word("a", 0.0, None), word("b", 30.0, None)]);
        line.bounding_box = Some(Quad(vec![1.0, 2.0]));
        let e = line.extent().unwrap();
        assert_eq!(e.left, 0.0);
        assert_eq!(e.right, 40.0);
    }

    #[test]
    fn test_page_deserializes_camel_case() {
        let json = r#"{
            "page": 1,
            "width": 800,
            "height": 600,
            "lines": [{
                "boundingBox": [0,0,110,0,110,20,0,20],
                "text": "Hello World",
                "words": [
                    {"text": "Hello", "boundingBox": [0,0,50,0,50,20,0,20], "confidence": 0.99},
                    {"text": "World", "boundingBox": [60,0,110,0,110,20,60,20]}
                ]
            }]
        }"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.dimensions(), Some((800.0, 600.0)));
        assert_eq!(page.lines[0].words.len(), 2);
        assert_eq!(page.lines[0].words[0].confidence, Some(0.99));
    }

    #[test]
    fn test_provenance_serializes_kebab_case() {
        let json = serde_json::to_string(&Provenance::SkippedExistingText).unwrap();
        assert_eq!(json, "\"skipped-existing-text\"");
    }
}
