//! Text layout reconstruction
//!
//! Recognizers return isolated word boxes. This module rebuilds readable text
//! from them:
//!
//! ```text
//! Page ──▶ Assembler ──▶ TextNormalizer ──▶ ParagraphSegmenter ──▶ text
//!             │
//!             └── SpacingClassifier (geometry) + WordList (patterns)
//! ```

mod assembler;
mod normalizer;
mod segmenter;
mod spacing;
mod types;
mod words;

pub use assembler::{Assembler, Strategy};
pub use normalizer::TextNormalizer;
pub use segmenter::{ParagraphSegmenter, SegmenterConfig};
pub use spacing::{Axis, SpacingClassifier, SpacingConfig, SpacingDecision};
pub use types::{
    Line, Page, Provenance, RecognitionResult, RecognizedContent, Word,
    DEFAULT_ENGINE_CONFIDENCE,
};
pub use words::{WordList, WordListConfig};

/// Assembled, normalized and segmented text of a set of pages
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    assembler: Assembler,
    normalizer: TextNormalizer,
    segmenter: ParagraphSegmenter,
}

impl LayoutEngine {
    pub fn new(
        spacing: SpacingConfig,
        words: &WordListConfig,
        segmenter: SegmenterConfig,
    ) -> Self {
        let words = WordList::new(words);
        Self {
            assembler: Assembler::new(SpacingClassifier::new(spacing), words.clone()),
            normalizer: TextNormalizer::new(words),
            segmenter: ParagraphSegmenter::new(segmenter),
        }
    }

    /// Full text of recognized content
    pub fn text(&self, content: &RecognizedContent) -> String {
        let raw = match content {
            RecognizedContent::Plain(text) => text.clone(),
            RecognizedContent::Paged(pages) => self.assembler.assemble_pages(pages),
        };
        self.refine(&raw)
    }

    /// Normalize then segment already assembled text
    pub fn refine(&self, text: &str) -> String {
        let normalized = self.normalizer.apply(text);
        self.segmenter.segment(&normalized)
    }
}
