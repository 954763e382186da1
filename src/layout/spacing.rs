//! Spacing Classifier
//!
//! Turns the geometric gap between two recognized boxes into a spacing
//! decision. All thresholds are expressed relative to the average box height
//! so the same configuration works across scan resolutions.

use serde::{Deserialize, Serialize};

use crate::geometry::Extent;

use super::types::{Line, Word};

/// Spacing thresholds. Ratios are multiples of the average box height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpacingConfig {
    /// Boxes whose centers are closer than this ratio are on the same line
    pub line_height_tolerance: f64,
    /// Gaps up to this many pixels are treated as the same token
    pub min_word_gap_pixels: f64,
    /// Upper bound for a normal word space
    pub word_spacing_threshold: f64,
    /// Upper bound for a wide space
    pub wide_spacing_threshold: f64,
    /// Upper bound for a tab-sized gap; anything wider is a column break
    pub tab_spacing_threshold: f64,
    /// Vertical gaps up to this ratio are scan jitter
    pub jitter_threshold: f64,
    /// Upper bound for a plain line break
    pub line_break_threshold: f64,
    /// Upper bound for a paragraph break; anything larger is a section break
    pub paragraph_spacing_threshold: f64,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            line_height_tolerance: 0.7,
            min_word_gap_pixels: 2.0,
            word_spacing_threshold: 0.5,
            wide_spacing_threshold: 1.2,
            tab_spacing_threshold: 2.0,
            jitter_threshold: 0.3,
            line_break_threshold: 1.2,
            paragraph_spacing_threshold: 2.0,
        }
    }
}

/// Spacing between two adjacent boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpacingDecision {
    None,
    NormalSpace,
    WideSpace,
    TabBreak,
    SameLineJoin,
    LineBreak,
    ParagraphBreak,
    SectionBreak,
}

/// Whether a decision joins boxes on one visual line or stacks them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl SpacingDecision {
    /// Literal separator for a decision made between two words inside one
    /// recognized line. A recognized line is one visual line, so vertical
    /// decisions collapse to a single space.
    pub fn intra_line_separator(self) -> &'static str {
        match self {
            Self::None => "",
            Self::NormalSpace | Self::SameLineJoin => " ",
            Self::WideSpace => "  ",
            Self::TabBreak => "    ",
            Self::SectionBreak => "\t",
            Self::LineBreak | Self::ParagraphBreak => " ",
        }
    }

    /// Literal separator between two boxes that may sit on different lines.
    /// Joining two lines never yields an empty separator.
    pub fn flow_separator(self, axis: Axis) -> &'static str {
        match (self, axis) {
            (Self::None | Self::NormalSpace | Self::SameLineJoin, _) => " ",
            (Self::WideSpace, _) => "  ",
            (Self::TabBreak, _) => "    ",
            (Self::SectionBreak, Axis::Horizontal) => "\t",
            (Self::SectionBreak, Axis::Vertical) => "\n\n\n",
            (Self::LineBreak, _) => "\n",
            (Self::ParagraphBreak, _) => "\n\n",
        }
    }
}

/// Height-relative spacing classifier
#[derive(Debug, Clone, Default)]
pub struct SpacingClassifier {
    config: SpacingConfig,
}

impl SpacingClassifier {
    pub fn new(config: SpacingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpacingConfig {
        &self.config
    }

    /// Classify the gap between two words
    pub fn classify(&self, first: &Word, second: &Word) -> SpacingDecision {
        self.classify_extents(first.extent(), second.extent()).0
    }

    /// Classify the gap between two lines
    pub fn classify_lines(&self, first: &Line, second: &Line) -> SpacingDecision {
        self.classify_extents(first.extent(), second.extent()).0
    }

    /// Classify two extents, also reporting the axis the decision was made on.
    ///
    /// Unknown geometry, zero heights and non-finite ratios all produce a
    /// normal space.
    pub fn classify_extents(
        &self,
        first: Option<Extent>,
        second: Option<Extent>,
    ) -> (SpacingDecision, Axis) {
        let fallback = (SpacingDecision::NormalSpace, Axis::Horizontal);

        let (Some(a), Some(b)) = (first, second) else {
            return fallback;
        };

        let height = (a.height + b.height) / 2.0;
        if !height.is_finite() || height <= 0.0 {
            return fallback;
        }

        let center_distance = (a.center_y - b.center_y).abs();
        if !center_distance.is_finite() {
            return fallback;
        }

        if center_distance < self.config.line_height_tolerance * height {
            let gap = b.left - a.right;
            match self.horizontal(gap, height) {
                Some(decision) => (decision, Axis::Horizontal),
                None => fallback,
            }
        } else {
            let gap = b.top - a.bottom;
            match self.vertical(gap, height) {
                Some(decision) => (decision, Axis::Vertical),
                None => fallback,
            }
        }
    }

    fn horizontal(&self, gap: f64, height: f64) -> Option<SpacingDecision> {
        if !gap.is_finite() {
            return None;
        }
        let c = &self.config;
        let decision = if gap < 0.0 || gap <= c.min_word_gap_pixels {
            SpacingDecision::None
        } else if gap <= c.word_spacing_threshold * height {
            SpacingDecision::NormalSpace
        } else if gap <= c.wide_spacing_threshold * height {
            SpacingDecision::WideSpace
        } else if gap <= c.tab_spacing_threshold * height {
            SpacingDecision::TabBreak
        } else {
            SpacingDecision::SectionBreak
        };
        Some(decision)
    }

    fn vertical(&self, gap: f64, height: f64) -> Option<SpacingDecision> {
        let ratio = gap / height;
        if !ratio.is_finite() {
            return None;
        }
        let c = &self.config;
        let decision = if ratio <= c.jitter_threshold {
            SpacingDecision::SameLineJoin
        } else if ratio <= c.line_break_threshold {
            SpacingDecision::LineBreak
        } else if ratio <= c.paragraph_spacing_threshold {
            SpacingDecision::ParagraphBreak
        } else {
            SpacingDecision::SectionBreak
        };
        Some(decision)
    }
}
