//! Fallback Simulator
//!
//! Stands in for recognition when it is unavailable or failed, so every
//! document still completes. Results are labelled as simulated and carry a
//! fixed confidence that no real pass produces.

use crate::layout::{Provenance, RecognitionResult, RecognizedContent};

/// Confidence reported for every simulated result
pub const SIMULATED_CONFIDENCE: f64 = 0.0;

pub const SIMULATED_ENGINE: &str = "simulated";

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSimulator;

impl FallbackSimulator {
    pub fn new() -> Self {
        Self
    }

    /// Placeholder result for `page_count` pages (at least one)
    pub fn simulate(&self, reason: &str, page_count: usize) -> RecognitionResult {
        let page_count = page_count.max(1);
        tracing::warn!(reason, page_count, "Recognition unavailable, simulating result");

        let text = (1..=page_count)
            .map(|page| {
                format!(
                    "[Simulated text, page {} of {}: recognition unavailable ({})]",
                    page, page_count, reason
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        RecognitionResult {
            content: RecognizedContent::Plain(text),
            provenance: Provenance::SimulatedFallback,
            confidence: SIMULATED_CONFIDENCE,
            engine: SIMULATED_ENGINE.to_string(),
            page_count,
        }
    }
}
