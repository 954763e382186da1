//! Overlay Composer
//!
//! Picks the overlay variant for a target and walks the degrade chain:
//! image-backed or document-backed first, plain paginated text last.

use serde::{Deserialize, Serialize};

use super::document_backed::DocumentOverlay;
use super::image_backed::ImageOverlay;
use super::plain_text::{PlainTextConfig, PlainTextRenderer};
use crate::layout::RecognitionResult;

/// Overlay error types. All of them degrade to plain text rendering, except
/// `EmptyText` which means there is nothing to render at all.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("Overlay target unsupported: {0}")]
    OverlayTargetUnsupported(String),

    #[error("Image error: {0}")]
    ImageDecode(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("No text to render")]
    EmptyText,
}

impl From<lopdf::Error> for OverlayError {
    fn from(e: lopdf::Error) -> Self {
        OverlayError::Pdf(e.to_string())
    }
}

impl From<image::ImageError> for OverlayError {
    fn from(e: image::ImageError) -> Self {
        OverlayError::ImageDecode(e.to_string())
    }
}

impl From<std::io::Error> for OverlayError {
    fn from(e: std::io::Error) -> Self {
        OverlayError::Write(e.to_string())
    }
}

/// What the overlay is drawn onto
#[derive(Debug, Clone, Copy)]
pub enum OverlayTarget<'a> {
    /// Raster image, one page at native pixel size
    Image { bytes: &'a [u8] },
    /// Existing paginated document
    Document { bytes: &'a [u8] },
}

/// How an artifact was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayVariant {
    ImageBacked,
    DocumentBacked,
    PlainText,
    /// Source bytes reused unmodified
    Original,
}

/// Finished overlay document; ownership passes to the caller
#[derive(Debug, Clone)]
pub struct OverlayArtifact {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub variant: OverlayVariant,
}

impl OverlayArtifact {
    /// Artifact that is the unmodified source document
    pub fn original(bytes: Vec<u8>, page_count: usize) -> Self {
        Self {
            bytes,
            page_count,
            variant: OverlayVariant::Original,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Baseline offset above the box bottom, as a fraction of the font size
    pub descent_fraction: f64,
    /// Distance kept from the page edges on document-backed overlays
    pub clamp_margin: f64,
    pub plain_text: PlainTextConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            descent_fraction: 0.2,
            clamp_margin: 10.0,
            plain_text: PlainTextConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlayComposer {
    image: ImageOverlay,
    document: DocumentOverlay,
    plain: PlainTextRenderer,
}

impl OverlayComposer {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            image: ImageOverlay::new(config.descent_fraction),
            document: DocumentOverlay::new(config.clamp_margin),
            plain: PlainTextRenderer::new(config.plain_text.clone()),
        }
    }

    /// Compose the overlay artifact for a recognition result.
    ///
    /// `text` is the final reconstructed text, used when no positioned
    /// variant can be produced. Fails only when that text is empty too.
    pub fn compose(
        &self,
        target: OverlayTarget<'_>,
        result: &RecognitionResult,
        text: &str,
    ) -> Result<OverlayArtifact, OverlayError> {
        let pages = result.pages();

        if !pages.is_empty() {
            let positioned = match target {
                OverlayTarget::Image { bytes } => self
                    .image
                    .compose(bytes, &pages[0])
                    .map(|bytes| (bytes, 1, OverlayVariant::ImageBacked)),
                OverlayTarget::Document { bytes } => self
                    .document
                    .compose(bytes, pages)
                    .map(|(bytes, count)| (bytes, count, OverlayVariant::DocumentBacked)),
            };

            match positioned {
                Ok((bytes, page_count, variant)) => {
                    tracing::info!(?variant, page_count, "Overlay composed");
                    return Ok(OverlayArtifact {
                        bytes,
                        page_count,
                        variant,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Positioned overlay failed, rendering plain text");
                }
            }
        }

        let (bytes, page_count) = self.plain.render(text)?;
        tracing::info!(page_count, "Overlay rendered as plain text");
        Ok(OverlayArtifact {
            bytes,
            page_count,
            variant: OverlayVariant::PlainText,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Quad;
    use crate::layout::{Line, Page, Word};
    use crate::testing;

    fn result() -> RecognitionResult {
        let page = Page::new(
            1,
            vec![Line::new(vec![
                Word::new("Hello", Quad::from_rect(0.0, 0.0, 50.0, 20.0)),
                Word::new("World", Quad::from_rect(60.0, 0.0, 50.0, 20.0)),
            ])],
        );
        RecognitionResult::recognized(vec![page], "scripted")
    }

    #[test]
    fn test_image_target() {
        let png = testing::png_bytes(120, 40);
        let artifact = OverlayComposer::default()
            .compose(OverlayTarget::Image { bytes: &png }, &result(), "Hello World")
            .unwrap();
        assert_eq!(artifact.variant, OverlayVariant::ImageBacked);
        assert_eq!(artifact.page_count, 1);
    }

    #[test]
    fn test_document_target() {
        let pdf = testing::scanned_pdf(2, 612.0, 792.0);
        let artifact = OverlayComposer::default()
            .compose(OverlayTarget::Document { bytes: &pdf }, &result(), "Hello World")
            .unwrap();
        assert_eq!(artifact.variant, OverlayVariant::DocumentBacked);
        assert_eq!(artifact.page_count, 2);
    }

    #[test]
    fn test_malformed_document_degrades_to_plain_text() {
        let artifact = OverlayComposer::default()
            .compose(OverlayTarget::Document { bytes: b"not a pdf" }, &result(), "Hello World")
            .unwrap();
        assert_eq!(artifact.variant, OverlayVariant::PlainText);
        assert_eq!(testing::shown_text(&artifact.bytes), vec![vec!["Hello World".to_string()]]);
    }

    #[test]
    fn test_broken_image_degrades_to_plain_text() {
        let artifact = OverlayComposer::default()
            .compose(OverlayTarget::Image { bytes: b"\x89PNG broken" }, &result(), "Hello World")
            .unwrap();
        assert_eq!(artifact.variant, OverlayVariant::PlainText);
    }

    #[test]
    fn test_plain_content_renders_plain_text() {
        let plain = RecognitionResult::existing_text("Some text".into(), 1);
        let png = testing::png_bytes(10, 10);
        let artifact = OverlayComposer::default()
            .compose(OverlayTarget::Image { bytes: &png }, &plain, "Some text")
            .unwrap();
        assert_eq!(artifact.variant, OverlayVariant::PlainText);
    }

    #[test]
    fn test_nothing_to_render() {
        let result = OverlayComposer::default().compose(
            OverlayTarget::Document { bytes: b"not a pdf" },
            &result(),
            "",
        );
        assert!(matches!(result, Err(OverlayError::EmptyText)));
    }
}
