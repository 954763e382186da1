//! Overlay composition
//!
//! Produces the final artifact: the original visual content with an
//! invisible, positioned text layer on top, so the result looks like the
//! source but is searchable and selectable.
//!
//! ```text
//! OverlayTarget::Image    ──▶ ImageOverlay     ─┐
//!                                               ├─(error)─▶ PlainTextRenderer
//! OverlayTarget::Document ──▶ DocumentOverlay  ─┘
//! ```

mod composer;
mod document_backed;
mod image_backed;
mod pdf;
mod plain_text;

pub use composer::{
    OverlayArtifact, OverlayComposer, OverlayConfig, OverlayError, OverlayTarget, OverlayVariant,
};
pub use document_backed::{place_line, DocumentOverlay, Placement};
pub use image_backed::ImageOverlay;
pub use plain_text::{PlainTextConfig, PlainTextRenderer};
