//! Scanlayer Library
//!
//! Reconstructs a readable text layer from OCR word geometry and overlays it
//! as invisible text on the source document so scans become searchable.
//!
//! # Modules
//!
//! - `probe`: Detects documents that already carry a text layer
//! - `ocr`: Recognition orchestration with a simulated fallback
//! - `layout`: Spacing inference, line/page assembly, normalization
//! - `overlay`: Invisible-text PDF composition
//! - `pipeline`: End-to-end document processing and batches

pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod probe;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use layout::{Provenance, RecognitionResult};
pub use overlay::{OverlayArtifact, OverlayVariant};
pub use pipeline::{BatchEntry, DocumentPipeline, ProcessedDocument, ProcessingSummary, SourceArtifact};
