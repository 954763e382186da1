//! Document Pipeline
//!
//! Runs one document through probe → recognize → assemble/normalize/segment
//! → compose. Every stage degrades to a cheaper one on failure; only input
//! validation errors reach the caller. Batches run one task per document so
//! a failing document never takes its siblings down.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::layout::{LayoutEngine, Provenance, RecognitionResult};
use crate::ocr::{RecognitionClient, RecognitionOrchestrator};
use crate::overlay::{OverlayArtifact, OverlayComposer, OverlayTarget, OverlayVariant};
use crate::probe::{ExistenceProber, ProbeReport};

/// Broad kind of a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Document,
}

/// Source document handed to the pipeline
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SourceArtifact {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file, inferring the content type from its extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, content_type, bytes))
    }

    /// Content type without parameters, lowercased
    pub fn essence(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

/// Provenance and confidence summary for collaborators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub text: String,
    /// 0-100
    pub confidence: f64,
    pub pages: usize,
    pub engine: String,
    pub skipped_recognition: bool,
    pub provenance: Provenance,
    pub source_sha256: String,
    pub processed_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayVariant>,
}

/// Output of one pipeline run
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub result: RecognitionResult,
    pub summary: ProcessingSummary,
    /// Searchable document; absent for simulated results
    pub artifact: Option<OverlayArtifact>,
}

/// Outcome of one document in a batch
#[derive(Debug)]
pub struct BatchEntry {
    pub id: Uuid,
    pub name: String,
    pub outcome: Result<ProcessedDocument>,
}

/// Document pipeline. Cheap to clone; configuration is shared read-only.
#[derive(Clone)]
pub struct DocumentPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: Config,
    prober: ExistenceProber,
    orchestrator: RecognitionOrchestrator,
    layout: LayoutEngine,
    composer: OverlayComposer,
}

impl DocumentPipeline {
    /// Create a pipeline whose recognition client is built from `config`
    pub fn new(config: Config) -> Self {
        let orchestrator = RecognitionOrchestrator::from_config(config.recognition.clone());
        Self::with_orchestrator(config, orchestrator)
    }

    /// Create a pipeline around an existing recognition client
    pub fn with_client(config: Config, client: Arc<dyn RecognitionClient>) -> Self {
        let orchestrator = RecognitionOrchestrator::new(config.recognition.clone(), Some(client));
        Self::with_orchestrator(config, orchestrator)
    }

    fn with_orchestrator(config: Config, orchestrator: RecognitionOrchestrator) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                prober: ExistenceProber::new(config.probe.clone()),
                layout: LayoutEngine::new(
                    config.spacing.clone(),
                    &config.words,
                    config.segmenter.clone(),
                ),
                composer: OverlayComposer::new(&config.overlay),
                orchestrator,
                config,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Check size and content type
    pub fn validate(&self, source: &SourceArtifact) -> Result<ArtifactKind> {
        let limits = &self.inner.config.limits;
        if source.bytes.len() > limits.max_input_bytes {
            return Err(PipelineError::InputTooLarge {
                size: source.bytes.len(),
                limit: limits.max_input_bytes,
            });
        }

        let essence = source.essence();
        if !limits.supported_content_types.iter().any(|t| t.eq_ignore_ascii_case(&essence)) {
            return Err(PipelineError::UnsupportedMimeType(source.content_type.clone()));
        }

        Ok(if essence == "application/pdf" {
            ArtifactKind::Document
        } else {
            ArtifactKind::Image
        })
    }

    pub async fn process(&self, source: &SourceArtifact) -> Result<ProcessedDocument> {
        self.process_with_cancel(source, None).await
    }

    /// Process one document; `cancel` aborts recognition polling
    pub async fn process_with_cancel(
        &self,
        source: &SourceArtifact,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<ProcessedDocument> {
        let kind = self.validate(source)?;
        let start = Instant::now();
        let inner = &self.inner;
        let source_sha256 = hex::encode(Sha256::digest(&source.bytes));

        tracing::info!(
            name = %source.name,
            content_type = %source.content_type,
            size = source.bytes.len(),
            "Processing document"
        );

        let probe = match kind {
            ArtifactKind::Document => inner.prober.probe(&source.bytes),
            ArtifactKind::Image => ProbeReport {
                page_count: 1,
                ..ProbeReport::default()
            },
        };

        let reuse_text_layer = probe.has_text && !probe.extracted_text.trim().is_empty();
        if probe.has_text && !reuse_text_layer {
            tracing::warn!(
                name = %source.name,
                indicators = probe.indicator_count,
                "Text layer detected but nothing extracted, recognizing instead"
            );
        }

        let (result, text, artifact) = if reuse_text_layer {
            tracing::info!(
                name = %source.name,
                indicators = probe.indicator_count,
                "Existing text layer found, skipping recognition"
            );
            let text = inner.layout.refine(&probe.extracted_text);
            let result = RecognitionResult::existing_text(probe.extracted_text, probe.page_count);
            let artifact = OverlayArtifact::original(source.bytes.clone(), probe.page_count);
            (result, text, Some(artifact))
        } else {
            let result = inner
                .orchestrator
                .recognize(&source.bytes, &source.essence(), probe.page_count, cancel)
                .await;
            let text = inner.layout.text(&result.content);
            let artifact = if result.is_simulated() {
                None
            } else {
                self.compose(kind, source, &result, &text)
            };
            (result, text, artifact)
        };

        let summary = ProcessingSummary {
            text,
            confidence: result.confidence,
            pages: result.page_count,
            engine: result.engine.clone(),
            skipped_recognition: result.provenance == Provenance::SkippedExistingText,
            provenance: result.provenance,
            source_sha256,
            processed_at: Utc::now(),
            elapsed_secs: start.elapsed().as_secs_f64(),
            overlay: artifact.as_ref().map(|a| a.variant),
        };

        tracing::info!(
            name = %source.name,
            provenance = ?summary.provenance,
            confidence = summary.confidence,
            pages = summary.pages,
            elapsed_secs = summary.elapsed_secs,
            "Document processed"
        );

        Ok(ProcessedDocument {
            result,
            summary,
            artifact,
        })
    }

    fn compose(
        &self,
        kind: ArtifactKind,
        source: &SourceArtifact,
        result: &RecognitionResult,
        text: &str,
    ) -> Option<OverlayArtifact> {
        let target = match kind {
            ArtifactKind::Image => OverlayTarget::Image { bytes: &source.bytes },
            ArtifactKind::Document => OverlayTarget::Document { bytes: &source.bytes },
        };

        match self.inner.composer.compose(target, result, text) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!(name = %source.name, error = %e, "No overlay artifact produced");
                None
            }
        }
    }

    /// Process and write the artifact to `output`. Nothing is written when
    /// no artifact was produced.
    pub async fn process_to_path(
        &self,
        source: &SourceArtifact,
        output: impl AsRef<Path>,
    ) -> Result<ProcessedDocument> {
        let processed = self.process(source).await?;
        if let Some(artifact) = &processed.artifact {
            tokio::fs::write(output.as_ref(), &artifact.bytes).await?;
            tracing::debug!(path = %output.as_ref().display(), "Overlay artifact written");
        }
        Ok(processed)
    }

    /// Process documents concurrently, one task each. Entries keep the input
    /// order; failures are reported per document.
    pub async fn process_batch(&self, sources: Vec<SourceArtifact>) -> Vec<BatchEntry> {
        let tasks: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let id = Uuid::new_v4();
                let name = source.name.clone();
                let pipeline = self.clone();
                let handle = tokio::spawn(async move { pipeline.process(&source).await });
                (id, name, handle)
            })
            .collect();

        tracing::info!(documents = tasks.len(), "Processing batch");

        let (meta, handles): (Vec<_>, Vec<_>) = tasks
            .into_iter()
            .map(|(id, name, handle)| ((id, name), handle))
            .unzip();

        futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(meta)
            .map(|(joined, (id, name))| {
                let outcome = joined.map_err(PipelineError::from).and_then(|r| r);
                if let Err(e) = &outcome {
                    tracing::warn!(%id, name = %name, error = %e, "Batch document failed");
                }
                BatchEntry { id, name, outcome }
            })
            .collect()
    }
}
