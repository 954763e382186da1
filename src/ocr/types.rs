//! Recognition Types
//!
//! Job bookkeeping for the asynchronous recognition protocol and the wire
//! format of the "Read" REST API.

use serde::{Deserialize, Serialize};

use crate::geometry::Quad;
use crate::layout::{Line, Page, Word};

/// Status reported by the recognition service for a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    /// Anything the service adds later; treated as still in progress
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Opaque handle of a submitted job (the operation URL for the Read API)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

/// One poll of a submitted job
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse {
    pub status: JobStatus,
    /// Recognized pages, present once the job succeeded
    pub pages: Option<Vec<Page>>,
}

impl PollResponse {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            pages: None,
        }
    }

    pub fn succeeded(pages: Vec<Page>) -> Self {
        Self {
            status: JobStatus::Succeeded,
            pages: Some(pages),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: JobStatus::Failed,
            pages: None,
        }
    }
}

/// Recognition error types. None of them reach the caller: every variant
/// routes the document to the fallback simulator.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("No recognition credential configured")]
    ConfigurationUnavailable,

    #[error("Recognition timed out after {0} polls")]
    RecognitionTimeout(u32),

    #[error("Recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Recognition cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),
}

impl From<reqwest::Error> for OcrError {
    fn from(e: reqwest::Error) -> Self {
        OcrError::Transport(e.to_string())
    }
}

// ============================================================================
// Read API wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadOperation {
    pub status: JobStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeResult {
    #[serde(default)]
    pub read_results: Vec<ReadResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadResult {
    pub page: usize,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadLine {
    #[serde(default)]
    pub bounding_box: Option<Quad>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub words: Vec<ReadWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadWord {
    #[serde(default)]
    pub bounding_box: Quad,
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl From<ReadResult> for Page {
    fn from(result: ReadResult) -> Self {
        let lines = result
            .lines
            .into_iter()
            .map(|line| Line {
                words: line
                    .words
                    .into_iter()
                    .map(|w| Word {
                        text: w.text,
                        bounding_box: w.bounding_box,
                        confidence: w.confidence,
                    })
                    .collect(),
                bounding_box: line.bounding_box,
                text: line.text,
            })
            .collect();

        Page {
            page: result.page,
            width: result.width,
            height: result.height,
            lines,
        }
    }
}

impl ReadOperation {
    /// Convert into a poll response, ordering pages by page number
    pub fn into_poll_response(self) -> PollResponse {
        let pages = self.analyze_result.map(|result| {
            let mut pages: Vec<Page> = result.read_results.into_iter().map(Page::from).collect();
            pages.sort_by_key(|p| p.page);
            pages
        });

        PollResponse {
            status: self.status,
            pages: match self.status {
                JobStatus::Succeeded => Some(pages.unwrap_or_default()),
                _ => pages,
            },
        }
    }
}
