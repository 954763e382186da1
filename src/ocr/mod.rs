//! Recognition Module
//!
//! Runs text recognition through an external asynchronous service and
//! degrades to a labelled simulation whenever the service is unavailable.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scanlayer::ocr::{RecognitionConfig, RecognitionOrchestrator};
//!
//! let orchestrator = RecognitionOrchestrator::from_config(RecognitionConfig::default());
//!
//! // Always returns a result; check `provenance` to tell real from simulated
//! let result = orchestrator.recognize(&bytes, "image/png", 1, None).await;
//! ```

mod fallback;
mod provider;
mod service;
mod types;

pub use fallback::{FallbackSimulator, SIMULATED_CONFIDENCE, SIMULATED_ENGINE};
pub use provider::{validate_language, ReadApiClient, RecognitionClient};
pub use service::{JobReport, JobState, RecognitionConfig, RecognitionOrchestrator};
pub use types::{JobHandle, JobStatus, OcrError, PollResponse};

#[cfg(test)]
pub(crate) use provider::ScriptedClient;
