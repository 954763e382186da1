//! Recognition Orchestrator
//!
//! Drives one recognition job per document through
//! `Submitted → Polling → {Succeeded, Failed, TimedOut}` (or `Cancelled`),
//! suspending between polls. Any outcome other than `Succeeded` hands the
//! document to the fallback simulator, so callers always get a result.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::fallback::FallbackSimulator;
use super::provider::{ReadApiClient, RecognitionClient};
use super::types::{JobStatus, OcrError};
use crate::layout::{Page, RecognitionResult};

/// Recognition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecognitionConfig {
    /// Base URL of the recognition service
    pub endpoint: Option<String>,
    /// Subscription key; recognition is simulated without one
    pub api_key: Option<String>,
    /// Language hint
    pub language: Option<String>,
    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            language: None,
            poll_interval_ms: 1000,
            max_poll_attempts: 30,
        }
    }
}

impl RecognitionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Endpoint and key, when both are present
    fn credential(&self) -> Option<(&str, &str)> {
        let endpoint = self.endpoint.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.api_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((endpoint, key))
    }
}

/// Job state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Submitted | Self::Polling)
    }
}

/// Outcome of one recognition job
#[derive(Debug)]
pub struct JobReport {
    pub state: JobState,
    /// Polls issued
    pub polls: u32,
    /// Completed suspensions between polls
    pub suspensions: u32,
    /// Recognized pages when `state` is `Succeeded`
    pub pages: Vec<Page>,
    /// Why the job did not succeed
    pub error: Option<OcrError>,
}

impl JobReport {
    fn new() -> Self {
        Self {
            state: JobState::Submitted,
            polls: 0,
            suspensions: 0,
            pages: Vec::new(),
            error: None,
        }
    }

    fn finish(mut self, state: JobState, error: Option<OcrError>) -> Self {
        self.state = state;
        self.error = error;
        self
    }
}

/// Recognition orchestrator. The client is injected once and never changes.
pub struct RecognitionOrchestrator {
    config: RecognitionConfig,
    client: Option<Arc<dyn RecognitionClient>>,
    simulator: FallbackSimulator,
}

impl RecognitionOrchestrator {
    pub fn new(config: RecognitionConfig, client: Option<Arc<dyn RecognitionClient>>) -> Self {
        Self {
            config,
            client,
            simulator: FallbackSimulator::new(),
        }
    }

    /// Build the HTTP client from configuration. Without a credential, or
    /// with an invalid language hint, every document is simulated.
    pub fn from_config(config: RecognitionConfig) -> Self {
        let client = match config.credential() {
            Some((endpoint, key)) => {
                match ReadApiClient::new(endpoint, key, config.language.as_deref()) {
                    Ok(client) => Some(Arc::new(client) as Arc<dyn RecognitionClient>),
                    Err(e) => {
                        tracing::warn!(error = %e, "Recognition client disabled");
                        None
                    }
                }
            }
            None => {
                tracing::info!("No recognition credential configured, results will be simulated");
                None
            }
        };

        Self::new(config, client)
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Recognize a document. Never fails: problems produce a simulated result
    /// for `page_hint` pages.
    pub async fn recognize(
        &self,
        data: &[u8],
        content_type: &str,
        page_hint: usize,
        cancel: Option<watch::Receiver<bool>>,
    ) -> RecognitionResult {
        let Some(client) = self.client.as_deref() else {
            return self
                .simulator
                .simulate(&OcrError::ConfigurationUnavailable.to_string(), page_hint);
        };

        let report = self.run_job(client, data, content_type, cancel).await;
        match report.state {
            JobState::Succeeded => {
                tracing::info!(
                    pages = report.pages.len(),
                    polls = report.polls,
                    engine = client.engine_tag(),
                    "Recognition succeeded"
                );
                RecognitionResult::recognized(report.pages, client.engine_tag())
            }
            state => {
                let reason = report
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| format!("{:?}", state));
                self.simulator.simulate(&reason, page_hint)
            }
        }
    }

    /// Submit one job and poll it to a terminal state
    pub async fn run_job(
        &self,
        client: &dyn RecognitionClient,
        data: &[u8],
        content_type: &str,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> JobReport {
        let report = JobReport::new();

        let handle = match client.submit(data, content_type).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "Recognition submission failed");
                return report.finish(JobState::Failed, Some(e));
            }
        };

        let mut report = report;
        report.state = JobState::Polling;
        let max_attempts = self.config.max_poll_attempts.max(1);
        let interval = self.config.poll_interval();

        loop {
            if is_cancelled(&cancel) {
                tracing::info!(polls = report.polls, "Recognition cancelled");
                return report.finish(JobState::Cancelled, Some(OcrError::Cancelled));
            }

            report.polls += 1;
            match client.poll(&handle).await {
                Ok(response) => {
                    tracing::debug!(poll = report.polls, status = ?response.status, "Polled recognition job");
                    match response.status {
                        JobStatus::Succeeded => {
                            report.pages = response.pages.unwrap_or_default();
                            return report.finish(JobState::Succeeded, None);
                        }
                        JobStatus::Failed => {
                            tracing::warn!(polls = report.polls, "Recognition job failed");
                            let error = OcrError::RecognitionFailed("service reported failure".to_string());
                            return report.finish(JobState::Failed, Some(error));
                        }
                        JobStatus::NotStarted | JobStatus::Running | JobStatus::Unknown => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(poll = report.polls, error = %e, "Recognition poll failed");
                }
            }

            if report.polls >= max_attempts {
                tracing::warn!(polls = report.polls, "Recognition timed out");
                let error = OcrError::RecognitionTimeout(report.polls);
                return report.finish(JobState::TimedOut, Some(error));
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => report.suspensions += 1,
                _ = cancelled(&mut cancel) => {
                    tracing::info!(polls = report.polls, "Recognition cancelled");
                    return report.finish(JobState::Cancelled, Some(OcrError::Cancelled));
                }
            }
        }
    }
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves once cancellation is signalled; never resolves otherwise
async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Quad;
    use crate::layout::{Line, Provenance, Word};
    use crate::ocr::fallback::SIMULATED_CONFIDENCE;
    use crate::ocr::provider::ScriptedClient;
    use crate::ocr::types::PollResponse;
    use tokio::time::Instant;

    fn page() -> Page {
        Page::new(
            1,
            vec![Line::new(vec![
                Word::new("Hello", Quad::from_rect(0.0, 0.0, 50.0, 20.0)).with_confidence(0.9),
            ])],
        )
    }

    fn orchestrator(client: Arc<ScriptedClient>) -> RecognitionOrchestrator {
        RecognitionOrchestrator::new(RecognitionConfig::default(), Some(client))
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_running_polls_then_success() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(PollResponse::running()),
            Ok(PollResponse::running()),
            Ok(PollResponse::running()),
            Ok(PollResponse::succeeded(vec![page()])),
        ]));
        let orch = orchestrator(client.clone());

        let start = Instant::now();
        let report = orch.run_job(client.as_ref(), b"img", "image/png", None).await;

        assert_eq!(report.state, JobState::Succeeded);
        assert_eq!(report.polls, 4);
        assert_eq!(report.suspensions, 3);
        assert_eq!(report.pages.len(), 1);
        assert!(report.error.is_none());

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recognize_returns_real_result() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(PollResponse::succeeded(vec![page()]))]));
        let result = orchestrator(client).recognize(b"img", "image/png", 1, None).await;

        assert_eq!(result.provenance, Provenance::RealRecognition);
        assert_eq!(result.engine, "scripted");
        assert!((result.confidence - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_credential_is_simulated() {
        let orch = RecognitionOrchestrator::from_config(RecognitionConfig::default());
        assert!(!orch.is_configured());

        let result = orch.recognize(b"img", "image/png", 1, None).await;
        assert_eq!(result.provenance, Provenance::SimulatedFallback);
        assert_eq!(result.confidence, SIMULATED_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_invalid_language_disables_client() {
        let orch = RecognitionOrchestrator::from_config(RecognitionConfig {
            endpoint: Some("https://vision.example.com".into()),
            api_key: Some("secret".into()),
            language: Some("en;rm -rf".into()),
            ..Default::default()
        });
        assert!(!orch.is_configured());

        let orch = RecognitionOrchestrator::from_config(RecognitionConfig {
            endpoint: Some("https://vision.example.com".into()),
            api_key: Some("secret".into()),
            language: Some("en".into()),
            ..Default::default()
        });
        assert!(orch.is_configured());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_status_routes_to_simulation() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(PollResponse::running()),
            Ok(PollResponse::failed()),
        ]));
        let orch = orchestrator(client.clone());

        let report = orch.run_job(client.as_ref(), b"img", "image/png", None).await;
        assert_eq!(report.state, JobState::Failed);
        assert_eq!(report.polls, 2);

        let client = Arc::new(ScriptedClient::new(vec![Ok(PollResponse::failed())]));
        let result = orchestrator(client).recognize(b"img", "image/png", 3, None).await;
        assert!(result.is_simulated());
        assert_eq!(result.page_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_time_out() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let orch = orchestrator(client.clone());

        let start = Instant::now();
        let report = orch.run_job(client.as_ref(), b"img", "image/png", None).await;

        assert_eq!(report.state, JobState::TimedOut);
        assert_eq!(report.polls, 30);
        assert_eq!(report.suspensions, 29);
        assert_eq!(client.poll_count(), 30);
        assert!(matches!(report.error, Some(OcrError::RecognitionTimeout(30))));
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_consume_attempts() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(OcrError::Transport("reset".into())),
            Ok(PollResponse::running()),
            Ok(PollResponse::succeeded(vec![page()])),
        ]));
        let orch = orchestrator(client.clone());

        let report = orch.run_job(client.as_ref(), b"img", "image/png", None).await;
        assert_eq!(report.state, JobState::Succeeded);
        assert_eq!(report.polls, 3);
        assert_eq!(report.suspensions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_error_fails_without_polling() {
        let mut scripted = ScriptedClient::new(Vec::new());
        scripted.submit_error = true;
        let client = Arc::new(scripted);
        let orch = orchestrator(client.clone());

        let report = orch.run_job(client.as_ref(), b"img", "image/png", None).await;
        assert_eq!(report.state, JobState::Failed);
        assert_eq!(report.polls, 0);
        assert_eq!(client.poll_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_between_polls() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let orch = orchestrator(client.clone());
        let (tx, rx) = watch::channel(false);

        let cancel_later = async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            tx.send(true).unwrap();
        };
        let (report, _) = tokio::join!(
            orch.run_job(client.as_ref(), b"img", "image/png", Some(rx)),
            cancel_later
        );

        assert_eq!(report.state, JobState::Cancelled);
        assert_eq!(report.polls, 3);
        assert_eq!(report.suspensions, 2);
        assert!(matches!(report.error, Some(OcrError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_poll() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let orch = orchestrator(client.clone());
        let (_tx, rx) = watch::channel(true);

        let result = orch.recognize(b"img", "image/png", 1, Some(rx)).await;
        assert!(result.is_simulated());
        assert_eq!(client.poll_count(), 0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Submitted.is_terminal());
        assert!(!JobState::Polling.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }
}
