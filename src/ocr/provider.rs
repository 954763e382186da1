//! Recognition Clients
//!
//! Defines the client seam the orchestrator drives and the HTTP client for
//! the asynchronous "Read" REST protocol.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::types::{JobHandle, OcrError, PollResponse, ReadOperation};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";
const READ_ANALYZE_PATH: &str = "vision/v3.2/read/analyze";

/// Asynchronous recognition client: submit once, poll until terminal
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Engine tag recorded on results
    fn engine_tag(&self) -> &str;

    /// Submit a document for recognition
    async fn submit(&self, data: &[u8], content_type: &str) -> Result<JobHandle, OcrError>;

    /// Poll a submitted job
    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, OcrError>;
}

/// Validate a language hint before it is put on the wire
/// (e.g. "en", "eng+deu", "zh_Hans")
pub fn validate_language(lang: &str) -> Result<(), OcrError> {
    if lang.is_empty() || lang.len() > 20 {
        return Err(OcrError::InvalidLanguage(format!(
            "invalid length {}",
            lang.len()
        )));
    }
    for c in lang.chars() {
        if !c.is_ascii_alphanumeric() && c != '+' && c != '_' {
            return Err(OcrError::InvalidLanguage(format!(
                "invalid character in language code: {}",
                c
            )));
        }
    }
    Ok(())
}

/// Client for the "Read" REST API
pub struct ReadApiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: Option<String>,
}

impl ReadApiClient {
    pub fn new(endpoint: &str, api_key: &str, language: Option<&str>) -> Result<Self, OcrError> {
        if let Some(lang) = language {
            validate_language(lang)?;
        }

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.map(str::to_string),
        })
    }

    fn analyze_url(&self) -> String {
        match &self.language {
            Some(lang) => format!("{}/{}?language={}", self.endpoint, READ_ANALYZE_PATH, lang),
            None => format!("{}/{}", self.endpoint, READ_ANALYZE_PATH),
        }
    }
}

#[async_trait]
impl RecognitionClient for ReadApiClient {
    fn engine_tag(&self) -> &str {
        "read-api"
    }

    async fn submit(&self, data: &[u8], content_type: &str) -> Result<JobHandle, OcrError> {
        let response = self
            .http
            .post(self.analyze_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::RecognitionFailed(format!(
                "submission rejected with {}: {}",
                status, body
            )));
        }

        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                OcrError::InvalidResponse(format!("missing {} header", OPERATION_LOCATION_HEADER))
            })?;

        tracing::debug!(operation = %location, "Recognition job submitted");
        Ok(JobHandle(location.to_string()))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, OcrError> {
        let response = self
            .http
            .get(&handle.0)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OcrError::Transport(format!(
                "poll returned {}",
                response.status()
            )));
        }

        let operation: ReadOperation = response
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(format!("failed to parse poll body: {}", e)))?;

        Ok(operation.into_poll_response())
    }
}

/// Scripted client for testing
#[cfg(test)]
pub struct ScriptedClient {
    pub submit_error: bool,
    script: std::sync::Mutex<std::collections::VecDeque<Result<PollResponse, OcrError>>>,
    pub submits: std::sync::atomic::AtomicUsize,
    pub polls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedClient {
    /// Replays `script` in order, then reports `running` forever
    pub fn new(script: Vec<Result<PollResponse, OcrError>>) -> Self {
        Self {
            submit_error: false,
            script: std::sync::Mutex::new(script.into()),
            submits: Default::default(),
            polls: Default::default(),
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl RecognitionClient for ScriptedClient {
    fn engine_tag(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, _data: &[u8], _content_type: &str) -> Result<JobHandle, OcrError> {
        self.submits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.submit_error {
            return Err(OcrError::Transport("connection refused".to_string()));
        }
        Ok(JobHandle("job-1".to_string()))
    }

    async fn poll(&self, _handle: &JobHandle) -> Result<PollResponse, OcrError> {
        self.polls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PollResponse::running()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_language() {
        assert!(validate_language("en").is_ok());
        assert!(validate_language("eng+deu").is_ok());
        assert!(validate_language("zh_Hans").is_ok());

        assert!(validate_language("").is_err());
        assert!(validate_language("en&model=x").is_err());
        assert!(validate_language("a".repeat(21).as_str()).is_err());
    }

    #[test]
    fn test_client_rejects_invalid_language() {
        let result = ReadApiClient::new("https://example.invalid", "key", Some("en us"));
        assert!(matches!(result, Err(OcrError::InvalidLanguage(_))));
    }

    #[test]
    fn test_analyze_url() {
        let client = ReadApiClient::new("https://vision.example.com/", "key", Some("de")).unwrap();
        assert_eq!(
            client.analyze_url(),
            "https://vision.example.com/vision/v3.2/read/analyze?language=de"
        );

        let client = ReadApiClient::new("https://vision.example.com", "key", None).unwrap();
        assert_eq!(
            client.analyze_url(),
            "https://vision.example.com/vision/v3.2/read/analyze"
        );
        assert_eq!(client.engine_tag(), "read-api");
    }
}
