//! Configuration management for scanlayer

use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::layout::{SegmenterConfig, SpacingConfig, WordListConfig};
use crate::ocr::RecognitionConfig;
use crate::overlay::OverlayConfig;
use crate::probe::ProbeConfig;

/// Content types accepted by the pipeline
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/tiff",
    "image/bmp",
    "image/gif",
    "image/webp",
    "application/pdf",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recognition: RecognitionConfig,
    pub spacing: SpacingConfig,
    pub words: WordListConfig,
    pub segmenter: SegmenterConfig,
    pub probe: ProbeConfig,
    pub overlay: OverlayConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitsConfig {
    /// Largest accepted source document
    pub max_input_bytes: usize,
    pub supported_content_types: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 50 * 1024 * 1024,
            supported_content_types: SUPPORTED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load `.env` (if present), then read the environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read `SCANLAYER_*` variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let recognition = &mut config.recognition;
        recognition.endpoint = non_empty("SCANLAYER_ENDPOINT");
        recognition.api_key = non_empty("SCANLAYER_API_KEY");
        recognition.language = non_empty("SCANLAYER_LANGUAGE");
        parse_into(&lookup, "SCANLAYER_POLL_INTERVAL_MS", &mut recognition.poll_interval_ms);
        parse_into(&lookup, "SCANLAYER_MAX_POLL_ATTEMPTS", &mut recognition.max_poll_attempts);

        parse_into(&lookup, "SCANLAYER_MAX_INPUT_BYTES", &mut config.limits.max_input_bytes);
        parse_into(&lookup, "SCANLAYER_PROBE_THRESHOLD", &mut config.probe.indicator_threshold);
        parse_into(&lookup, "SCANLAYER_DESCENT_FRACTION", &mut config.overlay.descent_fraction);

        config
    }
}

/// Overwrite `target` when `key` is set and parses
fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!("Ignoring invalid {}: {:?}", key, raw),
    }
}
