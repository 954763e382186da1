//! Existence Prober
//!
//! Decides whether a document already carries a usable text layer before
//! any recognition work is spent on it. The decision counts text-rendering
//! operators and font declarations against a conservative threshold, since
//! a false negative only costs a redundant recognition pass.
//!
//! Operators are counted in decoded page content when the document parses.
//! Otherwise the raw bytes are scanned with image and font-program stream
//! bodies masked out: compressed scans are noise and match operators by
//! chance.
//!
//! When the scan says text is present, the text is also extracted so the
//! skip path hands real content to the caller.

use lopdf::{Document, Object};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// Text operators (`BT`, `Tj`, `TJ`, `Tf`) and font resources
static TEXT_INDICATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)/Type\s*/Font\b|/ToUnicode\b|\bBT\b|\bT[jJf]\b").unwrap()
});

/// Start of a stream body
static STREAM_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u)\bstream\r?\n").unwrap());

static STREAM_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u)\bendstream\b").unwrap());

/// Stream dictionaries whose bodies are binary payloads, never page content
static BINARY_STREAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)/Subtype\s*/Image\b|/(?:DCT|JPX|CCITTFax|JBIG2)Decode\b|/Length[123]\b")
        .unwrap()
});

/// Page objects, used when the page tree cannot be parsed
static PAGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u)/Type\s*/Page\b").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeConfig {
    /// `has_text` requires strictly more indicators than this
    pub indicator_threshold: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            indicator_threshold: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("PDF parsing error: {0}")]
    Parse(String),

    #[error("Text extraction error: {0}")]
    Extraction(String),
}

impl From<lopdf::Error> for ProbeError {
    fn from(e: lopdf::Error) -> Self {
        ProbeError::Parse(e.to_string())
    }
}

/// Outcome of probing a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub has_text: bool,
    /// Extracted text layer; empty unless `has_text`
    pub extracted_text: String,
    pub page_count: usize,
    pub indicator_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExistenceProber {
    config: ProbeConfig,
}

impl ExistenceProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probe raw document bytes. Never fails: unparsable documents report
    /// whatever the byte scan found.
    pub fn probe(&self, bytes: &[u8]) -> ProbeReport {
        let parsed = Document::load_mem(bytes);
        let indicator_count = match &parsed {
            Ok(doc) => count_in_document(doc),
            Err(_) => count_in_bytes(bytes),
        };
        let has_text = indicator_count > self.config.indicator_threshold;

        let page_count = match &parsed {
            Ok(doc) => doc.get_pages().len(),
            Err(e) => {
                tracing::debug!(error = %e, "Page tree unreadable, counting page markers");
                PAGE_MARKER.find_iter(bytes).count()
            }
        };

        let extracted_text = match (&parsed, has_text) {
            (Ok(doc), true) => extract_text(doc).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Text layer detected but extraction failed");
                String::new()
            }),
            _ => String::new(),
        };

        tracing::debug!(indicator_count, has_text, page_count, "Probed document");

        ProbeReport {
            has_text,
            extracted_text,
            page_count,
            indicator_count,
        }
    }
}

/// Operators in decoded page content plus font resources
fn count_in_document(doc: &Document) -> usize {
    let operators: usize = doc
        .get_pages()
        .values()
        .filter_map(|&page_id| doc.get_page_content(page_id).ok())
        .map(|content| TEXT_INDICATOR.find_iter(&content).count())
        .sum();

    let resources: usize = doc
        .objects
        .values()
        .map(|object| {
            let dict = match object {
                Object::Dictionary(dict) => dict,
                Object::Stream(stream) => &stream.dict,
                _ => return 0,
            };
            let font = dict
                .get(b"Type")
                .and_then(Object::as_name)
                .map_or(false, |name| name == b"Font");
            usize::from(font) + usize::from(dict.has(b"ToUnicode"))
        })
        .sum();

    operators + resources
}

/// Raw byte scan that skips binary stream bodies
fn count_in_bytes(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut cursor = 0;

    while let Some(start) = STREAM_START.find_at(bytes, cursor) {
        let body_end = STREAM_END
            .find_at(bytes, start.end())
            .map_or(bytes.len(), |end| end.start());

        // Dictionary of this stream: from its `obj` keyword, or the end of
        // the previous stream
        let head = &bytes[cursor..start.start()];
        let dict_start = head
            .windows(3)
            .rposition(|w| w == b"obj")
            .map_or(cursor, |i| cursor + i);
        let binary = BINARY_STREAM.is_match(&bytes[dict_start..start.start()]);

        count += TEXT_INDICATOR.find_iter(head).count();
        if !binary {
            count += TEXT_INDICATOR.find_iter(&bytes[start.end()..body_end]).count();
        }
        cursor = body_end;
    }

    count + TEXT_INDICATOR.find_iter(&bytes[cursor..]).count()
}

/// Extract the text of every page, skipping pages that fail individually
fn extract_text(doc: &Document) -> Result<String, ProbeError> {
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Ok(String::new());
    }

    match doc.extract_text(&page_numbers) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(whole) => {
            let mut out = String::new();
            for number in &page_numbers {
                if let Ok(page_text) = doc.extract_text(&[*number]) {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&page_text);
                }
            }
            if out.trim().is_empty() {
                return Err(ProbeError::Extraction(whole.to_string()));
            }
            Ok(out.trim().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_text_document_has_text() {
        let pdf = testing::text_pdf(&["Searchable first line", "Second line"]);
        let report = ExistenceProber::default().probe(&pdf);

        assert!(report.indicator_count >= 6, "got {}", report.indicator_count);
        assert!(report.has_text);
        assert_eq!(report.page_count, 1);
        assert!(report.extracted_text.contains("Searchable"));
    }

    #[test]
    fn test_scanned_document_has_no_text() {
        let pdf = testing::scanned_pdf(3, 612.0, 792.0);
        let report = ExistenceProber::default().probe(&pdf);

        assert_eq!(report.indicator_count, 0);
        assert!(!report.has_text);
        assert_eq!(report.page_count, 3);
        assert!(report.extracted_text.is_empty());
    }

    #[test]
    fn test_large_scanned_image_is_not_text() {
        let pdf = testing::scanned_image_pdf(1_000_000);
        assert!(TEXT_INDICATOR.find_iter(&pdf).count() > 100);

        let report = ExistenceProber::default().probe(&pdf);
        assert_eq!(report.indicator_count, 0);
        assert!(!report.has_text);
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn test_raw_scan_skips_image_streams() {
        let image = b"1 0 obj << /Subtype /Image /Filter /DCTDecode /Length 24 >> stream\n\
                      BT Tj BT Tj BT Tj BT Tj\nendstream endobj";
        assert_eq!(count_in_bytes(image), 0);
        assert!(!ExistenceProber::default().probe(image).has_text);

        let content = b"2 0 obj << /Length 17 >> stream\nBT Tj BT Tj BT Tj\nendstream endobj\n\
                        3 0 obj << /Type /Font >> endobj";
        assert_eq!(count_in_bytes(content), 7);
    }

    #[test]
    fn test_unterminated_stream_is_scanned_to_end() {
        let bytes = b"1 0 obj << /Length 99 >> stream\nBT Tj BT Tj BT Tj";
        assert_eq!(count_in_bytes(bytes), 6);
    }

    #[test]
    fn test_threshold_is_strict() {
        let bytes = b"BT Tj ET BT Tj ET BT Tj";
        assert_eq!(TEXT_INDICATOR.find_iter(bytes).count(), 6);
        assert!(ExistenceProber::default().probe(bytes).has_text);

        let bytes = b"BT Tj ET BT Tj ET BT";
        assert!(!ExistenceProber::default().probe(bytes).has_text);

        let strict = ExistenceProber::new(ProbeConfig {
            indicator_threshold: 10,
        });
        assert!(!strict.probe(b"BT Tj ET BT Tj ET BT Tj").has_text);
    }

    #[test]
    fn test_operators_inside_words_do_not_count() {
        let bytes = b"OBTAIN TjX aTf /Type /Fonts";
        assert_eq!(TEXT_INDICATOR.find_iter(bytes).count(), 0);
    }

    #[test]
    fn test_unparsable_bytes_fall_back_to_page_markers() {
        let bytes = b"garbage /Type /Pages /Type /Page /Type/Page";
        let report = ExistenceProber::default().probe(bytes);
        assert_eq!(report.page_count, 2);
        assert!(!report.has_text);
    }
}
