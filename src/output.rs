//! Result types returned by the extractor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A successfully extracted bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Normalised record with `_meta` attached.
    pub record: Value,
    pub stats: ExtractionStats,
}

/// Counters and timings for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages whose text was read.
    pub pages_read: usize,
    /// Characters of extracted text, before truncation.
    pub text_chars: usize,
    /// Characters of text actually sent to the model.
    pub prompt_chars: usize,
    /// Whether the text was cut to fit the character budget.
    pub truncated: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}
