//! Error types for the fatura2json library.
//!
//! Every failure is fatal to the document being processed: the pipeline
//! never returns a partially populated record. The three failures the
//! pipeline itself produces are:
//!
//! * [`ExtractError::DocumentUnreadable`]: the input cannot be opened as a
//!   paged document (corrupt, not a PDF).
//! * [`ExtractError::CompletionServiceError`]: the LLM call failed or timed
//!   out. Never retried.
//! * [`ExtractError::ResponseNotJson`]: the model output could not be
//!   coerced into JSON after the bounded repair pass. The raw response is
//!   kept for diagnostics.
//!
//! The remaining variants cover input resolution, provider setup and
//! configuration. Hosts that expose the pipeline over a wire protocol can use
//! [`ExtractError::to_json`] to get the `{"error": "..."}` payload.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the fatura2json library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document cannot be opened as a paged document at all.
    #[error("Document '{source_name}' is unreadable: {detail}")]
    DocumentUnreadable { source_name: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The completion call failed or timed out.
    #[error("Completion service error: {message}")]
    CompletionServiceError { message: String },

    /// The model output is not JSON, even after the trailing-comma repair.
    #[error("Model response is not valid JSON: {detail}")]
    ResponseNotJson { raw: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or option validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Stable, machine-readable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::FileNotFound { .. } => "file_not_found",
            ExtractError::PermissionDenied { .. } => "permission_denied",
            ExtractError::InvalidInput { .. } => "invalid_input",
            ExtractError::DownloadFailed { .. } => "download_failed",
            ExtractError::DownloadTimeout { .. } => "download_timeout",
            ExtractError::DocumentUnreadable { .. } => "document_unreadable",
            ExtractError::PdfiumBindingFailed(_) => "pdfium_binding_failed",
            ExtractError::ProviderNotConfigured { .. } => "provider_not_configured",
            ExtractError::CompletionServiceError { .. } => "completion_service_error",
            ExtractError::ResponseNotJson { .. } => "response_not_json",
            ExtractError::OutputWriteFailed { .. } => "output_write_failed",
            ExtractError::InvalidConfig(_) => "invalid_config",
            ExtractError::Internal(_) => "internal",
        }
    }

    /// The raw model output, when the failure happened while parsing it.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ExtractError::ResponseNotJson { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Render the error as the `{"error": "<message>"}` payload.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}
