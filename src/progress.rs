//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to be told
//! when each document of a batch starts, succeeds or fails. The trait is
//! `Send + Sync` because documents of a batch are processed concurrently.
//!
//! # Example
//!
//! ```rust
//! use fatura2json::{ExtractionProgressCallback, ExtractorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, input: &str, _stats: &fatura2json::ExtractionStats) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{n}: {input} done");
//!     }
//! }
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ExtractionStats;
use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// All methods default to no-ops so callers only override what they need.
/// `on_document_*` may be called concurrently from different tasks.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any document is opened.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when work on `input` begins.
    fn on_document_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when `input` produced a record.
    fn on_document_complete(&self, input: &str, stats: &ExtractionStats) {
        let _ = (input, stats);
    }

    /// Called when `input` failed.
    fn on_document_error(&self, input: &str, error: &str) {
        let _ = (input, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
