//! Batch extraction: many documents, results streamed as they finish.
//!
//! Documents are independent, so up to `config.concurrency` of them are in
//! flight at once. Each one runs in its own tokio task: a panic inside one
//! document is reported as [`ExtractError::Internal`] for that item and the
//! rest of the batch carries on.
//!
//! Results arrive in completion order, not input order.

use crate::config::ExtractionOptions;
use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::output::ExtractionOutput;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::warn;

/// The outcome for one input of a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// The input string exactly as given.
    pub input: String,
    pub result: Result<ExtractionOutput, ExtractError>,
}

/// A boxed stream of batch items.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Extract every input (local path or URL) with the same options.
///
/// Progress events go to the configured
/// [`crate::progress::ExtractionProgressCallback`], except
/// `on_batch_complete`, which needs the final tally and is fired by
/// [`extract_batch_collect`].
pub fn extract_batch(
    extractor: &Extractor,
    inputs: Vec<String>,
    options: ExtractionOptions,
) -> BatchStream {
    let concurrency = extractor.config().concurrency.max(1);
    if let Some(ref cb) = extractor.config().progress_callback {
        cb.on_batch_start(inputs.len());
    }

    let extractor = extractor.clone();
    let s = stream::iter(inputs.into_iter().map(move |input| {
        let extractor = extractor.clone();
        async move {
            let callback = extractor.config().progress_callback.clone();
            if let Some(ref cb) = callback {
                cb.on_document_start(&input);
            }

            let task_input = input.clone();
            let result = tokio::spawn(async move { extractor.extract(&task_input, &options).await })
                .await
                .unwrap_or_else(|e| {
                    warn!("Extraction task for {} aborted: {}", input, e);
                    Err(ExtractError::Internal(format!("extraction task failed: {e}")))
                });

            if let Some(ref cb) = callback {
                match &result {
                    Ok(output) => cb.on_document_complete(&input, &output.stats),
                    Err(e) => cb.on_document_error(&input, &e.to_string()),
                }
            }

            BatchItem { input, result }
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

/// Run [`extract_batch`] to completion and return items in input order.
pub async fn extract_batch_collect(
    extractor: &Extractor,
    inputs: Vec<String>,
    options: ExtractionOptions,
) -> Vec<BatchItem> {
    let order: Vec<String> = inputs.clone();
    let total = inputs.len();
    let mut items: Vec<BatchItem> = extract_batch(extractor, inputs, options).collect().await;
    items.sort_by_key(|item| order.iter().position(|i| *i == item.input));

    let succeeded = items.iter().filter(|i| i.result.is_ok()).count();
    if let Some(ref cb) = extractor.config().progress_callback {
        cb.on_batch_complete(total, succeeded);
    }
    items
}
