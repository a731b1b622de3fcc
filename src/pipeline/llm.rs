//! Completion client: one LLM call per document.
//!
//! The pipeline talks to the model through the [`CompletionClient`] trait so
//! hosts can swap the transport (or script responses in tests) without
//! touching the rest of the pipeline. [`ProviderClient`] is the production
//! implementation over an `edgequake_llm` provider.
//!
//! There is no retry here. A failed or timed-out call is terminal for the
//! document and surfaces as [`ExtractError::CompletionServiceError`] with the
//! upstream message.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::pipeline::prompt::Prompt;
use edgequake_llm::{CompletionOptions, LLMProvider};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Text of the first completion choice plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can turn a [`Prompt`] into raw model text.
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<Completion, ExtractError>>;
}

/// [`CompletionClient`] backed by an `edgequake_llm` provider.
///
/// Sampling parameters are fixed at construction from the config.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractorConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

impl CompletionClient for ProviderClient {
    fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<Completion, ExtractError>> {
        Box::pin(async move {
            let start = Instant::now();
            let messages = prompt.to_messages();

            let response = bounded_call(
                self.timeout,
                self.provider.chat(&messages, Some(&self.options)),
            )
            .await?;

            debug!(
                "Completion: {} input tokens, {} output tokens, {:?}",
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            Ok(Completion {
                content: response.content,
                prompt_tokens: response.prompt_tokens as usize,
                completion_tokens: response.completion_tokens as usize,
            })
        })
    }
}

/// Await one upstream call under `limit`.
///
/// A timeout or an upstream error becomes
/// [`ExtractError::CompletionServiceError`] carrying the upstream message.
/// The call is awaited once and never retried.
async fn bounded_call<T, E, F>(limit: Duration, call: F) -> Result<T, ExtractError>
where
    E: fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    timeout(limit, call)
        .await
        .map_err(|_| {
            warn!("Completion timed out after {}s", limit.as_secs());
            ExtractError::CompletionServiceError {
                message: format!("request timed out after {}s", limit.as_secs()),
            }
        })?
        .map_err(|e| {
            warn!("Completion failed: {}", e);
            ExtractError::CompletionServiceError {
                message: e.to_string(),
            }
        })
}

/// Build `CompletionOptions` from the extractor config.
fn build_options(config: &ExtractorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn build_options_defaults() {
        let config = ExtractorConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(2500));
    }

    struct Echo;

    impl CompletionClient for Echo {
        fn complete<'a>(
            &'a self,
            prompt: &'a Prompt,
        ) -> BoxFuture<'a, Result<Completion, ExtractError>> {
            Box::pin(async move {
                Ok(Completion {
                    content: prompt.user.clone(),
                    ..Default::default()
                })
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out_once() {
        let calls = AtomicUsize::new(0);
        let call = async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>("{}")
        };

        let err = bounded_call(Duration::from_secs(1), call).await.unwrap_err();
        match err {
            ExtractError::CompletionServiceError { message } => {
                assert!(message.contains("timed out"), "got: {message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_error_keeps_its_message() {
        let calls = AtomicUsize::new(0);
        let call = async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<&str, _>("HTTP 429: rate limit exceeded")
        };

        let err = bounded_call(Duration::from_secs(60), call).await.unwrap_err();
        assert!(matches!(err, ExtractError::CompletionServiceError { .. }));
        assert!(err.to_string().contains("HTTP 429: rate limit exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_upstream_passes_through() {
        let call = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, String>("{\"a\": 1}")
        };
        let out = bounded_call(Duration::from_secs(1), call).await.unwrap();
        assert_eq!(out, "{\"a\": 1}");
    }

    #[test]
    fn client_trait_is_object_safe() {
        let client: Arc<dyn CompletionClient> = Arc::new(Echo);
        let prompt = Prompt::assemble("sys", "{}", 100);
        let completion = tokio_test::block_on(client.complete(&prompt)).unwrap();
        assert_eq!(completion.content, "{}");
    }
}
