//! Configuration types for bill extraction.
//!
//! Two values control a run:
//!
//! * [`ExtractorConfig`]: process-wide, immutable once built: which model
//!   to call, sampling parameters, the system instruction, input limits.
//!   Built via [`ExtractorConfigBuilder`] and handed to
//!   [`crate::Extractor::new`], so nothing in the pipeline reads ambient
//!   globals.
//! * [`ExtractionOptions`]: per document: which pages to read. Echoed back
//!   in the `_meta` block of every result.

use crate::error::ExtractError;
use crate::pipeline::llm::CompletionClient;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hard ceiling on the number of characters of document text sent to the model.
pub const MAX_INPUT_CHARS: usize = 120_000;

/// Largest accepted value for [`ExtractionOptions::page_limit`].
pub const MAX_PAGE_LIMIT: u8 = 10;

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Per-document page selection.
///
/// `first_page_only` takes precedence: when it is `true`, `page_limit` is
/// ignored. Bills carry every field this crate cares about on page one, so
/// that is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    pub first_page_only: bool,
    pub page_limit: Option<u8>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            first_page_only: true,
            page_limit: None,
        }
    }
}

impl ExtractionOptions {
    /// Options that read the whole document.
    pub fn all_pages() -> Self {
        Self {
            first_page_only: false,
            page_limit: None,
        }
    }

    /// Options that read the first `limit` pages (1–10).
    pub fn with_page_limit(limit: u8) -> Result<Self, ExtractError> {
        let options = Self {
            first_page_only: false,
            page_limit: Some(limit),
        };
        options.validate()?;
        Ok(options)
    }

    /// Reject a `page_limit` outside 1–10.
    pub fn validate(&self) -> Result<(), ExtractError> {
        match self.page_limit {
            Some(n) if n == 0 || n > MAX_PAGE_LIMIT => Err(ExtractError::InvalidConfig(format!(
                "page_limit must be 1–{MAX_PAGE_LIMIT}, got {n}"
            ))),
            _ => Ok(()),
        }
    }

    /// 0-based indices of the pages to read from a document of `total_pages`.
    pub fn page_indices(&self, total_pages: usize) -> std::ops::Range<usize> {
        let end = if self.first_page_only {
            1
        } else if let Some(limit) = self.page_limit {
            limit as usize
        } else {
            total_pages
        };
        0..end.min(total_pages)
    }
}

/// Configuration for an [`crate::Extractor`].
///
/// # Example
/// ```rust
/// use fatura2json::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_tokens(2000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_input_chars, 120_000);
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// LLM model identifier. If None, [`DEFAULT_MODEL`] is used when a
    /// provider has to be created.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion client. Takes precedence over everything
    /// else; this is how tests and custom transports plug in.
    pub client: Option<Arc<dyn CompletionClient>>,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Field extraction wants the same answer for the same bill every time.
    pub temperature: f32,

    /// Output token ceiling for the completion. Default: 2500.
    pub max_tokens: usize,

    /// Completion call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// System instruction. If None, [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Characters of document text sent to the model. Default and ceiling:
    /// [`MAX_INPUT_CHARS`].
    pub max_input_chars: usize,

    /// Rewrite dates before the model call and Brazilian-formatted numbers
    /// after it. Default: true.
    pub normalize_locale: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Documents processed at once by [`crate::batch::extract_batch`]. Default: 4.
    pub concurrency: usize,

    /// Optional observer for batch progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            client: None,
            temperature: 0.0,
            max_tokens: 2500,
            api_timeout_secs: 60,
            system_prompt: None,
            max_input_chars: MAX_INPUT_CHARS,
            normalize_locale: true,
            password: None,
            download_timeout_secs: 120,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("client", &self.client.as_ref().map(|_| "<dyn CompletionClient>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("max_input_chars", &self.max_input_chars)
            .field("normalize_locale", &self.normalize_locale)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system instruction actually sent to the model.
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYSTEM_PROMPT)
    }
}

/// Builder for [`ExtractorConfig`].
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl fmt::Debug for ExtractorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractorConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Lower the input character budget. Values above [`MAX_INPUT_CHARS`]
    /// are clamped down to it.
    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n.min(MAX_INPUT_CHARS);
        self
    }

    pub fn normalize_locale(mut self, v: bool) -> Self {
        self.config.normalize_locale = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.max_input_chars == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig(
                "system prompt is empty".into(),
            ));
        }
        Ok(self.config)
    }
}
