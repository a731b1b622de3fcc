//! The extraction pipeline and its entry points.
//!
//! [`Extractor`] is built once from an [`ExtractorConfig`] and then shared
//! (it is cheap to clone) by every request a host handles. It holds no
//! mutable state: each call runs the stages of [`crate::pipeline`] start to
//! finish for one document.
//!
//! The free functions [`extract`], [`extract_sync`] and [`extract_to_file`]
//! build a throwaway extractor for one-off use.

use crate::config::{ExtractionOptions, ExtractorConfig, DEFAULT_MODEL};
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::enrich::{self, Provenance};
use crate::pipeline::llm::{CompletionClient, ProviderClient};
use crate::pipeline::prompt::Prompt;
use crate::pipeline::text::{self, PagedDocument, RawText};
use crate::pipeline::{input, locale, repair};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bill extractor: configuration plus a resolved completion client.
#[derive(Clone)]
pub struct Extractor {
    config: Arc<ExtractorConfig>,
    client: Arc<dyn CompletionClient>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Resolve the completion client and freeze the configuration.
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let client = resolve_client(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a bill from a local path or HTTP(S) URL.
    pub async fn extract(
        &self,
        input_str: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionOutput, ExtractError> {
        options.validate()?;
        let start = Instant::now();
        info!("Starting extraction: {}", input_str);

        let resolved = input::resolve_input(input_str, self.config.download_timeout_secs).await?;
        let name = resolved.name().to_string();
        let raw = text::read_pdf_text(
            resolved.path(),
            &name,
            options,
            self.config.password.as_deref(),
            self.config.normalize_locale,
        )
        .await;
        // Release any staged copy before the network call.
        drop(resolved);

        self.complete(&name, raw?, options, start).await
    }

    /// Extract a bill from PDF bytes held in memory.
    ///
    /// The bytes are staged in a temp file that is deleted as soon as the
    /// text has been read, whether or not reading succeeded.
    pub async fn extract_bytes(
        &self,
        bytes: &[u8],
        filename: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionOutput, ExtractError> {
        options.validate()?;
        let start = Instant::now();
        info!("Starting extraction: {} ({} bytes)", filename, bytes.len());

        let staged = input::stage_bytes(bytes, filename)?;
        let raw = text::read_pdf_text(
            staged.path(),
            filename,
            options,
            self.config.password.as_deref(),
            self.config.normalize_locale,
        )
        .await;
        drop(staged);

        self.complete(filename, raw?, options, start).await
    }

    /// Extract a bill from a document whose pages are already available.
    pub async fn extract_document(
        &self,
        doc: &(dyn PagedDocument + Sync),
        filename: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractionOutput, ExtractError> {
        options.validate()?;
        let start = Instant::now();
        let raw = text::extract_text(doc, options, self.config.normalize_locale);
        self.complete(filename, raw, options, start).await
    }

    /// Everything after text extraction: prompt, completion, repair,
    /// number normalisation, `_meta`.
    async fn complete(
        &self,
        source_name: &str,
        raw: RawText,
        options: &ExtractionOptions,
        start: Instant,
    ) -> Result<ExtractionOutput, ExtractError> {
        let extract_duration_ms = start.elapsed().as_millis() as u64;
        if raw.text.is_empty() {
            warn!("{}: no text extracted from {} pages", source_name, raw.pages_read);
        }

        let prompt = Prompt::assemble(
            self.config.system_prompt(),
            &raw.text,
            self.config.max_input_chars,
        );
        if prompt.truncated {
            debug!(
                "{}: text truncated to {} chars",
                source_name, self.config.max_input_chars
            );
        }

        let llm_start = Instant::now();
        let completion = self.client.complete(&prompt).await?;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        let record = repair::parse_response(&completion.content)?;
        let record = if self.config.normalize_locale {
            locale::normalize_numbers(record)
        } else {
            record
        };
        let record = enrich::enrich(record, &Provenance::now(source_name, *options));

        let stats = ExtractionStats {
            total_pages: raw.total_pages,
            pages_read: raw.pages_read,
            text_chars: raw.text.chars().count(),
            prompt_chars: prompt.user.chars().count(),
            truncated: prompt.truncated,
            input_tokens: completion.prompt_tokens,
            output_tokens: completion.completion_tokens,
            extract_duration_ms,
            llm_duration_ms,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Extraction complete: {} ({} pages, {}ms total)",
            source_name, stats.pages_read, stats.total_duration_ms
        );

        Ok(ExtractionOutput { record, stats })
    }
}

/// Extract a bill from a local path or URL with a one-off extractor.
pub async fn extract(
    input_str: impl AsRef<str>,
    options: &ExtractionOptions,
    config: &ExtractorConfig,
) -> Result<ExtractionOutput, ExtractError> {
    Extractor::new(config.clone())?
        .extract(input_str.as_ref(), options)
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    options: &ExtractionOptions,
    config: &ExtractorConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, options, config))
}

/// Extract a bill and write the record as pretty JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    options: &ExtractionOptions,
    config: &ExtractorConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract(input_str, options, config).await?;
    write_record(&output.record, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Atomically write `record` as pretty-printed JSON.
pub async fn write_record(record: &serde_json::Value, path: &Path) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut json = serde_json::to_string_pretty(record)
        .map_err(|e| ExtractError::Internal(format!("serialise record: {e}")))?;
    json.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Pick the completion client, from most-specific to least-specific:
///
/// 1. pre-built client (`config.client`)
/// 2. pre-built provider (`config.provider`)
/// 3. named provider + model (`config.provider_name`)
/// 4. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both set
/// 5. OpenAI when `OPENAI_API_KEY` is set
/// 6. `ProviderFactory::from_env` auto-detection
fn resolve_client(config: &ExtractorConfig) -> Result<Arc<dyn CompletionClient>, ExtractError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(ProviderClient::new(provider, config)))
}

fn resolve_provider(config: &ExtractorConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
