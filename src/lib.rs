//! # fatura2json
//!
//! Extract structured billing fields from utility-bill PDFs using an LLM.
//!
//! ## Why this crate?
//!
//! Bills are laid out for people, not parsers: every distributor prints the
//! same fields in a different place, and layouts change without notice.
//! Instead of maintaining coordinate-based templates, this crate pulls the
//! text out of the PDF, lets a language model map it to named fields, and
//! then makes the model's answer reliable: code fences and trailing commas
//! are repaired, Brazilian-formatted numbers (`1.234,56`) become real
//! numbers, and provenance is stamped into a reserved `_meta` key.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file, URL download, or in-memory bytes
//!  ├─ 2. Text     pdfium text of the selected pages, DD/MM/YYYY → YYYY-MM-DD
//!  ├─ 3. Prompt   system instruction + text capped at 120 000 chars
//!  ├─ 4. LLM      one completion call, temperature 0, 60 s timeout, no retry
//!  ├─ 5. Repair   strip ```json fences, drop trailing commas, parse
//!  ├─ 6. Locale   "1.234,56" → 1234.56 across the whole record
//!  └─ 7. Enrich   `_meta` = { fonte_arquivo, data_processamento, opcoes }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fatura2json::{ExtractionOptions, Extractor, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let extractor = Extractor::new(ExtractorConfig::default())?;
//!     let output = extractor
//!         .extract("fatura.pdf", &ExtractionOptions::default())
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&output.record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fatura2json` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod extractor;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_batch, extract_batch_collect, BatchItem, BatchStream};
pub use config::{ExtractionOptions, ExtractorConfig, ExtractorConfigBuilder, MAX_INPUT_CHARS};
pub use error::ExtractError;
pub use extractor::{extract, extract_sync, extract_to_file, write_record, Extractor};
pub use output::{ExtractionOutput, ExtractionStats};
pub use pipeline::llm::{Completion, CompletionClient};
pub use pipeline::text::{InMemoryDocument, PagedDocument};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
