//! Pipeline stages for bill-to-JSON extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ prompt ──▶ llm ──▶ repair ──▶ locale ──▶ enrich
//! (stage)  (pdfium)  (truncate) (LLM)  (fences,   (numbers)  (_meta)
//!          + dates                      commas)
//! ```
//!
//! 1. [`input`] : resolve a path/URL/byte buffer to a local PDF file
//! 2. [`text`]  : select pages, join their text, canonicalise dates
//! 3. [`prompt`]: system instruction + text capped at the character budget
//! 4. [`llm`]   : the single completion call; the only network I/O
//! 5. [`repair`]: strip code fences, fix trailing commas, parse JSON
//! 6. [`locale`]: Brazilian-formatted numeric strings become numbers
//! 7. [`enrich`]: attach `_meta` provenance

pub mod enrich;
pub mod input;
pub mod llm;
pub mod locale;
pub mod prompt;
pub mod repair;
pub mod text;
