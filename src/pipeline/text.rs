//! Text extraction: select pages and join their text into one string.
//!
//! A document is anything implementing [`PagedDocument`]. PDFs go through
//! pdfium ([`read_pdf_text`]); callers that already hold page text (OCR
//! output, fixtures) use [`InMemoryDocument`].
//!
//! ## Why spawn_blocking?
//!
//! pdfium keeps thread-local state and is not safe to drive from async
//! contexts, so PDF reading runs on tokio's blocking pool. The document is
//! closed before the function returns; nothing from pdfium outlives text
//! extraction.

use crate::config::ExtractionOptions;
use crate::error::ExtractError;
use crate::pipeline::locale;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// A document made of ordered pages with best-effort text.
pub trait PagedDocument {
    fn page_count(&self) -> usize;

    /// Text of page `index` (0-based). `None` when the page has no
    /// recoverable text, e.g. a scanned image.
    fn page_text(&self, index: usize) -> Option<String>;
}

/// A document whose page texts are already known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryDocument {
    pages: Vec<Option<String>>,
}

impl InMemoryDocument {
    pub fn new(pages: Vec<Option<String>>) -> Self {
        Self { pages }
    }

    /// Convenience constructor where every page has text.
    pub fn from_texts<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(|p| Some(p.into())).collect(),
        }
    }
}

impl PagedDocument for InMemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        self.pages.get(index).cloned().flatten()
    }
}

/// Extracted text and how many pages it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText {
    pub text: String,
    pub pages_read: usize,
    pub total_pages: usize,
}

/// Join the text of the selected pages.
///
/// Pages without text contribute an empty string. The joined text has its
/// dates canonicalised when `normalize_dates` is set, then is trimmed.
pub fn extract_text(
    doc: &dyn PagedDocument,
    options: &ExtractionOptions,
    normalize_dates: bool,
) -> RawText {
    let total_pages = doc.page_count();
    let indices = options.page_indices(total_pages);
    let pages_read = indices.len();

    let joined = indices
        .map(|i| {
            doc.page_text(i).unwrap_or_else(|| {
                debug!("Page {} has no extractable text", i + 1);
                String::new()
            })
        })
        .collect::<Vec<_>>()
        .join("\n");

    let text = if normalize_dates {
        locale::normalize_dates(&joined)
    } else {
        joined
    };

    RawText {
        text: text.trim().to_string(),
        pages_read,
        total_pages,
    }
}

// ── PDF via pdfium ───────────────────────────────────────────────────────────

/// [`PagedDocument`] view over an open pdfium document.
struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PagedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Option<String> {
        let page = self.document.pages().get(index as u16).ok()?;
        let text = page.text().ok()?.all();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Read the selected pages of the PDF at `pdf_path`.
///
/// `source_name` is only used in error messages.
pub async fn read_pdf_text(
    pdf_path: &Path,
    source_name: &str,
    options: &ExtractionOptions,
    password: Option<&str>,
    normalize_dates: bool,
) -> Result<RawText, ExtractError> {
    let path = pdf_path.to_path_buf();
    let name = source_name.to_string();
    let options = *options;
    let password = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        read_pdf_text_blocking(&path, &name, &options, password.as_deref(), normalize_dates)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn read_pdf_text_blocking(
    pdf_path: &Path,
    source_name: &str,
    options: &ExtractionOptions,
    password: Option<&str>,
    normalize_dates: bool,
) -> Result<RawText, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| ExtractError::DocumentUnreadable {
            source_name: source_name.to_string(),
            detail: format!("{:?}", e),
        })?;

    let doc = PdfiumDocument { document };
    let raw = extract_text(&doc, options, normalize_dates);
    info!(
        "Extracted {} chars from {}/{} pages of {}",
        raw.text.chars().count(),
        raw.pages_read,
        raw.total_pages,
        source_name
    );
    Ok(raw)
}

/// Bind to pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the
/// system library.
fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty());

    let bindings = match from_env {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_pages() -> InMemoryDocument {
        InMemoryDocument::from_texts(["página um", "página dois", "página três"])
    }

    #[test]
    fn first_page_only() {
        let raw = extract_text(&three_pages(), &ExtractionOptions::default(), true);
        assert_eq!(raw.text, "página um");
        assert_eq!(raw.pages_read, 1);
        assert_eq!(raw.total_pages, 3);
    }

    #[test]
    fn page_limit_two_joins_with_one_newline() {
        let opts = ExtractionOptions::with_page_limit(2).unwrap();
        let raw = extract_text(&three_pages(), &opts, true);
        assert_eq!(raw.text, "página um\npágina dois");
        assert_eq!(raw.pages_read, 2);
    }

    #[test]
    fn all_pages_in_order() {
        let raw = extract_text(&three_pages(), &ExtractionOptions::all_pages(), true);
        assert_eq!(raw.text, "página um\npágina dois\npágina três");
    }

    #[test]
    fn textless_page_contributes_empty_string() {
        let doc = InMemoryDocument::new(vec![
            Some("a".into()),
            None,
            Some("c".into()),
        ]);
        let raw = extract_text(&doc, &ExtractionOptions::all_pages(), true);
        assert_eq!(raw.text, "a\n\nc");
    }

    #[test]
    fn result_is_trimmed() {
        let doc = InMemoryDocument::new(vec![None, Some("  conteúdo  \n".into())]);
        let raw = extract_text(&doc, &ExtractionOptions::all_pages(), true);
        assert_eq!(raw.text, "conteúdo");
    }

    #[test]
    fn dates_rewritten_only_when_enabled() {
        let doc = InMemoryDocument::from_texts(["Vencimento 10/09/2024"]);
        let opts = ExtractionOptions::default();
        assert_eq!(extract_text(&doc, &opts, true).text, "Vencimento 2024-09-10");
        assert_eq!(extract_text(&doc, &opts, false).text, "Vencimento 10/09/2024");
    }

    #[test]
    fn dates_split_across_pages_are_not_joined() {
        let doc = InMemoryDocument::from_texts(["10/09", "/2024"]);
        let raw = extract_text(&doc, &ExtractionOptions::all_pages(), true);
        assert_eq!(raw.text, "10/09\n/2024");
    }

    #[test]
    fn empty_document_yields_empty_text() {
        let raw = extract_text(&InMemoryDocument::default(), &ExtractionOptions::default(), true);
        assert_eq!(raw.text, "");
        assert_eq!(raw.pages_read, 0);
    }
}
