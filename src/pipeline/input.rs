//! Input resolution: turn a path, URL or byte buffer into a local PDF file.
//!
//! pdfium opens documents by path, so remote and in-memory inputs are staged
//! in temporary storage first. The temp file lives exactly as long as the
//! [`ResolvedInput`]; the extractor drops it right after text extraction, on
//! success and failure alike, and well before the completion call.

use crate::error::ExtractError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input and the filename reported in `_meta`.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, name: String },
    /// Input was a URL; PDF downloaded to a temp directory.
    Downloaded {
        path: PathBuf,
        name: String,
        _temp_dir: TempDir,
    },
    /// Input arrived as bytes and was written to a temp file.
    Staged { name: String, file: NamedTempFile },
}

impl ResolvedInput {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Staged { file, .. } => file.path(),
        }
    }

    /// Source filename as the caller knows it.
    pub fn name(&self) -> &str {
        match self {
            ResolvedInput::Local { name, .. }
            | ResolvedInput::Downloaded { name, .. }
            | ResolvedInput::Staged { name, .. } => name,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    if input.trim().is_empty() {
        return Err(ExtractError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Write an in-memory document to a temp file.
///
/// `filename` is what ends up in `_meta.fonte_arquivo`.
pub fn stage_bytes(bytes: &[u8], filename: &str) -> Result<ResolvedInput, ExtractError> {
    check_magic(bytes, filename)?;

    let mut file = NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;

    debug!("Staged {} ({} bytes) at {}", filename, bytes.len(), file.path().display());
    Ok(ResolvedInput::Staged {
        name: filename.to_string(),
        file,
    })
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, ExtractError> {
    let path = PathBuf::from(path_str);
    let name = file_name_of(&path);

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            let n = f.read(&mut magic).unwrap_or(0);
            check_magic(&magic[..n], &name)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local { path, name })
}

/// Download a URL to a temporary directory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = filename_from_url(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    check_magic(&bytes, &name)?;

    let temp_dir = TempDir::new().map_err(|e| ExtractError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(&name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), path.display());

    Ok(ResolvedInput::Downloaded {
        path,
        name,
        _temp_dir: temp_dir,
    })
}

/// Reject anything that does not start with `%PDF`.
fn check_magic(head: &[u8], name: &str) -> Result<(), ExtractError> {
    if head.len() >= 4 && &head[..4] == PDF_MAGIC {
        Ok(())
    } else {
        Err(ExtractError::DocumentUnreadable {
            source_name: name.to_string(),
            detail: format!(
                "not a PDF (first bytes: {:?})",
                &head[..head.len().min(4)]
            ),
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last URL path segment when it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/conta.pdf"));
        assert!(is_url("http://example.com/conta.pdf"));
        assert!(!is_url("/tmp/conta.pdf"));
        assert!(!is_url("conta.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://cdn.example.com/faturas/2024-08.pdf?sig=abc"),
            "2024-08.pdf"
        );
        assert_eq!(filename_from_url("https://example.com/download"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
    }

    #[test]
    fn stage_bytes_rejects_non_pdf() {
        let err = stage_bytes(b"PK\x03\x04zip", "conta.pdf").err().unwrap();
        assert_eq!(err.kind(), "document_unreadable");
        assert!(err.to_string().contains("conta.pdf"));
    }

    #[test]
    fn staged_file_removed_on_drop() {
        let staged = stage_bytes(b"%PDF-1.7\n%%EOF", "conta.pdf").unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(staged.name(), "conta.pdf");
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn local_missing_file() {
        let err = resolve_input("/definitely/not/a/real/conta.pdf", 5)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_unreadable() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ExtractError::DocumentUnreadable { .. }));
    }

    #[tokio::test]
    async fn local_pdf_resolves_with_file_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fatura.pdf");
        std::fs::write(&path, b"%PDF-1.4\n").unwrap();
        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.name(), "fatura.pdf");
        assert_eq!(resolved.path(), path.as_path());
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        assert!(matches!(
            resolve_input("  ", 5).await,
            Err(ExtractError::InvalidInput { .. })
        ));
    }
}
