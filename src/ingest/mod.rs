//! Document ingestion: turning study material files into plain text.
//!
//! PDF extraction plus plain text/markdown passthrough. Chunking, embedding,
//! and indexing of the extracted text happen in the orchestrator.

mod pdf;

pub use pdf::extract_pdf_text;

use crate::error::{PuggError, Result};
use std::path::Path;
use tracing::{debug, instrument};

/// A document extracted from a file, ready for chunking.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Stable identifier derived from the file name.
    pub id: String,
    /// Human-readable title (the file stem).
    pub title: String,
    /// Extracted plain text.
    pub text: String,
    /// Page count, for PDFs.
    pub pages: Option<usize>,
}

/// Extract plain text from a study-material file.
///
/// Supports PDF via text extraction and `.txt`/`.md` files directly.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract(path: &Path) -> Result<ExtractedDocument> {
    if !path.exists() {
        return Err(PuggError::InvalidInput(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PuggError::InvalidInput(format!("Unreadable file name: {}", path.display())))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let (text, pages) = match extension.as_str() {
        "pdf" => {
            let (text, pages) = extract_pdf_text(path)?;
            (text, Some(pages))
        }
        "txt" | "md" | "markdown" | "text" => (std::fs::read_to_string(path)?, None),
        other => {
            return Err(PuggError::Ingest(format!(
                "Unsupported file type '{}'. Supported: pdf, txt, md.",
                other
            )))
        }
    };

    debug!("Extracted {} characters from {}", text.len(), path.display());

    Ok(ExtractedDocument {
        id: slugify(stem),
        title: stem.to_string(),
        text,
        pages,
    })
}

/// Turn a file stem into a stable document id.
fn slugify(stem: &str) -> String {
    let slug: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    let mut out = String::with_capacity(slug.len());
    let mut prev_dash = false;
    for c in slug.chars() {
        if c == '-' {
            if !prev_dash && !out.is_empty() {
                out.push('-');
            }
            prev_dash = true;
        } else {
            out.push(c);
            prev_dash = false;
        }
    }

    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Lecture Notes"), "my-lecture-notes");
        assert_eq!(slugify("CS101_week 3 (final)"), "cs101-week-3-final");
        assert_eq!(slugify("--weird--"), "weird");
    }

    #[test]
    fn test_extract_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Photosynthesis converts light into chemical energy.").unwrap();

        let doc = extract(&path).unwrap();
        assert_eq!(doc.id, "notes");
        assert_eq!(doc.title, "notes");
        assert!(doc.text.contains("Photosynthesis"));
        assert!(doc.pages.is_none());
    }

    #[test]
    fn test_extract_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.mp3");
        std::fs::File::create(&path).unwrap();

        let err = extract(&path).unwrap_err();
        assert!(matches!(err, PuggError::Ingest(_)));
    }

    #[test]
    fn test_extract_missing_file() {
        let err = extract(Path::new("/nonexistent/file.pdf")).unwrap_err();
        assert!(matches!(err, PuggError::InvalidInput(_)));
    }
}
