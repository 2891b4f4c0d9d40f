//! PDF text extraction via lopdf.

use crate::error::Result;
use lopdf::Document as PdfDocument;
use std::path::Path;
use tracing::warn;

/// Extract plain text from a PDF file.
///
/// Pages that fail to extract are skipped with a warning rather than failing
/// the whole document.
pub fn extract_pdf_text(path: &Path) -> Result<(String, usize)> {
    let doc = PdfDocument::load(path)?;
    let pages = doc.get_pages();
    let page_count = pages.len();

    let mut text = String::new();
    for (page_num, _) in pages.iter() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!("Failed to extract text from page {}: {}", page_num, e);
            }
        }
    }

    Ok((text, page_count))
}
