//! Page text extraction.

use crate::error::ExamError;
use crate::traits::Document;

/// Minimum number of extracted characters worth examining.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Concatenate the text of `pages`, in page order, separated by blank lines.
///
/// Unreadable pages contribute nothing. Fails with
/// [`ExamError::InsufficientContent`] if fewer than [`MIN_CONTENT_CHARS`]
/// characters remain.
pub async fn extract_text(doc: &dyn Document, pages: &[u32]) -> Result<String, ExamError> {
    let mut ordered = pages.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut parts = Vec::with_capacity(ordered.len());
    for page in ordered {
        match doc.page_text(page).await {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
            Err(e) => tracing::warn!("skipping unreadable page {page}: {e:#}"),
        }
    }

    let text = parts.join("\n\n");
    let chars = text.chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(ExamError::InsufficientContent {
            chars,
            min: MIN_CONTENT_CHARS,
        });
    }
    Ok(text)
}
