//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context, Result};

use pagequiz_core::document::TextDocument;

pub mod chapters;
pub mod take;

/// Read a form-feed paginated text file, with an optional outline file.
pub fn load_document(path: &Path, outline: Option<&Path>) -> Result<TextDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document: {}", path.display()))?;
    let document = TextDocument::from_text(&text);
    tracing::debug!(pages = document.len(), path = %path.display(), "loaded document");

    let Some(outline) = outline else {
        return Ok(document);
    };
    let content = std::fs::read_to_string(outline)
        .with_context(|| format!("failed to read outline: {}", outline.display()))?;
    Ok(document.with_outline(parse_outline(&content)))
}

/// `PAGE TITLE` per line; blank lines and `#` comments are skipped.
fn parse_outline(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (page, title) = line.split_once(char::is_whitespace)?;
            Some((title.trim().to_string(), page.to_string()))
        })
        .collect()
}
