//! In-memory [`Document`] implementation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::traits::{Document, OutlineEntry};

/// Form feed, the page break character in plain-text dumps (`pdftotext` output).
pub const PAGE_BREAK: char = '\u{0C}';

/// A document whose pages are held in memory.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    pages: Vec<String>,
    outline: Option<Vec<OutlineEntry>>,
    destinations: HashMap<String, u32>,
}

impl TextDocument {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Split a text blob into pages on form-feed characters.
    ///
    /// A trailing page break does not produce an extra empty page.
    pub fn from_text(text: &str) -> Self {
        let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }
        if pages.len() == 1 && pages[0].trim().is_empty() {
            pages.clear();
        }
        Self::new(pages)
    }

    /// Attach an outline whose destinations are page numbers rendered as strings.
    ///
    /// Destinations that do not parse as a page number stay unresolved.
    pub fn with_outline(mut self, entries: Vec<(String, String)>) -> Self {
        let mut outline = Vec::with_capacity(entries.len());
        for (title, destination) in entries {
            if let Ok(page) = destination.trim().parse::<u32>() {
                self.destinations.insert(destination.clone(), page);
            }
            outline.push(OutlineEntry { title, destination });
        }
        self.outline = Some(outline);
        self
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
impl Document for TextDocument {
    async fn page_count(&self) -> anyhow::Result<u32> {
        Ok(u32::try_from(self.pages.len())?)
    }

    async fn page_text(&self, page: u32) -> anyhow::Result<String> {
        let index = page
            .checked_sub(1)
            .ok_or_else(|| anyhow::anyhow!("page numbers start at 1"))? as usize;
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("page {page} out of range (1..={})", self.pages.len()))
    }

    async fn outline(&self) -> anyhow::Result<Option<Vec<OutlineEntry>>> {
        Ok(self.outline.clone())
    }

    async fn resolve_destination(&self, destination: &str) -> anyhow::Result<Option<u32>> {
        Ok(self.destinations.get(destination).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn splits_on_form_feed() {
        let doc = TextDocument::from_text("first page\u{0C}second page\u{0C}");
        assert_eq!(doc.page_count().await.unwrap(), 2);
        assert_eq!(doc.page_text(2).await.unwrap(), "second page");
        assert!(doc.page_text(3).await.is_err());
        assert!(doc.page_text(0).await.is_err());
    }

    #[tokio::test]
    async fn empty_text_has_no_pages() {
        let doc = TextDocument::from_text("   ");
        assert_eq!(doc.page_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn outline_destinations_resolve() {
        let doc = TextDocument::new(vec!["a".into(), "b".into()]).with_outline(vec![
            ("Intro".into(), "1".into()),
            ("Broken".into(), "#named-dest".into()),
        ]);
        let outline = doc.outline().await.unwrap().unwrap();
        assert_eq!(outline.len(), 2);
        assert_eq!(doc.resolve_destination("1").await.unwrap(), Some(1));
        assert_eq!(doc.resolve_destination("#named-dest").await.unwrap(), None);
    }
}
