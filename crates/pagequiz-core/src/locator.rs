//! Page selection resolution.

use std::collections::BTreeSet;

use crate::chapters::{self, Detection};
use crate::error::ExamError;
use crate::model::{Chapter, PageSelection};
use crate::traits::Document;

/// Resolves a [`PageSelection`] to a sorted, deduplicated list of pages.
///
/// Chapter detection runs at most once per locator; the result is cached
/// until [`ContentLocator::invalidate`] is called.
#[derive(Debug, Default)]
pub struct ContentLocator {
    detection: Option<Detection>,
}

impl ContentLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached detection result, if detection has run.
    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    /// Forget the cached chapters (e.g. after the host swapped documents).
    pub fn invalidate(&mut self) {
        self.detection = None;
    }

    /// Detected chapters, running detection on first use.
    pub async fn chapters(&mut self, doc: &dyn Document) -> Result<&[Chapter], ExamError> {
        if self.detection.is_none() {
            let detection = chapters::detect(doc).await.map_err(ExamError::Document)?;
            tracing::info!(
                tier = ?detection.tier,
                count = detection.chapters.len(),
                "detected chapters"
            );
            self.detection = Some(detection);
        }
        Ok(self
            .detection
            .as_ref()
            .map(|d| d.chapters.as_slice())
            .unwrap_or_default())
    }

    /// Resolve the pages a selection refers to.
    pub async fn resolve(
        &mut self,
        selection: &PageSelection,
        doc: &dyn Document,
    ) -> Result<Vec<u32>, ExamError> {
        let num_pages = doc.page_count().await.map_err(ExamError::Document)?;
        let all = || (1..=num_pages).collect::<Vec<_>>();

        let pages = match selection {
            PageSelection::Current { page } => {
                if num_pages == 0 {
                    Vec::new()
                } else {
                    vec![(*page).clamp(1, num_pages)]
                }
            }
            PageSelection::Range { start, end } => {
                let (lo, hi) = if start <= end {
                    (*start, *end)
                } else {
                    (*end, *start)
                };
                let lo = lo.max(1);
                let hi = hi.min(num_pages);
                (lo..=hi).collect()
            }
            PageSelection::All => all(),
            PageSelection::Chapters { ids } => {
                let chapters = self.chapters(doc).await?;
                let pages = if ids.is_empty() {
                    if chapters.is_empty() {
                        tracing::debug!("no chapters detected, selecting the whole document");
                        all()
                    } else {
                        union(chapters.iter())
                    }
                } else {
                    union(chapters.iter().filter(|c| ids.contains(&c.id)))
                };
                if pages.is_empty() {
                    return Err(ExamError::NoContentForChapters);
                }
                pages
            }
        };

        tracing::debug!(count = pages.len(), "resolved page selection");
        Ok(pages)
    }
}

fn union<'a>(chapters: impl Iterator<Item = &'a Chapter>) -> Vec<u32> {
    chapters
        .flat_map(Chapter::pages)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
