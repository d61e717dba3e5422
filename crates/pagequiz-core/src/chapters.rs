//! Structural chapter detection.
//!
//! Three tiers are tried in order and the first non-empty result wins:
//! the document outline, a heading pattern scan over the first pages, and
//! finally a uniform partition into fixed-size page blocks.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Chapter;
use crate::traits::Document;

/// Pages examined by the heading scan.
pub const SCAN_PAGE_LIMIT: u32 = 50;
/// Leading non-blank lines examined per page by the heading scan.
pub const SCAN_LINE_LIMIT: usize = 10;
/// Characters of start-page text kept as a chapter preview.
pub const PREVIEW_CHARS: usize = 150;
/// Upper bound on blocks produced by the uniform partition.
pub const PARTITION_BLOCKS: u32 = 10;

const MAX_TITLE_CHARS: usize = 100;

static HEADING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?i:chapter)\s+(\d+|[IVXLCDM]+)\b",
        r"^(?i:section)\s+(\d+(\.\d+)*|[IVXLCDM]+)\b",
        r"^(?i:unit)\s+(\d+|[IVXLCDM]+)\b",
        r"^(?i:part)\s+(\d+|[IVXLCDM]+|(?i:one|two|three|four|five|six|seven|eight|nine|ten))\b",
        r"^(?i:lesson)\s+(\d+|[IVXLCDM]+)\b",
        r"^(?i:module)\s+(\d+|[IVXLCDM]+)\b",
        r"^\d{1,2}(\.\d{1,2})*\.?\s+[A-Z][A-Za-z].{2,80}$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid heading pattern"))
    .collect()
});

/// Which detection tier produced a set of chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionTier {
    Outline,
    PatternScan,
    UniformPartition,
}

/// The result of chapter detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub tier: DetectionTier,
    pub chapters: Vec<Chapter>,
}

/// Detect the chapters of a document.
///
/// Only a failure to read the page count is an error. Outline and page
/// read failures degrade to the next tier.
pub async fn detect(doc: &dyn Document) -> Result<Detection> {
    let num_pages = doc.page_count().await?;
    let mut pages = PageCache::new(doc);

    let (tier, starts) = {
        let outline = outline_starts(doc, num_pages).await;
        if !outline.is_empty() {
            (DetectionTier::Outline, outline)
        } else {
            let scanned = scan_headings(&mut pages, num_pages).await;
            if !scanned.is_empty() {
                (DetectionTier::PatternScan, scanned)
            } else {
                (DetectionTier::UniformPartition, Vec::new())
            }
        }
    };

    let ranges = match tier {
        DetectionTier::UniformPartition => uniform_partition(num_pages),
        _ => close_ranges(starts, num_pages),
    };

    let mut chapters = Vec::with_capacity(ranges.len());
    for (i, (title, start_page, end_page)) in ranges.into_iter().enumerate() {
        let preview = preview(&pages.text(start_page).await);
        chapters.push(Chapter {
            id: format!("chapter-{}", i + 1),
            title,
            start_page,
            end_page,
            preview,
        });
    }

    tracing::debug!(?tier, count = chapters.len(), "chapter detection finished");
    Ok(Detection { tier, chapters })
}

/// Outline entries resolved to start pages, ordered by page.
///
/// Unresolved destinations default to page 1. An entry landing on a page
/// already claimed by an earlier entry is skipped.
async fn outline_starts(doc: &dyn Document, num_pages: u32) -> Vec<(String, u32)> {
    if num_pages == 0 {
        return Vec::new();
    }
    let entries = match doc.outline().await {
        Ok(Some(entries)) => entries,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::debug!("outline unavailable: {e:#}");
            return Vec::new();
        }
    };

    let mut starts = Vec::with_capacity(entries.len());
    for entry in entries {
        let page = match doc.resolve_destination(&entry.destination).await {
            Ok(Some(page)) => page.clamp(1, num_pages),
            Ok(None) => 1,
            Err(e) => {
                tracing::debug!("unresolved outline destination '{}': {e:#}", entry.destination);
                1
            }
        };
        starts.push((clean_title(&entry.title), page));
    }

    starts.sort_by_key(|(_, page)| *page);
    let mut claimed = HashSet::new();
    starts.retain(|(_, page)| claimed.insert(*page));
    starts
}

/// Heading matches over the first pages, at most one per page.
async fn scan_headings(pages: &mut PageCache<'_>, num_pages: u32) -> Vec<(String, u32)> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    for page in 1..=num_pages.min(SCAN_PAGE_LIMIT) {
        let text = pages.text(page).await;
        let heading = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(SCAN_LINE_LIMIT)
            .find(|line| is_heading(line));

        if let Some(line) = heading {
            let title = clean_title(line);
            if seen.insert(title.to_lowercase()) {
                found.push((title, page));
            }
        }
    }
    found
}

fn is_heading(line: &str) -> bool {
    HEADING_PATTERNS.iter().any(|re| re.is_match(line))
}

/// Turn ordered start pages into inclusive ranges ending before the next start.
fn close_ranges(starts: Vec<(String, u32)>, num_pages: u32) -> Vec<(String, u32, u32)> {
    let next_starts: Vec<Option<u32>> = starts
        .iter()
        .skip(1)
        .map(|(_, page)| Some(*page))
        .chain(std::iter::once(None))
        .collect();

    starts
        .into_iter()
        .zip(next_starts)
        .map(|((title, start), next)| {
            let end = next.map_or(num_pages, |n| n - 1).max(start);
            (title, start, end)
        })
        .collect()
}

/// Contiguous blocks of `ceil(n / min(10, n))` pages.
fn uniform_partition(num_pages: u32) -> Vec<(String, u32, u32)> {
    if num_pages == 0 {
        return Vec::new();
    }
    let size = num_pages.div_ceil(num_pages.min(PARTITION_BLOCKS));
    (1..=num_pages)
        .step_by(size as usize)
        .map(|start| {
            let end = (start + size - 1).min(num_pages);
            (format!("Pages {start}\u{2013}{end}"), start, end)
        })
        .collect()
}

fn clean_title(raw: &str) -> String {
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title.chars().take(MAX_TITLE_CHARS).collect()
    }
}

/// The first [`PREVIEW_CHARS`] characters of the page, with line breaks folded to spaces.
fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Page text memo so the scan and preview passes read each page once.
struct PageCache<'a> {
    doc: &'a dyn Document,
    texts: HashMap<u32, String>,
}

impl<'a> PageCache<'a> {
    fn new(doc: &'a dyn Document) -> Self {
        Self {
            doc,
            texts: HashMap::new(),
        }
    }

    async fn text(&mut self, page: u32) -> String {
        if let Some(text) = self.texts.get(&page) {
            return text.clone();
        }
        let text = match self.doc.page_text(page).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("failed to read page {page}: {e:#}");
                String::new()
            }
        };
        self.texts.insert(page, text.clone());
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn outline_tier_wins_over_headings() {
        let doc = TextDocument::new(pages(&[
            "Chapter 1 Beginnings\nSome text.",
            "more",
            "Chapter 2 Middles\nOther text.",
            "more",
            "end",
        ]))
        .with_outline(vec![
            ("Front Matter".into(), "1".into()),
            ("Body".into(), "4".into()),
        ]);

        let detection = detect(&doc).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::Outline);
        let titles: Vec<_> = detection.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Front Matter", "Body"]);
        assert_eq!(detection.chapters[0].pages(), 1..=3);
        assert_eq!(detection.chapters[1].pages(), 4..=5);
    }

    #[tokio::test]
    async fn unresolved_outline_entries_default_to_first_page() {
        let doc = TextDocument::new(pages(&["one", "two", "three"])).with_outline(vec![
            ("Lost".into(), "#missing".into()),
            ("Found".into(), "2".into()),
        ]);

        let detection = detect(&doc).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::Outline);
        assert_eq!(detection.chapters[0].title, "Lost");
        assert_eq!(detection.chapters[0].pages(), 1..=1);
        assert_eq!(detection.chapters[1].pages(), 2..=3);
    }

    #[tokio::test]
    async fn outline_ranges_never_overlap() {
        let doc = TextDocument::new(pages(&["a", "b", "c", "d"])).with_outline(vec![
            ("Late".into(), "3".into()),
            ("Early".into(), "1".into()),
            ("Duplicate".into(), "3".into()),
        ]);

        let chapters = detect(&doc).await.unwrap().chapters;
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Early");
        for pair in chapters.windows(2) {
            assert!(pair[0].end_page < pair[1].start_page);
        }
        assert!(chapters.iter().all(|c| c.start_page <= c.end_page));
    }

    #[tokio::test]
    async fn pattern_scan_finds_headings() {
        let doc = TextDocument::new(pages(&[
            "Title page",
            "CHAPTER 1: The Cell\nCells are the unit of life.",
            "continued",
            "Chapter II Genetics\nGenes carry information.",
            "continued",
            "Chapter 1: the cell\nRepeated running header.",
        ]));

        let detection = detect(&doc).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::PatternScan);
        assert_eq!(detection.chapters.len(), 2);
        assert_eq!(detection.chapters[0].title, "CHAPTER 1: The Cell");
        assert_eq!(detection.chapters[0].pages(), 2..=3);
        assert_eq!(detection.chapters[1].pages(), 4..=6);
        assert!(detection.chapters[0].preview.starts_with("CHAPTER 1: The Cell Cells"));
    }

    #[tokio::test]
    async fn pattern_scan_recognizes_other_heading_styles() {
        for heading in [
            "Section 3.2 Forces",
            "Unit 4",
            "Part Two",
            "Lesson 7 Fractions",
            "Module 12",
            "2.1 Newtonian Mechanics",
        ] {
            assert!(is_heading(heading), "{heading} should be a heading");
        }
        for line in ["Introduction", "Particles move", "2019 was a year", "3 apples"] {
            assert!(!is_heading(line), "{line} should not be a heading");
        }
    }

    #[tokio::test]
    async fn only_the_first_pages_are_scanned() {
        let mut texts = vec!["plain".to_string(); 60];
        texts[54] = "Chapter 9 Too Late".to_string();
        let doc = TextDocument::new(texts);

        let detection = detect(&doc).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::UniformPartition);
    }

    #[tokio::test]
    async fn uniform_partition_when_nothing_else_found() {
        let doc = TextDocument::new(vec!["plain text".to_string(); 25]);

        let detection = detect(&doc).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::UniformPartition);
        assert_eq!(detection.chapters.len(), 9);
        assert_eq!(detection.chapters[0].title, "Pages 1\u{2013}3");
        assert_eq!(detection.chapters[8].pages(), 25..=25);
    }

    #[tokio::test]
    async fn uniform_partition_small_documents() {
        let doc = TextDocument::new(pages(&["only page"]));
        let detection = detect(&doc).await.unwrap();
        assert_eq!(detection.chapters.len(), 1);
        assert_eq!(detection.chapters[0].pages(), 1..=1);

        let empty = TextDocument::new(vec![]);
        assert!(detect(&empty).await.unwrap().chapters.is_empty());
    }

    #[test]
    fn preview_is_bounded() {
        let long = "word ".repeat(100);
        assert_eq!(preview(&long), "word ".repeat(30).trim_end());
    }

    #[test]
    fn preview_counts_raw_page_characters() {
        let text = format!("{}\n\n\ntail", "x".repeat(PREVIEW_CHARS - 2));
        assert_eq!(preview(&text), "x".repeat(PREVIEW_CHARS - 2));
    }

    #[tokio::test]
    async fn heading_must_be_within_first_lines() {
        let filler: Vec<String> = (1..=SCAN_LINE_LIMIT).map(|i| format!("line {i}")).collect();
        let late = format!("{}\n\nChapter 1 Late Heading", filler.join("\n"));
        let early = format!(
            "{}\nChapter 2 Last Scanned Line",
            filler[..SCAN_LINE_LIMIT - 1].join("\n")
        );

        let detection = detect(&TextDocument::new(vec![late.clone()])).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::UniformPartition);

        let detection = detect(&TextDocument::new(vec![late, early])).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::PatternScan);
        assert_eq!(detection.chapters.len(), 1);
        assert_eq!(detection.chapters[0].title, "Chapter 2 Last Scanned Line");
        assert_eq!(detection.chapters[0].start_page, 2);
    }

    #[tokio::test]
    async fn scan_stops_after_page_limit() {
        let limit = SCAN_PAGE_LIMIT as usize;
        let mut texts = vec!["plain".to_string(); limit + 5];
        texts[limit] = "Chapter 9 Page After Limit".to_string();
        let detection = detect(&TextDocument::new(texts.clone())).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::UniformPartition);

        texts[limit - 1] = "Chapter 8 Last Scanned Page".to_string();
        let detection = detect(&TextDocument::new(texts)).await.unwrap();
        assert_eq!(detection.tier, DetectionTier::PatternScan);
        assert_eq!(detection.chapters.len(), 1);
        assert_eq!(detection.chapters[0].start_page, SCAN_PAGE_LIMIT);
    }
}
