//! The `pagequiz chapters` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use pagequiz_core::chapters::{self, Detection, DetectionTier};

const PREVIEW_WIDTH: usize = 60;

pub async fn execute(document: PathBuf, outline: Option<PathBuf>, json: bool) -> Result<()> {
    let doc = super::load_document(&document, outline.as_deref())?;
    let detection = chapters::detect(&doc)
        .await
        .context("failed to detect chapters")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
    } else {
        print_table(&detection);
    }
    Ok(())
}

fn tier_label(tier: DetectionTier) -> &'static str {
    match tier {
        DetectionTier::Outline => "document outline",
        DetectionTier::PatternScan => "heading scan",
        DetectionTier::UniformPartition => "uniform partition",
    }
}

fn print_table(detection: &Detection) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Pages", "Preview"]);

    for chapter in &detection.chapters {
        let mut preview: String = chapter.preview.chars().take(PREVIEW_WIDTH).collect();
        if chapter.preview.chars().count() > PREVIEW_WIDTH {
            preview.push_str("...");
        }
        table.add_row(vec![
            Cell::new(&chapter.id),
            Cell::new(&chapter.title),
            Cell::new(format!("{}-{}", chapter.start_page, chapter.end_page)),
            Cell::new(preview),
        ]);
    }

    println!(
        "Detected {} chapter(s) from {}",
        detection.chapters.len(),
        tier_label(detection.tier)
    );
    println!("{table}");
}
