//! Score reports: markdown rendering and JSON persistence.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::scoring::ScoreResult;

impl ScoreResult {
    /// Save the score as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize score")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write score to {}", path.display()))?;
        Ok(())
    }

    /// Load a score from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read score from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse score JSON")
    }
}

/// Render a human-readable summary with one section per mistake.
pub fn render_markdown(result: &ScoreResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Exam results\n");
    let _ = writeln!(
        out,
        "**Score:** {}/{} ({}%)  ",
        result.correct, result.total, result.percent
    );
    let _ = writeln!(out, "**Time:** {}  ", format_elapsed(result.elapsed_ms));
    let _ = writeln!(
        out,
        "**Submitted:** {}\n",
        result.submitted_at.format("%Y-%m-%d %H:%M UTC")
    );

    if result.mistakes.is_empty() {
        let _ = writeln!(out, "No mistakes.");
        return out;
    }

    let _ = writeln!(out, "## Mistakes\n");
    for mistake in &result.mistakes {
        let _ = writeln!(
            out,
            "### Question {} ({})\n",
            mistake.index + 1,
            mistake.kind
        );
        let _ = writeln!(out, "{}\n", mistake.question);
        let _ = writeln!(
            out,
            "- Your answer: {}",
            mistake.user_answer.as_deref().unwrap_or("(unanswered)")
        );
        let _ = writeln!(out, "- Correct answer: {}", mistake.correct_answer);
        if let Some(explanation) = &mistake.explanation {
            let _ = writeln!(out, "- Explanation: {explanation}");
        }
        out.push('\n');
    }
    out
}

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let secs = elapsed_ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use crate::model::{Answer, Question};
    use crate::scoring::score;

    fn result() -> ScoreResult {
        let questions = vec![
            Question::TrueFalse {
                question: "The sun is a star.".into(),
                correct_answer: true,
                explanation: Some("It is a G-type star.".into()),
            },
            Question::FillBlank {
                question: "Water boils at _____ degrees.".into(),
                correct_answer: "100".into(),
                explanation: None,
            },
            Question::Mcq {
                question: "Pick B".into(),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: 'B',
                explanation: None,
            },
        ];
        let answers = BTreeMap::from([
            (0, Answer::TrueFalse(false)),
            (2, Answer::Choice('B')),
        ]);
        score(&questions, &answers)
    }

    #[test]
    fn markdown_lists_each_mistake() {
        let md = render_markdown(&result());
        assert!(md.contains("**Score:** 1/3 (33%)"));
        assert!(md.contains("### Question 1 (true-false)"));
        assert!(md.contains("- Your answer: FALSE"));
        assert!(md.contains("- Explanation: It is a G-type star."));
        assert!(md.contains("### Question 2 (fill-blank)"));
        assert!(md.contains("- Your answer: (unanswered)"));
        assert!(!md.contains("Question 3"));
    }

    #[test]
    fn perfect_score_has_no_mistakes_section() {
        let perfect = score(&[], &BTreeMap::new());
        let md = render_markdown(&perfect);
        assert!(md.contains("No mistakes."));
        assert!(!md.contains("## Mistakes"));
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65_400), "1:05");
        assert_eq!(format_elapsed(3_726_000), "1:02:06");
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.json");
        let original = result();
        original.save_json(&path).unwrap();
        let loaded = ScoreResult::load_json(&path).unwrap();
        assert_eq!(loaded, original);
    }
}
