//! Exam scoring.
//!
//! Each question kind has its own correctness rule. Unanswered questions are
//! incorrect and show up as mistakes with no user answer.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Answer, ExamType, Question};

/// An incorrect or unanswered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    /// 0-based question index.
    pub index: usize,
    pub kind: ExamType,
    pub question: String,
    /// `None` when the question was left unanswered.
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// The score of a submitted exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub session_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    /// Active exam time, paused spans excluded.
    pub elapsed_ms: u64,
    pub correct: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent; 0 for an empty exam.
    pub percent: u32,
    pub mistakes: Vec<Mistake>,
}

impl ScoreResult {
    /// Attach the session identity and elapsed time.
    pub fn with_session(mut self, session_id: Uuid, elapsed: Duration) -> Self {
        self.session_id = session_id;
        self.elapsed_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn passed(&self, threshold_percent: u32) -> bool {
        self.percent >= threshold_percent
    }
}

/// Score `answers` (keyed by 0-based question index) against `questions`.
pub fn score(questions: &[Question], answers: &BTreeMap<usize, Answer>) -> ScoreResult {
    let mut correct = 0;
    let mut mistakes = Vec::new();

    for (index, question) in questions.iter().enumerate() {
        let answer = answers.get(&index);
        if answer.is_some_and(|a| is_correct(question, a)) {
            correct += 1;
            continue;
        }
        mistakes.push(Mistake {
            index,
            kind: question.exam_type(),
            question: question.prompt(),
            user_answer: answer.map(Answer::display),
            correct_answer: question.reference_answer(),
            explanation: question.explanation().map(str::to_string),
        });
    }

    let total = questions.len();
    ScoreResult {
        session_id: Uuid::nil(),
        submitted_at: Utc::now(),
        elapsed_ms: 0,
        correct,
        total,
        percent: percent(correct, total),
        mistakes,
    }
}

fn percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

/// Whether `answer` is a correct response to `question`.
///
/// An answer of the wrong shape is never correct.
pub fn is_correct(question: &Question, answer: &Answer) -> bool {
    match (question, answer) {
        (Question::Mcq { correct_answer, .. }, Answer::Choice(choice)) => choice == correct_answer,
        (Question::TrueFalse { correct_answer, .. }, Answer::TrueFalse(value)) => {
            value == correct_answer
        }
        (Question::FillBlank { correct_answer, .. }, Answer::Text(text)) => {
            text.trim().to_lowercase() == correct_answer.trim().to_lowercase()
        }
        (Question::Matching { correct_answers, .. }, Answer::Matching(pairs)) => {
            pairs == correct_answers
        }
        (Question::ShortAnswer { key_terms, .. }, Answer::Text(text)) => {
            short_answer_correct(key_terms, text)
        }
        _ => false,
    }
}

/// At least half of the key terms, rounded up, must appear in the answer.
fn short_answer_correct(key_terms: &[String], text: &str) -> bool {
    if key_terms.is_empty() {
        return !text.trim().is_empty();
    }
    let answer = text.to_lowercase();
    let hits = key_terms
        .iter()
        .filter(|term| answer.contains(&term.to_lowercase()))
        .count();
    hits >= key_terms.len().div_ceil(2)
}
