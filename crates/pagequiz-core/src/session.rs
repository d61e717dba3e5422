//! The exam session state machine.
//!
//! ```text
//! Setup --start--> InProgress --submit--> Submitted
//!                      ^                      |
//!                      +-------retake---------+
//! (any) --reset--> Setup
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::ExamError;
use crate::extract::extract_text;
use crate::generation::{GenerationClient, QuestionSource};
use crate::locator::ContentLocator;
use crate::model::{Answer, Chapter, ExamConfig, Question};
use crate::scoring::{score, ScoreResult};
use crate::traits::Document;

/// Lifecycle state of an [`ExamSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Setup,
    InProgress,
    Submitted,
}

/// Position within the running exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 0-based index of the current question.
    pub current: usize,
    pub total: usize,
    pub answered: usize,
}

/// Active-time stopwatch that excludes paused spans.
#[derive(Debug, Default)]
struct Timer {
    running_since: Option<Instant>,
    accumulated: Duration,
    paused: bool,
}

impl Timer {
    fn restart(&mut self) {
        *self = Timer {
            running_since: Some(Instant::now()),
            ..Timer::default()
        };
    }

    fn stop(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn pause(&mut self) -> bool {
        if self.paused || self.running_since.is_none() {
            return false;
        }
        self.stop();
        self.paused = true;
        true
    }

    fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.running_since = Some(Instant::now());
        true
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map(|s| s.elapsed()).unwrap_or_default()
    }
}

/// One user's exam over one document.
///
/// Owns the chapter cache, the generated questions and the answers. Each
/// `start` or `retake` gives the run a fresh id; the id ends up on the score.
pub struct ExamSession {
    id: Uuid,
    document: Option<Arc<dyn Document>>,
    locator: ContentLocator,
    generator: GenerationClient,
    state: SessionState,
    config: Option<ExamConfig>,
    questions: Vec<Question>,
    answers: BTreeMap<usize, Answer>,
    current: usize,
    timer: Timer,
    source: Option<QuestionSource>,
    result: Option<ScoreResult>,
}

impl ExamSession {
    pub fn new(generator: GenerationClient) -> Self {
        Self {
            id: Uuid::new_v4(),
            document: None,
            locator: ContentLocator::new(),
            generator,
            state: SessionState::Setup,
            config: None,
            questions: Vec::new(),
            answers: BTreeMap::new(),
            current: 0,
            timer: Timer::default(),
            source: None,
            result: None,
        }
    }

    pub fn with_document(mut self, document: Arc<dyn Document>) -> Self {
        self.set_document(document);
        self
    }

    /// Replace the document. Cached chapters are dropped; a running exam is not.
    pub fn set_document(&mut self, document: Arc<dyn Document>) {
        self.document = Some(document);
        self.locator.invalidate();
    }

    fn document(&self) -> Result<Arc<dyn Document>, ExamError> {
        self.document.clone().ok_or(ExamError::DocumentUnavailable)
    }

    /// Chapters of the attached document, detected on first use.
    pub async fn chapters(&mut self) -> Result<Vec<Chapter>, ExamError> {
        let document = self.document()?;
        Ok(self.locator.chapters(document.as_ref()).await?.to_vec())
    }

    /// Generate questions for `config` and begin the exam.
    ///
    /// A running exam is discarded. On failure the session is left in
    /// [`SessionState::Setup`].
    pub async fn start(&mut self, config: ExamConfig) -> Result<(), ExamError> {
        if config.question_count == 0 {
            return Err(ExamError::InvalidConfig(
                "question count must be at least 1".into(),
            ));
        }
        let document = self.document()?;

        if self.state == SessionState::InProgress {
            tracing::info!(session = %self.id, "discarding running exam");
        }
        self.clear();

        let pages = self
            .locator
            .resolve(&config.page_selection, document.as_ref())
            .await?;
        let text = extract_text(document.as_ref(), &pages).await?;
        let outcome = self
            .generator
            .generate(
                config.exam_type,
                config.question_count,
                config.difficulty,
                &text,
            )
            .await?;

        self.id = Uuid::new_v4();
        self.questions = outcome.questions;
        self.source = Some(outcome.source);
        self.config = Some(config);
        self.state = SessionState::InProgress;
        self.timer.restart();

        tracing::info!(
            session = %self.id,
            questions = self.questions.len(),
            pages = pages.len(),
            source = ?self.source,
            "exam started"
        );
        Ok(())
    }

    /// Move to the next question, stopping at the last one.
    pub fn next(&mut self) -> usize {
        self.go_to(self.current.saturating_add(1))
    }

    /// Move to the previous question, stopping at the first one.
    pub fn previous(&mut self) -> usize {
        self.go_to(self.current.saturating_sub(1))
    }

    /// Jump to `index`, clamped to the question list.
    pub fn go_to(&mut self, index: usize) -> usize {
        if self.state != SessionState::Setup && !self.questions.is_empty() {
            self.current = index.min(self.questions.len() - 1);
        }
        self.current
    }

    /// Store `answer` for question `index`, replacing any previous answer.
    ///
    /// Returns `false` when nothing was stored: no exam in progress, an
    /// out-of-range index, or an answer of the wrong shape.
    pub fn record_answer(&mut self, index: usize, answer: Answer) -> bool {
        if self.state != SessionState::InProgress {
            tracing::warn!(session = %self.id, state = ?self.state, "answer ignored, no exam in progress");
            return false;
        }
        let Some(question) = self.questions.get(index) else {
            tracing::warn!(session = %self.id, index, "answer ignored, index out of range");
            return false;
        };
        if !question.accepts(&answer) {
            tracing::warn!(
                session = %self.id,
                index,
                expected = %question.exam_type(),
                "answer ignored, wrong shape"
            );
            return false;
        }
        self.answers.insert(index, answer);
        true
    }

    /// Score the exam and freeze it.
    ///
    /// Submitting again returns the stored score unchanged.
    pub fn submit(&mut self) -> Result<&ScoreResult, ExamError> {
        match self.state {
            SessionState::Setup => return Err(ExamError::NoActiveExam),
            SessionState::Submitted => {}
            SessionState::InProgress => {
                self.timer.stop();
                let result = score(&self.questions, &self.answers)
                    .with_session(self.id, self.timer.elapsed());
                tracing::info!(
                    session = %self.id,
                    correct = result.correct,
                    total = result.total,
                    percent = result.percent,
                    "exam submitted"
                );
                self.result = Some(result);
                self.state = SessionState::Submitted;
            }
        }
        self.result.as_ref().ok_or(ExamError::NoActiveExam)
    }

    /// Take the same questions again with empty answers.
    pub fn retake(&mut self) -> Result<(), ExamError> {
        if self.state != SessionState::Submitted {
            return Err(ExamError::NoActiveExam);
        }
        self.id = Uuid::new_v4();
        self.answers.clear();
        self.current = 0;
        self.result = None;
        self.state = SessionState::InProgress;
        self.timer.restart();
        tracing::info!(session = %self.id, questions = self.questions.len(), "exam retaken");
        Ok(())
    }

    /// Discard everything and return to setup. The document and its chapters stay.
    pub fn reset(&mut self) {
        self.clear();
        tracing::info!(session = %self.id, "session reset");
    }

    fn clear(&mut self) {
        self.state = SessionState::Setup;
        self.config = None;
        self.questions.clear();
        self.answers.clear();
        self.current = 0;
        self.timer = Timer::default();
        self.source = None;
        self.result = None;
    }

    /// Stop the clock. Returns `false` if there was nothing to pause.
    pub fn pause(&mut self) -> bool {
        let paused = self.state == SessionState::InProgress && self.timer.pause();
        if paused {
            tracing::debug!(session = %self.id, "exam paused");
        }
        paused
    }

    /// Restart the clock after [`pause`](Self::pause).
    pub fn resume(&mut self) -> bool {
        let resumed = self.state == SessionState::InProgress && self.timer.resume();
        if resumed {
            tracing::debug!(session = %self.id, "exam resumed");
        }
        resumed
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> Option<&ExamConfig> {
        self.config.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &BTreeMap<usize, Answer> {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.current,
            total: self.questions.len(),
            answered: self.answers.len(),
        }
    }

    /// Active exam time so far.
    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }

    pub fn is_paused(&self) -> bool {
        self.timer.paused
    }

    /// Where the current questions came from.
    pub fn source(&self) -> Option<&QuestionSource> {
        self.source.as_ref()
    }

    /// The score, once submitted.
    pub fn result(&self) -> Option<&ScoreResult> {
        self.result.as_ref()
    }
}
