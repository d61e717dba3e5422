//! pagequiz-core: exam generation from document pages.
//!
//! This crate holds the data model, the collaborator traits, chapter
//! detection, question generation with provider fallback, and the exam
//! session with its scorer.

pub mod chapters;
pub mod document;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod generation;
pub mod heuristic;
pub mod locator;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod scoring;
pub mod session;
pub mod traits;

pub use error::{ExamError, ProviderError};
pub use generation::{GenerationClient, GenerationConfig, ModelSpec, QuestionSource};
pub use model::{Answer, Chapter, Difficulty, ExamConfig, ExamType, PageSelection, Question};
pub use scoring::ScoreResult;
pub use session::{ExamSession, SessionState};
