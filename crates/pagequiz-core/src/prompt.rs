//! Generation prompt construction.
//!
//! Every template names the exact field markers that
//! [`crate::parser`] looks for, and separates questions with
//! [`BLOCK_SEPARATOR`].

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, ExamType};

/// Characters of source text embedded in a prompt.
pub const MAX_SOURCE_CHARS: usize = 8000;
/// Line separating question blocks in provider output.
pub const BLOCK_SEPARATOR: &str = "---";
/// Blank marker shown in fill-in-the-blank questions.
pub const BLANK_MARKER: &str = "_____";

/// How a comprehensive exam's questions are spread over question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub mcq: usize,
    pub true_false: usize,
    pub fill_blank: usize,
    pub matching: usize,
    pub short_answer: usize,
}

impl Allocation {
    /// 30% MCQ, 20% true/false, 20% fill-blank, 15% matching, 15% short answer,
    /// each rounded up.
    pub fn for_count(count: usize) -> Self {
        let share = |percent: usize| (count * percent).div_ceil(100);
        Self {
            mcq: share(30),
            true_false: share(20),
            fill_blank: share(20),
            matching: share(15),
            short_answer: share(15),
        }
    }

    pub fn total(&self) -> usize {
        self.mcq + self.true_false + self.fill_blank + self.matching + self.short_answer
    }
}

/// Build the generation prompt for `count` questions of `exam_type` about `text`.
pub fn build_prompt(exam_type: ExamType, count: usize, difficulty: Difficulty, text: &str) -> String {
    let source = truncate_chars(text, MAX_SOURCE_CHARS);
    let instructions = match exam_type {
        ExamType::Mcq => format!(
            "Generate {count} multiple choice questions.\n\
             Format each question exactly like this:\n\n{MCQ_TEMPLATE}"
        ),
        ExamType::TrueFalse => format!(
            "Generate {count} true/false statements.\n\
             Format each statement exactly like this:\n\n{TRUE_FALSE_TEMPLATE}"
        ),
        ExamType::FillBlank => format!(
            "Generate {count} fill-in-the-blank questions. Each question must contain \
             exactly one blank written as {BLANK_MARKER}.\n\
             Format each question exactly like this:\n\n{FILL_BLANK_TEMPLATE}"
        ),
        ExamType::Matching => format!(
            "Generate {count} matching exercises of 5 terms each. Shuffle the \
             definitions so they are not in the same order as the terms.\n\
             Format each exercise exactly like this:\n\n{MATCHING_TEMPLATE}"
        ),
        ExamType::ShortAnswer => format!(
            "Generate {count} short answer questions.\n\
             Format each question exactly like this:\n\n{SHORT_ANSWER_TEMPLATE}"
        ),
        ExamType::Comprehensive => comprehensive_instructions(count),
    };

    format!(
        "You are writing a self-assessment exam about the text below, at {}.\n\n\
         {instructions}\n\n\
         Separate questions with a line containing only {BLOCK_SEPARATOR}.\n\
         Only ask about information contained in the text.\n\n\
         TEXT:\n{source}",
        difficulty.phrase()
    )
}

fn comprehensive_instructions(count: usize) -> String {
    let a = Allocation::for_count(count);
    format!(
        "Generate a mixed exam with:\n\
         - {} multiple choice questions (TYPE: MCQ)\n\
         - {} true/false statements (TYPE: TRUE_FALSE)\n\
         - {} fill-in-the-blank questions using {BLANK_MARKER} (TYPE: FILL_BLANK)\n\
         - {} matching exercises (TYPE: MATCHING)\n\
         - {} short answer questions (TYPE: SHORT_ANSWER)\n\n\
         Start every question with its TYPE line, then use the matching format:\n\n\
         TYPE: MCQ\n{MCQ_TEMPLATE}\n\n\
         TYPE: TRUE_FALSE\n{TRUE_FALSE_TEMPLATE}\n\n\
         TYPE: FILL_BLANK\n{FILL_BLANK_TEMPLATE}\n\n\
         TYPE: MATCHING\n{MATCHING_TEMPLATE}\n\n\
         TYPE: SHORT_ANSWER\n{SHORT_ANSWER_TEMPLATE}",
        a.mcq, a.true_false, a.fill_blank, a.matching, a.short_answer
    )
}

const MCQ_TEMPLATE: &str = "Q: [question]
A) [option]
B) [option]
C) [option]
D) [option]
CORRECT: [A, B, C or D]
EXPLANATION: [why the answer is correct]";

const TRUE_FALSE_TEMPLATE: &str = "Q: [statement]
ANSWER: [TRUE or FALSE]
EXPLANATION: [why]";

const FILL_BLANK_TEMPLATE: &str = "Q: [sentence with _____ in place of the missing word]
ANSWER: [the missing word]
EXPLANATION: [context]";

const MATCHING_TEMPLATE: &str = "TERMS:
1. [term]
2. [term]
3. [term]
4. [term]
5. [term]
DEFINITIONS:
A. [definition]
B. [definition]
C. [definition]
D. [definition]
E. [definition]
ANSWERS: 1-C, 2-A, 3-E, 4-B, 5-D";

const SHORT_ANSWER_TEMPLATE: &str = "Q: [question]
EXPECTED_ANSWER: [a model answer in one or two sentences]
KEY_TERMS: [term, term, term]";

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
