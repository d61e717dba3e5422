//! Core data model types for pagequiz.
//!
//! These are the fundamental types the whole pipeline passes around:
//! exam configuration, detected chapters, typed questions, and user answers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of exam to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExamType {
    Mcq,
    TrueFalse,
    FillBlank,
    Matching,
    ShortAnswer,
    /// A mix of every question kind.
    Comprehensive,
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamType::Mcq => write!(f, "mcq"),
            ExamType::TrueFalse => write!(f, "true-false"),
            ExamType::FillBlank => write!(f, "fill-blank"),
            ExamType::Matching => write!(f, "matching"),
            ExamType::ShortAnswer => write!(f, "short-answer"),
            ExamType::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "mcq" | "multiple-choice" => Ok(ExamType::Mcq),
            "true-false" | "tf" | "truefalse" => Ok(ExamType::TrueFalse),
            "fill-blank" | "fill-in-the-blank" | "blank" => Ok(ExamType::FillBlank),
            "matching" | "match" => Ok(ExamType::Matching),
            "short-answer" | "short" => Ok(ExamType::ShortAnswer),
            "comprehensive" | "mixed" => Ok(ExamType::Comprehensive),
            other => Err(format!("unknown exam type: {other}")),
        }
    }
}

/// How hard the generated questions should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Descriptive phrase embedded in generation prompts.
    pub fn phrase(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy difficulty, testing basic recall of facts stated directly in the text",
            Difficulty::Medium => "medium difficulty, testing understanding of the main concepts",
            Difficulty::Hard => "hard difficulty, testing analysis, application and subtle distinctions",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Which pages of the document an exam draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PageSelection {
    /// The page currently shown to the user (1-based).
    Current { page: u32 },
    /// An inclusive page range (1-based).
    Range { start: u32, end: u32 },
    /// The union of the selected chapters. Empty means "all detected chapters".
    Chapters { ids: Vec<String> },
    /// Every page.
    All,
}

impl FromStr for PageSelection {
    type Err = String;

    /// Parses `all`, `current:N`, `range:A-B`, `chapters` or `chapters:id,id`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (mode, arg) = match s.split_once(':') {
            Some((mode, arg)) => (mode.trim().to_lowercase(), Some(arg.trim())),
            None => (s.to_lowercase(), None),
        };
        let parse_page = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid page number: '{v}'"))
        };
        match (mode.as_str(), arg) {
            ("all", None) => Ok(PageSelection::All),
            ("current", Some(page)) => Ok(PageSelection::Current {
                page: parse_page(page)?,
            }),
            ("range", Some(range)) => {
                let (start, end) = range
                    .split_once('-')
                    .ok_or_else(|| format!("invalid range: '{range}'"))?;
                Ok(PageSelection::Range {
                    start: parse_page(start)?,
                    end: parse_page(end)?,
                })
            }
            ("chapters", None) => Ok(PageSelection::Chapters { ids: Vec::new() }),
            ("chapters", Some(ids)) => Ok(PageSelection::Chapters {
                ids: ids
                    .split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect(),
            }),
            _ => Err(format!("invalid page selection: '{s}'")),
        }
    }
}

/// Everything needed to start an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub exam_type: ExamType,
    /// Upper bound on the number of questions.
    pub question_count: usize,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub page_selection: PageSelection,
}

/// A detected structural partition of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// First page, inclusive and 1-based.
    pub start_page: u32,
    /// Last page, inclusive. Never less than `start_page`.
    pub end_page: u32,
    /// First characters of the start page's text.
    pub preview: String,
}

impl Chapter {
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.start_page..=self.end_page
    }
}

/// Letters used for MCQ options and matching definitions.
pub const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// A single exam question. One variant per question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    Mcq {
        question: String,
        options: [String; 4],
        /// One of `A`..=`D`.
        correct_answer: char,
        explanation: Option<String>,
    },
    TrueFalse {
        question: String,
        correct_answer: bool,
        explanation: Option<String>,
    },
    FillBlank {
        /// Contains a blank marker (a run of underscores).
        question: String,
        correct_answer: String,
        explanation: Option<String>,
    },
    Matching {
        terms: Vec<String>,
        definitions: Vec<String>,
        /// 1-based term index to upper-case definition letter.
        correct_answers: BTreeMap<usize, char>,
    },
    ShortAnswer {
        question: String,
        expected_answer: String,
        /// Lower-cased.
        key_terms: Vec<String>,
    },
}

impl Question {
    /// The exam type this question belongs to.
    pub fn exam_type(&self) -> ExamType {
        match self {
            Question::Mcq { .. } => ExamType::Mcq,
            Question::TrueFalse { .. } => ExamType::TrueFalse,
            Question::FillBlank { .. } => ExamType::FillBlank,
            Question::Matching { .. } => ExamType::Matching,
            Question::ShortAnswer { .. } => ExamType::ShortAnswer,
        }
    }

    /// The prompt text shown to the user.
    pub fn prompt(&self) -> String {
        match self {
            Question::Mcq { question, .. }
            | Question::TrueFalse { question, .. }
            | Question::FillBlank { question, .. }
            | Question::ShortAnswer { question, .. } => question.clone(),
            Question::Matching { terms, .. } => {
                format!("Match each term to its definition: {}", terms.join(", "))
            }
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            Question::Mcq { explanation, .. }
            | Question::TrueFalse { explanation, .. }
            | Question::FillBlank { explanation, .. } => explanation.as_deref(),
            Question::Matching { .. } | Question::ShortAnswer { .. } => None,
        }
    }

    /// The reference answer rendered for display.
    pub fn reference_answer(&self) -> String {
        match self {
            Question::Mcq { correct_answer, .. } => correct_answer.to_string(),
            Question::TrueFalse { correct_answer, .. } => true_false_token(*correct_answer).into(),
            Question::FillBlank { correct_answer, .. } => correct_answer.clone(),
            Question::Matching {
                correct_answers, ..
            } => render_matching(correct_answers),
            Question::ShortAnswer {
                expected_answer, ..
            } => expected_answer.clone(),
        }
    }

    /// Whether `answer` has the shape this question expects.
    pub fn accepts(&self, answer: &Answer) -> bool {
        matches!(
            (self, answer),
            (Question::Mcq { .. }, Answer::Choice(_))
                | (Question::TrueFalse { .. }, Answer::TrueFalse(_))
                | (Question::FillBlank { .. }, Answer::Text(_))
                | (Question::ShortAnswer { .. }, Answer::Text(_))
                | (Question::Matching { .. }, Answer::Matching(_))
        )
    }
}

/// A user's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// An MCQ option letter.
    Choice(char),
    TrueFalse(bool),
    /// Free text for fill-in-the-blank and short answer questions.
    Text(String),
    /// 1-based term index to definition letter.
    Matching(BTreeMap<usize, char>),
}

impl Answer {
    /// Parse a `TRUE`/`FALSE` token, ignoring case and surrounding whitespace.
    pub fn parse_true_false(token: &str) -> Option<Answer> {
        match token.trim().to_uppercase().as_str() {
            "TRUE" | "T" => Some(Answer::TrueFalse(true)),
            "FALSE" | "F" => Some(Answer::TrueFalse(false)),
            _ => None,
        }
    }

    /// Parse typed input into the answer shape `question` expects.
    ///
    /// MCQ takes a single option letter, true/false a `TRUE`/`FALSE` token,
    /// matching a list of `1-A, 2-B` pairs. Blank input is never an answer.
    pub fn parse_for(question: &Question, input: &str) -> Option<Answer> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match question {
            Question::Mcq { .. } => {
                let mut chars = input.chars();
                let letter = chars.next()?.to_ascii_uppercase();
                (chars.next().is_none() && OPTION_LETTERS.contains(&letter))
                    .then_some(Answer::Choice(letter))
            }
            Question::TrueFalse { .. } => Answer::parse_true_false(input),
            Question::FillBlank { .. } | Question::ShortAnswer { .. } => {
                Some(Answer::Text(input.to_string()))
            }
            Question::Matching { .. } => parse_matching_pairs(input).map(Answer::Matching),
        }
    }

    /// Rendered for mistake reports.
    pub fn display(&self) -> String {
        match self {
            Answer::Choice(letter) => letter.to_string(),
            Answer::TrueFalse(value) => true_false_token(*value).into(),
            Answer::Text(text) => text.clone(),
            Answer::Matching(pairs) => render_matching(pairs),
        }
    }
}

fn true_false_token(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Parse `1-A, 2-B` (also `1:A` or `1=A`) into a matching map.
pub fn parse_matching_pairs(input: &str) -> Option<BTreeMap<usize, char>> {
    let mut pairs = BTreeMap::new();
    for part in input
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|p| !p.is_empty())
    {
        let (term, letter) = part.split_once(|c: char| matches!(c, '-' | ':' | '='))?;
        let term: usize = term.parse().ok()?;
        let mut letters = letter.chars();
        let letter = letters.next()?.to_ascii_uppercase();
        if letters.next().is_some() || !letter.is_ascii_alphabetic() {
            return None;
        }
        pairs.insert(term, letter);
    }
    (!pairs.is_empty()).then_some(pairs)
}

/// Render a matching map in the `1-A, 2-B` wire form.
pub fn render_matching(pairs: &BTreeMap<usize, char>) -> String {
    pairs
        .iter()
        .map(|(term, letter)| format!("{term}-{letter}"))
        .collect::<Vec<_>>()
        .join(", ")
}
