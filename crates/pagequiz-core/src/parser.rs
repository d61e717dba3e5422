//! Provider output parser.
//!
//! Raw provider text is split into blocks on
//! [`BLOCK_SEPARATOR`](crate::prompt::BLOCK_SEPARATOR) lines. Each
//! block is scanned once into marker-delimited sections, then handed to a
//! per-type extractor. Extractors return `None` for blocks missing a required
//! field; such blocks are dropped.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{ExamType, Question, OPTION_LETTERS};

/// Turns one scanned block into a question.
pub type Extractor = fn(&Block) -> Option<Question>;

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-{3,}\s*$").expect("valid regex"));

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(TYPE|QUESTION|Q|CORRECT(?:[_ ]ANSWER)?|EXPECTED[_ ]ANSWER|ANSWERS|ANSWER|EXPLANATION|KEY[_ ]TERMS|TERMS|DEFINITIONS)\s*\**\s*:\s*\**\s*(.*)$",
    )
    .expect("valid regex")
});

static OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Da-d])\s*[).:]\s+(.+)$").expect("valid regex"));

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*[).:-]?\s+(.+)$").expect("valid regex"));

static LETTERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z])\s*[).:-]\s*(.+)$").expect("valid regex"));

static PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:-|\u{2013}|:|=|->|→)\s*([A-Za-z])\b").expect("valid regex")
});

static CORRECT_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-D])\b").expect("valid regex"));

static BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{3,}").expect("valid regex"));

/// Field markers recognized inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Type,
    Question,
    /// Option index, 0 for `A` through 3 for `D`.
    Option(usize),
    Correct,
    Answer,
    Explanation,
    ExpectedAnswer,
    KeyTerms,
    Terms,
    Definitions,
    Answers,
}

impl Marker {
    fn from_label(label: &str) -> Option<Self> {
        let label = label.to_uppercase().replace(' ', "_");
        match label.as_str() {
            "TYPE" => Some(Marker::Type),
            "Q" | "QUESTION" => Some(Marker::Question),
            "CORRECT" | "CORRECT_ANSWER" => Some(Marker::Correct),
            "ANSWER" => Some(Marker::Answer),
            "ANSWERS" => Some(Marker::Answers),
            "EXPLANATION" => Some(Marker::Explanation),
            "EXPECTED_ANSWER" => Some(Marker::ExpectedAnswer),
            "KEY_TERMS" => Some(Marker::KeyTerms),
            "TERMS" => Some(Marker::Terms),
            "DEFINITIONS" => Some(Marker::Definitions),
            _ => None,
        }
    }

    /// List sections collect one item per following line.
    fn is_list(&self) -> bool {
        matches!(self, Marker::Terms | Marker::Definitions | Marker::Answers)
    }
}

#[derive(Debug, Clone)]
struct Section {
    marker: Marker,
    text: String,
    items: Vec<String>,
}

/// A question block scanned into marker-delimited sections.
#[derive(Debug, Clone, Default)]
pub struct Block {
    sections: Vec<Section>,
}

impl Block {
    /// Scan a block of provider text.
    pub fn scan(raw: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();

        for line in raw.lines() {
            let line = strip_decoration(line);
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = MARKER.captures(line) {
                if let Some(marker) = Marker::from_label(&caps[1]) {
                    let rest = caps[2].trim().trim_end_matches("**").trim().to_string();
                    let items = if marker.is_list() && !rest.is_empty() {
                        vec![rest.clone()]
                    } else {
                        Vec::new()
                    };
                    sections.push(Section {
                        marker,
                        text: rest,
                        items,
                    });
                    continue;
                }
            }

            let in_list = sections.last().is_some_and(|s| s.marker.is_list());
            if in_list {
                if let Some(current) = sections.last_mut() {
                    current.items.push(line.to_string());
                }
            } else if let Some(caps) = OPTION.captures(line) {
                let letter = caps[1].to_ascii_uppercase().chars().next().unwrap_or('A');
                let index = OPTION_LETTERS
                    .iter()
                    .position(|l| *l == letter)
                    .unwrap_or_default();
                sections.push(Section {
                    marker: Marker::Option(index),
                    text: caps[2].trim().to_string(),
                    items: Vec::new(),
                });
            } else if let Some(current) = sections.last_mut() {
                if !current.text.is_empty() {
                    current.text.push(' ');
                }
                current.text.push_str(line);
            }
        }

        Self { sections }
    }

    /// Text of the first non-empty section with this marker.
    pub fn field(&self, marker: Marker) -> Option<&str> {
        self.sections
            .iter()
            .filter(|s| s.marker == marker)
            .map(|s| s.text.trim())
            .find(|t| !t.is_empty())
    }

    /// Items of the first list section with this marker.
    pub fn items(&self, marker: Marker) -> &[String] {
        self.sections
            .iter()
            .find(|s| s.marker == marker)
            .map(|s| s.items.as_slice())
            .unwrap_or_default()
    }

    /// The `TYPE:` label, if it names a known exam type.
    pub fn type_label(&self) -> Option<ExamType> {
        self.field(Marker::Type)?.parse().ok()
    }
}

fn strip_decoration(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c == '*' || c == '#' || c == '>')
        .trim()
}

/// Split raw provider output into question blocks.
pub fn split_blocks(raw: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in raw.lines() {
        if SEPARATOR.is_match(line) {
            if !current.trim().is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Parse provider output into questions of `exam_type`.
///
/// In comprehensive mode each block goes to the extractor named by its
/// `TYPE:` label first, then to every other extractor in turn.
pub fn parse_response(raw: &str, exam_type: ExamType) -> Vec<Question> {
    let blocks = split_blocks(raw);
    let mut questions = Vec::with_capacity(blocks.len());
    let mut dropped = 0usize;

    for raw_block in &blocks {
        let block = Block::scan(raw_block);
        let parsed = match extractor_for(exam_type) {
            Some(extract) => extract(&block),
            None => parse_any(&block),
        };
        match parsed {
            Some(question) => questions.push(question),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = questions.len(), "dropped incomplete question blocks");
    }
    questions
}

/// The extractor for a single question kind. `None` for comprehensive exams.
pub fn extractor_for(exam_type: ExamType) -> Option<Extractor> {
    match exam_type {
        ExamType::Mcq => Some(parse_mcq),
        ExamType::TrueFalse => Some(parse_true_false),
        ExamType::FillBlank => Some(parse_fill_blank),
        ExamType::Matching => Some(parse_matching),
        ExamType::ShortAnswer => Some(parse_short_answer),
        ExamType::Comprehensive => None,
    }
}

const COMPREHENSIVE_ORDER: [ExamType; 5] = [
    ExamType::Matching,
    ExamType::Mcq,
    ExamType::ShortAnswer,
    ExamType::TrueFalse,
    ExamType::FillBlank,
];

fn parse_any(block: &Block) -> Option<Question> {
    let labeled = block.type_label().filter(|t| *t != ExamType::Comprehensive);
    labeled
        .into_iter()
        .chain(COMPREHENSIVE_ORDER.into_iter().filter(|t| Some(*t) != labeled))
        .filter_map(extractor_for)
        .find_map(|extract| extract(block))
}

fn explanation(block: &Block) -> Option<String> {
    block.field(Marker::Explanation).map(str::to_string)
}

/// `Q:`, four options, `CORRECT:`, optional `EXPLANATION:`.
pub fn parse_mcq(block: &Block) -> Option<Question> {
    let question = block.field(Marker::Question)?.to_string();
    let options = [
        block.field(Marker::Option(0))?.to_string(),
        block.field(Marker::Option(1))?.to_string(),
        block.field(Marker::Option(2))?.to_string(),
        block.field(Marker::Option(3))?.to_string(),
    ];
    let correct = block.field(Marker::Correct)?.to_uppercase();
    let correct_answer = CORRECT_LETTER
        .captures(&correct)
        .and_then(|caps| caps[1].chars().next())?;

    Some(Question::Mcq {
        question,
        options,
        correct_answer,
        explanation: explanation(block),
    })
}

/// `Q:`, `ANSWER: TRUE|FALSE`, optional `EXPLANATION:`.
pub fn parse_true_false(block: &Block) -> Option<Question> {
    let question = block.field(Marker::Question)?.to_string();
    let answer = block.field(Marker::Answer)?.to_uppercase();
    let token = answer
        .trim_start_matches(|c: char| !c.is_ascii_alphabetic())
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    let correct_answer = match token {
        "TRUE" => true,
        "FALSE" => false,
        _ => return None,
    };

    Some(Question::TrueFalse {
        question,
        correct_answer,
        explanation: explanation(block),
    })
}

/// `Q:` containing a blank, `ANSWER:`, optional `EXPLANATION:`.
pub fn parse_fill_blank(block: &Block) -> Option<Question> {
    let question = block.field(Marker::Question)?;
    if !BLANK.is_match(question) {
        return None;
    }
    let correct_answer = block.field(Marker::Answer)?.to_string();

    Some(Question::FillBlank {
        question: question.to_string(),
        correct_answer,
        explanation: explanation(block),
    })
}

/// `TERMS:` numbered list, `DEFINITIONS:` lettered list, `ANSWERS:` pairs.
pub fn parse_matching(block: &Block) -> Option<Question> {
    let terms: Vec<String> = block
        .items(Marker::Terms)
        .iter()
        .map(|item| match NUMBERED_ITEM.captures(item) {
            Some(caps) => caps[2].trim().to_string(),
            None => item.trim().to_string(),
        })
        .filter(|t| !t.is_empty())
        .collect();
    let definitions: Vec<String> = block
        .items(Marker::Definitions)
        .iter()
        .map(|item| match LETTERED_ITEM.captures(item) {
            Some(caps) => caps[2].trim().to_string(),
            None => item.trim().to_string(),
        })
        .filter(|d| !d.is_empty())
        .collect();
    if terms.is_empty() || definitions.is_empty() {
        return None;
    }

    let answers = block.items(Marker::Answers).join(" ");
    let mut correct_answers = BTreeMap::new();
    for caps in PAIR.captures_iter(&answers) {
        let Ok(term) = caps[1].parse::<usize>() else {
            continue;
        };
        let Some(letter) = caps[2].to_ascii_uppercase().chars().next() else {
            continue;
        };
        let def_index = (letter as u8 - b'A') as usize;
        if (1..=terms.len()).contains(&term) && def_index < definitions.len() {
            correct_answers.insert(term, letter);
        }
    }
    if correct_answers.is_empty() {
        return None;
    }

    Some(Question::Matching {
        terms,
        definitions,
        correct_answers,
    })
}

/// `Q:`, `EXPECTED_ANSWER:`, optional `KEY_TERMS:`.
pub fn parse_short_answer(block: &Block) -> Option<Question> {
    let question = block.field(Marker::Question)?.to_string();
    let expected_answer = block.field(Marker::ExpectedAnswer)?.to_string();
    let key_terms = block
        .field(Marker::KeyTerms)
        .map(|terms| {
            terms
                .split(',')
                .map(|t| {
                    t.trim()
                        .trim_matches(|c: char| c == '.' || c == '[' || c == ']')
                        .trim()
                        .to_lowercase()
                })
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(Question::ShortAnswer {
        question,
        expected_answer,
        key_terms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::BLOCK_SEPARATOR;

    const MCQ_RESPONSE: &str = "Here are your questions:

Q: What is the powerhouse of the cell?
A) Nucleus
B) Mitochondria
C) Ribosome
D) Golgi apparatus
CORRECT: B
EXPLANATION: Mitochondria produce ATP.
---
Q: Which molecule stores genetic information?
A. DNA
B. ATP
C. Glucose
D. Water
CORRECT: A) DNA
---
Q: Broken question without options
CORRECT: C
";

    #[test]
    fn parses_mcq_blocks_and_drops_incomplete_ones() {
        let questions = parse_response(MCQ_RESPONSE, ExamType::Mcq);
        assert_eq!(questions.len(), 2);
        match &questions[0] {
            Question::Mcq {
                question,
                options,
                correct_answer,
                explanation,
            } => {
                assert_eq!(question, "What is the powerhouse of the cell?");
                assert_eq!(options[1], "Mitochondria");
                assert_eq!(*correct_answer, 'B');
                assert_eq!(explanation.as_deref(), Some("Mitochondria produce ATP."));
            }
            other => panic!("expected MCQ, got {other:?}"),
        }
        match &questions[1] {
            Question::Mcq {
                correct_answer,
                explanation,
                ..
            } => {
                assert_eq!(*correct_answer, 'A');
                assert!(explanation.is_none());
            }
            other => panic!("expected MCQ, got {other:?}"),
        }
    }

    #[test]
    fn tolerates_markdown_emphasis() {
        let raw = "**Q:** Is water wet?\n**ANSWER:** True.\n**Explanation:** It is.";
        let questions = parse_response(raw, ExamType::TrueFalse);
        assert_eq!(
            questions,
            vec![Question::TrueFalse {
                question: "Is water wet?".into(),
                correct_answer: true,
                explanation: Some("It is.".into()),
            }]
        );
    }

    #[test]
    fn true_false_requires_boolean_answer() {
        let raw = "Q: The sun is a star.\nANSWER: FALSE\n---\nQ: Unclear\nANSWER: maybe";
        let questions = parse_response(raw, ExamType::TrueFalse);
        assert_eq!(questions.len(), 1);
        assert!(matches!(
            questions[0],
            Question::TrueFalse {
                correct_answer: false,
                ..
            }
        ));
    }

    #[test]
    fn fill_blank_requires_blank_marker() {
        let raw = "Q: The _____ is the control center of the cell.\nANSWER: nucleus\n---\n\
                   Q: No blank here.\nANSWER: nothing";
        let questions = parse_response(raw, ExamType::FillBlank);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].reference_answer(), "nucleus");
    }

    #[test]
    fn multi_line_question_text_is_joined() {
        let raw = "Q: Read the passage\nand pick the _____ word.\nANSWER: right";
        let questions = parse_response(raw, ExamType::FillBlank);
        assert_eq!(
            questions[0].prompt(),
            "Read the passage and pick the _____ word."
        );
    }

    #[test]
    fn abbreviation_lines_are_not_options() {
        let raw = "Q: Which river runs through the capital?\nD.C. sits on its banks.\n\
                   A) Hudson\nB) Potomac\nC) Ohio\nD) Delaware\nCORRECT: B";
        let questions = parse_response(raw, ExamType::Mcq);
        assert_eq!(questions.len(), 1);
        match &questions[0] {
            Question::Mcq {
                question, options, ..
            } => {
                assert_eq!(
                    question,
                    "Which river runs through the capital? D.C. sits on its banks."
                );
                assert_eq!(options[3], "Delaware");
            }
            other => panic!("expected MCQ, got {other:?}"),
        }
    }

    #[test]
    fn parses_matching_sections() {
        let raw = "TERMS:
1. Osmosis
2. Diffusion
3. Active transport
DEFINITIONS:
A. Movement of particles from high to low concentration
B. Movement requiring energy
C. Movement of water across a membrane
ANSWERS: 1-C, 2-A, 3-B, 4-D";
        let questions = parse_response(raw, ExamType::Matching);
        assert_eq!(questions.len(), 1);
        match &questions[0] {
            Question::Matching {
                terms,
                definitions,
                correct_answers,
            } => {
                assert_eq!(terms, &["Osmosis", "Diffusion", "Active transport"]);
                assert_eq!(definitions.len(), 3);
                assert_eq!(
                    correct_answers,
                    &BTreeMap::from([(1, 'C'), (2, 'A'), (3, 'B')])
                );
            }
            other => panic!("expected matching, got {other:?}"),
        }
    }

    #[test]
    fn matching_answers_may_span_lines() {
        let raw = "TERMS:\n1) a\n2) b\nDEFINITIONS:\nA) x\nB) y\nANSWERS:\n1 - b\n2 - a";
        let questions = parse_response(raw, ExamType::Matching);
        assert_eq!(
            questions[0].reference_answer(),
            "1-B, 2-A",
            "lower-case letters are normalized"
        );
    }

    #[test]
    fn matching_without_valid_pairs_is_dropped() {
        let raw = "TERMS:\n1. a\nDEFINITIONS:\nA. x\nANSWERS: 5-Z";
        assert!(parse_response(raw, ExamType::Matching).is_empty());
    }

    #[test]
    fn parses_short_answer_key_terms() {
        let raw = "Q: Why do leaves look green?\n\
                   EXPECTED_ANSWER: Chlorophyll reflects green light.\n\
                   KEY_TERMS: Chlorophyll, Reflects, green light.";
        let questions = parse_response(raw, ExamType::ShortAnswer);
        match &questions[0] {
            Question::ShortAnswer {
                expected_answer,
                key_terms,
                ..
            } => {
                assert_eq!(expected_answer, "Chlorophyll reflects green light.");
                assert_eq!(key_terms, &["chlorophyll", "reflects", "green light"]);
            }
            other => panic!("expected short answer, got {other:?}"),
        }
    }

    #[test]
    fn short_answer_key_terms_are_optional() {
        let raw = "Q: Define energy.\nEXPECTED_ANSWER: The capacity to do work.";
        let questions = parse_response(raw, ExamType::ShortAnswer);
        assert!(matches!(
            &questions[0],
            Question::ShortAnswer { key_terms, .. } if key_terms.is_empty()
        ));
    }

    #[test]
    fn comprehensive_dispatches_each_block() {
        let raw = "TYPE: MCQ
Q: Pick B
A) a
B) b
C) c
D) d
CORRECT: B
---
TYPE: TRUE_FALSE
Q: Rust is a language.
ANSWER: TRUE
---
TYPE: FILL_BLANK
Q: Cargo is Rust's _____ manager.
ANSWER: package
---
TYPE: MATCHING
TERMS:
1. fn
DEFINITIONS:
A. function
ANSWERS: 1-A
---
TYPE: SHORT_ANSWER
Q: What is ownership?
EXPECTED_ANSWER: A set of rules governing memory.
KEY_TERMS: rules, memory
---
Unlabeled text that is not a question";
        let kinds: Vec<ExamType> = parse_response(raw, ExamType::Comprehensive)
            .iter()
            .map(Question::exam_type)
            .collect();
        assert_eq!(
            kinds,
            [
                ExamType::Mcq,
                ExamType::TrueFalse,
                ExamType::FillBlank,
                ExamType::Matching,
                ExamType::ShortAnswer,
            ]
        );
    }

    #[test]
    fn comprehensive_falls_back_when_label_is_wrong() {
        let raw = "TYPE: MCQ\nQ: The sky is blue.\nANSWER: true";
        let questions = parse_response(raw, ExamType::Comprehensive);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].exam_type(), ExamType::TrueFalse);
    }

    #[test]
    fn single_type_mode_ignores_other_kinds() {
        let raw = "Q: The sky is blue.\nANSWER: TRUE";
        assert!(parse_response(raw, ExamType::Mcq).is_empty());
    }

    #[test]
    fn separator_splits_only_on_dash_lines() {
        let blocks = split_blocks("a\n---\nb\n -----  \nc\n1-A");
        assert_eq!(blocks, ["a\n", "b\n", "c\n1-A\n"]);
        assert_eq!(BLOCK_SEPARATOR, "---");
    }
}
