//! Rule-based question synthesis.
//!
//! The last resort when no provider produced questions. Questions are built
//! straight from source sentences by blanking or swapping words; content is
//! random but the shape of every question kind is fixed.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

use crate::model::{ExamType, Question, OPTION_LETTERS};
use crate::prompt::BLANK_MARKER;

/// Sentences must be longer than this to be used.
pub const MIN_SENTENCE_CHARS: usize = 30;
/// Sentences per synthesized matching exercise.
pub const MATCHING_PAIRS: usize = 5;

const KEY_TERM_COUNT: usize = 5;
const MATCHING_TERM_WORDS: usize = 3;
const MATCHING_DEFINITION_WORDS: usize = 7;
const DISTRACTOR_PLACEHOLDERS: [&str; 3] = [
    "None of the above",
    "All of the above",
    "Not stated in the text",
];
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "because", "been", "before", "being", "between",
    "both", "could", "does", "doing", "during", "each", "from", "have", "having", "here", "into",
    "more", "most", "must", "only", "other", "over", "same", "should", "some", "such", "than",
    "that", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "under", "until", "very", "were", "what", "when", "where", "which", "while", "with", "would",
    "your",
];

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").expect("valid sentence pattern"));

/// Synthesizes questions from extracted text without any remote service.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedGenerator;

impl RuleBasedGenerator {
    /// Generate up to `count` questions using the thread-local RNG.
    pub fn generate(&self, text: &str, exam_type: ExamType, count: usize) -> Vec<Question> {
        self.generate_with_rng(text, exam_type, count, &mut rand::thread_rng())
    }

    /// Generate up to `count` questions with a caller-supplied RNG.
    ///
    /// Comprehensive exams cycle through MCQ, true/false and fill-in-the-blank
    /// only.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        exam_type: ExamType,
        count: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut sentences = split_sentences(text);
        sentences.shuffle(rng);

        let questions: Vec<Question> = match exam_type {
            ExamType::Mcq => sentences
                .iter()
                .filter_map(|s| mcq(s, rng))
                .take(count)
                .collect(),
            ExamType::TrueFalse => sentences
                .iter()
                .filter_map(|s| true_false(s, rng))
                .take(count)
                .collect(),
            ExamType::FillBlank => sentences
                .iter()
                .filter_map(|s| fill_blank(s, rng))
                .take(count)
                .collect(),
            ExamType::ShortAnswer => sentences
                .iter()
                .filter_map(|s| short_answer(s))
                .take(count)
                .collect(),
            ExamType::Matching => sentences
                .chunks(MATCHING_PAIRS)
                .filter_map(matching)
                .take(count)
                .collect(),
            ExamType::Comprehensive => sentences
                .iter()
                .enumerate()
                .filter_map(|(i, s)| match i % 3 {
                    0 => mcq(s, rng),
                    1 => true_false(s, rng),
                    _ => fill_blank(s, rng),
                })
                .take(count)
                .collect(),
        };

        tracing::debug!(
            sentences = sentences.len(),
            generated = questions.len(),
            %exam_type,
            "rule-based generation finished"
        );
        questions
    }
}

/// Sentences longer than [`MIN_SENTENCE_CHARS`], whitespace collapsed.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// Words with surrounding punctuation removed.
fn words(sentence: &str) -> Vec<&str> {
    sentence
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

fn char_len(word: &str) -> usize {
    word.chars().count()
}

/// Replace the first whole-word occurrence of `word` in `sentence`.
fn replace_word(sentence: &str, word: &str, replacement: &str) -> String {
    match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
        Ok(re) => re.replacen(sentence, 1, regex::NoExpand(replacement)).into_owned(),
        Err(_) => sentence.replacen(word, replacement, 1),
    }
}

fn original_text(sentence: &str) -> Option<String> {
    Some(format!("Original text: \"{sentence}\""))
}

fn mcq<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<Question> {
    let words = words(sentence);
    let candidates: Vec<&str> = words.iter().copied().filter(|w| char_len(w) > 4).collect();
    let answer = *candidates.choose(rng)?;

    let mut seen = HashSet::from([answer.to_lowercase()]);
    let others: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| char_len(w) > 2 && seen.insert(w.to_lowercase()))
        .collect();
    let mut options: Vec<String> = others
        .choose_multiple(rng, OPTION_LETTERS.len() - 1)
        .map(|w| w.to_string())
        .collect();
    for placeholder in DISTRACTOR_PLACEHOLDERS {
        if options.len() >= OPTION_LETTERS.len() - 1 {
            break;
        }
        options.push(placeholder.to_string());
    }
    options.push(answer.to_string());
    options.shuffle(rng);

    let correct = options.iter().position(|o| o == answer)?;
    let options: [String; 4] = options.try_into().ok()?;

    Some(Question::Mcq {
        question: format!(
            "Which word best completes the sentence? \"{}\"",
            replace_word(sentence, answer, BLANK_MARKER)
        ),
        options,
        correct_answer: OPTION_LETTERS[correct],
        explanation: original_text(sentence),
    })
}

fn true_false<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<Question> {
    let mut statement = sentence.to_string();
    let mut correct_answer = true;

    if rng.gen_bool(0.5) {
        let words = words(sentence);
        let candidates: Vec<&str> = words.iter().copied().filter(|w| char_len(w) > 4).collect();
        if let Some(&target) = candidates.choose(rng) {
            let swaps: Vec<&str> = candidates
                .iter()
                .copied()
                .filter(|w| !w.eq_ignore_ascii_case(target))
                .collect();
            if let Some(&swap) = swaps.choose(rng) {
                statement = replace_word(sentence, target, swap);
                correct_answer = false;
            }
        }
    }

    Some(Question::TrueFalse {
        question: statement,
        correct_answer,
        explanation: original_text(sentence),
    })
}

fn fill_blank<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<Question> {
    let words = words(sentence);
    let candidates: Vec<&str> = words.iter().copied().filter(|w| char_len(w) >= 4).collect();
    let answer = *candidates.choose(rng)?;

    Some(Question::FillBlank {
        question: replace_word(sentence, answer, BLANK_MARKER),
        correct_answer: answer.to_string(),
        explanation: original_text(sentence),
    })
}

fn short_answer(sentence: &str) -> Option<Question> {
    let words = words(sentence);
    let mut seen = HashSet::new();
    let key_terms: Vec<String> = words
        .iter()
        .map(|w| w.to_lowercase())
        .filter(|w| char_len(w) > 3 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(KEY_TERM_COUNT)
        .collect();
    if key_terms.is_empty() {
        return None;
    }
    let lead = words.iter().take(6).copied().collect::<Vec<_>>().join(" ");

    Some(Question::ShortAnswer {
        question: format!("Explain in your own words: \"{lead}...\""),
        expected_answer: sentence.to_string(),
        key_terms,
    })
}

/// Term is the first three words of a sentence, definition the next seven.
///
/// Definitions keep sentence order, so term `n` always pairs with the `n`th
/// letter.
fn matching(sentences: &[String]) -> Option<Question> {
    let pairs: Vec<(String, String)> = sentences
        .iter()
        .filter_map(|s| {
            let words = words(s);
            if words.len() <= MATCHING_TERM_WORDS {
                return None;
            }
            let term = words[..MATCHING_TERM_WORDS].join(" ");
            let definition = words[MATCHING_TERM_WORDS..]
                .iter()
                .take(MATCHING_DEFINITION_WORDS)
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            Some((term, definition))
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let correct_answers: BTreeMap<usize, char> = (1..=pairs.len())
        .zip('A'..='Z')
        .collect();
    let (terms, definitions) = pairs.into_iter().unzip();

    Some(Question::Matching {
        terms,
        definitions,
        correct_answers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TEXT: &str = "Photosynthesis converts light energy into chemical energy inside plant cells. \
        Chlorophyll absorbs mostly blue and red wavelengths of visible light. \
        The Calvin cycle fixes carbon dioxide into three-carbon sugar molecules. \
        Stomata regulate the exchange of gases between leaves and the atmosphere! \
        Mitochondria release stored energy through cellular respiration processes? \
        Short one. \
        Xylem vessels transport water upward from the roots to the leaves.";

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn splits_long_sentences_only() {
        let sentences = split_sentences(TEXT);
        assert_eq!(sentences.len(), 6);
        assert!(sentences.iter().all(|s| s.chars().count() > MIN_SENTENCE_CHARS));
        assert!(!sentences.iter().any(|s| s.starts_with("Short")));
    }

    #[test]
    fn mcq_blanks_the_answer_and_marks_it_correct() {
        let questions = RuleBasedGenerator.generate_with_rng(TEXT, ExamType::Mcq, 4, &mut rng());
        assert_eq!(questions.len(), 4);
        for q in &questions {
            let Question::Mcq {
                question,
                options,
                correct_answer,
                ..
            } = q
            else {
                panic!("expected MCQ, got {q:?}");
            };
            assert!(question.contains(BLANK_MARKER));
            let index = OPTION_LETTERS.iter().position(|l| l == correct_answer).unwrap();
            let answer = &options[index];
            assert!(answer.chars().count() > 4);
            let unique: HashSet<_> = options.iter().map(|o| o.to_lowercase()).collect();
            assert_eq!(unique.len(), 4, "options must be distinct: {options:?}");
        }
    }

    #[test]
    fn mcq_pads_short_sentences_with_placeholders() {
        let q = mcq("Electromagnetism everywhere.", &mut rng()).unwrap();
        let Question::Mcq { options, .. } = q else {
            panic!("expected MCQ");
        };
        assert!(options.contains(&DISTRACTOR_PLACEHOLDERS[0].to_string()));
        assert!(options.contains(&DISTRACTOR_PLACEHOLDERS[1].to_string()));
    }

    #[test]
    fn true_false_statements_are_true_or_altered() {
        let questions =
            RuleBasedGenerator.generate_with_rng(TEXT, ExamType::TrueFalse, 6, &mut rng());
        assert_eq!(questions.len(), 6);
        let sentences = split_sentences(TEXT);
        for q in &questions {
            let Question::TrueFalse {
                question,
                correct_answer,
                ..
            } = q
            else {
                panic!("expected true/false");
            };
            assert_eq!(*correct_answer, sentences.contains(question));
        }
    }

    #[test]
    fn fill_blank_answer_restores_sentence() {
        let questions =
            RuleBasedGenerator.generate_with_rng(TEXT, ExamType::FillBlank, 3, &mut rng());
        let sentences = split_sentences(TEXT);
        for q in &questions {
            let Question::FillBlank {
                question,
                correct_answer,
                ..
            } = q
            else {
                panic!("expected fill-blank");
            };
            let restored = question.replacen(BLANK_MARKER, correct_answer, 1);
            assert!(sentences.contains(&restored), "{restored}");
        }
    }

    #[test]
    fn short_answer_uses_sentence_and_key_terms() {
        let q = short_answer("Chlorophyll absorbs mostly blue and red wavelengths of visible light.")
            .unwrap();
        let Question::ShortAnswer {
            expected_answer,
            key_terms,
            ..
        } = q
        else {
            panic!("expected short answer");
        };
        assert!(expected_answer.starts_with("Chlorophyll"));
        assert_eq!(
            key_terms,
            ["chlorophyll", "absorbs", "mostly", "blue", "wavelengths"]
        );
    }

    #[test]
    fn matching_uses_fixed_letter_map() {
        let questions =
            RuleBasedGenerator.generate_with_rng(TEXT, ExamType::Matching, 3, &mut rng());
        assert_eq!(questions.len(), 1, "six sentences make one full set and one pair");
        let Question::Matching {
            terms,
            definitions,
            correct_answers,
        } = &questions[0]
        else {
            panic!("expected matching");
        };
        assert_eq!(terms.len(), 5);
        assert_eq!(definitions.len(), 5);
        assert_eq!(correct_answers[&1], 'A');
        assert_eq!(correct_answers[&5], 'E');
        assert!(terms.iter().all(|t| t.split_whitespace().count() == 3));
        assert!(definitions.iter().all(|d| d.split_whitespace().count() <= 7));
    }

    #[test]
    fn comprehensive_cycles_three_kinds() {
        let questions =
            RuleBasedGenerator.generate_with_rng(TEXT, ExamType::Comprehensive, 10, &mut rng());
        assert_eq!(questions.len(), 6);
        let kinds: Vec<ExamType> = questions.iter().map(Question::exam_type).collect();
        assert_eq!(
            kinds,
            [
                ExamType::Mcq,
                ExamType::TrueFalse,
                ExamType::FillBlank,
                ExamType::Mcq,
                ExamType::TrueFalse,
                ExamType::FillBlank,
            ]
        );
    }

    #[test]
    fn count_caps_output() {
        for exam_type in [ExamType::Mcq, ExamType::ShortAnswer, ExamType::Comprehensive] {
            let questions = RuleBasedGenerator.generate_with_rng(TEXT, exam_type, 2, &mut rng());
            assert!(questions.len() <= 2);
        }
    }

    #[test]
    fn no_usable_sentences_yields_nothing() {
        assert!(RuleBasedGenerator
            .generate("Too short. Tiny.", ExamType::Mcq, 5)
            .is_empty());
    }
}
