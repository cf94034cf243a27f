//! crates/study_assistant_core/src/parser.rs
//!
//! Turns loosely structured generation-engine output into validated domain
//! records. The source text is a free-form model response, so this is the
//! most failure-prone code in the system: the grammar tolerates stray
//! whitespace, missing trailing delimiters, case variation and junk lines,
//! and any segment that fails its accept predicate is dropped, never fatal.
//!
//! Responses are segmented on `---` delimiter lines; each segment is one
//! candidate record, scanned line by line against a small prefix grammar
//! (`Q:` / `A:` / `D:` for flashcards; `Q:` / `NN:` option lines / `C:` /
//! `E:` / `D:` for quiz questions). Recognized prefixes overwrite the
//! corresponding field, so the last occurrence wins; option lines append.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Difficulty, Flashcard, QuizQuestion};

/// A quiz question carries exactly this many options.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// An option line: a two-digit number, a colon, then the option text.
static OPTION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2}):\s*(.*)$").unwrap());
/// The leading two-digit number of a `C:` line; trailing text is tolerated.
static CORRECT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})").unwrap());

/// Parses flashcard records out of a raw generation response, keeping at
/// most `count`. Segments missing a question or an answer are dropped;
/// returning fewer records than requested is not an error.
pub fn parse_flashcards(raw: &str, count: usize) -> Vec<Flashcard> {
    let mut cards = Vec::new();
    for segment in segments(raw) {
        let mut builder = FlashcardBuilder::default();
        for line in segment {
            builder.feed(line);
        }
        if let Some(card) = builder.build() {
            cards.push(card);
        }
        if cards.len() == count {
            break;
        }
    }
    cards
}

/// Parses quiz-question records out of a raw generation response, keeping
/// at most `count`. A segment is accepted only with a non-empty question,
/// exactly four option lines and a correctness indicator in range.
pub fn parse_quiz_questions(raw: &str, count: usize) -> Vec<QuizQuestion> {
    let mut questions = Vec::new();
    for segment in segments(raw) {
        let mut builder = QuizQuestionBuilder::default();
        for line in segment {
            builder.feed(line);
        }
        if let Some(question) = builder.build() {
            questions.push(question);
        }
        if questions.len() == count {
            break;
        }
    }
    questions
}

/// Splits the response on `---` delimiter lines. A missing trailing
/// delimiter simply ends the last segment; blank segments disappear.
fn segments(raw: &str) -> Vec<Vec<&str>> {
    let mut all = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed == "---" {
            if !current.is_empty() {
                all.push(std::mem::take(&mut current));
            }
        } else if !trimmed.is_empty() {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        all.push(current);
    }
    all
}

/// Strips a recognized `P:`-style prefix and returns the trimmed remainder.
fn field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}

//=========================================================================================
// Flashcard candidate builder
//=========================================================================================

#[derive(Default)]
struct FlashcardBuilder {
    question: String,
    answer: String,
    difficulty: Option<Difficulty>,
}

impl FlashcardBuilder {
    fn feed(&mut self, line: &str) {
        if let Some(value) = field(line, "Q:") {
            self.question = value.to_string();
        } else if let Some(value) = field(line, "A:") {
            self.answer = value.to_string();
        } else if let Some(value) = field(line, "D:") {
            // An unrecognized difficulty token falls through to the default.
            if let Some(difficulty) = Difficulty::from_token(value) {
                self.difficulty = Some(difficulty);
            }
        }
        // Unrecognized lines are ignored.
    }

    /// Accepts the candidate only when both question and answer are
    /// non-empty after trimming.
    fn build(self) -> Option<Flashcard> {
        if self.question.is_empty() || self.answer.is_empty() {
            return None;
        }
        Some(Flashcard::new(
            self.question,
            self.answer,
            self.difficulty.unwrap_or_default(),
        ))
    }
}

//=========================================================================================
// Quiz question candidate builder
//=========================================================================================

#[derive(Default)]
struct QuizQuestionBuilder {
    question: String,
    options: Vec<String>,
    correct_answer: Option<usize>,
    explanation: String,
    difficulty: Option<Difficulty>,
}

impl QuizQuestionBuilder {
    fn feed(&mut self, line: &str) {
        if let Some(value) = field(line, "Q:") {
            self.question = value.to_string();
        } else if let Some(captures) = OPTION_LINE.captures(line) {
            self.options.push(captures[2].trim().to_string());
        } else if let Some(value) = field(line, "C:") {
            // The indicator is the leading two-digit 1-based option number;
            // trailing commentary from the model is tolerated. Out-of-range
            // or non-numeric indicators leave the candidate unacceptable.
            self.correct_answer = CORRECT_NUMBER
                .captures(value)
                .and_then(|c| c[1].parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .filter(|i| *i < QUIZ_OPTION_COUNT);
        } else if let Some(value) = field(line, "E:") {
            self.explanation = value.to_string();
        } else if let Some(value) = field(line, "D:") {
            if let Some(difficulty) = Difficulty::from_token(value) {
                self.difficulty = Some(difficulty);
            }
        }
    }

    /// Accepts the candidate only with a non-empty question, exactly four
    /// options (order preserved) and an in-range correctness index.
    fn build(self) -> Option<QuizQuestion> {
        if self.question.is_empty() || self.options.len() != QUIZ_OPTION_COUNT {
            return None;
        }
        Some(QuizQuestion {
            question: self.question,
            options: self.options,
            correct_answer: self.correct_answer?,
            explanation: self.explanation,
            difficulty: self.difficulty.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_flashcard() {
        let raw = "Q: What is ownership?\nA: Rust's memory management model.\nD: easy\n";
        let cards = parse_flashcards(raw, 10);

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "What is ownership?");
        assert_eq!(cards[0].answer, "Rust's memory management model.");
        assert_eq!(cards[0].difficulty, Difficulty::Easy);
        assert_eq!(cards[0].review_count, 0);
        assert!(!cards[0].is_starred);
    }

    #[test]
    fn drops_a_flashcard_missing_its_answer() {
        let raw = "Q: Orphaned question?\nD: hard\n---\nQ: Kept?\nA: Yes.\n";
        let cards = parse_flashcards(raw, 10);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "Kept?");
    }

    #[test]
    fn unknown_difficulty_defaults_to_medium() {
        let raw = "Q: A question\nA: An answer\nD: impossible\n";
        let cards = parse_flashcards(raw, 10);
        assert_eq!(cards[0].difficulty, Difficulty::Medium);
    }

    #[test]
    fn difficulty_token_is_case_insensitive() {
        let raw = "Q: A question\nA: An answer\nD: HARD\n";
        let cards = parse_flashcards(raw, 10);
        assert_eq!(cards[0].difficulty, Difficulty::Hard);
    }

    #[test]
    fn last_occurrence_of_a_prefix_wins() {
        let raw = "Q: First question\nQ: Second question\nA: Answer\n";
        let cards = parse_flashcards(raw, 10);
        assert_eq!(cards[0].question, "Second question");
    }

    #[test]
    fn output_is_truncated_to_the_requested_count() {
        let raw = "Q: one\nA: a\n---\nQ: two\nA: b\n---\nQ: three\nA: c\n";
        assert_eq!(parse_flashcards(raw, 2).len(), 2);
    }

    #[test]
    fn short_output_is_returned_as_is() {
        let raw = "Q: only\nA: card\n";
        assert_eq!(parse_flashcards(raw, 10).len(), 1);
    }

    #[test]
    fn missing_trailing_delimiter_is_tolerated() {
        let raw = "Q: one\nA: a\n---\nQ: two\nA: b";
        assert_eq!(parse_flashcards(raw, 10).len(), 2);
    }

    #[test]
    fn parses_a_well_formed_quiz_question() {
        let raw = "Q: Which keyword moves a value?\n\
                   01: borrow\n02: move\n03: copy\n04: drop\n\
                   C: 02\nE: Closures capture by move with the move keyword.\nD: medium\n";
        let questions = parse_quiz_questions(raw, 5);

        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.correct_answer, 1);
        assert_eq!(q.options.len(), 4);
        assert_eq!(q.options[1], "move");
        assert_eq!(q.explanation, "Closures capture by move with the move keyword.");
    }

    #[test]
    fn drops_a_question_with_three_options() {
        let raw = "Q: Incomplete?\n01: a\n02: b\n03: c\nC: 01\nE: x\n";
        assert!(parse_quiz_questions(raw, 5).is_empty());
    }

    #[test]
    fn drops_a_question_with_five_options() {
        let raw = "Q: Too many?\n01: a\n02: b\n03: c\n04: d\n05: e\nC: 01\n";
        assert!(parse_quiz_questions(raw, 5).is_empty());
    }

    #[test]
    fn correct_indicator_tolerates_trailing_text() {
        let raw = "Q: Q?\n01: a\n02: b\n03: c\n04: d\nC: 03 (because of borrowing)\n";
        let questions = parse_quiz_questions(raw, 5);
        assert_eq!(questions[0].correct_answer, 2);
    }

    #[test]
    fn out_of_range_correct_indicator_drops_the_segment() {
        let raw = "Q: Q?\n01: a\n02: b\n03: c\n04: d\nC: 07\n";
        assert!(parse_quiz_questions(raw, 5).is_empty());
    }

    #[test]
    fn non_numeric_correct_indicator_drops_the_segment() {
        let raw = "Q: Q?\n01: a\n02: b\n03: c\n04: d\nC: the second one\n";
        assert!(parse_quiz_questions(raw, 5).is_empty());
    }

    #[test]
    fn surrounding_whitespace_is_forgiven() {
        let raw = "  Q:   padded question \n  01: a \n 02: b\n03: c\n04: d\n  C:  01\n";
        let questions = parse_quiz_questions(raw, 5);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "padded question");
        assert_eq!(questions[0].options[0], "a");
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let raw = "Here are your flashcards!\nQ: Real?\nA: Yes\nHope that helps!\n";
        let cards = parse_flashcards(raw, 10);
        assert_eq!(cards.len(), 1);
    }
}
