//! crates/study_assistant_core/src/quiz.rs
//!
//! Quiz submission: grading, scoring and the single unsubmitted→submitted
//! transition. Grading is a pure function; `QuizService` wraps it with the
//! atomic persist through the storage port.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AnswerRecord, Quiz, SubmittedAnswer};
use crate::ports::{PortError, PortResult, StorageService};

/// The graded outcome of a quiz submission.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub quiz_id: Uuid,
    pub score: u8,
    pub correct_count: usize,
    pub total_questions: usize,
    pub answers: Vec<AnswerRecord>,
    pub completed_at: DateTime<Utc>,
}

/// One row of the per-question breakdown for a completed quiz.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionReview {
    pub question_index: usize,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub selected_answer: Option<usize>,
    pub is_correct: bool,
    pub explanation: String,
}

/// Grades a submission against a quiz.
///
/// Pairs whose `question_index` is out of range are silently skipped, not
/// errors. Duplicate submissions for the same question collapse to the last
/// occurrence, so each question is graded at most once and the score can
/// never exceed 100. The score denominator is the quiz's fixed
/// `total_questions`, so unanswered and skipped questions count against the
/// score. Fails with `AlreadySubmitted` when the quiz has a completion
/// timestamp.
pub fn score_submission(
    quiz: &Quiz,
    answers: &[SubmittedAnswer],
    now: DateTime<Utc>,
) -> PortResult<QuizResult> {
    if quiz.completed_at.is_some() {
        return Err(PortError::AlreadySubmitted);
    }

    let mut latest: BTreeMap<usize, &SubmittedAnswer> = BTreeMap::new();
    for answer in answers {
        if answer.question_index < quiz.questions.len() {
            latest.insert(answer.question_index, answer);
        }
    }

    let mut records = Vec::new();
    let mut correct_count = 0;
    for (question_index, answer) in latest {
        let question = &quiz.questions[question_index];
        let is_correct = answer.selected_answer == question.correct_answer;
        if is_correct {
            correct_count += 1;
        }
        records.push(AnswerRecord {
            question_index,
            selected_answer: answer.selected_answer,
            is_correct,
            answered_at: now,
        });
    }

    let score = if quiz.total_questions == 0 {
        0
    } else {
        ((correct_count as f64 / quiz.total_questions as f64) * 100.0).round() as u8
    };

    Ok(QuizResult {
        quiz_id: quiz.id,
        score,
        correct_count,
        total_questions: quiz.total_questions,
        answers: records,
        completed_at: now,
    })
}

/// Builds the per-question result breakdown for a completed quiz.
pub fn review_quiz(quiz: &Quiz) -> PortResult<Vec<QuestionReview>> {
    if quiz.completed_at.is_none() {
        return Err(PortError::InvalidArgument(
            "quiz has not been submitted yet".to_string(),
        ));
    }

    Ok(quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = quiz
                .user_answers
                .iter()
                .find(|a| a.question_index == index);
            QuestionReview {
                question_index: index,
                question: question.question.clone(),
                options: question.options.clone(),
                correct_answer: question.correct_answer,
                selected_answer: answer.map(|a| a.selected_answer),
                is_correct: answer.map(|a| a.is_correct).unwrap_or(false),
                explanation: question.explanation.clone(),
            }
        })
        .collect())
}

/// Drives the quiz lifecycle against storage.
#[derive(Clone)]
pub struct QuizService {
    storage: Arc<dyn StorageService>,
}

impl QuizService {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Grades and persists a submission. The storage call is conditional on
    /// the quiz still being unsubmitted, so a racing double submit loses
    /// with `AlreadySubmitted` rather than overwriting the first result.
    pub async fn submit(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        answers: &[SubmittedAnswer],
    ) -> PortResult<QuizResult> {
        let quiz = self.storage.get_quiz(user_id, quiz_id).await?;
        let result = score_submission(&quiz, answers, Utc::now())?;
        self.storage
            .complete_quiz(quiz_id, &result.answers, result.score, result.completed_at)
            .await?;
        Ok(result)
    }

    /// Detailed results for a completed quiz.
    pub async fn review(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Vec<QuestionReview>> {
        let quiz = self.storage.get_quiz(user_id, quiz_id).await?;
        review_quiz(&quiz)
    }

    /// Deletes a quiz, submitted or not.
    pub async fn delete(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<()> {
        self.storage.delete_quiz(user_id, quiz_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, QuizQuestion};
    use crate::test_support::InMemoryStorage;

    fn question(correct: usize) -> QuizQuestion {
        QuizQuestion {
            question: "Q".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            explanation: "because".to_string(),
            difficulty: Difficulty::Medium,
        }
    }

    fn two_question_quiz() -> Quiz {
        Quiz::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Test Quiz".to_string(),
            vec![question(1), question(0)],
        )
    }

    #[test]
    fn one_correct_of_two_scores_fifty() {
        let quiz = two_question_quiz();
        let answers = [SubmittedAnswer {
            question_index: 0,
            selected_answer: 1,
        }];

        let result = score_submission(&quiz, &answers, Utc::now()).unwrap();

        assert_eq!(result.correct_count, 1);
        assert_eq!(result.score, 50);
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.answers.len(), 1);
        assert!(result.answers[0].is_correct);
    }

    #[test]
    fn out_of_range_indices_are_silently_skipped() {
        let quiz = two_question_quiz();
        let answers = [
            SubmittedAnswer {
                question_index: 7,
                selected_answer: 0,
            },
            SubmittedAnswer {
                question_index: 1,
                selected_answer: 0,
            },
        ];

        let result = score_submission(&quiz, &answers, Utc::now()).unwrap();

        assert_eq!(result.answers.len(), 1);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn unanswered_questions_count_against_the_score() {
        let quiz = Quiz::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "T".to_string(),
            vec![question(0), question(0), question(0)],
        );
        let answers = [SubmittedAnswer {
            question_index: 0,
            selected_answer: 0,
        }];

        let result = score_submission(&quiz, &answers, Utc::now()).unwrap();
        assert_eq!(result.score, 33);
    }

    #[test]
    fn duplicate_answers_grade_each_question_once() {
        let quiz = two_question_quiz();
        let answers = [
            SubmittedAnswer {
                question_index: 0,
                selected_answer: 1,
            },
            SubmittedAnswer {
                question_index: 0,
                selected_answer: 1,
            },
            SubmittedAnswer {
                question_index: 0,
                selected_answer: 1,
            },
        ];

        let result = score_submission(&quiz, &answers, Utc::now()).unwrap();

        assert_eq!(result.correct_count, 1);
        assert_eq!(result.answers.len(), 1);
        assert_eq!(result.score, 50);
        assert!(result.score <= 100);
    }

    #[test]
    fn the_last_duplicate_answer_wins() {
        let quiz = two_question_quiz();
        let answers = [
            SubmittedAnswer {
                question_index: 0,
                selected_answer: 1,
            },
            SubmittedAnswer {
                question_index: 0,
                selected_answer: 3,
            },
        ];

        let result = score_submission(&quiz, &answers, Utc::now()).unwrap();

        assert_eq!(result.answers.len(), 1);
        assert_eq!(result.answers[0].selected_answer, 3);
        assert!(!result.answers[0].is_correct);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn resubmission_is_rejected() {
        let mut quiz = two_question_quiz();
        quiz.completed_at = Some(Utc::now());

        let result = score_submission(&quiz, &[], Utc::now());
        assert!(matches!(result, Err(PortError::AlreadySubmitted)));
    }

    #[test]
    fn review_requires_a_completed_quiz() {
        let quiz = two_question_quiz();
        assert!(matches!(
            review_quiz(&quiz),
            Err(PortError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn submit_persists_the_transition_once() {
        let storage = Arc::new(InMemoryStorage::default());
        let quiz = two_question_quiz();
        let user_id = quiz.user_id;
        let quiz_id = storage.seed_quiz(quiz).await;
        let service = QuizService::new(storage.clone());

        let answers = [SubmittedAnswer {
            question_index: 0,
            selected_answer: 1,
        }];
        let result = service.submit(user_id, quiz_id, &answers).await.unwrap();
        assert_eq!(result.score, 50);

        let stored = storage.stored_quiz(quiz_id).await;
        assert_eq!(stored.score, 50);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.user_answers.len(), 1);

        let second = service.submit(user_id, quiz_id, &answers).await;
        assert!(matches!(second, Err(PortError::AlreadySubmitted)));
    }

    #[tokio::test]
    async fn delete_removes_the_quiz_for_its_owner_only() {
        let storage = Arc::new(InMemoryStorage::default());
        let quiz = two_question_quiz();
        let user_id = quiz.user_id;
        let quiz_id = storage.seed_quiz(quiz).await;
        let service = QuizService::new(storage.clone());

        let stranger = service.delete(Uuid::new_v4(), quiz_id).await;
        assert!(matches!(stranger, Err(PortError::NotFound(_))));

        service.delete(user_id, quiz_id).await.unwrap();
        let gone = storage.get_quiz(user_id, quiz_id).await;
        assert!(matches!(gone, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn review_reports_unanswered_questions() {
        let storage = Arc::new(InMemoryStorage::default());
        let quiz = two_question_quiz();
        let user_id = quiz.user_id;
        let quiz_id = storage.seed_quiz(quiz).await;
        let service = QuizService::new(storage.clone());

        service
            .submit(
                user_id,
                quiz_id,
                &[SubmittedAnswer {
                    question_index: 0,
                    selected_answer: 2,
                }],
            )
            .await
            .unwrap();

        let review = service.review(user_id, quiz_id).await.unwrap();
        assert_eq!(review.len(), 2);
        assert_eq!(review[0].selected_answer, Some(2));
        assert!(!review[0].is_correct);
        assert_eq!(review[1].selected_answer, None);
        assert!(!review[1].is_correct);
    }
}
