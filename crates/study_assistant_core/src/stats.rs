//! crates/study_assistant_core/src/stats.rs
//!
//! Dashboard aggregation: totals and averages over a user's documents,
//! flashcards and quizzes. The fold itself is pure; `DashboardService`
//! fetches the inputs through the storage port.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Document, FlashcardSet, Quiz};
use crate::ports::{PortResult, StorageService};

/// A user's study activity at a glance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudyOverview {
    pub total_documents: usize,
    pub total_flashcard_sets: usize,
    pub total_flashcards: usize,
    pub reviewed_flashcards: usize,
    pub starred_flashcards: usize,
    pub total_quizzes: usize,
    pub completed_quizzes: usize,
    /// Rounded mean score over completed quizzes; 0 when none are completed.
    pub average_score: u32,
}

impl StudyOverview {
    pub fn compute(documents: &[Document], sets: &[FlashcardSet], quizzes: &[Quiz]) -> Self {
        let total_flashcards = sets.iter().map(|s| s.cards.len()).sum();
        let reviewed_flashcards = sets
            .iter()
            .flat_map(|s| &s.cards)
            .filter(|c| c.review_count > 0)
            .count();
        let starred_flashcards = sets
            .iter()
            .flat_map(|s| &s.cards)
            .filter(|c| c.is_starred)
            .count();

        let completed: Vec<&Quiz> = quizzes.iter().filter(|q| q.completed_at.is_some()).collect();
        let average_score = if completed.is_empty() {
            0
        } else {
            let sum: u32 = completed.iter().map(|q| u32::from(q.score)).sum();
            (f64::from(sum) / completed.len() as f64).round() as u32
        };

        Self {
            total_documents: documents.len(),
            total_flashcard_sets: sets.len(),
            total_flashcards,
            reviewed_flashcards,
            starred_flashcards,
            total_quizzes: quizzes.len(),
            completed_quizzes: completed.len(),
            average_score,
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    storage: Arc<dyn StorageService>,
}

impl DashboardService {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    pub async fn overview(&self, user_id: Uuid) -> PortResult<StudyOverview> {
        let documents = self.storage.list_documents(user_id).await?;
        let sets = self.storage.get_all_flashcard_sets(user_id).await?;
        let quizzes = self.storage.list_all_quizzes(user_id).await?;
        Ok(StudyOverview::compute(&documents, &sets, &quizzes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Flashcard, FlashcardSet, Quiz};
    use chrono::Utc;

    #[test]
    fn empty_inputs_produce_a_zeroed_overview() {
        assert_eq!(
            StudyOverview::compute(&[], &[], &[]),
            StudyOverview::default()
        );
    }

    #[test]
    fn counts_cards_and_averages_completed_scores() {
        let user_id = Uuid::new_v4();
        let document_id = Uuid::new_v4();

        let mut starred = Flashcard::new("q".into(), "a".into(), Difficulty::Easy);
        starred.toggle_star();
        let mut reviewed = Flashcard::new("q".into(), "a".into(), Difficulty::Medium);
        reviewed.record_review(Utc::now());
        let plain = Flashcard::new("q".into(), "a".into(), Difficulty::Hard);
        let set = FlashcardSet::new(user_id, document_id, vec![starred, reviewed, plain]);

        let mut done_high = Quiz::new(user_id, document_id, "a".into(), vec![]);
        done_high.score = 80;
        done_high.completed_at = Some(Utc::now());
        let mut done_low = Quiz::new(user_id, document_id, "b".into(), vec![]);
        done_low.score = 55;
        done_low.completed_at = Some(Utc::now());
        let pending = Quiz::new(user_id, document_id, "c".into(), vec![]);

        let overview = StudyOverview::compute(&[], &[set], &[done_high, done_low, pending]);

        assert_eq!(overview.total_flashcard_sets, 1);
        assert_eq!(overview.total_flashcards, 3);
        assert_eq!(overview.reviewed_flashcards, 1);
        assert_eq!(overview.starred_flashcards, 1);
        assert_eq!(overview.total_quizzes, 3);
        assert_eq!(overview.completed_quizzes, 2);
        assert_eq!(overview.average_score, 68);
    }
}
