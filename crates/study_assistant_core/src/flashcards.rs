//! crates/study_assistant_core/src/flashcards.rs
//!
//! Review bookkeeping for generated flashcards: review counts, last-review
//! timestamps and the starred flag. Cards are addressed by id; storage
//! resolves a card id to the set that owns it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Flashcard, FlashcardSet};
use crate::ports::{PortError, PortResult, StorageService};

#[derive(Clone)]
pub struct FlashcardService {
    storage: Arc<dyn StorageService>,
}

impl FlashcardService {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Marks a card as reviewed: bumps its review count and stamps the
    /// review time. Returns the updated card.
    pub async fn record_review(&self, user_id: Uuid, card_id: Uuid) -> PortResult<Flashcard> {
        let set = self.storage.get_flashcard_set_by_card(user_id, card_id).await?;
        let mut card = find_card(&set, card_id)?;
        card.record_review(Utc::now());
        self.storage.update_flashcard(set.id, &card).await?;
        Ok(card)
    }

    /// Flips the starred flag on a card and returns the updated card.
    pub async fn toggle_star(&self, user_id: Uuid, card_id: Uuid) -> PortResult<Flashcard> {
        let set = self.storage.get_flashcard_set_by_card(user_id, card_id).await?;
        let mut card = find_card(&set, card_id)?;
        card.toggle_star();
        self.storage.update_flashcard(set.id, &card).await?;
        Ok(card)
    }

    /// All sets generated from one document, newest first.
    pub async fn sets_for_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<FlashcardSet>> {
        self.storage.get_flashcard_sets(user_id, document_id).await
    }

    /// All of a user's sets, newest first.
    pub async fn all_sets(&self, user_id: Uuid) -> PortResult<Vec<FlashcardSet>> {
        self.storage.get_all_flashcard_sets(user_id).await
    }

    /// Deletes a whole set, cards included.
    pub async fn delete_set(&self, user_id: Uuid, set_id: Uuid) -> PortResult<()> {
        self.storage.delete_flashcard_set(user_id, set_id).await
    }
}

fn find_card(set: &FlashcardSet, card_id: Uuid) -> PortResult<Flashcard> {
    set.cards
        .iter()
        .find(|c| c.id == card_id)
        .cloned()
        .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found in its set", card_id)))
}
