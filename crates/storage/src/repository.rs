use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use url::Url;

use study_core::model::{AnswerKey, Card, CardError, CardId, Deck, DeckId, QuestionKind};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CARD RECORD ───────────────────────────────────────────────────────────────
//

/// Persisted shape for a card.
///
/// The backing service stores `correct_answer` and `correct_answers` as two
/// separate columns with `question_type` selecting which one is active; the
/// domain `Card` folds them into a single `AnswerKey`. This record keeps the
/// wire shape so repositories can serialize without leaking storage concerns
/// into the domain layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front_text: Option<String>,
    pub question_image_url: Option<Url>,
    pub question_type: QuestionKind,
    pub correct_answer: Option<String>,
    pub correct_answers: Vec<String>,
    pub incorrect_answers: Vec<String>,
    pub manual_incorrect_answers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CardRecord {
    #[must_use]
    pub fn from_card(card: &Card) -> Self {
        let (correct_answer, correct_answers) = match card.key() {
            AnswerKey::Single(answer) => (Some(answer.clone()), Vec::new()),
            AnswerKey::Multiple(answers) => (None, answers.clone()),
        };

        Self {
            id: card.id(),
            deck_id: card.deck_id(),
            front_text: card.front_text().map(str::to_owned),
            question_image_url: card.question_image_url().cloned(),
            question_type: card.kind(),
            correct_answer,
            correct_answers,
            incorrect_answers: card.incorrect_answers().to_vec(),
            manual_incorrect_answers: card.manual_incorrect_answers().to_vec(),
            created_at: card.created_at(),
        }
    }

    /// Convert the record back into a domain `Card`.
    ///
    /// A single-choice record with a missing answer column is normalized to a
    /// blank answer: the card still loads and shows up as unanswerable rather
    /// than failing the whole deck.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the record is structurally broken (no prompt at
    /// all, oversized manual distractor list).
    pub fn into_card(self) -> Result<Card, CardError> {
        let key = match self.question_type {
            QuestionKind::SingleChoice => {
                AnswerKey::Single(self.correct_answer.unwrap_or_default())
            }
            QuestionKind::MultipleSelect => AnswerKey::Multiple(self.correct_answers),
        };

        Card::from_persisted(
            self.id,
            self.deck_id,
            self.front_text,
            self.question_image_url,
            key,
            self.incorrect_answers,
            self.manual_incorrect_answers,
            self.created_at,
        )
    }
}

//
// ─── REPOSITORY TRAITS ─────────────────────────────────────────────────────────
//

/// Repository contract for decks.
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Persist or update a deck.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError>;
}

/// Repository contract for cards.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Persist or update a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError>;

    /// Fetch all cards of a deck, ordered by card ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck's cards cannot be listed.
    async fn list_cards_for_deck(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// In-memory repository for tests and local wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    decks: Arc<Mutex<HashMap<DeckId, Deck>>>,
    cards: Arc<Mutex<HashMap<CardId, CardRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut decks = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        decks.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError> {
        let decks = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        decks.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut cards = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        cards.insert(card.id(), CardRecord::from_card(card));
        Ok(())
    }

    async fn list_cards_for_deck(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let records: Vec<CardRecord> = {
            let cards = self
                .cards
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            cards
                .values()
                .filter(|r| r.deck_id == deck_id)
                .cloned()
                .collect()
        };

        let mut loaded = Vec::with_capacity(records.len());
        for record in records {
            let card = record
                .into_card()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            loaded.push(card);
        }
        loaded.sort_by_key(Card::id);
        Ok(loaded)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
