use std::sync::Arc;
use tracing::debug;

use storage::repository::{CardRepository, DeckRepository};
use study_core::Clock;
use study_core::model::{Deck, DeckId, StudyMode};

use super::engine::{PracticeSettings, StudySession};
use crate::breaker::{BreakerConfig, BreakerRegistry};
use crate::error::SessionError;

/// Orchestrates deck loading and session start.
///
/// This is the seam the UI layer calls: it fetches the deck and its cards
/// from the backing store, with each load guarded by a per-deck circuit
/// breaker, and hands back a ready [`StudySession`]. Load failures propagate
/// so the caller can offer an explicit retry; discarding a stale in-flight
/// load that lost a race against a newer one is the caller's job.
pub struct StudyLoopService {
    decks: Arc<dyn DeckRepository>,
    cards: Arc<dyn CardRepository>,
    breakers: BreakerRegistry,
    settings: PracticeSettings,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        decks: Arc<dyn DeckRepository>,
        cards: Arc<dyn CardRepository>,
    ) -> Self {
        Self {
            decks,
            cards,
            breakers: BreakerRegistry::new(BreakerConfig::default(), clock),
            settings: PracticeSettings::default(),
        }
    }

    #[must_use]
    pub fn with_practice_settings(mut self, settings: PracticeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Load a deck and start a study session over its cards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the deck or its cards cannot be
    /// loaded, and `SessionError::EmptyDeck` for a deck without cards.
    pub async fn start_session(
        &self,
        deck_id: DeckId,
        mode: StudyMode,
    ) -> Result<(Deck, StudySession), SessionError> {
        let key = format!("deck-load:{deck_id}");

        let deck = self
            .breakers
            .execute(&key, || self.decks.get_deck(deck_id))
            .await?;
        let cards = self
            .breakers
            .execute(&key, || self.cards.list_cards_for_deck(deck_id))
            .await?;
        debug!(deck = %deck.title(), cards = cards.len(), "deck loaded");

        let session = StudySession::with_settings(cards, mode, self.settings)?;
        Ok((deck, session))
    }

    /// Breaker registry, for callers that want backoff hints or recovery.
    #[must_use]
    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }
}
