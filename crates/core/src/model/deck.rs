use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::DeckId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck title cannot be empty")]
    EmptyTitle,

    #[error("deck owner cannot be empty")]
    EmptyOwner,
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// An ordered collection of cards plus metadata.
///
/// Cards within a deck share a distractor pool: any card's correct answer(s)
/// may serve as a plausible wrong answer for another card of the same deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    title: String,
    description: Option<String>,
    owner: String,
    created_at: DateTime<Utc>,
}

impl Deck {
    /// Creates a new Deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if title or owner is empty or whitespace-only.
    pub fn new(
        id: DeckId,
        title: impl Into<String>,
        description: Option<String>,
        owner: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DeckError::EmptyTitle);
        }

        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(DeckError::EmptyOwner);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            owner: owner.trim().to_owned(),
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn deck_rejects_empty_title() {
        let err = Deck::new(DeckId::new(1), "   ", None, "alice", fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyTitle);
    }

    #[test]
    fn deck_rejects_empty_owner() {
        let err = Deck::new(DeckId::new(1), "Biology", None, " ", fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyOwner);
    }

    #[test]
    fn deck_trims_fields_and_filters_empty_description() {
        let deck = Deck::new(
            DeckId::new(3),
            "  Chemistry  ",
            Some("   ".into()),
            " bob ",
            fixed_now(),
        )
        .unwrap();

        assert_eq!(deck.title(), "Chemistry");
        assert_eq!(deck.description(), None);
        assert_eq!(deck.owner(), "bob");
    }

    #[test]
    fn deck_happy_path() {
        let deck = Deck::new(
            DeckId::new(10),
            "German B1",
            Some("verbs + phrases".into()),
            "carol",
            fixed_now(),
        )
        .unwrap();

        assert_eq!(deck.id(), DeckId::new(10));
        assert_eq!(deck.title(), "German B1");
        assert_eq!(deck.description(), Some("verbs + phrases"));
    }
}
