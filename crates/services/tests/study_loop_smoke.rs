use std::sync::Arc;

use async_trait::async_trait;
use services::{BreakerState, SessionError, StudyLoopService};
use storage::repository::{CardRepository, DeckRepository, InMemoryRepository, StorageError};
use study_core::Clock;
use study_core::model::{CardDraft, CardId, Deck, DeckId, StudyMode};
use study_core::time::fixed_now;

async fn seed_deck(repo: &InMemoryRepository, deck_id: DeckId, cards: u64) {
    let deck = Deck::new(deck_id, "Smoke Deck", None, "smoke", fixed_now()).unwrap();
    repo.upsert_deck(&deck).await.unwrap();

    for id in 1..=cards {
        let card = CardDraft::single_choice(deck_id, format!("Q{id}"), format!("A{id}"))
            .validate(fixed_now())
            .unwrap()
            .assign_id(CardId::new(id));
        repo.upsert_card(&card).await.unwrap();
    }
}

#[tokio::test]
async fn study_loop_runs_a_test_session_to_summary() {
    let repo = InMemoryRepository::new();
    let deck_id = DeckId::new(1);
    seed_deck(&repo, deck_id, 3).await;

    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );

    let (deck, mut session) = loop_svc
        .start_session(deck_id, StudyMode::Test)
        .await
        .unwrap();
    assert_eq!(deck.title(), "Smoke Deck");

    while !session.show_summary() {
        session.submit_answer(true);
    }

    let summary = session.summary().unwrap();
    assert_eq!(summary.stats().total_attempts(), 3);
    assert_eq!(summary.stats().overall_correct(), 3);
    assert!(summary.incorrect_card_ids().is_empty());

    assert_eq!(
        loop_svc.breakers().state("deck-load:1"),
        Some(BreakerState::Closed)
    );
}

#[tokio::test]
async fn empty_deck_fails_session_start() {
    let repo = InMemoryRepository::new();
    let deck_id = DeckId::new(2);
    seed_deck(&repo, deck_id, 0).await;

    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );

    let err = loop_svc
        .start_session(deck_id, StudyMode::Practice)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::EmptyDeck));
}

struct FailingDeckRepository;

#[async_trait]
impl DeckRepository for FailingDeckRepository {
    async fn upsert_deck(&self, _deck: &Deck) -> Result<(), StorageError> {
        Err(StorageError::Connection("down".into()))
    }

    async fn get_deck(&self, _id: DeckId) -> Result<Deck, StorageError> {
        Err(StorageError::Connection("down".into()))
    }
}

#[tokio::test]
async fn repeated_load_failures_trip_the_deck_breaker() {
    let cards = InMemoryRepository::new();
    let loop_svc = StudyLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(FailingDeckRepository),
        Arc::new(cards),
    );
    let deck_id = DeckId::new(7);

    // Every attempt still runs and still reports its own error; the breaker
    // only keeps score on the side.
    for _ in 0..8 {
        let err = loop_svc
            .start_session(deck_id, StudyMode::Test)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
    }

    assert_eq!(
        loop_svc.breakers().state("deck-load:7"),
        Some(BreakerState::Open)
    );
}
