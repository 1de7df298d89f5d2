use rand::rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use study_core::model::{Card, CardId, StudyMode, StudyStats, StudySummary};

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Consecutive correct review answers before practice mode offers to retire
/// a card.
pub const DEFAULT_REMOVAL_STREAK: u32 = 3;

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for practice-mode review behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeSettings {
    removal_streak_threshold: u32,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            removal_streak_threshold: DEFAULT_REMOVAL_STREAK,
        }
    }
}

impl PracticeSettings {
    /// Creates custom practice settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidRemovalStreak` if the threshold is zero.
    pub fn new(removal_streak_threshold: u32) -> Result<Self, SessionError> {
        if removal_streak_threshold == 0 {
            return Err(SessionError::InvalidRemovalStreak);
        }
        Ok(Self {
            removal_streak_threshold,
        })
    }

    #[must_use]
    pub fn removal_streak_threshold(&self) -> u32 {
        self.removal_streak_threshold
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory study session over a fixed deck snapshot.
///
/// Every transition is total: malformed input (stale index, empty pool,
/// out-of-turn event) is clamped or ignored with a log line instead of
/// panicking, because a stale UI event must never take down a running
/// session. The one hard failure is starting on an empty deck.
pub struct StudySession {
    mode: StudyMode,
    settings: PracticeSettings,
    deck: Vec<Card>,
    main_pool: Vec<Card>,
    review_pool: Vec<Card>,
    is_review_mode: bool,
    card_index: usize,
    incorrect_cards: Vec<Card>,
    streaks: HashMap<CardId, u32>,
    thresholds: HashMap<CardId, u32>,
    pending_removal_prompt: bool,
    cycle: u32,
    stats: StudyStats,
    show_summary: bool,
}

impl StudySession {
    /// Start a session over `cards` with default settings.
    ///
    /// The main pool is a fresh uniform shuffle of the deck (Fisher–Yates via
    /// `rand`), captured once for the session's lifetime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` if no cards are provided.
    pub fn start(cards: Vec<Card>, mode: StudyMode) -> Result<Self, SessionError> {
        Self::with_settings(cards, mode, PracticeSettings::default())
    }

    /// Start a session with explicit practice settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` if no cards are provided.
    pub fn with_settings(
        cards: Vec<Card>,
        mode: StudyMode,
        settings: PracticeSettings,
    ) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(SessionError::EmptyDeck);
        }

        let mut main_pool = cards.clone();
        main_pool.shuffle(&mut rng());

        Ok(Self {
            mode,
            settings,
            deck: cards,
            main_pool,
            review_pool: Vec::new(),
            is_review_mode: false,
            card_index: 0,
            incorrect_cards: Vec::new(),
            streaks: HashMap::new(),
            thresholds: HashMap::new(),
            pending_removal_prompt: false,
            cycle: 1,
            stats: StudyStats::new(),
            show_summary: false,
        })
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Grade the current card and advance the session.
    pub fn submit_answer(&mut self, is_correct: bool) {
        if self.pending_removal_prompt {
            warn!("answer submitted while a removal prompt is pending, ignoring");
            return;
        }
        let Some(idx) = self.clamped_index() else {
            return;
        };
        let card_id = self.active_pool()[idx].id();

        // Streaks only grow while reviewing; any wrong answer resets them.
        if is_correct {
            if self.is_review_mode {
                *self.streaks.entry(card_id).or_insert(0) += 1;
            }
        } else {
            self.streaks.insert(card_id, 0);
        }

        if !is_correct {
            self.remember_incorrect(idx);
            if self.is_review_mode && self.mode == StudyMode::Practice {
                self.ensure_in_review_pool(idx);
            }
        }

        // Practice review: once the streak meets the card's threshold, stop
        // and ask the user whether to retire it. The caller must resolve the
        // prompt before anything else happens; this answer is not counted.
        if is_correct && self.is_review_mode && self.mode == StudyMode::Practice {
            let streak = self.streaks.get(&card_id).copied().unwrap_or(0);
            let threshold = self
                .thresholds
                .get(&card_id)
                .copied()
                .unwrap_or(self.settings.removal_streak_threshold);
            if streak >= threshold {
                self.pending_removal_prompt = true;
                return;
            }
        }

        let counts_as_initial = !self.is_review_mode && self.cycle == 1;
        self.stats.record(is_correct, counts_as_initial);

        // Test review retires a card the moment it is answered correctly.
        let removed_current =
            if is_correct && self.is_review_mode && self.mode == StudyMode::Test {
                self.review_pool.remove(idx);
                true
            } else {
                false
            };

        self.advance(idx, removed_current);
    }

    /// Manually enter review mode over everything answered wrong so far.
    ///
    /// No-op when there is nothing to review.
    pub fn request_review(&mut self) {
        if self.incorrect_cards.is_empty() {
            return;
        }
        self.enter_review();
        self.show_summary = false;
    }

    /// Answer the pending removal prompt.
    ///
    /// Removing drops the card from the review pool and forgets its raised
    /// threshold; declining keeps the card and raises the threshold by one so
    /// the next offer needs one more consecutive correct answer.
    pub fn resolve_removal_prompt(&mut self, should_remove: bool) {
        if !self.pending_removal_prompt {
            warn!("no removal prompt pending, ignoring");
            return;
        }
        self.pending_removal_prompt = false;

        // Prompts only fire while reviewing, so clamp against the review pool
        // even if a stray event arrives in another state.
        if self.review_pool.is_empty() {
            return;
        }
        let idx = self.card_index.min(self.review_pool.len() - 1);
        let card_id = self.review_pool[idx].id();

        if should_remove {
            self.review_pool.remove(idx);
            self.thresholds.remove(&card_id);
            self.streaks.remove(&card_id);

            if self.review_pool.is_empty() {
                self.finish_review();
                return;
            }
            self.card_index = if idx >= self.review_pool.len() { 0 } else { idx };
        } else {
            let threshold = self
                .thresholds
                .entry(card_id)
                .or_insert(self.settings.removal_streak_threshold);
            *threshold += 1;
            self.card_index = (idx + 1) % self.review_pool.len();
        }
    }

    /// Show the summary screen without touching any pool.
    pub fn end_session(&mut self) {
        self.show_summary = true;
    }

    /// Leave the summary screen and resume where the session stood.
    pub fn continue_session(&mut self) {
        self.show_summary = false;
    }

    /// Throw everything away and reshuffle the original deck.
    pub fn restart(&mut self) {
        self.main_pool = self.deck.clone();
        self.main_pool.shuffle(&mut rng());
        self.review_pool.clear();
        self.incorrect_cards.clear();
        self.streaks.clear();
        self.thresholds.clear();
        self.pending_removal_prompt = false;
        self.is_review_mode = false;
        self.card_index = 0;
        self.cycle = 1;
        self.stats = StudyStats::new();
        self.show_summary = false;
    }

    //
    // ─── READ API ──────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    #[must_use]
    pub fn is_review_mode(&self) -> bool {
        self.is_review_mode
    }

    #[must_use]
    pub fn pending_removal_prompt(&self) -> bool {
        self.pending_removal_prompt
    }

    #[must_use]
    pub fn show_summary(&self) -> bool {
        self.show_summary
    }

    #[must_use]
    pub fn stats(&self) -> StudyStats {
        self.stats
    }

    #[must_use]
    pub fn main_pool(&self) -> &[Card] {
        &self.main_pool
    }

    #[must_use]
    pub fn review_pool(&self) -> &[Card] {
        &self.review_pool
    }

    #[must_use]
    pub fn incorrect_cards(&self) -> &[Card] {
        &self.incorrect_cards
    }

    /// The card the user is looking at, if any pool is non-empty.
    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        let pool = self.active_pool();
        if pool.is_empty() {
            None
        } else {
            Some(&pool[self.card_index.min(pool.len() - 1)])
        }
    }

    /// Aggregated progress view for rendering.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total_cards: self.main_pool.len(),
            pool_size: self.active_pool().len(),
            position: self.card_index,
            cycle: self.cycle,
            in_review: self.is_review_mode,
            is_complete: self.show_summary,
        }
    }

    /// Results view for the summary screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the stats counters are inconsistent
    /// (cannot happen for counters recorded by this session).
    pub fn summary(&self) -> Result<StudySummary, SessionError> {
        Ok(StudySummary::new(
            self.mode,
            self.stats,
            self.incorrect_cards.iter().map(Card::id).collect(),
        )?)
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn active_pool(&self) -> &[Card] {
        if self.is_review_mode {
            &self.review_pool
        } else {
            &self.main_pool
        }
    }

    /// Index into the active pool, clamped to its bounds.
    ///
    /// Pools mutate between render and event dispatch, so a stale index is
    /// expected occasionally; it is logged and clamped, never a panic.
    fn clamped_index(&self) -> Option<usize> {
        let len = self.active_pool().len();
        if len == 0 {
            warn!("active pool is empty, ignoring event");
            return None;
        }
        if self.card_index >= len {
            warn!(index = self.card_index, len, "stale card index clamped");
            Some(len - 1)
        } else {
            Some(self.card_index)
        }
    }

    fn remember_incorrect(&mut self, idx: usize) {
        let card = self.active_pool()[idx].clone();
        if !self.incorrect_cards.iter().any(|c| c.id() == card.id()) {
            self.incorrect_cards.push(card);
        }
    }

    fn ensure_in_review_pool(&mut self, idx: usize) {
        let card = self.active_pool()[idx].clone();
        if !self.review_pool.iter().any(|c| c.id() == card.id()) {
            self.review_pool.push(card);
        }
    }

    fn enter_review(&mut self) {
        self.is_review_mode = true;
        self.review_pool = self.incorrect_cards.clone();
        self.review_pool.shuffle(&mut rng());
        self.card_index = 0;
        self.pending_removal_prompt = false;
    }

    fn finish_review(&mut self) {
        self.show_summary = true;
        self.card_index = 0;
    }

    /// Move to the next card, applying the per-mode end-of-pool policy.
    fn advance(&mut self, idx: usize, removed_current: bool) {
        match (self.mode, self.is_review_mode) {
            // Practice loops the main pool indefinitely.
            (StudyMode::Practice, false) => {
                if idx + 1 >= self.main_pool.len() {
                    self.cycle += 1;
                    self.card_index = 0;
                } else {
                    self.card_index = idx + 1;
                }
            }
            // Practice review only shrinks via the removal prompt; keep
            // looping whatever is left.
            (StudyMode::Practice, true) => {
                if self.review_pool.is_empty() {
                    self.finish_review();
                } else {
                    self.card_index = (idx + 1) % self.review_pool.len();
                }
            }
            // Test: after the single graded pass, either finish clean or
            // drop into review over the mistakes.
            (StudyMode::Test, false) => {
                if idx + 1 >= self.main_pool.len() {
                    if self.incorrect_cards.is_empty() {
                        self.show_summary = true;
                    } else {
                        self.enter_review();
                    }
                } else {
                    self.card_index = idx + 1;
                }
            }
            // Test review: pool shrinks on correct answers; each full pass
            // over the remainder is a new cycle with a fresh shuffle.
            (StudyMode::Test, true) => {
                if self.review_pool.is_empty() {
                    self.finish_review();
                    return;
                }
                let next = if removed_current { idx } else { idx + 1 };
                if next >= self.review_pool.len() {
                    self.cycle += 1;
                    self.review_pool.shuffle(&mut rng());
                    self.card_index = 0;
                } else {
                    self.card_index = next;
                }
            }
        }
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("mode", &self.mode)
            .field("deck_len", &self.deck.len())
            .field("review_pool_len", &self.review_pool.len())
            .field("is_review_mode", &self.is_review_mode)
            .field("card_index", &self.card_index)
            .field("cycle", &self.cycle)
            .field("pending_removal_prompt", &self.pending_removal_prompt)
            .field("show_summary", &self.show_summary)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
