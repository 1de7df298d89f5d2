use serde::{Deserialize, Serialize};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Size of the full shuffled deck.
    pub total_cards: usize,
    /// Size of the pool currently being studied (main or review).
    pub pool_size: usize,
    /// Index of the current card within the active pool.
    pub position: usize,
    /// Full passes completed plus one.
    pub cycle: u32,
    /// Whether the session is iterating the review pool.
    pub in_review: bool,
    /// Whether the session has reached its summary display state.
    pub is_complete: bool,
}
