use thiserror::Error;

use crate::model::{CardError, DeckError, StudySummaryError};

/// Crate-level error for callers that do not care which model rejected input.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Summary(#[from] StudySummaryError),
}
