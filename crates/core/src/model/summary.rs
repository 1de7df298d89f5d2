use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CardId, StudyMode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySummaryError {
    #[error("overall correct ({overall}) exceeds total attempts ({total})")]
    OverallExceedsTotal { overall: u32, total: u32 },

    #[error("initial correct ({initial}) exceeds overall correct ({overall})")]
    InitialExceedsOverall { initial: u32, overall: u32 },
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Lifetime counters for a study session.
///
/// `initial_correct` only counts first-pass, first-cycle answers, so it
/// measures how well the user knew the deck before any repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudyStats {
    initial_correct: u32,
    overall_correct: u32,
    total_attempts: u32,
}

impl StudyStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate stats from persisted counters.
    ///
    /// # Errors
    ///
    /// Returns `StudySummaryError` if the counters are inconsistent.
    pub fn from_persisted(
        initial_correct: u32,
        overall_correct: u32,
        total_attempts: u32,
    ) -> Result<Self, StudySummaryError> {
        if overall_correct > total_attempts {
            return Err(StudySummaryError::OverallExceedsTotal {
                overall: overall_correct,
                total: total_attempts,
            });
        }
        if initial_correct > overall_correct {
            return Err(StudySummaryError::InitialExceedsOverall {
                initial: initial_correct,
                overall: overall_correct,
            });
        }

        Ok(Self {
            initial_correct,
            overall_correct,
            total_attempts,
        })
    }

    /// Record one answered card.
    pub fn record(&mut self, is_correct: bool, counts_as_initial: bool) {
        self.total_attempts = self.total_attempts.saturating_add(1);
        if is_correct {
            self.overall_correct = self.overall_correct.saturating_add(1);
            if counts_as_initial {
                self.initial_correct = self.initial_correct.saturating_add(1);
            }
        }
    }

    #[must_use]
    pub fn initial_correct(&self) -> u32 {
        self.initial_correct
    }

    #[must_use]
    pub fn overall_correct(&self) -> u32 {
        self.overall_correct
    }

    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// Fraction of all attempts answered correctly, `None` before any attempt.
    #[must_use]
    pub fn overall_accuracy(&self) -> Option<f64> {
        (self.total_attempts > 0)
            .then(|| f64::from(self.overall_correct) / f64::from(self.total_attempts))
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Results view of a finished (or paused) session.
///
/// This is the only session data meaningful outside the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySummary {
    mode: StudyMode,
    stats: StudyStats,
    incorrect_card_ids: Vec<CardId>,
}

impl StudySummary {
    /// Build a summary from session state.
    ///
    /// # Errors
    ///
    /// Returns `StudySummaryError` if the stats counters are inconsistent.
    pub fn new(
        mode: StudyMode,
        stats: StudyStats,
        incorrect_card_ids: Vec<CardId>,
    ) -> Result<Self, StudySummaryError> {
        // Re-check the counter invariants so a summary is valid by construction
        // even when built from rehydrated state.
        StudyStats::from_persisted(
            stats.initial_correct,
            stats.overall_correct,
            stats.total_attempts,
        )?;

        Ok(Self {
            mode,
            stats,
            incorrect_card_ids,
        })
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn stats(&self) -> StudyStats {
        self.stats
    }

    #[must_use]
    pub fn incorrect_card_ids(&self) -> &[CardId] {
        &self.incorrect_card_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tracks_counters() {
        let mut stats = StudyStats::new();
        stats.record(true, true);
        stats.record(false, false);
        stats.record(true, false);

        assert_eq!(stats.total_attempts(), 3);
        assert_eq!(stats.overall_correct(), 2);
        assert_eq!(stats.initial_correct(), 1);
    }

    #[test]
    fn accuracy_is_none_before_attempts() {
        assert_eq!(StudyStats::new().overall_accuracy(), None);
    }

    #[test]
    fn accuracy_is_fraction_of_attempts() {
        let stats = StudyStats::from_persisted(1, 3, 4).unwrap();
        let acc = stats.overall_accuracy().unwrap();
        assert!((acc - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn from_persisted_rejects_inconsistent_counters() {
        let err = StudyStats::from_persisted(0, 5, 3).unwrap_err();
        assert_eq!(
            err,
            StudySummaryError::OverallExceedsTotal {
                overall: 5,
                total: 3
            }
        );

        let err = StudyStats::from_persisted(4, 2, 6).unwrap_err();
        assert_eq!(
            err,
            StudySummaryError::InitialExceedsOverall {
                initial: 4,
                overall: 2
            }
        );
    }

    #[test]
    fn summary_carries_incorrect_cards() {
        let stats = StudyStats::from_persisted(1, 3, 5).unwrap();
        let summary = StudySummary::new(
            StudyMode::Test,
            stats,
            vec![CardId::new(1), CardId::new(3)],
        )
        .unwrap();

        assert_eq!(summary.mode(), StudyMode::Test);
        assert_eq!(summary.stats().overall_correct(), 3);
        assert_eq!(summary.incorrect_card_ids().len(), 2);
    }
}
