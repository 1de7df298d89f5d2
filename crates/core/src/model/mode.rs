use serde::{Deserialize, Serialize};
use std::fmt;

/// The two ways to study a deck.
///
/// Practice loops the deck indefinitely and offers to retire mastered review
/// cards; test runs one graded pass followed by review rounds until every
/// mistake has been answered correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    Practice,
    Test,
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyMode::Practice => write!(f, "practice"),
            StudyMode::Test => write!(f, "test"),
        }
    }
}
