use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

use crate::model::ids::{CardId, DeckId};

/// Maximum number of author-curated wrong answers a card may carry.
pub const MAX_MANUAL_DISTRACTORS: usize = 3;

//
// ─── QUESTION SHAPE ────────────────────────────────────────────────────────────
//

/// How a card is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleSelect,
}

/// The correct answer(s) of a card.
///
/// Single-choice cards carry exactly one answer string; multiple-select cards
/// carry an ordered set of answer strings, all of which must be selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerKey {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerKey {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerKey::Single(_) => QuestionKind::SingleChoice,
            AnswerKey::Multiple(_) => QuestionKind::MultipleSelect,
        }
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card needs front text or a question image")]
    MissingPrompt,

    #[error("single-choice card needs a non-blank correct answer")]
    BlankCorrectAnswer,

    #[error("multiple-select card needs at least one correct answer")]
    EmptyAnswerSet,

    #[error("multiple-select answers cannot be blank")]
    BlankAnswerInSet,

    #[error("at most {MAX_MANUAL_DISTRACTORS} manual wrong answers allowed, got {len}")]
    TooManyManualDistractors { len: usize },
}

//
// ─── CARD TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated card input from the authoring flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub deck_id: DeckId,
    pub front_text: Option<String>,
    pub question_image_url: Option<Url>,
    pub key: AnswerKey,
    pub incorrect_answers: Vec<String>,
    pub manual_incorrect_answers: Vec<String>,
}

impl CardDraft {
    /// Convenience constructor for a plain text single-choice card.
    #[must_use]
    pub fn single_choice(
        deck_id: DeckId,
        front_text: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            deck_id,
            front_text: Some(front_text.into()),
            question_image_url: None,
            key: AnswerKey::Single(correct_answer.into()),
            incorrect_answers: Vec::new(),
            manual_incorrect_answers: Vec::new(),
        }
    }

    /// Convenience constructor for a plain text multiple-select card.
    #[must_use]
    pub fn multiple_select(
        deck_id: DeckId,
        front_text: impl Into<String>,
        correct_answers: Vec<String>,
    ) -> Self {
        Self {
            deck_id,
            front_text: Some(front_text.into()),
            question_image_url: None,
            key: AnswerKey::Multiple(correct_answers),
            incorrect_answers: Vec::new(),
            manual_incorrect_answers: Vec::new(),
        }
    }

    /// Validate the draft into a card ready for an ID.
    ///
    /// Trims all text fields, drops blank distractors and duplicate
    /// multiple-select answers (first occurrence wins).
    ///
    /// # Errors
    ///
    /// Returns `CardError` when the prompt is missing, the answer key is
    /// blank/empty, or more than [`MAX_MANUAL_DISTRACTORS`] manual wrong
    /// answers are given.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedCard, CardError> {
        let front_text = self
            .front_text
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        if front_text.is_none() && self.question_image_url.is_none() {
            return Err(CardError::MissingPrompt);
        }

        let key = match self.key {
            AnswerKey::Single(answer) => {
                let answer = answer.trim().to_owned();
                if answer.is_empty() {
                    return Err(CardError::BlankCorrectAnswer);
                }
                AnswerKey::Single(answer)
            }
            AnswerKey::Multiple(answers) => {
                if answers.is_empty() {
                    return Err(CardError::EmptyAnswerSet);
                }
                let mut seen = BTreeSet::new();
                let mut cleaned = Vec::with_capacity(answers.len());
                for answer in answers {
                    let answer = answer.trim().to_owned();
                    if answer.is_empty() {
                        return Err(CardError::BlankAnswerInSet);
                    }
                    if seen.insert(answer.clone()) {
                        cleaned.push(answer);
                    }
                }
                AnswerKey::Multiple(cleaned)
            }
        };

        if self.manual_incorrect_answers.len() > MAX_MANUAL_DISTRACTORS {
            return Err(CardError::TooManyManualDistractors {
                len: self.manual_incorrect_answers.len(),
            });
        }

        Ok(ValidatedCard {
            deck_id: self.deck_id,
            front_text,
            question_image_url: self.question_image_url,
            key,
            incorrect_answers: clean_distractors(self.incorrect_answers),
            manual_incorrect_answers: clean_distractors(self.manual_incorrect_answers),
            created_at: now,
        })
    }
}

fn clean_distractors(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

/// A validated card that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCard {
    deck_id: DeckId,
    front_text: Option<String>,
    question_image_url: Option<Url>,
    key: AnswerKey,
    incorrect_answers: Vec<String>,
    manual_incorrect_answers: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ValidatedCard {
    #[must_use]
    pub fn assign_id(self, id: CardId) -> Card {
        Card {
            id,
            deck_id: self.deck_id,
            front_text: self.front_text,
            question_image_url: self.question_image_url,
            key: self.key,
            incorrect_answers: self.incorrect_answers,
            manual_incorrect_answers: self.manual_incorrect_answers,
            created_at: self.created_at,
        }
    }
}

/// A single question unit within a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    id: CardId,
    deck_id: DeckId,
    front_text: Option<String>,
    question_image_url: Option<Url>,
    key: AnswerKey,
    incorrect_answers: Vec<String>,
    manual_incorrect_answers: Vec<String>,
    created_at: DateTime<Utc>,
}

impl Card {
    /// Rehydrate a card from persisted storage.
    ///
    /// Unlike [`CardDraft::validate`], this only checks structure: a stored
    /// blank answer is representable and surfaces downstream as an
    /// unanswerable card rather than a load failure.
    ///
    /// # Errors
    ///
    /// Returns `CardError::MissingPrompt` when neither text nor image is
    /// present, or `CardError::TooManyManualDistractors` for an oversized
    /// manual distractor list.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: CardId,
        deck_id: DeckId,
        front_text: Option<String>,
        question_image_url: Option<Url>,
        key: AnswerKey,
        incorrect_answers: Vec<String>,
        manual_incorrect_answers: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        if front_text.as_deref().is_none_or(|t| t.trim().is_empty())
            && question_image_url.is_none()
        {
            return Err(CardError::MissingPrompt);
        }
        if manual_incorrect_answers.len() > MAX_MANUAL_DISTRACTORS {
            return Err(CardError::TooManyManualDistractors {
                len: manual_incorrect_answers.len(),
            });
        }

        Ok(Self {
            id,
            deck_id,
            front_text,
            question_image_url,
            key,
            incorrect_answers,
            manual_incorrect_answers,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn front_text(&self) -> Option<&str> {
        self.front_text.as_deref()
    }

    #[must_use]
    pub fn question_image_url(&self) -> Option<&Url> {
        self.question_image_url.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.key.kind()
    }

    #[must_use]
    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> &[String] {
        &self.incorrect_answers
    }

    #[must_use]
    pub fn manual_incorrect_answers(&self) -> &[String] {
        &self.manual_incorrect_answers
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Check a user's selection against this card's answer key.
    ///
    /// Single-choice: exactly one selected option matching the answer.
    /// Multiple-select: the selected set must equal the answer set exactly,
    /// no partial credit.
    #[must_use]
    pub fn is_correct_selection(&self, selected: &[&str]) -> bool {
        match &self.key {
            AnswerKey::Single(answer) => selected.len() == 1 && selected[0] == answer,
            AnswerKey::Multiple(answers) => {
                let expected: BTreeSet<&str> = answers.iter().map(String::as_str).collect();
                let chosen: BTreeSet<&str> = selected.iter().copied().collect();
                expected == chosen
            }
        }
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
    fn draft_fails_without_prompt() {
        let draft = CardDraft {
            deck_id: DeckId::new(1),
            front_text: Some("   ".into()),
            question_image_url: None,
            key: AnswerKey::Single("ok".into()),
            incorrect_answers: Vec::new(),
            manual_incorrect_answers: Vec::new(),
        };

        let err = draft.validate(fixed_now()).unwrap_err();
        assert_eq!(err, CardError::MissingPrompt);
    }

    #[test]
    fn image_only_prompt_is_accepted() {
        let draft = CardDraft {
            deck_id: DeckId::new(1),
            front_text: None,
            question_image_url: Some("https://example.com/q.png".parse().unwrap()),
            key: AnswerKey::Single("ok".into()),
            incorrect_answers: Vec::new(),
            manual_incorrect_answers: Vec::new(),
        };

        let card = draft.validate(fixed_now()).unwrap().assign_id(CardId::new(7));
        assert_eq!(card.front_text(), None);
        assert!(card.question_image_url().is_some());
    }

    #[test]
    fn draft_fails_on_blank_single_answer() {
        let draft = CardDraft::single_choice(DeckId::new(1), "Q", "  ");
        let err = draft.validate(fixed_now()).unwrap_err();
        assert_eq!(err, CardError::BlankCorrectAnswer);
    }

    #[test]
    fn draft_fails_on_empty_multi_set() {
        let draft = CardDraft::multiple_select(DeckId::new(1), "Q", Vec::new());
        let err = draft.validate(fixed_now()).unwrap_err();
        assert_eq!(err, CardError::EmptyAnswerSet);
    }

    #[test]
    fn draft_dedups_multi_answers_and_keeps_order() {
        let draft = CardDraft::multiple_select(
            DeckId::new(1),
            "Q",
            vec!["a".into(), "b ".into(), "a".into()],
        );
        let card = draft.validate(fixed_now()).unwrap().assign_id(CardId::new(1));
        assert_eq!(
            card.key(),
            &AnswerKey::Multiple(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn draft_caps_manual_distractors() {
        let mut draft = CardDraft::single_choice(DeckId::new(1), "Q", "a");
        draft.manual_incorrect_answers = vec!["w".into(); 4];
        let err = draft.validate(fixed_now()).unwrap_err();
        assert_eq!(err, CardError::TooManyManualDistractors { len: 4 });
    }

    #[test]
    fn persisted_allows_blank_answer() {
        let card = Card::from_persisted(
            CardId::new(1),
            DeckId::new(1),
            Some("Q".into()),
            None,
            AnswerKey::Single(String::new()),
            Vec::new(),
            Vec::new(),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(card.key(), &AnswerKey::Single(String::new()));
    }

    #[test]
    fn single_choice_selection_check() {
        let card = CardDraft::single_choice(DeckId::new(1), "Q", "a1")
            .validate(fixed_now())
            .unwrap()
            .assign_id(CardId::new(1));

        assert!(card.is_correct_selection(&["a1"]));
        assert!(!card.is_correct_selection(&["a2"]));
        assert!(!card.is_correct_selection(&["a1", "a2"]));
        assert!(!card.is_correct_selection(&[]));
    }

    #[test]
    fn multi_select_requires_exact_set() {
        let card =
            CardDraft::multiple_select(DeckId::new(1), "Q", vec!["a".into(), "b".into()])
                .validate(fixed_now())
                .unwrap()
                .assign_id(CardId::new(1));

        assert!(card.is_correct_selection(&["a", "b"]));
        assert!(card.is_correct_selection(&["b", "a"]));
        assert!(!card.is_correct_selection(&["a"]));
        assert!(!card.is_correct_selection(&["a", "b", "c"]));
    }
}
