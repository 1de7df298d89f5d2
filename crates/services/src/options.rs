//! Multiple-choice option generation.
//!
//! Builds the options shown for a card from its own curated wrong answers,
//! its auto-collected wrong answers, and the correct answers of sibling
//! cards (the shared distractor pool of a deck). Output order is uniformly
//! shuffled; correctness is carried per option so the caller can grade.

use rand::rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use study_core::model::{AnswerKey, Card};

/// Option count for a single-choice card.
pub const SINGLE_CHOICE_OPTION_COUNT: usize = 4;
/// Baseline upper bound for multiple-select options; cards with more correct
/// answers than this show all of them.
pub const MULTI_SELECT_MAX_OPTIONS: usize = 5;

/// One selectable choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

/// Generate the shuffled option list for `card`.
///
/// `deck_cards` is the card's home deck; `current_pass` and `prior_pass` are
/// the session's active and previous pools, consulted for extra distractors
/// when the deck alone is too small. A single-choice card with a blank
/// correct answer yields no options at all (unanswerable card); the caller
/// decides how to surface that.
#[must_use]
pub fn generate_options(
    card: &Card,
    deck_cards: &[Card],
    current_pass: &[Card],
    prior_pass: &[Card],
) -> Vec<AnswerOption> {
    let mut options = match card.key() {
        AnswerKey::Single(answer) => {
            single_choice_options(card, answer, deck_cards, current_pass, prior_pass)
        }
        AnswerKey::Multiple(answers) => multi_select_options(card, answers, deck_cards),
    };
    options.shuffle(&mut rng());
    options
}

//
// ─── SINGLE CHOICE ─────────────────────────────────────────────────────────────
//

fn single_choice_options(
    card: &Card,
    answer: &str,
    deck_cards: &[Card],
    current_pass: &[Card],
    prior_pass: &[Card],
) -> Vec<AnswerOption> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Vec::new();
    }

    let mut options = vec![AnswerOption {
        text: answer.to_owned(),
        is_correct: true,
    }];
    let mut seen = BTreeSet::from([answer.to_owned()]);

    // Author-curated wrong answers take precedence over collected ones.
    let curated = card
        .manual_incorrect_answers()
        .iter()
        .chain(card.incorrect_answers());
    for text in curated {
        if options.len() >= SINGLE_CHOICE_OPTION_COUNT {
            break;
        }
        push_distractor(&mut options, &mut seen, text);
    }

    if options.len() < SINGLE_CHOICE_OPTION_COUNT {
        for text in sibling_answers(card, deck_cards, current_pass, prior_pass) {
            if options.len() >= SINGLE_CHOICE_OPTION_COUNT {
                break;
            }
            push_distractor(&mut options, &mut seen, &text);
        }
    }

    // Tiny decks: pad with generic placeholders.
    let mut n = 1;
    while options.len() < SINGLE_CHOICE_OPTION_COUNT {
        push_distractor(&mut options, &mut seen, &format!("Option {n}"));
        n += 1;
    }

    options
}

//
// ─── MULTIPLE SELECT ───────────────────────────────────────────────────────────
//

fn multi_select_options(card: &Card, answers: &[String], deck_cards: &[Card]) -> Vec<AnswerOption> {
    let mut options = Vec::new();
    let mut seen = BTreeSet::new();

    // Every correct answer is always shown.
    for answer in answers {
        let answer = answer.trim();
        if answer.is_empty() {
            continue;
        }
        if seen.insert(answer.to_owned()) {
            options.push(AnswerOption {
                text: answer.to_owned(),
                is_correct: true,
            });
        }
    }

    let num_correct = options.len();
    if num_correct == 0 {
        return Vec::new();
    }

    // With 4+ correct answers the question is busy enough; no distractor is
    // forced in.
    let target = if num_correct >= 4 {
        num_correct
    } else {
        (num_correct + 2).min(MULTI_SELECT_MAX_OPTIONS).max(num_correct + 1)
    };

    for text in card
        .manual_incorrect_answers()
        .iter()
        .chain(card.incorrect_answers())
    {
        if options.len() >= target {
            break;
        }
        push_distractor(&mut options, &mut seen, text);
    }

    if options.len() < 2 {
        for text in sibling_answers(card, deck_cards, &[], &[]) {
            if options.len() >= 2 {
                break;
            }
            push_distractor(&mut options, &mut seen, &text);
        }
    }

    // A lone correct option is not a question yet.
    let mut n = 1;
    while options.len() < 2 {
        push_distractor(&mut options, &mut seen, &format!("Option {n}"));
        n += 1;
    }

    let max_total = num_correct.max(MULTI_SELECT_MAX_OPTIONS);
    if options.len() > max_total {
        let mut incorrect_budget = max_total - num_correct;
        options.retain(|opt| {
            if opt.is_correct {
                true
            } else if incorrect_budget > 0 {
                incorrect_budget -= 1;
                true
            } else {
                false
            }
        });
    }

    options
}

//
// ─── SHARED HELPERS ────────────────────────────────────────────────────────────
//

fn push_distractor(options: &mut Vec<AnswerOption>, seen: &mut BTreeSet<String>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if seen.insert(text.to_owned()) {
        options.push(AnswerOption {
            text: text.to_owned(),
            is_correct: false,
        });
    }
}

/// Correct answers of every other card, deck first, then the study pools.
fn sibling_answers(
    card: &Card,
    deck_cards: &[Card],
    current_pass: &[Card],
    prior_pass: &[Card],
) -> Vec<String> {
    let mut out = Vec::new();
    for other in deck_cards.iter().chain(current_pass).chain(prior_pass) {
        if other.id() == card.id() {
            continue;
        }
        match other.key() {
            AnswerKey::Single(answer) => out.push(answer.clone()),
            AnswerKey::Multiple(answers) => out.extend(answers.iter().cloned()),
        }
    }
    out
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
