//! Utterance classification against the lexicons and speaking state.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::lexicon::TurnLexicon;
use crate::speaking::SpeakingState;

/// Punctuation stripped from both ends of every token.
pub const TRIM_CHARS: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Outcome of classifying one finalized transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub has_soft: bool,
    pub has_hard: bool,
    pub overlapping: bool,
}

/// Split a normalized transcript into its distinct tokens.
///
/// Repeated words collapse into one entry.
pub fn tokenize(text: &str) -> BTreeSet<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(TRIM_CHARS))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Classify a finalized transcript.
///
/// Returns `None` when the transcript is empty or whitespace-only; the caller
/// takes no action in that case.
pub fn classify(
    transcript: &str,
    state: &SpeakingState,
    now: Instant,
    overlap_grace: Duration,
    lexicon: &TurnLexicon,
) -> Option<Classification> {
    let text = transcript.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let tokens = tokenize(&text);
    let has_soft = tokens.iter().any(|t| lexicon.soft.contains(t));
    let has_hard = tokens.iter().any(|t| lexicon.hard.contains(t));

    Some(Classification {
        has_soft,
        has_hard,
        overlapping: state.is_overlapping(now, overlap_grace),
    })
}
