//! Soft (backchannel) and hard (stop command) word sets.

use std::collections::HashSet;

/// Built-in backchannel acknowledgements.
pub const DEFAULT_SOFT_WORDS: &[&str] = &[
    "yeah", "ya", "ok", "okay", "hmm", "uh-huh", "uh", "mm", "right", "sure",
];

/// Built-in explicit interrupt commands.
pub const DEFAULT_HARD_WORDS: &[&str] = &[
    "stop", "wait", "hold", "holdon", "hold-on", "pause", "cancel", "no",
];

/// Immutable set of normalized words.
///
/// Every entry is trimmed, lower-cased and non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    words: HashSet<String>,
}

impl Lexicon {
    /// Build a lexicon from a raw comma-separated override.
    ///
    /// An absent or empty override falls back to `default`. Fragments that are
    /// empty after trimming are dropped rather than rejected.
    pub fn parse(raw: Option<&str>, default: &[&str]) -> Self {
        match raw {
            Some(raw) if !raw.is_empty() => Self::from_words(raw.split(',')),
            _ => Self::from_words(default.iter().copied()),
        }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Case-insensitive exact token match.
    pub fn contains(&self, token: &str) -> bool {
        if self.words.contains(token) {
            return true;
        }
        let lowered = token.trim().to_lowercase();
        self.words.contains(&lowered)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// The pair of lexicons consulted by the classifier.
///
/// Built once at start-up and shared read-only across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnLexicon {
    pub soft: Lexicon,
    pub hard: Lexicon,
}

impl Default for TurnLexicon {
    fn default() -> Self {
        Self::parse(None, None)
    }
}

impl TurnLexicon {
    pub fn new(soft: Lexicon, hard: Lexicon) -> Self {
        Self { soft, hard }
    }

    /// Build both lexicons from their raw overrides, independently.
    pub fn parse(soft_raw: Option<&str>, hard_raw: Option<&str>) -> Self {
        Self {
            soft: Lexicon::parse(soft_raw, DEFAULT_SOFT_WORDS),
            hard: Lexicon::parse(hard_raw, DEFAULT_HARD_WORDS),
        }
    }
}
