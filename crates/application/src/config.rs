//! Arbiter configuration, resolved once per process and injected.

use std::sync::Arc;
use std::time::Duration;

use parley_turn::{TurnLexicon, DEFAULT_OVERLAP_GRACE};

/// Comma-separated soft (backchannel) word override.
pub const SOFT_WORDS_KEY: &str = "IGNORE_WORDS";

/// Comma-separated hard (interrupt) word override.
pub const HARD_WORDS_KEY: &str = "INTERRUPT_WORDS";

/// Overlap grace window in seconds.
pub const OVERLAP_GRACE_KEY: &str = "OVERLAP_GRACE_SECONDS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: {value:?} is not a number of seconds")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key}: {value} is not a finite, non-negative number of seconds")]
    OutOfRange { key: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Shared read-only word sets.
    pub lexicon: Arc<TurnLexicon>,
    /// How long after the agent stops speaking user speech still counts as overlap.
    pub overlap_grace: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            lexicon: Arc::new(TurnLexicon::default()),
            overlap_grace: DEFAULT_OVERLAP_GRACE,
        }
    }
}

impl ArbiterConfig {
    pub fn new(lexicon: TurnLexicon, overlap_grace: Duration) -> Self {
        Self {
            lexicon: Arc::new(lexicon),
            overlap_grace,
        }
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup.
    ///
    /// Word lists never fail: malformed fragments are dropped. An unparseable
    /// grace window is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lexicon = TurnLexicon::parse(
            lookup(SOFT_WORDS_KEY).as_deref(),
            lookup(HARD_WORDS_KEY).as_deref(),
        );

        let overlap_grace = match lookup(OVERLAP_GRACE_KEY) {
            Some(raw) if !raw.trim().is_empty() => parse_seconds(OVERLAP_GRACE_KEY, &raw)?,
            _ => DEFAULT_OVERLAP_GRACE,
        };

        tracing::debug!(
            soft_words = lexicon.soft.len(),
            hard_words = lexicon.hard.len(),
            overlap_grace_ms = overlap_grace.as_millis() as u64,
            "Resolved arbiter config"
        );

        Ok(Self::new(lexicon, overlap_grace))
    }

    pub fn with_overlap_grace(mut self, overlap_grace: Duration) -> Self {
        self.overlap_grace = overlap_grace;
        self
    }
}

/// Parse a float number of seconds.
pub fn parse_seconds(key: &'static str, raw: &str) -> Result<Duration> {
    let value: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })?;
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::OutOfRange { key, value })
}
