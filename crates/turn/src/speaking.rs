//! Agent speaking-state tracking.

use std::time::{Duration, Instant};

use crate::phase::AgentPhase;

/// Whether the agent is speaking, and when it last started and stopped.
///
/// Mutated only by agent phase transitions. `None` timestamps mean the agent
/// has not spoken yet in this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeakingState {
    is_speaking: bool,
    last_speech_started_at: Option<Instant>,
    last_speech_ended_at: Option<Instant>,
}

impl SpeakingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn last_speech_started_at(&self) -> Option<Instant> {
        self.last_speech_started_at
    }

    pub fn last_speech_ended_at(&self) -> Option<Instant> {
        self.last_speech_ended_at
    }

    /// Apply an agent phase transition observed at `now`.
    ///
    /// Returns true if a speaking field changed.
    pub fn on_agent_state_changed(&mut self, old: AgentPhase, new: AgentPhase, now: Instant) -> bool {
        if new.is_speaking() {
            self.is_speaking = true;
            self.last_speech_started_at = Some(now);
            true
        } else if old.is_speaking() {
            self.is_speaking = false;
            self.last_speech_ended_at = Some(now);
            true
        } else {
            false
        }
    }

    /// Time since the agent last stopped speaking, if it ever has.
    ///
    /// Saturates at zero when `now` precedes the recorded end.
    pub fn since_speech_ended(&self, now: Instant) -> Option<Duration> {
        self.last_speech_ended_at
            .map(|ended| now.saturating_duration_since(ended))
    }

    /// The agent is speaking, or stopped less than `grace` ago.
    pub fn is_overlapping(&self, now: Instant, grace: Duration) -> bool {
        if self.is_speaking {
            return true;
        }
        self.since_speech_ended(now)
            .map(|elapsed| elapsed < grace)
            .unwrap_or(false)
    }
}
