//! Turn arbitration bound to a single session's speaking state.

use std::time::Instant;

use parley_events::{AgentStateChangedEvent, UserInputTranscribedEvent};
use parley_turn::{classify, decide, Action, Classification, SpeakingState};

use crate::config::ArbiterConfig;

/// Classification and the action it resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub classification: Classification,
    pub action: Action,
}

/// Owns the speaking state for one session and applies the policy to
/// finalized transcripts.
///
/// Not internally synchronized: the session runner guarantees one event at a
/// time.
#[derive(Debug, Clone)]
pub struct TurnArbiter {
    config: ArbiterConfig,
    speaking: SpeakingState,
}

impl TurnArbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            speaking: SpeakingState::new(),
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn speaking_state(&self) -> &SpeakingState {
        &self.speaking
    }

    /// Apply an agent phase change. Returns true if the tracker recorded it.
    pub fn on_agent_state_changed(&mut self, event: &AgentStateChangedEvent, now: Instant) -> bool {
        tracing::info!(
            old_state = %event.old_state,
            new_state = %event.new_state,
            created_at = %event.created_at,
            "Agent state changed"
        );

        self.speaking
            .on_agent_state_changed(event.old_state, event.new_state, now)
    }

    /// Classify a transcript and pick an action.
    ///
    /// Interim results and empty finals yield `None`.
    pub fn on_user_input_transcribed(
        &self,
        event: &UserInputTranscribedEvent,
        now: Instant,
    ) -> Option<Decision> {
        if !event.is_final {
            return None;
        }

        let classification = classify(
            &event.transcript,
            &self.speaking,
            now,
            self.config.overlap_grace,
            &self.config.lexicon,
        )?;

        tracing::info!(
            transcript = ?event.transcript,
            is_final = event.is_final,
            overlapping = classification.overlapping,
            soft = classification.has_soft,
            hard = classification.has_hard,
            "User input transcribed"
        );

        let action = decide(&classification);
        match action {
            Action::Interrupt => {
                tracing::info!("Hard interrupt during or right after agent speech, interrupting");
            }
            Action::ClearTurn => {
                tracing::debug!("Backchannel during or right after agent speech, clearing user turn");
            }
            Action::NoOp => {
                tracing::debug!("Agent silent or far from last speech, normal handling");
            }
        }

        Some(Decision {
            classification,
            action,
        })
    }
}
