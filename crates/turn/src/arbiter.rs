//! Decision policy mapping a classification to a session action.

use serde::{Deserialize, Serialize};

use crate::classifier::Classification;

/// Action issued to the dialogue session for one finalized transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Stop agent audio output immediately.
    Interrupt,
    /// Discard the just-finalized user turn as a backchannel.
    ClearTurn,
    /// Handle the utterance as a normal turn.
    NoOp,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Interrupt => "interrupt",
            Action::ClearTurn => "clear_turn",
            Action::NoOp => "no_op",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Resolve the action for a classification.
///
/// Priority:
/// 1. Interrupt (overlapping and a hard word)
/// 2. ClearTurn (overlapping and only soft words)
/// 3. NoOp (everything else, including any speech outside the overlap window)
pub fn decide(result: &Classification) -> Action {
    if result.overlapping && result.has_hard {
        return Action::Interrupt;
    }

    if result.overlapping && result.has_soft {
        return Action::ClearTurn;
    }

    Action::NoOp
}
