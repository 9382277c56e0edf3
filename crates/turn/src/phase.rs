use serde::{Deserialize, Serialize};

/// Lifecycle phase reported by the dialogue session for the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    Initializing,
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
}

impl AgentPhase {
    pub fn label(&self) -> &'static str {
        match self {
            AgentPhase::Initializing => "initializing",
            AgentPhase::Idle => "idle",
            AgentPhase::Listening => "listening",
            AgentPhase::Thinking => "thinking",
            AgentPhase::Speaking => "speaking",
        }
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, AgentPhase::Speaking)
    }
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
