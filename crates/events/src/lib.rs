//! Shared event contracts for a turn arbitration session.
//!
//! Inbound events are produced by the dialogue session (agent phase changes,
//! transcription results, usage metrics). Outbound events are observability
//! records emitted through the `EventBus`.

mod bus;

pub use bus::{emit_to, EmittedEvent, EventBus, EventBusRef, RecordingEventBus};

use chrono::{DateTime, Utc};
use parley_turn::{Action, AgentPhase, Classification};
use serde::{Deserialize, Serialize};

/// Discriminant used to route events to their handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AgentStateChanged,
    UserInputTranscribed,
    MetricsCollected,
}

/// Event emitted when the agent moves between lifecycle phases.
///
/// Producers: dialogue session
/// Consumers: speaking-state tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStateChangedEvent {
    pub old_state: AgentPhase,
    pub new_state: AgentPhase,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AgentStateChangedEvent {
    pub fn new(old_state: AgentPhase, new_state: AgentPhase) -> Self {
        Self {
            old_state,
            new_state,
            created_at: Utc::now(),
        }
    }
}

/// Event emitted when speech-to-text produces a (partial or final) result.
///
/// Producers: dialogue session (STT)
/// Consumers: utterance classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputTranscribedEvent {
    pub transcript: String,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl UserInputTranscribedEvent {
    pub fn finalized(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
            speaker_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            is_final: false,
            ..Self::finalized(transcript)
        }
    }
}

/// Usage reported by one of the session's backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageMetrics {
    Llm {
        prompt_tokens: u64,
        completion_tokens: u64,
        #[serde(default)]
        duration_ms: u64,
    },
    Tts {
        characters: u64,
        audio_duration_ms: u64,
    },
    Stt {
        audio_duration_ms: u64,
    },
    Eou {
        end_of_utterance_delay_ms: u64,
        #[serde(default)]
        transcription_delay_ms: u64,
    },
}

/// Event emitted when a backend reports usage.
///
/// Producers: dialogue session
/// Consumers: usage collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsCollectedEvent {
    pub metrics: UsageMetrics,
}

/// Any inbound session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    AgentStateChanged(AgentStateChangedEvent),
    UserInputTranscribed(UserInputTranscribedEvent),
    MetricsCollected(MetricsCollectedEvent),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::AgentStateChanged(_) => EventKind::AgentStateChanged,
            SessionEvent::UserInputTranscribed(_) => EventKind::UserInputTranscribed,
            SessionEvent::MetricsCollected(_) => EventKind::MetricsCollected,
        }
    }
}

impl From<AgentStateChangedEvent> for SessionEvent {
    fn from(event: AgentStateChangedEvent) -> Self {
        SessionEvent::AgentStateChanged(event)
    }
}

impl From<UserInputTranscribedEvent> for SessionEvent {
    fn from(event: UserInputTranscribedEvent) -> Self {
        SessionEvent::UserInputTranscribed(event)
    }
}

impl From<MetricsCollectedEvent> for SessionEvent {
    fn from(event: MetricsCollectedEvent) -> Self {
        SessionEvent::MetricsCollected(event)
    }
}

/// Echo of every agent phase change, after the speaking-state tracker has
/// applied it.
///
/// Producers: speaking-state tracker
/// Consumers: observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpeakingEvent {
    pub old_state: AgentPhase,
    pub new_state: AgentPhase,
    pub speaking: bool,
    /// The tracker recorded this transition (it entered or left Speaking).
    pub tracker_updated: bool,
    pub created_at: DateTime<Utc>,
}

/// Event emitted for every classified transcript.
///
/// Producers: turn arbiter
/// Consumers: observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDecisionEvent {
    pub transcript: String,
    pub overlapping: bool,
    pub soft: bool,
    pub hard: bool,
    pub action: Action,
}

impl TurnDecisionEvent {
    pub fn new(transcript: impl Into<String>, classification: &Classification, action: Action) -> Self {
        Self {
            transcript: transcript.into(),
            overlapping: classification.overlapping,
            soft: classification.has_soft,
            hard: classification.has_hard,
            action,
        }
    }
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Speaking-state transition applied.
    pub const AGENT_STATE_CHANGED: &str = "agent:state_changed";
    /// Transcript classified and action chosen.
    pub const TURN_DECISION: &str = "turn:decision";
    /// Usage summary at session end.
    pub const SESSION_USAGE: &str = "session:usage";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_state_changed_deserialize() {
        let json = r#"{"type": "agent_state_changed", "old_state": "thinking", "new_state": "speaking", "created_at": "2025-01-01T00:00:00Z"}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::AgentStateChanged);
        let SessionEvent::AgentStateChanged(ev) = event else {
            panic!("wrong variant");
        };
        assert_eq!(ev.old_state, AgentPhase::Thinking);
        assert_eq!(ev.new_state, AgentPhase::Speaking);
        assert_eq!(ev.created_at.timestamp(), 1_735_689_600);
    }

    #[test]
    fn test_transcript_deserialize_minimal() {
        let json = r#"{"type": "user_input_transcribed", "transcript": "okay", "is_final": true}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        let SessionEvent::UserInputTranscribed(ev) = event else {
            panic!("wrong variant");
        };
        assert_eq!(ev.transcript, "okay");
        assert!(ev.is_final);
        assert_eq!(ev.speaker_id, None);
    }

    #[test]
    fn test_metrics_deserialize() {
        let json = r#"{"type": "metrics_collected", "metrics": {"kind": "llm", "prompt_tokens": 12, "completion_tokens": 30}}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            SessionEvent::MetricsCollected(MetricsCollectedEvent {
                metrics: UsageMetrics::Llm {
                    prompt_tokens: 12,
                    completion_tokens: 30,
                    duration_ms: 0,
                },
            })
        );
    }

    #[test]
    fn test_interim_constructor() {
        let event = UserInputTranscribedEvent::interim("hel");
        assert!(!event.is_final);
        assert_eq!(event.transcript, "hel");
    }

    #[test]
    fn test_decision_event_serialization() {
        let classification = Classification {
            has_soft: true,
            has_hard: false,
            overlapping: true,
        };
        let event = TurnDecisionEvent::new("okay yeah", &classification, Action::ClearTurn);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"action\":\"clear_turn\""));
        assert!(json.contains("\"soft\":true"));
    }
}
