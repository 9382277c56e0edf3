//! Integration tests for a session driven through its event queue.
//!
//! Time comes from a `ManualClock`, so no test sleeps.

use std::sync::Arc;
use std::time::Duration;

use parley_application::{ArbiterConfig, RecordingAdapter, Session, SessionReport};
use parley_bus::{BusError, SessionBus, SessionBusConfig, SessionBusSender};
use parley_events::{
    event_names, AgentStateChangedEvent, RecordingEventBus, MetricsCollectedEvent, SessionEvent,
    UsageMetrics, UserInputTranscribedEvent,
};
use parley_turn::{Action, AgentPhase, Clock, ManualClock};
use tokio_util::sync::CancellationToken;

struct Harness {
    clock: ManualClock,
    sender: SessionBusSender<SessionEvent>,
    adapter: Arc<RecordingAdapter>,
    events: Arc<RecordingEventBus>,
    handle: tokio::task::JoinHandle<SessionReport>,
    cancel: CancellationToken,
}

impl Harness {
    fn start(config: ArbiterConfig) -> Self {
        Self::with_bus(config, SessionBusConfig::default())
    }

    fn with_bus(config: ArbiterConfig, bus_config: SessionBusConfig) -> Self {
        let adapter = Arc::new(RecordingAdapter::new());
        let events = Arc::new(RecordingEventBus::new());
        let session = Session::new(config, adapter.clone(), events.clone());
        let mut bus = SessionBus::with_config(bus_config);
        let receiver = bus.take_receiver().expect("fresh bus has a receiver");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(session.run(receiver, cancel.clone()));

        Self {
            clock: ManualClock::new(),
            sender: bus.sender(),
            adapter,
            events,
            handle,
            cancel,
        }
    }

    fn at(&self, offset_ms: u64, event: impl Into<SessionEvent>) {
        self.clock.set_offset(Duration::from_millis(offset_ms));
        self.sender
            .send(self.clock.now(), event.into())
            .expect("queue accepts event");
    }

    /// Non-blocking send that retries on a full queue, as a producer that
    /// cannot afford to lose an event would.
    async fn at_retrying(&self, offset_ms: u64, event: impl Into<SessionEvent>) {
        self.clock.set_offset(Duration::from_millis(offset_ms));
        let mut event = event.into();
        loop {
            match self.sender.send(self.clock.now(), event) {
                Ok(()) => return,
                Err(BusError::Full(back)) => {
                    event = back;
                    tokio::task::yield_now().await;
                }
                Err(err) => panic!("session queue closed: {}", err),
            }
        }
    }

    fn agent(&self, offset_ms: u64, old: AgentPhase, new: AgentPhase) {
        self.at(offset_ms, AgentStateChangedEvent::new(old, new));
    }

    fn say(&self, offset_ms: u64, transcript: &str) {
        self.at(offset_ms, UserInputTranscribedEvent::finalized(transcript));
    }

    async fn finish(self) -> (SessionReport, Arc<RecordingAdapter>, Arc<RecordingEventBus>) {
        drop(self.sender);
        let report = self.handle.await.expect("session task");
        (report, self.adapter, self.events)
    }
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_hard_word_while_speaking_interrupts() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);
        h.say(800, "wait wait");

        let (report, adapter, _) = h.finish().await;
        assert_eq!(adapter.calls(), vec![Action::Interrupt]);
        assert_eq!(report.status.interrupts, 1);
    }

    #[tokio::test]
    async fn test_backchannel_after_speech_clears_turn() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);
        h.agent(3000, AgentPhase::Speaking, AgentPhase::Listening);
        h.say(3500, "okay yeah");

        let (report, adapter, _) = h.finish().await;
        assert_eq!(adapter.calls(), vec![Action::ClearTurn]);
        assert_eq!(report.status.clears, 1);
    }

    #[tokio::test]
    async fn test_hard_word_long_after_speech_is_noop() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);
        h.agent(3000, AgentPhase::Speaking, AgentPhase::Listening);
        h.say(8000, "stop");

        let (report, adapter, events) = h.finish().await;
        assert!(adapter.calls().is_empty());
        assert_eq!(report.status.no_ops, 1);
        let decisions = events.emitted_on(event_names::TURN_DECISION);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].payload["action"], "no_op");
        assert_eq!(decisions[0].payload["hard"], true);
    }

    #[tokio::test]
    async fn test_whitespace_transcript_dispatches_nothing() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);
        h.say(100, "  ");

        let (report, adapter, events) = h.finish().await;
        assert!(adapter.calls().is_empty());
        assert_eq!(report.status.transcripts_classified, 0);
        assert_eq!(report.status.transcripts_skipped, 1);
        assert!(events.emitted_on(event_names::TURN_DECISION).is_empty());
    }
}

// =============================================================================
// Ordering and lifecycle
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_events_are_handled_in_arrival_order() {
        let h = Harness::start(ArbiterConfig::default());
        h.say(0, "stop");
        h.agent(100, AgentPhase::Thinking, AgentPhase::Speaking);
        h.say(200, "mm");
        h.say(300, "no");
        h.agent(400, AgentPhase::Speaking, AgentPhase::Listening);
        h.say(5000, "hmm");

        let (report, adapter, events) = h.finish().await;

        let actions: Vec<String> = events
            .emitted_on(event_names::TURN_DECISION)
            .iter()
            .map(|e| e.payload["action"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(actions, ["no_op", "clear_turn", "interrupt", "no_op"]);
        assert_eq!(report.status.events_received, 6);
        assert_eq!(adapter.count(Action::ClearTurn), 1);
        assert_eq!(adapter.count(Action::Interrupt), 1);
    }

    #[tokio::test]
    async fn test_interim_results_are_ignored() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);
        h.at(100, UserInputTranscribedEvent::interim("sto"));
        h.at(200, UserInputTranscribedEvent::interim("stop"));

        let (report, adapter, _) = h.finish().await;
        assert!(adapter.calls().is_empty());
        assert_eq!(report.status.transcripts_skipped, 2);
    }

    #[tokio::test]
    async fn test_usage_summary_reported_at_end() {
        let h = Harness::start(ArbiterConfig::default());
        h.at(
            0,
            MetricsCollectedEvent {
                metrics: UsageMetrics::Llm {
                    prompt_tokens: 10,
                    completion_tokens: 4,
                    duration_ms: 250,
                },
            },
        );
        h.at(
            10,
            MetricsCollectedEvent {
                metrics: UsageMetrics::Tts {
                    characters: 80,
                    audio_duration_ms: 4000,
                },
            },
        );

        let (report, _, events) = h.finish().await;
        assert_eq!(report.usage.llm_prompt_tokens, 10);
        assert_eq!(report.usage.tts_characters, 80);
        let usage = events.emitted_on(event_names::SESSION_USAGE);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].payload["llm_completion_tokens"], 4);
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_loop() {
        let h = Harness::start(ArbiterConfig::default());
        h.cancel.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), h.handle)
            .await
            .expect("session stops after cancel")
            .expect("session task");
        assert_eq!(report.status.interrupts, 0);
    }

    #[tokio::test]
    async fn test_concurrent_producers_share_one_consumer() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);

        let now = h.clock.now();
        let mut producers = Vec::new();
        for _ in 0..4 {
            let sender = h.sender.clone();
            producers.push(tokio::spawn(async move {
                for _ in 0..10 {
                    sender
                        .send_async(now, UserInputTranscribedEvent::finalized("yeah").into())
                        .await
                        .expect("queue open");
                }
            }));
        }
        for producer in producers {
            producer.await.expect("producer task");
        }

        let (report, adapter, _) = h.finish().await;
        assert_eq!(report.status.clears, 40);
        assert_eq!(adapter.count(Action::ClearTurn), 40);
        assert_eq!(report.full_rejections, 0);
    }

    #[tokio::test]
    async fn test_custom_config_flows_through() {
        let config = ArbiterConfig::from_lookup(|key| match key {
            "INTERRUPT_WORDS" => Some("enough".to_string()),
            "OVERLAP_GRACE_SECONDS" => Some("0.5".to_string()),
            _ => None,
        })
        .expect("valid config");

        let h = Harness::start(config);
        h.agent(0, AgentPhase::Thinking, AgentPhase::Speaking);
        h.agent(1000, AgentPhase::Speaking, AgentPhase::Listening);
        h.say(1200, "enough");
        h.say(1800, "enough");

        let (_, adapter, _) = h.finish().await;
        assert_eq!(adapter.calls(), vec![Action::Interrupt]);
    }

    #[tokio::test]
    async fn test_full_queue_never_loses_a_state_transition() {
        let h = Harness::with_bus(ArbiterConfig::default(), SessionBusConfig { capacity: 8 });

        for turn in 0..50u64 {
            let base = turn * 10_000;
            h.at_retrying(base, AgentStateChangedEvent::new(AgentPhase::Thinking, AgentPhase::Speaking))
                .await;
            h.at_retrying(
                base + 1_000,
                AgentStateChangedEvent::new(AgentPhase::Speaking, AgentPhase::Listening),
            )
            .await;
            h.at_retrying(base + 5_000, UserInputTranscribedEvent::finalized("okay"))
                .await;
        }

        let (report, adapter, events) = h.finish().await;
        assert_eq!(report.status.events_received, 150);
        assert_eq!(
            report.status.no_ops, 50,
            "every backchannel lands after the agent stopped, so none overlaps"
        );
        assert!(adapter.calls().is_empty());
        assert_eq!(events.emitted_on(event_names::AGENT_STATE_CHANGED).len(), 100);
    }

    #[tokio::test]
    async fn test_observability_topics_in_handling_order() {
        let h = Harness::start(ArbiterConfig::default());
        h.agent(0, AgentPhase::Idle, AgentPhase::Thinking);
        h.agent(100, AgentPhase::Thinking, AgentPhase::Speaking);
        h.say(200, "stop");

        let (_, _, events) = h.finish().await;
        assert_eq!(
            events.topics(),
            [
                event_names::AGENT_STATE_CHANGED,
                event_names::AGENT_STATE_CHANGED,
                event_names::TURN_DECISION,
                event_names::SESSION_USAGE,
            ]
        );
    }
}
