//! One dialogue session: owned state, handler routing and the serialized
//! event loop.

use std::sync::Arc;
use std::time::Instant;

use parley_bus::{DispatchStatus, DispatchStatusSnapshot, SessionBusReceiver};
use parley_events::{
    emit_to, event_names, AgentSpeakingEvent, AgentStateChangedEvent, EventBusRef, EventKind,
    MetricsCollectedEvent, SessionEvent, TurnDecisionEvent, UserInputTranscribedEvent,
};
use parley_turn::Action;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::adapter::SessionAdapterRef;
use crate::arbiter::TurnArbiter;
use crate::config::ArbiterConfig;
use crate::dispatch::ActionDispatcher;
use crate::registry::HandlerRegistry;
use crate::usage::{UsageCollector, UsageSummary};

/// State owned by a session and handed to every handler by `&mut`.
pub struct SessionContext {
    session_id: Uuid,
    arbiter: TurnArbiter,
    usage: UsageCollector,
    dispatcher: ActionDispatcher,
    status: Arc<DispatchStatus>,
    events: EventBusRef,
}

impl SessionContext {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn arbiter(&self) -> &TurnArbiter {
        &self.arbiter
    }

    pub fn status(&self) -> &DispatchStatus {
        &self.status
    }

    /// Update the speaking-state tracker and echo the transition.
    pub fn apply_agent_state(&mut self, event: &AgentStateChangedEvent, now: Instant) {
        let tracker_updated = self.arbiter.on_agent_state_changed(event, now);

        let payload = AgentSpeakingEvent {
            old_state: event.old_state,
            new_state: event.new_state,
            speaking: self.arbiter.speaking_state().is_speaking(),
            tracker_updated,
            created_at: event.created_at,
        };
        emit_to(self.events.as_ref(), event_names::AGENT_STATE_CHANGED, &payload);
    }

    /// Classify a transcript and dispatch the resulting action.
    ///
    /// Returns the action, or `None` if the transcript was not classified.
    pub fn arbitrate_transcript(
        &mut self,
        event: &UserInputTranscribedEvent,
        now: Instant,
    ) -> Option<Action> {
        let Some(decision) = self.arbiter.on_user_input_transcribed(event, now) else {
            self.status.record_skipped();
            return None;
        };

        let payload = TurnDecisionEvent::new(
            event.transcript.as_str(),
            &decision.classification,
            decision.action,
        );
        emit_to(self.events.as_ref(), event_names::TURN_DECISION, &payload);

        self.dispatcher.dispatch(decision.action);
        Some(decision.action)
    }

    pub fn collect_metrics(&mut self, event: &MetricsCollectedEvent) {
        self.usage.collect(&event.metrics);
    }
}

/// Final accounting for a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub usage: UsageSummary,
    pub status: DispatchStatusSnapshot,
    /// Non-blocking sends the queue refused while full.
    pub full_rejections: u64,
}

/// Registry wired to the tracker, the arbiter and the usage collector.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .on(EventKind::AgentStateChanged, |ctx, event, now| {
            if let SessionEvent::AgentStateChanged(ev) = event {
                ctx.apply_agent_state(ev, now);
            }
        })
        .on(EventKind::UserInputTranscribed, |ctx, event, now| {
            if let SessionEvent::UserInputTranscribed(ev) = event {
                ctx.arbitrate_transcript(ev, now);
            }
        })
        .on(EventKind::MetricsCollected, |ctx, event, _| {
            if let SessionEvent::MetricsCollected(ev) = event {
                ctx.collect_metrics(ev);
            }
        });
    registry
}

/// A dialogue session's arbitration state plus the handlers that mutate it.
pub struct Session {
    context: SessionContext,
    registry: HandlerRegistry,
}

impl Session {
    /// Session with the default handlers.
    pub fn new(config: ArbiterConfig, adapter: SessionAdapterRef, events: EventBusRef) -> Self {
        Self::with_registry(config, adapter, events, default_registry())
    }

    pub fn with_registry(
        config: ArbiterConfig,
        adapter: SessionAdapterRef,
        events: EventBusRef,
        registry: HandlerRegistry,
    ) -> Self {
        let status = Arc::new(DispatchStatus::new());
        Self {
            context: SessionContext {
                session_id: Uuid::new_v4(),
                arbiter: TurnArbiter::new(config),
                usage: UsageCollector::new(),
                dispatcher: ActionDispatcher::new(adapter, Arc::clone(&status)),
                status,
                events,
            },
            registry,
        }
    }

    pub fn id(&self) -> Uuid {
        self.context.session_id
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Shared handle to the dispatch counters.
    pub fn status(&self) -> Arc<DispatchStatus> {
        Arc::clone(&self.context.status)
    }

    /// Run every handler registered for the event's kind, in order.
    pub fn handle(&mut self, event: &SessionEvent, now: Instant) {
        self.context.status.record_event();
        for handler in self.registry.handlers_for(event.kind()) {
            handler(&mut self.context, event, now);
        }
    }

    /// Consume the session queue until it closes or `cancel` fires.
    ///
    /// This is the only consumer of the session's events, so handlers never
    /// interleave. Each event is handled with its arrival instant as `now`.
    pub async fn run(
        mut self,
        mut receiver: SessionBusReceiver<SessionEvent>,
        cancel: CancellationToken,
    ) -> SessionReport {
        let span = tracing::info_span!("session", session_id = %self.context.session_id);

        async move {
            tracing::info!(handlers = self.registry.len(), "Session started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Session cancelled");
                        break;
                    }
                    envelope = receiver.recv() => {
                        let Some(envelope) = envelope else {
                            tracing::debug!("Session queue closed");
                            break;
                        };
                        self.handle(&envelope.event, envelope.received_at);
                    }
                }
            }

            tracing::debug!(received = receiver.received(), "Session drained");
            self.finish(receiver.full_rejections()).await
        }
        .instrument(span)
        .await
    }

    /// Wait for in-flight adapter calls, then log and emit the usage summary.
    pub async fn finish(self, full_rejections: u64) -> SessionReport {
        let pending = self.context.dispatcher.in_flight();
        if pending > 0 {
            tracing::debug!(pending, "Waiting for adapter calls");
        }
        self.context.dispatcher.shutdown().await;

        let usage = self.context.usage.summary();
        tracing::info!(?usage, "Usage");
        emit_to(self.context.events.as_ref(), event_names::SESSION_USAGE, &usage);

        SessionReport {
            session_id: self.context.session_id,
            usage,
            status: self.context.status.snapshot(),
            full_rejections,
        }
    }
}
