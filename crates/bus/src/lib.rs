//! Ordered event queue for one dialogue session.
//!
//! Events from independent producers (agent state, transcription, metrics)
//! are funnelled into a single queue so that exactly one consumer handles
//! them, one at a time, in arrival order. Nothing is dropped: a full queue
//! hands the event back to the producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Default queue capacity in events.
pub const DEFAULT_CAPACITY: usize = 256;

/// Minimum queue capacity.
pub const MIN_CAPACITY: usize = 8;

/// A rejected send. The event is returned so the producer can retry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BusError<E> {
    #[error("session queue full")]
    Full(E),
    #[error("session queue closed")]
    Closed(E),
}

impl<E> BusError<E> {
    pub fn is_full(&self) -> bool {
        matches!(self, BusError::Full(_))
    }

    /// Take back the event that was not queued.
    pub fn into_event(self) -> E {
        match self {
            BusError::Full(event) | BusError::Closed(event) => event,
        }
    }
}

pub type Result<T, E> = std::result::Result<T, BusError<E>>;

/// Event as handed to the consumer.
#[derive(Debug, Clone)]
pub struct Envelope<E> {
    /// Position in handling order, starting at 0.
    pub seq: u64,
    /// Monotonic instant the event reached the session.
    pub received_at: Instant,
    pub event: E,
}

struct Queued<E> {
    received_at: Instant,
    event: E,
}

/// Configuration for the session bus.
#[derive(Debug, Clone)]
pub struct SessionBusConfig {
    /// Maximum number of queued events.
    pub capacity: usize,
}

impl Default for SessionBusConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SessionBusConfig {
    fn channel_capacity(&self) -> usize {
        self.capacity.max(MIN_CAPACITY)
    }
}

/// Sender half of the session bus.
pub struct SessionBusSender<E> {
    tx: mpsc::Sender<Queued<E>>,
    full_rejections: Arc<AtomicU64>,
}

impl<E> Clone for SessionBusSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            full_rejections: Arc::clone(&self.full_rejections),
        }
    }
}

impl<E> SessionBusSender<E> {
    /// Queue an event without waiting.
    ///
    /// A full queue returns the event in `BusError::Full`; it is never
    /// silently discarded.
    pub fn send(&self, received_at: Instant, event: E) -> Result<(), E> {
        match self.tx.try_send(Queued { received_at, event }) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(queued)) => {
                let rejections = self.full_rejections.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(rejections, "Session queue full, event handed back to producer");
                Err(BusError::Full(queued.event))
            }
            Err(mpsc::error::TrySendError::Closed(queued)) => {
                tracing::debug!("Session queue closed");
                Err(BusError::Closed(queued.event))
            }
        }
    }

    /// Queue an event, waiting until space is available.
    pub async fn send_async(&self, received_at: Instant, event: E) -> Result<(), E> {
        self.tx
            .send(Queued { received_at, event })
            .await
            .map_err(|mpsc::error::SendError(queued)| {
                tracing::debug!("Session queue closed");
                BusError::Closed(queued.event)
            })
    }

    /// Non-blocking sends refused because the queue was full.
    pub fn full_rejections(&self) -> u64 {
        self.full_rejections.load(Ordering::Relaxed)
    }
}

/// Receiver half of the session bus. There is exactly one per session.
pub struct SessionBusReceiver<E> {
    rx: mpsc::Receiver<Queued<E>>,
    received: u64,
    full_rejections: Arc<AtomicU64>,
}

impl<E> SessionBusReceiver<E> {
    /// Receive the next event. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Envelope<E>> {
        let queued = self.rx.recv().await?;
        let seq = self.received;
        self.received += 1;
        Some(Envelope {
            seq,
            received_at: queued.received_at,
            event: queued.event,
        })
    }

    /// Events received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Non-blocking sends refused because the queue was full, across all
    /// senders.
    pub fn full_rejections(&self) -> u64 {
        self.full_rejections.load(Ordering::Relaxed)
    }
}

/// Create a connected sender/receiver pair.
///
/// The receiver sees end-of-stream once every sender clone is dropped.
pub fn channel<E>(config: SessionBusConfig) -> (SessionBusSender<E>, SessionBusReceiver<E>) {
    let capacity = config.channel_capacity();
    let (tx, rx) = mpsc::channel(capacity);
    let full_rejections = Arc::new(AtomicU64::new(0));

    tracing::debug!(capacity, "Created session bus");

    let sender = SessionBusSender {
        tx,
        full_rejections: Arc::clone(&full_rejections),
    };
    let receiver = SessionBusReceiver {
        rx,
        received: 0,
        full_rejections,
    };
    (sender, receiver)
}

/// Per-session event queue.
pub struct SessionBus<E> {
    sender: SessionBusSender<E>,
    receiver: Option<SessionBusReceiver<E>>,
}

impl<E> SessionBus<E> {
    pub fn new() -> Self {
        Self::with_config(SessionBusConfig::default())
    }

    pub fn with_config(config: SessionBusConfig) -> Self {
        let (sender, receiver) = channel(config);
        Self {
            sender,
            receiver: Some(receiver),
        }
    }

    pub fn sender(&self) -> SessionBusSender<E> {
        self.sender.clone()
    }

    /// Take the receiver (can only be called once).
    pub fn take_receiver(&mut self) -> Option<SessionBusReceiver<E>> {
        self.receiver.take()
    }
}

impl<E> Default for SessionBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters describing what a session has done, updated lock-free from the
/// dispatch path.
#[derive(Debug, Default)]
pub struct DispatchStatus {
    events_received: AtomicU64,
    transcripts_classified: AtomicU64,
    transcripts_skipped: AtomicU64,
    interrupts: AtomicU64,
    clears: AtomicU64,
    no_ops: AtomicU64,
    adapter_failures: AtomicU64,
}

impl DispatchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub fn transcripts_classified(&self) -> u64 {
        self.transcripts_classified.load(Ordering::Relaxed)
    }

    pub fn transcripts_skipped(&self) -> u64 {
        self.transcripts_skipped.load(Ordering::Relaxed)
    }

    pub fn interrupts(&self) -> u64 {
        self.interrupts.load(Ordering::Relaxed)
    }

    pub fn clears(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    pub fn no_ops(&self) -> u64 {
        self.no_ops.load(Ordering::Relaxed)
    }

    pub fn adapter_failures(&self) -> u64 {
        self.adapter_failures.load(Ordering::Relaxed)
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Interim or empty transcript that was not classified.
    pub fn record_skipped(&self) {
        self.transcripts_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interrupt(&self) {
        self.transcripts_classified.fetch_add(1, Ordering::Relaxed);
        self.interrupts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clear(&self) {
        self.transcripts_classified.fetch_add(1, Ordering::Relaxed);
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_op(&self) {
        self.transcripts_classified.fetch_add(1, Ordering::Relaxed);
        self.no_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_adapter_failure(&self) {
        self.adapter_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatusSnapshot {
        DispatchStatusSnapshot {
            events_received: self.events_received(),
            transcripts_classified: self.transcripts_classified(),
            transcripts_skipped: self.transcripts_skipped(),
            interrupts: self.interrupts(),
            clears: self.clears(),
            no_ops: self.no_ops(),
            adapter_failures: self.adapter_failures(),
        }
    }
}

/// Snapshot of dispatch status for serialization/display.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchStatusSnapshot {
    pub events_received: u64,
    pub transcripts_classified: u64,
    pub transcripts_skipped: u64,
    pub interrupts: u64,
    pub clears: u64,
    pub no_ops: u64,
    pub adapter_failures: u64,
}
