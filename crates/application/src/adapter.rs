//! Boundary to the dialogue session that actually owns audio output and the
//! user turn buffer.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use parley_turn::Action;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("session unavailable")]
    Unavailable,
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Operations the arbiter issues to the dialogue session.
///
/// Calls are dispatched fire-and-forget; the arbiter never retries.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Stop agent audio output immediately and suppress any pending
    /// resume-after-false-interruption.
    async fn interrupt(&self) -> Result<(), AdapterError>;

    /// Discard the just-finalized user transcript so it neither joins the
    /// dialogue history nor triggers a reply.
    async fn clear_user_turn(&self) -> Result<(), AdapterError>;
}

pub type SessionAdapterRef = Arc<dyn SessionAdapter>;

/// Adapter that records the calls it receives.
///
/// Used by tests and by offline replay.
#[derive(Default)]
pub struct RecordingAdapter {
    calls: Mutex<Vec<Action>>,
    reject: bool,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter that records calls and then rejects them.
    pub fn rejecting() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Action>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Calls received, in the order they ran.
    pub fn calls(&self) -> Vec<Action> {
        self.lock().clone()
    }

    pub fn count(&self, action: Action) -> usize {
        self.lock().iter().filter(|a| **a == action).count()
    }

    fn record(&self, action: Action) -> Result<(), AdapterError> {
        self.lock().push(action);
        if self.reject {
            return Err(AdapterError::Rejected(action.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionAdapter for RecordingAdapter {
    async fn interrupt(&self) -> Result<(), AdapterError> {
        self.record(Action::Interrupt)
    }

    async fn clear_user_turn(&self) -> Result<(), AdapterError> {
        self.record(Action::ClearTurn)
    }
}
