//! Fire-and-forget dispatch of arbiter actions to the session adapter.

use std::sync::Arc;

use parley_bus::DispatchStatus;
use parley_turn::Action;
use tokio_util::task::TaskTracker;

use crate::adapter::SessionAdapterRef;

/// Issues adapter calls without blocking the event loop.
///
/// Every call runs on its own task so a slow adapter cannot stall the next
/// transcript. Failures are logged and counted, never retried.
pub struct ActionDispatcher {
    adapter: SessionAdapterRef,
    status: Arc<DispatchStatus>,
    tasks: TaskTracker,
}

impl ActionDispatcher {
    pub fn new(adapter: SessionAdapterRef, status: Arc<DispatchStatus>) -> Self {
        Self {
            adapter,
            status,
            tasks: TaskTracker::new(),
        }
    }

    /// Dispatch an action. Must be called from within a tokio runtime unless
    /// the action is `NoOp`.
    pub fn dispatch(&self, action: Action) {
        match action {
            Action::Interrupt => self.status.record_interrupt(),
            Action::ClearTurn => self.status.record_clear(),
            Action::NoOp => {
                self.status.record_no_op();
                return;
            }
        }

        let adapter = Arc::clone(&self.adapter);
        let status = Arc::clone(&self.status);

        self.tasks.spawn(async move {
            let result = match action {
                Action::Interrupt => adapter.interrupt().await,
                Action::ClearTurn => adapter.clear_user_turn().await,
                Action::NoOp => Ok(()),
            };

            if let Err(e) = result {
                status.record_adapter_failure();
                tracing::warn!(action = %action, error = %e, "Session adapter call failed");
            }
        });
    }

    /// Adapter calls still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting work and wait for in-flight calls to finish.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}
