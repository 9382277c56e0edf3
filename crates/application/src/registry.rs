//! Event kind to handler routing.

use std::collections::HashMap;
use std::time::Instant;

use parley_events::{EventKind, SessionEvent};

use crate::session::SessionContext;

/// Callback invoked for an event, with the session state passed explicitly.
pub type Handler = Box<dyn Fn(&mut SessionContext, &SessionEvent, Instant) + Send + Sync>;

/// Ordered handler lists keyed by event kind.
///
/// Handlers for one kind run in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `kind`.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: Fn(&mut SessionContext, &SessionEvent, Instant) + Send + Sync + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
        self
    }

    pub fn handlers_for(&self, kind: EventKind) -> &[Handler] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&EventKind, usize> =
            self.handlers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &counts)
            .finish()
    }
}
