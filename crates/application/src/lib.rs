//! Session wiring for turn arbitration.
//!
//! Binds the pure `parley-turn` core to a dialogue session:
//! - `ArbiterConfig`: word lists and grace window, resolved once
//! - `TurnArbiter`: per-session speaking state plus the decision policy
//! - `Session`: handler registry and the serialized event loop
//! - `ActionDispatcher`: fire-and-forget calls into the `SessionAdapter`
//! - `UsageCollector`: backend usage totals reported at session end

mod adapter;
mod arbiter;
mod config;
mod dispatch;
mod registry;
mod session;
mod usage;

pub use adapter::{AdapterError, RecordingAdapter, SessionAdapter, SessionAdapterRef};
pub use arbiter::{Decision, TurnArbiter};
pub use config::{
    parse_seconds, ArbiterConfig, ConfigError, HARD_WORDS_KEY, OVERLAP_GRACE_KEY, SOFT_WORDS_KEY,
};
pub use dispatch::ActionDispatcher;
pub use registry::{Handler, HandlerRegistry};
pub use session::{default_registry, Session, SessionContext, SessionReport};
pub use usage::{UsageCollector, UsageSummary};
