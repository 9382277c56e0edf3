//! Real-time turn arbitration for a spoken-dialogue agent.
//!
//! Decides, for each finalized user transcript, whether the agent should be
//! interrupted, the utterance discarded as a backchannel, or the utterance
//! handled as a normal turn.
//!
//! Pure domain logic - no I/O, no async runtime. The session wiring lives in
//! `parley-application`.

mod arbiter;
mod classifier;
mod clock;
mod lexicon;
mod phase;
mod speaking;

pub use arbiter::{decide, Action};
pub use classifier::{classify, tokenize, Classification, TRIM_CHARS};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use lexicon::{Lexicon, TurnLexicon, DEFAULT_HARD_WORDS, DEFAULT_SOFT_WORDS};
pub use phase::AgentPhase;
pub use speaking::SpeakingState;

use std::time::Duration;

/// Default overlap grace window after the agent stops speaking.
pub const DEFAULT_OVERLAP_GRACE: Duration = Duration::from_secs(2);
