//! Replay a recorded session through the turn arbiter.
//!
//! Usage:
//!   parley-replay --script demos/barge_in.jsonl          # deterministic replay
//!   parley-replay --script demos/barge_in.jsonl --realtime
//!   cat script.jsonl | parley-replay --grace-secs 1.5
//!
//! Each script line is `{"at_ms": <offset>, "event": <session event>}`.
//! Observability events go to stdout as `topic<TAB>json`; logs go to stderr.

mod script;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use parley_application::{ArbiterConfig, RecordingAdapter, Session};
use parley_bus::{SessionBusConfig, SessionBusSender};
use parley_events::{EventBus, SessionEvent};
use parley_turn::{Action, Clock, ManualClock};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::script::ScriptLine;

#[derive(Parser, Debug)]
#[command(
    name = "parley-replay",
    version,
    about = "Replay a session event script through the turn arbiter",
    long_about = "Feeds agent-state, transcript and metrics events from a JSON-lines\n\
                  script into one arbitration session and prints every decision.\n\n\
                  Word lists come from IGNORE_WORDS / INTERRUPT_WORDS and the grace\n\
                  window from OVERLAP_GRACE_SECONDS (a .env file is honoured)."
)]
struct Args {
    /// Script to replay (reads stdin when omitted)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Override the overlap grace window, in seconds
    #[arg(long)]
    grace_secs: Option<f64>,

    /// Sleep until each event's offset instead of replaying instantly
    #[arg(long)]
    realtime: bool,

    /// Queue capacity in events
    #[arg(long, default_value_t = parley_bus::DEFAULT_CAPACITY)]
    capacity: usize,
}

/// Prints observability events to stdout.
struct StdoutEventBus;

impl EventBus for StdoutEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        println!("{}\t{}", topic, payload);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,parley=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(warning) = dotenv_warning(&dotenv) {
        tracing::warn!("{}", warning);
    }

    let args = Args::parse();

    let mut config = ArbiterConfig::from_env().context("invalid arbiter configuration")?;
    if let Some(secs) = args.grace_secs {
        let grace = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("--grace-secs {} is not a valid duration", secs))?;
        config = config.with_overlap_grace(grace);
    }

    let lines = script::load(args.script.as_deref())?;
    tracing::info!(events = lines.len(), realtime = args.realtime, "Replaying script");

    let adapter = Arc::new(RecordingAdapter::new());
    let session = Session::new(config, adapter.clone(), Arc::new(StdoutEventBus));
    let (sender, receiver) = parley_bus::channel(SessionBusConfig {
        capacity: args.capacity,
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let handle = tokio::spawn(session.run(receiver, cancel.clone()));

    tokio::select! {
        fed = feed(lines, sender, args.realtime) => fed?,
        _ = cancel.cancelled() => {}
    }

    let report = handle.await.context("session task failed")?;

    println!(
        "adapter\tinterrupt={} clear_turn={}",
        adapter.count(Action::Interrupt),
        adapter.count(Action::ClearTurn)
    );
    println!("report\t{}", serde_json::to_string(&report)?);

    Ok(())
}

/// A missing `.env` is normal; anything else (bad syntax, unreadable file)
/// deserves a warning.
fn dotenv_warning(result: &Result<PathBuf, dotenvy::Error>) -> Option<String> {
    match result {
        Err(e) if !e.not_found() => Some(format!("Failed to load .env: {}", e)),
        _ => None,
    }
}

/// Push script events into the session queue. Dropping `sender` at the end
/// closes the session.
async fn feed(
    lines: Vec<ScriptLine>,
    sender: SessionBusSender<SessionEvent>,
    realtime: bool,
) -> anyhow::Result<()> {
    if realtime {
        let start = tokio::time::Instant::now();
        for line in lines {
            tokio::time::sleep_until(start + Duration::from_millis(line.at_ms)).await;
            sender
                .send_async(Instant::now(), line.event)
                .await
                .context("session closed early")?;
        }
    } else {
        let clock = ManualClock::new();
        for line in lines {
            clock.set_offset(Duration::from_millis(line.at_ms));
            sender
                .send_async(clock.now(), line.event)
                .await
                .context("session closed early")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dotenv_is_silent() {
        let missing = Err(dotenvy::Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no .env",
        )));
        assert_eq!(dotenv_warning(&missing), None);
        assert_eq!(dotenv_warning(&Ok(PathBuf::from(".env"))), None);
    }

    #[test]
    fn test_malformed_dotenv_warns() {
        let malformed = Err(dotenvy::Error::LineParse("KEY = 'unterminated".to_string(), 6));
        let warning = dotenv_warning(&malformed).expect("parse errors are reported");
        assert!(warning.starts_with("Failed to load .env"), "{}", warning);
    }
}
