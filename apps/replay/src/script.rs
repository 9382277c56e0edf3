//! JSON-lines replay scripts.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use parley_events::SessionEvent;
use serde::Deserialize;

/// One scripted event at an offset from the start of the replay.
#[derive(Debug, Deserialize)]
pub struct ScriptLine {
    pub at_ms: u64,
    pub event: SessionEvent,
}

/// Read a script from `path`, or stdin when `None`.
pub fn load(path: Option<&Path>) -> anyhow::Result<Vec<ScriptLine>> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read script from stdin")?;
            text
        }
    };
    parse(&text)
}

/// Parse script text. Blank lines and `#` comments are skipped; offsets must
/// not decrease.
pub fn parse(text: &str) -> anyhow::Result<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    let mut last_at_ms = 0;

    for (index, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        let line: ScriptLine = serde_json::from_str(raw)
            .with_context(|| format!("line {}: invalid script entry", index + 1))?;
        if line.at_ms < last_at_ms {
            bail!(
                "line {}: at_ms {} goes back in time (previous {})",
                index + 1,
                line.at_ms,
                last_at_ms
            );
        }
        last_at_ms = line.at_ms;
        lines.push(line);
    }

    Ok(lines)
}
