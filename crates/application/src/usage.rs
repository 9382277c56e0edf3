//! Aggregation of backend usage metrics over a session.

use parley_events::UsageMetrics;
use serde::Serialize;

/// Totals reported at session end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub llm_prompt_tokens: u64,
    pub llm_completion_tokens: u64,
    pub llm_duration_ms: u64,
    pub tts_characters: u64,
    pub tts_audio_duration_ms: u64,
    pub stt_audio_duration_ms: u64,
    pub eou_count: u64,
    pub eou_delay_total_ms: u64,
}

#[derive(Debug, Default)]
pub struct UsageCollector {
    summary: UsageSummary,
}

impl UsageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, metrics: &UsageMetrics) {
        tracing::debug!(?metrics, "Metrics collected");

        let s = &mut self.summary;
        match *metrics {
            UsageMetrics::Llm {
                prompt_tokens,
                completion_tokens,
                duration_ms,
            } => {
                s.llm_prompt_tokens = s.llm_prompt_tokens.saturating_add(prompt_tokens);
                s.llm_completion_tokens = s.llm_completion_tokens.saturating_add(completion_tokens);
                s.llm_duration_ms = s.llm_duration_ms.saturating_add(duration_ms);
            }
            UsageMetrics::Tts {
                characters,
                audio_duration_ms,
            } => {
                s.tts_characters = s.tts_characters.saturating_add(characters);
                s.tts_audio_duration_ms = s.tts_audio_duration_ms.saturating_add(audio_duration_ms);
            }
            UsageMetrics::Stt { audio_duration_ms } => {
                s.stt_audio_duration_ms = s.stt_audio_duration_ms.saturating_add(audio_duration_ms);
            }
            UsageMetrics::Eou {
                end_of_utterance_delay_ms,
                ..
            } => {
                s.eou_count += 1;
                s.eou_delay_total_ms = s.eou_delay_total_ms.saturating_add(end_of_utterance_delay_ms);
            }
        }
    }

    pub fn summary(&self) -> UsageSummary {
        self.summary.clone()
    }
}
