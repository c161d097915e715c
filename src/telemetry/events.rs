use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) const TARGET: &str = "telemetry::utterance";
pub(crate) const EVENT_UTTERANCE: &str = "utterance_finished";

/// How a speak job ended on the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtteranceOutcome {
    /// Every block spoken; done is reported by the sink.
    Completed,
    Cancelled,
    StartRejected,
    /// A segment failed mid-drain; the rest of the utterance was dropped.
    SegmentFailed,
    /// The sink refused a marker unit.
    SinkFault,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtteranceSummary {
    pub utterance: u64,
    pub blocks: usize,
    pub segments: u32,
    pub chunks: u64,
    pub audio_bytes: u64,
    pub markers_scheduled: usize,
    pub fallback_attempts: u32,
    pub outcome: UtteranceOutcome,
    pub elapsed_ms: u64,
}

pub fn record_utterance(summary: &UtteranceSummary) {
    match serde_json::to_string(summary) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_UTTERANCE,
            utterance = summary.utterance,
            outcome = ?summary.outcome,
            audio_bytes = summary.audio_bytes,
            elapsed_ms = summary.elapsed_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_UTTERANCE,
            %err,
            "failed to encode utterance summary"
        ),
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
