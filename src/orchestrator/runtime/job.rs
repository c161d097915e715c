use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::orchestrator::config::DriverConfig;
use crate::orchestrator::traits::{AudioSink, SpeechEngine, SpeechListener};
use crate::orchestrator::types::{Block, Intonation, MarkerId};
use crate::telemetry::events::{
    duration_to_ms, record_utterance, UtteranceOutcome, UtteranceSummary,
};
use crate::text::{ascii_fallback, safe_text, split_segments};

use super::markers::MarkerScheduler;
use super::pump::{AudioPump, SegmentOutcome};
use super::state::{CancelTicket, PlaybackState, Utterance};

/// Everything a background speak job touches, shared between the driver and
/// the tasks it queues.
pub(crate) struct SpeechRuntime {
    pub(crate) engine: Arc<dyn SpeechEngine>,
    pub(crate) sink: Arc<dyn AudioSink>,
    pub(crate) listener: Arc<dyn SpeechListener>,
    pub(crate) state: Arc<PlaybackState>,
    markers: MarkerScheduler,
    use_intonation: AtomicBool,
    max_segment_chars: usize,
    poll_interval: Duration,
}

impl SpeechRuntime {
    pub(crate) fn new(
        config: &DriverConfig,
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        listener: Arc<dyn SpeechListener>,
    ) -> Self {
        let state = Arc::new(PlaybackState::new());
        let markers = MarkerScheduler::new(
            Arc::clone(&sink),
            Arc::clone(&listener),
            Arc::clone(&state),
        );
        Self {
            engine,
            sink,
            listener,
            state,
            markers,
            use_intonation: AtomicBool::new(config.use_intonation),
            max_segment_chars: config.max_segment_chars,
            poll_interval: config.drain_poll_interval(),
        }
    }

    pub(crate) fn use_intonation(&self) -> bool {
        self.use_intonation.load(Ordering::SeqCst)
    }

    pub(crate) fn set_use_intonation(&self, enabled: bool) {
        self.use_intonation.store(enabled, Ordering::SeqCst);
    }

    /// Reports markers and done without touching the engine. Silent when a
    /// cancel arrived after the request was queued.
    pub(crate) fn notify_markers_and_done(&self, ticket: CancelTicket, ids: &[MarkerId]) {
        if !self.state.is_valid(ticket) {
            debug!(target: "speech_driver", "notification cancelled before it ran");
            return;
        }
        for &id in ids {
            self.listener.index_reached(id);
        }
        self.listener.done_speaking();
        self.state.halt();
    }

    /// Worker-side body of `speak`: pumps every block through the engine and
    /// paces itself to the sink. A job whose ticket was cancelled while it sat
    /// in the queue ends silently, like one drained from it.
    pub(crate) fn speak_blocks(&self, ticket: CancelTicket, blocks: &[Block]) {
        let started_at = Instant::now();
        let Some(utterance) = self.state.begin(ticket) else {
            debug!(target: "speech_driver", "utterance cancelled before it started");
            return;
        };
        let intonation = Intonation::from_enabled(self.use_intonation());
        let mut pump = AudioPump::new(
            self.engine.as_ref(),
            self.sink.as_ref(),
            self.state.as_ref(),
            self.poll_interval,
        );
        let mut progress = JobProgress::default();

        let outcome = self.pump_blocks(&mut pump, utterance, blocks, intonation, &mut progress);

        if outcome != UtteranceOutcome::Completed || !self.state.is_speaking() {
            debug!(
                target: "speech_driver",
                utterance = utterance.id(),
                ?outcome,
                "utterance ended early"
            );
            self.listener.done_speaking();
            self.state.halt();
            self.record(utterance, blocks.len(), &pump, &progress, outcome, started_at);
            return;
        }

        if let Err(err) = self.markers.schedule_done(utterance) {
            warn!(
                target: "speech_driver",
                %err,
                "failed to queue done marker; reporting completion directly"
            );
            self.listener.done_speaking();
            self.state.halt();
            self.record(
                utterance,
                blocks.len(),
                &pump,
                &progress,
                UtteranceOutcome::SinkFault,
                started_at,
            );
            return;
        }

        self.sink.idle();
        self.record(utterance, blocks.len(), &pump, &progress, outcome, started_at);
    }

    fn pump_blocks(
        &self,
        pump: &mut AudioPump<'_>,
        utterance: Utterance,
        blocks: &[Block],
        intonation: Intonation,
        progress: &mut JobProgress,
    ) -> UtteranceOutcome {
        for block in blocks {
            if !self.state.is_speaking() {
                return UtteranceOutcome::Cancelled;
            }

            if !block.text.is_empty() {
                for segment in split_segments(&block.text, self.max_segment_chars) {
                    if !self.state.is_speaking() {
                        return UtteranceOutcome::Cancelled;
                    }
                    let segment = safe_text(&segment);
                    if segment.is_empty() {
                        continue;
                    }
                    if let Some(outcome) = self.speak_segment(pump, &segment, intonation, progress)
                    {
                        self.state.halt();
                        return outcome;
                    }
                }
            }

            if !self.state.is_speaking() {
                return UtteranceOutcome::Cancelled;
            }
            if let Err(err) = self.markers.schedule_markers(utterance, &block.markers) {
                error!(target: "speech_driver", %err, "failed to queue index markers");
                self.state.halt();
                return UtteranceOutcome::SinkFault;
            }
            progress.markers_scheduled += block.markers.len();
        }

        UtteranceOutcome::Completed
    }

    /// Speaks one segment. `Some` means the utterance must stop here.
    fn speak_segment(
        &self,
        pump: &mut AudioPump<'_>,
        segment: &str,
        intonation: Intonation,
        progress: &mut JobProgress,
    ) -> Option<UtteranceOutcome> {
        match pump.speak_segment(segment, intonation) {
            SegmentOutcome::Finished => None,
            SegmentOutcome::Cancelled => Some(UtteranceOutcome::Cancelled),
            SegmentOutcome::StartFailed(fault) => {
                error!(target: "speech_driver", %fault, "engine refused segment");
                Some(UtteranceOutcome::StartRejected)
            }
            SegmentOutcome::Failed(fault) => {
                error!(target: "speech_driver", %fault, "segment failed mid-stream");
                self.retry_ascii(pump, segment, intonation, progress);
                Some(UtteranceOutcome::SegmentFailed)
            }
        }
    }

    /// One attempt with the non-ASCII characters blanked out. Its result is
    /// only logged; the utterance stops afterwards either way.
    fn retry_ascii(
        &self,
        pump: &mut AudioPump<'_>,
        segment: &str,
        intonation: Intonation,
        progress: &mut JobProgress,
    ) {
        let fallback = ascii_fallback(segment);
        if fallback.is_empty() || fallback == segment || !self.state.is_speaking() {
            return;
        }

        progress.fallback_attempts += 1;
        let outcome = pump.speak_segment(&fallback, intonation);
        debug!(target: "speech_driver", ?outcome, "ascii fallback finished");
    }

    fn record(
        &self,
        utterance: Utterance,
        blocks: usize,
        pump: &AudioPump<'_>,
        progress: &JobProgress,
        outcome: UtteranceOutcome,
        started_at: Instant,
    ) {
        let stats = pump.stats();
        record_utterance(&UtteranceSummary {
            utterance: utterance.id(),
            blocks,
            segments: stats.segments,
            chunks: stats.chunks,
            audio_bytes: stats.audio_bytes,
            markers_scheduled: progress.markers_scheduled,
            fallback_attempts: progress.fallback_attempts,
            outcome,
            elapsed_ms: duration_to_ms(started_at.elapsed()),
        });
    }
}

#[derive(Debug, Default)]
struct JobProgress {
    markers_scheduled: usize,
    fallback_attempts: u32,
}
