use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::orchestrator::error::{EngineFault, SpeakFault};
use crate::orchestrator::traits::{AudioSink, SpeechEngine};
use crate::orchestrator::types::{EngineEvent, Intonation};

use super::state::PlaybackState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SegmentOutcome {
    Finished,
    Cancelled,
    /// `start_speak` refused the text; nothing was produced.
    StartFailed(EngineFault),
    /// The engine or the sink broke down mid-segment.
    Failed(SpeakFault),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PumpStats {
    pub(crate) segments: u32,
    pub(crate) chunks: u64,
    pub(crate) audio_bytes: u64,
}

/// Moves engine output into the sink for one segment at a time.
pub(crate) struct AudioPump<'a> {
    engine: &'a dyn SpeechEngine,
    sink: &'a dyn AudioSink,
    state: &'a PlaybackState,
    poll_interval: Duration,
    stats: PumpStats,
}

impl<'a> AudioPump<'a> {
    pub(crate) fn new(
        engine: &'a dyn SpeechEngine,
        sink: &'a dyn AudioSink,
        state: &'a PlaybackState,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            sink,
            state,
            poll_interval,
            stats: PumpStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> PumpStats {
        self.stats
    }

    pub(crate) fn speak_segment(&mut self, text: &str, intonation: Intonation) -> SegmentOutcome {
        if let Err(fault) = self.engine.start_speak(text, intonation) {
            return SegmentOutcome::StartFailed(fault);
        }
        self.stats.segments += 1;
        trace!(
            target: "audio_pump",
            chars = text.chars().count(),
            "segment accepted by engine"
        );
        self.drain()
    }

    /// Reads until the engine reports done or error. Chunks are consumed
    /// back-to-back; the pump only sleeps after a pass that produced nothing.
    fn drain(&mut self) -> SegmentOutcome {
        while self.state.is_speaking() {
            let mut progressed = false;

            loop {
                let event = match self.engine.read() {
                    Ok(event) => event,
                    Err(fault) => return SegmentOutcome::Failed(fault.into()),
                };

                match event {
                    EngineEvent::AudioChunk(chunk) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        if !self.state.is_speaking() {
                            break;
                        }
                        progressed = true;
                        let len = chunk.len() as u64;
                        if let Err(err) = self.sink.feed(chunk, None) {
                            return SegmentOutcome::Failed(err.into());
                        }
                        self.stats.chunks += 1;
                        self.stats.audio_bytes += len;
                    }
                    EngineEvent::Done => return SegmentOutcome::Finished,
                    EngineEvent::Error(code) => {
                        return SegmentOutcome::Failed(EngineFault::Reported { code }.into());
                    }
                    EngineEvent::None => break,
                }
            }

            if !progressed {
                thread::sleep(self.poll_interval);
            }
        }

        debug!(target: "audio_pump", "segment drain interrupted by cancel");
        SegmentOutcome::Cancelled
    }
}
