use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::orchestrator::error::SinkError;
use crate::orchestrator::traits::{AudioSink, SpeechListener};
use crate::orchestrator::types::MarkerId;

use super::state::{PlaybackState, Utterance};

/// Ties listener notifications to the audio position by feeding zero-length
/// units behind the audio that precedes them.
pub(crate) struct MarkerScheduler {
    sink: Arc<dyn AudioSink>,
    listener: Arc<dyn SpeechListener>,
    state: Arc<PlaybackState>,
}

impl MarkerScheduler {
    pub(crate) fn new(
        sink: Arc<dyn AudioSink>,
        listener: Arc<dyn SpeechListener>,
        state: Arc<PlaybackState>,
    ) -> Self {
        Self {
            sink,
            listener,
            state,
        }
    }

    /// Fires `index_reached` for each id, in order, once the audio fed so far
    /// has played. Skipped entirely if the utterance was cancelled meanwhile.
    pub(crate) fn schedule_markers(
        &self,
        utterance: Utterance,
        ids: &[MarkerId],
    ) -> Result<(), SinkError> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids = ids.to_vec();
        let listener = Arc::clone(&self.listener);
        let state = Arc::clone(&self.state);
        self.sink.feed(
            Bytes::new(),
            Some(Box::new(move || {
                if !state.is_current(utterance) {
                    trace!(
                        target: "speech_driver",
                        utterance = utterance.id(),
                        "dropping markers of a stopped utterance"
                    );
                    return;
                }
                for id in ids {
                    listener.index_reached(id);
                }
            })),
        )
    }

    /// Clears the speaking flag and fires `done_speaking` after the final audio.
    pub(crate) fn schedule_done(&self, utterance: Utterance) -> Result<(), SinkError> {
        let listener = Arc::clone(&self.listener);
        let state = Arc::clone(&self.state);
        self.sink.feed(
            Bytes::new(),
            Some(Box::new(move || {
                if state.finish(utterance) {
                    listener.done_speaking();
                }
            })),
        )
    }
}
